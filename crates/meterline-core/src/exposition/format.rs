//! Escaping and number formatting for the text exposition format.

use std::fmt::Write;

/// Escape a label value: backslash, double quote and newline.
pub fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Escape HELP text: backslash and newline.
pub fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Sample value. Rust's `Display` for f64 is the shortest round-trip decimal
/// and never switches to exponent notation.
pub fn write_value(out: &mut String, v: f64) {
    if v.is_nan() {
        out.push_str("NaN");
    } else if v == f64::INFINITY {
        out.push_str("+Inf");
    } else if v == f64::NEG_INFINITY {
        out.push_str("-Inf");
    } else {
        let _ = write!(out, "{v}");
    }
}

/// Bucket bound for `le`. Integral bounds keep a `.0` suffix (`1.0`, not `1`).
pub fn format_bound(b: f64) -> String {
    if b == f64::INFINITY {
        return "+Inf".to_string();
    }
    let mut s = String::new();
    write_value(&mut s, b);
    if b.is_finite() && !s.contains('.') {
        s.push_str(".0");
    }
    s
}
