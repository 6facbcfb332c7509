//! Prometheus text exposition format (version 0.0.4).
//!
//! `render` is a pure function of a [`Snapshot`]: the same snapshot always
//! produces the same bytes. Ordering comes from the snapshot itself (families
//! by registration, series by first creation, labels by declaration).

pub mod format;

use std::fmt::Write;

use crate::registry::{FamilySnapshot, InstrumentState, LabelSet, Snapshot};

pub use format::{escape_help, escape_label, format_bound};

/// Content type served with a rendered scrape body.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render every family in the snapshot. An empty snapshot renders to an empty string.
pub fn render(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for family in &snapshot.families {
        render_family(family, &mut out);
    }
    out
}

fn render_family(family: &FamilySnapshot, out: &mut String) {
    let d = &family.descriptor;
    let _ = writeln!(out, "# HELP {} {}", d.name, escape_help(&d.help));
    let _ = writeln!(out, "# TYPE {} {}", d.name, d.kind.as_str());

    for s in &family.series {
        match &s.state {
            InstrumentState::Counter(v) | InstrumentState::Gauge(v) => {
                write_sample(out, &d.name, "", &s.labels, None, &float(*v));
            }
            InstrumentState::Histogram(h) => {
                for (bound, count) in h.cumulative() {
                    let le = format_bound(bound);
                    write_sample(
                        out,
                        &d.name,
                        "_bucket",
                        &s.labels,
                        Some(("le", le.as_str())),
                        &count.to_string(),
                    );
                }
                write_sample(out, &d.name, "_sum", &s.labels, None, &float(h.sum));
                write_sample(out, &d.name, "_count", &s.labels, None, &h.count.to_string());
            }
            InstrumentState::Summary(sm) => {
                write_sample(out, &d.name, "_sum", &s.labels, None, &float(sm.sum));
                write_sample(out, &d.name, "_count", &s.labels, None, &sm.count.to_string());
            }
        }
    }
}

fn write_sample<'a>(
    out: &mut String,
    name: &str,
    suffix: &str,
    labels: &'a LabelSet,
    extra: Option<(&'a str, &'a str)>,
    value: &str,
) {
    out.push_str(name);
    out.push_str(suffix);

    let mut pairs = labels.pairs().chain(extra).peekable();
    if pairs.peek().is_some() {
        out.push('{');
        for (i, (k, v)) in pairs.enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "{}=\"{}\"", k, escape_label(v));
        }
        out.push('}');
    }

    out.push(' ');
    out.push_str(value);
    out.push('\n');
}

fn float(v: f64) -> String {
    let mut s = String::new();
    format::write_value(&mut s, v);
    s
}
