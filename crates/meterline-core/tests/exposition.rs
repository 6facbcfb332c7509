//! Text exposition output.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use meterline_core::exposition::{self, format_bound, CONTENT_TYPE};
use meterline_core::Registry;

/// Parse one sample line into (name, labels, value), undoing label escapes.
fn parse_sample(line: &str) -> (String, Vec<(String, String)>, String) {
    let (series, value) = line.rsplit_once(' ').unwrap();
    let Some((name, rest)) = series.split_once('{') else {
        return (series.to_string(), vec![], value.to_string());
    };
    let body = rest.strip_suffix('}').unwrap();

    let mut labels = Vec::new();
    let mut chars = body.chars().peekable();
    while chars.peek().is_some() {
        let key: String = chars.by_ref().take_while(|c| *c != '=').collect();
        assert_eq!(chars.next(), Some('"'));
        let mut val = String::new();
        loop {
            match chars.next().unwrap() {
                '\\' => match chars.next().unwrap() {
                    'n' => val.push('\n'),
                    '\\' => val.push('\\'),
                    '"' => val.push('"'),
                    other => panic!("bad escape \\{other}"),
                },
                '"' => break,
                '\n' => panic!("raw newline inside label value"),
                c => val.push(c),
            }
        }
        labels.push((key, val));
        if chars.peek() == Some(&',') {
            chars.next();
        }
    }
    (name.to_string(), labels, value.to_string())
}

fn samples<'a>(text: &'a str, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    text.lines()
        .filter(|l| !l.starts_with('#'))
        .filter(move |l| l.starts_with(name) && l[name.len()..].starts_with(['{', ' ']))
}

#[test]
fn counter_scenario_renders_two_series() {
    let reg = Registry::new();
    let c = reg
        .register_counter(
            "http_requests_total",
            "Total number of HTTP requests.",
            &["method", "endpoint", "status"],
        )
        .unwrap();
    for _ in 0..3 {
        c.with(&["GET", "/", "200"]).unwrap().inc_by(1.0).unwrap();
    }
    c.with(&["GET", "/", "500"]).unwrap().inc_by(1.0).unwrap();

    let text = exposition::render(&reg.snapshot());
    assert_eq!(
        text,
        "# HELP http_requests_total Total number of HTTP requests.\n\
         # TYPE http_requests_total counter\n\
         http_requests_total{method=\"GET\",endpoint=\"/\",status=\"200\"} 3\n\
         http_requests_total{method=\"GET\",endpoint=\"/\",status=\"500\"} 1\n"
    );
    assert_eq!(text.matches("# HELP http_requests_total").count(), 1);
    assert_eq!(text.matches("# TYPE http_requests_total counter").count(), 1);
    assert_eq!(samples(&text, "http_requests_total").count(), 2);
}

#[test]
fn histogram_scenario_renders_buckets_sum_and_count() {
    let reg = Registry::new();
    let h = reg
        .register_histogram("req_seconds", "Request latency.", &["endpoint"], &[0.1, 0.5, 1.0])
        .unwrap();
    let inst = h.with(&["/"]).unwrap();
    for v in [0.05, 0.3, 0.3, 2.0] {
        inst.observe(v).unwrap();
    }

    let text = exposition::render(&reg.snapshot());
    assert_eq!(
        text,
        "# HELP req_seconds Request latency.\n\
         # TYPE req_seconds histogram\n\
         req_seconds_bucket{endpoint=\"/\",le=\"0.1\"} 1\n\
         req_seconds_bucket{endpoint=\"/\",le=\"0.5\"} 3\n\
         req_seconds_bucket{endpoint=\"/\",le=\"1.0\"} 3\n\
         req_seconds_bucket{endpoint=\"/\",le=\"+Inf\"} 4\n\
         req_seconds_sum{endpoint=\"/\"} 2.65\n\
         req_seconds_count{endpoint=\"/\"} 4\n"
    );
}

#[test]
fn gauge_and_summary_blocks() {
    let reg = Registry::new();
    let g = reg
        .register_gauge("http_requests_inprogress", "Number of in-progress HTTP requests.")
        .unwrap();
    let s = reg
        .register_summary("http_request_summary_seconds", "Latency summary.", &["endpoint"])
        .unwrap();
    g.set(-2.5).unwrap();
    s.with(&["/error"]).unwrap().observe(0.25).unwrap();
    s.with(&["/error"]).unwrap().observe(0.5).unwrap();

    let text = exposition::render(&reg.snapshot());
    assert_eq!(
        text,
        "# HELP http_requests_inprogress Number of in-progress HTTP requests.\n\
         # TYPE http_requests_inprogress gauge\n\
         http_requests_inprogress -2.5\n\
         # HELP http_request_summary_seconds Latency summary.\n\
         # TYPE http_request_summary_seconds summary\n\
         http_request_summary_seconds_sum{endpoint=\"/error\"} 0.75\n\
         http_request_summary_seconds_count{endpoint=\"/error\"} 2\n"
    );
}

#[test]
fn unlabeled_histogram_has_only_le() {
    let reg = Registry::new();
    let h = reg.register_histogram("size_bytes", "Sizes.", &[], &[10.0, 100.0]).unwrap();
    h.with(&[]).unwrap().observe(50.0).unwrap();

    let text = exposition::render(&reg.snapshot());
    assert!(text.contains("size_bytes_bucket{le=\"10.0\"} 0\n"));
    assert!(text.contains("size_bytes_bucket{le=\"100.0\"} 1\n"));
    assert!(text.contains("size_bytes_bucket{le=\"+Inf\"} 1\n"));
    assert!(text.contains("size_bytes_sum 50\n"));
    assert!(text.contains("size_bytes_count 1\n"));
}

#[test]
fn empty_registry_renders_nothing() {
    let reg = Registry::new();
    let snap = reg.snapshot();
    assert!(snap.is_empty());
    assert_eq!(exposition::render(&snap), "");
}

#[test]
fn labeled_family_without_series_renders_header_only() {
    let reg = Registry::new();
    reg.register_counter("never_total", "Never touched.", &["k"]).unwrap();
    assert_eq!(
        exposition::render(&reg.snapshot()),
        "# HELP never_total Never touched.\n# TYPE never_total counter\n"
    );
}

#[test]
fn render_is_byte_stable() {
    let reg = Registry::new();
    let c = reg.register_counter("a_total", "A.", &["k"]).unwrap();
    let h = reg
        .register_histogram("b_seconds", "B.", &["k"], &meterline_core::registry::DEFAULT_BUCKETS)
        .unwrap();
    for i in 0..50 {
        let k = format!("v{}", i % 7);
        c.with(&[k.as_str()]).unwrap().inc_by(0.1).unwrap();
        h.with(&[k.as_str()]).unwrap().observe(f64::from(i) / 10.0).unwrap();
    }

    let snap = reg.snapshot();
    let first = exposition::render(&snap);
    let second = exposition::render(&snap);
    assert_eq!(first, second);

    // Nothing changed in between, so a fresh snapshot renders the same bytes too.
    assert_eq!(first, exposition::render(&reg.snapshot()));
}

#[test]
fn label_values_escape_and_round_trip() {
    let reg = Registry::new();
    let c = reg.register_counter("odd_total", "Odd labels.", &["path"]).unwrap();
    let nasty = ["say \"hi\"", "line1\nline2", "back\\slash", "mix\\\"\n"];
    for v in nasty {
        c.with(&[v]).unwrap().inc();
    }

    let text = exposition::render(&reg.snapshot());
    assert!(text.contains(r#"odd_total{path="say \"hi\""} 1"#));
    assert!(text.contains(r#"odd_total{path="line1\nline2"} 1"#));
    assert!(text.contains(r#"odd_total{path="back\\slash"} 1"#));

    let parsed: Vec<String> = samples(&text, "odd_total")
        .map(|l| {
            let (name, labels, value) = parse_sample(l);
            assert_eq!(name, "odd_total");
            assert_eq!(value, "1");
            assert_eq!(labels.len(), 1);
            labels[0].1.clone()
        })
        .collect();
    assert_eq!(parsed, nasty.iter().map(|s| s.to_string()).collect::<Vec<_>>());
}

#[test]
fn help_text_escapes_backslash_and_newline() {
    let reg = Registry::new();
    reg.register_gauge("g", "first line\nsecond \\ \"quoted\"").unwrap();
    let text = exposition::render(&reg.snapshot());
    assert!(text.starts_with("# HELP g first line\\nsecond \\\\ \"quoted\"\n"));
}

#[test]
fn numbers_never_use_exponent_notation() {
    let reg = Registry::new();
    let big = reg.register_gauge("big", "Big.").unwrap();
    let small = reg.register_gauge("small", "Small.").unwrap();
    let inf = reg.register_gauge("inf", "Inf.").unwrap();
    big.set(1e21).unwrap();
    small.set(1e-7).unwrap();
    inf.set(f64::NEG_INFINITY).unwrap();

    let text = exposition::render(&reg.snapshot());
    assert!(text.contains("big 1000000000000000000000\n"));
    assert!(text.contains("small 0.0000001\n"));
    assert!(text.contains("inf -Inf\n"));
    assert!(!text.contains("e-") && !text.contains("e+"));
}

#[test]
fn bounds_keep_a_fractional_part() {
    assert_eq!(format_bound(1.0), "1.0");
    assert_eq!(format_bound(10.0), "10.0");
    assert_eq!(format_bound(0.005), "0.005");
    assert_eq!(format_bound(2.5), "2.5");
    assert_eq!(format_bound(f64::INFINITY), "+Inf");
}

#[test]
fn content_type_is_versioned_text() {
    assert!(CONTENT_TYPE.starts_with("text/plain; version=0.0.4"));
}
