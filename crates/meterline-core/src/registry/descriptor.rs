//! Metric family identity and registration-time validation.

use crate::error::{MeterlineError, Result};

/// Default latency buckets in seconds (`+Inf` is implicit).
pub const DEFAULT_BUCKETS: [f64; 14] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

/// Closed set of metric kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
    Summary,
}

impl MetricKind {
    /// Name used on the `# TYPE` line.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
            MetricKind::Summary => "summary",
        }
    }
}

/// Immutable identity of one metric family.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub label_names: Vec<String>,
    /// Upper bounds for histogram buckets, ascending, without `+Inf`.
    /// Empty for every other kind.
    pub buckets: Vec<f64>,
}

impl MetricDescriptor {
    /// Build and validate a descriptor.
    pub fn new(
        name: &str,
        help: &str,
        kind: MetricKind,
        label_names: &[&str],
        buckets: &[f64],
    ) -> Result<Self> {
        validate_metric_name(name)?;

        let mut names: Vec<String> = Vec::with_capacity(label_names.len());
        for l in label_names {
            validate_label_name(name, l)?;
            if names.iter().any(|n| n == l) {
                return Err(MeterlineError::InvalidDescriptor(format!(
                    "{name}: duplicate label name {l}"
                )));
            }
            match (kind, *l) {
                (MetricKind::Histogram, "le") | (MetricKind::Summary, "quantile") => {
                    return Err(MeterlineError::InvalidDescriptor(format!(
                        "{name}: label {l} is reserved for {}",
                        kind.as_str()
                    )));
                }
                _ => {}
            }
            names.push(l.to_string());
        }

        let buckets = match kind {
            MetricKind::Histogram => normalize_buckets(name, buckets)?,
            _ => Vec::new(),
        };

        Ok(Self {
            name: name.to_string(),
            help: help.to_string(),
            kind,
            label_names: names,
            buckets,
        })
    }

    /// Explain why `other` cannot share this family, or `None` when the shapes match.
    ///
    /// Shape is kind, label names and buckets. Help text is not part of it.
    pub(crate) fn conflict(&self, other: &MetricDescriptor) -> Option<String> {
        if self.kind != other.kind {
            return Some(format!(
                "kind {} != {}",
                self.kind.as_str(),
                other.kind.as_str()
            ));
        }
        if self.label_names != other.label_names {
            return Some(format!(
                "label names {:?} != {:?}",
                self.label_names, other.label_names
            ));
        }
        if self.buckets != other.buckets {
            return Some(format!("buckets {:?} != {:?}", self.buckets, other.buckets));
        }
        None
    }
}

fn validate_metric_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        }
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(MeterlineError::InvalidDescriptor(format!(
            "invalid metric name {name:?}"
        )))
    }
}

fn validate_label_name(metric: &str, label: &str) -> Result<()> {
    let mut chars = label.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !ok || label.starts_with("__") {
        return Err(MeterlineError::InvalidDescriptor(format!(
            "{metric}: invalid label name {label:?}"
        )));
    }
    Ok(())
}

// A trailing +Inf is accepted and dropped; it is always implied.
fn normalize_buckets(metric: &str, bounds: &[f64]) -> Result<Vec<f64>> {
    let bounds = match bounds.split_last() {
        Some((last, rest)) if *last == f64::INFINITY => rest,
        _ => bounds,
    };
    if bounds.is_empty() {
        return Err(MeterlineError::InvalidDescriptor(format!(
            "{metric}: histogram needs at least one finite bucket"
        )));
    }
    for pair in bounds.windows(2) {
        if pair[0] >= pair[1] {
            return Err(MeterlineError::InvalidDescriptor(format!(
                "{metric}: buckets must be strictly increasing ({} >= {})",
                pair[0], pair[1]
            )));
        }
    }
    if let Some(b) = bounds.iter().find(|b| !b.is_finite()) {
        return Err(MeterlineError::InvalidDescriptor(format!(
            "{metric}: bucket bound {b} is not finite"
        )));
    }
    Ok(bounds.to_vec())
}
