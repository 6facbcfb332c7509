//! Point-in-time copies of registry state, consumed by the exposition encoder.

use std::sync::Arc;

use super::descriptor::MetricDescriptor;

/// Concrete label values of one series, paired with the family's label names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelSet {
    names: Vec<String>,
    values: Vec<String>,
}

impl LabelSet {
    pub(crate) fn new(names: Vec<String>, values: Vec<String>) -> Self {
        Self { names, values }
    }

    /// `(name, value)` pairs in declaration order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramState {
    /// Finite upper bounds, ascending.
    pub bounds: Vec<f64>,
    /// Cumulative counts aligned with `bounds`.
    pub buckets: Vec<u64>,
    pub count: u64,
    pub sum: f64,
}

impl HistogramState {
    /// Cumulative `(bound, count)` pairs, ending with `(+Inf, count)`.
    pub fn cumulative(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.bounds
            .iter()
            .copied()
            .zip(self.buckets.iter().copied())
            .chain(std::iter::once((f64::INFINITY, self.count)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryState {
    pub count: u64,
    pub sum: f64,
}

/// Copied values of one instrument, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentState {
    Counter(f64),
    Gauge(f64),
    Histogram(HistogramState),
    Summary(SummaryState),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSnapshot {
    pub labels: LabelSet,
    pub state: InstrumentState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FamilySnapshot {
    pub descriptor: Arc<MetricDescriptor>,
    /// In first-creation order.
    pub series: Vec<SeriesSnapshot>,
}

impl FamilySnapshot {
    /// Series whose label values equal `values`, positionally.
    pub fn series(&self, values: &[&str]) -> Option<&SeriesSnapshot> {
        self.series.iter().find(|s| {
            s.labels.values().len() == values.len()
                && s.labels.values().iter().zip(values).all(|(a, b)| a == b)
        })
    }
}

/// Every family in registration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub families: Vec<FamilySnapshot>,
}

impl Snapshot {
    pub fn family(&self, name: &str) -> Option<&FamilySnapshot> {
        self.families.iter().find(|f| f.descriptor.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}
