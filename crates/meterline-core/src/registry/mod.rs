//! In-process metric registry.
//!
//! A `Registry` owns every metric family; a family owns one instrument per
//! distinct label-value tuple. Families are kept in registration order and
//! series within a family in first-creation order, which keeps the rendered
//! exposition stable between scrapes.
//!
//! Lookup-or-create goes through a `DashMap` keyed by the ordered label
//! values. The hot path (instrument already exists) only takes a shard read
//! lock; creation takes the shard write lock for the insert itself, so two
//! racing callers always end up with the same instrument.

pub mod descriptor;
pub mod instrument;
pub mod snapshot;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;

use crate::error::{MeterlineError, Result};

pub use descriptor::{MetricDescriptor, MetricKind, DEFAULT_BUCKETS};
pub use instrument::{Counter, Gauge, Histogram, InProgress, Instrument, Summary, Timer};
pub use snapshot::{
    FamilySnapshot, HistogramState, InstrumentState, LabelSet, SeriesSnapshot, Snapshot,
    SummaryState,
};

struct Series<I> {
    seq: u64,
    instrument: Arc<I>,
}

struct FamilyInner<I> {
    descriptor: Arc<MetricDescriptor>,
    series: DashMap<Vec<String>, Series<I>>,
    next_seq: AtomicU64,
}

/// Handle to one metric family. Cheap to clone; all clones share state.
pub struct Family<I> {
    inner: Arc<FamilyInner<I>>,
}

impl<I> Clone for Family<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

pub type CounterHandle = Family<Counter>;
pub type HistogramHandle = Family<Histogram>;
pub type SummaryHandle = Family<Summary>;

impl<I: Instrument> Family<I> {
    fn new(descriptor: MetricDescriptor) -> Self {
        let family = Self {
            inner: Arc::new(FamilyInner {
                descriptor: Arc::new(descriptor),
                series: DashMap::new(),
                next_seq: AtomicU64::new(0),
            }),
        };
        // Unlabeled families expose their single series from the start.
        if family.inner.descriptor.label_names.is_empty() {
            family.get_or_create(Vec::new());
        }
        family
    }

    pub fn descriptor(&self) -> &MetricDescriptor {
        &self.inner.descriptor
    }

    /// Instrument for `values`, given in the order the label names were declared.
    pub fn with(&self, values: &[&str]) -> Result<Arc<I>> {
        let expected = self.inner.descriptor.label_names.len();
        if values.len() != expected {
            return Err(MeterlineError::LabelCardinality {
                name: self.inner.descriptor.name.clone(),
                expected,
                got: values.len(),
            });
        }
        let key: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        Ok(self.get_or_create(key))
    }

    /// Number of series created so far.
    pub fn len(&self) -> usize {
        self.inner.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.series.is_empty()
    }

    fn get_or_create(&self, key: Vec<String>) -> Arc<I> {
        if let Some(s) = self.inner.series.get(&key) {
            return Arc::clone(&s.instrument);
        }
        let inner = &self.inner;
        let entry = inner.series.entry(key).or_insert_with(|| Series {
            seq: inner.next_seq.fetch_add(1, Ordering::Relaxed),
            instrument: Arc::new(I::create(&inner.descriptor)),
        });
        Arc::clone(&entry.instrument)
    }

    fn collect(&self) -> FamilySnapshot {
        // Copy the Arcs out first so no shard lock is held while reading values.
        let mut rows: Vec<(u64, Vec<String>, Arc<I>)> = self
            .inner
            .series
            .iter()
            .map(|r| (r.value().seq, r.key().clone(), Arc::clone(&r.value().instrument)))
            .collect();
        rows.sort_by_key(|(seq, _, _)| *seq);

        let names = &self.inner.descriptor.label_names;
        FamilySnapshot {
            descriptor: Arc::clone(&self.inner.descriptor),
            series: rows
                .into_iter()
                .map(|(_, values, instrument)| SeriesSnapshot {
                    labels: LabelSet::new(names.clone(), values),
                    state: instrument.state(),
                })
                .collect(),
        }
    }
}

/// Unlabeled gauge. Mutators act on the family's single instrument.
#[derive(Clone)]
pub struct GaugeHandle {
    family: Family<Gauge>,
    gauge: Arc<Gauge>,
}

impl GaugeHandle {
    pub fn descriptor(&self) -> &MetricDescriptor {
        self.family.descriptor()
    }

    pub fn inc(&self) {
        self.gauge.inc();
    }

    pub fn dec(&self) {
        self.gauge.dec();
    }

    pub fn add(&self, delta: f64) -> Result<()> {
        self.gauge.add(delta)
    }

    pub fn sub(&self, delta: f64) -> Result<()> {
        self.gauge.sub(delta)
    }

    pub fn set(&self, v: f64) -> Result<()> {
        self.gauge.set(v)
    }

    pub fn get(&self) -> f64 {
        self.gauge.get()
    }

    /// See [`Gauge::track_inprogress`].
    pub fn track_inprogress(&self) -> InProgress {
        self.gauge.track_inprogress()
    }
}

/// One registered family, tagged by kind.
#[derive(Clone)]
pub enum FamilyEntry {
    Counter(Family<Counter>),
    Gauge(Family<Gauge>),
    Histogram(Family<Histogram>),
    Summary(Family<Summary>),
}

impl FamilyEntry {
    pub fn descriptor(&self) -> &MetricDescriptor {
        match self {
            FamilyEntry::Counter(f) => f.descriptor(),
            FamilyEntry::Gauge(f) => f.descriptor(),
            FamilyEntry::Histogram(f) => f.descriptor(),
            FamilyEntry::Summary(f) => f.descriptor(),
        }
    }

    fn collect(&self) -> FamilySnapshot {
        match self {
            FamilyEntry::Counter(f) => f.collect(),
            FamilyEntry::Gauge(f) => f.collect(),
            FamilyEntry::Histogram(f) => f.collect(),
            FamilyEntry::Summary(f) => f.collect(),
        }
    }
}

/// Metric registry.
///
/// Construct once at startup and share through `Arc`; there is no global
/// instance.
#[derive(Default)]
pub struct Registry {
    families: RwLock<Vec<FamilyEntry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_counter(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
    ) -> Result<CounterHandle> {
        let desc = MetricDescriptor::new(name, help, MetricKind::Counter, label_names, &[])?;
        self.register(desc)
    }

    /// Gauges are unlabeled; the single instrument exists from registration.
    pub fn register_gauge(&self, name: &str, help: &str) -> Result<GaugeHandle> {
        let desc = MetricDescriptor::new(name, help, MetricKind::Gauge, &[], &[])?;
        let family: Family<Gauge> = self.register(desc)?;
        let gauge = family.with(&[])?;
        Ok(GaugeHandle { family, gauge })
    }

    pub fn register_histogram(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
        buckets: &[f64],
    ) -> Result<HistogramHandle> {
        let desc =
            MetricDescriptor::new(name, help, MetricKind::Histogram, label_names, buckets)?;
        self.register(desc)
    }

    pub fn register_summary(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
    ) -> Result<SummaryHandle> {
        let desc = MetricDescriptor::new(name, help, MetricKind::Summary, label_names, &[])?;
        self.register(desc)
    }

    fn register<I: Instrument>(&self, desc: MetricDescriptor) -> Result<Family<I>> {
        let mut families = self.families.write().unwrap_or_else(|e| e.into_inner());

        if let Some(existing) = families.iter().find(|f| f.descriptor().name == desc.name) {
            if let Some(reason) = existing.descriptor().conflict(&desc) {
                tracing::warn!(metric = %desc.name, %reason, "conflicting metric registration");
                return Err(MeterlineError::DuplicateMetric {
                    name: desc.name,
                    reason,
                });
            }
            if existing.descriptor().help != desc.help {
                tracing::warn!(
                    metric = %desc.name,
                    kept = %existing.descriptor().help,
                    ignored = %desc.help,
                    "re-registration with different help text"
                );
            }
            return I::from_entry(existing).ok_or_else(|| {
                MeterlineError::Internal(format!("family {} has unexpected kind", desc.name))
            });
        }

        tracing::debug!(
            metric = %desc.name,
            kind = desc.kind.as_str(),
            labels = ?desc.label_names,
            "metric registered"
        );
        let family = Family::<I>::new(desc);
        families.push(I::into_entry(family.clone()));
        Ok(family)
    }

    /// Number of registered families.
    pub fn len(&self) -> usize {
        self.families.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy every family and series.
    ///
    /// The family list lock is held only long enough to clone the handles;
    /// instruments are then read one at a time.
    pub fn snapshot(&self) -> Snapshot {
        let families: Vec<FamilyEntry> = self
            .families
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        Snapshot {
            families: families.iter().map(FamilyEntry::collect).collect(),
        }
    }
}
