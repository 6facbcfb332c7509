//! Instrument state for one (family, label set) pair.
//!
//! Counters and gauges are a single `AtomicU64` holding f64 bits and are
//! mutated with compare-and-swap. Histograms and summaries keep all their
//! fields behind one mutex so a snapshot never sees buckets from one
//! observation and the sum from another.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::error::{MeterlineError, Result};

use super::descriptor::{MetricDescriptor, MetricKind};
use super::snapshot::{HistogramState, InstrumentState, SummaryState};
use super::{Family, FamilyEntry};

mod sealed {
    pub trait Sealed {}
}

/// Implemented by the four instrument kinds. Sealed: the set is closed.
pub trait Instrument: sealed::Sealed + Send + Sync + Sized + 'static {
    const KIND: MetricKind;

    /// Fresh zeroed instrument for a family.
    fn create(desc: &MetricDescriptor) -> Self;

    /// Copy of the current values.
    fn state(&self) -> InstrumentState;

    #[doc(hidden)]
    fn into_entry(family: Family<Self>) -> FamilyEntry;

    #[doc(hidden)]
    fn from_entry(entry: &FamilyEntry) -> Option<Family<Self>>;
}

struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(v: f64) -> Self {
        Self(AtomicU64::new(v.to_bits()))
    }

    fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn set(&self, v: f64) {
        self.0.store(v.to_bits(), Ordering::Relaxed);
    }

    /// Add unless the result would be NaN (`+Inf` plus `-Inf`). Returns whether it landed.
    fn try_add(&self, delta: f64) -> bool {
        self.0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                let next = f64::from_bits(bits) + delta;
                (!next.is_nan()).then(|| next.to_bits())
            })
            .is_ok()
    }

    fn add(&self, delta: f64) {
        // The closure never returns None, so the update always lands.
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + delta).to_bits())
            });
    }
}

// Poisoning only means a panic elsewhere; plain numbers stay valid.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// --------------------
// Counter
// --------------------

/// Monotonic counter.
pub struct Counter {
    value: AtomicF64,
}

impl Counter {
    /// Increment by 1.
    pub fn inc(&self) {
        self.value.add(1.0);
    }

    /// Increment by `delta`. Negative or NaN deltas are rejected untouched.
    pub fn inc_by(&self, delta: f64) -> Result<()> {
        if delta.is_nan() || delta < 0.0 {
            return Err(MeterlineError::InvalidObservation(format!(
                "counter delta must be non-negative, got {delta}"
            )));
        }
        self.value.add(delta);
        Ok(())
    }

    pub fn get(&self) -> f64 {
        self.value.get()
    }
}

impl sealed::Sealed for Counter {}

impl Instrument for Counter {
    const KIND: MetricKind = MetricKind::Counter;

    fn create(_desc: &MetricDescriptor) -> Self {
        Self {
            value: AtomicF64::new(0.0),
        }
    }

    fn state(&self) -> InstrumentState {
        InstrumentState::Counter(self.get())
    }

    fn into_entry(family: Family<Self>) -> FamilyEntry {
        FamilyEntry::Counter(family)
    }

    fn from_entry(entry: &FamilyEntry) -> Option<Family<Self>> {
        match entry {
            FamilyEntry::Counter(f) => Some(f.clone()),
            _ => None,
        }
    }
}

// --------------------
// Gauge
// --------------------

/// Value that can go up and down.
pub struct Gauge {
    value: AtomicF64,
}

impl Gauge {
    /// Increment by 1.
    pub fn inc(&self) {
        self.value.add(1.0);
    }

    /// Decrement by 1.
    pub fn dec(&self) {
        self.value.add(-1.0);
    }

    /// Add `delta`. NaN deltas, and deltas that would turn the value into NaN, are rejected.
    pub fn add(&self, delta: f64) -> Result<()> {
        self.apply(not_nan("gauge delta", delta)?)
    }

    pub fn sub(&self, delta: f64) -> Result<()> {
        self.apply(-not_nan("gauge delta", delta)?)
    }

    fn apply(&self, delta: f64) -> Result<()> {
        if self.value.try_add(delta) {
            Ok(())
        } else {
            Err(MeterlineError::InvalidObservation(format!(
                "gauge delta {delta} would make the value NaN"
            )))
        }
    }

    pub fn set(&self, v: f64) -> Result<()> {
        self.value.set(not_nan("gauge value", v)?);
        Ok(())
    }

    pub fn get(&self) -> f64 {
        self.value.get()
    }

    /// Increment now and decrement when the returned guard drops.
    ///
    /// The decrement also runs when the owning future is cancelled, so the
    /// gauge keeps counting only work that is actually in flight.
    pub fn track_inprogress(self: &Arc<Self>) -> InProgress {
        self.inc();
        InProgress {
            gauge: Arc::clone(self),
        }
    }
}

impl sealed::Sealed for Gauge {}

impl Instrument for Gauge {
    const KIND: MetricKind = MetricKind::Gauge;

    fn create(_desc: &MetricDescriptor) -> Self {
        Self {
            value: AtomicF64::new(0.0),
        }
    }

    fn state(&self) -> InstrumentState {
        InstrumentState::Gauge(self.get())
    }

    fn into_entry(family: Family<Self>) -> FamilyEntry {
        FamilyEntry::Gauge(family)
    }

    fn from_entry(entry: &FamilyEntry) -> Option<Family<Self>> {
        match entry {
            FamilyEntry::Gauge(f) => Some(f.clone()),
            _ => None,
        }
    }
}

/// Guard returned by [`Gauge::track_inprogress`].
pub struct InProgress {
    gauge: Arc<Gauge>,
}

impl Drop for InProgress {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

// --------------------
// Histogram
// --------------------

struct HistogramCore {
    /// Cumulative, aligned with `bounds`.
    buckets: Vec<u64>,
    count: u64,
    sum: f64,
}

/// Bucketed distribution.
pub struct Histogram {
    bounds: Arc<[f64]>,
    core: Mutex<HistogramCore>,
}

impl Histogram {
    /// Record one value. NaN is rejected.
    pub fn observe(&self, v: f64) -> Result<()> {
        self.record(not_nan("histogram observation", v)?);
        Ok(())
    }

    /// Record a duration in seconds.
    pub fn observe_duration(&self, d: Duration) {
        self.record(d.as_secs_f64());
    }

    /// Start a timer that observes elapsed seconds when stopped or dropped.
    pub fn start_timer(self: &Arc<Self>) -> Timer {
        Timer::new(TimerTarget::Histogram(Arc::clone(self)))
    }

    fn record(&self, v: f64) {
        // Every bucket whose bound is >= v.
        let first = self.bounds.partition_point(|b| *b < v);
        let mut core = lock(&self.core);
        for c in &mut core.buckets[first..] {
            *c += 1;
        }
        core.count += 1;
        core.sum += v;
    }
}

impl sealed::Sealed for Histogram {}

impl Instrument for Histogram {
    const KIND: MetricKind = MetricKind::Histogram;

    fn create(desc: &MetricDescriptor) -> Self {
        Self {
            bounds: desc.buckets.clone().into(),
            core: Mutex::new(HistogramCore {
                buckets: vec![0; desc.buckets.len()],
                count: 0,
                sum: 0.0,
            }),
        }
    }

    fn state(&self) -> InstrumentState {
        let core = lock(&self.core);
        InstrumentState::Histogram(HistogramState {
            bounds: self.bounds.to_vec(),
            buckets: core.buckets.clone(),
            count: core.count,
            sum: core.sum,
        })
    }

    fn into_entry(family: Family<Self>) -> FamilyEntry {
        FamilyEntry::Histogram(family)
    }

    fn from_entry(entry: &FamilyEntry) -> Option<Family<Self>> {
        match entry {
            FamilyEntry::Histogram(f) => Some(f.clone()),
            _ => None,
        }
    }
}

// --------------------
// Summary
// --------------------

#[derive(Default)]
struct SummaryCore {
    count: u64,
    sum: f64,
}

/// Count and sum of observations. No quantiles are computed.
pub struct Summary {
    core: Mutex<SummaryCore>,
}

impl Summary {
    /// Record one value. NaN is rejected.
    pub fn observe(&self, v: f64) -> Result<()> {
        self.record(not_nan("summary observation", v)?);
        Ok(())
    }

    pub fn observe_duration(&self, d: Duration) {
        self.record(d.as_secs_f64());
    }

    pub fn start_timer(self: &Arc<Self>) -> Timer {
        Timer::new(TimerTarget::Summary(Arc::clone(self)))
    }

    fn record(&self, v: f64) {
        let mut core = lock(&self.core);
        core.count += 1;
        core.sum += v;
    }
}

impl sealed::Sealed for Summary {}

impl Instrument for Summary {
    const KIND: MetricKind = MetricKind::Summary;

    fn create(_desc: &MetricDescriptor) -> Self {
        Self {
            core: Mutex::new(SummaryCore::default()),
        }
    }

    fn state(&self) -> InstrumentState {
        let core = lock(&self.core);
        InstrumentState::Summary(SummaryState {
            count: core.count,
            sum: core.sum,
        })
    }

    fn into_entry(family: Family<Self>) -> FamilyEntry {
        FamilyEntry::Summary(family)
    }

    fn from_entry(entry: &FamilyEntry) -> Option<Family<Self>> {
        match entry {
            FamilyEntry::Summary(f) => Some(f.clone()),
            _ => None,
        }
    }
}

// --------------------
// Timer
// --------------------

enum TimerTarget {
    Histogram(Arc<Histogram>),
    Summary(Arc<Summary>),
}

/// Observes elapsed wall time exactly once: on [`Timer::observe_duration`] or on drop.
pub struct Timer {
    target: TimerTarget,
    start: Instant,
    observed: bool,
}

impl Timer {
    fn new(target: TimerTarget) -> Self {
        Self {
            target,
            start: Instant::now(),
            observed: false,
        }
    }

    /// Stop the timer, record and return the elapsed seconds.
    pub fn observe_duration(mut self) -> f64 {
        self.finish()
    }

    /// Stop the timer without recording anything.
    pub fn discard(mut self) {
        self.observed = true;
    }

    fn finish(&mut self) -> f64 {
        let elapsed = self.start.elapsed();
        self.observed = true;
        match &self.target {
            TimerTarget::Histogram(h) => h.observe_duration(elapsed),
            TimerTarget::Summary(s) => s.observe_duration(elapsed),
        }
        elapsed.as_secs_f64()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if !self.observed {
            self.finish();
        }
    }
}

fn not_nan(what: &str, v: f64) -> Result<f64> {
    if v.is_nan() {
        Err(MeterlineError::InvalidObservation(format!("{what} is NaN")))
    } else {
        Ok(v)
    }
}
