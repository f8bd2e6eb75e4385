//! Instrument registry: named counters and gauges with fixed label dimensions.
//!
//! Families live in a `DashMap` keyed by metric name; each family keeps its own
//! `DashMap` from label-value tuple to an atomic `f64` cell. Registration order is
//! tracked with a sequence number so snapshots list metrics in declaration order.
//! Series within a metric are sorted by their label values.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{Result, TallyError};

/// Instrument kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

impl MetricKind {
    /// Name used on the `# TYPE` line.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of a metric. Immutable once declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub label_names: Vec<String>,
}

/// Label values of one series, positionally matching `label_names`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelSet(Vec<String>);

impl LabelSet {
    pub fn values(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Zip with the descriptor's label names.
    pub fn pairs<'a>(
        &'a self,
        desc: &'a MetricDescriptor,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        desc.label_names
            .iter()
            .map(String::as_str)
            .zip(self.0.iter().map(String::as_str))
    }
}

/// `f64` stored as raw bits. Zero bits are `0.0`.
#[derive(Default)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, v: f64) {
        self.0.store(v.to_bits(), Ordering::Relaxed);
    }

    fn add(&self, delta: f64) {
        let mut cur = self.0.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(cur) + delta).to_bits();
            match self
                .0
                .compare_exchange_weak(cur, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(actual) => cur = actual,
            }
        }
    }
}

struct Family {
    seq: u64,
    desc: Arc<MetricDescriptor>,
    series: DashMap<LabelSet, AtomicF64>,
}

impl Family {
    fn expect_kind(&self, expected: MetricKind) -> Result<()> {
        if self.desc.kind != expected {
            return Err(TallyError::KindMismatch {
                metric: self.desc.name.clone(),
                expected,
                actual: self.desc.kind,
            });
        }
        Ok(())
    }

    fn key(&self, label_values: &[&str]) -> Result<LabelSet> {
        let expected = self.desc.label_names.len();
        if label_values.len() != expected {
            return Err(TallyError::LabelArityMismatch {
                metric: self.desc.name.clone(),
                expected,
                got: label_values.len(),
            });
        }
        Ok(LabelSet(label_values.iter().map(|v| v.to_string()).collect()))
    }

    /// Run `f` on the series cell, creating it at zero when absent.
    fn with_series(&self, key: LabelSet, f: impl FnOnce(&AtomicF64)) {
        if let Some(cell) = self.series.get(&key) {
            f(cell.value());
            return;
        }
        let cell = self.series.entry(key).or_default();
        f(cell.value());
    }
}

/// Handle returned by [`Registry::declare`]. Cheap to clone; mutations through it
/// skip the name lookup.
#[derive(Clone)]
pub struct MetricHandle(Arc<Family>);

impl MetricHandle {
    pub fn descriptor(&self) -> &MetricDescriptor {
        &self.0.desc
    }

    pub fn name(&self) -> &str {
        &self.0.desc.name
    }

    pub fn kind(&self) -> MetricKind {
        self.0.desc.kind
    }
}

impl fmt::Debug for MetricHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricHandle")
            .field("name", &self.0.desc.name)
            .field("kind", &self.0.desc.kind)
            .finish()
    }
}

/// One observed series in a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub labels: LabelSet,
    pub value: f64,
}

/// One metric and its observed series.
#[derive(Debug, Clone)]
pub struct FamilySnapshot {
    pub descriptor: Arc<MetricDescriptor>,
    pub samples: Vec<Sample>,
}

/// Point-in-time view of the registry, per-series consistent.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub families: Vec<FamilySnapshot>,
}

impl Snapshot {
    pub fn family(&self, name: &str) -> Option<&FamilySnapshot> {
        self.families.iter().find(|f| f.descriptor.name == name)
    }
}

/// Process-local metric registry. Construct once at startup and share via `Arc`.
#[derive(Default)]
pub struct Registry {
    families: DashMap<String, Arc<Family>>,
    seq: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new instrument.
    ///
    /// Fails with `DuplicateMetric` when the name is taken and `InvalidName` when
    /// the metric or a label name is not a valid exposition identifier. Metrics
    /// without labels start with a single zero-valued series.
    pub fn declare(
        &self,
        name: &str,
        help: &str,
        kind: MetricKind,
        label_names: &[&str],
    ) -> Result<MetricHandle> {
        validate_metric_name(name)?;
        validate_label_names(name, label_names)?;

        match self.families.entry(name.to_string()) {
            Entry::Occupied(_) => Err(TallyError::DuplicateMetric(name.to_string())),
            Entry::Vacant(slot) => {
                let family = Arc::new(Family {
                    seq: self.seq.fetch_add(1, Ordering::Relaxed),
                    desc: Arc::new(MetricDescriptor {
                        name: name.to_string(),
                        help: help.to_string(),
                        kind,
                        label_names: label_names.iter().map(|l| l.to_string()).collect(),
                    }),
                    series: DashMap::new(),
                });
                if label_names.is_empty() {
                    family.series.insert(LabelSet::default(), AtomicF64::default());
                }
                slot.insert(Arc::clone(&family));
                tracing::debug!(metric = %name, %kind, labels = label_names.len(), "metric declared");
                Ok(MetricHandle(family))
            }
        }
    }

    /// Look up a previously declared metric by name.
    pub fn handle(&self, name: &str) -> Option<MetricHandle> {
        self.families
            .get(name)
            .map(|f| MetricHandle(Arc::clone(f.value())))
    }

    /// Number of declared metrics.
    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Increment by 1.
    pub fn inc(&self, handle: &MetricHandle, label_values: &[&str]) -> Result<()> {
        self.increment(handle, label_values, 1.0)
    }

    /// Add a non-negative delta to a counter series.
    pub fn increment(&self, handle: &MetricHandle, label_values: &[&str], delta: f64) -> Result<()> {
        let family = &handle.0;
        family.expect_kind(MetricKind::Counter)?;
        if delta.is_nan() || delta < 0.0 {
            return Err(TallyError::InvalidDelta {
                metric: family.desc.name.clone(),
                delta,
            });
        }
        let key = family.key(label_values)?;
        family.with_series(key, |cell| cell.add(delta));
        Ok(())
    }

    /// Overwrite a gauge series.
    pub fn set(&self, handle: &MetricHandle, label_values: &[&str], value: f64) -> Result<()> {
        let family = &handle.0;
        family.expect_kind(MetricKind::Gauge)?;
        let key = family.key(label_values)?;
        family.with_series(key, |cell| cell.store(value));
        Ok(())
    }

    /// Current value of one series, `None` if it was never observed.
    pub fn get(&self, handle: &MetricHandle, label_values: &[&str]) -> Result<Option<f64>> {
        let family = &handle.0;
        let key = family.key(label_values)?;
        Ok(family.series.get(&key).map(|cell| cell.value().load()))
    }

    /// Metrics in declaration order; series sorted by label values.
    pub fn snapshot(&self) -> Snapshot {
        let mut families: Vec<Arc<Family>> =
            self.families.iter().map(|e| Arc::clone(e.value())).collect();
        families.sort_by_key(|f| f.seq);

        let families = families
            .iter()
            .map(|family| {
                let mut samples: Vec<Sample> = family
                    .series
                    .iter()
                    .map(|e| Sample {
                        labels: e.key().clone(),
                        value: e.value().load(),
                    })
                    .collect();
                samples.sort_by(|a, b| a.labels.cmp(&b.labels));
                FamilySnapshot {
                    descriptor: Arc::clone(&family.desc),
                    samples,
                }
            })
            .collect();

        Snapshot { families }
    }
}

fn validate_metric_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let head_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':');
    if !head_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':') {
        return Err(TallyError::InvalidName(format!("metric name {name:?}")));
    }
    Ok(())
}

fn validate_label_names(metric: &str, label_names: &[&str]) -> Result<()> {
    for (i, label) in label_names.iter().enumerate() {
        let mut chars = label.chars();
        let head_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        if !head_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(TallyError::InvalidName(format!(
                "label name {label:?} on {metric}"
            )));
        }
        if label.starts_with("__") {
            return Err(TallyError::InvalidName(format!(
                "label name {label:?} on {metric} is reserved"
            )));
        }
        if label_names[..i].contains(label) {
            return Err(TallyError::InvalidName(format!(
                "duplicate label name {label:?} on {metric}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use super::*;

    fn requests(reg: &Registry) -> MetricHandle {
        reg.declare(
            "http_requests_total",
            "Total HTTP Requests (count)",
            MetricKind::Counter,
            &["method", "path"],
        )
        .unwrap()
    }

    #[test]
    fn counter_sums_deltas() {
        let reg = Registry::new();
        let c = requests(&reg);
        for d in [1.0, 0.0, 2.5, 0.5] {
            reg.increment(&c, &["GET", "/"], d).unwrap();
        }
        assert_eq!(reg.get(&c, &["GET", "/"]).unwrap(), Some(4.0));
        assert_eq!(reg.get(&c, &["POST", "/"]).unwrap(), None);
    }

    #[test]
    fn negative_or_nan_delta_leaves_series_untouched() {
        let reg = Registry::new();
        let c = requests(&reg);
        reg.inc(&c, &["GET", "/"]).unwrap();

        let err = reg.increment(&c, &["GET", "/"], -1.0).unwrap_err();
        assert!(matches!(err, TallyError::InvalidDelta { .. }));
        let err = reg.increment(&c, &["GET", "/x"], f64::NAN).unwrap_err();
        assert!(matches!(err, TallyError::InvalidDelta { .. }));

        assert_eq!(reg.get(&c, &["GET", "/"]).unwrap(), Some(1.0));
        assert_eq!(reg.get(&c, &["GET", "/x"]).unwrap(), None);
    }

    #[test]
    fn gauge_last_write_wins() {
        let reg = Registry::new();
        let g = reg
            .declare("custom_gauge", "An example gauge metric", MetricKind::Gauge, &[])
            .unwrap();
        assert_eq!(reg.get(&g, &[]).unwrap(), Some(0.0));

        for v in [5.0, -3.0, 2.5] {
            reg.set(&g, &[], v).unwrap();
        }
        assert_eq!(reg.get(&g, &[]).unwrap(), Some(2.5));
    }

    #[test]
    fn duplicate_declare_keeps_first() {
        let reg = Registry::new();
        let c = requests(&reg);
        reg.inc(&c, &["GET", "/"]).unwrap();

        let err = reg
            .declare("http_requests_total", "other", MetricKind::Gauge, &[])
            .unwrap_err();
        assert!(matches!(err, TallyError::DuplicateMetric(ref n) if n == "http_requests_total"));

        let again = reg.handle("http_requests_total").unwrap();
        assert_eq!(again.kind(), MetricKind::Counter);
        assert_eq!(again.descriptor().help, "Total HTTP Requests (count)");
        assert_eq!(reg.get(&again, &["GET", "/"]).unwrap(), Some(1.0));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        let reg = Registry::new();
        let c = requests(&reg);
        let err = reg.inc(&c, &["GET"]).unwrap_err();
        assert!(matches!(
            err,
            TallyError::LabelArityMismatch { expected: 2, got: 1, .. }
        ));
        assert!(reg.snapshot().family("http_requests_total").unwrap().samples.is_empty());
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let reg = Registry::new();
        let c = requests(&reg);
        let g = reg.declare("temp", "t", MetricKind::Gauge, &[]).unwrap();

        assert!(matches!(
            reg.set(&c, &["GET", "/"], 1.0).unwrap_err(),
            TallyError::KindMismatch { expected: MetricKind::Gauge, .. }
        ));
        assert!(matches!(
            reg.inc(&g, &[]).unwrap_err(),
            TallyError::KindMismatch { expected: MetricKind::Counter, .. }
        ));
    }

    #[test]
    fn invalid_names_are_rejected() {
        let reg = Registry::new();
        for name in ["", "1abc", "has-dash", "sp ace"] {
            assert!(matches!(
                reg.declare(name, "", MetricKind::Counter, &[]),
                Err(TallyError::InvalidName(_))
            ));
        }
        let bad_labels: [&[&str]; 4] = [&["__reserved"], &["a:b"], &["dup", "dup"], &["9"]];
        for labels in bad_labels {
            assert!(matches!(
                reg.declare("ok_total", "", MetricKind::Counter, labels),
                Err(TallyError::InvalidName(_))
            ));
        }
        assert!(reg.declare("ns:ok_total", "", MetricKind::Counter, &["_x"]).is_ok());
    }

    #[test]
    fn snapshot_orders_metrics_by_declaration_and_series_by_labels() {
        let reg = Registry::new();
        let z = reg.declare("zz", "", MetricKind::Gauge, &["k"]).unwrap();
        let a = reg.declare("aa", "", MetricKind::Counter, &["k"]).unwrap();
        reg.set(&z, &["b"], 1.0).unwrap();
        reg.set(&z, &["a"], 2.0).unwrap();
        reg.inc(&a, &["x"]).unwrap();

        let snap = reg.snapshot();
        let names: Vec<&str> = snap
            .families
            .iter()
            .map(|f| f.descriptor.name.as_str())
            .collect();
        assert_eq!(names, ["zz", "aa"]);

        let zz: Vec<&str> = snap.families[0]
            .samples
            .iter()
            .map(|s| s.labels.values()[0].as_str())
            .collect();
        assert_eq!(zz, ["a", "b"]);
    }

    #[test]
    fn label_pairs_follow_declared_names() {
        let reg = Registry::new();
        let c = requests(&reg);
        reg.inc(&c, &["GET", "/"]).unwrap();
        let snap = reg.snapshot();
        let fam = snap.family("http_requests_total").unwrap();
        let pairs: Vec<(&str, &str)> = fam.samples[0].labels.pairs(&fam.descriptor).collect();
        assert_eq!(pairs, [("method", "GET"), ("path", "/")]);
    }
}
