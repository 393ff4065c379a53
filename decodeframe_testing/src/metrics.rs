//! Lookups over `metrics_util` debugging snapshots.

use metrics_util::debugging::{DebugValue, Snapshot};

type Entry = (
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
);

/// Flatten a snapshot for repeated lookups.
#[must_use]
pub fn recorded(snapshot: Snapshot) -> Vec<Entry> { snapshot.into_vec() }

fn matches(entry: &Entry, name: &str, label: Option<(&str, &str)>) -> bool {
    let key = entry.0.key();
    key.name() == name
        && label.is_none_or(|(k, v)| key.labels().any(|l| l.key() == k && l.value() == v))
}

/// Sum of counter `name`, optionally restricted to one label pair.
#[must_use]
pub fn counter_value(entries: &[Entry], name: &str, label: Option<(&str, &str)>) -> u64 {
    entries
        .iter()
        .filter(|entry| matches(entry, name, label))
        .filter_map(|entry| match entry.3 {
            DebugValue::Counter(value) => Some(value),
            _ => None,
        })
        .sum()
}

/// Current value of gauge `name`, if it was ever touched.
#[must_use]
pub fn gauge_value(entries: &[Entry], name: &str) -> Option<f64> {
    entries.iter().find(|entry| matches(entry, name, None)).and_then(|entry| match entry.3 {
        DebugValue::Gauge(value) => Some(value.into_inner()),
        _ => None,
    })
}
