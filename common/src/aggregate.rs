use std::hash::Hash;

use indexmap::IndexMap;

use crate::{runtime::Priority, table::Record};

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn value(&self) -> f64 {
        self.sum / self.count as f64
    }
}

/// Group key -> mean of every value collected for that key.
///
/// Keys keep the order they were first seen in.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate<K: Hash + Eq> {
    groups: IndexMap<K, Mean>,
}

impl<K: Hash + Eq> Default for Aggregate<K> {
    fn default() -> Self {
        Self {
            groups: IndexMap::new(),
        }
    }
}

impl<K: Hash + Eq> Aggregate<K> {
    pub fn push(&mut self, key: K, value: f64) {
        self.groups.entry(key).or_default().push(value);
    }

    pub fn get<Q>(&self, key: &Q) -> Option<f64>
    where
        Q: Hash + indexmap::Equivalent<K> + ?Sized,
    {
        self.groups.get(key).map(Mean::value)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.groups.keys()
    }

    /// Keys with their means, in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> {
        self.groups.iter().map(|(k, m)| (k, m.value()))
    }

    /// Stable sort by `rank`; unranked keys go last in first-seen order
    pub fn ordered_by<F>(&self, rank: F) -> Vec<(&K, f64)>
    where
        F: Fn(&K) -> Option<usize>,
    {
        let mut entries = self.iter().collect::<Vec<_>>();
        entries.sort_by_key(|(k, _)| rank(k).unwrap_or(usize::MAX));
        entries
    }
}

impl Aggregate<String> {
    pub fn ordered(&self, priority: &Priority) -> Vec<(&str, f64)> {
        self.ordered_by(|k| priority.rank(k))
            .into_iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect()
    }
}

/// Groups `records` by `key` and averages `value` within each group.
///
/// A record is dropped when either extractor returns `None`, so missing or
/// malformed values never count as zero.
pub fn group_mean<'a, K, I, FK, FV>(records: I, key: FK, value: FV) -> Aggregate<K>
where
    K: Hash + Eq,
    I: IntoIterator<Item = &'a Record>,
    FK: Fn(&Record) -> Option<K>,
    FV: Fn(&Record) -> Option<f64>,
{
    let mut aggregate = Aggregate::default();
    for record in records {
        let (Some(k), Some(v)) = (key(record), value(record)) else {
            continue;
        };
        aggregate.push(k, v);
    }
    aggregate
}

/// Key extractor for a single string column
pub fn column(name: &'static str) -> impl Fn(&Record) -> Option<String> {
    move |record| record.get(name).map(str::to_owned)
}

/// Value extractor for a single numeric column
pub fn numeric(name: &'static str) -> impl Fn(&Record) -> Option<f64> {
    move |record| record.parse::<f64>(name).filter(|v| v.is_finite())
}

/// Mean of `value_column` per runtime
pub fn by_runtime(records: &[Record], value_column: &'static str) -> Aggregate<String> {
    group_mean(records, column("runtime"), numeric(value_column))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RUNTIMES;

    fn rows(data: &[(&str, &str)]) -> Vec<Record> {
        data.iter()
            .map(|(runtime, value)| {
                [("runtime", *runtime), ("value", *value)]
                    .into_iter()
                    .collect()
            })
            .collect()
    }

    #[test]
    fn mean_per_key() {
        let records = rows(&[("bare", "100"), ("bare", "120"), ("bare", "110")]);
        let agg = by_runtime(&records, "value");
        assert_eq!(agg.len(), 1);
        assert_eq!(agg.get("bare"), Some(110.0));
    }

    #[test]
    fn malformed_values_are_excluded() {
        let records = rows(&[("bare", "100"), ("bare", "bad"), ("docker", "")]);
        let agg = by_runtime(&records, "value");
        assert_eq!(agg.get("bare"), Some(100.0));
        assert_eq!(agg.get("docker"), None);
        assert_eq!(agg.len(), 1);
    }

    #[test]
    fn missing_key_column_is_excluded() {
        let mut records = rows(&[("bare", "100")]);
        records.push([("value", "5")].into_iter().collect());
        let agg = by_runtime(&records, "value");
        assert_eq!(agg.keys().collect::<Vec<_>>(), ["bare"]);
    }

    #[test]
    fn empty_input_is_empty() {
        let agg = by_runtime(&[], "value");
        assert!(agg.is_empty());
    }

    #[test]
    fn startup_example_ordering() {
        let records = rows(&[
            ("podman", "130"),
            ("docker", "150"),
            ("bare", "100"),
            ("docker", "170"),
        ]);
        let agg = by_runtime(&records, "value");
        assert_eq!(
            agg.ordered(&RUNTIMES),
            [("bare", 100.0), ("docker", 160.0), ("podman", 130.0)]
        );
    }

    #[test]
    fn composite_keys() {
        let records: Vec<Record> = [
            [("runtime", "docker"), ("mode", "overlay"), ("mb_per_sec", "200")],
            [("runtime", "docker"), ("mode", "overlay"), ("mb_per_sec", "300")],
            [("runtime", "docker"), ("mode", "volume"), ("mb_per_sec", "400")],
        ]
        .into_iter()
        .map(|row| row.into_iter().collect())
        .collect();
        let agg = group_mean(
            &records,
            |r| Some((r.get("runtime")?.to_owned(), r.get("mode")?.to_owned())),
            numeric("mb_per_sec"),
        );
        assert_eq!(agg.get(&("docker".to_owned(), "overlay".to_owned())), Some(250.0));
        assert_eq!(agg.get(&("docker".to_owned(), "volume".to_owned())), Some(400.0));
    }
}
