use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    str::FromStr,
};

use csv::{ReaderBuilder, Trim};
use tracing::{debug, warn};

/// One row of a results table, keyed by the header names
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Record(HashMap<String, String>);

impl Record {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    /// Parses a column, `None` if it is missing or does not parse
    pub fn parse<T: FromStr>(&self, column: &str) -> Option<T> {
        self.get(column)?.parse().ok()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

pub fn table_path(results_dir: &Path, name: &str) -> PathBuf {
    results_dir.join(format!("{name}.csv"))
}

/// Reads `<results_dir>/<name>.csv`.
///
/// Never fails: a missing or unreadable file yields no records, rows that
/// cannot be decoded are skipped.
pub fn load_table(results_dir: &Path, name: &str) -> Vec<Record> {
    let path = table_path(results_dir, name);
    if !path.exists() {
        warn!("Input not found: {}", path.display());
        return Vec::new();
    }

    let mut reader = match ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_path(&path)
    {
        Ok(reader) => reader,
        Err(err) => {
            warn!("Could not open {}: {err}", path.display());
            return Vec::new();
        }
    };

    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(err) => {
            warn!("Could not read header of {}: {err}", path.display());
            return Vec::new();
        }
    };

    // Short rows keep the columns they have
    let records = reader
        .records()
        .enumerate()
        .filter_map(|(idx, row)| match row {
            Ok(row) => Some(headers.iter().zip(row.iter()).collect::<Record>()),
            Err(err) => {
                debug!("Skipping row {} of {}: {err}", idx + 1, path.display());
                None
            }
        })
        .collect::<Vec<_>>();
    debug!("Read {} rows from {}", records.len(), path.display());
    records
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn missing_table_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_table(dir.path(), "startup").is_empty());
    }

    #[test]
    fn reads_rows_by_header() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("io.csv"),
            "runtime,mode,mb_per_sec\nbare,direct,512.5\ndocker, overlay ,300\n",
        )
        .unwrap();

        let rows = load_table(dir.path(), "io");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("runtime"), Some("bare"));
        assert_eq!(rows[0].parse::<f64>("mb_per_sec"), Some(512.5));
        assert_eq!(rows[1].get("mode"), Some("overlay"));
    }

    #[test]
    fn short_rows_lose_columns() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("startup.csv"),
            "runtime,value\nbare,100\ndocker\n",
        )
        .unwrap();

        let rows = load_table(dir.path(), "startup");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("runtime"), Some("docker"));
        assert_eq!(rows[1].parse::<f64>("value"), None);
    }

    #[test]
    fn parse_rejects_garbage() {
        let record: Record = [("runtime", "bare"), ("value", "bad")].into_iter().collect();
        assert_eq!(record.parse::<f64>("value"), None);
        assert_eq!(record.parse::<f64>("missing"), None);
    }
}
