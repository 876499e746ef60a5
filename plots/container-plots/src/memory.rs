use std::path::PathBuf;

use common::{
    aggregate::{group_mean, numeric},
    chart::{BarChart, BarSeries, WIDE, draw_bars, render, runtime_color},
    report::{Report, ReportContext},
    runtime::{COMPARED, label},
    table::load_table,
};
use eyre::Result;
use serde::{Deserialize, Serialize};

use crate::sorted_counts;

/// Memory overhead of N running containers, docker vs podman
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Memory;

const TABLE: &str = "memory";

/// Container count of an overhead metric, `containers_5_overhead_mb` -> `5`.
///
/// `None` for metrics that are not overheads, `?` when the name carries no count.
fn overhead_count(metric: &str) -> Option<&str> {
    if !metric.contains("overhead") {
        return None;
    }
    let parts = metric.split('_').collect::<Vec<_>>();
    Some(if parts.len() >= 3 { parts[1] } else { "?" })
}

#[typetag::serde]
impl Report for Memory {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn inputs(&self) -> &'static [&'static str] {
        &[TABLE]
    }

    fn plot(&self, ctx: &ReportContext<'_>) -> Result<Option<[PathBuf; 2]>> {
        let rows = load_table(ctx.results_dir, TABLE);
        let overhead = group_mean(
            &rows,
            |r| {
                let count = overhead_count(r.get("metric")?)?;
                Some((r.get("runtime")?.to_owned(), count.to_owned()))
            },
            numeric("value"),
        );
        if overhead.is_empty() {
            return Ok(None);
        }

        let counts = sorted_counts(overhead.keys().map(|(_, c)| c.as_str()));
        let series = COMPARED
            .only(overhead.keys().map(|(rt, _)| rt.as_str()))
            .into_iter()
            .map(|runtime| BarSeries {
                name: label(runtime).to_owned(),
                color: runtime_color(runtime),
                values: counts
                    .iter()
                    .map(|c| overhead.get(&(runtime.to_owned(), c.clone())))
                    .collect(),
            })
            .collect::<Vec<_>>();

        let chart = BarChart::grouped(
            "Memory Overhead by Container Count",
            "Overhead (MB)",
            counts.iter().map(|c| format!("{c} containers")).collect(),
            &series,
            0.35,
            |v| format!("{v:.0}"),
        );
        if chart.is_empty() {
            return Ok(None);
        }
        ctx.writer
            .publish("memory_comparison.png", |path| {
                render(path, WIDE, 1, |root, areas| draw_bars(root, &areas[0], &chart))
            })
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{plot_without_font, write_table};

    #[test]
    fn count_from_metric_name() {
        assert_eq!(overhead_count("containers_5_overhead_mb"), Some("5"));
        assert_eq!(overhead_count("overhead_mb"), Some("?"));
        assert_eq!(overhead_count("baseline_used_mb"), None);
    }

    #[test]
    fn bare_only_draws_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_table(
            dir.path(),
            TABLE,
            "runtime,metric,value\nbare,containers_1_overhead_mb,12\ndocker,baseline_mb,900\n",
        );
        assert!(plot_without_font(&Memory, dir.path()).is_none());
    }
}
