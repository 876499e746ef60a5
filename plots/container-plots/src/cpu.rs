use std::{
    io::Write,
    path::{Path, PathBuf},
};

use common::{
    aggregate::by_runtime,
    chart::{BarChart, SINGLE, draw_bars, render},
    report::{Report, ReportContext},
    table::load_table,
};
use eyre::Result;
use serde::{Deserialize, Serialize};

use crate::{runtime_entries, write_means};

/// CPU-bound loop timed through a full container run, per runtime
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Cpu;

pub(crate) const TABLE: &str = "cpu";

#[typetag::serde]
impl Report for Cpu {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn inputs(&self) -> &'static [&'static str] {
        &[TABLE]
    }

    fn plot(&self, ctx: &ReportContext<'_>) -> Result<Option<[PathBuf; 2]>> {
        let means = by_runtime(&load_table(ctx.results_dir, TABLE), "value");
        if means.is_empty() {
            return Ok(None);
        }

        let chart = BarChart::simple(
            "CPU Benchmark (count to 10M)",
            "Time (seconds)",
            &runtime_entries(&means),
            |v| format!("{v:.2}s"),
        );
        ctx.writer
            .publish("cpu_comparison.png", |path| {
                render(path, SINGLE, 1, |root, areas| draw_bars(root, &areas[0], &chart))
            })
            .map(Some)
    }

    fn summary(&self, results_dir: &Path, out: &mut dyn Write) -> Result<()> {
        let rows = load_table(results_dir, TABLE);
        if rows.is_empty() {
            return Ok(());
        }
        write_means(out, "CPU (count to 10M):", &by_runtime(&rows, "value"), 2, "s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{summary_of, write_table};

    #[test]
    fn summary_two_decimals() {
        let dir = tempfile::tempdir().unwrap();
        write_table(
            dir.path(),
            TABLE,
            "runtime,value\npodman,1.5\nbare,1.25\nbare,1.35\nkata,n/a\n",
        );
        let summary = summary_of(&Cpu, dir.path());
        assert_eq!(
            summary,
            "\nCPU (count to 10M):\n  Bare Metal          1.30 s\n  Podman              1.50 s\n"
        );
    }

    #[test]
    fn heading_printed_when_rows_unparseable() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), TABLE, "runtime,value\nbare,oops\n");
        assert_eq!(summary_of(&Cpu, dir.path()), "\nCPU (count to 10M):\n");
    }
}
