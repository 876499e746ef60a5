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

/// Mean container startup latency per runtime
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Startup;

pub(crate) const TABLE: &str = "startup";

#[typetag::serde]
impl Report for Startup {
    fn name(&self) -> &'static str {
        "startup"
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
            "Startup Latency",
            "Time (ms)",
            &runtime_entries(&means),
            |v| format!("{v:.1} ms"),
        );
        ctx.writer
            .publish("startup_comparison.png", |path| {
                render(path, SINGLE, 1, |root, areas| draw_bars(root, &areas[0], &chart))
            })
            .map(Some)
    }

    fn summary(&self, results_dir: &Path, out: &mut dyn Write) -> Result<()> {
        let rows = load_table(results_dir, TABLE);
        if rows.is_empty() {
            return Ok(());
        }
        write_means(out, "Startup Latency:", &by_runtime(&rows, "value"), 1, "ms")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{plot_into, plot_without_font, summary_of, write_table};

    #[test]
    fn summary_in_runtime_order() {
        let dir = tempfile::tempdir().unwrap();
        write_table(
            dir.path(),
            TABLE,
            "runtime,value\nbare,100\ndocker,150\ndocker,170\npodman,130\n",
        );

        let summary = summary_of(&Startup, dir.path());
        let lines = summary.lines().collect::<Vec<_>>();
        assert_eq!(
            lines,
            [
                "",
                "Startup Latency:",
                "  Bare Metal         100.0 ms",
                "  Docker             160.0 ms",
                "  Podman             130.0 ms",
            ]
        );
    }

    #[test]
    fn absent_table_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(plot_without_font(&Startup, dir.path()).is_none());
        assert!(summary_of(&Startup, dir.path()).is_empty());
        assert!(!dir.path().join("images").exists());
    }

    #[test]
    fn unparseable_rows_only_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), TABLE, "runtime,value\nbare,n/a\n");
        assert!(plot_without_font(&Startup, dir.path()).is_none());
    }

    #[test]
    fn chart_lands_in_both_directories() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), TABLE, "runtime,value\nbare,100\ndocker,150\n");
        let Some(written) = plot_into(&Startup, dir.path()) else {
            return;
        };
        let [a, b] = written.unwrap();
        assert_eq!(a, dir.path().join("startup_comparison.png"));
        assert_eq!(std::fs::read(a).unwrap(), std::fs::read(b).unwrap());
    }
}
