use std::{
    io::Write,
    path::{Path, PathBuf},
};

use common::{
    chart::{Bar, BarChart, Category, FAILURE, ROW, SUCCESS, draw_bars, render},
    report::{Report, ReportContext},
    table::{Record, load_table},
};
use eyre::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Outcome of each approach to running containers inside containers
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct NestedV2;

const TABLE: &str = "nested_v2";
const SUCCESS_RESULT: &str = "success";
/// Height of the marker bar drawn for approaches that did not succeed
const FAILED_BAR: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
struct Attempt<'a> {
    runtime: &'a str,
    approach: &'a str,
    result: &'a str,
    /// Only set for successful attempts
    time_seconds: Option<f64>,
}

/// A successful attempt without a usable time is dropped, failed attempts
/// need no time
fn attempt(record: &Record) -> Option<Attempt<'_>> {
    let result = record.get("result")?;
    let time_seconds = if result == SUCCESS_RESULT {
        Some(record.parse::<f64>("time_seconds").filter(|t| t.is_finite())?)
    } else {
        None
    };
    Some(Attempt {
        runtime: record.get("runtime")?,
        approach: record.get("approach")?,
        result,
        time_seconds,
    })
}

fn chart(attempts: &[Attempt<'_>]) -> BarChart {
    let mut chart = BarChart {
        title: format!("Nested Containers: {} Approaches", attempts.len()),
        y_desc: "Time (seconds)".to_owned(),
        legend: vec![
            ("Success".to_owned(), SUCCESS),
            ("Error/Skipped".to_owned(), FAILURE),
        ],
        ..Default::default()
    };
    for (idx, attempt) in attempts.iter().enumerate() {
        let x = idx as f64;
        chart.categories.push(Category {
            x,
            lines: vec![attempt.runtime.to_owned(), attempt.approach.to_owned()],
        });
        chart.bars.push(match attempt.time_seconds {
            Some(time) => Bar {
                x,
                width: 0.8,
                value: time,
                color: SUCCESS,
                label: format!("{time:.1}s"),
                label_color: SUCCESS,
            },
            None => Bar {
                x,
                width: 0.8,
                value: FAILED_BAR,
                color: FAILURE,
                label: attempt.result.to_uppercase(),
                label_color: FAILURE,
            },
        });
    }
    chart
}

#[typetag::serde]
impl Report for NestedV2 {
    fn name(&self) -> &'static str {
        "nested_v2"
    }

    fn inputs(&self) -> &'static [&'static str] {
        &[TABLE]
    }

    fn plot(&self, ctx: &ReportContext<'_>) -> Result<Option<[PathBuf; 2]>> {
        let rows = load_table(ctx.results_dir, TABLE);
        let attempts = rows.iter().filter_map(attempt).collect::<Vec<_>>();
        debug!("{} of {} nested attempts usable", attempts.len(), rows.len());
        if attempts.is_empty() {
            return Ok(None);
        }

        let chart = chart(&attempts);
        ctx.writer
            .publish("nested_v2_comparison.png", |path| {
                render(path, ROW, 1, |root, areas| draw_bars(root, &areas[0], &chart))
            })
            .map(Some)
    }

    fn summary(&self, results_dir: &Path, out: &mut dyn Write) -> Result<()> {
        let rows = load_table(results_dir, TABLE);
        if rows.is_empty() {
            return Ok(());
        }
        writeln!(out, "\nNested v2:")?;
        for row in &rows {
            let (Some(runtime), Some(approach), Some(result)) =
                (row.get("runtime"), row.get("approach"), row.get("result"))
            else {
                continue;
            };
            let symbol = if result == SUCCESS_RESULT { "✓" } else { "✗" };
            let time = row.get("time_seconds").unwrap_or_default();
            writeln!(out, "  {symbol} {runtime}/{approach}: {result} ({time}s)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{plot_into, summary_of, write_table};

    const BODY: &str = "runtime,approach,result,time_seconds\n\
        docker,dind,success,12.34\n\
        podman,rootless,error,\n\
        docker,socket,success,fast\n\
        podman,privileged,skipped,0\n";

    #[test]
    fn failed_attempts_get_marker_bars() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), TABLE, BODY);
        let rows = load_table(dir.path(), TABLE);
        let attempts = rows.iter().filter_map(attempt).collect::<Vec<_>>();
        assert_eq!(attempts.len(), 3);

        let chart = chart(&attempts);
        assert_eq!(chart.title, "Nested Containers: 3 Approaches");
        let labels = chart.bars.iter().map(|b| b.label.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, ["12.3s", "ERROR", "SKIPPED"]);
        assert_eq!(chart.bars[1].value, FAILED_BAR);
        assert_eq!(chart.categories[2].lines, ["podman", "privileged"]);
    }

    #[test]
    fn summary_marks_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), TABLE, BODY);
        assert_eq!(
            summary_of(&NestedV2, dir.path()),
            "\nNested v2:\n\
             \x20 ✓ docker/dind: success (12.34s)\n\
             \x20 ✗ podman/rootless: error (s)\n\
             \x20 ✓ docker/socket: success (fasts)\n\
             \x20 ✗ podman/privileged: skipped (0s)\n"
        );
    }

    #[test]
    fn renders_attempts() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), TABLE, BODY);
        if let Some(written) = plot_into(&NestedV2, dir.path()) {
            assert!(written.is_some());
        }
    }
}
