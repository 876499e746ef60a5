use std::{
    io::Write,
    path::{Path, PathBuf},
};

use common::{
    aggregate::{Aggregate, by_runtime},
    chart::{BarChart, BarSeries, DOUBLE, FAILURE, SINGLE, SUCCESS, draw_bars, render},
    report::{Report, ReportContext},
    runtime::{BASELINE, COMPARED, label},
    table::load_table,
};
use eyre::Result;
use serde::{Deserialize, Serialize};

use crate::{cpu, runtime_entries, write_means};

/// CPU loop timed through `exec` into a running container, so without
/// container startup, compared against the `run` timings
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CpuExec;

const TABLE: &str = "cpu_exec";

#[derive(Debug, Clone, PartialEq)]
struct Overhead {
    runtime: &'static str,
    run_pct: f64,
    exec_pct: f64,
}

/// Slowdown relative to bare metal, in percent, for the compared runtimes
/// present in both tables. Empty without a usable baseline.
fn overheads(exec: &Aggregate<String>, run: &Aggregate<String>) -> Vec<Overhead> {
    let (Some(bare_run), Some(bare_exec)) = (run.get(BASELINE), exec.get(BASELINE)) else {
        return Vec::new();
    };
    if bare_run == 0.0 || bare_exec == 0.0 {
        return Vec::new();
    }
    COMPARED
        .keys()
        .iter()
        .filter_map(|&runtime| {
            Some(Overhead {
                runtime,
                run_pct: (run.get(runtime)? - bare_run) / bare_run * 100.0,
                exec_pct: (exec.get(runtime)? - bare_exec) / bare_exec * 100.0,
            })
        })
        .collect()
}

#[typetag::serde]
impl Report for CpuExec {
    fn name(&self) -> &'static str {
        "cpu_exec"
    }

    fn inputs(&self) -> &'static [&'static str] {
        &[TABLE, cpu::TABLE]
    }

    fn plot(&self, ctx: &ReportContext<'_>) -> Result<Option<[PathBuf; 2]>> {
        let exec = by_runtime(&load_table(ctx.results_dir, TABLE), "value");
        if exec.is_empty() {
            return Ok(None);
        }
        let run = by_runtime(&load_table(ctx.results_dir, cpu::TABLE), "value");

        let times = BarChart::simple(
            "Pure CPU (exec, count to 1M)",
            "Time (seconds)",
            &runtime_entries(&exec),
            |v| format!("{v:.2}s"),
        );

        let overheads = overheads(&exec, &run);
        let comparison = BarChart::grouped(
            "CPU Overhead: run vs exec",
            "Overhead (%)",
            overheads.iter().map(|o| label(o.runtime).to_owned()).collect(),
            &[
                BarSeries {
                    name: "run (with startup)".to_owned(),
                    color: FAILURE,
                    values: overheads.iter().map(|o| Some(o.run_pct)).collect(),
                },
                BarSeries {
                    name: "exec (no startup)".to_owned(),
                    color: SUCCESS,
                    values: overheads.iter().map(|o| Some(o.exec_pct)).collect(),
                },
            ],
            0.35,
            |v| format!("{v:.1}%"),
        );

        ctx.writer
            .publish("cpu_exec_comparison.png", |path| {
                if comparison.is_empty() {
                    render(path, SINGLE, 1, |root, areas| draw_bars(root, &areas[0], &times))
                } else {
                    render(path, DOUBLE, 2, |root, areas| {
                        draw_bars(root, &areas[0], &times)?;
                        draw_bars(root, &areas[1], &comparison)
                    })
                }
            })
            .map(Some)
    }

    fn summary(&self, results_dir: &Path, out: &mut dyn Write) -> Result<()> {
        let rows = load_table(results_dir, TABLE);
        if rows.is_empty() {
            return Ok(());
        }
        write_means(
            out,
            "CPU Exec (count to 1M, no startup):",
            &by_runtime(&rows, "value"),
            4,
            "s",
        )
    }
}

#[cfg(test)]
mod tests {
    use common::table::Record;

    use super::*;
    use crate::testutil::{plot_into, summary_of, write_table};

    fn means(data: &[(&str, &str)]) -> Aggregate<String> {
        let rows = data
            .iter()
            .map(|(rt, v)| [("runtime", *rt), ("value", *v)].into_iter().collect())
            .collect::<Vec<Record>>();
        by_runtime(&rows, "value")
    }

    #[test]
    fn overhead_relative_to_bare() {
        let run = means(&[("bare", "2.0"), ("docker", "3.0"), ("podman", "2.5")]);
        let exec = means(&[("bare", "1.0"), ("docker", "1.1")]);
        assert_eq!(
            overheads(&exec, &run),
            [Overhead {
                runtime: "docker",
                run_pct: 50.0,
                exec_pct: (1.1 - 1.0) / 1.0 * 100.0,
            }]
        );
    }

    #[test]
    fn no_baseline_no_overhead() {
        let run = means(&[("docker", "3.0")]);
        let exec = means(&[("bare", "1.0"), ("docker", "1.1")]);
        assert!(overheads(&exec, &run).is_empty());
        assert!(overheads(&exec, &means(&[("bare", "0"), ("docker", "1")])).is_empty());
    }

    #[test]
    fn summary_four_decimals() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), TABLE, "runtime,value\ndocker,0.01234\n");
        assert_eq!(
            summary_of(&CpuExec, dir.path()),
            "\nCPU Exec (count to 1M, no startup):\n  Docker            0.0123 s\n"
        );
    }

    #[test]
    fn renders_without_run_table() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), TABLE, "runtime,value\nbare,0.5\npodman,0.6\n");
        let Some(written) = plot_into(&CpuExec, dir.path()) else {
            return;
        };
        assert!(written.is_some());
    }
}
