use std::{
    io::Write,
    path::{Path, PathBuf},
};

use common::{
    KB_PER_MB,
    aggregate::{Aggregate, group_mean, numeric},
    chart::{
        BarChart, BarSeries, DOUBLE, Line, LineChart, WIDE, draw_bars, draw_lines, render,
        runtime_color,
    },
    report::{Report, ReportContext},
    runtime::{COMPARED, label},
    table::{Record, load_table},
};
use eyre::Result;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Per-container cgroup memory and the RSS of the daemon (docker) or
/// conmon monitors (podman) as containers are added
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MemoryCgroup;

const TABLE: &str = "memory_cgroup";
const PER_CONTAINER: &str = "per_container_kb";
const DAEMON_RSS: &[&str] = &["daemon_rss_kb", "conmon_rss_kb"];

type ByCount = Aggregate<(String, u64)>;

/// Means keyed by (runtime, count) for rows whose metric passes `keep`
fn by_count(rows: &[Record], keep: impl Fn(&str) -> bool) -> ByCount {
    group_mean(
        rows,
        |r| {
            if !keep(r.get("metric")?) {
                return None;
            }
            Some((r.get("runtime")?.to_owned(), r.parse::<u64>("count")?))
        },
        numeric("value"),
    )
}

fn rss_label(runtime: &str) -> String {
    match runtime {
        "docker" => "dockerd RSS".to_owned(),
        "podman" => "conmon RSS".to_owned(),
        other => format!("{} RSS", label(other)),
    }
}

fn per_container_chart(per_container: &ByCount) -> BarChart {
    let counts = per_container
        .keys()
        .map(|(_, c)| *c)
        .unique()
        .sorted()
        .collect::<Vec<_>>();
    let series = COMPARED
        .only(per_container.keys().map(|(rt, _)| rt.as_str()))
        .into_iter()
        .map(|runtime| BarSeries {
            name: label(runtime).to_owned(),
            color: runtime_color(runtime),
            values: counts
                .iter()
                .map(|c| per_container.get(&(runtime.to_owned(), *c)))
                .collect(),
        })
        .collect::<Vec<_>>();
    BarChart::grouped(
        "Memory per Container (cgroup)",
        "KB per container",
        counts.iter().map(|c| format!("{c} cont.")).collect(),
        &series,
        0.35,
        |v| format!("{v:.0}"),
    )
}

fn rss_chart(rss: &ByCount) -> LineChart {
    let lines = COMPARED
        .only(rss.keys().map(|(rt, _)| rt.as_str()))
        .into_iter()
        .map(|runtime| Line {
            name: rss_label(runtime),
            color: runtime_color(runtime),
            points: rss
                .iter()
                .filter(|((rt, _), _)| rt == runtime)
                .map(|((_, count), kb)| (*count as f64, kb / KB_PER_MB))
                .sorted_by(|a, b| a.0.total_cmp(&b.0))
                .collect(),
        })
        .collect();
    LineChart {
        title: "Daemon/Conmon RSS vs Containers".to_owned(),
        x_desc: "Number of containers".to_owned(),
        y_desc: "RSS (MB)".to_owned(),
        lines,
        point_label: Some(|v: f64| format!("{v:.1}")),
    }
}

#[typetag::serde]
impl Report for MemoryCgroup {
    fn name(&self) -> &'static str {
        "memory_cgroup"
    }

    fn inputs(&self) -> &'static [&'static str] {
        &[TABLE]
    }

    fn plot(&self, ctx: &ReportContext<'_>) -> Result<Option<[PathBuf; 2]>> {
        let rows = load_table(ctx.results_dir, TABLE);
        let per_container = by_count(&rows, |m| m == PER_CONTAINER);
        if per_container.is_empty() {
            return Ok(None);
        }
        let bars = per_container_chart(&per_container);
        let rss = rss_chart(&by_count(&rows, |m| DAEMON_RSS.contains(&m)));
        if bars.is_empty() && rss.is_empty() {
            return Ok(None);
        }

        ctx.writer
            .publish("memory_cgroup_comparison.png", |path| {
                if rss.is_empty() {
                    render(path, WIDE, 1, |root, areas| draw_bars(root, &areas[0], &bars))
                } else {
                    render(path, DOUBLE, 2, |root, areas| {
                        draw_bars(root, &areas[0], &bars)?;
                        draw_lines(root, &areas[1], &rss)
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
        writeln!(out, "\nCgroup memory (per container):")?;
        for row in rows.iter().filter(|r| r.get("metric") == Some(PER_CONTAINER)) {
            let (Some(runtime), Some(count), Some(value)) =
                (row.get("runtime"), row.get("count"), row.get("value"))
            else {
                continue;
            };
            writeln!(out, "  {:15} {count:>2} cont: {value:>8} KB/cont", label(runtime))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{plot_into, summary_of, write_table};

    const BODY: &str = "runtime,metric,count,value\n\
        docker,per_container_kb,5,2048\n\
        docker,daemon_rss_kb,5,10240\n\
        docker,daemon_rss_kb,1,8192\n\
        podman,per_container_kb,5,1536.4\n\
        podman,conmon_rss_kb,5,5120\n\
        podman,per_container_kb,x,1\n";

    #[test]
    fn rss_in_megabytes_by_count() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), TABLE, BODY);
        let rows = load_table(dir.path(), TABLE);
        let rss = rss_chart(&by_count(&rows, |m| DAEMON_RSS.contains(&m)));
        assert_eq!(rss.lines[0].name, "dockerd RSS");
        assert_eq!(rss.lines[0].points, [(1.0, 8.0), (5.0, 10.0)]);
        assert_eq!(rss.lines[1].name, "conmon RSS");
        assert_eq!(rss.lines[1].points, [(5.0, 5.0)]);
    }

    #[test]
    fn per_container_bars() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), TABLE, BODY);
        let rows = load_table(dir.path(), TABLE);
        let bars = per_container_chart(&by_count(&rows, |m| m == PER_CONTAINER));
        assert_eq!(bars.categories.len(), 1);
        assert_eq!(
            bars.bars.iter().map(|b| b.label.as_str()).collect::<Vec<_>>(),
            ["2048", "1536"]
        );
    }

    #[test]
    fn summary_passes_values_through() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), TABLE, BODY);
        assert_eq!(
            summary_of(&MemoryCgroup, dir.path()),
            "\nCgroup memory (per container):\n\
             \x20 Docker           5 cont:     2048 KB/cont\n\
             \x20 Podman           5 cont:   1536.4 KB/cont\n\
             \x20 Podman           x cont:        1 KB/cont\n"
        );
    }

    #[test]
    fn renders_both_panels() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), TABLE, BODY);
        if let Some(written) = plot_into(&MemoryCgroup, dir.path()) {
            assert!(written.is_some());
        }
    }
}
