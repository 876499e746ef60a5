use std::{
    io::Write,
    path::{Path, PathBuf},
};

use common::{
    aggregate::{Aggregate, group_mean, numeric},
    chart::{DOUBLE, Line, LineChart, draw_lines, render, runtime_color},
    report::{Report, ReportContext},
    runtime::{COMPARED, label},
    table::{Record, load_table},
};
use eyre::Result;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Memory and total startup time while scaling up the number of containers
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Scale;

const TABLE: &str = "scale";

/// Chart key of a row with a numeric count and both measurements
fn point_key(record: &Record) -> Option<(String, u64)> {
    numeric("memory_mb")(record)?;
    numeric("time_seconds")(record)?;
    Some((record.get("runtime")?.to_owned(), record.parse("count")?))
}

fn lines(aggregate: &Aggregate<(String, u64)>) -> Vec<Line> {
    COMPARED
        .only(aggregate.keys().map(|(rt, _)| rt.as_str()))
        .into_iter()
        .map(|runtime| Line {
            name: label(runtime).to_owned(),
            color: runtime_color(runtime),
            points: aggregate
                .iter()
                .filter(|((rt, _), _)| rt == runtime)
                .map(|((_, count), v)| (*count as f64, v))
                .sorted_by(|a, b| a.0.total_cmp(&b.0))
                .collect(),
        })
        .collect()
}

#[typetag::serde]
impl Report for Scale {
    fn name(&self) -> &'static str {
        "scale"
    }

    fn inputs(&self) -> &'static [&'static str] {
        &[TABLE]
    }

    fn plot(&self, ctx: &ReportContext<'_>) -> Result<Option<[PathBuf; 2]>> {
        let rows = load_table(ctx.results_dir, TABLE);
        let valid = rows.iter().filter(|r| point_key(r).is_some()).collect::<Vec<_>>();
        if valid.len() < rows.len() {
            debug!("Ignoring {} incomplete scale rows", rows.len() - valid.len());
        }
        let memory = group_mean(valid.iter().copied(), point_key, numeric("memory_mb"));
        let time = group_mean(valid.iter().copied(), point_key, numeric("time_seconds"));

        let memory = LineChart {
            title: "Memory vs Containers".to_owned(),
            x_desc: "Number of containers".to_owned(),
            y_desc: "Memory overhead (MB)".to_owned(),
            lines: lines(&memory),
            point_label: Some(|v: f64| format!("{v:.0}")),
        };
        let time = LineChart {
            title: "Startup Time vs Containers".to_owned(),
            x_desc: "Number of containers".to_owned(),
            y_desc: "Total time (s)".to_owned(),
            lines: lines(&time),
            point_label: Some(|v: f64| format!("{v:.1}")),
        };
        if memory.is_empty() {
            return Ok(None);
        }

        ctx.writer
            .publish("scale_memory.png", |path| {
                render(path, DOUBLE, 2, |root, areas| {
                    draw_lines(root, &areas[0], &memory)?;
                    draw_lines(root, &areas[1], &time)
                })
            })
            .map(Some)
    }

    fn summary(&self, results_dir: &Path, out: &mut dyn Write) -> Result<()> {
        let rows = load_table(results_dir, TABLE);
        if rows.is_empty() {
            return Ok(());
        }
        writeln!(out, "\nScaling:")?;
        // The count is printed as recorded, only the measurements must parse
        for row in &rows {
            let (Some(runtime), Some(time), Some(memory)) = (
                row.get("runtime"),
                numeric("time_seconds")(row),
                numeric("memory_mb")(row),
            ) else {
                continue;
            };
            let count = row.get("count").unwrap_or_default();
            writeln!(
                out,
                "  {:15} {count:>3} containers: {time:6.1}s, +{memory:.0} MB",
                label(runtime)
            )?;
        }
        Ok(())
    }
}
