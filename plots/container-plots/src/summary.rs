use std::path::PathBuf;

use common::{
    aggregate::by_runtime,
    chart::{BarChart, DOUBLE, SINGLE, draw_bars, render},
    report::{Report, ReportContext},
    table::load_table,
};
use eyre::Result;
use serde::{Deserialize, Serialize};

use crate::{cpu, runtime_entries, startup};

/// Startup and CPU side by side on one image
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Summary;

fn panels(ctx: &ReportContext<'_>) -> Vec<BarChart> {
    let startup = by_runtime(&load_table(ctx.results_dir, startup::TABLE), "value");
    let cpu = by_runtime(&load_table(ctx.results_dir, cpu::TABLE), "value");

    let mut panels = Vec::new();
    if !startup.is_empty() {
        panels.push(BarChart::simple(
            "Startup Latency",
            "Time (ms)",
            &runtime_entries(&startup),
            |v| format!("{v:.0}"),
        ));
    }
    if !cpu.is_empty() {
        panels.push(BarChart::simple(
            "CPU Benchmark",
            "Time (s)",
            &runtime_entries(&cpu),
            |v| format!("{v:.1}"),
        ));
    }
    panels
}

#[typetag::serde]
impl Report for Summary {
    fn name(&self) -> &'static str {
        "summary"
    }

    fn inputs(&self) -> &'static [&'static str] {
        &[startup::TABLE, cpu::TABLE]
    }

    fn plot(&self, ctx: &ReportContext<'_>) -> Result<Option<[PathBuf; 2]>> {
        let panels = panels(ctx);
        if panels.is_empty() {
            return Ok(None);
        }

        let size = if panels.len() > 1 { DOUBLE } else { SINGLE };
        ctx.writer
            .publish("summary.png", |path| {
                render(path, size, panels.len(), |root, areas| {
                    for (chart, area) in panels.iter().zip(areas) {
                        draw_bars(root, area, chart)?;
                    }
                    Ok(())
                })
            })
            .map(Some)
    }
}
