use std::path::PathBuf;

use common::{
    aggregate::{group_mean, numeric},
    chart::{BarChart, BarSeries, WIDE, draw_bars, render, runtime_color},
    report::{Report, ReportContext},
    runtime::{IO_MODES, RUNTIMES, io_mode_label, label},
    table::load_table,
};
use eyre::Result;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Sequential write throughput per runtime and storage path
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Io;

const TABLE: &str = "io";

#[typetag::serde]
impl Report for Io {
    fn name(&self) -> &'static str {
        "io"
    }

    fn inputs(&self) -> &'static [&'static str] {
        &[TABLE]
    }

    fn plot(&self, ctx: &ReportContext<'_>) -> Result<Option<[PathBuf; 2]>> {
        let rows = load_table(ctx.results_dir, TABLE);
        let throughput = group_mean(
            &rows,
            |r| Some((r.get("runtime")?.to_owned(), r.get("mode")?.to_owned())),
            numeric("mb_per_sec"),
        );
        if throughput.is_empty() {
            return Ok(None);
        }

        let modes = IO_MODES.sort(throughput.keys().map(|(_, m)| m.as_str()).unique());
        let runtimes = RUNTIMES.sort(throughput.keys().map(|(rt, _)| rt.as_str()).unique());
        let series = runtimes
            .iter()
            .map(|runtime| BarSeries {
                name: label(runtime).to_owned(),
                color: runtime_color(runtime),
                values: modes
                    .iter()
                    .map(|mode| throughput.get(&(runtime.to_string(), mode.to_string())))
                    .collect(),
            })
            .collect::<Vec<_>>();

        let chart = BarChart::grouped(
            "Disk I/O: 100MB Write",
            "Throughput (MB/s)",
            modes.iter().map(|m| io_mode_label(m).to_owned()).collect(),
            &series,
            0.25,
            |v| format!("{v:.0}"),
        );
        ctx.writer
            .publish("io_comparison.png", |path| {
                render(path, WIDE, 1, |root, areas| draw_bars(root, &areas[0], &chart))
            })
            .map(Some)
    }
}
