use core::fmt::Debug;
use std::{
    io::Write,
    path::{Path, PathBuf},
};

use dyn_clone::{DynClone, clone_trait_object};
use eyre::Result;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{error, info};

use crate::artifact::ArtifactWriter;

pub struct ReportContext<'a> {
    /// Where the input tables live
    pub results_dir: &'a Path,
    pub writer: &'a ArtifactWriter,
}

#[typetag::serde(tag = "type")]
pub trait Report: Debug + DynClone + Send + Sync {
    /// Name of the report, for identification
    fn name(&self) -> &'static str;
    /// Names of the tables read, without the `.csv` extension
    fn inputs(&self) -> &'static [&'static str];
    /// Renders the chart.
    ///
    /// Returns the written paths, or `None` when there was nothing to draw
    fn plot(&self, ctx: &ReportContext<'_>) -> Result<Option<[PathBuf; 2]>>;
    /// Writes this report's section of the text summary, if it has one
    fn summary(&self, _results_dir: &Path, _out: &mut dyn Write) -> Result<()> {
        Ok(())
    }
}
clone_trait_object!(Report);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

fn run_one(report: &dyn Report, ctx: &ReportContext<'_>) -> RunStats {
    info!("Generating {}", report.name());
    match report.plot(ctx) {
        Ok(Some(_)) => RunStats {
            written: 1,
            ..Default::default()
        },
        Ok(None) => {
            info!("No data for {}, skipped", report.name());
            RunStats {
                skipped: 1,
                ..Default::default()
            }
        }
        Err(err) => {
            error!("Report {} failed: {err:#}", report.name());
            RunStats {
                failed: 1,
                ..Default::default()
            }
        }
    }
}

/// Renders every report. A failing report is logged and does not stop the
/// others.
pub fn plot_all(reports: &[Box<dyn Report>], ctx: &ReportContext<'_>, parallel: bool) -> RunStats {
    let stats = if parallel {
        reports
            .par_iter()
            .map(|report| run_one(report.as_ref(), ctx))
            .collect::<Vec<_>>()
    } else {
        reports
            .iter()
            .map(|report| run_one(report.as_ref(), ctx))
            .collect::<Vec<_>>()
    };
    stats.into_iter().fold(RunStats::default(), |acc, s| RunStats {
        written: acc.written + s.written,
        skipped: acc.skipped + s.skipped,
        failed: acc.failed + s.failed,
    })
}

pub const RULE_WIDTH: usize = 60;

/// Prints the text summary of every report between two rules
pub fn write_summary(
    reports: &[Box<dyn Report>],
    results_dir: &Path,
    out: &mut dyn Write,
) -> Result<()> {
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(out, "\n{rule}")?;
    writeln!(out, "  BENCHMARK SUMMARY")?;
    writeln!(out, "{rule}")?;
    for report in reports {
        if let Err(err) = report.summary(results_dir, out) {
            error!("Summary for {} failed: {err:#}", report.name());
        }
    }
    writeln!(out, "\n{rule}")?;
    Ok(())
}
