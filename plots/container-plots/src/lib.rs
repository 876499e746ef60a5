use std::io::Write;

use common::{
    aggregate::Aggregate,
    chart::runtime_color,
    report::Report,
    runtime::{RUNTIMES, label},
};
use eyre::Result;
use itertools::Itertools;
use plotters::style::RGBColor;

mod cpu;
mod cpu_exec;
mod io;
mod memory;
mod memory_cgroup;
mod nested;
mod scale;
mod startup;
mod summary;

pub use cpu::Cpu;
pub use cpu_exec::CpuExec;
pub use io::Io;
pub use memory::Memory;
pub use memory_cgroup::MemoryCgroup;
pub use nested::NestedV2;
pub use scale::Scale;
pub use startup::Startup;
pub use summary::Summary;

/// Every report, in the order they are generated and summarised
pub fn default_reports() -> Vec<Box<dyn Report>> {
    vec![
        Box::new(Startup),
        Box::new(Memory),
        Box::new(Cpu),
        Box::new(Io),
        Box::new(Scale),
        Box::new(CpuExec),
        Box::new(MemoryCgroup),
        Box::new(NestedV2),
        Box::new(Summary),
    ]
}

/// Bar entries for a per-runtime aggregate, baseline first
pub(crate) fn runtime_entries(aggregate: &Aggregate<String>) -> Vec<(String, f64, RGBColor)> {
    aggregate
        .ordered(&RUNTIMES)
        .into_iter()
        .map(|(runtime, mean)| (label(runtime).to_owned(), mean, runtime_color(runtime)))
        .collect()
}

/// Distinct counts in ascending numeric order, non-numeric counts as 0
pub(crate) fn sorted_counts<'a, I>(counts: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    counts
        .into_iter()
        .unique()
        .sorted_by_key(|c| c.parse::<u64>().unwrap_or(0))
        .map(str::to_owned)
        .collect()
}

/// `  <label> <mean> <unit>` per runtime, baseline first
pub(crate) fn write_means(
    out: &mut dyn Write,
    heading: &str,
    aggregate: &Aggregate<String>,
    precision: usize,
    unit: &str,
) -> Result<()> {
    writeln!(out, "\n{heading}")?;
    for (runtime, mean) in aggregate.ordered(&RUNTIMES) {
        writeln!(out, "  {:15} {mean:8.precision$} {unit}", label(runtime))?;
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_sort_numerically() {
        assert_eq!(sorted_counts(["10", "5", "1", "5", "?"]), ["?", "1", "5", "10"]);
    }

    #[test]
    fn every_report_has_a_distinct_name() {
        let names = default_reports()
            .iter()
            .map(|r| r.name())
            .unique()
            .count();
        assert_eq!(names, 9);
    }
}
