use std::{
    fs::read_to_string,
    io::{Write, stdout},
    path::{Path, PathBuf},
};

use clap::{Args, Parser, Subcommand};
use common::{
    artifact::{ArtifactWriter, list_images},
    chart::init_renderer,
    config::Config,
    report::{Report, ReportContext, plot_all, write_summary},
    table::{load_table, table_path},
};
use eyre::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const NO_RENDERER: &str = "Cannot render charts. Install a TrueType font package \
    (fonts-dejavu-core, fonts-liberation) or point `settings.font` in the --config file \
    at a .ttf file";

const MODULES: &[&str] = &["container_report", "common", "container_plots"];

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Extra tracing filter directives, e.g. `common=debug`
    #[arg(short, long, global = true)]
    log: Vec<String>,
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Args, Clone)]
struct Dirs {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory holding the input tables, overrides the configuration
    #[arg(long)]
    results_dir: Option<PathBuf>,
    /// Second destination for every chart, overrides the configuration
    #[arg(long)]
    images_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every configured chart, then print the summary
    Plot {
        #[command(flatten)]
        dirs: Dirs,
        /// Do not print the text summary
        #[arg(long, default_value_t = false)]
        skip_summary: bool,
        /// Render reports concurrently
        #[arg(long, default_value_t = false)]
        parallel: bool,
    },
    /// Print the text summary only
    Summary {
        #[command(flatten)]
        dirs: Dirs,
    },
    /// List the tables each report reads
    Ls {
        #[command(flatten)]
        dirs: Dirs,
    },
}

/// Configuration with the command line overrides applied
struct Resolved {
    config: Config,
    results_dir: PathBuf,
    images_dir: PathBuf,
    reports: Vec<Box<dyn Report>>,
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let raw = read_to_string(path).wrap_err_with(|| format!("Read {}", path.display()))?;
    serde_yml::from_str(&raw).wrap_err_with(|| format!("Parse {}", path.display()))
}

fn resolve(dirs: &Dirs) -> Result<Resolved> {
    let config = load_config(dirs.config.as_deref())?;
    let results_dir = dirs
        .results_dir
        .clone()
        .unwrap_or_else(|| config.settings.results_dir());
    let images_dir = dirs
        .images_dir
        .clone()
        .unwrap_or_else(|| config.settings.images_dir_for(&results_dir));
    let reports = config
        .reports
        .clone()
        .unwrap_or_else(container_plots::default_reports);
    Ok(Resolved {
        config,
        results_dir,
        images_dir,
        reports,
    })
}

fn main() -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("info".to_owned());
    let args = Cli::parse();

    let mut env_filter = EnvFilter::new("");
    for log in &args.log {
        env_filter = env_filter.add_directive(log.parse()?);
    }
    for module in MODULES {
        if !args.log.iter().any(|x| x.starts_with(module)) {
            env_filter = env_filter.add_directive(format!("{module}={log_level}").parse()?);
        }
    }

    let (file_layer, _guard) = match &args.log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let name = path.file_name().unwrap_or("container-report.log".as_ref());
            let (non_blocking, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (
                Some(layer().with_ansi(false).with_writer(non_blocking)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .compact(),
        )
        .with(file_layer)
        .init();

    match args.command {
        Commands::Plot {
            dirs,
            skip_summary,
            parallel,
        } => {
            let resolved = resolve(&dirs)?;
            plot(&resolved, skip_summary, parallel)?
        }
        Commands::Summary { dirs } => {
            let resolved = resolve(&dirs)?;
            write_summary(&resolved.reports, &resolved.results_dir, &mut stdout().lock())?
        }
        Commands::Ls { dirs } => list_inputs(&resolve(&dirs)?, &mut stdout().lock())?,
    };

    Ok(())
}

fn plot(resolved: &Resolved, skip_summary: bool, parallel: bool) -> Result<()> {
    let font = init_renderer(resolved.config.settings.font.as_deref())
        .inspect_err(|err| error!("{err}"))
        .wrap_err(NO_RENDERER)?;
    info!("Rendering with {}", font.display());

    let writer = ArtifactWriter::new(&resolved.results_dir, &resolved.images_dir);
    let ctx = ReportContext {
        results_dir: &resolved.results_dir,
        writer: &writer,
    };
    let stats = plot_all(&resolved.reports, &ctx, parallel);
    info!(
        "{} charts written, {} skipped, {} failed",
        stats.written, stats.skipped, stats.failed
    );

    let mut out = stdout().lock();
    if !skip_summary {
        write_summary(&resolved.reports, &resolved.results_dir, &mut out)?;
    }
    list_charts(&resolved.results_dir, &mut out)
}

fn list_charts(results_dir: &Path, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "\nGenerated charts:")?;
    if !results_dir.exists() {
        return Ok(());
    }
    for image in list_images(results_dir)? {
        if let Some(name) = image.file_name() {
            writeln!(out, "  {}", name.to_string_lossy())?;
        }
    }
    Ok(())
}

fn list_inputs(resolved: &Resolved, out: &mut dyn Write) -> Result<()> {
    for report in &resolved.reports {
        writeln!(out, "{}", report.name())?;
        for input in report.inputs() {
            if table_path(&resolved.results_dir, input).exists() {
                let rows = load_table(&resolved.results_dir, input).len();
                writeln!(out, "  {input}.csv -> {rows} rows")?;
            } else {
                writeln!(out, "  {input}.csv -> missing")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn dirs(config: Option<PathBuf>) -> Dirs {
        Dirs {
            config,
            results_dir: None,
            images_dir: None,
        }
    }

    #[test]
    fn no_config_runs_every_report() {
        let resolved = resolve(&dirs(None)).unwrap();
        assert_eq!(resolved.results_dir, PathBuf::from("results"));
        assert_eq!(resolved.images_dir, PathBuf::from("images"));
        let names = resolved.reports.iter().map(|r| r.name()).collect::<Vec<_>>();
        assert_eq!(names.first(), Some(&"startup"));
        assert_eq!(names.last(), Some(&"summary"));
        assert_eq!(names.len(), 9);
    }

    #[test]
    fn config_selects_reports_and_cli_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "settings:\n  results_dir: data/results\n  images_dir: site/images\n\
             reports:\n  - type: Cpu\n  - type: NestedV2\n",
        )
        .unwrap();

        let resolved = resolve(&dirs(Some(path.clone()))).unwrap();
        assert_eq!(resolved.results_dir, PathBuf::from("data/results"));
        assert_eq!(resolved.images_dir, PathBuf::from("site/images"));
        let names = resolved.reports.iter().map(|r| r.name()).collect::<Vec<_>>();
        assert_eq!(names, ["cpu", "nested_v2"]);

        let overridden = resolve(&Dirs {
            config: Some(path),
            results_dir: Some("elsewhere".into()),
            images_dir: Some("pics".into()),
        })
        .unwrap();
        assert_eq!(overridden.results_dir, PathBuf::from("elsewhere"));
        assert_eq!(overridden.images_dir, PathBuf::from("pics"));
    }

    #[test]
    fn images_follow_cli_results_dir() {
        let resolved = resolve(&Dirs {
            config: None,
            results_dir: Some("scripts/results".into()),
            images_dir: None,
        })
        .unwrap();
        assert_eq!(resolved.images_dir, PathBuf::from("scripts/images"));
    }

    #[test]
    fn unknown_report_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "reports:\n  - type: Gpu\n").unwrap();
        assert!(resolve(&dirs(Some(path))).is_err());
    }

    #[test]
    fn ls_counts_rows() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("startup.csv"), "runtime,value\nbare,1\nbare,2\n").unwrap();
        let resolved = resolve(&Dirs {
            config: None,
            results_dir: Some(dir.path().to_owned()),
            images_dir: None,
        })
        .unwrap();
        let mut out = Vec::new();
        list_inputs(&resolved, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("startup\n  startup.csv -> 2 rows\n"));
        assert!(out.contains("  nested_v2.csv -> missing\n"));
    }

    #[test]
    fn unusable_font_fails_before_any_chart() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("startup.csv"), "runtime,value\nbare,100\n").unwrap();
        let mut resolved = resolve(&Dirs {
            config: None,
            results_dir: Some(dir.path().to_owned()),
            images_dir: Some(dir.path().join("images")),
        })
        .unwrap();
        resolved.config.settings.font = Some(dir.path().join("missing.ttf"));

        let err = plot(&resolved, true, false).unwrap_err();
        assert!(format!("{err:#}").contains("settings.font"));
        assert!(list_images(dir.path()).unwrap().is_empty());
        assert!(!dir.path().join("images").exists());
    }

    #[test]
    fn charts_listed_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("summary.png"), b"").unwrap();
        fs::write(dir.path().join("cpu_comparison.png"), b"").unwrap();
        let mut out = Vec::new();
        list_charts(dir.path(), &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\nGenerated charts:\n  cpu_comparison.png\n  summary.png\n"
        );
    }
}
