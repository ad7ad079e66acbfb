use anyhow::{Context, Result};
use arrow::util::pretty::pretty_format_batches;
use clap::Parser;
use proposal_merge::{
    config::MergeConfig,
    load::load_sources,
    merge::run_plan,
    write::write_consolidated,
};
use std::{path::PathBuf, time::Instant};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Consolidate the proposal CSV exports into a single flat dataset"
)]
struct Args {
    /// Directory holding the Proposal_Data_*.csv exports
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Output file (.csv or .parquet); defaults to <data-dir>/dados_consolidados.csv
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// YAML file with source, output and drop-rule overrides
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also join the multimedia export (one row per media item)
    #[arg(long)]
    with_multimedia: bool,

    /// Rows of the result to print once written
    #[arg(long, default_value_t = 5)]
    preview: usize,
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) resolve configuration ────────────────────────────────────
    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => MergeConfig::from_yaml_file(path)?,
        None => MergeConfig::default(),
    };
    if let Some(dir) = args.data_dir {
        cfg.data_dir = dir;
    }
    if let Some(out) = args.output {
        cfg.output = Some(out);
    }
    cfg.include_multimedia |= args.with_multimedia;
    let output = cfg.output_path();
    info!(data_dir = %cfg.data_dir.display(), output = %output.display(), "startup");

    // ─── 3) load → merge → write ─────────────────────────────────────
    let start = Instant::now();
    let tables = load_sources(&cfg.data_dir, &cfg.source_specs())?;
    let (merged, report) = run_plan(&tables, &cfg.plan())?;
    for (source, outcome) in &report.steps {
        info!("{:<16} {}", source, outcome);
    }
    write_consolidated(&merged, &output)
        .with_context(|| format!("writing {}", output.display()))?;
    info!(elapsed = ?start.elapsed(), "merge finished");

    // ─── 4) preview ──────────────────────────────────────────────────
    println!(
        "Merge complete: {} rows × {} columns written to {}",
        merged.num_rows(),
        merged.num_columns(),
        output.display()
    );
    if args.preview > 0 && merged.num_columns() > 0 {
        let head = merged.head(args.preview);
        println!("{}", pretty_format_batches(&[head.batch().clone()])?);
    }

    Ok(())
}
