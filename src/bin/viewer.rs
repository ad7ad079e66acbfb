use anyhow::Result;
use clap::Parser;
use proposal_merge::{
    config::DEFAULT_OUTPUT_NAME,
    view::{
        date_parser::parse_day,
        render::{JsonRenderer, Render, TextRenderer},
        select::EditorInput,
        session::{run_session, Selection, SessionOutcome},
        Dataset,
    },
};
use std::{io, path::PathBuf, process::exit};
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Browse consolidated business proposals by submission year and day"
)]
struct Args {
    /// Consolidated dataset (.csv or .parquet)
    #[arg(short = 'f', long)]
    data: Option<PathBuf>,

    /// Submission year; prompted for when omitted
    #[arg(short, long)]
    year: Option<i32>,

    /// Submission day as dd/mm/YYYY; prompted for when omitted
    #[arg(short, long, value_parser = day_arg)]
    day: Option<chrono::NaiveDate>,

    /// Proposal id; on its own it skips the year and day filters
    #[arg(short, long)]
    proposal: Option<String>,

    /// Print the proposal as JSON instead of labelled text
    #[arg(long)]
    json: bool,
}

fn day_arg(raw: &str) -> Result<chrono::NaiveDate, String> {
    parse_day(raw).ok_or_else(|| format!("expected dd/mm/YYYY, got `{}`", raw))
}

fn main() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(SessionOutcome::Rendered(_)) | Ok(SessionOutcome::Cancelled) => {}
        Ok(_) => exit(2),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Não foi possível carregar os dados para exibição.");
            exit(1);
        }
    }
}

fn run(args: Args) -> Result<SessionOutcome> {
    let path = args
        .data
        .unwrap_or_else(|| PathBuf::from("data").join(DEFAULT_OUTPUT_NAME));
    let dataset = Dataset::load(&path)?;

    let selection = Selection {
        year: args.year,
        day: args.day,
        proposal: args.proposal,
    };

    let stdout = io::stdout();
    let mut renderer: Box<dyn Render> = if args.json {
        Box::new(JsonRenderer::new(stdout.lock()))
    } else {
        Box::new(TextRenderer::new(stdout.lock()))
    };

    let mut input = EditorInput::new()?;
    let mut ui = io::stderr();
    run_session(&dataset, &selection, &mut input, &mut ui, renderer.as_mut())
}
