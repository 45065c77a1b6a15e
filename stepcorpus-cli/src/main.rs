mod config;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use stepcorpus_rs::embedder::openai::OpenAiEmbedder;
use stepcorpus_rs::extractor::LlmStepExtractor;
use stepcorpus_rs::llm_client::openai::{CacheConfig, OpenAiClient};
use stepcorpus_rs::pipeline::read_scenario;
use stepcorpus_rs::{
    BatchReport, ErrorKind, LoadStatus, SimilarityMatcher, StepCorpusConfig, StepCorpusError,
    StepPipeline,
};
use tracing::{error, info};

use crate::config::{Cli, OutputFormat};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_json) {
        eprintln!("error: failed to initialise logging: {e:#}");
        return ExitCode::from(2);
    }

    match run(&cli).await {
        Ok(report) => match print_report(&report, cli.output) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        },
        Err(e) => ExitCode::from(report_failure(&e)),
    }
}

fn init_tracing(log_json: bool) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("stepcorpus=info".parse()?)
        .add_directive("stepcorpus_rs=info".parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if log_json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

async fn run(cli: &Cli) -> anyhow::Result<BatchReport> {
    // ── Config ────────────────────────────────────────────────────────────────
    let mut config = StepCorpusConfig::from_env()?;
    cli.apply(&mut config);
    config.check()?;

    info!(
        scenario = %config.scenario_path.display(),
        corpus = %config.corpus_path.display(),
        threshold = config.similarity_threshold,
        "configuration loaded"
    );

    // ── Scenario ──────────────────────────────────────────────────────────────
    let scenario = read_scenario(&config.scenario_path).await?;

    // ── Collaborators ─────────────────────────────────────────────────────────
    let llm = match &config.openai_base_url {
        Some(base_url) => OpenAiClient::with_base_url(
            &config.openai_api_key,
            &config.model_name,
            base_url,
            CacheConfig::default(),
        ),
        None => OpenAiClient::new(
            &config.openai_api_key,
            &config.model_name,
            CacheConfig::default(),
        ),
    };
    let embedder = match &config.openai_base_url {
        Some(base_url) => {
            OpenAiEmbedder::with_base_url(&config.openai_api_key, &config.embedding_model, base_url)
        }
        None => OpenAiEmbedder::new(&config.openai_api_key, &config.embedding_model),
    };

    let pipeline = StepPipeline::new(
        LlmStepExtractor::new(llm),
        embedder,
        SimilarityMatcher::new(config.similarity_threshold),
    );

    // ── Batch ─────────────────────────────────────────────────────────────────
    let report = pipeline.run(&scenario, config.corpus_path.clone()).await?;
    Ok(report)
}

/// Print the failure line and return the process exit code.
fn report_failure(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<StepCorpusError>() {
        Some(e) => {
            error!(kind = %e.kind(), "run failed");
            eprintln!("error [{}]: {}", e.kind(), e);
            if e.kind() == ErrorKind::Config {
                2
            } else {
                1
            }
        }
        None => {
            eprintln!("error: {err:#}");
            1
        }
    }
}

fn print_report(report: &BatchReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let body =
                serde_json::to_string_pretty(report).context("failed to serialise report")?;
            println!("{body}");
        }
        OutputFormat::Text => print!("{}", render_text(report)),
    }
    Ok(())
}

fn render_text(report: &BatchReport) -> String {
    let mut out = format!(
        "accepted {} step(s), rejected {} duplicate(s)\n",
        report.accepted, report.rejected
    );
    for step in &report.rejected_steps {
        out.push_str(&format!("  duplicate: {}\n", step.action));
    }
    if let LoadStatus::Recovered { reason } = &report.load_status {
        out.push_str(&format!("previous corpus was unreadable ({reason}); rebuilt\n"));
    }
    out.push_str(&format!(
        "corpus: {} ({} steps)\n",
        report.corpus_path.display(),
        report.corpus_size
    ));
    out
}
