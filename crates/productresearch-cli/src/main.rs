mod prompt;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use productresearch_agents::ProductResearchSystem;
use productresearch_core::memory::MySqlStore;
use productresearch_core::metrics::init_metrics_from_env;
use productresearch_core::{
    ConfigLoader, CrewFailure, DynMemory, InMemoryStore, MySqlSettings, TelemetryOptions,
    TraceCollector, init_telemetry, persist_trace,
};
use tokio::runtime::Runtime;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "productresearch",
    version,
    about = "Automated product research: search, scrape and summarize a product"
)]
struct Cli {
    /// Product to research. Prompts interactively when omitted.
    #[arg(long)]
    query: Option<String>,

    /// Path to a TOML configuration file.
    #[arg(long, env = "PRODUCTRESEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// Keep long-term memory in process instead of MySQL.
    #[arg(long, default_value_t = false)]
    ephemeral_memory: bool,

    /// Print the per-stage trace after the results, or after the error.
    #[arg(long, default_value_t = false)]
    trace: bool,

    /// Directory to write the run trace to as JSON.
    #[arg(long)]
    trace_dir: Option<PathBuf>,

    /// More log output on stderr (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_telemetry(TelemetryOptions::default().with_verbosity(cli.verbose)) {
        eprintln!("failed to initialise logging: {err}");
    }
    init_metrics_from_env("productresearch-cli");

    println!("\n=== Automated Product Research System ===");

    let env = |name: &str| std::env::var(name).ok();
    let outcome = Runtime::new()
        .context("failed to start tokio runtime")
        .and_then(|rt| {
            let stdin = io::stdin();
            rt.block_on(run(&cli, &env, &mut stdin.lock(), &mut io::stdout()))
        });

    let code = match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "research run failed");
            println!("\nError: {err:#}");
            ExitCode::FAILURE
        }
    };

    println!("\nResearch complete!");
    code
}

/// One research run. Configuration and API keys are resolved before the
/// prompt and before any connection is opened.
async fn run<R: BufRead, W: Write>(
    cli: &Cli,
    env: &dyn Fn(&str) -> Option<String>,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    let config = ConfigLoader::load(cli.config.clone())?;
    let secrets = config.secrets_with(env)?;

    let query = match cli.query.as_deref().map(str::trim) {
        Some(query) if !query.is_empty() => query.to_string(),
        _ => prompt::read_query(input, out)?,
    };

    let memory = open_memory(config.memory.enabled, cli.ephemeral_memory, env).await?;
    let system = ProductResearchSystem::from_config(&config, &secrets, memory)?;

    writeln!(out, "\nResearching: {query}")?;
    writeln!(out, "This may take a few moments...")?;
    out.flush()?;

    let output = match system.process_query(&query).await {
        Ok(output) => output,
        Err(err) => {
            if let Some(failure) = err.downcast_ref::<CrewFailure>() {
                report_trace(cli, &failure.run_id, &failure.trace, out)?;
            }
            return Err(err);
        }
    };

    writeln!(out, "\n=== Product Analysis Results ===")?;
    writeln!(out, "{output}")?;
    report_trace(cli, &output.run_id, &output.trace, out)?;
    Ok(())
}

fn report_trace<W: Write>(
    cli: &Cli,
    run_id: &str,
    trace: &TraceCollector,
    out: &mut W,
) -> Result<()> {
    if cli.trace {
        writeln!(out, "\n{}", trace.summary().render_markdown())?;
    }
    if let Some(dir) = &cli.trace_dir {
        match persist_trace(dir, run_id, trace.events()) {
            Ok(path) => info!(path = %path.display(), "trace written"),
            Err(err) => warn!(error = %err, "failed to persist trace"),
        }
    }
    Ok(())
}

async fn open_memory(
    enabled: bool,
    ephemeral: bool,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<Option<DynMemory>> {
    if !enabled {
        info!("long-term memory disabled by configuration");
        return Ok(None);
    }
    if ephemeral {
        info!("using in-process long-term memory");
        return Ok(Some(Arc::new(InMemoryStore::new())));
    }

    let settings = MySqlSettings::from_lookup(env);
    let store = MySqlStore::connect(&settings)
        .await
        .context("long-term memory unavailable; pass --ephemeral-memory to run without MySQL")?;
    Ok(Some(Arc::new(store)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use productresearch_core::{ProductResearchError, TraceEvent, TraceStatus};
    use std::io::Cursor;

    fn keys(name: &str) -> Option<String> {
        match name {
            "SERPERDEV_API_KEY" => Some("serper".into()),
            "OPENAI_API_KEY" => Some("openai".into()),
            _ => None,
        }
    }

    fn no_keys(_: &str) -> Option<String> {
        None
    }

    #[tokio::test]
    async fn missing_key_fails_before_prompting() {
        let cli = Cli::parse_from(["productresearch"]);
        let mut input = Cursor::new("iPhone 15 Pro Max\n");
        let mut out = Vec::new();

        let err = run(&cli, &no_keys, &mut input, &mut out)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ProductResearchError>(),
            Some(ProductResearchError::MissingSecret(name)) if name == "SERPERDEV_API_KEY"
        ));
        assert!(out.is_empty(), "prompt was shown: {}", String::from_utf8_lossy(&out));
        assert_eq!(input.position(), 0);
    }

    #[tokio::test]
    async fn prompt_comes_before_the_memory_connection() {
        let cli = Cli::parse_from(["productresearch"]);
        let mut input = Cursor::new("");
        let mut out = Vec::new();

        let err = run(&cli, &keys, &mut input, &mut out).await.unwrap_err();

        assert!(err.to_string().contains("input closed"), "unexpected error: {err:#}");
        assert!(String::from_utf8(out).unwrap().contains("Enter product to research"));
    }

    #[test]
    fn trace_is_printed_and_persisted_when_requested() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let dir_arg = dir.path().to_string_lossy().into_owned();
        let cli = Cli::parse_from(["productresearch", "--trace", "--trace-dir", &dir_arg]);
        let trace = TraceCollector::from_events(vec![TraceEvent::new(
            "search",
            "Product Search Specialist",
            TraceStatus::Failed,
            "serper returned 500",
            12,
        )]);
        let mut out = Vec::new();

        report_trace(&cli, "run-7", &trace, &mut out)?;

        let printed = String::from_utf8(out)?;
        assert!(printed.contains("1. [FAILED] search (Product Search Specialist)"));
        assert!(dir.path().join("run-7.json").exists());
        Ok(())
    }

    #[test]
    fn verbose_flag_counts() {
        let cli = Cli::parse_from(["productresearch", "-vv", "--query", "Kindle"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.query.as_deref(), Some("Kindle"));
    }
}
