use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt};

use crate::ProductResearchError;

static TELEMETRY_GUARD: OnceLock<()> = OnceLock::new();

const CRATES: [&str; 2] = ["productresearch_core", "productresearch_agents"];

/// Logging set-up for a research run.
#[derive(Debug, Clone)]
pub struct TelemetryOptions {
    /// Explicit filter; wins over `RUST_LOG` and `verbosity`.
    pub env_filter: Option<String>,
    /// 0 = info, 1 = debug, 2+ = trace for the research crates.
    pub verbosity: u8,
    pub with_ansi: bool,
}

impl Default for TelemetryOptions {
    fn default() -> Self {
        Self {
            env_filter: None,
            verbosity: 0,
            with_ansi: true,
        }
    }
}

impl TelemetryOptions {
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Filter directive used when neither `env_filter` nor `RUST_LOG` is set.
    /// Dependencies stay at `warn`.
    pub fn default_directive(&self) -> String {
        let level = match self.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        let mut directive = String::from("warn");
        for krate in CRATES {
            directive.push_str(&format!(",{krate}={level}"));
        }
        directive.push_str(&format!(",productresearch={level}"));
        directive
    }

    fn resolve_filter(&self, rust_log: Option<String>) -> String {
        self.env_filter
            .clone()
            .or(rust_log)
            .filter(|filter| !filter.trim().is_empty())
            .unwrap_or_else(|| self.default_directive())
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays
/// reserved for the prompt and the report. Later calls are no-ops.
pub fn init_telemetry(options: TelemetryOptions) -> Result<(), ProductResearchError> {
    if TELEMETRY_GUARD.get().is_some() {
        return Ok(());
    }

    let filter = options.resolve_filter(std::env::var("RUST_LOG").ok());
    let env_filter = EnvFilter::try_new(&filter).map_err(|err| {
        ProductResearchError::InvalidConfiguration(format!("invalid log filter `{filter}`: {err}"))
    })?;

    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_ansi(options.with_ansi)
        .with_target(options.verbosity > 0)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| {
            ProductResearchError::InvalidConfiguration(format!("telemetry init failed: {err}"))
        })?;

    TELEMETRY_GUARD.get_or_init(|| ());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_research_crates_only() {
        let quiet = TelemetryOptions::default().default_directive();
        assert!(quiet.starts_with("warn,"));
        assert!(quiet.contains("productresearch_agents=info"));

        let loud = TelemetryOptions::default().with_verbosity(3).default_directive();
        assert!(loud.contains("productresearch_core=trace"));
        assert!(loud.starts_with("warn,"));
    }

    #[test]
    fn explicit_filter_beats_rust_log() {
        let options = TelemetryOptions {
            env_filter: Some("debug".into()),
            ..TelemetryOptions::default()
        };
        assert_eq!(options.resolve_filter(Some("error".into())), "debug");

        let options = TelemetryOptions::default();
        assert_eq!(options.resolve_filter(Some("error".into())), "error");
        assert_eq!(
            options.resolve_filter(Some("  ".into())),
            options.default_directive()
        );
    }
}
