use anyhow::Context;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, registry, EnvFilter};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl AppConfig {
    /// Reads `DATABASE_URL` and `DB_MAX_CONNECTIONS`, after loading `.env` if
    /// one exists.
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set to the Postgres instance holding imports")?;
        let max_connections = parse_max_connections(std::env::var("DB_MAX_CONNECTIONS").ok())?;

        Ok(Self {
            database_url,
            max_connections,
        })
    }
}

fn parse_max_connections(value: Option<String>) -> anyhow::Result<u32> {
    match value {
        None => Ok(DEFAULT_MAX_CONNECTIONS),
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("DB_MAX_CONNECTIONS must be a positive integer, got {raw:?}")),
    }
}

/// Pretty console logging at INFO unless `RUST_LOG` says otherwise.
pub fn init_tracing() -> anyhow::Result<()> {
    registry()
        .with(fmt::layer().event_format(format().pretty()))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env()
                .context("invalid RUST_LOG filter")?,
        )
        .try_init()
        .context("tracing already initialised")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_connections_defaults_and_parses() {
        assert_eq!(parse_max_connections(None).unwrap(), 5);
        assert_eq!(parse_max_connections(Some(" 12 ".to_string())).unwrap(), 12);
        assert!(parse_max_connections(Some("many".to_string())).is_err());
    }
}
