use std::env;

use backoffice_server::config::loader::load_config;
use backoffice_server::{ServerBuilder, bootstrap, metrics, observability};

#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    CliArgument,
    EnvironmentVariable,
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (BACKOFFICE_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    observability::init_tracing();

    let (config_path, source) = resolve_config_path();

    let cfg = match load_config(Some(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        path = %config_path,
        source = %source,
        storage = %cfg.storage.backend,
        cache = %cfg.cache_mode(),
        "Configuration loaded"
    );

    observability::apply_logging_level(&cfg.logging.level);
    metrics::init_metrics();

    let state = match bootstrap::build_state(&cfg).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Server initialization failed: {e:#}");
            std::process::exit(2);
        }
    };

    let server = ServerBuilder::new(cfg, state).build();
    if let Err(err) = server.run().await {
        eprintln!("Server error: {err}");
        std::process::exit(1);
    }
}

fn resolve_config_path() -> (String, ConfigSource) {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config"
            && let Some(path) = args.next()
        {
            return (path, ConfigSource::CliArgument);
        }
    }

    if let Ok(path) = env::var("BACKOFFICE_CONFIG")
        && !path.is_empty()
    {
        return (path, ConfigSource::EnvironmentVariable);
    }

    ("backoffice.toml".to_string(), ConfigSource::Default)
}
