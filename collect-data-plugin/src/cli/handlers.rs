//! Command handlers

use crate::GlobalArgs;
use anyhow::{anyhow, Context, Result};
use collect_data_core::models::{Configuration, ConfigurationError, PluginDescriptor};
use collect_data_core::server::{PluginServer, ServeOutcome};
use collect_data_core::services::logging::init_logging;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown or end of input
pub const EXIT_OK: i32 = 0;
/// Malformed input, write failure or invalid configuration
pub const EXIT_FAILURE: i32 = 1;
/// The runner's handshake did not match
pub const EXIT_HANDSHAKE: i32 = 2;

/// Serve runner requests on stdin/stdout until input closes or a signal arrives
pub async fn handle_serve(args: &GlobalArgs) -> Result<i32> {
    let config = resolve_configuration(args)?;

    if let Err(e) = init_logging(config.log_level) {
        eprintln!("Warning: failed to initialize logging: {}", e);
    }
    tracing::info!(backend_url = %config.backend_url, "Starting Collect Data plugin");

    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());

    let server = PluginServer::from_configuration(&config)
        .context("Failed to create backend client")?;
    match server
        .serve(tokio::io::stdin(), tokio::io::stdout(), shutdown)
        .await
    {
        Ok(ServeOutcome::InputClosed) => Ok(EXIT_OK),
        Ok(ServeOutcome::Shutdown) => {
            tracing::info!("Shut down by signal");
            Ok(EXIT_OK)
        }
        Err(e) if e.is_handshake() => {
            tracing::error!(error = %e, "Refusing to serve");
            Ok(EXIT_HANDSHAKE)
        }
        Err(e) => {
            tracing::error!(error = %e, "Stopped serving");
            Ok(EXIT_FAILURE)
        }
    }
}

/// Print the plugin descriptor
pub fn handle_details(pretty: bool) -> Result<()> {
    let descriptor = PluginDescriptor::collect_data();
    let output = if pretty {
        serde_json::to_string_pretty(&descriptor)?
    } else {
        serde_json::to_string(&descriptor)?
    };
    println!("{}", output);
    Ok(())
}

/// Write the effective configuration to the configuration file
pub fn handle_config_init(args: &GlobalArgs) -> Result<()> {
    let config = resolve_configuration(args)?;
    let path = config_path(args)?.ok_or_else(|| anyhow!("Could not determine config directory"))?;

    config
        .save_to_file(&path)
        .with_context(|| format!("Failed to write configuration to {}", path.display()))?;

    println!("Configuration saved to {}", path.display());
    Ok(())
}

/// Resolve configuration: CLI flag > environment > file > default
pub fn resolve_configuration(args: &GlobalArgs) -> Result<Configuration> {
    resolve_configuration_with(args, |key| std::env::var(key).ok())
}

pub fn resolve_configuration_with<F>(args: &GlobalArgs, lookup: F) -> Result<Configuration>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match config_path(args)? {
        Some(path) => Configuration::load_from_file(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    };

    config.apply_env_with(lookup);

    if let Some(url) = &args.backend_url {
        config.backend_url = url.clone();
    }
    if let Some(key) = &args.api_key {
        config.api_key = Some(key.clone());
    }
    if let Some(cookie) = &args.magic_cookie {
        config.magic_cookie = cookie.clone();
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.parse().map_err(anyhow::Error::msg)?;
    }

    config
        .validate()
        .map_err(|errors| anyhow!("Invalid configuration: {}", errors.join("; ")))?;

    Ok(config)
}

/// Explicit `--config` path, else the default location if one exists
fn config_path(args: &GlobalArgs) -> Result<Option<PathBuf>> {
    if let Some(path) = &args.config {
        return Ok(Some(path.clone()));
    }
    match Configuration::default_config_path() {
        Ok(path) => Ok(Some(path)),
        Err(ConfigurationError::NoConfigDir) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn spawn_signal_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Shutdown signal received");
        shutdown.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl+C only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use collect_data_core::models::{LogLevel, ENV_BACKEND_URL};
    use tempfile::tempdir;

    fn args_with_config(path: PathBuf) -> GlobalArgs {
        GlobalArgs {
            config: Some(path),
            ..GlobalArgs::default()
        }
    }

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = tempdir().unwrap();
        let args = args_with_config(dir.path().join("missing.toml"));

        let config = resolve_configuration_with(&args, |_| None).unwrap();
        assert_eq!(config, Configuration::default());
    }

    #[test]
    fn test_precedence_flag_over_env_over_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "backend_url = \"http://file:8080\"\nlog_level = \"warn\"\n",
        )
        .unwrap();

        let env = |key: &str| (key == ENV_BACKEND_URL).then(|| "http://env:8080".to_string());

        let args = args_with_config(path.clone());
        let config = resolve_configuration_with(&args, env).unwrap();
        assert_eq!(config.backend_url, "http://env:8080");
        assert_eq!(config.log_level, LogLevel::Warn);

        let args = GlobalArgs {
            backend_url: Some("http://flag:8080".to_string()),
            log_level: Some("debug".to_string()),
            ..args_with_config(path)
        };
        let config = resolve_configuration_with(&args, env).unwrap();
        assert_eq!(config.backend_url, "http://flag:8080");
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempdir().unwrap();
        let args = GlobalArgs {
            backend_url: Some("not a url".to_string()),
            ..args_with_config(dir.path().join("missing.toml"))
        };
        let err = resolve_configuration_with(&args, |_| None).unwrap_err();
        assert!(err.to_string().contains("backend_url"));

        let args = GlobalArgs {
            log_level: Some("loud".to_string()),
            ..args_with_config(dir.path().join("missing.toml"))
        };
        assert!(resolve_configuration_with(&args, |_| None).is_err());
    }

    #[test]
    fn test_config_init_writes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("collect-data").join("config.toml");
        let args = GlobalArgs {
            api_key: Some("runner-key".to_string()),
            ..args_with_config(path.clone())
        };

        handle_config_init(&args).unwrap();

        let saved = Configuration::load_from_file(&path).unwrap();
        assert_eq!(saved.api_key.as_deref(), Some("runner-key"));
    }
}
