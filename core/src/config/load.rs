use std::path::{Path, PathBuf};

use crate::error::EngineError;

use super::types::EngineConfig;

pub const ENV_MAX_CONCURRENCY: &str = "AGENTSTACK_MAX_CONCURRENCY";
pub const ENV_AGENT_TIMEOUT_SECS: &str = "AGENTSTACK_AGENT_TIMEOUT_SECS";
pub const ENV_FAILURE_POLICY: &str = "AGENTSTACK_FAILURE_POLICY";
pub const ENV_LOG_LEVEL: &str = "AGENTSTACK_LOG_LEVEL";

/// Get the default agentstack data directory: ~/.agentstack
pub fn get_agentstack_data_dir() -> Result<PathBuf, EngineError> {
    dirs::home_dir()
        .map(|home| home.join(".agentstack"))
        .ok_or_else(|| EngineError::Config("Cannot determine home directory".into()))
}

/// Resolve configuration with the default search path.
///
/// Priority: `~/.agentstack/config.toml`, then `./agentstack.toml`, then
/// built-in defaults. Environment overrides apply last.
pub fn load_default() -> Result<EngineConfig, EngineError> {
    let user_config = get_agentstack_data_dir()
        .ok()
        .map(|dir| dir.join("config.toml"));
    let local_config = Path::new("agentstack.toml");

    let mut cfg = match user_config.filter(|p| p.exists()) {
        Some(path) => read_config(&path)?,
        None if local_config.exists() => read_config(local_config)?,
        None => EngineConfig::default(),
    };

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;
    Ok(cfg)
}

/// Load an explicit config file; it must exist.
pub fn load_from(path: &Path) -> Result<EngineConfig, EngineError> {
    let mut cfg = read_config(path)?;
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;
    Ok(cfg)
}

fn read_config(path: &Path) -> Result<EngineConfig, EngineError> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
    toml::from_str::<EngineConfig>(&s)
        .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))
}

/// Apply `AGENTSTACK_*` overrides. Blank values are ignored, malformed ones
/// rejected.
pub fn apply_env_overrides<F>(cfg: &mut EngineConfig, lookup: F) -> Result<(), EngineError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = var(ENV_MAX_CONCURRENCY) {
        cfg.executor.max_concurrency = parse_env(ENV_MAX_CONCURRENCY, &v)?;
    }
    if let Some(v) = var(ENV_AGENT_TIMEOUT_SECS) {
        cfg.executor.agent_timeout_secs = parse_env(ENV_AGENT_TIMEOUT_SECS, &v)?;
    }
    if let Some(v) = var(ENV_FAILURE_POLICY) {
        cfg.executor.failure_policy = v
            .parse()
            .map_err(|e| EngineError::Config(format!("{ENV_FAILURE_POLICY}: {e}")))?;
    }
    if let Some(v) = var(ENV_LOG_LEVEL) {
        cfg.logging.level = v.trim().to_string();
    }

    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, EngineError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| EngineError::Config(format!("{key}={value}: {e}")))
}
