//! Layered configuration loading for `RuntimeConfig` (spec §6): a TOML
//! file, overridden by `REALM_*` environment variables, overridden by CLI
//! flags — the same three-layer shape the teacher's `Args` used for the
//! world server, generalized from flat env-only into the `config` crate's
//! layered `Figment`-style builder.

use anyhow::Result;
use clap::Parser;
use config::{Config, Environment, File};

use crate::types::RuntimeConfig;

/// CLI overrides, each optional so an absent flag leaves the
/// file/environment value untouched.
#[derive(Parser, Debug, Default)]
#[command(name = "realm-core-server", about = "Realm Core world server", version)]
pub struct Args {
    /// Path to a TOML config file. Missing file is not an error — the
    /// loader falls back to environment variables and defaults.
    #[arg(long, env = "REALM_CONFIG_FILE", default_value = "realm-core.toml")]
    pub config_file: String,

    #[arg(long, env = "REALM_LISTEN_ADDR", default_value = "0.0.0.0:9100")]
    pub listen_addr: String,

    #[arg(long, env = "REALM_AI_TICK_INTERVAL_MS")]
    pub ai_tick_interval_ms: Option<u64>,

    #[arg(long, env = "REALM_MAX_CREATURES_PER_TICK")]
    pub max_creatures_per_tick: Option<usize>,

    #[arg(long, env = "REALM_COMBAT_TIMEOUT_MS")]
    pub combat_timeout_ms: Option<u64>,

    #[arg(long, env = "REALM_SPATIAL_CELL_SIZE")]
    pub spatial_cell_size: Option<f32>,

    #[arg(long, env = "REALM_DATABASE_URL")]
    pub database_url: Option<String>,
}

/// Loads `RuntimeConfig` from, in increasing priority: built-in defaults,
/// the TOML file named by `args.config_file` (if present), `REALM_*`
/// environment variables, then any CLI flags explicitly passed.
pub fn load_runtime_config(args: &Args) -> Result<RuntimeConfig> {
    let defaults = RuntimeConfig::default();
    let builder = Config::builder()
        .add_source(Config::try_from(&defaults)?)
        .add_source(File::with_name(&args.config_file).required(false))
        .add_source(Environment::with_prefix("REALM").separator("_"));

    let mut resolved: RuntimeConfig = builder.build()?.try_deserialize()?;

    if let Some(v) = args.ai_tick_interval_ms {
        resolved.ai_tick_interval_ms = v;
    }
    if let Some(v) = args.max_creatures_per_tick {
        resolved.max_creatures_per_tick = v;
    }
    if let Some(v) = args.combat_timeout_ms {
        resolved.combat_timeout_ms = v;
    }
    if let Some(v) = args.spatial_cell_size {
        resolved.spatial_cell_size = v;
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flag_overrides_file_and_default() {
        let mut args = Args::parse_from(["realm-core-server"]);
        args.config_file = "/nonexistent/path/does-not-exist.toml".to_string();
        args.combat_timeout_ms = Some(5000);
        let cfg = load_runtime_config(&args).unwrap();
        assert_eq!(cfg.combat_timeout_ms, 5000);
        assert_eq!(cfg.ai_tick_interval_ms, 1000);
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let mut args = Args::parse_from(["realm-core-server"]);
        args.config_file = "/nonexistent/path/does-not-exist.toml".to_string();
        let cfg = load_runtime_config(&args).unwrap();
        assert_eq!(cfg.spatial_cell_size, 50.0);
    }
}
