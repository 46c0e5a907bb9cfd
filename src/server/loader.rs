//! Configuration loading
//!
//! Handles loading configuration from embedded defaults, files, and environment.

use super::config::AppConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use std::collections::BTreeMap;
use std::path::Path;

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// Environment variable prefix (`TABMUX_DETECTOR__DELAY_MS=500`)
pub const ENV_PREFIX: &str = "TABMUX";

/// Variables with this prefix add entries to the child environment
/// (`TABMUX_TERMINAL__ENV__ANTHROPIC_MODEL=...`)
pub const CHILD_ENV_PREFIX: &str = "TABMUX_TERMINAL__ENV__";

const LOCAL_CONFIG: &str = "config/local.toml";

/// Load configuration from files and environment
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let mut builder = Config::builder()
        // 1. Embedded defaults (always available)
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        // 2. Local overrides (optional)
        .add_source(File::with_name("config/local").required(false));

    // 3. File named on the command line (must exist)
    if let Some(path) = explicit {
        builder = builder.add_source(File::from(path.to_path_buf()).required(true));
    }

    let config = builder
        // 4. Environment variables (highest priority)
        // prefix_separator("_") keeps TABMUX_DETECTOR__DELAY_MS working;
        // config-rs 0.14 otherwise expects TABMUX__DETECTOR__DELAY_MS.
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut app: AppConfig = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // config-rs lowercases map keys; variable names must keep their case
    app.terminal.launch.env = child_environment(explicit, std::env::vars())?;
    Ok(app)
}

/// Layer `[terminal.env]` tables and `TABMUX_TERMINAL__ENV__*` variables
/// in the same order as [`load_config`], keeping key case.
fn child_environment<I>(explicit: Option<&Path>, vars: I) -> Result<BTreeMap<String, String>>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut env = BTreeMap::new();
    merge_env_table(&mut env, DEFAULT_CONFIG, "embedded defaults")?;

    let local = Path::new(LOCAL_CONFIG);
    let files = local
        .is_file()
        .then_some(local)
        .into_iter()
        .chain(explicit.filter(|path| path.extension().is_some_and(|ext| ext == "toml")));
    for path in files {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        merge_env_table(&mut env, &text, &path.display().to_string())?;
    }

    for (key, value) in vars {
        match key.strip_prefix(CHILD_ENV_PREFIX) {
            Some(name) if !name.is_empty() => {
                env.insert(name.to_string(), value);
            }
            _ => {}
        }
    }
    Ok(env)
}

fn merge_env_table(env: &mut BTreeMap<String, String>, text: &str, origin: &str) -> Result<()> {
    let table: toml::Table =
        toml::from_str(text).with_context(|| format!("Failed to parse {origin}"))?;
    let entries = table
        .get("terminal")
        .and_then(|terminal| terminal.get("env"))
        .and_then(toml::Value::as_table);
    for (key, value) in entries.into_iter().flatten() {
        let value = match value {
            toml::Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        env.insert(key.clone(), value);
    }
    Ok(())
}
