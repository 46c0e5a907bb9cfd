//! `tabmux config`: print the effective configuration.

use crate::server::config::AppConfig;
use anyhow::{Context, Result};

pub fn run(config: &AppConfig) -> Result<()> {
    let text = config.to_toml().context("Failed to render configuration")?;
    print!("{text}");
    Ok(())
}
