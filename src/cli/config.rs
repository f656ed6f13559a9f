//! Show the effective configuration

use ribbon_core::error::{Result, RibbonError};
use ribbon_core::RibbonConfig;

/// Handle the config command
pub fn handle(config: &RibbonConfig) -> Result<()> {
    let rendered =
        toml::to_string_pretty(config).map_err(|e| RibbonError::Other(e.to_string()))?;
    println!("{}", rendered);
    println!("# active ttl: {}ms", config.active_ttl().as_millis());
    Ok(())
}
