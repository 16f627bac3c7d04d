pub mod types;

use std::collections::HashSet;
use std::path::Path;

use crate::error::{RealtyError, Result};
use types::Config;

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        RealtyError::Config(format!(
            "failed to read config file {}: {e}",
            path.display()
        ))
    })?;
    let config: Config = serde_yml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.sites.is_empty() {
        return Err(RealtyError::Config("at least one site is required".into()));
    }
    let mut ids = HashSet::new();
    for site in &config.sites {
        site.validate()?;
        if !ids.insert(site.id.to_lowercase()) {
            return Err(RealtyError::Config(format!(
                "site '{}' is configured twice",
                site.id
            )));
        }
    }
    if config.search.max_workers == 0 {
        return Err(RealtyError::Config(
            "search.max_workers must be at least 1".into(),
        ));
    }
    if let Some(endpoint) = &config.extractor.endpoint {
        url::Url::parse(endpoint)?;
    }
    Ok(())
}
