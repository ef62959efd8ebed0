mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./vidmirror.toml",
        "~/.config/vidmirror/config.toml",
        "/etc/vidmirror/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let sync = &config.sync;

    if sync.source_root == sync.output_root {
        anyhow::bail!("source_root and output_root must be distinct");
    }
    if sync.output_root.starts_with(&sync.source_root) {
        anyhow::bail!("output_root must not be nested inside source_root");
    }
    if sync.state_dir.starts_with(&sync.source_root) {
        anyhow::bail!("state_dir must not be nested inside source_root");
    }

    if config.encoding.cpu_used > 5 {
        anyhow::bail!("encoding.cpu_used must be in 0-5");
    }

    if !sync.source_root.exists() {
        tracing::warn!("Source root does not exist yet: {:?}", sync.source_root);
    }

    Ok(())
}
