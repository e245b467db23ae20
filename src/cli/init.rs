//! `eavesdrop init` — write a default config file.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::{self, ConfigFormat};
use crate::log;

/// Write the default config into `out` using the chosen encoding.
pub fn generate(out: &Path, format: ConfigFormat) -> Result<()> {
    std::fs::create_dir_all(out)
        .with_context(|| format!("failed to create {}", out.display()))?;

    let path = config::write_default(out, format)?;
    log!("init"; "wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_generate_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();

        for format in [ConfigFormat::Json, ConfigFormat::Toml, ConfigFormat::Yaml] {
            generate(dir.path(), format).unwrap();
            let path = dir.path().join(format.file_name());
            assert!(path.is_file());
            Config::load(&path).unwrap();
        }
    }
}
