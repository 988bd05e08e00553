use anyhow::{Context, Result};
use serde::*;
use std::path::{Path, PathBuf};

use crate::paper::UnfoldOptions;

/// The user defaults, stored in the preference directory of the platform.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub options: UnfoldOptions,
}

impl Config {
    pub fn file_name() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("com", "papernet", "papernet")
            .ok_or(anyhow::anyhow!("Unknown configuration directory"))?;
        let dir = dirs.preference_dir();
        Ok(PathBuf::from(dir).join("papernet.json"))
    }
    pub fn load_from(file_name: &Path) -> Result<Config> {
        let f = std::fs::File::open(file_name)?;
        let f = std::io::BufReader::new(f);
        let cfg = serde_json::from_reader(f).with_context(|| format!("invalid configuration in {}", file_name.display()))?;
        Ok(cfg)
    }
    pub fn save_to(&self, file_name: &Path) -> Result<()> {
        if let Some(d) = file_name.parent() {
            std::fs::create_dir_all(d)?
        }
        let f = std::fs::File::create(file_name)?;
        let f = std::io::BufWriter::new(f);
        serde_json::to_writer_pretty(f, self)?;
        Ok(())
    }
    pub fn save(&self) -> Result<()> {
        let file_name = Self::file_name()?;
        self.save_to(&file_name)?;
        log::info!("defaults saved to {}", file_name.display());
        Ok(())
    }

    pub fn load_or_default() -> Config {
        match Self::file_name().and_then(|f| Self::load_from(&f)) {
            Ok(c) => c,
            Err(e) => {
                log::debug!("using the default configuration: {e:#}");
                Config::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_config_loads_back() {
        let dir = std::env::temp_dir().join(format!("papernet-config-{}", std::process::id()));
        let file = dir.join("papernet.json");
        let mut cfg = Config::default();
        cfg.options.scale = 0.25;
        cfg.options.seams = vec![1, 2];
        cfg.save_to(&file).unwrap();
        let loaded = Config::load_from(&file).unwrap();
        assert_eq!(loaded.options, cfg.options);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.options, UnfoldOptions::default());
    }
}
