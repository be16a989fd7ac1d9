use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{FaturaError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    /// Minimum description-overlap score for linking a refund to its expense.
    #[serde(default = "default_similarity_threshold")]
    pub reversal_similarity_threshold: f64,
    /// Minimum holder-name overlap score when several cards share last-four.
    #[serde(default = "default_similarity_threshold")]
    pub holder_similarity_threshold: f64,
}

fn default_similarity_threshold() -> f64 {
    0.5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            reversal_similarity_threshold: default_similarity_threshold(),
            holder_similarity_threshold: default_similarity_threshold(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("fatura")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("fatura")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| FaturaError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn get_data_dir() -> PathBuf {
    PathBuf::from(&load_settings().data_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let settings = Settings {
            data_dir: "/tmp/test".to_string(),
            reversal_similarity_threshold: 0.6,
            holder_similarity_threshold: 0.4,
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        let loaded: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.data_dir, "/tmp/test");
        assert_eq!(loaded.reversal_similarity_threshold, 0.6);
        assert_eq!(loaded.holder_similarity_threshold, 0.4);
    }

    #[test]
    fn test_thresholds_default_when_missing() {
        let json = r#"{"data_dir": "/tmp/test"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.reversal_similarity_threshold, 0.5);
        assert_eq!(s.holder_similarity_threshold, 0.5);
    }
}
