//! Runtime configuration.
//!
//! Values come from `AUTOCUT_*` environment variables; the CLI overrides them
//! with flags.

use autocut_core::types::FeatureFlags;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_ROOT: &str = "AUTOCUT_ROOT";
pub const ENV_LITE: &str = "AUTOCUT_LITE";
pub const ENV_TOOL_TIMEOUT: &str = "AUTOCUT_TOOL_TIMEOUT_SECS";
pub const ENV_WHISPER_BIN: &str = "AUTOCUT_WHISPER_BIN";
pub const ENV_WHISPER_MODEL: &str = "AUTOCUT_WHISPER_MODEL";

pub const DEFAULT_ROOT: &str = "/tmp/autocut";
pub const DEFAULT_WHISPER_BIN: &str = "whisper-cli";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhisperConfig {
    pub binary: PathBuf,
    pub model: PathBuf,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutocutConfig {
    /// Parent of the uploads, outputs, processing and styles directories.
    pub root: PathBuf,
    pub features: FeatureFlags,
    /// Upper bound for a single external tool call. `None` waits forever.
    pub tool_timeout_secs: Option<u64>,
    /// Speech-to-text engine. Without it every job uses placeholder lines.
    pub whisper: Option<WhisperConfig>,
}

impl Default for AutocutConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            features: FeatureFlags::FULL,
            tool_timeout_secs: None,
            whisper: None,
        }
    }
}

impl AutocutConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source. Unparseable values
    /// are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(root) = lookup(ENV_ROOT).filter(|v| !v.trim().is_empty()) {
            config.root = PathBuf::from(root);
        }

        if lookup(ENV_LITE).is_some_and(|v| is_truthy(&v)) {
            config.features = FeatureFlags::LITE;
        }

        if let Some(raw) = lookup(ENV_TOOL_TIMEOUT) {
            match raw.trim().parse::<u64>() {
                Ok(0) => {}
                Ok(secs) => config.tool_timeout_secs = Some(secs),
                Err(_) => tracing::warn!("ignoring {}={:?}: not a number", ENV_TOOL_TIMEOUT, raw),
            }
        }

        if let Some(model) = lookup(ENV_WHISPER_MODEL).filter(|v| !v.trim().is_empty()) {
            let binary = lookup(ENV_WHISPER_BIN)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_WHISPER_BIN.to_string());
            config.whisper = Some(WhisperConfig {
                binary: PathBuf::from(binary),
                model: PathBuf::from(model),
                language: None,
            });
        }

        config
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs.map(Duration::from_secs)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join("uploads")
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.root.join("outputs")
    }

    pub fn processing_dir(&self) -> PathBuf {
        self.root.join("processing")
    }

    pub fn styles_dir(&self) -> PathBuf {
        self.root.join("styles")
    }

    /// Scratch directory of one job.
    pub fn work_dir(&self, job_id: &str) -> PathBuf {
        self.processing_dir().join(job_id)
    }

    pub fn output_path(&self, job_id: &str) -> PathBuf {
        self.outputs_dir().join(format!("{job_id}_processed.mp4"))
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.uploads_dir(),
            self.outputs_dir(),
            self.processing_dir(),
            self.styles_dir(),
        ] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = root.as_ref().to_path_buf();
        self
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = AutocutConfig::from_lookup(lookup(&[]));
        assert_eq!(config, AutocutConfig::default());
        assert_eq!(config.uploads_dir(), PathBuf::from("/tmp/autocut/uploads"));
        assert_eq!(
            config.output_path("ab12cd34"),
            PathBuf::from("/tmp/autocut/outputs/ab12cd34_processed.mp4")
        );
    }

    #[test]
    fn environment_overrides() {
        let config = AutocutConfig::from_lookup(lookup(&[
            (ENV_ROOT, "/srv/autocut"),
            (ENV_LITE, "TRUE"),
            (ENV_TOOL_TIMEOUT, "600"),
            (ENV_WHISPER_MODEL, "/models/ggml-base.bin"),
        ]));

        assert_eq!(config.root, PathBuf::from("/srv/autocut"));
        assert_eq!(config.features, FeatureFlags::LITE);
        assert_eq!(config.tool_timeout(), Some(Duration::from_secs(600)));
        let whisper = config.whisper.unwrap();
        assert_eq!(whisper.binary, PathBuf::from(DEFAULT_WHISPER_BIN));
        assert_eq!(whisper.model, PathBuf::from("/models/ggml-base.bin"));
    }

    #[test]
    fn bad_values_are_ignored() {
        let config = AutocutConfig::from_lookup(lookup(&[
            (ENV_LITE, "nope"),
            (ENV_TOOL_TIMEOUT, "soon"),
            (ENV_WHISPER_BIN, "/opt/whisper"),
        ]));
        assert_eq!(config.features, FeatureFlags::FULL);
        assert_eq!(config.tool_timeout_secs, None);
        // a binary without a model is not enough to transcribe
        assert!(config.whisper.is_none());
    }

    #[test]
    fn ensure_dirs_creates_tree() {
        let dir = tempfile::tempdir().unwrap();
        let config = AutocutConfig::default().with_root(dir.path().join("root"));
        config.ensure_dirs().unwrap();
        for sub in ["uploads", "outputs", "processing", "styles"] {
            assert!(dir.path().join("root").join(sub).is_dir(), "{sub}");
        }
    }
}
