//! Worker configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use edge_core::{BuildMetadata, LayoutRecord};
use edge_observability::{LogFormat, LogLevel};
use serde::{Deserialize, Serialize};

/// File names searched for when no config path is given.
const CONFIG_NAMES: [&str; 3] = ["edge-worker.toml", ".edge-worker.toml", "edge-worker.json"];

/// Worker configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Worker identity.
    #[serde(default)]
    pub worker: WorkerSection,

    /// Static render inputs.
    #[serde(default)]
    pub build: BuildSection,

    /// External renderer.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Directory relative paths in this config resolve against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl WorkerConfig {
    /// Load config from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?
        };

        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    /// Load the given config, or search upwards from `cwd` for one.
    ///
    /// With no config anywhere the defaults apply.
    pub fn resolve(path: Option<&Path>, cwd: &Path) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::find(cwd) {
                Some(path) => {
                    tracing::debug!(path = %path.display(), "using discovered config");
                    Self::load(&path)
                }
                None => Ok(Self {
                    base_dir: cwd.to_path_buf(),
                    ..Self::default()
                }),
            },
        }
    }

    /// Find a config file in `start` or its parents.
    pub fn find(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            for name in CONFIG_NAMES {
                let candidate = current.join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Build metadata from `metadata_file` if set, else from the inline lists.
    pub fn metadata(&self) -> Result<BuildMetadata> {
        match &self.build.metadata_file {
            Some(file) => {
                let path = self.base_dir.join(file);
                let content = std::fs::read_to_string(&path).with_context(|| {
                    format!("Failed to read build metadata: {}", path.display())
                })?;
                serde_json::from_str(&content).with_context(|| {
                    format!("Failed to parse build metadata: {}", path.display())
                })
            }
            None => Ok(BuildMetadata::new(
                self.build.layout.clone(),
                self.build.bootstrap.clone(),
            )),
        }
    }
}

/// Worker identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSection {
    /// Name reported in every log line.
    #[serde(default = "default_name")]
    pub name: String,
}

fn default_name() -> String {
    "edge-worker".to_string()
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            name: default_name(),
        }
    }
}

/// Static render inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildSection {
    /// Layout records from the route root down to the page.
    #[serde(default)]
    pub layout: Vec<LayoutRecord>,

    /// Bootstrap chunk list.
    #[serde(default)]
    pub bootstrap: Vec<String>,

    /// JSON file holding `layout` and `bootstrap`; takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_file: Option<PathBuf>,
}

/// External renderer command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Program to run per request.
    #[serde(default)]
    pub command: Option<String>,

    /// Program arguments.
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment variables.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Content type reported for every result.
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Log output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Line format.
    #[serde(default)]
    pub format: LogFormat,

    /// Minimum level.
    #[serde(default = "default_level")]
    pub level: LogLevel,
}

fn default_level() -> LogLevel {
    LogLevel::Info
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_level(),
        }
    }
}
