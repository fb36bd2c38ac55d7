//! Wave analysis settings.
//!
//! Layered like the rest of our tooling: built-in defaults, then an
//! optional TOML file, then `CIC_WAVE_*` environment variables (`__` for
//! nesting, e.g. `CIC_WAVE_UPSTREAM__VERSION=2017.22`).

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WaveError};
use crate::model::JobRole;
use crate::sanitize::DEFAULT_CREDENTIAL_PARAMS;

const ENV_PREFIX: &str = "CIC_WAVE";
const CONFIG_FILE_NAME: &str = "cic-wave.toml";

/// One Jenkins job taking part in a wave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Job path below the Jenkins root, e.g. `job/Cloud/job/Cloud_system_admin`.
    pub path: String,
    /// Snapshot base name; `<snapshot>.json` and `<snapshot> - origin.json`.
    pub snapshot: String,
    /// Version the wave deploys for this job.
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveConfig {
    #[serde(default = "default_jenkins_url")]
    pub jenkins_url: String,

    #[serde(default = "default_cic_url")]
    pub cic_url: String,

    /// File holding a single `user:password` line, used for Jenkins and CIC.
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,

    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,

    /// Job whose latest finish closes the wave.
    #[serde(default = "default_upstream")]
    pub upstream: JobConfig,

    /// Job whose earliest start opens the wave.
    #[serde(default = "default_downstream")]
    pub downstream: JobConfig,

    /// Update groups kept when building the group membership file.
    #[serde(default = "default_known_groups")]
    pub known_groups: Vec<String>,

    /// Groups reported by `analyze`.
    #[serde(default = "default_report_groups")]
    pub report_groups: Vec<String>,

    /// Single instances reported by `analyze`.
    #[serde(default)]
    pub instances: Vec<String>,

    /// Build parameters removed before snapshots are written.
    #[serde(default = "default_credential_params")]
    pub credential_params: Vec<String>,

    /// Log how long each stage took at info level.
    #[serde(default)]
    pub print_timings: bool,
}

impl WaveConfig {
    pub fn job(&self, role: JobRole) -> &JobConfig {
        match role {
            JobRole::Upstream => &self.upstream,
            JobRole::Downstream => &self.downstream,
        }
    }
}

fn default_jenkins_url() -> String {
    "https://vandevopsjenkins01.pgdev.sap.corp".to_string()
}
fn default_cic_url() -> String {
    cic_client::DEFAULT_CIC_URL.to_string()
}
fn default_credentials_file() -> PathBuf {
    PathBuf::from("authentication").join("account.txt")
}
fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("wave-snapshots")
}
fn default_upstream() -> JobConfig {
    JobConfig {
        path: "job/Cloud/job/Cloud_system_admin".to_string(),
        snapshot: "fpa log".to_string(),
        version: "2017.21".to_string(),
    }
}
fn default_downstream() -> JobConfig {
    JobConfig {
        path: "job/Cloud/job/HCP_Component_Update".to_string(),
        snapshot: "epm log".to_string(),
        version: "1.00.201721.01".to_string(),
    }
}
fn default_known_groups() -> Vec<String> {
    [
        "Group1-EU", "Group1-AP", "Group1-US", "Group2-EU", "Group2-AP", "Group2-US", "Group3-EU",
        "Group3-AP", "Group3-US",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_report_groups() -> Vec<String> {
    [
        "Group1-AP", "Group1-EU", "Group1-US", "Group2-AP", "Group2-EU", "Group2-US",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_credential_params() -> Vec<String> {
    DEFAULT_CREDENTIAL_PARAMS.iter().map(|s| s.to_string()).collect()
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            jenkins_url: default_jenkins_url(),
            cic_url: default_cic_url(),
            credentials_file: default_credentials_file(),
            snapshot_dir: default_snapshot_dir(),
            upstream: default_upstream(),
            downstream: default_downstream(),
            known_groups: default_known_groups(),
            report_groups: default_report_groups(),
            instances: Vec::new(),
            credential_params: default_credential_params(),
            print_timings: false,
        }
    }
}

/// Configuration loader with layered merging.
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn load(&self) -> Result<WaveConfig> {
        let defaults = serde_json::to_string(&WaveConfig::default())?;
        let mut builder =
            Config::builder().add_source(File::from_str(&defaults, config::FileFormat::Json));

        if let Some(path) = &self.config_path {
            if !path.exists() {
                return Err(WaveError::Config(format!(
                    "configuration file not found at {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path.as_path()));
        }

        // Values stay strings: versions such as 2017.20 must not be read as
        // floats.
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );

        let config: WaveConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Look for `./cic-wave.toml`, then `<config dir>/cic-wave/config.toml`.
    pub fn find_config_file() -> Option<PathBuf> {
        let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
        if cwd_config.exists() {
            return Some(cwd_config);
        }
        let user_config = dirs::config_dir()?.join("cic-wave").join("config.toml");
        user_config.exists().then_some(user_config)
    }

    /// Load from the explicit file if given, else from the default
    /// locations.
    pub fn load_from(path: Option<&Path>) -> Result<WaveConfig> {
        let loader = match path.map(Path::to_path_buf).or_else(Self::find_config_file) {
            Some(path) => ConfigLoader::new().with_file(path),
            None => ConfigLoader::new(),
        };
        loader.load()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Account used for Jenkins (Basic auth) and CIC.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read the first line of `path` as `user:password`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| WaveError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).ok_or_else(|| WaveError::Credentials {
            path: path.to_path_buf(),
        })
    }

    pub fn parse(content: &str) -> Option<Self> {
        let line = content.lines().next()?.trim();
        let (user, password) = line.split_once(':')?;
        if user.is_empty() || password.is_empty() || password.contains(':') {
            return None;
        }
        Some(Self {
            user: user.to_string(),
            password: password.to_string(),
        })
    }
}
