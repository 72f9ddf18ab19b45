use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Output template appended to the download dir for the default `-o` flag.
const DEFAULT_OUTPUT_TEMPLATE: &str = "%(title)s [%(id)s].%(ext)s";

/// Global configuration loaded from `~/.config/dlq/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqConfig {
    /// Directory the tool downloads into. Artifact deletion never leaves it.
    pub download_dir: PathBuf,
    /// Tool cache/config/home directory (exported as XDG_CACHE_HOME, XDG_CONFIG_HOME, HOME).
    pub config_dir: PathBuf,
    /// Number of worker tasks; each runs one job at a time.
    pub max_concurrent: usize,
    /// Capacity of the pending-job queue. Enqueue beyond it fails the job.
    pub queue_capacity: usize,
    /// Tool executable: a path, or a bare name looked up on PATH.
    pub tool_path: PathBuf,
    /// Optional interpreter to run `tool_path` under (e.g. `python3` for a zipapp).
    #[serde(default)]
    pub interpreter: Option<PathBuf>,
    /// Arguments placed before every job's own arguments. If missing, built-in defaults are used.
    #[serde(default)]
    pub default_args: Option<Vec<String>>,
    /// Upper bound for one-shot format listings.
    pub format_query_timeout_secs: u64,
    /// Time between SIGTERM and a forced kill when a job is cancelled or paused.
    pub kill_grace_ms: u64,
}

impl Default for DlqConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("./downloads"),
            config_dir: PathBuf::from("./config"),
            max_concurrent: 2,
            queue_capacity: 512,
            tool_path: PathBuf::from("yt-dlp"),
            interpreter: None,
            default_args: None,
            format_query_timeout_secs: 60,
            kill_grace_ms: 2000,
        }
    }
}

impl DlqConfig {
    /// Tool cache directory under `config_dir`.
    pub fn cache_dir(&self) -> PathBuf {
        self.config_dir.join("cache")
    }

    pub fn format_query_timeout(&self) -> Duration {
        Duration::from_secs(self.format_query_timeout_secs.max(1))
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }

    /// Arguments applied to every download. `--newline` is what makes progress parseable.
    pub fn effective_default_args(&self) -> Vec<String> {
        if let Some(args) = &self.default_args {
            return args.clone();
        }
        let output = self.download_dir.join(DEFAULT_OUTPUT_TEMPLATE);
        [
            "--newline",
            "--no-colors",
            "--ignore-errors",
            "--no-overwrites",
            "--continue",
            "--extractor-args",
            "youtube:player_client=android,web",
            "--sleep-interval",
            "2",
            "--max-sleep-interval",
            "6",
            "--cache-dir",
        ]
        .iter()
        .map(|s| s.to_string())
        .chain([
            self.cache_dir().to_string_lossy().into_owned(),
            "-o".to_string(),
            output.to_string_lossy().into_owned(),
        ])
        .collect()
    }

    /// Create the download dir and tool cache dir if missing.
    pub fn ensure_dirs(&self) -> Result<()> {
        ensure_dir(&self.download_dir)?;
        ensure_dir(&self.cache_dir())?;
        Ok(())
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("create directory {}", path.display()))
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dlq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<DlqConfig> {
    let path = config_path()?;
    load_or_init_at(&path)
}

/// Same as [`load_or_init`] for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<DlqConfig> {
    if !path.exists() {
        let default_cfg = DlqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let cfg: DlqConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
