use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_logging::{engine_info, engine_warn};
use mirror_core::InterceptTiming;
use mirror_engine::{
    FetchSettings, HarvestSettings, InterceptSettings, TransferSettings, DEFAULT_CONCURRENCY,
    DEFAULT_LISTING_URL, DEFAULT_USER_AGENT,
};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

pub(crate) const SETTINGS_FILENAME: &str = "catalog_mirror.ron";

/// Interception timing, in whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct InterceptConfig {
    pub ceiling_secs: u64,
    pub challenge_poll_secs: u64,
    pub observe_poll_secs: u64,
    pub settle_secs: u64,
}

impl Default for InterceptConfig {
    fn default() -> Self {
        Self {
            ceiling_secs: 120,
            challenge_poll_secs: 5,
            observe_poll_secs: 1,
            settle_secs: 3,
        }
    }
}

/// Everything the binary reads from `catalog_mirror.ron`. Absent fields keep
/// their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct MirrorSettings {
    pub data_dir: PathBuf,
    pub listing_url: String,
    pub concurrency: usize,
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub redirect_limit: usize,
    pub max_page_bytes: u64,
    pub transfer_metadata_timeout_secs: u64,
    pub transfer_body_timeout_secs: u64,
    pub intercept: InterceptConfig,
    pub browser_executable: Option<PathBuf>,
    pub headless: bool,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/clones"),
            listing_url: DEFAULT_LISTING_URL.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            redirect_limit: 5,
            max_page_bytes: 5 * 1024 * 1024,
            transfer_metadata_timeout_secs: 30,
            transfer_body_timeout_secs: 60,
            intercept: InterceptConfig::default(),
            browser_executable: None,
            headless: false,
        }
    }
}

impl MirrorSettings {
    /// Reads `explicit`, or `catalog_mirror.ron` in the working directory.
    /// Missing or malformed files give defaults.
    pub fn load(explicit: Option<&Path>) -> Self {
        let path = explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(SETTINGS_FILENAME));
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                if explicit.is_some() {
                    engine_warn!("Settings file {:?} not found, using defaults", path);
                }
                return Self::default();
            }
            Err(err) => {
                engine_warn!("Failed to read settings from {:?}: {}", path, err);
                return Self::default();
            }
        };

        match ron::from_str(&content) {
            Ok(settings) => {
                engine_info!("Loaded settings from {:?}", path);
                settings
            }
            Err(err) => {
                engine_warn!("Failed to parse settings from {:?}: {}", path, err);
                Self::default()
            }
        }
    }

    /// Command-line flags win over the file.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(dir) = &cli.data_dir {
            self.data_dir = dir.clone();
        }
        if let Some(url) = &cli.listing_url {
            self.listing_url = url.clone();
        }
        if let Some(concurrency) = cli.concurrency {
            self.concurrency = concurrency;
        }
    }

    pub fn fetch(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            redirect_limit: self.redirect_limit,
            max_bytes: self.max_page_bytes,
            user_agent: self.user_agent.clone(),
            ..FetchSettings::default()
        }
    }

    pub fn transfer(&self) -> TransferSettings {
        TransferSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            metadata_timeout: Duration::from_secs(self.transfer_metadata_timeout_secs),
            body_timeout: Duration::from_secs(self.transfer_body_timeout_secs),
            user_agent: self.user_agent.clone(),
            ..TransferSettings::default()
        }
    }

    pub fn intercept(&self) -> InterceptSettings {
        InterceptSettings {
            ceiling: Duration::from_secs(self.intercept.ceiling_secs),
            timing: InterceptTiming {
                settle: Duration::from_secs(self.intercept.settle_secs),
                challenge_poll: Duration::from_secs(self.intercept.challenge_poll_secs),
                observe_poll: Duration::from_secs(self.intercept.observe_poll_secs),
            },
        }
    }

    pub fn harvest(&self) -> HarvestSettings {
        HarvestSettings {
            listing_url: self.listing_url.clone(),
            concurrency: self.concurrency.max(1),
        }
    }

    #[cfg(feature = "chromium")]
    pub fn chromium(&self) -> mirror_engine::ChromiumSettings {
        mirror_engine::ChromiumSettings {
            executable: self.browser_executable.clone(),
            headless: self.headless,
        }
    }
}
