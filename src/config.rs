//! Mission configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default retry budget for the QA loop.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default engine call timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Everything a mission run needs beyond the goal itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionConfig {
    /// Directory of agent profile files.
    pub hats_dir: PathBuf,
    /// Directory for archived mission records.
    pub missions_dir: PathBuf,
    /// Retry budget for the QA loop.
    pub max_retries: u32,
    /// Timeout for a single engine call, in seconds.
    pub timeout_secs: u64,
    /// External generation engine command.
    pub engine_cmd: String,
    /// Skip the manual review prompt, approving escalated output.
    pub auto_approve: bool,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            hats_dir: PathBuf::from("./hats"),
            missions_dir: PathBuf::from("./missions"),
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            engine_cmd: "claude".to_string(),
            auto_approve: false,
        }
    }
}

impl MissionConfig {
    pub fn with_hats_dir(mut self, dir: PathBuf) -> Self {
        self.hats_dir = dir;
        self
    }

    pub fn with_missions_dir(mut self, dir: PathBuf) -> Self {
        self.missions_dir = dir;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_engine_cmd(mut self, cmd: &str) -> Self {
        self.engine_cmd = cmd.to_string();
        self
    }

    pub fn with_auto_approve(mut self, auto_approve: bool) -> Self {
        self.auto_approve = auto_approve;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = MissionConfig::default();
        assert_eq!(config.hats_dir, PathBuf::from("./hats"));
        assert_eq!(config.missions_dir, PathBuf::from("./missions"));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.timeout(), Duration::from_secs(120));
        assert!(!config.auto_approve);
    }

    #[test]
    fn test_config_builder() {
        let config = MissionConfig::default()
            .with_hats_dir(PathBuf::from("/tmp/hats"))
            .with_missions_dir(PathBuf::from("/tmp/missions"))
            .with_max_retries(1)
            .with_timeout_secs(5)
            .with_engine_cmd("mock-engine")
            .with_auto_approve(true);

        assert_eq!(config.hats_dir, PathBuf::from("/tmp/hats"));
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.engine_cmd, "mock-engine");
        assert!(config.auto_approve);
    }
}
