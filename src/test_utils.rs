pub mod test_helpers {
    use crate::config::AppConfig;
    use crate::models::descriptor::DescriptorDraft;
    use crate::AppState;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Poll interval short enough for tests to observe changes quickly
    pub const TEST_POLL_INTERVAL: Duration = Duration::from_millis(25);

    /// Configuration rooted at a fresh temporary directory
    ///
    /// Keep the returned `TempDir` alive for the duration of the test.
    pub fn test_config(keep_alive: Duration) -> (AppConfig, TempDir) {
        let dir = TempDir::new().expect("failed to create temp dir");
        let config = AppConfig {
            filesystem_root: dir.path().to_path_buf(),
            keep_alive,
            watch_poll_interval: TEST_POLL_INTERVAL,
            connect_timeout: Duration::from_secs(2),
            ..AppConfig::default()
        };
        (config, dir)
    }

    /// Application state over a temporary filesystem root
    pub fn create_test_state() -> (AppState, TempDir) {
        let (config, dir) = test_config(Duration::from_secs(15));
        (AppState::new(config), dir)
    }

    /// Stdio draft for a long-running process that ignores its input
    pub fn sleeper_draft() -> DescriptorDraft {
        DescriptorDraft::stdio("sleep", "30").named("sleeper")
    }

    /// Stdio draft that echoes stdin to stdout
    pub fn cat_draft() -> DescriptorDraft {
        DescriptorDraft::stdio("cat", "").named("cat")
    }
}
