use crate::channel::logs::POLL_INTERVAL;
use crate::engine::DISASM_WINDOW;
use crate::muted_error;
use crate::ui::tui::config::KeyMap;
use anyhow::Context;
use serde::Deserialize;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

/// Application user interface config.
#[derive(Debug)]
pub struct UIConfig {
    /// Number of instructions in a single disassembly window.
    pub disasm_window: usize,
    /// Period between two log buffer polls.
    pub log_poll_interval: Duration,
    /// Disassembly follows the innermost call stack frame.
    pub follow: bool,
    /// Keymap for TUI.
    pub tui_keymap: KeyMap,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            disasm_window: DISASM_WINDOW,
            log_poll_interval: POLL_INTERVAL,
            follow: true,
            tui_keymap: KeyMap::default(),
        }
    }
}

/// Content of a configuration file, all keys are optional.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub disasm_window: Option<usize>,
    pub log_poll_ms: Option<u64>,
    pub follow: Option<bool>,
    /// Path to a keymap file.
    pub keymap: Option<String>,
}

impl FileConfig {
    const DEFAULT_PATH: &'static str = ".config/panescope/config.toml";

    /// Load configuration from `path`. If path is not set, a file from the default location
    /// is used, a missing default file is not an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let data = match path {
            Some(path) => read_to_string(path)
                .with_context(|| format!("read config file {}", path.display()))?,
            None => {
                let Some(path) = home::home_dir().map(|home| home.join(Self::DEFAULT_PATH))
                else {
                    return Ok(Self::default());
                };
                match muted_error!(read_to_string(path)) {
                    Some(data) => data,
                    None => return Ok(Self::default()),
                }
            }
        };

        Self::parse(&data)
    }

    pub fn parse(data: &str) -> anyhow::Result<Self> {
        toml::de::from_str(data).context("parse config file")
    }

    /// Build final configuration, `keymap_path` takes precedence over a path from the file.
    pub fn into_ui_config(self, keymap_path: Option<PathBuf>) -> UIConfig {
        let defaults = UIConfig::default();
        let keymap_path = keymap_path
            .map(|p| p.to_string_lossy().to_string())
            .or(self.keymap);

        UIConfig {
            disasm_window: self
                .disasm_window
                .filter(|w| *w > 0)
                .unwrap_or(defaults.disasm_window),
            log_poll_interval: self
                .log_poll_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.log_poll_interval),
            follow: self.follow.unwrap_or(defaults.follow),
            tui_keymap: KeyMap::from_file(keymap_path.as_deref()).unwrap_or(defaults.tui_keymap),
        }
    }
}

/// Read-only ui configuration (set only once, at application start).
static CONFIG: OnceLock<UIConfig> = OnceLock::new();

/// Set initial configuration.
pub fn set(config: UIConfig) {
    CONFIG.set(config).expect("should called once");
}

/// Return application ui config.
pub fn current() -> &'static UIConfig {
    CONFIG.get_or_init(UIConfig::default)
}

#[cfg(test)]
mod test {
    use crate::ui::config::FileConfig;
    use std::time::Duration;

    #[test]
    fn test_file_config() {
        let file = FileConfig::parse(
            r#"
            disasm_window = 64
            log_poll_ms = 500
            "#,
        )
        .unwrap();
        assert_eq!(file.disasm_window, Some(64));
        assert_eq!(file.follow, None);

        let config = file.into_ui_config(None);
        assert_eq!(config.disasm_window, 64);
        assert_eq!(config.log_poll_interval, Duration::from_millis(500));
        assert!(config.follow);

        assert!(FileConfig::parse("window = 1").is_err());
        assert_eq!(FileConfig::parse("").unwrap(), FileConfig::default());
    }
}
