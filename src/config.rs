//! Run configuration.
//!
//! Flags always win; an optional `.git-metrics.toml` in the working
//! directory supplies defaults for anything not passed on the command
//! line, so a repository can carry its own measurement setup.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::engine::RecoveryMode;

/// Name of the optional per-directory config file.
const CONFIG_FILE: &str = ".git-metrics.toml";

const DEFAULT_BRANCH: &str = "main";
const DEFAULT_WINDOW: usize = 500;
const DEFAULT_LEDGER: &str = "db.json";

/// Everything one run needs, resolved once up front and passed by value.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory of the repository being measured.
    pub dir: PathBuf,

    /// Shell command whose stdout is the metric value.
    pub command: String,

    /// Branch whose history is tracked.
    pub branch: String,

    /// How many recent commits the fetch window covers.
    pub window: usize,

    /// Path of the ledger document. A relative path resolves against the
    /// invoking directory, which keeps the ledger out of the measured tree.
    pub ledger_path: PathBuf,

    /// How failed evaluations are handled.
    pub mode: RecoveryMode,
}

/// The subset of configuration readable from `.git-metrics.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct FileConfig {
    cmd: Option<String>,
    branch: Option<String>,
    window: Option<usize>,
    ledger: Option<PathBuf>,
}

impl Config {
    /// Resolves the run configuration from flags over the optional config
    /// file in the working directory.
    ///
    /// A missing measurement command is fatal before any work begins.
    pub fn resolve(
        dir: Option<PathBuf>,
        cmd: Option<String>,
        branch: Option<String>,
        window: Option<usize>,
        ledger: Option<PathBuf>,
        non_interactive: bool,
    ) -> Result<Self, String> {
        let dir = dir.unwrap_or_else(|| PathBuf::from("."));
        let file = FileConfig::load(&dir)?;

        let command = cmd
            .or(file.cmd)
            .ok_or("no measurement command: pass --cmd or set `cmd` in .git-metrics.toml")?;

        Ok(Self {
            dir,
            command,
            branch: branch
                .or(file.branch)
                .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            window: window.or(file.window).unwrap_or(DEFAULT_WINDOW),
            ledger_path: ledger
                .or(file.ledger)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LEDGER)),
            mode: if non_interactive {
                RecoveryMode::Record
            } else {
                RecoveryMode::Interactive
            },
        })
    }
}

impl FileConfig {
    /// Loads `.git-metrics.toml` from `dir`. A missing file means no
    /// file-level defaults; a file that does not parse is fatal.
    fn load(dir: &Path) -> Result<Self, String> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;

        toml::from_str(&contents).map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn resolve_in(dir: &TempDir, cmd: Option<&str>) -> Result<Config, String> {
        Config::resolve(
            Some(dir.path().to_path_buf()),
            cmd.map(String::from),
            None,
            None,
            None,
            false,
        )
    }

    #[test]
    fn missing_command_is_fatal() {
        let dir = TempDir::new().unwrap();

        let err = resolve_in(&dir, None).unwrap_err();

        assert!(err.contains("--cmd"));
    }

    #[test]
    fn defaults_apply_without_a_config_file() {
        let dir = TempDir::new().unwrap();

        let config = resolve_in(&dir, Some("wc -c < out.bin")).unwrap();

        assert_eq!(config.command, "wc -c < out.bin");
        assert_eq!(config.branch, "main");
        assert_eq!(config.window, 500);
        assert_eq!(config.ledger_path, PathBuf::from("db.json"));
        assert_eq!(config.mode, RecoveryMode::Interactive);
    }

    #[test]
    fn config_file_supplies_missing_values() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "cmd = \"make size\"\nbranch = \"trunk\"\nwindow = 50\n",
        )
        .unwrap();

        let config = resolve_in(&dir, None).unwrap();

        assert_eq!(config.command, "make size");
        assert_eq!(config.branch, "trunk");
        assert_eq!(config.window, 50);
    }

    #[test]
    fn flags_override_the_config_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "cmd = \"make size\"\n").unwrap();

        let config = resolve_in(&dir, Some("stat -c %s out.bin")).unwrap();

        assert_eq!(config.command, "stat -c %s out.bin");
    }

    #[test]
    fn malformed_config_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "cmd = [broken\n").unwrap();

        let err = resolve_in(&dir, Some("true")).unwrap_err();

        assert!(err.contains("invalid config"));
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "comand = \"make size\"\n").unwrap();

        let err = resolve_in(&dir, Some("true")).unwrap_err();

        assert!(err.contains("invalid config"));
    }

    #[test]
    fn non_interactive_flag_selects_record_mode() {
        let dir = TempDir::new().unwrap();
        let config = Config::resolve(
            Some(dir.path().to_path_buf()),
            Some("true".to_string()),
            None,
            None,
            None,
            true,
        )
        .unwrap();

        assert_eq!(config.mode, RecoveryMode::Record);
    }
}
