use std::path::{Path, PathBuf};

use anyhow::Context;

pub const HISTORY_FILE_ENV: &str = "WHOOP_HISTORY_FILE";
const APP_DIR: &str = "whoop-cli";
const HISTORY_FILE_NAME: &str = "sleep_history.json";

#[derive(Debug, Clone)]
pub struct Settings {
    pub history_file: PathBuf,
}

impl Settings {
    /// Picks the history file from the flag, then the environment, then the
    /// per-user config directory.
    pub fn resolve(history_file: Option<PathBuf>) -> anyhow::Result<Self> {
        let env_value = std::env::var_os(HISTORY_FILE_ENV).map(PathBuf::from);
        let config_dir = dirs::config_dir();
        Self::resolve_from(history_file, env_value, config_dir.as_deref())
    }

    fn resolve_from(
        flag: Option<PathBuf>,
        env_value: Option<PathBuf>,
        config_dir: Option<&Path>,
    ) -> anyhow::Result<Self> {
        let history_file = match flag.or(env_value.filter(|path| !path.as_os_str().is_empty())) {
            Some(path) => path,
            None => config_dir
                .map(|dir| dir.join(APP_DIR).join(HISTORY_FILE_NAME))
                .context("no config directory found; pass --history-file or set WHOOP_HISTORY_FILE")?,
        };

        Ok(Self { history_file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins_over_environment() -> anyhow::Result<()> {
        let settings = Settings::resolve_from(
            Some(PathBuf::from("/tmp/flag.json")),
            Some(PathBuf::from("/tmp/env.json")),
            Some(Path::new("/home/user/.config")),
        )?;
        assert_eq!(settings.history_file, PathBuf::from("/tmp/flag.json"));
        Ok(())
    }

    #[test]
    fn falls_back_to_config_directory() -> anyhow::Result<()> {
        let settings = Settings::resolve_from(
            None,
            Some(PathBuf::new()),
            Some(Path::new("/home/user/.config")),
        )?;
        assert_eq!(
            settings.history_file,
            PathBuf::from("/home/user/.config/whoop-cli/sleep_history.json")
        );
        Ok(())
    }

    #[test]
    fn errors_without_any_location() {
        assert!(Settings::resolve_from(None, None, None).is_err());
    }
}
