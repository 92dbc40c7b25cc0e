use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn db_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("logs.db"))
    }

    pub fn trace_log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("matchking.log"))
    }

    pub fn config_file(name: &str) -> Option<PathBuf> {
        ProjectDirs::from("", "", "matchking").map(|pd| pd.config_dir().join(name))
    }

    fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("matchking"),
            )
        } else {
            ProjectDirs::from("", "", "matchking").map(|pd| pd.data_local_dir().to_path_buf())
        }
    }
}
