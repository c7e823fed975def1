use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("studyclock"),
            )
        } else {
            ProjectDirs::from("", "", "studyclock")
                .map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }

    /// Where reports go when neither the CLI nor the config names a path
    pub fn report_dir() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("reports"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_dir_nests_under_state_dir() {
        if let (Some(state), Some(reports)) = (AppDirs::state_dir(), AppDirs::report_dir()) {
            assert_eq!(reports, state.join("reports"));
            assert!(state.ends_with("studyclock"));
        }
    }
}
