use std::{
    env, fs,
    path::{Path, PathBuf},
};

#[derive(Debug, thiserror::Error)]
pub enum HomeDirError {
    #[error("HOME environment variable is not set")]
    HomeMissing,
    #[error("APPDATA environment variable is not set")]
    AppDataMissing,
    #[error("home_dir must be an absolute path (after ~ expansion): {0}")]
    AbsoluteRequired(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolve the host's home directory.
///
/// - `config_home` given: a leading `~` expands to the user's home; the result
///   must be absolute.
/// - otherwise: `$HOME/<default_subdir>` (`%APPDATA%` on Windows).
///
/// With `create`, the directory is created if missing.
pub fn resolve_home_dir(
    config_home: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf, HomeDirError> {
    let path = resolve_with(config_home, default_subdir, &Platform::from_env())?;
    if create {
        fs::create_dir_all(&path)?;
    }
    Ok(path)
}

/// Environment inputs, split out so resolution is testable without touching
/// process-wide variables.
#[derive(Debug, Default, Clone)]
struct Platform {
    user_home: Option<PathBuf>,
    app_data: Option<PathBuf>,
}

impl Platform {
    fn from_env() -> Self {
        #[cfg(target_os = "windows")]
        let user_home = env::var_os("USERPROFILE").or_else(|| env::var_os("HOME"));
        #[cfg(not(target_os = "windows"))]
        let user_home = env::var_os("HOME");

        Self {
            user_home: user_home.map(PathBuf::from),
            app_data: env::var_os("APPDATA").map(PathBuf::from),
        }
    }

    fn default_base(&self) -> Result<&Path, HomeDirError> {
        if cfg!(target_os = "windows") {
            self.app_data.as_deref().ok_or(HomeDirError::AppDataMissing)
        } else {
            self.user_home.as_deref().ok_or(HomeDirError::HomeMissing)
        }
    }
}

fn resolve_with(
    config_home: Option<String>,
    default_subdir: &str,
    platform: &Platform,
) -> Result<PathBuf, HomeDirError> {
    let Some(raw) = config_home else {
        return Ok(platform.default_base()?.join(default_subdir));
    };

    let expanded = match raw.strip_prefix('~') {
        Some(rest) => {
            let home = platform
                .user_home
                .as_deref()
                .ok_or(HomeDirError::HomeMissing)?;
            let rest = rest.trim_start_matches(['/', '\\']);
            if rest.is_empty() {
                home.to_path_buf()
            } else {
                home.join(rest)
            }
        }
        None => PathBuf::from(&raw),
    };

    if !expanded.is_absolute() {
        return Err(HomeDirError::AbsoluteRequired(
            expanded.to_string_lossy().into(),
        ));
    }
    Ok(expanded)
}
