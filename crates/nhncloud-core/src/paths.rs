//! Per-user directory layout under `~/.nhncloud`.

use std::path::{Path, PathBuf};

use crate::error::{NhnError, Result};

/// Environment variable overriding the base directory.
pub const HOME_ENV: &str = "NHNCLOUD_HOME";

/// Base directory for all CLI state (`~/.nhncloud` unless overridden).
pub fn base_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(HOME_ENV) {
        if !dir.is_empty() {
            return Ok(expand_tilde(&dir));
        }
    }
    let home = dirs::home_dir()
        .ok_or_else(|| NhnError::Configuration("Could not find home directory".to_string()))?;
    Ok(home.join(".nhncloud"))
}

pub fn cache_dir() -> Result<PathBuf> {
    Ok(base_dir()?.join("cache"))
}

pub fn token_cache_path() -> Result<PathBuf> {
    Ok(cache_dir()?.join("token.json"))
}

pub fn certs_dir() -> Result<PathBuf> {
    Ok(base_dir()?.join("certs"))
}

pub fn ssh_keys_dir() -> Result<PathBuf> {
    Ok(base_dir()?.join("ssh-keys"))
}

pub fn credentials_path() -> Result<PathBuf> {
    Ok(base_dir()?.join("credentials"))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(base_dir()?.join("config.yaml"))
}

/// Expand a leading `~` against the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

/// Display helper that keeps paths short in tables.
pub fn display_relative_to_home(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            return format!("~/{}", rest.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_tilde("~/certs/ca.pem"), home.join("certs/ca.pem"));
        assert_eq!(expand_tilde("/etc/ssl/ca.pem"), PathBuf::from("/etc/ssl/ca.pem"));
    }

    #[test]
    fn test_display_relative_to_home() {
        let home = dirs::home_dir().unwrap();
        let shown = display_relative_to_home(&home.join(".nhncloud").join("certs"));
        assert_eq!(shown, "~/.nhncloud/certs");
        assert_eq!(display_relative_to_home(Path::new("/tmp/x")), "/tmp/x");
    }
}
