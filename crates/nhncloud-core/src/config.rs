//! Credentials file and environment resolution.
//!
//! The credentials file holds `key = value` lines. Section headers and
//! comments are tolerated and ignored. Service-specific keys are prefixed
//! with the service name, e.g. `rds_mysql_app_key`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{NhnError, Result};
use crate::fsutil;
use crate::paths;

pub const DEFAULT_REGION: &str = "kr1";

pub const KEY_REGION: &str = "region";
pub const KEY_APP_KEY: &str = "app_key";
pub const KEY_ACCESS_KEY_ID: &str = "access_key_id";
pub const KEY_SECRET_ACCESS_KEY: &str = "secret_access_key";

/// Parsed credentials file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CredentialsFile {
    values: BTreeMap<String, String>,
}

impl CredentialsFile {
    /// Load `~/.nhncloud/credentials`; an absent file yields an empty set.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::credentials_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Self::parse(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(NhnError::Io(format!(
                "Failed to read credentials file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn parse(content: &str) -> Self {
        let mut values = BTreeMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = unquote(value.trim());
            if !key.is_empty() {
                values.insert(key, value.to_string());
            }
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(&key.to_lowercase())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_lowercase(), value.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::from("[default]\n");
        for (key, value) in &self.values {
            out.push_str(&format!("{} = {}\n", key, value));
        }
        out
    }

    /// Write `~/.nhncloud/credentials` with owner-only permissions.
    pub fn save(&self) -> Result<PathBuf> {
        let path = paths::credentials_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        fsutil::write_atomic(path, self.render().as_bytes(), Some(fsutil::PRIVATE_FILE_MODE))
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Credentials resolved for one service.
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub region: String,
    pub app_key: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl Credentials {
    /// Resolve from the process environment and the credentials file.
    ///
    /// `service` is a short name such as `rds_mysql`; it selects the
    /// `NHN_{SERVICE}_*` environment variables and `{service}_*` file keys.
    pub fn resolve(service: Option<&str>) -> Result<Self> {
        let file = CredentialsFile::load()?;
        Ok(Self::resolve_with(service, &file, |name| std::env::var(name).ok()))
    }

    /// Resolution with an injectable environment lookup.
    ///
    /// Precedence per field: `NHN_{SERVICE}_{FIELD}`, `NHN_{FIELD}`,
    /// file `{service}_{field}`, file `{field}`.
    pub fn resolve_with<F>(service: Option<&str>, file: &CredentialsFile, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let service = service.map(normalize_service);
        let lookup = |field: &str| -> Option<String> {
            let env_field = field.to_uppercase();
            let mut candidates = Vec::new();
            if let Some(svc) = service.as_deref() {
                candidates.push(env(&format!("NHN_{}_{}", svc.to_uppercase(), env_field)));
            }
            candidates.push(env(&format!("NHN_{}", env_field)));
            if let Some(svc) = service.as_deref() {
                candidates.push(file.get(&format!("{}_{}", svc, field)).map(str::to_string));
            }
            candidates.push(file.get(field).map(str::to_string));
            candidates.into_iter().flatten().find(|v| !v.is_empty())
        };

        Self {
            region: lookup(KEY_REGION).unwrap_or_else(|| DEFAULT_REGION.to_string()),
            app_key: lookup(KEY_APP_KEY),
            access_key_id: lookup(KEY_ACCESS_KEY_ID),
            secret_access_key: lookup(KEY_SECRET_ACCESS_KEY),
        }
    }

    /// Region set through `NHN_{SERVICE}_REGION` or `NHN_REGION`, if any.
    pub fn env_region_with<F>(service: Option<&str>, env: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut names = Vec::new();
        if let Some(svc) = service.map(normalize_service) {
            names.push(format!("NHN_{}_REGION", svc.to_uppercase()));
        }
        names.push(format!("NHN_{}", KEY_REGION.to_uppercase()));
        names.into_iter().filter_map(|name| env(&name)).find(|v| !v.is_empty())
    }

    /// Override the region (e.g. from `--region`).
    pub fn with_region(mut self, region: Option<&str>) -> Self {
        if let Some(region) = region.filter(|r| !r.is_empty()) {
            self.region = region.to_string();
        }
        self
    }

    pub fn require_app_key(&self) -> Result<&str> {
        self.app_key.as_deref().ok_or_else(|| {
            NhnError::Configuration(
                "App key not configured (set NHN_APP_KEY or run 'nhncloud configure')".to_string(),
            )
        })
    }

    /// Access key pair for the OAuth2 token endpoint.
    pub fn require_access_keys(&self) -> Result<(&str, &str)> {
        match (self.access_key_id.as_deref(), self.secret_access_key.as_deref()) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(NhnError::Configuration(
                "Access key not configured (set NHN_ACCESS_KEY_ID / NHN_SECRET_ACCESS_KEY or run 'nhncloud configure')"
                    .to_string(),
            )),
        }
    }
}

fn normalize_service(service: &str) -> String {
    service.trim().to_lowercase().replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
# NHN Cloud credentials
[default]
region = kr2
app_key = "file-app-key"
access_key_id = file-ak
secret_access_key = 'file-sk'
rds_mysql_app_key = mysql-file-app-key
; trailing comment
not a pair
"#;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_parse_ignores_sections_and_comments() {
        let file = CredentialsFile::parse(SAMPLE);
        assert_eq!(file.get("region"), Some("kr2"));
        assert_eq!(file.get("app_key"), Some("file-app-key"));
        assert_eq!(file.get("secret_access_key"), Some("file-sk"));
        assert_eq!(file.get("APP_KEY"), Some("file-app-key"));
        assert_eq!(file.get("not a pair"), None);
    }

    #[test]
    fn test_resolve_file_only() {
        let file = CredentialsFile::parse(SAMPLE);
        let creds = Credentials::resolve_with(None, &file, env_from(&[]));
        assert_eq!(creds.region, "kr2");
        assert_eq!(creds.app_key.as_deref(), Some("file-app-key"));
        assert_eq!(creds.require_access_keys().unwrap(), ("file-ak", "file-sk"));
    }

    #[test]
    fn test_resolve_precedence() {
        let file = CredentialsFile::parse(SAMPLE);

        let creds = Credentials::resolve_with(Some("rds-mysql"), &file, env_from(&[]));
        assert_eq!(creds.app_key.as_deref(), Some("mysql-file-app-key"));

        let creds = Credentials::resolve_with(
            Some("rds-mysql"),
            &file,
            env_from(&[("NHN_APP_KEY", "env-app-key")]),
        );
        assert_eq!(creds.app_key.as_deref(), Some("env-app-key"));

        let creds = Credentials::resolve_with(
            Some("rds-mysql"),
            &file,
            env_from(&[
                ("NHN_APP_KEY", "env-app-key"),
                ("NHN_RDS_MYSQL_APP_KEY", "env-mysql-app-key"),
                ("NHN_RDS_MYSQL_ACCESS_KEY_ID", "env-mysql-ak"),
                ("NHN_REGION", "jp1"),
            ]),
        );
        assert_eq!(creds.app_key.as_deref(), Some("env-mysql-app-key"));
        assert_eq!(creds.access_key_id.as_deref(), Some("env-mysql-ak"));
        assert_eq!(creds.secret_access_key.as_deref(), Some("file-sk"));
        assert_eq!(creds.region, "jp1");
    }

    #[test]
    fn test_env_region() {
        assert_eq!(Credentials::env_region_with(Some("rds-mysql"), env_from(&[])), None);
        assert_eq!(
            Credentials::env_region_with(None, env_from(&[("NHN_REGION", "jp1")])).as_deref(),
            Some("jp1")
        );
        assert_eq!(
            Credentials::env_region_with(
                Some("rds-mysql"),
                env_from(&[("NHN_REGION", "jp1"), ("NHN_RDS_MYSQL_REGION", "kr2")]),
            )
            .as_deref(),
            Some("kr2")
        );
    }

    #[test]
    fn test_resolve_defaults_and_missing() {
        let creds = Credentials::resolve_with(None, &CredentialsFile::default(), env_from(&[]));
        assert_eq!(creds.region, DEFAULT_REGION);
        assert!(creds.require_app_key().is_err());
        assert!(creds.require_access_keys().is_err());
        assert_eq!(creds.with_region(Some("kr2")).region, "kr2");
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credentials");

        let mut file = CredentialsFile::default();
        file.set(KEY_APP_KEY, "abc");
        file.set(KEY_REGION, "kr1");
        file.save_to(&path).unwrap();

        let loaded = CredentialsFile::load_from(&path).unwrap();
        assert_eq!(loaded, file);
        assert!(CredentialsFile::load_from(&temp_dir.path().join("missing"))
            .unwrap()
            .is_empty());
    }
}
