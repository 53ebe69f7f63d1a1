//! Connection strings and native client arguments with optional TLS certificates.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use reqwest::Url;

use super::store::{CertType, CertificateStore, ConnectionSelector};
use crate::error::{NhnError, Result};
use crate::paths;

/// Database engines offered by the RDS services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DbEngine {
    #[default]
    MySql,
    MariaDb,
    PostgreSql,
}

impl DbEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::MariaDb => "mariadb",
            Self::PostgreSql => "postgresql",
        }
    }

    /// Service type used as the certificate store selector.
    pub fn service_type(&self) -> &'static str {
        match self {
            Self::MySql => "rds-mysql",
            Self::MariaDb => "rds-mariadb",
            Self::PostgreSql => "rds-postgresql",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Self::MySql | Self::MariaDb => 3306,
            Self::PostgreSql => 5432,
        }
    }

    pub fn client_binary(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::MariaDb => "mariadb",
            Self::PostgreSql => "psql",
        }
    }
}

impl fmt::Display for DbEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DbEngine {
    type Err = NhnError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().trim_start_matches("rds-") {
            "mysql" => Ok(Self::MySql),
            "mariadb" => Ok(Self::MariaDb),
            "postgresql" | "postgres" | "pg" => Ok(Self::PostgreSql),
            other => Err(NhnError::Validation(format!(
                "unsupported database engine '{}' (expected mysql, mariadb or postgresql)",
                other
            ))),
        }
    }
}

/// Everything needed to reach one database instance.
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    pub engine: DbEngine,
    pub host: String,
    pub port: Option<u16>,
    pub username: String,
    pub password: Option<String>,
    pub database: Option<String>,
    /// Engine-specific SSL mode overriding the default.
    pub ssl_mode: Option<String>,
    pub region: String,
    pub instance_id: Option<String>,
    pub version: Option<String>,
    /// Explicit certificate path; skips the store lookup.
    pub cert_path: Option<String>,
    pub cert_type: Option<CertType>,
}

impl ConnectionParams {
    pub fn new(engine: DbEngine, host: &str, username: &str, region: &str) -> Self {
        Self {
            engine,
            host: host.to_string(),
            port: None,
            username: username.to_string(),
            password: None,
            database: None,
            ssl_mode: None,
            region: region.to_string(),
            instance_id: None,
            version: None,
            cert_path: None,
            cert_type: None,
        }
    }

    fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.engine.default_port())
    }

    fn selector(&self) -> ConnectionSelector {
        ConnectionSelector {
            service_type: self.engine.service_type().to_string(),
            region: self.region.clone(),
            instance_id: self.instance_id.clone(),
            version: self.version.clone(),
            cert_type: self.cert_type.unwrap_or_default(),
        }
    }
}

/// Built connection string plus its TLS parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionInfo {
    pub connection_string: String,
    pub parameters: BTreeMap<String, String>,
    pub certificate: Option<PathBuf>,
}

/// Check that `path` (with `~` expanded) is a readable regular file.
pub fn validate_certificate_path(path: &str) -> Result<PathBuf> {
    let expanded = paths::expand_tilde(path);
    validate_path(&expanded)?;
    Ok(expanded)
}

fn validate_path(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            NhnError::NotFound(format!("certificate file {}", path.display()))
        } else {
            NhnError::Io(format!("Failed to stat {}: {}", path.display(), e))
        }
    })?;
    if !metadata.is_file() {
        return Err(NhnError::Validation(format!(
            "certificate path {} is not a regular file",
            path.display()
        )));
    }
    std::fs::File::open(path)
        .map_err(|e| NhnError::Io(format!("Cannot read certificate {}: {}", path.display(), e)))?;
    Ok(())
}

/// Facade over the certificate store for building connections.
pub struct CertificateHelper<'a> {
    store: &'a CertificateStore,
}

impl<'a> CertificateHelper<'a> {
    pub fn new(store: &'a CertificateStore) -> Self {
        Self { store }
    }

    /// Resolve the certificate to use, if any.
    ///
    /// An explicit path wins (validated for CA certificates). Without one the
    /// store is searched; finding nothing means the connection goes without
    /// a certificate.
    pub fn resolve_certificate_path(
        &self,
        explicit: Option<&str>,
        cert_type: Option<CertType>,
        selector: &ConnectionSelector,
    ) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit.map(str::trim).filter(|p| !p.is_empty()) {
            return match cert_type {
                None | Some(CertType::Ca) => validate_certificate_path(path).map(Some),
                Some(_) => Ok(Some(paths::expand_tilde(path))),
            };
        }

        match self.store.find_certificate_for_connection(selector) {
            Ok(cert) => {
                validate_path(&cert.file_path)?;
                tracing::debug!(id = %cert.id, path = %cert.file_path.display(), "Using stored certificate");
                Ok(Some(cert.file_path.clone()))
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!("No stored certificate for connection");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn certificate_for(&self, params: &ConnectionParams) -> Result<Option<PathBuf>> {
        self.resolve_certificate_path(
            params.cert_path.as_deref(),
            params.cert_type,
            &params.selector(),
        )
    }

    /// Connection string with engine-specific SSL parameters.
    pub fn build_connection_string(&self, params: &ConnectionParams) -> Result<ConnectionInfo> {
        if params.host.trim().is_empty() {
            return Err(NhnError::Validation("host is required".to_string()));
        }
        let certificate = self.certificate_for(params)?;
        let parameters = ssl_parameters(params, certificate.as_deref());

        let mut url = base_url(params)?;
        if let Some(password) = params.password.as_deref().filter(|p| !p.is_empty()) {
            url.set_password(Some(password))
                .map_err(|_| NhnError::Validation("password cannot be set on this URL".to_string()))?;
        }
        append_query(&mut url, &parameters);

        Ok(ConnectionInfo {
            connection_string: url.to_string(),
            parameters,
            certificate,
        })
    }

    /// Argument vector for the engine's native client. Passwords are never included.
    pub fn build_cli_args(&self, params: &ConnectionParams) -> Result<Vec<String>> {
        if params.host.trim().is_empty() {
            return Err(NhnError::Validation("host is required".to_string()));
        }
        let certificate = self.certificate_for(params)?;
        let parameters = ssl_parameters(params, certificate.as_deref());
        let binary = params.engine.client_binary().to_string();

        let args = match params.engine {
            DbEngine::MySql | DbEngine::MariaDb => {
                let mut args = vec![
                    binary,
                    "-h".to_string(),
                    params.host.clone(),
                    "-P".to_string(),
                    params.port().to_string(),
                    "-u".to_string(),
                    params.username.clone(),
                ];
                if let Some(db) = params.database.as_deref().filter(|d| !d.is_empty()) {
                    args.push("-D".to_string());
                    args.push(db.to_string());
                }
                if params.engine == DbEngine::MySql {
                    if let Some(ca) = parameters.get("ssl-ca") {
                        args.push(format!("--ssl-ca={}", ca));
                    }
                    if let Some(mode) = parameters.get("ssl-mode") {
                        args.push(format!("--ssl-mode={}", mode));
                    }
                } else {
                    if parameters.get("ssl").map(String::as_str) == Some("true") {
                        args.push("--ssl".to_string());
                    }
                    if let Some(ca) = parameters.get("ssl-ca") {
                        args.push(format!("--ssl-ca={}", ca));
                    }
                    if parameters.contains_key("ssl-verify-server-cert") {
                        args.push("--ssl-verify-server-cert".to_string());
                    }
                }
                args
            }
            DbEngine::PostgreSql => {
                let mut url = base_url(params)?;
                append_query(&mut url, &parameters);
                vec![binary, url.to_string()]
            }
        };
        Ok(args)
    }
}

fn base_url(params: &ConnectionParams) -> Result<Url> {
    let database = params.database.as_deref().unwrap_or("");
    let raw = format!(
        "{}://{}:{}/{}",
        params.engine.as_str(),
        params.host.trim(),
        params.port(),
        database
    );
    let mut url = Url::parse(&raw)
        .map_err(|e| NhnError::Validation(format!("invalid connection target '{}': {}", raw, e)))?;
    if !params.username.is_empty() {
        url.set_username(&params.username)
            .map_err(|_| NhnError::Validation("username cannot be set on this URL".to_string()))?;
    }
    Ok(url)
}

fn append_query(url: &mut Url, parameters: &BTreeMap<String, String>) {
    if parameters.is_empty() {
        return;
    }
    let mut pairs = url.query_pairs_mut();
    for (key, value) in parameters {
        pairs.append_pair(key, value);
    }
}

fn ssl_parameters(params: &ConnectionParams, certificate: Option<&Path>) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let ca = certificate.map(|p| p.display().to_string());
    let mode = params.ssl_mode.as_deref().filter(|m| !m.is_empty());

    match params.engine {
        DbEngine::MySql => {
            let default_mode = if ca.is_some() { "VERIFY_CA" } else { "PREFERRED" };
            if let Some(ca) = ca {
                out.insert("ssl-ca".to_string(), ca);
            }
            out.insert(
                "ssl-mode".to_string(),
                mode.unwrap_or(default_mode).to_uppercase(),
            );
        }
        DbEngine::MariaDb => {
            let disabled = mode.map_or(false, |m| {
                matches!(m.to_lowercase().as_str(), "disable" | "disabled" | "false")
            });
            if let Some(ca) = ca {
                out.insert("ssl".to_string(), "true".to_string());
                out.insert("ssl-ca".to_string(), ca);
                out.insert("ssl-verify-server-cert".to_string(), "true".to_string());
            } else if mode.is_some() {
                out.insert("ssl".to_string(), (!disabled).to_string());
            }
        }
        DbEngine::PostgreSql => {
            let default_mode = if ca.is_some() { "verify-ca" } else { "prefer" };
            if let Some(ca) = ca {
                out.insert("sslrootcert".to_string(), ca);
            }
            out.insert(
                "sslmode".to_string(),
                mode.unwrap_or(default_mode).to_lowercase(),
            );
        }
    }
    out
}
