//! Certificate store.
//!
//! Certificate bodies live as individual `.pem` files under the store
//! directory; `certificates.json` next to them lists their metadata. Ids are
//! derived from the file content, so byte-identical certificates share an id.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{NhnError, Result};
use crate::fsutil;
use crate::paths;
use crate::result_ext::ResultExt;

/// Metadata file name inside the store directory.
pub const METADATA_FILE: &str = "certificates.json";

/// Role of a stored certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CertType {
    #[default]
    #[serde(rename = "CA")]
    Ca,
    #[serde(rename = "CLIENT-CERT")]
    ClientCert,
    #[serde(rename = "CLIENT-KEY")]
    ClientKey,
}

impl CertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ca => "CA",
            Self::ClientCert => "CLIENT-CERT",
            Self::ClientKey => "CLIENT-KEY",
        }
    }
}

impl fmt::Display for CertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CertType {
    type Err = NhnError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().replace('_', "-").as_str() {
            "" | "CA" => Ok(Self::Ca),
            "CLIENT-CERT" | "CERT" => Ok(Self::ClientCert),
            "CLIENT-KEY" | "KEY" => Ok(Self::ClientKey),
            other => Err(NhnError::Validation(format!(
                "unknown certificate type '{}' (expected CA, CLIENT-CERT or CLIENT-KEY)",
                other
            ))),
        }
    }
}

/// How a certificate entered the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertSource {
    #[default]
    Manual,
    Downloaded,
    Generated,
}

impl CertSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Downloaded => "downloaded",
            Self::Generated => "generated",
        }
    }
}

impl FromStr for CertSource {
    type Err = NhnError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "manual" => Ok(Self::Manual),
            "downloaded" => Ok(Self::Downloaded),
            "generated" => Ok(Self::Generated),
            other => Err(NhnError::Validation(format!(
                "unknown certificate source '{}' (expected manual, downloaded or generated)",
                other
            ))),
        }
    }
}

/// Metadata for one stored certificate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateInfo {
    pub id: String,
    #[serde(rename = "type", default)]
    pub cert_type: CertType,
    pub service_type: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub file_path: PathBuf,
    pub stored_at: DateTime<Utc>,
    #[serde(default)]
    pub source: CertSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CertificateInfo {
    pub fn file_exists(&self) -> bool {
        self.file_path.is_file()
    }
}

/// Input for [`CertificateStore::store_certificate`].
#[derive(Debug, Clone, Default)]
pub struct StoreRequest {
    pub service_type: String,
    pub region: String,
    pub instance_id: Option<String>,
    pub version: Option<String>,
    pub cert_type: CertType,
    pub source: CertSource,
    pub description: Option<String>,
    pub content: Vec<u8>,
}

/// What a database connection needs a certificate for.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSelector {
    pub service_type: String,
    pub region: String,
    pub instance_id: Option<String>,
    pub version: Option<String>,
    pub cert_type: CertType,
}

/// Hex of the first 8 bytes of the SHA-256 digest.
pub fn certificate_id(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    hex::encode(&digest[..8])
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn sanitize_component(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `<service>-<region>[-<instance>][-<version>]-<TYPE>-<id>.pem`
fn certificate_filename(
    service_type: &str,
    region: &str,
    instance_id: Option<&str>,
    version: Option<&str>,
    cert_type: CertType,
    id: &str,
) -> String {
    let mut parts = vec![sanitize_component(service_type), sanitize_component(region)];
    if let Some(instance) = instance_id {
        parts.push(sanitize_component(instance));
    }
    if let Some(version) = version {
        parts.push(sanitize_component(version));
    }
    parts.push(cert_type.as_str().to_string());
    parts.push(id.to_string());
    format!("{}.pem", parts.join("-"))
}

/// Certificate store backed by a directory.
pub struct CertificateStore {
    cert_dir: PathBuf,
    metadata_path: PathBuf,
    certificates: Vec<CertificateInfo>,
}

impl CertificateStore {
    /// Open the store at `~/.nhncloud/certs`.
    pub fn open() -> Result<Self> {
        Self::open_in(paths::certs_dir()?)
    }

    /// Open (creating if needed) a store rooted at `cert_dir`.
    pub fn open_in(cert_dir: impl Into<PathBuf>) -> Result<Self> {
        let cert_dir = cert_dir.into();
        fsutil::ensure_private_dir(&cert_dir)?;
        let metadata_path = cert_dir.join(METADATA_FILE);

        let certificates = match std::fs::read_to_string(&metadata_path) {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                NhnError::Json(format!(
                    "Failed to parse {}: {}",
                    metadata_path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(
            dir = %cert_dir.display(),
            count = certificates.len(),
            "Loaded certificate store"
        );

        Ok(Self {
            cert_dir,
            metadata_path,
            certificates,
        })
    }

    pub fn cert_dir(&self) -> &Path {
        &self.cert_dir
    }

    fn save(&self) -> Result<()> {
        fsutil::write_json(&self.metadata_path, &self.certificates, None)
    }

    /// Write a certificate file and record its metadata.
    ///
    /// A duplicate (same id, type and instance) yields
    /// [`NhnError::CertificateExists`] carrying the stored record.
    pub fn store_certificate(&mut self, request: StoreRequest) -> Result<CertificateInfo> {
        if request.content.is_empty() {
            return Err(NhnError::Validation("certificate content is empty".to_string()));
        }
        let service_type = request.service_type.trim().to_string();
        let region = request.region.trim().to_string();
        if service_type.is_empty() || region.is_empty() {
            return Err(NhnError::Validation(
                "service type and region are required".to_string(),
            ));
        }
        let instance_id = non_empty(request.instance_id);
        let version = non_empty(request.version);

        let id = certificate_id(&request.content);

        if let Some(existing) = self.certificates.iter().find(|c| {
            c.id == id && c.cert_type == request.cert_type && c.instance_id == instance_id
        }) {
            return Err(NhnError::CertificateExists(Box::new(existing.clone())));
        }

        let filename = certificate_filename(
            &service_type,
            &region,
            instance_id.as_deref(),
            version.as_deref(),
            request.cert_type,
            &id,
        );
        let file_path = self.unused_file_path(&filename);
        fsutil::write_atomic(&file_path, &request.content, Some(fsutil::PRIVATE_FILE_MODE))?;

        let info = CertificateInfo {
            id,
            cert_type: request.cert_type,
            service_type,
            region,
            instance_id,
            version,
            file_path,
            stored_at: Utc::now(),
            source: request.source,
            description: non_empty(request.description),
        };

        self.certificates.push(info.clone());
        if let Err(e) = self.save() {
            self.certificates.pop();
            std::fs::remove_file(&info.file_path)
                .warn_on_err(format!("rolling back {}", info.file_path.display()));
            return Err(e);
        }

        tracing::info!(id = %info.id, cert_type = %info.cert_type, "Stored certificate");
        Ok(info)
    }

    fn is_referenced(&self, path: &Path) -> bool {
        self.certificates.iter().any(|c| c.file_path == path)
    }

    /// `filename` in the store directory, suffixed `-2`, `-3`, ... while
    /// another entry already owns that path.
    fn unused_file_path(&self, filename: &str) -> PathBuf {
        let stem = filename.strip_suffix(".pem").unwrap_or(filename);
        let mut path = self.cert_dir.join(filename);
        let mut n = 2;
        while self.is_referenced(&path) {
            path = self.cert_dir.join(format!("{}-{}.pem", stem, n));
            n += 1;
        }
        path
    }

    pub fn get_certificate(&self, id: &str) -> Result<&CertificateInfo> {
        let cert = self
            .certificates
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| NhnError::NotFound(format!("certificate '{}'", id)))?;
        if !cert.file_exists() {
            return Err(NhnError::NotFound(format!(
                "certificate file for '{}' at {}",
                id,
                cert.file_path.display()
            )));
        }
        Ok(cert)
    }

    pub fn get_certificate_path(&self, id: &str) -> Result<PathBuf> {
        Ok(self.get_certificate(id)?.file_path.clone())
    }

    /// Certificates matching every given selector; entries whose file is
    /// missing are left out.
    pub fn list_certificates(
        &self,
        service_type: Option<&str>,
        region: Option<&str>,
        instance_id: Option<&str>,
    ) -> Vec<&CertificateInfo> {
        let service_type = service_type.filter(|s| !s.is_empty());
        let region = region.filter(|s| !s.is_empty());
        let instance_id = instance_id.filter(|s| !s.is_empty());

        self.certificates
            .iter()
            .filter(|c| service_type.map_or(true, |s| c.service_type == s))
            .filter(|c| region.map_or(true, |r| c.region == r))
            .filter(|c| instance_id.map_or(true, |i| c.instance_id.as_deref() == Some(i)))
            .filter(|c| c.file_exists())
            .collect()
    }

    /// Pick the certificate that best fits a connection.
    ///
    /// Candidates share service, region and type. Certificates bound to a
    /// different instance are skipped. Order of preference: instance and
    /// version, instance, unbound with version, then most recently stored.
    pub fn find_certificate_for_connection(
        &self,
        selector: &ConnectionSelector,
    ) -> Result<&CertificateInfo> {
        let instance_id = selector.instance_id.as_deref().filter(|s| !s.is_empty());
        let version = selector.version.as_deref().filter(|s| !s.is_empty());

        let candidates: Vec<&CertificateInfo> = self
            .certificates
            .iter()
            .filter(|c| c.service_type == selector.service_type)
            .filter(|c| c.region == selector.region)
            .filter(|c| c.cert_type == selector.cert_type)
            .filter(|c| match (instance_id, c.instance_id.as_deref()) {
                (Some(wanted), Some(bound)) => wanted == bound,
                _ => true,
            })
            .collect();

        if let Some(instance) = instance_id {
            if let Some(version) = version {
                if let Some(cert) = candidates.iter().find(|c| {
                    c.instance_id.as_deref() == Some(instance) && c.version.as_deref() == Some(version)
                }) {
                    return Ok(*cert);
                }
            }
            if let Some(cert) = candidates
                .iter()
                .find(|c| c.instance_id.as_deref() == Some(instance))
            {
                return Ok(*cert);
            }
        }

        if let Some(version) = version {
            if let Some(cert) = candidates
                .iter()
                .find(|c| c.instance_id.is_none() && c.version.as_deref() == Some(version))
            {
                return Ok(*cert);
            }
        }

        candidates
            .into_iter()
            .max_by_key(|c| c.stored_at)
            .ok_or_else(|| {
                NhnError::NotFound(format!(
                    "{} certificate for {} in {}",
                    selector.cert_type, selector.service_type, selector.region
                ))
            })
    }

    /// Delete the certificate file (if still present) and its metadata.
    pub fn remove_certificate(&mut self, id: &str) -> Result<CertificateInfo> {
        let index = self
            .certificates
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| NhnError::NotFound(format!("certificate '{}'", id)))?;

        let removed = self.certificates.remove(index);
        if self.is_referenced(&removed.file_path) {
            tracing::warn!(
                path = %removed.file_path.display(),
                "Certificate file still referenced by another entry, keeping it"
            );
        } else {
            fsutil::remove_if_exists(&removed.file_path)?;
        }
        self.save()?;

        tracing::info!(id = %removed.id, "Removed certificate");
        Ok(removed)
    }

    /// Delete files in the store directory that no metadata entry references.
    pub fn cleanup_orphaned_files(&self) -> Result<Vec<PathBuf>> {
        let referenced: HashSet<&Path> = self
            .certificates
            .iter()
            .map(|c| c.file_path.as_path())
            .collect();

        let mut removed = Vec::new();
        for entry in std::fs::read_dir(&self.cert_dir)? {
            let Some(entry) = entry.warn_on_err("reading certificate directory") else {
                continue;
            };
            let path = entry.path();
            if !path.is_file() || path == self.metadata_path || referenced.contains(path.as_path()) {
                continue;
            }
            if std::fs::remove_file(&path)
                .warn_on_err(format!("removing orphaned file {}", path.display()))
                .is_some()
            {
                tracing::info!(path = %path.display(), "Removed orphaned certificate file");
                removed.push(path);
            }
        }
        Ok(removed)
    }

    /// Report every metadata entry whose file is missing.
    pub fn validate_store(&self) -> Result<()> {
        let issues: Vec<String> = self
            .certificates
            .iter()
            .filter(|c| !c.file_exists())
            .map(|c| {
                format!(
                    "certificate {} ({}) file missing: {}",
                    c.id,
                    c.cert_type,
                    c.file_path.display()
                )
            })
            .collect();

        if issues.is_empty() {
            Ok(())
        } else {
            Err(NhnError::Integrity(issues))
        }
    }

    /// Read a PEM file from disk (`~` expanded) for storing.
    pub fn load_certificate_file(path: &str) -> Result<Vec<u8>> {
        let path = paths::expand_tilde(path);
        let content = std::fs::read(&path)
            .map_err(|e| NhnError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        if !String::from_utf8_lossy(&content).contains("-----BEGIN ") {
            return Err(NhnError::Validation(format!(
                "{} does not look like a PEM file",
                path.display()
            )));
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CA_PEM: &[u8] = b"-----BEGIN CERTIFICATE-----\nMIIBCA==\n-----END CERTIFICATE-----\n";

    fn request(content: &[u8]) -> StoreRequest {
        StoreRequest {
            service_type: "rds-mysql".to_string(),
            region: "kr1".to_string(),
            content: content.to_vec(),
            ..Default::default()
        }
    }

    fn pem(tag: &str) -> Vec<u8> {
        format!("-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----\n", tag).into_bytes()
    }

    fn selector(instance: Option<&str>, version: Option<&str>) -> ConnectionSelector {
        ConnectionSelector {
            service_type: "rds-mysql".to_string(),
            region: "kr1".to_string(),
            instance_id: instance.map(str::to_string),
            version: version.map(str::to_string),
            cert_type: CertType::Ca,
        }
    }

    #[test]
    fn test_certificate_id_is_content_derived() {
        let id = certificate_id(CA_PEM);
        assert_eq!(id.len(), 16);
        assert_eq!(id, certificate_id(CA_PEM));
        assert_ne!(id, certificate_id(b"other"));
        // sha256("") prefix
        assert_eq!(certificate_id(b""), "e3b0c44298fc1c14");
    }

    #[test]
    fn test_cert_type_parse_and_serde() {
        assert_eq!("client-cert".parse::<CertType>().unwrap(), CertType::ClientCert);
        assert_eq!("".parse::<CertType>().unwrap(), CertType::Ca);
        assert!("bogus".parse::<CertType>().is_err());
        assert_eq!(serde_json::to_string(&CertType::ClientKey).unwrap(), "\"CLIENT-KEY\"");
    }

    #[test]
    fn test_filename_layout() {
        assert_eq!(
            certificate_filename("rds-mysql", "kr1", Some("inst-1"), Some("8.0"), CertType::Ca, "abcd"),
            "rds-mysql-kr1-inst-1-8.0-CA-abcd.pem"
        );
        assert_eq!(
            certificate_filename("rds-mysql", "kr1", None, None, CertType::ClientKey, "abcd"),
            "rds-mysql-kr1-CLIENT-KEY-abcd.pem"
        );
    }

    #[test]
    fn test_store_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CertificateStore::open_in(temp_dir.path()).unwrap();

        let info = store.store_certificate(request(CA_PEM)).unwrap();
        assert_eq!(info.id, certificate_id(CA_PEM));
        assert_eq!(info.cert_type, CertType::Ca);
        assert_eq!(std::fs::read(&info.file_path).unwrap(), CA_PEM);

        assert_eq!(store.get_certificate(&info.id).unwrap(), &info);
        assert_eq!(store.get_certificate_path(&info.id).unwrap(), info.file_path);
        assert!(store.get_certificate("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_duplicate_returns_existing() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CertificateStore::open_in(temp_dir.path()).unwrap();

        let first = store.store_certificate(request(CA_PEM)).unwrap();
        let err = store.store_certificate(request(CA_PEM)).unwrap_err();
        match err {
            NhnError::CertificateExists(existing) => assert_eq!(*existing, first),
            other => panic!("unexpected error: {other:?}"),
        }

        // same bytes bound to another instance is a distinct entry with the same id
        let mut bound = request(CA_PEM);
        bound.instance_id = Some("inst-1".to_string());
        let second = store.store_certificate(bound).unwrap();
        assert_eq!(second.id, first.id);
        assert_ne!(second.file_path, first.file_path);
    }

    #[test]
    fn test_store_rejects_empty_input() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CertificateStore::open_in(temp_dir.path()).unwrap();

        assert!(matches!(
            store.store_certificate(request(b"")),
            Err(NhnError::Validation(_))
        ));
        let mut req = request(CA_PEM);
        req.region = "  ".to_string();
        assert!(matches!(store.store_certificate(req), Err(NhnError::Validation(_))));
    }

    #[test]
    fn test_metadata_failure_rolls_back_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CertificateStore::open_in(temp_dir.path()).unwrap();
        // a directory in place of the metadata file makes the save fail
        std::fs::create_dir(temp_dir.path().join(METADATA_FILE)).unwrap();

        assert!(store.store_certificate(request(CA_PEM)).is_err());
        assert!(store.list_certificates(None, None, None).is_empty());
        let pem_files = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |x| x == "pem"))
            .count();
        assert_eq!(pem_files, 0);
    }

    #[test]
    fn test_list_filters_and_hides_missing_files() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CertificateStore::open_in(temp_dir.path()).unwrap();

        let a = store.store_certificate(request(&pem("a"))).unwrap();
        let mut req = request(&pem("b"));
        req.region = "kr2".to_string();
        req.instance_id = Some("inst-9".to_string());
        let b = store.store_certificate(req).unwrap();

        assert_eq!(store.list_certificates(None, None, None).len(), 2);
        assert_eq!(store.list_certificates(Some("rds-mysql"), Some("kr2"), None), vec![&b]);
        assert_eq!(store.list_certificates(None, None, Some("inst-9")), vec![&b]);
        assert!(store.list_certificates(Some("rds-postgres"), None, None).is_empty());

        std::fs::remove_file(&a.file_path).unwrap();
        assert_eq!(store.list_certificates(None, None, None), vec![&b]);
        assert!(store.get_certificate(&a.id).unwrap_err().is_not_found());
    }

    fn store_with(
        store: &mut CertificateStore,
        tag: &str,
        instance: Option<&str>,
        version: Option<&str>,
    ) -> CertificateInfo {
        let mut req = request(&pem(tag));
        req.instance_id = instance.map(str::to_string);
        req.version = version.map(str::to_string);
        store.store_certificate(req).unwrap()
    }

    #[test]
    fn test_find_prefers_instance_and_version() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CertificateStore::open_in(temp_dir.path()).unwrap();

        let _generic = store_with(&mut store, "generic", None, None);
        let _versioned = store_with(&mut store, "versioned", None, Some("8.0"));
        let _instance = store_with(&mut store, "instance", Some("inst-1"), None);
        let exact = store_with(&mut store, "exact", Some("inst-1"), Some("8.0"));

        let found = store
            .find_certificate_for_connection(&selector(Some("inst-1"), Some("8.0")))
            .unwrap();
        assert_eq!(found.id, exact.id);
    }

    #[test]
    fn test_find_prefers_instance_over_version() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CertificateStore::open_in(temp_dir.path()).unwrap();

        let instance = store_with(&mut store, "instance", Some("inst-1"), Some("5.7"));
        let _versioned = store_with(&mut store, "versioned", None, Some("8.0"));

        let found = store
            .find_certificate_for_connection(&selector(Some("inst-1"), Some("8.0")))
            .unwrap();
        assert_eq!(found.id, instance.id);
    }

    #[test]
    fn test_find_prefers_unbound_version_over_newest() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CertificateStore::open_in(temp_dir.path()).unwrap();

        let versioned = store_with(&mut store, "versioned", None, Some("8.0"));
        let _newer = store_with(&mut store, "newer", None, Some("5.7"));
        // bound to another instance: never eligible
        let _other = store_with(&mut store, "other", Some("inst-2"), Some("8.0"));

        let found = store
            .find_certificate_for_connection(&selector(Some("inst-1"), Some("8.0")))
            .unwrap();
        assert_eq!(found.id, versioned.id);
    }

    #[test]
    fn test_find_falls_back_to_newest() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CertificateStore::open_in(temp_dir.path()).unwrap();

        let older = store_with(&mut store, "older", None, None);
        let newer = store_with(&mut store, "newer", None, None);
        // force a strict ordering regardless of clock resolution
        store.certificates[0].stored_at = older.stored_at - chrono::Duration::minutes(5);

        let found = store
            .find_certificate_for_connection(&selector(None, Some("9.9")))
            .unwrap();
        assert_eq!(found.id, newer.id);
    }

    #[test]
    fn test_find_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CertificateStore::open_in(temp_dir.path()).unwrap();
        let _other = store_with(&mut store, "other", Some("inst-2"), None);

        let err = store
            .find_certificate_for_connection(&selector(Some("inst-1"), None))
            .unwrap_err();
        assert!(err.is_not_found());

        let mut client_key = selector(None, None);
        client_key.cert_type = CertType::ClientKey;
        assert!(store.find_certificate_for_connection(&client_key).is_err());
    }

    #[test]
    fn test_remove_certificate() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CertificateStore::open_in(temp_dir.path()).unwrap();

        let info = store.store_certificate(request(CA_PEM)).unwrap();
        std::fs::remove_file(&info.file_path).unwrap();

        // file already gone is tolerated
        let removed = store.remove_certificate(&info.id).unwrap();
        assert_eq!(removed.id, info.id);
        assert!(store.remove_certificate(&info.id).unwrap_err().is_not_found());

        let reopened = CertificateStore::open_in(temp_dir.path()).unwrap();
        assert!(reopened.list_certificates(None, None, None).is_empty());
    }

    #[test]
    fn test_colliding_filenames_get_distinct_files() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CertificateStore::open_in(temp_dir.path()).unwrap();

        let bound = store
            .store_certificate(StoreRequest {
                instance_id: Some("8.0".to_string()),
                ..request(CA_PEM)
            })
            .unwrap();
        let versioned = store
            .store_certificate(StoreRequest {
                version: Some("8.0".to_string()),
                ..request(CA_PEM)
            })
            .unwrap();
        assert_ne!(bound.file_path, versioned.file_path);
        assert!(versioned
            .file_path
            .to_string_lossy()
            .ends_with(&format!("-CA-{}-2.pem", versioned.id)));

        store.remove_certificate(&bound.id).unwrap();
        assert!(!bound.file_path.exists());
        assert!(versioned.file_path.exists());
        store.validate_store().unwrap();
    }

    #[test]
    fn test_remove_keeps_file_shared_with_another_entry() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CertificateStore::open_in(temp_dir.path()).unwrap();

        let first = store.store_certificate(request(CA_PEM)).unwrap();
        let mut second = first.clone();
        second.instance_id = Some("a_b".to_string());
        store.certificates.push(second);

        store.remove_certificate(&first.id).unwrap();
        assert!(first.file_path.exists());
        store.validate_store().unwrap();
    }

    #[test]
    fn test_cleanup_orphaned_files() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CertificateStore::open_in(temp_dir.path()).unwrap();

        let kept = store.store_certificate(request(CA_PEM)).unwrap();
        let orphan = temp_dir.path().join("stray.pem");
        std::fs::write(&orphan, "junk").unwrap();

        let removed = store.cleanup_orphaned_files().unwrap();
        assert_eq!(removed, vec![orphan.clone()]);
        assert!(!orphan.exists());
        assert!(kept.file_path.exists());
        assert!(temp_dir.path().join(METADATA_FILE).exists());
    }

    #[test]
    fn test_validate_store_collects_all_issues() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CertificateStore::open_in(temp_dir.path()).unwrap();

        let a = store.store_certificate(request(&pem("a"))).unwrap();
        let b = store.store_certificate(request(&pem("b"))).unwrap();
        store.validate_store().unwrap();

        std::fs::remove_file(&a.file_path).unwrap();
        std::fs::remove_file(&b.file_path).unwrap();

        match store.validate_store().unwrap_err() {
            NhnError::Integrity(issues) => {
                assert_eq!(issues.len(), 2);
                assert!(issues[0].contains(&a.id));
                assert!(issues[1].contains(&b.id));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_certificate_file() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("ca.pem");
        std::fs::write(&good, CA_PEM).unwrap();
        let bad = temp_dir.path().join("notes.txt");
        std::fs::write(&bad, "hello").unwrap();

        assert_eq!(
            CertificateStore::load_certificate_file(good.to_str().unwrap()).unwrap(),
            CA_PEM
        );
        assert!(matches!(
            CertificateStore::load_certificate_file(bad.to_str().unwrap()),
            Err(NhnError::Validation(_))
        ));
    }
}
