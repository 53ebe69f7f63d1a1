//! RDS for MySQL / MariaDB / PostgreSQL REST client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cert::DbEngine;
use crate::error::{NhnError, Result};
use crate::interactive::{OptionFetcher, SelectOption};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const APP_KEY_HEADER: &str = "X-TC-APP-KEY";
const AUTH_HEADER: &str = "X-NHN-AUTHORIZATION";

/// Regional endpoint for an engine, e.g. `https://kr1-rds-mysql.api.nhncloudservice.com`.
pub fn endpoint(engine: DbEngine, region: &str) -> String {
    let service = match engine {
        DbEngine::MySql => "mysql",
        DbEngine::MariaDb => "mariadb",
        DbEngine::PostgreSql => "postgres",
    };
    format!("https://{}-rds-{}.api.nhncloudservice.com", region, service)
}

pub fn api_version(engine: DbEngine) -> &'static str {
    match engine {
        DbEngine::MySql | DbEngine::MariaDb => "v3.0",
        DbEngine::PostgreSql => "v1.0",
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseHeader {
    is_successful: bool,
    #[serde(default)]
    result_code: i64,
    #[serde(default)]
    result_message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbFlavor {
    pub db_flavor_id: String,
    pub db_flavor_name: String,
    /// MB
    #[serde(default)]
    pub ram: i64,
    #[serde(default)]
    pub vcpus: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbVersion {
    pub db_version: String,
    #[serde(default)]
    pub db_version_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    pub subnet_id: String,
    #[serde(default)]
    pub subnet_name: String,
    #[serde(default)]
    pub subnet_cidr: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbInstance {
    pub db_instance_id: String,
    pub db_instance_name: String,
    #[serde(default)]
    pub db_version: String,
    #[serde(default)]
    pub db_port: Option<u16>,
    #[serde(default)]
    pub db_instance_status: String,
    #[serde(default)]
    pub db_instance_type: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub subnet_id: String,
    pub use_public_access: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    pub storage_type: String,
    pub storage_size: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSchedule {
    /// `HH:MM:SS`
    pub backup_wnd_bgn_time: String,
    pub backup_wnd_duration: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupConfig {
    pub backup_period: i64,
    pub backup_schedules: Vec<BackupSchedule>,
}

/// Body of `POST /db-instances`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceRequest {
    pub db_instance_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub db_flavor_id: String,
    pub db_version: String,
    pub db_user_name: String,
    pub db_password: String,
    pub db_port: u16,
    /// PostgreSQL only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_group_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub db_security_group_ids: Vec<String>,
    pub use_high_availability: bool,
    pub use_deletion_protection: bool,
    pub network: NetworkConfig,
    pub storage: StorageConfig,
    pub backup: BackupConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlavorList {
    #[serde(default)]
    db_flavors: Vec<DbFlavor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionList {
    #[serde(default)]
    db_versions: Vec<DbVersion>,
}

#[derive(Debug, Deserialize)]
struct SubnetList {
    #[serde(default)]
    subnets: Vec<Subnet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceList {
    #[serde(default)]
    db_instances: Vec<DbInstance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobResponse {
    job_id: String,
}

/// Authenticated client for one engine in one region.
pub struct RdsClient {
    client: reqwest::Client,
    engine: DbEngine,
    base_url: String,
    app_key: String,
    token: String,
}

impl RdsClient {
    pub fn new(engine: DbEngine, region: &str, app_key: &str, token: &str) -> Result<Self> {
        Self::with_base_url(engine, &endpoint(engine, region), app_key, token)
    }

    /// Client against an explicit base URL.
    pub fn with_base_url(
        engine: DbEngine,
        base_url: &str,
        app_key: &str,
        token: &str,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NhnError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            engine,
            base_url: base_url.trim_end_matches('/').to_string(),
            app_key: app_key.to_string(),
            token: token.to_string(),
        })
    }

    pub fn engine(&self) -> DbEngine {
        self.engine
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}{}", self.base_url, api_version(self.engine), path)
    }

    async fn request<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        tracing::debug!(%method, %url, "RDS API request");

        let mut request = self
            .client
            .request(method, &url)
            .header(APP_KEY_HEADER, &self.app_key)
            .header(AUTH_HEADER, format!("Bearer {}", self.token))
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NhnError::Network(format!("Failed to call {}: {}", url, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| NhnError::Network(format!("Failed to read response from {}: {}", url, e)))?;

        if !status.is_success() {
            return Err(NhnError::HttpStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_response(&text)
    }

    pub async fn list_flavors(&self) -> Result<Vec<DbFlavor>> {
        let list: FlavorList = self.request(Method::GET, "/db-flavors", None::<&()>).await?;
        Ok(list.db_flavors)
    }

    pub async fn list_versions(&self) -> Result<Vec<DbVersion>> {
        let list: VersionList = self.request(Method::GET, "/db-versions", None::<&()>).await?;
        Ok(list.db_versions)
    }

    pub async fn list_subnets(&self) -> Result<Vec<Subnet>> {
        let list: SubnetList = self
            .request(Method::GET, "/network/subnets", None::<&()>)
            .await?;
        Ok(list.subnets)
    }

    pub async fn list_instances(&self) -> Result<Vec<DbInstance>> {
        let list: InstanceList = self.request(Method::GET, "/db-instances", None::<&()>).await?;
        Ok(list.db_instances)
    }

    /// Submit an instance creation; returns the job id.
    pub async fn create_instance(&self, request: &CreateInstanceRequest) -> Result<String> {
        let job: JobResponse = self
            .request(Method::POST, "/db-instances", Some(request))
            .await?;
        tracing::info!(job_id = %job.job_id, name = %request.db_instance_name, "DB instance creation submitted");
        Ok(job.job_id)
    }
}

/// Check the response header and decode the body.
fn parse_response<T: DeserializeOwned>(text: &str) -> Result<T> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| NhnError::Json(format!("Failed to parse API response: {}", e)))?;

    let header = value
        .get("header")
        .cloned()
        .ok_or_else(|| NhnError::Json("API response has no header".to_string()))?;
    let header: ResponseHeader = serde_json::from_value(header)
        .map_err(|e| NhnError::Json(format!("Failed to parse API response header: {}", e)))?;

    if !header.is_successful {
        return Err(NhnError::Api {
            code: header.result_code,
            message: header.result_message,
        });
    }

    serde_json::from_value(value)
        .map_err(|e| NhnError::Json(format!("Failed to parse API response body: {}", e)))
}

/// Flavor choices, labelled with their size.
pub struct FlavorFetcher(pub Arc<RdsClient>);

#[async_trait]
impl OptionFetcher for FlavorFetcher {
    async fn fetch(&self) -> Result<Vec<SelectOption>> {
        Ok(self
            .0
            .list_flavors()
            .await?
            .into_iter()
            .map(|f| {
                let label = format!(
                    "{} ({} vCPU, {} GB)",
                    f.db_flavor_name,
                    f.vcpus,
                    f.ram / 1024
                );
                SelectOption::new(label, f.db_flavor_id)
            })
            .collect())
    }
}

pub struct VersionFetcher(pub Arc<RdsClient>);

#[async_trait]
impl OptionFetcher for VersionFetcher {
    async fn fetch(&self) -> Result<Vec<SelectOption>> {
        Ok(self
            .0
            .list_versions()
            .await?
            .into_iter()
            .map(|v| {
                let label = if v.db_version_name.is_empty() {
                    v.db_version.clone()
                } else {
                    v.db_version_name
                };
                SelectOption::new(label, v.db_version)
            })
            .collect())
    }
}

pub struct SubnetFetcher(pub Arc<RdsClient>);

#[async_trait]
impl OptionFetcher for SubnetFetcher {
    async fn fetch(&self) -> Result<Vec<SelectOption>> {
        Ok(self
            .0
            .list_subnets()
            .await?
            .into_iter()
            .map(|s| {
                let label = format!("{} ({})", s.subnet_name, s.subnet_cidr);
                SelectOption::new(label, s.subnet_id)
            })
            .collect())
    }
}
