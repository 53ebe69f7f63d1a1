pub mod auth;
pub mod cert;
pub mod configure;
pub mod context;
pub mod db;
pub mod ssh;
pub mod sshkey;

use anyhow::{bail, Result};
use chrono::{DateTime, Local, Utc};
use nhncloud_core::interactive::{is_interactive, DialoguerPrompter, Prompter};
use nhncloud_core::{Credentials, CredentialsFile};

use crate::config::Config;
use crate::output::OutputFormat;

/// Flags shared by every command, merged with the current context.
#[derive(Debug, Clone)]
pub struct GlobalOpts {
    /// `--region` as given on the command line.
    pub region: Option<String>,
    /// Region of the current context.
    pub context_region: Option<String>,
    pub output: OutputFormat,
}

impl GlobalOpts {
    /// Command-line flags win over the current context.
    pub fn resolve(region: Option<String>, output: Option<OutputFormat>, config: &Config) -> Self {
        Self {
            region: region.filter(|r| !r.is_empty()),
            context_region: config.region().map(str::to_string),
            output: output.or_else(|| config.output()).unwrap_or_default(),
        }
    }

    /// `--region`, falling back to the current context.
    pub fn preferred_region(&self) -> Option<&str> {
        self.region.as_deref().or(self.context_region.as_deref())
    }

    /// Credentials for `service` with the effective region applied.
    pub fn credentials(&self, service: Option<&str>) -> Result<Credentials> {
        let file = CredentialsFile::load()?;
        Ok(self.credentials_with(service, &file, |name| std::env::var(name).ok()))
    }

    /// Region order: `--region`, `NHN_{SERVICE}_REGION` / `NHN_REGION`,
    /// current context, credentials file, `kr1`.
    fn credentials_with<F>(&self, service: Option<&str>, file: &CredentialsFile, env: F) -> Credentials
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Credentials::resolve_with(service, file, &env);
        if self.region.is_some() {
            return credentials.with_region(self.region.as_deref());
        }
        if Credentials::env_region_with(service, &env).is_some() {
            return credentials;
        }
        credentials.with_region(self.context_region.as_deref())
    }

    pub fn is_json(&self) -> bool {
        self.output == OutputFormat::Json
    }
}

/// Ask before a destructive step; `--yes` skips the question.
pub fn confirm_destructive(message: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    if !is_interactive() {
        bail!("Refusing to continue without confirmation; pass --yes");
    }
    Ok(DialoguerPrompter::new().confirm(message, false)?)
}

pub fn format_time(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn or_dash(value: Option<&str>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or("-").to_string()
}
