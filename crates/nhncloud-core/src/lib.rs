//! NHN Cloud CLI core library
//!
//! Local state and prompting shared by the `nhncloud` command-line tool.
//!
//! This crate provides:
//! - OAuth2 client-credentials token cache
//! - Credentials file and environment resolution
//! - Certificate store with content-addressed ids and connection matching
//! - Connection string / native client argument construction
//! - SSH key store
//! - Interactive parameter collection with validators
//! - RDS API client used by option fetchers

pub mod api;
pub mod auth;
pub mod cert;
pub mod config;
pub mod error;
pub mod fsutil;
pub mod interactive;
pub mod paths;
pub mod result_ext;
pub mod sshkey;

pub use auth::{Token, TokenManager};
pub use cert::{CertificateHelper, CertificateInfo, CertificateStore, CertType};
pub use config::{Credentials, CredentialsFile};
pub use error::{NhnError, Result};
pub use interactive::{ParamCollector, ParamDefinition, ParamKind, ParamValue};
pub use sshkey::{KeyInfo, KeyStore, KeyType};
