//! TLS certificates for database connections.
//!
//! - `store`: content-addressed certificate files plus a JSON metadata list
//! - `helper`: connection strings and native client arguments

mod helper;
mod store;

pub use helper::{
    validate_certificate_path, CertificateHelper, ConnectionInfo, ConnectionParams, DbEngine,
};
pub use store::{
    certificate_id, CertSource, CertType, CertificateInfo, CertificateStore, ConnectionSelector,
    StoreRequest, METADATA_FILE,
};
