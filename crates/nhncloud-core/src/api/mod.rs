//! Platform REST clients.

pub mod rds;

pub use rds::{
    CreateInstanceRequest, DbFlavor, DbInstance, DbVersion, FlavorFetcher, RdsClient, Subnet,
    SubnetFetcher, VersionFetcher,
};
