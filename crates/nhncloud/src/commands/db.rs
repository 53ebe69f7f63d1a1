use std::sync::Arc;

use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Subcommand};
use nhncloud_core::api::rds::{BackupConfig, BackupSchedule, NetworkConfig, StorageConfig};
use nhncloud_core::api::{
    CreateInstanceRequest, FlavorFetcher, RdsClient, SubnetFetcher, VersionFetcher,
};
use nhncloud_core::cert::{CertType, CertificateHelper, CertificateStore, ConnectionParams, DbEngine};
use nhncloud_core::interactive::validators::{
    validate_backup_retention, validate_database_name, validate_instance_name, validate_password,
    validate_port, validate_postgres_username, validate_storage_size, validate_time_of_day,
    validate_username,
};
use nhncloud_core::interactive::{
    DialoguerPrompter, ParamCollector, ParamDefinition, ParamKind, ParamValue, Prompter,
    StaticOptions,
};
use serde_json::json;

use super::auth::access_token;
use super::{or_dash, GlobalOpts};
use crate::output::{print_fields, print_json, shell_quote, Table};

const PASSWORD_ENV: &str = "NHN_DB_PASSWORD";

const DEFAULT_STORAGE_TYPE: &str = "General SSD";
const DEFAULT_STORAGE_SIZE: i64 = 20;
const BACKUP_WINDOW: &str = "ONE_HOUR";

mod param {
    pub const NAME: &str = "name";
    pub const FLAVOR: &str = "flavor";
    pub const VERSION: &str = "version";
    pub const SUBNET: &str = "subnet";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const DATABASE: &str = "database";
    pub const PORT: &str = "port";
    pub const STORAGE_TYPE: &str = "storage_type";
    pub const STORAGE_SIZE: &str = "storage_size";
    pub const DESCRIPTION: &str = "description";
    pub const BACKUP_PERIOD: &str = "backup_period";
    pub const BACKUP_TIME: &str = "backup_time";
    pub const HIGH_AVAILABILITY: &str = "high_availability";
    pub const DELETION_PROTECTION: &str = "deletion_protection";
    pub const PUBLIC_ACCESS: &str = "public_access";
}

#[derive(Subcommand)]
pub enum DbCommand {
    /// List instance flavors
    Flavors {
        #[arg(long, default_value = "mysql")]
        engine: DbEngine,
    },
    /// List engine versions
    Versions {
        #[arg(long, default_value = "mysql")]
        engine: DbEngine,
    },
    /// List VPC subnets usable by DB instances
    Subnets {
        #[arg(long, default_value = "mysql")]
        engine: DbEngine,
    },
    /// List DB instances
    Instances {
        #[arg(long, default_value = "mysql")]
        engine: DbEngine,
    },
    /// Create a DB instance, prompting for anything not given as a flag
    /// Examples:
    ///     nhncloud db create
    ///     nhncloud db create --engine postgresql --name orders-db --database orders
    ///     NHN_DB_PASSWORD=... nhncloud db create --name web-db --flavor <id> --db-version MYSQL_V8032 \
    ///         --subnet <id> --username app --yes
    #[command(verbatim_doc_comment)]
    Create(CreateArgs),
    /// Print the connection string and native client command for an instance
    /// Examples:
    ///     nhncloud db connect-args --host 10.0.0.5 --user app --instance-id 1a2b
    ///     nhncloud db connect-args --engine postgresql --host db.local --user app --database orders
    #[command(verbatim_doc_comment)]
    ConnectArgs(ConnectArgs),
}

#[derive(Args, Debug, Default)]
pub struct CreateArgs {
    #[arg(long, default_value = "mysql")]
    engine: DbEngine,
    /// Instance name (4-50 characters, starts with a letter)
    #[arg(long)]
    name: Option<String>,
    /// Flavor id
    #[arg(long)]
    flavor: Option<String>,
    /// Engine version code (e.g. MYSQL_V8032)
    #[arg(long)]
    db_version: Option<String>,
    /// Subnet id
    #[arg(long)]
    subnet: Option<String>,
    /// Administrator user name
    #[arg(long)]
    username: Option<String>,
    /// Administrator password (prefer the NHN_DB_PASSWORD environment variable)
    #[arg(long)]
    password: Option<String>,
    /// Initial database (PostgreSQL)
    #[arg(long)]
    database: Option<String>,
    #[arg(long)]
    port: Option<i64>,
    #[arg(long)]
    storage_type: Option<String>,
    /// Storage size in GB (20-6000, multiple of 10)
    #[arg(long)]
    storage_size: Option<i64>,
    #[arg(long)]
    description: Option<String>,
    /// Backup retention in days (0 disables backups)
    #[arg(long)]
    backup_period: Option<i64>,
    /// Backup window start, HH:MM
    #[arg(long)]
    backup_time: Option<String>,
    #[arg(long)]
    high_availability: bool,
    #[arg(long)]
    deletion_protection: bool,
    #[arg(long)]
    public_access: bool,
    #[arg(long)]
    parameter_group: Option<String>,
    /// Skip the final confirmation
    #[arg(short, long)]
    yes: bool,
}

impl CreateArgs {
    fn provided_values(&self) -> Vec<(&'static str, ParamValue)> {
        let text = |v: &Option<String>| ParamValue::from(v.clone().unwrap_or_default());
        let int = |v: Option<i64>| ParamValue::Int(v.unwrap_or_default());
        let password = self
            .password
            .clone()
            .or_else(|| std::env::var(PASSWORD_ENV).ok());

        vec![
            (param::NAME, text(&self.name)),
            (param::FLAVOR, text(&self.flavor)),
            (param::VERSION, text(&self.db_version)),
            (param::SUBNET, text(&self.subnet)),
            (param::USERNAME, text(&self.username)),
            (param::PASSWORD, text(&password)),
            (param::DATABASE, text(&self.database)),
            (param::PORT, int(self.port)),
            (param::STORAGE_TYPE, text(&self.storage_type)),
            (param::STORAGE_SIZE, int(self.storage_size)),
            (param::DESCRIPTION, text(&self.description)),
            (param::BACKUP_PERIOD, int(self.backup_period)),
            (param::BACKUP_TIME, text(&self.backup_time)),
            (param::HIGH_AVAILABILITY, ParamValue::Bool(self.high_availability)),
            (param::DELETION_PROTECTION, ParamValue::Bool(self.deletion_protection)),
            (param::PUBLIC_ACCESS, ParamValue::Bool(self.public_access)),
        ]
    }
}

#[derive(Args, Debug)]
pub struct ConnectArgs {
    #[arg(long, default_value = "mysql")]
    engine: DbEngine,
    #[arg(long)]
    host: String,
    #[arg(short, long)]
    user: String,
    #[arg(short, long)]
    port: Option<u16>,
    #[arg(long)]
    database: Option<String>,
    /// Prefer certificates bound to this instance
    #[arg(long)]
    instance_id: Option<String>,
    #[arg(long)]
    db_version: Option<String>,
    /// Explicit certificate file; skips the store lookup
    #[arg(long)]
    cert: Option<String>,
    #[arg(long = "cert-type")]
    cert_type: Option<CertType>,
    /// Engine-specific SSL mode (e.g. VERIFY_IDENTITY, require)
    #[arg(long)]
    ssl_mode: Option<String>,
}

/// Client for `engine` using the resolved app key and a cached token.
async fn rds_client(global: &GlobalOpts, engine: DbEngine) -> Result<RdsClient> {
    let service = engine.service_type();
    let credentials = global.credentials(Some(service))?;
    let app_key = credentials.require_app_key()?;
    let token = access_token(global, Some(service)).await?;
    Ok(RdsClient::new(engine, &credentials.region, app_key, &token.access_token)?)
}

fn create_definitions(engine: DbEngine, rds: Option<Arc<RdsClient>>) -> Vec<ParamDefinition> {
    let flavor = ParamDefinition::new(param::FLAVOR, "Flavor", ParamKind::Select).required();
    let version = ParamDefinition::new(param::VERSION, "Engine version", ParamKind::Select).required();
    let subnet = ParamDefinition::new(param::SUBNET, "Subnet", ParamKind::Select).required();
    let (flavor, version, subnet) = match rds {
        Some(rds) => (
            flavor.with_options(FlavorFetcher(rds.clone())),
            version.with_options(VersionFetcher(rds.clone())),
            subnet.with_options(SubnetFetcher(rds)),
        ),
        None => (flavor, version, subnet),
    };

    let username = ParamDefinition::new(param::USERNAME, "Administrator user name", ParamKind::String)
        .required();
    let username = if engine == DbEngine::PostgreSql {
        username.validate_text(validate_postgres_username)
    } else {
        username.validate_text(validate_username)
    };

    let mut defs = vec![
        ParamDefinition::new(param::NAME, "Instance name", ParamKind::String)
            .required()
            .with_help("4-50 characters, starts with a letter")
            .validate_text(validate_instance_name),
        flavor,
        version,
        subnet,
        username,
        ParamDefinition::new(param::PASSWORD, "Administrator password", ParamKind::Password)
            .required()
            .with_help("8+ characters with upper, lower and digit")
            .validate_text(validate_password),
    ];

    if engine == DbEngine::PostgreSql {
        defs.push(
            ParamDefinition::new(param::DATABASE, "Initial database name", ParamKind::String)
                .required()
                .validate_text(validate_database_name),
        );
    }

    defs.extend([
        ParamDefinition::new(param::PORT, "Port", ParamKind::Integer)
            .with_default(i64::from(engine.default_port()))
            .validate_int(validate_port),
        ParamDefinition::new(param::STORAGE_TYPE, "Storage type", ParamKind::Select)
            .with_default(DEFAULT_STORAGE_TYPE)
            .with_options(StaticOptions::from_values(&["General SSD", "General HDD"])),
        ParamDefinition::new(param::STORAGE_SIZE, "Storage size (GB)", ParamKind::Integer)
            .with_default(DEFAULT_STORAGE_SIZE)
            .with_help("20-6000, multiple of 10")
            .validate_int(validate_storage_size),
        ParamDefinition::new(param::DESCRIPTION, "Description", ParamKind::String),
        ParamDefinition::new(param::BACKUP_PERIOD, "Backup retention (days)", ParamKind::Integer)
            .with_help("0-35, 0 disables backups")
            .validate_int(validate_backup_retention),
        ParamDefinition::new(param::BACKUP_TIME, "Backup window start", ParamKind::String)
            .with_default("00:00")
            .with_help("HH:MM")
            .validate_text(validate_time_of_day)
            .depends_on(&[param::BACKUP_PERIOD]),
        ParamDefinition::new(param::HIGH_AVAILABILITY, "Enable high availability?", ParamKind::Confirm),
        ParamDefinition::new(param::DELETION_PROTECTION, "Enable deletion protection?", ParamKind::Confirm),
        ParamDefinition::new(param::PUBLIC_ACCESS, "Allow public access?", ParamKind::Confirm),
    ]);
    defs
}

fn required_text<P: Prompter>(collector: &ParamCollector<P>, name: &str) -> Result<String> {
    collector
        .get_string(name)
        .map(str::to_string)
        .with_context(|| format!("Missing value for '{}'", name))
}

fn build_request<P: Prompter>(
    engine: DbEngine,
    collector: &ParamCollector<P>,
    parameter_group: Option<String>,
) -> Result<CreateInstanceRequest> {
    let port = collector
        .get_int(param::PORT)
        .unwrap_or_else(|| i64::from(engine.default_port()));
    let port = u16::try_from(port).with_context(|| format!("Invalid port {}", port))?;

    let backup_period = collector.get_int(param::BACKUP_PERIOD).unwrap_or(0);
    let backup_schedules = if backup_period > 0 {
        let start = collector.get_string(param::BACKUP_TIME).unwrap_or("00:00");
        vec![BackupSchedule {
            backup_wnd_bgn_time: format!("{}:00", start),
            backup_wnd_duration: BACKUP_WINDOW.to_string(),
        }]
    } else {
        Vec::new()
    };

    Ok(CreateInstanceRequest {
        db_instance_name: required_text(collector, param::NAME)?,
        description: collector.get_string(param::DESCRIPTION).map(str::to_string),
        db_flavor_id: required_text(collector, param::FLAVOR)?,
        db_version: required_text(collector, param::VERSION)?,
        db_user_name: required_text(collector, param::USERNAME)?,
        db_password: required_text(collector, param::PASSWORD)?,
        db_port: port,
        database_name: if engine == DbEngine::PostgreSql {
            Some(required_text(collector, param::DATABASE)?)
        } else {
            None
        },
        parameter_group_id: parameter_group.filter(|p| !p.is_empty()),
        db_security_group_ids: Vec::new(),
        use_high_availability: collector.get_bool(param::HIGH_AVAILABILITY),
        use_deletion_protection: collector.get_bool(param::DELETION_PROTECTION),
        network: NetworkConfig {
            subnet_id: required_text(collector, param::SUBNET)?,
            use_public_access: collector.get_bool(param::PUBLIC_ACCESS),
            availability_zone: None,
        },
        storage: StorageConfig {
            storage_type: collector
                .get_string(param::STORAGE_TYPE)
                .unwrap_or(DEFAULT_STORAGE_TYPE)
                .to_string(),
            storage_size: collector
                .get_int(param::STORAGE_SIZE)
                .unwrap_or(DEFAULT_STORAGE_SIZE),
        },
        backup: BackupConfig {
            backup_period,
            backup_schedules,
        },
    })
}

fn print_request_summary(engine: DbEngine, request: &CreateInstanceRequest) {
    println!();
    print_fields(&[
        ("Engine", engine.to_string()),
        ("Name", request.db_instance_name.clone()),
        ("Flavor", request.db_flavor_id.clone()),
        ("Version", request.db_version.clone()),
        ("Subnet", request.network.subnet_id.clone()),
        ("User", request.db_user_name.clone()),
        ("Database", or_dash(request.database_name.as_deref())),
        ("Port", request.db_port.to_string()),
        (
            "Storage",
            format!("{} GB {}", request.storage.storage_size, request.storage.storage_type),
        ),
        ("Backup days", request.backup.backup_period.to_string()),
        ("HA", request.use_high_availability.to_string()),
    ]);
    println!();
}

async fn create(global: &GlobalOpts, args: CreateArgs) -> Result<()> {
    let engine = args.engine;
    let rds = Arc::new(rds_client(global, engine).await?);

    let mut collector = ParamCollector::new(
        create_definitions(engine, Some(rds.clone())),
        DialoguerPrompter::new(),
    );
    collector.set_provided_values(args.provided_values());
    collector.validate_provided_values()?;
    collector.prompt_for_missing().await?;
    collector.prompt_for_optional().await?;

    let request = build_request(engine, &collector, args.parameter_group.clone())?;

    if !global.is_json() {
        print_request_summary(engine, &request);
    }
    if !args.yes && !collector.confirm_execution("Create this DB instance?")? {
        println!("Aborted.");
        return Ok(());
    }

    let job_id = rds.create_instance(&request).await?;
    if global.is_json() {
        return print_json(&json!({
            "jobId": job_id,
            "dbInstanceName": request.db_instance_name,
        }));
    }
    println!(
        "Creation of '{}' submitted (job {}).",
        request.db_instance_name, job_id
    );
    Ok(())
}

fn connect_args(global: &GlobalOpts, args: ConnectArgs) -> Result<()> {
    let credentials = global.credentials(Some(args.engine.service_type()))?;
    let store = CertificateStore::open()?;
    let helper = CertificateHelper::new(&store);

    let mut params = ConnectionParams::new(args.engine, &args.host, &args.user, &credentials.region);
    params.port = args.port;
    params.database = args.database;
    params.instance_id = args.instance_id;
    params.version = args.db_version;
    params.cert_path = args.cert;
    params.cert_type = args.cert_type;
    params.ssl_mode = args.ssl_mode;

    let info = helper.build_connection_string(&params)?;
    let cli_args = helper.build_cli_args(&params)?;
    let command_line = cli_args
        .iter()
        .map(|a| shell_quote(a))
        .collect::<Vec<_>>()
        .join(" ");

    if global.is_json() {
        return print_json(&json!({
            "connection_string": info.connection_string,
            "parameters": info.parameters,
            "certificate": info.certificate,
            "cli_args": cli_args,
        }));
    }
    print_fields(&[
        ("Connection string", info.connection_string.clone()),
        (
            "Certificate",
            info.certificate
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "none".to_string()),
        ),
        ("Command", command_line),
    ]);
    Ok(())
}

pub async fn handle(global: &GlobalOpts, command: DbCommand) -> Result<()> {
    match command {
        DbCommand::Flavors { engine } => {
            let flavors = rds_client(global, engine).await?.list_flavors().await?;
            if global.is_json() {
                return print_json(&flavors);
            }
            let mut table = Table::new(&["ID", "NAME", "VCPUS", "RAM (GB)"]);
            for flavor in flavors {
                table.add_row(vec![
                    flavor.db_flavor_id,
                    flavor.db_flavor_name,
                    flavor.vcpus.to_string(),
                    (flavor.ram / 1024).to_string(),
                ]);
            }
            table.print();
        }
        DbCommand::Versions { engine } => {
            let versions = rds_client(global, engine).await?.list_versions().await?;
            if global.is_json() {
                return print_json(&versions);
            }
            let mut table = Table::new(&["VERSION", "NAME"]);
            for version in versions {
                table.add_row(vec![version.db_version, version.db_version_name]);
            }
            table.print();
        }
        DbCommand::Subnets { engine } => {
            let subnets = rds_client(global, engine).await?.list_subnets().await?;
            if global.is_json() {
                return print_json(&subnets);
            }
            let mut table = Table::new(&["ID", "NAME", "CIDR"]);
            for subnet in subnets {
                table.add_row(vec![subnet.subnet_id, subnet.subnet_name, subnet.subnet_cidr]);
            }
            table.print();
        }
        DbCommand::Instances { engine } => {
            let instances = rds_client(global, engine).await?.list_instances().await?;
            if global.is_json() {
                return print_json(&instances);
            }
            if instances.is_empty() {
                println!("No DB instances.");
                return Ok(());
            }
            let mut table = Table::new(&["ID", "NAME", "VERSION", "PORT", "STATUS", "TYPE"]);
            for instance in instances {
                table.add_row(vec![
                    instance.db_instance_id,
                    instance.db_instance_name,
                    instance.db_version,
                    instance
                        .db_port
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    instance.db_instance_status,
                    instance.db_instance_type,
                ]);
            }
            table.print();
        }
        DbCommand::Create(args) => create(global, args).await?,
        DbCommand::ConnectArgs(args) => connect_args(global, args)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nhncloud_core::interactive::ScriptedPrompter;
    use nhncloud_core::NhnError;

    fn collector(engine: DbEngine, args: &CreateArgs) -> ParamCollector<ScriptedPrompter> {
        let mut collector = ParamCollector::with_interactive(
            create_definitions(engine, None),
            ScriptedPrompter::default(),
            false,
        );
        collector.set_provided_values(args.provided_values());
        collector
    }

    fn mysql_args() -> CreateArgs {
        CreateArgs {
            engine: DbEngine::MySql,
            name: Some("web-db".to_string()),
            flavor: Some("flavor-1".to_string()),
            db_version: Some("MYSQL_V8032".to_string()),
            subnet: Some("subnet-1".to_string()),
            username: Some("app".to_string()),
            password: Some("Abc12345".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_build_request_with_defaults() {
        let args = mysql_args();
        let mut collector = collector(DbEngine::MySql, &args);
        collector.validate_provided_values().unwrap();
        collector.prompt_for_missing().await.unwrap();

        let request = build_request(DbEngine::MySql, &collector, None).unwrap();
        assert_eq!(request.db_instance_name, "web-db");
        assert_eq!(request.db_port, 3306);
        assert_eq!(request.storage.storage_size, DEFAULT_STORAGE_SIZE);
        assert_eq!(request.storage.storage_type, DEFAULT_STORAGE_TYPE);
        assert_eq!(request.backup.backup_period, 0);
        assert!(request.backup.backup_schedules.is_empty());
        assert!(request.database_name.is_none());
    }

    #[tokio::test]
    async fn test_build_request_with_backup() {
        let args = CreateArgs {
            backup_period: Some(7),
            backup_time: Some("03:30".to_string()),
            storage_size: Some(100),
            high_availability: true,
            ..mysql_args()
        };
        let mut collector = collector(DbEngine::MySql, &args);
        collector.prompt_for_missing().await.unwrap();

        let request = build_request(DbEngine::MySql, &collector, Some("pg-1".to_string())).unwrap();
        assert_eq!(request.backup.backup_period, 7);
        assert_eq!(request.backup.backup_schedules[0].backup_wnd_bgn_time, "03:30:00");
        assert_eq!(request.storage.storage_size, 100);
        assert!(request.use_high_availability);
        assert_eq!(request.parameter_group_id.as_deref(), Some("pg-1"));
    }

    #[tokio::test]
    async fn test_postgres_requires_database() {
        let args = CreateArgs {
            engine: DbEngine::PostgreSql,
            ..mysql_args()
        };
        let mut collector = collector(DbEngine::PostgreSql, &args);
        match collector.prompt_for_missing().await.unwrap_err() {
            NhnError::MissingParameters(names) => assert_eq!(names, vec!["database"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_flags_are_rejected() {
        let args = CreateArgs {
            name: Some("1abc".to_string()),
            storage_size: Some(25),
            username: Some("root".to_string()),
            ..mysql_args()
        };
        let message = collector(DbEngine::MySql, &args)
            .validate_provided_values()
            .unwrap_err()
            .to_string();
        assert!(message.contains("name:"));
        assert!(message.contains("storage_size:"));
        assert!(message.contains("username:"));
    }

    #[test]
    fn test_postgres_username_rules() {
        let args = CreateArgs {
            engine: DbEngine::PostgreSql,
            username: Some("pg_admin".to_string()),
            database: Some("orders".to_string()),
            ..mysql_args()
        };
        assert!(collector(DbEngine::PostgreSql, &args)
            .validate_provided_values()
            .is_err());
    }
}
