mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::{
    auth::AuthCommand,
    cert::CertCommand,
    context::{ContextCommand, ContextFlags},
    db::DbCommand,
    ssh::SshCommand,
    sshkey::SshKeyCommand,
    GlobalOpts,
};
use config::Config;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "nhncloud")]
#[command(version, about = "NHN Cloud Command Line Tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Region (e.g. kr1, kr2, jp1); overrides NHN_REGION, the current context and credentials.
    /// Without it NHN_{SERVICE}_REGION / NHN_REGION win over the context region
    #[arg(long, global = true)]
    region: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    output: Option<OutputFormat>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Store API credentials in ~/.nhncloud/credentials
    /// Examples:
    ///     nhncloud configure
    ///     nhncloud configure --app-key=XXXX --access-key-id=AK --secret-access-key=SK
    ///     nhncloud configure --service rds-mysql --app-key=YYYY
    #[command(verbatim_doc_comment)]
    Configure {
        /// Write service-specific keys (e.g. rds-mysql)
        #[arg(long)]
        service: Option<String>,
        /// Application key
        #[arg(long)]
        app_key: Option<String>,
        /// User access key ID
        #[arg(long)]
        access_key_id: Option<String>,
        /// User secret access key
        #[arg(long)]
        secret_access_key: Option<String>,
    },

    /// Manage named contexts (default region and output format)
    Context {
        #[command(subcommand)]
        command: ContextCommand,
    },

    /// OAuth2 access tokens
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },

    /// TLS certificates for database connections
    Cert {
        #[command(subcommand)]
        command: CertCommand,
    },

    /// Imported SSH private keys
    #[command(name = "ssh-key")]
    SshKey {
        #[command(subcommand)]
        command: SshKeyCommand,
    },

    /// Connect to hosts with imported SSH keys
    Ssh {
        #[command(subcommand)]
        command: SshCommand,
    },

    /// RDS for MySQL / MariaDB / PostgreSQL
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "nhncloud=debug,nhncloud_core=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    init_tracing(cli.verbose);

    let mut config = Config::load()?;
    let flags = ContextFlags {
        region: cli.region.clone(),
        output: cli.output,
    };
    let global = GlobalOpts::resolve(cli.region, cli.output, &config);
    tracing::debug!(region = ?global.preferred_region(), output = ?global.output, "Resolved global options");

    match cli.command {
        Commands::Configure {
            service,
            app_key,
            access_key_id,
            secret_access_key,
        } => {
            let input = commands::configure::ConfigureInput {
                region: None,
                app_key,
                access_key_id,
                secret_access_key,
            };
            commands::configure::run(&global, service.as_deref(), input).await
        }
        Commands::Context { command } => commands::context::handle(&mut config, flags, &global, command),
        Commands::Auth { command } => commands::auth::handle(&global, command).await,
        Commands::Cert { command } => commands::cert::handle(&global, command),
        Commands::SshKey { command } => commands::sshkey::handle(&global, command),
        Commands::Ssh { command } => commands::ssh::handle(command).await,
        Commands::Db { command } => commands::db::handle(&global, command).await,
    }
}
