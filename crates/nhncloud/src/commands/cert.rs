use anyhow::{bail, Result};
use clap::Subcommand;
use nhncloud_core::cert::{
    CertSource, CertType, CertificateInfo, CertificateStore, ConnectionSelector, DbEngine,
    StoreRequest,
};
use nhncloud_core::{paths, NhnError};

use super::{confirm_destructive, format_time, or_dash, GlobalOpts};
use crate::output::{print_fields, print_json, Table};

#[derive(Subcommand)]
pub enum CertCommand {
    /// Store a PEM certificate
    /// Examples:
    ///     nhncloud cert add --file ~/Downloads/ca.pem --engine mysql --instance-id 1a2b
    ///     nhncloud cert add --file client.pem --engine postgresql --type CLIENT-CERT
    #[command(verbatim_doc_comment)]
    Add {
        /// PEM file to import
        #[arg(long)]
        file: String,
        /// Database engine the certificate belongs to
        #[arg(long, default_value = "mysql")]
        engine: DbEngine,
        /// Bind the certificate to one DB instance
        #[arg(long)]
        instance_id: Option<String>,
        /// Engine version (e.g. 8.0)
        #[arg(long)]
        db_version: Option<String>,
        /// CA, CLIENT-CERT or CLIENT-KEY
        #[arg(long = "type", default_value = "CA")]
        cert_type: CertType,
        /// manual, downloaded or generated
        #[arg(long, default_value = "manual")]
        source: CertSource,
        #[arg(long)]
        description: Option<String>,
    },
    /// List stored certificates
    List {
        /// Only certificates for this engine
        #[arg(long)]
        engine: Option<DbEngine>,
        #[arg(long)]
        instance_id: Option<String>,
    },
    /// Show one certificate
    Show {
        id: String,
    },
    /// Delete a certificate and its file
    Remove {
        id: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Show which certificate a connection would use
    Find {
        #[arg(long, default_value = "mysql")]
        engine: DbEngine,
        #[arg(long)]
        instance_id: Option<String>,
        #[arg(long)]
        db_version: Option<String>,
        #[arg(long = "type", default_value = "CA")]
        cert_type: CertType,
    },
    /// Delete files in the store directory that no entry references
    Cleanup,
    /// Check that every entry's file still exists
    Validate,
}

fn region(global: &GlobalOpts) -> Result<String> {
    Ok(global.credentials(None)?.region)
}

fn print_certificate(global: &GlobalOpts, cert: &CertificateInfo) -> Result<()> {
    if global.is_json() {
        return print_json(cert);
    }
    print_fields(&[
        ("ID", cert.id.clone()),
        ("Type", cert.cert_type.to_string()),
        ("Service", cert.service_type.clone()),
        ("Region", cert.region.clone()),
        ("Instance", or_dash(cert.instance_id.as_deref())),
        ("Version", or_dash(cert.version.as_deref())),
        ("Source", cert.source.as_str().to_string()),
        ("Stored at", format_time(&cert.stored_at)),
        ("Path", paths::display_relative_to_home(&cert.file_path)),
        ("Description", or_dash(cert.description.as_deref())),
    ]);
    Ok(())
}

pub fn handle(global: &GlobalOpts, command: CertCommand) -> Result<()> {
    let mut store = CertificateStore::open()?;

    match command {
        CertCommand::Add {
            file,
            engine,
            instance_id,
            db_version,
            cert_type,
            source,
            description,
        } => {
            let content = CertificateStore::load_certificate_file(&file)?;
            let request = StoreRequest {
                service_type: engine.service_type().to_string(),
                region: region(global)?,
                instance_id,
                version: db_version,
                cert_type,
                source,
                description,
                content,
            };
            match store.store_certificate(request) {
                Ok(cert) => {
                    if !global.is_json() {
                        println!("Certificate stored.");
                    }
                    print_certificate(global, &cert)?;
                }
                Err(NhnError::CertificateExists(existing)) => {
                    bail!(
                        "Certificate already stored as {} ({})",
                        existing.id,
                        paths::display_relative_to_home(&existing.file_path)
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        CertCommand::List {
            engine,
            instance_id,
        } => {
            let certs = store.list_certificates(
                engine.map(|e| e.service_type()),
                global.preferred_region(),
                instance_id.as_deref(),
            );
            if global.is_json() {
                return print_json(&certs);
            }
            if certs.is_empty() {
                println!("No certificates stored.");
                return Ok(());
            }
            let mut table = Table::new(&["ID", "TYPE", "SERVICE", "REGION", "INSTANCE", "VERSION", "STORED"]);
            for cert in certs {
                table.add_row(vec![
                    cert.id.clone(),
                    cert.cert_type.to_string(),
                    cert.service_type.clone(),
                    cert.region.clone(),
                    or_dash(cert.instance_id.as_deref()),
                    or_dash(cert.version.as_deref()),
                    format_time(&cert.stored_at),
                ]);
            }
            table.print();
        }
        CertCommand::Show { id } => {
            let cert = store.get_certificate(&id)?;
            print_certificate(global, cert)?;
        }
        CertCommand::Remove { id, yes } => {
            let cert = store.get_certificate(&id)?;
            let message = format!(
                "Remove {} certificate {} ({})?",
                cert.cert_type,
                cert.id,
                paths::display_relative_to_home(&cert.file_path)
            );
            if !confirm_destructive(&message, yes)? {
                println!("Aborted.");
                return Ok(());
            }
            let removed = store.remove_certificate(&id)?;
            println!("Certificate {} removed.", removed.id);
        }
        CertCommand::Find {
            engine,
            instance_id,
            db_version,
            cert_type,
        } => {
            let selector = ConnectionSelector {
                service_type: engine.service_type().to_string(),
                region: region(global)?,
                instance_id,
                version: db_version,
                cert_type,
            };
            let cert = store.find_certificate_for_connection(&selector)?;
            print_certificate(global, cert)?;
        }
        CertCommand::Cleanup => {
            let removed = store.cleanup_orphaned_files()?;
            if global.is_json() {
                return print_json(&removed);
            }
            if removed.is_empty() {
                println!("No orphaned files.");
            }
            for path in removed {
                println!("Removed {}", paths::display_relative_to_home(&path));
            }
        }
        CertCommand::Validate => {
            store.validate_store()?;
            println!("Certificate store OK.");
        }
    }
    Ok(())
}
