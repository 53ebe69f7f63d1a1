use anyhow::Result;
use clap::Subcommand;
use nhncloud_core::{paths, KeyInfo, KeyStore};

use super::{confirm_destructive, format_time, or_dash, GlobalOpts};
use crate::output::{print_fields, print_json, Table};

#[derive(Subcommand)]
pub enum SshKeyCommand {
    /// Import a private key (RSA, PKCS8 or OpenSSH PEM)
    /// Examples:
    ///     nhncloud ssh-key import web ~/Downloads/web-keypair.pem
    #[command(verbatim_doc_comment)]
    Import {
        /// Name to store the key under
        name: String,
        /// Path of the private key file
        path: String,
    },
    /// List imported keys
    List,
    /// Show one key, including its public key
    Show {
        name: String,
    },
    /// Delete an imported key
    Remove {
        name: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

fn print_key(global: &GlobalOpts, key: &KeyInfo) -> Result<()> {
    if global.is_json() {
        return print_json(key);
    }
    print_fields(&[
        ("Name", key.name.clone()),
        ("Type", key.key_type.as_str().to_string()),
        ("Fingerprint", key.fingerprint.clone()),
        ("Path", paths::display_relative_to_home(&key.path)),
        ("Created", format_time(&key.created_at)),
        (
            "Last used",
            key.last_used
                .as_ref()
                .map(format_time)
                .unwrap_or_else(|| "never".to_string()),
        ),
        ("Public key", or_dash(key.public_key.as_deref())),
    ]);
    Ok(())
}

pub fn handle(global: &GlobalOpts, command: SshKeyCommand) -> Result<()> {
    let mut store = KeyStore::open()?;

    match command {
        SshKeyCommand::Import { name, path } => {
            let key = store.import_key(&name, &path)?;
            if !global.is_json() {
                println!("SSH key '{}' imported.", key.name);
            }
            print_key(global, &key)?;
        }
        SshKeyCommand::List => {
            let keys = store.list_keys();
            if global.is_json() {
                return print_json(&keys);
            }
            if keys.is_empty() {
                println!("No SSH keys imported.");
                return Ok(());
            }
            let mut table = Table::new(&["NAME", "TYPE", "FINGERPRINT", "LAST USED"]);
            for key in keys {
                table.add_row(vec![
                    key.name.clone(),
                    key.key_type.as_str().to_string(),
                    key.fingerprint.clone(),
                    key.last_used
                        .as_ref()
                        .map(format_time)
                        .unwrap_or_else(|| "never".to_string()),
                ]);
            }
            table.print();
        }
        SshKeyCommand::Show { name } => {
            print_key(global, store.get_key(&name)?)?;
        }
        SshKeyCommand::Remove { name, yes } => {
            store.get_key(&name)?;
            if !confirm_destructive(&format!("Remove SSH key '{}'?", name), yes)? {
                println!("Aborted.");
                return Ok(());
            }
            store.remove_key(&name)?;
            println!("SSH key '{}' removed.", name);
        }
    }
    Ok(())
}
