use anyhow::{bail, Context as AnyhowContext, Result};
use clap::Subcommand;
use nhncloud_core::KeyStore;
use std::path::Path;

#[derive(Subcommand)]
pub enum SshCommand {
    /// Open an SSH session using an imported key
    /// Examples:
    ///     nhncloud ssh connect --key web --host 133.186.1.10 --user centos
    ///     nhncloud ssh connect --key web --host 10.0.0.5 -- -L 3306:db:3306
    #[command(verbatim_doc_comment)]
    Connect {
        /// Name of an imported key
        #[arg(long)]
        key: String,
        /// Host name or IP address
        #[arg(long)]
        host: String,
        /// Login user
        #[arg(short, long)]
        user: Option<String>,
        /// SSH port
        #[arg(short, long)]
        port: Option<u16>,
        /// Extra arguments passed to ssh
        #[arg(last = true)]
        extra: Vec<String>,
    },
}

fn ssh_args(
    key_path: &Path,
    host: &str,
    user: Option<&str>,
    port: Option<u16>,
    extra: &[String],
) -> Vec<String> {
    let mut args = vec![
        "-i".to_string(),
        key_path.display().to_string(),
        "-o".to_string(),
        "IdentitiesOnly=yes".to_string(),
    ];
    if let Some(port) = port {
        args.push("-p".to_string());
        args.push(port.to_string());
    }
    args.extend(extra.iter().cloned());
    match user.filter(|u| !u.is_empty()) {
        Some(user) => args.push(format!("{}@{}", user, host)),
        None => args.push(host.to_string()),
    }
    args
}

pub async fn handle(command: SshCommand) -> Result<()> {
    match command {
        SshCommand::Connect {
            key,
            host,
            user,
            port,
            extra,
        } => {
            let mut store = KeyStore::open()?;
            let key_path = store.mark_used(&key)?;
            let args = ssh_args(&key_path, &host, user.as_deref(), port, &extra);

            tracing::debug!(?args, "Spawning ssh");
            let status = tokio::process::Command::new("ssh")
                .args(&args)
                .status()
                .await
                .context("Failed to run ssh (is OpenSSH installed?)")?;

            if !status.success() {
                match status.code() {
                    Some(code) => std::process::exit(code),
                    None => bail!("ssh terminated by signal"),
                }
            }
        }
    }
    Ok(())
}
