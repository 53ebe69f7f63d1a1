use anyhow::{Context as AnyhowContext, Result};
use clap::Subcommand;
use nhncloud_core::{fsutil, paths, Token, TokenManager};
use serde_json::json;

use super::{format_time, GlobalOpts};
use crate::output::{print_fields, print_json};

#[derive(Subcommand)]
pub enum AuthCommand {
    /// Print an access token, fetching a new one when the cache is stale
    /// Examples:
    ///     nhncloud auth token
    ///     nhncloud auth token --refresh -o json
    #[command(verbatim_doc_comment)]
    Token {
        /// Ignore the cache and request a new token
        #[arg(long)]
        refresh: bool,
        /// Use service-specific access keys (e.g. rds-mysql)
        #[arg(long)]
        service: Option<String>,
    },
    /// Delete the cached token
    Clear,
}

/// Token for the resolved access key pair, from cache when valid.
pub async fn access_token(global: &GlobalOpts, service: Option<&str>) -> Result<Token> {
    let credentials = global.credentials(service)?;
    let (access_key_id, secret_access_key) = credentials.require_access_keys()?;
    let manager = TokenManager::new(access_key_id, secret_access_key)?;
    manager
        .get_token()
        .await
        .context("Failed to obtain access token")
}

pub async fn handle(global: &GlobalOpts, command: AuthCommand) -> Result<()> {
    match command {
        AuthCommand::Token { refresh, service } => {
            let token = if refresh {
                let credentials = global.credentials(service.as_deref())?;
                let (access_key_id, secret_access_key) = credentials.require_access_keys()?;
                TokenManager::new(access_key_id, secret_access_key)?
                    .refresh_token()
                    .await
                    .context("Failed to refresh access token")?
            } else {
                access_token(global, service.as_deref()).await?
            };

            if global.is_json() {
                return print_json(&json!({
                    "access_token": token.access_token,
                    "token_type": token.token_type,
                    "expires_in": token.expires_in,
                    "issued_at": token.issued_at,
                    "expires_at": token.expires_at(),
                }));
            }
            print_fields(&[
                ("Access token", token.access_token.clone()),
                ("Token type", token.token_type.clone()),
                ("Issued at", format_time(&token.issued_at)),
                (
                    "Expires at",
                    token
                        .expires_at()
                        .map(|t| format_time(&t))
                        .unwrap_or_else(|| "-".to_string()),
                ),
            ]);
        }
        AuthCommand::Clear => {
            let path = paths::token_cache_path()?;
            fsutil::remove_if_exists(&path)?;
            println!("Token cache cleared ({}).", paths::display_relative_to_home(&path));
        }
    }
    Ok(())
}
