use anyhow::{bail, Result};
use clap::Subcommand;
use serde_json::json;

use super::{or_dash, GlobalOpts};
use crate::config::{Config, Context};
use crate::output::{print_json, OutputFormat, Table};

#[derive(Subcommand)]
pub enum ContextCommand {
    /// Add (or replace) a context from the global --region / --output flags
    /// Examples:
    ///     nhncloud context add prod --region kr1 --output table
    ///     nhncloud context add tokyo --region jp1 --set-current
    #[command(verbatim_doc_comment)]
    Add {
        /// Context name
        name: String,
        /// Set as current context
        #[arg(long)]
        set_current: bool,
    },
    /// List all configured contexts
    List,
    /// Switch to a different context
    Use {
        /// Context name to switch to
        name: String,
    },
    /// Delete a context
    Delete {
        /// Context name to delete
        name: String,
    },
    /// Show current active context
    Current,
}

/// Explicit `--region` / `--output` values, before merging with the current context.
pub struct ContextFlags {
    pub region: Option<String>,
    pub output: Option<OutputFormat>,
}

pub fn handle(
    config: &mut Config,
    flags: ContextFlags,
    global: &GlobalOpts,
    command: ContextCommand,
) -> Result<()> {
    match command {
        ContextCommand::Add { name, set_current } => {
            config
                .contexts
                .insert(name.clone(), Context::new(flags.region, flags.output));
            if set_current || config.current_context.is_none() {
                config.current_context = Some(name.clone());
            }
            config.save()?;
            println!("Context '{}' added.", name);
            if config.current_context.as_ref() == Some(&name) {
                println!("Context '{}' is now the current context.", name);
            }
        }
        ContextCommand::List => {
            if global.is_json() {
                return print_json(&json!({
                    "current_context": config.current_context,
                    "contexts": config.contexts,
                }));
            }
            let mut table = Table::new(&["", "NAME", "REGION", "OUTPUT"]);
            for (name, ctx) in &config.contexts {
                let current_mark = if config.current_context.as_ref() == Some(name) {
                    "*"
                } else {
                    ""
                };
                table.add_row(vec![
                    current_mark.to_string(),
                    name.clone(),
                    or_dash(ctx.region.as_deref()),
                    or_dash(ctx.output.map(OutputFormat::as_str)),
                ]);
            }
            table.print();
        }
        ContextCommand::Use { name } => {
            if !config.contexts.contains_key(&name) {
                bail!("Context '{}' not found.", name);
            }
            config.current_context = Some(name.clone());
            config.save()?;
            println!("Switched to context '{}'.", name);
        }
        ContextCommand::Delete { name } => {
            if config.contexts.remove(&name).is_none() {
                bail!("Context '{}' not found.", name);
            }
            if config.current_context.as_ref() == Some(&name) {
                config.current_context = None;
            }
            config.save()?;
            println!("Context '{}' deleted.", name);
        }
        ContextCommand::Current => match config.get_current_context() {
            Some((name, ctx)) => {
                if global.is_json() {
                    return print_json(&json!({ "name": name, "context": ctx }));
                }
                println!("Current context: {}", name);
                println!("  Region: {}", or_dash(ctx.region.as_deref()));
                println!("  Output: {}", or_dash(ctx.output.map(OutputFormat::as_str)));
            }
            None => println!("No current context set."),
        },
    }
    Ok(())
}
