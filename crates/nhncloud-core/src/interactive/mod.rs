//! Interactive parameter collection.
//!
//! Commands declare their inputs as [`ParamDefinition`]s, seed whatever the
//! user passed on the command line and let [`ParamCollector`] prompt for the
//! rest when a terminal is attached.

mod collector;
mod fetcher;
mod param;
mod prompter;
pub mod validators;

use std::io::IsTerminal;

pub use collector::ParamCollector;
pub use fetcher::{OptionFetcher, StaticOptions};
pub use param::{ParamDefinition, ParamKind, ParamValue, SelectOption, Validator};
pub use prompter::{Answer, DialoguerPrompter, Prompter, ScriptedPrompter};
pub use validators::{ValidationError, ValidationResult};

/// Environment variable that disables prompting.
pub const NONINTERACTIVE_ENV: &str = "NHNCLOUD_NONINTERACTIVE";

/// Whether prompting is allowed in this process.
pub fn is_interactive() -> bool {
    interactive_from(std::io::stdin().is_terminal(), |name| std::env::var(name).ok())
}

fn interactive_from<F>(stdin_is_terminal: bool, env: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    let set = |name: &str| env(name).is_some_and(|v| !v.is_empty());
    stdin_is_terminal && !set("CI") && !set(NONINTERACTIVE_ENV)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interactive_gate() {
        assert!(interactive_from(true, |_| None));
        assert!(!interactive_from(false, |_| None));
        assert!(!interactive_from(true, |name| (name == "CI").then(|| "true".to_string())));
        assert!(!interactive_from(true, |name| {
            (name == NONINTERACTIVE_ENV).then(|| "1".to_string())
        }));
        assert!(interactive_from(true, |name| (name == "CI").then(String::new)));
    }
}
