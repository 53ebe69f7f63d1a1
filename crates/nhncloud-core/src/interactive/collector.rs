use std::collections::BTreeMap;

use super::param::{ParamDefinition, ParamKind, ParamValue, SelectOption};
use super::prompter::Prompter;
use super::is_interactive;
use crate::error::{NhnError, Result};

/// Resolves a set of parameters from provided values and prompts.
///
/// A parameter is prompted for at most once: anything already set, whether
/// provided or answered, is never asked again.
pub struct ParamCollector<P: Prompter> {
    definitions: Vec<ParamDefinition>,
    values: BTreeMap<String, ParamValue>,
    interactive: bool,
    prompter: P,
}

impl<P: Prompter> ParamCollector<P> {
    /// Collector whose interactivity follows the current terminal.
    pub fn new(definitions: Vec<ParamDefinition>, prompter: P) -> Self {
        Self::with_interactive(definitions, prompter, is_interactive())
    }

    pub fn with_interactive(definitions: Vec<ParamDefinition>, prompter: P, interactive: bool) -> Self {
        Self {
            definitions,
            values: BTreeMap::new(),
            interactive,
            prompter,
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    /// Seed known values. Zero values count as not provided.
    pub fn set_provided_values<I, K>(&mut self, provided: I)
    where
        I: IntoIterator<Item = (K, ParamValue)>,
        K: Into<String>,
    {
        for (name, value) in provided {
            if value.is_zero() {
                continue;
            }
            self.values.insert(name.into(), value);
        }
    }

    /// Fill every required parameter that has no value.
    ///
    /// Non-interactive: fails naming all missing parameters at once.
    pub async fn prompt_for_missing(&mut self) -> Result<()> {
        let missing: Vec<usize> = self
            .definitions
            .iter()
            .enumerate()
            .filter(|(_, def)| def.required && !self.values.contains_key(&def.name))
            .map(|(i, _)| i)
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        if !self.interactive {
            return Err(NhnError::MissingParameters(
                missing
                    .iter()
                    .map(|&i| self.definitions[i].name.clone())
                    .collect(),
            ));
        }

        for i in missing {
            let value = prompt_value(&mut self.prompter, &self.definitions[i]).await?;
            self.values.insert(self.definitions[i].name.clone(), value);
        }
        Ok(())
    }

    /// Offer the unset optional parameters behind a single yes/no gate.
    ///
    /// Parameters with unmet dependencies are skipped. Prompt errors are
    /// logged and the parameter left unset.
    pub async fn prompt_for_optional(&mut self) -> Result<()> {
        if !self.interactive {
            return Ok(());
        }
        let pending = self
            .definitions
            .iter()
            .any(|def| !def.required && !self.values.contains_key(&def.name));
        if !pending {
            return Ok(());
        }
        if !self
            .prompter
            .confirm("Configure optional parameters?", false)?
        {
            return Ok(());
        }

        for def in &self.definitions {
            if def.required || self.values.contains_key(&def.name) {
                continue;
            }
            if !def.depends_on.iter().all(|dep| self.values.contains_key(dep)) {
                tracing::debug!(param = %def.name, deps = ?def.depends_on, "Skipping parameter with unmet dependencies");
                continue;
            }
            match prompt_value(&mut self.prompter, def).await {
                Ok(value) if !value.is_zero() => {
                    self.values.insert(def.name.clone(), value);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(param = %def.name, error = %e, "Optional parameter skipped");
                }
            }
        }
        Ok(())
    }

    /// Run every validator over the values that are set.
    pub fn validate_provided_values(&self) -> Result<()> {
        let failures: Vec<String> = self
            .definitions
            .iter()
            .filter_map(|def| {
                let value = self.values.get(&def.name)?;
                def.validate(value)
                    .err()
                    .map(|e| format!("{}: {}", def.name, e))
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(NhnError::Validation(failures.join("; ")))
        }
    }

    /// Final go/no-go. Always proceeds when not interactive.
    pub fn confirm_execution(&mut self, message: &str) -> Result<bool> {
        if !self.interactive {
            return Ok(true);
        }
        self.prompter.confirm(message, true)
    }

    pub fn values(&self) -> &BTreeMap<String, ParamValue> {
        &self.values
    }

    pub fn definitions(&self) -> &[ParamDefinition] {
        &self.definitions
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(ParamValue::as_text)
    }

    pub fn get_list(&self, name: &str) -> Vec<String> {
        self.values
            .get(name)
            .and_then(ParamValue::as_list)
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }

    pub fn get_bool(&self, name: &str) -> bool {
        self.values
            .get(name)
            .and_then(ParamValue::as_bool)
            .unwrap_or(false)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(ParamValue::as_int)
    }
}

async fn fetch_options(def: &ParamDefinition) -> Option<Vec<SelectOption>> {
    let fetcher = def.fetcher.as_ref()?;
    match fetcher.fetch().await {
        Ok(options) if !options.is_empty() => Some(options),
        Ok(_) => {
            tracing::warn!(param = %def.name, "No options available");
            None
        }
        Err(e) => {
            tracing::warn!(param = %def.name, error = %e, "Failed to fetch options");
            None
        }
    }
}

fn default_text(def: &ParamDefinition) -> Option<String> {
    match &def.default {
        Some(ParamValue::Text(s)) => Some(s.clone()),
        Some(ParamValue::Int(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Ask for one parameter until a valid answer is given.
async fn prompt_value<P: Prompter>(prompter: &mut P, def: &ParamDefinition) -> Result<ParamValue> {
    let message = def.prompt_text();
    let options = match def.kind {
        ParamKind::Select | ParamKind::MultiSelect => fetch_options(def).await,
        _ => None,
    };

    loop {
        let value = match def.kind {
            ParamKind::String => {
                ParamValue::Text(prompter.input(&message, default_text(def).as_deref())?)
            }
            ParamKind::Password => ParamValue::Text(prompter.password(&message)?),
            ParamKind::Integer => {
                let raw = prompter.input(&message, default_text(def).as_deref())?;
                let raw = raw.trim();
                if raw.is_empty() && !def.required {
                    return Ok(ParamValue::Int(0));
                }
                match raw.parse::<i64>() {
                    Ok(n) => ParamValue::Int(n),
                    Err(_) => {
                        prompter.report_error(&format!("'{}' is not a whole number", raw));
                        continue;
                    }
                }
            }
            ParamKind::Confirm => {
                let default = matches!(def.default, Some(ParamValue::Bool(true)));
                ParamValue::Bool(prompter.confirm(&message, default)?)
            }
            ParamKind::Select => match &options {
                Some(options) => {
                    let labels: Vec<String> = options.iter().map(|o| o.label.clone()).collect();
                    let default = match &def.default {
                        Some(ParamValue::Text(v)) => {
                            options.iter().position(|o| &o.value == v).unwrap_or(0)
                        }
                        _ => 0,
                    };
                    let index = prompter.select(&message, &labels, default)?;
                    ParamValue::Text(options[index].value.clone())
                }
                None => ParamValue::Text(prompter.input(&message, default_text(def).as_deref())?),
            },
            ParamKind::MultiSelect => match &options {
                Some(options) => {
                    let labels: Vec<String> = options.iter().map(|o| o.label.clone()).collect();
                    let checked: Vec<bool> = match &def.default {
                        Some(ParamValue::List(defaults)) => {
                            options.iter().map(|o| defaults.contains(&o.value)).collect()
                        }
                        _ => vec![false; options.len()],
                    };
                    let indices = prompter.multi_select(&message, &labels, &checked)?;
                    ParamValue::List(indices.into_iter().map(|i| options[i].value.clone()).collect())
                }
                None => return Ok(ParamValue::List(Vec::new())),
            },
        };

        if def.required && matches!(&value, ParamValue::Text(s) if s.trim().is_empty()) {
            prompter.report_error(&format!("{} is required", def.name));
            continue;
        }
        if !def.required && value.is_zero() {
            return Ok(value);
        }
        match def.validate(&value) {
            Ok(()) => return Ok(value),
            Err(e) => prompter.report_error(&e.to_string()),
        }
    }
}
