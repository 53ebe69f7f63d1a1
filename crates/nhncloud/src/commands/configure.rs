use anyhow::{Context as AnyhowContext, Result};
use nhncloud_core::config::{
    DEFAULT_REGION, KEY_ACCESS_KEY_ID, KEY_APP_KEY, KEY_REGION, KEY_SECRET_ACCESS_KEY,
};
use nhncloud_core::interactive::{
    DialoguerPrompter, ParamCollector, ParamDefinition, ParamKind, ParamValue, Prompter,
};
use nhncloud_core::CredentialsFile;

use super::GlobalOpts;

const FIELDS: [&str; 4] = [KEY_REGION, KEY_APP_KEY, KEY_ACCESS_KEY_ID, KEY_SECRET_ACCESS_KEY];

/// Values given as flags.
#[derive(Debug, Default)]
pub struct ConfigureInput {
    pub region: Option<String>,
    pub app_key: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl ConfigureInput {
    fn get(&self, field: &str) -> Option<&str> {
        let value = match field {
            KEY_REGION => &self.region,
            KEY_APP_KEY => &self.app_key,
            KEY_ACCESS_KEY_ID => &self.access_key_id,
            KEY_SECRET_ACCESS_KEY => &self.secret_access_key,
            _ => &None,
        };
        value.as_deref().filter(|v| !v.is_empty())
    }
}

/// File key for `field`, prefixed with the service when one is given.
fn file_key(service: Option<&str>, field: &str) -> String {
    match service {
        Some(service) => format!("{}_{}", service.trim().to_lowercase().replace('-', "_"), field),
        None => field.to_string(),
    }
}

/// Stored value the same way credential resolution finds it: the
/// service-prefixed key first, then the plain one.
fn stored<'a>(file: &'a CredentialsFile, service: Option<&str>, field: &str) -> Option<&'a str> {
    file.get(&file_key(service, field))
        .or_else(|| service.and_then(|_| file.get(field)))
}

fn definitions(file: &CredentialsFile, service: Option<&str>) -> Vec<ParamDefinition> {
    let existing = |field: &str| stored(file, service, field).map(str::to_string);

    let mut region = ParamDefinition::new(KEY_REGION, "Region", ParamKind::String).required();
    region = region.with_default(existing(KEY_REGION).unwrap_or_else(|| DEFAULT_REGION.to_string()));

    let mut app_key = ParamDefinition::new(KEY_APP_KEY, "App key", ParamKind::String).required();
    if let Some(value) = existing(KEY_APP_KEY) {
        app_key = app_key.with_default(value);
    }

    let mut access_key_id =
        ParamDefinition::new(KEY_ACCESS_KEY_ID, "Access key ID", ParamKind::String).required();
    if let Some(value) = existing(KEY_ACCESS_KEY_ID) {
        access_key_id = access_key_id.with_default(value);
    }

    let secret_access_key =
        ParamDefinition::new(KEY_SECRET_ACCESS_KEY, "Secret access key", ParamKind::Password)
            .required();

    vec![region, app_key, access_key_id, secret_access_key]
}

/// Seed flags, fill gaps from the stored file and write back what changed.
///
/// Without a terminal every gap is filled from the file. With a service,
/// the secret is also inherited since a password prompt has no default.
/// Service-prefixed keys are only written when they differ from the plain
/// entry they would otherwise inherit.
async fn collect<P: Prompter>(
    file: &mut CredentialsFile,
    service: Option<&str>,
    input: &ConfigureInput,
    mut collector: ParamCollector<P>,
) -> Result<()> {
    let inherit_all = !collector.is_interactive();
    let current: &CredentialsFile = file;
    let provided: Vec<(&str, ParamValue)> = FIELDS
        .iter()
        .map(|&field| {
            let value = input.get(field).or_else(|| {
                let inherit = inherit_all || (service.is_some() && field == KEY_SECRET_ACCESS_KEY);
                inherit.then(|| stored(current, service, field)).flatten()
            });
            let value = match value {
                None if inherit_all && field == KEY_REGION => Some(DEFAULT_REGION),
                other => other,
            };
            (field, ParamValue::from(value.unwrap_or_default()))
        })
        .collect();

    collector.set_provided_values(provided);
    collector
        .prompt_for_missing()
        .await
        .context("Credentials are incomplete")?;

    for (field, value) in collector.values() {
        let Some(text) = value.as_text() else {
            continue;
        };
        let key = file_key(service, field);
        if service.is_some() && file.get(&key).is_none() && file.get(field) == Some(text) {
            continue;
        }
        file.set(&key, text);
    }
    Ok(())
}

pub async fn run(global: &GlobalOpts, service: Option<&str>, mut input: ConfigureInput) -> Result<()> {
    let mut file = CredentialsFile::load()?;
    let service = service.filter(|s| !s.is_empty());
    if input.region.is_none() {
        input.region = global.region.clone();
    }

    let collector = ParamCollector::new(definitions(&file, service), DialoguerPrompter::new());
    collect(&mut file, service, &input, collector).await?;
    let path = file.save()?;

    tracing::info!(path = %path.display(), service = ?service, "Credentials saved");
    println!("Credentials saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nhncloud_core::interactive::{Answer, ScriptedPrompter};

    const GENERIC: &str = "app_key = base-app\naccess_key_id = AK\nsecret_access_key = SK\n";

    fn collector(
        file: &CredentialsFile,
        service: Option<&str>,
        prompter: ScriptedPrompter,
        interactive: bool,
    ) -> ParamCollector<ScriptedPrompter> {
        ParamCollector::with_interactive(definitions(file, service), prompter, interactive)
    }

    #[test]
    fn test_file_key() {
        assert_eq!(file_key(None, KEY_APP_KEY), "app_key");
        assert_eq!(file_key(Some("rds-mysql"), KEY_APP_KEY), "rds_mysql_app_key");
    }

    #[test]
    fn test_definitions_use_stored_defaults() {
        let file = CredentialsFile::parse("rds_mysql_app_key = stored\nregion = kr2\n");

        let defs = definitions(&file, Some("rds-mysql"));
        let app_key = defs.iter().find(|d| d.name == KEY_APP_KEY).unwrap();
        assert_eq!(app_key.default, Some(ParamValue::from("stored")));
        let region = defs.iter().find(|d| d.name == KEY_REGION).unwrap();
        assert_eq!(region.default, Some(ParamValue::from("kr2")));

        let defs = definitions(&file, None);
        let region = defs.iter().find(|d| d.name == KEY_REGION).unwrap();
        assert_eq!(region.default, Some(ParamValue::from("kr2")));
        assert!(defs.iter().all(|d| d.required));
    }

    #[tokio::test]
    async fn test_service_app_key_inherits_generic_access_keys() {
        let mut file = CredentialsFile::parse(GENERIC);
        let service = Some("rds-mysql");
        let input = ConfigureInput {
            app_key: Some("YYYY".to_string()),
            ..Default::default()
        };

        let collector = collector(&file, service, ScriptedPrompter::default(), false);
        collect(&mut file, service, &input, collector).await.unwrap();

        assert_eq!(file.get("rds_mysql_app_key"), Some("YYYY"));
        assert_eq!(file.get("rds_mysql_access_key_id"), None);
        assert_eq!(file.get("rds_mysql_secret_access_key"), None);
        assert_eq!(file.get("app_key"), Some("base-app"));
    }

    #[tokio::test]
    async fn test_interactive_service_setup_keeps_generic_secret() {
        let mut file = CredentialsFile::parse(GENERIC);
        let service = Some("rds-mysql");
        let input = ConfigureInput {
            app_key: Some("YYYY".to_string()),
            ..Default::default()
        };

        // region and access key id accept their defaults
        let prompter = ScriptedPrompter::new([Answer::Text(String::new()), Answer::Text(String::new())]);
        let collector = collector(&file, service, prompter, true);
        collect(&mut file, service, &input, collector).await.unwrap();

        assert_eq!(file.get("rds_mysql_app_key"), Some("YYYY"));
        assert_eq!(file.get("rds_mysql_region"), Some(DEFAULT_REGION));
        assert_eq!(file.get("rds_mysql_access_key_id"), None);
        assert_eq!(file.get("rds_mysql_secret_access_key"), None);
    }

    #[tokio::test]
    async fn test_missing_keys_are_reported() {
        let mut file = CredentialsFile::parse("");
        let input = ConfigureInput {
            app_key: Some("app".to_string()),
            ..Default::default()
        };

        let collector = collector(&file, None, ScriptedPrompter::default(), false);
        let err = collect(&mut file, None, &input, collector).await.unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("access_key_id"));
        assert!(message.contains("secret_access_key"));
        assert!(file.is_empty());
    }
}
