use async_trait::async_trait;

use super::param::SelectOption;
use crate::error::Result;

/// Source of choices for select and multi-select parameters.
#[async_trait]
pub trait OptionFetcher: Send + Sync {
    async fn fetch(&self) -> Result<Vec<SelectOption>>;
}

/// Fixed list of choices.
#[derive(Debug, Clone, Default)]
pub struct StaticOptions(pub Vec<SelectOption>);

impl StaticOptions {
    /// Options whose label and value are the same string.
    pub fn from_values(values: &[&str]) -> Self {
        Self(
            values
                .iter()
                .map(|v| SelectOption::new(*v, *v))
                .collect(),
        )
    }
}

#[async_trait]
impl OptionFetcher for StaticOptions {
    async fn fetch(&self) -> Result<Vec<SelectOption>> {
        Ok(self.0.clone())
    }
}
