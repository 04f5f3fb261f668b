//! Source locator: builds the download URL for a month

use crate::config::SourceConfig;
use crate::error::{IngestError, Result};
use crate::period::Period;

#[derive(Debug, Clone)]
pub struct SourceLocator {
    template: String,
}

impl SourceLocator {
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains("{year}") || !template.contains("{month}") {
            return Err(IngestError::Config(format!(
                "source URL template '{}' must contain {{year}} and {{month}}",
                template
            )));
        }
        Ok(Self { template })
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        Self::new(config.url_template.clone())
    }

    fn url_for(&self, period: &Period) -> String {
        self.template
            .replace("{year}", &period.year().to_string())
            .replace("{month}", &period.month().to_string())
    }

    /// URL of the archive for `year`/`month`. Validates first, then pure
    /// string substitution with no I/O.
    pub fn url(&self, year: i32, month: u32) -> Result<String> {
        Ok(self.url_for(&Period::new(year, month)?))
    }
}

/// Local file name for a downloaded archive, e.g. `2015_07.zip`
pub fn archive_file_name(period: &Period) -> String {
    format!("{:04}_{:02}.zip", period.year(), period.month())
}
