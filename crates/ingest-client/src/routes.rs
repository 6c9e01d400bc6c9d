//! Route templates for the ingestion endpoints.

use std::borrow::Cow;

use crate::error::IngestError;

/// Placeholder in the table route that is replaced by the table name.
pub const TABLE_SLOT: &str = "%s";

pub const DEFAULT_BATCH_ROUTE: &str = "/setter/many";
pub const DEFAULT_TABLE_ROUTE: &str = "/setter/%s";
pub const DEFAULT_SINGLE_ROUTE: &str = "/setter";

/// The three ingestion route templates, relative to the base URL.
///
/// Instances are always fully populated: [`Routes::new`] validates
/// overrides, and [`Routes::DEFAULT`] is used when none are given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    batch: Cow<'static, str>,
    table: Cow<'static, str>,
    single: Cow<'static, str>,
}

impl Routes {
    /// `/setter/many`, `/setter/%s` and `/setter`.
    pub const DEFAULT: Routes = Routes {
        batch: Cow::Borrowed(DEFAULT_BATCH_ROUTE),
        table: Cow::Borrowed(DEFAULT_TABLE_ROUTE),
        single: Cow::Borrowed(DEFAULT_SINGLE_ROUTE),
    };

    /// Creates a custom route set.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::InvalidRoute`] if any template is empty, or if
    /// the table template does not contain exactly one `%s`.
    pub fn new(
        batch: impl Into<Cow<'static, str>>,
        table: impl Into<Cow<'static, str>>,
        single: impl Into<Cow<'static, str>>,
    ) -> Result<Self, IngestError> {
        let routes = Routes {
            batch: batch.into(),
            table: table.into(),
            single: single.into(),
        };
        routes.validate()?;
        Ok(routes)
    }

    fn validate(&self) -> Result<(), IngestError> {
        for (name, template) in [
            ("batch", &self.batch),
            ("table", &self.table),
            ("single", &self.single),
        ] {
            if template.trim().is_empty() {
                return Err(IngestError::InvalidRoute {
                    message: format!("`{name}` route must not be empty"),
                });
            }
        }
        let slots = self.table.matches(TABLE_SLOT).count();
        if slots != 1 {
            return Err(IngestError::InvalidRoute {
                message: format!(
                    "`table` route must contain exactly one `{TABLE_SLOT}` slot, found {slots} in `{}`",
                    self.table
                ),
            });
        }
        Ok(())
    }

    /// Route for batch submissions.
    pub fn batch(&self) -> &str {
        &self.batch
    }

    /// Route for single-event submissions.
    pub fn single(&self) -> &str {
        &self.single
    }

    /// The raw table route template, including its `%s` slot.
    pub fn table_template(&self) -> &str {
        &self.table
    }

    /// Route for submitting to `table_name`. The name is inserted verbatim.
    pub fn table(&self, table_name: &str) -> String {
        self.table.replacen(TABLE_SLOT, table_name, 1)
    }
}

impl Default for Routes {
    fn default() -> Self {
        Self::DEFAULT
    }
}
