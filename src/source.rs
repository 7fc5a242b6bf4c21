use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;

use crate::InspectResult;

/// One result row in text form, with columns in query order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, Option<String>)>,
}

impl Record {
    /// Creates a record from `(column, value)` pairs.
    #[must_use]
    pub fn new(fields: Vec<(String, Option<String>)>) -> Self {
        Self { fields }
    }

    /// Value of the first column named `name`. `Some(None)` is a SQL null.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_deref())
    }

    /// Value of the first column, used for single value queries.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.fields.first().and_then(|(_, v)| v.as_deref())
    }

    /// Iterates over the columns in query order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_deref()))
    }
}

impl IntoIterator for Record {
    type Item = (String, Option<String>);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// A non-fatal message collected while inspecting a layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Sent by the database while running a query, e.g. a `NOTICE` raised by a layer function.
    Notice {
        /// Severity as reported by the server
        severity: String,
        /// Message text
        message: String,
    },
    /// Found by checking the query results.
    Validation {
        /// Description of the problem
        message: String,
    },
}

impl Warning {
    /// Creates a validation warning.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl Display for Warning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::Notice { severity, message } => write!(f, "{severity}: {message}"),
            Warning::Validation { message } => write!(f, "VALIDATION: {message}"),
        }
    }
}

/// Warnings received from a data source, kept until the next [`WarningBuffer::drain`].
#[derive(Debug, Clone, Default)]
pub struct WarningBuffer {
    warnings: Arc<Mutex<Vec<Warning>>>,
}

impl WarningBuffer {
    /// Appends a warning.
    pub fn push(&self, warning: Warning) {
        // Panic if the lock is poisoned is not something the user can handle
        #[allow(clippy::unwrap_used)]
        self.warnings.lock().unwrap().push(warning);
    }

    /// Removes and returns all buffered warnings.
    #[must_use]
    pub fn drain(&self) -> Vec<Warning> {
        // Panic if the lock is poisoned is not something the user can handle
        #[allow(clippy::unwrap_used)]
        std::mem::take(&mut *self.warnings.lock().unwrap())
    }
}

/// A database able to run the generated layer queries.
#[async_trait]
pub trait DataSource {
    /// Runs a single statement and returns all rows as text.
    ///
    /// A reference to a column that does not exist must be reported as
    /// [`InspectError::ColumnNotFound`](crate::InspectError::ColumnNotFound).
    async fn query(&self, sql: &str) -> InspectResult<Vec<Record>>;

    /// Returns the warnings received since the last call.
    fn drain_warnings(&self) -> Vec<Warning>;
}
