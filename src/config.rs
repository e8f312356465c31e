//! Runtime configuration.
//!
//! Resolved once at process startup from command-line arguments and
//! environment variables, then handed to the pieces that need it.

use crate::error::{DispatchError, Result};
use std::path::{Path, PathBuf};

pub const DEFAULT_OPERATOR: &str = "dispatcher";
pub const DEFAULT_LOG_FILTER: &str = "emsdispatch=info";

#[derive(Clone, Debug)]
pub struct DispatchConfig {
    db_path: Option<PathBuf>,
    operator: String,
    log_filter: String,
}

impl DispatchConfig {
    pub fn new(db_path: Option<PathBuf>, operator: String, log_filter: String) -> Result<Self> {
        let operator = operator.trim().to_string();
        if operator.is_empty() {
            return Err(DispatchError::ValidationError(
                "operator cannot be empty".into(),
            ));
        }

        Ok(Self {
            db_path,
            operator,
            log_filter,
        })
    }

    /// Directory of the persistent store, if one was requested.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Name recorded as `updated_by` on everything this process writes.
    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }
}
