use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::Money;
use crate::store::StoreError;
use crate::types::LoanStatus;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    #[error("validation failed: {message}")]
    Validation {
        message: String,
    },

    #[error("store failure: {message}")]
    Store {
        message: String,
    },

    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("overpayment: remaining principal {remaining}, requested {requested}")]
    Overpayment {
        remaining: Money,
        requested: Money,
    },

    #[error("loan not active: current status is {status}")]
    LoanNotActive {
        status: LoanStatus,
    },

    #[error("share purchase window closed: opens {opens}")]
    ShareWindowClosed {
        opens: NaiveDate,
    },

    #[error("share decision already recorded for member {member_id} in {year}")]
    ShareDecisionAlreadyRecorded {
        member_id: String,
        year: i32,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },
}

impl LedgerError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// true for failures raised by the persistence gateway
    pub fn is_store_failure(&self) -> bool {
        matches!(self, LedgerError::Store { .. })
    }
}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::TableNotFound { table } => LedgerError::not_found("table", table),
            StoreError::RowNotFound { table, id } => {
                LedgerError::not_found("row", format!("{table}/{id}"))
            }
            StoreError::ColumnNotFound { table, column } => {
                LedgerError::not_found("column", format!("{table}.{column}"))
            }
            StoreError::ConfigKeyNotFound { key } => LedgerError::not_found("config key", key),
            other => LedgerError::Store {
                message: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
