pub mod accrual;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{AccountGroup, LoanId};

pub use accrual::AccrualEngine;

/// interest posted to one loan by an accrual run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanAccrual {
    pub loan_id: LoanId,
    /// remaining principal the rate was applied to
    pub base: Money,
    pub interest: Money,
    pub new_interest_due: Money,
}

/// outcome of one accrual batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualReport {
    pub group: AccountGroup,
    pub as_of: NaiveDate,
    pub loans: Vec<LoanAccrual>,
    pub total: Money,
}

impl AccrualReport {
    pub fn loan_count(&self) -> usize {
        self.loans.len()
    }
}

/// where an account group stands against its yearly cutoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualStatus {
    pub group: AccountGroup,
    pub due_date: NaiveDate,
    pub last_run: Option<NaiveDate>,
    pub is_due: bool,
}

/// a run is due once the cutoff has passed and the last run predates it
///
/// A missing watermark counts as never run.
pub fn accrual_due(today: NaiveDate, last_run: Option<NaiveDate>, due: NaiveDate) -> bool {
    today >= due && last_run.map_or(true, |last| last < due)
}
