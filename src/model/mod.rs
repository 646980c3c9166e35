//! Ledger entities and their row mappings.

pub mod loan;
pub mod member;
pub mod records;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

pub use loan::Loan;
pub use member::{Member, MemberProfile};
pub use records::{PaymentRecord, SavingsEvent, ShareEvent};

use crate::errors::{LedgerError, Result};
use crate::store::schema::{loans, members};
use crate::store::{RowHandle, StoreError, TableStore};
use crate::types::{LoanAccount, LoanId, MemberId, TransactionId};

/// a parsed record together with the row it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<T> {
    pub handle: RowHandle,
    pub record: T,
}

fn lookup_error(entity: &'static str, id: &str, e: StoreError) -> LedgerError {
    match e {
        StoreError::RowNotFound { .. } => LedgerError::not_found(entity, id),
        other => other.into(),
    }
}

impl Loan {
    /// every readable loan row
    ///
    /// Malformed rows are logged and skipped so one bad row cannot hide
    /// every other loan from a scan.
    pub fn load_all<S: TableStore + ?Sized>(store: &S) -> Result<Vec<Stored<Loan>>> {
        let rows = store.get_table(loans::TABLE)?;
        let mut loaded = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            match Loan::from_row(row) {
                Ok(record) => loaded.push(Stored {
                    handle: RowHandle { index },
                    record,
                }),
                Err(e) => warn!(row = index + 1, error = %e, "skipping malformed loan row"),
            }
        }
        Ok(loaded)
    }

    pub fn find<S: TableStore + ?Sized>(store: &S, loan_id: &str) -> Result<Stored<Loan>> {
        let found = store
            .find_row(loans::TABLE, loans::LOAN_ID, loan_id)
            .map_err(|e| lookup_error("loan", loan_id, e))?;
        Ok(Stored {
            handle: found.handle,
            record: Loan::from_row(&found.row)?,
        })
    }
}

impl Member {
    pub fn load_all<S: TableStore + ?Sized>(store: &S) -> Result<Vec<Member>> {
        store
            .get_table(members::TABLE)?
            .iter()
            .map(Member::from_row)
            .collect()
    }

    pub fn find<S: TableStore + ?Sized>(store: &S, member_id: &str) -> Result<Stored<Member>> {
        let found = store
            .find_row(members::TABLE, members::MEMBER_ID, member_id)
            .map_err(|e| lookup_error("member", member_id, e))?;
        Ok(Stored {
            handle: found.handle,
            record: Member::from_row(&found.row)?,
        })
    }
}

fn short_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

/// `M-<unix seconds>-<suffix>`
pub fn new_member_id(now: DateTime<Utc>) -> MemberId {
    format!("M-{}-{}", now.timestamp(), short_suffix())
}

/// `T-<unix seconds>-<suffix>`
pub fn new_transaction_id(now: DateTime<Utc>) -> TransactionId {
    format!("T-{}-{}", now.timestamp(), short_suffix())
}

/// `L-<member>-A<account>-<unix millis>-<suffix>`
pub fn new_loan_id(member_id: &str, account: LoanAccount, now: DateTime<Utc>) -> LoanId {
    format!(
        "L-{}-A{}-{}-{}",
        member_id,
        account.number(),
        now.timestamp_millis(),
        short_suffix()
    )
}
