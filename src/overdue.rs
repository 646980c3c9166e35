//! Overdue detection and status reconciliation.
//!
//! Status moves one way: outstanding to overdue here, and either of those
//! to paid in full on settlement. Every transition is its own single-cell
//! write so one bad row cannot block the rest.

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::model::{Loan, Stored};
use crate::store::schema::loans;
use crate::store::{cell_text, RowHandle, TableStore};
use crate::types::{LoanId, LoanStatus};

/// per-loan outcome of a status sweep
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverdueReport {
    pub succeeded: Vec<LoanId>,
    pub failed: Vec<(LoanId, LedgerError)>,
}

impl OverdueReport {
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }
}

/// outstanding loans whose due date is on or before `as_of`
pub fn find_overdue<S: TableStore + ?Sized>(store: &S, as_of: NaiveDate) -> Result<Vec<Loan>> {
    let overdue: Vec<Loan> = Loan::load_all(store)?
        .into_iter()
        .map(|stored| stored.record)
        .filter(|loan| loan.is_overdue_on(as_of))
        .collect();
    debug!(%as_of, count = overdue.len(), "overdue scan");
    Ok(overdue)
}

/// move each loan to overdue independently
///
/// Loans already overdue count as done without a write. Settled loans are
/// never reverted and come back as failures.
pub fn mark_overdue<S: TableStore + ?Sized>(
    store: &mut S,
    loan_ids: &[LoanId],
    events: &mut EventStore,
) -> OverdueReport {
    let mut report = OverdueReport::default();
    for loan_id in loan_ids {
        match mark_one(store, loan_id, events) {
            Ok(()) => report.succeeded.push(loan_id.clone()),
            Err(e) => {
                warn!(%loan_id, error = %e, "could not mark loan overdue");
                report.failed.push((loan_id.clone(), e));
            }
        }
    }
    info!(
        succeeded = report.success_count(),
        failed = report.failure_count(),
        "overdue marking finished"
    );
    report
}

/// find and mark in one pass
pub fn reconcile_overdue<S: TableStore + ?Sized>(
    store: &mut S,
    as_of: NaiveDate,
    events: &mut EventStore,
) -> Result<OverdueReport> {
    let ids: Vec<LoanId> = find_overdue(&*store, as_of)?
        .into_iter()
        .map(|loan| loan.loan_id)
        .collect();
    Ok(mark_overdue(store, &ids, events))
}

fn mark_one<S: TableStore + ?Sized>(store: &mut S, loan_id: &str, events: &mut EventStore) -> Result<()> {
    let Stored { record: loan, .. } = Loan::find(&*store, loan_id)?;
    match loan.status {
        LoanStatus::Overdue => {
            debug!(loan_id, "already overdue");
            Ok(())
        }
        LoanStatus::PaidInFull => Err(LedgerError::LoanNotActive { status: loan.status }),
        LoanStatus::Outstanding => {
            let handles = rows_with_id(&*store, loan_id)?;
            if handles.len() > 1 {
                warn!(loan_id, rows = handles.len(), "duplicate loan id, marking every row");
            }
            for handle in handles {
                let status = Value::String(LoanStatus::Overdue.as_str().to_string());
                store.update_single_cell(loans::TABLE, handle, loans::STATUS, status)?;
            }
            events.emit(Event::LoanMarkedOverdue {
                loan_id: loan.loan_id.clone(),
                due_date: loan.due_date,
                remaining_principal: loan.remaining_principal(),
            });
            Ok(())
        }
    }
}

fn rows_with_id<S: TableStore + ?Sized>(store: &S, loan_id: &str) -> Result<Vec<RowHandle>> {
    Ok(store
        .get_table(loans::TABLE)?
        .iter()
        .enumerate()
        .filter(|(_, row)| row.get(loans::LOAN_ID).map(cell_text).as_deref() == Some(loan_id))
        .map(|(index, _)| RowHandle { index })
        .collect())
}
