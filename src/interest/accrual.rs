use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::interest::{AccrualReport, LoanAccrual};
use crate::model::loan::{read_loan_account, Loan};
use crate::store::schema::{self, loans};
use crate::store::{CellUpdate, RowHandle, TableStore};
use crate::types::AccountGroup;

/// engine for posting flat period interest onto loan rows
///
/// Interest is `remaining_principal * rate`, added to the loan's
/// cumulative interest due. It never compounds and performs no date
/// gating; callers decide when a period is due.
pub struct AccrualEngine {
    pub rate: Rate,
}

impl AccrualEngine {
    pub fn new(rate: Rate) -> Self {
        Self { rate }
    }

    /// accrue one period of interest on every active loan in `group`
    ///
    /// Every in-group row is parsed before anything is written, then all
    /// changes go out in a single batch. One malformed row fails the run
    /// with the table untouched. Rows whose account cell cannot be read
    /// belong to no group and are skipped.
    pub fn accrue<S: TableStore + ?Sized>(
        &self,
        store: &mut S,
        group: &AccountGroup,
        as_of: NaiveDate,
        events: &mut EventStore,
    ) -> Result<AccrualReport> {
        let rows = store.get_table(loans::TABLE)?;

        let mut in_group = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            let account = match read_loan_account(row) {
                Ok(account) => account,
                Err(e) => {
                    warn!(row = index + 1, error = %e, "loan row has no readable account, skipped");
                    continue;
                }
            };
            if !group.contains(account) {
                continue;
            }
            let loan = Loan::from_row(row).map_err(|e| {
                LedgerError::validation(format!("loan row {} in {}: {}", index + 1, group, e))
            })?;
            in_group.push((RowHandle { index }, loan));
        }

        let mut accruals = Vec::new();
        let mut updates = Vec::new();
        for (handle, loan) in in_group.iter().filter(|(_, l)| l.is_active()) {
            let base = loan.remaining_principal();
            let interest = base.interest_at(self.rate);
            if interest.is_zero() {
                continue;
            }
            let new_interest_due = loan.interest_due + interest;
            updates.push(CellUpdate::new(
                *handle,
                loans::INTEREST_DUE,
                schema::money_cell(new_interest_due),
            ));
            accruals.push(LoanAccrual {
                loan_id: loan.loan_id.clone(),
                base,
                interest,
                new_interest_due,
            });
        }

        if !updates.is_empty() {
            store.update_cells(loans::TABLE, &updates)?;
        }

        let total: Money = accruals.iter().map(|a| a.interest).sum();
        for accrual in &accruals {
            debug!(loan_id = %accrual.loan_id, base = %accrual.base, interest = %accrual.interest, "interest accrued");
            events.emit(Event::InterestAccrued {
                loan_id: accrual.loan_id.clone(),
                base: accrual.base,
                amount: accrual.interest,
                new_interest_due: accrual.new_interest_due,
            });
        }
        events.emit(Event::AccrualBatchCompleted {
            group: group.clone(),
            loans: accruals.len(),
            total,
            as_of,
        });
        info!(group = %group, loans = accruals.len(), total = %total, %as_of, "accrual batch written");

        Ok(AccrualReport {
            group: group.clone(),
            as_of,
            loans: accruals,
            total,
        })
    }
}
