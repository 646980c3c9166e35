use hourglass_rs::SafeTimeProvider;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::model::{new_transaction_id, Loan, Member, PaymentRecord, Stored};
use crate::payments::{AppliedPayment, OverpaymentPolicy, PaymentProposal, PaymentRequest};
use crate::store::schema::{self, loans, members, payments};
use crate::store::{CellUpdate, TableStore};
use crate::types::LoanStatus;

/// applies member payments to loan rows
///
/// A payment appends one audit record, then adds its portions onto the
/// loan's running totals. Settling the principal moves the loan to paid in
/// full with a separate single-cell write.
pub struct PaymentEngine {
    pub policy: OverpaymentPolicy,
}

impl PaymentEngine {
    pub fn new(policy: OverpaymentPolicy) -> Self {
        Self { policy }
    }

    /// amounts still owed on a loan
    pub fn propose<S: TableStore + ?Sized>(&self, store: &S, loan_id: &str) -> Result<PaymentProposal> {
        let Stored { record: loan, .. } = Loan::find(store, loan_id)?;
        Ok(PaymentProposal::from(&loan))
    }

    pub fn apply<S: TableStore + ?Sized>(
        &self,
        store: &mut S,
        request: &PaymentRequest,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<AppliedPayment> {
        request.validate()?;

        let Stored { handle, record: mut loan } = Loan::find(&*store, &request.loan_id)?;
        if loan.status == LoanStatus::PaidInFull {
            return Err(LedgerError::LoanNotActive { status: loan.status });
        }

        let principal_paid = self.principal_portion(&loan, request)?;

        let record = PaymentRecord {
            transaction_id: new_transaction_id(request.payment_date),
            timestamp: request.payment_date,
            member_id: loan.member_id.clone(),
            loan_id: loan.loan_id.clone(),
            principal_paid,
            interest_paid: request.interest_paid,
        };
        store.append_row(payments::TABLE, record.to_values())?;

        loan.amount_paid += principal_paid;
        loan.interest_paid += request.interest_paid;
        let totals = [
            CellUpdate::new(handle, loans::AMOUNT_PAID, schema::money_cell(loan.amount_paid)),
            CellUpdate::new(handle, loans::INTEREST_PAID, schema::money_cell(loan.interest_paid)),
        ];
        if let Err(e) = store.update_cells(loans::TABLE, &totals) {
            error!(
                transaction_id = %record.transaction_id,
                loan_id = %loan.loan_id,
                error = %e,
                "payment recorded but loan totals not updated"
            );
            return Err(e.into());
        }

        if loan.amount_paid >= loan.principal_amount {
            let status = Value::String(LoanStatus::PaidInFull.as_str().to_string());
            if let Err(e) = store.update_single_cell(loans::TABLE, handle, loans::STATUS, status) {
                error!(
                    transaction_id = %record.transaction_id,
                    loan_id = %loan.loan_id,
                    error = %e,
                    "loan settled but status not updated"
                );
                return Err(e.into());
            }
            loan.status = LoanStatus::PaidInFull;
        }

        touch_member(store, &loan.member_id, time_provider);

        events.emit(Event::PaymentApplied {
            transaction_id: record.transaction_id.clone(),
            loan_id: loan.loan_id.clone(),
            principal_paid,
            interest_paid: record.interest_paid,
            remaining_principal: loan.remaining_principal(),
            timestamp: record.timestamp,
        });
        if loan.status == LoanStatus::PaidInFull {
            events.emit(Event::LoanPaidInFull {
                loan_id: loan.loan_id.clone(),
                member_id: loan.member_id.clone(),
                timestamp: record.timestamp,
            });
        }
        info!(
            transaction_id = %record.transaction_id,
            loan_id = %loan.loan_id,
            principal = %principal_paid,
            interest = %record.interest_paid,
            status = %loan.status,
            "payment applied"
        );

        Ok(AppliedPayment { record, loan })
    }

    fn principal_portion(&self, loan: &Loan, request: &PaymentRequest) -> Result<Money> {
        let remaining = loan.remaining_principal();
        if request.principal_paid <= remaining {
            return Ok(request.principal_paid);
        }
        match self.policy {
            OverpaymentPolicy::Reject => Err(LedgerError::Overpayment {
                remaining,
                requested: request.principal_paid,
            }),
            OverpaymentPolicy::Clamp => {
                warn!(loan_id = %loan.loan_id, requested = %request.principal_paid, %remaining, "principal clamped to remaining balance");
                Ok(remaining)
            }
            OverpaymentPolicy::Allow => Ok(request.principal_paid),
        }
    }
}

/// bump the owner's last-updated stamp; failure here does not undo the payment
fn touch_member<S: TableStore + ?Sized>(store: &mut S, member_id: &str, time_provider: &SafeTimeProvider) {
    let result = Member::find(&*store, member_id).and_then(|found| {
        store
            .update_single_cell(
                members::TABLE,
                found.handle,
                members::LAST_UPDATED,
                schema::timestamp_cell(time_provider.now()),
            )
            .map_err(LedgerError::from)
    });
    if let Err(e) = result {
        warn!(member_id, error = %e, "could not touch member after payment");
    }
}
