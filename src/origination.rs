use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use tracing::info;

use crate::config::LedgerConfig;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::model::{new_loan_id, Loan, Member};
use crate::store::schema::loans;
use crate::store::TableStore;
use crate::types::{LoanAccount, LoanStatus, MemberId};

/// loan terms requested for a member
#[derive(Debug, Clone, PartialEq)]
pub struct LoanApplication {
    pub member_id: MemberId,
    pub account: LoanAccount,
    pub principal: Money,
    pub issue_date: NaiveDate,
}

impl LoanApplication {
    pub fn new(member_id: impl Into<MemberId>, account: LoanAccount, principal: Money, issue_date: NaiveDate) -> Self {
        Self {
            member_id: member_id.into(),
            account,
            principal,
            issue_date,
        }
    }
}

/// write a new outstanding loan for an existing member
///
/// The due date is the account's next accrual cutoff after the issue date.
pub fn issue_loan<S: TableStore + ?Sized>(
    store: &mut S,
    config: &LedgerConfig,
    application: &LoanApplication,
    time_provider: &SafeTimeProvider,
    events: &mut EventStore,
) -> Result<Loan> {
    let member_id = application.member_id.as_str();
    let (account, principal, issue_date) = (application.account, application.principal, application.issue_date);
    if !principal.is_positive() {
        return Err(LedgerError::InvalidAmount { amount: principal });
    }
    let member = Member::find(&*store, member_id)?.record;
    let due_date = config.loan_due_date(account, issue_date)?;

    let now = time_provider.now();
    let loan = Loan {
        loan_id: new_loan_id(&member.member_id, account, now),
        member_id: member.member_id,
        loan_account: account,
        issue_date,
        due_date,
        principal_amount: principal,
        amount_paid: Money::ZERO,
        interest_due: Money::ZERO,
        interest_paid: Money::ZERO,
        status: LoanStatus::Outstanding,
        data_entry_date: now,
    };
    store.append_row(loans::TABLE, loan.to_values())?;

    events.emit(Event::LoanIssued {
        loan_id: loan.loan_id.clone(),
        member_id: loan.member_id.clone(),
        loan_account: account,
        principal,
        due_date,
    });
    info!(loan_id = %loan.loan_id, %member_id, account = %account, %principal, %due_date, "loan issued");

    Ok(loan)
}
