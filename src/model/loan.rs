use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::store::schema::{self, loans as col};
use crate::store::Row;
use crate::types::{LoanAccount, LoanId, LoanStatus, MemberId};

/// loan contract
///
/// `principal_amount` is fixed at issuance. `amount_paid`, `interest_due`
/// and `interest_paid` are running totals that only ever grow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub loan_id: LoanId,
    pub member_id: MemberId,
    pub loan_account: LoanAccount,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub principal_amount: Money,
    pub amount_paid: Money,
    /// cumulative interest posted by accrual runs
    pub interest_due: Money,
    pub interest_paid: Money,
    pub status: LoanStatus,
    pub data_entry_date: DateTime<Utc>,
}

impl Loan {
    /// principal still owed
    pub fn remaining_principal(&self) -> Money {
        self.principal_amount.saturating_sub(self.amount_paid)
    }

    /// posted interest not yet paid
    pub fn interest_outstanding(&self) -> Money {
        self.interest_due.saturating_sub(self.interest_paid)
    }

    /// open status with principal remaining
    pub fn is_active(&self) -> bool {
        self.status.is_open() && self.remaining_principal().is_positive()
    }

    /// outstanding and past its due date on `as_of`
    pub fn is_overdue_on(&self, as_of: NaiveDate) -> bool {
        self.status == LoanStatus::Outstanding && self.due_date <= as_of
    }

    pub fn from_row(row: &Row) -> Result<Self> {
        let loan_account = read_loan_account(row)?;

        let status_text = schema::read_text(row, col::STATUS)?;
        let status = LoanStatus::parse(&status_text).ok_or_else(|| {
            LedgerError::validation(format!("unknown loan status {status_text}"))
        })?;

        Ok(Self {
            loan_id: schema::read_text(row, col::LOAN_ID)?,
            member_id: schema::read_text(row, col::MEMBER_ID)?,
            loan_account,
            issue_date: schema::read_date(row, col::ISSUE_DATE)?,
            due_date: schema::read_date(row, col::DUE_DATE)?,
            principal_amount: schema::read_money(row, col::PRINCIPAL_AMOUNT)?,
            amount_paid: schema::read_money_or_zero(row, col::AMOUNT_PAID)?,
            interest_due: schema::read_money_or_zero(row, col::INTEREST_DUE)?,
            interest_paid: schema::read_money_or_zero(row, col::INTEREST_PAID)?,
            status,
            data_entry_date: schema::read_timestamp(row, col::DATA_ENTRY_DATE)?,
        })
    }

    /// cells in header order
    pub fn to_values(&self) -> Vec<Value> {
        vec![
            Value::String(self.loan_id.clone()),
            Value::String(self.member_id.clone()),
            Value::String(self.loan_account.to_string()),
            schema::date_cell(self.issue_date),
            schema::date_cell(self.due_date),
            schema::money_cell(self.principal_amount),
            schema::money_cell(self.amount_paid),
            schema::money_cell(self.interest_due),
            schema::money_cell(self.interest_paid),
            Value::String(self.status.as_str().to_string()),
            schema::timestamp_cell(self.data_entry_date),
        ]
    }
}

/// account discriminant of a loan row; accepts `4` as text or number
pub fn read_loan_account(row: &Row) -> Result<LoanAccount> {
    let text = schema::read_text(row, col::LOAN_ACCOUNT)?;
    text.trim()
        .parse::<u8>()
        .ok()
        .and_then(LoanAccount::from_number)
        .ok_or_else(|| LedgerError::validation(format!("unknown loan account {text}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn loan() -> Loan {
        Loan {
            loan_id: "L-1".to_string(),
            member_id: "M-1".to_string(),
            loan_account: LoanAccount::Four,
            issue_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 7, 5).unwrap(),
            principal_amount: Money::from_major(10_000),
            amount_paid: Money::from_major(2_500),
            interest_due: Money::from_major(600),
            interest_paid: Money::from_major(100),
            status: LoanStatus::Outstanding,
            data_entry_date: Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap(),
        }
    }

    fn as_row(loan: &Loan) -> Row {
        schema::loans::HEADERS
            .iter()
            .map(|h| h.to_string())
            .zip(loan.to_values())
            .collect()
    }

    #[test]
    fn test_balances() {
        let l = loan();
        assert_eq!(l.remaining_principal(), Money::from_major(7_500));
        assert_eq!(l.interest_outstanding(), Money::from_major(500));
        assert!(l.is_active());
    }

    #[test]
    fn test_activity_rules() {
        let mut l = loan();
        l.status = LoanStatus::Overdue;
        assert!(l.is_active());

        l.amount_paid = l.principal_amount;
        assert!(!l.is_active());

        let mut settled = loan();
        settled.status = LoanStatus::PaidInFull;
        assert!(!settled.is_active());
    }

    #[test]
    fn test_overdue_only_from_outstanding() {
        let mut l = loan();
        let after_due = NaiveDate::from_ymd_opt(2024, 7, 5).unwrap();
        let before_due = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();

        assert!(l.is_overdue_on(after_due));
        assert!(!l.is_overdue_on(before_due));

        l.status = LoanStatus::Overdue;
        assert!(!l.is_overdue_on(after_due));
    }

    #[test]
    fn test_row_mapping() {
        let l = loan();
        assert_eq!(Loan::from_row(&as_row(&l)).unwrap(), l);
    }

    #[test]
    fn test_spreadsheet_shaped_row() {
        let mut row = as_row(&loan());
        row.insert(col::LOAN_ACCOUNT.to_string(), json!(4));
        row.insert(col::PRINCIPAL_AMOUNT.to_string(), json!(10000));
        row.insert(col::AMOUNT_PAID.to_string(), json!(""));
        row.insert(col::STATUS.to_string(), json!("Active"));

        let l = Loan::from_row(&row).unwrap();
        assert_eq!(l.loan_account, LoanAccount::Four);
        assert_eq!(l.amount_paid, Money::ZERO);
        assert_eq!(l.status, LoanStatus::Outstanding);
    }

    #[test]
    fn test_missing_principal_is_validation_failure() {
        let mut row = as_row(&loan());
        row.remove(col::PRINCIPAL_AMOUNT);

        assert!(matches!(Loan::from_row(&row), Err(LedgerError::Validation { .. })));
    }
}
