pub mod apply;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::model::{Loan, PaymentRecord};
use crate::types::{LoanAccount, LoanId, LoanStatus, MemberId};

pub use apply::PaymentEngine;

/// what to do when a payment exceeds the remaining principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OverpaymentPolicy {
    /// refuse the payment before anything is written
    #[default]
    Reject,
    /// cut the principal portion down to the remaining principal
    Clamp,
    /// record the full amount, leaving amount paid above principal
    Allow,
}

/// payment request
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub loan_id: LoanId,
    pub principal_paid: Money,
    pub interest_paid: Money,
    pub payment_date: DateTime<Utc>,
}

impl PaymentRequest {
    pub fn new(
        loan_id: impl Into<LoanId>,
        principal_paid: Money,
        interest_paid: Money,
        payment_date: DateTime<Utc>,
    ) -> Self {
        Self {
            loan_id: loan_id.into(),
            principal_paid,
            interest_paid,
            payment_date,
        }
    }

    pub fn total(&self) -> Money {
        self.principal_paid + self.interest_paid
    }

    /// both portions non-negative and something to pay
    pub fn validate(&self) -> Result<()> {
        for amount in [self.principal_paid, self.interest_paid] {
            if amount.is_negative() {
                return Err(LedgerError::InvalidAmount { amount });
            }
        }
        if self.total().is_zero() {
            return Err(LedgerError::InvalidAmount {
                amount: self.total(),
            });
        }
        Ok(())
    }
}

/// a payment as written, with the loan after the update
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedPayment {
    pub record: PaymentRecord,
    pub loan: Loan,
}

impl AppliedPayment {
    pub fn settled_loan(&self) -> bool {
        self.loan.status == LoanStatus::PaidInFull
    }
}

/// amounts a caller would prefill for the next payment on a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentProposal {
    pub loan_id: LoanId,
    pub member_id: MemberId,
    pub loan_account: LoanAccount,
    pub status: LoanStatus,
    pub principal_remaining: Money,
    pub interest_outstanding: Money,
}

impl PaymentProposal {
    pub fn total(&self) -> Money {
        self.principal_remaining + self.interest_outstanding
    }
}

impl From<&Loan> for PaymentProposal {
    fn from(loan: &Loan) -> Self {
        Self {
            loan_id: loan.loan_id.clone(),
            member_id: loan.member_id.clone(),
            loan_account: loan.loan_account,
            status: loan.status,
            principal_remaining: loan.remaining_principal(),
            interest_outstanding: loan.interest_outstanding(),
        }
    }
}
