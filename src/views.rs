/// serializable views for statements and receipts
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::model::{Loan, Member, PaymentRecord};
use crate::types::{LoanAccount, LoanId, LoanStatus, MemberId, TransactionId};

/// a member's balances and loans at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberStatement {
    pub member_id: MemberId,
    pub name: String,
    pub address: String,
    pub savings_balance: Money,
    pub shares_balance: Money,
    pub last_share_purchase_date: Option<NaiveDate>,
    pub loans: Vec<LoanLine>,
    pub totals: StatementTotals,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanLine {
    pub loan_id: LoanId,
    pub loan_account: LoanAccount,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: LoanStatus,
    pub principal_amount: Money,
    pub amount_paid: Money,
    pub remaining_principal: Money,
    pub interest_due: Money,
    pub interest_paid: Money,
    pub interest_outstanding: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementTotals {
    pub active_loans: usize,
    pub principal_outstanding: Money,
    pub interest_outstanding: Money,
    pub total_outstanding: Money,
}

impl MemberStatement {
    pub fn build(member: &Member, loans: &[Loan], generated_at: DateTime<Utc>) -> Self {
        let lines: Vec<LoanLine> = loans.iter().map(LoanLine::from).collect();
        let principal_outstanding: Money = loans.iter().map(Loan::remaining_principal).sum();
        let interest_outstanding: Money = loans.iter().map(Loan::interest_outstanding).sum();

        let profile = &member.profile;
        let address = [
            profile.address_no.as_str(),
            profile.village.as_str(),
            profile.sub_district.as_str(),
            profile.district.as_str(),
            profile.province.as_str(),
        ]
        .iter()
        .filter(|part| !part.trim().is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ");

        MemberStatement {
            member_id: member.member_id.clone(),
            name: profile.name.clone(),
            address,
            savings_balance: member.savings_balance,
            shares_balance: member.shares_balance,
            last_share_purchase_date: member.last_share_purchase_date,
            loans: lines,
            totals: StatementTotals {
                active_loans: loans.iter().filter(|l| l.is_active()).count(),
                principal_outstanding,
                interest_outstanding,
                total_outstanding: principal_outstanding + interest_outstanding,
            },
            generated_at,
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl From<&Loan> for LoanLine {
    fn from(loan: &Loan) -> Self {
        LoanLine {
            loan_id: loan.loan_id.clone(),
            loan_account: loan.loan_account,
            issue_date: loan.issue_date,
            due_date: loan.due_date,
            status: loan.status,
            principal_amount: loan.principal_amount,
            amount_paid: loan.amount_paid,
            remaining_principal: loan.remaining_principal(),
            interest_due: loan.interest_due,
            interest_paid: loan.interest_paid,
            interest_outstanding: loan.interest_outstanding(),
        }
    }
}

/// receipt for one payment, with the loan balances after it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub transaction_id: TransactionId,
    pub timestamp: DateTime<Utc>,
    pub member_id: MemberId,
    pub member_name: String,
    pub loan_id: LoanId,
    pub loan_account: LoanAccount,
    pub principal_paid: Money,
    pub interest_paid: Money,
    pub total_paid: Money,
    pub remaining_principal: Money,
    pub interest_outstanding: Money,
    pub status: LoanStatus,
}

impl PaymentReceipt {
    pub fn build(record: &PaymentRecord, loan: &Loan, member_name: &str) -> Self {
        PaymentReceipt {
            transaction_id: record.transaction_id.clone(),
            timestamp: record.timestamp,
            member_id: record.member_id.clone(),
            member_name: member_name.to_string(),
            loan_id: record.loan_id.clone(),
            loan_account: loan.loan_account,
            principal_paid: record.principal_paid,
            interest_paid: record.interest_paid,
            total_paid: record.total(),
            remaining_principal: loan.remaining_principal(),
            interest_outstanding: loan.interest_outstanding(),
            status: loan.status,
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
