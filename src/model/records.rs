//! Append-only audit rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::store::schema::{self, payments, savings, shares};
use crate::store::Row;
use crate::types::{LoanId, MemberId, ShareDecision, TransactionId};

/// one payment against a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub transaction_id: TransactionId,
    pub timestamp: DateTime<Utc>,
    pub member_id: MemberId,
    pub loan_id: LoanId,
    pub principal_paid: Money,
    pub interest_paid: Money,
}

impl PaymentRecord {
    pub fn total(&self) -> Money {
        self.principal_paid + self.interest_paid
    }

    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            transaction_id: schema::read_text(row, payments::TRANSACTION_ID)?,
            timestamp: schema::read_timestamp(row, payments::TIMESTAMP)?,
            member_id: schema::read_text(row, payments::MEMBER_ID)?,
            loan_id: schema::read_text(row, payments::LOAN_ID)?,
            principal_paid: schema::read_money_or_zero(row, payments::PRINCIPAL_PAID)?,
            interest_paid: schema::read_money_or_zero(row, payments::INTEREST_PAID)?,
        })
    }

    pub fn to_values(&self) -> Vec<Value> {
        vec![
            Value::String(self.transaction_id.clone()),
            schema::timestamp_cell(self.timestamp),
            Value::String(self.member_id.clone()),
            Value::String(self.loan_id.clone()),
            schema::money_cell(self.principal_paid),
            schema::money_cell(self.interest_paid),
        ]
    }
}

/// a yearly share purchase or decline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareEvent {
    pub transaction_id: TransactionId,
    pub timestamp: DateTime<Utc>,
    pub member_id: MemberId,
    pub amount: Money,
    pub decision: ShareDecision,
}

impl ShareEvent {
    pub fn from_row(row: &Row) -> Result<Self> {
        let tag = schema::read_text(row, shares::DECISION)?;
        let decision = ShareDecision::from_tag(&tag)
            .ok_or_else(|| LedgerError::validation(format!("unknown share decision {tag}")))?;

        Ok(Self {
            transaction_id: schema::read_text(row, shares::TRANSACTION_ID)?,
            timestamp: schema::read_timestamp(row, shares::TIMESTAMP)?,
            member_id: schema::read_text(row, shares::MEMBER_ID)?,
            amount: schema::read_money_or_zero(row, shares::AMOUNT)?,
            decision,
        })
    }

    pub fn to_values(&self) -> Vec<Value> {
        vec![
            Value::String(self.transaction_id.clone()),
            schema::timestamp_cell(self.timestamp),
            Value::String(self.member_id.clone()),
            schema::money_cell(self.amount),
            Value::String(self.decision.tag().to_string()),
        ]
    }
}

/// a savings deposit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsEvent {
    pub transaction_id: TransactionId,
    pub timestamp: DateTime<Utc>,
    pub member_id: MemberId,
    pub amount: Money,
}

impl SavingsEvent {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            transaction_id: schema::read_text(row, savings::TRANSACTION_ID)?,
            timestamp: schema::read_timestamp(row, savings::TIMESTAMP)?,
            member_id: schema::read_text(row, savings::MEMBER_ID)?,
            amount: schema::read_money(row, savings::AMOUNT)?,
        })
    }

    pub fn to_values(&self) -> Vec<Value> {
        vec![
            Value::String(self.transaction_id.clone()),
            schema::timestamp_cell(self.timestamp),
            Value::String(self.member_id.clone()),
            schema::money_cell(self.amount),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_share_event_rejects_unknown_tag() {
        let row: Row = shares::HEADERS
            .iter()
            .map(|h| h.to_string())
            .zip(vec![
                json!("T-1"),
                json!("2024-01-05 10:00:00"),
                json!("M-1"),
                json!("100.00"),
                json!("maybe"),
            ])
            .collect();

        assert!(matches!(ShareEvent::from_row(&row), Err(LedgerError::Validation { .. })));
    }

    #[test]
    fn test_payment_total() {
        let record = PaymentRecord {
            transaction_id: "T-1".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            member_id: "M-1".to_string(),
            loan_id: "L-1".to_string(),
            principal_paid: Money::from_major(1_000),
            interest_paid: Money::from_major(60),
        };
        assert_eq!(record.total(), Money::from_major(1_060));

        let row: Row = payments::HEADERS
            .iter()
            .map(|h| h.to_string())
            .zip(record.to_values())
            .collect();
        assert_eq!(PaymentRecord::from_row(&row).unwrap(), record);
    }
}
