//! Table layout of the ledger and typed cell access.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::store::{cell_text, Row};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub mod members {
    pub const TABLE: &str = "Members";
    pub const MEMBER_ID: &str = "MemberID";
    pub const NAME: &str = "Name";
    pub const ADDRESS_NO: &str = "AddressNo";
    pub const VILLAGE: &str = "Village";
    pub const SUB_DISTRICT: &str = "SubDistrict";
    pub const DISTRICT: &str = "District";
    pub const PROVINCE: &str = "Province";
    pub const DOB: &str = "DOB";
    pub const SAVINGS: &str = "Savings";
    pub const SHARES: &str = "Shares";
    pub const LAST_SHARE_PURCHASE: &str = "LastSharePurchaseDate";
    pub const LAST_UPDATED: &str = "LastUpdated";

    pub const HEADERS: &[&str] = &[
        MEMBER_ID,
        NAME,
        ADDRESS_NO,
        VILLAGE,
        SUB_DISTRICT,
        DISTRICT,
        PROVINCE,
        DOB,
        SAVINGS,
        SHARES,
        LAST_SHARE_PURCHASE,
        LAST_UPDATED,
    ];
}

pub mod loans {
    pub const TABLE: &str = "Loans";
    pub const LOAN_ID: &str = "LoanID";
    pub const MEMBER_ID: &str = "MemberID";
    pub const LOAN_ACCOUNT: &str = "LoanAccount";
    pub const ISSUE_DATE: &str = "IssueDate";
    pub const DUE_DATE: &str = "DueDate";
    pub const PRINCIPAL_AMOUNT: &str = "PrincipalAmount";
    pub const AMOUNT_PAID: &str = "AmountPaid";
    pub const INTEREST_DUE: &str = "InterestDue";
    pub const INTEREST_PAID: &str = "InterestPaid";
    pub const STATUS: &str = "Status";
    pub const DATA_ENTRY_DATE: &str = "DataEntryDate";

    pub const HEADERS: &[&str] = &[
        LOAN_ID,
        MEMBER_ID,
        LOAN_ACCOUNT,
        ISSUE_DATE,
        DUE_DATE,
        PRINCIPAL_AMOUNT,
        AMOUNT_PAID,
        INTEREST_DUE,
        INTEREST_PAID,
        STATUS,
        DATA_ENTRY_DATE,
    ];
}

pub mod payments {
    pub const TABLE: &str = "PaymentHistory";
    pub const TRANSACTION_ID: &str = "TransactionID";
    pub const TIMESTAMP: &str = "Timestamp";
    pub const MEMBER_ID: &str = "MemberID";
    pub const LOAN_ID: &str = "LoanID";
    pub const PRINCIPAL_PAID: &str = "PrincipalPaid";
    pub const INTEREST_PAID: &str = "InterestPaid";

    pub const HEADERS: &[&str] = &[
        TRANSACTION_ID,
        TIMESTAMP,
        MEMBER_ID,
        LOAN_ID,
        PRINCIPAL_PAID,
        INTEREST_PAID,
    ];
}

pub mod shares {
    pub const TABLE: &str = "ShareHistory";
    pub const TRANSACTION_ID: &str = "TransactionID";
    pub const TIMESTAMP: &str = "Timestamp";
    pub const MEMBER_ID: &str = "MemberID";
    pub const AMOUNT: &str = "Amount";
    pub const DECISION: &str = "Decision";

    pub const HEADERS: &[&str] = &[TRANSACTION_ID, TIMESTAMP, MEMBER_ID, AMOUNT, DECISION];
}

pub mod savings {
    pub const TABLE: &str = "SavingsHistory";
    pub const TRANSACTION_ID: &str = "TransactionID";
    pub const TIMESTAMP: &str = "Timestamp";
    pub const MEMBER_ID: &str = "MemberID";
    pub const AMOUNT: &str = "Amount";

    pub const HEADERS: &[&str] = &[TRANSACTION_ID, TIMESTAMP, MEMBER_ID, AMOUNT];
}

/// every ledger table with its header row
pub const TABLES: &[(&str, &[&str])] = &[
    (members::TABLE, members::HEADERS),
    (loans::TABLE, loans::HEADERS),
    (payments::TABLE, payments::HEADERS),
    (shares::TABLE, shares::HEADERS),
    (savings::TABLE, savings::HEADERS),
];

pub fn money_cell(m: Money) -> Value {
    Value::String(m.to_string())
}

pub fn date_cell(d: NaiveDate) -> Value {
    Value::String(d.format(DATE_FORMAT).to_string())
}

pub fn timestamp_cell(t: DateTime<Utc>) -> Value {
    Value::String(t.format(TIMESTAMP_FORMAT).to_string())
}

pub fn opt_date_cell(d: Option<NaiveDate>) -> Value {
    d.map(date_cell).unwrap_or(Value::String(String::new()))
}

fn present<'r>(row: &'r Row, column: &str) -> Option<&'r Value> {
    match row.get(column) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(v) => Some(v),
    }
}

fn missing(column: &str) -> LedgerError {
    LedgerError::validation(format!("missing required column {column}"))
}

pub fn read_text(row: &Row, column: &str) -> Result<String> {
    present(row, column)
        .map(cell_text)
        .ok_or_else(|| missing(column))
}

/// text cell, empty string when absent
pub fn read_text_or_empty(row: &Row, column: &str) -> String {
    row.get(column).map(cell_text).unwrap_or_default()
}

pub fn read_money(row: &Row, column: &str) -> Result<Money> {
    let value = present(row, column).ok_or_else(|| missing(column))?;
    parse_money(value).ok_or_else(|| {
        LedgerError::validation(format!("malformed amount in {column}: {}", cell_text(value)))
    })
}

/// money cell where a blank reads as zero, as spreadsheets leave running totals empty
pub fn read_money_or_zero(row: &Row, column: &str) -> Result<Money> {
    if !row.contains_key(column) {
        return Err(missing(column));
    }
    match present(row, column) {
        None => Ok(Money::ZERO),
        Some(_) => read_money(row, column),
    }
}

fn parse_money(value: &Value) -> Option<Money> {
    match value {
        Value::String(s) => Money::from_str_exact(&s.replace(',', "")).ok(),
        Value::Number(n) => Money::from_str_exact(&n.to_string()).ok(),
        _ => None,
    }
}

pub fn read_date(row: &Row, column: &str) -> Result<NaiveDate> {
    let text = read_text(row, column)?;
    parse_date(&text)
        .ok_or_else(|| LedgerError::validation(format!("malformed date in {column}: {text}")))
}

pub fn read_opt_date(row: &Row, column: &str) -> Result<Option<NaiveDate>> {
    match present(row, column) {
        None => Ok(None),
        Some(_) => read_date(row, column).map(Some),
    }
}

pub fn read_timestamp(row: &Row, column: &str) -> Result<DateTime<Utc>> {
    let text = read_text(row, column)?;
    NaiveDateTime::parse_from_str(text.trim(), TIMESTAMP_FORMAT)
        .ok()
        .or_else(|| parse_date(&text).map(|d| d.and_time(NaiveTime::MIN)))
        .map(|t| t.and_utc())
        .ok_or_else(|| LedgerError::validation(format!("malformed timestamp in {column}: {text}")))
}

/// dates are written `YYYY-MM-DD`; a timestamp cell also reads as its date
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT)
                .ok()
                .map(|t| t.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_money_reads_strings_and_numbers() {
        let r = row(&[("A", json!("1,250.50")), ("B", json!(1000)), ("C", json!(12.5))]);

        assert_eq!(read_money(&r, "A").unwrap(), Money::from_str_exact("1250.50").unwrap());
        assert_eq!(read_money(&r, "B").unwrap(), Money::from_major(1000));
        assert_eq!(read_money(&r, "C").unwrap(), Money::from_str_exact("12.5").unwrap());
    }

    #[test]
    fn test_blank_running_total_reads_zero() {
        let r = row(&[("Paid", json!("")), ("Principal", json!(""))]);

        assert_eq!(read_money_or_zero(&r, "Paid").unwrap(), Money::ZERO);
        assert!(read_money(&r, "Principal").is_err());
        // a column that is not there at all is a schema problem, not a blank
        assert!(read_money_or_zero(&r, "Other").is_err());
    }

    #[test]
    fn test_malformed_cells_are_validation_failures() {
        let r = row(&[("Amount", json!("lots")), ("Due", json!("05/07/2024"))]);

        assert!(matches!(read_money(&r, "Amount"), Err(LedgerError::Validation { .. })));
        assert!(matches!(read_date(&r, "Due"), Err(LedgerError::Validation { .. })));
    }

    #[test]
    fn test_dates_and_timestamps() {
        let r = row(&[
            ("D", json!("2024-07-05")),
            ("T", json!("2024-07-05 13:45:00")),
            ("E", json!("")),
        ]);

        let d = NaiveDate::from_ymd_opt(2024, 7, 5).unwrap();
        assert_eq!(read_date(&r, "D").unwrap(), d);
        assert_eq!(read_date(&r, "T").unwrap(), d);
        assert_eq!(read_opt_date(&r, "E").unwrap(), None);
        assert_eq!(read_timestamp(&r, "T").unwrap().date_naive(), d);
        assert_eq!(read_timestamp(&r, "D").unwrap().date_naive(), d);
    }
}
