use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// unique identifier for a member
pub type MemberId = String;

/// unique identifier for a loan contract
pub type LoanId = String;

/// unique identifier for an audit row
pub type TransactionId = String;

/// loan account types offered by the cooperative
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LoanAccount {
    /// account 1
    One,
    /// account 2
    Two,
    /// account 4
    Four,
}

impl LoanAccount {
    pub const ALL: [LoanAccount; 3] = [LoanAccount::One, LoanAccount::Two, LoanAccount::Four];

    /// account number as printed on the books
    pub fn number(&self) -> u8 {
        match self {
            LoanAccount::One => 1,
            LoanAccount::Two => 2,
            LoanAccount::Four => 4,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(LoanAccount::One),
            2 => Some(LoanAccount::Two),
            4 => Some(LoanAccount::Four),
            _ => None,
        }
    }
}

impl fmt::Display for LoanAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// issued and not yet past its due date
    Outstanding,
    /// past due date with principal remaining
    Overdue,
    /// principal fully repaid, terminal
    PaidInFull,
}

impl LoanStatus {
    /// tag written to the status column
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Outstanding => "outstanding",
            LoanStatus::Overdue => "overdue",
            LoanStatus::PaidInFull => "paid_in_full",
        }
    }

    /// parse a status cell
    ///
    /// Also accepts the legacy sheet tags: `active` and `ยังค้างชำระ` for
    /// outstanding, `เกินกำหนดชำระ` for overdue.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "outstanding" | "active" | "ยังค้างชำระ" => Some(LoanStatus::Outstanding),
            "overdue" | "เกินกำหนดชำระ" => Some(LoanStatus::Overdue),
            "paid_in_full" | "paid-in-full" | "paid" => Some(LoanStatus::PaidInFull),
            _ => None,
        }
    }

    /// outstanding or overdue
    pub fn is_open(&self) -> bool {
        matches!(self, LoanStatus::Outstanding | LoanStatus::Overdue)
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// a member's yearly share decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShareDecision {
    Buy,
    Decline,
}

impl ShareDecision {
    /// audit tag recorded in the share history
    pub fn tag(&self) -> &'static str {
        match self {
            ShareDecision::Buy => "purchased",
            ShareDecision::Decline => "declined",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim() {
            "purchased" => Some(ShareDecision::Buy),
            "declined" => Some(ShareDecision::Decline),
            _ => None,
        }
    }
}

/// set of loan accounts that accrue interest together
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountGroup(BTreeSet<LoanAccount>);

impl AccountGroup {
    pub fn new(accounts: impl IntoIterator<Item = LoanAccount>) -> Self {
        Self(accounts.into_iter().collect())
    }

    pub fn contains(&self, account: LoanAccount) -> bool {
        self.0.contains(&account)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn accounts(&self) -> impl Iterator<Item = LoanAccount> + '_ {
        self.0.iter().copied()
    }

    /// label used in watermark keys, e.g. `Acc1_2`
    pub fn label(&self) -> String {
        let numbers: Vec<String> = self.0.iter().map(|a| a.number().to_string()).collect();
        format!("Acc{}", numbers.join("_"))
    }

    /// system config key holding the last successful accrual run
    pub fn watermark_key(&self) -> String {
        format!("LastCalc_{}", self.label())
    }
}

impl fmt::Display for AccountGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
