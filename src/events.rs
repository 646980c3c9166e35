use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{AccountGroup, LoanAccount, LoanId, MemberId, ShareDecision, TransactionId};

/// all events that can be emitted by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // member events
    MemberRegistered {
        member_id: MemberId,
        name: String,
        opening_savings: Money,
        opening_shares: Money,
        timestamp: DateTime<Utc>,
    },
    MemberUpdated {
        member_id: MemberId,
        timestamp: DateTime<Utc>,
    },
    MemberDeleted {
        member_id: MemberId,
        active_loans: usize,
        timestamp: DateTime<Utc>,
    },

    // loan lifecycle events
    LoanIssued {
        loan_id: LoanId,
        member_id: MemberId,
        loan_account: LoanAccount,
        principal: Money,
        due_date: NaiveDate,
    },
    LoanMarkedOverdue {
        loan_id: LoanId,
        due_date: NaiveDate,
        remaining_principal: Money,
    },
    LoanPaidInFull {
        loan_id: LoanId,
        member_id: MemberId,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentApplied {
        transaction_id: TransactionId,
        loan_id: LoanId,
        principal_paid: Money,
        interest_paid: Money,
        remaining_principal: Money,
        timestamp: DateTime<Utc>,
    },

    // interest events
    InterestAccrued {
        loan_id: LoanId,
        base: Money,
        amount: Money,
        new_interest_due: Money,
    },
    AccrualBatchCompleted {
        group: AccountGroup,
        loans: usize,
        total: Money,
        as_of: NaiveDate,
    },

    // share and savings events
    ShareDecisionRecorded {
        transaction_id: TransactionId,
        member_id: MemberId,
        decision: ShareDecision,
        amount: Money,
        new_shares_balance: Money,
        date: NaiveDate,
    },
    SavingsDeposited {
        transaction_id: TransactionId,
        member_id: MemberId,
        amount: Money,
        new_savings_balance: Money,
        date: NaiveDate,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}
