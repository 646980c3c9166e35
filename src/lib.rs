pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod interest;
pub mod ledger;
pub mod members;
pub mod model;
pub mod origination;
pub mod overdue;
pub mod payments;
pub mod store;
pub mod transactions;
pub mod types;
pub mod views;

// re-export key types
pub use config::{AccrualPeriod, LedgerConfig};
pub use decimal::{Money, Rate};
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore};
pub use interest::{AccrualEngine, AccrualReport, AccrualStatus};
pub use ledger::Ledger;
pub use members::OpeningBalances;
pub use model::{Loan, Member, MemberProfile, PaymentRecord, SavingsEvent, ShareEvent};
pub use origination::LoanApplication;
pub use overdue::OverdueReport;
pub use payments::{OverpaymentPolicy, PaymentEngine, PaymentProposal, PaymentRequest};
pub use store::{CachedStore, InMemoryStore, StoreError, TableStore};
pub use transactions::ShareEngine;
pub use types::{AccountGroup, LoanAccount, LoanId, LoanStatus, MemberId, ShareDecision, TransactionId};
pub use views::{MemberStatement, PaymentReceipt};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
