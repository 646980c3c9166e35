use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use tracing::info;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::model::{new_transaction_id, Member, SavingsEvent, Stored};
use crate::store::schema::{self, members, savings};
use crate::store::{CellUpdate, TableStore};

/// record a savings deposit and raise the member's balance
pub fn deposit_savings<S: TableStore + ?Sized>(
    store: &mut S,
    member_id: &str,
    amount: Money,
    as_of: NaiveDate,
    time_provider: &SafeTimeProvider,
    events: &mut EventStore,
) -> Result<SavingsEvent> {
    if !amount.is_positive() {
        return Err(LedgerError::InvalidAmount { amount });
    }

    let Stored { handle, record: member } = Member::find(&*store, member_id)?;

    let now = time_provider.now();
    let event = SavingsEvent {
        transaction_id: new_transaction_id(now),
        timestamp: now,
        member_id: member.member_id.clone(),
        amount,
    };
    store.append_row(savings::TABLE, event.to_values())?;

    let new_balance = member.savings_balance + amount;
    let updates = [
        CellUpdate::new(handle, members::SAVINGS, schema::money_cell(new_balance)),
        CellUpdate::new(handle, members::LAST_UPDATED, schema::timestamp_cell(now)),
    ];
    store.update_cells(members::TABLE, &updates)?;

    events.emit(Event::SavingsDeposited {
        transaction_id: event.transaction_id.clone(),
        member_id: member.member_id,
        amount,
        new_savings_balance: new_balance,
        date: as_of,
    });
    info!(member_id, %amount, balance = %new_balance, "savings deposited");

    Ok(event)
}
