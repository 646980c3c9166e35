use chrono::{Datelike, NaiveDate};
use hourglass_rs::SafeTimeProvider;
use tracing::info;

use crate::config::ShareConfig;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::model::{new_transaction_id, Member, ShareEvent, Stored};
use crate::store::schema::{self, members, shares};
use crate::store::{CellUpdate, TableStore};
use crate::types::ShareDecision;

/// yearly share purchase window
pub struct ShareEngine {
    pub config: ShareConfig,
}

impl ShareEngine {
    pub fn new(config: ShareConfig) -> Self {
        Self { config }
    }

    /// record a member's buy or decline for the year of `as_of`
    ///
    /// One decision per member per calendar year, and only once the
    /// window has opened. Declining still uses up the year.
    pub fn decide<S: TableStore + ?Sized>(
        &self,
        store: &mut S,
        member_id: &str,
        decision: ShareDecision,
        as_of: NaiveDate,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<ShareEvent> {
        let opens = self.config.window_open_date(as_of.year())?;
        if as_of < opens {
            return Err(LedgerError::ShareWindowClosed { opens });
        }

        let Stored { handle, record: member } = Member::find(&*store, member_id)?;
        if !member.can_decide_shares_in(as_of.year()) {
            return Err(LedgerError::ShareDecisionAlreadyRecorded {
                member_id: member.member_id,
                year: as_of.year(),
            });
        }

        let amount = match decision {
            ShareDecision::Buy => self.config.purchase_amount(),
            ShareDecision::Decline => Money::ZERO,
        };
        let now = time_provider.now();
        let event = ShareEvent {
            transaction_id: new_transaction_id(now),
            timestamp: now,
            member_id: member.member_id.clone(),
            amount,
            decision,
        };
        store.append_row(shares::TABLE, event.to_values())?;

        let new_balance = member.shares_balance + amount;
        let updates = [
            CellUpdate::new(handle, members::SHARES, schema::money_cell(new_balance)),
            CellUpdate::new(handle, members::LAST_SHARE_PURCHASE, schema::date_cell(as_of)),
            CellUpdate::new(handle, members::LAST_UPDATED, schema::timestamp_cell(now)),
        ];
        store.update_cells(members::TABLE, &updates)?;

        events.emit(Event::ShareDecisionRecorded {
            transaction_id: event.transaction_id.clone(),
            member_id: member.member_id.clone(),
            decision,
            amount,
            new_shares_balance: new_balance,
            date: as_of,
        });
        info!(member_id, decision = decision.tag(), %amount, "share decision recorded");

        Ok(event)
    }
}
