//! Member administration.

use hourglass_rs::SafeTimeProvider;
use serde_json::Value;
use tracing::{info, warn};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::model::{new_member_id, Loan, Member, MemberProfile, Stored};
use crate::store::schema::{self, members};
use crate::store::{CellUpdate, TableStore};

/// opening balances captured at registration
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OpeningBalances {
    pub savings: Money,
    pub shares: Money,
}

/// create a member row with a fresh id
///
/// Opening shares must be whole multiples of `share_unit`.
pub fn register_member<S: TableStore + ?Sized>(
    store: &mut S,
    profile: MemberProfile,
    opening: OpeningBalances,
    share_unit: Money,
    time_provider: &SafeTimeProvider,
    events: &mut EventStore,
) -> Result<Member> {
    profile.validate()?;
    for amount in [opening.savings, opening.shares] {
        if amount.is_negative() {
            return Err(LedgerError::InvalidAmount { amount });
        }
    }
    if !opening.shares.is_multiple_of(share_unit) {
        return Err(LedgerError::validation(format!(
            "opening shares {} must be a multiple of {}",
            opening.shares, share_unit
        )));
    }

    let now = time_provider.now();
    let member = Member {
        member_id: new_member_id(now),
        profile,
        savings_balance: opening.savings,
        shares_balance: opening.shares,
        last_share_purchase_date: None,
        last_updated: now,
    };
    store.append_row(members::TABLE, member.to_values())?;

    events.emit(Event::MemberRegistered {
        member_id: member.member_id.clone(),
        name: member.profile.name.clone(),
        opening_savings: opening.savings,
        opening_shares: opening.shares,
        timestamp: now,
    });
    info!(member_id = %member.member_id, name = %member.profile.name, "member registered");

    Ok(member)
}

/// rewrite name, address and date of birth
pub fn update_member_profile<S: TableStore + ?Sized>(
    store: &mut S,
    member_id: &str,
    profile: MemberProfile,
    time_provider: &SafeTimeProvider,
    events: &mut EventStore,
) -> Result<Member> {
    profile.validate()?;
    let Stored { handle, record: mut member } = Member::find(&*store, member_id)?;

    let now = time_provider.now();
    let text = |s: &str| Value::String(s.to_string());
    let updates = [
        CellUpdate::new(handle, members::NAME, text(&profile.name)),
        CellUpdate::new(handle, members::ADDRESS_NO, text(&profile.address_no)),
        CellUpdate::new(handle, members::VILLAGE, text(&profile.village)),
        CellUpdate::new(handle, members::SUB_DISTRICT, text(&profile.sub_district)),
        CellUpdate::new(handle, members::DISTRICT, text(&profile.district)),
        CellUpdate::new(handle, members::PROVINCE, text(&profile.province)),
        CellUpdate::new(handle, members::DOB, schema::opt_date_cell(profile.date_of_birth)),
        CellUpdate::new(handle, members::LAST_UPDATED, schema::timestamp_cell(now)),
    ];
    store.update_cells(members::TABLE, &updates)?;

    member.profile = profile;
    member.last_updated = now;
    events.emit(Event::MemberUpdated {
        member_id: member.member_id.clone(),
        timestamp: now,
    });
    info!(member_id, "member profile updated");

    Ok(member)
}

/// remove a member row for good
///
/// Loans are left in place; deleting a member who still owes is logged.
pub fn delete_member<S: TableStore + ?Sized>(
    store: &mut S,
    member_id: &str,
    time_provider: &SafeTimeProvider,
    events: &mut EventStore,
) -> Result<()> {
    let Stored { handle, .. } = Member::find(&*store, member_id)?;
    let active_loans = active_loans_for(&*store, member_id)?.len();
    if active_loans > 0 {
        warn!(member_id, active_loans, "deleting member with active loans");
    }

    store.delete_row(members::TABLE, handle)?;

    events.emit(Event::MemberDeleted {
        member_id: member_id.to_string(),
        active_loans,
        timestamp: time_provider.now(),
    });
    info!(member_id, "member deleted");
    Ok(())
}

pub fn member<S: TableStore + ?Sized>(store: &S, member_id: &str) -> Result<Member> {
    Ok(Member::find(store, member_id)?.record)
}

pub fn members<S: TableStore + ?Sized>(store: &S) -> Result<Vec<Member>> {
    Member::load_all(store)
}

/// every loan held by a member, in issue order
pub fn loans_for<S: TableStore + ?Sized>(store: &S, member_id: &str) -> Result<Vec<Loan>> {
    Ok(Loan::load_all(store)?
        .into_iter()
        .map(|stored| stored.record)
        .filter(|loan| loan.member_id == member_id)
        .collect())
}

/// open loans with principal remaining
pub fn active_loans_for<S: TableStore + ?Sized>(store: &S, member_id: &str) -> Result<Vec<Loan>> {
    Ok(loans_for(store, member_id)?
        .into_iter()
        .filter(Loan::is_active)
        .collect())
}
