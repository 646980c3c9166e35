/// quick start - register a member, lend, collect a payment
use coop_ledger_rs::{
    InMemoryStore, Ledger, LedgerConfig, LoanAccount, MemberProfile, Money, OpeningBalances,
    SafeTimeProvider, TimeSource,
};
use chrono::{TimeZone, Utc};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap()));
    let mut ledger = Ledger::new(InMemoryStore::with_ledger_schema(), LedgerConfig::standard(), &time)?;

    let member = ledger.register_member(
        MemberProfile {
            name: "Somchai Jaidee".to_string(),
            address_no: "12/3".to_string(),
            village: "Ban Nong".to_string(),
            sub_district: "Nai Mueang".to_string(),
            district: "Mueang".to_string(),
            province: "Khon Kaen".to_string(),
            date_of_birth: None,
        },
        OpeningBalances {
            savings: Money::from_major(1_000),
            shares: Money::from_major(100),
        },
    )?;

    // a 10,000 loan on account 4
    let loan = ledger.issue_loan(&member.member_id, LoanAccount::Four, Money::from_major(10_000), ledger.today())?;
    println!("loan {} due {}", loan.loan_id, loan.due_date);

    // pay off in full
    let record = ledger.apply_payment(&loan.loan_id, Money::from_major(10_000), Money::ZERO)?;
    println!("{}", ledger.payment_receipt(&record)?.to_json_pretty()?);

    println!("{}", ledger.member_statement(&member.member_id)?.to_json_pretty()?);

    Ok(())
}
