/// admin cycle - a year of accruals, overdue sweeps and share decisions
use coop_ledger_rs::{
    AccountGroup, CachedStore, InMemoryStore, Ledger, LedgerConfig, LoanAccount, MemberProfile,
    Money, OpeningBalances, SafeTimeProvider, ShareDecision, TimeSource,
};
use chrono::{Duration, TimeZone, Utc};
use tracing_subscriber::EnvFilter;

fn profile(name: &str, village: &str) -> MemberProfile {
    MemberProfile {
        name: name.to_string(),
        address_no: "1".to_string(),
        village: village.to_string(),
        sub_district: "Sila".to_string(),
        district: "Mueang".to_string(),
        province: "Khon Kaen".to_string(),
        date_of_birth: None,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 8, 8, 0, 0).unwrap()));
    let controller = time.test_control().unwrap();
    let mut ledger: Ledger<'_, CachedStore<'_, InMemoryStore>> =
        Ledger::cached(InMemoryStore::with_ledger_schema(), LedgerConfig::standard(), &time)?;
    println!("flat rate {} per period", ledger.config().interest.rate);

    let anong = ledger.register_member(profile("Anong", "Ban Sang"), OpeningBalances::default())?;
    let boonmee = ledger.register_member(profile("Boonmee", "Ban Kham"), OpeningBalances::default())?;

    // share window is open from 5 january
    let today = ledger.today();
    ledger.purchase_or_decline_share(&anong.member_id, ShareDecision::Buy, today)?;
    ledger.purchase_or_decline_share(&boonmee.member_id, ShareDecision::Decline, today)?;
    ledger.deposit_savings(&anong.member_id, Money::from_major(500), today)?;

    let short = ledger.issue_loan(&anong.member_id, LoanAccount::Four, Money::from_major(20_000), today)?;
    let long = ledger.issue_loan(&boonmee.member_id, LoanAccount::Two, Money::from_major(8_000), today)?;

    // admin opens the app every couple of months
    for _ in 0..6 {
        controller.advance(Duration::days(61));
        let today = ledger.today();
        for report in ledger.run_due_accruals(today)? {
            println!("{} accrued {} on {} loans", report.group, report.total, report.loan_count());
        }
        let sweep = ledger.reconcile_overdue(today)?;
        if sweep.success_count() > 0 {
            println!("{}: {} loans marked overdue", today, sweep.success_count());
        }
    }

    let proposal = ledger.propose_payment(&short.loan_id)?;
    ledger.apply_payment(&short.loan_id, proposal.principal_remaining, proposal.interest_outstanding)?;

    let acc12 = AccountGroup::new([LoanAccount::One, LoanAccount::Two]);
    println!("{:?}", ledger.accrual_status(&acc12, ledger.today())?);
    println!("{}", ledger.member_statement(&boonmee.member_id)?.to_json_pretty()?);
    println!("outstanding on {}: {}", long.loan_id, ledger.loan(&long.loan_id)?.remaining_principal());

    for event in ledger.take_events() {
        println!("{:?}", event);
    }

    Ok(())
}
