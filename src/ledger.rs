use chrono::{Datelike, NaiveDate};
use hourglass_rs::SafeTimeProvider;
use tracing::{info, warn};

use crate::config::LedgerConfig;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::interest::{accrual_due, AccrualEngine, AccrualReport, AccrualStatus};
use crate::members::{self, OpeningBalances};
use crate::model::{Loan, Member, MemberProfile, PaymentRecord, SavingsEvent, ShareEvent};
use crate::origination::{self, LoanApplication};
use crate::overdue::{self, OverdueReport};
use crate::payments::{PaymentEngine, PaymentProposal, PaymentRequest};
use crate::store::schema;
use crate::store::{CachedStore, TableStore};
use crate::transactions::{self, ShareEngine};
use crate::types::{AccountGroup, LoanAccount, LoanId, ShareDecision};
use crate::views::{MemberStatement, PaymentReceipt};

/// cooperative ledger
///
/// Owns the table store and the event log, borrows the clock, and exposes
/// every member, loan, payment, accrual and share operation.
pub struct Ledger<'t, S: TableStore> {
    store: S,
    config: LedgerConfig,
    time_provider: &'t SafeTimeProvider,
    events: EventStore,
}

impl<'t, S: TableStore> Ledger<'t, S> {
    pub fn new(store: S, config: LedgerConfig, time_provider: &'t SafeTimeProvider) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            time_provider,
            events: EventStore::new(),
        })
    }

    /// ledger reading through a ttl cache sized by the configuration
    pub fn cached(
        store: S,
        config: LedgerConfig,
        time_provider: &'t SafeTimeProvider,
    ) -> Result<Ledger<'t, CachedStore<'t, S>>> {
        let ttl = config.cache.ttl();
        Ledger::new(CachedStore::new(store, time_provider, ttl), config, time_provider)
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// current date on the ledger clock
    pub fn today(&self) -> NaiveDate {
        self.time_provider.now().date_naive()
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    /// get events
    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    // members

    pub fn register_member(&mut self, profile: MemberProfile, opening: OpeningBalances) -> Result<Member> {
        members::register_member(
            &mut self.store,
            profile,
            opening,
            self.config.shares.unit_price,
            self.time_provider,
            &mut self.events,
        )
    }

    pub fn update_member_profile(&mut self, member_id: &str, profile: MemberProfile) -> Result<Member> {
        members::update_member_profile(&mut self.store, member_id, profile, self.time_provider, &mut self.events)
    }

    pub fn delete_member(&mut self, member_id: &str) -> Result<()> {
        members::delete_member(&mut self.store, member_id, self.time_provider, &mut self.events)
    }

    pub fn member(&self, member_id: &str) -> Result<Member> {
        members::member(&self.store, member_id)
    }

    pub fn members(&self) -> Result<Vec<Member>> {
        members::members(&self.store)
    }

    pub fn loans_for(&self, member_id: &str) -> Result<Vec<Loan>> {
        members::loans_for(&self.store, member_id)
    }

    pub fn active_loans_for(&self, member_id: &str) -> Result<Vec<Loan>> {
        members::active_loans_for(&self.store, member_id)
    }

    pub fn member_statement(&self, member_id: &str) -> Result<MemberStatement> {
        let member = self.member(member_id)?;
        let loans = self.loans_for(member_id)?;
        Ok(MemberStatement::build(&member, &loans, self.time_provider.now()))
    }

    // loans

    pub fn issue_loan(
        &mut self,
        member_id: &str,
        account: LoanAccount,
        principal: Money,
        issue_date: NaiveDate,
    ) -> Result<Loan> {
        let application = LoanApplication::new(member_id, account, principal, issue_date);
        origination::issue_loan(
            &mut self.store,
            &self.config,
            &application,
            self.time_provider,
            &mut self.events,
        )
    }

    pub fn loan(&self, loan_id: &str) -> Result<Loan> {
        Ok(Loan::find(&self.store, loan_id)?.record)
    }

    // payments

    /// record a payment dated now on the ledger clock
    pub fn apply_payment(&mut self, loan_id: &str, principal_paid: Money, interest_paid: Money) -> Result<PaymentRecord> {
        let request = PaymentRequest::new(loan_id, principal_paid, interest_paid, self.time_provider.now());
        self.apply_payment_request(&request)
    }

    pub fn apply_payment_request(&mut self, request: &PaymentRequest) -> Result<PaymentRecord> {
        let engine = PaymentEngine::new(self.config.payments.overpayment_policy);
        let applied = engine.apply(&mut self.store, request, self.time_provider, &mut self.events)?;
        Ok(applied.record)
    }

    pub fn propose_payment(&self, loan_id: &str) -> Result<PaymentProposal> {
        PaymentEngine::new(self.config.payments.overpayment_policy).propose(&self.store, loan_id)
    }

    /// receipt for a recorded payment against the loan as it stands now
    pub fn payment_receipt(&self, record: &PaymentRecord) -> Result<PaymentReceipt> {
        let loan = self.loan(&record.loan_id)?;
        let member_name = match self.member(&record.member_id) {
            Ok(member) => member.profile.name,
            Err(LedgerError::NotFound { .. }) => String::new(),
            Err(e) => return Err(e),
        };
        Ok(PaymentReceipt::build(record, &loan, &member_name))
    }

    // interest

    /// post one period of interest for `group`, ungated
    pub fn accrue_interest(&mut self, group: &AccountGroup, as_of: NaiveDate) -> Result<AccrualReport> {
        AccrualEngine::new(self.config.interest.rate).accrue(&mut self.store, group, as_of, &mut self.events)
    }

    pub fn accrual_status(&self, group: &AccountGroup, today: NaiveDate) -> Result<AccrualStatus> {
        let period = self.config.period_for_group(group)?;
        let due_date = period.due_date(today.year())?;
        let last_run = self.last_accrual_run(group)?;
        Ok(AccrualStatus {
            group: group.clone(),
            due_date,
            last_run,
            is_due: accrual_due(today, last_run, due_date),
        })
    }

    /// accrue for `group` if this year's cutoff has passed and not been run
    ///
    /// The watermark only moves after the batch is written.
    pub fn run_accrual_if_due(&mut self, group: &AccountGroup, today: NaiveDate) -> Result<Option<AccrualReport>> {
        let status = self.accrual_status(group, today)?;
        if !status.is_due {
            info!(group = %group, due = %status.due_date, "accrual not due");
            return Ok(None);
        }

        let report = self.accrue_interest(group, today)?;
        let stamp = today.format(schema::DATE_FORMAT).to_string();
        if let Err(e) = self.store.set_config(&group.watermark_key(), &stamp) {
            warn!(group = %group, error = %e, "interest posted but watermark not saved");
            return Err(e.into());
        }
        Ok(Some(report))
    }

    /// run every configured group that is due, in configuration order
    pub fn run_due_accruals(&mut self, today: NaiveDate) -> Result<Vec<AccrualReport>> {
        let mut reports = Vec::new();
        for group in self.config.account_groups() {
            if let Some(report) = self.run_accrual_if_due(&group, today)? {
                reports.push(report);
            }
        }
        Ok(reports)
    }

    fn last_accrual_run(&self, group: &AccountGroup) -> Result<Option<NaiveDate>> {
        let key = group.watermark_key();
        match self.store.get_config(&key)? {
            None => Ok(None),
            Some(text) if text.trim().is_empty() => Ok(None),
            Some(text) => schema::parse_date(&text)
                .map(Some)
                .ok_or_else(|| LedgerError::validation(format!("malformed watermark {key}: {text}"))),
        }
    }

    // overdue

    pub fn find_overdue(&self, as_of: NaiveDate) -> Result<Vec<Loan>> {
        overdue::find_overdue(&self.store, as_of)
    }

    pub fn mark_overdue(&mut self, loan_ids: &[LoanId]) -> OverdueReport {
        overdue::mark_overdue(&mut self.store, loan_ids, &mut self.events)
    }

    pub fn reconcile_overdue(&mut self, as_of: NaiveDate) -> Result<OverdueReport> {
        overdue::reconcile_overdue(&mut self.store, as_of, &mut self.events)
    }

    // shares and savings

    pub fn purchase_or_decline_share(
        &mut self,
        member_id: &str,
        decision: ShareDecision,
        as_of: NaiveDate,
    ) -> Result<ShareEvent> {
        ShareEngine::new(self.config.shares.clone()).decide(
            &mut self.store,
            member_id,
            decision,
            as_of,
            self.time_provider,
            &mut self.events,
        )
    }

    pub fn deposit_savings(&mut self, member_id: &str, amount: Money, as_of: NaiveDate) -> Result<SavingsEvent> {
        transactions::deposit_savings(&mut self.store, member_id, amount, as_of, self.time_provider, &mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::OverpaymentPolicy;
    use crate::store::schema::loans;
    use crate::store::InMemoryStore;
    use crate::types::LoanStatus;
    use chrono::{Duration, TimeZone, Utc};
    use hourglass_rs::TimeSource;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn clock_at(y: i32, m: u32, d: u32) -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()))
    }

    fn profile(name: &str) -> MemberProfile {
        MemberProfile {
            name: name.to_string(),
            address_no: "99/1".to_string(),
            village: "Ban Nong Waeng".to_string(),
            sub_district: "Nai Mueang".to_string(),
            district: "Mueang".to_string(),
            province: "Khon Kaen".to_string(),
            date_of_birth: None,
        }
    }

    fn ledger(clock: &SafeTimeProvider) -> Ledger<'_, InMemoryStore> {
        Ledger::new(InMemoryStore::with_ledger_schema(), LedgerConfig::standard(), clock).unwrap()
    }

    fn acc4() -> AccountGroup {
        AccountGroup::new([LoanAccount::Four])
    }

    #[test]
    fn test_rejects_invalid_config() {
        let clock = clock_at(2024, 1, 2);
        let mut config = LedgerConfig::standard();
        config.cache.table_ttl_seconds = -1;

        assert!(Ledger::new(InMemoryStore::with_ledger_schema(), config, &clock).is_err());
    }

    #[test]
    fn test_full_repayment_cycle() {
        let clock = clock_at(2024, 2, 1);
        let mut ledger = ledger(&clock);
        let member = ledger.register_member(profile("Somchai"), OpeningBalances::default()).unwrap();
        let loan = ledger
            .issue_loan(&member.member_id, LoanAccount::Four, Money::from_major(10_000), ledger.today())
            .unwrap();

        clock.test_control().unwrap().advance(Duration::days(10));
        let record = ledger.apply_payment(&loan.loan_id, Money::from_major(10_000), Money::ZERO).unwrap();

        assert_eq!(record.principal_paid, Money::from_major(10_000));
        assert_eq!(ledger.loan(&loan.loan_id).unwrap().status, LoanStatus::PaidInFull);
        assert!(ledger.active_loans_for(&member.member_id).unwrap().is_empty());

        let receipt = ledger.payment_receipt(&record).unwrap();
        assert_eq!(receipt.member_name, "Somchai");
        assert_eq!(receipt.remaining_principal, Money::ZERO);

        let events = ledger.take_events();
        assert!(events.iter().any(|e| matches!(e, Event::LoanPaidInFull { .. })));
        assert!(ledger.events().is_empty());
    }

    #[test]
    fn test_accrual_gated_by_watermark() {
        let clock = clock_at(2024, 3, 1);
        let mut ledger = ledger(&clock);
        let member = ledger.register_member(profile("Somchai"), OpeningBalances::default()).unwrap();
        let loan = ledger
            .issue_loan(&member.member_id, LoanAccount::Four, Money::from_major(1_000), date(2024, 3, 1))
            .unwrap();

        // before the 5 July cutoff
        assert!(ledger.run_accrual_if_due(&acc4(), date(2024, 7, 4)).unwrap().is_none());

        let report = ledger.run_accrual_if_due(&acc4(), date(2024, 7, 5)).unwrap().unwrap();
        assert_eq!(report.total, Money::from_major(60));
        assert_eq!(
            ledger.store().get_config("LastCalc_Acc4").unwrap(),
            Some("2024-07-05".to_string())
        );

        // same period again
        assert!(ledger.run_accrual_if_due(&acc4(), date(2024, 9, 1)).unwrap().is_none());
        assert_eq!(ledger.loan(&loan.loan_id).unwrap().interest_due, Money::from_major(60));

        let next_year = ledger.accrual_status(&acc4(), date(2025, 7, 5)).unwrap();
        assert!(next_year.is_due);
        assert_eq!(next_year.last_run, Some(date(2024, 7, 5)));
    }

    #[test]
    fn test_failed_accrual_keeps_watermark() {
        let clock = clock_at(2024, 3, 1);
        let mut ledger = ledger(&clock);
        let member = ledger.register_member(profile("Somchai"), OpeningBalances::default()).unwrap();
        ledger
            .issue_loan(&member.member_id, LoanAccount::Four, Money::from_major(1_000), date(2024, 3, 1))
            .unwrap();
        ledger.store_mut().fail_batches_on(loans::TABLE);

        assert!(ledger.run_accrual_if_due(&acc4(), date(2024, 7, 10)).is_err());
        assert_eq!(ledger.store().get_config("LastCalc_Acc4").unwrap(), None);

        ledger.store_mut().clear_failures();
        assert!(ledger.run_accrual_if_due(&acc4(), date(2024, 7, 11)).unwrap().is_some());
    }

    #[test]
    fn test_due_accruals_cover_each_group() {
        let clock = clock_at(2024, 1, 20);
        let mut ledger = ledger(&clock);
        let member = ledger.register_member(profile("Somchai"), OpeningBalances::default()).unwrap();
        ledger
            .issue_loan(&member.member_id, LoanAccount::Four, Money::from_major(1_000), date(2024, 1, 20))
            .unwrap();
        ledger
            .issue_loan(&member.member_id, LoanAccount::Two, Money::from_major(2_000), date(2024, 1, 20))
            .unwrap();

        let july = ledger.run_due_accruals(date(2024, 7, 5)).unwrap();
        assert_eq!(july.len(), 1);

        let november = ledger.run_due_accruals(date(2024, 11, 5)).unwrap();
        assert_eq!(november.len(), 1);
        assert_eq!(november[0].total, Money::from_major(120));
        assert_eq!(ledger.store().get_config("LastCalc_Acc1_2").unwrap(), Some("2024-11-05".to_string()));
    }

    #[test]
    fn test_malformed_watermark_blocks_run() {
        let clock = clock_at(2024, 8, 1);
        let mut ledger = ledger(&clock);
        ledger.store_mut().set_config("LastCalc_Acc4", "last summer").unwrap();

        assert!(matches!(
            ledger.run_accrual_if_due(&acc4(), date(2024, 8, 1)),
            Err(LedgerError::Validation { .. })
        ));
    }

    #[test]
    fn test_overdue_sweep() {
        let clock = clock_at(2023, 12, 1);
        let mut ledger = ledger(&clock);
        let member = ledger.register_member(profile("Somchai"), OpeningBalances::default()).unwrap();
        let loan = ledger
            .issue_loan(&member.member_id, LoanAccount::One, Money::from_major(4_000), date(2023, 12, 1))
            .unwrap();
        assert_eq!(loan.due_date, date(2024, 11, 5));

        let report = ledger.reconcile_overdue(date(2024, 11, 6)).unwrap();
        assert_eq!(report.success_count(), 1);
        assert_eq!(ledger.loan(&loan.loan_id).unwrap().status, LoanStatus::Overdue);
        assert!(ledger.find_overdue(date(2024, 11, 6)).unwrap().is_empty());

        // an overdue loan can still be paid off
        ledger.apply_payment(&loan.loan_id, Money::from_major(4_000), Money::ZERO).unwrap();
        assert_eq!(ledger.loan(&loan.loan_id).unwrap().status, LoanStatus::PaidInFull);
        let again = ledger.mark_overdue(&[loan.loan_id.clone()]);
        assert_eq!(again.failure_count(), 1);
    }

    #[test]
    fn test_shares_and_savings_through_statement() {
        let clock = clock_at(2024, 1, 10);
        let mut ledger = ledger(&clock);
        let member = ledger
            .register_member(
                profile("Somchai"),
                OpeningBalances {
                    savings: Money::from_major(100),
                    shares: Money::from_major(100),
                },
            )
            .unwrap();
        let today = ledger.today();

        ledger.purchase_or_decline_share(&member.member_id, ShareDecision::Buy, today).unwrap();
        ledger.deposit_savings(&member.member_id, Money::from_major(400), today).unwrap();
        ledger
            .issue_loan(&member.member_id, LoanAccount::Two, Money::from_major(3_000), today)
            .unwrap();

        let statement = ledger.member_statement(&member.member_id).unwrap();
        assert_eq!(statement.shares_balance, Money::from_major(200));
        assert_eq!(statement.savings_balance, Money::from_major(500));
        assert_eq!(statement.totals.active_loans, 1);
        assert_eq!(statement.totals.principal_outstanding, Money::from_major(3_000));
        assert!(statement.to_json_pretty().is_ok());
    }

    #[test]
    fn test_configured_policy_reaches_payments() {
        let clock = clock_at(2024, 2, 1);
        let config = LedgerConfig::standard().with_overpayment_policy(OverpaymentPolicy::Clamp);
        let mut ledger = Ledger::new(InMemoryStore::with_ledger_schema(), config, &clock).unwrap();
        let member = ledger.register_member(profile("Somchai"), OpeningBalances::default()).unwrap();
        let loan = ledger
            .issue_loan(&member.member_id, LoanAccount::Four, Money::from_major(500), ledger.today())
            .unwrap();

        let record = ledger.apply_payment(&loan.loan_id, Money::from_major(800), Money::ZERO).unwrap();

        assert_eq!(record.principal_paid, Money::from_major(500));
        let proposal = ledger.propose_payment(&loan.loan_id).unwrap();
        assert_eq!(proposal.principal_remaining, Money::ZERO);
    }

    #[test]
    fn test_cached_ledger_reads_its_own_writes() {
        let clock = clock_at(2024, 2, 1);
        let mut ledger = Ledger::cached(InMemoryStore::with_ledger_schema(), LedgerConfig::standard(), &clock).unwrap();
        let member = ledger.register_member(profile("Somchai"), OpeningBalances::default()).unwrap();
        assert_eq!(ledger.members().unwrap().len(), 1);

        ledger.deposit_savings(&member.member_id, Money::from_major(50), ledger.today()).unwrap();

        assert_eq!(ledger.member(&member.member_id).unwrap().savings_balance, Money::from_major(50));
        assert!(ledger.store().is_cached(schema::members::TABLE));
    }

    #[test]
    fn test_cached_loan_reflects_each_payment() {
        let clock = clock_at(2024, 2, 1);
        let mut ledger = Ledger::cached(InMemoryStore::with_ledger_schema(), LedgerConfig::standard(), &clock).unwrap();
        let member = ledger.register_member(profile("Somchai"), OpeningBalances::default()).unwrap();
        let loan = ledger
            .issue_loan(&member.member_id, LoanAccount::Four, Money::from_major(2_000), ledger.today())
            .unwrap();

        assert_eq!(ledger.loan(&loan.loan_id).unwrap().amount_paid, Money::ZERO);
        assert!(ledger.store().is_cached(loans::TABLE));

        ledger.apply_payment(&loan.loan_id, Money::from_major(300), Money::from_major(20)).unwrap();
        let once = ledger.loan(&loan.loan_id).unwrap();
        assert_eq!(once.amount_paid, Money::from_major(300));
        assert_eq!(once.interest_paid, Money::from_major(20));

        ledger.apply_payment(&loan.loan_id, Money::from_major(450), Money::from_major(15)).unwrap();
        let twice = ledger.loan(&loan.loan_id).unwrap();
        assert_eq!(twice.amount_paid, Money::from_major(750));
        assert_eq!(twice.interest_paid, Money::from_major(35));
    }

    #[test]
    fn test_payment_lands_on_the_loan_it_names() {
        let clock = clock_at(2024, 2, 1);
        let mut ledger = ledger(&clock);
        let member = ledger.register_member(profile("Somchai"), OpeningBalances::default()).unwrap();
        let small = ledger
            .issue_loan(&member.member_id, LoanAccount::Four, Money::from_major(1_000), ledger.today())
            .unwrap();
        let large = ledger
            .issue_loan(&member.member_id, LoanAccount::Four, Money::from_major(5_000), ledger.today())
            .unwrap();

        ledger.apply_payment(&large.loan_id, Money::from_major(3_000), Money::ZERO).unwrap();

        assert_eq!(ledger.loan(&large.loan_id).unwrap().amount_paid, Money::from_major(3_000));
        assert_eq!(ledger.loan(&small.loan_id).unwrap().amount_paid, Money::ZERO);
    }
}
