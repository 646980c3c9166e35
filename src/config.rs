use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::payments::OverpaymentPolicy;
use crate::types::{AccountGroup, LoanAccount};

/// ledger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub interest: InterestConfig,
    pub shares: ShareConfig,
    pub payments: PaymentConfig,
    pub cache: CacheConfig,
}

/// interest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestConfig {
    /// flat rate applied to the remaining principal once per period
    pub rate: Rate,
    pub periods: Vec<AccrualPeriod>,
}

/// yearly accrual cutoff shared by a group of accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualPeriod {
    pub accounts: AccountGroup,
    pub month: u32,
    pub day: u32,
}

impl AccrualPeriod {
    pub fn new(accounts: AccountGroup, month: u32, day: u32) -> Self {
        Self { accounts, month, day }
    }

    /// cutoff date of this period in `year`
    pub fn due_date(&self, year: i32) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month, self.day).ok_or_else(|| {
            LedgerError::InvalidConfiguration {
                message: format!(
                    "period for {} has no date {}-{:02}-{:02}",
                    self.accounts, year, self.month, self.day
                ),
            }
        })
    }

    /// first cutoff strictly after `date`
    pub fn next_due_after(&self, date: NaiveDate) -> Result<NaiveDate> {
        let this_year = self.due_date(date.year())?;
        if this_year > date {
            Ok(this_year)
        } else {
            self.due_date(date.year() + 1)
        }
    }
}

/// share purchase configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareConfig {
    pub unit_price: Money,
    pub units_per_purchase: u32,
    pub window_month: u32,
    pub window_day: u32,
}

impl ShareConfig {
    /// amount added to the share balance by one purchase
    pub fn purchase_amount(&self) -> Money {
        self.unit_price * self.units_per_purchase
    }

    /// date the purchase window opens in `year`
    pub fn window_open_date(&self, year: i32) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.window_month, self.window_day).ok_or_else(|| {
            LedgerError::InvalidConfiguration {
                message: format!(
                    "share window has no date {}-{:02}-{:02}",
                    year, self.window_month, self.window_day
                ),
            }
        })
    }
}

/// payment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentConfig {
    pub overpayment_policy: OverpaymentPolicy,
}

/// read cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub table_ttl_seconds: i64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::seconds(self.table_ttl_seconds)
    }
}

impl LedgerConfig {
    /// the cooperative's standing rules
    ///
    /// 6% flat interest, account 4 closes on 5 July, accounts 1 and 2 close
    /// on 5 November, shares sell in lots of 2 x 50 from 5 January.
    pub fn standard() -> Self {
        Self {
            interest: InterestConfig {
                rate: Rate::from_percentage(6),
                periods: vec![
                    AccrualPeriod::new(AccountGroup::new([LoanAccount::Four]), 7, 5),
                    AccrualPeriod::new(AccountGroup::new([LoanAccount::One, LoanAccount::Two]), 11, 5),
                ],
            },
            shares: ShareConfig {
                unit_price: Money::from_major(50),
                units_per_purchase: 2,
                window_month: 1,
                window_day: 5,
            },
            payments: PaymentConfig {
                overpayment_policy: OverpaymentPolicy::Reject,
            },
            cache: CacheConfig {
                table_ttl_seconds: 60,
            },
        }
    }

    /// parse and validate a json configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: LedgerConfig =
            serde_json::from_str(json).map_err(|e| LedgerError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| LedgerError::InvalidConfiguration {
            message: e.to_string(),
        })
    }

    pub fn with_overpayment_policy(mut self, policy: OverpaymentPolicy) -> Self {
        self.payments.overpayment_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(LedgerError::InvalidConfiguration { message });

        if self.interest.rate < Rate::ZERO {
            return invalid(format!("negative interest rate {}", self.interest.rate));
        }

        let mut seen = HashSet::new();
        for period in &self.interest.periods {
            if period.accounts.is_empty() {
                return invalid("accrual period without accounts".to_string());
            }
            // 2023 is not a leap year, so 29 February is rejected as a cutoff
            period.due_date(2023)?;
            for account in period.accounts.accounts() {
                if !seen.insert(account) {
                    return invalid(format!("account {account} belongs to two accrual periods"));
                }
            }
        }

        if !self.shares.unit_price.is_positive() || self.shares.units_per_purchase == 0 {
            return invalid("share purchase must be a positive amount".to_string());
        }
        self.shares.window_open_date(2023)?;

        if self.cache.table_ttl_seconds < 0 {
            return invalid("negative cache ttl".to_string());
        }

        Ok(())
    }

    /// accrual period an account belongs to
    pub fn period_for_account(&self, account: LoanAccount) -> Result<&AccrualPeriod> {
        self.interest
            .periods
            .iter()
            .find(|p| p.accounts.contains(account))
            .ok_or_else(|| LedgerError::InvalidConfiguration {
                message: format!("account {account} has no accrual period"),
            })
    }

    /// accrual period configured for exactly this group
    pub fn period_for_group(&self, group: &AccountGroup) -> Result<&AccrualPeriod> {
        self.interest
            .periods
            .iter()
            .find(|p| &p.accounts == group)
            .ok_or_else(|| LedgerError::InvalidConfiguration {
                message: format!("no accrual period configured for {group}"),
            })
    }

    /// due date of a loan issued on `issue_date`
    pub fn loan_due_date(&self, account: LoanAccount, issue_date: NaiveDate) -> Result<NaiveDate> {
        self.period_for_account(account)?.next_due_after(issue_date)
    }

    /// every configured accrual group
    pub fn account_groups(&self) -> Vec<AccountGroup> {
        self.interest.periods.iter().map(|p| p.accounts.clone()).collect()
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_standard_config_is_valid() {
        let config = LedgerConfig::standard();
        assert!(config.validate().is_ok());
        assert_eq!(config.shares.purchase_amount(), Money::from_major(100));
        assert_eq!(config.account_groups().len(), 2);
    }

    #[test]
    fn test_loan_due_dates() {
        let config = LedgerConfig::standard();

        // before the cutoff: due the same year
        assert_eq!(
            config.loan_due_date(LoanAccount::Four, date(2024, 3, 1)).unwrap(),
            date(2024, 7, 5)
        );
        // on the cutoff: next year's cutoff
        assert_eq!(
            config.loan_due_date(LoanAccount::Four, date(2024, 7, 5)).unwrap(),
            date(2025, 7, 5)
        );
        assert_eq!(
            config.loan_due_date(LoanAccount::Two, date(2024, 12, 1)).unwrap(),
            date(2025, 11, 5)
        );
    }

    #[test]
    fn test_overlapping_periods_rejected() {
        let mut config = LedgerConfig::standard();
        config
            .interest
            .periods
            .push(AccrualPeriod::new(AccountGroup::new([LoanAccount::Four]), 1, 5));

        assert!(matches!(
            config.validate(),
            Err(LedgerError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_leap_day_cutoff_rejected() {
        let mut config = LedgerConfig::standard();
        config.interest.periods[0].month = 2;
        config.interest.periods[0].day = 29;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip_keeps_rules() {
        let config = LedgerConfig::standard().with_overpayment_policy(OverpaymentPolicy::Clamp);
        let json = config.to_json_pretty().unwrap();
        let parsed = LedgerConfig::from_json_str(&json).unwrap();

        assert_eq!(parsed, config);
        assert!(LedgerConfig::from_json_str("{\"interest\": 5}").is_err());
    }

    #[test]
    fn test_group_lookup() {
        let config = LedgerConfig::standard();
        let group = AccountGroup::new([LoanAccount::Two, LoanAccount::One]);

        let period = config.period_for_group(&group).unwrap();
        assert_eq!(period.due_date(2024).unwrap(), date(2024, 11, 5));

        let partial = AccountGroup::new([LoanAccount::One]);
        assert!(config.period_for_group(&partial).is_err());
    }
}
