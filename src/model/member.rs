use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::store::schema::{self, members as col};
use crate::store::Row;
use crate::types::MemberId;

/// personal details captured at registration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemberProfile {
    pub name: String,
    pub address_no: String,
    pub village: String,
    pub sub_district: String,
    pub district: String,
    pub province: String,
    pub date_of_birth: Option<NaiveDate>,
}

impl MemberProfile {
    /// name and the four address parts are mandatory
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LedgerError::validation("member name is required"));
        }
        let address = [
            ("village", &self.village),
            ("sub-district", &self.sub_district),
            ("district", &self.district),
            ("province", &self.province),
        ];
        if let Some((part, _)) = address.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(LedgerError::validation(format!("address {part} is required")));
        }
        Ok(())
    }
}

/// cooperative member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub member_id: MemberId,
    #[serde(flatten)]
    pub profile: MemberProfile,
    pub savings_balance: Money,
    pub shares_balance: Money,
    pub last_share_purchase_date: Option<NaiveDate>,
    pub last_updated: DateTime<Utc>,
}

impl Member {
    /// whether a share decision may still be recorded in `year`
    pub fn can_decide_shares_in(&self, year: i32) -> bool {
        self.last_share_purchase_date
            .map(|d| d.year() < year)
            .unwrap_or(true)
    }

    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            member_id: schema::read_text(row, col::MEMBER_ID)?,
            profile: MemberProfile {
                name: schema::read_text(row, col::NAME)?,
                address_no: schema::read_text_or_empty(row, col::ADDRESS_NO),
                village: schema::read_text_or_empty(row, col::VILLAGE),
                sub_district: schema::read_text_or_empty(row, col::SUB_DISTRICT),
                district: schema::read_text_or_empty(row, col::DISTRICT),
                province: schema::read_text_or_empty(row, col::PROVINCE),
                date_of_birth: schema::read_opt_date(row, col::DOB)?,
            },
            savings_balance: schema::read_money_or_zero(row, col::SAVINGS)?,
            shares_balance: schema::read_money_or_zero(row, col::SHARES)?,
            last_share_purchase_date: schema::read_opt_date(row, col::LAST_SHARE_PURCHASE)?,
            last_updated: schema::read_timestamp(row, col::LAST_UPDATED)?,
        })
    }

    /// cells in header order
    pub fn to_values(&self) -> Vec<Value> {
        vec![
            Value::String(self.member_id.clone()),
            Value::String(self.profile.name.clone()),
            Value::String(self.profile.address_no.clone()),
            Value::String(self.profile.village.clone()),
            Value::String(self.profile.sub_district.clone()),
            Value::String(self.profile.district.clone()),
            Value::String(self.profile.province.clone()),
            schema::opt_date_cell(self.profile.date_of_birth),
            schema::money_cell(self.savings_balance),
            schema::money_cell(self.shares_balance),
            schema::opt_date_cell(self.last_share_purchase_date),
            schema::timestamp_cell(self.last_updated),
        ]
    }
}
