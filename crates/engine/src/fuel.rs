//! Fuel purchases.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine,
    aggregate::LedgerKey,
    money::parse_hundredths,
    util::{budget_year, normalize_optional_text, normalize_plate, parse_uuid},
};

/// Volume in hundredths of a liter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Liters(i64);

impl Liters {
    pub const fn from_hundredths(value: i64) -> Self {
        Self(value)
    }

    pub const fn hundredths(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Liters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Liters {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hundredths(s).map(Self)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelPurchase {
    pub id: Uuid,
    pub vehicle_plate: String,
    pub date: NaiveDate,
    pub liters: Liters,
    pub unit_price: Option<Money>,
    pub total_cost: Money,
    pub odometer_km: i64,
    pub receipt_number: Option<String>,
    pub account_code: Option<String>,
}

impl FuelPurchase {
    pub fn new(
        vehicle_plate: &str,
        date: NaiveDate,
        liters: Liters,
        total_cost: Money,
        odometer_km: i64,
    ) -> ResultEngine<Self> {
        let purchase = Self {
            id: Uuid::new_v4(),
            vehicle_plate: normalize_plate(vehicle_plate)?,
            date,
            liters,
            unit_price: None,
            total_cost,
            odometer_km,
            receipt_number: None,
            account_code: None,
        };
        purchase.validate()?;
        Ok(purchase)
    }

    pub fn validate(&self) -> ResultEngine<()> {
        if self.liters.hundredths() <= 0 {
            return Err(EngineError::InvalidAmount(
                "liters must be > 0".to_string(),
            ));
        }
        self.total_cost.ensure_non_negative("total_cost")?;
        if let Some(price) = self.unit_price {
            price.ensure_non_negative("unit_price")?;
        }
        if self.odometer_km < 0 {
            return Err(EngineError::InvalidAmount(
                "odometer_km must be >= 0".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn receipt_number(mut self, receipt: Option<&str>) -> Self {
        self.receipt_number = normalize_optional_text(receipt);
        self
    }

    pub fn ledger_key(&self) -> Option<LedgerKey> {
        self.account_code.as_ref().map(|account| LedgerKey {
            year: budget_year(self.date),
            account_code: account.clone(),
            vehicle_plate: Some(self.vehicle_plate.clone()),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "fuel_purchases")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub vehicle_plate: String,
    pub date: Date,
    pub liters_hundredths: i64,
    pub unit_price_minor: Option<i64>,
    pub total_cost_minor: i64,
    pub odometer_km: i64,
    pub receipt_number: Option<String>,
    pub account_code: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&FuelPurchase> for ActiveModel {
    fn from(value: &FuelPurchase) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            vehicle_plate: ActiveValue::Set(value.vehicle_plate.clone()),
            date: ActiveValue::Set(value.date),
            liters_hundredths: ActiveValue::Set(value.liters.hundredths()),
            unit_price_minor: ActiveValue::Set(value.unit_price.map(Money::cents)),
            total_cost_minor: ActiveValue::Set(value.total_cost.cents()),
            odometer_km: ActiveValue::Set(value.odometer_km),
            receipt_number: ActiveValue::Set(value.receipt_number.clone()),
            account_code: ActiveValue::Set(value.account_code.clone()),
        }
    }
}

impl TryFrom<Model> for FuelPurchase {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "fuel purchase")?,
            vehicle_plate: model.vehicle_plate,
            date: model.date,
            liters: Liters::from_hundredths(model.liters_hundredths),
            unit_price: model.unit_price_minor.map(Money::new),
            total_cost: Money::new(model.total_cost_minor),
            odometer_km: model.odometer_km,
            receipt_number: model.receipt_number,
            account_code: model.account_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn liters_parse_two_decimals() {
        let liters: Liters = "45.5".parse().unwrap();
        assert_eq!(liters.hundredths(), 4_550);
        assert_eq!(liters.to_string(), "45.50");
        assert!("1.234".parse::<Liters>().is_err());
    }

    #[test]
    fn empty_purchase_is_rejected() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let result = FuelPurchase::new(
            "AB-1234",
            date,
            Liters::from_hundredths(0),
            Money::from_units(10),
            1000,
        );
        assert!(matches!(result, Err(EngineError::InvalidAmount(_))));
    }

    #[test]
    fn ledger_key_uses_purchase_date() {
        let date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let mut purchase = FuelPurchase::new(
            "ab-1234",
            date,
            Liters::from_hundredths(4_000),
            Money::from_units(60),
            1000,
        )
        .unwrap();
        purchase.account_code = Some("22.06.001".to_string());
        let key = purchase.ledger_key().unwrap();
        assert_eq!(key.year, 2023);
        assert_eq!(key.vehicle_plate.as_deref(), Some("AB-1234"));
    }
}
