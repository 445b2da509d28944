//! Purchase orders.
//!
//! An order counts as a budget commitment from the moment it is issued until
//! it is voided. Progress through `Issued → Accepted → Received → Paid` is
//! forward-only; any non-voided order may be voided.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine,
    aggregate::LedgerKey,
    util::{budget_year, normalize_required_text, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderState {
    Issued,
    Accepted,
    Received,
    Paid,
    Voided,
}

impl PurchaseOrderState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Issued => "issued",
            Self::Accepted => "accepted",
            Self::Received => "received",
            Self::Paid => "paid",
            Self::Voided => "voided",
        }
    }

    pub fn can_transition_to(self, to: PurchaseOrderState) -> bool {
        match (self, to) {
            (Self::Voided, _) => false,
            (_, Self::Voided) => true,
            (from, to) => to > from,
        }
    }
}

impl TryFrom<&str> for PurchaseOrderState {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "issued" => Ok(Self::Issued),
            "accepted" => Ok(Self::Accepted),
            "received" => Ok(Self::Received),
            "paid" => Ok(Self::Paid),
            "voided" => Ok(Self::Voided),
            other => Err(EngineError::InvariantViolation(format!(
                "invalid purchase order state: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub order_number: String,
    pub issued_on: NaiveDate,
    /// Direct vehicle reference. When absent, the vehicle is resolved through
    /// linked work orders.
    pub vehicle_plate: Option<String>,
    pub account_code: Option<String>,
    pub amount_total: Money,
    pub state: PurchaseOrderState,
}

impl PurchaseOrder {
    pub fn new(order_number: &str, issued_on: NaiveDate, amount_total: Money) -> ResultEngine<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            order_number: normalize_required_text(order_number, "order number")?,
            issued_on,
            vehicle_plate: None,
            account_code: None,
            amount_total: amount_total.ensure_non_negative("amount_total")?,
            state: PurchaseOrderState::Issued,
        })
    }

    pub fn is_voided(&self) -> bool {
        self.state == PurchaseOrderState::Voided
    }

    pub fn transition(&mut self, to: PurchaseOrderState) -> ResultEngine<()> {
        if !self.state.can_transition_to(to) {
            return Err(EngineError::InvalidTransition(format!(
                "purchase order cannot move from {} to {}",
                self.state.as_str(),
                to.as_str()
            )));
        }
        self.state = to;
        Ok(())
    }
}

/// A purchase order together with the vehicle it resolves to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPurchaseOrder {
    pub order: PurchaseOrder,
    pub vehicle_plate: Option<String>,
}

impl ResolvedPurchaseOrder {
    /// Picks the direct vehicle when present, otherwise the single vehicle
    /// shared by every linked work order.
    pub fn resolve(order: PurchaseOrder, work_order_plates: &[String]) -> Self {
        let vehicle_plate = order.vehicle_plate.clone().or_else(|| {
            let first = work_order_plates.first()?;
            work_order_plates
                .iter()
                .all(|plate| plate == first)
                .then(|| first.clone())
        });
        Self {
            order,
            vehicle_plate,
        }
    }

    pub fn ledger_key(&self) -> Option<LedgerKey> {
        self.order.account_code.as_ref().map(|account| LedgerKey {
            year: budget_year(self.order.issued_on),
            account_code: account.clone(),
            vehicle_plate: self.vehicle_plate.clone(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "purchase_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub order_number: String,
    pub issued_on: Date,
    pub vehicle_plate: Option<String>,
    pub account_code: Option<String>,
    pub amount_total_minor: i64,
    pub state: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&PurchaseOrder> for ActiveModel {
    fn from(value: &PurchaseOrder) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            order_number: ActiveValue::Set(value.order_number.clone()),
            issued_on: ActiveValue::Set(value.issued_on),
            vehicle_plate: ActiveValue::Set(value.vehicle_plate.clone()),
            account_code: ActiveValue::Set(value.account_code.clone()),
            amount_total_minor: ActiveValue::Set(value.amount_total.cents()),
            state: ActiveValue::Set(value.state.as_str().to_string()),
        }
    }
}

impl TryFrom<Model> for PurchaseOrder {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "purchase order")?,
            order_number: model.order_number,
            issued_on: model.issued_on,
            vehicle_plate: model.vehicle_plate,
            account_code: model.account_code,
            amount_total: Money::new(model.amount_total_minor),
            state: PurchaseOrderState::try_from(model.state.as_str())?,
        })
    }
}
