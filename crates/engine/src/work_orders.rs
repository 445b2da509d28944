//! Workshop work orders. A work order ties a vehicle to a purchase order.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    util::{normalize_plate, normalize_required_text, parse_uuid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: Uuid,
    pub order_number: String,
    pub vehicle_plate: String,
    pub requested_on: NaiveDate,
    pub description: String,
    pub purchase_order_id: Option<Uuid>,
}

impl WorkOrder {
    pub fn new(
        order_number: &str,
        vehicle_plate: &str,
        requested_on: NaiveDate,
        description: &str,
    ) -> ResultEngine<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            order_number: normalize_required_text(order_number, "order number")?,
            vehicle_plate: normalize_plate(vehicle_plate)?,
            requested_on,
            description: normalize_required_text(description, "description")?,
            purchase_order_id: None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "work_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub order_number: String,
    pub vehicle_plate: String,
    pub requested_on: Date,
    pub description: String,
    pub purchase_order_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&WorkOrder> for ActiveModel {
    fn from(value: &WorkOrder) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            order_number: ActiveValue::Set(value.order_number.clone()),
            vehicle_plate: ActiveValue::Set(value.vehicle_plate.clone()),
            requested_on: ActiveValue::Set(value.requested_on),
            description: ActiveValue::Set(value.description.clone()),
            purchase_order_id: ActiveValue::Set(value.purchase_order_id.map(|id| id.to_string())),
        }
    }
}

impl TryFrom<Model> for WorkOrder {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "work order")?,
            order_number: model.order_number,
            vehicle_plate: model.vehicle_plate,
            requested_on: model.requested_on,
            description: model.description,
            purchase_order_id: model
                .purchase_order_id
                .as_deref()
                .map(|id| parse_uuid(id, "purchase order"))
                .transpose()?,
        })
    }
}
