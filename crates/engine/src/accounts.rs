//! Budget accounts (chart-of-accounts entries such as `22.06.002`).

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    ResultEngine,
    util::{normalize_optional_text, normalize_required_text},
};

/// A budget classification code. The `code` is the immutable identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
}

impl Account {
    pub fn new(code: &str, name: &str, description: Option<&str>) -> ResultEngine<Self> {
        Ok(Self {
            code: normalize_required_text(code, "account code")?,
            name: normalize_required_text(name, "account name")?,
            description: normalize_optional_text(description),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(value: &Account) -> Self {
        Self {
            code: ActiveValue::Set(value.code.clone()),
            name: ActiveValue::Set(value.name.clone()),
            description: ActiveValue::Set(value.description.clone()),
        }
    }
}

impl From<Model> for Account {
    fn from(model: Model) -> Self {
        Self {
            code: model.code,
            name: model.name,
            description: model.description,
        }
    }
}
