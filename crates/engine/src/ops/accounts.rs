use sea_orm::{DatabaseTransaction, QueryOrder, TransactionTrait, prelude::*};

use crate::{Account, EngineError, ResultEngine, accounts};

use super::{Engine, with_tx};

/// Fails with `KeyNotFound` unless `code` is a known account.
pub(super) async fn require_account(db: &DatabaseTransaction, code: &str) -> ResultEngine<()> {
    accounts::Entity::find_by_id(code.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("account {code}")))?;
    Ok(())
}

/// Checks an optional account reference and returns it trimmed.
pub(super) async fn require_optional_account(
    db: &DatabaseTransaction,
    code: Option<&str>,
) -> ResultEngine<Option<String>> {
    match code.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => {
            require_account(db, code).await?;
            Ok(Some(code.to_string()))
        }
        None => Ok(None),
    }
}

impl Engine {
    /// Adds a budget account.
    pub async fn create_account(
        &self,
        code: &str,
        name: &str,
        description: Option<&str>,
    ) -> ResultEngine<Account> {
        let account = Account::new(code, name, description)?;
        with_tx!(self, |db_tx| {
            let exists = accounts::Entity::find_by_id(account.code.clone())
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(account.code));
            }
            accounts::ActiveModel::from(&account).insert(&db_tx).await?;
            Ok(account)
        })
    }

    pub async fn account(&self, code: &str) -> ResultEngine<Account> {
        with_tx!(self, |db_tx| {
            let model = accounts::Entity::find_by_id(code.trim().to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(format!("account {code}")))?;
            Ok(Account::from(model))
        })
    }

    /// All accounts ordered by code.
    pub async fn accounts(&self) -> ResultEngine<Vec<Account>> {
        with_tx!(self, |db_tx| {
            let models = accounts::Entity::find()
                .order_by_asc(accounts::Column::Code)
                .all(&db_tx)
                .await?;
            Ok(models.into_iter().map(Account::from).collect())
        })
    }
}
