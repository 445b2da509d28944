//! Account API endpoints

use api_types::account::{Account, AccountList, AccountNew};
use axum::{Json, extract::State, http::StatusCode};

use crate::{ServerError, server::ServerState};

fn map_account(account: engine::Account) -> Account {
    Account {
        code: account.code,
        name: account.name,
        description: account.description,
    }
}

/// Handle requests for creating a budget account
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<AccountNew>,
) -> Result<(StatusCode, Json<Account>), ServerError> {
    let account = state
        .engine
        .create_account(&payload.code, &payload.name, payload.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(map_account(account))))
}

pub async fn list(State(state): State<ServerState>) -> Result<Json<AccountList>, ServerError> {
    let accounts = state.engine.accounts().await?;
    Ok(Json(AccountList {
        accounts: accounts.into_iter().map(map_account).collect(),
    }))
}
