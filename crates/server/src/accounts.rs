//! Accounts API endpoints

use api_types::{
    account::{AccountDetail, AccountKind as ApiKind, AccountNew, AccountView},
    envelope::Envelope,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, transactions::transaction_view, user::Caller};

fn map_kind(kind: engine::AccountKind) -> ApiKind {
    match kind {
        engine::AccountKind::Current => ApiKind::Current,
        engine::AccountKind::Savings => ApiKind::Savings,
    }
}

fn engine_kind(kind: ApiKind) -> engine::AccountKind {
    match kind {
        ApiKind::Current => engine::AccountKind::Current,
        ApiKind::Savings => engine::AccountKind::Savings,
    }
}

pub(crate) fn account_view(account: engine::Account) -> AccountView {
    AccountView {
        id: account.id,
        name: account.name,
        kind: map_kind(account.kind),
        balance: account.balance.decimal(),
        initial_balance: account.initial_balance.decimal(),
        is_default: account.is_default,
        created_at: account.created_at,
    }
}

pub async fn create(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): WithRejection<Json<AccountNew>, ServerError>,
) -> Result<(StatusCode, Json<Envelope<AccountView>>), ServerError> {
    let user_id = state.guard.check(&caller).await?;

    let cmd = engine::NewAccountCmd::new(
        user_id,
        payload.name,
        engine_kind(payload.kind),
        engine::Money::new(payload.balance),
    )
    .default_account(payload.is_default);
    let account = state.engine.create_account(cmd).await?;

    Ok((StatusCode::CREATED, Json(Envelope::ok(account_view(account)))))
}

pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
) -> Result<Json<Envelope<Vec<AccountView>>>, ServerError> {
    let user_id = caller.require()?;
    let accounts = state.engine.accounts(user_id).await?;
    Ok(Json(Envelope::ok(
        accounts.into_iter().map(account_view).collect(),
    )))
}

pub async fn get(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    WithRejection(Path(account_id), _): WithRejection<Path<Uuid>, ServerError>,
) -> Result<Json<Envelope<AccountDetail>>, ServerError> {
    let user_id = caller.require()?;
    let detail = state
        .engine
        .account_with_transactions(account_id, user_id)
        .await?;

    Ok(Json(Envelope::ok(AccountDetail {
        account: account_view(detail.account),
        transactions: detail
            .transactions
            .into_iter()
            .map(transaction_view)
            .collect(),
    })))
}

pub async fn set_default(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    WithRejection(Path(account_id), _): WithRejection<Path<Uuid>, ServerError>,
) -> Result<Json<Envelope<AccountView>>, ServerError> {
    let user_id = state.guard.check(&caller).await?;
    let account = state
        .engine
        .set_default_account(account_id, &user_id)
        .await?;
    Ok(Json(Envelope::ok(account_view(account))))
}
