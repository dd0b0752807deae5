//! Transactions API endpoints

use api_types::{
    envelope::Envelope,
    transaction::{
        BulkDelete, BulkDeleted, RecurringInterval as ApiInterval, TransactionKind as ApiKind,
        TransactionListQuery, TransactionListResponse, TransactionNew, TransactionView,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user::Caller};

fn map_kind(kind: engine::TransactionKind) -> ApiKind {
    match kind {
        engine::TransactionKind::Income => ApiKind::Income,
        engine::TransactionKind::Expense => ApiKind::Expense,
    }
}

fn engine_kind(kind: ApiKind) -> engine::TransactionKind {
    match kind {
        ApiKind::Income => engine::TransactionKind::Income,
        ApiKind::Expense => engine::TransactionKind::Expense,
    }
}

fn map_interval(interval: engine::RecurringInterval) -> ApiInterval {
    match interval {
        engine::RecurringInterval::Daily => ApiInterval::Daily,
        engine::RecurringInterval::Weekly => ApiInterval::Weekly,
        engine::RecurringInterval::Monthly => ApiInterval::Monthly,
        engine::RecurringInterval::Yearly => ApiInterval::Yearly,
    }
}

fn engine_interval(interval: ApiInterval) -> engine::RecurringInterval {
    match interval {
        ApiInterval::Daily => engine::RecurringInterval::Daily,
        ApiInterval::Weekly => engine::RecurringInterval::Weekly,
        ApiInterval::Monthly => engine::RecurringInterval::Monthly,
        ApiInterval::Yearly => engine::RecurringInterval::Yearly,
    }
}

pub(crate) fn transaction_view(tx: engine::Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        account_id: tx.account_id,
        kind: map_kind(tx.kind),
        amount: tx.amount.decimal(),
        category: tx.category,
        description: tx.description,
        date: tx.occurred_at,
        is_recurring: tx.is_recurring,
        recurring_interval: tx.recurring_interval.map(map_interval),
        next_recurring_date: tx.next_recurring_date,
        last_processed_at: tx.last_processed_at,
        created_at: tx.created_at,
        updated_at: tx.updated_at,
    }
}

fn fields(payload: TransactionNew) -> engine::TransactionFields {
    let fields = engine::TransactionFields::new(
        payload.account_id,
        engine_kind(payload.kind),
        engine::Money::new(payload.amount),
        payload.category,
        payload.date,
    )
    .recurrence(
        payload.is_recurring,
        payload.recurring_interval.map(engine_interval),
    );
    match payload.description {
        Some(description) => fields.description(description),
        None => fields,
    }
}

pub async fn create(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): WithRejection<Json<TransactionNew>, ServerError>,
) -> Result<(StatusCode, Json<Envelope<TransactionView>>), ServerError> {
    let user_id = state.guard.check(&caller).await?;
    let tx = state
        .engine
        .create_transaction(engine::NewTransactionCmd::new(user_id, fields(payload)))
        .await?;

    Ok((StatusCode::CREATED, Json(Envelope::ok(transaction_view(tx)))))
}

pub async fn update(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    WithRejection(Path(transaction_id), _): WithRejection<Path<Uuid>, ServerError>,
    WithRejection(Json(payload), _): WithRejection<Json<TransactionNew>, ServerError>,
) -> Result<Json<Envelope<TransactionView>>, ServerError> {
    let user_id = state.guard.check(&caller).await?;
    let tx = state
        .engine
        .update_transaction(engine::UpdateTransactionCmd::new(
            transaction_id,
            user_id,
            fields(payload),
        ))
        .await?;

    Ok(Json(Envelope::ok(transaction_view(tx))))
}

pub async fn get(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    WithRejection(Path(transaction_id), _): WithRejection<Path<Uuid>, ServerError>,
) -> Result<Json<Envelope<TransactionView>>, ServerError> {
    let user_id = caller.require()?;
    let tx = state.engine.transaction(transaction_id, user_id).await?;
    Ok(Json(Envelope::ok(transaction_view(tx))))
}

pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    WithRejection(Query(query), _): WithRejection<Query<TransactionListQuery>, ServerError>,
) -> Result<Json<Envelope<TransactionListResponse>>, ServerError> {
    let user_id = caller.require()?;
    let filter = engine::TransactionListFilter {
        account_id: query.account_id,
        kind: query.kind.map(engine_kind),
        recurring_only: query.recurring_only,
        limit: query.limit,
    };
    let txs = state.engine.list_transactions(user_id, &filter).await?;

    Ok(Json(Envelope::ok(TransactionListResponse {
        transactions: txs.into_iter().map(transaction_view).collect(),
    })))
}

pub async fn bulk_delete(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): WithRejection<Json<BulkDelete>, ServerError>,
) -> Result<Json<Envelope<BulkDeleted>>, ServerError> {
    let user_id = state.guard.check(&caller).await?;
    let deleted = state
        .engine
        .delete_transactions(&payload.ids, &user_id)
        .await?;
    tracing::debug!(%user_id, deleted, "bulk delete");

    Ok(Json(Envelope::ok(BulkDeleted { deleted })))
}
