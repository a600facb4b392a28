//! `/api/transactions` handlers.

use crate::{
    api::{AppState, identity::CurrentUser},
    core::transaction::{
        self, NewTransaction, TransactionChange, TransactionDto, TransactionFilters,
        TransactionPage, TransactionPatch, TransactionRemoval,
    },
    errors::Error,
};
use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};

/// `GET /api/transactions`
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    query: Result<Query<TransactionFilters>, QueryRejection>,
) -> Result<Json<TransactionPage>, Error> {
    let Query(filters) = query?;
    transaction::list_transactions(&state.db, &user.id, filters)
        .await
        .map(Json)
}

/// `GET /api/transactions/{id}`
pub async fn show(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<TransactionDto>, Error> {
    transaction::get_transaction(&state.db, &user.id, &id)
        .await
        .map(Json)
}

/// `POST /api/transactions`
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    payload: Result<Json<NewTransaction>, JsonRejection>,
) -> Result<(StatusCode, Json<TransactionChange>), Error> {
    let Json(input) = payload?;
    let change = transaction::create_transaction(&state.db, &user.id, input).await?;
    Ok((StatusCode::CREATED, Json(change)))
}

/// `PUT /api/transactions/{id}`
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    payload: Result<Json<TransactionPatch>, JsonRejection>,
) -> Result<Json<TransactionChange>, Error> {
    let Json(patch) = payload?;
    transaction::update_transaction(&state.db, &user.id, &id, patch)
        .await
        .map(Json)
}

/// `DELETE /api/transactions/{id}`
pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<TransactionRemoval>, Error> {
    transaction::delete_transaction(&state.db, &user.id, &id)
        .await
        .map(Json)
}
