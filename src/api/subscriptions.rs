//! `/api/subscriptions` handlers.

use crate::{
    api::{AppState, identity::CurrentUser},
    core::subscription::{self, NewSubscription, SubscriptionDto, SubscriptionPatch},
    errors::Error,
};
use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};

/// `GET /api/subscriptions`
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<SubscriptionDto>>, Error> {
    subscription::list_subscriptions(&state.db, &user.id)
        .await
        .map(Json)
}

/// `POST /api/subscriptions`
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    payload: Result<Json<NewSubscription>, JsonRejection>,
) -> Result<(StatusCode, Json<SubscriptionDto>), Error> {
    let Json(input) = payload?;
    let created = subscription::create_subscription(&state.db, &user.id, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /api/subscriptions/{id}`
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    payload: Result<Json<SubscriptionPatch>, JsonRejection>,
) -> Result<Json<SubscriptionDto>, Error> {
    let Json(patch) = payload?;
    subscription::update_subscription(&state.db, &user.id, &id, patch)
        .await
        .map(Json)
}
