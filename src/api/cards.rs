//! `/api/cards` handlers.

use crate::{
    api::{AppState, identity::CurrentUser},
    core::card::{self, CardDto, CardPatch, NewCard},
    errors::Error,
};
use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;

/// Body of `PUT /api/cards/{id}`; the id comes from the path.
#[derive(Debug, Deserialize)]
pub struct CardChanges {
    /// New name
    #[serde(default)]
    pub name: Option<String>,
    /// New color
    #[serde(default)]
    pub color: Option<String>,
}

/// `GET /api/cards`
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<CardDto>>, Error> {
    card::list_cards(&state.db, &user.id).await.map(Json)
}

/// `POST /api/cards`
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    payload: Result<Json<NewCard>, JsonRejection>,
) -> Result<(StatusCode, Json<CardDto>), Error> {
    let Json(input) = payload?;
    let created = card::create_card(&state.db, &state.cipher, &user.id, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /api/cards/{id}`
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    payload: Result<Json<CardChanges>, JsonRejection>,
) -> Result<Json<CardDto>, Error> {
    let Json(changes) = payload?;
    let patch = CardPatch {
        id,
        name: changes.name,
        color: changes.color,
    };
    card::update_card(&state.db, &user.id, patch).await.map(Json)
}
