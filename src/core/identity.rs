//! Identity business logic
//!
//! Users and bearer sessions. Services never see a token: the HTTP layer
//! resolves it with [`resolve_session_user`] and hands them the trusted user id.

use crate::{
    core::validation::Validator,
    entities::{Session, User, session, user},
    errors::{Error, Result},
};
use aes_gcm::aead::{OsRng, rand_core::RngCore};
use chrono::{Duration, Utc};
use chrono_tz::Tz;
use sea_orm::{Set, prelude::*};
use serde::Deserialize;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// Currency assigned when none is given.
pub const DEFAULT_CURRENCY: &str = "BRL";
/// Timezone assigned when none is given.
pub const DEFAULT_TIMEZONE: &str = "UTC";
/// Lifetime of a session created without an explicit one.
pub const DEFAULT_SESSION_DAYS: i64 = 30;
const TOKEN_BYTES: usize = 32;

/// Input for [`create_user`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    /// Display name
    pub name: String,
    /// Unique login email
    pub email: String,
    /// IANA timezone name
    #[serde(default)]
    pub timezone: Option<String>,
    /// Display currency code
    #[serde(default)]
    pub currency: Option<String>,
}

/// Creates a user. The timezone must be a known IANA name.
///
/// # Errors
/// Returns [`Error::Validation`] for a blank name, an email without `@` or an unknown timezone.
pub async fn create_user(db: &DatabaseConnection, input: NewUser) -> Result<user::Model> {
    let mut v = Validator::new();
    let name = v.text("name", &input.name, 1, 120);
    let email = v.text("email", &input.email, 3, 191).to_lowercase();
    if !email.contains('@') {
        v.push("email", "must be an email address");
    }
    let timezone = input
        .timezone
        .map(|tz| tz.trim().to_string())
        .filter(|tz| !tz.is_empty())
        .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
    if Tz::from_str(&timezone).is_err() {
        v.push("timezone", format!("unknown timezone {timezone}"));
    }
    let currency = input
        .currency
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    let (name, email, timezone, currency) = v.finish((name, email, timezone, currency))?;

    let now = Utc::now();
    let created = user::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        name: Set(name),
        email: Set(email),
        timezone: Set(timezone),
        currency: Set(currency),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    info!(user_id = %created.id, "Created user");
    Ok(created)
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Issues a new session for `user_id` valid for `ttl`.
pub async fn create_session(
    db: &DatabaseConnection,
    user_id: &str,
    ttl: Duration,
) -> Result<session::Model> {
    let exists = User::find_by_id(user_id.to_string()).one(db).await?.is_some();
    if !exists {
        return Err(Error::Unauthorized);
    }

    let now = Utc::now();
    let created = session::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        token: Set(generate_token()),
        user_id: Set(user_id.to_string()),
        expires_at: Set(now + ttl),
        created_at: Set(now),
    }
    .insert(db)
    .await?;

    debug!(user_id, session_id = %created.id, "Issued session");
    Ok(created)
}

/// Looks up the user behind a bearer token. Expired or unknown tokens yield `None`.
pub async fn resolve_session_user(
    db: &DatabaseConnection,
    token: &str,
) -> Result<Option<user::Model>> {
    let token = token.trim();
    if token.is_empty() {
        return Ok(None);
    }

    let found = Session::find()
        .filter(session::Column::Token.eq(token))
        .filter(session::Column::ExpiresAt.gt(Utc::now()))
        .find_also_related(User)
        .one(db)
        .await?;

    Ok(found.and_then(|(_, user)| user))
}
