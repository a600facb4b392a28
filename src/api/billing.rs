//! `POST /api/subscriptions/cron`: scheduler trigger for the billing job.

use crate::{
    api::AppState,
    core::billing::{self, BillingOptions, BillingReport},
    errors::Error,
};
use axum::{Json, extract::State, http::HeaderMap};

/// Header the scheduler must send.
pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

fn check_secret(headers: &HeaderMap, expected: Option<&str>) -> Result<(), Error> {
    let provided = headers.get(CRON_SECRET_HEADER).and_then(|h| h.to_str().ok());
    match (expected, provided) {
        (Some(expected), Some(provided)) if expected == provided => Ok(()),
        _ => Err(Error::Forbidden {
            message: "Invalid cron secret".to_string(),
        }),
    }
}

/// Runs the billing job for the current instant.
pub async fn run_cron(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BillingReport>, Error> {
    check_secret(&headers, state.config.cron_secret.as_deref())?;

    let result = billing::run_billing(state.db.as_ref(), BillingOptions::default()).await?;
    Ok(Json(result.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_check_secret() {
        let mut headers = HeaderMap::new();
        assert!(check_secret(&headers, Some("s3cret")).is_err());

        headers.insert(CRON_SECRET_HEADER, HeaderValue::from_static("wrong"));
        assert!(check_secret(&headers, Some("s3cret")).is_err());

        headers.insert(CRON_SECRET_HEADER, HeaderValue::from_static("s3cret"));
        assert!(check_secret(&headers, Some("s3cret")).is_ok());

        // No configured secret closes the route
        assert!(matches!(
            check_secret(&headers, None),
            Err(Error::Forbidden { .. })
        ));
    }
}
