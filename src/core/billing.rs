//! Recurring billing business logic
//!
//! Turns active subscriptions into monthly DEBIT transactions. For each
//! subscription the job works in the owner's local calendar: once the local day
//! reaches the (clamped) billing day, a charge dated that day is created unless
//! one already exists for the subscription in that month. Running the job any
//! number of times in a month therefore yields at most one charge per
//! subscription, and a failure on one subscription never stops the others.

use crate::{
    core::calendar,
    entities::{Subscription, Transaction, TransactionType, User, subscription, transaction, user},
    errors::{Error, Result},
};
use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Serialize;
use std::str::FromStr;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Category assigned to generated charges.
pub const SUBSCRIPTION_CATEGORY: &str = "Subscriptions";

/// Options for [`run_billing`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BillingOptions {
    /// Instant to bill for; defaults to now
    pub reference_date: Option<DateTime<Utc>>,
}

/// A subscription that could not be billed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingFailure {
    /// Subscription that failed
    pub subscription_id: String,
    /// What went wrong
    pub message: String,
}

/// A charge created during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCharge {
    /// New transaction id
    pub id: String,
    /// Subscription it was generated for
    pub subscription_id: String,
    /// Charge date (UTC midnight of the billing day)
    pub date: DateTime<Utc>,
}

/// Summary of one billing run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingRunResult {
    /// Active subscriptions examined
    pub processed: usize,
    /// Charges created
    pub created: usize,
    /// Subscriptions not yet due or already charged this month
    pub skipped: usize,
    /// Per-subscription failures
    pub errors: Vec<BillingFailure>,
    /// Charges created, in processing order
    pub transactions: Vec<GeneratedCharge>,
}

/// Payload returned by the cron route and printed by `run-billing`.
#[derive(Debug, Clone, Serialize)]
pub struct BillingReport {
    /// Always true; failures of single subscriptions live in `errors`
    pub ok: bool,
    /// The run summary, flattened into the report
    #[serde(flatten)]
    pub result: BillingRunResult,
}

impl From<BillingRunResult> for BillingReport {
    fn from(result: BillingRunResult) -> Self {
        Self { ok: true, result }
    }
}

/// What happened to a single subscription.
enum Outcome {
    Charged(GeneratedCharge),
    Skipped,
}

/// Resolves an IANA timezone name; empty means UTC.
fn parse_timezone(name: &str) -> Result<Tz> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(Tz::UTC);
    }
    Tz::from_str(name).map_err(|_| Error::Config {
        message: format!("Unknown timezone: {name}"),
    })
}

/// Description given to a generated charge.
#[must_use]
pub fn charge_description(subscription_name: &str) -> String {
    format!("{subscription_name} (assinatura)")
}

async fn bill_subscription<C>(
    db: &C,
    sub: &subscription::Model,
    owner: Option<&user::Model>,
    reference: DateTime<Utc>,
) -> Result<Outcome>
where
    C: ConnectionTrait,
{
    let tz = parse_timezone(owner.map_or("", |u| u.timezone.as_str()))?;
    let local = reference.with_timezone(&tz).date_naive();
    let (year, month, day) = (local.year(), local.month(), local.day());

    let billing_day = u32::try_from(sub.billing_day).unwrap_or(1).max(1);
    let target_day = billing_day.min(calendar::days_in_month(year, month)?);
    if day < target_day {
        debug!(subscription_id = %sub.id, day, target_day, "Not due yet");
        return Ok(Outcome::Skipped);
    }

    let (month_start, next_month_start) = calendar::month_bounds(year, month)?;
    let existing = Transaction::find()
        .filter(transaction::Column::SubscriptionId.eq(sub.id.as_str()))
        .filter(transaction::Column::Date.gte(month_start))
        .filter(transaction::Column::Date.lt(next_month_start))
        .one(db)
        .await?;
    if existing.is_some() {
        debug!(subscription_id = %sub.id, "Already charged this month");
        return Ok(Outcome::Skipped);
    }

    let date = calendar::utc_midnight(year, month, target_day)?;
    let now = Utc::now();
    let charge = transaction::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(sub.user_id.clone()),
        transaction_type: Set(TransactionType::Debit),
        value: Set(sub.value),
        description: Set(charge_description(&sub.name)),
        category: Set(SUBSCRIPTION_CATEGORY.to_string()),
        date: Set(date),
        card_id: Set(sub.card_id.clone()),
        subscription_id: Set(Some(sub.id.clone())),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    Ok(Outcome::Charged(GeneratedCharge {
        id: charge.id,
        subscription_id: sub.id.clone(),
        date,
    }))
}

/// Runs the billing job over every active subscription.
///
/// Subscriptions are handled one at a time, oldest first. Per-subscription
/// failures (unknown timezone, insert error) are collected into
/// [`BillingRunResult::errors`]; only a failure to load the subscriptions
/// aborts the run.
///
/// Accepts any connection, so callers can point it at a different store or run
/// it inside a transaction.
#[instrument(skip(db))]
pub async fn run_billing<C>(db: &C, options: BillingOptions) -> Result<BillingRunResult>
where
    C: ConnectionTrait,
{
    let reference = options.reference_date.unwrap_or_else(Utc::now);

    let subscriptions = Subscription::find()
        .filter(subscription::Column::Active.eq(true))
        .order_by_asc(subscription::Column::CreatedAt)
        .find_also_related(User)
        .all(db)
        .await?;

    let mut result = BillingRunResult {
        processed: subscriptions.len(),
        ..Default::default()
    };

    for (sub, owner) in &subscriptions {
        match bill_subscription(db, sub, owner.as_ref(), reference).await {
            Ok(Outcome::Charged(charge)) => {
                info!(
                    subscription_id = %sub.id,
                    transaction_id = %charge.id,
                    date = %charge.date,
                    "Created subscription charge"
                );
                result.created += 1;
                result.transactions.push(charge);
            }
            Ok(Outcome::Skipped) => result.skipped += 1,
            Err(e) => {
                warn!(subscription_id = %sub.id, error = %e, "Failed to bill subscription");
                result.errors.push(BillingFailure {
                    subscription_id: sub.id.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    info!(
        processed = result.processed,
        created = result.created,
        skipped = result.skipped,
        errors = result.errors.len(),
        "Billing run finished"
    );
    Ok(result)
}

/// Formats a billing result into a human-readable summary string.
#[must_use]
pub fn format_billing_summary(result: &BillingRunResult) -> String {
    let mut summary = format!(
        "Billing run - Processed {} subscriptions\n  Created: {} | Skipped: {} | Errors: {}\n",
        result.processed,
        result.created,
        result.skipped,
        result.errors.len()
    );

    for charge in &result.transactions {
        summary.push_str(&format!(
            "  + {} on {}\n",
            charge.subscription_id,
            charge.date.format("%Y-%m-%d")
        ));
    }
    for failure in &result.errors {
        summary.push_str(&format!(
            "  ! {}: {}\n",
            failure.subscription_id, failure.message
        ));
    }

    summary
}
