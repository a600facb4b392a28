//! Transaction business logic - The ledger of credits and debits.
//!
//! This module provides functions for listing, creating, updating, and deleting
//! transactions on behalf of a user. Every read and write checks that the row
//! belongs to the acting user, and every write that references a card or a
//! subscription goes through the ownership guard first. Mutations return the
//! balance delta the caller should apply: the change in the user's balance caused
//! by this operation, where CREDIT contributes `+value` and DEBIT `-value`.

use crate::{
    core::{
        calendar,
        ownership::{RelationRefs, assert_ownership},
        validation::{RelationPatch, Validator, empty_patch},
    },
    entities::{Transaction, TransactionType, transaction},
    errors::{EntityKind, Error, Result},
};
use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    Condition, PaginatorTrait, QueryOrder, QuerySelect, Set, TransactionTrait,
    prelude::*,
    sea_query::{Expr, Func, LikeExpr},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Longest accepted description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 191;
/// Longest accepted category, in characters.
pub const MAX_CATEGORY_LEN: usize = 80;
/// Page size used when none is requested.
pub const DEFAULT_PER_PAGE: u64 = 20;
/// Largest page size a caller may request.
pub const MAX_PER_PAGE: u64 = 50;
const MIN_FILTER_YEAR: i32 = 2000;
const MAX_FILTER_YEAR: i32 = 2100;

/// Signed effect of a transaction on the balance.
#[must_use]
pub fn contribution(transaction_type: TransactionType, value: Decimal) -> Decimal {
    match transaction_type {
        TransactionType::Credit => value,
        TransactionType::Debit => -value,
    }
}

/// Input for [`create_transaction`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    /// `CREDIT` or `DEBIT`
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Positive amount
    pub value: Decimal,
    /// 1-191 characters after trimming
    pub description: String,
    /// 1-80 characters after trimming
    pub category: String,
    /// When the economic event happened
    pub date: DateTime<Utc>,
    /// Card the transaction was made on
    #[serde(default)]
    pub card_id: Option<String>,
    /// Subscription this transaction belongs to
    #[serde(default)]
    pub subscription_id: Option<String>,
}

impl NewTransaction {
    /// Trims text fields and checks every constraint.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] listing every offending field.
    pub fn validate(self) -> Result<Self> {
        let mut v = Validator::new();
        v.positive("value", self.value);
        let description = v.text("description", &self.description, 1, MAX_DESCRIPTION_LEN);
        let category = v.text("category", &self.category, 1, MAX_CATEGORY_LEN);
        let card_id = v.relation("cardId", self.card_id);
        let subscription_id = v.relation("subscriptionId", self.subscription_id);
        v.finish(Self {
            description,
            category,
            card_id,
            subscription_id,
            ..self
        })
    }
}

/// Partial update for [`update_transaction`]. At least one field must be present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPatch {
    /// New direction
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    /// New amount
    pub value: Option<Decimal>,
    /// New description
    pub description: Option<String>,
    /// New category
    pub category: Option<String>,
    /// New event date
    pub date: Option<DateTime<Utc>>,
    /// Card reference change
    #[serde(default)]
    pub card_id: RelationPatch,
    /// Subscription reference change
    #[serde(default)]
    pub subscription_id: RelationPatch,
}

impl TransactionPatch {
    /// True when no field would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transaction_type.is_none()
            && self.value.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.date.is_none()
            && self.card_id.is_unset()
            && self.subscription_id.is_unset()
    }

    /// Rejects empty patches, trims text fields and checks the present ones.
    pub fn validate(self) -> Result<Self> {
        if self.is_empty() {
            return Err(empty_patch());
        }
        let mut v = Validator::new();
        if let Some(value) = self.value {
            v.positive("value", value);
        }
        let description = self
            .description
            .map(|d| v.text("description", &d, 1, MAX_DESCRIPTION_LEN));
        let category = self
            .category
            .map(|c| v.text("category", &c, 1, MAX_CATEGORY_LEN));
        let card_id = v.relation_patch("cardId", self.card_id);
        let subscription_id = v.relation_patch("subscriptionId", self.subscription_id);
        v.finish(Self {
            description,
            category,
            card_id,
            subscription_id,
            ..self
        })
    }
}

/// Query parameters accepted by [`list_transactions`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilters {
    /// Calendar month, 1-12
    pub month: Option<u32>,
    /// Calendar year, 2000-2100
    pub year: Option<i32>,
    /// Only this direction
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    /// Case-insensitive substring of the category
    pub category: Option<String>,
    /// Only transactions on this card
    pub card_id: Option<String>,
    /// Only transactions of this subscription
    pub subscription_id: Option<String>,
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size, 1-50
    pub per_page: Option<u64>,
}

/// Filters after defaults were applied, echoed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFilters {
    /// Calendar month, if filtering by month
    pub month: Option<u32>,
    /// Calendar year; set whenever `month` is
    pub year: Option<i32>,
    /// Direction filter
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    /// Category substring filter
    pub category: Option<String>,
    /// Card filter
    pub card_id: Option<String>,
    /// Subscription filter
    pub subscription_id: Option<String>,
    /// Page number
    pub page: u64,
    /// Page size
    pub per_page: u64,
}

/// Rows skipped before `page`, or `None` when that does not fit a SQL offset.
fn row_offset(page: u64, per_page: u64) -> Option<u64> {
    page.checked_sub(1)?
        .checked_mul(per_page)
        .filter(|offset| i64::try_from(*offset).is_ok())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl TransactionFilters {
    /// Validates ranges and fills defaults. A month without a year uses `current_year`.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] for out-of-range values.
    pub fn normalize(self, current_year: i32) -> Result<AppliedFilters> {
        let mut v = Validator::new();
        if let Some(month) = self.month {
            v.in_range("month", month, 1, 12);
        }
        if let Some(year) = self.year {
            v.in_range("year", year, MIN_FILTER_YEAR, MAX_FILTER_YEAR);
        }
        let page = self.page.unwrap_or(1);
        if page < 1 {
            v.push("page", "must be at least 1");
        }
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE);
        v.in_range("perPage", per_page, 1, MAX_PER_PAGE);
        if page >= 1 && row_offset(page, per_page).is_none() {
            v.push("page", "is too large");
        }

        let year = match (self.month, self.year) {
            (Some(_), None) => Some(current_year),
            (_, year) => year,
        };

        v.finish(AppliedFilters {
            month: self.month,
            year,
            transaction_type: self.transaction_type,
            category: non_blank(self.category),
            card_id: non_blank(self.card_id),
            subscription_id: non_blank(self.subscription_id),
            page,
            per_page,
        })
    }
}

impl AppliedFilters {
    /// UTC date window implied by `month`/`year`, if any.
    pub fn date_window(&self) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>> {
        match (self.month, self.year) {
            (Some(month), Some(year)) => calendar::month_bounds(year, month).map(Some),
            (None, Some(year)) => calendar::year_bounds(year).map(Some),
            _ => Ok(None),
        }
    }

    fn condition(&self, user_id: &str) -> Result<Condition> {
        let mut condition = Condition::all().add(transaction::Column::UserId.eq(user_id));

        if let Some(transaction_type) = self.transaction_type {
            condition = condition.add(transaction::Column::TransactionType.eq(transaction_type));
        }
        if let Some(card_id) = &self.card_id {
            condition = condition.add(transaction::Column::CardId.eq(card_id.as_str()));
        }
        if let Some(subscription_id) = &self.subscription_id {
            condition =
                condition.add(transaction::Column::SubscriptionId.eq(subscription_id.as_str()));
        }
        if let Some((start, end)) = self.date_window()? {
            condition = condition
                .add(transaction::Column::Date.gte(start))
                .add(transaction::Column::Date.lt(end));
        }
        if let Some(category) = &self.category {
            let pattern = format!("%{}%", escape_like(&category.to_lowercase()));
            condition = condition.add(
                Expr::expr(Func::lower(Expr::col(transaction::Column::Category)))
                    .like(LikeExpr::new(pattern).escape('\\')),
            );
        }

        Ok(condition)
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Externally visible projection of a transaction row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    /// Identifier
    pub id: String,
    /// Direction
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Positive amount
    pub value: Decimal,
    /// Description
    pub description: String,
    /// Category
    pub category: String,
    /// Event date
    pub date: DateTime<Utc>,
    /// Card reference
    pub card_id: Option<String>,
    /// Subscription reference
    pub subscription_id: Option<String>,
    /// Creation instant
    pub created_at: DateTime<Utc>,
    /// Last modification instant
    pub updated_at: DateTime<Utc>,
}

impl From<transaction::Model> for TransactionDto {
    fn from(model: transaction::Model) -> Self {
        Self {
            id: model.id,
            transaction_type: model.transaction_type,
            value: model.value,
            description: model.description,
            category: model.category,
            date: model.date,
            card_id: model.card_id,
            subscription_id: model.subscription_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// One page of [`list_transactions`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPage {
    /// Rows on this page, newest first
    pub items: Vec<TransactionDto>,
    /// Rows matching the filters across all pages
    pub total: u64,
    /// Page number
    pub page: u64,
    /// Page size
    pub per_page: u64,
    /// Whether another page follows
    pub has_next_page: bool,
    /// Filters after defaults
    pub applied_filters: AppliedFilters,
}

/// Result of a create or update.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionChange {
    /// The stored transaction
    pub transaction: TransactionDto,
    /// Change in balance caused by the operation
    pub balance_delta: Decimal,
}

/// Result of a delete.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRemoval {
    /// Always true
    pub success: bool,
    /// Reversal of the deleted transaction's contribution
    pub balance_delta: Decimal,
}

/// Loads a transaction and checks it belongs to `user_id`.
async fn find_owned<C>(db: &C, user_id: &str, id: &str) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    let existing = Transaction::find_by_id(id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: EntityKind::Transaction,
            id: id.to_string(),
        })?;

    if existing.user_id != user_id {
        return Err(Error::Forbidden {
            message: "Transaction does not belong to the user".to_string(),
        });
    }
    Ok(existing)
}

/// Lists a user's transactions matching `filters`, newest first.
///
/// Ordering is `date` descending with ties broken by `created_at` descending, so
/// pages stay stable between calls.
#[instrument(skip(db, filters))]
pub async fn list_transactions(
    db: &DatabaseConnection,
    user_id: &str,
    filters: TransactionFilters,
) -> Result<TransactionPage> {
    let applied = filters.normalize(Utc::now().year())?;
    let condition = applied.condition(user_id)?;
    let skip = row_offset(applied.page, applied.per_page).unwrap_or_default();

    let items = Transaction::find()
        .filter(condition.clone())
        .order_by_desc(transaction::Column::Date)
        .order_by_desc(transaction::Column::CreatedAt)
        .offset(skip)
        .limit(applied.per_page)
        .all(db)
        .await?;
    let total = Transaction::find().filter(condition).count(db).await?;

    debug!(total, page = applied.page, "Listed transactions");

    Ok(TransactionPage {
        items: items.into_iter().map(Into::into).collect(),
        total,
        page: applied.page,
        per_page: applied.per_page,
        has_next_page: applied.page.saturating_mul(applied.per_page) < total,
        applied_filters: applied,
    })
}

/// Fetches a single transaction owned by `user_id`.
pub async fn get_transaction(
    db: &DatabaseConnection,
    user_id: &str,
    id: &str,
) -> Result<TransactionDto> {
    find_owned(db, user_id, id).await.map(Into::into)
}

/// Creates a transaction for `user_id`.
///
/// # Errors
/// - [`Error::Validation`] for invalid input
/// - [`Error::ForeignRelationInvalid`] when a referenced card or subscription is not the user's
pub async fn create_transaction(
    db: &DatabaseConnection,
    user_id: &str,
    input: NewTransaction,
) -> Result<TransactionChange> {
    let input = input.validate()?;

    assert_ownership(
        db,
        user_id,
        RelationRefs {
            card_id: input.card_id.as_deref(),
            subscription_id: input.subscription_id.as_deref(),
        },
    )
    .await?;

    let now = Utc::now();
    let created = transaction::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        transaction_type: Set(input.transaction_type),
        value: Set(input.value),
        description: Set(input.description),
        category: Set(input.category),
        date: Set(input.date),
        card_id: Set(input.card_id),
        subscription_id: Set(input.subscription_id),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    let balance_delta = contribution(created.transaction_type, created.value);
    info!(transaction_id = %created.id, %balance_delta, "Created transaction");

    Ok(TransactionChange {
        transaction: created.into(),
        balance_delta,
    })
}

/// Applies `patch` to a transaction owned by `user_id`.
///
/// Existence and ownership are checked before the patch is validated, so a
/// foreign transaction is always reported as `FORBIDDEN`.
///
/// # Errors
/// - [`Error::NotFound`] / [`Error::Forbidden`] for missing or foreign transactions
/// - [`Error::Validation`] for an empty or invalid patch
/// - [`Error::ForeignRelationInvalid`] for references the user does not own
pub async fn update_transaction(
    db: &DatabaseConnection,
    user_id: &str,
    id: &str,
    patch: TransactionPatch,
) -> Result<TransactionChange> {
    let txn = db.begin().await?;

    let existing = find_owned(&txn, user_id, id).await?;
    let patch = patch.validate()?;

    assert_ownership(
        &txn,
        user_id,
        RelationRefs {
            card_id: patch.card_id.as_set(),
            subscription_id: patch.subscription_id.as_set(),
        },
    )
    .await?;

    let previous = contribution(existing.transaction_type, existing.value);
    let card_id = patch.card_id.apply(existing.card_id.clone());
    let subscription_id = patch.subscription_id.apply(existing.subscription_id.clone());

    let mut active: transaction::ActiveModel = existing.into();
    if let Some(transaction_type) = patch.transaction_type {
        active.transaction_type = Set(transaction_type);
    }
    if let Some(value) = patch.value {
        active.value = Set(value);
    }
    if let Some(description) = patch.description {
        active.description = Set(description);
    }
    if let Some(category) = patch.category {
        active.category = Set(category);
    }
    if let Some(date) = patch.date {
        active.date = Set(date);
    }
    active.card_id = Set(card_id);
    active.subscription_id = Set(subscription_id);
    active.updated_at = Set(Utc::now());

    let updated = active.update(&txn).await?;
    txn.commit().await?;

    let balance_delta = contribution(updated.transaction_type, updated.value) - previous;
    info!(transaction_id = %updated.id, %balance_delta, "Updated transaction");

    Ok(TransactionChange {
        transaction: updated.into(),
        balance_delta,
    })
}

/// Deletes a transaction owned by `user_id` and returns the reversal of its contribution.
pub async fn delete_transaction(
    db: &DatabaseConnection,
    user_id: &str,
    id: &str,
) -> Result<TransactionRemoval> {
    let txn = db.begin().await?;

    let existing = find_owned(&txn, user_id, id).await?;
    let balance_delta = -contribution(existing.transaction_type, existing.value);
    Transaction::delete_by_id(existing.id.clone()).exec(&txn).await?;

    txn.commit().await?;
    info!(transaction_id = %existing.id, %balance_delta, "Deleted transaction");

    Ok(TransactionRemoval {
        success: true,
        balance_delta,
    })
}
