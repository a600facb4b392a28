//! Card business logic
//!
//! Logical payment cards. The full number is sanitized to digits, encrypted with
//! the [`CardCipher`] and never read back; only the last four digits are kept in
//! plaintext. After creation only `name` and `color` can change.

use crate::{
    core::{
        cipher::{self, CardCipher, LAST_DIGITS_LEN},
        validation::{Validator, empty_patch},
    },
    entities::{Card, CardType, card},
    errors::{EntityKind, Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

/// Longest accepted card name, in characters.
pub const MAX_NAME_LEN: usize = 120;
/// Minimum number of characters (and of digits) in a card number.
pub const MIN_NUMBER_LEN: usize = 8;
/// Maximum number of characters in a raw card number.
pub const MAX_NUMBER_LEN: usize = 32;

/// Input for [`create_card`].
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCard {
    /// 1-120 characters after trimming
    pub name: String,
    /// `CREDIT` or `SUBSCRIPTION`
    #[serde(rename = "type")]
    pub card_type: CardType,
    /// Raw number as typed by the user; separators are allowed
    pub number: String,
    /// Optional display color
    #[serde(default)]
    pub color: Option<String>,
}

// Keeps the raw number out of logs
impl std::fmt::Debug for NewCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewCard")
            .field("name", &self.name)
            .field("card_type", &self.card_type)
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}

/// A validated card, with the number reduced to digits.
struct ValidCard {
    name: String,
    card_type: CardType,
    digits: String,
    color: Option<String>,
}

/// Trimmed color, `None` when blank.
fn normalize_color(color: &str) -> Option<String> {
    let color = color.trim();
    (!color.is_empty()).then(|| color.to_string())
}

impl NewCard {
    fn validate(self) -> Result<ValidCard> {
        let mut v = Validator::new();
        let name = v.text("name", &self.name, 1, MAX_NAME_LEN);
        let number = v.text("number", &self.number, MIN_NUMBER_LEN, MAX_NUMBER_LEN);
        let digits = cipher::sanitize(&number);
        if number.chars().count() >= MIN_NUMBER_LEN && digits.len() < MIN_NUMBER_LEN {
            v.push(
                "number",
                format!("must contain at least {MIN_NUMBER_LEN} digits"),
            );
        }
        let color = self.color.as_deref().and_then(normalize_color);
        v.finish(ValidCard {
            name,
            card_type: self.card_type,
            digits,
            color,
        })
    }
}

/// Input for [`update_card`]. At least one of `name` or `color` is required.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPatch {
    /// Card to update
    pub id: String,
    /// New name
    #[serde(default)]
    pub name: Option<String>,
    /// New color; a blank string removes it
    #[serde(default)]
    pub color: Option<String>,
}

/// Externally visible projection of a card. Never carries the number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDto {
    /// Identifier
    pub id: String,
    /// Label
    pub name: String,
    /// Kind of card
    #[serde(rename = "type")]
    pub card_type: CardType,
    /// Plaintext last four digits
    pub last_digits: String,
    /// Display color
    pub color: Option<String>,
    /// Creation instant
    pub created_at: DateTime<Utc>,
    /// Last modification instant
    pub updated_at: DateTime<Utc>,
}

impl From<card::Model> for CardDto {
    fn from(model: card::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            card_type: model.card_type,
            last_digits: model.last_digits,
            color: model.color,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Lists a user's cards, newest first.
#[instrument(skip(db))]
pub async fn list_cards(db: &DatabaseConnection, user_id: &str) -> Result<Vec<CardDto>> {
    let cards = Card::find()
        .filter(card::Column::UserId.eq(user_id))
        .order_by_desc(card::Column::CreatedAt)
        .all(db)
        .await?;

    Ok(cards.into_iter().map(Into::into).collect())
}

/// Creates a card for `user_id`, storing the number encrypted.
///
/// # Errors
/// - [`Error::Validation`] for invalid input, including numbers with fewer than 8 digits
/// - [`Error::Authentication`] if encryption fails
pub async fn create_card(
    db: &DatabaseConnection,
    cipher: &CardCipher,
    user_id: &str,
    input: NewCard,
) -> Result<CardDto> {
    let input = input.validate()?;

    let encrypted_number = cipher.encrypt(&input.digits)?;
    let now = Utc::now();
    let created = card::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        name: Set(input.name),
        card_type: Set(input.card_type),
        encrypted_number: Set(encrypted_number),
        last_digits: Set(cipher::last_digits(&input.digits, LAST_DIGITS_LEN)),
        color: Set(input.color),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    info!(card_id = %created.id, last_digits = %created.last_digits, "Created card");
    Ok(created.into())
}

/// Renames or recolors a card owned by `user_id`.
///
/// # Errors
/// - [`Error::NotFound`] / [`Error::Forbidden`] for missing or foreign cards
/// - [`Error::Validation`] when neither field is present or a field is invalid
pub async fn update_card(
    db: &DatabaseConnection,
    user_id: &str,
    patch: CardPatch,
) -> Result<CardDto> {
    let txn = db.begin().await?;

    let existing = Card::find_by_id(patch.id.clone())
        .one(&txn)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: EntityKind::Card,
            id: patch.id.clone(),
        })?;
    if existing.user_id != user_id {
        return Err(Error::Forbidden {
            message: "Card does not belong to the user".to_string(),
        });
    }

    if patch.name.is_none() && patch.color.is_none() {
        return Err(empty_patch());
    }
    let mut v = Validator::new();
    let name = patch.name.map(|n| v.text("name", &n, 1, MAX_NAME_LEN));
    let color = patch.color.as_deref().map(normalize_color);
    let (name, color) = v.finish((name, color))?;

    let mut active: card::ActiveModel = existing.into();
    if let Some(name) = name {
        active.name = Set(name);
    }
    if let Some(color) = color {
        active.color = Set(color);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&txn).await?;
    txn.commit().await?;

    info!(card_id = %updated.id, "Updated card");
    Ok(updated.into())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn new_card(number: &str) -> NewCard {
        NewCard {
            name: "Everyday".to_string(),
            card_type: CardType::Credit,
            number: number.to_string(),
            color: Some(" #4f46e5 ".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_card_encrypts_number() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let cipher = test_cipher();

        let dto = create_card(&db, &cipher, &user.id, new_card("4111 1111 1111 1234")).await?;
        assert_eq!(dto.last_digits, "1234");
        assert_eq!(dto.color.as_deref(), Some("#4f46e5"));

        let stored = Card::find_by_id(dto.id.clone()).one(&db).await?.unwrap();
        assert_ne!(stored.encrypted_number, "4111111111111234");
        assert_eq!(cipher.decrypt(&stored.encrypted_number)?, "4111111111111234");

        let json = serde_json::to_string(&dto)?;
        assert!(!json.contains("4111111111111234"));
        assert!(!json.contains(&stored.encrypted_number));
        assert!(!json.contains("encryptedNumber"));
        assert!(json.contains(r#""type":"CREDIT""#));
        assert!(json.contains(r#""lastDigits":"1234""#));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_card_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let cipher = test_cipher();

        let too_long = "1".repeat(33);
        for number in ["1234567", "abcd-efgh-12", too_long.as_str()] {
            let result = create_card(&db, &cipher, "user-1", new_card(number)).await;
            match result {
                Err(Error::Validation { issues, .. }) => {
                    assert!(issues.iter().any(|i| i.field == "number"), "{number}");
                }
                other => panic!("expected validation error for {number}, got {other:?}"),
            }
        }

        let mut unnamed = new_card("4111111111111234");
        unnamed.name = "  ".to_string();
        let result = create_card(&db, &cipher, "user-1", unnamed).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_cards_only_returns_own() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let other = create_test_user(&db, "other@example.com").await?;
        let cipher = test_cipher();

        create_card(&db, &cipher, &user.id, new_card("4111111111111234")).await?;
        create_card(&db, &cipher, &other.id, new_card("5500000000000004")).await?;

        let cards = list_cards(&db, &user.id).await?;
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].last_digits, "1234");
        Ok(())
    }

    #[tokio::test]
    async fn test_update_card_name_and_color() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let cipher = test_cipher();
        let created = create_card(&db, &cipher, &user.id, new_card("4111111111111234")).await?;

        let updated = update_card(
            &db,
            &user.id,
            CardPatch {
                id: created.id.clone(),
                name: Some("  Travel  ".to_string()),
                color: None,
            },
        )
        .await?;
        assert_eq!(updated.name, "Travel");
        assert_eq!(updated.color, created.color);
        assert_eq!(updated.last_digits, "1234");

        let updated = update_card(
            &db,
            &user.id,
            CardPatch {
                id: created.id.clone(),
                name: None,
                color: Some(String::new()),
            },
        )
        .await?;
        assert_eq!(updated.color, None);

        // Colors are free-form, any length
        let gradient = "linear-gradient(90deg, #4f46e5 0%, #06b6d4 100%)";
        let updated = update_card(
            &db,
            &user.id,
            CardPatch {
                id: created.id.clone(),
                name: None,
                color: Some(format!(" {gradient} ")),
            },
        )
        .await?;
        assert_eq!(updated.color.as_deref(), Some(gradient));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_card_errors() -> Result<()> {
        let (db, owner) = setup_with_user().await?;
        let intruder = create_test_user(&db, "intruder@example.com").await?;
        let card = create_test_card(&db, &owner.id).await?;

        let rename = |id: &str| CardPatch {
            id: id.to_string(),
            name: Some("Renamed".to_string()),
            color: None,
        };

        let result = update_card(&db, &owner.id, rename("missing")).await;
        assert!(matches!(
            result,
            Err(Error::NotFound {
                entity: EntityKind::Card,
                ..
            })
        ));

        let result = update_card(&db, &intruder.id, rename(&card.id)).await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));

        let empty = CardPatch {
            id: card.id.clone(),
            name: None,
            color: None,
        };
        let result = update_card(&db, &owner.id, empty).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }
}
