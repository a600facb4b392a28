/// UTC calendar arithmetic for month windows and billing days
pub mod calendar;

/// Recurring billing job that turns subscriptions into monthly charges
pub mod billing;

/// Card service: encrypted numbers, names and colors
pub mod card;

/// AES-256-GCM encryption of card numbers
pub mod cipher;

/// Users and bearer sessions
pub mod identity;

/// Ownership checks for card and subscription references
pub mod ownership;

/// Demo data for local development
pub mod seed;

/// Subscription service: recurring charge definitions
pub mod subscription;

/// Transaction ledger: filtering, pagination and balance deltas
pub mod transaction;

/// Shared input validation helpers
pub mod validation;
