//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod card;
pub mod session;
pub mod subscription;
pub mod transaction;
pub mod user;

// Re-export specific types to avoid conflicts
pub use card::{CardType, Column as CardColumn, Entity as Card, Model as CardModel};
pub use session::{Column as SessionColumn, Entity as Session, Model as SessionModel};
pub use subscription::{
    Column as SubscriptionColumn, Entity as Subscription, Model as SubscriptionModel,
};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
    TransactionType,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
