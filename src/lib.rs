// Expense Tracker - Core Library
// Exposes the record store for use in the CLI, the terminal UI, and tests

pub mod codec;
pub mod form;
pub mod record;
pub mod settings;
pub mod store;

// Re-export commonly used types
pub use codec::{decode, encode, DecodeError, FORMAT_VERSION};
pub use form::{AddExpenseForm, AmountTier, FormError, FormField, CATEGORIES, DEFAULT_CATEGORY};
pub use record::Record;
pub use settings::{setup_settings, KeyValueStore, MemorySettings, SqliteSettings};
pub use store::{ExpenseStore, SharedExpenseStore, StoreError, SubscriptionId, DEFAULT_KEY};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
