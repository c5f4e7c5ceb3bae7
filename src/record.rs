// Expense Record - one entry in the expense list
//
// Identity is the UUID. Name, category and amount are plain values.
// The store never validates them; that belongs to the form.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single expense entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Stable identity (UUID v4) - generated once, never reused
    pub id: Uuid,

    /// Free-text label (e.g., "Coffee", "Laptop")
    pub name: String,

    /// Category label, "Business" or "Personal" in the UI
    /// Older blobs stored this under "type"
    #[serde(alias = "type")]
    pub category: String,

    /// Unit-less integer amount, may be negative
    pub amount: i64,
}

impl Record {
    /// Create a new record with a fresh UUID
    pub fn new(name: impl Into<String>, category: impl Into<String>, amount: i64) -> Self {
        Record {
            id: Uuid::new_v4(),
            name: name.into(),
            category: category.into(),
            amount,
        }
    }

    /// Get identity (stable UUID)
    pub fn identity(&self) -> &Uuid {
        &self.id
    }
}
