// Add Expense Form - view state behind the "add new expense" screen
//
// Holds the raw text the user typed, turns it into a Record on submit,
// and rejects amounts that do not parse as an integer.

use crate::record::Record;
use thiserror::Error;

/// Categories offered by the picker
pub const CATEGORIES: [&str; 2] = ["Business", "Personal"];

/// Category selected when the form opens
pub const DEFAULT_CATEGORY: &str = "Personal";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("You can't type '{0}', please type some money amount that you expect to spend or get")]
    InvalidAmount(String),
}

impl FormError {
    /// Title shown above the message
    pub fn title(&self) -> &'static str {
        match self {
            FormError::InvalidAmount(_) => "Amount error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Category,
    Amount,
}

impl FormField {
    pub fn next(&self) -> Self {
        match self {
            FormField::Name => FormField::Category,
            FormField::Category => FormField::Amount,
            FormField::Amount => FormField::Name,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            FormField::Name => FormField::Amount,
            FormField::Category => FormField::Name,
            FormField::Amount => FormField::Category,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AddExpenseForm {
    pub name: String,
    pub category: String,
    pub amount: String,
    pub focus: FormField,
}

impl Default for AddExpenseForm {
    fn default() -> Self {
        AddExpenseForm {
            name: String::new(),
            category: DEFAULT_CATEGORY.to_string(),
            amount: String::new(),
            focus: FormField::Name,
        }
    }
}

impl AddExpenseForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the picker to the next category, wrapping around
    pub fn next_category(&mut self) {
        let current = CATEGORIES.iter().position(|c| *c == self.category);
        let next = match current {
            Some(i) => (i + 1) % CATEGORIES.len(),
            None => 0,
        };
        self.category = CATEGORIES[next].to_string();
    }

    /// Move the picker to the previous category, wrapping around
    pub fn previous_category(&mut self) {
        let current = CATEGORIES.iter().position(|c| *c == self.category);
        let previous = match current {
            Some(0) | None => CATEGORIES.len() - 1,
            Some(i) => i - 1,
        };
        self.category = CATEGORIES[previous].to_string();
    }

    /// Type a character into the focused text field
    pub fn push_char(&mut self, c: char) {
        match self.focus {
            FormField::Name => self.name.push(c),
            FormField::Amount => self.amount.push(c),
            FormField::Category => {}
        }
    }

    /// Delete the last character of the focused text field
    pub fn pop_char(&mut self) {
        match self.focus {
            FormField::Name => {
                self.name.pop();
            }
            FormField::Amount => {
                self.amount.pop();
            }
            FormField::Category => {}
        }
    }

    /// Build a record from the form, parsing the amount as an integer
    ///
    /// The amount text is parsed as typed, surrounding whitespace included.
    pub fn submit(&self) -> Result<Record, FormError> {
        let amount: i64 = self
            .amount
            .parse()
            .map_err(|_| FormError::InvalidAmount(self.amount.clone()))?;

        Ok(Record::new(self.name.clone(), self.category.clone(), amount))
    }
}

// ============================================================================
// AMOUNT TIERS (color-coding)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountTier {
    /// Below 10
    Low,
    /// 10 up to 99
    Medium,
    /// 100 and above
    High,
}

impl AmountTier {
    pub fn of(amount: i64) -> Self {
        if amount < 10 {
            AmountTier::Low
        } else if amount < 100 {
            AmountTier::Medium
        } else {
            AmountTier::High
        }
    }
}
