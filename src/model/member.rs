//! Household members and the folding of name aliases into canonical member ids.

use serde::{Deserialize, Serialize};

/// Canonical id of the member the ledger is named after.
pub const PIGGY: &str = "小豬";

/// Canonical id of the other household member.
pub const MANDY: &str = "Mandy";

/// Lower-cased alias -> canonical member id.
const ALIASES: &[(&str, &str)] = &[("piggy", PIGGY), ("小豬", PIGGY), ("mandy", MANDY)];

/// A member of the household.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
}

impl Member {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The built-in two-member household.
pub fn default_members() -> Vec<Member> {
    vec![Member::new(MANDY, MANDY), Member::new(PIGGY, PIGGY)]
}

/// Folds a free-text member name into its canonical id. Matching is case-insensitive and ignores
/// surrounding whitespace. Unknown names pass through trimmed so that new members work without a
/// table change.
pub fn fold_alias(name: &str) -> String {
    let trimmed = name.trim();
    let lower = trimmed.to_lowercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}
