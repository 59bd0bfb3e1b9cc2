use crate::model::member::MANDY;
use crate::model::{default_categories, default_members, Draft, Member, Normalizer, Transaction};
use serde::{Deserialize, Serialize};

/// The color theme of the application.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Piggy,
    Matcha,
}

serde_plain::derive_display_from_serialize!(Theme);
serde_plain::derive_fromstr_from_deserialize!(Theme);

/// Everything the ledger knows. Owned by the `Ledger`, which is the only thing that mutates it, and
/// saved wholesale to the local mirror after every change.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub members: Vec<Member>,
    pub categories: Vec<String>,
    pub transactions: Vec<Transaction>,
    pub current_user: String,
    pub theme: Theme,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_endpoint: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            members: default_members(),
            categories: default_categories(),
            transactions: Vec::new(),
            current_user: MANDY.to_string(),
            theme: Theme::default(),
            remote_endpoint: None,
        }
    }
}

impl AppState {
    /// A normalizer for user-entered drafts, which are held to the current category whitelist.
    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(
            self.members.clone(),
            self.categories.clone(),
            self.current_user.clone(),
        )
    }

    /// Like `normalizer`, except that a draft editing a stored transaction may keep the category
    /// that transaction already has, even one outside the whitelist.
    pub fn normalizer_for(&self, draft: &Draft) -> Normalizer {
        let stored = draft.id.as_deref().and_then(|id| self.find(id.trim()));
        match stored {
            Some(t) => self.normalizer().accepting(&t.category),
            None => self.normalizer(),
        }
    }

    pub fn is_member(&self, id: &str) -> bool {
        self.members.iter().any(|m| m.id == id)
    }

    /// The member after the current user, wrapping around.
    pub fn next_user(&self) -> String {
        let position = self
            .members
            .iter()
            .position(|m| m.id == self.current_user);
        let next = match position {
            Some(ix) => self.members.get((ix + 1) % self.members.len()),
            None => self.members.first(),
        };
        next.map(|m| m.id.clone())
            .unwrap_or_else(|| self.current_user.clone())
    }

    pub fn find(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }
}
