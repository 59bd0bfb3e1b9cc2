//! Command handlers for the piggy CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod add;
mod analyze;
mod delete;
mod init;
mod preferences;
mod show;
mod sync;
mod update;

use crate::args::TransactionFields;
use crate::model::{split, Draft, Transaction};
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use add::add;
pub use analyze::{analyze, Analysis};
pub use delete::delete;
pub use init::init;
pub use preferences::{theme, user};
pub use show::{categories, list, summary};
pub use sync::sync;
pub use update::update;

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Overlays the fields given on the command line onto `draft`. `--split` is decoded with the same
/// codec as the remote split column, falling back to the draft's payer, then `current_user`.
fn apply_fields(draft: &mut Draft, fields: &TransactionFields, current_user: &str) {
    set(&mut draft.item, fields.item());
    set(&mut draft.merchant, fields.merchant());
    set(&mut draft.category, fields.category());
    set(&mut draft.kind, fields.kind());
    set(&mut draft.date, fields.date());
    set(&mut draft.payer_id, fields.payer());
    set(&mut draft.map_url, fields.map_url());
    if let Some(cell) = fields.split() {
        let payer = draft.payer_id.as_deref().unwrap_or(current_user);
        let split = split::decode(cell, payer);
        draft.split_type = Some(split.split_type);
        draft.split_with = Some(split.with);
        draft.split_details = Some(split.details);
    }
}

fn set(target: &mut Option<String>, value: Option<&str>) {
    if let Some(value) = value {
        *target = Some(value.to_string());
    }
}

/// One line describing `t` for listings.
fn describe(t: &Transaction) -> String {
    let split = match split::encode(t) {
        s if s.is_empty() => String::new(),
        s => format!(" split {s}"),
    };
    let row = match t.row_index {
        Some(row) => format!("row {row}"),
        None => "not synced".to_string(),
    };
    format!(
        "{} {} {} {} {} / {} paid by {}{} [{}, {}]",
        t.date, t.kind, t.category, t.amount, t.merchant, t.item, t.payer_id, split, t.id, row
    )
}

fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{count} {}", if count == 1 { one } else { many })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::member::{MANDY, PIGGY};
    use crate::model::{test_transaction, Amount, SplitType};

    #[test]
    fn test_apply_fields_custom_split() {
        let mut draft = Draft::default();
        let fields = TransactionFields::default()
            .with_item("高鐵")
            .with_split("piggy:700, mandy:500");
        apply_fields(&mut draft, &fields, MANDY);
        assert_eq!(draft.item.as_deref(), Some("高鐵"));
        assert_eq!(draft.split_type, Some(SplitType::Custom));
        assert_eq!(draft.split_with, Some(vec![PIGGY.to_string(), MANDY.to_string()]));
        assert_eq!(
            draft.split_details.unwrap().get(PIGGY),
            Some(&Amount::from(700))
        );
        assert!(draft.payer_id.is_none());
    }

    #[test]
    fn test_apply_fields_empty_split_falls_back_to_payer() {
        let mut draft = Draft::default();
        let fields = TransactionFields::default()
            .with_payer("小豬")
            .with_split(" , ");
        apply_fields(&mut draft, &fields, MANDY);
        assert_eq!(draft.split_with, Some(vec![PIGGY.to_string()]));
        assert_eq!(draft.split_type, Some(SplitType::Equal));
    }

    #[test]
    fn test_describe() {
        let mut t = test_transaction(100);
        let line = describe(&t);
        assert!(line.starts_with("2024-05-01 支出 餐飲 $100 早餐店 / 蛋餅 paid by Mandy"));
        assert!(line.ends_with("[t-1, not synced]"));
        t.row_index = Some(7);
        assert!(describe(&t).contains("split Mandy, 小豬 [t-1, row 7]"));
    }
}
