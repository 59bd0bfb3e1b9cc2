//! The split codec: converts a transaction's participants and shares to and from the single text
//! cell the remote store keeps them in.
//!
//! The cell is a comma-separated list of tokens. A bare token is a member taking an equal share,
//! a `name:amount` token is a member with an explicitly assigned share:
//!
//! - `Mandy, 小豬` is an equal split between two members.
//! - `小豬:30, Mandy:70` is a custom split.
//!
//! Names are alias-folded on the way in, so `piggy` and `小豬` decode to the same member.

use crate::model::member::fold_alias;
use crate::model::{Amount, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

const TOKEN_SEPARATOR: char = ',';
const SHARE_SEPARATOR: char = ':';
const JOINER: &str = ", ";

/// How a transaction's amount is apportioned among its participants.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitType {
    #[default]
    Equal,
    Custom,
}

serde_plain::derive_display_from_serialize!(SplitType);
serde_plain::derive_fromstr_from_deserialize!(SplitType);

impl SplitType {
    /// Anything other than an explicit `custom` is an equal split.
    pub fn coerce(s: &str) -> Self {
        match SplitType::from_str(s.trim().to_lowercase().as_str()) {
            Ok(split_type) => split_type,
            Err(_) => SplitType::Equal,
        }
    }
}

/// The decoded form of a split cell.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Split {
    /// Participants in cell order, without duplicates.
    pub with: Vec<String>,
    /// Assigned shares. Only populated for custom splits.
    pub details: BTreeMap<String, Amount>,
    pub split_type: SplitType,
}

/// Encodes the split of `t` into the remote cell format. A transaction that is not split encodes
/// to an empty string.
pub fn encode(t: &Transaction) -> String {
    if !t.is_split {
        return String::new();
    }
    match t.split_type {
        SplitType::Equal => t.split_with.join(JOINER),
        SplitType::Custom => t
            .split_with
            .iter()
            .map(|id| {
                let share = t.split_details.get(id).copied().unwrap_or_default();
                format!("{id}{SHARE_SEPARATOR}{}", share.plain())
            })
            .collect::<Vec<_>>()
            .join(JOINER),
    }
}

/// Decodes a remote split cell. Never fails:
/// - tokens with an empty name are dropped;
/// - a share that is not numeric is ignored, leaving the member as an equal participant;
/// - a single numeric share anywhere makes the whole split custom;
/// - a repeated member keeps its first position and accumulates its shares;
/// - when no participant survives, `payer` becomes the sole participant.
pub fn decode(cell: &str, payer: &str) -> Split {
    let mut with: Vec<String> = Vec::new();
    let mut details: BTreeMap<String, Amount> = BTreeMap::new();

    for token in cell.split(TOKEN_SEPARATOR) {
        let token = token.trim();
        let (name, share) = match token.split_once(SHARE_SEPARATOR) {
            Some((name, share)) => (name, Some(share.trim())),
            None => (token, None),
        };
        let name = fold_alias(name);
        if name.is_empty() {
            continue;
        }
        if !with.contains(&name) {
            with.push(name.clone());
        }
        let share = share
            .filter(|s| !s.is_empty())
            .and_then(|s| Amount::from_str(s).ok())
            .map(|share| share.abs());
        if let Some(share) = share {
            let entry = details.entry(name).or_default();
            *entry = *entry + share;
        }
    }

    if with.is_empty() {
        let payer = fold_alias(payer);
        if !payer.is_empty() {
            with.push(payer);
        }
    }

    let split_type = if details.is_empty() {
        SplitType::Equal
    } else {
        SplitType::Custom
    };

    Split {
        with,
        details,
        split_type,
    }
}
