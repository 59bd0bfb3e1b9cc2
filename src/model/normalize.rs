//! The single choke point that turns a `Draft` into a `Transaction`.
//!
//! Drafts from forms, from the AI extraction service, from remote rows and from the saved mirror
//! all pass through `Normalizer::normalize`. It never fails: every missing or malformed field is
//! replaced with a default, and the result always satisfies the `Transaction` split invariants.

use crate::model::member::fold_alias;
use crate::model::{
    parse_date, today, Amount, Draft, Member, SplitType, Transaction, TransactionType,
    FALLBACK_CATEGORY,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::trace;
use uuid::Uuid;

/// Item text for a transaction that arrived without one.
pub const PLACEHOLDER_ITEM: &str = "新紀錄";

/// Merchant name for a transaction that arrived without one.
pub const PLACEHOLDER_MERCHANT: &str = "商家";

/// Holds the context that defaults are drawn from.
#[derive(Debug, Clone)]
pub struct Normalizer {
    members: Vec<Member>,
    categories: Vec<String>,
    current_user: String,
    today: NaiveDate,
}

impl Normalizer {
    /// - `members` - everyone who takes part in a split that names no participants
    /// - `categories` - the category whitelist. When empty, any non-blank category is accepted
    /// - `current_user` - the payer of a draft that names none
    pub fn new(members: Vec<Member>, categories: Vec<String>, current_user: impl Into<String>) -> Self {
        Self {
            members,
            categories,
            current_user: current_user.into(),
            today: today(),
        }
    }

    /// Overrides the date used for drafts without a usable date.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Accepts `category` in addition to the whitelist. Has no effect on an empty whitelist, which
    /// already accepts everything.
    pub fn accepting(mut self, category: &str) -> Self {
        let category = category.trim();
        if !self.categories.is_empty()
            && !category.is_empty()
            && !self.categories.iter().any(|c| c == category)
        {
            self.categories.push(category.to_string());
        }
        self
    }

    pub fn normalize(&self, draft: Draft) -> Transaction {
        trace!("normalizing {draft:?}");
        let payer_id = self.payer(draft.payer_id.as_deref());
        let split_with = self.split_with(draft.split_with, &payer_id);
        let split_type = draft.split_type.unwrap_or_default();
        let split_details = match split_type {
            SplitType::Equal => BTreeMap::new(),
            SplitType::Custom => fold_details(draft.split_details.unwrap_or_default()),
        };

        Transaction {
            id: non_blank(draft.id).unwrap_or_else(|| Uuid::new_v4().to_string()),
            row_index: draft.row_index,
            date: draft
                .date
                .as_deref()
                .and_then(parse_date)
                .unwrap_or(self.today),
            kind: draft
                .kind
                .as_deref()
                .map(TransactionType::coerce)
                .unwrap_or_default(),
            category: self.category(draft.category),
            amount: draft.amount.unwrap_or_default().abs(),
            merchant: non_blank(draft.merchant).unwrap_or_else(|| PLACEHOLDER_MERCHANT.to_string()),
            item: non_blank(draft.item).unwrap_or_else(|| PLACEHOLDER_ITEM.to_string()),
            map_url: non_blank(draft.map_url),
            payer_id,
            is_split: split_with.len() > 1,
            split_type,
            split_with,
            split_details,
        }
    }

    fn payer(&self, payer_id: Option<&str>) -> String {
        let payer = payer_id.map(fold_alias).unwrap_or_default();
        if !payer.is_empty() {
            return payer;
        }
        let current = fold_alias(&self.current_user);
        if !current.is_empty() {
            return current;
        }
        self.members
            .first()
            .map(|m| m.id.clone())
            .unwrap_or_default()
    }

    fn split_with(&self, split_with: Option<Vec<String>>, payer_id: &str) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for name in split_with.unwrap_or_default() {
            let id = fold_alias(&name);
            if !id.is_empty() && !ids.contains(&id) {
                ids.push(id);
            }
        }
        if ids.is_empty() {
            ids = self.members.iter().map(|m| m.id.clone()).collect();
        }
        if ids.is_empty() && !payer_id.is_empty() {
            ids.push(payer_id.to_string());
        }
        ids
    }

    fn category(&self, category: Option<String>) -> String {
        match non_blank(category) {
            Some(c) if self.categories.is_empty() || self.categories.contains(&c) => c,
            _ => self.fallback_category(),
        }
    }

    fn fallback_category(&self) -> String {
        if self.categories.is_empty() || self.categories.iter().any(|c| c == FALLBACK_CATEGORY) {
            FALLBACK_CATEGORY.to_string()
        } else {
            self.categories
                .last()
                .cloned()
                .unwrap_or_else(|| FALLBACK_CATEGORY.to_string())
        }
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn fold_details(details: BTreeMap<String, Amount>) -> BTreeMap<String, Amount> {
    let mut folded = BTreeMap::new();
    for (name, share) in details {
        let id = fold_alias(&name);
        if id.is_empty() {
            continue;
        }
        let entry: &mut Amount = folded.entry(id).or_default();
        *entry = *entry + share.abs();
    }
    folded
}
