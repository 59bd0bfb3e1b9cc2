use crate::model::{Amount, Draft, SplitType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;
use url::Url;

const MAP_SEARCH_URL: &str = "https://www.google.com/maps/search/";

/// The closed set of transaction types. The serialized names are the labels the remote store
/// uses in its type column.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    #[default]
    #[serde(rename = "支出")]
    Expense,
    #[serde(rename = "收入")]
    Income,
    #[serde(rename = "公帳")]
    SharedAccount,
    #[serde(rename = "私帳")]
    PrivateAccount,
}

serde_plain::derive_display_from_serialize!(TransactionType);
serde_plain::derive_fromstr_from_deserialize!(TransactionType);

impl TransactionType {
    /// Reads a remote label or an English name. Anything unrecognized is an expense.
    pub fn coerce(s: &str) -> Self {
        let s = s.trim();
        if let Ok(t) = TransactionType::from_str(s) {
            return t;
        }
        match s.to_lowercase().replace('_', "-").as_str() {
            "income" => TransactionType::Income,
            "shared-account" | "shared" => TransactionType::SharedAccount,
            "private-account" | "private" => TransactionType::PrivateAccount,
            _ => TransactionType::Expense,
        }
    }
}

/// A fully-normalized ledger entry. Values of this type are only produced by the `Normalizer`, so
/// every `Transaction` satisfies the split invariants: `split_with` is non-empty and `is_split` is
/// true exactly when more than one member shares the cost.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    /// The remote store's row position. `None` until the record has been seen in a remote read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_index: Option<u32>,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: String,
    pub amount: Amount,
    pub merchant: String,
    pub item: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_url: Option<String>,
    pub payer_id: String,
    pub is_split: bool,
    pub split_type: SplitType,
    pub split_with: Vec<String>,
    #[serde(default)]
    pub split_details: BTreeMap<String, Amount>,
}

impl Transaction {
    /// Whether the remote store has confirmed this record.
    pub fn is_confirmed(&self) -> bool {
        self.row_index.is_some()
    }

    /// The ordering used for every listing: date descending, then row index descending. Records
    /// that have not been confirmed remotely are the newest of their day.
    pub fn cmp_recent(&self, other: &Self) -> Ordering {
        other
            .date
            .cmp(&self.date)
            .then_with(|| row_rank(other.row_index).cmp(&row_rank(self.row_index)))
    }

    /// A link to the merchant on a map: the stored `map_url` when it is a web link, otherwise a
    /// map search for the merchant name.
    pub fn map_link(&self) -> String {
        if let Some(url) = self.map_url.as_deref() {
            if url.starts_with("http") {
                return url.to_string();
            }
        }
        match Url::parse_with_params(MAP_SEARCH_URL, &[("api", "1"), ("query", &self.merchant)]) {
            Ok(url) => url.to_string(),
            Err(_) => MAP_SEARCH_URL.to_string(),
        }
    }

    /// Adds `member_id` to the split, or removes it if already present. The last participant
    /// cannot be removed. Returns whether anything changed.
    pub fn toggle_split_member(&mut self, member_id: &str) -> bool {
        if let Some(pos) = self.split_with.iter().position(|id| id == member_id) {
            if self.split_with.len() == 1 {
                return false;
            }
            self.split_with.remove(pos);
        } else {
            self.split_with.push(member_id.to_string());
        }
        self.is_split = self.split_with.len() > 1;
        true
    }

    /// Assigns a custom share from user input. Input that is not a number becomes zero.
    pub fn set_custom_share(&mut self, member_id: &str, value: &str) {
        self.split_details
            .insert(member_id.to_string(), Amount::coerce_str(value));
    }

    /// Converts back into a `Draft` with every field present, for editing.
    pub fn to_draft(&self) -> Draft {
        Draft {
            id: Some(self.id.clone()),
            row_index: self.row_index,
            date: Some(self.date.format("%Y-%m-%d").to_string()),
            kind: Some(self.kind.to_string()),
            category: Some(self.category.clone()),
            amount: Some(self.amount),
            merchant: Some(self.merchant.clone()),
            item: Some(self.item.clone()),
            map_url: self.map_url.clone(),
            payer_id: Some(self.payer_id.clone()),
            split_type: Some(self.split_type),
            split_with: Some(self.split_with.clone()),
            split_details: Some(self.split_details.clone()),
        }
    }
}

fn row_rank(row_index: Option<u32>) -> u64 {
    match row_index {
        Some(ix) => u64::from(ix),
        None => u64::MAX,
    }
}
