use crate::model::{Amount, Transaction, TransactionType};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

const RECENT_COUNT: usize = 3;

/// The overview: spending today and this month, and the latest few transactions.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub today: NaiveDate,
    /// Total of all non-income transactions dated `today`.
    pub today_total: Amount,
    /// Total of all non-income transactions in the calendar month of `today`.
    pub month_total: Amount,
    pub recent: Vec<Transaction>,
}

impl Summary {
    pub fn new(transactions: &[Transaction], today: NaiveDate) -> Self {
        let spending = || {
            transactions
                .iter()
                .filter(|t| t.kind != TransactionType::Income)
        };
        let today_total = spending()
            .filter(|t| t.date == today)
            .map(|t| t.amount)
            .sum();
        let month_total = spending()
            .filter(|t| t.date.year() == today.year() && t.date.month() == today.month())
            .map(|t| t.amount)
            .sum();
        let recent = Filter::default()
            .with_limit(RECENT_COUNT)
            .apply(transactions);
        Self {
            today,
            today_total,
            month_total,
            recent,
        }
    }
}

/// Narrows and orders a transaction listing. Every criterion is optional, and the result is always
/// in `Transaction::cmp_recent` order.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Exact category match.
    pub category: Option<String>,
    /// Case-insensitive substring of the item or the merchant.
    pub search: Option<String>,
    /// Inclusive lower date bound.
    pub from: Option<NaiveDate>,
    /// Inclusive upper date bound.
    pub to: Option<NaiveDate>,
    pub limit: Option<usize>,
}

impl Filter {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, t: &Transaction) -> bool {
        if let Some(category) = self.category.as_deref() {
            if t.category != category {
                return false;
            }
        }
        if let Some(search) = self.search.as_deref() {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty()
                && !t.item.to_lowercase().contains(&needle)
                && !t.merchant.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if self.from.is_some_and(|from| t.date < from) {
            return false;
        }
        if self.to.is_some_and(|to| t.date > to) {
            return false;
        }
        true
    }

    pub fn apply(&self, transactions: &[Transaction]) -> Vec<Transaction> {
        let mut found: Vec<Transaction> = transactions
            .iter()
            .filter(|t| self.matches(t))
            .cloned()
            .collect();
        found.sort_by(Transaction::cmp_recent);
        if let Some(limit) = self.limit {
            found.truncate(limit);
        }
        found
    }
}
