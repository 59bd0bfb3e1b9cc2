//! Types that represent the core data model, such as `Transaction` and `Member`, and the pure
//! logic that operates on them: the split codec, the balance calculator and the normalizer.
mod amount;
mod balance;
mod category;
mod date;
pub(crate) mod draft;
pub mod member;
mod normalize;
pub mod split;
mod state;
mod summary;
mod transaction;

pub use amount::{Amount, AmountError};
pub use balance::Balance;
pub use category::{coerce_category, default_categories, DEFAULT_CATEGORIES, FALLBACK_CATEGORY};
pub use date::{parse_date, today};
pub use draft::Draft;
pub use member::{default_members, fold_alias, Member};
pub use normalize::{Normalizer, PLACEHOLDER_ITEM, PLACEHOLDER_MERCHANT};
pub use split::{Split, SplitType};
pub use state::{AppState, Theme};
pub use summary::{Filter, Summary};
pub use transaction::{Transaction, TransactionType};

/// A normalized, two-member equal split of `amount` paid by Mandy on 2024-05-01.
#[cfg(test)]
pub(crate) fn test_transaction(amount: i64) -> Transaction {
    Transaction {
        id: "t-1".to_string(),
        row_index: None,
        date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        kind: TransactionType::Expense,
        category: "餐飲".to_string(),
        amount: Amount::from(amount),
        merchant: "早餐店".to_string(),
        item: "蛋餅".to_string(),
        map_url: None,
        payer_id: member::MANDY.to_string(),
        is_split: true,
        split_type: SplitType::Equal,
        split_with: vec![member::MANDY.to_string(), member::PIGGY.to_string()],
        split_details: Default::default(),
    }
}
