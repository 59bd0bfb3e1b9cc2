//! Balance figures for a transaction's split.

use crate::model::{Amount, SplitType, Transaction};
use serde::Serialize;
use std::collections::BTreeMap;

/// Display and validation figures computed from a transaction's split fields.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub split_type: SplitType,
    pub amount: Amount,
    /// `round(amount / participants)`. Display only, the shares may not add back up to `amount`.
    pub equal_share: Amount,
    /// Sum of the custom shares of the participants. Shares of non-participants are ignored.
    pub custom_total: Amount,
    /// `amount - custom_total`. Zero means balanced.
    pub difference: Amount,
    /// What each participant owes, in participant order.
    pub shares: Vec<(String, Amount)>,
}

impl Balance {
    pub fn new(t: &Transaction) -> Self {
        let equal_share = t
            .amount
            .divide(t.split_with.len())
            .map(|share| share.round())
            .unwrap_or_default();
        let custom_total: Amount = t
            .split_with
            .iter()
            .filter_map(|id| t.split_details.get(id))
            .sum();
        let shares = t
            .split_with
            .iter()
            .map(|id| {
                let share = match t.split_type {
                    SplitType::Equal => equal_share,
                    SplitType::Custom => t.split_details.get(id).copied().unwrap_or_default(),
                };
                (id.clone(), share)
            })
            .collect();
        Self {
            split_type: t.split_type,
            amount: t.amount,
            equal_share,
            custom_total,
            difference: t.amount - custom_total,
            shares,
        }
    }

    pub fn is_balanced(&self) -> bool {
        self.difference.is_zero()
    }

    /// Only an unbalanced custom split blocks confirmation.
    pub fn can_confirm(&self) -> bool {
        self.split_type == SplitType::Equal || self.is_balanced()
    }

    pub fn share_map(&self) -> BTreeMap<String, Amount> {
        self.shares.iter().cloned().collect()
    }
}
