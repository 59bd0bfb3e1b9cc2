//! Maps between typed transactions and the remote store's flat, stringly-typed rows.
//!
//! Reads never fail from the caller's point of view: anything that goes wrong degrades to an empty
//! transaction list or the built-in category list. Add and update are fire-and-forget. Only delete
//! reports its failure, and even that is only a report; the `Ledger` resyncs regardless.

use crate::api::row::*;
use crate::api::{Remote, GET_CATEGORIES};
use crate::model::draft::{parse_row_index, text};
use crate::model::member::PIGGY;
use crate::model::{
    coerce_category, default_categories, default_members, split, Amount, Draft, Normalizer,
    Transaction,
};
use crate::Result;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Where a category list came from.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySource {
    /// The remote store answered with a list, possibly an empty one.
    Remote,
    /// The remote read failed and the built-in list was substituted.
    BuiltIn,
}

serde_plain::derive_display_from_serialize!(CategorySource);

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct FetchedCategories {
    pub names: Vec<String>,
    pub source: CategorySource,
}

impl FetchedCategories {
    fn built_in() -> Self {
        Self {
            names: default_categories(),
            source: CategorySource::BuiltIn,
        }
    }
}

/// The remote sync gateway.
#[derive(Clone)]
pub struct Gateway {
    remote: Arc<dyn Remote>,
    normalizer: Normalizer,
}

impl Gateway {
    pub fn new(remote: Arc<dyn Remote>) -> Self {
        // Remote rows keep whatever category they carry, and a row without a payer was entered
        // by the sheet owner.
        let normalizer = Normalizer::new(default_members(), Vec::new(), PIGGY);
        Self { remote, normalizer }
    }

    /// Reads every transaction row. Returns an empty list on any failure.
    pub async fn fetch_transactions(&self) -> Vec<Transaction> {
        match self.try_fetch_transactions().await {
            Ok(transactions) => {
                debug!("Fetched {} transactions", transactions.len());
                transactions
            }
            Err(e) => {
                warn!("Unable to fetch transactions, treating the remote store as empty: {e:#}");
                Vec::new()
            }
        }
    }

    async fn try_fetch_transactions(&self) -> Result<Vec<Transaction>> {
        let body = self.remote.get(None).await?;
        let value = parse_body(&body)?;
        let rows = match value {
            Value::Array(rows) => rows,
            Value::Object(mut obj) => match obj.remove(TRANSACTIONS_STR) {
                Some(Value::Array(rows)) => rows,
                _ => Vec::new(),
            },
            _ => bail!("Unexpected transactions payload"),
        };
        Ok(rows
            .iter()
            .filter_map(Value::as_object)
            .filter_map(row_to_draft)
            .map(|draft| self.normalizer.normalize(draft))
            .collect())
    }

    /// Reads the category list. Returns the built-in list on any failure.
    pub async fn fetch_categories(&self) -> FetchedCategories {
        match self.try_fetch_categories().await {
            Ok(names) => FetchedCategories {
                names,
                source: CategorySource::Remote,
            },
            Err(e) => {
                warn!("Unable to fetch categories, using the built-in list: {e:#}");
                FetchedCategories::built_in()
            }
        }
    }

    async fn try_fetch_categories(&self) -> Result<Vec<String>> {
        let body = self.remote.get(Some(GET_CATEGORIES)).await?;
        let value = parse_body(&body)?;
        let entries = value
            .as_array()
            .context("The category payload is not an array")?;
        Ok(entries.iter().filter_map(coerce_category).collect())
    }

    /// Appends `t` as a new row. Failures are logged and otherwise ignored.
    pub async fn add_transaction(&self, t: &Transaction) {
        let body = row_payload(ADD_TRANSACTION, t);
        if let Err(e) = self.remote.post(&body).await {
            warn!("Add of transaction '{}' may not have reached the remote store: {e:#}", t.id);
        }
    }

    /// Overwrites the row of `t`. Does nothing for a transaction that was never confirmed
    /// remotely. Failures are logged and otherwise ignored.
    pub async fn update_transaction(&self, t: &Transaction) {
        let row = match t.row_index {
            Some(row) => row,
            None => {
                debug!("Transaction '{}' has no row index, skipping the remote update", t.id);
                return;
            }
        };
        let mut body = row_payload(UPDATE_TRANSACTION, t);
        body[ROW_INDEX_STR] = json!(row);
        if let Err(e) = self.remote.post(&body).await {
            warn!("Update of row {row} may not have reached the remote store: {e:#}");
        }
    }

    /// Deletes the row at `row_index`.
    pub async fn delete_transaction(&self, row_index: u32) -> Result<()> {
        let body = json!({ ACTION_STR: DELETE_TRANSACTION, ROW_INDEX_STR: row_index });
        self.remote
            .post(&body)
            .await
            .with_context(|| format!("Unable to delete row {row_index}"))
    }
}

/// Parses a response body as JSON, refusing anything that does not look like JSON at all (the
/// remote store answers errors with an HTML page).
fn parse_body(body: &str) -> Result<Value> {
    let trimmed = body.trim_start();
    if !(trimmed.starts_with('[') || trimmed.starts_with('{')) {
        let preview: String = trimmed.chars().take(40).collect();
        bail!("The response is not JSON: '{preview}'");
    }
    serde_json::from_str(trimmed).context("Unable to parse the response body")
}

/// Maps a raw row to a `Draft`. Rows that carry neither a date nor an id are blank or header rows
/// and are skipped.
fn row_to_draft(row: &Map<String, Value>) -> Option<Draft> {
    let date = text(row, DATE_STR);
    let id = text(row, ID_STR).or_else(|| text(row, ID_LOWER_STR));
    if date.is_none() && id.is_none() {
        trace!("Skipping blank row {row:?}");
        return None;
    }
    let row_index = row.get(ROW_INDEX_STR).and_then(parse_row_index);
    let id = id.or_else(|| row_index.map(|ix| format!("row-{ix}")));
    let payer_id = text(row, PAYER_STR).unwrap_or_else(|| PIGGY.to_string());
    let split = split::decode(&text(row, SPLIT_STR).unwrap_or_default(), &payer_id);

    Some(Draft {
        id,
        row_index,
        date,
        kind: text(row, TYPE_STR),
        category: text(row, CATEGORY_STR),
        amount: Some(row.get(AMOUNT_STR).map(Amount::coerce).unwrap_or_default()),
        merchant: text(row, MERCHANT_STR),
        item: text(row, DESCRIPTION_STR),
        map_url: text(row, MAP_LINK_STR),
        payer_id: Some(payer_id),
        split_type: Some(split.split_type),
        split_with: Some(split.with),
        split_details: Some(split.details),
    })
}

/// Flattens `t` into a write request for `action`.
fn row_payload(action: &str, t: &Transaction) -> Value {
    let mut body = json!({
        ACTION_STR: action,
        DATE_STR: t.date.format("%Y-%m-%d").to_string(),
        TYPE_STR: t.kind,
        CATEGORY_STR: t.category,
        AMOUNT_STR: t.amount,
        MERCHANT_STR: t.merchant,
        DESCRIPTION_STR: t.item,
        PAYER_STR: t.payer_id,
        SPLIT_STR: split::encode(t),
        ID_STR: t.id,
    });
    if let Some(map_url) = t.map_url.as_deref() {
        body[MAP_LINK_STR] = json!(map_url);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{TestRemote, TestRemoteState};
    use crate::model::member::MANDY;
    use crate::model::{test_transaction, SplitType, TransactionType};
    use chrono::NaiveDate;
    use uuid::Uuid;

    /// A gateway over a fresh, empty in-memory remote.
    fn gateway() -> (Gateway, TestRemote) {
        let remote = TestRemote::new(&format!("https://sheet.test/{}", Uuid::new_v4()));
        remote.set_state(TestRemoteState::empty());
        (Gateway::new(Arc::new(remote.clone())), remote)
    }

    fn rows(remote: &TestRemote, rows: Value) {
        let mut state = remote.get_state();
        state.rows = rows
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().unwrap().clone())
            .collect();
        remote.set_state(state);
    }

    #[tokio::test]
    async fn test_fetch_decodes_rows() {
        let (gateway, remote) = gateway();
        rows(
            &remote,
            json!([
                {"日期": "2024-05-01", "類型": "支出", "類別": "餐飲", "金額": 100,
                 "店家名稱": "麵店", "描述": "午餐", "付錢的人": "mandy",
                 "分帳": "小豬:30,Mandy:70", "ID": "a1"},
                {"日期": "2024-05-02", "金額": "250", "付錢的人": "PIGGY", "分帳": "piggy"},
                {"日期": "", "ID": ""},
            ]),
        );
        let found = gateway.fetch_transactions().await;
        assert_eq!(found.len(), 2);

        let first = &found[0];
        assert_eq!(first.id, "a1");
        assert_eq!(first.row_index, Some(2));
        assert_eq!(first.payer_id, MANDY);
        assert_eq!(first.split_with, vec![PIGGY, MANDY]);
        assert_eq!(first.split_type, SplitType::Custom);
        assert_eq!(first.split_details[PIGGY], Amount::from(30));
        assert!(first.is_split);

        let second = &found[1];
        assert_eq!(second.id, "row-3");
        assert_eq!(second.amount, Amount::from(250));
        assert_eq!(second.payer_id, PIGGY);
        assert_eq!(second.split_with, vec![PIGGY]);
        assert!(!second.is_split);
        assert_eq!(second.kind, TransactionType::Expense);
        assert_eq!(second.category, "其他");
    }

    #[tokio::test]
    async fn test_fetch_accepts_wrapped_rows() {
        let (gateway, remote) = gateway();
        let mut state = remote.get_state();
        state.raw_transactions = Some(
            json!({"transactions": [{"日期": "2024-05-01", "ID": "w1", "金額": 5}]}).to_string(),
        );
        remote.set_state(state);
        let found = gateway.fetch_transactions().await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "w1");
        assert_eq!(found[0].row_index, None);
    }

    #[tokio::test]
    async fn test_fetch_html_is_empty() {
        let (gateway, remote) = gateway();
        rows(&remote, json!([{"日期": "2024-05-01", "ID": "a1"}]));
        let mut state = remote.get_state();
        state.html_reads = true;
        remote.set_state(state);
        assert!(gateway.fetch_transactions().await.is_empty());
        let categories = gateway.fetch_categories().await;
        assert_eq!(categories.source, CategorySource::BuiltIn);
        assert_eq!(categories.names.len(), 8);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_empty() {
        let (gateway, remote) = gateway();
        let mut state = remote.get_state();
        state.fail_reads = true;
        remote.set_state(state);
        assert!(gateway.fetch_transactions().await.is_empty());
        assert_eq!(
            gateway.fetch_categories().await.source,
            CategorySource::BuiltIn
        );
    }

    #[tokio::test]
    async fn test_fetch_categories_coerces_entries() {
        let (gateway, remote) = gateway();
        let mut state = remote.get_state();
        state.categories = vec![
            json!("餐飲"),
            json!({"名稱": "交通"}),
            json!(""),
            json!({"日期": "2024-05-01"}),
        ];
        remote.set_state(state);
        let categories = gateway.fetch_categories().await;
        assert_eq!(categories.source, CategorySource::Remote);
        assert_eq!(categories.names, vec!["餐飲", "交通"]);
    }

    #[tokio::test]
    async fn test_fetch_categories_empty_is_remote() {
        let (gateway, _remote) = gateway();
        let categories = gateway.fetch_categories().await;
        assert_eq!(categories.source, CategorySource::Remote);
        assert!(categories.names.is_empty());
    }

    #[tokio::test]
    async fn test_add_then_fetch_round_trips() {
        let (gateway, remote) = gateway();
        let mut t = test_transaction(100);
        t.split_type = SplitType::Custom;
        t.set_custom_share(MANDY, "60");
        t.set_custom_share(PIGGY, "40");
        gateway.add_transaction(&t).await;

        let posts = remote.get_state().posts;
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0][ACTION_STR], ADD_TRANSACTION);
        assert_eq!(posts[0][SPLIT_STR], "Mandy:60, 小豬:40");
        assert_eq!(posts[0][TYPE_STR], "支出");

        let found = gateway.fetch_transactions().await;
        assert_eq!(found.len(), 1);
        let mut expected = t.clone();
        expected.row_index = Some(2);
        assert_eq!(found[0], expected);
    }

    #[tokio::test]
    async fn test_update_without_row_index_is_noop() {
        let (gateway, remote) = gateway();
        gateway.update_transaction(&test_transaction(1)).await;
        assert!(remote.get_state().posts.is_empty());
    }

    #[tokio::test]
    async fn test_update_by_row_index() {
        let (gateway, remote) = gateway();
        gateway.add_transaction(&test_transaction(1)).await;
        let mut t = gateway.fetch_transactions().await.remove(0);
        t.amount = Amount::from(75);
        t.date = NaiveDate::from_ymd_opt(2024, 5, 9).unwrap();
        gateway.update_transaction(&t).await;

        let posts = remote.get_state().posts;
        assert_eq!(posts[1][ROW_INDEX_STR], 2);
        let found = gateway.fetch_transactions().await;
        assert_eq!(found, vec![t]);
    }

    #[tokio::test]
    async fn test_write_failures_are_swallowed_except_delete() {
        let (gateway, remote) = gateway();
        let mut state = remote.get_state();
        state.fail_writes = true;
        remote.set_state(state);
        let mut t = test_transaction(1);
        gateway.add_transaction(&t).await;
        t.row_index = Some(2);
        gateway.update_transaction(&t).await;
        assert!(gateway.delete_transaction(2).await.is_err());
    }

    #[test]
    fn test_parse_body_rejects_non_json() {
        assert!(parse_body("<!DOCTYPE html><html>").is_err());
        assert!(parse_body("").is_err());
        assert!(parse_body("  [1]").is_ok());
        assert!(parse_body("{ broken").is_err());
    }
}
