//! Implements the `Remote` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without a remote store. State is kept per endpoint in a process-wide map so
//! that every `TestRemote` created for the same endpoint sees the same rows, the way every client
//! of a real sheet would.

use crate::api::row::*;
use crate::api::{Remote, GET_CATEGORIES};
use crate::model::DEFAULT_CATEGORIES;
use crate::Result;
use anyhow::{bail, Context};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Mutex, OnceLock};
use tracing::{trace, warn};

/// The first data row of the sheet. Row 1 holds the headers.
const FIRST_ROW: u32 = 2;

const HTML_ERROR_PAGE: &str =
    "<!DOCTYPE html><html><head><title>Error</title></head><body>Service unavailable</body></html>";

static STATES: OnceLock<Mutex<HashMap<String, TestRemoteState>>> = OnceLock::new();

/// The contents of an in-memory remote store, along with switches to make it misbehave.
#[derive(Debug, Clone, PartialEq)]
pub struct TestRemoteState {
    /// Rows in sheet order, without their `rowIndex`, which is derived from position.
    pub rows: Vec<Map<String, Value>>,
    /// The entries returned for `GET_CATEGORIES`.
    pub categories: Vec<Value>,
    /// When set, returned verbatim for a transaction read instead of `rows`.
    pub raw_transactions: Option<String>,
    /// Every read fails at the transport level.
    pub fail_reads: bool,
    /// Every write fails at the transport level and is not applied.
    pub fail_writes: bool,
    /// Every read answers with an HTML error page.
    pub html_reads: bool,
    /// Every write request that was delivered, in order.
    pub posts: Vec<Value>,
}

impl TestRemoteState {
    /// A remote store with no rows and no categories.
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            categories: Vec::new(),
            raw_transactions: None,
            fail_reads: false,
            fail_writes: false,
            html_reads: false,
            posts: Vec::new(),
        }
    }

    /// A remote store holding the seed rows of this module and the built-in categories.
    pub fn seeded() -> Self {
        let rows = load_csv(TRANSACTION_DATA).unwrap_or_else(|e| {
            warn!("Unable to load the seed rows: {e:#}");
            Vec::new()
        });
        Self {
            rows,
            categories: DEFAULT_CATEGORIES
                .iter()
                .map(|c| Value::String(c.to_string()))
                .collect(),
            ..Self::empty()
        }
    }

    /// The rows as the remote store serves them, with their `rowIndex`.
    fn served_rows(&self) -> Vec<Value> {
        self.rows
            .iter()
            .zip(FIRST_ROW..)
            .map(|(row, ix)| {
                let mut row = row.clone();
                row.insert(ROW_INDEX_STR.to_string(), Value::from(ix));
                Value::Object(row)
            })
            .collect()
    }

    fn position(&self, body: &Value) -> Result<usize> {
        let row = body
            .get(ROW_INDEX_STR)
            .and_then(Value::as_u64)
            .context("The request has no rowIndex")?;
        let position = usize::try_from(row)?
            .checked_sub(FIRST_ROW as usize)
            .context("The rowIndex points at the header row")?;
        if position >= self.rows.len() {
            bail!("Row {row} does not exist");
        }
        Ok(position)
    }
}

impl Default for TestRemoteState {
    fn default() -> Self {
        Self::seeded()
    }
}

/// An implementation of the `Remote` trait that does not use the network.
#[derive(Debug, Clone)]
pub(crate) struct TestRemote {
    endpoint: String,
}

impl TestRemote {
    /// Connects to the in-memory store for `endpoint`, seeding it on first use.
    pub(crate) fn new(endpoint: &str) -> Self {
        let remote = Self {
            endpoint: endpoint.to_string(),
        };
        remote.with_state(|_| ());
        remote
    }

    pub(crate) fn get_state(&self) -> TestRemoteState {
        self.with_state(|state| state.clone())
    }

    pub(crate) fn set_state(&self, state: TestRemoteState) {
        self.with_state(|s| *s = state)
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut TestRemoteState) -> R) -> R {
        let mut states = STATES
            .get_or_init(|| Mutex::new(HashMap::new()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let state = states.entry(self.endpoint.clone()).or_default();
        f(state)
    }
}

#[async_trait::async_trait]
impl Remote for TestRemote {
    async fn get(&self, action: Option<&str>) -> Result<String> {
        trace!("get {action:?} from {}", self.endpoint);
        self.with_state(|state| {
            if state.fail_reads {
                bail!("Connection refused");
            }
            if state.html_reads {
                return Ok(HTML_ERROR_PAGE.to_string());
            }
            match action {
                None => match &state.raw_transactions {
                    Some(raw) => Ok(raw.clone()),
                    None => Ok(Value::Array(state.served_rows()).to_string()),
                },
                Some(GET_CATEGORIES) => Ok(Value::Array(state.categories.clone()).to_string()),
                Some(other) => bail!("Unknown action '{other}'"),
            }
        })
    }

    async fn post(&self, body: &Value) -> Result<()> {
        trace!("post {body} to {}", self.endpoint);
        self.with_state(|state| {
            if state.fail_writes {
                bail!("Connection reset");
            }
            state.posts.push(body.clone());
            let action = body
                .get(ACTION_STR)
                .and_then(Value::as_str)
                .context("The request has no action")?;
            match action {
                ADD_TRANSACTION => {
                    state.rows.push(stored_row(body));
                }
                UPDATE_TRANSACTION => {
                    let position = state.position(body)?;
                    state.rows[position] = stored_row(body);
                }
                DELETE_TRANSACTION => {
                    let position = state.position(body)?;
                    state.rows.remove(position);
                }
                other => bail!("Unknown action '{other}'"),
            }
            Ok(())
        })
    }
}

/// The row that a write request leaves in the sheet.
fn stored_row(body: &Value) -> Map<String, Value> {
    let mut row = body.as_object().cloned().unwrap_or_default();
    row.remove(ACTION_STR);
    row.remove(ROW_INDEX_STR);
    row
}

/// Loads rows from CSV text whose first line holds the row labels. Empty cells are left out of the
/// row, the way the remote store omits them.
fn load_csv(csv_data: &str) -> Result<Vec<Map<String, Value>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(Cursor::new(csv_data.as_bytes()));
    let headers = rdr.headers()?.clone();
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let row: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .filter(|(_, value)| !value.is_empty())
            .map(|(label, value)| (label.to_string(), Value::String(value.to_string())))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Seed transaction data, in the column order of the sheet.
const TRANSACTION_DATA: &str = r##"日期,類型,類別,金額,店家名稱,描述,付錢的人,分帳,ID,地圖連結
2025-10-01,收入,薪資,52000,公司,十月薪水,小豬,,seed-01,
2025-10-02,支出,餐飲,180,八方雲集,鍋貼 x10,Mandy,"Mandy, 小豬",seed-02,
2025-10-03,支出,交通,1200,台灣高鐵,台北-台中來回,piggy,"小豬:700, Mandy:500",seed-03,
2025-10-03,公帳,居家,899,全聯,"衛生紙, 洗碗精",mandy,"Mandy, 小豬",seed-04,https://maps.example.com/pxmart
2025-10-05,支出,娛樂,640,威秀影城,電影票 x2,Mandy,,,
,,,,,,,,,
2025-10-06,私帳,個人,350,誠品,筆記本,小豬,piggy,seed-06,
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn remote() -> TestRemote {
        TestRemote::new(&format!("https://sheet.test/{}", Uuid::new_v4()))
    }

    #[test]
    fn test_seed_rows_load() {
        let rows = load_csv(TRANSACTION_DATA).unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0][AMOUNT_STR], "52000");
        assert!(rows[4].get(ID_STR).is_none());
        assert!(rows[5].is_empty());
    }

    #[tokio::test]
    async fn test_same_endpoint_shares_state() {
        let a = remote();
        let b = TestRemote::new(&a.endpoint);
        a.post(&json!({ACTION_STR: ADD_TRANSACTION, ID_STR: "x"}))
            .await
            .unwrap();
        assert_eq!(b.get_state().rows.len(), 8);
    }

    #[tokio::test]
    async fn test_delete_shifts_rows() {
        let remote = remote();
        remote
            .post(&json!({ACTION_STR: DELETE_TRANSACTION, ROW_INDEX_STR: 2}))
            .await
            .unwrap();
        let body = remote.get(None).await.unwrap();
        let rows: Vec<Value> = serde_json::from_str(&body).unwrap();
        assert_eq!(rows[0][ID_STR], "seed-02");
        assert_eq!(rows[0][ROW_INDEX_STR], 2);
    }

    #[tokio::test]
    async fn test_bad_row_index() {
        let remote = remote();
        for row in [0, 1, 100] {
            let body = json!({ACTION_STR: UPDATE_TRANSACTION, ROW_INDEX_STR: row});
            assert!(remote.post(&body).await.is_err());
        }
        assert!(remote
            .post(&json!({ACTION_STR: "DROP_TABLE"}))
            .await
            .is_err());
        assert_eq!(remote.get_state().rows.len(), 7);
    }

    #[tokio::test]
    async fn test_categories_action() {
        let remote = remote();
        let body = remote.get(Some(GET_CATEGORIES)).await.unwrap();
        let categories: Vec<String> = serde_json::from_str(&body).unwrap();
        assert_eq!(categories.len(), DEFAULT_CATEGORIES.len());
        assert!(remote.get(Some("NOPE")).await.is_err());
    }

    #[tokio::test]
    async fn test_failure_switches() {
        let remote = remote();
        let mut state = remote.get_state();
        state.html_reads = true;
        state.fail_writes = true;
        remote.set_state(state);
        assert!(remote.get(None).await.unwrap().starts_with("<!DOCTYPE"));
        assert!(remote
            .post(&json!({ACTION_STR: ADD_TRANSACTION}))
            .await
            .is_err());
        assert!(remote.get_state().posts.is_empty());
    }
}
