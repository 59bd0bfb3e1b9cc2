//! The reconciliation store.
//!
//! `Ledger` owns the `AppState` and is the only thing that mutates it. Every mutation follows the
//! same protocol: change the local state first, save the mirror, fire the remote write, and (for
//! add and delete) resync from the remote store. The remote store acknowledges nothing, so the
//! resync is what brings the local list back in line with the server's rows and row indexes. A
//! resync replaces the transaction list wholesale, so overlapping resyncs settle on whichever
//! finished last.

use crate::api::{self, AnalyzeRequest, CategorySource, Extractor, Gateway, Mode};
use crate::error::{ErrorType, IntoResult};
use crate::mirror::Mirror;
use crate::model::{
    default_categories, fold_alias, today, AppState, Balance, Draft, Filter, Summary, Theme,
    Transaction,
};
use crate::{Config, Result};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// A user preference change.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Preference {
    /// Makes the named member the current user. Aliases are accepted.
    CurrentUser(String),
    /// Switches the current user to the next member.
    ToggleUser,
    Theme(Theme),
}

/// The outcome of a full resync.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub transactions: usize,
    pub categories: usize,
    pub category_source: CategorySource,
    /// Whether the fetched category list replaced the local one.
    pub categories_replaced: bool,
}

pub struct Ledger {
    state: Mutex<AppState>,
    gateway: Gateway,
    mirror: Mirror,
    extractor: Option<Arc<dyn Extractor>>,
    syncing: AtomicBool,
    analyzing: AtomicBool,
}

impl Ledger {
    /// Opens the ledger described by `config`: loads the local mirror and connects the remote
    /// store and, when one is configured, the AI service. Nothing is fetched yet; call `start` for
    /// the startup resync.
    pub async fn open(config: &Config, mode: Mode) -> Result<Self> {
        let gateway = Gateway::new(api::remote(config, mode)?);
        let extractor = match (config.ai_url(), mode) {
            (None, Mode::Http) => None,
            _ => Some(api::extractor(config, mode)?),
        };
        let mirror = Mirror::new(config.mirror_path());
        let mut state = mirror.load().await;
        debug!(
            "Loaded {} transactions from {}",
            state.transactions.len(),
            mirror.path().display()
        );
        state.remote_endpoint = Some(config.sheet_url().to_string());
        Ok(Self::new(state, gateway, mirror, extractor))
    }

    pub(crate) fn new(
        state: AppState,
        gateway: Gateway,
        mirror: Mirror,
        extractor: Option<Arc<dyn Extractor>>,
    ) -> Self {
        Self {
            state: Mutex::new(state),
            gateway,
            mirror,
            extractor,
            syncing: AtomicBool::new(false),
            analyzing: AtomicBool::new(false),
        }
    }

    /// The startup resync.
    pub async fn start(&self) -> SyncReport {
        debug!("Running the startup sync");
        self.sync_all().await
    }

    /// A copy of the whole state.
    pub fn snapshot(&self) -> AppState {
        self.lock().clone()
    }

    pub fn categories(&self) -> Vec<String> {
        self.lock().categories.clone()
    }

    pub fn current_user(&self) -> String {
        self.lock().current_user.clone()
    }

    pub fn theme(&self) -> Theme {
        self.lock().theme
    }

    pub fn find(&self, id: &str) -> Option<Transaction> {
        self.lock().find(id).cloned()
    }

    /// The transactions that pass `filter`, most recent first.
    pub fn transactions(&self, filter: &Filter) -> Vec<Transaction> {
        filter.apply(&self.lock().transactions)
    }

    pub fn summary(&self) -> Summary {
        Summary::new(&self.lock().transactions, today())
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    pub fn is_analyzing(&self) -> bool {
        self.analyzing.load(Ordering::Acquire)
    }

    /// Normalizes `draft` against the current members, categories and user without storing it. A
    /// draft for a stored transaction keeps that transaction's category.
    pub fn normalize(&self, draft: Draft) -> Transaction {
        let normalizer = self.lock().normalizer_for(&draft);
        normalizer.normalize(draft)
    }

    /// Adds a transaction. It is shown immediately, sent to the remote store, and then the whole
    /// ledger is resynced whether or not the remote write went through. The returned transaction
    /// is the optimistic local record, which the resync replaces with the server's copy.
    pub async fn add_transaction(&self, draft: Draft) -> Transaction {
        let t = {
            let mut state = self.lock();
            let t = state.normalizer().normalize(draft);
            state.transactions.insert(0, t.clone());
            t
        };
        info!("Adding transaction '{}' of {}", t.id, t.amount);
        self.persist().await;
        self.gateway.add_transaction(&t).await;
        self.sync_all().await;
        t
    }

    /// Replaces an existing transaction, matched by the draft's `id`. The remote row is updated
    /// only if the transaction has a row index. There is no resync afterwards.
    pub async fn update_transaction(&self, mut draft: Draft) -> Result<Transaction> {
        let id = match draft.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                return Err(anyhow!("An update needs a transaction id"))
                    .pub_result(ErrorType::Request)
            }
        };
        let t = {
            let mut state = self.lock();
            let position = match state.transactions.iter().position(|t| t.id == id) {
                Some(position) => position,
                None => {
                    return Err(anyhow!("No transaction with id '{id}'"))
                        .pub_result(ErrorType::Request)
                }
            };
            if draft.row_index.is_none() {
                draft.row_index = state.transactions[position].row_index;
            }
            let t = state.normalizer_for(&draft).normalize(draft);
            state.transactions[position] = t.clone();
            t
        };
        info!("Updating transaction '{}'", t.id);
        self.persist().await;
        self.gateway.update_transaction(&t).await;
        Ok(t)
    }

    /// Deletes a transaction by id. It disappears locally at once, the remote row is deleted if
    /// the transaction has one, and the ledger is resynced in every case. A failed remote delete
    /// is returned after the resync. Returns the removed transaction, or `None` if no
    /// transaction had that id.
    pub async fn delete_transaction(&self, id: &str) -> Result<Option<Transaction>> {
        let removed = {
            let mut state = self.lock();
            let position = state.transactions.iter().position(|t| t.id == id);
            position.map(|ix| state.transactions.remove(ix))
        };
        let outcome = match &removed {
            Some(t) => {
                info!("Deleting transaction '{}'", t.id);
                self.persist().await;
                match t.row_index {
                    Some(row) => self.gateway.delete_transaction(row).await,
                    None => {
                        debug!("Transaction '{}' was never confirmed remotely", t.id);
                        Ok(())
                    }
                }
            }
            None => {
                debug!("No local transaction with id '{id}'");
                Ok(())
            }
        };
        self.sync_all().await;
        outcome.pub_result(ErrorType::Remote)?;
        Ok(removed)
    }

    /// Fetches transactions and categories concurrently and replaces the local transaction list
    /// with the fetched one. The category list is replaced only by a non-empty list that the
    /// remote store actually returned.
    pub async fn sync_all(&self) -> SyncReport {
        let (transactions, categories) = tokio::join!(
            self.gateway.fetch_transactions(),
            self.gateway.fetch_categories()
        );
        let report = {
            let mut state = self.lock();
            state.transactions = transactions;
            let categories_replaced =
                categories.source == CategorySource::Remote && !categories.names.is_empty();
            if categories_replaced {
                state.categories = categories.names;
            } else if state.categories.is_empty() {
                state.categories = default_categories();
            }
            SyncReport {
                transactions: state.transactions.len(),
                categories: state.categories.len(),
                category_source: categories.source,
                categories_replaced,
            }
        };
        debug!("Synced {report:?}");
        self.persist().await;
        report
    }

    /// A user-requested resync. Refused while another user-requested resync is running.
    pub async fn manual_sync(&self) -> Result<SyncReport> {
        let _gate = Gate::enter(&self.syncing)
            .ok_or_else(|| anyhow!("A sync is already in progress"))
            .pub_result(ErrorType::Request)?;
        Ok(self.sync_all().await)
    }

    /// Asks the AI service to turn `request` into a draft. Nothing is stored. Refused while
    /// another extraction is running.
    pub async fn analyze(&self, request: &AnalyzeRequest) -> Result<Draft> {
        let extractor = match &self.extractor {
            Some(extractor) => extractor.clone(),
            None => {
                return Err(anyhow!(
                    "No ai_url is configured, run 'piggy init' with --ai-url"
                ))
                .pub_result(ErrorType::Config)
            }
        };
        let _gate = Gate::enter(&self.analyzing)
            .ok_or_else(|| anyhow!("An analysis is already in progress"))
            .pub_result(ErrorType::Request)?;
        api::extract(extractor.as_ref(), request).await
    }

    /// Applies a preference change and saves it.
    pub async fn set_preference(&self, preference: Preference) -> Result<()> {
        {
            let mut state = self.lock();
            match preference {
                Preference::CurrentUser(name) => {
                    let id = fold_alias(&name);
                    if !state.is_member(&id) {
                        return Err(anyhow!("'{name}' is not a member of this ledger"))
                            .pub_result(ErrorType::Request);
                    }
                    state.current_user = id;
                }
                Preference::ToggleUser => state.current_user = state.next_user(),
                Preference::Theme(theme) => state.theme = theme,
            }
        }
        self.persist().await;
        Ok(())
    }

    /// Saves the current state to the mirror. A failed save is logged; the in-memory state
    /// remains authoritative.
    async fn persist(&self) {
        if let Err(e) = self.mirror.save(|| self.snapshot()).await {
            warn!("Unable to save the local mirror: {e:#}");
        }
    }

    /// The state lock is never held across an await.
    fn lock(&self) -> MutexGuard<'_, AppState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Holds a loading flag up for as long as it lives.
struct Gate<'a>(&'a AtomicBool);

impl<'a> Gate<'a> {
    fn enter(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Gate(flag))
    }
}

impl Drop for Gate<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Fails with a `Request` error unless `t` can be confirmed, i.e. its custom split adds up to its
/// amount.
pub(crate) fn ensure_balanced(t: &Transaction) -> Result<()> {
    let balance = Balance::new(t);
    if !balance.can_confirm() {
        let difference = balance.difference;
        return Err(anyhow!(
            "The custom split is off by {difference} and cannot be saved"
        ))
        .pub_result(ErrorType::Request);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestRemoteState;
    use crate::model::member::{MANDY, PIGGY};
    use crate::model::{Amount, SplitType};
    use crate::test::TestEnv;

    fn draft(amount: i64, item: &str) -> Draft {
        Draft {
            amount: Some(Amount::from(amount)),
            item: Some(item.to_string()),
            date: Some("2025-10-10".to_string()),
            ..Draft::default()
        }
    }

    #[tokio::test]
    async fn test_start_loads_the_seed() {
        let env = TestEnv::new().await;
        let ledger = env.ledger().await;
        let report = ledger.start().await;
        assert_eq!(report.transactions, 6);
        assert_eq!(report.category_source, CategorySource::Remote);
        assert!(report.categories_replaced);
        let all = ledger.transactions(&Filter::default());
        assert_eq!(all[0].id, "seed-06");
        assert!(ledger.find("row-6").is_some());
    }

    #[tokio::test]
    async fn test_add_converges_without_duplicates() {
        let env = TestEnv::new().await;
        env.set_state(TestRemoteState::empty());
        let ledger = env.ledger().await;
        let added = ledger.add_transaction(draft(120, "午餐")).await;
        assert!(added.row_index.is_none());

        let all = ledger.transactions(&Filter::default());
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, added.id);
        assert_eq!(all[0].row_index, Some(2));
        assert_eq!(all[0].payer_id, MANDY);
        assert_eq!(env.get_state().posts.len(), 1);
    }

    #[tokio::test]
    async fn test_add_with_failed_write_is_undone_by_resync() {
        let env = TestEnv::new().await;
        let mut state = TestRemoteState::empty();
        state.fail_writes = true;
        env.set_state(state);
        let ledger = env.ledger().await;
        ledger.add_transaction(draft(120, "午餐")).await;
        assert!(ledger.transactions(&Filter::default()).is_empty());
    }

    #[tokio::test]
    async fn test_add_uses_category_whitelist() {
        let env = TestEnv::new().await;
        let ledger = env.ledger().await;
        let mut d = draft(50, "咖啡");
        d.category = Some("咖啡因".to_string());
        let added = ledger.add_transaction(d).await;
        assert_eq!(added.category, "其他");
    }

    #[tokio::test]
    async fn test_update_replaces_locally_and_remotely() {
        let env = TestEnv::new().await;
        let ledger = env.ledger().await;
        ledger.start().await;
        let mut d = ledger.find("seed-02").unwrap().to_draft();
        d.amount = Some(Amount::from(200));
        d.row_index = None;
        let updated = ledger.update_transaction(d).await.unwrap();
        assert_eq!(updated.row_index, Some(3));
        assert_eq!(ledger.find("seed-02").unwrap().amount, Amount::from(200));

        let posts = env.get_state().posts;
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0]["rowIndex"], 3);
        assert_eq!(posts[0]["金額"], 200);
    }

    #[tokio::test]
    async fn test_update_unconfirmed_stays_local() {
        let env = TestEnv::new().await;
        env.set_state(TestRemoteState::empty());
        let ledger = env.ledger().await;
        let mut t = ledger.normalize(draft(10, "糖果"));
        ledger.lock().transactions.push(t.clone());
        t.item = "巧克力".to_string();
        let updated = ledger.update_transaction(t.to_draft()).await.unwrap();
        assert_eq!(updated.item, "巧克力");
        assert!(env.get_state().posts.is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let env = TestEnv::new().await;
        let ledger = env.ledger().await;
        let mut d = draft(1, "x");
        assert!(ledger.update_transaction(d.clone()).await.is_err());
        d.id = Some("nope".to_string());
        let e = ledger.update_transaction(d).await.unwrap_err();
        assert_eq!(e.to_string(), "request error");
    }

    #[tokio::test]
    async fn test_delete_confirmed() {
        let env = TestEnv::new().await;
        let ledger = env.ledger().await;
        ledger.start().await;
        let removed = ledger.delete_transaction("seed-03").await.unwrap().unwrap();
        assert_eq!(removed.row_index, Some(4));
        assert!(ledger.find("seed-03").is_none());
        assert_eq!(ledger.transactions(&Filter::default()).len(), 5);
        // The rows below the deleted one moved up.
        assert_eq!(ledger.find("seed-04").unwrap().row_index, Some(4));
    }

    #[tokio::test]
    async fn test_delete_unconfirmed_is_local() {
        let env = TestEnv::new().await;
        env.set_state(TestRemoteState::empty());
        let ledger = env.ledger().await;
        let t = ledger.normalize(draft(10, "糖果"));
        ledger.lock().transactions.push(t.clone());
        let removed = ledger.delete_transaction(&t.id).await.unwrap();
        assert_eq!(removed.map(|t| t.id), Some(t.id));
        assert!(env.get_state().posts.is_empty());
        assert!(ledger.transactions(&Filter::default()).is_empty());
    }

    #[tokio::test]
    async fn test_delete_failure_is_reported_after_resync() {
        let env = TestEnv::new().await;
        let ledger = env.ledger().await;
        ledger.start().await;
        let mut state = env.get_state();
        state.fail_writes = true;
        env.set_state(state);
        let e = ledger.delete_transaction("seed-01").await.unwrap_err();
        assert_eq!(e.to_string(), "remote error");
        // The resync brought the row back.
        assert!(ledger.find("seed-01").is_some());
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_noop() {
        let env = TestEnv::new().await;
        let ledger = env.ledger().await;
        assert!(ledger.delete_transaction("nope").await.unwrap().is_none());
        assert!(env.get_state().posts.is_empty());
    }

    #[tokio::test]
    async fn test_failed_category_fetch_keeps_categories() {
        let env = TestEnv::new().await;
        let ledger = env.ledger().await;
        let mut state = env.get_state();
        state.categories = vec![serde_json::json!("寵物"), serde_json::json!("旅行")];
        env.set_state(state);
        ledger.sync_all().await;
        assert_eq!(ledger.categories(), vec!["寵物", "旅行"]);

        let mut state = env.get_state();
        state.html_reads = true;
        env.set_state(state);
        let report = ledger.sync_all().await;
        assert_eq!(report.category_source, CategorySource::BuiltIn);
        assert!(!report.categories_replaced);
        assert_eq!(ledger.categories(), vec!["寵物", "旅行"]);
        assert!(ledger.transactions(&Filter::default()).is_empty());

        let mut state = env.get_state();
        state.html_reads = false;
        state.categories = Vec::new();
        env.set_state(state);
        ledger.sync_all().await;
        assert_eq!(ledger.categories(), vec!["寵物", "旅行"]);
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let env = TestEnv::new().await;
        let ledger = env.ledger().await;
        ledger.start().await;
        ledger
            .set_preference(Preference::Theme(Theme::Matcha))
            .await
            .unwrap();
        ledger.set_preference(Preference::ToggleUser).await.unwrap();
        let before = ledger.snapshot();

        let reopened = env.ledger().await;
        assert_eq!(reopened.snapshot(), before);
        assert_eq!(reopened.current_user(), PIGGY);
        assert_eq!(reopened.theme(), Theme::Matcha);
    }

    #[tokio::test]
    async fn test_set_current_user() {
        let env = TestEnv::new().await;
        let ledger = env.ledger().await;
        ledger
            .set_preference(Preference::CurrentUser("piggy".to_string()))
            .await
            .unwrap();
        assert_eq!(ledger.current_user(), PIGGY);
        assert!(ledger
            .set_preference(Preference::CurrentUser("Grandma".to_string()))
            .await
            .is_err());
        assert_eq!(ledger.current_user(), PIGGY);
    }

    #[tokio::test]
    async fn test_manual_sync_gate() {
        let env = TestEnv::new().await;
        let ledger = env.ledger().await;
        ledger.syncing.store(true, Ordering::Release);
        assert!(ledger.manual_sync().await.is_err());
        ledger.syncing.store(false, Ordering::Release);
        assert_eq!(ledger.manual_sync().await.unwrap().transactions, 6);
        assert!(!ledger.is_syncing());
    }

    #[tokio::test]
    async fn test_analyze() {
        let env = TestEnv::new().await;
        let ledger = env.ledger().await;
        let request = AnalyzeRequest::text("午餐 120 元", ledger.categories());
        let draft = ledger.analyze(&request).await.unwrap();
        let t = ledger.normalize(draft);
        assert_eq!(t.amount, Amount::from(120));
        assert_eq!(t.category, "餐飲");
        assert_eq!(t.split_type, SplitType::Equal);
        assert_eq!(t.split_with, vec![MANDY, PIGGY]);
        assert!(!ledger.is_analyzing());

        ledger.analyzing.store(true, Ordering::Release);
        assert!(ledger.analyze(&request).await.is_err());
    }

    #[test]
    fn test_ensure_balanced() {
        let mut t = crate::model::test_transaction(100);
        assert!(ensure_balanced(&t).is_ok());
        t.split_type = SplitType::Custom;
        t.set_custom_share(MANDY, "60");
        t.set_custom_share(PIGGY, "39");
        assert!(ensure_balanced(&t).is_err());
        t.set_custom_share(PIGGY, "40");
        assert!(ensure_balanced(&t).is_ok());
    }
}
