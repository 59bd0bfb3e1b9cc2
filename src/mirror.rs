//! The local mirror: the whole `AppState` saved as one JSON document under a well-known file name.
//!
//! The mirror is read once when the `Ledger` starts and rewritten wholesale after every change.
//! Nothing in it is trusted on the way back in. A missing or unreadable file yields the default
//! state, a field of the wrong shape yields that field's default, and every saved transaction
//! passes through the `Normalizer` again.

use crate::error::{ErrorType, IntoResult};
use crate::model::draft::text;
use crate::model::member::MANDY;
use crate::model::{
    coerce_category, default_categories, default_members, fold_alias, AppState, Draft, Member,
    Normalizer, Theme,
};
use crate::{utils, Result};
use anyhow::Context;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

#[derive(Debug)]
pub(crate) struct Mirror {
    path: PathBuf,
    /// Serializes writers so that two saves never interleave on the temp file.
    lock: Mutex<()>,
}

impl Mirror {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the saved state. Never fails.
    pub(crate) async fn load(&self) -> AppState {
        if !self.path.is_file() {
            debug!("No mirror at {}, starting fresh", self.path.display());
            return AppState::default();
        }
        let content = match utils::read(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Unable to read the mirror, starting fresh: {e:#}");
                return AppState::default();
            }
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(obj)) => state_from_object(&obj),
            Ok(_) => {
                warn!("The mirror does not hold an object, starting fresh");
                AppState::default()
            }
            Err(e) => {
                warn!("The mirror is corrupt, starting fresh: {e}");
                AppState::default()
            }
        }
    }

    /// Replaces the saved state with the one `snapshot` returns. `snapshot` is called only once
    /// the write lock is held, so a save that started earlier can never overwrite a later state.
    pub(crate) async fn save<F>(&self, snapshot: F) -> Result<()>
    where
        F: FnOnce() -> AppState,
    {
        let _guard = self.lock.lock().await;
        let data =
            serde_json::to_string(&snapshot()).context("Unable to serialize the app state")?;
        trace!("Writing {} bytes to {}", data.len(), self.path.display());
        utils::replace(&self.path, data)
            .await
            .context("Unable to save the local mirror")
            .pub_result(ErrorType::Storage)
    }
}

/// Rebuilds the state field by field, substituting the default for anything unusable.
fn state_from_object(obj: &Map<String, Value>) -> AppState {
    let members = obj
        .get("members")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(member_from_value).collect::<Vec<_>>())
        .filter(|members| !members.is_empty())
        .unwrap_or_else(default_members);

    let categories = obj
        .get("categories")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(coerce_category).collect::<Vec<_>>())
        .filter(|categories| !categories.is_empty())
        .unwrap_or_else(default_categories);

    let current_user = text(obj, "currentUser")
        .map(|name| fold_alias(&name))
        .unwrap_or_else(|| MANDY.to_string());

    let theme = text(obj, "theme")
        .and_then(|t| t.parse::<Theme>().ok())
        .unwrap_or_default();

    // Saved transactions keep the category they were saved with, even one that has since left the
    // whitelist.
    let normalizer = Normalizer::new(members.clone(), Vec::new(), current_user.clone());
    let transactions = obj
        .get("transactions")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter(|v| v.is_object())
                .map(|v| normalizer.normalize(Draft::from_value(v)))
                .collect()
        })
        .unwrap_or_default();

    AppState {
        members,
        categories,
        transactions,
        current_user,
        theme,
        remote_endpoint: text(obj, "remoteEndpoint"),
    }
}

fn member_from_value(value: &Value) -> Option<Member> {
    let obj = value.as_object()?;
    let id = text(obj, "id")?;
    let name = text(obj, "name").unwrap_or_else(|| id.clone());
    Some(Member::new(fold_alias(&id), name))
}
