//! External collaborators: the spreadsheet-backed remote store and the AI extraction service.
//!
//! Each collaborator has a small trait for raw I/O (`Remote`, `Extractor`) with an HTTP
//! implementation and an in-memory test implementation. The typed mapping lives on top of the raw
//! I/O in `Gateway` and `extract`, so that it is exercised the same way in both modes.

mod extract;
mod gateway;
mod http;
mod row;
mod test_extractor;
mod test_remote;

pub use extract::{extract, mime_type_for, AnalyzeRequest, ExtractionResponse, InputType};
pub use gateway::{CategorySource, FetchedCategories, Gateway};
pub use test_remote::TestRemoteState;

pub(crate) use test_extractor::TestExtractor;
pub(crate) use test_remote::TestRemote;

use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use serde_json::Value;
use std::sync::Arc;

/// The query `action` that asks the remote store for its category list.
pub(crate) const GET_CATEGORIES: &str = "GET_CATEGORIES";

/// Environment variable that, when set and non-empty, replaces the remote store and the AI service
/// with in-memory implementations.
pub const TEST_MODE_ENV: &str = "PIGGY_LEDGER_IN_TEST_MODE";

/// Raw access to the remote store. One endpoint serves reads and writes, and no write is
/// acknowledged in any way worth parsing.
#[async_trait::async_trait]
pub trait Remote: Send + Sync {
    /// Issues a read, optionally with an `action` query parameter, and returns the raw body.
    async fn get(&self, action: Option<&str>) -> Result<String>;

    /// Sends a JSON write request. `Ok` means only that the request was delivered.
    async fn post(&self, body: &Value) -> Result<()>;
}

/// Raw access to the AI extraction service. Returns the response body text, which may be wrapped
/// in code fences.
#[async_trait::async_trait]
pub trait Extractor: Send + Sync {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<String>;
}

/// Selects the real network collaborators or the in-memory ones.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Http,
    Test,
}

impl Mode {
    /// Returns `Mode::Test` when `PIGGY_LEDGER_IN_TEST_MODE` is set to anything non-empty.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Http,
        }
    }
}

/// Creates the `Remote` for the configured sheet endpoint.
pub fn remote(config: &Config, mode: Mode) -> Result<Arc<dyn Remote>> {
    Ok(match mode {
        Mode::Http => Arc::new(http::HttpRemote::new(config.sheet_url())?),
        Mode::Test => Arc::new(TestRemote::new(config.sheet_url().as_str())),
    })
}

/// Creates the `Extractor` for the configured AI endpoint. Fails when no endpoint is configured
/// outside of test mode.
pub fn extractor(config: &Config, mode: Mode) -> Result<Arc<dyn Extractor>> {
    Ok(match mode {
        Mode::Http => {
            let url = config
                .ai_url()
                .context("No ai_url is configured, run 'piggy init' with --ai-url")
                .pub_result(ErrorType::Config)?;
            Arc::new(http::HttpExtractor::new(url)?)
        }
        Mode::Test => Arc::new(TestExtractor::default()),
    })
}
