use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory and an initial `config.json`.
///
/// # Arguments
/// - `piggy_home` - The directory that will be the root of data directory, e.g.
///   `$HOME/piggy-ledger`
/// - `sheet_url` - The web endpoint of the ledger spreadsheet, e.g.
///   https://script.google.com/macros/s/AKfycbx9Lq2/exec
/// - `ai_url` - The endpoint of the AI extraction service, if there is one.
///
/// # Errors
/// - Returns an error if a URL is invalid, the config already exists, or any file operation fails.
pub async fn init(piggy_home: &Path, sheet_url: &str, ai_url: Option<&str>) -> Result<Out<()>> {
    let config = Config::create(piggy_home, sheet_url, ai_url)
        .await
        .context("Unable to create the data directory and configs")
        .pub_result(ErrorType::Config)?;
    Ok(format!(
        "Successfully created the piggy directory and config at {}",
        config.root().display()
    )
    .into())
}
