pub mod api;
pub mod args;
pub mod commands;
mod config;
mod error;
mod ledger;
mod mirror;
pub mod model;
mod utils;


pub use api::Mode;
pub use config::Config;
pub use error::{Error, ErrorType, Result};
pub use ledger::{Ledger, Preference, SyncReport};
