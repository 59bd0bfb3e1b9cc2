//! These structs provide the CLI interface for the piggy CLI.

use crate::model::Theme;
use chrono::NaiveDate;
use clap::{ArgGroup, Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// piggy: A shared household expense ledger.
///
/// Transactions are split between the members of the household and kept in a spreadsheet that
/// is reached through a web endpoint. A copy of everything is kept locally so that the ledger can
/// be read without the network. Receipts and free-text notes can be turned into transactions by
/// an AI extraction service.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and the configuration file.
    ///
    /// This is the first command you should run. You need the URL of the web endpoint that
    /// serves your ledger spreadsheet, and optionally the URL of the AI extraction service.
    Init(InitArgs),
    /// Fetch every transaction and the category list from the spreadsheet.
    Sync,
    /// List transactions, most recent first.
    List(ListArgs),
    /// Show today's and this month's spending and the three most recent transactions.
    Summary,
    /// Show the category list.
    Categories,
    /// Add a transaction.
    Add(Box<AddArgs>),
    /// Change fields of an existing transaction.
    Update(Box<UpdateArgs>),
    /// Delete a transaction.
    Delete(DeleteArgs),
    /// Turn a note or a photo of a receipt into a transaction with the AI extraction service.
    Analyze(AnalyzeArgs),
    /// Set the current member, or switch to the next one when no name is given.
    User(UserArgs),
    /// Set the color theme.
    Theme(ThemeArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG. See the tracing-subscriber crate for instructions.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where the configuration and the local copy of the ledger are held. Defaults
    /// to ~/piggy-ledger
    #[arg(long, env = "PIGGY_HOME", default_value_t = default_piggy_home())]
    piggy_home: DisplayPath,

    /// Skip the sync that normally runs before a command and work from the local copy only.
    #[arg(long)]
    offline: bool,
}

impl Common {
    pub fn new(log_level: LevelFilter, piggy_home: PathBuf, offline: bool) -> Self {
        Self {
            log_level,
            piggy_home: piggy_home.into(),
            offline,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn piggy_home(&self) -> &DisplayPath {
        &self.piggy_home
    }

    pub fn offline(&self) -> bool {
        self.offline
    }
}

/// (Not shown): Args for the `piggy init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The web endpoint of your ledger spreadsheet. It looks like this:
    /// https://script.google.com/macros/s/AKfycbx9Lq2/exec
    #[arg(long)]
    sheet_url: String,

    /// The endpoint of the AI extraction service. Without it, `piggy analyze` is unavailable.
    #[arg(long)]
    ai_url: Option<String>,
}

impl InitArgs {
    pub fn new(sheet_url: impl Into<String>, ai_url: Option<String>) -> Self {
        Self {
            sheet_url: sheet_url.into(),
            ai_url,
        }
    }

    pub fn sheet_url(&self) -> &str {
        &self.sheet_url
    }

    pub fn ai_url(&self) -> Option<&str> {
        self.ai_url.as_deref()
    }
}

/// (Not shown): Args for the `piggy list` command.
#[derive(Debug, Default, Parser, Clone)]
pub struct ListArgs {
    /// Only transactions in this category.
    #[arg(long)]
    category: Option<String>,

    /// Only transactions whose item or merchant contains this text, ignoring case.
    #[arg(long)]
    search: Option<String>,

    /// Only transactions on or after this date (YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Only transactions on or before this date (YYYY-MM-DD).
    #[arg(long)]
    to: Option<NaiveDate>,

    /// At most this many transactions.
    #[arg(long)]
    limit: Option<usize>,
}

impl ListArgs {
    pub fn new(
        category: Option<String>,
        search: Option<String>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        limit: Option<usize>,
    ) -> Self {
        Self {
            category,
            search,
            from,
            to,
            limit,
        }
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn from(&self) -> Option<NaiveDate> {
        self.from
    }

    pub fn to(&self) -> Option<NaiveDate> {
        self.to
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}

/// The fields of a transaction that `add` and `update` accept. Each one is optional; a field that
/// is left out gets a default on add and is left unchanged on update.
#[derive(Debug, Default, Parser, Clone)]
pub struct TransactionFields {
    /// What was bought.
    #[arg(long)]
    item: Option<String>,

    /// Where it was bought.
    #[arg(long)]
    merchant: Option<String>,

    /// One of the categories shown by `piggy categories`. Anything else becomes the fallback
    /// category.
    #[arg(long)]
    category: Option<String>,

    /// 支出 (expense), 收入 (income), 公帳 (shared account) or 私帳 (private account). The English
    /// names are accepted too.
    #[arg(long = "type")]
    kind: Option<String>,

    /// The date of the transaction. Defaults to today.
    #[arg(long)]
    date: Option<String>,

    /// The member who paid. Defaults to the current member.
    #[arg(long)]
    payer: Option<String>,

    /// Who shares the cost, in the same form as the spreadsheet's split column: either names,
    /// `小豬, Mandy`, for an equal split, or names with amounts, `小豬:30, Mandy:70`, for a custom
    /// split. Defaults to an equal split among all members.
    #[arg(long)]
    split: Option<String>,

    /// A link to the merchant on a map.
    #[arg(long)]
    map_url: Option<String>,
}

impl TransactionFields {
    pub fn item(&self) -> Option<&str> {
        self.item.as_deref()
    }

    pub fn merchant(&self) -> Option<&str> {
        self.merchant.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    pub fn payer(&self) -> Option<&str> {
        self.payer.as_deref()
    }

    pub fn split(&self) -> Option<&str> {
        self.split.as_deref()
    }

    pub fn map_url(&self) -> Option<&str> {
        self.map_url.as_deref()
    }

    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_payer(mut self, payer: impl Into<String>) -> Self {
        self.payer = Some(payer.into());
        self
    }

    pub fn with_split(mut self, split: impl Into<String>) -> Self {
        self.split = Some(split.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }
}

/// (Not shown): Args for the `piggy add` command.
#[derive(Debug, Parser, Clone)]
pub struct AddArgs {
    /// The total amount, e.g. 120 or NT$1,200.
    #[arg(long)]
    amount: String,

    #[clap(flatten)]
    fields: TransactionFields,
}

impl AddArgs {
    pub fn new(amount: impl Into<String>, fields: TransactionFields) -> Self {
        Self {
            amount: amount.into(),
            fields,
        }
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn fields(&self) -> &TransactionFields {
        &self.fields
    }
}

/// (Not shown): Args for the `piggy update` command.
#[derive(Debug, Parser, Clone)]
pub struct UpdateArgs {
    /// The id of the transaction, as shown by `piggy list`.
    #[arg(long)]
    id: String,

    /// The new total amount.
    #[arg(long)]
    amount: Option<String>,

    #[clap(flatten)]
    fields: TransactionFields,
}

impl UpdateArgs {
    pub fn new(id: impl Into<String>, amount: Option<String>, fields: TransactionFields) -> Self {
        Self {
            id: id.into(),
            amount,
            fields,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn amount(&self) -> Option<&str> {
        self.amount.as_deref()
    }

    pub fn fields(&self) -> &TransactionFields {
        &self.fields
    }
}

/// (Not shown): Args for the `piggy delete` command.
#[derive(Debug, Parser, Clone)]
pub struct DeleteArgs {
    /// The id of the transaction, as shown by `piggy list`.
    #[arg(long)]
    id: String,
}

impl DeleteArgs {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// (Not shown): Args for the `piggy analyze` command.
#[derive(Debug, Parser, Clone)]
#[command(group(ArgGroup::new("input").required(true).args(["text", "image"])))]
pub struct AnalyzeArgs {
    /// A note describing the transaction, e.g. "午餐 120 元".
    #[arg(long)]
    text: Option<String>,

    /// A photo of a receipt.
    #[arg(long)]
    image: Option<PathBuf>,

    /// Overrides who shares the cost, in the same form as `piggy add --split`.
    #[arg(long)]
    split: Option<String>,

    /// Save the result as a new transaction. Without this, the result is only shown.
    #[arg(long)]
    yes: bool,
}

impl AnalyzeArgs {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            image: None,
            split: None,
            yes: false,
        }
    }

    pub fn image(path: impl Into<PathBuf>) -> Self {
        Self {
            text: None,
            image: Some(path.into()),
            split: None,
            yes: false,
        }
    }

    pub fn with_split(mut self, split: impl Into<String>) -> Self {
        self.split = Some(split.into());
        self
    }

    pub fn with_yes(mut self, yes: bool) -> Self {
        self.yes = yes;
        self
    }

    pub fn text_input(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn image_path(&self) -> Option<&Path> {
        self.image.as_deref()
    }

    pub fn split(&self) -> Option<&str> {
        self.split.as_deref()
    }

    pub fn yes(&self) -> bool {
        self.yes
    }
}

/// (Not shown): Args for the `piggy user` command.
#[derive(Debug, Parser, Clone)]
pub struct UserArgs {
    /// The member to switch to. Aliases such as `piggy` are accepted.
    name: Option<String>,
}

impl UserArgs {
    pub fn new(name: Option<String>) -> Self {
        Self { name }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// (Not shown): Args for the `piggy theme` command.
#[derive(Debug, Parser, Clone)]
pub struct ThemeArgs {
    #[arg(value_enum)]
    theme: Theme,
}

impl ThemeArgs {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }
}

fn default_piggy_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("piggy-ledger"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --piggy-home or PIGGY_HOME instead of relying on the default \
                piggy home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("piggy-ledger")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}
