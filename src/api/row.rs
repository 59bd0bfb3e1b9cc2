//! The labels the remote store keys its rows by, and the write actions it understands.

pub(crate) const DATE_STR: &str = "日期";
pub(crate) const TYPE_STR: &str = "類型";
pub(crate) const CATEGORY_STR: &str = "類別";
pub(crate) const AMOUNT_STR: &str = "金額";
pub(crate) const MERCHANT_STR: &str = "店家名稱";
pub(crate) const DESCRIPTION_STR: &str = "描述";
pub(crate) const PAYER_STR: &str = "付錢的人";
pub(crate) const SPLIT_STR: &str = "分帳";
pub(crate) const ID_STR: &str = "ID";
pub(crate) const ID_LOWER_STR: &str = "id";
pub(crate) const MAP_LINK_STR: &str = "地圖連結";
pub(crate) const ROW_INDEX_STR: &str = "rowIndex";
pub(crate) const ACTION_STR: &str = "action";

/// The key under which some deployments wrap the row array.
pub(crate) const TRANSACTIONS_STR: &str = "transactions";

pub(crate) const ADD_TRANSACTION: &str = "ADD_TRANSACTION";
pub(crate) const UPDATE_TRANSACTION: &str = "UPDATE_TRANSACTION";
pub(crate) const DELETE_TRANSACTION: &str = "DELETE_TRANSACTION";

/// Row labels in the column order of the sheet. Used to seed and render test data.
pub(crate) const COLUMNS: &[&str] = &[
    DATE_STR,
    TYPE_STR,
    CATEGORY_STR,
    AMOUNT_STR,
    MERCHANT_STR,
    DESCRIPTION_STR,
    PAYER_STR,
    SPLIT_STR,
    ID_STR,
    MAP_LINK_STR,
];
