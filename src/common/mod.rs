//! 共通の型と処理（フォーム解析、デコード、許可リスト、設定）

pub mod allow_list;
pub mod config;
pub mod form;
pub mod utils;

pub use allow_list::AllowList;
pub use config::RelayConfig;
pub use form::{FormData, FormMethod, FormParser, ParsedForm};
pub use utils::{escape_html, percent_decode, percent_decode_str};
