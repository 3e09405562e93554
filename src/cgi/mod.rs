//! CGI環境での実行をサポートするモジュール
//!
//! 環境変数と標準入力からフォームを受け取り、メールを中継し、
//! 結果を標準出力にCGIレスポンスとして書き出す。

pub mod validation;
pub mod error_logging;
pub mod request;
pub mod response;
pub mod core;

pub use self::core::{deliver, run_cgi};
pub use request::RawRequest;
pub use response::Outcome;

#[cfg(test)]
mod tests;
