//! CGIリクエストの取得

use std::env;
use std::io::Read;

use crate::common::{FormParser, ParsedForm};
use crate::error::Error;

/// Webサーバーから渡された生のリクエスト情報
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRequest {
    /// REQUEST_METHOD（未設定なら空文字列）
    pub method: String,
    /// QUERY_STRING（未設定なら空文字列）
    pub query_string: String,
    /// CONTENT_LENGTH（未設定なら None）
    pub content_length: Option<String>,
}

impl RawRequest {
    /// 環境変数からリクエスト情報を取得する
    pub fn from_env() -> Self {
        Self {
            method: env::var("REQUEST_METHOD").unwrap_or_default(),
            query_string: env::var("QUERY_STRING").unwrap_or_default(),
            content_length: env::var("CONTENT_LENGTH").ok(),
        }
    }

    /// フォームを解析する（POSTボディは `body` から読む）
    pub fn parse_form<R: Read>(&self, body: R, max_body_size: usize) -> Result<ParsedForm, Error> {
        FormParser::parse(
            &self.method,
            &self.query_string,
            self.content_length.as_deref(),
            body,
            max_body_size,
        )
    }
}
