//! フォームデータの解析
//!
//! `application/x-www-form-urlencoded` 形式のクエリ文字列／POSTボディを
//! キーと値のマップへデコードする。

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;

use log::debug;

use crate::common::utils::percent_decode_str;
use crate::error::Error;

/// デコード済みのフォームフィールド
///
/// 重複キーは後勝ち。反復順はキー順で安定している。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: BTreeMap<String, String>,
}

impl FormData {
    /// 空のフォームデータを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// フィールドを追加（既存キーは上書き）
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// フィールドの値を取得
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// フィールドの値を取得（存在しない場合は空文字列）
    pub fn field(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// キー順にフィールドを列挙
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn insert(&mut self, key: String, value: String) {
        self.fields.insert(key, value);
    }
}

/// 解析後の実効リクエストメソッド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMethod {
    GET,
    POST,
    /// `&` も `=` も含まない旧来のインデックス検索形式
    ISINDEX,
}

impl fmt::Display for FormMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormMethod::GET => write!(f, "GET"),
            FormMethod::POST => write!(f, "POST"),
            FormMethod::ISINDEX => write!(f, "ISINDEX"),
        }
    }
}

/// フォーム解析の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedForm {
    /// キーと値のマップ（インデックス形式では空）
    pub data: FormData,
    /// 生テキスト全体をデコードしたもの
    pub text: String,
    /// 実効メソッド
    pub method: FormMethod,
}

impl ParsedForm {
    /// インデックス検索形式かどうか
    pub fn is_index(&self) -> bool {
        self.method == FormMethod::ISINDEX
    }
}

/// フォームパーサー
pub struct FormParser;

impl FormParser {
    /// リクエストメソッドに応じて生テキストを取得し、解析する
    ///
    /// - `POST`: `body` から `content_length` バイトちょうどを読む
    /// - `GET`: `query_string` をそのまま使う
    /// - それ以外: `UnsupportedMethod`
    pub fn parse<R: Read>(
        method: &str,
        query_string: &str,
        content_length: Option<&str>,
        body: R,
        max_body_size: usize,
    ) -> Result<ParsedForm, Error> {
        let (raw, method) = match method {
            "POST" => {
                let length = parse_content_length(content_length)?;
                if length > max_body_size {
                    return Err(Error::PayloadTooLarge(format!(
                        "Request body size {} bytes exceeds maximum allowed size {} bytes",
                        length, max_body_size
                    )));
                }
                (read_exact_body(body, length)?, FormMethod::POST)
            }
            "GET" => (query_string.as_bytes().to_vec(), FormMethod::GET),
            "" => {
                return Err(Error::UnsupportedMethod(
                    "REQUEST_METHOD environment variable not set".to_string(),
                ))
            }
            other => return Err(Error::UnsupportedMethod(other.to_string())),
        };

        let raw = String::from_utf8_lossy(&raw);
        let mut parsed = Self::parse_text(&raw);
        if !parsed.is_index() {
            parsed.method = method;
        }
        debug!(
            "Parsed form: method={}, fields={}",
            parsed.method,
            parsed.data.len()
        );
        Ok(parsed)
    }

    /// 生テキストをキーと値に分解する
    ///
    /// `&` も `=` も含まない場合はインデックス形式として扱い、マップは空になる。
    /// `=` を含まないレコードはレコード全体をキー、値を空文字列とする。
    pub fn parse_text(raw: &str) -> ParsedForm {
        let text = percent_decode_str(raw);

        if raw.is_empty() {
            return ParsedForm {
                data: FormData::new(),
                text,
                method: FormMethod::GET,
            };
        }

        if !raw.contains(['&', '=']) {
            return ParsedForm {
                data: FormData::new(),
                text,
                method: FormMethod::ISINDEX,
            };
        }

        let mut data = FormData::new();
        for record in raw.split('&') {
            let (key, value) = record.split_once('=').unwrap_or((record, ""));
            data.insert(percent_decode_str(key), percent_decode_str(value));
        }

        ParsedForm {
            data,
            text,
            method: FormMethod::GET,
        }
    }
}

/// CONTENT_LENGTH を非負整数として解釈する
fn parse_content_length(content_length: Option<&str>) -> Result<usize, Error> {
    let value = content_length
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            Error::MissingOrInvalidLength("CONTENT_LENGTH environment variable not set".to_string())
        })?;

    value.parse::<usize>().map_err(|_| {
        Error::MissingOrInvalidLength(format!("CONTENT_LENGTH is not a non-negative integer: {}", value))
    })
}

/// 読み込み前に確保するバッファの上限
const INITIAL_BODY_CAPACITY: usize = 8 * 1024;

/// 宣言された長さちょうどのボディを読む（不足は TruncatedBody）
fn read_exact_body<R: Read>(body: R, length: usize) -> Result<Vec<u8>, Error> {
    let mut buffer = Vec::with_capacity(length.min(INITIAL_BODY_CAPACITY));
    body.take(length as u64)
        .read_to_end(&mut buffer)
        .map_err(|e| Error::TruncatedBody(format!("Failed to read request body: {}", e)))?;

    if buffer.len() < length {
        return Err(Error::TruncatedBody(format!(
            "expected {} bytes, got {}",
            length,
            buffer.len()
        )));
    }
    Ok(buffer)
}
