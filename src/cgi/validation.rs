//! 中継前の入力検証

use crate::common::FormData;
use crate::error::Error;

/// 送信者の名前とアドレスが入力されているか検証する
pub fn require_sender(form: &FormData) -> Result<(), Error> {
    let missing: Vec<&str> = ["from", "name"]
        .into_iter()
        .filter(|key| form.field(key).is_empty())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::IncompleteRequiredFields(format!("missing {}", missing.join(", "))))
    }
}

/// ヘッダー値が安全かどうか検証する（ASCIIのホワイトリスト）
/// 許可: HTAB(0x09), SP(0x20), 可視ASCII(0x21–0x7E)
pub fn is_valid_header_value(value: &str) -> bool {
    value
        .as_bytes()
        .iter()
        .all(|&c| c == b'\t' || c == b' ' || (0x21..=0x7e).contains(&c))
}
