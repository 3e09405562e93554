//! メール転送プログラムへ渡すメッセージの組み立て

use crate::common::FormData;
use crate::error::Error;

/// メッセージ本体で特別扱いされ、追加パラメータ一覧には出さないキー
pub const RESERVED_KEYS: [&str; 7] = ["to", "from", "subject", "name", "text", "location", "feedback"];

/// 追加パラメータ一覧の見出し
pub const EXTRA_FIELDS_MARKER: &str = "*** Additional Parameters Sent ***";

/// 予約キーかどうか（完全一致）
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// フォームデータからメッセージを組み立てる
///
/// `-t` 付きの転送プログラムはヘッダーから宛先を読むため、
/// ヘッダーになる値に改行が含まれる場合は拒否する。
pub fn compose_message(form: &FormData) -> Result<Vec<u8>, Error> {
    for key in ["to", "from", "name", "subject"] {
        ensure_single_line(key, form.field(key))?;
    }

    let mut message = String::new();
    message.push_str(&format!("To: {}\n", form.field("to")));
    message.push_str(&format!("From: {} <{}>\n", form.field("name"), form.field("from")));
    message.push_str(&format!("Subject: {}\n", form.field("subject")));
    message.push('\n');
    message.push_str(form.field("text"));
    message.push('\n');

    message.push('\n');
    message.push_str(EXTRA_FIELDS_MARKER);
    message.push('\n');
    for (key, value) in form.iter().filter(|(key, _)| !is_reserved_key(key)) {
        message.push_str(&format!("{} = {}\n", key, value));
    }

    Ok(message.into_bytes())
}

fn ensure_single_line(key: &str, value: &str) -> Result<(), Error> {
    if value.contains(['\r', '\n']) {
        return Err(Error::HeaderInjection(format!("field '{}' contains a line break", key)));
    }
    Ok(())
}
