//! URLデコード等の共通ユーティリティ関数群

/// パーセントエンコーディング（`+` を含む）をデコードする
///
/// 左から右への単一走査で、失敗しない。
/// - `+` は空白に変換
/// - `%` の後に16進2桁が続く場合はその値の1バイトに変換
/// - `%` の後が2バイト未満、または16進数でない場合は `%` をそのまま残す
pub fn percent_decode(input: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        match input[i] {
            b'+' => result.push(b' '),
            b'%' => match decode_escape(input, i) {
                Some(byte) => {
                    result.push(byte);
                    i += 3;
                    continue;
                }
                None => result.push(b'%'),
            },
            other => result.push(other),
        }
        i += 1;
    }
    result
}

/// パーセントデコードした結果を文字列として返す（不正なUTF-8は置換文字）
pub fn percent_decode_str(input: &str) -> String {
    String::from_utf8_lossy(&percent_decode(input.as_bytes())).into_owned()
}

/// `%` 位置から2桁の16進エスケープを読む（範囲外は読まない）
fn decode_escape(input: &[u8], percent_at: usize) -> Option<u8> {
    let hi = from_hex(*input.get(percent_at + 1)?)?;
    let lo = from_hex(*input.get(percent_at + 2)?)?;
    Some(hi * 16 + lo)
}

/// 16進数文字をバイト値に変換するヘルパー関数
fn from_hex(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// HTML出力用に最低限のエスケープを行う
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
