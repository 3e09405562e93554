//! エラーログファイルへの記録

use std::env;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::Local;
use log::warn;

/// エラー内容をログファイルに追記する
pub fn log_error_to_file(path: &Path, message: &str) {
    let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f UTC");
    let local_time = Local::now().format("%Y-%m-%d %H:%M:%S%.3f %Z");

    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(mut file) => {
            let _ = writeln!(file, "================================================================================");
            let _ = writeln!(file, "FORMRELAY CGI ERROR");
            let _ = writeln!(file, "Timestamp (UTC): {}", timestamp);
            let _ = writeln!(file, "Timestamp (Local): {}", local_time);
            let _ = writeln!(file, "Process ID: {}", std::process::id());
            let _ = writeln!(file, "--------------------------------------------------------------------------------");
            let _ = writeln!(file, "{}", message);
            let _ = writeln!(file, "================================================================================");
            let _ = writeln!(file);
        }
        Err(e) => warn!("Could not open error log {}: {}", path.display(), e),
    }
}

/// 失敗時に記録するリクエスト環境（センシティブな値はマスク）
pub fn gather_request_context() -> String {
    let mut lines = vec!["Request context:".to_string()];

    let vars = [
        "REQUEST_METHOD",
        "QUERY_STRING",
        "CONTENT_TYPE",
        "CONTENT_LENGTH",
        "SCRIPT_NAME",
        "REMOTE_ADDR",
        "HTTP_REFERER",
        "HTTP_USER_AGENT",
    ];
    for key in vars {
        if let Ok(val) = env::var(key) {
            lines.push(format!("  {}={}", key, redact_value_for_log(key, &val)));
        }
    }

    lines.join("\n")
}

pub fn redact_value_for_log(key: &str, value: &str) -> String {
    if key.eq_ignore_ascii_case("query_string") {
        return redact_query_string(value);
    }
    // 長すぎる値は truncate（例：User-Agent）
    match value.char_indices().nth(200) {
        Some((idx, _)) => format!("{}...[truncated]", &value[..idx]),
        None => value.to_string(),
    }
}

pub fn is_sensitive_key_like(lower_key: &str) -> bool {
    let patterns = [
        "password", "pass", "token", "secret", "auth", "session", "csrf", "key", "credential",
    ];
    patterns.iter().any(|p| lower_key.contains(p))
}

/// クエリ文字列のセンシティブなフィールド値をマスクする
pub fn redact_query_string(qs: &str) -> String {
    qs.split('&')
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((k, _)) if is_sensitive_key_like(&k.to_ascii_lowercase()) => {
                format!("{}=***redacted***", k)
            }
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}
