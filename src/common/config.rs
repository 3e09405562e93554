//! 実行時設定
//!
//! 起動時に環境変数から一度だけ読み込み、以後は変更しない。

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

/// メール転送プログラムの既定パス
pub const SENDMAIL: &str = "/usr/lib/sendmail";

/// メール転送プログラムへ渡す固定オプション
///
/// `-t`: コマンドラインの宛先を無視しヘッダーから読む
/// `-oi`: 本文中の `.` だけの行をメッセージ終端とみなさない
pub const SENDMAIL_OPTS: [&str; 2] = ["-t", "-oi"];

/// エラーページ等で使うContent-Typeヘッダー
pub const CONTENT_HTML: &str = "Content-Type: text/html";

const DEFAULT_ALLOW_FILE: &str = "mail_allow";
const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_BODY_SIZE: usize = 5 * 1024 * 1024; // 5MB
const DEFAULT_WEBMASTER: &str = "webmaster@localhost";
const DEFAULT_ERROR_LOG: &str = "formrelay_error.log";

static GLOBAL: OnceLock<RelayConfig> = OnceLock::new();

/// フォーム中継の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// メール転送プログラム（`FORMRELAY_SENDMAIL`）
    pub sendmail_path: PathBuf,
    /// 許可リストファイル（`FORMRELAY_ALLOW_FILE`）
    pub allow_list_path: PathBuf,
    /// 書き込みと子プロセス待機の制限時間（`FORMRELAY_WAIT_TIMEOUT_SECS`）
    pub wait_timeout: Duration,
    /// リクエストボディの最大サイズ（`FORMRELAY_MAX_BODY_SIZE`）
    pub max_body_size: usize,
    /// エラーページに表示する連絡先（`FORMRELAY_WEBMASTER`）
    pub webmaster: String,
    /// エラーログファイル（`FORMRELAY_ERROR_LOG`）
    pub error_log_path: PathBuf,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            sendmail_path: PathBuf::from(SENDMAIL),
            allow_list_path: PathBuf::from(DEFAULT_ALLOW_FILE),
            wait_timeout: Duration::from_secs(DEFAULT_WAIT_TIMEOUT_SECS),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            webmaster: DEFAULT_WEBMASTER.to_string(),
            error_log_path: PathBuf::from(DEFAULT_ERROR_LOG),
        }
    }
}

impl RelayConfig {
    /// 環境変数から設定を構築する（不正な数値は既定値）
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            sendmail_path: env_nonempty("FORMRELAY_SENDMAIL")
                .map(PathBuf::from)
                .unwrap_or(defaults.sendmail_path),
            allow_list_path: env_nonempty("FORMRELAY_ALLOW_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.allow_list_path),
            wait_timeout: env_nonempty("FORMRELAY_WAIT_TIMEOUT_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.wait_timeout),
            max_body_size: env_nonempty("FORMRELAY_MAX_BODY_SIZE")
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(defaults.max_body_size),
            webmaster: env_nonempty("FORMRELAY_WEBMASTER").unwrap_or(defaults.webmaster),
            error_log_path: env_nonempty("FORMRELAY_ERROR_LOG")
                .map(PathBuf::from)
                .unwrap_or(defaults.error_log_path),
        }
    }

    /// プロセス全体で共有する設定（初回呼び出し時に環境変数から読み込む）
    pub fn global() -> &'static RelayConfig {
        GLOBAL.get_or_init(Self::from_env)
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
