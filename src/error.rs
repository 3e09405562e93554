//! エラー型の定義

use thiserror::Error;

/// フォーム中継処理のエラー型
///
/// どのエラーもリクエスト単位で回復不能であり、CGIとしてはエラーページを
/// 出力して非ゼロで終了する。
#[derive(Error, Debug)]
pub enum Error {
    /// CONTENT_LENGTH が存在しない、数値でない、または負
    #[error("Invalid content length: {0}")]
    MissingOrInvalidLength(String),

    /// 宣言された長さのボディを読み切れなかった
    #[error("Truncated request body: {0}")]
    TruncatedBody(String),

    /// GET / POST 以外のリクエストメソッド
    #[error("Unsupported request method: {0}")]
    UnsupportedMethod(String),

    /// 宣言されたボディサイズが上限を超えている
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// 宛先が許可リストに含まれていない
    #[error("Not allowed to send to this address: {0}")]
    RecipientNotAllowed(String),

    /// 許可リストを読み込めない
    #[error("Couldn't verify \"To address\": {0}")]
    AllowListUnavailable(String),

    /// 必須フィールド（from / name）が空
    #[error("Incomplete required fields: {0}")]
    IncompleteRequiredFields(String),

    /// ヘッダーになる値に改行が含まれている
    #[error("Header injection detected: {0}")]
    HeaderInjection(String),

    /// パイプの作成に失敗
    #[error("Could not open pipe: {0}")]
    PipeCreationFailed(String),

    /// 子プロセスの生成に失敗
    #[error("Could not spawn subprocess: {0}")]
    SpawnFailed(String),

    /// メール転送プログラムを実行できない
    #[error("Can't execute mail transfer program: {0}")]
    ExecFailed(String),

    /// メッセージの書き込みに失敗
    #[error("Failed to write message to pipe: {0}")]
    PipeWriteFailed(String),

    /// 子プロセスの待機に失敗
    #[error("Can't wait for child process: {0}")]
    WaitFailed(String),

    /// 子プロセスが制限時間内に終了しなかった
    #[error("Child process timed out: {0}")]
    WaitTimedOut(String),

    /// メール転送プログラムが異常終了した
    #[error("Mail transfer program failed: {0}")]
    MailerFailed(String),

    /// CGIレスポンスの出力に失敗
    #[error("Failed to write response: {0}")]
    OutputFailed(String),
}

impl Error {
    /// エラーからHTTPステータスコードを取得
    pub fn status_code(&self) -> u16 {
        match self {
            Error::MissingOrInvalidLength(_) => 400,
            Error::TruncatedBody(_) => 400,
            Error::UnsupportedMethod(_) => 400,
            Error::IncompleteRequiredFields(_) => 400,
            Error::HeaderInjection(_) => 400,
            Error::RecipientNotAllowed(_) => 403,
            Error::PayloadTooLarge(_) => 413,
            Error::AllowListUnavailable(_) => 500,
            Error::PipeCreationFailed(_) => 500,
            Error::SpawnFailed(_) => 500,
            Error::ExecFailed(_) => 500,
            Error::PipeWriteFailed(_) => 500,
            Error::WaitFailed(_) => 500,
            Error::WaitTimedOut(_) => 500,
            Error::MailerFailed(_) => 500,
            Error::OutputFailed(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(Error::UnsupportedMethod("PUT".into()).status_code(), 400);
        assert_eq!(Error::RecipientNotAllowed("x@example.com".into()).status_code(), 403);
        assert_eq!(Error::PayloadTooLarge("too big".into()).status_code(), 413);
        assert_eq!(Error::WaitTimedOut("30s".into()).status_code(), 500);
    }

    #[test]
    fn test_display_carries_message() {
        let err = Error::ExecFailed("/usr/lib/sendmail: No such file".into());
        assert_eq!(
            err.to_string(),
            "Can't execute mail transfer program: /usr/lib/sendmail: No such file"
        );
    }
}
