//! メール転送プログラムへの中継
//!
//! フォームデータからメッセージを組み立て、匿名パイプ経由で子プロセスの
//! 標準入力へ流し込み、子プロセスの終了を待つ。

pub mod message;
pub mod pipe;
pub mod process;

use std::process::ExitStatus;

use async_trait::async_trait;

use crate::common::FormData;
use crate::error::Error;

pub use message::{compose_message, is_reserved_key, RESERVED_KEYS};
pub use pipe::PipeChannel;
pub use process::{ChildRole, ParentRole, ProcessRelay, RelayPhase, RelayState};

/// フォームデータをメールとして送り出す手段
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// メッセージを送り、転送プログラムの終了ステータスを返す
    async fn send(&self, form: &FormData) -> Result<ExitStatus, Error>;
}
