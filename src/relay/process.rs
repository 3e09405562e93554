//! 子プロセスのメール転送プログラムへメッセージを中継する
//!
//! 処理は [`RelayState`] の遷移として Init → Spawn → Parent → Done の順に進む。
//! - Init: パイプを開く
//! - Spawn: 読み取り端を標準入力に結び付けて子プロセスを起動する（ChildRole）
//! - Parent: 書き込み端へメッセージを書き、閉じてから子プロセスの終了を待つ（ParentRole）
//! - Done: 終了ステータスを返す

use std::fmt;
use std::io::{self, BufWriter, PipeReader, PipeWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use tokio::process::{Child, Command};
use tokio::task;
use tokio::time::timeout;

use crate::common::config::{RelayConfig, SENDMAIL_OPTS};
use crate::common::{AllowList, FormData};
use crate::error::Error;

use super::message::compose_message;
use super::pipe::PipeChannel;
use super::MailTransport;

/// 中継処理の段階
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayPhase {
    Init,
    Spawn,
    Parent,
    Done,
}

impl fmt::Display for RelayPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayPhase::Init => write!(f, "init"),
            RelayPhase::Spawn => write!(f, "spawn"),
            RelayPhase::Parent => write!(f, "parent"),
            RelayPhase::Done => write!(f, "done"),
        }
    }
}

/// 中継の状態
///
/// 各状態は次の段階へ進むのに必要なものだけを所有する。
pub enum RelayState {
    /// 送信するメッセージを組み立て済み
    Init { message: Vec<u8> },
    /// パイプを開いた
    Spawn { channel: PipeChannel, message: Vec<u8> },
    /// 子プロセスを起動した
    Parent { role: ParentRole, message: Vec<u8> },
    /// 子プロセスが終了した
    Done(ExitStatus),
}

impl RelayState {
    pub fn phase(&self) -> RelayPhase {
        match self {
            RelayState::Init { .. } => RelayPhase::Init,
            RelayState::Spawn { .. } => RelayPhase::Spawn,
            RelayState::Parent { .. } => RelayPhase::Parent,
            RelayState::Done(_) => RelayPhase::Done,
        }
    }
}

/// 子プロセス側の役割: 標準入力をパイプの読み取り端に差し替えて転送プログラムを実行する
#[derive(Debug, Clone)]
pub struct ChildRole {
    program: PathBuf,
    args: Vec<String>,
}

impl ChildRole {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// 子プロセスを起動する
    ///
    /// プロセス自体を作れなかった場合は `SpawnFailed`、
    /// 転送プログラムへの置き換えに失敗した場合は `ExecFailed`。
    pub fn spawn(&self, stdin: PipeReader) -> Result<Child, Error> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::from(stdin))
            // 子の標準出力はCGIレスポンスを汚さないよう捨てる
            .stdout(Stdio::null())
            .kill_on_drop(true);

        let child = command
            .spawn()
            .map_err(|e| classify_spawn_error(&self.program, e))?;

        // Command が保持している読み取り端の親側複製をここで閉じる
        drop(command);
        Ok(child)
    }
}

/// 起動時のエラーを分類する
///
/// EAGAIN / ENOMEM はプロセス生成の失敗。それ以外（ENOENT, EACCES, ENOEXEC,
/// ENOTDIR, ETXTBSY など）は子側で exec が失敗したものとして扱う。
pub(crate) fn classify_spawn_error(program: &Path, e: io::Error) -> Error {
    let detail = format!("{}: {}", program.display(), e);
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::OutOfMemory => Error::SpawnFailed(detail),
        _ => Error::ExecFailed(detail),
    }
}

/// 親プロセス側の役割: メッセージを書き込み、書き込み端を閉じて子の終了を待つ
pub struct ParentRole {
    writer: PipeWriter,
    child: Child,
}

impl ParentRole {
    pub fn new(writer: PipeWriter, child: Child) -> Self {
        Self { writer, child }
    }

    /// メッセージを書き込み、子プロセスの終了を待つ
    ///
    /// 書き込みと待機の合計が `limit` を超えた場合は子プロセスを強制終了して回収し、
    /// `WaitTimedOut` を返す。
    pub async fn finish(self, message: Vec<u8>, limit: Duration) -> Result<ExitStatus, Error> {
        let Self { writer, mut child } = self;

        // パイプへの書き込みはブロックしうるので専用スレッドで行う。
        // クロージャ終了時に書き込み端がドロップされ、子はEOFを受け取る。
        let write_task = task::spawn_blocking(move || write_message(writer, &message));

        let outcome = timeout(limit, async {
            let written = write_task.await;
            let status = child.wait().await;
            (written, status)
        })
        .await;

        let (written, status) = match outcome {
            Ok(pair) => pair,
            Err(_) => {
                error!("Child process did not exit within {:?}, killing it", limit);
                if let Err(e) = child.start_kill() {
                    warn!("Failed to kill child process: {}", e);
                }
                // ゾンビを残さないよう回収する
                let _ = child.wait().await;
                return Err(Error::WaitTimedOut(format!("no exit within {:?}", limit)));
            }
        };

        let status = status.map_err(|e| Error::WaitFailed(e.to_string()))?;

        let write_error = match written {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(join_err) => Some(format!("writer task failed: {}", join_err)),
        };
        if let Some(reason) = write_error {
            warn!("Writing message to child failed: {}", reason);
            // 子が失敗していれば終了ステータスの方を報告する
            if status.success() {
                return Err(Error::PipeWriteFailed(reason));
            }
        }

        Ok(status)
    }
}

fn write_message(writer: PipeWriter, message: &[u8]) -> io::Result<()> {
    let mut out = BufWriter::new(writer);
    out.write_all(message)?;
    out.flush()
}

/// 子プロセス経由でメールを送る中継
#[derive(Debug, Clone)]
pub struct ProcessRelay {
    child_role: ChildRole,
    allow_list: AllowList,
    wait_timeout: Duration,
}

impl ProcessRelay {
    /// 固定オプション付きの転送プログラムで中継を構築
    pub fn new(program: impl Into<PathBuf>, allow_list: AllowList, wait_timeout: Duration) -> Self {
        let args = SENDMAIL_OPTS.iter().map(|s| s.to_string()).collect();
        Self {
            child_role: ChildRole::new(program, args),
            allow_list,
            wait_timeout,
        }
    }

    /// 設定から中継を構築
    pub fn from_config(config: &RelayConfig, allow_list: AllowList) -> Self {
        Self::new(config.sendmail_path.clone(), allow_list, config.wait_timeout)
    }

    /// 子プロセスの起動方法を差し替える
    pub fn with_child_role(mut self, child_role: ChildRole) -> Self {
        self.child_role = child_role;
        self
    }

    pub fn child_role(&self) -> &ChildRole {
        &self.child_role
    }

    /// フォームデータをメッセージにして子プロセスへ中継し、終了ステータスを返す
    ///
    /// 必須フィールド（from / name）は呼び出し側で検証済みであることを前提とする。
    /// 宛先が許可リストにない場合は、パイプも子プロセスも作らずに失敗する。
    pub async fn send(&self, form: &FormData) -> Result<ExitStatus, Error> {
        self.allow_list.ensure_allowed(form.field("to"))?;
        let message = compose_message(form)?;

        let mut state = RelayState::Init { message };
        loop {
            debug!("Relay phase: {}", state.phase());
            state = match state {
                RelayState::Done(status) => {
                    info!("Mail transfer program exited with {}", status);
                    return Ok(status);
                }
                other => self.step(other).await?,
            };
        }
    }

    /// 状態を1段階進める（Done はそのまま返す）
    pub async fn step(&self, state: RelayState) -> Result<RelayState, Error> {
        match state {
            RelayState::Init { message } => {
                let channel = PipeChannel::open()?;
                Ok(RelayState::Spawn { channel, message })
            }
            RelayState::Spawn { mut channel, message } => {
                let reader = channel
                    .take_reader()
                    .ok_or_else(|| Error::PipeCreationFailed("read end already taken".to_string()))?;
                let child = self.child_role.spawn(reader)?;
                debug!("Spawned {} (pid {:?})", self.child_role.program.display(), child.id());

                let writer = channel
                    .take_writer()
                    .ok_or_else(|| Error::PipeCreationFailed("write end already taken".to_string()))?;
                Ok(RelayState::Parent {
                    role: ParentRole::new(writer, child),
                    message,
                })
            }
            RelayState::Parent { role, message } => {
                let status = role.finish(message, self.wait_timeout).await?;
                Ok(RelayState::Done(status))
            }
            RelayState::Done(status) => Ok(RelayState::Done(status)),
        }
    }
}

#[async_trait]
impl MailTransport for ProcessRelay {
    async fn send(&self, form: &FormData) -> Result<ExitStatus, Error> {
        ProcessRelay::send(self, form).await
    }
}
