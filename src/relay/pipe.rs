//! 子プロセスへのバイト列中継に使う匿名パイプ

use std::io::{self, PipeReader, PipeWriter};

use crate::error::Error;

/// 読み取り端と書き込み端の組
///
/// 各端は取り出されるまでこの構造体が所有し、ドロップ時に閉じられる。
/// 取り出した端は取り出した側の所有となり、そちらのドロップで閉じられる。
/// 一度閉じた端を再度閉じても何も起きない。
#[derive(Debug)]
pub struct PipeChannel {
    reader: Option<PipeReader>,
    writer: Option<PipeWriter>,
}

impl PipeChannel {
    /// パイプを作成する（両端ともclose-on-exec）
    pub fn open() -> Result<Self, Error> {
        let (reader, writer) = io::pipe().map_err(|e| Error::PipeCreationFailed(e.to_string()))?;
        Ok(Self {
            reader: Some(reader),
            writer: Some(writer),
        })
    }

    /// 読み取り端を取り出す（2回目以降は None）
    pub fn take_reader(&mut self) -> Option<PipeReader> {
        self.reader.take()
    }

    /// 書き込み端を取り出す（2回目以降は None）
    pub fn take_writer(&mut self) -> Option<PipeWriter> {
        self.writer.take()
    }

    pub fn close_reader(&mut self) {
        self.reader = None;
    }

    pub fn close_writer(&mut self) {
        self.writer = None;
    }

    pub fn has_reader(&self) -> bool {
        self.reader.is_some()
    }

    pub fn has_writer(&self) -> bool {
        self.writer.is_some()
    }
}
