//! FormRelay: HTMLフォームの送信内容をメールとして中継するCGIライブラリ
//!
//! URLエンコードされたフォームをデコードし、宛先を許可リストで検証したうえで、
//! 匿名パイプ経由でメール転送プログラム（sendmail）の標準入力へ書き込む。

pub mod cgi;
pub mod common;
pub mod error;
pub mod relay;

pub use common::*;
pub use error::*;
pub use relay::{MailTransport, ProcessRelay};
