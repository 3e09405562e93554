//! CGIレスポンスの出力機能

use std::io::{self, Write};

use crate::common::config::CONTENT_HTML;
use crate::common::{escape_html, FormData};
use crate::error::Error;
use super::validation::is_valid_header_value;

/// 送信成功時に返す内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `location` フィールドへのリダイレクト
    Redirect(String),
    /// `feedback` フィールドのHTMLをそのまま返す
    Feedback(String),
    /// どちらも指定されていない
    Empty,
}

impl Outcome {
    /// フォームデータから成功時の出力を決める（location が優先）
    pub fn from_form(form: &FormData) -> Result<Self, Error> {
        let location = form.field("location");
        if !location.is_empty() {
            if !is_valid_header_value(location) {
                return Err(Error::HeaderInjection("field 'location' is not a valid header value".to_string()));
            }
            return Ok(Outcome::Redirect(location.to_string()));
        }

        let feedback = form.field("feedback");
        if !feedback.is_empty() {
            return Ok(Outcome::Feedback(feedback.to_string()));
        }
        Ok(Outcome::Empty)
    }
}

/// 成功レスポンスを任意のライターへ書き出す
pub fn write_success_to<W: Write>(outcome: &Outcome, out: &mut W) -> Result<(), Error> {
    let text = match outcome {
        Outcome::Redirect(location) => format!("Location: {}\r\n\r\n", location),
        Outcome::Feedback(markup) => format!("{}\r\n\r\n{}\n", CONTENT_HTML, markup),
        Outcome::Empty => format!("{}\r\n\r\n", CONTENT_HTML),
    };
    out.write_all(text.as_bytes())
        .map_err(|e| Error::OutputFailed(format!("Failed to write response: {}", e)))
}

/// エラーレスポンス（HTMLのエラーページ）を任意のライターへ書き出す
pub fn write_error_to<W: Write>(err: &Error, webmaster: &str, out: &mut W) -> Result<(), Error> {
    let status = err.status_code();
    let page = match err {
        Error::IncompleteRequiredFields(_) => incomplete_page(),
        _ => error_page(err, webmaster),
    };

    let text = format!(
        "Status: {} {}\r\n{}\r\n\r\n{}",
        status,
        reason_phrase(status),
        CONTENT_HTML,
        page
    );
    out.write_all(text.as_bytes())
        .map_err(|e| Error::OutputFailed(format!("Failed to write error page: {}", e)))
}

/// 標準出力へ書き出してフラッシュする
pub fn write_stdout<F>(write: F) -> Result<(), Error>
where
    F: FnOnce(&mut io::StdoutLock<'static>) -> Result<(), Error>,
{
    let mut out = io::stdout().lock();
    let res = write(&mut out);
    out.flush().map_err(|e| Error::OutputFailed(format!("Failed to flush stdout: {}", e)))?;
    res
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        403 => "Forbidden",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

fn incomplete_page() -> String {
    "<HTML>\n<HEAD>\n<TITLE>NOT complete!</TITLE>\n</HEAD>\n\
     <BODY>\n<H1>NOT complete!</H1><HR>\n\
     <P><B>You must enter both your name and E-mail address!</B></P>\n\
     <P><B><A HREF=\"JavaScript:history.back()\">Please, try again</A></B></P>\n\
     </BODY>\n</HTML>\n"
        .to_string()
}

fn error_page(err: &Error, webmaster: &str) -> String {
    format!(
        "<HTML>\n<HEAD>\n<TITLE>CGI error!</TITLE>\n</HEAD>\n\
         <BODY>\n<H1>CGI error!</H1><HR>\n\
         <P>Reported: <B>{}</B></P>\n\
         <P>Please, contact the <A HREF=\"mailto:{}?subject=cgi%20error\">webmaster</A></P>\n\
         </BODY>\n</HTML>\n",
        escape_html(&err.to_string()),
        escape_html(webmaster)
    )
}
