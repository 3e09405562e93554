//! CGIメイン実行ロジック

use std::io;

use log::{debug, error, info};

use crate::common::{AllowList, FormData, RelayConfig};
use crate::error::Error;
use crate::relay::{MailTransport, ProcessRelay};
use super::error_logging::{gather_request_context, log_error_to_file};
use super::request::RawRequest;
use super::response::{write_error_to, write_stdout, write_success_to, Outcome};
use super::validation::require_sender;

/// CGIリクエストを解析し、メールを中継して結果を標準出力へ書き出す
///
/// 失敗時はエラーページを出力したうえでエラーを返す（呼び出し側は非ゼロで終了する）。
pub async fn run_cgi(config: &RelayConfig) -> Result<(), Error> {
    let raw = RawRequest::from_env();
    debug!("Processing CGI request: method={:?}", raw.method);

    match handle_request(&raw, config).await {
        Ok(outcome) => {
            write_stdout(|out| write_success_to(&outcome, out))?;
            info!("Form relayed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Error processing request: {}", err);
            log_error_to_file(
                &config.error_log_path,
                &format!("{}\n{}", err, gather_request_context()),
            );
            write_stdout(|out| write_error_to(&err, &config.webmaster, out))?;
            Err(err)
        }
    }
}

async fn handle_request(raw: &RawRequest, config: &RelayConfig) -> Result<Outcome, Error> {
    // 標準入力のロックは解析が終わった時点で解放する
    let parsed = raw.parse_form(io::stdin().lock(), config.max_body_size)?;
    if parsed.is_index() {
        debug!("Index query received: {:?}", parsed.text);
    }

    let allow_list = AllowList::load(&config.allow_list_path)?;
    // 宛先の検証は送信者の検証より先に行う
    allow_list.ensure_allowed(parsed.data.field("to"))?;
    let relay = ProcessRelay::from_config(config, allow_list);
    deliver(&parsed.data, &relay).await
}

/// 検証済みのフォームを転送手段へ渡し、成功時の出力を決める
pub async fn deliver<T>(form: &FormData, transport: &T) -> Result<Outcome, Error>
where
    T: MailTransport + ?Sized,
{
    require_sender(form)?;
    // 送信後に出力できないと困るので、リダイレクト先は先に検証する
    let outcome = Outcome::from_form(form)?;

    let status = transport.send(form).await?;
    if !status.success() {
        return Err(Error::MailerFailed(status.to_string()));
    }
    Ok(outcome)
}
