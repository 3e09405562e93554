//! CGI環境でのエントリポイント
//!
//! Webサーバーから1リクエストごとに起動され、フォームをメールとして中継する。

use env_logger::Env;
use log::{error, info};
use formrelay::{cgi, RelayConfig};

#[tokio::main]
async fn main() {
    // ログ設定（標準エラー出力に出力）
    // CGIでは標準出力がHTTPレスポンスとなるため、ログは標準エラー出力に出力する
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    info!("Starting FormRelay CGI application");

    let config = RelayConfig::global();

    if let Err(err) = cgi::run_cgi(config).await {
        error!("Error running CGI application: {:?}", err);
        std::process::exit(1);
    }

    info!("CGI request processed successfully");
}
