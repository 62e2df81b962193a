//! # サーバー設定
//!
//! 環境変数から API サーバーの設定を読み込む。

use std::env;

/// API サーバーの設定
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// バインドアドレス
    pub host: String,
    /// ポート番号
    pub port: u16,
    /// データベース接続 URL
    pub database_url: String,
    /// メール送信設定
    pub mailer: MailerConfig,
}

/// メール送信の設定
///
/// `MAILER_BACKEND` 環境変数で送信バックエンドを切り替える:
/// - `smtp`: Mailpit（開発）/ SMTP サーバー経由で送信
/// - `ses`: Amazon SES v2 経由で送信（本番）
/// - `noop`: 送信しない（ログ出力のみ）
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// 送信バックエンド（"smtp" | "ses" | "noop"）
    pub backend:           String,
    /// SMTP ホスト（backend=smtp の場合に使用）
    pub smtp_host:         String,
    /// SMTP ポート（backend=smtp の場合に使用）
    pub smtp_port:         u16,
    /// 送信元メールアドレス
    pub from_address:      String,
    /// 配信先 1 件あたりの送信タイムアウト（秒）
    pub send_timeout_secs: u64,
}

impl ServerConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("SERVER_PORT")
                .expect("SERVER_PORT が設定されていません")
                .parse()
                .expect("SERVER_PORT は有効なポート番号である必要があります"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL が設定されていません"),
            mailer: MailerConfig::from_env(),
        })
    }
}

impl MailerConfig {
    /// 環境変数からメール送信設定を読み込む
    fn from_env() -> Self {
        Self {
            backend:           env::var("MAILER_BACKEND").unwrap_or_else(|_| "noop".to_string()),
            smtp_host:         env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string()),
            smtp_port:         env::var("SMTP_PORT")
                .unwrap_or_else(|_| "1025".to_string())
                .parse()
                .expect("SMTP_PORT は有効なポート番号である必要があります"),
            from_address:      env::var("MAIL_FROM_ADDRESS")
                .unwrap_or_else(|_| "noreply@reachout.example.com".to_string()),
            send_timeout_secs: env::var("SEND_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("SEND_TIMEOUT_SECS は有効な秒数である必要があります"),
        }
    }
}
