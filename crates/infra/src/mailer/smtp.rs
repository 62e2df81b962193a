//! SMTP メール送信実装
//!
//! lettre の `AsyncSmtpTransport` を使用してメールを送信する。
//! 開発環境では Mailpit（ローカル SMTP サーバー）に接続する。

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport,
    AsyncTransport,
    Tokio1Executor,
    message::{Message, SinglePart, header::ContentType},
};

use super::{Mailer, MailerError, OutgoingEmail, TransportMessageId};

/// SMTP メール送信
///
/// `lettre::AsyncSmtpTransport<Tokio1Executor>` をラップする。
/// Mailpit（開発）や SMTP リレー（テスト環境）で使用する。
pub struct SmtpMailer {
    transport:    AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// 新しい SMTP 送信インスタンスを作成
    ///
    /// # 引数
    ///
    /// - `host`: SMTP サーバーのホスト名（例: "localhost"）
    /// - `port`: SMTP サーバーのポート番号（例: 1025 for Mailpit）
    /// - `from_address`: 送信元メールアドレス
    pub fn new(host: &str, port: u16, from_address: String) -> Self {
        // builder_dangerous: TLS なしで接続（Mailpit 等のローカル SMTP 向け）
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .build();

        Self {
            transport,
            from_address,
        }
    }
}

/// SMTP トランスポートエラーを分類する
///
/// - 永続的エラー（5xx）: 宛先拒否が主因のため `InvalidAddress`
/// - 一時的エラー（4xx）: レート制限・グレイリスティングのため `Restricted`
/// - それ以外（接続・IO）: `TransportUnavailable`
fn classify_smtp_error(error: &lettre::transport::smtp::Error) -> MailerError {
    if error.is_permanent() {
        MailerError::InvalidAddress(error.to_string())
    } else if error.is_transient() {
        MailerError::Restricted(error.to_string())
    } else {
        MailerError::TransportUnavailable(error.to_string())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<TransportMessageId, MailerError> {
        // SMTP は応答からメッセージ識別子を得られないため、
        // Message-ID ヘッダを自前で採番してそれを識別子として返す
        let message_id = format!("<{}@reachout>", uuid::Uuid::now_v7());

        let message = Message::builder()
            .from(self
                .from_address
                .parse()
                .map_err(|e| MailerError::TransportUnavailable(format!("送信元アドレス不正: {e}")))?)
            .to(email
                .to
                .as_str()
                .parse()
                .map_err(|e| MailerError::InvalidAddress(format!("宛先アドレス不正: {e}")))?)
            .subject(&email.subject)
            .message_id(Some(message_id.clone()))
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(email.body.clone()),
            )
            .map_err(|e| MailerError::Unknown(format!("メッセージ構築失敗: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| classify_smtp_error(&e))?;

        Ok(TransportMessageId::new(message_id))
    }
}
