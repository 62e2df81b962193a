//! Noop メール送信実装
//!
//! メールを実際に送信せず、ログ出力のみ行う。
//! ローカル開発や送信無効化時に使用する。

use async_trait::async_trait;

use super::{Mailer, MailerError, OutgoingEmail, TransportMessageId};

/// Noop メール送信（ログ出力のみ）
///
/// 送信ごとに採番した識別子を返すため、上位のステータス記録は
/// 実バックエンドと同じ経路で動作する。
#[derive(Debug, Clone)]
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<TransportMessageId, MailerError> {
        let message_id = format!("noop-{}", uuid::Uuid::now_v7());
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            message_id = %message_id,
            "Noop: メール送信をスキップ"
        );
        Ok(TransportMessageId::new(message_id))
    }
}

#[cfg(test)]
mod tests {
    use reachout_domain::value_objects::EmailAddress;

    use super::*;

    #[tokio::test]
    async fn sendは常に成功しメッセージidを返す() {
        let mailer = NoopMailer;
        let email = OutgoingEmail {
            to:      EmailAddress::new("test@example.com").unwrap(),
            subject: "テスト件名".to_string(),
            body:    "テスト本文".to_string(),
        };

        let message_id = mailer.send(&email).await.unwrap();
        assert!(message_id.as_str().starts_with("noop-"));
    }
}
