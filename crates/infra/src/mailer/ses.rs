//! SES メール送信実装
//!
//! AWS SES v2 API を使用してメールを送信する。本番環境で使用する。
//!
//! SES サンドボックス中は検証済みアドレス以外への送信が
//! `MessageRejected` で拒否される。これは `Restricted` に分類され、
//! 配信先ごとの失敗として記録される（バッチ全体は中断しない）。

use async_trait::async_trait;
use aws_sdk_sesv2::{
    Client,
    error::SdkError,
    operation::send_email::SendEmailError,
    types::{Body, Content, Destination, EmailContent, Message},
};

use super::{Mailer, MailerError, OutgoingEmail, TransportMessageId};

/// SES メール送信
///
/// `aws_sdk_sesv2::Client` をラップする。
pub struct SesMailer {
    client:       Client,
    from_address: String,
}

impl SesMailer {
    /// 新しい SES 送信インスタンスを作成
    ///
    /// # 引数
    ///
    /// - `client`: AWS SES v2 クライアント
    /// - `from_address`: 送信元メールアドレス（SES で検証済みであること）
    pub fn new(client: Client, from_address: String) -> Self {
        Self {
            client,
            from_address,
        }
    }
}

/// SES のエラーを分類する
///
/// | SES エラー | 分類 |
/// |-----------|------|
/// | MessageRejected（サンドボックスの宛先未検証を含む） | Restricted |
/// | TooManyRequests / LimitExceeded | Restricted |
/// | SendingPaused / AccountSuspended / MailFromDomainNotVerified | TransportUnavailable |
/// | BadRequest | InvalidAddress |
/// | 接続失敗・タイムアウト | TransportUnavailable |
fn classify_ses_error<R>(error: SdkError<SendEmailError, R>) -> MailerError
where
    R: std::fmt::Debug + Send + Sync + 'static,
{
    match &error {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            return MailerError::TransportUnavailable(format!("SES への接続に失敗: {error}"));
        }
        _ => {}
    }

    let service_error = error.into_service_error();
    let detail = service_error.to_string();

    if service_error.is_message_rejected()
        || service_error.is_too_many_requests_exception()
        || service_error.is_limit_exceeded_exception()
    {
        MailerError::Restricted(detail)
    } else if service_error.is_sending_paused_exception()
        || service_error.is_account_suspended_exception()
        || service_error.is_mail_from_domain_not_verified_exception()
    {
        MailerError::TransportUnavailable(detail)
    } else if service_error.is_bad_request_exception() {
        MailerError::InvalidAddress(detail)
    } else {
        MailerError::Unknown(detail)
    }
}

#[async_trait]
impl Mailer for SesMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<TransportMessageId, MailerError> {
        let destination = Destination::builder()
            .to_addresses(email.to.as_str())
            .build();

        let content = EmailContent::builder()
            .simple(
                Message::builder()
                    .subject(
                        Content::builder()
                            .data(&email.subject)
                            .build()
                            .map_err(|e| MailerError::Unknown(format!("件名構築失敗: {e}")))?,
                    )
                    .body(
                        Body::builder()
                            .text(
                                Content::builder()
                                    .data(&email.body)
                                    .build()
                                    .map_err(|e| {
                                        MailerError::Unknown(format!("本文構築失敗: {e}"))
                                    })?,
                            )
                            .build(),
                    )
                    .build(),
            )
            .build();

        let output = self
            .client
            .send_email()
            .from_email_address(&self.from_address)
            .destination(destination)
            .content(content)
            .send()
            .await
            .map_err(classify_ses_error)?;

        output
            .message_id()
            .map(TransportMessageId::new)
            .ok_or_else(|| {
                MailerError::Unknown("SES がメッセージ ID を返しませんでした".to_string())
            })
    }
}
