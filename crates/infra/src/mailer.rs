//! # メール送信
//!
//! メール送信を担当するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: [`Mailer`] trait でメール送信を抽象化
//! - **3 つの実装**: SMTP（Mailpit 開発用）、SES（本番用）、Noop（テスト用）
//! - **環境変数切替**: `MAILER_BACKEND` でランタイム選択
//! - **失敗の分類**: トランスポート失敗は [`MailerError`] の 4 種別に分類し、
//!   オーケストレータが配信先ごとの記録と利用者向けメッセージに使用する

mod noop;
mod ses;
mod smtp;

use async_trait::async_trait;
pub use noop::NoopMailer;
use reachout_domain::{campaign::DispatchFailureKind, value_objects::EmailAddress};
pub use ses::SesMailer;
pub use smtp::SmtpMailer;
use thiserror::Error;

/// 送信するメール（レンダリング済み）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// 宛先メールアドレス
    pub to:      EmailAddress,
    /// 件名
    pub subject: String,
    /// プレーンテキスト本文
    pub body:    String,
}

/// トランスポートのメッセージ識別子（不透明な文字列）
///
/// 送信成功時にバックエンドが返す。配信先行に記録される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportMessageId(String);

impl TransportMessageId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// 文字列参照を取得する
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 所有権を持つ文字列に変換する
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for TransportMessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// メール送信エラー（分類済み）
///
/// バックエンド固有のエラーはここで 4 種別に正規化される。
/// オーケストレータは種別ごとに配信先の失敗記録を行い、
/// 1 件の失敗で残りの配信先の処理を中断しない。
#[derive(Debug, Error)]
pub enum MailerError {
    /// 宛先メールアドレス不正
    #[error("宛先メールアドレスが不正です: {0}")]
    InvalidAddress(String),

    /// 送信基盤に到達できない（接続失敗、認証不備、タイムアウト）
    #[error("メール送信基盤に到達できません: {0}")]
    TransportUnavailable(String),

    /// 送信が制限されている（レート制限、サンドボックスの宛先制限）
    #[error("送信が制限されています: {0}")]
    Restricted(String),

    /// 分類不能
    #[error("メール送信で予期しないエラーが発生しました: {0}")]
    Unknown(String),
}

impl MailerError {
    /// 配信先に記録する失敗分類を返す
    pub fn failure_kind(&self) -> DispatchFailureKind {
        match self {
            Self::InvalidAddress(_) => DispatchFailureKind::InvalidAddress,
            Self::TransportUnavailable(_) => DispatchFailureKind::TransportUnavailable,
            Self::Restricted(_) => DispatchFailureKind::Restricted,
            Self::Unknown(_) => DispatchFailureKind::Unknown,
        }
    }
}

/// メール送信トレイト
///
/// メール送信の具体的な方法を抽象化する。
/// SMTP / SES / Noop の 3 実装を環境変数で切り替える。
#[async_trait]
pub trait Mailer: Send + Sync {
    /// メールを 1 通送信する
    ///
    /// 成功時はトランスポートのメッセージ識別子を返す。
    async fn send(&self, email: &OutgoingEmail) -> Result<TransportMessageId, MailerError>;
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(
        MailerError::InvalidAddress("x".to_string()),
        DispatchFailureKind::InvalidAddress
    )]
    #[case(
        MailerError::TransportUnavailable("x".to_string()),
        DispatchFailureKind::TransportUnavailable
    )]
    #[case(MailerError::Restricted("x".to_string()), DispatchFailureKind::Restricted)]
    #[case(MailerError::Unknown("x".to_string()), DispatchFailureKind::Unknown)]
    fn test_failure_kindはバリアントに対応する分類を返す(
        #[case] error: MailerError,
        #[case] expected: DispatchFailureKind,
    ) {
        assert_eq!(error.failure_kind(), expected);
    }
}
