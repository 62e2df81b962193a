//! # API エラー定義
//!
//! サーバー固有のエラーと、HTTP レスポンスへの変換を定義する。
//!
//! ## 伝播ポリシー
//!
//! - バリデーションはストレージ・トランスポートに触れる前に境界で拒否する
//! - ストレージ・トランスポートのエラーはここで分類ベースの HTTP
//!   レスポンスに変換し、内部エラーの生のテキストは呼び出し元に返さない
//!   （ログにのみ出力する）
//! - 配信先単位のトランスポート失敗はオーケストレータ内で回復され、
//!   この型には到達しない

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use reachout_infra::{InfraError, mailer::MailerError};
use serde::Serialize;
use thiserror::Error;

/// エラーレスポンス（RFC 7807 Problem Details）
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub title:      String,
    pub status:     u16,
    pub detail:     String,
}

/// API サーバーで発生するエラー
#[derive(Debug, Error)]
pub enum ApiError {
    /// リソースが見つからない
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 不正なリクエスト
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    /// 競合（一意制約違反）
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// メール送信エラー（テスト送信など、単発送信の失敗）
    #[error("メール送信エラー: {0}")]
    Mail(#[from] MailerError),

    /// データベースエラー
    #[error("データベースエラー: {0}")]
    Database(InfraError),

    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl From<InfraError> for ApiError {
    /// インフラ層エラーを API エラーに変換する
    ///
    /// 一意制約違反は 409 になるよう `Conflict` に持ち上げる。
    /// それ以外は 500 として扱う。
    fn from(error: InfraError) -> Self {
        match error {
            InfraError::Conflict { entity: _, id } => {
                Self::Conflict(format!("重複するデータが既に存在します: {id}"))
            }
            other => Self::Database(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, title, detail) = match &self {
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "https://reachout.example.com/errors/not-found",
                "Not Found",
                msg.clone(),
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "https://reachout.example.com/errors/bad-request",
                "Bad Request",
                msg.clone(),
            ),
            ApiError::Conflict(msg) => (
                StatusCode::CONFLICT,
                "https://reachout.example.com/errors/conflict",
                "Conflict",
                msg.clone(),
            ),
            ApiError::Mail(e) => {
                // 分類済みの定型文のみ返し、トランスポートの生のテキストは
                // ログに残す
                tracing::error!("メール送信エラー: {}", e);
                let (status, detail) = match e {
                    MailerError::InvalidAddress(_) => (
                        StatusCode::BAD_REQUEST,
                        "宛先メールアドレスが不正です".to_string(),
                    ),
                    MailerError::TransportUnavailable(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "メール送信基盤に到達できません".to_string(),
                    ),
                    MailerError::Restricted(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "送信が制限されています".to_string(),
                    ),
                    MailerError::Unknown(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "メール送信に失敗しました".to_string(),
                    ),
                };
                (
                    status,
                    "https://reachout.example.com/errors/mail",
                    "Mail Error",
                    detail,
                )
            }
            ApiError::Database(e) => {
                tracing::error!("データベースエラー: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "https://reachout.example.com/errors/internal-error",
                    "Internal Server Error",
                    "内部エラーが発生しました".to_string(),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("内部エラー: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "https://reachout.example.com/errors/internal-error",
                    "Internal Server Error",
                    "内部エラーが発生しました".to_string(),
                )
            }
        };

        (
            status,
            Json(ErrorResponse {
                error_type: error_type.to_string(),
                title: title.to_string(),
                status: status.as_u16(),
                detail,
            }),
        )
            .into_response()
    }
}
