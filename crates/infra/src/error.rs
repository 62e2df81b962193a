//! # インフラ層エラー定義
//!
//! データベースや外部サービスとの通信で発生するエラーを表現する。
//!
//! ## 設計方針
//!
//! - **エラーの変換**: sqlx::Error を `#[from]` でラップ
//! - **ドメインエラーとの分離**: インフラ固有のエラーを明示
//! - **型による分類**: API 層はバリアントのパターンマッチで HTTP ステータスを
//!   選択する。メッセージ文字列の照合は行わない

use thiserror::Error;

/// インフラ層で発生するエラー
///
/// データベースクエリや行データの復元で発生するエラーの種別。
/// API 層でこのエラー種別に応じて適切な HTTP レスポンスに変換する。
#[derive(Debug, Error)]
pub enum InfraError {
    /// データベースエラー
    ///
    /// SQL クエリの実行失敗、接続エラーなど。
    #[error("データベースエラー: {0}")]
    Database(#[from] sqlx::Error),

    /// 一意制約違反
    ///
    /// リポジトリ実装が制約名を検査して変換する。
    /// ユースケース層で利用者向けメッセージに変換して返す。
    #[error("競合が発生しました: {entity}({id})")]
    Conflict {
        /// エンティティ名（例: "Contact"）
        entity: String,
        /// 競合したキー（例: 重複したメールアドレス）
        id:     String,
    },

    /// 予期しないエラー
    ///
    /// DB 行からドメインモデルへの復元失敗など、
    /// 上記に分類できないエラー。
    #[error("予期しないエラー: {0}")]
    Unexpected(String),
}

/// sqlx のエラーが指定した一意制約の違反かどうかを判定する
pub(crate) fn is_unique_violation(error: &sqlx::Error, constraint: &str) -> bool {
    matches!(
        error,
        sqlx::Error::Database(db_err) if db_err.constraint() == Some(constraint)
    )
}
