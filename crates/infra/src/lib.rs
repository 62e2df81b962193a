//! # Reachout インフラ層
//!
//! 外部システムとの接続・通信を担当するインフラストラクチャ層。
//!
//! ## 責務
//!
//! - **データベース接続**: PostgreSQL への接続プール管理
//! - **リポジトリ実装**: コンタクト / テンプレート / キャンペーンの永続化
//! - **メール送信**: SMTP / SES / Noop の送信バックエンド
//!
//! ## 依存関係
//!
//! ```text
//! server → infra → domain
//! ```
//!
//! インフラ層は `domain` に依存する。
//! ドメイン層はインフラ層に依存しない（依存性逆転の原則）。
//!
//! ## モジュール構成
//!
//! - [`db`] - PostgreSQL データベース接続管理
//! - [`error`] - インフラ層エラー定義
//! - [`mailer`] - メール送信バックエンド
//! - [`repository`] - リポジトリ実装

pub mod db;
pub mod error;
pub mod mailer;
pub mod repository;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use error::InfraError;
