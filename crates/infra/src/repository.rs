//! # リポジトリ実装
//!
//! ドメインモデルの永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **依存性逆転**: trait を定義し、ユースケース層は trait 経由で利用する
//! - **データベース抽象化**: sqlx を使用し、PostgreSQL 固有の処理をカプセル化
//! - **テスタビリティ**: trait 経由でモック可能な設計

pub mod campaign_repository;
pub mod contact_repository;
pub mod template_repository;

pub use campaign_repository::{CampaignRepository, PostgresCampaignRepository};
pub use contact_repository::{ContactListFilter, ContactRepository, PostgresContactRepository};
pub use template_repository::{PostgresTemplateRepository, TemplateRepository};
