//! # ユースケース層
//!
//! API サーバーのビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリ・メーラーを `Arc<dyn Trait>` で外部から注入
//!   （グローバルなストレージクライアントは持たない）
//! - **薄いハンドラ**: ハンドラは薄く保ち、ロジックはユースケースに集約
//! - **境界でのバリデーション**: 入力はストレージ・トランスポートに触れる前に
//!   値オブジェクトの生成で検証する

pub mod campaign;
pub mod contact;
pub mod template;

pub use campaign::{
    CampaignUseCaseImpl,
    CreateCampaignInput,
    send::{CampaignSendUseCaseImpl, RecipientOutcome, SendSummary},
};
pub use contact::{ContactUseCaseImpl, CreateContactInput, UpdateContactInput};
pub use template::{TemplateUseCaseImpl, UpsertTemplateInput};
