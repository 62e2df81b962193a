//! # Reachout ドメイン層
//!
//! アウトリーチ管理のドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **エンティティ**: 一意の識別子を持つオブジェクト（Contact, Template,
//!   Campaign, CampaignRecipient）
//! - **値オブジェクト**: 生成時にバリデーションし、不正な値の存在を
//!   型レベルで排除する（EmailAddress, ContactName など）
//! - **純粋性**: このクレートは I/O を行わない。テンプレートレンダリングも
//!   決定的な純粋関数として実装する
//!
//! ## 依存関係の方向
//!
//! ```text
//! server → infra → domain
//! ```
//!
//! ドメイン層はインフラ層（DB、メール送信基盤）に一切依存しない。

#[macro_use]
mod macros;

pub mod campaign;
pub mod clock;
pub mod contact;
pub mod error;
pub mod template;
pub mod value_objects;

pub use error::DomainError;

/// PII 保護モードの Debug 出力に使われるマスク文字列
pub const REDACTED: &str = "[REDACTED]";
