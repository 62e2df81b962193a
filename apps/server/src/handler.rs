//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュール（この `handler.rs`）で re-export し、フラットな API を提供
//! - ハンドラは薄く保ち、ビジネスロジックはユースケース層に委譲

pub mod campaign;
pub mod contact;
pub mod health;
pub mod template;

pub use campaign::{
    CampaignState,
    create_campaign,
    delete_campaign,
    get_campaign,
    list_campaigns,
    retry_campaign,
    send_campaign,
};
pub use contact::{
    ContactState,
    archive_contact,
    create_contact,
    get_contact,
    list_contacts,
    update_contact,
};
pub use health::health_check;
pub use template::{
    TemplateState,
    archive_template,
    create_template,
    get_template,
    list_templates,
    render_template,
    send_test_email,
    update_template,
};
