//! # Reachout 共有クレート
//!
//! レイヤを跨いで使用する型を定義する。
//!
//! ## モジュール構成
//!
//! - [`api_response`] - API レスポンスエンベロープ

pub mod api_response;

pub use api_response::ApiResponse;
