//! # コンタクト
//!
//! アウトリーチの宛先となるコンタクトのドメインモデルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 要件 |
//! |---|------------|------|
//! | [`Contact`] | コンタクト | メールアドレスは非アーカイブ間で一意 |
//! | [`ContactName`] | 表示名 | PII のため Debug 出力はマスク |
//!
//! ## 設計方針
//!
//! - **論理削除**: 削除はアーカイブフラグで表現し、行は残す。
//!   メールアドレスの一意性は非アーカイブ行のみに適用される
//! - **タグの正規化**: 生成・更新時に trim / 空要素除去 / 重複排除を行う
//!
//! ## 使用例
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use reachout_domain::{
//!     contact::{Contact, ContactId, ContactName},
//!     value_objects::EmailAddress,
//! };
//!
//! let contact = Contact::new(
//!     ContactId::new(),
//!     EmailAddress::new("alice@example.com")?,
//!     ContactName::new("Alice")?,
//!     None,
//!     None,
//!     vec!["newsletter".to_string()],
//!     chrono::Utc::now(),
//! );
//!
//! assert!(!contact.archived());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use itertools::Itertools;

use crate::value_objects::EmailAddress;

define_uuid_id! {
    /// コンタクトの一意識別子
    pub struct ContactId;
}

define_validated_string! {
    /// コンタクト表示名（値オブジェクト）
    ///
    /// 名・姓それぞれに使用する。
    /// PII（個人識別情報）のため、Debug 出力はマスクされる。
    ///
    /// # バリデーション
    ///
    /// - 空文字列ではない
    /// - 最大 100 文字
    pub struct ContactName {
        label: "コンタクト名",
        max_length: 100,
        pii: true,
    }
}

define_validated_string! {
    /// 会社名（値オブジェクト）
    ///
    /// # バリデーション
    ///
    /// - 空文字列ではない
    /// - 最大 200 文字
    pub struct CompanyName {
        label: "会社名",
        max_length: 200,
    }
}

/// タグ集合を正規化する
///
/// trim し、空要素を除去し、先頭出現順を保ったまま重複を排除する。
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unique()
        .collect()
}

/// コンタクトエンティティ
///
/// # 不変条件
///
/// - `email` は非アーカイブコンタクト間で一意（DB の部分一意インデックスで保証）
/// - `tags` は正規化済み（空要素・重複を含まない）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    id:         ContactId,
    email:      EmailAddress,
    first_name: ContactName,
    last_name:  Option<ContactName>,
    company:    Option<CompanyName>,
    tags:       Vec<String>,
    archived:   bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Contact {
    /// 新しいコンタクトを作成する
    pub fn new(
        id: ContactId,
        email: EmailAddress,
        first_name: ContactName,
        last_name: Option<ContactName>,
        company: Option<CompanyName>,
        tags: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email,
            first_name,
            last_name,
            company,
            tags: normalize_tags(tags),
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// データベースからコンタクトを復元する
    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: ContactId,
        email: EmailAddress,
        first_name: ContactName,
        last_name: Option<ContactName>,
        company: Option<CompanyName>,
        tags: Vec<String>,
        archived: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email,
            first_name,
            last_name,
            company,
            tags,
            archived,
            created_at,
            updated_at,
        }
    }

    /// プロフィールを更新する
    pub fn update_details(
        self,
        email: EmailAddress,
        first_name: ContactName,
        last_name: Option<ContactName>,
        company: Option<CompanyName>,
        tags: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            email,
            first_name,
            last_name,
            company,
            tags: normalize_tags(tags),
            updated_at: now,
            ..self
        }
    }

    /// コンタクトをアーカイブする（論理削除）
    pub fn archive(self, now: DateTime<Utc>) -> Self {
        Self {
            archived: true,
            updated_at: now,
            ..self
        }
    }

    /// テンプレートレンダリング用のプレースホルダ値を構築する
    ///
    /// キーはテンプレートのプレースホルダ名と一致する
    /// （`firstName`, `lastName`, `company`, `email`）。
    /// 未設定の任意項目は空文字列にマッピングされる。
    pub fn placeholder_values(&self) -> HashMap<String, String> {
        HashMap::from([
            (
                "firstName".to_string(),
                self.first_name.as_str().to_string(),
            ),
            (
                "lastName".to_string(),
                self.last_name
                    .as_ref()
                    .map(|n| n.as_str().to_string())
                    .unwrap_or_default(),
            ),
            (
                "company".to_string(),
                self.company
                    .as_ref()
                    .map(|c| c.as_str().to_string())
                    .unwrap_or_default(),
            ),
            ("email".to_string(), self.email.as_str().to_string()),
        ])
    }

    pub fn id(&self) -> &ContactId {
        &self.id
    }

    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    pub fn first_name(&self) -> &ContactName {
        &self.first_name
    }

    pub fn last_name(&self) -> Option<&ContactName> {
        self.last_name.as_ref()
    }

    pub fn company(&self) -> Option<&CompanyName> {
        self.company.as_ref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn archived(&self) -> bool {
        self.archived
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
