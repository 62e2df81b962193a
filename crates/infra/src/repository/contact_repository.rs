//! # ContactRepository
//!
//! コンタクトの永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **論理削除**: アーカイブフラグで表現し、DELETE は発行しない
//! - **一意制約の変換**: 非アーカイブ行の部分一意インデックス
//!   `contacts_email_active_key` の違反は `InfraError::Conflict` に変換する

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reachout_domain::{
    contact::{CompanyName, Contact, ContactId, ContactName},
    value_objects::EmailAddress,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{InfraError, is_unique_violation};

/// メールアドレスの部分一意インデックス名（非アーカイブ行のみ対象）
const EMAIL_UNIQUE_CONSTRAINT: &str = "contacts_email_active_key";

/// コンタクト一覧の絞り込み条件
#[derive(Debug, Clone, Default)]
pub struct ContactListFilter {
    /// 指定したタグを持つコンタクトのみ返す
    pub tag:              Option<String>,
    /// アーカイブ済みを含める
    pub include_archived: bool,
}

/// コンタクトリポジトリトレイト
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// コンタクトを挿入する
    ///
    /// # エラー
    ///
    /// 非アーカイブ行との間でメールアドレスが重複する場合は
    /// `InfraError::Conflict` を返す。
    async fn insert(&self, contact: &Contact) -> Result<(), InfraError>;

    /// コンタクトを更新する（アーカイブ含む）
    ///
    /// # エラー
    ///
    /// メールアドレス重複は `insert` と同じく `InfraError::Conflict`。
    async fn update(&self, contact: &Contact) -> Result<(), InfraError>;

    /// ID でコンタクトを検索する
    async fn find_by_id(&self, id: &ContactId) -> Result<Option<Contact>, InfraError>;

    /// 複数の ID でコンタクトを一括検索する
    ///
    /// 存在しない ID は無視し、見つかったコンタクトのみ返す。
    async fn find_by_ids(&self, ids: &[ContactId]) -> Result<Vec<Contact>, InfraError>;

    /// コンタクト一覧を取得する（作成の新しい順）
    async fn find_all(&self, filter: &ContactListFilter) -> Result<Vec<Contact>, InfraError>;
}

/// PostgreSQL 実装の ContactRepository
#[derive(Debug, Clone)]
pub struct PostgresContactRepository {
    pool: PgPool,
}

impl PostgresContactRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// contacts テーブルの行データ
#[derive(sqlx::FromRow)]
struct ContactRow {
    id:         Uuid,
    email:      String,
    first_name: String,
    last_name:  Option<String>,
    company:    Option<String>,
    tags:       Vec<String>,
    archived:   bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ContactRow {
    /// 行データからドメインモデルを復元する
    fn into_domain(self) -> Result<Contact, InfraError> {
        Ok(Contact::from_db(
            ContactId::from_uuid(self.id),
            EmailAddress::new(&self.email).map_err(|e| InfraError::Unexpected(e.to_string()))?,
            ContactName::new(&self.first_name)
                .map_err(|e| InfraError::Unexpected(e.to_string()))?,
            self.last_name
                .map(ContactName::new)
                .transpose()
                .map_err(|e| InfraError::Unexpected(e.to_string()))?,
            self.company
                .map(CompanyName::new)
                .transpose()
                .map_err(|e| InfraError::Unexpected(e.to_string()))?,
            self.tags,
            self.archived,
            self.created_at,
            self.updated_at,
        ))
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, email, first_name, last_name, company, tags, archived,
           created_at, updated_at
    FROM contacts
"#;

#[async_trait]
impl ContactRepository for PostgresContactRepository {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn insert(&self, contact: &Contact) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO contacts (
                id, email, first_name, last_name, company, tags, archived,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(contact.id().as_uuid())
        .bind(contact.email().as_str())
        .bind(contact.first_name().as_str())
        .bind(contact.last_name().map(|n| n.as_str()))
        .bind(contact.company().map(|c| c.as_str()))
        .bind(contact.tags())
        .bind(contact.archived())
        .bind(contact.created_at())
        .bind(contact.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, EMAIL_UNIQUE_CONSTRAINT) {
                return InfraError::Conflict {
                    entity: "Contact".to_string(),
                    id:     contact.email().as_str().to_string(),
                };
            }
            InfraError::from(e)
        })?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn update(&self, contact: &Contact) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            UPDATE contacts
            SET email = $2, first_name = $3, last_name = $4, company = $5,
                tags = $6, archived = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(contact.id().as_uuid())
        .bind(contact.email().as_str())
        .bind(contact.first_name().as_str())
        .bind(contact.last_name().map(|n| n.as_str()))
        .bind(contact.company().map(|c| c.as_str()))
        .bind(contact.tags())
        .bind(contact.archived())
        .bind(contact.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, EMAIL_UNIQUE_CONSTRAINT) {
                return InfraError::Conflict {
                    entity: "Contact".to_string(),
                    id:     contact.email().as_str().to_string(),
                };
            }
            InfraError::from(e)
        })?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_by_id(&self, id: &ContactId) -> Result<Option<Contact>, InfraError> {
        let row: Option<ContactRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        row.map(ContactRow::into_domain).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_by_ids(&self, ids: &[ContactId]) -> Result<Vec<Contact>, InfraError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows: Vec<ContactRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = ANY($1) ORDER BY id"))
                .bind(&uuids)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(ContactRow::into_domain).collect()
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_all(&self, filter: &ContactListFilter) -> Result<Vec<Contact>, InfraError> {
        let rows: Vec<ContactRow> = sqlx::query_as(&format!(
            r#"
            {SELECT_COLUMNS}
            WHERE ($1::text IS NULL OR $1 = ANY(tags))
              AND (archived = FALSE OR $2)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(filter.tag.as_deref())
        .bind(filter.include_archived)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ContactRow::into_domain).collect()
    }
}
