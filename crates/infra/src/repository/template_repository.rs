//! # TemplateRepository
//!
//! メールテンプレートの永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **派生値の保存**: プレースホルダ一覧はドメイン層で抽出した値を
//!   そのまま保存する（検索・一覧表示でテンプレート本文の再解析を避ける）

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reachout_domain::template::{Template, TemplateId, TemplateName};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// テンプレートリポジトリトレイト
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// テンプレートを挿入する
    async fn insert(&self, template: &Template) -> Result<(), InfraError>;

    /// テンプレートを更新する（アーカイブ含む）
    async fn update(&self, template: &Template) -> Result<(), InfraError>;

    /// ID でテンプレートを検索する
    async fn find_by_id(&self, id: &TemplateId) -> Result<Option<Template>, InfraError>;

    /// テンプレート一覧を取得する（作成の新しい順）
    async fn find_all(&self, include_archived: bool) -> Result<Vec<Template>, InfraError>;
}

/// PostgreSQL 実装の TemplateRepository
#[derive(Debug, Clone)]
pub struct PostgresTemplateRepository {
    pool: PgPool,
}

impl PostgresTemplateRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// templates テーブルの行データ
#[derive(sqlx::FromRow)]
struct TemplateRow {
    id:           Uuid,
    name:         String,
    subject:      String,
    body:         String,
    placeholders: Vec<String>,
    archived:     bool,
    created_at:   DateTime<Utc>,
    updated_at:   DateTime<Utc>,
}

impl TemplateRow {
    /// 行データからドメインモデルを復元する
    fn into_domain(self) -> Result<Template, InfraError> {
        Ok(Template::from_db(
            TemplateId::from_uuid(self.id),
            TemplateName::new(&self.name).map_err(|e| InfraError::Unexpected(e.to_string()))?,
            self.subject,
            self.body,
            self.placeholders,
            self.archived,
            self.created_at,
            self.updated_at,
        ))
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, name, subject, body, placeholders, archived, created_at, updated_at
    FROM templates
"#;

#[async_trait]
impl TemplateRepository for PostgresTemplateRepository {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn insert(&self, template: &Template) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO templates (
                id, name, subject, body, placeholders, archived,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(template.id().as_uuid())
        .bind(template.name().as_str())
        .bind(template.subject())
        .bind(template.body())
        .bind(template.placeholders())
        .bind(template.archived())
        .bind(template.created_at())
        .bind(template.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn update(&self, template: &Template) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            UPDATE templates
            SET name = $2, subject = $3, body = $4, placeholders = $5,
                archived = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(template.id().as_uuid())
        .bind(template.name().as_str())
        .bind(template.subject())
        .bind(template.body())
        .bind(template.placeholders())
        .bind(template.archived())
        .bind(template.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_by_id(&self, id: &TemplateId) -> Result<Option<Template>, InfraError> {
        let row: Option<TemplateRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        row.map(TemplateRow::into_domain).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_all(&self, include_archived: bool) -> Result<Vec<Template>, InfraError> {
        let rows: Vec<TemplateRow> = sqlx::query_as(&format!(
            r#"
            {SELECT_COLUMNS}
            WHERE archived = FALSE OR $1
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(include_archived)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TemplateRow::into_domain).collect()
    }
}
