//! # CampaignRepository
//!
//! キャンペーンと配信先の永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **詳細の一括取得**: 送信オーケストレータが必要とする
//!   キャンペーン + 配信先 + コンタクトを JOIN で一括取得する
//! - **配信先の単一行更新**: 配信先のステータス書き込みは 1 行ずつ独立して
//!   行う。バッチ全体を跨ぐトランザクションは張らない（途中クラッシュ時、
//!   処理済みの配信先は正しい終端状態のまま残る）
//! - **作成の原子性**: キャンペーン行と配信先行の作成のみ
//!   トランザクションで括る

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reachout_domain::{
    campaign::{
        Campaign,
        CampaignDetail,
        CampaignId,
        CampaignName,
        CampaignRecipient,
        CampaignRecipientId,
        CampaignStats,
        CampaignStatus,
        DispatchFailureKind,
        RecipientEntry,
        RecipientStatus,
    },
    contact::{CompanyName, Contact, ContactId, ContactName},
    template::TemplateId,
    value_objects::EmailAddress,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// キャンペーンリポジトリトレイト
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// キャンペーンと配信先を一括挿入する（トランザクション）
    async fn insert_with_recipients(
        &self,
        campaign: &Campaign,
        recipients: &[CampaignRecipient],
    ) -> Result<(), InfraError>;

    /// ID でキャンペーンを検索する（配信先は含まない）
    async fn find_by_id(&self, id: &CampaignId) -> Result<Option<Campaign>, InfraError>;

    /// キャンペーン詳細（配信先 + コンタクト）を取得する
    ///
    /// 配信先は作成順（ID 昇順）で返す。
    async fn find_detail(&self, id: &CampaignId) -> Result<Option<CampaignDetail>, InfraError>;

    /// キャンペーン一覧を状態別集計付きで取得する（作成の新しい順）
    async fn find_all(
        &self,
        status: Option<CampaignStatus>,
    ) -> Result<Vec<(Campaign, CampaignStats)>, InfraError>;

    /// キャンペーンの状態を更新する
    async fn update_status(&self, campaign: &Campaign) -> Result<(), InfraError>;

    /// 配信先 1 行の状態と送信メタデータを更新する
    async fn update_recipient(&self, recipient: &CampaignRecipient) -> Result<(), InfraError>;

    /// キャンペーンを削除する（配信先は連動削除）
    async fn delete(&self, id: &CampaignId) -> Result<(), InfraError>;
}

/// PostgreSQL 実装の CampaignRepository
#[derive(Debug, Clone)]
pub struct PostgresCampaignRepository {
    pool: PgPool,
}

impl PostgresCampaignRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// campaigns テーブルの行データ
#[derive(sqlx::FromRow)]
struct CampaignRow {
    id:          Uuid,
    name:        String,
    template_id: Uuid,
    status:      String,
    created_at:  DateTime<Utc>,
    updated_at:  DateTime<Utc>,
}

impl CampaignRow {
    /// 行データからドメインモデルを復元する
    fn into_domain(self) -> Result<Campaign, InfraError> {
        Ok(Campaign::from_db(
            CampaignId::from_uuid(self.id),
            CampaignName::new(&self.name).map_err(|e| InfraError::Unexpected(e.to_string()))?,
            TemplateId::from_uuid(self.template_id),
            CampaignStatus::from_str(&self.status)
                .map_err(|e| InfraError::Unexpected(e.to_string()))?,
            self.created_at,
            self.updated_at,
        ))
    }
}

/// campaign_recipients と contacts を JOIN した行データ
#[derive(sqlx::FromRow)]
struct RecipientContactRow {
    id:                 Uuid,
    campaign_id:        Uuid,
    contact_id:         Uuid,
    status:             String,
    message_id:         Option<String>,
    failure_kind:       Option<String>,
    error_message:      Option<String>,
    sent_at:            Option<DateTime<Utc>>,
    created_at:         DateTime<Utc>,
    updated_at:         DateTime<Utc>,
    contact_email:      String,
    contact_first_name: String,
    contact_last_name:  Option<String>,
    contact_company:    Option<String>,
    contact_tags:       Vec<String>,
    contact_archived:   bool,
    contact_created_at: DateTime<Utc>,
    contact_updated_at: DateTime<Utc>,
}

impl RecipientContactRow {
    /// 行データから配信先 + コンタクトの組を復元する
    fn into_domain(self) -> Result<RecipientEntry, InfraError> {
        let recipient = CampaignRecipient::from_db(
            CampaignRecipientId::from_uuid(self.id),
            CampaignId::from_uuid(self.campaign_id),
            ContactId::from_uuid(self.contact_id),
            RecipientStatus::from_str(&self.status)
                .map_err(|e| InfraError::Unexpected(e.to_string()))?,
            self.message_id,
            self.failure_kind
                .as_deref()
                .map(DispatchFailureKind::from_str)
                .transpose()
                .map_err(|e| InfraError::Unexpected(e.to_string()))?,
            self.error_message,
            self.sent_at,
            self.created_at,
            self.updated_at,
        );

        let contact = Contact::from_db(
            ContactId::from_uuid(self.contact_id),
            EmailAddress::new(&self.contact_email)
                .map_err(|e| InfraError::Unexpected(e.to_string()))?,
            ContactName::new(&self.contact_first_name)
                .map_err(|e| InfraError::Unexpected(e.to_string()))?,
            self.contact_last_name
                .map(ContactName::new)
                .transpose()
                .map_err(|e| InfraError::Unexpected(e.to_string()))?,
            self.contact_company
                .map(CompanyName::new)
                .transpose()
                .map_err(|e| InfraError::Unexpected(e.to_string()))?,
            self.contact_tags,
            self.contact_archived,
            self.contact_created_at,
            self.contact_updated_at,
        );

        Ok(RecipientEntry { recipient, contact })
    }
}

/// 状態別集計クエリの行データ
#[derive(sqlx::FromRow)]
struct StatusCountRow {
    campaign_id: Uuid,
    status:      String,
    count:       i64,
}

const SELECT_CAMPAIGN: &str = r#"
    SELECT id, name, template_id, status, created_at, updated_at
    FROM campaigns
"#;

#[async_trait]
impl CampaignRepository for PostgresCampaignRepository {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn insert_with_recipients(
        &self,
        campaign: &Campaign,
        recipients: &[CampaignRecipient],
    ) -> Result<(), InfraError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO campaigns (id, name, template_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(campaign.id().as_uuid())
        .bind(campaign.name().as_str())
        .bind(campaign.template_id().as_uuid())
        .bind(campaign.status().to_string())
        .bind(campaign.created_at())
        .bind(campaign.updated_at())
        .execute(&mut *tx)
        .await?;

        for recipient in recipients {
            sqlx::query(
                r#"
                INSERT INTO campaign_recipients (
                    id, campaign_id, contact_id, status, message_id,
                    failure_kind, error_message, sent_at, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(recipient.id().as_uuid())
            .bind(recipient.campaign_id().as_uuid())
            .bind(recipient.contact_id().as_uuid())
            .bind(recipient.status().to_string())
            .bind(recipient.message_id())
            .bind(recipient.failure_kind().map(|k| k.to_string()))
            .bind(recipient.error_message())
            .bind(recipient.sent_at())
            .bind(recipient.created_at())
            .bind(recipient.updated_at())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_by_id(&self, id: &CampaignId) -> Result<Option<Campaign>, InfraError> {
        let row: Option<CampaignRow> =
            sqlx::query_as(&format!("{SELECT_CAMPAIGN} WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        row.map(CampaignRow::into_domain).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_detail(&self, id: &CampaignId) -> Result<Option<CampaignDetail>, InfraError> {
        let campaign = match self.find_by_id(id).await? {
            Some(campaign) => campaign,
            None => return Ok(None),
        };

        let rows: Vec<RecipientContactRow> = sqlx::query_as(
            r#"
            SELECT r.id, r.campaign_id, r.contact_id, r.status, r.message_id,
                   r.failure_kind, r.error_message, r.sent_at,
                   r.created_at, r.updated_at,
                   c.email      AS contact_email,
                   c.first_name AS contact_first_name,
                   c.last_name  AS contact_last_name,
                   c.company    AS contact_company,
                   c.tags       AS contact_tags,
                   c.archived   AS contact_archived,
                   c.created_at AS contact_created_at,
                   c.updated_at AS contact_updated_at
            FROM campaign_recipients r
            JOIN contacts c ON c.id = r.contact_id
            WHERE r.campaign_id = $1
            ORDER BY r.id
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let recipients = rows
            .into_iter()
            .map(RecipientContactRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(CampaignDetail {
            campaign,
            recipients,
        }))
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_all(
        &self,
        status: Option<CampaignStatus>,
    ) -> Result<Vec<(Campaign, CampaignStats)>, InfraError> {
        let rows: Vec<CampaignRow> = sqlx::query_as(&format!(
            r#"
            {SELECT_CAMPAIGN}
            WHERE $1::text IS NULL OR status = $1
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(status.map(|s| s.to_string()))
        .fetch_all(&self.pool)
        .await?;

        let campaigns = rows
            .into_iter()
            .map(CampaignRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        if campaigns.is_empty() {
            return Ok(Vec::new());
        }

        let campaign_ids: Vec<Uuid> = campaigns.iter().map(|c| *c.id().as_uuid()).collect();
        let count_rows: Vec<StatusCountRow> = sqlx::query_as(
            r#"
            SELECT campaign_id, status, COUNT(*) AS count
            FROM campaign_recipients
            WHERE campaign_id = ANY($1)
            GROUP BY campaign_id, status
            "#,
        )
        .bind(&campaign_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut stats_by_campaign: HashMap<Uuid, CampaignStats> = HashMap::new();
        for row in count_rows {
            let status = RecipientStatus::from_str(&row.status)
                .map_err(|e| InfraError::Unexpected(e.to_string()))?;
            stats_by_campaign
                .entry(row.campaign_id)
                .or_default()
                .record(status, row.count);
        }

        Ok(campaigns
            .into_iter()
            .map(|campaign| {
                let stats = stats_by_campaign
                    .remove(campaign.id().as_uuid())
                    .unwrap_or_default();
                (campaign, stats)
            })
            .collect())
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn update_status(&self, campaign: &Campaign) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            UPDATE campaigns
            SET status = $2, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(campaign.id().as_uuid())
        .bind(campaign.status().to_string())
        .bind(campaign.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn update_recipient(&self, recipient: &CampaignRecipient) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            UPDATE campaign_recipients
            SET status = $2, message_id = $3, failure_kind = $4,
                error_message = $5, sent_at = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(recipient.id().as_uuid())
        .bind(recipient.status().to_string())
        .bind(recipient.message_id())
        .bind(recipient.failure_kind().map(|k| k.to_string()))
        .bind(recipient.error_message())
        .bind(recipient.sent_at())
        .bind(recipient.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn delete(&self, id: &CampaignId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM campaigns WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
