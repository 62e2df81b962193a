//! # キャンペーンハンドラ
//!
//! キャンペーン管理と送信 API を提供する。
//!
//! ## エンドポイント
//!
//! - `GET /api/campaigns` - キャンペーン一覧（状態別集計付き）
//! - `POST /api/campaigns` - キャンペーン作成
//! - `GET /api/campaigns/{campaign_id}` - キャンペーン詳細（配信先を含む）
//! - `DELETE /api/campaigns/{campaign_id}` - キャンペーン削除
//! - `POST /api/campaigns/{campaign_id}/send` - キャンペーン送信
//! - `POST /api/campaigns/{campaign_id}/retry` - 送信失敗分の再送

use std::{str::FromStr, sync::Arc};

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use reachout_domain::campaign::{
    Campaign,
    CampaignId,
    CampaignStats,
    CampaignStatus,
    DispatchFailureKind,
    RecipientEntry,
    RecipientStatus,
};
use reachout_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    usecase::{
        CampaignSendUseCaseImpl,
        CampaignUseCaseImpl,
        CreateCampaignInput,
        SendSummary,
    },
};

/// キャンペーン API の共有状態
pub struct CampaignState {
    pub usecase:      CampaignUseCaseImpl,
    pub send_usecase: CampaignSendUseCaseImpl,
}

// --- リクエスト/レスポンス型 ---

/// キャンペーン一覧クエリパラメータ
#[derive(Debug, Deserialize)]
pub struct CampaignListQuery {
    /// キャンペーン状態で絞り込む（snake_case）
    pub status: Option<String>,
}

/// キャンペーン作成リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub name:        String,
    pub template_id: Uuid,
    pub contact_ids: Vec<Uuid>,
}

/// キャンペーン DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CampaignDto {
    pub id:          Uuid,
    pub name:        String,
    pub template_id: Uuid,
    pub status:      CampaignStatus,
    pub created_at:  String,
    pub updated_at:  String,
}

impl CampaignDto {
    fn from_entity(campaign: &Campaign) -> Self {
        Self {
            id:          *campaign.id().as_uuid(),
            name:        campaign.name().as_str().to_string(),
            template_id: *campaign.template_id().as_uuid(),
            status:      campaign.status(),
            created_at:  campaign.created_at().to_rfc3339(),
            updated_at:  campaign.updated_at().to_rfc3339(),
        }
    }
}

/// 配信先の状態別集計 DTO
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CampaignStatsDto {
    pub total:   i64,
    pub pending: i64,
    pub sent:    i64,
    pub failed:  i64,
    pub opened:  i64,
    pub clicked: i64,
    pub bounced: i64,
}

impl CampaignStatsDto {
    fn from_stats(stats: &CampaignStats) -> Self {
        Self {
            total:   stats.total,
            pending: stats.pending,
            sent:    stats.sent,
            failed:  stats.failed,
            opened:  stats.opened,
            clicked: stats.clicked,
            bounced: stats.bounced,
        }
    }
}

/// キャンペーン一覧項目 DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CampaignListItemDto {
    #[serde(flatten)]
    pub campaign: CampaignDto,
    pub stats:    CampaignStatsDto,
}

/// 配信先 DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RecipientDto {
    pub id:            Uuid,
    pub contact_id:    Uuid,
    pub email:         String,
    pub status:        RecipientStatus,
    pub message_id:    Option<String>,
    pub failure_kind:  Option<DispatchFailureKind>,
    pub error_message: Option<String>,
    pub sent_at:       Option<String>,
}

impl RecipientDto {
    fn from_entry(entry: &RecipientEntry) -> Self {
        Self {
            id:            *entry.recipient.id().as_uuid(),
            contact_id:    *entry.recipient.contact_id().as_uuid(),
            email:         entry.contact.email().as_str().to_string(),
            status:        entry.recipient.status(),
            message_id:    entry.recipient.message_id().map(String::from),
            failure_kind:  entry.recipient.failure_kind(),
            error_message: entry.recipient.error_message().map(String::from),
            sent_at:       entry.recipient.sent_at().map(|t| t.to_rfc3339()),
        }
    }
}

/// キャンペーン詳細 DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CampaignDetailDto {
    #[serde(flatten)]
    pub campaign:   CampaignDto,
    pub stats:      CampaignStatsDto,
    pub recipients: Vec<RecipientDto>,
}

/// 配信先 1 件の送信結果 DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RecipientOutcomeDto {
    pub recipient_id:  Uuid,
    pub contact_id:    Uuid,
    pub email:         String,
    pub status:        RecipientStatus,
    pub message_id:    Option<String>,
    pub failure_kind:  Option<DispatchFailureKind>,
    pub error_message: Option<String>,
}

/// 送信集計 DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SendSummaryDto {
    pub attempted: usize,
    pub sent:      usize,
    pub failed:    usize,
    pub outcomes:  Vec<RecipientOutcomeDto>,
}

impl SendSummaryDto {
    fn from_summary(summary: &SendSummary) -> Self {
        Self {
            attempted: summary.attempted,
            sent:      summary.sent,
            failed:    summary.failed,
            outcomes:  summary
                .outcomes
                .iter()
                .map(|o| RecipientOutcomeDto {
                    recipient_id:  *o.recipient_id.as_uuid(),
                    contact_id:    *o.contact_id.as_uuid(),
                    email:         o.email.as_str().to_string(),
                    status:        o.status,
                    message_id:    o.message_id.clone(),
                    failure_kind:  o.failure_kind,
                    error_message: o.error_message.clone(),
                })
                .collect(),
        }
    }
}

// --- ハンドラ ---

/// GET /api/campaigns
///
/// キャンペーン一覧を状態別集計付きで取得する。
///
/// ## レスポンス
///
/// - `200 OK`: キャンペーンの配列
/// - `400 Bad Request`: 不正な状態フィルタ
#[tracing::instrument(skip_all)]
pub async fn list_campaigns(
    State(state): State<Arc<CampaignState>>,
    Query(query): Query<CampaignListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(CampaignStatus::from_str)
        .transpose()
        .map_err(|_| {
            ApiError::BadRequest(format!(
                "不正なキャンペーン状態です: {}",
                query.status.as_deref().unwrap_or_default()
            ))
        })?;

    let campaigns = state.usecase.list_campaigns(status).await?;
    let items: Vec<CampaignListItemDto> = campaigns
        .iter()
        .map(|(campaign, stats)| CampaignListItemDto {
            campaign: CampaignDto::from_entity(campaign),
            stats:    CampaignStatsDto::from_stats(stats),
        })
        .collect();

    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}

/// POST /api/campaigns
///
/// キャンペーンを作成する。選択したコンタクト 1 件につき配信先行が
/// 1 行（状態 Draft）作成される。
///
/// ## レスポンス
///
/// - `201 Created`: 作成されたキャンペーン
/// - `400 Bad Request`: バリデーションエラー
/// - `404 Not Found`: テンプレート・コンタクトが見つからない
#[tracing::instrument(skip_all)]
pub async fn create_campaign(
    State(state): State<Arc<CampaignState>>,
    Json(req): Json<CreateCampaignRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = CreateCampaignInput {
        name:        req.name,
        template_id: req.template_id,
        contact_ids: req.contact_ids,
    };

    let campaign = state.usecase.create_campaign(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(CampaignDto::from_entity(&campaign))),
    ))
}

/// GET /api/campaigns/{campaign_id}
///
/// キャンペーン詳細（配信先を含む）を取得する。
#[tracing::instrument(skip_all, fields(%campaign_id))]
pub async fn get_campaign(
    State(state): State<Arc<CampaignState>>,
    Path(campaign_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .usecase
        .get_campaign_detail(&CampaignId::from_uuid(campaign_id))
        .await?;

    let dto = CampaignDetailDto {
        campaign:   CampaignDto::from_entity(&detail.campaign),
        stats:      CampaignStatsDto::from_stats(&detail.stats()),
        recipients: detail.recipients.iter().map(RecipientDto::from_entry).collect(),
    };

    Ok((StatusCode::OK, Json(ApiResponse::new(dto))))
}

/// DELETE /api/campaigns/{campaign_id}
///
/// キャンペーンを削除する。配信先行は連動削除される
/// （コンタクトは削除されない）。
#[tracing::instrument(skip_all, fields(%campaign_id))]
pub async fn delete_campaign(
    State(state): State<Arc<CampaignState>>,
    Path(campaign_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .usecase
        .delete_campaign(&CampaignId::from_uuid(campaign_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/campaigns/{campaign_id}/send
///
/// キャンペーンを送信する。
///
/// ## レスポンス
///
/// - `200 OK`: 送信集計（一部失敗も 200 で集計に反映される）
/// - `400 Bad Request`: 送信待ちの配信先がない / テンプレート欠落
/// - `404 Not Found`: キャンペーンが見つからない
#[tracing::instrument(skip_all, fields(%campaign_id))]
pub async fn send_campaign(
    State(state): State<Arc<CampaignState>>,
    Path(campaign_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .send_usecase
        .send_campaign(&CampaignId::from_uuid(campaign_id))
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(SendSummaryDto::from_summary(&summary))),
    ))
}

/// POST /api/campaigns/{campaign_id}/retry
///
/// 送信失敗（Failed）の配信先だけを再送する。
///
/// ## レスポンス
///
/// - `200 OK`: 送信集計
/// - `400 Bad Request`: 再送対象の配信先がない / テンプレート欠落
/// - `404 Not Found`: キャンペーンが見つからない
#[tracing::instrument(skip_all, fields(%campaign_id))]
pub async fn retry_campaign(
    State(state): State<Arc<CampaignState>>,
    Path(campaign_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .send_usecase
        .retry_failed(&CampaignId::from_uuid(campaign_id))
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(SendSummaryDto::from_summary(&summary))),
    ))
}
