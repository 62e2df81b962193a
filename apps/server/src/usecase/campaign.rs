//! キャンペーン管理ユースケース
//!
//! CRUD と一覧の状態別集計を実装する。送信処理は [`send`] サブモジュール。

pub mod send;

use std::sync::Arc;

use itertools::Itertools;
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
    },
    clock::Clock,
    contact::ContactId,
    template::TemplateId,
};
use reachout_infra::repository::{CampaignRepository, ContactRepository, TemplateRepository};
use uuid::Uuid;

use crate::error::ApiError;

/// キャンペーン作成の入力
pub struct CreateCampaignInput {
    pub name:        String,
    pub template_id: Uuid,
    pub contact_ids: Vec<Uuid>,
}

/// キャンペーン管理ユースケース
pub struct CampaignUseCaseImpl {
    campaign_repository: Arc<dyn CampaignRepository>,
    template_repository: Arc<dyn TemplateRepository>,
    contact_repository: Arc<dyn ContactRepository>,
    clock: Arc<dyn Clock>,
}

impl CampaignUseCaseImpl {
    pub fn new(
        campaign_repository: Arc<dyn CampaignRepository>,
        template_repository: Arc<dyn TemplateRepository>,
        contact_repository: Arc<dyn ContactRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            campaign_repository,
            template_repository,
            contact_repository,
            clock,
        }
    }

    /// キャンペーンを作成する
    ///
    /// 1. キャンペーン名と配信先リストのバリデーション
    /// 2. テンプレートの存在確認（アーカイブ済みは使用不可）
    /// 3. コンタクトの存在確認（不足分は列挙して NotFound）
    /// 4. 入力順どおりに配信先行を作成し、キャンペーンと一括挿入
    pub async fn create_campaign(&self, input: CreateCampaignInput) -> Result<Campaign, ApiError> {
        let name =
            CampaignName::new(input.name).map_err(|e| ApiError::BadRequest(e.to_string()))?;

        // 重複 ID は初出順を保って除去する
        let contact_ids: Vec<ContactId> = input
            .contact_ids
            .into_iter()
            .unique()
            .map(ContactId::from_uuid)
            .collect();

        if contact_ids.is_empty() {
            return Err(ApiError::BadRequest(
                "配信先のコンタクトを 1 件以上指定してください".to_string(),
            ));
        }

        let template_id = TemplateId::from_uuid(input.template_id);
        let template = self
            .template_repository
            .find_by_id(&template_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("テンプレートが見つかりません".to_string()))?;
        if template.archived() {
            return Err(ApiError::BadRequest(
                "アーカイブ済みのテンプレートは使用できません".to_string(),
            ));
        }

        let contacts = self.contact_repository.find_by_ids(&contact_ids).await?;
        let missing: Vec<String> = contact_ids
            .iter()
            .filter(|id| !contacts.iter().any(|c| c.id() == *id))
            .map(|id| id.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ApiError::NotFound(format!(
                "コンタクトが見つかりません: {}",
                missing.join(", ")
            )));
        }

        let archived: Vec<String> = contacts
            .iter()
            .filter(|c| c.archived())
            .map(|c| c.email().as_str().to_string())
            .collect();
        if !archived.is_empty() {
            return Err(ApiError::BadRequest(format!(
                "アーカイブ済みのコンタクトは配信先にできません: {}",
                archived.join(", ")
            )));
        }

        let now = self.clock.now();
        let campaign = Campaign::new(CampaignId::new(), name, template_id, now);

        // 配信先行は入力された順序どおりに作成する（送信もこの順で行われる）
        let recipients: Vec<CampaignRecipient> = contact_ids
            .iter()
            .map(|contact_id| {
                CampaignRecipient::new(
                    CampaignRecipientId::new(),
                    campaign.id().clone(),
                    contact_id.clone(),
                    now,
                )
            })
            .collect();

        self.campaign_repository
            .insert_with_recipients(&campaign, &recipients)
            .await?;

        Ok(campaign)
    }

    /// キャンペーン一覧を状態別集計付きで取得する
    pub async fn list_campaigns(
        &self,
        status: Option<CampaignStatus>,
    ) -> Result<Vec<(Campaign, CampaignStats)>, ApiError> {
        let campaigns = self.campaign_repository.find_all(status).await?;
        Ok(campaigns)
    }

    /// キャンペーン詳細（配信先を含む）を取得する
    pub async fn get_campaign_detail(&self, id: &CampaignId) -> Result<CampaignDetail, ApiError> {
        self.campaign_repository
            .find_detail(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("キャンペーンが見つかりません".to_string()))
    }

    /// キャンペーンを削除する（配信先は連動削除）
    pub async fn delete_campaign(&self, id: &CampaignId) -> Result<(), ApiError> {
        self.campaign_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("キャンペーンが見つかりません".to_string()))?;

        self.campaign_repository.delete(id).await?;
        Ok(())
    }
}
