//! テンプレート管理ユースケース
//!
//! CRUD に加えて、レンダリングプレビューとテスト送信を提供する。

use std::{collections::HashMap, sync::Arc};

use reachout_domain::{
    clock::Clock,
    template::{RenderedContent, Template, TemplateId, TemplateName},
    value_objects::EmailAddress,
};
use reachout_infra::{
    mailer::{Mailer, OutgoingEmail, TransportMessageId},
    repository::TemplateRepository,
};

use crate::error::ApiError;

/// テンプレート作成・更新の入力
pub struct UpsertTemplateInput {
    pub name:    String,
    pub subject: String,
    pub body:    String,
}

/// テンプレート管理ユースケース
pub struct TemplateUseCaseImpl {
    template_repository: Arc<dyn TemplateRepository>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
}

impl TemplateUseCaseImpl {
    pub fn new(
        template_repository: Arc<dyn TemplateRepository>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            template_repository,
            mailer,
            clock,
        }
    }

    /// 入力フィールドを検証する
    fn validate_fields(input: UpsertTemplateInput) -> Result<(TemplateName, String, String), ApiError> {
        let name =
            TemplateName::new(input.name).map_err(|e| ApiError::BadRequest(e.to_string()))?;

        if input.subject.trim().is_empty() {
            return Err(ApiError::BadRequest("件名は必須です".to_string()));
        }
        if input.body.trim().is_empty() {
            return Err(ApiError::BadRequest("本文は必須です".to_string()));
        }

        Ok((name, input.subject, input.body))
    }

    /// テンプレートを作成する
    ///
    /// プレースホルダ一覧は件名 + 本文から自動抽出される。
    pub async fn create_template(&self, input: UpsertTemplateInput) -> Result<Template, ApiError> {
        let (name, subject, body) = Self::validate_fields(input)?;

        let template = Template::new(TemplateId::new(), name, subject, body, self.clock.now());
        self.template_repository.insert(&template).await?;

        Ok(template)
    }

    /// テンプレート一覧を取得する
    pub async fn list_templates(&self, include_archived: bool) -> Result<Vec<Template>, ApiError> {
        let templates = self.template_repository.find_all(include_archived).await?;
        Ok(templates)
    }

    /// テンプレートを取得する
    pub async fn get_template(&self, id: &TemplateId) -> Result<Template, ApiError> {
        self.template_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("テンプレートが見つかりません".to_string()))
    }

    /// テンプレートを更新する
    ///
    /// プレースホルダ一覧は再抽出される。
    pub async fn update_template(
        &self,
        id: &TemplateId,
        input: UpsertTemplateInput,
    ) -> Result<Template, ApiError> {
        let template = self.get_template(id).await?;
        let (name, subject, body) = Self::validate_fields(input)?;

        let template = template.update_content(name, subject, body, self.clock.now());
        self.template_repository.update(&template).await?;

        Ok(template)
    }

    /// テンプレートをアーカイブする（論理削除）
    pub async fn archive_template(&self, id: &TemplateId) -> Result<(), ApiError> {
        let template = self.get_template(id).await?;
        let template = template.archive(self.clock.now());
        self.template_repository.update(&template).await?;
        Ok(())
    }

    /// テンプレートをレンダリングする（プレビュー用）
    ///
    /// 変数マップがプレースホルダをすべてカバーしていない場合は
    /// 不足分を列挙して BadRequest を返す。
    pub async fn render_preview(
        &self,
        id: &TemplateId,
        variables: &HashMap<String, String>,
    ) -> Result<RenderedContent, ApiError> {
        let template = self.get_template(id).await?;

        let missing = template.missing_placeholders(variables);
        if !missing.is_empty() {
            return Err(ApiError::BadRequest(format!(
                "変数が不足しています: {}",
                missing.join(", ")
            )));
        }

        Ok(template.render(variables))
    }

    /// レンダリング済みの内容を 1 件の宛先にテスト送信する
    ///
    /// トランスポート失敗は分類済みのエラーとしてそのまま伝播する
    /// （API 層で 400 / 500 にマッピングされる）。
    pub async fn send_test(
        &self,
        id: &TemplateId,
        to: String,
        subject: String,
        body: String,
    ) -> Result<TransportMessageId, ApiError> {
        // テンプレートの存在確認（ID 違いの誤送信を防ぐ）
        let _template = self.get_template(id).await?;

        let to = EmailAddress::new(to).map_err(|e| ApiError::BadRequest(e.to_string()))?;
        if subject.trim().is_empty() || body.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "件名と本文は必須です".to_string(),
            ));
        }

        let message_id = self
            .mailer
            .send(&OutgoingEmail { to, subject, body })
            .await?;

        Ok(message_id)
    }
}
