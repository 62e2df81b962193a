//! # テンプレートハンドラ
//!
//! メールテンプレート管理 API を提供する。
//!
//! ## エンドポイント
//!
//! - `GET /api/templates` - テンプレート一覧
//! - `POST /api/templates` - テンプレート作成
//! - `GET /api/templates/{template_id}` - テンプレート取得
//! - `PUT /api/templates/{template_id}` - テンプレート更新
//! - `DELETE /api/templates/{template_id}` - テンプレートのアーカイブ
//! - `POST /api/templates/{template_id}/render` - レンダリングプレビュー
//! - `POST /api/templates/{template_id}/test-send` - テスト送信

use std::{collections::HashMap, sync::Arc};

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use reachout_domain::template::{Template, TemplateId};
use reachout_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    usecase::{TemplateUseCaseImpl, UpsertTemplateInput},
};

/// テンプレート API の共有状態
pub struct TemplateState {
    pub usecase: TemplateUseCaseImpl,
}

// --- リクエスト/レスポンス型 ---

/// テンプレート一覧クエリパラメータ
#[derive(Debug, Deserialize)]
pub struct TemplateListQuery {
    #[serde(default)]
    pub include_archived: bool,
}

/// テンプレート作成・更新リクエスト
#[derive(Debug, Deserialize)]
pub struct UpsertTemplateRequest {
    pub name:    String,
    pub subject: String,
    pub body:    String,
}

/// レンダリングプレビューリクエスト
#[derive(Debug, Deserialize)]
pub struct RenderTemplateRequest {
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

/// テスト送信リクエスト
///
/// プレビューでレンダリング済みの内容をそのまま送信する。
#[derive(Debug, Deserialize)]
pub struct SendTestEmailRequest {
    pub to:      String,
    pub subject: String,
    pub body:    String,
}

/// テンプレート DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TemplateDto {
    pub id:           Uuid,
    pub name:         String,
    pub subject:      String,
    pub body:         String,
    /// 件名 + 本文から自動抽出されたプレースホルダ名（初出順）
    pub placeholders: Vec<String>,
    pub archived:     bool,
    pub created_at:   String,
    pub updated_at:   String,
}

impl TemplateDto {
    fn from_entity(template: &Template) -> Self {
        Self {
            id:           *template.id().as_uuid(),
            name:         template.name().as_str().to_string(),
            subject:      template.subject().to_string(),
            body:         template.body().to_string(),
            placeholders: template.placeholders().to_vec(),
            archived:     template.archived(),
            created_at:   template.created_at().to_rfc3339(),
            updated_at:   template.updated_at().to_rfc3339(),
        }
    }
}

/// レンダリング結果 DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RenderedContentDto {
    pub subject: String,
    pub body:    String,
}

/// テスト送信結果 DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TestSendResultDto {
    /// トランスポートのメッセージ識別子
    pub message_id: String,
}

// --- ハンドラ ---

/// GET /api/templates
#[tracing::instrument(skip_all)]
pub async fn list_templates(
    State(state): State<Arc<TemplateState>>,
    Query(query): Query<TemplateListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let templates = state.usecase.list_templates(query.include_archived).await?;
    let items: Vec<TemplateDto> = templates.iter().map(TemplateDto::from_entity).collect();

    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}

/// POST /api/templates
///
/// テンプレートを作成する。プレースホルダ一覧はサーバー側で抽出される。
///
/// ## レスポンス
///
/// - `201 Created`: 作成されたテンプレート
/// - `400 Bad Request`: バリデーションエラー
#[tracing::instrument(skip_all)]
pub async fn create_template(
    State(state): State<Arc<TemplateState>>,
    Json(req): Json<UpsertTemplateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = UpsertTemplateInput {
        name:    req.name,
        subject: req.subject,
        body:    req.body,
    };

    let template = state.usecase.create_template(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(TemplateDto::from_entity(&template))),
    ))
}

/// GET /api/templates/{template_id}
#[tracing::instrument(skip_all, fields(%template_id))]
pub async fn get_template(
    State(state): State<Arc<TemplateState>>,
    Path(template_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let template = state
        .usecase
        .get_template(&TemplateId::from_uuid(template_id))
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(TemplateDto::from_entity(&template))),
    ))
}

/// PUT /api/templates/{template_id}
///
/// テンプレートを更新する。プレースホルダ一覧は再抽出される。
#[tracing::instrument(skip_all, fields(%template_id))]
pub async fn update_template(
    State(state): State<Arc<TemplateState>>,
    Path(template_id): Path<Uuid>,
    Json(req): Json<UpsertTemplateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = UpsertTemplateInput {
        name:    req.name,
        subject: req.subject,
        body:    req.body,
    };

    let template = state
        .usecase
        .update_template(&TemplateId::from_uuid(template_id), input)
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(TemplateDto::from_entity(&template))),
    ))
}

/// DELETE /api/templates/{template_id}
///
/// テンプレートをアーカイブする（論理削除）。
#[tracing::instrument(skip_all, fields(%template_id))]
pub async fn archive_template(
    State(state): State<Arc<TemplateState>>,
    Path(template_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .usecase
        .archive_template(&TemplateId::from_uuid(template_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/templates/{template_id}/render
///
/// テンプレートを変数マップでレンダリングする（プレビュー）。
///
/// ## レスポンス
///
/// - `200 OK`: レンダリング済みの件名と本文
/// - `400 Bad Request`: 変数マップがプレースホルダをカバーしていない
/// - `404 Not Found`: テンプレートが見つからない
#[tracing::instrument(skip_all, fields(%template_id))]
pub async fn render_template(
    State(state): State<Arc<TemplateState>>,
    Path(template_id): Path<Uuid>,
    Json(req): Json<RenderTemplateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let rendered = state
        .usecase
        .render_preview(&TemplateId::from_uuid(template_id), &req.variables)
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(RenderedContentDto {
            subject: rendered.subject,
            body:    rendered.body,
        })),
    ))
}

/// POST /api/templates/{template_id}/test-send
///
/// レンダリング済みの内容を 1 件の宛先にテスト送信する。
///
/// ## レスポンス
///
/// - `200 OK`: トランスポートのメッセージ識別子
/// - `400 Bad Request`: 宛先・内容の不正
/// - `500 Internal Server Error`: 分類済みトランスポートエラー
#[tracing::instrument(skip_all, fields(%template_id))]
pub async fn send_test_email(
    State(state): State<Arc<TemplateState>>,
    Path(template_id): Path<Uuid>,
    Json(req): Json<SendTestEmailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message_id = state
        .usecase
        .send_test(
            &TemplateId::from_uuid(template_id),
            req.to,
            req.subject,
            req.body,
        )
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(TestSendResultDto {
            message_id: message_id.into_string(),
        })),
    ))
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Method, Request},
        routing::{get, post},
    };
    use chrono::{DateTime, Utc};
    use reachout_domain::{campaign::DispatchFailureKind, clock::FixedClock, template::TemplateName};
    use reachout_infra::mock::{MockMailer, MockTemplateRepository};
    use tower::ServiceExt;

    use super::*;

    // --- ヘルパー ---

    fn fixed_now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn create_test_app(repo: MockTemplateRepository, mailer: MockMailer) -> Router {
        let usecase = TemplateUseCaseImpl::new(
            Arc::new(repo),
            Arc::new(mailer),
            Arc::new(FixedClock::new(fixed_now())),
        );
        let state = Arc::new(TemplateState { usecase });

        Router::new()
            .route("/api/templates", get(list_templates).post(create_template))
            .route(
                "/api/templates/{template_id}",
                get(get_template)
                    .put(update_template)
                    .delete(archive_template),
            )
            .route("/api/templates/{template_id}/render", post(render_template))
            .route(
                "/api/templates/{template_id}/test-send",
                post(send_test_email),
            )
            .with_state(state)
    }

    fn make_template(subject: &str, body: &str) -> Template {
        Template::new(
            TemplateId::new(),
            TemplateName::new("初回アウトリーチ").unwrap(),
            subject.to_string(),
            body.to_string(),
            fixed_now(),
        )
    }

    async fn response_body<T: serde::de::DeserializeOwned>(
        response: axum::http::Response<Body>,
    ) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    // --- テストケース ---

    #[tokio::test]
    async fn test_post_テンプレートを作成するとプレースホルダが抽出される() {
        // Given
        let sut = create_test_app(MockTemplateRepository::new(), MockMailer::new());

        let request = json_request(
            Method::POST,
            "/api/templates",
            serde_json::json!({
                "name": "初回アウトリーチ",
                "subject": "Hi {{firstName}}",
                "body": "{{company}} の件でご連絡しました。"
            }),
        );

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: ApiResponse<TemplateDto> = response_body(response).await;
        assert_eq!(body.data.placeholders, vec!["firstName", "company"]);
    }

    #[tokio::test]
    async fn test_post_件名が空のとき400が返る() {
        // Given
        let sut = create_test_app(MockTemplateRepository::new(), MockMailer::new());

        let request = json_request(
            Method::POST,
            "/api/templates",
            serde_json::json!({
                "name": "テンプレート",
                "subject": "  ",
                "body": "本文"
            }),
        );

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_render_全変数を渡すとレンダリング結果が返る() {
        // Given
        let repo = MockTemplateRepository::new();
        let template = make_template("Hi {{firstName}}", "{{company}} の件です。");
        let template_id = *template.id().as_uuid();
        repo.add_template(template);
        let sut = create_test_app(repo, MockMailer::new());

        let request = json_request(
            Method::POST,
            &format!("/api/templates/{template_id}/render"),
            serde_json::json!({
                "variables": { "firstName": "Alice", "company": "Example Inc." }
            }),
        );

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body: ApiResponse<RenderedContentDto> = response_body(response).await;
        assert_eq!(body.data.subject, "Hi Alice");
        assert_eq!(body.data.body, "Example Inc. の件です。");
    }

    #[tokio::test]
    async fn test_render_変数が不足していると400が返る() {
        // Given
        let repo = MockTemplateRepository::new();
        let template = make_template("Hi {{firstName}}", "{{company}}");
        let template_id = *template.id().as_uuid();
        repo.add_template(template);
        let sut = create_test_app(repo, MockMailer::new());

        let request = json_request(
            Method::POST,
            &format!("/api/templates/{template_id}/render"),
            serde_json::json!({
                "variables": { "firstName": "Alice" }
            }),
        );

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_render_存在しないテンプレートで404が返る() {
        // Given
        let sut = create_test_app(MockTemplateRepository::new(), MockMailer::new());

        let request = json_request(
            Method::POST,
            &format!("/api/templates/{}/render", Uuid::new_v4()),
            serde_json::json!({ "variables": {} }),
        );

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_test_send_送信に成功するとメッセージidが返る() {
        // Given
        let repo = MockTemplateRepository::new();
        let template = make_template("件名", "本文");
        let template_id = *template.id().as_uuid();
        repo.add_template(template);
        let mailer = MockMailer::new();
        let sut = create_test_app(repo, mailer.clone());

        let request = json_request(
            Method::POST,
            &format!("/api/templates/{template_id}/test-send"),
            serde_json::json!({
                "to": "tester@example.com",
                "subject": "Hi Alice",
                "body": "テスト本文"
            }),
        );

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body: ApiResponse<TestSendResultDto> = response_body(response).await;
        assert_eq!(body.data.message_id, "mock-1");
        assert_eq!(mailer.sent_emails().len(), 1);
    }

    #[tokio::test]
    async fn test_test_send_不正な宛先で400が返る() {
        // Given
        let repo = MockTemplateRepository::new();
        let template = make_template("件名", "本文");
        let template_id = *template.id().as_uuid();
        repo.add_template(template);
        let sut = create_test_app(repo, MockMailer::new());

        let request = json_request(
            Method::POST,
            &format!("/api/templates/{template_id}/test-send"),
            serde_json::json!({
                "to": "not-an-email",
                "subject": "件名",
                "body": "本文"
            }),
        );

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_test_send_トランスポート失敗は分類されて500が返る() {
        // Given
        let repo = MockTemplateRepository::new();
        let template = make_template("件名", "本文");
        let template_id = *template.id().as_uuid();
        repo.add_template(template);
        let mailer = MockMailer::new();
        mailer.fail_for("tester@example.com", DispatchFailureKind::Restricted);
        let sut = create_test_app(repo, mailer);

        let request = json_request(
            Method::POST,
            &format!("/api/templates/{template_id}/test-send"),
            serde_json::json!({
                "to": "tester@example.com",
                "subject": "件名",
                "body": "本文"
            }),
        );

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_delete_アーカイブすると一覧から消える() {
        // Given
        let repo = MockTemplateRepository::new();
        let template = make_template("件名", "本文");
        let template_id = *template.id().as_uuid();
        repo.add_template(template);
        let sut = create_test_app(repo, MockMailer::new());

        let request = Request::builder()
            .method(Method::DELETE)
            .uri(format!("/api/templates/{template_id}"))
            .body(Body::empty())
            .unwrap();

        // When
        let response = sut.clone().oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let list_request = Request::builder()
            .method(Method::GET)
            .uri("/api/templates")
            .body(Body::empty())
            .unwrap();
        let list_response = sut.oneshot(list_request).await.unwrap();
        let body: ApiResponse<Vec<TemplateDto>> = response_body(list_response).await;
        assert!(body.data.is_empty());
    }
}
