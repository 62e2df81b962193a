//! # コンタクトハンドラ
//!
//! コンタクト管理 API を提供する。
//!
//! ## エンドポイント
//!
//! - `GET /api/contacts` - コンタクト一覧（タグ・アーカイブで絞り込み）
//! - `POST /api/contacts` - コンタクト作成
//! - `GET /api/contacts/{contact_id}` - コンタクト取得
//! - `PUT /api/contacts/{contact_id}` - コンタクト更新
//! - `DELETE /api/contacts/{contact_id}` - コンタクトのアーカイブ（論理削除）

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use reachout_domain::contact::{Contact, ContactId};
use reachout_infra::repository::ContactListFilter;
use reachout_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    usecase::{ContactUseCaseImpl, CreateContactInput, UpdateContactInput},
};

/// コンタクト API の共有状態
pub struct ContactState {
    pub usecase: ContactUseCaseImpl,
}

// --- リクエスト/レスポンス型 ---

/// コンタクト一覧クエリパラメータ
#[derive(Debug, Deserialize)]
pub struct ContactListQuery {
    pub tag:              Option<String>,
    #[serde(default)]
    pub include_archived: bool,
}

/// コンタクト作成リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateContactRequest {
    pub email:      String,
    pub first_name: String,
    pub last_name:  Option<String>,
    pub company:    Option<String>,
    #[serde(default)]
    pub tags:       Vec<String>,
}

/// コンタクト更新リクエスト
#[derive(Debug, Deserialize)]
pub struct UpdateContactRequest {
    pub email:      String,
    pub first_name: String,
    pub last_name:  Option<String>,
    pub company:    Option<String>,
    #[serde(default)]
    pub tags:       Vec<String>,
}

/// コンタクト DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ContactDto {
    pub id:         Uuid,
    pub email:      String,
    pub first_name: String,
    pub last_name:  Option<String>,
    pub company:    Option<String>,
    pub tags:       Vec<String>,
    pub archived:   bool,
    pub created_at: String,
    pub updated_at: String,
}

impl ContactDto {
    fn from_entity(contact: &Contact) -> Self {
        Self {
            id:         *contact.id().as_uuid(),
            email:      contact.email().as_str().to_string(),
            first_name: contact.first_name().as_str().to_string(),
            last_name:  contact.last_name().map(|n| n.as_str().to_string()),
            company:    contact.company().map(|c| c.as_str().to_string()),
            tags:       contact.tags().to_vec(),
            archived:   contact.archived(),
            created_at: contact.created_at().to_rfc3339(),
            updated_at: contact.updated_at().to_rfc3339(),
        }
    }
}

// --- ハンドラ ---

/// GET /api/contacts
///
/// コンタクト一覧を取得する。`tag` で絞り込み、
/// `include_archived=true` でアーカイブ済みも含める。
#[tracing::instrument(skip_all)]
pub async fn list_contacts(
    State(state): State<Arc<ContactState>>,
    Query(query): Query<ContactListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = ContactListFilter {
        tag:              query.tag,
        include_archived: query.include_archived,
    };

    let contacts = state.usecase.list_contacts(&filter).await?;
    let items: Vec<ContactDto> = contacts.iter().map(ContactDto::from_entity).collect();

    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}

/// POST /api/contacts
///
/// コンタクトを作成する。
///
/// ## レスポンス
///
/// - `201 Created`: 作成されたコンタクト
/// - `400 Bad Request`: バリデーションエラー
/// - `409 Conflict`: メールアドレス重複
#[tracing::instrument(skip_all)]
pub async fn create_contact(
    State(state): State<Arc<ContactState>>,
    Json(req): Json<CreateContactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = CreateContactInput {
        email:      req.email,
        first_name: req.first_name,
        last_name:  req.last_name,
        company:    req.company,
        tags:       req.tags,
    };

    let contact = state.usecase.create_contact(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(ContactDto::from_entity(&contact))),
    ))
}

/// GET /api/contacts/{contact_id}
///
/// コンタクトを取得する。
#[tracing::instrument(skip_all, fields(%contact_id))]
pub async fn get_contact(
    State(state): State<Arc<ContactState>>,
    Path(contact_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = state
        .usecase
        .get_contact(&ContactId::from_uuid(contact_id))
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(ContactDto::from_entity(&contact))),
    ))
}

/// PUT /api/contacts/{contact_id}
///
/// コンタクトを更新する。
///
/// ## レスポンス
///
/// - `200 OK`: 更新後のコンタクト
/// - `400 Bad Request`: バリデーションエラー
/// - `404 Not Found`: コンタクトが見つからない
/// - `409 Conflict`: メールアドレス重複
#[tracing::instrument(skip_all, fields(%contact_id))]
pub async fn update_contact(
    State(state): State<Arc<ContactState>>,
    Path(contact_id): Path<Uuid>,
    Json(req): Json<UpdateContactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = UpdateContactInput {
        contact_id: ContactId::from_uuid(contact_id),
        email:      req.email,
        first_name: req.first_name,
        last_name:  req.last_name,
        company:    req.company,
        tags:       req.tags,
    };

    let contact = state.usecase.update_contact(input).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(ContactDto::from_entity(&contact))),
    ))
}

/// DELETE /api/contacts/{contact_id}
///
/// コンタクトをアーカイブする（論理削除）。
///
/// ## レスポンス
///
/// - `204 No Content`: アーカイブ成功
/// - `404 Not Found`: コンタクトが見つからない
#[tracing::instrument(skip_all, fields(%contact_id))]
pub async fn archive_contact(
    State(state): State<Arc<ContactState>>,
    Path(contact_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .usecase
        .archive_contact(&ContactId::from_uuid(contact_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Method, Request},
        routing::get,
    };
    use chrono::{DateTime, Utc};
    use reachout_domain::{
        clock::FixedClock,
        contact::ContactName,
        value_objects::EmailAddress,
    };
    use reachout_infra::mock::MockContactRepository;
    use tower::ServiceExt;

    use super::*;

    // --- ヘルパー ---

    fn fixed_now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn create_test_app(repo: MockContactRepository) -> Router {
        let usecase = ContactUseCaseImpl::new(
            Arc::new(repo),
            Arc::new(FixedClock::new(fixed_now())),
        );
        let state = Arc::new(ContactState { usecase });

        Router::new()
            .route("/api/contacts", get(list_contacts).post(create_contact))
            .route(
                "/api/contacts/{contact_id}",
                get(get_contact)
                    .put(update_contact)
                    .delete(archive_contact),
            )
            .with_state(state)
    }

    fn make_contact(email: &str, tags: Vec<String>) -> Contact {
        Contact::new(
            ContactId::new(),
            EmailAddress::new(email).unwrap(),
            ContactName::new("Alice").unwrap(),
            None,
            None,
            tags,
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
    async fn test_post_コンタクトを作成すると201が返る() {
        // Given
        let sut = create_test_app(MockContactRepository::new());

        let request = json_request(
            Method::POST,
            "/api/contacts",
            serde_json::json!({
                "email": "alice@example.com",
                "first_name": "Alice",
                "tags": ["newsletter"]
            }),
        );

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: ApiResponse<ContactDto> = response_body(response).await;
        assert_eq!(body.data.email, "alice@example.com");
        assert_eq!(body.data.first_name, "Alice");
        assert_eq!(body.data.tags, vec!["newsletter"]);
        assert!(!body.data.archived);
    }

    #[tokio::test]
    async fn test_post_不正なメールアドレスで400が返る() {
        // Given
        let sut = create_test_app(MockContactRepository::new());

        let request = json_request(
            Method::POST,
            "/api/contacts",
            serde_json::json!({
                "email": "not-an-email",
                "first_name": "Alice"
            }),
        );

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_post_メールアドレス重複で409が返る() {
        // Given
        let repo = MockContactRepository::new();
        repo.add_contact(make_contact("alice@example.com", vec![]));
        let sut = create_test_app(repo);

        let request = json_request(
            Method::POST,
            "/api/contacts",
            serde_json::json!({
                "email": "alice@example.com",
                "first_name": "別のAlice"
            }),
        );

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_get_タグで一覧を絞り込める() {
        // Given
        let repo = MockContactRepository::new();
        repo.add_contact(make_contact("a@example.com", vec!["vip".to_string()]));
        repo.add_contact(make_contact("b@example.com", vec![]));
        let sut = create_test_app(repo);

        let request = Request::builder()
            .method(Method::GET)
            .uri("/api/contacts?tag=vip")
            .body(Body::empty())
            .unwrap();

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body: ApiResponse<Vec<ContactDto>> = response_body(response).await;
        assert_eq!(body.data.len(), 1);
        assert_eq!(body.data[0].email, "a@example.com");
    }

    #[tokio::test]
    async fn test_delete_アーカイブすると204になり一覧から消える() {
        // Given
        let repo = MockContactRepository::new();
        let contact = make_contact("alice@example.com", vec![]);
        let contact_id = *contact.id().as_uuid();
        repo.add_contact(contact);
        let sut = create_test_app(repo.clone());

        let request = Request::builder()
            .method(Method::DELETE)
            .uri(format!("/api/contacts/{contact_id}"))
            .body(Body::empty())
            .unwrap();

        // When
        let response = sut.clone().oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let list_request = Request::builder()
            .method(Method::GET)
            .uri("/api/contacts")
            .body(Body::empty())
            .unwrap();
        let list_response = sut.oneshot(list_request).await.unwrap();
        let body: ApiResponse<Vec<ContactDto>> = response_body(list_response).await;
        assert!(body.data.is_empty());
    }

    #[tokio::test]
    async fn test_存在しないコンタクトで404が返る() {
        // Given
        let sut = create_test_app(MockContactRepository::new());

        let request = Request::builder()
            .method(Method::GET)
            .uri(format!("/api/contacts/{}", Uuid::new_v4()))
            .body(Body::empty())
            .unwrap();

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_put_更新すると200で更新後の内容が返る() {
        // Given
        let repo = MockContactRepository::new();
        let contact = make_contact("alice@example.com", vec![]);
        let contact_id = *contact.id().as_uuid();
        repo.add_contact(contact);
        let sut = create_test_app(repo);

        let request = json_request(
            Method::PUT,
            &format!("/api/contacts/{contact_id}"),
            serde_json::json!({
                "email": "alicia@example.com",
                "first_name": "Alicia",
                "company": "Example Inc.",
                "tags": ["vip"]
            }),
        );

        // When
        let response = sut.oneshot(request).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body: ApiResponse<ContactDto> = response_body(response).await;
        assert_eq!(body.data.email, "alicia@example.com");
        assert_eq!(body.data.company, Some("Example Inc.".to_string()));
        assert_eq!(body.data.tags, vec!["vip"]);
    }
}
