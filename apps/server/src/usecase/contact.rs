//! コンタクト管理ユースケース

use std::sync::Arc;

use reachout_domain::{
    clock::Clock,
    contact::{CompanyName, Contact, ContactId, ContactName},
    value_objects::EmailAddress,
};
use reachout_infra::{
    InfraError,
    repository::{ContactListFilter, ContactRepository},
};

use crate::error::ApiError;

/// コンタクト作成の入力
pub struct CreateContactInput {
    pub email:      String,
    pub first_name: String,
    pub last_name:  Option<String>,
    pub company:    Option<String>,
    pub tags:       Vec<String>,
}

/// コンタクト更新の入力
pub struct UpdateContactInput {
    pub contact_id: ContactId,
    pub email:      String,
    pub first_name: String,
    pub last_name:  Option<String>,
    pub company:    Option<String>,
    pub tags:       Vec<String>,
}

/// コンタクト管理ユースケース
pub struct ContactUseCaseImpl {
    contact_repository: Arc<dyn ContactRepository>,
    clock: Arc<dyn Clock>,
}

impl ContactUseCaseImpl {
    pub fn new(contact_repository: Arc<dyn ContactRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            contact_repository,
            clock,
        }
    }

    /// 入力フィールドを値オブジェクトに変換する
    ///
    /// 失敗はすべて `BadRequest`（ストレージに触れる前の境界バリデーション）。
    fn validate_fields(
        email: String,
        first_name: String,
        last_name: Option<String>,
        company: Option<String>,
    ) -> Result<
        (
            EmailAddress,
            ContactName,
            Option<ContactName>,
            Option<CompanyName>,
        ),
        ApiError,
    > {
        let email =
            EmailAddress::new(email).map_err(|e| ApiError::BadRequest(e.to_string()))?;
        let first_name =
            ContactName::new(first_name).map_err(|e| ApiError::BadRequest(e.to_string()))?;
        let last_name = last_name
            .filter(|n| !n.trim().is_empty())
            .map(ContactName::new)
            .transpose()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        let company = company
            .filter(|c| !c.trim().is_empty())
            .map(CompanyName::new)
            .transpose()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        Ok((email, first_name, last_name, company))
    }

    /// コンタクトを作成する
    ///
    /// メールアドレス重複（非アーカイブ間）は Conflict にマッピングする。
    pub async fn create_contact(&self, input: CreateContactInput) -> Result<Contact, ApiError> {
        let (email, first_name, last_name, company) = Self::validate_fields(
            input.email,
            input.first_name,
            input.last_name,
            input.company,
        )?;

        let contact = Contact::new(
            ContactId::new(),
            email,
            first_name,
            last_name,
            company,
            input.tags,
            self.clock.now(),
        );

        self.contact_repository
            .insert(&contact)
            .await
            .map_err(map_email_conflict)?;

        Ok(contact)
    }

    /// コンタクト一覧を取得する
    pub async fn list_contacts(
        &self,
        filter: &ContactListFilter,
    ) -> Result<Vec<Contact>, ApiError> {
        let contacts = self.contact_repository.find_all(filter).await?;
        Ok(contacts)
    }

    /// コンタクトを取得する
    pub async fn get_contact(&self, id: &ContactId) -> Result<Contact, ApiError> {
        self.contact_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("コンタクトが見つかりません".to_string()))
    }

    /// コンタクトを更新する
    pub async fn update_contact(&self, input: UpdateContactInput) -> Result<Contact, ApiError> {
        let contact = self.get_contact(&input.contact_id).await?;

        let (email, first_name, last_name, company) = Self::validate_fields(
            input.email,
            input.first_name,
            input.last_name,
            input.company,
        )?;

        let contact = contact.update_details(
            email,
            first_name,
            last_name,
            company,
            input.tags,
            self.clock.now(),
        );

        self.contact_repository
            .update(&contact)
            .await
            .map_err(map_email_conflict)?;

        Ok(contact)
    }

    /// コンタクトをアーカイブする（論理削除）
    pub async fn archive_contact(&self, id: &ContactId) -> Result<(), ApiError> {
        let contact = self.get_contact(id).await?;
        let contact = contact.archive(self.clock.now());
        self.contact_repository.update(&contact).await?;
        Ok(())
    }
}

/// メールアドレス一意制約違反を利用者向けメッセージの Conflict に変換する
fn map_email_conflict(error: InfraError) -> ApiError {
    match error {
        InfraError::Conflict { .. } => {
            ApiError::Conflict("このメールアドレスは既に登録されています".to_string())
        }
        other => ApiError::from(other),
    }
}
