//! # テスト用モック実装
//!
//! ユースケース・ハンドラテストで使用するインメモリのモック。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! reachout-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use reachout_domain::{
    campaign::{
        Campaign,
        CampaignDetail,
        CampaignId,
        CampaignRecipient,
        CampaignStats,
        CampaignStatus,
        DispatchFailureKind,
        RecipientEntry,
    },
    contact::{Contact, ContactId},
    template::{Template, TemplateId},
};

use crate::{
    error::InfraError,
    mailer::{Mailer, MailerError, OutgoingEmail, TransportMessageId},
    repository::{
        CampaignRepository,
        ContactListFilter,
        ContactRepository,
        TemplateRepository,
    },
};

// ===== MockContactRepository =====

#[derive(Clone, Default)]
pub struct MockContactRepository {
    contacts: Arc<Mutex<Vec<Contact>>>,
}

impl MockContactRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_contact(&self, contact: Contact) {
        self.contacts.lock().unwrap().push(contact);
    }

    /// 現在の格納内容のスナップショットを返す（アサーション用）
    pub fn contacts(&self) -> Vec<Contact> {
        self.contacts.lock().unwrap().clone()
    }

    fn has_duplicate_email(&self, candidate: &Contact) -> bool {
        self.contacts.lock().unwrap().iter().any(|c| {
            c.id() != candidate.id()
                && !c.archived()
                && c.email() == candidate.email()
        })
    }
}

#[async_trait]
impl ContactRepository for MockContactRepository {
    async fn insert(&self, contact: &Contact) -> Result<(), InfraError> {
        if !contact.archived() && self.has_duplicate_email(contact) {
            return Err(InfraError::Conflict {
                entity: "Contact".to_string(),
                id:     contact.email().as_str().to_string(),
            });
        }
        self.contacts.lock().unwrap().push(contact.clone());
        Ok(())
    }

    async fn update(&self, contact: &Contact) -> Result<(), InfraError> {
        if !contact.archived() && self.has_duplicate_email(contact) {
            return Err(InfraError::Conflict {
                entity: "Contact".to_string(),
                id:     contact.email().as_str().to_string(),
            });
        }
        let mut contacts = self.contacts.lock().unwrap();
        if let Some(pos) = contacts.iter().position(|c| c.id() == contact.id()) {
            contacts[pos] = contact.clone();
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &ContactId) -> Result<Option<Contact>, InfraError> {
        Ok(self
            .contacts
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id() == id)
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[ContactId]) -> Result<Vec<Contact>, InfraError> {
        Ok(self
            .contacts
            .lock()
            .unwrap()
            .iter()
            .filter(|c| ids.contains(c.id()))
            .cloned()
            .collect())
    }

    async fn find_all(&self, filter: &ContactListFilter) -> Result<Vec<Contact>, InfraError> {
        Ok(self
            .contacts
            .lock()
            .unwrap()
            .iter()
            .filter(|c| filter.include_archived || !c.archived())
            .filter(|c| {
                filter
                    .tag
                    .as_ref()
                    .is_none_or(|tag| c.tags().contains(tag))
            })
            .cloned()
            .collect())
    }
}

// ===== MockTemplateRepository =====

#[derive(Clone, Default)]
pub struct MockTemplateRepository {
    templates: Arc<Mutex<Vec<Template>>>,
}

impl MockTemplateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_template(&self, template: Template) {
        self.templates.lock().unwrap().push(template);
    }

    /// 現在の格納内容のスナップショットを返す（アサーション用）
    pub fn templates(&self) -> Vec<Template> {
        self.templates.lock().unwrap().clone()
    }
}

#[async_trait]
impl TemplateRepository for MockTemplateRepository {
    async fn insert(&self, template: &Template) -> Result<(), InfraError> {
        self.templates.lock().unwrap().push(template.clone());
        Ok(())
    }

    async fn update(&self, template: &Template) -> Result<(), InfraError> {
        let mut templates = self.templates.lock().unwrap();
        if let Some(pos) = templates.iter().position(|t| t.id() == template.id()) {
            templates[pos] = template.clone();
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &TemplateId) -> Result<Option<Template>, InfraError> {
        Ok(self
            .templates
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id() == id)
            .cloned())
    }

    async fn find_all(&self, include_archived: bool) -> Result<Vec<Template>, InfraError> {
        Ok(self
            .templates
            .lock()
            .unwrap()
            .iter()
            .filter(|t| include_archived || !t.archived())
            .cloned()
            .collect())
    }
}

// ===== MockCampaignRepository =====

#[derive(Clone, Default)]
pub struct MockCampaignRepository {
    campaigns:  Arc<Mutex<Vec<Campaign>>>,
    recipients: Arc<Mutex<Vec<CampaignRecipient>>>,
    contacts:   Arc<Mutex<Vec<Contact>>>,
}

impl MockCampaignRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// find_detail の JOIN 先となるコンタクトを登録する
    pub fn add_contact(&self, contact: Contact) {
        self.contacts.lock().unwrap().push(contact);
    }

    pub fn add_campaign(&self, campaign: Campaign) {
        self.campaigns.lock().unwrap().push(campaign);
    }

    pub fn add_recipient(&self, recipient: CampaignRecipient) {
        self.recipients.lock().unwrap().push(recipient);
    }

    /// 現在の配信先のスナップショットを返す（アサーション用）
    pub fn recipients(&self) -> Vec<CampaignRecipient> {
        self.recipients.lock().unwrap().clone()
    }

    /// 現在のキャンペーンのスナップショットを返す（アサーション用）
    pub fn campaigns(&self) -> Vec<Campaign> {
        self.campaigns.lock().unwrap().clone()
    }
}

#[async_trait]
impl CampaignRepository for MockCampaignRepository {
    async fn insert_with_recipients(
        &self,
        campaign: &Campaign,
        recipients: &[CampaignRecipient],
    ) -> Result<(), InfraError> {
        self.campaigns.lock().unwrap().push(campaign.clone());
        self.recipients
            .lock()
            .unwrap()
            .extend(recipients.iter().cloned());
        Ok(())
    }

    async fn find_by_id(&self, id: &CampaignId) -> Result<Option<Campaign>, InfraError> {
        Ok(self
            .campaigns
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id() == id)
            .cloned())
    }

    async fn find_detail(&self, id: &CampaignId) -> Result<Option<CampaignDetail>, InfraError> {
        let Some(campaign) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let contacts = self.contacts.lock().unwrap();
        let recipients = self
            .recipients
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.campaign_id() == id)
            .map(|r| {
                let contact = contacts
                    .iter()
                    .find(|c| c.id() == r.contact_id())
                    .cloned()
                    .ok_or_else(|| {
                        InfraError::Unexpected(format!(
                            "配信先の参照するコンタクトが存在しません: {}",
                            r.contact_id()
                        ))
                    })?;
                Ok(RecipientEntry {
                    recipient: r.clone(),
                    contact,
                })
            })
            .collect::<Result<Vec<_>, InfraError>>()?;

        Ok(Some(CampaignDetail {
            campaign,
            recipients,
        }))
    }

    async fn find_all(
        &self,
        status: Option<CampaignStatus>,
    ) -> Result<Vec<(Campaign, CampaignStats)>, InfraError> {
        let recipients = self.recipients.lock().unwrap();
        Ok(self
            .campaigns
            .lock()
            .unwrap()
            .iter()
            .filter(|c| status.is_none_or(|s| c.status() == s))
            .map(|c| {
                let mut stats = CampaignStats::default();
                for r in recipients.iter().filter(|r| r.campaign_id() == c.id()) {
                    stats.record(r.status(), 1);
                }
                (c.clone(), stats)
            })
            .collect())
    }

    async fn update_status(&self, campaign: &Campaign) -> Result<(), InfraError> {
        let mut campaigns = self.campaigns.lock().unwrap();
        if let Some(pos) = campaigns.iter().position(|c| c.id() == campaign.id()) {
            campaigns[pos] = campaign.clone();
        }
        Ok(())
    }

    async fn update_recipient(&self, recipient: &CampaignRecipient) -> Result<(), InfraError> {
        let mut recipients = self.recipients.lock().unwrap();
        if let Some(pos) = recipients.iter().position(|r| r.id() == recipient.id()) {
            recipients[pos] = recipient.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: &CampaignId) -> Result<(), InfraError> {
        self.campaigns.lock().unwrap().retain(|c| c.id() != id);
        self.recipients
            .lock()
            .unwrap()
            .retain(|r| r.campaign_id() != id);
        Ok(())
    }
}

// ===== MockMailer =====

/// 送信内容を記録し、指定した宛先で失敗を再現できるモックメーラー
#[derive(Clone, Default)]
pub struct MockMailer {
    sent:     Arc<Mutex<Vec<OutgoingEmail>>>,
    failures: Arc<Mutex<HashMap<String, DispatchFailureKind>>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定した宛先への送信を指定した分類で失敗させる
    pub fn fail_for(&self, address: &str, kind: DispatchFailureKind) {
        self.failures
            .lock()
            .unwrap()
            .insert(address.to_string(), kind);
    }

    /// 送信に成功したメールのスナップショットを返す（アサーション用）
    pub fn sent_emails(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<TransportMessageId, MailerError> {
        if let Some(kind) = self.failures.lock().unwrap().get(email.to.as_str()) {
            let detail = format!("モック失敗: {}", email.to);
            return Err(match kind {
                DispatchFailureKind::InvalidAddress => MailerError::InvalidAddress(detail),
                DispatchFailureKind::TransportUnavailable => {
                    MailerError::TransportUnavailable(detail)
                }
                DispatchFailureKind::Restricted => MailerError::Restricted(detail),
                DispatchFailureKind::Unknown => MailerError::Unknown(detail),
            });
        }

        let mut sent = self.sent.lock().unwrap();
        sent.push(email.clone());
        Ok(TransportMessageId::new(format!("mock-{}", sent.len())))
    }
}

#[cfg(test)]
mod tests {
    use reachout_domain::value_objects::EmailAddress;

    use super::*;

    fn make_email(to: &str) -> OutgoingEmail {
        OutgoingEmail {
            to:      EmailAddress::new(to).unwrap(),
            subject: "件名".to_string(),
            body:    "本文".to_string(),
        }
    }

    #[tokio::test]
    async fn mock_mailerは送信を記録し連番のidを返す() {
        let mailer = MockMailer::new();

        let first = mailer.send(&make_email("a@example.com")).await.unwrap();
        let second = mailer.send(&make_email("b@example.com")).await.unwrap();

        assert_eq!(first.as_str(), "mock-1");
        assert_eq!(second.as_str(), "mock-2");
        assert_eq!(mailer.sent_emails().len(), 2);
    }

    #[tokio::test]
    async fn mock_mailerは指定した宛先で指定した分類の失敗を返す() {
        let mailer = MockMailer::new();
        mailer.fail_for("bad@example.com", DispatchFailureKind::InvalidAddress);

        let result = mailer.send(&make_email("bad@example.com")).await;

        assert!(matches!(result, Err(MailerError::InvalidAddress(_))));
        // 失敗した送信は記録されない
        assert!(mailer.sent_emails().is_empty());
    }
}
