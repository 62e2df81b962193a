//! # キャンペーン送信オーケストレータ
//!
//! テンプレートレンダリング → 配信先ごとの送信 → ステータス記録を統合する、
//! このサーバーの中核ユースケース。
//!
//! ## 処理の流れ
//!
//! 1 回の呼び出しは同期的に「読み込み → 検証 → 送信 → 完了」と進む:
//!
//! 1. キャンペーン詳細（配信先 + コンタクト）を読み込む。
//!    存在しなければ 404 相当で失敗し、何も書き込まない
//! 2. 参照テンプレートを読み込む。存在しなければデータ不整合として
//!    400 相当で失敗し、何も書き込まない
//! 3. 送信待ちの配信先を選択する。空なら 400 相当で失敗し、何も書き込まない
//! 4. キャンペーンを Sending にして、選択順に 1 件ずつ
//!    レンダリング → 送信 → 配信先の行を更新する。
//!    **1 件の送信失敗は残りの配信先の処理を中断しない**
//! 5. 全件処理後にキャンペーンの最終状態を記録し、集計を返す。
//!    一部失敗はエラーではなく集計として報告される
//!
//! ## 耐障害性
//!
//! - 配信先の状態書き込みは 1 行ずつ独立（バッチ全体のトランザクションなし）。
//!   途中でクラッシュしても処理済みの配信先は正しい終端状態のまま残り、
//!   再実行すれば未処理分だけが選択される
//! - 個別送信のタイムアウトはその配信先だけの
//!   `TransportUnavailable` 失敗として解決される
//! - `Failed` の配信先は送信の再実行では選択されない。再送は専用の
//!   [`CampaignSendUseCaseImpl::retry_failed`] で行う

use std::{sync::Arc, time::Duration};

use reachout_domain::{
    campaign::{
        Campaign,
        CampaignDetail,
        CampaignId,
        CampaignRecipientId,
        DispatchFailureKind,
        RecipientEntry,
        RecipientStatus,
    },
    clock::Clock,
    contact::ContactId,
    template::Template,
    value_objects::EmailAddress,
};
use reachout_infra::{
    mailer::{Mailer, MailerError, OutgoingEmail},
    repository::{CampaignRepository, TemplateRepository},
};

use crate::error::ApiError;

/// 配信先 1 件の送信結果
#[derive(Debug, Clone)]
pub struct RecipientOutcome {
    pub recipient_id:  CampaignRecipientId,
    pub contact_id:    ContactId,
    pub email:         EmailAddress,
    pub status:        RecipientStatus,
    pub message_id:    Option<String>,
    pub failure_kind:  Option<DispatchFailureKind>,
    pub error_message: Option<String>,
}

/// 送信処理全体の集計
///
/// 一部失敗の実行もこの集計として返される（ハードエラーにはならない）。
#[derive(Debug, Clone)]
pub struct SendSummary {
    /// 送信を試行した配信先数
    pub attempted: usize,
    /// 送信に成功した配信先数
    pub sent:      usize,
    /// 送信に失敗した配信先数
    pub failed:    usize,
    /// 配信先ごとの結果（選択順）
    pub outcomes:  Vec<RecipientOutcome>,
}

/// キャンペーン送信ユースケース
pub struct CampaignSendUseCaseImpl {
    campaign_repository: Arc<dyn CampaignRepository>,
    template_repository: Arc<dyn TemplateRepository>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    send_timeout: Duration,
}

impl CampaignSendUseCaseImpl {
    pub fn new(
        campaign_repository: Arc<dyn CampaignRepository>,
        template_repository: Arc<dyn TemplateRepository>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            campaign_repository,
            template_repository,
            mailer,
            clock,
            send_timeout,
        }
    }

    /// キャンペーンを送信する
    ///
    /// 送信待ち（Draft / Scheduled）の配信先を選択順に処理する。
    #[tracing::instrument(skip_all, fields(campaign_id = %id))]
    pub async fn send_campaign(&self, id: &CampaignId) -> Result<SendSummary, ApiError> {
        let (detail, template) = self.load(id).await?;

        let selected = detail
            .pending_recipients()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        self.dispatch(&detail, &template, &selected).await
    }

    /// 送信失敗（Failed）の配信先だけを再送する
    ///
    /// 初回送信の再実行では Failed は選択されないため、再送はこの
    /// 専用操作として分離されている。
    #[tracing::instrument(skip_all, fields(campaign_id = %id))]
    pub async fn retry_failed(&self, id: &CampaignId) -> Result<SendSummary, ApiError> {
        let (detail, template) = self.load(id).await?;

        let selected = detail
            .retryable_recipients()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        self.dispatch(&detail, &template, &selected).await
    }

    /// キャンペーン詳細と参照テンプレートを読み込む
    ///
    /// テンプレート欠落はデータ不整合（キャンペーンが存在するのに参照先が
    /// ない）であり、クラッシュではなく BadRequest として扱う。
    async fn load(&self, id: &CampaignId) -> Result<(CampaignDetail, Template), ApiError> {
        let detail = self
            .campaign_repository
            .find_detail(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("キャンペーンが見つかりません".to_string()))?;

        let template = self
            .template_repository
            .find_by_id(detail.campaign.template_id())
            .await?
            .ok_or_else(|| {
                ApiError::BadRequest(
                    "キャンペーンの参照するテンプレートが見つかりません".to_string(),
                )
            })?;

        Ok((detail, template))
    }

    /// 選択済みの配信先を順に送信し、集計を返す
    ///
    /// この時点以降で初めて書き込みが発生する。
    async fn dispatch(
        &self,
        detail: &CampaignDetail,
        template: &Template,
        selected: &[&RecipientEntry],
    ) -> Result<SendSummary, ApiError> {
        let campaign = detail
            .campaign
            .clone()
            .start_sending(self.clock.now());
        self.campaign_repository.update_status(&campaign).await?;

        let mut outcomes = Vec::with_capacity(selected.len());
        let mut sent_count = 0;

        for entry in selected {
            let outcome = self.dispatch_one(&campaign, template, entry).await?;
            if outcome.status == RecipientStatus::Sent {
                sent_count += 1;
            }
            outcomes.push(outcome);
        }

        let campaign = campaign.finish_sending(sent_count, self.clock.now());
        self.campaign_repository.update_status(&campaign).await?;

        let summary = SendSummary {
            attempted: outcomes.len(),
            sent:      sent_count,
            failed:    outcomes.len() - sent_count,
            outcomes,
        };

        tracing::info!(
            campaign_id = %campaign.id(),
            attempted = summary.attempted,
            sent = summary.sent,
            failed = summary.failed,
            "キャンペーン送信完了"
        );

        Ok(summary)
    }

    /// 配信先 1 件を処理する: レンダリング → 送信 → 状態記録
    ///
    /// 送信失敗はこの配信先の Failed 記録として回復し、エラーを返さない。
    /// エラーになるのは状態の書き込み自体が失敗した場合のみ。
    async fn dispatch_one(
        &self,
        campaign: &Campaign,
        template: &Template,
        entry: &RecipientEntry,
    ) -> Result<RecipientOutcome, ApiError> {
        // コンタクトのフィールド + キャンペーンレベルの値でマッピングを構築
        let mut values = entry.contact.placeholder_values();
        values.insert(
            "campaignName".to_string(),
            campaign.name().as_str().to_string(),
        );

        let rendered = template.render(&values);
        let email = OutgoingEmail {
            to:      entry.contact.email().clone(),
            subject: rendered.subject,
            body:    rendered.body,
        };

        // 個別タイムアウトは TransportUnavailable として解決する
        // （この配信先だけの失敗であり、バッチは継続する）
        let send_result = match tokio::time::timeout(self.send_timeout, self.mailer.send(&email))
            .await
        {
            Ok(result) => result,
            Err(_elapsed) => Err(MailerError::TransportUnavailable(
                "送信がタイムアウトしました".to_string(),
            )),
        };

        let now = self.clock.now();
        match send_result {
            Ok(message_id) => {
                let recipient = entry
                    .recipient
                    .clone()
                    .mark_sent(message_id.into_string(), now);
                self.campaign_repository.update_recipient(&recipient).await?;

                tracing::info!(
                    recipient_id = %recipient.id(),
                    to = %entry.contact.email(),
                    "配信先への送信成功"
                );

                Ok(RecipientOutcome {
                    recipient_id:  recipient.id().clone(),
                    contact_id:    entry.contact.id().clone(),
                    email:         entry.contact.email().clone(),
                    status:        RecipientStatus::Sent,
                    message_id:    recipient.message_id().map(String::from),
                    failure_kind:  None,
                    error_message: None,
                })
            }
            Err(e) => {
                let kind = e.failure_kind();
                let recipient = entry
                    .recipient
                    .clone()
                    .mark_failed(kind, e.to_string(), now);
                self.campaign_repository.update_recipient(&recipient).await?;

                tracing::warn!(
                    recipient_id = %recipient.id(),
                    to = %entry.contact.email(),
                    failure_kind = %kind,
                    error = %e,
                    "配信先への送信失敗（バッチは継続）"
                );

                Ok(RecipientOutcome {
                    recipient_id:  recipient.id().clone(),
                    contact_id:    entry.contact.id().clone(),
                    email:         entry.contact.email().clone(),
                    status:        RecipientStatus::Failed,
                    message_id:    None,
                    failure_kind:  Some(kind),
                    error_message: recipient.error_message().map(String::from),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;
    use reachout_domain::{
        campaign::{CampaignName, CampaignRecipient, CampaignStatus},
        clock::FixedClock,
        contact::{Contact, ContactName},
        template::{TemplateId, TemplateName},
    };
    use reachout_infra::mock::{MockCampaignRepository, MockMailer, MockTemplateRepository};

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    struct Fixture {
        campaign_repo: MockCampaignRepository,
        template_repo: MockTemplateRepository,
        mailer:        MockMailer,
        campaign_id:   CampaignId,
    }

    impl Fixture {
        /// テンプレート + キャンペーン + 指定した状態の配信先を組み立てる
        fn new(recipient_specs: &[(&str, &str, RecipientStatus)]) -> Self {
            let template_repo = MockTemplateRepository::new();
            let template = Template::new(
                TemplateId::new(),
                TemplateName::new("初回アウトリーチ").unwrap(),
                "Hi {{firstName}}".to_string(),
                "{{campaignName}} のご案内です。".to_string(),
                fixed_now(),
            );
            let template_id = template.id().clone();
            template_repo.add_template(template);

            let campaign = Campaign::new(
                CampaignId::new(),
                CampaignName::new("春の新製品案内").unwrap(),
                template_id,
                fixed_now(),
            );
            let campaign_id = campaign.id().clone();

            let campaign_repo = MockCampaignRepository::new();
            for (email, first_name, status) in recipient_specs {
                let contact = Contact::new(
                    ContactId::new(),
                    EmailAddress::new(*email).unwrap(),
                    ContactName::new(*first_name).unwrap(),
                    None,
                    None,
                    vec![],
                    fixed_now(),
                );
                let recipient = CampaignRecipient::new(
                    CampaignRecipientId::new(),
                    campaign_id.clone(),
                    contact.id().clone(),
                    fixed_now(),
                );
                let recipient = match status {
                    RecipientStatus::Draft => recipient,
                    RecipientStatus::Sent => {
                        recipient.mark_sent("msg-prev".to_string(), fixed_now())
                    }
                    RecipientStatus::Failed => recipient.mark_failed(
                        DispatchFailureKind::Unknown,
                        "以前の失敗".to_string(),
                        fixed_now(),
                    ),
                    other => panic!("テスト未対応の状態: {other}"),
                };
                campaign_repo.add_contact(contact);
                campaign_repo.add_recipient(recipient);
            }
            campaign_repo.add_campaign(campaign);

            Self {
                campaign_repo,
                template_repo,
                mailer: MockMailer::new(),
                campaign_id,
            }
        }

        fn usecase(&self) -> CampaignSendUseCaseImpl {
            CampaignSendUseCaseImpl::new(
                Arc::new(self.campaign_repo.clone()),
                Arc::new(self.template_repo.clone()),
                Arc::new(self.mailer.clone()),
                Arc::new(FixedClock::new(fixed_now())),
                Duration::from_secs(5),
            )
        }

        fn recipient_statuses(&self) -> Vec<RecipientStatus> {
            self.campaign_repo
                .recipients()
                .iter()
                .map(|r| r.status())
                .collect()
        }

        fn campaign_status(&self) -> CampaignStatus {
            self.campaign_repo.campaigns()[0].status()
        }
    }

    #[tokio::test]
    async fn 全件成功で全配信先がsentになり集計が一致する() {
        let fixture = Fixture::new(&[
            ("alice@example.com", "Alice", RecipientStatus::Draft),
            ("bob@example.com", "Bob", RecipientStatus::Draft),
        ]);

        let summary = fixture
            .usecase()
            .send_campaign(&fixture.campaign_id)
            .await
            .unwrap();

        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.sent, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(
            fixture.recipient_statuses(),
            vec![RecipientStatus::Sent, RecipientStatus::Sent]
        );
        assert_eq!(fixture.campaign_status(), CampaignStatus::Sent);

        // メッセージ ID が記録されていること
        assert!(fixture
            .campaign_repo
            .recipients()
            .iter()
            .all(|r| r.message_id().is_some()));
    }

    #[tokio::test]
    async fn レンダリングにコンタクトとキャンペーンの値が使われる() {
        let fixture = Fixture::new(&[("alice@example.com", "Alice", RecipientStatus::Draft)]);

        fixture
            .usecase()
            .send_campaign(&fixture.campaign_id)
            .await
            .unwrap();

        let sent = fixture.mailer.sent_emails();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Hi Alice");
        assert_eq!(sent[0].body, "春の新製品案内 のご案内です。");
    }

    #[tokio::test]
    async fn 一部失敗でも残りの配信先は処理され集計に反映される() {
        let fixture = Fixture::new(&[
            ("alice@example.com", "Alice", RecipientStatus::Draft),
            ("bob@example.com", "Bob", RecipientStatus::Draft),
            ("carol@example.com", "Carol", RecipientStatus::Draft),
        ]);
        fixture
            .mailer
            .fail_for("bob@example.com", DispatchFailureKind::InvalidAddress);

        let summary = fixture
            .usecase()
            .send_campaign(&fixture.campaign_id)
            .await
            .unwrap();

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.sent, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(
            fixture.recipient_statuses(),
            vec![
                RecipientStatus::Sent,
                RecipientStatus::Failed,
                RecipientStatus::Sent
            ]
        );
        // 一部失敗でもキャンペーンは Sent
        assert_eq!(fixture.campaign_status(), CampaignStatus::Sent);

        // 失敗した配信先に分類が記録されていること
        let recipients = fixture.campaign_repo.recipients();
        assert_eq!(
            recipients[1].failure_kind(),
            Some(DispatchFailureKind::InvalidAddress)
        );
        assert!(recipients[1].error_message().is_some());
    }

    #[tokio::test]
    async fn 全件失敗でキャンペーンはfailedになる() {
        let fixture = Fixture::new(&[("alice@example.com", "Alice", RecipientStatus::Draft)]);
        fixture
            .mailer
            .fail_for("alice@example.com", DispatchFailureKind::TransportUnavailable);

        let summary = fixture
            .usecase()
            .send_campaign(&fixture.campaign_id)
            .await
            .unwrap();

        assert_eq!(summary.sent, 0);
        assert_eq!(summary.failed, 1);
        assert_eq!(fixture.campaign_status(), CampaignStatus::Failed);
    }

    #[tokio::test]
    async fn 送信待ちゼロはエラーになり何も書き込まない() {
        let fixture = Fixture::new(&[
            ("alice@example.com", "Alice", RecipientStatus::Sent),
            ("bob@example.com", "Bob", RecipientStatus::Failed),
        ]);
        let statuses_before = fixture.recipient_statuses();
        let campaign_status_before = fixture.campaign_status();

        let result = fixture.usecase().send_campaign(&fixture.campaign_id).await;

        assert!(matches!(result, Err(ApiError::BadRequest(_))));
        // 配信先もキャンペーンも一切変更されていないこと
        assert_eq!(fixture.recipient_statuses(), statuses_before);
        assert_eq!(fixture.campaign_status(), campaign_status_before);
        assert!(fixture.mailer.sent_emails().is_empty());
    }

    #[tokio::test]
    async fn 存在しないキャンペーンはnot_foundで何も書き込まない() {
        let fixture = Fixture::new(&[("alice@example.com", "Alice", RecipientStatus::Draft)]);

        let result = fixture.usecase().send_campaign(&CampaignId::new()).await;

        assert!(matches!(result, Err(ApiError::NotFound(_))));
        assert!(fixture.mailer.sent_emails().is_empty());
    }

    #[tokio::test]
    async fn テンプレート欠落はbad_requestで何も書き込まない() {
        let fixture = Fixture::new(&[("alice@example.com", "Alice", RecipientStatus::Draft)]);
        // 参照先テンプレートを別リポジトリに差し替えて欠落を再現
        let usecase = CampaignSendUseCaseImpl::new(
            Arc::new(fixture.campaign_repo.clone()),
            Arc::new(MockTemplateRepository::new()),
            Arc::new(fixture.mailer.clone()),
            Arc::new(FixedClock::new(fixed_now())),
            Duration::from_secs(5),
        );

        let result = usecase.send_campaign(&fixture.campaign_id).await;

        assert!(matches!(result, Err(ApiError::BadRequest(_))));
        assert_eq!(
            fixture.recipient_statuses(),
            vec![RecipientStatus::Draft]
        );
        assert!(fixture.mailer.sent_emails().is_empty());
    }

    #[tokio::test]
    async fn 再実行では処理済みを除いた送信待ちだけが選択される() {
        let fixture = Fixture::new(&[
            ("alice@example.com", "Alice", RecipientStatus::Sent),
            ("bob@example.com", "Bob", RecipientStatus::Draft),
        ]);

        let summary = fixture
            .usecase()
            .send_campaign(&fixture.campaign_id)
            .await
            .unwrap();

        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.outcomes[0].email.as_str(), "bob@example.com");
        // 既送信の Alice の行は触られていない
        assert_eq!(
            fixture.campaign_repo.recipients()[0].message_id(),
            Some("msg-prev")
        );
    }

    #[tokio::test]
    async fn retry_failedはfailedの配信先だけを再送する() {
        let fixture = Fixture::new(&[
            ("alice@example.com", "Alice", RecipientStatus::Sent),
            ("bob@example.com", "Bob", RecipientStatus::Failed),
        ]);

        let summary = fixture
            .usecase()
            .retry_failed(&fixture.campaign_id)
            .await
            .unwrap();

        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.sent, 1);
        assert_eq!(
            fixture.recipient_statuses(),
            vec![RecipientStatus::Sent, RecipientStatus::Sent]
        );
        // 再送成功で以前の失敗情報がクリアされていること
        assert!(fixture.campaign_repo.recipients()[1].failure_kind().is_none());
    }

    #[tokio::test]
    async fn retry_failedはfailedがなければエラーになる() {
        let fixture = Fixture::new(&[("alice@example.com", "Alice", RecipientStatus::Sent)]);

        let result = fixture.usecase().retry_failed(&fixture.campaign_id).await;

        assert!(matches!(result, Err(ApiError::BadRequest(_))));
        assert!(fixture.mailer.sent_emails().is_empty());
    }
}
