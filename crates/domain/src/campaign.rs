//! # キャンペーン
//!
//! キャンペーンと配信先（CampaignRecipient）のドメインモデルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 意味 |
//! |---|------------|------|
//! | [`Campaign`] | キャンペーン | 1 つのテンプレートを参照する送信単位 |
//! | [`CampaignRecipient`] | 配信先 | キャンペーンに所有される宛先行 |
//! | [`CampaignStatus`] | キャンペーン状態 | 送信単位の粗い状態 |
//! | [`RecipientStatus`] | 配信先状態 | 宛先ごとの独立した状態 |
//! | [`DispatchFailureKind`] | 送信失敗分類 | トランスポート失敗の種別 |
//!
//! ## 設計方針
//!
//! - **状態の独立**: 配信先の状態はキャンペーンの状態と独立に遷移する。
//!   Sent / Failed は 1 回の送信試行に対して終端。Opened / Clicked / Bounced は
//!   送信後の観測として上書きされ得る（厳密な状態機械としてはモデル化しない）
//! - **選択の明示的失敗**: 送信対象の選択は、対象が空のとき成功を装わず
//!   [`CampaignError`] で失敗する。オーケストレータはこれを受けて
//!   一切の書き込みを行わずに短絡する
//! - **再送の分離**: `Failed` は送信待ち集合に含めない。再送は専用操作で
//!   `Failed` のみを選択する

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use thiserror::Error;

use crate::{
    contact::{Contact, ContactId},
    template::TemplateId,
};

define_uuid_id! {
    /// キャンペーンの一意識別子
    pub struct CampaignId;
}

define_uuid_id! {
    /// 配信先の一意識別子
    pub struct CampaignRecipientId;
}

define_validated_string! {
    /// キャンペーン名（値オブジェクト）
    ///
    /// # バリデーション
    ///
    /// - 空文字列ではない
    /// - 最大 200 文字
    pub struct CampaignName {
        label: "キャンペーン名",
        max_length: 200,
    }
}

/// キャンペーン選択エラー
///
/// 送信・再送の対象選択が空集合になった場合のエラー。
/// 成功扱いの空リストではなく区別可能なエラーとして伝播させる。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CampaignError {
    /// 送信待ち（Draft / Scheduled）の配信先が存在しない
    #[error("送信待ちの配信先がありません")]
    NoPendingRecipients,

    /// 再送対象（Failed）の配信先が存在しない
    #[error("再送対象の配信先がありません")]
    NoRetryableRecipients,
}

/// キャンペーン状態
///
/// campaigns テーブルの `status` カラムに snake_case で格納される。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CampaignStatus {
    /// 下書き（作成直後）
    Draft,
    /// 送信予約済み
    Scheduled,
    /// 送信処理中
    Sending,
    /// 送信完了（1 件以上成功）
    Sent,
    /// 送信失敗（全件失敗）
    Failed,
}

/// 配信先状態
///
/// campaign_recipients テーブルの `status` カラムに snake_case で格納される。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecipientStatus {
    /// 未送信（作成直後）
    Draft,
    /// 送信予約済み（未送信）
    Scheduled,
    /// 送信成功（1 回の送信試行に対して終端）
    Sent,
    /// 送信失敗（1 回の送信試行に対して終端）
    Failed,
    /// 開封を観測（送信後）
    Opened,
    /// クリックを観測（送信後）
    Clicked,
    /// バウンスを観測（送信後）
    Bounced,
}

impl RecipientStatus {
    /// 送信待ち集合（Draft / Scheduled）に含まれるか
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Draft | Self::Scheduled)
    }
}

/// 送信失敗分類
///
/// メール送信基盤の失敗をオーケストレータが区別して記録するための種別。
/// campaign_recipients テーブルの `failure_kind` カラムに snake_case で
/// 格納される。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DispatchFailureKind {
    /// 宛先アドレス不正
    InvalidAddress,
    /// 送信基盤に到達できない（接続・認証・タイムアウト）
    TransportUnavailable,
    /// 送信が制限されている（レート制限、サンドボックスの宛先制限）
    Restricted,
    /// 分類不能
    Unknown,
}

// =========================================================================
// CampaignRecipient（配信先エンティティ）
// =========================================================================

/// 配信先エンティティ
///
/// キャンペーン作成時に選択されたコンタクト 1 件につき 1 行作成される。
/// Campaign に所有され（キャンペーン削除で連動削除）、Contact は参照のみ。
///
/// # 不変条件
///
/// - `message_id` は `Sent` 系の状態でのみ設定される
/// - `failure_kind` / `error_message` は `Failed` でのみ設定される
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignRecipient {
    id:            CampaignRecipientId,
    campaign_id:   CampaignId,
    contact_id:    ContactId,
    status:        RecipientStatus,
    message_id:    Option<String>,
    failure_kind:  Option<DispatchFailureKind>,
    error_message: Option<String>,
    sent_at:       Option<DateTime<Utc>>,
    created_at:    DateTime<Utc>,
    updated_at:    DateTime<Utc>,
}

impl CampaignRecipient {
    /// 新しい配信先を作成する（初期状態 Draft）
    pub fn new(
        id: CampaignRecipientId,
        campaign_id: CampaignId,
        contact_id: ContactId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            campaign_id,
            contact_id,
            status: RecipientStatus::Draft,
            message_id: None,
            failure_kind: None,
            error_message: None,
            sent_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// データベースから配信先を復元する
    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: CampaignRecipientId,
        campaign_id: CampaignId,
        contact_id: ContactId,
        status: RecipientStatus,
        message_id: Option<String>,
        failure_kind: Option<DispatchFailureKind>,
        error_message: Option<String>,
        sent_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            campaign_id,
            contact_id,
            status,
            message_id,
            failure_kind,
            error_message,
            sent_at,
            created_at,
            updated_at,
        }
    }

    /// 送信成功を記録する
    ///
    /// トランスポートのメッセージ識別子を保持し、失敗情報をクリアする。
    pub fn mark_sent(self, message_id: String, now: DateTime<Utc>) -> Self {
        Self {
            status: RecipientStatus::Sent,
            message_id: Some(message_id),
            failure_kind: None,
            error_message: None,
            sent_at: Some(now),
            updated_at: now,
            ..self
        }
    }

    /// 送信失敗を記録する
    pub fn mark_failed(
        self,
        kind: DispatchFailureKind,
        error_message: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            status: RecipientStatus::Failed,
            message_id: None,
            failure_kind: Some(kind),
            error_message: Some(error_message),
            sent_at: None,
            updated_at: now,
            ..self
        }
    }

    pub fn id(&self) -> &CampaignRecipientId {
        &self.id
    }

    pub fn campaign_id(&self) -> &CampaignId {
        &self.campaign_id
    }

    pub fn contact_id(&self) -> &ContactId {
        &self.contact_id
    }

    pub fn status(&self) -> RecipientStatus {
        self.status
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn failure_kind(&self) -> Option<DispatchFailureKind> {
        self.failure_kind
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.sent_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

// =========================================================================
// Campaign（キャンペーンエンティティ）
// =========================================================================

/// キャンペーンエンティティ
///
/// テンプレートを 1 つ参照する（ライフサイクルは所有しない）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Campaign {
    id:          CampaignId,
    name:        CampaignName,
    template_id: TemplateId,
    status:      CampaignStatus,
    created_at:  DateTime<Utc>,
    updated_at:  DateTime<Utc>,
}

impl Campaign {
    /// 新しいキャンペーンを作成する（初期状態 Draft）
    pub fn new(
        id: CampaignId,
        name: CampaignName,
        template_id: TemplateId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            template_id,
            status: CampaignStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    /// データベースからキャンペーンを復元する
    pub fn from_db(
        id: CampaignId,
        name: CampaignName,
        template_id: TemplateId,
        status: CampaignStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            template_id,
            status,
            created_at,
            updated_at,
        }
    }

    /// 送信処理の開始を記録する
    pub fn start_sending(self, now: DateTime<Utc>) -> Self {
        Self {
            status: CampaignStatus::Sending,
            updated_at: now,
            ..self
        }
    }

    /// 送信処理の完了を記録する
    ///
    /// 1 件以上成功していれば `Sent`、全件失敗なら `Failed`。
    pub fn finish_sending(self, sent_count: usize, now: DateTime<Utc>) -> Self {
        let status = if sent_count > 0 {
            CampaignStatus::Sent
        } else {
            CampaignStatus::Failed
        };
        Self {
            status,
            updated_at: now,
            ..self
        }
    }

    pub fn id(&self) -> &CampaignId {
        &self.id
    }

    pub fn name(&self) -> &CampaignName {
        &self.name
    }

    pub fn template_id(&self) -> &TemplateId {
        &self.template_id
    }

    pub fn status(&self) -> CampaignStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

// =========================================================================
// CampaignDetail（配信先 + コンタクトを含むキャンペーン詳細）
// =========================================================================

/// 配信先とその参照先コンタクトの組
///
/// レンダリングにコンタクトのフィールドが必要なため、
/// リポジトリは配信先をコンタクトと JOIN して返す。
#[derive(Debug, Clone)]
pub struct RecipientEntry {
    pub recipient: CampaignRecipient,
    pub contact:   Contact,
}

/// キャンペーン詳細（配信先コレクションを含む）
///
/// 配信先は作成順（ID 昇順）を保って保持される。
#[derive(Debug, Clone)]
pub struct CampaignDetail {
    pub campaign:   Campaign,
    pub recipients: Vec<RecipientEntry>,
}

impl CampaignDetail {
    /// 送信待ち（Draft / Scheduled）の配信先を元の相対順のまま返す
    ///
    /// # エラー
    ///
    /// 対象が空の場合は `CampaignError::NoPendingRecipients` を返す。
    pub fn pending_recipients(&self) -> Result<Vec<&RecipientEntry>, CampaignError> {
        let pending: Vec<&RecipientEntry> = self
            .recipients
            .iter()
            .filter(|e| e.recipient.status().is_pending())
            .collect();

        if pending.is_empty() {
            return Err(CampaignError::NoPendingRecipients);
        }
        Ok(pending)
    }

    /// 再送対象（Failed）の配信先を元の相対順のまま返す
    ///
    /// # エラー
    ///
    /// 対象が空の場合は `CampaignError::NoRetryableRecipients` を返す。
    pub fn retryable_recipients(&self) -> Result<Vec<&RecipientEntry>, CampaignError> {
        let retryable: Vec<&RecipientEntry> = self
            .recipients
            .iter()
            .filter(|e| e.recipient.status() == RecipientStatus::Failed)
            .collect();

        if retryable.is_empty() {
            return Err(CampaignError::NoRetryableRecipients);
        }
        Ok(retryable)
    }

    /// 配信先コレクションから状態別集計を計算する
    pub fn stats(&self) -> CampaignStats {
        let mut stats = CampaignStats::default();
        for entry in &self.recipients {
            stats.record(entry.recipient.status(), 1);
        }
        stats
    }
}

// =========================================================================
// CampaignStats（配信先の状態別集計）
// =========================================================================

/// 配信先の状態別集計
///
/// キャンペーン一覧・詳細 API で使用する。
/// `pending` は Draft + Scheduled の合計。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CampaignStats {
    pub total:   i64,
    pub pending: i64,
    pub sent:    i64,
    pub failed:  i64,
    pub opened:  i64,
    pub clicked: i64,
    pub bounced: i64,
}

impl CampaignStats {
    /// 状態別の件数を加算する
    pub fn record(&mut self, status: RecipientStatus, count: i64) {
        self.total += count;
        match status {
            RecipientStatus::Draft | RecipientStatus::Scheduled => self.pending += count,
            RecipientStatus::Sent => self.sent += count,
            RecipientStatus::Failed => self.failed += count,
            RecipientStatus::Opened => self.opened += count,
            RecipientStatus::Clicked => self.clicked += count,
            RecipientStatus::Bounced => self.bounced += count,
        }
    }
}
