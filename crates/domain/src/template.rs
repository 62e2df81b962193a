//! # メールテンプレート
//!
//! 件名・本文にプレースホルダを含むメールテンプレートのドメインモデルと、
//! プレースホルダ置換（レンダリング）の純粋関数を定義する。
//!
//! ## プレースホルダ構文
//!
//! `{{name}}` 形式。区切りの内側の空白は許容する（`{{ name }}` も同じ扱い）。
//! 名前は英数字とアンダースコア（`\w+`）。件名・本文で同じ構文を認識する。
//!
//! ## 未解決プレースホルダの方針
//!
//! マッピングに存在しないプレースホルダは**トークンをそのまま残す**。
//! 空文字列への置換はテンプレートの打ち間違いを隠してしまうため採用しない。
//! この方針はレンダリングのすべての経路で一様に適用される。
//!
//! ## 設計方針
//!
//! - **純粋関数**: レンダリングは I/O を行わず、同じ入力は常に同じ出力を返す
//! - **派生値**: テンプレートのプレースホルダ一覧は件名 + 本文から自動抽出し、
//!   出現順・重複排除で保持する

use std::{collections::HashMap, sync::LazyLock};

use chrono::{DateTime, Utc};
use itertools::Itertools;
use regex::Regex;

define_uuid_id! {
    /// テンプレートの一意識別子
    pub struct TemplateId;
}

define_validated_string! {
    /// テンプレート名（値オブジェクト）
    ///
    /// # バリデーション
    ///
    /// - 空文字列ではない
    /// - 最大 200 文字
    pub struct TemplateName {
        label: "テンプレート名",
        max_length: 200,
    }
}

/// プレースホルダトークンにマッチする正規表現
///
/// キャプチャ 1 がプレースホルダ名。
static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("プレースホルダ正規表現が不正です")
});

/// 件名と本文からプレースホルダ名を抽出する
///
/// 件名 → 本文の順に走査し、初出順を保ったまま重複を排除する。
pub fn extract_placeholders(subject: &str, body: &str) -> Vec<String> {
    PLACEHOLDER_RE
        .captures_iter(subject)
        .chain(PLACEHOLDER_RE.captures_iter(body))
        .map(|caps| caps[1].to_string())
        .unique()
        .collect()
}

/// 1 つのテンプレート文字列をレンダリングする
///
/// マッピングに存在するプレースホルダをすべて置換し、
/// 存在しないプレースホルダはトークンをそのまま残す。
fn render_str(template: &str, values: &HashMap<String, String>) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &regex::Captures<'_>| {
            match values.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// レンダリング結果（件名 + 本文）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedContent {
    pub subject: String,
    pub body:    String,
}

/// メールテンプレートエンティティ
///
/// # 不変条件
///
/// - `placeholders` は常に現在の `subject` + `body` から導出された値と一致する
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    id:           TemplateId,
    name:         TemplateName,
    subject:      String,
    body:         String,
    placeholders: Vec<String>,
    archived:     bool,
    created_at:   DateTime<Utc>,
    updated_at:   DateTime<Utc>,
}

impl Template {
    /// 新しいテンプレートを作成する
    ///
    /// プレースホルダ一覧は件名 + 本文から自動抽出される。
    pub fn new(
        id: TemplateId,
        name: TemplateName,
        subject: String,
        body: String,
        now: DateTime<Utc>,
    ) -> Self {
        let placeholders = extract_placeholders(&subject, &body);
        Self {
            id,
            name,
            subject,
            body,
            placeholders,
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// データベースからテンプレートを復元する
    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: TemplateId,
        name: TemplateName,
        subject: String,
        body: String,
        placeholders: Vec<String>,
        archived: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            subject,
            body,
            placeholders,
            archived,
            created_at,
            updated_at,
        }
    }

    /// 名前・件名・本文を更新する
    ///
    /// プレースホルダ一覧は再抽出される。
    pub fn update_content(
        self,
        name: TemplateName,
        subject: String,
        body: String,
        now: DateTime<Utc>,
    ) -> Self {
        let placeholders = extract_placeholders(&subject, &body);
        Self {
            name,
            subject,
            body,
            placeholders,
            updated_at: now,
            ..self
        }
    }

    /// テンプレートをアーカイブする（論理削除）
    pub fn archive(self, now: DateTime<Utc>) -> Self {
        Self {
            archived: true,
            updated_at: now,
            ..self
        }
    }

    /// 件名と本文をレンダリングする
    ///
    /// 未解決プレースホルダの扱いはモジュールドキュメント参照
    /// （トークンをそのまま残す）。
    pub fn render(&self, values: &HashMap<String, String>) -> RenderedContent {
        RenderedContent {
            subject: render_str(&self.subject, values),
            body:    render_str(&self.body, values),
        }
    }

    /// 与えられたマッピングがカバーしていないプレースホルダ名を返す
    ///
    /// レンダリングプレビュー API が変数マップの不足を 400 で拒否するために
    /// 使用する。送信フローはこの検査を行わない（未解決はそのまま残す）。
    pub fn missing_placeholders(&self, values: &HashMap<String, String>) -> Vec<String> {
        self.placeholders
            .iter()
            .filter(|p| !values.contains_key(*p))
            .cloned()
            .collect()
    }

    pub fn id(&self) -> &TemplateId {
        &self.id
    }

    pub fn name(&self) -> &TemplateName {
        &self.name
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    pub fn archived(&self) -> bool {
        self.archived
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
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

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // --- 抽出 ---

    #[test]
    fn test_プレースホルダは件名と本文から初出順で抽出される() {
        let template = make_template(
            "Hi {{firstName}}",
            "{{firstName}} さん、{{company}} の件で {{senderName}} です。",
        );

        assert_eq!(
            template.placeholders(),
            &["firstName", "company", "senderName"]
        );
    }

    #[test]
    fn test_プレースホルダのないテンプレートは空の一覧になる() {
        let template = make_template("お知らせ", "本文のみ。");
        assert!(template.placeholders().is_empty());
    }

    #[rstest]
    #[case("{{ name }}", "内側の空白あり")]
    #[case("{{name}}", "空白なし")]
    #[case("{{  name  }}", "複数空白")]
    fn test_トークン内側の空白は許容される(#[case] subject: &str, #[case] _desc: &str) {
        let template = make_template(subject, "");
        assert_eq!(template.placeholders(), &["name"]);
    }

    #[test]
    fn test_update_contentでプレースホルダが再抽出される() {
        let template = make_template("Hi {{firstName}}", "")
            .update_content(
                TemplateName::new("更新後").unwrap(),
                "Hello {{lastName}}".to_string(),
                "{{company}}".to_string(),
                fixed_now(),
            );

        assert_eq!(template.placeholders(), &["lastName", "company"]);
    }

    // --- レンダリング ---

    #[test]
    fn test_全プレースホルダをカバーするマッピングで未解決トークンが残らない() {
        let template = make_template("Hi {{firstName}}", "{{company}} の件です。");
        let rendered = template.render(&vars(&[
            ("firstName", "Alice"),
            ("company", "Example Inc."),
        ]));

        assert_eq!(rendered.subject, "Hi Alice");
        assert_eq!(rendered.body, "Example Inc. の件です。");
        assert!(!rendered.subject.contains("{{"));
        assert!(!rendered.body.contains("{{"));
    }

    #[test]
    fn test_マッピングにないプレースホルダはトークンのまま残る() {
        let template = make_template("Hi {{firstName}}", "クーポン: {{couponCode}}");
        let rendered = template.render(&vars(&[("firstName", "Alice")]));

        assert_eq!(rendered.subject, "Hi Alice");
        assert_eq!(rendered.body, "クーポン: {{couponCode}}");
    }

    #[test]
    fn test_同じプレースホルダの複数出現はすべて置換される() {
        let template = make_template(
            "{{firstName}} さん",
            "{{firstName}} さん、{{firstName}} さん宛です。",
        );
        let rendered = template.render(&vars(&[("firstName", "Bob")]));

        assert_eq!(rendered.body, "Bob さん、Bob さん宛です。");
    }

    #[test]
    fn test_空文字列の値は空文字列に置換される() {
        let template = make_template("{{lastName}}様", "");
        let rendered = template.render(&vars(&[("lastName", "")]));

        assert_eq!(rendered.subject, "様");
    }

    #[test]
    fn test_レンダリングは決定的で同じ入力は同じ出力を返す() {
        let template = make_template("Hi {{firstName}}", "{{company}}");
        let values = vars(&[("firstName", "Alice"), ("company", "Example")]);

        let first = template.render(&values);
        let second = template.render(&values);

        assert_eq!(first, second);
    }

    #[test]
    fn test_ドル記号を含む値がそのまま置換される() {
        // 正規表現の置換構文として解釈されないこと
        let template = make_template("{{price}}", "");
        let rendered = template.render(&vars(&[("price", "$100")]));

        assert_eq!(rendered.subject, "$100");
    }

    // --- 不足プレースホルダ検査 ---

    #[test]
    fn test_missing_placeholdersは不足分のみ返す() {
        let template = make_template("Hi {{firstName}}", "{{company}} / {{senderName}}");
        let missing = template.missing_placeholders(&vars(&[("firstName", "Alice")]));

        assert_eq!(missing, &["company", "senderName"]);
    }

    #[test]
    fn test_全部カバーされていればmissing_placeholdersは空() {
        let template = make_template("Hi {{firstName}}", "");
        let missing = template.missing_placeholders(&vars(&[("firstName", "Alice")]));

        assert!(missing.is_empty());
    }

    // --- アーカイブ ---

    #[test]
    fn test_archiveでアーカイブフラグが立つ() {
        let later = fixed_now() + chrono::Duration::seconds(60);
        let template = make_template("件名", "本文").archive(later);

        assert!(template.archived());
        assert_eq!(template.updated_at(), later);
    }
}
