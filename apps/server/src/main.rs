//! # Reachout API サーバー
//!
//! アウトリーチ管理（コンタクト / テンプレート / キャンペーン）の
//! REST API を提供するサーバー。
//!
//! ## 役割
//!
//! - **コンタクト管理**: 宛先の CRUD（論理削除・タグ絞り込み）
//! - **テンプレート管理**: プレースホルダ付きメールテンプレートの CRUD、
//!   レンダリングプレビュー、テスト送信
//! - **キャンペーン送信**: テンプレート × 配信先リストの一括送信と
//!   配信先ごとのステータス追跡
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `SERVER_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `SERVER_PORT` | **Yes** | ポート番号 |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `MAILER_BACKEND` | No | `smtp` / `ses` / `noop`（デフォルト: `noop`） |
//! | `SMTP_HOST` | No | SMTP ホスト（デフォルト: `localhost`） |
//! | `SMTP_PORT` | No | SMTP ポート（デフォルト: `1025`） |
//! | `MAIL_FROM_ADDRESS` | No | 送信元メールアドレス |
//! | `SEND_TIMEOUT_SECS` | No | 配信先 1 件あたりの送信タイムアウト（デフォルト: 30） |
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境（Mailpit へ送信）
//! MAILER_BACKEND=smtp cargo run -p reachout-server
//!
//! # 本番環境（SES 経由で送信）
//! SERVER_PORT=3001 DATABASE_URL=postgres://... MAILER_BACKEND=ses \
//!     cargo run -p reachout-server --release
//! ```

mod config;
mod error;
mod handler;
mod usecase;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use config::ServerConfig;
use handler::{
    CampaignState,
    ContactState,
    TemplateState,
    archive_contact,
    archive_template,
    create_campaign,
    create_contact,
    create_template,
    delete_campaign,
    get_campaign,
    get_contact,
    get_template,
    health_check,
    list_campaigns,
    list_contacts,
    list_templates,
    render_template,
    retry_campaign,
    send_campaign,
    send_test_email,
    update_contact,
    update_template,
};
use reachout_domain::clock::SystemClock;
use reachout_infra::{
    db,
    mailer::{Mailer, NoopMailer, SesMailer, SmtpMailer},
    repository::{
        PostgresCampaignRepository,
        PostgresContactRepository,
        PostgresTemplateRepository,
    },
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use usecase::{
    CampaignSendUseCaseImpl,
    CampaignUseCaseImpl,
    ContactUseCaseImpl,
    TemplateUseCaseImpl,
};

/// 設定に応じてメール送信バックエンドを構築する
async fn build_mailer(config: &config::MailerConfig) -> Arc<dyn Mailer> {
    match config.backend.as_str() {
        "smtp" => Arc::new(SmtpMailer::new(
            &config.smtp_host,
            config.smtp_port,
            config.from_address.clone(),
        )),
        "ses" => {
            let aws_config = aws_config::load_from_env().await;
            Arc::new(SesMailer::new(
                aws_sdk_sesv2::Client::new(&aws_config),
                config.from_address.clone(),
            ))
        }
        "noop" => Arc::new(NoopMailer),
        other => {
            tracing::warn!("未知の MAILER_BACKEND です: {other}（noop を使用します）");
            Arc::new(NoopMailer)
        }
    }
}

/// API サーバーのエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    // トレーシング初期化
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,reachout=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 設定読み込み
    let config = ServerConfig::from_env().expect("設定の読み込みに失敗しました");

    tracing::info!(
        "Reachout API サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    // データベース接続プールを作成し、マイグレーションを適用
    let pool = db::create_pool(&config.database_url)
        .await
        .expect("データベース接続に失敗しました");
    db::run_migrations(&pool)
        .await
        .expect("マイグレーションの適用に失敗しました");
    tracing::info!("データベースに接続しました");

    // メール送信バックエンド
    let mailer = build_mailer(&config.mailer).await;
    tracing::info!("メール送信バックエンド: {}", config.mailer.backend);

    let clock = Arc::new(SystemClock);

    // コンタクト関連の依存コンポーネント
    let contact_repo = Arc::new(PostgresContactRepository::new(pool.clone()));
    let contact_usecase = ContactUseCaseImpl::new(contact_repo.clone(), clock.clone());
    let contact_state = Arc::new(ContactState {
        usecase: contact_usecase,
    });

    // テンプレート関連の依存コンポーネント
    let template_repo = Arc::new(PostgresTemplateRepository::new(pool.clone()));
    let template_usecase =
        TemplateUseCaseImpl::new(template_repo.clone(), mailer.clone(), clock.clone());
    let template_state = Arc::new(TemplateState {
        usecase: template_usecase,
    });

    // キャンペーン関連の依存コンポーネント
    let campaign_repo = Arc::new(PostgresCampaignRepository::new(pool.clone()));
    let campaign_usecase = CampaignUseCaseImpl::new(
        campaign_repo.clone(),
        template_repo.clone(),
        contact_repo.clone(),
        clock.clone(),
    );
    let send_usecase = CampaignSendUseCaseImpl::new(
        campaign_repo,
        template_repo,
        mailer,
        clock,
        Duration::from_secs(config.mailer.send_timeout_secs),
    );
    let campaign_state = Arc::new(CampaignState {
        usecase:      campaign_usecase,
        send_usecase,
    });

    // ルーター構築
    let app = Router::new()
        .route("/health", get(health_check))
        // コンタクト API
        .route("/api/contacts", get(list_contacts).post(create_contact))
        .route(
            "/api/contacts/{contact_id}",
            get(get_contact)
                .put(update_contact)
                .delete(archive_contact),
        )
        .with_state(contact_state)
        // テンプレート API
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
        .with_state(template_state)
        // キャンペーン API
        .route("/api/campaigns", get(list_campaigns).post(create_campaign))
        .route(
            "/api/campaigns/{campaign_id}",
            get(get_campaign).delete(delete_campaign),
        )
        .route("/api/campaigns/{campaign_id}/send", post(send_campaign))
        .route("/api/campaigns/{campaign_id}/retry", post(retry_campaign))
        .with_state(campaign_state)
        .layer(TraceLayer::new_for_http());

    // サーバー起動
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("アドレスのパースに失敗しました");

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Reachout API サーバーが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
