use axum::http::{self, HeaderValue, Method};
use dotenvy::dotenv;
use env_logger::Builder;
use log::LevelFilter;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use werewolf_room_server::app;
use werewolf_room_server::utils::config::CONFIG;

// ログ設定。log マクロは env_logger が受け、TraceLayer や WebSocket タスクが
// 発行する tracing イベントは fmt サブスクライバが受ける。
fn init_logger() {
    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Info)
        .filter_module("tower_http", LevelFilter::Debug)
        .format_timestamp(Some(env_logger::TimestampPrecision::Millis))
        .format_target(true)
        .init();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        log::warn!("a tracing subscriber was already installed");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 環境変数をロード（.envが無くても起動する）
    dotenv().ok();

    init_logger();

    // CORSレイヤーの設定
    let origin = CONFIG.cors_origin.parse::<HeaderValue>()?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([http::header::CONTENT_TYPE]);

    let state = werewolf_room_server::state::AppState::new();
    let app = app::create_app(state).layer(cors).layer(
        TraceLayer::new_for_http().make_span_with(|request: &http::Request<_>| {
            tracing::info_span!(
                "HTTP request",
                method = %request.method(),
                uri = %request.uri(),
            )
        }),
    );

    let addr: SocketAddr = format!("{}:{}", CONFIG.host, CONFIG.port).parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    log::info!("listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
