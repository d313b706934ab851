// VoiceMemoBackendAPI ライブラリ
// テストから各モジュールにアクセスできるようにするため

pub mod config;
pub mod formats;
pub mod handlers;
pub mod live;
pub mod models;
pub mod pipeline;
pub mod recognize;
pub mod store;
pub mod transcode;
pub mod upload;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use handlers::AppState;

/// ルーターの構築。テストからも同じ経路で組み立てられる
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // メモのエンドポイント
        .route("/memos", post(handlers::create_memo))
        .route("/memos/live", post(handlers::create_live_session))
        .route("/memos/manual", post(handlers::create_manual_memo))
        .route("/memos/{id}", get(handlers::get_memo))
        // 情報取得エンドポイント
        .route("/health", get(handlers::health_check))
        .route("/stats", get(handlers::get_stats))
        // ミドルウェアの追加
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        // アプリケーション状態の共有
        .with_state(state)
}
