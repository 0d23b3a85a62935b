use axum::Router;

use crate::routes;
use crate::state::AppState;

// ルーター全体を組み立てる。テストからは任意の AppState を渡せる。
pub fn create_app(state: AppState) -> Router {
    routes::create_routes(state)
}
