use axum::routing::get;
use axum::{Json, Router};

pub fn router() -> Router {
    Router::new()
        .route("/api/ping", get(ping))
        .route("/api/hello", get(hello))
}

async fn ping() -> String {
    "pong".to_string()
}

#[derive(serde::Serialize)]
struct HelloResponse {
    message: String,
}

async fn hello() -> Json<HelloResponse> {
    Json(HelloResponse { message: "Hello from Globepin!".to_string() })
}
