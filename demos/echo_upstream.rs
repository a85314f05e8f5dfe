//! Stand-in upstream for trying the proxy by hand.
//!
//! ```text
//! cargo run --example echo_upstream
//! cargo run -- --upstream http://127.0.0.1:8081/svc
//! curl -H 'X-Trace: abc' http://127.0.0.1:9090/passthrough/items/42
//! ```

use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::Path,
    http::{HeaderMap, Method, Uri},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

async fn item(Path(id): Path<u64>) -> Json<Value> {
    Json(json!({ "id": id }))
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let headers: serde_json::Map<String, Value> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                Value::from(String::from_utf8_lossy(value.as_bytes()).into_owned()),
            )
        })
        .collect();

    Json(json!({
        "method": method.as_str(),
        "uri": uri.to_string(),
        "headers": headers,
        "body_len": body.len(),
    }))
}

#[tokio::main]
async fn main() {
    let app = Router::new()
        .route("/svc/items/{id}", get(item))
        .fallback(echo);

    let addr = SocketAddr::from(([127, 0, 0, 1], 8081));
    println!("Echo upstream listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
