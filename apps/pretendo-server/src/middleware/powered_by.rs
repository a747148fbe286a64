//! Sets the `X-Powered-By: Pretendo` header on every response (§6).

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;

pub async fn stamp(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert("x-powered-by", HeaderValue::from_static("Pretendo"));
    response
}
