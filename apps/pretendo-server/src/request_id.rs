//! Request-id generation and propagation, mirroring the teacher's
//! `api_ingress::request_id` module with `uuid` standing in for `nanoid`
//! (not a workspace dependency here).

use axum::extract::Request;
use axum::http::HeaderName;
use axum::middleware::Next;
use axum::response::Response;
use tower_http::request_id::{MakeRequestId, RequestId};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct XRequestId(pub String);

pub fn header() -> HeaderName {
    HeaderName::from_static("x-request-id")
}

#[derive(Clone, Default)]
pub struct MakeReqId;

impl MakeRequestId for MakeReqId {
    fn make_request_id<B>(&mut self, _req: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        Some(RequestId::new(id.parse().ok()?))
    }
}

/// Stores the request id in request extensions and records it on the current
/// tracing span (created by the trace layer one step further out).
pub async fn push_req_id_to_extensions(mut req: Request, next: Next) -> Response {
    let hdr = header();
    if let Some(rid) = req
        .headers()
        .get(&hdr)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
    {
        req.extensions_mut().insert(XRequestId(rid.clone()));
        tracing::Span::current().record("request_id", rid.as_str());
    }
    next.run(req).await
}

/// Builds the tracing span/event layer: one INFO span per request carrying
/// method, path, and (once the request completes) status and latency.
pub fn trace_layer() -> TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
> {
    TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
        tracing::info_span!(
            "http_request",
            method = %req.method(),
            path = %req.uri().path(),
            request_id = tracing::field::Empty,
            status = tracing::field::Empty,
        )
    })
}
