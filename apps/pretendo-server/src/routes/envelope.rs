//! List/item response envelopes, the RFC 5988 `Link` header, and the
//! `X-Total-Count` header (§4.10).

use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pretendo_query::{paginate::PaginationMeta, Record};
use serde_json::json;

fn query_without_page(raw_query: &str) -> Vec<(String, String)> {
    raw_query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| pair.split_once('='))
        .filter(|(k, _)| *k != "page")
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn build_url(path: &str, others: &[(String, String)], page: u64) -> String {
    let mut parts: Vec<String> = others.iter().map(|(k, v)| format!("{k}={v}")).collect();
    parts.push(format!("page={page}"));
    format!("{path}?{}", parts.join("&"))
}

pub struct Links {
    pub first: String,
    pub prev: Option<String>,
    pub next: Option<String>,
    pub last: String,
}

pub fn build_links(path: &str, raw_query: &str, meta: &PaginationMeta) -> Links {
    let others = query_without_page(raw_query);
    let last_page = meta.total_pages.max(1);
    Links {
        first: build_url(path, &others, 1),
        prev: (meta.current_page > 1).then(|| build_url(path, &others, meta.current_page - 1)),
        next: (meta.current_page < last_page).then(|| build_url(path, &others, meta.current_page + 1)),
        last: build_url(path, &others, last_page),
    }
}

pub fn link_header_value(links: &Links) -> String {
    let mut parts = vec![format!("<{}>; rel=\"first\"", links.first)];
    if let Some(prev) = &links.prev {
        parts.push(format!("<{prev}>; rel=\"prev\""));
    }
    if let Some(next) = &links.next {
        parts.push(format!("<{next}>; rel=\"next\""));
    }
    parts.push(format!("<{}>; rel=\"last\"", links.last));
    parts.join(", ")
}

pub fn list_response(records: Vec<Record>, meta: PaginationMeta, path: &str, raw_query: &str) -> Response {
    let links = build_links(path, raw_query, &meta);
    let body = json!({
        "data": records,
        "meta": {
            "pagination": {
                "currentPage": meta.current_page,
                "perPage": meta.per_page,
                "totalPages": meta.total_pages,
                "totalItems": meta.total_items,
                "links": {
                    "first": links.first,
                    "prev": links.prev,
                    "next": links.next,
                    "last": links.last,
                }
            }
        }
    });

    let mut response = Json(body).into_response();
    if let Ok(header_value) = HeaderValue::from_str(&link_header_value(&links)) {
        response.headers_mut().insert("Link", header_value);
    }
    if let Ok(header_value) = HeaderValue::from_str(&meta.total_items.to_string()) {
        response.headers_mut().insert("X-Total-Count", header_value);
    }
    response
}

pub fn item_response(record: Record) -> Response {
    Json(json!({ "data": record })).into_response()
}
