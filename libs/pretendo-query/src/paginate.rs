//! 1-based pagination with clamping, per §4.1: `per-page < 1` clamps to 1,
//! `page < 1` clamps to 1, `per-page` exceeding the configured maximum clamps
//! to the maximum.

use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub struct PaginationParams {
    pub page: i64,
    pub per_page: i64,
}

impl PaginationParams {
    /// Clamps raw (possibly negative/zero/oversized) inputs per the spec's
    /// edge-case policy.
    pub fn clamp(page: i64, per_page: i64, _default_page_size: u64, max_page_size: u64) -> Self {
        let per_page = if per_page <= 0 {
            1
        } else {
            (per_page as u64).min(max_page_size.max(1)) as i64
        };
        let page = if page < 1 { 1 } else { page };
        Self { page, per_page }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    pub current_page: u64,
    pub per_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
}

/// Slices `items[(page-1)*per_page .. page*per_page)`, returning the slice and
/// the computed metadata. `items` should already be filtered and sorted.
pub fn paginate<T>(items: Vec<T>, params: PaginationParams) -> (Vec<T>, PaginationMeta) {
    let total_items = items.len() as u64;
    let per_page = params.per_page.max(1) as u64;
    let total_pages = if total_items == 0 {
        1
    } else {
        total_items.div_ceil(per_page)
    };
    let page = params.page.max(1) as u64;

    let start = (page.saturating_sub(1)) * per_page;
    let end = (page * per_page).min(total_items);

    let page_items = if start >= total_items {
        Vec::new()
    } else {
        items.into_iter().skip(start as usize).take((end - start) as usize).collect()
    };

    (
        page_items,
        PaginationMeta {
            current_page: page,
            per_page,
            total_pages,
            total_items,
        },
    )
}
