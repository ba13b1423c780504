//! Page/limit pagination used by every list-shaped payload.
//!
//! The wire shape is always `{ "page": n, "limit": k, "total": T, "pages": P }`.

use serde::{Deserialize, Serialize};

/// Default page size when the client sends none (or an invalid one).
pub const DEFAULT_LIMIT: usize = 20;
/// Upper bound on page size.
pub const MAX_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub pages: usize,
}

impl PageInfo {
    /// Build page info for a fully merged list of `total` items.
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        let pages = if limit > 0 {
            total.div_ceil(limit)
        } else {
            0
        };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

/// Negative or zero pages become 1.
pub fn clamp_page(page: i64) -> usize {
    if page < 1 {
        1
    } else {
        page as usize
    }
}

/// Out-of-range limits (≤ 0 or > 100) fall back to the default.
pub fn clamp_limit(limit: i64) -> usize {
    if limit < 1 || limit > MAX_LIMIT as i64 {
        DEFAULT_LIMIT
    } else {
        limit as usize
    }
}

/// The half-open slice `[(page-1)*limit, page*limit)` of `items`.
pub fn paginate<T>(items: Vec<T>, page: usize, limit: usize) -> Vec<T> {
    let start = (page.saturating_sub(1)).saturating_mul(limit);
    items.into_iter().skip(start).take(limit).collect()
}
