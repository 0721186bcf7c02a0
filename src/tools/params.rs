//! Defaults and checks shared by the tool parameter structs.

use crate::mallory::client::ListQuery;

pub const DEFAULT_LIMIT: u32 = 10;
pub const MIN_LIMIT: u32 = 1;

pub fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

pub fn default_sort_created_at() -> String {
    "created_at".to_string()
}

pub fn default_sort_name() -> String {
    "name".to_string()
}

pub fn default_order_desc() -> String {
    "desc".to_string()
}

pub fn default_order_asc() -> String {
    "asc".to_string()
}

pub fn require_non_blank(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("'{}' must not be empty", field));
    }
    Ok(())
}

/// An identifier that becomes one URL path segment. `.` and `..` would be
/// collapsed by the URL and address a different resource.
pub fn require_identifier(field: &str, value: &str) -> Result<(), String> {
    require_non_blank(field, value)?;
    if matches!(value.trim(), "." | "..") {
        return Err(format!("'{}' must not be a relative path segment", field));
    }
    Ok(())
}

pub fn require_min_limit(limit: u32) -> Result<(), String> {
    if limit < MIN_LIMIT {
        return Err(format!(
            "'limit' must be at least {}, got {}",
            MIN_LIMIT, limit
        ));
    }
    Ok(())
}

/// Builds the upstream query. Sort and order go through as given; the API
/// decides what it accepts.
pub fn list_query(
    filter: Option<String>,
    offset: u32,
    limit: u32,
    sort: Option<&str>,
    order: Option<&str>,
) -> ListQuery {
    ListQuery {
        filter,
        offset,
        limit,
        sort: sort.map(str::to_string),
        order: order.map(str::to_string),
    }
}

/// Trims a free-text filter; blank filters are dropped.
pub fn non_blank(filter: &str) -> Option<String> {
    let trimmed = filter.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
