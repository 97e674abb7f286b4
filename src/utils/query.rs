use mongodb::bson::{Document, doc, oid::ObjectId};

use crate::error::ApiError;

/// Hard cap on page size for every listing endpoint.
pub const MAX_LIMIT: i64 = 100;

pub fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

pub fn clamp_limit(limit: Option<i64>, default: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, MAX_LIMIT)
}

pub fn skip_for(page: i64, limit: i64) -> u64 {
    ((page - 1) * limit) as u64
}

pub fn total_pages(total_items: u64, limit: i64) -> i64 {
    (total_items as f64 / limit as f64).ceil() as i64
}

/// Escape user input for use inside a `$regex` filter so it matches literally.
pub fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(
            c,
            '.' | '^' | '$' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\'
                | '/'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive substring filter over a single field.
pub fn contains_filter(field: &str, term: &str) -> Document {
    doc! { field: { "$regex": escape_regex(term), "$options": "i" } }
}

/// Whitelist-validated sort document. Any field outside the whitelist falls
/// back to `createdAt desc`.
pub fn resolve_sort(field: Option<&str>, order: Option<&str>, whitelist: &[&str]) -> Document {
    let direction = match order {
        Some("asc") => 1,
        _ => -1,
    };
    match field {
        Some(f) if whitelist.contains(&f) => doc! { f: direction },
        _ => doc! { "createdAt": -1 },
    }
}

pub fn parse_object_id(id: &str, what: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(id).map_err(|_| ApiError::Validation(format!("Invalid {} id", what)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_is_clamped_to_at_least_one() {
        assert_eq!(clamp_page(None), 1);
        assert_eq!(clamp_page(Some(0)), 1);
        assert_eq!(clamp_page(Some(-3)), 1);
        assert_eq!(clamp_page(Some(7)), 7);
    }

    #[test]
    fn limit_is_clamped_to_range() {
        assert_eq!(clamp_limit(None, 10), 10);
        assert_eq!(clamp_limit(Some(0), 10), 1);
        assert_eq!(clamp_limit(Some(500), 10), MAX_LIMIT);
        assert_eq!(clamp_limit(Some(24), 10), 24);
    }

    #[test]
    fn skip_follows_page_and_limit() {
        assert_eq!(skip_for(1, 24), 0);
        assert_eq!(skip_for(3, 10), 20);
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
    }

    #[test]
    fn regex_metacharacters_are_escaped() {
        assert_eq!(escape_regex("a.b*c"), "a\\.b\\*c");
        assert_eq!(escape_regex("(1+1)?"), "\\(1\\+1\\)\\?");
        assert_eq!(escape_regex("plain"), "plain");
    }

    #[test]
    fn sort_outside_whitelist_falls_back() {
        let whitelist = ["title", "year", "createdAt"];
        assert_eq!(
            resolve_sort(Some("year"), Some("asc"), &whitelist),
            doc! { "year": 1 }
        );
        assert_eq!(
            resolve_sort(Some("year"), None, &whitelist),
            doc! { "year": -1 }
        );
        assert_eq!(
            resolve_sort(Some("password"), Some("asc"), &whitelist),
            doc! { "createdAt": -1 }
        );
        assert_eq!(resolve_sort(None, None, &whitelist), doc! { "createdAt": -1 });
    }

    #[test]
    fn object_id_parsing_names_the_entity() {
        assert!(parse_object_id("64b5f0a1c2d3e4f5a6b7c8d9", "movie").is_ok());
        let err = parse_object_id("nope", "movie").unwrap_err();
        assert_eq!(err.message(), "Invalid movie id");
    }
}
