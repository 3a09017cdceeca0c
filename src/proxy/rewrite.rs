//! Local path to upstream URL rewriting.
//!
//! The prefix is matched on a segment boundary and the query is carried as
//! the raw string the caller sent. Parameters are never decoded, re-encoded
//! or reordered.

/// Strip `prefix` from `path`, returning the remainder when `path` lies
/// under the prefix. The remainder is empty or starts with `/`.
pub fn strip_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Join the upstream base, the path remainder and the raw query.
pub fn upstream_url(base: &str, remainder: &str, query: Option<&str>) -> String {
    let base = base.trim_end_matches('/');
    let mut url = String::with_capacity(base.len() + remainder.len() + 64);
    url.push_str(base);
    url.push_str(remainder);
    if let Some(query) = query {
        url.push('?');
        url.push_str(query);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://portal.example.com/_api";

    #[test]
    fn test_strip_prefix_boundaries() {
        assert_eq!(strip_prefix("/_api", "/_api"), Some(""));
        assert_eq!(strip_prefix("/_api/", "/_api"), Some("/"));
        assert_eq!(strip_prefix("/_api/accounts", "/_api"), Some("/accounts"));
        assert_eq!(strip_prefix("/_apix/accounts", "/_api"), None);
        assert_eq!(strip_prefix("/other", "/_api"), None);
    }

    #[test]
    fn test_empty_remainder_maps_to_base() {
        assert_eq!(upstream_url(BASE, "", None), BASE);
        assert_eq!(upstream_url("https://portal.example.com/_api/", "", None), BASE);
    }

    #[test]
    fn test_single_slash_at_boundary() {
        assert_eq!(
            upstream_url("https://portal.example.com/_api/", "/accounts", None),
            "https://portal.example.com/_api/accounts"
        );
        assert_eq!(
            upstream_url(BASE, "/accounts(42)/contacts", None),
            "https://portal.example.com/_api/accounts(42)/contacts"
        );
    }

    #[test]
    fn test_query_is_verbatim() {
        let query = "$select=name,id&$filter=name%20eq%20'a%26b'&$orderby=name desc";
        let url = upstream_url(BASE, "/accounts", Some(query));
        assert_eq!(url, format!("{}/accounts?{}", BASE, query));
    }

    #[test]
    fn test_question_mark_not_duplicated() {
        let url = upstream_url(BASE, "/accounts", Some("$filter=contains(name,'?')"));
        assert_eq!(url.matches('?').count(), 2);
        assert!(url.ends_with("/accounts?$filter=contains(name,'?')"));
    }

    #[test]
    fn test_empty_query_is_kept() {
        assert_eq!(upstream_url(BASE, "/accounts", Some("")), format!("{}/accounts?", BASE));
    }
}
