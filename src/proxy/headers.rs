//! Header forwarding policy.
//!
//! Forwarding is an allow-list expressed as a table of
//! `header name → rule`. Anything without a row is dropped, which keeps
//! cookies, host and other local-only headers from leaking upstream and
//! upstream-only headers from leaking back.

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName};

/// OData entity-id header, set by the upstream on record creation.
pub const ODATA_ENTITY_ID: HeaderName = HeaderName::from_static("odata-entityid");

/// OData protocol version header.
pub const ODATA_VERSION: HeaderName = HeaderName::from_static("odata-version");

/// What happens to a header that has a row in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardRule {
    /// Copy under the same name.
    Pass,
    /// Copy under another name.
    Rename(HeaderName),
}

/// Allow-list of headers and how each is forwarded.
#[derive(Debug, Clone)]
pub struct HeaderPolicy {
    rules: Vec<(HeaderName, ForwardRule)>,
}

impl HeaderPolicy {
    pub fn new(rules: Vec<(HeaderName, ForwardRule)>) -> Self {
        Self { rules }
    }

    /// Policy for inbound → upstream requests.
    pub fn request(inbound_token: HeaderName, upstream_token: HeaderName) -> Self {
        let token_rule = if inbound_token == upstream_token {
            ForwardRule::Pass
        } else {
            ForwardRule::Rename(upstream_token)
        };
        Self::new(vec![
            (AUTHORIZATION, ForwardRule::Pass),
            (inbound_token, token_rule),
            (CONTENT_TYPE, ForwardRule::Pass),
        ])
    }

    /// Policy for upstream → caller responses.
    pub fn response() -> Self {
        Self::new(vec![
            (CONTENT_TYPE, ForwardRule::Pass),
            (ODATA_ENTITY_ID, ForwardRule::Pass),
            (ODATA_VERSION, ForwardRule::Pass),
        ])
    }

    pub fn rules(&self) -> &[(HeaderName, ForwardRule)] {
        &self.rules
    }

    /// Build the outbound header set from `source`. Every value of a
    /// multi-valued header is carried over.
    pub fn apply(&self, source: &HeaderMap) -> HeaderMap {
        let mut out = HeaderMap::new();
        for (name, rule) in &self.rules {
            let target = match rule {
                ForwardRule::Pass => name,
                ForwardRule::Rename(to) => to,
            };
            for value in source.get_all(name) {
                out.append(target.clone(), value.clone());
            }
        }
        out
    }
}
