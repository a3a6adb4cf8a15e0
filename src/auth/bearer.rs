//! Bearer value extraction.
//!
//! Some hosting setups strip the `Authorization` header before it reaches
//! the application, so the value is also accepted from a header a proxy can
//! rewrite it into and from an `authorization` query parameter, in that order.

use axum::http::{HeaderMap, header};
use serde::Serialize;

/// Header a reverse proxy can copy `Authorization` into.
pub const PROXY_AUTHORIZATION_HEADER: &str = "x-authorization";

/// Query parameter fallback for environments that strip both headers.
pub const AUTHORIZATION_QUERY_PARAM: &str = "authorization";

/// Where a bearer value was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BearerSource {
    Header,
    ProxyHeader,
    QueryParam,
}

impl BearerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            BearerSource::Header => "header",
            BearerSource::ProxyHeader => "proxy_header",
            BearerSource::QueryParam => "query_param",
        }
    }
}

/// A bearer token and the place it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBearer {
    pub token: String,
    pub source: BearerSource,
}

/// Strip an optional `Bearer ` scheme (case-insensitive) from a value.
///
/// A bare token without a scheme is accepted; any other scheme is not.
pub fn parse_bearer(value: &str) -> Option<&str> {
    let value = value.trim();
    // A scheme whose value was stripped away is not a token.
    if value.is_empty() || value.eq_ignore_ascii_case("bearer") {
        return None;
    }

    match value.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => {
            let token = rest.trim();
            (!token.is_empty()).then_some(token)
        }
        Some(_) => None,
        None => Some(value),
    }
}

/// Find the bearer token in the header, the proxy header, then the query string.
///
/// A source holding something that is not a bearer token (e.g. `Basic ...`)
/// is skipped rather than ending the search.
pub fn find_bearer(headers: &HeaderMap, query: Option<&str>) -> Option<RawBearer> {
    let from_header = |name: &str, source: BearerSource| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_bearer)
            .map(|token| RawBearer {
                token: token.to_string(),
                source,
            })
    };

    from_header(header::AUTHORIZATION.as_str(), BearerSource::Header)
        .or_else(|| from_header(PROXY_AUTHORIZATION_HEADER, BearerSource::ProxyHeader))
        .or_else(|| {
            let query = query?;
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == AUTHORIZATION_QUERY_PARAM)
                .and_then(|(_, value)| parse_bearer(&value).map(str::to_string))
                .map(|token| RawBearer {
                    token,
                    source: BearerSource::QueryParam,
                })
        })
}
