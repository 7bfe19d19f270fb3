use axum::http::HeaderMap;
use quillcore_rpc::CookieSource;

/// Parses the `Cookie` request header into queryable name→value pairs
/// (spec.md §4.3a). Built once per connection/request from whatever the
/// transport received at upgrade/request time — never refreshed mid-call,
/// matching the spec's "connection's current value" wording (a value that
/// can only change by reconnecting).
pub struct HeaderCookies {
    header: Option<String>,
}

impl HeaderCookies {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = headers
            .get(axum::http::header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Self { header }
    }
}

impl CookieSource for HeaderCookies {
    fn cookie(&self, name: &str) -> Option<String> {
        let header = self.header.as_deref()?;
        header.split(';').find_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            (k.trim() == name).then(|| v.trim().to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn finds_a_cookie_by_name_among_several() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::COOKIE, "a=1; session=abc123; b=2".parse().expect("valid header value"));
        let cookies = HeaderCookies::from_headers(&headers);
        assert_eq!(cookies.cookie("session").as_deref(), Some("abc123"));
        assert_eq!(cookies.cookie("missing"), None);
    }

    #[test]
    fn absent_header_yields_no_cookies() {
        let cookies = HeaderCookies::from_headers(&HeaderMap::new());
        assert_eq!(cookies.cookie("anything"), None);
    }
}
