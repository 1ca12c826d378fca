//! Netscape `cookies.txt` loading
//!
//! Each non-comment line holds seven tab-separated fields:
//! domain, include-subdomains flag, path, secure flag, expiry, name, value.
//! Lines prefixed with `#HttpOnly_` are regular cookies with the HttpOnly
//! attribute. Expiry is ignored so stale session cookies are still sent.

use reqwest::cookie::Jar;
use std::path::Path;
use std::sync::Arc;
use url::Url;

const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// One cookie line from a Netscape cookie file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetscapeCookie {
    pub domain: String,
    pub include_subdomains: bool,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub name: String,
    pub value: String,
}

impl NetscapeCookie {
    /// Host the cookie belongs to, without the leading dot
    pub fn host(&self) -> &str {
        self.domain.trim_start_matches('.')
    }

    /// URL the cookie is registered against in the jar
    pub fn origin_url(&self) -> Option<Url> {
        let scheme = if self.secure { "https" } else { "http" };
        Url::parse(&format!("{}://{}{}", scheme, self.host(), self.path)).ok()
    }

    /// Renders the cookie as a `Set-Cookie` header value
    pub fn to_set_cookie(&self) -> String {
        let mut header = format!("{}={}; Path={}", self.name, self.value, self.path);
        if self.include_subdomains {
            header.push_str("; Domain=");
            header.push_str(self.host());
        }
        if self.secure {
            header.push_str("; Secure");
        }
        if self.http_only {
            header.push_str("; HttpOnly");
        }
        header
    }
}

/// Parses the content of a Netscape cookie file
///
/// Returns the parsed cookies together with the 1-based line numbers that
/// could not be parsed.
pub fn parse_netscape_cookies(content: &str) -> (Vec<NetscapeCookie>, Vec<usize>) {
    let mut cookies = Vec::new();
    let mut rejected = Vec::new();

    for (number, raw) in content.lines().enumerate() {
        let line = raw.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }

        let (line, http_only) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => (rest, true),
            None if line.starts_with('#') => continue,
            None => (line, false),
        };

        match parse_line(line, http_only) {
            Some(cookie) => cookies.push(cookie),
            None => rejected.push(number + 1),
        }
    }

    (cookies, rejected)
}

fn parse_line(line: &str, http_only: bool) -> Option<NetscapeCookie> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 7 {
        return None;
    }

    let domain = fields[0].trim();
    let name = fields[5].trim();
    if domain.is_empty() || name.is_empty() {
        return None;
    }

    let path = match fields[2].trim() {
        "" => "/",
        p => p,
    };

    Some(NetscapeCookie {
        domain: domain.to_string(),
        include_subdomains: fields[1].eq_ignore_ascii_case("TRUE"),
        path: path.to_string(),
        secure: fields[3].eq_ignore_ascii_case("TRUE"),
        http_only,
        name: name.to_string(),
        value: fields[6].to_string(),
    })
}

/// Loads a cookie file into a jar for the HTTP client
///
/// Returns `None` when the file cannot be read or holds no usable cookies.
pub fn load_cookie_jar(path: &Path) -> Option<Arc<Jar>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("Could not read cookie file {}: {}", path.display(), e);
            return None;
        }
    };

    let (cookies, rejected) = parse_netscape_cookies(&content);
    for line in &rejected {
        tracing::warn!("Skipping malformed cookie at {}:{}", path.display(), line);
    }

    let jar = Jar::default();
    let mut loaded = 0usize;
    for cookie in &cookies {
        match cookie.origin_url() {
            Some(url) => {
                jar.add_cookie_str(&cookie.to_set_cookie(), &url);
                loaded += 1;
            }
            None => tracing::warn!(
                "Skipping cookie {} with unusable domain {}",
                cookie.name,
                cookie.domain
            ),
        }
    }

    if loaded == 0 {
        tracing::warn!("No cookies loaded from {}", path.display());
        return None;
    }

    tracing::info!("Loaded {} cookie(s) from {}", loaded, path.display());
    Some(Arc::new(jar))
}
