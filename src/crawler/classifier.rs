//! Response classification
//!
//! Turns a completed HTTP exchange into an [`ItemState`] outcome, and a
//! successful page body into the key/value data stored with the result.

use crate::crawler::fetcher::FetchedPage;
use crate::pacing::parse_retry_after;
use crate::state::{ItemResult, ItemState, ResultData};
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::OnceLock;

/// Lowercase markers whose presence in a 200 body means a captcha wall
pub const CAPTCHA_MARKERS: [&str; 2] = ["captcha", "капча"];

/// A digit group of at least three characters followed by a rouble sign or letter
const PRICE_PATTERN: &str = r"(\d[\d\s]{2,}\s?[₽Рр])";

/// Extracts structured fields from a page body
///
/// Implementations must not fail; fields they cannot find are left out or
/// set to `null`.
pub trait PageClassifier {
    fn classify(&self, body: &str) -> ResultData;
}

impl<F> PageClassifier for F
where
    F: Fn(&str) -> ResultData,
{
    fn classify(&self, body: &str) -> ResultData {
        self(body)
    }
}

/// Default classifier: page title and the first price-looking text
#[derive(Debug, Clone, Copy, Default)]
pub struct ListingClassifier;

impl PageClassifier for ListingClassifier {
    fn classify(&self, body: &str) -> ResultData {
        let document = Html::parse_document(body);

        let mut data = ResultData::new();
        data.insert(
            "title".to_string(),
            extract_title(&document).map_or(Value::Null, Value::String),
        );
        data.insert(
            "found_price_text".to_string(),
            find_price_text(body).map_or(Value::Null, Value::String),
        );
        data
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn price_regex() -> &'static Regex {
    static PRICE: OnceLock<Regex> = OnceLock::new();
    PRICE.get_or_init(|| Regex::new(PRICE_PATTERN).expect("price pattern compiles"))
}

/// Returns the first price-looking fragment of `text`
pub fn find_price_text(text: &str) -> Option<String> {
    price_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Returns true if the body looks like a captcha challenge
pub fn has_captcha(body: &str) -> bool {
    let lowered = body.to_lowercase();
    CAPTCHA_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// Classified outcome of one fetch attempt
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub state: ItemState,
    pub http_status: Option<u16>,
    /// Server-requested wait in seconds, only kept for rate limiting
    pub retry_after: Option<u64>,
    pub data: ResultData,
    pub note: String,
}

impl Verdict {
    /// Verdict for a transport failure
    pub fn network_error(message: impl Into<String>) -> Self {
        Self {
            state: ItemState::NetworkError,
            http_status: None,
            retry_after: None,
            data: ResultData::new(),
            note: message.into(),
        }
    }

    /// Turns the verdict into the result recorded for `idx`
    pub fn into_result(self, idx: i64, query: impl Into<String>) -> ItemResult {
        if self.state == ItemState::Succeeded {
            ItemResult::success(idx, query, self.data)
        } else {
            ItemResult::failure(idx, query, self.http_status, self.note)
        }
    }
}

/// Classifies a completed response
///
/// | Status    | Outcome                                       |
/// |-----------|-----------------------------------------------|
/// | 200       | `CaptchaBlocked` if a marker is present, else `Succeeded` |
/// | 401, 403  | `AccessDenied`                                |
/// | 429, 503  | `RateLimited`, honouring `Retry-After`        |
/// | other     | `HttpError`                                   |
pub fn classify_response<C: PageClassifier + ?Sized>(
    page: &FetchedPage,
    classifier: &C,
) -> Verdict {
    let mut retry_after = None;
    let mut data = ResultData::new();

    let state = match page.status {
        200 if has_captcha(&page.body) => ItemState::CaptchaBlocked,
        200 => {
            data = classifier.classify(&page.body);
            ItemState::Succeeded
        }
        401 | 403 => ItemState::AccessDenied,
        429 | 503 => {
            retry_after = parse_retry_after(&page.headers);
            ItemState::RateLimited
        }
        _ => ItemState::HttpError,
    };

    Verdict {
        state,
        http_status: Some(page.status),
        retry_after,
        data,
        note: state.note().unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    fn page(status: u16, body: &str) -> FetchedPage {
        FetchedPage {
            status,
            body: body.to_string(),
            headers: HeaderMap::new(),
        }
    }

    #[test]
    fn test_captcha_on_200_is_blocked() {
        let response = page(200, "<p>Please solve the CAPTCHA</p>");
        let verdict = classify_response(&response, &ListingClassifier);
        assert_eq!(verdict.state, ItemState::CaptchaBlocked);
        assert_eq!(verdict.note, "captcha");
        assert_eq!(verdict.http_status, Some(200));
        assert_eq!(verdict.retry_after, None);
    }

    #[test]
    fn test_cyrillic_captcha_marker() {
        assert!(has_captcha("Введите КАПЧА ниже"));
        assert!(!has_captcha("<title>Кроссовки</title>"));
    }

    #[test]
    fn test_access_statuses() {
        for status in [401, 403] {
            let verdict = classify_response(&page(status, ""), &ListingClassifier);
            assert_eq!(verdict.state, ItemState::AccessDenied);
            assert_eq!(verdict.note, "access");
        }
    }

    #[test]
    fn test_rate_limit_honours_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("5"));
        let response = FetchedPage {
            status: 429,
            body: String::new(),
            headers,
        };

        let verdict = classify_response(&response, &ListingClassifier);
        assert_eq!(verdict.state, ItemState::RateLimited);
        assert_eq!(verdict.retry_after, Some(5));
        assert_eq!(verdict.note, "rate");
    }

    #[test]
    fn test_503_without_retry_after() {
        let verdict = classify_response(&page(503, "busy"), &ListingClassifier);
        assert_eq!(verdict.state, ItemState::RateLimited);
        assert_eq!(verdict.retry_after, None);
    }

    #[test]
    fn test_other_status_is_http_error() {
        let verdict = classify_response(&page(404, "captcha"), &ListingClassifier);
        assert_eq!(verdict.state, ItemState::HttpError);
        assert_eq!(verdict.note, "http");
        assert_eq!(verdict.http_status, Some(404));
    }

    #[test]
    fn test_success_uses_classifier() {
        let verdict = classify_response(&page(200, "anything"), &|_: &str| {
            let mut data = ResultData::new();
            data.insert("seen".to_string(), Value::Bool(true));
            data
        });
        assert_eq!(verdict.state, ItemState::Succeeded);
        assert_eq!(verdict.data.get("seen"), Some(&Value::Bool(true)));

        let result = verdict.into_result(3, "Nike Air");
        assert!(result.ok);
        assert_eq!(result.http_status, Some(200));
        assert_eq!(result.note, "");
    }

    #[test]
    fn test_failure_result_has_no_data() {
        let result = classify_response(&page(403, ""), &ListingClassifier).into_result(1, "q");
        assert!(!result.ok);
        assert!(result.data.is_empty());
        assert_eq!(result.http_status, Some(403));
        assert_eq!(result.note, "access");
    }

    #[test]
    fn test_network_error_verdict() {
        let result = Verdict::network_error("connection refused").into_result(2, "q");
        assert!(!result.ok);
        assert_eq!(result.http_status, None);
        assert_eq!(result.note, "connection refused");
    }

    #[test]
    fn test_listing_classifier_fields() {
        let html = "<html><head><title> Nike Air </title></head>\
                    <body><span>Цена: 12 990 ₽</span></body></html>";
        let data = ListingClassifier.classify(html);
        assert_eq!(data["title"], Value::String("Nike Air".to_string()));
        assert_eq!(data["found_price_text"], Value::String("12 990 ₽".to_string()));
    }

    #[test]
    fn test_listing_classifier_missing_fields_are_null() {
        let data = ListingClassifier.classify("<html><body>nothing here</body></html>");
        assert_eq!(data["title"], Value::Null);
        assert_eq!(data["found_price_text"], Value::Null);
    }

    #[test]
    fn test_find_price_text_with_letter_suffix() {
        assert_eq!(find_price_text("всего 4500 р."), Some("4500 р".to_string()));
        assert_eq!(find_price_text("12 шт"), None);
    }
}
