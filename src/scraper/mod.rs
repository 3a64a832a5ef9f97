//! 웹 스크래퍼 모듈 - 페이지 로드 및 텍스트 추출
//!
//! Fetcher(HTTP GET)와 Cleaner(HTML 태그 제거)를 제공합니다.
//! Cleaner는 구조를 보존하지 않는 순수 텍스트 추출이며,
//! 잘못된 HTML에도 실패하지 않습니다 (best-effort).

use std::time::Duration;

use scraper::Html;
use thiserror::Error;

/// 페이지 로드 타임아웃
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// FetchError
// ============================================================================

/// 페이지 로드 실패
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP 클라이언트 생성 실패
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// 네트워크 오류 (타임아웃 포함)
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// 비정상 HTTP 상태 코드
    #[error("unexpected status {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

// ============================================================================
// PageFetcher
// ============================================================================

/// 웹 페이지 Fetcher
pub struct PageFetcher {
    client: reqwest::Client,
}

impl PageFetcher {
    /// 기본 타임아웃(10초)으로 생성
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    /// 타임아웃을 지정하여 생성
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("webqa-rag/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client })
    }

    /// URL에서 응답 본문을 텍스트로 가져오기
    ///
    /// 선언된 Content-Type과 무관하게 본문 텍스트를 반환합니다.
    /// 네트워크 오류 또는 비정상 상태 코드는 `FetchError`로 실패합니다.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        tracing::info!("Fetching: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.text().await.map_err(|e| FetchError::Request {
            url: url.to_string(),
            source: e,
        })
    }
}

// ============================================================================
// Content Cleaner
// ============================================================================

/// 텍스트 추출에서 제외할 태그
const SKIPPED_TAGS: [&str; 5] = ["script", "style", "noscript", "head", "template"];

/// HTML에서 보이는 텍스트만 추출
///
/// 스크립트/스타일/head 서브트리는 제외하고, 연속 공백은 하나로 정리합니다.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let mut text = String::new();
    for node in root.descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };

        // 제외 대상 태그 아래의 텍스트인지 확인
        let skipped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|element| SKIPPED_TAGS.contains(&element.name()))
                .unwrap_or(false)
        });
        if skipped {
            continue;
        }

        let trimmed = fragment.trim();
        if !trimmed.is_empty() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(trimmed);
        }
    }

    // 연속 공백 정리
    if let Ok(re) = regex::Regex::new(r"\s+") {
        re.replace_all(&text, " ").trim().to_string()
    } else {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// 페이지 제목 추출 (`<title>`, 없으면 `<h1>`)
///
/// CLI 표시용 부가 정보입니다. 본문 추출과는 무관합니다.
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    for selector_str in ["title", "h1"] {
        if let Ok(selector) = scraper::Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                let title = element.text().collect::<String>().trim().to_string();
                if !title.is_empty() {
                    return Some(title);
                }
            }
        }
    }

    None
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const SAMPLE_PAGE: &str =
        "<html><body><p>Cats are mammals.</p><p>Dogs are mammals too.</p></body></html>";

    #[test]
    fn test_extract_text_paragraphs() {
        let text = extract_text(SAMPLE_PAGE);
        assert_eq!(text, "Cats are mammals. Dogs are mammals too.");
    }

    #[test]
    fn test_extract_text_skips_scripts_and_styles() {
        let html = r#"
            <html>
                <head>
                    <title>Ignored</title>
                    <style>body { color: red; }</style>
                </head>
                <body>
                    <script>var secret = "hidden";</script>
                    <p>Visible text.</p>
                </body>
            </html>
        "#;
        let text = extract_text(html);
        assert_eq!(text, "Visible text.");
        assert!(!text.contains("secret"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn test_extract_text_malformed_html() {
        // 닫히지 않은 태그에도 패닉 없이 best-effort 추출
        let text = extract_text("<html><body><p>Broken <b>markup");
        assert!(text.contains("Broken"));
        assert!(text.contains("markup"));
    }

    #[test]
    fn test_extract_text_empty() {
        assert_eq!(extract_text(""), "");
    }

    #[test]
    fn test_extract_title() {
        let html = r#"
            <html>
                <head><title>Test Page Title</title></head>
                <body><h1>Main Heading</h1></body>
            </html>
        "#;
        assert_eq!(extract_title(html), Some("Test Page Title".to_string()));
    }

    #[test]
    fn test_extract_title_h1_fallback() {
        let html = r#"
            <html>
                <head><title></title></head>
                <body><h1>H1 Heading</h1></body>
            </html>
        "#;
        assert_eq!(extract_title(html), Some("H1 Heading".to_string()));
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/page");
                then.status(200)
                    .header("content-type", "text/html")
                    .body(SAMPLE_PAGE);
            })
            .await;

        let fetcher = PageFetcher::new().expect("fetcher creation failed");
        let body = fetcher
            .fetch(&server.url("/page"))
            .await
            .expect("fetch should succeed");

        mock.assert_async().await;
        assert_eq!(body, SAMPLE_PAGE);
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing");
                then.status(404);
            })
            .await;

        let fetcher = PageFetcher::new().expect("fetcher creation failed");
        let result = fetcher.fetch(&server.url("/missing")).await;

        match result {
            Err(FetchError::Status { status, .. }) => {
                assert_eq!(status, reqwest::StatusCode::NOT_FOUND)
            }
            other => panic!("expected status error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/slow");
                then.status(200)
                    .body("late")
                    .delay(Duration::from_millis(800));
            })
            .await;

        let fetcher =
            PageFetcher::with_timeout(Duration::from_millis(100)).expect("fetcher creation failed");
        let result = fetcher.fetch(&server.url("/slow")).await;

        assert!(matches!(result, Err(FetchError::Request { .. })));
    }

    #[tokio::test]
    async fn test_fetch_unreachable() {
        // 아무도 listen하지 않는 포트
        let fetcher = PageFetcher::new().expect("fetcher creation failed");
        let result = fetcher.fetch("http://127.0.0.1:1/nope").await;
        assert!(matches!(result, Err(FetchError::Request { .. })));
    }
}
