use std::time::Duration;

use crawl_engine::{FailureKind, FetchSettings, PageFetcher, ReqwestFetcher, RetryPolicy};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings_with_retries(retries: u32) -> FetchSettings {
    FetchSettings {
        retry: RetryPolicy {
            retries,
            backoff_base: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_millis(50),
        },
        ..FetchSettings::default()
    }
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |reqs| reqs.len())
}

#[tokio::test]
async fn fetcher_returns_decoded_page_with_pooled_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html>ok</html>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        user_agents: vec!["test-agent/1.0".to_string()],
        ..settings_with_retries(0)
    };
    let fetcher = ReqwestFetcher::new(settings).expect("client");
    let url = format!("{}/doc", server.uri());

    let page = fetcher.fetch(&url).await.expect("fetch ok");
    assert_eq!(page.url, url);
    assert_eq!(page.final_url, url);
    assert_eq!(page.bytes, b"<html>ok</html>");
    assert_eq!(page.html, "<html>ok</html>");
    assert_eq!(page.encoding, "UTF-8");
    assert_eq!(page.attempts, 1);

    let requests = server.received_requests().await.expect("recording on");
    let agent = requests[0]
        .headers
        .get("user-agent")
        .and_then(|value| value.to_str().ok());
    assert_eq!(agent, Some("test-agent/1.0"));
}

#[tokio::test]
async fn declared_charset_is_not_trusted() {
    let server = MockServer::start().await;
    let body = "<html><body><h1>国产精品 视频标题</h1></body></html>";
    Mock::given(method("GET"))
        .and(path("/mislabelled"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(body.as_bytes().to_vec(), "text/html; charset=ISO-8859-1"),
        )
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(settings_with_retries(0)).expect("client");
    let page = fetcher
        .fetch(&format!("{}/mislabelled", server.uri()))
        .await
        .expect("fetch ok");

    assert_eq!(page.html, body);
    assert_eq!(page.encoding, "UTF-8");
}

#[tokio::test]
async fn transient_status_is_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>finally</p>"))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(settings_with_retries(3)).expect("client");
    let page = fetcher
        .fetch(&format!("{}/flaky", server.uri()))
        .await
        .expect("fetch ok after retries");

    assert_eq!(page.html, "<p>finally</p>");
    assert_eq!(page.attempts, 3);
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn exhausted_retries_surface_the_last_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(settings_with_retries(2)).expect("client");
    let err = fetcher
        .fetch(&format!("{}/down", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::HttpStatus(500));
    assert_eq!(err.attempts, 3);
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(settings_with_retries(3)).expect("client");
    let err = fetcher
        .fetch(&format!("{}/missing", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::HttpStatus(404));
    assert_eq!(err.attempts, 1);
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn timeouts_are_retried_then_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_string("slow"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..settings_with_retries(1)
    };
    let fetcher = ReqwestFetcher::new(settings).expect("client");
    let err = fetcher
        .fetch(&format!("{}/slow", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::Timeout);
    assert_eq!(err.attempts, 2);
}

#[tokio::test]
async fn fetcher_rejects_too_large_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/html")
                .set_body_string("01234567890"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        max_bytes: 10,
        ..settings_with_retries(3)
    };
    let fetcher = ReqwestFetcher::new(settings).expect("client");
    let err = fetcher
        .fetch(&format!("{}/large", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 10,
            actual: Some(11)
        }
    );
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn invalid_url_fails_without_request() {
    let fetcher = ReqwestFetcher::new(settings_with_retries(3)).expect("client");
    let err = fetcher.fetch("not a url").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}
