use std::time::Duration;

use sorter_engine::{FailureKind, FetchSettings, ImageFetcher, ReqwestImageFetcher};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher_for(server: &MockServer, settings: FetchSettings) -> ReqwestImageFetcher {
    ReqwestImageFetcher::new(FetchSettings {
        base_url: format!("{}/uploads/", server.uri()),
        ..settings
    })
}

#[tokio::test]
async fn fetcher_returns_image_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uploads/shop/boots/1.png"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(vec![0x89, b'P', b'N', b'G'], "image/png"),
        )
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server, FetchSettings::default());
    let image = fetcher.fetch("shop/boots/1.png").await.expect("fetch ok");
    assert_eq!(image.url, format!("{}/uploads/shop/boots/1.png", server.uri()));
    assert_eq!(image.content_type.as_deref(), Some("image/png"));
    assert_eq!(&image.bytes[..], &[0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn fetcher_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uploads/shop/missing.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server, FetchSettings::default());
    let err = fetcher.fetch("shop/missing.jpg").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
}

#[tokio::test]
async fn fetcher_rejects_non_image_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uploads/shop/a.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server, FetchSettings::default());
    let err = fetcher.fetch("shop/a.jpg").await.unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::UnsupportedContentType {
            content_type: "text/html".to_string()
        }
    );
}

#[tokio::test]
async fn fetcher_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uploads/shop/slow.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_raw("slow", "image/jpeg"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    };
    let fetcher = fetcher_for(&server, settings);
    let err = fetcher.fetch("shop/slow.jpg").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn fetcher_rejects_too_large_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uploads/shop/large.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("01234567890", "image/jpeg"))
        .mount(&server)
        .await;

    let settings = FetchSettings {
        max_bytes: 10,
        ..FetchSettings::default()
    };
    let fetcher = fetcher_for(&server, settings);
    let err = fetcher.fetch("shop/large.jpg").await.unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 10,
            actual: Some(11)
        }
    );
}
