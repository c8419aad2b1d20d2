use std::io::Cursor;
use std::time::Duration;

use gallery_engine::{decode_image, FailureKind, FetchSettings, Fetcher, ReqwestFetcher};
use image::{ImageFormat, Rgb, RgbImage};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([120, 80, 40]));
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

#[tokio::test]
async fn fetcher_returns_decodable_image() {
    let server = MockServer::start().await;
    let body = png_bytes(6, 4);
    Mock::given(method("GET"))
        .and(path("/400/300"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.clone(), "image/png"))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let url = format!("{}/400/300", server.uri());

    let output = fetcher.fetch(&url).await.expect("fetch ok");
    assert_eq!(output.metadata.original_url, url);
    assert_eq!(output.metadata.final_url, output.metadata.original_url);
    assert_eq!(output.metadata.redirect_count, 0);
    assert_eq!(output.metadata.content_type.as_deref(), Some("image/png"));
    assert_eq!(output.metadata.byte_len, body.len() as u64);
    assert_eq!(output.bytes, body);

    let decoded = decode_image(&output.bytes, output.metadata.content_type.as_deref()).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (6, 4));
}

#[tokio::test]
async fn fetcher_follows_redirects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/random"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/id/7"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/id/7"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(png_bytes(2, 2), "image/png"))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let output = fetcher
        .fetch(&format!("{}/random", server.uri()))
        .await
        .unwrap();
    assert_eq!(output.metadata.final_url, format!("{}/id/7", server.uri()));
    assert_eq!(output.metadata.redirect_count, 1);
}

#[tokio::test]
async fn fetcher_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let url = format!("{}/missing", server.uri());

    let err = fetcher.fetch(&url).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
}

#[tokio::test]
async fn fetcher_rejects_non_image_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html>nope</html>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let err = fetcher
        .fetch(&format!("{}/page", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::UnsupportedContentType {
            content_type: "text/html; charset=utf-8".to_string()
        }
    );
}

#[tokio::test]
async fn fetcher_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_raw(png_bytes(1, 1), "image/png"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings);
    let url = format!("{}/slow", server.uri());

    let err = fetcher.fetch(&url).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn fetcher_rejects_too_large_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 11], "image/png"))
        .mount(&server)
        .await;

    let settings = FetchSettings {
        max_bytes: 10,
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings);
    let url = format!("{}/large", server.uri());

    let err = fetcher.fetch(&url).await.unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 10,
            actual: Some(11)
        }
    );
}

#[tokio::test]
async fn invalid_url_is_reported() {
    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let err = fetcher.fetch("not a url").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}
