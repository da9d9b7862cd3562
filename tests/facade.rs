//! Behavioral properties of the request facade.

use axum::body::Body;
use axum::http::{Method, Request, Version};
use http_body_util::BodyExt;
use request_meter::net::ConnectionInfo;
use request_meter::RequestFacade;

mod common;

use common::Tracker;

fn facade(builder: axum::http::request::Builder, body: Body) -> RequestFacade {
    RequestFacade::new(builder.body(body).unwrap())
}

async fn drain(facade: &mut RequestFacade) -> usize {
    let mut total = 0;
    while let Some(chunk) = facade.read_chunk().await {
        total += chunk.unwrap().len();
    }
    total
}

#[test]
fn host_header_synthesized_from_authority() {
    let f = facade(
        Request::builder()
            .uri("https://shop.example.com/cart")
            .version(Version::HTTP_2),
        Body::empty(),
    );
    assert_eq!(f.headers().get("host"), Some("shop.example.com"));
}

#[tokio::test]
async fn metadata_size_survives_mutation() {
    let mut f = facade(
        Request::builder()
            .method("GET")
            .uri("/a?b=c")
            .header("Host", "example.com"),
        Body::from("body"),
    );
    let arrived = f.metadata_size();

    f.set_method(Method::DELETE);
    f.set_path("/a/much/longer/path/than/before");
    f.set_query("x=1&y=2&z=3");
    f.set_host("another-host.example.org");
    assert_eq!(f.metadata_size(), arrived);
    assert_eq!(f.size(), arrived);

    drain(&mut f).await;
    assert_eq!(f.metadata_size(), arrived);
    assert_eq!(f.size(), arrived + 4);
}

#[tokio::test]
async fn size_grows_with_body_reads() {
    let tracker = Tracker::default();
    let mut f = facade(
        Request::builder().method("POST").uri("/upload"),
        tracker.body(&["abc", "defg", "hi"]),
    );
    let meta = f.metadata_size();
    assert_eq!(f.size(), meta);

    let first = f.read_chunk().await.unwrap().unwrap();
    assert_eq!(first, "abc");
    assert_eq!(f.size(), meta + 3);

    assert_eq!(drain(&mut f).await, 6);
    assert_eq!(f.size(), meta + 9);
}

#[test]
fn scheme_resolution_order() {
    let explicit = facade(
        Request::builder()
            .uri("https://a.example/")
            .header("X-Forwarded-Proto", "http"),
        Body::empty(),
    );
    assert_eq!(explicit.scheme(), "https");

    let forwarded = facade(
        Request::builder().uri("/").header("X-Forwarded-Proto", "https"),
        Body::empty(),
    );
    assert_eq!(forwarded.scheme(), "https");

    let mut tls = Request::builder().uri("/").body(Body::empty()).unwrap();
    tls.extensions_mut()
        .insert(ConnectionInfo::tls("192.0.2.10:443".parse().unwrap()));
    assert_eq!(RequestFacade::new(tls).scheme(), "https");

    let empty_forwarded = facade(
        Request::builder().uri("/").header("X-Forwarded-Proto", ""),
        Body::empty(),
    );
    assert_eq!(empty_forwarded.scheme(), "http");

    let plain = facade(Request::builder().uri("/"), Body::empty());
    assert_eq!(plain.scheme(), "http");
}

#[tokio::test]
async fn set_body_releases_previous_once() {
    let original = Tracker::default();
    let replacement = Tracker::default();
    let mut f = facade(
        Request::builder().method("POST").uri("/"),
        original.body(&["first", "second"]),
    );
    let meta = f.metadata_size();

    assert_eq!(f.read_chunk().await.unwrap().unwrap(), "first");
    assert!(f.set_body(replacement.body(&["new"]), true).is_none());
    assert_eq!(original.drops(), 1);

    assert_eq!(drain(&mut f).await, 3);
    // tally covers bytes from both streams
    assert_eq!(f.size(), meta + 5 + 3);

    f.finish();
    assert_eq!(original.drops(), 1);
    assert_eq!(replacement.drops(), 1);
}

#[tokio::test]
async fn set_body_without_close_hands_previous_back() {
    let original = Tracker::default();
    let mut f = facade(Request::builder().uri("/"), original.body(&["kept"]));

    let previous = f.set_body(Body::from("swapped"), false).unwrap();
    assert_eq!(original.drops(), 0);

    let bytes = previous.collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"kept");
    // reads outside the facade are not metered
    assert_eq!(f.body_bytes_read(), 0);
}

#[test]
fn finish_without_reads_does_not_drain() {
    let tracker = Tracker::default();
    let mut f = facade(
        Request::builder().method("POST").uri("/"),
        tracker.body(&["never", "read"]),
    );
    let before = f.size();

    f.finish();
    f.finish();
    assert!(f.is_finished());
    assert_eq!(tracker.polls(), 0);
    assert_eq!(tracker.drops(), 1);
    assert_eq!(f.size(), before);
}

#[tokio::test]
async fn read_after_finish_fails() {
    let mut f = facade(Request::builder().uri("/"), Body::from("data"));
    f.finish();
    assert!(f.read_chunk().await.unwrap().is_err());
    assert_eq!(f.body_bytes_read(), 0);
}

#[tokio::test]
async fn size_is_idempotent_between_reads() {
    let mut f = facade(Request::builder().uri("/"), Body::from("xyz"));
    assert_eq!(f.size(), f.size());

    drain(&mut f).await;
    let after = f.size();
    assert_eq!(f.size(), after);
    assert_eq!(f.meter().size(), after);
}

#[tokio::test]
async fn meter_outlives_forwarded_request() {
    let mut f = facade(
        Request::builder().method("POST").uri("/in").header("Host", "edge"),
        Body::from("forwarded-body"),
    );
    f.set_path("/out");
    let meter = f.meter();

    let request = f.into_forward_request().unwrap();
    assert_eq!(request.uri(), "/out");
    assert_eq!(meter.body_bytes(), 0);

    let body = request.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(meter.body_bytes(), body.len() as u64);
    assert_eq!(meter.size(), meter.metadata_size() + 14);
}
