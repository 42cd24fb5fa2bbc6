use std::time::Duration;

use fast_webdav_rs::{ClientConfig, DavError, DavRequest, FailureCause, RetryPolicy, WebDavClient};
use hyper::Method;
use hyper::header::HeaderValue;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::{base_url, client, client_with};

#[test_log::test(tokio::test)]
async fn redirect_bound_stops_after_max_redirects_plus_one_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dav/loop"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", format!("{}/dav/loop", server.uri())),
        )
        .expect(3)
        .mount(&server)
        .await;

    // Several attempts allowed, but an exhausted redirect bound is never retried.
    let client = client(&server, 3, 2);
    let err = client.download("loop").await.unwrap_err();

    let failure = err.operation().expect("operation failure");
    assert_eq!(failure.cause, FailureCause::OperationFailed);
    assert_eq!(failure.status, 302);
    assert_eq!(failure.path, "loop");
}

#[test_log::test(tokio::test)]
async fn zero_redirect_budget_reports_the_first_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dav/a"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/dav/b"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 1, 0).download("a").await.unwrap_err();
    assert_eq!(err.status(), Some(301));
}

#[test_log::test(tokio::test)]
async fn follows_same_origin_redirects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dav/old.txt"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/dav/mid.txt"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dav/mid.txt"))
        .respond_with(
            ResponseTemplate::new(307)
                .insert_header("Location", format!("{}/dav/new%20name.txt", server.uri())),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dav/new%20name.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"moved".as_slice()))
        .expect(1)
        .mount(&server)
        .await;

    let body = client(&server, 1, 2).download("old.txt").await.unwrap();
    assert_eq!(&body[..], b"moved");
}

#[test_log::test(tokio::test)]
async fn cross_origin_redirect_is_refused() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dav/file"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "https://elsewhere.example.com/dav/file"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 3, 5).download("file").await.unwrap_err();
    let failure = err.operation().expect("operation failure");
    assert_eq!(failure.cause, FailureCause::RedirectOriginChange);
    assert_eq!(failure.status, 302);
    assert!(err.to_string().starts_with("redirect origin change"));
}

#[test_log::test(tokio::test)]
async fn redirect_to_another_port_is_refused() {
    let server = MockServer::start().await;
    let address = server.address();
    let other_port = address.port().wrapping_add(1);
    Mock::given(method("GET"))
        .and(path("/dav/file"))
        .respond_with(ResponseTemplate::new(307).insert_header(
            "Location",
            format!("http://{}:{other_port}/dav/file", address.ip()),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 3, 5).download("file").await.unwrap_err();
    let failure = err.operation().expect("operation failure");
    assert_eq!(failure.cause, FailureCause::RedirectOriginChange);
    assert_eq!(failure.status, 307);
}

#[test_log::test(tokio::test)]
async fn redirect_without_location_is_refused() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/dav/file"))
        .respond_with(ResponseTemplate::new(303))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 3, 5).delete("file").await.unwrap_err();
    let failure = err.operation().expect("operation failure");
    assert_eq!(failure.cause, FailureCause::RedirectWithoutLocation);
    assert_eq!(failure.method, Method::DELETE);
    assert!(err.to_string().starts_with("redirect with no location"));
}

#[test_log::test(tokio::test)]
async fn unexpected_status_uses_every_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dav/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server, 3, 5).download("flaky").await.unwrap_err();
    let failure = err.operation().expect("operation failure");
    assert_eq!(failure.cause, FailureCause::OperationFailed);
    assert_eq!(failure.status, 500);
    assert!(failure.expected.contains(&200));
}

#[test_log::test(tokio::test)]
async fn retry_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dav/eventually"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dav/eventually"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".as_slice()))
        .expect(1)
        .mount(&server)
        .await;

    let body = client(&server, 5, 0).download("eventually").await.unwrap();
    assert_eq!(&body[..], b"ok");
}

#[test_log::test(tokio::test)]
async fn timeouts_are_retried_and_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dav/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .expect(2)
        .mount(&server)
        .await;

    let config = ClientConfig {
        timeout: Duration::from_millis(100),
        retry: RetryPolicy::immediate(2, 0),
        ..ClientConfig::default()
    };
    let client = WebDavClient::with_config(&base_url(&server), None, None, config).unwrap();
    let err = client.download("slow").await.unwrap_err();
    assert!(matches!(err, DavError::Timeout { .. }), "{err}");
}

#[test_log::test(tokio::test)]
async fn basic_auth_is_sent_to_the_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dav/private"))
        .and(header("Authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"secret".as_slice()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, 1, 0, Some(("user", "pass")));
    assert_eq!(&client.download("private").await.unwrap()[..], b"secret");
}

#[test_log::test(tokio::test)]
async fn auth_survives_same_origin_redirects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dav/a"))
        .and(header("Authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/dav/b"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dav/b"))
        .and(header("Authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"b".as_slice()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, 1, 1, Some(("user", "pass")));
    assert_eq!(&client.download("a").await.unwrap()[..], b"b");
}

#[test_log::test(tokio::test)]
async fn configured_user_agent_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dav/ua"))
        .and(header("User-Agent", "probe/1.0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig {
        retry: RetryPolicy::immediate(1, 0),
        user_agent: Some("probe/1.0".into()),
        ..ClientConfig::default()
    };
    let client = WebDavClient::with_config(&base_url(&server), None, None, config).unwrap();
    client.download("ua").await.unwrap();
}

#[test_log::test(tokio::test)]
async fn send_runs_arbitrary_verbs_against_their_contract() {
    let server = MockServer::start().await;
    Mock::given(method("OPTIONS"))
        .and(path("/dav/"))
        .and(header("x-probe", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("DAV", "1, 2")
                .insert_header("ETag", "\"v1\""),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, 1, 0);
    let resp = client
        .send(
            DavRequest::new(Method::OPTIONS, "", &[200])
                .header("x-probe", HeaderValue::from_static("1")),
        )
        .await
        .unwrap();
    assert_eq!(resp.headers()["DAV"], "1, 2");
    assert_eq!(
        WebDavClient::etag_from_headers(resp.headers()).as_deref(),
        Some("\"v1\"")
    );
}
