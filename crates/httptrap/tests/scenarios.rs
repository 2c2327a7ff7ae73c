//! End-to-end usage samples: a small worker exercised through the mock.

use std::time::Duration;

use bytes::Bytes;
use http::{Method, StatusCode};
use httptrap::{MockClient, MockHttp};

fn parse_int(body: &Bytes) -> i64 {
    String::from_utf8_lossy(body).trim().parse().unwrap_or(0)
}

/// Example subject under test: fetches and combines data through whatever
/// client it is handed.
struct Worker {
    client: MockClient,
}

impl Worker {
    fn new(client: MockClient) -> Self {
        Self { client }
    }

    async fn fetch_data(&self) -> i64 {
        let response = self
            .client
            .get("http://some-website.com/some-path")
            .await
            .unwrap();
        assert!(response.status().is_success());
        parse_int(response.body())
    }

    async fn post_data(&self) {
        let response = self
            .client
            .post("http://some-website.com/some-path", "some data")
            .await
            .unwrap();
        assert!(response.status().is_success());
    }

    async fn fetch_parallel_data(&self) -> i64 {
        let (a, b, c) = tokio::join!(
            self.client.get("http://some-website.com/1"),
            self.client.get("http://some-website.com/2"),
            self.client.get("http://some-website.com/3"),
        );
        [a, b, c]
            .into_iter()
            .map(|response| parse_int(response.unwrap().body()))
            .sum()
    }

    async fn fetch_csv(&self, uri: &str) -> Vec<i64> {
        let response = self.client.get(uri).await.unwrap();
        String::from_utf8_lossy(response.body())
            .split(',')
            .filter_map(|part| part.trim().parse().ok())
            .collect()
    }

    /// Three chained calls, each depending on the previous result, with a
    /// little pretend work in between.
    async fn fetch_sequential_data(&self) -> String {
        let items = self.fetch_csv("http://some-website.com/items").await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        let newest_item = items.into_iter().max().unwrap();

        let sub_items = self
            .fetch_csv(&format!(
                "http://some-website.com/items/{newest_item}/subItems"
            ))
            .await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        let newest_sub_item = sub_items.into_iter().max().unwrap();

        let response = self
            .client
            .get(&format!(
                "http://some-website.com/items/{newest_item}/subItems/{newest_sub_item}"
            ))
            .await
            .unwrap();
        String::from_utf8_lossy(response.body()).into_owned()
    }
}

#[tokio::test]
async fn fetch_data() {
    let http = MockHttp::new();
    let worker = Worker::new(http.client());

    // Make the call, but do not await it yet.
    let result = tokio::spawn(async move { worker.fetch_data().await });

    // Expect the request and respond to it.
    let request = http
        .expect("http://some-website.com/some-path")
        .await
        .unwrap();
    request.respond(StatusCode::OK, "123").unwrap();

    assert_eq!(result.await.unwrap(), 123);
    http.ensure_no_outstanding_requests().unwrap();
}

#[tokio::test]
async fn post_data() {
    let http = MockHttp::new();
    let worker = Worker::new(http.client());

    let result = tokio::spawn(async move { worker.post_data().await });

    // Expect the request, validate it, and respond to it.
    let request = http
        .expect_method(Method::POST, "http://some-website.com/some-path")
        .await
        .unwrap();
    assert_eq!(request.body_text(), "some data");
    request.respond_status(StatusCode::OK).unwrap();

    result.await.unwrap();
    http.ensure_no_outstanding_requests().unwrap();
}

#[tokio::test]
async fn fetch_parallel_data() {
    let http = MockHttp::new();
    let worker = Worker::new(http.client());

    let result = tokio::spawn(async move { worker.fetch_parallel_data().await });

    http.expect("http://some-website.com/1")
        .await
        .unwrap()
        .respond_body("1")
        .unwrap();
    http.expect("http://some-website.com/2")
        .await
        .unwrap()
        .respond_body("2")
        .unwrap();
    http.expect("http://some-website.com/3")
        .await
        .unwrap()
        .respond_body("3")
        .unwrap();

    assert_eq!(result.await.unwrap(), 6);
    http.ensure_no_outstanding_requests().unwrap();
}

#[tokio::test]
async fn fetch_sequential_data() {
    let http = MockHttp::new();
    let worker = Worker::new(http.client());

    let result = tokio::spawn(async move { worker.fetch_sequential_data().await });

    // Each expectation briefly waits out the worker's in-between processing.
    http.expect("http://some-website.com/items")
        .await
        .unwrap()
        .respond_body("1,2,3")
        .unwrap();
    http.expect("http://some-website.com/items/3/subItems")
        .await
        .unwrap()
        .respond_body("4,5,6")
        .unwrap();
    http.expect("http://some-website.com/items/3/subItems/6")
        .await
        .unwrap()
        .respond_body("item 3 subitem 6 data")
        .unwrap();

    assert_eq!(result.await.unwrap(), "item 3 subitem 6 data");
    http.ensure_no_outstanding_requests().unwrap();
}
