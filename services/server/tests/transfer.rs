//! End-to-end transfer tests: pairing in both arrival orders, chunked
//! uploads, and multicast delivery.

use std::time::Duration;

async fn make_server() -> std::net::SocketAddr {
    let state = server::AppState::new();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, server::build_router(state))
            .await
            .unwrap();
    });
    addr
}

#[tokio::test]
async fn receiver_first_single_pair() {
    let addr = make_server().await;
    let receiver = tokio::spawn(async move {
        reqwest::get(format!("http://{addr}/mydataid"))
            .await
            .unwrap()
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let sender = reqwest::Client::new()
        .post(format!("http://{addr}/mydataid"))
        .body("this is a content")
        .send()
        .await
        .unwrap();
    assert_eq!(sender.status(), 200);
    assert_eq!(
        sender
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );

    let response = receiver.await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers().get("content-length").unwrap(), "17");
    assert!(response.headers().get("content-type").is_none());
    assert_eq!(response.headers().get("x-robots-tag").unwrap(), "none");
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
    assert_eq!(response.text().await.unwrap(), "this is a content");
}

#[tokio::test]
async fn sender_first_with_a_chunked_body() {
    let addr = make_server().await;
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<bytes::Bytes, std::convert::Infallible>>(2);
    let body = reqwest::Body::wrap_stream(tokio_stream::wrappers::ReceiverStream::new(rx));
    let sender = tokio::spawn(async move {
        reqwest::Client::new()
            .post(format!("http://{addr}/mydataid"))
            .body(body)
            .send()
            .await
            .unwrap()
    });

    tx.send(Ok(bytes::Bytes::from_static(b"this is")))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let receiver = tokio::spawn(async move {
        reqwest::get(format!("http://{addr}/mydataid"))
            .await
            .unwrap()
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(Ok(bytes::Bytes::from_static(b" a content")))
        .await
        .unwrap();
    drop(tx);

    let response = receiver.await.unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.headers().get("content-length").is_none());
    assert_eq!(response.text().await.unwrap(), "this is a content");
    assert_eq!(sender.await.unwrap().status(), 200);
}

#[tokio::test]
async fn put_works_like_post_for_sending() {
    let addr = make_server().await;
    let receiver =
        tokio::spawn(
            async move { reqwest::get(format!("http://{addr}/put-id")).await.unwrap() },
        );
    tokio::time::sleep(Duration::from_millis(100)).await;

    let sender = reqwest::Client::new()
        .put(format!("http://{addr}/put-id"))
        .body("via put")
        .send()
        .await
        .unwrap();
    assert_eq!(sender.status(), 200);
    assert_eq!(receiver.await.unwrap().text().await.unwrap(), "via put");
}

#[tokio::test]
async fn three_receivers_each_get_the_full_body() {
    let addr = make_server().await;
    let mut receivers = Vec::new();
    for _ in 0..3 {
        let url = format!("http://{addr}/id?n=3");
        receivers.push(tokio::spawn(async move {
            let response = reqwest::get(url).await.unwrap();
            assert_eq!(response.status(), 200);
            assert_eq!(response.headers().get("content-length").unwrap(), "17");
            response.text().await.unwrap()
        }));
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let sender = reqwest::Client::new()
        .post(format!("http://{addr}/id?n=3"))
        .body("this is a content")
        .send()
        .await
        .unwrap();
    assert_eq!(sender.status(), 200);
    for receiver in receivers {
        assert_eq!(receiver.await.unwrap(), "this is a content");
    }
}

#[tokio::test]
async fn head_on_a_relay_path_reports_headers_without_a_body() {
    let addr = make_server().await;
    let head = tokio::spawn(async move {
        reqwest::Client::new()
            .head(format!("http://{addr}/peek"))
            .send()
            .await
            .unwrap()
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let sender = reqwest::Client::new()
        .post(format!("http://{addr}/peek"))
        .body("this is a content")
        .send()
        .await
        .unwrap();
    assert_eq!(sender.status(), 200);

    let response = head.await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers().get("content-length").unwrap(), "17");
    assert_eq!(response.text().await.unwrap(), "");
}
