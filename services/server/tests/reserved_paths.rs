//! Reserved-path tests: static pages, exact content lengths, HEAD/GET
//! header equality, and write refusal.

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
async fn the_landing_page_names_the_service() {
    let addr = make_server().await;
    let response = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/html; charset=utf-8"
    );
    let declared: usize = response
        .headers()
        .get("content-length")
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    let body = response.text().await.unwrap();
    assert!(body.contains("Piping"));
    assert_eq!(declared, body.len());
}

#[tokio::test]
async fn head_headers_equal_get_headers_on_reserved_paths() {
    let addr = make_server().await;
    let client = reqwest::Client::new();
    for path in ["/", "/noscript", "/version", "/help"] {
        let get = client
            .get(format!("http://{addr}{path}"))
            .send()
            .await
            .unwrap();
        let head = client
            .head(format!("http://{addr}{path}"))
            .send()
            .await
            .unwrap();
        assert_eq!(get.status(), head.status(), "path: {path}");

        let mut get_headers = get.headers().clone();
        let mut head_headers = head.headers().clone();
        get_headers.remove("date");
        head_headers.remove("date");
        assert_eq!(get_headers, head_headers, "path: {path}");
        assert_eq!(head.text().await.unwrap(), "", "path: {path}");
    }
}

#[tokio::test]
async fn the_noscript_form_targets_the_requested_path() {
    let addr = make_server().await;
    let response = reqwest::get(format!("http://{addr}/noscript?path=/mydataid"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/html; charset=utf-8"
    );
    let body = response.text().await.unwrap();
    assert!(body.contains(r#"action="/mydataid""#));
}

#[tokio::test]
async fn the_version_page_reports_the_crate_version() {
    let addr = make_server().await;
    let response = reqwest::get(format!("http://{addr}/version")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers().get("content-type").unwrap(), "text/plain");
    assert_eq!(
        response.text().await.unwrap(),
        concat!(env!("CARGO_PKG_VERSION"), "\n")
    );
}

#[tokio::test]
async fn the_help_page_uses_the_request_host() {
    let addr = make_server().await;
    let response = reqwest::get(format!("http://{addr}/help")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers().get("content-type").unwrap(), "text/plain");
    let body = response.text().await.unwrap();
    assert!(body.contains("curl"));
    assert!(body.contains(&addr.to_string()));
}

#[tokio::test]
async fn favicon_and_robots_are_static_answers() {
    let addr = make_server().await;
    let favicon = reqwest::get(format!("http://{addr}/favicon.ico"))
        .await
        .unwrap();
    assert_eq!(favicon.status(), 204);

    let robots = reqwest::get(format!("http://{addr}/robots.txt"))
        .await
        .unwrap();
    assert_eq!(robots.status(), 404);
    assert_eq!(
        robots
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn sending_to_a_reserved_path_is_refused() {
    let addr = make_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{addr}/version"))
        .body("this is a content")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );

    let response = client
        .put(format!("http://{addr}/"))
        .body("x")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}
