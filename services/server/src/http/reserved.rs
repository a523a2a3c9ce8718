//! Static handlers for the reserved paths.
//!
//! GET and HEAD share one builder so their header sets are identical;
//! HEAD reports the same Content-Length with the body suppressed.

use axum::body::Body;
use axum::http::{Method, StatusCode, header};
use axum::response::Response;
use relay_core::params;

const RESERVED_PATHS: &[&str] = &[
    "",
    "/",
    "/noscript",
    "/version",
    "/help",
    "/favicon.ico",
    "/robots.txt",
];

pub fn is_reserved(path: &str) -> bool {
    RESERVED_PATHS.contains(&path)
}

pub fn serve(method: &Method, path: &str, query: Option<&str>, host: Option<&str>) -> Response {
    match path {
        "" | "/" => page(method, landing_page(), "text/html; charset=utf-8"),
        "/noscript" => page(method, noscript_page(query), "text/html; charset=utf-8"),
        "/version" => page(
            method,
            concat!(env!("CARGO_PKG_VERSION"), "\n").to_owned(),
            "text/plain",
        ),
        "/help" => page(method, help_page(host), "text/plain"),
        "/favicon.ico" => empty(StatusCode::NO_CONTENT),
        "/robots.txt" => empty(StatusCode::NOT_FOUND),
        _ => empty(StatusCode::NOT_FOUND),
    }
}

fn page(method: &Method, body: String, content_type: &str) -> Response {
    let builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, body.len())
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*");
    let body = if method == Method::HEAD {
        Body::empty()
    } else {
        Body::from(body)
    };
    builder.body(body).unwrap()
}

fn empty(status: StatusCode) -> Response {
    Response::builder()
        .status(status)
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .body(Body::empty())
        .unwrap()
}

fn landing_page() -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Piping</title>
  <style>
    * {{ margin: 0; padding: 0; box-sizing: border-box; }}
    body {{
      font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif;
      background: #0f1117;
      color: #e1e4e8;
      display: flex;
      align-items: center;
      justify-content: center;
      min-height: 100vh;
    }}
    .container {{ max-width: 40rem; padding: 2rem; }}
    h1 {{
      font-size: 3rem;
      font-weight: 700;
      letter-spacing: -0.04em;
      background: linear-gradient(135deg, #667eea, #764ba2);
      -webkit-background-clip: text;
      -webkit-text-fill-color: transparent;
    }}
    .tagline {{ margin-top: 0.5rem; color: #8b949e; }}
    pre {{
      margin-top: 1.5rem;
      padding: 1rem;
      border: 1px solid #30363d;
      border-radius: 6px;
      color: #c9d1d9;
      overflow-x: auto;
    }}
    .links {{ margin-top: 1.5rem; color: #8b949e; }}
    .links a {{ color: #667eea; text-decoration: none; }}
  </style>
</head>
<body>
  <div class="container">
    <h1>Piping</h1>
    <p class="tagline">Stream data between any two endpoints over plain HTTP. Nothing is stored.</p>
    <pre>
# Send
curl -T myfile.txt https://&lt;this host&gt;/mypath

# Receive
curl https://&lt;this host&gt;/mypath &gt; myfile.txt</pre>
    <p class="links"><a href="/help">Help</a> | <a href="/noscript?path=">Send without JavaScript</a> | v{version}</p>
  </div>
</body>
</html>
"#,
        version = env!("CARGO_PKG_VERSION")
    )
}

fn noscript_page(query: Option<&str>) -> String {
    let path = params::first_value(query, "path").unwrap_or_default();
    let action = escape_attribute(&path);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Piping</title>
</head>
<body>
  <h1>Send without JavaScript</h1>
  <form action="{action}" method="POST" enctype="multipart/form-data">
    <input type="file" name="input_file">
    <button type="submit">Send</button>
  </form>
</body>
</html>
"#
    )
}

/// Minimal escaping for an HTML attribute value.
fn escape_attribute(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn help_page(host: Option<&str>) -> String {
    let host = host.unwrap_or("localhost:8080");
    format!(
        "Piping relay {version}\n\
         \n\
         Any two endpoints that can speak HTTP can exchange a stream through\n\
         this server: one sends to a path, up to n receivers read it back.\n\
         Nothing is stored.\n\
         \n\
         ======= Send =======\n\
         # Send a file\n\
         curl -T myfile.txt http://{host}/mypath\n\
         \n\
         # Send a directory\n\
         tar c ./mydir | curl -T - http://{host}/mypath\n\
         \n\
         ======= Receive =======\n\
         curl http://{host}/mypath > myfile.txt\n\
         \n\
         ======= Multicast =======\n\
         # One sender, three receivers\n\
         curl 'http://{host}/mypath?n=3' > copy.bin\n\
         curl -T original.bin 'http://{host}/mypath?n=3'\n",
        version = env!("CARGO_PKG_VERSION"),
    )
}
