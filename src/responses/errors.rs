use crate::errors::ServerError;
use astra::{Body, Response, ResponseBuilder};
use serde_json::json;

pub type ResultResp = Result<Response, ServerError>;

/// Error page for browser routes, JSON body for `/api` routes.
pub fn error_response(err: ServerError, api: bool) -> Response {
    let status = err.status_code();
    let message = match &err {
        ServerError::BadRequest(msg) => msg.clone(),
        other => other.to_string(),
    };

    if api {
        let body = json!({ "status": "error", "message": message }).to_string();
        return build(status, "application/json", body);
    }

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Error {status}</title>
  <style>
    body {{
      font-family: system-ui, sans-serif;
      max-width: 720px;
      margin: 4rem auto;
      padding: 1rem;
    }}
    p {{
      font-size: 1.1rem;
      color: #444;
    }}
  </style>
</head>
<body>
  <h1>Error {status}</h1>
  <p>{message}</p>
  <p><a href="/">← Back to dashboard</a></p>
</body>
</html>"#,
        message = maud::html! { (message) }.into_string()
    );
    build(status, "text/html; charset=utf-8", html)
}

fn build(status: u16, content_type: &str, body: String) -> Response {
    ResponseBuilder::new()
        .status(status)
        .header("Content-Type", content_type)
        .body(Body::from(body))
        .unwrap_or_else(|_| Response::new(Body::from("Internal Server Error")))
}
