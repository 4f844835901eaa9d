//! Demo routes served by the `httpfromtcp` binary.

use std::path::PathBuf;
use std::sync::Arc;

use http::StatusCode;
use httpfromtcp::{HandlerError, HandlerResult, Headers, Request, ResponseWriter};
use sha2::{Digest, Sha256};

const UPSTREAM_BASE: &str = "https://httpbin.org";
const PROXY_PREFIX: &str = "/httpbin/";
const CHUNK_SIZE: usize = 32;

const PAGE_400: &str = r#"<html>
  <head>
    <title>400 Bad Request</title>
  </head>
  <body>
    <h1>Bad Request</h1>
    <p>Your request honestly kinda sucked.</p>
  </body>
</html>"#;

const PAGE_500: &str = r#"<html>
  <head>
    <title>500 Internal Server Error</title>
  </head>
  <body>
    <h1>Internal Server Error</h1>
    <p>Okay, you know what? This one is on me.</p>
  </body>
</html>"#;

const PAGE_200: &str = r#"<html>
  <head>
    <title>200 OK</title>
  </head>
  <body>
    <h1>Success!</h1>
    <p>Your request was an absolute banger.</p>
  </body>
</html>"#;

/// State shared by every request.
pub struct Routes {
    client: reqwest::Client,
    video_path: PathBuf,
}

impl Routes {
    pub fn new(video_path: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            client: reqwest::Client::new(),
            video_path,
        })
    }

    pub async fn dispatch(self: Arc<Self>, w: ResponseWriter, req: Request) -> HandlerResult {
        let target = req.request_line.target.as_str();
        match target {
            "/yourproblem" => html(w, StatusCode::BAD_REQUEST, PAGE_400),
            "/myproblem" => html(w, StatusCode::INTERNAL_SERVER_ERROR, PAGE_500),
            "/video" => self.video(w).await,
            _ => match upstream_url(target) {
                Some(url) => self.proxy(w, url).await,
                None => html(w, StatusCode::OK, PAGE_200),
            },
        }
    }

    async fn video(&self, w: ResponseWriter) -> HandlerResult {
        match tokio::fs::read(&self.video_path).await {
            Ok(data) => respond(w, StatusCode::OK, "video/mp4", &data),
            Err(e) => {
                tracing::warn!(path = %self.video_path.display(), error = %e, "Video unavailable");
                html(w, StatusCode::INTERNAL_SERVER_ERROR, PAGE_500)
            }
        }
    }

    /// Relay an upstream resource as a chunked body with checksum trailers.
    async fn proxy(&self, mut w: ResponseWriter, url: String) -> HandlerResult {
        let mut upstream = match self.client.get(&url).send().await {
            Ok(res) => res,
            Err(e) => {
                tracing::warn!(%url, error = %e, "Upstream request failed");
                return html(w, StatusCode::INTERNAL_SERVER_ERROR, PAGE_500);
            }
        };

        let content_type = upstream
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/plain")
            .to_string();

        w.write_status_line(StatusCode::OK);
        let mut headers = Headers::new();
        headers.set("transfer-encoding", "chunked");
        headers.set("trailer", "X-Content-SHA256, X-Content-Length");
        headers.set("content-type", content_type);
        w.write_headers(headers)?;
        w.delete_header("content-length");

        let mut hasher = Sha256::new();
        let mut total = 0usize;
        loop {
            match upstream.chunk().await {
                Ok(Some(bytes)) => {
                    hasher.update(&bytes);
                    total += bytes.len();
                    for piece in bytes.chunks(CHUNK_SIZE) {
                        w.write_chunked_body(piece)?;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(%url, error = %e, received = total, "Upstream body ended early");
                    break;
                }
            }
        }
        w.write_chunked_body_done()?;

        let digest = hasher
            .finalize()
            .iter()
            .fold(String::with_capacity(64), |mut acc, b| {
                acc.push_str(&format!("{:02x}", b));
                acc
            });
        let mut trailers = Headers::new();
        trailers.set("X-Content-SHA256", digest);
        trailers.set("X-Content-Length", total.to_string());
        w.write_trailers(trailers)?;

        tracing::debug!(%url, bytes = total, "Proxied upstream body");
        Ok(w)
    }
}

/// Upstream URL for a `/httpbin/<path>` target.
fn upstream_url(target: &str) -> Option<String> {
    target
        .strip_prefix(PROXY_PREFIX)
        .map(|path| format!("{UPSTREAM_BASE}/{path}"))
}

fn html(w: ResponseWriter, code: StatusCode, page: &str) -> HandlerResult {
    respond(w, code, "text/html", page.as_bytes())
}

fn respond(mut w: ResponseWriter, code: StatusCode, content_type: &str, body: &[u8]) -> HandlerResult {
    w.write_status_line(code);
    let mut headers = Headers::new();
    headers.set("content-type", content_type);
    w.write_headers(headers)?;
    w.write_body(body)?;
    Ok(w)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_targets_need_the_path_separator() {
        assert_eq!(
            upstream_url("/httpbin/stream/100").as_deref(),
            Some("https://httpbin.org/stream/100")
        );
        assert_eq!(upstream_url("/httpbin/").as_deref(), Some("https://httpbin.org/"));
        assert_eq!(upstream_url("/httpbinX"), None);
        assert_eq!(upstream_url("/httpbin"), None);
    }

    #[tokio::test]
    async fn lookalike_prefix_gets_the_default_page() {
        let routes = Routes::new(PathBuf::from("missing.mp4"));
        let mut req = Request::new();
        req.parse(b"GET /httpbinX HTTP/1.1\r\n\r\n").unwrap();

        let w = routes.dispatch(ResponseWriter::new(), req).await.unwrap();
        assert_eq!(w.status(), StatusCode::OK);
        assert!(String::from_utf8(w.serialize()).unwrap().ends_with(PAGE_200));
    }
}
