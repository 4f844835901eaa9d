//! Load and client-conformance tests against a real HTTP client.

use std::time::{Duration, Instant};

use http::StatusCode;
use httpfromtcp::{HandlerError, Headers, Request, ResponseWriter};

mod common;

async fn chunked_with_trailers(mut w: ResponseWriter, req: Request) -> Result<ResponseWriter, HandlerError> {
    w.write_status_line(StatusCode::OK);
    let mut headers = Headers::new();
    headers.set("Transfer-Encoding", "chunked");
    headers.set("Trailer", "X-Content-Length");
    w.write_headers(headers)?;
    w.delete_header("content-length");

    let payload = req.request_line.target.repeat(100);
    for piece in payload.as_bytes().chunks(32) {
        w.write_chunked_body(piece)?;
    }
    w.write_chunked_body_done()?;

    let mut trailers = Headers::new();
    trailers.set("X-Content-Length", payload.len().to_string());
    w.write_trailers(trailers)?;
    Ok(w)
}

#[tokio::test]
async fn chunked_body_decodes_in_real_client() {
    let server = common::start_server(chunked_with_trailers).await;
    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();

    let res = client
        .get(format!("http://{}/chunks", server.local_addr()))
        .send()
        .await
        .expect("server unreachable");
    assert_eq!(res.status(), 200);
    assert!(res.headers().get("content-length").is_none());
    assert_eq!(res.headers()["transfer-encoding"], "chunked");
    assert_eq!(res.text().await.unwrap(), "/chunks".repeat(100));

    server.close();
}

#[tokio::test]
async fn chunked_trailers_on_the_wire() {
    let server = common::start_server(chunked_with_trailers).await;
    let raw = common::send_raw(server.local_addr(), b"GET /t HTTP/1.1\r\n\r\n").await;
    let text = String::from_utf8(raw).unwrap();

    // 200 bytes of "/t" in 32-byte chunks: six full chunks and one of 8.
    assert!(text.contains("\r\n\r\n20\r\n/t/t"));
    assert!(text.ends_with("\r\n8\r\n/t/t/t/t\r\n0\r\nx-content-length: 200\r\n\r\n"));
    server.close();
}

#[tokio::test]
async fn test_load_performance() {
    let server = common::start_server(|mut w: ResponseWriter, req: Request| async move {
        w.write_status_line(StatusCode::OK);
        w.write_headers(Headers::new())?;
        w.write_body(req.request_line.target.as_bytes())?;
        Ok::<_, HandlerError>(w)
    })
    .await;
    let addr = server.local_addr();

    let concurrency = 20;
    let requests_per_task = 25;
    let total_requests = concurrency * requests_per_task;

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for task in 0..concurrency {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            let mut ok = 0;
            for i in 0..requests_per_task {
                let target = format!("/task-{task}/req-{i}");
                let res = client
                    .get(format!("http://{addr}{target}"))
                    .send()
                    .await
                    .expect("request failed");
                if res.status() == 200 && res.text().await.unwrap() == target {
                    ok += 1;
                }
            }
            ok
        }));
    }

    let mut succeeded = 0;
    for task in tasks {
        succeeded += task.await.unwrap();
    }
    let elapsed = start.elapsed();
    println!("{total_requests} requests in {elapsed:?}");

    assert_eq!(succeeded, total_requests);
    assert!(server.shutdown(Duration::from_secs(5)).await);
}
