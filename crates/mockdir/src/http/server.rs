//! Accept loops for the mock listener and the metrics listener.

use super::builder::ReplyBuilder;
use crate::dispatcher::Dispatcher;
use crate::metrics::collect_metrics;
use crate::request::RequestRecord;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Listener serving every request through one [`Dispatcher`].
pub struct MockServer {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
}

impl MockServer {
    pub async fn bind(addr: SocketAddr, dispatcher: Arc<Dispatcher>) -> Result<Self, anyhow::Error> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            dispatcher,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self) -> Result<(), anyhow::Error> {
        info!(
            "Mock server listening on http://{} (state dir {:?})",
            self.local_addr()?,
            self.dispatcher.state_dir().path()
        );

        loop {
            let (stream, _) = self.listener.accept().await?;
            let io = TokioIo::new(stream);
            let dispatcher = Arc::clone(&self.dispatcher);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let dispatcher = Arc::clone(&dispatcher);
                    async move { handle_request(req, dispatcher).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Mock server connection error: {}", e);
                }
            });
        }
    }
}

/// Convert the hyper request, run the blocking dispatcher, build the reply.
async fn handle_request(
    req: Request<Incoming>,
    dispatcher: Arc<Dispatcher>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => String::from_utf8_lossy(&collected.to_bytes()).into_owned(),
        Err(e) => {
            debug!("Failed to read request body: {}", e);
            String::new()
        }
    };

    let uri = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.to_string());
    let headers: Vec<(String, String)> = parts
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let record = RequestRecord::new(parts.method.as_str(), &uri, headers, body);

    let outcome = tokio::task::spawn_blocking(move || {
        let mut lines: Vec<String> = Vec::new();
        let result = dispatcher.handle(&record, &mut |line| lines.push(line.to_string()));
        result.map(|reply| (reply, lines))
    })
    .await;

    let response = match outcome {
        Ok(Ok((reply, lines))) => ReplyBuilder::from_code(reply.status)
            .header_lines(lines)
            .body(reply.body)
            .build_full(),
        Ok(Err(e)) => ReplyBuilder::new(StatusCode::INTERNAL_SERVER_ERROR)
            .header("Content-Type", "text/plain")
            .body(format!("mockdir: {e}\n"))
            .build_full(),
        Err(join_error) => {
            error!("Dispatcher task failed: {}", join_error);
            ReplyBuilder::new(StatusCode::INTERNAL_SERVER_ERROR)
                .body("mockdir: dispatcher task failed\n")
                .build_full()
        }
    };
    Ok(response)
}

/// Serve the Prometheus text format on every path of `addr`.
pub async fn serve_metrics(addr: SocketAddr) -> Result<(), anyhow::Error> {
    let listener = TcpListener::bind(addr).await?;
    info!("Metrics listening on http://{}/metrics", addr);

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            let service = service_fn(|_req: Request<Incoming>| async {
                Ok::<_, Infallible>(
                    ReplyBuilder::new(StatusCode::OK)
                        .header("Content-Type", "text/plain; version=0.0.4")
                        .body(collect_metrics())
                        .build_full(),
                )
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Metrics connection error: {}", e);
            }
        });
    }
}
