//! Local development proxy: `/api/*` goes to the room server, everything else to the front-end
//! dev server, so the browser sees a single origin.

use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const LISTEN_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 3000);
const BACKEND_ORIGIN: &str = "http://127.0.0.1:8080";
const FRONTEND_ORIGIN: &str = "http://127.0.0.1:5173";

/// Headers that describe a single hop and must not be forwarded.
const HOP_HEADERS: [header::HeaderName; 5] = [
    header::CONNECTION,
    header::HOST,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::CONTENT_LENGTH,
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("building proxy client")?;
    let app = Router::new().fallback(forward).with_state(client);

    let addr = SocketAddr::from(LISTEN_ADDR);
    info!(%addr, backend = BACKEND_ORIGIN, frontend = FRONTEND_ORIGIN, "starting dev proxy");
    let listener = TcpListener::bind(addr).await.context("binding dev proxy")?;
    axum::serve(listener, app).await.context("serving dev proxy")?;
    Ok(())
}

/// Pick the origin for a request path.
fn upstream_origin(path: &str) -> &'static str {
    if path == "/api" || path.starts_with("/api/") {
        BACKEND_ORIGIN
    } else {
        FRONTEND_ORIGIN
    }
}

async fn forward(
    State(client): State<reqwest::Client>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let target = format!("{}{}", upstream_origin(uri.path()), path_and_query);

    let mut outbound = headers;
    for name in &HOP_HEADERS {
        outbound.remove(name);
    }

    let upstream = match client
        .request(method.clone(), &target)
        .headers(outbound)
        .body(body)
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => {
            warn!(%method, target = %target, error = %err, "upstream unreachable");
            return (StatusCode::BAD_GATEWAY, format!("upstream unreachable: {err}")).into_response();
        }
    };

    let status = upstream.status();
    let mut response_headers = upstream.headers().clone();
    for name in &HOP_HEADERS {
        response_headers.remove(name);
    }
    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(%method, target = %target, error = %err, "failed to read upstream body");
            return (StatusCode::BAD_GATEWAY, "failed to read upstream body").into_response();
        }
    };

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    response
}
