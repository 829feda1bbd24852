// Copyright 2026 The FlexSwitch Exporter Authors
// SPDX-License-Identifier: MIT

use crate::{collector, config, prometheus::Exporter};
use anyhow::{Context, Result, anyhow};
use hyper::{Request, Response, Uri, body::Bytes, header::CONTENT_TYPE};
use log::{debug, error, info};
use std::{future, net, pin, sync, time};

const LANDING_PAGE: &str = "\
<html>
<head><title>FlexSwitch Exporter</title></head>
<body>
<h1>FlexSwitch Exporter</h1>
<p><a href=\"/flexswitch\">Scrape</a></p>
<p><a href=\"/metrics\">Metrics</a></p>
</body>
</html>
";

pub struct State {
    pub collectors: collector::Registry,
    pub exporter: Exporter,
}

fn hex_digit(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

/// Decodes one `application/x-www-form-urlencoded` query component: `+` is a
/// space and `%XX` escapes are expanded. Malformed escapes pass through
/// verbatim.
fn decode_component(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());

    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'+' {
            out.push(b' ');
            i += 1;
        } else if b == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                out.push(hi * 16 + lo);
                i += 3;
            } else {
                out.push(b);
                i += 1;
            }
        } else {
            out.push(b);
            i += 1;
        }
    }

    String::from_utf8(out).unwrap_or_else(|_| raw.to_string())
}

fn query_param(uri: &Uri, key: &str) -> Option<String> {
    uri.query()?.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        (k == key && !v.is_empty()).then(|| decode_component(v))
    })
}

type Body = http_body_util::Full<Bytes>;

fn client_error(msg: String) -> Result<Response<Body>, hyper::http::Error> {
    Response::builder()
        .status(400)
        .body(http_body_util::Full::from(msg))
}

/// Handles `/flexswitch?target=<host>&module=<name>`: resolves the module
/// profile, runs the enabled collectors against the target, and replies with
/// the merged exposition. Client mistakes (missing target, unknown module) are
/// 400s and bump the request-error counter; collector failures are not fatal
/// and only show up in the scrape-duration outcome labels.
async fn scrape(
    state: &State,
    cfg: &config::Config,
    uri: &Uri,
) -> Result<Response<Body>, hyper::http::Error> {
    let modules = match config::load_modules(&cfg.config_file) {
        Ok(modules) => modules,
        Err(err) => {
            let msg = format!("Error parsing config file: {err:#}");
            error!("{msg}");
            return client_error(msg);
        }
    };

    let Some(target) = query_param(uri, "target") else {
        state.exporter.request_errors.inc();
        return client_error("'target' parameter must be specified".to_string());
    };

    let module_name = query_param(uri, "module").unwrap_or_else(|| "default".to_string());
    let Some(module) = modules.get(&module_name) else {
        state.exporter.request_errors.inc();
        return client_error(format!("Unknown module '{module_name}'"));
    };

    let collectors = match state.collectors.instantiate(&cfg.enabled_collectors) {
        Ok(collectors) => collectors,
        Err(err) => {
            error!("couldn't load collectors: {err}");
            return client_error(err.to_string());
        }
    };

    debug!("scraping target '{target}' with module '{module_name}'");

    let params = collector::ScrapeParams {
        target,
        proto: module.proto.clone(),
        port: module.port,
        username: module.auth.username.clone(),
        password: module.auth.password.clone(),
        timeout: time::Duration::from_secs(cfg.scrape_timeout),
    };

    let body = collector::run_scrape(collectors, params, &state.exporter).await;

    Response::builder()
        .header(CONTENT_TYPE, "text/plain; version=0.0.4")
        .body(http_body_util::Full::from(body))
}

async fn handle(
    state: sync::Arc<State>,
    req: Request<hyper::body::Incoming>,
) -> Result<Response<Body>, hyper::http::Error> {
    match req.uri().path() {
        "/flexswitch" => scrape(&state, config::get(), req.uri()).await,
        "/metrics" => Response::builder()
            .header(CONTENT_TYPE, state.exporter.format_type().to_string())
            .body(http_body_util::Full::from(state.exporter.encode())),
        "/" => Response::builder()
            .header(CONTENT_TYPE, "text/html")
            .body(http_body_util::Full::from(LANDING_PAGE)),
        _ => {
            debug!("incorrect uri {}", req.uri());
            Response::builder()
                .status(404)
                .body(http_body_util::Full::default())
        }
    }
}

#[derive(Clone)]
struct Svc {
    state: sync::Arc<State>,

    error_500: Response<Body>,
}

impl hyper::service::Service<Request<hyper::body::Incoming>> for Svc {
    type Response = Response<Body>;
    type Error = hyper::Error;
    type Future =
        pin::Pin<Box<dyn future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<hyper::body::Incoming>) -> Self::Future {
        let state = self.state.clone();
        let error_500 = self.error_500.clone();

        Box::pin(async move {
            let resp = handle(state, req).await.unwrap_or(error_500);
            Ok(resp)
        })
    }
}

async fn serve_connection(stream: tokio::net::TcpStream, svc: Svc) {
    let io = hyper_util::rt::TokioIo::new(stream);

    let http = hyper::server::conn::http1::Builder::new();
    let conn = http.serve_connection(io, svc);

    if let Err(err) = conn.await {
        error!("server connection error: {err:?}");
    }
}

pub async fn run(state: State) -> Result<()> {
    let addr = &config::get().hyper_addr;
    let addr: net::SocketAddr = addr
        .parse()
        .map_err(|_| anyhow!("invalid listen address {addr}"))?;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr:?}"))?;

    let svc = Svc {
        state: sync::Arc::new(state),
        error_500: Response::builder()
            .status(500)
            .body(http_body_util::Full::default())?,
    };

    info!("listening on {addr:?}");

    loop {
        let stream = match listener.accept().await {
            Ok((stream, client_addr)) => {
                debug!("new connection from {client_addr:?}");
                stream
            }
            Err(err) => {
                error!("failed to accept connection: {err:?}");
                continue;
            }
        };

        tokio::task::spawn(serve_connection(stream, svc.clone()));
    }
}
