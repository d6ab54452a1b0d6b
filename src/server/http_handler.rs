use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{CONTENT_TYPE, HOST};
use hyper::{Request, Response, StatusCode};
use tracing::{debug, error};

use crate::inspection::responder::{InboundRequest, InspectionResponder};

use super::access_log::AccessLogger;

/// Catch-all HTTP handler: every method and path gets an inspection report.
///
/// The request body is never read.
pub struct HttpHandler {
    responder: Arc<InspectionResponder>,
    access_log: Option<Arc<AccessLogger>>,
}

impl HttpHandler {
    pub fn new(responder: Arc<InspectionResponder>, access_log: Option<Arc<AccessLogger>>) -> Self {
        Self {
            responder,
            access_log,
        }
    }

    pub fn handle<B>(&self, req: &Request<B>, peer_addr: SocketAddr) -> Response<Full<Bytes>> {
        let start = Instant::now();
        let remote_addr = peer_addr.to_string();

        // Absolute-form targets carry the authority; otherwise use Host.
        // Userinfo is never part of the target address.
        let host = req
            .uri()
            .authority()
            .map(|a| a.as_str().rsplit_once('@').map_or(a.as_str(), |(_, h)| h))
            .or_else(|| req.headers().get(HOST).and_then(|v| v.to_str().ok()))
            .unwrap_or("");

        let report = self.responder.inspect(InboundRequest {
            path: req.uri().path(),
            raw_query: req.uri().query(),
            headers: req.headers(),
            remote_addr: &remote_addr,
            host,
        });

        debug!(
            client_ip = %report.request.chain.client_ip,
            method = %req.method(),
            path = %report.request.path,
            input = ?report.direction.input,
            process = ?report.direction.process,
            "Request inspected"
        );

        let response = match report.render() {
            Ok(body) => Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, "application/json")
                .body(Full::new(Bytes::from(body))),
            Err(e) => {
                error!(error = %e, "Failed to render inspection report");
                Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .body(Full::new(Bytes::new()))
            }
        }
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())));

        if let Some(ref log) = self.access_log {
            log.log(
                &report.request.chain.client_ip,
                req.method().as_str(),
                &report.request.path,
                response.status().as_u16(),
                start.elapsed().as_micros() as u64,
                !report.direction.process.is_empty(),
            );
        }

        response
    }
}
