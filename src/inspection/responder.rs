use std::sync::Arc;

use anyhow::Result;
use http::HeaderMap;
use serde::Serialize;
use tracing::warn;

use crate::models::directive::DirectiveSet;
use crate::models::host::HostIdentity;
use crate::models::request::{combine_header_values, RequestFacts};
use crate::models::resource::ResourceSnapshot;
use crate::storage::resource_registry::ResourceRegistry;

use super::client_chain::{ClientChainResolver, FORWARDED_FOR_HEADER};
use super::evaluator::DirectiveEvaluator;
use super::executor::ActionExecutor;
use super::validator::{encode_query, parse_query, DirectiveValidator};

/// What the transport layer knows about one request.
#[derive(Debug, Clone, Copy)]
pub struct InboundRequest<'a> {
    pub path: &'a str,
    pub raw_query: Option<&'a str>,
    pub headers: &'a HeaderMap,
    /// Peer address as `ip:port` / `[v6]:port`.
    pub remote_addr: &'a str,
    /// Declared host (authority), possibly with a port.
    pub host: &'a str,
}

/// Directives as submitted and as evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Direction {
    pub input: DirectiveSet,
    pub process: DirectiveSet,
}

/// The response document.
#[derive(Debug, Clone, Serialize)]
pub struct InspectionReport {
    pub host: HostIdentity,
    pub resource: ResourceSnapshot,
    pub request: RequestFacts,
    pub direction: Direction,
}

impl InspectionReport {
    /// Pretty JSON framed by a leading and trailing newline.
    pub fn render(&self) -> Result<String> {
        let body = serde_json::to_string_pretty(self)?;
        Ok(format!("\n{}\n", body))
    }
}

/// Runs resolve -> validate -> evaluate for each request and assembles the
/// report. Never mutates the registry.
pub struct InspectionResponder {
    host: Arc<HostIdentity>,
    registry: Arc<ResourceRegistry>,
    resolver: ClientChainResolver,
    validator: DirectiveValidator,
    evaluator: DirectiveEvaluator,
    executor: Arc<dyn ActionExecutor>,
}

impl InspectionResponder {
    pub fn new(
        host: Arc<HostIdentity>,
        registry: Arc<ResourceRegistry>,
        resolver: ClientChainResolver,
        validator: DirectiveValidator,
        executor: Arc<dyn ActionExecutor>,
    ) -> Self {
        let evaluator = DirectiveEvaluator::new(Arc::clone(&host));
        Self {
            host,
            registry,
            resolver,
            validator,
            evaluator,
            executor,
        }
    }

    pub fn inspect(&self, req: InboundRequest<'_>) -> InspectionReport {
        let forwarded_for = forwarded_for_value(req.headers);
        let chain = self
            .resolver
            .resolve(req.remote_addr, req.host, forwarded_for.as_deref());

        let params = parse_query(req.raw_query.unwrap_or(""));
        let facts = RequestFacts::new(
            req.path.to_string(),
            encode_query(&params),
            combine_header_values(req.headers),
            chain,
        );

        let input = self.validator.validate(&params);
        let process = self.evaluator.evaluate(&input, &facts);

        if !process.is_empty() {
            if let Err(e) = self.executor.execute(&process, &facts) {
                warn!(
                    client_ip = %facts.chain.client_ip,
                    error = %e,
                    "Action executor failed"
                );
            }
        }

        InspectionReport {
            host: (*self.host).clone(),
            resource: self.registry.snapshot(),
            request: facts,
            direction: Direction { input, process },
        }
    }
}

/// All X-Forwarded-For lines joined with `,`; `None` when absent.
fn forwarded_for_value(headers: &HeaderMap) -> Option<String> {
    let values: Vec<String> = headers
        .get_all(FORWARDED_FOR_HEADER)
        .iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join(","))
    }
}
