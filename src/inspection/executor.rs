use anyhow::Result;
use tracing::debug;

use crate::models::directive::DirectiveSet;
use crate::models::request::RequestFacts;

/// Carries out an evaluated action plan (load generation, sleeping, sized
/// bodies, status override).
///
/// Only called with non-empty plans. Errors are logged by the caller and
/// never fail the request.
pub trait ActionExecutor: Send + Sync {
    fn execute(&self, plan: &DirectiveSet, facts: &RequestFacts) -> Result<()>;
}

/// Records the plan and does nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExecutor;

impl ActionExecutor for NoopExecutor {
    fn execute(&self, plan: &DirectiveSet, facts: &RequestFacts) -> Result<()> {
        debug!(
            client_ip = %facts.chain.client_ip,
            cpu = ?plan.cpu_load_percent(),
            memory = ?plan.memory_load_percent(),
            sleep = ?plan.sleep_range(),
            size = ?plan.response_size(),
            status = ?plan.status_override(),
            "Action plan accepted (no executor installed)"
        );
        Ok(())
    }
}
