//! Periodic CPU / memory sampler feeding `current` readings into the
//! resource registry.

use std::sync::Arc;
use std::time::Duration;

use sysinfo::System;
use tracing::{debug, info};

use crate::models::resource::ResourceKind;
use crate::storage::resource_registry::ResourceRegistry;

/// Source of utilisation readings, in percent.
pub trait UsageSource: Send {
    fn cpu_percent(&mut self) -> f64;
    fn memory_percent(&mut self) -> f64;
}

/// Readings from the local system via `sysinfo`.
pub struct SystemUsage {
    sys: System,
}

impl SystemUsage {
    pub fn new() -> Self {
        let mut sys = System::new();
        // CPU usage is a delta between refreshes; prime the first one.
        sys.refresh_cpu_usage();
        Self { sys }
    }
}

impl Default for SystemUsage {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageSource for SystemUsage {
    fn cpu_percent(&mut self) -> f64 {
        self.sys.refresh_cpu_usage();
        self.sys.global_cpu_info().cpu_usage() as f64
    }

    fn memory_percent(&mut self) -> f64 {
        self.sys.refresh_memory();
        let total = self.sys.total_memory();
        if total == 0 {
            return 0.0;
        }
        self.sys.used_memory() as f64 / total as f64 * 100.0
    }
}

/// Writes one reading per resource into the registry every `interval`.
pub struct ResourceSampler<S: UsageSource> {
    registry: Arc<ResourceRegistry>,
    source: S,
    interval: Duration,
}

impl<S: UsageSource> ResourceSampler<S> {
    pub fn new(registry: Arc<ResourceRegistry>, source: S, interval: Duration) -> Self {
        Self {
            registry,
            source,
            interval,
        }
    }

    /// Take one sample of each resource.
    pub fn sample(&mut self) {
        let cpu = clamp_percent(self.source.cpu_percent());
        let memory = clamp_percent(self.source.memory_percent());
        self.registry.set_current(ResourceKind::Cpu, cpu);
        self.registry.set_current(ResourceKind::Memory, memory);
        debug!(cpu, memory, "Resource usage sampled");
    }

    pub async fn run(mut self) {
        info!(interval_ms = self.interval.as_millis() as u64, "Resource sampler started");
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.sample();
        }
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}
