use parking_lot::RwLock;
use tracing::trace;

use crate::models::resource::{ResourceKind, ResourceSnapshot, UsageSnapshot};

/// `(target, current)` usage for a single resource.
///
/// Each field is its own synchronized cell: a reader never observes a torn
/// `f64`, but `target` and `current` are not read atomically as a pair.
#[derive(Debug, Default)]
pub struct ResourceUsage {
    target: RwLock<f64>,
    current: RwLock<f64>,
}

impl ResourceUsage {
    pub fn target(&self) -> f64 {
        *self.target.read()
    }

    pub fn set_target(&self, value: f64) {
        *self.target.write() = value;
    }

    pub fn current(&self) -> f64 {
        *self.current.read()
    }

    pub fn set_current(&self, value: f64) {
        *self.current.write() = value;
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            target: self.target(),
            current: self.current(),
        }
    }
}

/// Process-wide store of CPU and memory usage.
///
/// Constructed once in `main` and shared by `Arc` with request handlers
/// (readers) and the sampler (writer). Values are stored as given; callers
/// supply valid percentages.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    cpu: ResourceUsage,
    memory: ResourceUsage,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn usage(&self, kind: ResourceKind) -> &ResourceUsage {
        match kind {
            ResourceKind::Cpu => &self.cpu,
            ResourceKind::Memory => &self.memory,
        }
    }

    pub fn get_target(&self, kind: ResourceKind) -> f64 {
        self.usage(kind).target()
    }

    pub fn set_target(&self, kind: ResourceKind, value: f64) {
        trace!(resource = kind.as_str(), value, "Target updated");
        self.usage(kind).set_target(value);
    }

    pub fn get_current(&self, kind: ResourceKind) -> f64 {
        self.usage(kind).current()
    }

    pub fn set_current(&self, kind: ResourceKind, value: f64) {
        trace!(resource = kind.as_str(), value, "Current reading updated");
        self.usage(kind).set_current(value);
    }

    /// Read every field through its own lock acquisition.
    pub fn snapshot(&self) -> ResourceSnapshot {
        ResourceSnapshot {
            cpu: self.cpu.snapshot(),
            memory: self.memory.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_new_registry_is_zeroed() {
        let registry = ResourceRegistry::new();
        assert_eq!(registry.snapshot(), ResourceSnapshot::default());
    }

    #[test]
    fn test_set_then_get() {
        let registry = ResourceRegistry::new();
        registry.set_target(ResourceKind::Cpu, 42.5);
        registry.set_current(ResourceKind::Memory, 12.0);

        assert_eq!(registry.get_target(ResourceKind::Cpu), 42.5);
        assert_eq!(registry.get_current(ResourceKind::Cpu), 0.0);
        assert_eq!(registry.get_target(ResourceKind::Memory), 0.0);
        assert_eq!(registry.get_current(ResourceKind::Memory), 12.0);
    }

    #[test]
    fn test_values_are_not_clamped() {
        let registry = ResourceRegistry::new();
        registry.set_target(ResourceKind::Memory, 150.0);
        assert_eq!(registry.get_target(ResourceKind::Memory), 150.0);
    }

    #[test]
    fn test_set_target_visible_under_concurrent_reads() {
        let registry = Arc::new(ResourceRegistry::new());

        std::thread::scope(|s| {
            for _ in 0..4 {
                let r = Arc::clone(&registry);
                s.spawn(move || {
                    for _ in 0..10_000 {
                        let v = r.get_current(ResourceKind::Memory);
                        assert!((0.0..=100.0).contains(&v));
                        let _ = r.snapshot();
                    }
                });
            }

            let r = Arc::clone(&registry);
            s.spawn(move || {
                for i in 0..1_000 {
                    let value = (i % 101) as f64;
                    r.set_target(ResourceKind::Cpu, value);
                    assert_eq!(r.get_target(ResourceKind::Cpu), value);
                }
            });
        });
    }

    #[test]
    fn test_concurrent_writers_leave_valid_values() {
        let registry = Arc::new(ResourceRegistry::new());

        std::thread::scope(|s| {
            for w in 0..4u32 {
                let r = Arc::clone(&registry);
                s.spawn(move || {
                    for i in 0..1_000u32 {
                        let value = ((w * 25 + i) % 101) as f64;
                        for kind in [ResourceKind::Cpu, ResourceKind::Memory] {
                            r.set_current(kind, value);
                            r.set_target(kind, value);
                        }
                    }
                });
            }
            for _ in 0..2 {
                let r = Arc::clone(&registry);
                s.spawn(move || {
                    for _ in 0..5_000 {
                        let snap = r.snapshot();
                        for usage in [snap.cpu, snap.memory] {
                            assert!((0.0..=100.0).contains(&usage.target));
                            assert!((0.0..=100.0).contains(&usage.current));
                        }
                    }
                });
            }
        });
    }
}
