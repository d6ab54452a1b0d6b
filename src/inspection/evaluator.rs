use std::net::IpAddr;
use std::sync::Arc;

use tracing::debug;

use crate::models::directive::{DirectiveKey, DirectiveSet};
use crate::models::host::HostIdentity;
use crate::models::request::RequestFacts;

/// Turns a validated [`DirectiveSet`] into the action plan for a request.
///
/// All present conditions must match (AND); absent conditions match
/// vacuously. A set without any action field always yields an empty plan.
#[derive(Debug, Clone)]
pub struct DirectiveEvaluator {
    host: Arc<HostIdentity>,
}

impl DirectiveEvaluator {
    pub fn new(host: Arc<HostIdentity>) -> Self {
        Self { host }
    }

    pub fn evaluate(&self, input: &DirectiveSet, facts: &RequestFacts) -> DirectiveSet {
        if !input.has_action {
            return DirectiveSet::new();
        }

        for (key, expected) in input.conditions() {
            if !self.condition_matches(key, expected, facts) {
                debug!(
                    condition = %key,
                    expected = %expected,
                    "Condition not satisfied, actions suppressed"
                );
                return DirectiveSet::new();
            }
        }

        input.actions_only()
    }

    fn condition_matches(&self, key: DirectiveKey, expected: &str, facts: &RequestFacts) -> bool {
        match key {
            DirectiveKey::IfClientIp => ip_matches(expected, &facts.chain.client_ip),
            DirectiveKey::IfProxy1Ip => ip_matches(expected, &facts.chain.proxy1_ip),
            DirectiveKey::IfProxy2Ip => ip_matches(expected, &facts.chain.proxy2_ip),
            DirectiveKey::IfTargetIp => ip_matches(expected, &facts.chain.target_ip),
            DirectiveKey::IfHostIp => ip_matches(expected, &self.host.ip),
            DirectiveKey::IfHost => expected.eq_ignore_ascii_case(&self.host.name),
            DirectiveKey::IfAz => self
                .host
                .az
                .as_deref()
                .is_some_and(|az| expected.eq_ignore_ascii_case(az)),
            // Action keys never reach here.
            _ => true,
        }
    }
}

/// Compare as addresses when both sides parse, else as case-insensitive text.
fn ip_matches(expected: &str, actual: &str) -> bool {
    match (expected.parse::<IpAddr>(), actual.parse::<IpAddr>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => expected.eq_ignore_ascii_case(actual),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::request::IpChain;

    fn evaluator() -> DirectiveEvaluator {
        DirectiveEvaluator::new(Arc::new(HostIdentity::new(
            "web-01",
            "10.1.1.1",
            Some("ap-northeast-1a".to_string()),
        )))
    }

    fn facts(client_ip: &str) -> RequestFacts {
        RequestFacts {
            chain: IpChain {
                client_ip: client_ip.to_string(),
                proxy1_ip: "10.0.0.2".to_string(),
                proxy2_ip: String::new(),
                target_ip: "10.1.1.1".to_string(),
            },
            ..Default::default()
        }
    }

    fn set(pairs: &[(DirectiveKey, &str)]) -> DirectiveSet {
        let mut s = DirectiveSet::new();
        for (k, v) in pairs {
            s.set(*k, v.to_string());
        }
        s
    }

    #[test]
    fn test_empty_input_yields_empty_plan() {
        let plan = evaluator().evaluate(&DirectiveSet::new(), &facts("1.2.3.4"));
        assert!(plan.is_empty());
    }

    #[test]
    fn test_conditions_without_action_yield_empty_plan() {
        let e = evaluator();
        let matching = set(&[(DirectiveKey::IfClientIp, "203.0.113.5")]);
        assert!(e.evaluate(&matching, &facts("203.0.113.5")).is_empty());
        assert!(e.evaluate(&matching, &facts("203.0.113.9")).is_empty());
    }

    #[test]
    fn test_client_ip_condition_gates_action() {
        let e = evaluator();
        let input = set(&[(DirectiveKey::Cpu, "50"), (DirectiveKey::IfClientIp, "203.0.113.5")]);

        let plan = e.evaluate(&input, &facts("203.0.113.5"));
        assert_eq!(plan.cpu_load_percent(), Some(50));
        assert!(plan.ifclientip.is_none());
        assert!(plan.has_action);

        let plan = e.evaluate(&input, &facts("203.0.113.9"));
        assert!(plan.is_empty());
        assert!(!plan.has_action);
    }

    #[test]
    fn test_unconditional_action_passes() {
        let input = set(&[(DirectiveKey::Sleep, "100-200"), (DirectiveKey::Status, "503")]);
        let plan = evaluator().evaluate(&input, &facts("1.2.3.4"));
        assert_eq!(plan, input);
    }

    #[test]
    fn test_all_conditions_must_match() {
        let e = evaluator();
        let input = set(&[
            (DirectiveKey::Memory, "30"),
            (DirectiveKey::IfProxy1Ip, "10.0.0.2"),
            (DirectiveKey::IfTargetIp, "10.1.1.1"),
            (DirectiveKey::IfHostIp, "10.1.1.1"),
            (DirectiveKey::IfHost, "WEB-01"),
            (DirectiveKey::IfAz, "ap-northeast-1a"),
        ]);
        assert_eq!(e.evaluate(&input, &facts("1.2.3.4")).memory.as_deref(), Some("30"));

        let mut mismatched = input.clone();
        mismatched.set(DirectiveKey::IfAz, "ap-northeast-1c".to_string());
        assert!(e.evaluate(&mismatched, &facts("1.2.3.4")).is_empty());
    }

    #[test]
    fn test_missing_proxy_never_matches() {
        let input = set(&[(DirectiveKey::Size, "10"), (DirectiveKey::IfProxy2Ip, "10.0.0.3")]);
        assert!(evaluator().evaluate(&input, &facts("1.2.3.4")).is_empty());
    }

    #[test]
    fn test_az_condition_fails_without_zone() {
        let e = DirectiveEvaluator::new(Arc::new(HostIdentity::new("web-01", "10.1.1.1", None)));
        let input = set(&[(DirectiveKey::Cpu, "10"), (DirectiveKey::IfAz, "us-east-1a")]);
        assert!(e.evaluate(&input, &facts("1.2.3.4")).is_empty());
    }

    #[test]
    fn test_ipv6_compares_as_address() {
        assert!(ip_matches("2001:DB8::1", "2001:db8:0:0::1"));
        assert!(!ip_matches("2001:db8::1", "2001:db8::2"));
        assert!(ip_matches("unknown", "UNKNOWN"));
    }
}
