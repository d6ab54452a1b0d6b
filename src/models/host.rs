use serde::Serialize;

/// Identity of the host serving requests. Set once at startup, read-only
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HostIdentity {
    pub name: String,
    /// Primary address, IPv4 preferred.
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub az: Option<String>,
}

impl HostIdentity {
    pub fn new(name: impl Into<String>, ip: impl Into<String>, az: Option<String>) -> Self {
        Self {
            name: name.into(),
            ip: ip.into(),
            az,
        }
    }
}
