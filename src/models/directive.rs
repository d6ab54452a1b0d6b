use serde::Serialize;

/// Query keys that gate actions start with this prefix.
pub const CONDITION_PREFIX: &str = "if";

/// Every recognised directive key.
///
/// The mapping from query-string key to [`DirectiveSet`] field goes through
/// this enum, so the table of accepted keys is enumerable via
/// [`DirectiveKey::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DirectiveKey {
    Cpu,
    Memory,
    Sleep,
    Size,
    Status,
    IfClientIp,
    IfProxy1Ip,
    IfProxy2Ip,
    IfTargetIp,
    IfHostIp,
    IfHost,
    IfAz,
}

impl DirectiveKey {
    pub const ALL: [DirectiveKey; 12] = [
        DirectiveKey::Cpu,
        DirectiveKey::Memory,
        DirectiveKey::Sleep,
        DirectiveKey::Size,
        DirectiveKey::Status,
        DirectiveKey::IfClientIp,
        DirectiveKey::IfProxy1Ip,
        DirectiveKey::IfProxy2Ip,
        DirectiveKey::IfTargetIp,
        DirectiveKey::IfHostIp,
        DirectiveKey::IfHost,
        DirectiveKey::IfAz,
    ];

    /// The query-string key (also the JSON field name).
    pub fn as_str(self) -> &'static str {
        match self {
            DirectiveKey::Cpu => "cpu",
            DirectiveKey::Memory => "memory",
            DirectiveKey::Sleep => "sleep",
            DirectiveKey::Size => "size",
            DirectiveKey::Status => "status",
            DirectiveKey::IfClientIp => "ifclientip",
            DirectiveKey::IfProxy1Ip => "ifproxy1ip",
            DirectiveKey::IfProxy2Ip => "ifproxy2ip",
            DirectiveKey::IfTargetIp => "iftargetip",
            DirectiveKey::IfHostIp => "ifhostip",
            DirectiveKey::IfHost => "ifhost",
            DirectiveKey::IfAz => "ifaz",
        }
    }

    /// Look up a query key. Matching is case-sensitive.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }

    pub fn is_condition(self) -> bool {
        self.as_str().starts_with(CONDITION_PREFIX)
    }

    pub fn is_action(self) -> bool {
        !self.is_condition()
    }
}

impl std::fmt::Display for DirectiveKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured directives parsed from (or evaluated against) one request.
///
/// Values are stored as submitted, after validation, so the input and
/// processed sets serialize back to the same text the caller sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectiveSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip)]
    pub has_action: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ifclientip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ifproxy1ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ifproxy2ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iftargetip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ifhostip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ifhost: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ifaz: Option<String>,
}

impl DirectiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, key: DirectiveKey) -> &mut Option<String> {
        match key {
            DirectiveKey::Cpu => &mut self.cpu,
            DirectiveKey::Memory => &mut self.memory,
            DirectiveKey::Sleep => &mut self.sleep,
            DirectiveKey::Size => &mut self.size,
            DirectiveKey::Status => &mut self.status,
            DirectiveKey::IfClientIp => &mut self.ifclientip,
            DirectiveKey::IfProxy1Ip => &mut self.ifproxy1ip,
            DirectiveKey::IfProxy2Ip => &mut self.ifproxy2ip,
            DirectiveKey::IfTargetIp => &mut self.iftargetip,
            DirectiveKey::IfHostIp => &mut self.ifhostip,
            DirectiveKey::IfHost => &mut self.ifhost,
            DirectiveKey::IfAz => &mut self.ifaz,
        }
    }

    pub fn get(&self, key: DirectiveKey) -> Option<&str> {
        let slot = match key {
            DirectiveKey::Cpu => &self.cpu,
            DirectiveKey::Memory => &self.memory,
            DirectiveKey::Sleep => &self.sleep,
            DirectiveKey::Size => &self.size,
            DirectiveKey::Status => &self.status,
            DirectiveKey::IfClientIp => &self.ifclientip,
            DirectiveKey::IfProxy1Ip => &self.ifproxy1ip,
            DirectiveKey::IfProxy2Ip => &self.ifproxy2ip,
            DirectiveKey::IfTargetIp => &self.iftargetip,
            DirectiveKey::IfHostIp => &self.ifhostip,
            DirectiveKey::IfHost => &self.ifhost,
            DirectiveKey::IfAz => &self.ifaz,
        };
        slot.as_deref()
    }

    /// Store an already-validated value. Setting an action key raises
    /// `has_action`.
    pub fn set(&mut self, key: DirectiveKey, value: String) {
        *self.slot_mut(key) = Some(value);
        if key.is_action() {
            self.has_action = true;
        }
    }

    /// Present condition keys with their expected values.
    pub fn conditions(&self) -> impl Iterator<Item = (DirectiveKey, &str)> + '_ {
        DirectiveKey::ALL
            .into_iter()
            .filter(|k| k.is_condition())
            .filter_map(move |k| self.get(k).map(|v| (k, v)))
    }

    /// Copy of the action fields only.
    pub fn actions_only(&self) -> DirectiveSet {
        let mut out = DirectiveSet::new();
        for key in DirectiveKey::ALL.into_iter().filter(|k| k.is_action()) {
            if let Some(v) = self.get(key) {
                out.set(key, v.to_string());
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        DirectiveKey::ALL.into_iter().all(|k| self.get(k).is_none())
    }

    pub fn cpu_load_percent(&self) -> Option<u8> {
        self.cpu.as_deref().and_then(|v| v.parse().ok())
    }

    pub fn memory_load_percent(&self) -> Option<u8> {
        self.memory.as_deref().and_then(|v| v.parse().ok())
    }

    pub fn sleep_range(&self) -> Option<NumRange> {
        self.sleep.as_deref().and_then(NumRange::parse)
    }

    pub fn response_size(&self) -> Option<NumRange> {
        self.size.as_deref().and_then(NumRange::parse)
    }

    pub fn status_override(&self) -> Option<u16> {
        self.status.as_deref().and_then(|v| v.parse().ok())
    }
}

/// A single value `n` (`low == high == n`) or an inclusive `low-high` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumRange {
    pub low: u64,
    pub high: u64,
}

impl NumRange {
    pub fn parse(s: &str) -> Option<Self> {
        match s.split_once('-') {
            Some((low, high)) => Some(Self {
                low: low.parse().ok()?,
                high: high.parse().ok()?,
            }),
            None => {
                let n = s.parse().ok()?;
                Some(Self { low: n, high: n })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_table_round_trips() {
        for key in DirectiveKey::ALL {
            assert_eq!(DirectiveKey::from_key(key.as_str()), Some(key));
        }
        assert_eq!(DirectiveKey::from_key("CPU"), None);
        assert_eq!(DirectiveKey::from_key("unknown"), None);
    }

    #[test]
    fn test_action_and_condition_split() {
        let actions: Vec<_> = DirectiveKey::ALL.into_iter().filter(|k| k.is_action()).collect();
        assert_eq!(
            actions,
            vec![
                DirectiveKey::Cpu,
                DirectiveKey::Memory,
                DirectiveKey::Sleep,
                DirectiveKey::Size,
                DirectiveKey::Status
            ]
        );
        assert!(DirectiveKey::IfAz.is_condition());
    }

    #[test]
    fn test_condition_only_has_no_action() {
        let mut set = DirectiveSet::new();
        set.set(DirectiveKey::IfClientIp, "10.0.0.1".into());
        assert!(!set.has_action);
        assert!(!set.is_empty());
        set.set(DirectiveKey::Sleep, "100".into());
        assert!(set.has_action);
    }

    #[test]
    fn test_empty_set_serializes_as_empty_object() {
        let json = serde_json::to_string(&DirectiveSet::new()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_serialized_field_names_are_query_keys() {
        let mut set = DirectiveSet::new();
        set.set(DirectiveKey::Cpu, "50".into());
        set.set(DirectiveKey::IfAz, "us-east-1a".into());
        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(value["cpu"], "50");
        assert_eq!(value["ifaz"], "us-east-1a");
        assert!(value.get("has_action").is_none());
        assert_eq!(value.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_typed_accessors() {
        let mut set = DirectiveSet::new();
        set.set(DirectiveKey::Cpu, "75".into());
        set.set(DirectiveKey::Sleep, "100-250".into());
        set.set(DirectiveKey::Size, "4096".into());
        set.set(DirectiveKey::Status, "503".into());
        assert_eq!(set.cpu_load_percent(), Some(75));
        assert_eq!(set.memory_load_percent(), None);
        assert_eq!(set.sleep_range(), Some(NumRange { low: 100, high: 250 }));
        assert_eq!(set.response_size(), Some(NumRange { low: 4096, high: 4096 }));
        assert_eq!(set.status_override(), Some(503));
    }

    #[test]
    fn test_num_range_overflow_is_none() {
        assert_eq!(NumRange::parse("99999999999999999999999"), None);
        assert_eq!(NumRange::parse("1-"), None);
    }

    #[test]
    fn test_actions_only_drops_conditions() {
        let mut set = DirectiveSet::new();
        set.set(DirectiveKey::Memory, "20".into());
        set.set(DirectiveKey::IfHost, "web-1".into());
        let actions = set.actions_only();
        assert_eq!(actions.memory.as_deref(), Some("20"));
        assert!(actions.ifhost.is_none());
        assert!(actions.has_action);
        assert_eq!(set.conditions().collect::<Vec<_>>(), vec![(DirectiveKey::IfHost, "web-1")]);
    }
}
