use std::collections::BTreeMap;

use http::header::HOST;
use http::HeaderMap;
use serde::Serialize;

/// Client / proxy / target addresses reconstructed for one request.
///
/// Positions that could not be derived are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IpChain {
    #[serde(rename = "clientip")]
    pub client_ip: String,
    #[serde(rename = "proxy1ip")]
    pub proxy1_ip: String,
    #[serde(rename = "proxy2ip")]
    pub proxy2_ip: String,
    #[serde(rename = "targetip")]
    pub target_ip: String,
}

/// Immutable facts about a single inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestFacts {
    pub path: String,

    #[serde(rename = "querystring")]
    pub query: String,

    /// Header name -> values joined with `", "`, in arrival order.
    pub header: BTreeMap<String, String>,

    #[serde(flatten)]
    pub chain: IpChain,
}

impl RequestFacts {
    pub fn new(path: String, query: String, header: BTreeMap<String, String>, chain: IpChain) -> Self {
        Self {
            path,
            query,
            header,
            chain,
        }
    }
}

/// Collapse multi-valued headers into one string per canonical name.
///
/// `Host` is reported as the target address, not as a header.
pub fn combine_header_values(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for name in headers.keys() {
        if *name == HOST {
            continue;
        }
        let joined = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        out.insert(canonical_header_name(name.as_str()), joined);
    }
    out
}

/// `x-forwarded-for` -> `X-Forwarded-For`.
pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
