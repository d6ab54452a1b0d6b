//! One-shot host identity discovery at startup.

use std::net::IpAddr;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::settings::HostConfig;
use crate::models::host::HostIdentity;

/// Build the host identity from the OS, applying configured overrides.
pub fn discover_host(config: &HostConfig) -> Result<HostIdentity> {
    let name = match config.name {
        Some(ref name) => name.clone(),
        None => gethostname::gethostname().to_string_lossy().into_owned(),
    };

    let ip = match config.ip {
        Some(ref ip) => ip.clone(),
        None => {
            let interfaces = if_addrs::get_if_addrs().context("Failed to enumerate network interfaces")?;
            let candidates = interfaces
                .iter()
                .filter(|iface| !iface.is_loopback())
                .map(|iface| iface.ip());
            match pick_primary_ip(candidates) {
                Some(ip) => ip.to_string(),
                None => {
                    warn!("No non-loopback address found, host ip left empty");
                    String::new()
                }
            }
        }
    };

    let host = HostIdentity::new(name, ip, config.availability_zone.clone());
    info!(
        name = %host.name,
        ip = %host.ip,
        az = host.az.as_deref().unwrap_or("-"),
        "Host identity resolved"
    );
    Ok(host)
}

/// First IPv4 address, else first IPv6.
pub fn pick_primary_ip<I>(addrs: I) -> Option<IpAddr>
where
    I: IntoIterator<Item = IpAddr>,
{
    let mut first_v6 = None;
    for addr in addrs {
        match addr {
            IpAddr::V4(_) => return Some(addr),
            IpAddr::V6(_) if first_v6.is_none() => first_v6 = Some(addr),
            IpAddr::V6(_) => {}
        }
    }
    first_v6
}
