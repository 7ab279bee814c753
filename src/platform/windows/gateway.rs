//! Default gateway lookup through the IP Helper API, with a PowerShell
//! fallback that also covers IPv6-only networks.

use std::net::{IpAddr, Ipv4Addr};
use tracing::{debug, warn};

use super::hidden_command;
use crate::error::{PlatformError, Result};
use crate::gateway::parse_gateway_output;
use crate::platform::GatewayDiscovery;

pub struct WindowsGateway;

impl GatewayDiscovery for WindowsGateway {
    fn default_gateway(&self) -> Result<IpAddr> {
        match default_gateway_native() {
            Ok(ip) => return Ok(IpAddr::V4(ip)),
            Err(e) => warn!("Native route lookup failed: {}, falling back to PowerShell", e),
        }
        default_gateway_powershell()
    }
}

fn default_gateway_native() -> Result<Ipv4Addr> {
    use ::windows::Win32::NetworkManagement::IpHelper::{GetIpForwardTable, MIB_IPFORWARDTABLE};

    // SAFETY: the table is written into a buffer of the size the first call
    // reports, and entries are only read up to dwNumEntries.
    unsafe {
        let mut size: u32 = 0;
        let _ = GetIpForwardTable(None, &mut size, false);
        if size == 0 {
            return Err(PlatformError::Gateway(
                "GetIpForwardTable returned size 0".to_string(),
            ));
        }

        let mut buffer: Vec<u8> = vec![0u8; size as usize];
        let table = buffer.as_mut_ptr() as *mut MIB_IPFORWARDTABLE;
        let result = GetIpForwardTable(Some(table), &mut size, false);
        if result != 0 {
            return Err(PlatformError::Gateway(format!(
                "GetIpForwardTable failed: {}",
                result
            )));
        }

        let num_entries = (*table).dwNumEntries as usize;
        let entries = std::slice::from_raw_parts((*table).table.as_ptr(), num_entries);

        // default routes have destination and mask 0.0.0.0
        let best = entries
            .iter()
            .filter(|row| row.dwForwardDest == 0 && row.dwForwardMask == 0)
            .filter(|row| row.dwForwardNextHop != 0)
            .min_by_key(|row| row.dwForwardMetric1);

        match best {
            Some(row) => {
                // addresses are stored in network byte order
                let gateway = Ipv4Addr::from(row.dwForwardNextHop.to_ne_bytes());
                debug!(
                    "Default route via {} on interface {}",
                    gateway, row.dwForwardIfIndex
                );
                Ok(gateway)
            }
            None => Err(PlatformError::Gateway("No default route found".to_string())),
        }
    }
}

fn default_gateway_powershell() -> Result<IpAddr> {
    let output = hidden_command("powershell")
        .args([
            "-NoProfile",
            "-Command",
            r#"
            Get-NetRoute -DestinationPrefix '0.0.0.0/0','::/0' -ErrorAction SilentlyContinue |
                Where-Object { $_.NextHop -ne '0.0.0.0' -and $_.NextHop -ne '::' } |
                Sort-Object -Property RouteMetric |
                Select-Object -First 1 -ExpandProperty NextHop
            "#,
        ])
        .output()
        .map_err(|e| PlatformError::Gateway(format!("Failed to run PowerShell: {}", e)))?;

    if !output.status.success() {
        return Err(PlatformError::Gateway(
            "Get-NetRoute did not complete".to_string(),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_gateway_output(&stdout)
        .ok_or_else(|| PlatformError::Gateway("No default route found".to_string()))
}
