//! Command catalog: which CLI command answers which check on which vendor

use crate::error::Result;
use crate::types::{CheckType, Vendor};

/// Command string for a typed (vendor, check) pair
pub fn resolve(vendor: Vendor, check: CheckType) -> &'static str {
    match (vendor, check) {
        (Vendor::Cisco, CheckType::Querier) => "show ip igmp snooping querier",
        (Vendor::Cisco, CheckType::Groups) => "show ip igmp groups",
        (Vendor::Cisco, CheckType::Routes) => "show ip mroute",
        (Vendor::Netgear, CheckType::Querier) => "show igmp querier",
        (Vendor::Netgear, CheckType::Groups) => "show igmp group",
        // Missing on some firmware; the parser reports that, not the catalog
        (Vendor::Netgear, CheckType::Routes) => "show ip mroute",
    }
}

/// Lookup by name, as read from configuration or the command line
pub fn resolve_named(vendor: &str, check: &str) -> Result<&'static str> {
    let vendor: Vendor = vendor.parse()?;
    let check: CheckType = check.parse()?;
    Ok(resolve(vendor, check))
}

/// The three commands of one cycle, in check order
pub fn commands_for(vendor: Vendor) -> [(CheckType, &'static str); 3] {
    CheckType::ALL.map(|check| (check, resolve(vendor, check)))
}
