use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Switch operating systems the engine knows how to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Cisco,
    Netgear,
}

impl Vendor {
    pub const ALL: [Vendor; 2] = [Vendor::Cisco, Vendor::Netgear];

    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Cisco => "cisco",
            Vendor::Netgear => "netgear",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vendor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cisco" => Ok(Vendor::Cisco),
            "netgear" => Ok(Vendor::Netgear),
            other => Err(Error::UnsupportedVendor(other.to_string())),
        }
    }
}

/// The three questions asked of a switch every cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckType {
    Querier,
    Groups,
    Routes,
}

impl CheckType {
    pub const ALL: [CheckType; 3] = [CheckType::Querier, CheckType::Groups, CheckType::Routes];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckType::Querier => "querier",
            CheckType::Groups => "groups",
            CheckType::Routes => "routes",
        }
    }
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "querier" => Ok(CheckType::Querier),
            "groups" => Ok(CheckType::Groups),
            "routes" => Ok(CheckType::Routes),
            other => Err(Error::UnsupportedCheck(other.to_string())),
        }
    }
}

/// IGMP querier as seen by the switch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuerierRecord {
    pub present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_local: Option<bool>,
    /// Other queriers reported on the same VLAN as `address`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additional: Vec<String>,
}

impl QuerierRecord {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn active(address: impl Into<String>, is_local: Option<bool>) -> Self {
        Self {
            present: true,
            address: Some(address.into()),
            is_local,
            additional: Vec::new(),
        }
    }

    /// Querier is running but the switch does not print its address
    pub fn unaddressed(is_local: Option<bool>) -> Self {
        Self {
            present: true,
            address: None,
            is_local,
            additional: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupMembershipRecord {
    pub group_address: String,
    pub interfaces: Vec<String>,
}

impl GroupMembershipRecord {
    pub fn new(group_address: impl Into<String>, interfaces: Vec<String>) -> Self {
        Self {
            group_address: group_address.into(),
            interfaces,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteRecord {
    pub group_address: String,
    /// `None` for a shared-tree `(*, G)` entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incoming_interface: Option<String>,
    pub outgoing_interfaces: Vec<String>,
}

impl RouteRecord {
    pub fn key(&self) -> RouteKey {
        (self.group_address.clone(), self.source_address.clone())
    }
}

/// (group, source) identity of a route
pub type RouteKey = (String, Option<String>);

/// Vendor output that did not match any known grammar
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseFailure {
    pub check: CheckType,
    pub malformed_lines: usize,
    pub total_lines: usize,
    /// First offending line, trimmed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,
}

/// Normalized multicast state of one device for one polling cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MulticastStateModel {
    pub device_id: String,
    pub vendor: Vendor,
    pub timestamp: DateTime<Utc>,
    pub querier: QuerierRecord,
    pub memberships: BTreeMap<String, GroupMembershipRecord>,
    #[serde(serialize_with = "serialize_routes")]
    pub routes: BTreeMap<RouteKey, RouteRecord>,
    /// `false` when the switch rejected the route-table command outright
    pub routes_supported: bool,
    pub parse_failures: Vec<ParseFailure>,
}

fn serialize_routes<S>(routes: &BTreeMap<RouteKey, RouteRecord>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(routes.values())
}

impl MulticastStateModel {
    /// Empty model; `assemble` fills it from raw text
    pub fn new(device_id: impl Into<String>, vendor: Vendor, timestamp: DateTime<Utc>) -> Self {
        Self {
            device_id: device_id.into(),
            vendor,
            timestamp,
            querier: QuerierRecord::absent(),
            memberships: BTreeMap::new(),
            routes: BTreeMap::new(),
            routes_supported: true,
            parse_failures: Vec::new(),
        }
    }

    pub fn routes_for<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a RouteRecord> + 'a {
        self.routes.values().filter(move |r| r.group_address == group)
    }

    pub fn has_failure(&self, check: CheckType) -> bool {
        self.parse_failures.iter().any(|f| f.check == check)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Querier,
    Membership,
    Flooding,
    ParseError,
}

impl Category {
    /// Report order: querier, flooding, membership, parse_error
    pub fn priority(&self) -> u8 {
        match self {
            Category::Querier => 0,
            Category::Flooding => 1,
            Category::Membership => 2,
            Category::ParseError => 3,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Querier => "querier",
            Category::Membership => "membership",
            Category::Flooding => "flooding",
            Category::ParseError => "parse_error",
        })
    }
}

/// One actionable observation about a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub category: Category,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_address: Option<String>,
}

impl Finding {
    pub fn new(severity: Severity, category: Category, message: impl Into<String>) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            group_address: None,
        }
    }

    pub fn for_group(mut self, group: impl Into<String>) -> Self {
        self.group_address = Some(group.into());
        self
    }
}

/// Findings of one cycle, as handed to a presentation sink
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub timestamp: String,
    pub device_id: String,
    pub findings: Vec<Finding>,
}
