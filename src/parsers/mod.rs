//! Vendor parsers for switch CLI output
//!
//! Each supported switch OS has one parser implementing [`VendorParser`].
//! Parsers are total: any text yields a [`ParseOutcome`], with malformed
//! content reported as a [`ParseFailure`] rather than an error.

mod cisco;
mod netgear;
pub(crate) mod utils;

pub use cisco::CiscoParser;
pub use netgear::NetgearParser;
pub use utils::{interfaces_match, normalize_interface};

use crate::error::{Error, Result};
use crate::types::{CheckType, GroupMembershipRecord, ParseFailure, QuerierRecord, RouteRecord, Vendor};

/// Result of parsing one command's output
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome<T> {
    /// Records recovered from well-formed lines
    pub value: T,
    /// Set when at least one line matched no known grammar
    pub failure: Option<ParseFailure>,
    /// `false` when the switch rejected the command itself
    pub supported: bool,
}

impl<T: Default> ParseOutcome<T> {
    pub fn empty() -> Self {
        Self::parsed(T::default(), None)
    }

    pub fn parsed(value: T, failure: Option<ParseFailure>) -> Self {
        Self {
            value,
            failure,
            supported: true,
        }
    }

    pub fn unsupported() -> Self {
        Self {
            value: T::default(),
            failure: None,
            supported: false,
        }
    }
}

/// A parse result tagged with the section it belongs to
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedSection {
    Querier(ParseOutcome<QuerierRecord>),
    Groups(ParseOutcome<Vec<GroupMembershipRecord>>),
    Routes(ParseOutcome<Vec<RouteRecord>>),
}

impl ParsedSection {
    pub fn check(&self) -> CheckType {
        match self {
            ParsedSection::Querier(_) => CheckType::Querier,
            ParsedSection::Groups(_) => CheckType::Groups,
            ParsedSection::Routes(_) => CheckType::Routes,
        }
    }

    pub fn into_querier(self) -> Result<ParseOutcome<QuerierRecord>> {
        match self {
            ParsedSection::Querier(outcome) => Ok(outcome),
            other => Err(misrouted(CheckType::Querier, other.check())),
        }
    }

    pub fn into_groups(self) -> Result<ParseOutcome<Vec<GroupMembershipRecord>>> {
        match self {
            ParsedSection::Groups(outcome) => Ok(outcome),
            other => Err(misrouted(CheckType::Groups, other.check())),
        }
    }

    pub fn into_routes(self) -> Result<ParseOutcome<Vec<RouteRecord>>> {
        match self {
            ParsedSection::Routes(outcome) => Ok(outcome),
            other => Err(misrouted(CheckType::Routes, other.check())),
        }
    }
}

fn misrouted(wanted: CheckType, got: CheckType) -> Error {
    Error::InternalContract(format!("expected {wanted} output, parser produced {got}"))
}

/// Per-vendor CLI grammar
pub trait VendorParser: Send + Sync {
    fn vendor(&self) -> Vendor;

    fn parse_querier(&self, raw: &str) -> ParseOutcome<QuerierRecord>;

    /// Group memberships, duplicates already merged
    fn parse_groups(&self, raw: &str) -> ParseOutcome<Vec<GroupMembershipRecord>>;

    /// Route entries, duplicates on (group, source) already merged
    fn parse_routes(&self, raw: &str) -> ParseOutcome<Vec<RouteRecord>>;

    fn parse(&self, check: CheckType, raw: &str) -> ParsedSection {
        match check {
            CheckType::Querier => ParsedSection::Querier(self.parse_querier(raw)),
            CheckType::Groups => ParsedSection::Groups(self.parse_groups(raw)),
            CheckType::Routes => ParsedSection::Routes(self.parse_routes(raw)),
        }
    }
}

static CISCO: CiscoParser = CiscoParser;
static NETGEAR: NetgearParser = NetgearParser;

/// Parser for a vendor tag
pub fn parser_for(vendor: Vendor) -> &'static dyn VendorParser {
    match vendor {
        Vendor::Cisco => &CISCO,
        Vendor::Netgear => &NETGEAR,
    }
}
