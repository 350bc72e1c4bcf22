//! Common line-level helpers shared by the vendor grammars

use std::net::Ipv4Addr;

use crate::constants::{CLI_REJECTION_MARKERS, INTERFACE_ABBREVIATIONS, NO_QUERIER_MARKERS, UNSET_ADDRESS};
use crate::types::{CheckType, GroupMembershipRecord, ParseFailure, RouteRecord};

/// Counts lines and remembers the first one no grammar accepted
#[derive(Debug, Default)]
pub struct LineTally {
    total: usize,
    malformed: usize,
    sample: Option<String>,
}

impl LineTally {
    pub fn seen(&mut self) {
        self.total += 1;
    }

    pub fn malformed(&mut self, line: &str) {
        self.malformed += 1;
        if self.sample.is_none() {
            self.sample = Some(line.trim().to_string());
        }
    }

    pub fn into_failure(self, check: CheckType) -> Option<ParseFailure> {
        (self.malformed > 0).then(|| ParseFailure {
            check,
            malformed_lines: self.malformed,
            total_lines: self.total,
            sample: self.sample,
        })
    }
}

/// Non-blank lines of a command's output
pub fn content_lines(raw: &str) -> impl Iterator<Item = &str> {
    raw.lines().filter(|l| !l.trim().is_empty())
}

pub fn is_blank(raw: &str) -> bool {
    raw.trim().is_empty()
}

/// The switch refused the command (unknown command, bad syntax, ...)
pub fn is_rejection(raw: &str) -> bool {
    let lower = raw.to_ascii_lowercase();
    CLI_REJECTION_MARKERS.iter().any(|m| lower.contains(m))
}

pub fn says_no_querier(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    NO_QUERIER_MARKERS.iter().any(|m| lower.contains(m))
}

/// Every non-blank line counted as malformed
pub fn reject_all(check: CheckType, raw: &str) -> Option<ParseFailure> {
    let mut tally = LineTally::default();
    for line in content_lines(raw) {
        tally.seen();
        tally.malformed(line);
    }
    tally.into_failure(check)
}

pub fn parse_ipv4(token: &str) -> Option<Ipv4Addr> {
    token.trim_matches(|c| c == ',' || c == ';').parse().ok()
}

pub fn is_multicast_ipv4(token: &str) -> bool {
    parse_ipv4(token).is_some_and(|ip| ip.is_multicast())
}

/// Dotted-quad shaped token, valid or not
pub fn looks_like_ipv4(token: &str) -> bool {
    let parts: Vec<&str> = token.split('.').collect();
    parts.len() == 4 && parts.iter().all(|p| !p.is_empty() && p.len() <= 3 && p.bytes().all(|b| b.is_ascii_digit()))
}

/// A reported address that actually names a querier
pub fn usable_address(token: &str) -> Option<String> {
    let ip = parse_ipv4(token)?;
    (ip.to_string() != UNSET_ADDRESS).then(|| ip.to_string())
}

/// Canonical short form of an interface name, for comparison only
pub fn normalize_interface(name: &str) -> String {
    let compact: String = name.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_ascii_lowercase();
    for (long, short) in INTERFACE_ABBREVIATIONS {
        if let Some(rest) = compact.strip_prefix(long) {
            return format!("{short}{rest}");
        }
    }
    if let Some(rest) = compact.strip_prefix("eth") {
        return format!("et{rest}");
    }
    compact
}

pub fn interfaces_match(a: &str, b: &str) -> bool {
    normalize_interface(a) == normalize_interface(b)
}

pub fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|existing| interfaces_match(existing, item)) {
        list.push(item.to_string());
    }
}

/// Merge duplicate groups, keeping first-seen order and unioning interfaces
pub fn merge_memberships(records: Vec<GroupMembershipRecord>) -> Vec<GroupMembershipRecord> {
    let mut merged: Vec<GroupMembershipRecord> = Vec::with_capacity(records.len());
    for record in records {
        if record.group_address.is_empty() {
            continue;
        }
        match merged.iter_mut().find(|m| m.group_address == record.group_address) {
            Some(existing) => {
                for iface in &record.interfaces {
                    push_unique(&mut existing.interfaces, iface);
                }
            }
            None => {
                let mut fresh = GroupMembershipRecord::new(record.group_address, Vec::new());
                for iface in &record.interfaces {
                    push_unique(&mut fresh.interfaces, iface);
                }
                merged.push(fresh);
            }
        }
    }
    merged
}

/// Merge routes sharing (group, source), unioning outgoing interfaces
pub fn merge_routes(records: Vec<RouteRecord>) -> Vec<RouteRecord> {
    let mut merged: Vec<RouteRecord> = Vec::with_capacity(records.len());
    for record in records {
        match merged
            .iter_mut()
            .find(|m| m.group_address == record.group_address && m.source_address == record.source_address)
        {
            Some(existing) => {
                if existing.incoming_interface.is_none() {
                    existing.incoming_interface = record.incoming_interface;
                }
                for iface in &record.outgoing_interfaces {
                    push_unique(&mut existing.outgoing_interfaces, iface);
                }
            }
            None => merged.push(record),
        }
    }
    merged
}

/// Placeholder words some CLIs print instead of an interface
pub fn is_null_interface(token: &str) -> bool {
    matches!(token.to_ascii_lowercase().as_str(), "null" | "none" | "-" | "n/a" | "")
}

pub fn is_separator(line: &str) -> bool {
    let t = line.trim();
    !t.is_empty() && t.chars().all(|c| matches!(c, '-' | '=' | ' ' | '+' | '|'))
}
