//! Cisco IOS / IOS-XE grammar
//!
//! `show ip igmp snooping querier` comes in a tabular and a detail layout,
//! `show ip igmp groups` is one row per (group, interface), and
//! `show ip mroute` is a block per `(S, G)` entry.

use std::sync::LazyLock;

use regex::Regex;

use super::utils::{
    LineTally, content_lines, is_blank, is_multicast_ipv4, is_null_interface, is_rejection, is_separator,
    looks_like_ipv4, merge_memberships, merge_routes, parse_ipv4, reject_all, says_no_querier, usable_address,
};
use super::{ParseOutcome, VendorParser};
use crate::constants::{CISCO_QUERIER_INFO_KEYS, LOCAL_QUERIER_PORTS};
use crate::types::{CheckType, GroupMembershipRecord, QuerierRecord, RouteRecord, Vendor};

static QUERIER_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:vlan\s*)?(\d+)\s+(\d{1,3}(?:\.\d{1,3}){3})\s+(v?\d)\b\s*(\S+)?").unwrap()
});
static QUERIER_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*vlan\s+ip\s+address|querier\s+(status|information)").unwrap());
static ELECTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*elected\s+querier\s+is\s+(\d{1,3}(?:\.\d{1,3}){3})(?:\s+on\s+port\s+(\S+))?").unwrap()
});
static KEY_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([A-Za-z][A-Za-z0-9 /()-]*?)\s*:\s*(.*?)\s*$").unwrap());

static GROUP_ROW: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(\S+)(?:\s+(\S+))?").unwrap());
static GROUP_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(igmp connected group membership|group address\b|\*?\s*total\b|flags:)").unwrap()
});

static MROUTE_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\(\s*([^,\s]+)\s*,\s*([^)\s]+)\s*\)").unwrap());
static MROUTE_INCOMING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*incoming interface:\s*([^,\s]+)").unwrap());
static MROUTE_OUTGOING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*outgoing interface list:\s*(\S*)").unwrap());
static MROUTE_OUT_IFACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+([A-Za-z][\w./:-]*\d)\s*,").unwrap());
static MROUTE_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(ip multicast routing table|flags:|outgoing interface flags:|timers:|interface state:|rp\s|rpf\s|extranet|\(\*,\s*\*,\s*rp\))|^\s+\S+\s+-\s+\S",
    )
    .unwrap()
});

/// Cisco IOS style output
#[derive(Debug, Default, Clone, Copy)]
pub struct CiscoParser;

struct Candidate {
    vlan: Option<String>,
    address: String,
    is_local: Option<bool>,
}

fn local_port(port: &str) -> bool {
    LOCAL_QUERIER_PORTS.contains(&port.to_ascii_lowercase().as_str())
}

/// First candidate wins; others on its VLAN are reported as additional
fn pick_querier(candidates: Vec<Candidate>) -> QuerierRecord {
    let mut iter = candidates.into_iter();
    let Some(primary) = iter.next() else {
        return QuerierRecord::absent();
    };
    let mut record = QuerierRecord::active(primary.address.clone(), primary.is_local);
    for other in iter {
        if other.vlan == primary.vlan && other.address != primary.address && !record.additional.contains(&other.address)
        {
            record.additional.push(other.address);
        }
    }
    record
}

impl VendorParser for CiscoParser {
    fn vendor(&self) -> Vendor {
        Vendor::Cisco
    }

    fn parse_querier(&self, raw: &str) -> ParseOutcome<QuerierRecord> {
        if is_blank(raw) {
            return ParseOutcome::empty();
        }
        if is_rejection(raw) {
            return ParseOutcome::parsed(QuerierRecord::absent(), reject_all(CheckType::Querier, raw));
        }

        let mut tally = LineTally::default();
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut pending_vlan: Option<String> = None;

        for line in content_lines(raw) {
            tally.seen();
            if is_separator(line) || QUERIER_HEADER.is_match(line) || says_no_querier(line) {
                continue;
            }
            if let Some(caps) = QUERIER_ROW.captures(line) {
                match usable_address(&caps[2]) {
                    Some(address) => candidates.push(Candidate {
                        vlan: Some(caps[1].to_string()),
                        address,
                        is_local: caps.get(4).map(|p| local_port(p.as_str())),
                    }),
                    None if parse_ipv4(&caps[2]).is_none() => tally.malformed(line),
                    None => {}
                }
                continue;
            }
            if let Some(caps) = ELECTED.captures(line) {
                if let Some(address) = usable_address(&caps[1]) {
                    candidates.push(Candidate {
                        vlan: pending_vlan.clone(),
                        address,
                        is_local: caps.get(2).map(|p| local_port(p.as_str())),
                    });
                }
                continue;
            }
            if let Some(caps) = KEY_VALUE.captures(line) {
                let key = caps[1].to_ascii_lowercase();
                // "query-interval (sec)" and friends
                let key = key.split('(').next().unwrap_or_default().trim();
                let value = caps[2].trim();
                match key {
                    "vlan" | "vlan id" => pending_vlan = Some(value.to_string()),
                    "ip address" | "querier address" | "querier ip address" => {
                        if let Some(address) = usable_address(value) {
                            candidates.push(Candidate {
                                vlan: pending_vlan.clone(),
                                address,
                                is_local: None,
                            });
                        } else if looks_like_ipv4(value) && parse_ipv4(value).is_none() {
                            tally.malformed(line);
                        }
                    }
                    "port" => {
                        if let Some(last) = candidates.last_mut() {
                            last.is_local = Some(local_port(value));
                        }
                    }
                    known if CISCO_QUERIER_INFO_KEYS.contains(&known) => {}
                    _ => tally.malformed(line),
                }
                continue;
            }
            tally.malformed(line);
        }

        ParseOutcome::parsed(pick_querier(candidates), tally.into_failure(CheckType::Querier))
    }

    fn parse_groups(&self, raw: &str) -> ParseOutcome<Vec<GroupMembershipRecord>> {
        if is_blank(raw) {
            return ParseOutcome::empty();
        }
        if is_rejection(raw) {
            return ParseOutcome::parsed(Vec::new(), reject_all(CheckType::Groups, raw));
        }

        let mut tally = LineTally::default();
        let mut records = Vec::new();

        for line in content_lines(raw) {
            tally.seen();
            if is_separator(line) || GROUP_NOISE.is_match(line) {
                continue;
            }
            let Some(caps) = GROUP_ROW.captures(line) else {
                tally.malformed(line);
                continue;
            };
            let Some(group) = parse_ipv4(&caps[1]).filter(|ip| ip.is_multicast()) else {
                tally.malformed(line);
                continue;
            };
            let interfaces = caps
                .get(2)
                .map(|i| i.as_str())
                .filter(|i| !is_null_interface(i) && !i.contains(':'))
                .map(|i| vec![i.to_string()])
                .unwrap_or_default();
            records.push(GroupMembershipRecord::new(group.to_string(), interfaces));
        }

        ParseOutcome::parsed(merge_memberships(records), tally.into_failure(CheckType::Groups))
    }

    fn parse_routes(&self, raw: &str) -> ParseOutcome<Vec<RouteRecord>> {
        if is_blank(raw) {
            return ParseOutcome::empty();
        }
        if is_rejection(raw) {
            return ParseOutcome::unsupported();
        }

        let mut tally = LineTally::default();
        let mut routes: Vec<RouteRecord> = Vec::new();
        let mut current: Option<RouteRecord> = None;
        let mut in_outgoing = false;

        for line in content_lines(raw) {
            tally.seen();
            if let Some(caps) = MROUTE_ENTRY.captures(line) {
                routes.extend(current.take());
                in_outgoing = false;
                let (source, group) = (&caps[1], &caps[2]);
                let source_ok = source == "*" || parse_ipv4(source).is_some();
                if !source_ok || !is_multicast_ipv4(group) {
                    tally.malformed(line);
                    continue;
                }
                current = Some(RouteRecord {
                    group_address: group.to_string(),
                    source_address: (source != "*").then(|| source.to_string()),
                    incoming_interface: None,
                    outgoing_interfaces: Vec::new(),
                });
                continue;
            }
            if MROUTE_NOISE.is_match(line) || is_separator(line) {
                continue;
            }
            let Some(route) = current.as_mut() else {
                tally.malformed(line);
                continue;
            };
            if let Some(caps) = MROUTE_INCOMING.captures(line) {
                in_outgoing = false;
                let iface = &caps[1];
                route.incoming_interface = (!is_null_interface(iface)).then(|| iface.to_string());
            } else if let Some(caps) = MROUTE_OUTGOING.captures(line) {
                in_outgoing = true;
                let inline = &caps[1];
                if !is_null_interface(inline) {
                    route.outgoing_interfaces.push(inline.trim_end_matches(',').to_string());
                }
            } else if let Some(caps) = MROUTE_OUT_IFACE.captures(line).filter(|_| in_outgoing) {
                route.outgoing_interfaces.push(caps[1].to_string());
            } else {
                tally.malformed(line);
            }
        }
        routes.extend(current);

        ParseOutcome::parsed(merge_routes(routes), tally.into_failure(CheckType::Routes))
    }
}
