//! Netgear ProSAFE / FASTPATH grammar
//!
//! Querier state is printed as dotted `Key....... Value` pairs grouped in
//! per-VLAN blocks. Group and route tables are whitespace separated rows.
//! Several SKUs lack `show ip mroute` entirely.

use std::sync::LazyLock;

use regex::Regex;

use super::utils::{
    LineTally, content_lines, is_blank, is_multicast_ipv4, is_null_interface, is_rejection, is_separator,
    looks_like_ipv4, merge_memberships, merge_routes, parse_ipv4, push_unique, reject_all, says_no_querier,
    usable_address,
};
use super::{ParseOutcome, VendorParser};
use crate::constants::NETGEAR_QUERIER_INFO_KEYS;
use crate::types::{CheckType, GroupMembershipRecord, QuerierRecord, RouteRecord, Vendor};

static DOTTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(.+?)\s*\.{2,}\s*(.*?)\s*$").unwrap());
static VLAN_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^\s*vlan\s+(\d+)\s*:").unwrap());
static QUERIER_NOISE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)querier\s+status\s*$").unwrap());

static PORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+/\d+(?:/\d+)?|lag\d+|ch\d+|po\d+|vlan\d+)$").unwrap());
static LAG_SPACED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\blag\s+(\d+)").unwrap());
static GROUP_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        // column headers: nothing but header words
        r"(?i)^\s*(?:(?:vlan|id|group|address|ip|mac|type|interfaces?|ports?|source|filter|mode|expires?|uptime|version)\s*)+$",
        // table titles
        r"|(?i)^\s*(?:igmp\s+snooping\s+)?(?:multicast\s+)?group\s+(?:membership\s+)?(?:table|entries|information)\s*$",
        // summaries
        r"|(?i)^\s*(?:total\s+(?:number\s+of\s+)?|number\s+of\s+)(?:entries|groups)\s*[:.]*\s*\d+\s*$",
    ))
    .unwrap()
});

static ROUTE_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\*|\d{1,3}(?:\.\d{1,3}){3})\s+(\d{1,3}(?:\.\d{1,3}){3})\s+(\S+)\s*(.*)$").unwrap()
});
static ROUTE_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^\s*(?:(?:source|group|ip|address|incoming|outgoing|interfaces?|list|rpf|neighbor|flags)\s*)+$",
        r"|(?i)^\s*(?:ip\s+)?multicast\s+rout(?:e|ing)\s+table(?:\s+summary)?\s*$",
        r"|(?i)^\s*total\s+(?:number\s+of\s+)?(?:entries|routes)\s*[:.]*\s*\d+\s*$",
    ))
    .unwrap()
});

/// Netgear FASTPATH style output
#[derive(Debug, Default, Clone, Copy)]
pub struct NetgearParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperState {
    Querier,
    NonQuerier,
    Inactive,
}

#[derive(Debug, Default)]
struct VlanBlock {
    vlan: Option<String>,
    state: Option<OperState>,
    own_address: Option<String>,
    last_querier: Option<String>,
}

impl VlanBlock {
    /// (address, is_local) of whoever queries this VLAN
    fn querier(&self, global_address: Option<&String>) -> Option<(Option<String>, bool)> {
        match self.state? {
            // both addresses left at 0.0.0.0: the switch queries from its own interface
            OperState::Querier => Some((self.own_address.clone().or_else(|| global_address.cloned()), true)),
            OperState::NonQuerier => self.last_querier.clone().map(|a| (Some(a), false)),
            OperState::Inactive => None,
        }
    }
}

fn oper_state(value: &str) -> OperState {
    match value.to_ascii_lowercase().replace(['-', ' '], "").as_str() {
        "querier" | "active" => OperState::Querier,
        "nonquerier" => OperState::NonQuerier,
        _ => OperState::Inactive,
    }
}

fn port_tokens(line: &str) -> Vec<String> {
    let joined = LAG_SPACED.replace_all(line, "lag$1");
    joined
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(|t| t.trim_start_matches("Fwd:").trim_start_matches("fwd:"))
        .filter(|t| PORT.is_match(t))
        .map(str::to_string)
        .collect()
}

/// Ports of a wrapped interface list; `None` unless the line holds nothing else
fn continuation_ports(line: &str) -> Option<Vec<String>> {
    let joined = LAG_SPACED.replace_all(line, "lag$1");
    let tokens: Vec<&str> = joined
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(|t| t.trim_start_matches("Fwd:").trim_start_matches("fwd:"))
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() || !tokens.iter().all(|t| PORT.is_match(t)) {
        return None;
    }
    Some(tokens.into_iter().map(str::to_string).collect())
}

impl VendorParser for NetgearParser {
    fn vendor(&self) -> Vendor {
        Vendor::Netgear
    }

    fn parse_querier(&self, raw: &str) -> ParseOutcome<QuerierRecord> {
        if is_blank(raw) {
            return ParseOutcome::empty();
        }
        if is_rejection(raw) {
            return ParseOutcome::parsed(QuerierRecord::absent(), reject_all(CheckType::Querier, raw));
        }

        let mut tally = LineTally::default();
        let mut blocks: Vec<VlanBlock> = vec![VlanBlock::default()];
        let mut global_address: Option<String> = None;
        let mut global_enabled = false;

        for line in content_lines(raw) {
            tally.seen();
            if let Some(caps) = VLAN_BLOCK.captures(line) {
                blocks.push(VlanBlock {
                    vlan: Some(caps[1].to_string()),
                    ..VlanBlock::default()
                });
                continue;
            }
            if is_separator(line) || QUERIER_NOISE.is_match(line) || says_no_querier(line) {
                continue;
            }
            let Some(caps) = DOTTED.captures(line) else {
                tally.malformed(line);
                continue;
            };
            let key = caps[1].to_ascii_lowercase();
            let value = caps[2].to_string();
            if looks_like_ipv4(&value) && parse_ipv4(&value).is_none() {
                tally.malformed(line);
                continue;
            }
            let Some(block) = blocks.last_mut() else { continue };
            match key.as_str() {
                "operational state" => block.state = Some(oper_state(&value)),
                "querier vlan address" => block.own_address = usable_address(&value),
                "last querier address" => block.last_querier = usable_address(&value),
                "querier address" => global_address = usable_address(&value),
                "igmp snooping querier mode" | "querier mode" | "admin mode" => {
                    if block.vlan.is_none() {
                        global_enabled = value.eq_ignore_ascii_case("enable") || value.eq_ignore_ascii_case("enabled");
                    }
                }
                known if NETGEAR_QUERIER_INFO_KEYS.contains(&known) => {}
                _ => tally.malformed(line),
            }
        }

        let mut candidates: Vec<(Option<String>, Option<String>, bool)> = blocks
            .iter()
            .filter_map(|b| b.querier(global_address.as_ref()).map(|(a, local)| (b.vlan.clone(), a, local)))
            .collect();
        let has_vlan_state = blocks.iter().any(|b| b.state.is_some());
        if candidates.is_empty() && !has_vlan_state && global_enabled {
            if let Some(address) = global_address.clone() {
                candidates.push((None, Some(address), true));
            }
        }

        let record = match candidates.split_first() {
            None => QuerierRecord::absent(),
            Some(((vlan, address, local), rest)) => {
                let mut record = match address {
                    Some(address) => QuerierRecord::active(address.clone(), Some(*local)),
                    None => QuerierRecord::unaddressed(Some(*local)),
                };
                for (other_vlan, other, _) in rest {
                    let Some(other) = other else { continue };
                    if other_vlan == vlan && Some(other) != address.as_ref() && !record.additional.contains(other) {
                        record.additional.push(other.clone());
                    }
                }
                record
            }
        };

        ParseOutcome::parsed(record, tally.into_failure(CheckType::Querier))
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
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if let Some(group) = tokens.iter().filter_map(|t| parse_ipv4(t)).find(|ip| ip.is_multicast()) {
                records.push(GroupMembershipRecord::new(group.to_string(), port_tokens(line)));
                continue;
            }
            if let (Some(last), Some(ports)) = (records.last_mut(), continuation_ports(line)) {
                for port in ports {
                    push_unique(&mut last.interfaces, &port);
                }
                continue;
            }
            let mentions_ip = tokens.iter().any(|t| looks_like_ipv4(t.trim_end_matches(',')));
            if !mentions_ip && (is_separator(line) || GROUP_NOISE.is_match(line)) {
                continue;
            }
            tally.malformed(line);
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
        let mut routes = Vec::new();

        for line in content_lines(raw) {
            tally.seen();
            if let Some(caps) = ROUTE_ROW.captures(line) {
                let (source, group, incoming) = (&caps[1], &caps[2], &caps[3]);
                if !is_multicast_ipv4(group) || (source != "*" && parse_ipv4(source).is_none()) {
                    tally.malformed(line);
                    continue;
                }
                let outgoing = caps[4]
                    .split(|c: char| c.is_whitespace() || c == ',')
                    .filter(|t| !is_null_interface(t))
                    .map(str::to_string)
                    .collect();
                routes.push(RouteRecord {
                    group_address: group.to_string(),
                    source_address: (source != "*").then(|| source.to_string()),
                    incoming_interface: (!is_null_interface(incoming)).then(|| incoming.to_string()),
                    outgoing_interfaces: outgoing,
                });
                continue;
            }
            if is_separator(line) || ROUTE_NOISE.is_match(line) {
                continue;
            }
            tally.malformed(line);
        }

        ParseOutcome::parsed(merge_routes(routes), tally.into_failure(CheckType::Routes))
    }
}
