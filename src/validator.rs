//! Health rules evaluated against one cycle's multicast state
//!
//! Every rule runs independently and a model may trip several. Rules skip
//! silently when the data they need is missing.

use crate::parsers::interfaces_match;
use crate::types::{Category, CheckType, Finding, MulticastStateModel, Severity};

/// Findings for `current`, using `previous` for the delta rules
///
/// Pure and deterministic. Output is ordered by category (querier,
/// flooding, membership, parse_error) and by discovery within a category.
pub fn evaluate(current: &MulticastStateModel, previous: Option<&MulticastStateModel>) -> Vec<Finding> {
    let mut findings = Vec::new();

    check_no_querier(current, &mut findings);
    check_querier_flap(current, previous, &mut findings);
    check_multiple_queriers(current, &mut findings);
    check_flooding(current, &mut findings);
    check_membership_churn(current, previous, &mut findings);
    check_parse_failures(current, &mut findings);

    // stable: keeps discovery order inside a category
    findings.sort_by_key(|f| f.category.priority());
    findings
}

fn check_no_querier(model: &MulticastStateModel, out: &mut Vec<Finding>) {
    if model.querier.present {
        return;
    }
    out.push(Finding::new(
        Severity::Critical,
        Category::Querier,
        format!(
            "No active IGMP querier on {}: membership reports will age out and multicast streams stop",
            model.device_id
        ),
    ));
}

fn check_querier_flap(current: &MulticastStateModel, previous: Option<&MulticastStateModel>, out: &mut Vec<Finding>) {
    let Some(previous) = previous else { return };
    if !current.querier.present || !previous.querier.present {
        return;
    }
    let (Some(now), Some(before)) = (&current.querier.address, &previous.querier.address) else {
        return;
    };
    if now != before {
        out.push(Finding::new(
            Severity::Warning,
            Category::Querier,
            format!("IGMP querier on {} changed from {before} to {now}", current.device_id),
        ));
    }
}

fn check_multiple_queriers(model: &MulticastStateModel, out: &mut Vec<Finding>) {
    if !model.querier.present || model.querier.additional.is_empty() {
        return;
    }
    let primary = model.querier.address.as_deref().unwrap_or("unknown");
    out.push(Finding::new(
        Severity::Warning,
        Category::Querier,
        format!(
            "Multiple IGMP queriers on {}: {primary} and {}",
            model.device_id,
            model.querier.additional.join(", ")
        ),
    ));
}

fn check_flooding(model: &MulticastStateModel, out: &mut Vec<Finding>) {
    // an unsupported or unreadable route table says nothing about pruning
    if !model.routes_supported || model.has_failure(CheckType::Routes) {
        return;
    }
    for membership in model.memberships.values() {
        if membership.interfaces.is_empty() {
            continue;
        }
        let group = &membership.group_address;
        let mut routes = model.routes_for(group).peekable();
        if routes.peek().is_none() {
            out.push(
                Finding::new(
                    Severity::Critical,
                    Category::Flooding,
                    format!(
                        "Group {group} has members on {} but no multicast route: traffic is flooded to every port",
                        membership.interfaces.join(", ")
                    ),
                )
                .for_group(group),
            );
            continue;
        }
        let pruned = routes.any(|route| {
            route
                .outgoing_interfaces
                .iter()
                .any(|out_if| membership.interfaces.iter().any(|member| interfaces_match(out_if, member)))
        });
        if !pruned {
            out.push(
                Finding::new(
                    Severity::Critical,
                    Category::Flooding,
                    format!(
                        "Group {group} has members on {} but its routes forward to none of them: pruning has failed",
                        membership.interfaces.join(", ")
                    ),
                )
                .for_group(group),
            );
        }
    }
}

fn check_membership_churn(
    current: &MulticastStateModel,
    previous: Option<&MulticastStateModel>,
    out: &mut Vec<Finding>,
) {
    let Some(previous) = previous else { return };
    // a section that failed to parse looks empty; that is not churn
    if current.has_failure(CheckType::Groups) {
        return;
    }
    for group in previous.memberships.keys() {
        if !current.memberships.contains_key(group) {
            out.push(
                Finding::new(
                    Severity::Info,
                    Category::Membership,
                    format!("Group {group} is no longer joined on {}: the stream stopped or went idle", current.device_id),
                )
                .for_group(group),
            );
        }
    }
}

fn check_parse_failures(model: &MulticastStateModel, out: &mut Vec<Finding>) {
    for failure in &model.parse_failures {
        let mut message = format!(
            "Could not read {} output from {}: {} of {} lines unrecognized",
            failure.check, model.device_id, failure.malformed_lines, failure.total_lines
        );
        if let Some(sample) = &failure.sample {
            message.push_str(&format!(" (first: \"{sample}\")"));
        }
        out.push(Finding::new(Severity::Warning, Category::ParseError, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GroupMembershipRecord, ParseFailure, QuerierRecord, RouteRecord, Vendor};
    use chrono::{TimeZone, Utc};

    fn model() -> MulticastStateModel {
        let mut m = MulticastStateModel::new("sw1", Vendor::Cisco, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
        m.querier = QuerierRecord::active("10.0.0.1", Some(true));
        m
    }

    fn member(m: &mut MulticastStateModel, group: &str, ifaces: &[&str]) {
        m.memberships.insert(
            group.to_string(),
            GroupMembershipRecord::new(group, ifaces.iter().map(|s| s.to_string()).collect()),
        );
    }

    fn route(m: &mut MulticastStateModel, group: &str, out: &[&str]) {
        let r = RouteRecord {
            group_address: group.to_string(),
            source_address: None,
            incoming_interface: Some("Vlan10".into()),
            outgoing_interfaces: out.iter().map(|s| s.to_string()).collect(),
        };
        m.routes.insert(r.key(), r);
    }

    #[test]
    fn healthy_model_has_no_findings() {
        let mut m = model();
        member(&mut m, "239.1.1.1", &["Gi1/0/5"]);
        route(&mut m, "239.1.1.1", &["GigabitEthernet1/0/5"]);
        assert!(evaluate(&m, None).is_empty());
    }

    #[test]
    fn missing_querier_is_one_critical() {
        let mut m = model();
        m.querier = QuerierRecord::absent();
        let findings = evaluate(&m, Some(&model()));
        let querier: Vec<_> = findings.iter().filter(|f| f.category == Category::Querier).collect();
        assert_eq!(querier.len(), 1);
        assert_eq!(querier[0].severity, Severity::Critical);
    }

    #[test]
    fn querier_address_change_is_a_flap() {
        let previous = model();
        let mut current = model();
        current.querier = QuerierRecord::active("10.0.0.9", Some(false));
        let findings = evaluate(&current, Some(&previous));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert!(findings[0].message.contains("10.0.0.1") && findings[0].message.contains("10.0.0.9"));
    }

    #[test]
    fn duplicate_queriers_warn() {
        let mut m = model();
        m.querier.additional.push("10.0.0.2".into());
        let findings = evaluate(&m, None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, Category::Querier);
        assert_eq!(findings[0].severity, Severity::Warning);
    }

    #[test]
    fn route_without_outgoing_interfaces_floods() {
        let mut m = model();
        member(&mut m, "239.1.1.1", &["Gi1/0/5"]);
        route(&mut m, "239.1.1.1", &[]);
        let findings = evaluate(&m, None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, Category::Flooding);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].group_address.as_deref(), Some("239.1.1.1"));
    }

    #[test]
    fn members_without_any_route_flood() {
        let mut m = model();
        member(&mut m, "239.1.1.1", &["Gi1/0/5"]);
        route(&mut m, "239.9.9.9", &["Gi1/0/5"]);
        let findings = evaluate(&m, None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].group_address.as_deref(), Some("239.1.1.1"));
    }

    #[test]
    fn route_to_other_ports_floods() {
        let mut m = model();
        member(&mut m, "239.1.1.1", &["Gi1/0/5"]);
        route(&mut m, "239.1.1.1", &["Gi1/0/6"]);
        assert_eq!(evaluate(&m, None)[0].category, Category::Flooding);
    }

    #[test]
    fn group_without_members_is_not_checked() {
        let mut m = model();
        member(&mut m, "239.1.1.1", &[]);
        assert!(evaluate(&m, None).is_empty());
    }

    #[test]
    fn unsupported_routes_never_flood() {
        let mut m = model();
        m.routes_supported = false;
        member(&mut m, "239.1.1.1", &["1/0/5"]);
        member(&mut m, "239.1.1.2", &["1/0/6"]);
        assert!(evaluate(&m, None).iter().all(|f| f.category != Category::Flooding));
    }

    #[test]
    fn unreadable_route_table_never_floods() {
        let mut m = model();
        member(&mut m, "239.1.1.1", &["Gi1/0/5"]);
        route(&mut m, "239.9.9.9", &["Gi1/0/9"]);
        m.parse_failures.push(ParseFailure {
            check: CheckType::Routes,
            malformed_lines: 1,
            total_lines: 6,
            sample: Some("Group 239.1.1.1 -> Gi1/0/5".into()),
        });
        let findings = evaluate(&m, None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, Category::ParseError);
    }

    #[test]
    fn vanished_group_is_churn_only() {
        let mut previous = model();
        member(&mut previous, "239.5.5.5", &["Gi1/0/2"]);
        route(&mut previous, "239.5.5.5", &["Gi1/0/2"]);
        let current = model();
        let findings = evaluate(&current, Some(&previous));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Info);
        assert_eq!(findings[0].category, Category::Membership);
        assert_eq!(findings[0].group_address.as_deref(), Some("239.5.5.5"));
    }

    #[test]
    fn findings_follow_category_priority() {
        let mut m = model();
        m.querier = QuerierRecord::absent();
        m.parse_failures.push(ParseFailure {
            check: CheckType::Querier,
            malformed_lines: 2,
            total_lines: 3,
            sample: Some("???".into()),
        });
        member(&mut m, "239.1.1.1", &["Gi1/0/5"]);
        let mut previous = model();
        member(&mut previous, "239.1.1.1", &["Gi1/0/5"]);
        member(&mut previous, "239.7.7.7", &["Gi1/0/7"]);

        let categories: Vec<_> = evaluate(&m, Some(&previous)).iter().map(|f| f.category).collect();
        assert_eq!(
            categories,
            vec![Category::Querier, Category::Flooding, Category::Membership, Category::ParseError]
        );
    }

    #[test]
    fn evaluation_is_deterministic() {
        let mut m = model();
        member(&mut m, "239.1.1.1", &["Gi1/0/5"]);
        member(&mut m, "239.1.1.2", &["Gi1/0/6"]);
        let mut previous = model();
        member(&mut previous, "239.3.3.3", &["Gi1/0/1"]);
        assert_eq!(evaluate(&m, Some(&previous)), evaluate(&m, Some(&previous)));
    }
}
