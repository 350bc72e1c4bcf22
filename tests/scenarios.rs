use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use mcast_inspector::catalog;
use mcast_inspector::config::MonitorConfig;
use mcast_inspector::report::{Presentation, Reporter};
use mcast_inspector::transport::Transport;
use mcast_inspector::{
    Category, CheckType, CycleReport, Error, Finding, Scheduler, SchedulerState, Severity, Vendor, assemble, evaluate,
    stop_channel,
};

fn ts() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
}

const CISCO_QUERIER: &str = "\
Vlan      IP Address     IGMP Version   Port
-------------------------------------------------------------
10        10.10.10.254   v2             Switch
";

const CISCO_GROUPS: &str = "\
IGMP Connected Group Membership
Group Address    Interface                Uptime    Expires   Last Reporter   Group Accounted
239.1.1.1        Gi1/0/5                  00:01:02  00:02:37  10.10.10.5
";

const CISCO_MROUTE_PRUNED: &str = "\
IP Multicast Routing Table
(*, 239.1.1.1), 00:05:12/stopped, RP 10.0.0.1, flags: SJC
  Incoming interface: Vlan10, RPF nbr 10.0.0.1
  Outgoing interface list:
    GigabitEthernet1/0/5, Forward/Sparse, 00:05:12/00:02:41
";

const CISCO_MROUTE_NULL: &str = "\
IP Multicast Routing Table
(*, 239.1.1.1), 00:05:12/stopped, RP 10.0.0.1, flags: SJC
  Incoming interface: Vlan10, RPF nbr 10.0.0.1
  Outgoing interface list: Null
";

const NETGEAR_QUERIER: &str = "\
VLAN 10 : IGMP Snooping querier status
----------------------------------------------
Operational State.............................. Non-Querier
Last Querier Address........................... 10.0.0.1
";

const NETGEAR_GROUPS: &str = "\
 VLAN ID  Group Address     Type      Interfaces
 -------  ---------------   -------   ------------------
 10       239.1.1.1         Dynamic   1/0/5
 10       239.1.1.2         Dynamic   1/0/6
";

const NETGEAR_NO_MROUTE: &str = "                  ^\n% Invalid input detected at '^' marker.\n";

#[test]
fn empty_cisco_querier_output_is_one_critical() {
    let model = assemble("sw1", Vendor::Cisco, ts(), "", CISCO_GROUPS, CISCO_MROUTE_PRUNED).unwrap();
    assert!(!model.querier.present);

    let findings = evaluate(&model, None);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Critical);
    assert_eq!(findings[0].category, Category::Querier);
}

#[test]
fn cisco_route_with_null_outgoing_list_floods() {
    let model = assemble("sw1", Vendor::Cisco, ts(), CISCO_QUERIER, CISCO_GROUPS, CISCO_MROUTE_NULL).unwrap();
    let findings = evaluate(&model, None);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Critical);
    assert_eq!(findings[0].category, Category::Flooding);
    assert_eq!(findings[0].group_address.as_deref(), Some("239.1.1.1"));
}

#[test]
fn healthy_cisco_switch_reports_nothing() {
    let model = assemble("sw1", Vendor::Cisco, ts(), CISCO_QUERIER, CISCO_GROUPS, CISCO_MROUTE_PRUNED).unwrap();
    assert!(model.parse_failures.is_empty());
    assert!(evaluate(&model, None).is_empty());
}

#[test]
fn netgear_without_route_table_never_floods() {
    let model = assemble("sw2", Vendor::Netgear, ts(), NETGEAR_QUERIER, NETGEAR_GROUPS, NETGEAR_NO_MROUTE).unwrap();
    assert!(!model.routes_supported);
    assert_eq!(model.memberships.len(), 2);
    assert!(model.parse_failures.is_empty());
    assert!(evaluate(&model, None).iter().all(|f| f.category != Category::Flooding));
}

#[test]
fn group_that_disappears_is_reported_once() {
    let previous = assemble("sw1", Vendor::Cisco, ts(), CISCO_QUERIER, CISCO_GROUPS, CISCO_MROUTE_PRUNED).unwrap();
    let current = assemble("sw1", Vendor::Cisco, ts(), CISCO_QUERIER, "", "").unwrap();

    let findings = evaluate(&current, Some(&previous));
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Info);
    assert_eq!(findings[0].category, Category::Membership);
    assert_eq!(findings[0].group_address.as_deref(), Some("239.1.1.1"));
}

#[test]
fn garbage_group_output_becomes_a_parse_error_finding() {
    let previous = assemble("sw1", Vendor::Cisco, ts(), CISCO_QUERIER, CISCO_GROUPS, CISCO_MROUTE_PRUNED).unwrap();
    let current = assemble(
        "sw1",
        Vendor::Cisco,
        ts(),
        CISCO_QUERIER,
        "<html>session expired</html>\n",
        CISCO_MROUTE_PRUNED,
    )
    .unwrap();
    assert!(current.has_failure(CheckType::Groups));

    let findings = evaluate(&current, Some(&previous));
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].category, Category::ParseError);
}

#[test]
fn partly_unreadable_route_table_reports_parse_error_not_flooding() {
    let routes = format!("Group 239.1.1.1 -> Gi1/0/5\n{CISCO_MROUTE_NULL}");
    let model = assemble("sw1", Vendor::Cisco, ts(), CISCO_QUERIER, CISCO_GROUPS, &routes).unwrap();
    assert_eq!(model.routes.len(), 1);
    assert!(model.has_failure(CheckType::Routes));

    let categories: Vec<_> = evaluate(&model, None).iter().map(|f| f.category).collect();
    assert_eq!(categories, vec![Category::ParseError]);
}

#[test]
fn netgear_local_querier_on_default_address_is_healthy() {
    let querier = "\
Querier Address................................ 0.0.0.0
VLAN 10 : IGMP Snooping querier status
Querier VLAN Address........................... 0.0.0.0
Operational State.............................. Querier
";
    let model = assemble("sw2", Vendor::Netgear, ts(), querier, NETGEAR_GROUPS, NETGEAR_NO_MROUTE).unwrap();
    assert!(model.querier.present);
    assert_eq!(model.querier.is_local, Some(true));
    assert!(evaluate(&model, None).is_empty());
}

/// Serves canned output keyed by command; anything else fails like a dead link
#[derive(Clone, Default)]
struct CannedSwitch {
    outputs: HashMap<String, String>,
}

impl CannedSwitch {
    fn with(mut self, vendor: Vendor, check: CheckType, text: &str) -> Self {
        self.outputs.insert(catalog::resolve(vendor, check).to_string(), text.to_string());
        self
    }
}

impl Transport for CannedSwitch {
    async fn execute(&self, device_id: &str, command: &str, _timeout: Duration) -> mcast_inspector::Result<String> {
        self.outputs
            .get(command)
            .cloned()
            .ok_or_else(|| Error::transport(device_id, command, "no route to host"))
    }
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<CycleReport>>>);

impl Presentation for Recorder {
    fn render(&mut self, cycle_timestamp: DateTime<Utc>, device_id: &str, findings: Vec<Finding>) {
        self.0.lock().unwrap().push(Reporter::create_report(cycle_timestamp, device_id, findings));
    }
}

#[tokio::test]
async fn zero_interval_runs_exactly_one_cycle() {
    let switch = CannedSwitch::default()
        .with(Vendor::Cisco, CheckType::Querier, CISCO_QUERIER)
        .with(Vendor::Cisco, CheckType::Groups, CISCO_GROUPS)
        .with(Vendor::Cisco, CheckType::Routes, CISCO_MROUTE_PRUNED);
    let recorder = Recorder::default();
    let reports = recorder.0.clone();

    let scheduler = Scheduler::new(MonitorConfig::new("10.0.0.5", Vendor::Cisco, 0), switch, recorder).unwrap();
    assert_eq!(scheduler.state(), SchedulerState::Idle);

    let (_stop, rx) = stop_channel();
    let summary = scheduler.run(rx).await.unwrap();
    assert_eq!(summary.cycles, 1);
    assert_eq!(summary.final_state, SchedulerState::Stopped);

    let reports = reports.lock().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].device_id, "10.0.0.5");
    assert!(reports[0].findings.is_empty());
}

#[tokio::test(start_paused = true)]
async fn second_cycle_sees_the_first_as_previous() {
    let switch = CannedSwitch::default()
        .with(Vendor::Netgear, CheckType::Querier, NETGEAR_QUERIER)
        .with(Vendor::Netgear, CheckType::Groups, NETGEAR_GROUPS)
        .with(Vendor::Netgear, CheckType::Routes, NETGEAR_NO_MROUTE);
    let mut scheduler = Scheduler::new(MonitorConfig::new("sw2", Vendor::Netgear, 10), switch, Recorder::default()).unwrap();

    scheduler.run_cycle().await.unwrap();
    scheduler.run_cycle().await.unwrap();
    assert_eq!(scheduler.cycles(), 2);

    let previous = scheduler.previous().unwrap();
    assert_eq!(previous.querier.address.as_deref(), Some("10.0.0.1"));
    assert!(!previous.routes_supported);
}

#[tokio::test]
async fn unreachable_switch_only_loses_its_querier() {
    let recorder = Recorder::default();
    let reports = recorder.0.clone();
    let scheduler =
        Scheduler::new(MonitorConfig::new("sw3", Vendor::Netgear, 0), CannedSwitch::default(), recorder).unwrap();

    let (_stop, rx) = stop_channel();
    scheduler.run(rx).await.unwrap();

    let reports = reports.lock().unwrap();
    let categories: Vec<_> = reports[0].findings.iter().map(|f| f.category).collect();
    assert_eq!(categories, vec![Category::Querier]);
}
