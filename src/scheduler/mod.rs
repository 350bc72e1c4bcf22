//! Polling scheduler: drives transport, parsing, validation and reporting
//!
//! ## States
//!
//! `Idle -> Running -> (Sleeping -> Running)* -> Stopped`
//!
//! - One cycle runs to completion before anything else happens
//! - Interval 0 stops after the first cycle
//! - A stop signal ends a sleep immediately, never a cycle halfway

use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use crate::catalog;
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::model::{RawOutputs, assemble_outputs};
use crate::report::Presentation;
use crate::transport::Transport;
use crate::types::{CheckType, Finding, MulticastStateModel};
use crate::validator::evaluate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Sleeping,
    Stopped,
}

/// What a finished run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub final_state: SchedulerState,
}

/// Sender half used to stop a running scheduler
pub type StopHandle = watch::Sender<bool>;

/// Fresh stop signal pair
pub fn stop_channel() -> (StopHandle, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Sequential poller for one device
pub struct Scheduler<T, P> {
    config: MonitorConfig,
    transport: T,
    presentation: P,
    state: SchedulerState,
    previous: Option<MulticastStateModel>,
    cycles: u64,
}

impl<T: Transport, P: Presentation> Scheduler<T, P> {
    /// Accept a configuration; fails fast if it is unusable
    pub fn new(config: MonitorConfig, transport: T, presentation: P) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            presentation,
            state: SchedulerState::Idle,
            previous: None,
            cycles: 0,
        })
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Model retained from the last cycle
    pub fn previous(&self) -> Option<&MulticastStateModel> {
        self.previous.as_ref()
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    fn transition(&mut self, next: SchedulerState) {
        tracing::debug!(device_id = %self.config.device_id, from = ?self.state, to = ?next, "scheduler state");
        self.state = next;
    }

    /// Run cycles until interval 0 completes one, or `stop` fires
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> Result<RunSummary> {
        let interval = Duration::from_secs(self.config.poll_interval_seconds);
        tracing::info!(
            device_id = %self.config.device_id,
            vendor = %self.config.vendor,
            interval_secs = self.config.poll_interval_seconds,
            "starting multicast monitor"
        );

        while !*stop.borrow() {
            self.transition(SchedulerState::Running);
            self.run_cycle().await?;

            if self.config.run_once() {
                break;
            }

            self.transition(SchedulerState::Sleeping);
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = stopped(&mut stop) => break,
            }
        }

        self.transition(SchedulerState::Stopped);
        tracing::info!(device_id = %self.config.device_id, cycles = self.cycles, "multicast monitor stopped");
        Ok(RunSummary {
            cycles: self.cycles,
            final_state: self.state,
        })
    }

    /// One complete cycle: fetch, assemble, evaluate, render
    pub async fn run_cycle(&mut self) -> Result<()> {
        let timestamp = Utc::now();
        let raw = self.collect().await;
        let model = assemble_outputs(&self.config.device_id, self.config.vendor, timestamp, &raw)?;
        let findings: Vec<Finding> = evaluate(&model, self.previous.as_ref());

        tracing::info!(
            device_id = %self.config.device_id,
            cycle = self.cycles + 1,
            findings = findings.len(),
            "cycle complete"
        );
        self.presentation.render(timestamp, &self.config.device_id, findings);

        self.previous = Some(model);
        self.cycles += 1;
        Ok(())
    }

    /// The three commands run concurrently; failures become empty text
    async fn collect(&self) -> RawOutputs {
        let timeout = Duration::from_secs(self.config.command_timeout_secs);
        let (querier, groups, routes) = tokio::join!(
            self.fetch(CheckType::Querier, timeout),
            self.fetch(CheckType::Groups, timeout),
            self.fetch(CheckType::Routes, timeout),
        );
        RawOutputs { querier, groups, routes }
    }

    async fn fetch(&self, check: CheckType, timeout: Duration) -> String {
        let command = catalog::resolve(self.config.vendor, check);
        match self.transport.execute(&self.config.device_id, command, timeout).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    device_id = %self.config.device_id,
                    %check,
                    command,
                    error = %e,
                    "command failed, treating output as empty"
                );
                String::new()
            }
        }
    }
}

/// Resolves once the stop flag is raised; never if the sender is gone
async fn stopped(stop: &mut watch::Receiver<bool>) {
    if stop.wait_for(|flag| *flag).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::{Category, Vendor};
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct FakeSwitch {
        outputs: HashMap<&'static str, &'static str>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl Transport for FakeSwitch {
        async fn execute(&self, device_id: &str, command: &str, _timeout: Duration) -> Result<String> {
            self.calls.lock().unwrap().push(command.to_string());
            self.outputs
                .get(command)
                .map(|s| s.to_string())
                .ok_or_else(|| Error::transport(device_id, command, "connection reset"))
        }
    }

    #[derive(Default)]
    struct Collect(Vec<(String, Vec<Finding>)>);

    impl Presentation for Collect {
        fn render(&mut self, _ts: DateTime<Utc>, device_id: &str, findings: Vec<Finding>) {
            self.0.push((device_id.to_string(), findings));
        }
    }

    #[tokio::test]
    async fn run_once_executes_a_single_cycle() {
        let switch = FakeSwitch::default();
        let calls = switch.calls.clone();
        let scheduler = Scheduler::new(MonitorConfig::new("sw1", Vendor::Cisco, 0), switch, Collect::default()).unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        let (_stop, rx) = stop_channel();
        let summary = scheduler.run(rx).await.unwrap();
        assert_eq!(summary, RunSummary { cycles: 1, final_state: SchedulerState::Stopped });
        assert_eq!(calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn transport_failures_still_complete_the_cycle() {
        let mut scheduler =
            Scheduler::new(MonitorConfig::new("sw1", Vendor::Cisco, 0), FakeSwitch::default(), Collect::default())
                .unwrap();
        scheduler.run_cycle().await.unwrap();

        let rendered = &scheduler.presentation().0;
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].0, "sw1");
        assert_eq!(rendered[0].1.len(), 1);
        assert_eq!(rendered[0].1[0].category, Category::Querier);
        assert!(scheduler.previous().is_some());
    }

    #[tokio::test]
    async fn invalid_config_is_fatal() {
        let res = Scheduler::new(MonitorConfig::new("bad host!", Vendor::Cisco, 0), FakeSwitch::default(), Collect::default());
        assert!(matches!(res, Err(Error::InvalidConfig(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_signal_ends_the_sleep() {
        let scheduler =
            Scheduler::new(MonitorConfig::new("sw1", Vendor::Netgear, 30), FakeSwitch::default(), Collect::default())
                .unwrap();
        let (stop, rx) = stop_channel();
        let handle = tokio::spawn(scheduler.run(rx));

        tokio::time::sleep(Duration::from_secs(65)).await;
        stop.send(true).unwrap();
        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.final_state, SchedulerState::Stopped);
        assert_eq!(summary.cycles, 3);
    }

    #[tokio::test]
    async fn already_stopped_runs_nothing() {
        let scheduler =
            Scheduler::new(MonitorConfig::new("sw1", Vendor::Cisco, 5), FakeSwitch::default(), Collect::default())
                .unwrap();
        let (stop, rx) = stop_channel();
        stop.send(true).unwrap();
        let summary = scheduler.run(rx).await.unwrap();
        assert_eq!(summary.cycles, 0);
        assert_eq!(summary.final_state, SchedulerState::Stopped);
    }
}
