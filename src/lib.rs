// src/lib.rs
pub mod monitor {
    use tokio::sync::watch;

    use crate::config::MonitorConfig;
    use crate::report::{ReportFormat, Reporter};
    use crate::scheduler::{RunSummary, Scheduler};
    use crate::transport::Transport;

    pub struct Options {
        pub config: MonitorConfig,
        pub format: ReportFormat,
    }

    /// Async entry-point; returns after a single cycle (interval 0) or once `stop` is raised
    pub async fn run<T: Transport>(opts: Options, transport: T, stop: watch::Receiver<bool>) -> anyhow::Result<RunSummary> {
        let scheduler = Scheduler::new(opts.config, transport, Reporter::new(opts.format))?;
        Ok(scheduler.run(stop).await?)
    }
}

pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod model;
pub mod parsers;
pub mod report;
pub mod scheduler;
pub mod transport;
pub mod types;
pub mod validator;

pub use error::{Error, Result};
pub use model::{RawOutputs, assemble, assemble_outputs};
pub use scheduler::{RunSummary, Scheduler, SchedulerState, stop_channel};
pub use types::{
    Category, CheckType, CycleReport, Finding, GroupMembershipRecord, MulticastStateModel, ParseFailure,
    QuerierRecord, RouteRecord, Severity, Vendor,
};
pub use validator::evaluate;
