//! Assembly of one cycle's multicast state from raw command output

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::parsers::{ParseOutcome, parser_for};
use crate::types::{CheckType, MulticastStateModel, ParseFailure, Vendor};

/// Raw text of the three commands of one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutputs {
    pub querier: String,
    pub groups: String,
    pub routes: String,
}

impl RawOutputs {
    pub fn get(&self, check: CheckType) -> &str {
        match check {
            CheckType::Querier => &self.querier,
            CheckType::Groups => &self.groups,
            CheckType::Routes => &self.routes,
        }
    }

    pub fn set(&mut self, check: CheckType, text: String) {
        match check {
            CheckType::Querier => self.querier = text,
            CheckType::Groups => self.groups = text,
            CheckType::Routes => self.routes = text,
        }
    }
}

/// Parse the three outputs with the vendor's grammar and merge them into one model
///
/// Malformed lines are queued as parse failures on the model; a section
/// where nothing parsed stays empty.
pub fn assemble(
    device_id: &str,
    vendor: Vendor,
    timestamp: DateTime<Utc>,
    querier_text: &str,
    groups_text: &str,
    routes_text: &str,
) -> Result<MulticastStateModel> {
    let parser = parser_for(vendor);
    let mut model = MulticastStateModel::new(device_id, vendor, timestamp);

    let querier = parser.parse(CheckType::Querier, querier_text).into_querier()?;
    model.querier = take(querier, &mut model.parse_failures);

    let groups = parser.parse(CheckType::Groups, groups_text).into_groups()?;
    for record in take(groups, &mut model.parse_failures) {
        match model.memberships.get_mut(&record.group_address) {
            Some(existing) => {
                for iface in record.interfaces {
                    crate::parsers::utils::push_unique(&mut existing.interfaces, &iface);
                }
            }
            None => {
                model.memberships.insert(record.group_address.clone(), record);
            }
        }
    }

    let routes = parser.parse(CheckType::Routes, routes_text).into_routes()?;
    model.routes_supported = routes.supported;
    for record in take(routes, &mut model.parse_failures) {
        model.routes.insert(record.key(), record);
    }

    tracing::debug!(
        device_id,
        %vendor,
        querier_present = model.querier.present,
        groups = model.memberships.len(),
        routes = model.routes.len(),
        routes_supported = model.routes_supported,
        parse_failures = model.parse_failures.len(),
        "assembled multicast state"
    );

    Ok(model)
}

/// Same as [`assemble`] for a collected [`RawOutputs`]
pub fn assemble_outputs(
    device_id: &str,
    vendor: Vendor,
    timestamp: DateTime<Utc>,
    raw: &RawOutputs,
) -> Result<MulticastStateModel> {
    assemble(device_id, vendor, timestamp, &raw.querier, &raw.groups, &raw.routes)
}

fn take<T>(outcome: ParseOutcome<T>, failures: &mut Vec<ParseFailure>) -> T {
    if let Some(failure) = outcome.failure {
        tracing::warn!(
            check = %failure.check,
            malformed_lines = failure.malformed_lines,
            sample = failure.sample.as_deref().unwrap_or(""),
            "unrecognized CLI output"
        );
        failures.push(failure);
    }
    outcome.value
}
