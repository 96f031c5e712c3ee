//! # mesh-services
//!
//! The four insurance agents that make up the demo mesh. Each builds an
//! [`ActionRegistry`]; serve it with `mesh_registry::AgentServer` or wrap it
//! in a `LocalAgent`.
//!
//! | Agent          | Port | Actions |
//! |----------------|------|---------|
//! | `policy`       | 7871 | 7       |
//! | `claims`       | 7872 | 8       |
//! | `underwriting` | 7873 | 6       |
//! | `customer`     | 7874 | 9       |
//!
//! Responses are mock text. New record numbers come from the context's
//! [`IdGenerator`](mesh_core::IdGenerator).

pub mod claims;
pub mod context;
pub mod customer;
pub mod policy;
pub mod underwriting;

pub use context::{Clock, FixedClock, ServiceContext, SystemClock};

use chrono::{Months, NaiveDate};
use mesh_core::MeshError;
use mesh_registry::ActionRegistry;
use std::fmt;
use std::str::FromStr;

/// One of the insurance agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Policy,
    Claims,
    Underwriting,
    Customer,
}

impl Service {
    pub const ALL: [Service; 4] = [
        Service::Policy,
        Service::Claims,
        Service::Underwriting,
        Service::Customer,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Service::Policy => policy::AGENT_ID,
            Service::Claims => claims::AGENT_ID,
            Service::Underwriting => underwriting::AGENT_ID,
            Service::Customer => customer::AGENT_ID,
        }
    }

    /// Conventional local port.
    pub fn default_port(&self) -> u16 {
        match self {
            Service::Policy => 7871,
            Service::Claims => 7872,
            Service::Underwriting => 7873,
            Service::Customer => 7874,
        }
    }

    pub fn registry(&self, ctx: &ServiceContext) -> Result<ActionRegistry, MeshError> {
        match self {
            Service::Policy => policy::registry(ctx),
            Service::Claims => claims::registry(ctx),
            Service::Underwriting => underwriting::registry(ctx),
            Service::Customer => customer::registry(ctx),
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Service {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Service::ALL
            .into_iter()
            .find(|svc| svc.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "unknown service '{}' (expected one of: policy, claims, underwriting, customer)",
                    s
                )
            })
    }
}

/// Registries for all four agents, sharing one context.
pub fn all_registries(ctx: &ServiceContext) -> Result<Vec<ActionRegistry>, MeshError> {
    Service::ALL.iter().map(|svc| svc.registry(ctx)).collect()
}

/// `$1,234.50`.
pub(crate) fn money(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

/// Premium multiplier for a risk category.
pub(crate) fn rate_factor(category: &str) -> f64 {
    if category.eq_ignore_ascii_case("high") {
        2.0
    } else if category.eq_ignore_ascii_case("medium") {
        1.3
    } else {
        1.0
    }
}

pub(crate) fn plus_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(u32::try_from(months).ok()?))
}
