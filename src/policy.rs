//! Actionable-alert filtering.
//!
//! The allow-list holds both alert types (`HAZARD`) and subtypes
//! (`HAZARD_ON_ROAD_POT_HOLE`). A type token only matches alerts that carry
//! no subtype; an alert with a subtype is matched by its subtype alone. So
//! `HAZARD` in the list lets through generic hazard reports but not
//! potholes, which need `HAZARD_ON_ROAD_POT_HOLE` (or its own entry).
//!
//! `allowed_off` is parsed and kept but nothing reads it while filtering.

use crate::parser::RawAlert;
use std::collections::HashSet;

/// Allow/deny configuration for alert types and subtypes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowPolicy {
    /// Tokens that make an alert actionable. `None` means no restriction.
    pub allowed_on: Option<HashSet<String>>,
    /// Tokens reserved for a denial rule. Currently inert.
    pub allowed_off: Option<HashSet<String>>,
}

impl AllowPolicy {
    /// Policy that lets every alert through.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Build a policy from optional token lists.
    pub fn new<I, S>(allowed_on: Option<I>, allowed_off: Option<I>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_on: allowed_on.map(|on| on.into_iter().map(Into::into).collect()),
            allowed_off: allowed_off.map(|off| off.into_iter().map(Into::into).collect()),
        }
    }

    /// Whether a single alert should be notified.
    pub fn is_actionable(&self, alert: &RawAlert) -> bool {
        let Some(allowed) = &self.allowed_on else {
            return true;
        };

        if alert.subtype.is_empty() {
            allowed.contains(&alert.alert_type)
        } else {
            allowed.contains(&alert.subtype)
        }
    }

    /// Keep the actionable alerts, preserving input order.
    pub fn filter_actionable<'a>(&self, alerts: &'a [RawAlert]) -> Vec<&'a RawAlert> {
        let actionable: Vec<&RawAlert> = alerts.iter().filter(|a| self.is_actionable(a)).collect();

        let filtered = alerts.len() - actionable.len();
        if filtered > 0 {
            tracing::debug!(
                total = alerts.len(),
                filtered = filtered,
                "Alerts filtered out by allow-list"
            );
        }

        actionable
    }
}
