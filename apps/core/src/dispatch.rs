//! Turns a URL into a launch decision.
//!
//! Order of precedence, first hit wins:
//! 1. the highest-priority enabled rule that matches and whose destination is installed
//! 2. the configured fallback destination
//! 3. the OS default handler (never this application)
//! 4. the last-resort destination
//!
//! With routing switched off only the OS default is considered.

use serde::Serialize;

use crate::catalog::DestinationCatalog;
use crate::matcher::{matches, TargetUrl};
use crate::model::{Destination, Profile, RoutingState, Rule};

pub const DEFAULT_LAST_RESORT_ID: &str = "firefox.desktop";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Matched {
        rule: Rule,
        destination: Destination,
        profile: Option<Profile>,
    },
    Fallback {
        destination: Destination,
    },
    SystemDefault {
        destination: Destination,
    },
    LastResort {
        destination: Destination,
    },
    NoDestination,
}

impl Decision {
    pub fn destination(&self) -> Option<&Destination> {
        match self {
            Self::Matched { destination, .. }
            | Self::Fallback { destination }
            | Self::SystemDefault { destination }
            | Self::LastResort { destination } => Some(destination),
            Self::NoDestination => None,
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Self::Matched { profile, .. } => profile.as_ref(),
            _ => None,
        }
    }

    /// One-line human description, e.g. `→ Firefox (rule 0: domain github.com)`.
    pub fn explain(&self) -> String {
        match self {
            Self::Matched {
                rule,
                destination,
                profile,
            } => {
                let profile = profile
                    .as_ref()
                    .map(|p| format!(" [{}]", p.name))
                    .unwrap_or_default();
                format!(
                    "→ {}{profile} (rule {}: {} {})",
                    destination.name,
                    rule.priority,
                    rule.match_type.display_name().to_lowercase(),
                    rule.pattern
                )
            }
            Self::Fallback { destination } => format!("→ {} (fallback)", destination.name),
            Self::SystemDefault { destination } => {
                format!("→ {} (system default)", destination.name)
            }
            Self::LastResort { destination } => format!("→ {} (last resort)", destination.name),
            Self::NoDestination => "no destination available".to_string(),
        }
    }
}

pub fn route(url: &str, state: &RoutingState, catalog: &DestinationCatalog) -> Decision {
    route_with_last_resort(url, state, catalog, DEFAULT_LAST_RESORT_ID)
}

pub fn route_with_last_resort(
    url: &str,
    state: &RoutingState,
    catalog: &DestinationCatalog,
    last_resort_id: &str,
) -> Decision {
    let target = match TargetUrl::parse(url) {
        Ok(target) => target,
        Err(error) => {
            tracing::warn!(%error, "unroutable url");
            return Decision::NoDestination;
        }
    };

    if !state.routing_enabled {
        return match catalog.default_destination() {
            Some(destination) => Decision::SystemDefault {
                destination: destination.clone(),
            },
            None => Decision::NoDestination,
        };
    }

    if let Some(decision) = first_matching_rule(&target, &state.rules, catalog) {
        return decision;
    }

    if let Some(destination) = state
        .fallback_destination_id
        .as_deref()
        .and_then(|id| catalog.destination(id))
    {
        return Decision::Fallback {
            destination: destination.clone(),
        };
    }

    if let Some(destination) = catalog.default_destination() {
        return Decision::SystemDefault {
            destination: destination.clone(),
        };
    }

    match catalog.destination(last_resort_id) {
        Some(destination) => Decision::LastResort {
            destination: destination.clone(),
        },
        None => Decision::NoDestination,
    }
}

fn first_matching_rule(
    target: &TargetUrl,
    rules: &[Rule],
    catalog: &DestinationCatalog,
) -> Option<Decision> {
    let mut ordered: Vec<&Rule> = rules.iter().filter(|rule| rule.enabled).collect();
    ordered.sort_by_key(|rule| rule.priority);

    for rule in ordered {
        if !matches(target, rule) {
            continue;
        }
        let Some(destination) = catalog.destination(&rule.destination_id) else {
            tracing::debug!(
                rule_id = %rule.id,
                destination = %rule.destination_id,
                "matching rule points at a missing destination; skipping"
            );
            continue;
        };

        let profile = rule.profile_id.as_deref().and_then(|profile_id| {
            let profile = destination.profile(profile_id).cloned();
            if profile.is_none() {
                tracing::debug!(rule_id = %rule.id, profile_id, "profile not found; launching without it");
            }
            profile
        });

        return Some(Decision::Matched {
            rule: rule.clone(),
            destination: destination.clone(),
            profile,
        });
    }
    None
}
