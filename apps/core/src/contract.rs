use serde::{Deserialize, Serialize};

use crate::dispatch::Decision;
use crate::model::{Destination, RecentRoute, Rule};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UrlRequest {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleIdRequest {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveRulesRequest {
    pub ids: Vec<String>,
    pub to_position: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SetFallbackRequest {
    pub destination_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DecisionResponse {
    pub decision: Decision,
    pub explanation: String,
}

impl From<Decision> for DecisionResponse {
    fn from(decision: Decision) -> Self {
        Self {
            explanation: decision.explain(),
            decision,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DestinationDto {
    pub id: String,
    pub name: String,
    pub path: String,
    pub profiles: Vec<String>,
    pub is_default: bool,
}

impl DestinationDto {
    pub fn new(destination: &Destination, default_id: Option<&str>) -> Self {
        Self {
            id: destination.id.clone(),
            name: destination.name.clone(),
            path: destination.executable_path.to_string_lossy().into_owned(),
            profiles: destination.profiles.iter().map(|p| p.id.clone()).collect(),
            is_default: default_id == Some(destination.id.as_str()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecentRouteDto {
    pub url: String,
    pub display_url: String,
    pub destination_name: String,
    pub timestamp: String,
}

impl From<&RecentRoute> for RecentRouteDto {
    fn from(value: &RecentRoute) -> Self {
        Self {
            url: value.url.clone(),
            display_url: value.display_url(),
            destination_name: value.destination_name.clone(),
            timestamp: value.timestamp.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "payload")]
pub enum RouterRequest {
    Route(UrlRequest),
    Test(UrlRequest),
    ListRules,
    AddRule(Rule),
    UpdateRule(Rule),
    DeleteRule(RuleIdRequest),
    MoveRules(MoveRulesRequest),
    ToggleRouting,
    SetFallback(SetFallbackRequest),
    ListDestinations,
    RecentRoutes,
    ClearRecent,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "payload")]
pub enum RouterResponse {
    Decision(DecisionResponse),
    Rules(Vec<Rule>),
    Rule(Rule),
    Routing { enabled: bool },
    Destinations(Vec<DestinationDto>),
    RecentRoutes(Vec<RecentRouteDto>),
    Done,
}
