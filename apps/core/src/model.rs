use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_PORT: u16 = 1;
pub const MAX_PORT: u16 = 65535;
pub const MIN_RECENT_URLS: usize = 5;
pub const MAX_RECENT_URLS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub directory_name: String,
}

impl Profile {
    pub fn new(scope: &str, directory_name: &str, name: &str) -> Self {
        Self {
            id: format!("{scope}:{directory_name}"),
            name: name.to_string(),
            directory_name: directory_name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub id: String,
    pub name: String,
    pub executable_path: PathBuf,
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

impl Destination {
    pub fn new(id: &str, name: &str, executable_path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            executable_path: executable_path.into(),
            profiles: Vec::new(),
        }
    }

    pub fn with_profiles(mut self, profiles: Vec<Profile>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn profile(&self, profile_id: &str) -> Option<&Profile> {
        self.profiles.iter().find(|profile| profile.id == profile_id)
    }

    pub fn supports_profiles(&self) -> bool {
        !self.profiles.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPortRange")]
pub struct PortRange {
    start: u16,
    end: u16,
}

/// Wire form of `PortRange`; bounds are checked on the way in.
#[derive(Deserialize)]
struct RawPortRange {
    start: u32,
    end: u32,
}

impl TryFrom<RawPortRange> for PortRange {
    type Error = PortRangeError;

    fn try_from(raw: RawPortRange) -> Result<Self, Self::Error> {
        Ok(Self::new(check_port(raw.start)?, check_port(raw.end)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortRangeError {
    #[error("port range is empty")]
    Empty,
    #[error("'{0}' is not a port or a start-end range")]
    Malformed(String),
    #[error("port {0} is outside 1-65535")]
    OutOfRange(u32),
}

impl PortRange {
    /// Single-port range. Port 0 is lifted to 1.
    pub fn single(port: u16) -> Self {
        let port = port.max(MIN_PORT);
        Self {
            start: port,
            end: port,
        }
    }

    /// Builds a range from two bounds given in either order.
    pub fn new(a: u16, b: u16) -> Self {
        let (a, b) = (a.max(MIN_PORT), b.max(MIN_PORT));
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn end(&self) -> u16 {
        self.end
    }

    pub fn contains(&self, port: u16) -> bool {
        (self.start..=self.end).contains(&port)
    }

    /// Accepts `"443"` or `"8000-8999"` (surrounding whitespace ignored).
    pub fn parse(input: &str) -> Result<Self, PortRangeError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(PortRangeError::Empty);
        }

        match trimmed.split_once('-') {
            None => Ok(Self::single(parse_port(trimmed)?)),
            Some((start, end)) => {
                let start = parse_port(start.trim())?;
                let end = parse_port(end.trim())?;
                Ok(Self::new(start, end))
            }
        }
    }
}

fn parse_port(raw: &str) -> Result<u16, PortRangeError> {
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(PortRangeError::Malformed(raw.to_string()));
    }
    let value: u32 = raw
        .parse()
        .map_err(|_| PortRangeError::OutOfRange(u32::MAX))?;
    check_port(value)
}

fn check_port(value: u32) -> Result<u16, PortRangeError> {
    if value < MIN_PORT as u32 || value > MAX_PORT as u32 {
        return Err(PortRangeError::OutOfRange(value));
    }
    Ok(value as u16)
}

impl Display for PortRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Contains,
    Domain,
    Wildcard,
    Regex,
}

impl MatchType {
    pub const ALL: [MatchType; 4] = [
        MatchType::Contains,
        MatchType::Domain,
        MatchType::Wildcard,
        MatchType::Regex,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Contains => "Contains",
            Self::Domain => "Domain",
            Self::Wildcard => "Wildcard",
            Self::Regex => "Regex",
        }
    }

    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Contains => "github",
            Self::Domain => "github.com",
            Self::Wildcard => "*.github.com/*",
            Self::Regex => r".*\.google\.com/.*",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Contains => "Match if URL contains this text anywhere",
            Self::Domain => "Match by domain name only (ignores protocol and path)",
            Self::Wildcard => "Match full URL with wildcards (* = any, ? = single char)",
            Self::Regex => "Match full URL with regular expression",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "contains" => Some(Self::Contains),
            "domain" => Some(Self::Domain),
            "wildcard" => Some(Self::Wildcard),
            "regex" => Some(Self::Regex),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    pub pattern: String,
    pub match_type: MatchType,
    #[serde(rename = "destinationID")]
    pub destination_id: String,
    #[serde(rename = "profileID", default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_range: Option<PortRange>,
    pub enabled: bool,
    pub priority: i64,
}

impl Rule {
    /// New enabled rule with a fresh id. Priority is assigned by the store.
    pub fn new(pattern: &str, match_type: MatchType, destination_id: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            pattern: pattern.to_string(),
            match_type,
            destination_id: destination_id.to_string(),
            profile_id: None,
            port_range: None,
            enabled: true,
            priority: 0,
        }
    }

    pub fn with_profile(mut self, profile_id: &str) -> Self {
        self.profile_id = Some(profile_id.to_string());
        self
    }

    pub fn with_port_range(mut self, port_range: PortRange) -> Self {
        self.port_range = Some(port_range);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentRoute {
    pub id: String,
    pub url: String,
    pub destination_name: String,
    pub timestamp: DateTime<Utc>,
}

impl RecentRoute {
    pub fn new(url: &str, destination_name: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: url.to_string(),
            destination_name: destination_name.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Short form for menus: host plus the start of the path.
    pub fn display_url(&self) -> String {
        let parsed = url::Url::parse(&self.url).ok();
        let Some(host) = parsed.as_ref().and_then(|u| u.host_str()) else {
            let head: String = self.url.chars().take(50).collect();
            return if self.url.chars().count() > 50 {
                format!("{head}...")
            } else {
                head
            };
        };

        let path = parsed.as_ref().map(|u| u.path()).unwrap_or_default();
        if path.is_empty() || path == "/" {
            host.to_string()
        } else {
            let head: String = path.chars().take(20).collect();
            format!("{host}{head}...")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub show_banner: bool,
    pub flash_icon: bool,
    pub track_recent: bool,
    pub play_sound: bool,
    pub sound_name: String,
    #[serde(rename = "maxRecentURLs")]
    pub max_recent_urls: usize,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            show_banner: false,
            flash_icon: true,
            track_recent: true,
            play_sound: false,
            sound_name: "Pop".to_string(),
            max_recent_urls: 10,
        }
    }
}

impl NotificationSettings {
    pub fn clamped(mut self) -> Self {
        self.max_recent_urls = self.max_recent_urls.clamp(MIN_RECENT_URLS, MAX_RECENT_URLS);
        self
    }
}

/// Plain data behind a `RoutingStore`; what dispatch reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingState {
    pub rules: Vec<Rule>,
    pub routing_enabled: bool,
    pub fallback_destination_id: Option<String>,
    pub notification_settings: NotificationSettings,
    pub recent_routes: Vec<RecentRoute>,
}

impl Default for RoutingState {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            routing_enabled: true,
            fallback_destination_id: None,
            notification_settings: NotificationSettings::default(),
            recent_routes: Vec::new(),
        }
    }
}
