use std::cmp::Ordering;
use std::collections::HashSet;

use crate::discovery::{DestinationSource, DiscoveryError, SourceScan};
use crate::model::{Destination, Profile};
use crate::profiles::ProfileLocator;

/// Destinations that sort ahead of everything else.
pub const WELL_KNOWN_DESTINATIONS: [&str; 9] = [
    "firefox.desktop",
    "org.mozilla.firefox.desktop",
    "google-chrome.desktop",
    "chromium.desktop",
    "microsoft-edge.desktop",
    "brave-browser.desktop",
    "opera.desktop",
    "vivaldi-stable.desktop",
    "org.gnome.Epiphany.desktop",
];

/// Snapshot of installed destinations and the OS default handler.
///
/// Every refresh rebuilds the list from scratch; nothing is patched in place.
pub struct DestinationCatalog {
    source: Box<dyn DestinationSource>,
    locator: ProfileLocator,
    self_id: String,
    destinations: Vec<Destination>,
    default_id: Option<String>,
}

impl DestinationCatalog {
    pub fn new(source: Box<dyn DestinationSource>, locator: ProfileLocator, self_id: &str) -> Self {
        Self {
            source,
            locator,
            self_id: self_id.to_string(),
            destinations: Vec::new(),
            default_id: None,
        }
    }

    /// Re-enumerates destinations. On error the previous snapshot is kept.
    pub fn refresh(&mut self) -> Result<usize, DiscoveryError> {
        let scan = self.source.scan()?;
        Ok(self.replace(scan))
    }

    /// Replaces the snapshot with an externally supplied scan.
    pub fn replace(&mut self, scan: SourceScan) -> usize {
        let mut seen = HashSet::new();
        let mut destinations: Vec<Destination> = scan
            .destinations
            .into_iter()
            .filter(|d| d.id != self.self_id && seen.insert(d.id.clone()))
            .map(|d| {
                // Profiles read from disk replace any the source supplied.
                let profiles = self.locator.source_for(&d.id).load();
                if profiles.is_empty() {
                    d
                } else {
                    d.with_profiles(profiles)
                }
            })
            .collect();
        destinations.sort_by(compare_destinations);

        tracing::info!(
            source = self.source.source_name(),
            destinations = destinations.len(),
            default = scan.default_id.as_deref().unwrap_or("<none>"),
            "catalog refreshed"
        );

        self.destinations = destinations;
        self.default_id = scan.default_id;
        self.destinations.len()
    }

    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    pub fn destination(&self, id: &str) -> Option<&Destination> {
        self.destinations.iter().find(|d| d.id == id)
    }

    pub fn profile(&self, destination_id: &str, profile_id: &str) -> Option<&Profile> {
        self.destination(destination_id)?.profile(profile_id)
    }

    pub fn default_id(&self) -> Option<&str> {
        self.default_id.as_deref()
    }

    /// The OS default handler, unless it is this application or not installed.
    pub fn default_destination(&self) -> Option<&Destination> {
        let id = self.default_id.as_deref()?;
        if self.is_self(id) {
            return None;
        }
        self.destination(id)
    }

    pub fn self_id(&self) -> &str {
        &self.self_id
    }

    pub fn is_self(&self, id: &str) -> bool {
        id == self.self_id
    }

    /// Letter shown next to a destination in menus: A for the first entry,
    /// wrapping after Z.
    pub fn badge_letter(&self, id: &str) -> char {
        match self.destinations.iter().position(|d| d.id == id) {
            Some(index) => (b'A' + (index % 26) as u8) as char,
            None => '?',
        }
    }
}

fn compare_destinations(left: &Destination, right: &Destination) -> Ordering {
    let known = |d: &Destination| WELL_KNOWN_DESTINATIONS.contains(&d.id.as_str());
    match (known(left), known(right)) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => left
            .name
            .to_lowercase()
            .cmp(&right.name.to_lowercase())
            .then_with(|| left.id.cmp(&right.id)),
    }
}

#[cfg(test)]
mod tests {
    use super::DestinationCatalog;
    use crate::discovery::FixedSource;
    use crate::model::Destination;
    use crate::profiles::ProfileLocator;

    #[test]
    fn badge_letters_follow_catalog_order() {
        let mut catalog = DestinationCatalog::new(
            Box::new(FixedSource::deterministic_fixture()),
            ProfileLocator::new(std::env::temp_dir().join("linkroute-no-home")),
            "linkroute.desktop",
        );
        catalog.refresh().unwrap();

        assert_eq!(catalog.badge_letter("firefox.desktop"), 'A');
        assert_eq!(catalog.badge_letter("google-chrome.desktop"), 'B');
        assert_eq!(catalog.badge_letter("missing.desktop"), '?');
    }

    #[test]
    fn default_destination_ignores_self() {
        let mut catalog = DestinationCatalog::new(
            Box::new(FixedSource::new(
                vec![Destination::new("linkroute.desktop", "linkroute", "/usr/bin/linkroute")],
                Some("linkroute.desktop"),
            )),
            ProfileLocator::new(std::env::temp_dir().join("linkroute-no-home")),
            "linkroute.desktop",
        );
        assert_eq!(catalog.refresh().unwrap(), 0);
        assert_eq!(catalog.default_id(), Some("linkroute.desktop"));
        assert!(catalog.default_destination().is_none());
    }
}
