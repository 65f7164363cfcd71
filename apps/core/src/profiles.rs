use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::ini::parse_sections;
use crate::model::Profile;

/// Chromium-family destinations keep per-profile names in `<root>/Local State`.
const CHROMIUM_FAMILY: &[(&str, &str, &str)] = &[
    ("google-chrome.desktop", "chrome", ".config/google-chrome"),
    ("com.google.Chrome.desktop", "chrome", ".config/google-chrome"),
    ("chromium.desktop", "chromium", ".config/chromium"),
    ("chromium-browser.desktop", "chromium", ".config/chromium"),
    ("microsoft-edge.desktop", "edge", ".config/microsoft-edge"),
    ("brave-browser.desktop", "brave", ".config/BraveSoftware/Brave-Browser"),
    ("vivaldi-stable.desktop", "vivaldi", ".config/vivaldi"),
];

/// Firefox-family destinations list profiles in `profiles.ini`.
const FIREFOX_FAMILY: &[(&str, &str, &str)] = &[
    ("firefox.desktop", "firefox", ".mozilla/firefox"),
    ("firefox-esr.desktop", "firefox", ".mozilla/firefox"),
    ("org.mozilla.firefox.desktop", "firefox", ".mozilla/firefox"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileSource {
    ChromiumLocalState { scope: String, path: PathBuf },
    FirefoxProfilesIni { scope: String, path: PathBuf },
    None,
}

impl ProfileSource {
    /// Reads and parses the source. Missing or unreadable files give no profiles.
    pub fn load(&self) -> Vec<Profile> {
        match self {
            Self::ChromiumLocalState { scope, path } => read_bytes(path)
                .map(|bytes| parse_local_state(&bytes, scope))
                .unwrap_or_default(),
            Self::FirefoxProfilesIni { scope, path } => read_bytes(path)
                .map(|bytes| parse_profiles_ini(&bytes, scope))
                .unwrap_or_default(),
            Self::None => Vec::new(),
        }
    }

    /// Family that decides how a launcher passes a profile.
    pub fn family(&self) -> Option<ProfileFamily> {
        match self {
            Self::ChromiumLocalState { .. } => Some(ProfileFamily::Chromium),
            Self::FirefoxProfilesIni { .. } => Some(ProfileFamily::Firefox),
            Self::None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileFamily {
    Chromium,
    Firefox,
}

pub fn family_for(destination_id: &str) -> Option<ProfileFamily> {
    if CHROMIUM_FAMILY.iter().any(|(id, _, _)| *id == destination_id) {
        Some(ProfileFamily::Chromium)
    } else if FIREFOX_FAMILY.iter().any(|(id, _, _)| *id == destination_id) {
        Some(ProfileFamily::Firefox)
    } else {
        None
    }
}

/// Maps destination ids to profile sources under a home directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileLocator {
    home: PathBuf,
}

impl ProfileLocator {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn source_for(&self, destination_id: &str) -> ProfileSource {
        if let Some((_, scope, root)) = CHROMIUM_FAMILY
            .iter()
            .find(|(id, _, _)| *id == destination_id)
        {
            return ProfileSource::ChromiumLocalState {
                scope: scope.to_string(),
                path: self.home.join(root).join("Local State"),
            };
        }

        if let Some((_, scope, root)) = FIREFOX_FAMILY
            .iter()
            .find(|(id, _, _)| *id == destination_id)
        {
            return ProfileSource::FirefoxProfilesIni {
                scope: scope.to_string(),
                path: self.home.join(root).join("profiles.ini"),
            };
        }

        ProfileSource::None
    }
}

fn read_bytes(path: &Path) -> Option<Vec<u8>> {
    match std::fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(error) => {
            tracing::debug!(path = %path.display(), %error, "profile source unreadable");
            None
        }
    }
}

/// Parses Chromium `Local State`: `profile.info_cache.<directory>.name`.
pub fn parse_local_state(bytes: &[u8], scope: &str) -> Vec<Profile> {
    let Ok(root) = serde_json::from_slice::<Value>(bytes) else {
        return Vec::new();
    };
    let Some(cache) = root
        .get("profile")
        .and_then(|p| p.get("info_cache"))
        .and_then(Value::as_object)
    else {
        return Vec::new();
    };

    let mut profiles: Vec<Profile> = cache
        .iter()
        .map(|(directory, info)| {
            let name = info
                .get("name")
                .and_then(Value::as_str)
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(directory.as_str());
            Profile::new(scope, directory, name)
        })
        .collect();

    profiles.sort_by(|a, b| {
        (a.directory_name != "Default")
            .cmp(&(b.directory_name != "Default"))
            .then_with(|| a.directory_name.cmp(&b.directory_name))
    });
    profiles
}

/// Parses Firefox `profiles.ini`. Only `[Profile*]` sections carrying both
/// `Name` and `Path` count; the final section is kept even without a
/// trailing newline.
pub fn parse_profiles_ini(bytes: &[u8], scope: &str) -> Vec<Profile> {
    let text = String::from_utf8_lossy(bytes);
    parse_sections(&text)
        .iter()
        .filter(|section| section.name.starts_with("Profile"))
        .filter_map(|section| {
            let name = section.get("Name").filter(|v| !v.is_empty())?;
            let path = section.get("Path").filter(|v| !v.is_empty())?;
            Some(Profile::new(scope, path, name))
        })
        .collect()
}
