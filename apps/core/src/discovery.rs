use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::ini::parse_sections;
use crate::model::Destination;

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("no application directories configured")]
    NoApplicationDirs,
    #[error("{0}")]
    Source(String),
}

/// Raw result of one enumeration: candidate destinations (without profiles)
/// and the id the OS currently opens the reference scheme with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceScan {
    pub destinations: Vec<Destination>,
    pub default_id: Option<String>,
}

pub trait DestinationSource: Send {
    fn source_name(&self) -> &'static str;
    fn scan(&self) -> Result<SourceScan, DiscoveryError>;
}

/// Returns a preset scan; used by tests and by OS integrations that push
/// their own enumeration results.
pub struct FixedSource {
    scan: SourceScan,
}

impl FixedSource {
    pub fn new(destinations: Vec<Destination>, default_id: Option<&str>) -> Self {
        Self {
            scan: SourceScan {
                destinations,
                default_id: default_id.map(str::to_string),
            },
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), None)
    }

    pub fn deterministic_fixture() -> Self {
        Self::new(
            vec![
                Destination::new("firefox.desktop", "Firefox", "/usr/bin/firefox"),
                Destination::new(
                    "google-chrome.desktop",
                    "Google Chrome",
                    "/usr/bin/google-chrome-stable",
                ),
            ],
            Some("firefox.desktop"),
        )
    }
}

impl DestinationSource for FixedSource {
    fn source_name(&self) -> &'static str {
        "fixed"
    }

    fn scan(&self) -> Result<SourceScan, DiscoveryError> {
        Ok(self.scan.clone())
    }
}

/// Enumerates XDG desktop entries that declare a handler for the reference
/// scheme and reads the default handler from `mimeapps.list`.
pub struct DesktopEntrySource {
    application_dirs: Vec<PathBuf>,
    mimeapps_paths: Vec<PathBuf>,
    scheme: String,
    max_depth: usize,
}

impl DesktopEntrySource {
    pub fn new(application_dirs: Vec<PathBuf>, mimeapps_paths: Vec<PathBuf>, scheme: &str) -> Self {
        Self {
            application_dirs,
            mimeapps_paths,
            scheme: scheme.to_ascii_lowercase(),
            max_depth: 3,
        }
    }

    fn mime_type(&self) -> String {
        format!("x-scheme-handler/{}", self.scheme)
    }

    fn scan_dir(&self, root: &Path, seen: &mut HashSet<String>, out: &mut Vec<Destination>) {
        let walker = WalkDir::new(root)
            .follow_links(true)
            .max_depth(self.max_depth)
            .sort_by_file_name();

        for entry in walker.into_iter().filter_map(|entry| entry.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some("desktop")
            {
                continue;
            }

            let Some(id) = desktop_file_id(root, path) else {
                continue;
            };
            if seen.contains(&id) {
                continue;
            }

            let text = match std::fs::read_to_string(path) {
                Ok(text) => text,
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "skipping unreadable desktop entry");
                    continue;
                }
            };

            // A hidden entry in an earlier directory masks later ones with the same id.
            seen.insert(id.clone());
            if let Some(destination) = parse_desktop_entry(&id, &text, &self.mime_type()) {
                out.push(destination);
            }
        }
    }

    fn default_handler(&self) -> Option<String> {
        let mime = self.mime_type();
        self.mimeapps_paths.iter().find_map(|path| {
            let text = std::fs::read_to_string(path).ok()?;
            default_handler_from_mimeapps(&text, &mime)
        })
    }
}

impl DestinationSource for DesktopEntrySource {
    fn source_name(&self) -> &'static str {
        "desktop-entries"
    }

    fn scan(&self) -> Result<SourceScan, DiscoveryError> {
        if self.application_dirs.is_empty() {
            return Err(DiscoveryError::NoApplicationDirs);
        }

        let mut seen = HashSet::new();
        let mut destinations = Vec::new();
        for root in &self.application_dirs {
            if !root.is_dir() {
                continue;
            }
            self.scan_dir(root, &mut seen, &mut destinations);
        }

        Ok(SourceScan {
            destinations,
            default_id: self.default_handler(),
        })
    }
}

/// `applications/kde4/foo.desktop` has id `kde4-foo.desktop`.
fn desktop_file_id(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("-"))
}

pub fn parse_desktop_entry(id: &str, text: &str, mime_type: &str) -> Option<Destination> {
    let sections = parse_sections(text);
    let entry = sections.iter().find(|s| s.name == "Desktop Entry")?;

    if entry.get("Type").is_some_and(|t| t != "Application") {
        return None;
    }
    if entry.get("Hidden").is_some_and(|v| v.eq_ignore_ascii_case("true")) {
        return None;
    }
    let handles_scheme = entry
        .get("MimeType")
        .map(|types| {
            types
                .split(';')
                .any(|t| t.trim().eq_ignore_ascii_case(mime_type))
        })
        .unwrap_or(false);
    if !handles_scheme {
        return None;
    }

    let executable = entry.get("Exec").and_then(exec_program)?;
    let name = entry
        .get("Name")
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| id.trim_end_matches(".desktop").to_string());

    Some(Destination::new(id, &name, executable))
}

/// First program token of an `Exec` line, skipping an `env VAR=value` prefix.
fn exec_program(exec: &str) -> Option<PathBuf> {
    let tokens = split_exec(exec);
    let mut iter = tokens.iter().filter(|token| !token.starts_with('%'));
    let mut program = iter.next()?;
    if program == "env" {
        program = iter.find(|token| !token.contains('='))?;
    }
    Some(PathBuf::from(program))
}

fn split_exec(exec: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = exec.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => quoted = !quoted,
            '\\' if quoted => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

pub fn default_handler_from_mimeapps(text: &str, mime_type: &str) -> Option<String> {
    parse_sections(text)
        .iter()
        .filter(|section| section.name == "Default Applications")
        .find_map(|section| {
            section
                .get(mime_type)?
                .split(';')
                .map(str::trim)
                .find(|id| !id.is_empty())
                .map(str::to_string)
        })
}
