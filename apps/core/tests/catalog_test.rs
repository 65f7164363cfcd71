use std::fs;
use std::path::Path;

use linkroute_core::catalog::DestinationCatalog;
use linkroute_core::discovery::{
    default_handler_from_mimeapps, parse_desktop_entry, DesktopEntrySource, DestinationSource,
    DiscoveryError, FixedSource,
};
use linkroute_core::model::Destination;
use linkroute_core::profiles::{parse_local_state, parse_profiles_ini, ProfileLocator};

const FIREFOX_ENTRY: &str = "[Desktop Entry]
Type=Application
Name=Firefox
Exec=/usr/lib/firefox/firefox %u
MimeType=text/html;x-scheme-handler/http;x-scheme-handler/https;
";

const CHROME_ENTRY: &str = "[Desktop Entry]
Type=Application
Name=Google Chrome
Exec=/usr/bin/google-chrome-stable %U
MimeType=x-scheme-handler/https;

[Desktop Action new-window]
Name=New Window
Exec=/usr/bin/google-chrome-stable --new-window
";

const EDITOR_ENTRY: &str = "[Desktop Entry]
Type=Application
Name=Editor
Exec=gedit %U
MimeType=text/plain;
";

fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

#[test]
fn local_state_lists_default_profile_first() {
    let local_state = br#"{
        "profile": {
            "info_cache": {
                "Profile 2": { "name": "Work" },
                "Default": { "name": "Personal" },
                "Profile 1": { "name": "" }
            }
        }
    }"#;
    let profiles = parse_local_state(local_state, "chrome");
    let ids: Vec<&str> = profiles.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["chrome:Default", "chrome:Profile 1", "chrome:Profile 2"]);
    assert_eq!(profiles[0].name, "Personal");
    assert_eq!(profiles[1].name, "Profile 1");

    assert!(parse_local_state(b"not json", "chrome").is_empty());
    assert!(parse_local_state(br#"{"profile":{}}"#, "chrome").is_empty());
}

#[test]
fn profiles_ini_keeps_the_last_section() {
    let ini = b"[General]
StartWithLastProfile=1

[Profile0]
Name=default
IsRelative=1
Path=abcd.default

[Install4F96D1932A9F858E]
Default=efgh.work

[Profile1]
Name=work
IsRelative=1
Path=efgh.work";
    let profiles = parse_profiles_ini(ini, "firefox");
    assert_eq!(profiles.len(), 2);
    assert_eq!(profiles[0].id, "firefox:abcd.default");
    assert_eq!(profiles[0].name, "default");
    assert_eq!(profiles[1].id, "firefox:efgh.work");
    assert_eq!(profiles[1].directory_name, "efgh.work");
}

#[test]
fn profiles_ini_skips_sections_missing_name_or_path() {
    let ini = b"[Profile0]\nName=only-name\n\n[Profile1]\nPath=only.path\n";
    assert!(parse_profiles_ini(ini, "firefox").is_empty());
}

#[test]
fn desktop_entry_requires_scheme_handler() {
    let mime = "x-scheme-handler/https";
    let firefox = parse_desktop_entry("firefox.desktop", FIREFOX_ENTRY, mime).unwrap();
    assert_eq!(firefox.name, "Firefox");
    assert_eq!(firefox.executable_path, Path::new("/usr/lib/firefox/firefox"));
    assert!(parse_desktop_entry("editor.desktop", EDITOR_ENTRY, mime).is_none());

    let hidden = format!("{FIREFOX_ENTRY}Hidden=true\n");
    assert!(parse_desktop_entry("firefox.desktop", &hidden, mime).is_none());
}

#[test]
fn mimeapps_default_handler_is_first_listed_id() {
    let text = "[Added Associations]
x-scheme-handler/https=chromium.desktop;

[Default Applications]
x-scheme-handler/http=firefox.desktop
x-scheme-handler/https=google-chrome.desktop;firefox.desktop;
";
    assert_eq!(
        default_handler_from_mimeapps(text, "x-scheme-handler/https").as_deref(),
        Some("google-chrome.desktop")
    );
    assert_eq!(default_handler_from_mimeapps(text, "x-scheme-handler/ftp"), None);
}

#[test]
fn desktop_scan_reads_entries_profiles_and_default() {
    let root = tempfile::tempdir().unwrap();
    let user_apps = root.path().join("home/.local/share/applications");
    let system_apps = root.path().join("usr/share/applications");
    let mimeapps = root.path().join("home/.config/mimeapps.list");

    write(&user_apps.join("firefox.desktop"), FIREFOX_ENTRY);
    write(
        &system_apps.join("firefox.desktop"),
        &FIREFOX_ENTRY.replace("Name=Firefox", "Name=System Firefox"),
    );
    write(&system_apps.join("google-chrome.desktop"), CHROME_ENTRY);
    write(&system_apps.join("org.gnome.gedit.desktop"), EDITOR_ENTRY);
    write(
        &system_apps.join("linkroute.desktop"),
        &FIREFOX_ENTRY.replace("Name=Firefox", "Name=linkroute"),
    );
    write(
        &system_apps.join("kde4/konqueror.desktop"),
        &FIREFOX_ENTRY.replace("Name=Firefox", "Name=Konqueror"),
    );
    write(
        &mimeapps,
        "[Default Applications]\nx-scheme-handler/https=google-chrome.desktop\n",
    );

    let home = root.path().join("home");
    write(
        &home.join(".config/google-chrome/Local State"),
        r#"{"profile":{"info_cache":{"Default":{"name":"Me"},"Profile 3":{"name":"Work"}}}}"#,
    );
    write(
        &home.join(".mozilla/firefox/profiles.ini"),
        "[Profile0]\nName=default-release\nPath=x1.default-release\n",
    );

    let source = DesktopEntrySource::new(vec![user_apps, system_apps], vec![mimeapps], "https");
    let mut catalog = DestinationCatalog::new(
        Box::new(source),
        ProfileLocator::new(&home),
        "linkroute.desktop",
    );
    assert_eq!(catalog.refresh().unwrap(), 3);

    let ids: Vec<&str> = catalog.destinations().iter().map(|d| d.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["firefox.desktop", "google-chrome.desktop", "kde4-konqueror.desktop"]
    );
    assert_eq!(catalog.destinations()[0].name, "Firefox");
    assert_eq!(catalog.default_id(), Some("google-chrome.desktop"));

    let chrome = catalog.destination("google-chrome.desktop").unwrap();
    assert_eq!(chrome.profiles.len(), 2);
    assert!(catalog.profile("google-chrome.desktop", "chrome:Profile 3").is_some());
    assert!(catalog.profile("firefox.desktop", "firefox:x1.default-release").is_some());
    assert!(!catalog.destination("kde4-konqueror.desktop").unwrap().supports_profiles());
}

#[test]
fn catalog_orders_known_destinations_first_and_dedups() {
    let source = FixedSource::new(
        vec![
            Destination::new("zeta.desktop", "zeta", "/opt/zeta"),
            Destination::new("Alpha.desktop", "Alpha", "/opt/alpha"),
            Destination::new("chromium.desktop", "Chromium", "/usr/bin/chromium"),
            Destination::new("zeta.desktop", "zeta again", "/opt/zeta2"),
            Destination::new("firefox.desktop", "Firefox", "/usr/bin/firefox"),
        ],
        Some("zeta.desktop"),
    );
    let mut catalog = DestinationCatalog::new(
        Box::new(source),
        ProfileLocator::new(std::env::temp_dir().join("linkroute-catalog-no-home")),
        "linkroute.desktop",
    );
    catalog.refresh().unwrap();

    let names: Vec<&str> = catalog.destinations().iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Chromium", "Firefox", "Alpha", "zeta"]);
    assert_eq!(catalog.default_destination().unwrap().id, "zeta.desktop");
}

#[test]
fn empty_discovery_yields_empty_catalog() {
    let mut catalog = DestinationCatalog::new(
        Box::new(FixedSource::empty()),
        ProfileLocator::new(std::env::temp_dir()),
        "linkroute.desktop",
    );
    assert_eq!(catalog.refresh().unwrap(), 0);
    assert!(catalog.default_destination().is_none());
}

#[test]
fn source_without_directories_fails_and_keeps_previous_snapshot() {
    let source = DesktopEntrySource::new(Vec::new(), Vec::new(), "https");
    assert!(matches!(source.scan(), Err(DiscoveryError::NoApplicationDirs)));

    let mut catalog = DestinationCatalog::new(
        Box::new(source),
        ProfileLocator::new(std::env::temp_dir()),
        "linkroute.desktop",
    );
    assert!(catalog.refresh().is_err());
    assert!(catalog.destinations().is_empty());
}
