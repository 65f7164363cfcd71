use std::sync::{Arc, Mutex};

use linkroute_core::config::Config;
use linkroute_core::discovery::FixedSource;
use linkroute_core::dispatch::Decision;
use linkroute_core::launcher::{LaunchError, Launcher};
use linkroute_core::model::{Destination, MatchType, NotificationSettings, Profile, Rule};
use linkroute_core::notifier::{NotificationHints, Notifier, RouteEvent};
use linkroute_core::router_service::{RouterService, ServiceError};
use linkroute_core::rule_store::RoutingStore;

type Launches = Arc<Mutex<Vec<(String, String, Option<String>)>>>;
type Notices = Arc<Mutex<Vec<(RouteEvent, NotificationHints)>>>;

struct RecordingLauncher {
    launches: Launches,
    fail: bool,
}

impl Launcher for RecordingLauncher {
    fn launch(
        &self,
        destination: &Destination,
        url: &str,
        profile: Option<&Profile>,
    ) -> Result<(), LaunchError> {
        self.launches.lock().unwrap().push((
            destination.id.clone(),
            url.to_string(),
            profile.map(|p| p.id.clone()),
        ));
        if self.fail {
            return Err(LaunchError::EmptyPath);
        }
        Ok(())
    }
}

struct RecordingNotifier {
    notices: Notices,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: &RouteEvent, hints: &NotificationHints) {
        self.notices
            .lock()
            .unwrap()
            .push((event.clone(), hints.clone()));
    }
}

fn service(fail_launch: bool) -> (RouterService, Launches, Notices) {
    let home = tempfile::tempdir().unwrap();
    let config = Config {
        profile_home: home.path().to_path_buf(),
        ..Config::default()
    };
    let launches = Launches::default();
    let notices = Notices::default();
    let mut service = RouterService::with_parts(
        config,
        RoutingStore::open_memory().unwrap(),
        Box::new(FixedSource::deterministic_fixture()),
    )
    .unwrap()
    .with_launcher(Box::new(RecordingLauncher {
        launches: launches.clone(),
        fail: fail_launch,
    }))
    .with_notifier(Box::new(RecordingNotifier {
        notices: notices.clone(),
    }));
    service.refresh_catalog().unwrap();
    (service, launches, notices)
}

#[test]
fn handle_url_launches_records_and_notifies() {
    let (mut service, launches, notices) = service(false);
    service
        .add_rule(Rule::new("github.com", MatchType::Domain, "google-chrome.desktop"))
        .unwrap();

    let decision = service.handle_url("https://github.com/rust-lang/rust");
    assert!(matches!(decision, Decision::Matched { .. }));

    let launches = launches.lock().unwrap();
    assert_eq!(
        launches.as_slice(),
        &[(
            "google-chrome.desktop".to_string(),
            "https://github.com/rust-lang/rust".to_string(),
            None
        )]
    );

    let recent = &service.store().state().recent_routes;
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].destination_name, "Google Chrome");

    let notices = notices.lock().unwrap();
    assert_eq!(notices.len(), 1);
    let (event, hints) = &notices[0];
    assert_eq!(event.host.as_deref(), Some("github.com"));
    assert_eq!(event.badge_letter, 'B');
    assert_eq!(hints, &NotificationHints::from_settings(&NotificationSettings::default()));
}

#[test]
fn launch_failure_does_not_change_the_decision() {
    let (mut service, launches, _) = service(true);
    let decision = service.handle_url("https://example.org");
    assert!(matches!(decision, Decision::SystemDefault { .. }));
    assert_eq!(launches.lock().unwrap().len(), 1);
    assert_eq!(service.store().state().recent_routes.len(), 1);
}

#[test]
fn unroutable_url_launches_nothing() {
    let (mut service, launches, notices) = service(false);
    assert_eq!(service.handle_url("::not a url::"), Decision::NoDestination);
    assert!(launches.lock().unwrap().is_empty());
    assert!(notices.lock().unwrap().is_empty());
    assert!(service.store().state().recent_routes.is_empty());
}

#[test]
fn recent_tracking_can_be_switched_off() {
    let (mut service, _, _) = service(false);
    service
        .store_mut()
        .set_notification_settings(NotificationSettings {
            track_recent: false,
            ..NotificationSettings::default()
        })
        .unwrap();
    service.handle_url("https://example.org");
    assert!(service.store().state().recent_routes.is_empty());
}

#[test]
fn decide_does_not_launch_or_record() {
    let (service, launches, _) = service(false);
    let decision = service.decide("https://example.org");
    assert_eq!(decision.destination().map(|d| d.id.as_str()), Some("firefox.desktop"));
    assert!(launches.lock().unwrap().is_empty());
    assert!(service.store().state().recent_routes.is_empty());
}

#[test]
fn rule_validation_rejects_blank_fields_and_foreign_profiles() {
    let (mut service, _, _) = service(false);
    assert!(matches!(
        service.add_rule(Rule::new("  ", MatchType::Contains, "firefox.desktop")),
        Err(ServiceError::InvalidRule(_))
    ));
    assert!(matches!(
        service.add_rule(Rule::new("x", MatchType::Contains, "")),
        Err(ServiceError::InvalidRule(_))
    ));
    assert!(matches!(
        service.add_rule(
            Rule::new("x", MatchType::Contains, "firefox.desktop").with_profile("chrome:Default")
        ),
        Err(ServiceError::InvalidRule(_))
    ));

    // Destinations that are not installed yet are accepted.
    service
        .add_rule(Rule::new("x", MatchType::Contains, "opera.desktop").with_profile("opera:Default"))
        .unwrap();
    assert_eq!(service.store().rules().len(), 1);
}

#[test]
fn shared_router_serializes_access() {
    let (service, launches, _) = service(false);
    let shared = service.into_shared();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let shared = shared.clone();
            std::thread::spawn(move || {
                let mut router = shared.lock().unwrap();
                router.handle_url(&format!("https://example.org/{i}"));
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(launches.lock().unwrap().len(), 4);
    assert_eq!(shared.lock().unwrap().store().state().recent_routes.len(), 4);
}
