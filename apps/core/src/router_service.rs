use std::sync::{Arc, Mutex};

use crate::catalog::DestinationCatalog;
use crate::config::{validate, Config};
use crate::contract::{DecisionResponse, DestinationDto, RecentRouteDto, RouterRequest, RouterResponse};
use crate::discovery::{DesktopEntrySource, DestinationSource, DiscoveryError, SourceScan};
use crate::dispatch::{route_with_last_resort, Decision};
use crate::launcher::{Launcher, ProcessLauncher};
use crate::matcher::{pattern_error, TargetUrl};
use crate::model::{RecentRoute, Rule};
use crate::notifier::{LogNotifier, NotificationHints, Notifier, RouteEvent};
use crate::preferences::StoreError;
use crate::profiles::ProfileLocator;
use crate::rule_store::RoutingStore;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("config error: {0}")]
    Config(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("discovery error: {0}")]
    Discovery(#[from] DiscoveryError),
    #[error("invalid rule: {0}")]
    InvalidRule(String),
}

/// Serialized access for URL events, catalog refreshes and rule edits.
pub type SharedRouter = Arc<Mutex<RouterService>>;

/// Owns the routing store, destination catalog and the launch/notify
/// collaborators. Dispatch reads store and catalog without mutating either.
pub struct RouterService {
    config: Config,
    store: RoutingStore,
    catalog: DestinationCatalog,
    launcher: Box<dyn Launcher>,
    notifier: Box<dyn Notifier>,
}

impl RouterService {
    /// Opens the store from `config.store_db_path` and scans desktop entries.
    pub fn new(config: Config) -> Result<Self, ServiceError> {
        validate(&config).map_err(ServiceError::Config)?;
        let store = RoutingStore::open_file(&config.store_db_path)?;
        let source = DesktopEntrySource::new(
            config.application_dirs.clone(),
            config.mimeapps_paths.clone(),
            &config.reference_scheme,
        );
        let mut service = Self::with_parts(config, store, Box::new(source))?;
        service.refresh_catalog()?;
        Ok(service)
    }

    /// Builds a service around an existing store and source; the catalog
    /// starts empty until `refresh_catalog` runs.
    pub fn with_parts(
        config: Config,
        store: RoutingStore,
        source: Box<dyn DestinationSource>,
    ) -> Result<Self, ServiceError> {
        validate(&config).map_err(ServiceError::Config)?;
        let catalog = DestinationCatalog::new(
            source,
            ProfileLocator::new(config.profile_home.clone()),
            &config.self_destination_id,
        );
        Ok(Self {
            config,
            store,
            catalog,
            launcher: Box::new(ProcessLauncher),
            notifier: Box::new(LogNotifier),
        })
    }

    pub fn with_launcher(mut self, launcher: Box<dyn Launcher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn into_shared(self) -> SharedRouter {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &RoutingStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut RoutingStore {
        &mut self.store
    }

    pub fn catalog(&self) -> &DestinationCatalog {
        &self.catalog
    }

    pub fn refresh_catalog(&mut self) -> Result<usize, ServiceError> {
        Ok(self.catalog.refresh()?)
    }

    pub fn apply_scan(&mut self, scan: SourceScan) -> usize {
        self.catalog.replace(scan)
    }

    /// Decision only; nothing is launched or recorded.
    pub fn decide(&self, url: &str) -> Decision {
        route_with_last_resort(
            url,
            self.store.state(),
            &self.catalog,
            &self.config.last_resort_destination_id,
        )
    }

    /// Routes `url`, hands it to the launcher, then records and announces the
    /// route. Launch failures are logged and do not change the decision.
    pub fn handle_url(&mut self, url: &str) -> Decision {
        let decision = self.decide(url);
        let Some(destination) = decision.destination() else {
            tracing::warn!(url, "no destination for url");
            return decision;
        };

        if let Err(error) = self.launcher.launch(destination, url, decision.profile()) {
            tracing::error!(destination = %destination.id, %error, "launch failed");
        }

        let settings = self.store.state().notification_settings.clone();
        if settings.track_recent {
            let route = RecentRoute::new(url, &destination.name);
            if let Err(error) = self.store.record_recent_route(route) {
                tracing::warn!(%error, "failed to record recent route");
            }
        }

        let event = RouteEvent {
            url: url.to_string(),
            host: TargetUrl::parse(url)
                .ok()
                .and_then(|target| target.host().map(str::to_string)),
            destination_id: destination.id.clone(),
            destination_name: destination.name.clone(),
            badge_letter: self.catalog.badge_letter(&destination.id),
        };
        self.notifier
            .notify(&event, &NotificationHints::from_settings(&settings));

        decision
    }

    /// Checks a rule against the current catalog before it is stored.
    pub fn validate_rule(&self, rule: &Rule) -> Result<(), ServiceError> {
        if rule.pattern.trim().is_empty() {
            return Err(ServiceError::InvalidRule("pattern is required".into()));
        }
        if rule.destination_id.trim().is_empty() {
            return Err(ServiceError::InvalidRule("destination is required".into()));
        }
        if let (Some(profile_id), Some(destination)) = (
            rule.profile_id.as_deref(),
            self.catalog.destination(&rule.destination_id),
        ) {
            if destination.profile(profile_id).is_none() {
                return Err(ServiceError::InvalidRule(format!(
                    "profile '{profile_id}' does not belong to {}",
                    destination.id
                )));
            }
        }
        if let Some(error) = pattern_error(rule) {
            tracing::warn!(pattern = %rule.pattern, %error, "rule pattern will never match");
        }
        Ok(())
    }

    pub fn add_rule(&mut self, rule: Rule) -> Result<Rule, ServiceError> {
        self.validate_rule(&rule)?;
        Ok(self.store.add(rule)?)
    }

    pub fn update_rule(&mut self, rule: Rule) -> Result<(), ServiceError> {
        self.validate_rule(&rule)?;
        Ok(self.store.update(rule)?)
    }

    pub fn handle_command(&mut self, request: RouterRequest) -> Result<RouterResponse, ServiceError> {
        let response = match request {
            RouterRequest::Route(req) => RouterResponse::Decision(self.handle_url(&req.url).into()),
            RouterRequest::Test(req) => RouterResponse::Decision(DecisionResponse::from(self.decide(&req.url))),
            RouterRequest::ListRules => RouterResponse::Rules(self.store.rules().to_vec()),
            RouterRequest::AddRule(rule) => RouterResponse::Rule(self.add_rule(rule)?),
            RouterRequest::UpdateRule(rule) => {
                let id = rule.id.clone();
                self.update_rule(rule)?;
                match self.store.rule(&id) {
                    Some(rule) => RouterResponse::Rule(rule.clone()),
                    None => RouterResponse::Done,
                }
            }
            RouterRequest::DeleteRule(req) => RouterResponse::Rule(self.store.delete(&req.id)?),
            RouterRequest::MoveRules(req) => {
                self.store.move_rules(&req.ids, req.to_position)?;
                RouterResponse::Rules(self.store.rules().to_vec())
            }
            RouterRequest::ToggleRouting => RouterResponse::Routing {
                enabled: self.store.toggle_enabled()?,
            },
            RouterRequest::SetFallback(req) => {
                self.store.set_fallback(req.destination_id.as_deref())?;
                RouterResponse::Done
            }
            RouterRequest::ListDestinations => {
                let default_id = self.catalog.default_id();
                RouterResponse::Destinations(
                    self.catalog
                        .destinations()
                        .iter()
                        .map(|d| DestinationDto::new(d, default_id))
                        .collect(),
                )
            }
            RouterRequest::RecentRoutes => RouterResponse::RecentRoutes(
                self.store
                    .state()
                    .recent_routes
                    .iter()
                    .map(RecentRouteDto::from)
                    .collect(),
            ),
            RouterRequest::ClearRecent => {
                self.store.clear_recent_routes()?;
                RouterResponse::Done
            }
        };
        Ok(response)
    }
}
