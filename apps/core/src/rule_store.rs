use std::collections::HashSet;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};

use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::model::{NotificationSettings, RecentRoute, RoutingState, Rule};
use crate::preferences::{self, StoreError};

pub const ENABLED_KEY: &str = "linkroute.enabled";
pub const RULES_KEY: &str = "linkroute.rules";
pub const NOTIFICATIONS_KEY: &str = "linkroute.notifications";
pub const RECENT_KEY: &str = "linkroute.recent";
pub const FALLBACK_KEY: &str = "linkroute.fallback";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    RulesChanged,
    RoutingToggled(bool),
    FallbackChanged(Option<String>),
    NotificationSettingsChanged,
    RecentRoutesChanged,
}

/// Persisted routing configuration.
///
/// Each field group lives in its own record and is loaded on its own: a
/// missing or corrupt record falls back to that field's default and leaves
/// the others intact. Every mutation writes through before returning.
pub struct RoutingStore {
    db: Connection,
    state: RoutingState,
    subscribers: Vec<Sender<StoreEvent>>,
}

impl RoutingStore {
    pub fn open(db: Connection) -> Self {
        let state = load_state(&db);
        tracing::debug!(
            rules = state.rules.len(),
            recent = state.recent_routes.len(),
            enabled = state.routing_enabled,
            "routing store loaded"
        );
        Self {
            db,
            state,
            subscribers: Vec::new(),
        }
    }

    pub fn open_file(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::open(preferences::open_file(path)?))
    }

    pub fn open_memory() -> Result<Self, StoreError> {
        Ok(Self::open(preferences::open_memory()?))
    }

    pub fn state(&self) -> &RoutingState {
        &self.state
    }

    pub fn rules(&self) -> &[Rule] {
        &self.state.rules
    }

    pub fn rule(&self, id: &str) -> Option<&Rule> {
        self.state.rules.iter().find(|rule| rule.id == id)
    }

    /// Re-reads every record from the backing database.
    pub fn reload(&mut self) {
        self.state = load_state(&self.db);
    }

    /// Change notifications for observers; a dropped receiver is pruned on the next send.
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Appends `rule` after every existing rule and returns it with its priority.
    pub fn add(&mut self, mut rule: Rule) -> Result<Rule, StoreError> {
        if self.rule(&rule.id).is_some() {
            rule.id = uuid::Uuid::new_v4().to_string();
        }
        rule.priority = self
            .state
            .rules
            .iter()
            .map(|r| r.priority)
            .max()
            .map(|max| max + 1)
            .unwrap_or(0);

        let mut rules = self.state.rules.clone();
        rules.push(rule.clone());
        self.commit_rules(rules)?;
        tracing::info!(rule_id = %rule.id, priority = rule.priority, "rule added");
        Ok(rule)
    }

    pub fn update(&mut self, rule: Rule) -> Result<(), StoreError> {
        let Some(index) = self.state.rules.iter().position(|r| r.id == rule.id) else {
            return Err(StoreError::RuleNotFound(rule.id));
        };
        let mut rules = self.state.rules.clone();
        rules[index] = rule;
        rules.sort_by_key(|r| r.priority);
        self.commit_rules(rules)
    }

    pub fn set_rule_enabled(&mut self, id: &str, enabled: bool) -> Result<(), StoreError> {
        let Some(rule) = self.rule(id) else {
            return Err(StoreError::RuleNotFound(id.to_string()));
        };
        let mut rule = rule.clone();
        rule.enabled = enabled;
        self.update(rule)
    }

    pub fn delete(&mut self, id: &str) -> Result<Rule, StoreError> {
        let Some(index) = self.state.rules.iter().position(|r| r.id == id) else {
            return Err(StoreError::RuleNotFound(id.to_string()));
        };
        let mut rules = self.state.rules.clone();
        let removed = rules.remove(index);
        self.commit_rules(rules)?;
        tracing::info!(rule_id = %id, "rule deleted");
        Ok(removed)
    }

    /// Moves the rules named by `ids` so they sit before the rule that was at
    /// `to_position` (or at the end when past the last rule). Moved rules keep
    /// their relative order; unknown ids are ignored.
    pub fn move_rules(&mut self, ids: &[String], to_position: usize) -> Result<(), StoreError> {
        let selected: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let target = to_position.min(self.state.rules.len());
        let moved_before_target = self.state.rules[..target]
            .iter()
            .filter(|r| selected.contains(r.id.as_str()))
            .count();

        let (moved, mut rules): (Vec<Rule>, Vec<Rule>) = self
            .state
            .rules
            .iter()
            .cloned()
            .partition(|r| selected.contains(r.id.as_str()));
        if moved.is_empty() {
            return Ok(());
        }

        let insert_at = target - moved_before_target;
        rules.splice(insert_at..insert_at, moved);
        self.commit_rules(rules)
    }

    pub fn toggle_enabled(&mut self) -> Result<bool, StoreError> {
        let enabled = !self.state.routing_enabled;
        write_record(&self.db, ENABLED_KEY, &enabled)?;
        self.state.routing_enabled = enabled;
        tracing::info!(enabled, "routing toggled");
        self.emit(StoreEvent::RoutingToggled(enabled));
        Ok(enabled)
    }

    pub fn set_fallback(&mut self, destination_id: Option<&str>) -> Result<(), StoreError> {
        let destination_id = destination_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        match &destination_id {
            Some(id) => write_record(&self.db, FALLBACK_KEY, id)?,
            None => preferences::remove_value(&self.db, FALLBACK_KEY)?,
        }
        self.state.fallback_destination_id = destination_id.clone();
        self.emit(StoreEvent::FallbackChanged(destination_id));
        Ok(())
    }

    pub fn set_notification_settings(
        &mut self,
        settings: NotificationSettings,
    ) -> Result<(), StoreError> {
        let settings = settings.clamped();
        write_record(&self.db, NOTIFICATIONS_KEY, &settings)?;
        let max = settings.max_recent_urls;
        self.state.notification_settings = settings;
        self.emit(StoreEvent::NotificationSettingsChanged);

        if self.state.recent_routes.len() > max {
            let mut recent = self.state.recent_routes.clone();
            recent.truncate(max);
            self.commit_recent(recent)?;
        }
        Ok(())
    }

    /// Prepends `route` and trims the history; only the history record is written.
    pub fn record_recent_route(&mut self, route: RecentRoute) -> Result<(), StoreError> {
        let mut recent = Vec::with_capacity(self.state.recent_routes.len() + 1);
        recent.push(route);
        recent.extend(self.state.recent_routes.iter().cloned());
        recent.truncate(self.state.notification_settings.max_recent_urls);
        self.commit_recent(recent)
    }

    pub fn clear_recent_routes(&mut self) -> Result<(), StoreError> {
        preferences::remove_value(&self.db, RECENT_KEY)?;
        self.state.recent_routes.clear();
        self.emit(StoreEvent::RecentRoutesChanged);
        Ok(())
    }

    fn commit_rules(&mut self, mut rules: Vec<Rule>) -> Result<(), StoreError> {
        reindex(&mut rules);
        write_record(&self.db, RULES_KEY, &rules)?;
        self.state.rules = rules;
        self.emit(StoreEvent::RulesChanged);
        Ok(())
    }

    fn commit_recent(&mut self, recent: Vec<RecentRoute>) -> Result<(), StoreError> {
        write_record(&self.db, RECENT_KEY, &recent)?;
        self.state.recent_routes = recent;
        self.emit(StoreEvent::RecentRoutesChanged);
        Ok(())
    }

    fn emit(&mut self, event: StoreEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

fn reindex(rules: &mut [Rule]) {
    for (index, rule) in rules.iter_mut().enumerate() {
        rule.priority = index as i64;
    }
}

fn write_record<T: Serialize + ?Sized>(
    db: &Connection,
    key: &'static str,
    value: &T,
) -> Result<(), StoreError> {
    let encoded =
        serde_json::to_string(value).map_err(|source| StoreError::Encode { key, source })?;
    preferences::set_value(db, key, &encoded)?;
    Ok(())
}

fn read_raw(db: &Connection, key: &str) -> Option<String> {
    match preferences::get_value(db, key) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(key, %error, "failed to read record; using default");
            None
        }
    }
}

fn read_record<T: DeserializeOwned>(db: &Connection, key: &str) -> Option<T> {
    let raw = read_raw(db, key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(key, %error, "corrupt record; using default");
            None
        }
    }
}

/// Decodes a JSON array element by element, dropping entries that fail.
fn read_list<T: DeserializeOwned>(db: &Connection, key: &str) -> Vec<T> {
    let Some(items) = read_record::<Vec<serde_json::Value>>(db, key) else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(key, %error, "dropping corrupt entry");
                None
            }
        })
        .collect()
}

fn load_state(db: &Connection) -> RoutingState {
    let routing_enabled = read_record::<bool>(db, ENABLED_KEY).unwrap_or(true);

    let mut seen = HashSet::new();
    let mut rules: Vec<Rule> = read_list::<Rule>(db, RULES_KEY)
        .into_iter()
        .filter(|rule| seen.insert(rule.id.clone()))
        .collect();
    rules.sort_by_key(|rule| rule.priority);
    reindex(&mut rules);

    let notification_settings = read_record::<NotificationSettings>(db, NOTIFICATIONS_KEY)
        .map(NotificationSettings::clamped)
        .unwrap_or_default();

    let mut recent_routes = read_list::<RecentRoute>(db, RECENT_KEY);
    recent_routes.truncate(notification_settings.max_recent_urls);

    let fallback_destination_id =
        read_record::<String>(db, FALLBACK_KEY).filter(|id| !id.trim().is_empty());

    RoutingState {
        rules,
        routing_enabled,
        fallback_destination_id,
        notification_settings,
        recent_routes,
    }
}

#[cfg(test)]
mod tests {
    use super::{RoutingStore, StoreEvent};
    use crate::model::{MatchType, Rule};

    #[test]
    fn subscribers_receive_mutation_events() {
        let mut store = RoutingStore::open_memory().unwrap();
        let events = store.subscribe();

        store
            .add(Rule::new("github", MatchType::Contains, "firefox.desktop"))
            .unwrap();
        store.toggle_enabled().unwrap();
        store.set_fallback(Some("chromium.desktop")).unwrap();

        let received: Vec<StoreEvent> = events.try_iter().collect();
        assert_eq!(
            received,
            vec![
                StoreEvent::RulesChanged,
                StoreEvent::RoutingToggled(false),
                StoreEvent::FallbackChanged(Some("chromium.desktop".to_string())),
            ]
        );
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut store = RoutingStore::open_memory().unwrap();
        drop(store.subscribe());
        store.toggle_enabled().unwrap();
        assert!(store.subscribers.is_empty());
    }
}
