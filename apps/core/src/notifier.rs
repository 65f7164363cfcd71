use crate::model::NotificationSettings;

/// What was routed where; handed to the notification collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEvent {
    pub url: String,
    pub host: Option<String>,
    pub destination_id: String,
    pub destination_name: String,
    pub badge_letter: char,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotificationHints {
    pub banner: bool,
    pub flash_icon: bool,
    pub sound: Option<String>,
}

impl NotificationHints {
    pub fn from_settings(settings: &NotificationSettings) -> Self {
        Self {
            banner: settings.show_banner,
            flash_icon: settings.flash_icon,
            sound: settings
                .play_sound
                .then(|| settings.sound_name.clone())
                .filter(|name| !name.trim().is_empty()),
        }
    }

    pub fn is_silent(&self) -> bool {
        !self.banner && !self.flash_icon && self.sound.is_none()
    }
}

pub trait Notifier: Send {
    fn notify(&self, event: &RouteEvent, hints: &NotificationHints);
}

/// Writes routing events to the log; stands in where no desktop shell is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &RouteEvent, hints: &NotificationHints) {
        if hints.is_silent() {
            return;
        }
        tracing::info!(
            url = %event.url,
            destination = %event.destination_name,
            badge = %event.badge_letter,
            banner = hints.banner,
            flash_icon = hints.flash_icon,
            sound = hints.sound.as_deref().unwrap_or(""),
            "url routed"
        );
    }
}
