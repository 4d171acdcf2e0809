//! Alert broadcast. The storage core never talks to widgets; it reports
//! outcomes here and whatever front end is attached subscribes and decides
//! how to show them.

use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub message: String,
    pub level: AlertLevel,
}

pub type AlertListener = Arc<dyn Fn(&Alert) + Send + Sync>;

#[derive(Default)]
pub struct AlertSystem {
    listeners: Mutex<Vec<AlertListener>>,
}

impl AlertSystem {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn subscribe(&self, listener: AlertListener) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(listener);
        }
    }

    pub fn show(&self, message: &str, level: AlertLevel) {
        debug!(?level, message, "alert");
        let alert = Alert {
            message: message.to_string(),
            level,
        };
        if let Ok(listeners) = self.listeners.lock() {
            for listener in listeners.iter() {
                listener(&alert);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alerts_reach_all_listeners() {
        let alerts = AlertSystem::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..2 {
            let sink = seen.clone();
            alerts.subscribe(Arc::new(move |alert: &Alert| {
                sink.lock().unwrap().push(alert.message.clone());
            }));
        }

        alerts.show("Backup complete.", AlertLevel::Info);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|m| m == "Backup complete."));
    }

    #[test]
    fn test_show_without_listeners_is_fine() {
        let alerts = AlertSystem::new();
        alerts.show("No data to backup.", AlertLevel::Warning);
    }
}
