use serde::Serialize;

use crate::config_store::{get_or, ConfigAccessor};

pub const KEY_ZOOM_FACTOR: &str = "window.zoomFactor";
pub const KEY_DEBUG: &str = "app.debug";
pub const KEY_USER_AGENT: &str = "network.userAgent";
pub const KEY_DNS: &str = "network.dns";
pub const KEY_LANGUAGE: &str = "app.language";

const MIN_ZOOM: f64 = 0.25;
const MAX_ZOOM: f64 = 5.0;

fn default_zoom_factor() -> f64 {
    1.0
}

/// Zoom factor applied to every content surface after load.
pub fn zoom_factor(config: &dyn ConfigAccessor) -> f64 {
    let zoom: f64 = get_or(config, KEY_ZOOM_FACTOR, default_zoom_factor());
    if zoom.is_finite() && zoom > 0.0 {
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    } else {
        default_zoom_factor()
    }
}

pub fn debug_enabled(config: &dyn ConfigAccessor) -> bool {
    get_or(config, KEY_DEBUG, false)
}

/// Custom user agent, `None` when unset or blank.
pub fn user_agent(config: &dyn ConfigAccessor) -> Option<String> {
    get_or::<Option<String>>(config, KEY_USER_AGENT, None)
        .map(|ua| ua.trim().to_string())
        .filter(|ua| !ua.is_empty())
}

pub fn dns_servers(config: &dyn ConfigAccessor) -> Vec<String> {
    get_or::<Vec<String>>(config, KEY_DNS, Vec::new())
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect()
}

pub fn language(config: &dyn ConfigAccessor) -> Option<String> {
    get_or::<Option<String>>(config, KEY_LANGUAGE, None).filter(|l| !l.is_empty())
}

/// Snapshot of the settings the host reacts to, logged at startup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSettings {
    pub zoom_factor: f64,
    pub debug: bool,
    pub user_agent: Option<String>,
    pub dns: Vec<String>,
    pub language: Option<String>,
}

impl HostSettings {
    pub fn read(config: &dyn ConfigAccessor) -> Self {
        Self {
            zoom_factor: zoom_factor(config),
            debug: debug_enabled(config),
            user_agent: user_agent(config),
            dns: dns_servers(config),
            language: language(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_store::ConfigStore;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let store = ConfigStore::in_memory();
        let s = HostSettings::read(&store);
        assert_eq!(s.zoom_factor, 1.0);
        assert!(!s.debug);
        assert!(s.user_agent.is_none());
        assert!(s.dns.is_empty());
        assert!(s.language.is_none());
    }

    #[test]
    fn test_zoom_is_clamped() {
        let store = ConfigStore::in_memory();
        store.set(KEY_ZOOM_FACTOR, json!(12.0)).unwrap();
        assert_eq!(zoom_factor(&store), MAX_ZOOM);
        store.set(KEY_ZOOM_FACTOR, json!(0.1)).unwrap();
        assert_eq!(zoom_factor(&store), MIN_ZOOM);
        store.set(KEY_ZOOM_FACTOR, json!(-2.0)).unwrap();
        assert_eq!(zoom_factor(&store), 1.0);
    }

    #[test]
    fn test_blank_user_agent_is_none() {
        let store = ConfigStore::in_memory();
        store.set(KEY_USER_AGENT, json!("   ")).unwrap();
        assert!(user_agent(&store).is_none());
        store.set(KEY_USER_AGENT, json!(" Casement/0.3 ")).unwrap();
        assert_eq!(user_agent(&store).as_deref(), Some("Casement/0.3"));
    }

    #[test]
    fn test_dns_skips_blank_entries() {
        let store = ConfigStore::in_memory();
        store.set(KEY_DNS, json!(["1.1.1.1", "", "8.8.8.8"])).unwrap();
        assert_eq!(dns_servers(&store), vec!["1.1.1.1", "8.8.8.8"]);
    }
}
