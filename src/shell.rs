// src/shell.rs
//
// The application service object. Built once at startup and handed to the
// desktop backend; owns the window registry, navigation guard and redirect
// map, and exposes the entry-point window API.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tokio::runtime::Handle;

use crate::config::ShellConfig;
use crate::config_store::ConfigAccessor;
use crate::ipc::ContentMessage;
use crate::locale;
use crate::navigation::{NavigationDecision, NavigationGuard, WindowOpenDecision};
use crate::network::{self, Headers, PendingRedirects};
use crate::platform::PlatformInfo;
use crate::settings::{self, HostSettings};
use crate::window::geometry::GeometryStore;
use crate::window::presets::{self, BROWSER_WINDOW, MAIN_WINDOW};
use crate::window::registry::{RegistryDeps, WindowRegistry};
use crate::window::{Clock, HostApp, Opener, WindowFactory, WindowHandle};

pub struct ShellDeps {
    pub platform: PlatformInfo,
    pub factory: Arc<dyn WindowFactory>,
    pub host: Arc<dyn HostApp>,
    pub opener: Arc<dyn Opener>,
    pub config: Arc<dyn ConfigAccessor>,
    pub geometry: Arc<dyn GeometryStore>,
    pub clock: Arc<dyn Clock>,
    pub runtime: Handle,
    pub shell_config: ShellConfig,
    pub storage_root: PathBuf,
}

pub struct Shell {
    registry: Arc<WindowRegistry>,
    guard: NavigationGuard,
    redirects: PendingRedirects,
    config: Arc<dyn ConfigAccessor>,
    host: Arc<dyn HostApp>,
    health_check: bool,
}

impl Shell {
    pub fn new(deps: ShellDeps) -> Self {
        let registry = WindowRegistry::new(RegistryDeps {
            platform: deps.platform,
            factory: deps.factory,
            host: deps.host.clone(),
            config: deps.config.clone(),
            geometry: deps.geometry,
            clock: deps.clock,
            runtime: deps.runtime,
        });
        let guard = NavigationGuard::new(
            registry.clone(),
            deps.opener,
            &deps.shell_config,
            &deps.storage_root,
        );

        Self {
            registry,
            guard,
            redirects: PendingRedirects::new(),
            config: deps.config,
            host: deps.host,
            health_check: deps.shell_config.health_check,
        }
    }

    pub fn registry(&self) -> &Arc<WindowRegistry> {
        &self.registry
    }

    pub fn redirects(&self) -> &PendingRedirects {
        &self.redirects
    }

    /// Log the effective settings, start the health watchdog and open the
    /// main window.
    pub fn start(&self) -> Result<WindowHandle, String> {
        let host_settings = HostSettings::read(self.config.as_ref());
        tlog!(
            "[shell] Starting on {:?} (dev: {}) with {}",
            self.registry.platform().os,
            self.registry.platform().is_dev(),
            serde_json::to_string(&host_settings).unwrap_or_default()
        );
        if self.health_check {
            self.registry.start_health_watchdog();
        }
        self.create_main_window()
    }

    // ------------------------------------------------------------------
    // Entry-point window API
    // ------------------------------------------------------------------

    pub fn create_main_window(&self) -> Result<WindowHandle, String> {
        self.registry
            .create_window(MAIN_WINDOW, presets::overrides_for(MAIN_WINDOW))
    }

    pub fn create_browser_window(&self) -> Result<WindowHandle, String> {
        self.registry
            .create_window(BROWSER_WINDOW, presets::overrides_for(BROWSER_WINDOW))
    }

    pub fn create_sniffer_window(&self, session_id: &str) -> Result<WindowHandle, String> {
        if session_id.is_empty() {
            return Err("Sniffer session id is empty".to_string());
        }
        self.registry.create_window(
            &presets::sniffer_window_name(session_id),
            presets::sniffer_overrides(session_id),
        )
    }

    pub fn get_all_names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn get_all_windows(&self) -> Vec<WindowHandle> {
        self.registry.windows()
    }

    pub fn show_all_windows(&self) {
        self.registry.show_all();
    }

    pub fn hide_all_windows(&self) {
        self.registry.hide_all();
    }

    pub fn toggle_all_windows(&self) {
        self.registry.toggle_all();
    }

    pub fn close_all_windows(&self) {
        self.registry.close_all();
    }

    pub fn reload_all_windows(&self, force: bool) {
        self.registry.reload_all(force);
    }

    /// Close every window once the host is quitting; the registry finishes
    /// the quit when the last one is gone.
    pub fn shutdown(&self) {
        if self.registry.names().is_empty() {
            self.host.quit();
        } else {
            self.close_all_windows();
        }
    }

    // ------------------------------------------------------------------
    // Content requests
    // ------------------------------------------------------------------

    /// Route a `(channel, payload)` message sent by content in `window`.
    pub fn handle_message(&self, window: &str, channel: &str, payload: Value) -> Result<(), String> {
        match ContentMessage::parse(channel, payload)? {
            ContentMessage::OpenWindow { url } => {
                self.open_window(&url)?;
            }
            other => self.registry.handle_message(window, other),
        }
        Ok(())
    }

    /// New-window request from content. Returns the window that was opened,
    /// if the guard allowed one.
    pub fn open_window(&self, url: &str) -> Result<Option<WindowHandle>, String> {
        match self.guard.open_window(url) {
            WindowOpenDecision::Allow { partition } => {
                let name = presets::auth_window_name();
                let mut overrides = presets::overrides_for(&name);
                overrides.url = Some(url.to_string());
                overrides.partition = Some(partition);
                self.registry.create_window(&name, overrides).map(Some)
            }
            WindowOpenDecision::Deny => Ok(None),
        }
    }

    pub fn will_navigate(&self, window: &str, url: &str) -> NavigationDecision {
        self.guard.will_navigate(window, url)
    }

    /// A context-menu entry was clicked.
    pub fn handle_menu_event(&self, window: &str, id: &str) -> bool {
        self.registry.handle_menu_action(window, id)
    }

    /// `app.language` if set, else derived from the system locale.
    pub fn default_language(&self, system_locale: Option<&str>) -> String {
        settings::language(self.config.as_ref()).unwrap_or_else(|| {
            let env_locale = locale::locale_from_env();
            locale::resolve_default_language(system_locale.or(env_locale.as_deref())).to_string()
        })
    }

    /// Outgoing request headers for `request_id`, after host policy.
    pub fn request_headers(&self, request_id: u64, headers: Headers) -> Headers {
        network::rewrite_request_headers(self.config.as_ref(), &self.redirects, request_id, headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_store::ConfigStore;
    use crate::navigation::AUTH_PARTITION;
    use crate::platform::Os;
    use crate::testing::{ManualClock, MemoryGeometry, MockFactory, MockHost, MockOpener};
    use crate::window::same_window;
    use serde_json::json;

    struct Harness {
        shell: Shell,
        factory: Arc<MockFactory>,
        host: Arc<MockHost>,
        opener: Arc<MockOpener>,
        config: Arc<ConfigStore>,
    }

    fn harness() -> Harness {
        let factory = MockFactory::new();
        let host = MockHost::new();
        let opener = MockOpener::new();
        let config = Arc::new(ConfigStore::in_memory());
        let shell = Shell::new(ShellDeps {
            platform: PlatformInfo::new(Os::Linux, false),
            factory: factory.clone(),
            host: host.clone(),
            opener: opener.clone(),
            config: config.clone(),
            geometry: MemoryGeometry::new(),
            clock: ManualClock::new(0),
            runtime: Handle::current(),
            shell_config: ShellConfig {
                health_check: false,
                ..Default::default()
            },
            storage_root: PathBuf::from("/data/files"),
        });
        Harness {
            shell,
            factory,
            host,
            opener,
            config,
        }
    }

    #[tokio::test]
    async fn test_two_browser_creates_share_one_entry() {
        let h = harness();
        let a = h.shell.create_browser_window().unwrap();
        let b = h.shell.create_browser_window().unwrap();
        assert!(same_window(&a, &b));
        assert_eq!(h.shell.get_all_names(), vec!["browser"]);
        assert_eq!(h.shell.get_all_windows().len(), 1);
    }

    #[tokio::test]
    async fn test_start_opens_main_window() {
        let h = harness();
        h.shell.start().unwrap();
        assert_eq!(h.shell.get_all_names(), vec!["main"]);
        assert_eq!(h.factory.options_for("main").unwrap().width, 1200.0);
    }

    #[tokio::test]
    async fn test_sniffer_windows_are_per_session() {
        let h = harness();
        h.shell.create_sniffer_window("a1").unwrap();
        h.shell.create_sniffer_window("b2").unwrap();
        h.shell.create_sniffer_window("a1").unwrap();

        assert_eq!(h.shell.get_all_names(), vec!["sniffer-a1", "sniffer-b2"]);
        let opts = h.factory.options_for("sniffer-a1").unwrap();
        assert_eq!(opts.partition.as_deref(), Some("persist:sniffer-a1"));
        assert!(h.shell.create_sniffer_window("").is_err());
    }

    #[tokio::test]
    async fn test_open_auth_url_creates_isolated_window() {
        let h = harness();
        h.shell
            .handle_message(
                "main",
                "window:open",
                json!({"url": "https://github.com/login"}),
            )
            .unwrap();

        let names = h.shell.get_all_names();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("auth-"));
        let opts = h.factory.options_for(&names[0]).unwrap();
        assert_eq!(opts.partition.as_deref(), Some(AUTH_PARTITION));
        assert_eq!(opts.url, "https://github.com/login");
    }

    #[tokio::test]
    async fn test_open_file_reference_opens_nothing() {
        let h = harness();
        h.shell
            .handle_message("main", "window:open", json!("app-file://a/b.txt"))
            .unwrap();
        assert!(h.shell.get_all_names().is_empty());
        assert_eq!(h.opener.paths(), vec![PathBuf::from("/data/files/a/b.txt")]);
    }

    #[tokio::test]
    async fn test_unknown_channel_is_an_error() {
        let h = harness();
        assert!(h.shell.handle_message("main", "bogus", Value::Null).is_err());
    }

    #[tokio::test]
    async fn test_bulk_operations() {
        let h = harness();
        h.shell.create_main_window().unwrap();
        h.shell.create_browser_window().unwrap();

        h.shell.hide_all_windows();
        assert!(h.shell.get_all_windows().iter().all(|w| !w.is_visible()));
        h.shell.show_all_windows();
        h.host.run_deferred();
        assert!(h.shell.get_all_windows().iter().all(|w| w.is_visible()));

        h.shell.reload_all_windows(true);
        let main = h.factory.window("main").unwrap();
        assert!(main.calls().contains(&"reload(true)".to_string()));

        h.shell.close_all_windows();
        assert!(h.shell.get_all_names().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_quits_when_drained() {
        let h = harness();
        h.shell.create_main_window().unwrap();
        h.host.set_quitting(true);

        h.shell.shutdown();
        assert!(h.shell.get_all_names().is_empty());
        assert_eq!(h.host.quits(), 1);
    }

    #[tokio::test]
    async fn test_default_language() {
        let h = harness();
        assert_eq!(h.shell.default_language(Some("zh-Hant-TW")), "zh-TW");
        h.config.set(settings::KEY_LANGUAGE, json!("de-DE")).unwrap();
        assert_eq!(h.shell.default_language(Some("zh-Hant-TW")), "de-DE");
    }

    #[tokio::test]
    async fn test_request_headers_apply_user_agent() {
        let h = harness();
        h.config
            .set(settings::KEY_USER_AGENT, json!("Casement"))
            .unwrap();
        let headers = h.shell.request_headers(1, vec![]);
        assert_eq!(headers, vec![("User-Agent".to_string(), "Casement".to_string())]);
    }
}
