//! Navigation guard.
//!
//! Content never gets to open a top-level window or navigate away on its own.
//! New-window requests are turned into one of: an isolated auth window, a
//! local file handed to the OS, or a navigate message for the shared browser
//! window. In-place navigation is limited to the app's own origins.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::config::ShellConfig;
use crate::ipc::HostMessage;
use crate::window::presets::{self, AUTH_PREFIX, BROWSER_WINDOW};
use crate::window::registry::WindowRegistry;
use crate::window::table::FirstLoadTask;
use crate::window::{send, Opener, WindowHandle};

/// Storage partition for authentication windows.
pub const AUTH_PARTITION: &str = "persist:auth";

/// Pseudo-scheme content uses to reference files under the storage root.
pub const FILE_SCHEME_PREFIX: &str = "app-file://";

/// Pause between the browser window's first load and the navigate message,
/// so content has applied its own initial route.
pub const NAVIGATE_SETTLE_DELAY: Duration = Duration::from_millis(300);

/// Hosts whose sign-in pages get their own window. `*.` matches subdomains and
/// the bare domain.
const AUTH_HOSTS: &[&str] = &[
    "*.github.com",
    "accounts.google.com",
    "login.microsoftonline.com",
    "login.live.com",
    "appleid.apple.com",
    "*.gitlab.com",
];

/// Origins the app itself is served from in packaged builds.
const BUNDLED_ORIGINS: &[&str] = &[
    "tauri://localhost",
    "http://tauri.localhost",
    "https://tauri.localhost",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WindowOpenDecision {
    /// Open a real window, in this storage partition.
    Allow { partition: String },
    /// The platform must not open anything; the guard already handled it.
    Deny,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigationDecision {
    Proceed,
    Cancel,
}

fn host_matches(host: &str, pattern: &str) -> bool {
    let host = host.to_lowercase();
    let pattern = pattern.to_lowercase();
    match pattern.strip_prefix('*') {
        Some(suffix) => {
            host.ends_with(suffix)
                || suffix
                    .strip_prefix('.')
                    .map_or(false, |bare| host == bare)
        }
        None => host == pattern,
    }
}

/// Normalised `scheme://host[:port]`, `None` for opaque origins.
fn origin_of(raw: &str) -> Option<String> {
    let origin = Url::parse(raw).ok()?.origin().ascii_serialization();
    (origin != "null").then_some(origin)
}

/// Query parameter carrying the cache-busting stamp of a forced reload.
pub const RELOAD_PARAM: &str = "_reload";

/// URL to navigate to when reloading `current`. A forced reload carries a
/// fresh `_reload` stamp; a plain reload drops any stamp left by an earlier
/// forced one.
pub fn reload_url(current: &Url, ignore_cache: bool, stamp: i64) -> Url {
    let mut url = current.clone();
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| *k != RELOAD_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.set_query(None);
    if !kept.is_empty() || ignore_cache {
        let mut query = url.query_pairs_mut();
        query.extend_pairs(kept.iter());
        if ignore_cache {
            query.append_pair(RELOAD_PARAM, &stamp.to_string());
        }
    }
    url
}

pub struct NavigationGuard {
    registry: Arc<WindowRegistry>,
    opener: Arc<dyn Opener>,
    auth_hosts: Vec<String>,
    allowed_origins: Vec<String>,
    storage_root: PathBuf,
}

impl NavigationGuard {
    pub fn new(
        registry: Arc<WindowRegistry>,
        opener: Arc<dyn Opener>,
        config: &ShellConfig,
        storage_root: &Path,
    ) -> Self {
        let auth_hosts = AUTH_HOSTS
            .iter()
            .map(|h| h.to_string())
            .chain(config.auth_hosts.iter().cloned())
            .collect();

        let mut allowed_origins: Vec<String> = BUNDLED_ORIGINS.iter().map(|o| o.to_string()).collect();
        match origin_of(&config.dev_server_url) {
            Some(origin) => allowed_origins.push(origin),
            None => tlog!(
                "[navigation] Ignoring malformed dev server URL '{}'",
                config.dev_server_url
            ),
        }

        Self {
            registry,
            opener,
            auth_hosts,
            allowed_origins,
            storage_root: storage_root.to_path_buf(),
        }
    }

    pub fn is_auth_host(&self, host: &str) -> bool {
        self.auth_hosts.iter().any(|p| host_matches(host, p))
    }

    /// Map an `app-file://` reference onto the storage root. Anything that
    /// would leave the root is refused.
    pub fn resolve_file_url(&self, url: &str) -> Result<PathBuf, String> {
        let rest = url
            .get(..FILE_SCHEME_PREFIX.len())
            .filter(|p| p.eq_ignore_ascii_case(FILE_SCHEME_PREFIX))
            .map(|_| &url[FILE_SCHEME_PREFIX.len()..])
            .ok_or_else(|| format!("'{}' is not a file reference", url))?;
        let relative = rest.split(|c| c == '?' || c == '#').next().unwrap_or_default();

        let mut path = self.storage_root.clone();
        let mut depth = 0;
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => {
                    path.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(format!("'{}' escapes the storage root", url));
                }
            }
        }
        if depth == 0 {
            return Err(format!("'{}' names no file", url));
        }
        Ok(path)
    }

    /// Content asked for a new window showing `url`.
    pub fn open_window(&self, url: &str) -> WindowOpenDecision {
        if url
            .get(..FILE_SCHEME_PREFIX.len())
            .map_or(false, |p| p.eq_ignore_ascii_case(FILE_SCHEME_PREFIX))
        {
            match self.resolve_file_url(url) {
                Ok(path) => {
                    tlog!("[navigation] Opening {} with the OS handler", path.display());
                    if let Err(e) = self.opener.open_path(&path) {
                        tlog!("[navigation] Failed to open {}: {}", path.display(), e);
                    }
                }
                Err(e) => tlog!("[navigation] Refusing file reference: {}", e),
            }
            return WindowOpenDecision::Deny;
        }

        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                tlog!("[navigation] Ignoring malformed URL '{}': {}", url, e);
                return WindowOpenDecision::Deny;
            }
        };

        if parsed.host_str().map_or(false, |h| self.is_auth_host(h)) {
            tlog!("[navigation] Auth provider '{}', isolated window", url);
            return WindowOpenDecision::Allow {
                partition: AUTH_PARTITION.to_string(),
            };
        }

        if !matches!(parsed.scheme(), "http" | "https") {
            // mailto:, tel: and friends belong to the OS
            if let Err(e) = self.opener.open_url(url) {
                tlog!("[navigation] Failed to open '{}' externally: {}", url, e);
            }
            return WindowOpenDecision::Deny;
        }

        self.deliver_to_browser(url.to_string());
        WindowOpenDecision::Deny
    }

    /// Show `url` in the shared browser window, creating it if needed.
    fn deliver_to_browser(&self, url: String) {
        let registry = &self.registry;

        if registry.get_window(BROWSER_WINDOW).is_none() {
            if let Err(e) =
                registry.create_window(BROWSER_WINDOW, presets::overrides_for(BROWSER_WINDOW))
            {
                tlog!("[navigation] Failed to create browser window: {}", e);
                return;
            }
        } else {
            registry.show_window(BROWSER_WINDOW);
        }

        if registry.is_loaded(BROWSER_WINDOW) {
            if let Some(browser) = registry.get_window(BROWSER_WINDOW) {
                send(&browser, &HostMessage::Navigate(url));
            }
        } else {
            registry.on_first_load(BROWSER_WINDOW, self.navigate_after_settle(url));
        }
    }

    fn navigate_after_settle(&self, url: String) -> FirstLoadTask {
        let runtime = self.registry.runtime().clone();
        Box::new(move |browser: WindowHandle| {
            runtime.spawn(async move {
                tokio::time::sleep(NAVIGATE_SETTLE_DELAY).await;
                if !browser.is_destroyed() {
                    send(&browser, &HostMessage::Navigate(url));
                }
            });
        })
    }

    /// Content in window `window` is about to navigate in place to `url`.
    pub fn will_navigate(&self, window: &str, url: &str) -> NavigationDecision {
        // Sign-in flows redirect across provider pages
        if window.starts_with(AUTH_PREFIX) {
            return NavigationDecision::Proceed;
        }
        if url.eq_ignore_ascii_case("about:blank") {
            return NavigationDecision::Proceed;
        }

        let Some(origin) = origin_of(url) else {
            tlog!("[navigation] Cancelled navigation to malformed URL '{}'", url);
            return NavigationDecision::Cancel;
        };
        if self.allowed_origins.contains(&origin) {
            return NavigationDecision::Proceed;
        }

        tlog!("[navigation] '{}' left the app for {}, opening externally", window, url);
        if let Err(e) = self.opener.open_url(url) {
            tlog!("[navigation] Failed to open '{}' externally: {}", url, e);
        }
        NavigationDecision::Cancel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Os;
    use crate::testing::{registry_fixture, Fixture, MockOpener};
    use crate::window::WindowEvent;
    use serde_json::json;

    #[test]
    fn test_forced_reload_busts_cache() {
        let current = Url::parse("tauri://localhost/#/browser").unwrap();
        let forced = reload_url(&current, true, 1700);
        assert_eq!(forced.as_str(), "tauri://localhost/?_reload=1700#/browser");

        let again = reload_url(&forced, true, 1800);
        assert_eq!(again.as_str(), "tauri://localhost/?_reload=1800#/browser");
    }

    #[test]
    fn test_plain_reload_keeps_url() {
        let current = Url::parse("http://localhost:1420/?tab=2#/main").unwrap();
        assert_eq!(reload_url(&current, false, 1).as_str(), current.as_str());

        let stamped = reload_url(&current, true, 5);
        assert_eq!(stamped.as_str(), "http://localhost:1420/?tab=2&_reload=5#/main");
        assert_eq!(reload_url(&stamped, false, 6).as_str(), current.as_str());
    }

    fn guard(f: &Fixture, opener: &Arc<MockOpener>) -> NavigationGuard {
        let config = ShellConfig {
            auth_hosts: vec!["sso.example.org".into()],
            ..Default::default()
        };
        NavigationGuard::new(
            f.registry.clone(),
            opener.clone(),
            &config,
            Path::new("/data/files"),
        )
    }

    #[test]
    fn test_host_patterns() {
        assert!(host_matches("github.com", "*.github.com"));
        assert!(host_matches("api.GitHub.com", "*.github.com"));
        assert!(!host_matches("evilgithub.com", "*.github.com"));
        assert!(host_matches("accounts.google.com", "accounts.google.com"));
        assert!(!host_matches("google.com", "accounts.google.com"));
    }

    #[tokio::test]
    async fn test_auth_provider_gets_isolated_partition() {
        let f = registry_fixture(Os::Linux);
        let opener = MockOpener::new();
        let g = guard(&f, &opener);

        let decision = g.open_window("https://github.com/login/oauth/authorize?client_id=x");
        assert_eq!(
            decision,
            WindowOpenDecision::Allow {
                partition: AUTH_PARTITION.into()
            }
        );
        assert_eq!(
            g.open_window("https://sso.example.org/start"),
            WindowOpenDecision::Allow {
                partition: AUTH_PARTITION.into()
            }
        );
        assert_eq!(f.factory.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_urls_go_to_browser_after_first_load() {
        let f = registry_fixture(Os::Linux);
        let opener = MockOpener::new();
        let g = guard(&f, &opener);

        assert_eq!(g.open_window("https://example.com/"), WindowOpenDecision::Deny);
        let browser = f.factory.window(BROWSER_WINDOW).unwrap();
        assert_eq!(f.factory.options_for(BROWSER_WINDOW).unwrap().url, "/#/browser");
        assert!(browser.emitted_on("browser:navigate").is_empty());

        f.registry.handle_event(BROWSER_WINDOW, WindowEvent::ContentLoaded);
        tokio::time::sleep(NAVIGATE_SETTLE_DELAY - Duration::from_millis(10)).await;
        assert!(browser.emitted_on("browser:navigate").is_empty());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(
            browser.emitted_on("browser:navigate"),
            vec![json!({"url": "https://example.com/"})]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_loaded_browser_is_reused() {
        let f = registry_fixture(Os::Linux);
        let opener = MockOpener::new();
        let g = guard(&f, &opener);

        g.open_window("https://example.com/a");
        f.registry.handle_event(BROWSER_WINDOW, WindowEvent::ContentLoaded);
        g.open_window("https://example.com/b");

        let browser = f.factory.window(BROWSER_WINDOW).unwrap();
        assert_eq!(f.factory.count(), 1);
        assert_eq!(
            browser.emitted_on("browser:navigate"),
            vec![json!({"url": "https://example.com/b"})]
        );
        assert_eq!(f.registry.names(), vec![BROWSER_WINDOW]);
    }

    #[tokio::test]
    async fn test_file_reference_opens_with_os_and_no_window() {
        let f = registry_fixture(Os::Linux);
        let opener = MockOpener::new();
        let g = guard(&f, &opener);

        assert_eq!(
            g.open_window("app-file://exports/report.pdf"),
            WindowOpenDecision::Deny
        );
        assert_eq!(
            opener.paths(),
            vec![PathBuf::from("/data/files/exports/report.pdf")]
        );
        assert_eq!(f.factory.count(), 0);
    }

    #[tokio::test]
    async fn test_file_reference_cannot_escape_root() {
        let f = registry_fixture(Os::Linux);
        let opener = MockOpener::new();
        let g = guard(&f, &opener);

        assert_eq!(
            g.open_window("app-file://../../etc/passwd"),
            WindowOpenDecision::Deny
        );
        assert!(g.resolve_file_url("app-file:///etc/passwd").is_err());
        assert!(g.resolve_file_url("app-file://").is_err());
        assert!(opener.paths().is_empty());
        assert_eq!(f.factory.count(), 0);
    }

    #[tokio::test]
    async fn test_non_web_schemes_open_externally() {
        let f = registry_fixture(Os::Linux);
        let opener = MockOpener::new();
        let g = guard(&f, &opener);

        assert_eq!(g.open_window("mailto:a@b.test"), WindowOpenDecision::Deny);
        assert_eq!(opener.urls(), vec!["mailto:a@b.test"]);
        assert_eq!(f.factory.count(), 0);
    }

    #[tokio::test]
    async fn test_in_place_navigation() {
        let f = registry_fixture(Os::Linux);
        let opener = MockOpener::new();
        let g = guard(&f, &opener);

        assert_eq!(
            g.will_navigate("main", "http://localhost:1420/#/settings"),
            NavigationDecision::Proceed
        );
        assert_eq!(
            g.will_navigate("main", "tauri://localhost/index.html"),
            NavigationDecision::Proceed
        );
        assert_eq!(
            g.will_navigate("main", "https://example.com/"),
            NavigationDecision::Cancel
        );
        assert_eq!(opener.urls(), vec!["https://example.com/"]);

        assert_eq!(g.will_navigate("main", "not a url"), NavigationDecision::Cancel);
        assert_eq!(opener.urls().len(), 1);

        assert_eq!(
            g.will_navigate("auth-1234", "https://github.com/session"),
            NavigationDecision::Proceed
        );
    }
}
