// src/window/presets.rs
//
// Per-role window configuration.

use super::options::WindowOverrides;

pub const MAIN_WINDOW: &str = "main";
pub const BROWSER_WINDOW: &str = "browser";
pub const SNIFFER_PREFIX: &str = "sniffer-";
pub const AUTH_PREFIX: &str = "auth-";

struct WindowConfig {
    title: &'static str,
    url: &'static str,
    width: f64,
    height: f64,
    min_width: f64,
    min_height: f64,
}

fn get_window_config(name: &str) -> WindowConfig {
    match name {
        MAIN_WINDOW => WindowConfig {
            title: "Casement",
            url: "/",
            width: 1200.0,
            height: 800.0,
            min_width: 900.0,
            min_height: 600.0,
        },
        BROWSER_WINDOW => WindowConfig {
            title: "Browser",
            url: "/#/browser",
            width: 1100.0,
            height: 760.0,
            min_width: 800.0,
            min_height: 500.0,
        },
        n if n.starts_with(SNIFFER_PREFIX) => WindowConfig {
            title: "Sniffer",
            url: "/#/sniffer",
            width: 1000.0,
            height: 700.0,
            min_width: 800.0,
            min_height: 500.0,
        },
        n if n.starts_with(AUTH_PREFIX) => WindowConfig {
            title: "Sign in",
            url: "about:blank",
            width: 520.0,
            height: 720.0,
            min_width: 400.0,
            min_height: 500.0,
        },
        _ => WindowConfig {
            title: "Casement",
            url: "/",
            width: 900.0,
            height: 600.0,
            min_width: 700.0,
            min_height: 500.0,
        },
    }
}

/// Overrides for a window of the given role.
pub fn overrides_for(name: &str) -> WindowOverrides {
    let config = get_window_config(name);
    WindowOverrides {
        title: Some(config.title.to_string()),
        url: Some(config.url.to_string()),
        width: Some(config.width),
        height: Some(config.height),
        min_width: Some(config.min_width),
        min_height: Some(config.min_height),
        ..Default::default()
    }
}

/// Name of the sniffer window for a capture session.
pub fn sniffer_window_name(session_id: &str) -> String {
    format!("{}{}", SNIFFER_PREFIX, session_id)
}

/// Sniffer windows get their own route and storage partition so captured
/// sessions never share cookies with the main UI.
pub fn sniffer_overrides(session_id: &str) -> WindowOverrides {
    let mut o = overrides_for(&sniffer_window_name(session_id));
    o.url = Some(format!("/#/sniffer/{}", session_id));
    o.partition = Some(format!("persist:{}", sniffer_window_name(session_id)));
    o
}

pub fn auth_window_name() -> String {
    format!("{}{}", AUTH_PREFIX, uuid::Uuid::new_v4())
}

/// Windows named per instance (sign-in popups). Their names never repeat,
/// so nothing keyed by name is kept for them.
pub fn is_one_off(name: &str) -> bool {
    name.starts_with(AUTH_PREFIX)
}
