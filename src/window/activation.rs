//! Platform window activation strategies.
//!
//! Each OS needs its own sequence to reliably bring a window to the front
//! and to hide it without side effects. The strategy is picked once at
//! startup; the registry handles the platform-neutral parts (restore from
//! minimized, stale fullscreen, audio).

use std::sync::Arc;

use super::{HostApp, WindowHandle};
use crate::platform::Os;

pub trait ActivationStrategy: Send + Sync {
    fn show(&self, window: &WindowHandle, host: &Arc<dyn HostApp>);
    fn hide(&self, window: &WindowHandle, host: &Arc<dyn HostApp>);
}

pub fn for_os(os: Os) -> Box<dyn ActivationStrategy> {
    match os {
        Os::MacOS => Box::new(MacActivation),
        Os::Windows => Box::new(WindowsActivation),
        Os::Linux => Box::new(LinuxActivation),
    }
}

fn log_err(window: &WindowHandle, what: &str, result: Result<(), String>) {
    if let Err(e) = result {
        tlog!("[activation] {} failed for '{}': {}", what, window.label(), e);
    }
}

/// Pin to all workspaces just long enough for the window to follow the user
/// to the current virtual desktop.
fn show_on_current_workspace(window: &WindowHandle) {
    log_err(window, "set_visible_on_all_workspaces", window.set_visible_on_all_workspaces(true));
    log_err(window, "show", window.show());
    log_err(window, "focus", window.focus());
    log_err(window, "set_visible_on_all_workspaces", window.set_visible_on_all_workspaces(false));
}

pub struct MacActivation;

impl ActivationStrategy for MacActivation {
    fn show(&self, window: &WindowHandle, _host: &Arc<dyn HostApp>) {
        show_on_current_workspace(window);
    }

    fn hide(&self, window: &WindowHandle, host: &Arc<dyn HostApp>) {
        log_err(window, "hide", window.hide());
        // Mirrors Cmd+H app switching
        host.hide_application();
    }
}

pub struct WindowsActivation;

impl ActivationStrategy for WindowsActivation {
    fn show(&self, window: &WindowHandle, _host: &Arc<dyn HostApp>) {
        log_err(window, "set_opacity", window.set_opacity(1.0));
        show_on_current_workspace(window);
    }

    fn hide(&self, window: &WindowHandle, _host: &Arc<dyn HostApp>) {
        // Transparent first so the minimize animation is not visible
        log_err(window, "set_opacity", window.set_opacity(0.0));
        log_err(window, "minimize", window.minimize());
        log_err(window, "hide", window.hide());
    }
}

pub struct LinuxActivation;

impl ActivationStrategy for LinuxActivation {
    fn show(&self, window: &WindowHandle, host: &Arc<dyn HostApp>) {
        // show()+focus() does not raise a covered window on X11/Wayland;
        // hiding and re-showing on the next tick does.
        if window.is_visible() && !window.is_focused() {
            log_err(window, "hide", window.hide());
            let w = window.clone();
            host.defer(Box::new(move || {
                if w.is_destroyed() {
                    return;
                }
                log_err(&w, "show", w.show());
                log_err(&w, "focus", w.focus());
            }));
            return;
        }
        log_err(window, "show", window.show());
        log_err(window, "focus", window.focus());
    }

    fn hide(&self, window: &WindowHandle, _host: &Arc<dyn HostApp>) {
        log_err(window, "hide", window.hide());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockHost, MockWindow};

    fn host() -> (Arc<MockHost>, Arc<dyn HostApp>) {
        let mock = MockHost::new();
        let dyn_host: Arc<dyn HostApp> = mock.clone();
        (mock, dyn_host)
    }

    #[test]
    fn test_windows_hide_fades_then_minimizes() {
        let (_, h) = host();
        let w = MockWindow::new("main");
        let handle: WindowHandle = w.clone();
        WindowsActivation.hide(&handle, &h);
        assert_eq!(w.calls(), vec!["set_opacity(0)", "minimize", "hide"]);
    }

    #[test]
    fn test_windows_show_restores_opacity_first() {
        let (_, h) = host();
        let w = MockWindow::new("main");
        w.set_state(|s| s.visible = false);
        let handle: WindowHandle = w.clone();
        WindowsActivation.show(&handle, &h);
        assert_eq!(
            w.calls(),
            vec![
                "set_opacity(1)",
                "set_visible_on_all_workspaces(true)",
                "show",
                "focus",
                "set_visible_on_all_workspaces(false)",
            ]
        );
    }

    #[test]
    fn test_mac_hide_hides_application() {
        let (mock, h) = host();
        let w = MockWindow::new("main");
        let handle: WindowHandle = w.clone();
        MacActivation.hide(&handle, &h);
        assert_eq!(w.calls(), vec!["hide"]);
        assert_eq!(mock.app_hides(), 1);
    }

    #[test]
    fn test_linux_never_touches_workspaces() {
        let (_, h) = host();
        let w = MockWindow::new("main");
        w.set_state(|s| s.visible = false);
        let handle: WindowHandle = w.clone();
        LinuxActivation.show(&handle, &h);
        assert_eq!(w.calls(), vec!["show", "focus"]);
    }

    #[test]
    fn test_linux_covered_window_is_reshown_next_tick() {
        let (mock, h) = host();
        let w = MockWindow::new("main");
        w.set_state(|s| {
            s.visible = true;
            s.focused = false;
        });
        let handle: WindowHandle = w.clone();
        LinuxActivation.show(&handle, &h);
        assert_eq!(w.calls(), vec!["hide"]);

        assert_eq!(mock.run_deferred(), 1);
        assert_eq!(w.calls(), vec!["hide", "show", "focus"]);
        assert!(w.state().visible);
        assert!(w.state().focused);
    }
}
