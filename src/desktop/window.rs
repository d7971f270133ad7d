// src/desktop/window.rs
//
// Tauri implementation of the native window seam and the factory that
// builds webview windows from resolved options.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use once_cell::sync::OnceCell;
use serde_json::Value;
use tauri::menu::{MenuBuilder, MenuItemBuilder};
use tauri::webview::PageLoadEvent;
use tauri::{AppHandle, Emitter, Manager, WebviewUrl, WebviewWindow, WebviewWindowBuilder};

use crate::config::AppPaths;
use crate::context_menu::{EntryKind, MenuEntry, MenuRole};
use crate::ipc::channels;
use crate::navigation::{reload_url, NavigationDecision};
use crate::shell::Shell;
#[cfg(target_os = "macos")]
use crate::window::options::TitleBarStyle;
use crate::window::options::WindowOptions;
use crate::window::{Bounds, NativeWindow, WindowEvent, WindowFactory, WindowHandle};

const BRIDGE_SCRIPT: &str = include_str!("bridge.js");

/// Set by the backend once the shell exists; window callbacks registered
/// before that point see `None` and fall back to permissive defaults.
pub type ShellSlot = Arc<OnceCell<Weak<Shell>>>;

/// Label of the window whose context menu is currently open.
pub type MenuOwner = Arc<Mutex<Option<String>>>;

fn shell_of(slot: &ShellSlot) -> Option<Arc<Shell>> {
    slot.get().and_then(Weak::upgrade)
}

fn failed(what: &str, e: tauri::Error) -> String {
    format!("{} failed: {}", what, e)
}

pub struct TauriWindow {
    window: WebviewWindow,
    on_top: AtomicBool,
    destroyed: AtomicBool,
    menu_owner: MenuOwner,
}

impl TauriWindow {
    pub fn new(window: WebviewWindow, on_top: bool, menu_owner: MenuOwner) -> Self {
        Self {
            window,
            on_top: AtomicBool::new(on_top),
            destroyed: AtomicBool::new(false),
            menu_owner,
        }
    }

    fn eval(&self, script: &str) -> Result<(), String> {
        self.window.eval(script).map_err(|e| failed("eval", e))
    }
}

impl NativeWindow for TauriWindow {
    fn label(&self) -> String {
        self.window.label().to_string()
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
            || self
                .window
                .app_handle()
                .get_webview_window(self.window.label())
                .is_none()
    }

    fn is_visible(&self) -> bool {
        self.window.is_visible().unwrap_or(false)
    }

    fn is_focused(&self) -> bool {
        self.window.is_focused().unwrap_or(false)
    }

    fn is_minimized(&self) -> bool {
        self.window.is_minimized().unwrap_or(false)
    }

    fn is_maximized(&self) -> bool {
        self.window.is_maximized().unwrap_or(false)
    }

    fn is_fullscreen(&self) -> bool {
        self.window.is_fullscreen().unwrap_or(false)
    }

    fn is_always_on_top(&self) -> bool {
        self.on_top.load(Ordering::SeqCst)
    }

    fn bounds(&self) -> Option<Bounds> {
        let scale = self.window.scale_factor().ok()?;
        let position = self.window.outer_position().ok()?.to_logical::<f64>(scale);
        let size = self.window.inner_size().ok()?.to_logical::<f64>(scale);
        Some(Bounds {
            x: position.x,
            y: position.y,
            width: size.width,
            height: size.height,
        })
    }

    fn show(&self) -> Result<(), String> {
        self.window.show().map_err(|e| failed("show", e))
    }

    fn hide(&self) -> Result<(), String> {
        self.window.hide().map_err(|e| failed("hide", e))
    }

    fn focus(&self) -> Result<(), String> {
        self.window.set_focus().map_err(|e| failed("set_focus", e))
    }

    fn minimize(&self) -> Result<(), String> {
        self.window.minimize().map_err(|e| failed("minimize", e))
    }

    fn restore(&self) -> Result<(), String> {
        self.window.unminimize().map_err(|e| failed("unminimize", e))
    }

    fn maximize(&self) -> Result<(), String> {
        self.window.maximize().map_err(|e| failed("maximize", e))
    }

    fn unmaximize(&self) -> Result<(), String> {
        self.window.unmaximize().map_err(|e| failed("unmaximize", e))
    }

    fn set_fullscreen(&self, fullscreen: bool) -> Result<(), String> {
        self.window
            .set_fullscreen(fullscreen)
            .map_err(|e| failed("set_fullscreen", e))
    }

    fn set_always_on_top(&self, on_top: bool) -> Result<(), String> {
        self.window
            .set_always_on_top(on_top)
            .map_err(|e| failed("set_always_on_top", e))?;
        self.on_top.store(on_top, Ordering::SeqCst);
        Ok(())
    }

    #[cfg(target_os = "windows")]
    fn set_opacity(&self, opacity: f64) -> Result<(), String> {
        use windows_sys::Win32::Foundation::HWND;
        use windows_sys::Win32::UI::WindowsAndMessaging::{
            GetWindowLongPtrW, SetLayeredWindowAttributes, SetWindowLongPtrW, GWL_EXSTYLE,
            LWA_ALPHA, WS_EX_LAYERED,
        };

        let hwnd = self.window.hwnd().map_err(|e| failed("hwnd", e))?.0 as HWND;
        let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        // SAFETY: hwnd belongs to a live window owned by this process
        unsafe {
            let style = GetWindowLongPtrW(hwnd, GWL_EXSTYLE);
            if style & WS_EX_LAYERED as isize == 0 {
                SetWindowLongPtrW(hwnd, GWL_EXSTYLE, style | WS_EX_LAYERED as isize);
            }
            if SetLayeredWindowAttributes(hwnd, 0, alpha, LWA_ALPHA) == 0 {
                return Err("SetLayeredWindowAttributes failed".to_string());
            }
        }
        Ok(())
    }

    #[cfg(not(target_os = "windows"))]
    fn set_opacity(&self, _opacity: f64) -> Result<(), String> {
        Ok(())
    }

    fn set_visible_on_all_workspaces(&self, visible: bool) -> Result<(), String> {
        self.window
            .set_visible_on_all_workspaces(visible)
            .map_err(|e| failed("set_visible_on_all_workspaces", e))
    }

    fn set_audio_muted(&self, muted: bool) -> Result<(), String> {
        self.eval(&format!(
            "document.querySelectorAll('audio, video').forEach(function (m) {{ m.muted = {}; }});",
            muted
        ))
    }

    fn set_zoom(&self, factor: f64) -> Result<(), String> {
        self.window.set_zoom(factor).map_err(|e| failed("set_zoom", e))
    }

    fn is_devtools_open(&self) -> bool {
        self.window.is_devtools_open()
    }

    fn open_devtools(&self) -> Result<(), String> {
        self.window.open_devtools();
        Ok(())
    }

    fn close_devtools(&self) -> Result<(), String> {
        self.window.close_devtools();
        Ok(())
    }

    /// Navigate to the current URL rather than calling `location.reload()`:
    /// a crashed content process cannot run script.
    fn reload(&self, ignore_cache: bool) -> Result<(), String> {
        let current = self.window.url().map_err(|e| failed("url", e))?;
        let target = reload_url(&current, ignore_cache, chrono::Utc::now().timestamp_millis());
        self.window.navigate(target).map_err(|e| failed("navigate", e))
    }

    fn emit(&self, channel: &str, payload: Value) -> Result<(), String> {
        if channel == channels::HOST_PING {
            // Answered from inside the page, so a wedged renderer never pongs
            return self.eval(&format!(
                "window.__TAURI_INTERNALS__ && window.__TAURI_INTERNALS__.invoke('host_message', {{ channel: '{}', payload: {} }});",
                channels::HOST_PONG,
                payload
            ));
        }
        self.window
            .emit_to(self.window.label(), channel, payload)
            .map_err(|e| failed("emit", e))
    }

    fn popup_menu(&self, entries: &[MenuEntry]) -> Result<(), String> {
        let app = self.window.app_handle();
        let mut builder = MenuBuilder::new(app);
        for entry in entries {
            builder = match (entry.kind, entry.role) {
                (EntryKind::Separator, _) => builder.separator(),
                (_, Some(MenuRole::Cut)) => builder.cut(),
                (_, Some(MenuRole::Copy)) => builder.copy(),
                (_, Some(MenuRole::Paste)) => builder.paste(),
                (EntryKind::Normal, None) => {
                    let item = MenuItemBuilder::with_id(entry.id.clone(), &entry.label)
                        .enabled(entry.enabled)
                        .build(app)
                        .map_err(|e| failed("menu item", e))?;
                    builder.item(&item)
                }
            };
        }
        let menu = builder.build().map_err(|e| failed("menu", e))?;
        if let Ok(mut owner) = self.menu_owner.lock() {
            *owner = Some(self.label());
        }
        self.window.popup_menu(&menu).map_err(|e| failed("popup_menu", e))
    }

    fn close(&self) -> Result<(), String> {
        self.window.close().map_err(|e| failed("close", e))
    }

    fn destroy(&self) -> Result<(), String> {
        self.window.destroy().map_err(|e| failed("destroy", e))?;
        self.destroyed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Relative URLs resolve against the bundled frontend.
fn webview_url(url: &str) -> Result<WebviewUrl, String> {
    if url.contains("://") || url.starts_with("about:") {
        let parsed = url::Url::parse(url).map_err(|e| format!("Invalid window url '{}': {}", url, e))?;
        Ok(WebviewUrl::External(parsed))
    } else {
        Ok(WebviewUrl::App(PathBuf::from(url.trim_start_matches('/'))))
    }
}

/// `#rrggbb` or `#rrggbbaa`.
fn parse_hex_color(s: &str) -> Option<tauri::window::Color> {
    let hex = s.strip_prefix('#')?;
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        6 => Some(tauri::window::Color(byte(0)?, byte(2)?, byte(4)?, 255)),
        8 => Some(tauri::window::Color(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

pub struct TauriWindowFactory {
    app: AppHandle,
    paths: AppPaths,
    shell: ShellSlot,
    menu_owner: MenuOwner,
}

impl TauriWindowFactory {
    pub fn new(app: AppHandle, paths: AppPaths, shell: ShellSlot, menu_owner: MenuOwner) -> Self {
        Self {
            app,
            paths,
            shell,
            menu_owner,
        }
    }
}

impl WindowFactory for TauriWindowFactory {
    fn create(&self, name: &str, options: &WindowOptions) -> Result<WindowHandle, String> {
        let mut builder = WebviewWindowBuilder::new(&self.app, name, webview_url(&options.url)?)
            .title(&options.title)
            .inner_size(options.width, options.height)
            .min_inner_size(options.min_width, options.min_height)
            .resizable(options.resizable)
            .decorations(options.decorations)
            .always_on_top(options.always_on_top)
            .visible(options.visible)
            .devtools(options.devtools)
            .disable_drag_drop_handler()
            .accept_first_mouse(true)
            .initialization_script(BRIDGE_SCRIPT);

        match (options.x, options.y) {
            (Some(x), Some(y)) => builder = builder.position(x, y),
            _ if options.center => builder = builder.center(),
            _ => {}
        }
        if let Some(ua) = &options.user_agent {
            builder = builder.user_agent(ua);
        }
        if let Some(partition) = &options.partition {
            builder = builder.data_directory(self.paths.partition_dir(partition));
        }
        if let Some(color) = options.background_color.as_deref().and_then(parse_hex_color) {
            builder = builder.background_color(color);
        }

        #[cfg(target_os = "macos")]
        {
            if options.title_bar_style == TitleBarStyle::HiddenInset {
                builder = builder
                    .title_bar_style(tauri::TitleBarStyle::Overlay)
                    .hidden_title(true);
            }
            if options.vibrancy.is_some() {
                use tauri::window::{Effect, EffectsBuilder};
                builder = builder.effects(
                    EffectsBuilder::new()
                        .effect(Effect::UnderWindowBackground)
                        .build(),
                );
            }
        }
        #[cfg(not(target_os = "macos"))]
        {
            builder = builder.transparent(options.transparent);
        }

        let slot = self.shell.clone();
        let label = name.to_string();
        builder = builder.on_navigation(move |url| match shell_of(&slot) {
            Some(shell) => shell.will_navigate(&label, url.as_str()) == NavigationDecision::Proceed,
            None => true,
        });

        let slot = self.shell.clone();
        builder = builder.on_page_load(move |webview, payload| {
            if !matches!(payload.event(), PageLoadEvent::Finished) {
                return;
            }
            if let Some(shell) = shell_of(&slot) {
                shell
                    .registry()
                    .handle_event(webview.label(), WindowEvent::ContentLoaded);
            }
        });

        let window = builder
            .build()
            .map_err(|e| format!("Failed to create window '{}': {}", name, e))?;
        Ok(Arc::new(TauriWindow::new(
            window,
            options.always_on_top,
            self.menu_owner.clone(),
        )))
    }
}
