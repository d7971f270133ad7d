// src/desktop/mod.rs
//
// Tauri backend: wires native window events, content messages and menu
// clicks into the shell, and owns the process lifecycle.

mod host;
mod window;

use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;
use serde_json::Value;
use tauri::{Manager, RunEvent, State, WebviewWindow};

use crate::config::{AppPaths, ShellConfig};
use crate::config_store::ConfigStore;
use crate::logging;
use crate::platform::PlatformInfo;
use crate::shell::{Shell, ShellDeps};
use crate::window::geometry::JsonGeometryStore;
use crate::window::{CloseDecision, SystemClock, WindowEvent};

use host::{TauriHost, TauriOpener};
use window::{MenuOwner, ShellSlot, TauriWindowFactory};

/// Managed state shared by commands and event handlers.
struct DesktopState {
    shell: Arc<Shell>,
    host: Arc<TauriHost>,
    config: Arc<ConfigStore>,
    menu_owner: MenuOwner,
}

// ============================================================================
// Commands
// ============================================================================

/// Single entry point for messages sent by content.
#[tauri::command(rename_all = "snake_case")]
async fn host_message(
    window: WebviewWindow,
    state: State<'_, DesktopState>,
    channel: String,
    payload: Option<Value>,
) -> Result<(), String> {
    state
        .shell
        .handle_message(window.label(), &channel, payload.unwrap_or(Value::Null))
}

#[tauri::command]
fn default_language(state: State<'_, DesktopState>) -> String {
    let system = tauri_plugin_os::locale();
    state.shell.default_language(system.as_deref())
}

#[tauri::command]
async fn create_browser_window(state: State<'_, DesktopState>) -> Result<(), String> {
    state.shell.create_browser_window().map(|_| ())
}

#[tauri::command(rename_all = "snake_case")]
async fn create_sniffer_window(
    state: State<'_, DesktopState>,
    session_id: String,
) -> Result<(), String> {
    state.shell.create_sniffer_window(&session_id).map(|_| ())
}

#[tauri::command]
fn get_all_names(state: State<'_, DesktopState>) -> Vec<String> {
    state.shell.get_all_names()
}

#[tauri::command]
fn show_all_windows(state: State<'_, DesktopState>) {
    state.shell.show_all_windows();
}

#[tauri::command]
fn hide_all_windows(state: State<'_, DesktopState>) {
    state.shell.hide_all_windows();
}

#[tauri::command]
fn toggle_all_windows(state: State<'_, DesktopState>) {
    state.shell.toggle_all_windows();
}

#[tauri::command]
fn reload_all_windows(state: State<'_, DesktopState>, force: Option<bool>) {
    state.shell.reload_all_windows(force.unwrap_or(false));
}

// ============================================================================
// Events
// ============================================================================

fn on_window_event(window: &tauri::Window, event: &tauri::WindowEvent) {
    let Some(state) = window.app_handle().try_state::<DesktopState>() else {
        return;
    };
    let registry = state.shell.registry();
    let label = window.label();

    match event {
        tauri::WindowEvent::Resized(size) => {
            let scale = window.scale_factor().unwrap_or(1.0);
            let size = size.to_logical::<f64>(scale);
            registry.handle_event(
                label,
                WindowEvent::Resized {
                    width: size.width,
                    height: size.height,
                },
            );
        }
        tauri::WindowEvent::Moved(position) => {
            let scale = window.scale_factor().unwrap_or(1.0);
            let position = position.to_logical::<f64>(scale);
            registry.handle_event(
                label,
                WindowEvent::Moved {
                    x: position.x,
                    y: position.y,
                },
            );
        }
        tauri::WindowEvent::Focused(focused) => {
            registry.handle_event(label, WindowEvent::Focused(*focused));
        }
        tauri::WindowEvent::CloseRequested { api, .. } => {
            if registry.on_close_requested(label) == CloseDecision::Prevent {
                api.prevent_close();
            }
        }
        tauri::WindowEvent::Destroyed => {
            registry.handle_event(label, WindowEvent::Closed);
        }
        _ => {}
    }
}

fn on_menu_event(app: &tauri::AppHandle, event: tauri::menu::MenuEvent) {
    let Some(state) = app.try_state::<DesktopState>() else {
        return;
    };
    let owner = state.menu_owner.lock().ok().and_then(|owner| owner.clone());
    if let Some(label) = owner {
        state.shell.handle_menu_event(&label, event.id().as_ref());
    }
}

fn on_run_event(app: &tauri::AppHandle, event: RunEvent) {
    let Some(state) = app.try_state::<DesktopState>() else {
        return;
    };
    match event {
        // An explicit exit code comes from our own quit/exit; let it through.
        // Otherwise close windows first and finish the quit once they are gone.
        RunEvent::ExitRequested { api, code, .. } => {
            if code.is_none() && !state.shell.get_all_names().is_empty() {
                api.prevent_exit();
                if state.host.begin_quit() {
                    tlog!("[desktop] Quit requested, closing windows");
                    state.shell.shutdown();
                }
            }
        }
        RunEvent::Exit => {
            if let Err(e) = state.config.flush() {
                tlog!("[desktop] Failed to flush settings: {}", e);
            }
            logging::stop_file_logging();
        }
        _ => {}
    }
}

// ============================================================================
// Entry point
// ============================================================================

pub fn run() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("casement-worker")
        .build()
        .expect("failed to start async runtime");
    tauri::async_runtime::set(runtime.handle().clone());

    let paths = AppPaths::resolve();
    if let Err(e) = paths.ensure() {
        eprintln!("[setup] {}", e);
    }
    if let Err(e) = logging::init_file_logging(&paths.log_dir) {
        eprintln!("[setup] Failed to start file logging: {}", e);
    }

    let shell_config = ShellConfig::load(&paths.config_file()).unwrap_or_else(|e| {
        tlog!("[setup] {}; using defaults", e);
        ShellConfig::default()
    });
    let config = match ConfigStore::open(&paths.settings_file()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tlog!("[setup] Settings unavailable ({}); changes will not persist", e);
            Arc::new(ConfigStore::in_memory())
        }
    };

    let slot: ShellSlot = Arc::new(OnceCell::new());
    let menu_owner: MenuOwner = Arc::new(Mutex::new(None));
    let runtime_handle = runtime.handle().clone();

    let app = tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_os::init())
        .setup(move |app| {
            let handle = app.handle().clone();
            let host = Arc::new(TauriHost::new(handle.clone()));
            let storage_root = shell_config
                .storage_root
                .clone()
                .unwrap_or_else(|| paths.storage_root.clone());

            let shell = Arc::new(Shell::new(ShellDeps {
                platform: PlatformInfo::current(),
                factory: Arc::new(TauriWindowFactory::new(
                    handle.clone(),
                    paths.clone(),
                    slot.clone(),
                    menu_owner.clone(),
                )),
                host: host.clone(),
                opener: Arc::new(TauriOpener::new(handle.clone())),
                config: config.clone(),
                geometry: Arc::new(JsonGeometryStore::new(&paths.state_dir)),
                clock: Arc::new(SystemClock),
                runtime: runtime_handle.clone(),
                shell_config: shell_config.clone(),
                storage_root,
            }));
            let _ = slot.set(Arc::downgrade(&shell));

            app.manage(DesktopState {
                shell: shell.clone(),
                host,
                config: config.clone(),
                menu_owner: menu_owner.clone(),
            });

            shell.start()?;
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            host_message,
            default_language,
            create_browser_window,
            create_sniffer_window,
            get_all_names,
            show_all_windows,
            hide_all_windows,
            toggle_all_windows,
            reload_all_windows,
        ])
        .on_window_event(on_window_event)
        .on_menu_event(on_menu_event)
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(on_run_event);
    drop(runtime);
}
