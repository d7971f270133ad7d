#[macro_use]
mod logging;

pub mod config;
pub mod config_store;
pub mod context_menu;
pub mod ipc;
pub mod locale;
pub mod navigation;
pub mod network;
pub mod platform;
pub mod settings;
pub mod shell;
pub mod window;

#[cfg(feature = "desktop")]
mod desktop;

#[cfg(test)]
mod testing;

pub use logging::{init_file_logging, stop_file_logging};
pub use shell::{Shell, ShellDeps};

#[cfg(feature = "desktop")]
pub use desktop::run;
