use serde::{Deserialize, Serialize};

use super::Bounds;
use crate::platform::PlatformInfo;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TitleBarStyle {
    Visible,
    /// macOS: content extends under a transparent title bar, traffic lights inset
    HiddenInset,
}

/// Fully resolved creation options handed to the window factory.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowOptions {
    pub title: String,
    /// App-relative route ("/", "/#/browser") or absolute URL
    pub url: String,
    pub width: f64,
    pub height: f64,
    pub min_width: f64,
    pub min_height: f64,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub center: bool,
    pub resizable: bool,
    pub decorations: bool,
    pub transparent: bool,
    pub always_on_top: bool,
    pub visible: bool,
    pub devtools: bool,
    /// Storage partition; `None` shares the default session
    pub partition: Option<String>,
    pub user_agent: Option<String>,
    pub title_bar_style: TitleBarStyle,
    pub vibrancy: Option<String>,
    pub background_color: Option<String>,
}

/// Caller-supplied overrides. Every field left `None` keeps the default.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WindowOverrides {
    pub title: Option<String>,
    pub url: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub min_width: Option<f64>,
    pub min_height: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub resizable: Option<bool>,
    pub decorations: Option<bool>,
    pub transparent: Option<bool>,
    pub always_on_top: Option<bool>,
    pub visible: Option<bool>,
    pub devtools: Option<bool>,
    pub partition: Option<String>,
    pub user_agent: Option<String>,
}

impl WindowOptions {
    /// Defaults for the running platform.
    pub fn platform_defaults(platform: &PlatformInfo) -> Self {
        let mut opts = Self {
            title: "Casement".to_string(),
            url: "/".to_string(),
            width: 900.0,
            height: 600.0,
            min_width: 700.0,
            min_height: 500.0,
            x: None,
            y: None,
            center: true,
            resizable: true,
            decorations: true,
            transparent: false,
            always_on_top: false,
            visible: true,
            devtools: platform.is_dev(),
            partition: None,
            user_agent: None,
            title_bar_style: TitleBarStyle::Visible,
            vibrancy: None,
            background_color: None,
        };

        if platform.is_macos() {
            opts.title_bar_style = TitleBarStyle::HiddenInset;
            opts.vibrancy = Some("under-window".to_string());
            opts.transparent = true;
        } else if platform.is_windows() {
            // Opaque background avoids a white flash before first paint
            opts.background_color = Some("#1e1e1e".to_string());
        }

        opts
    }

    pub fn merge(mut self, o: WindowOverrides) -> Self {
        if let Some(v) = o.title {
            self.title = v;
        }
        if let Some(v) = o.url {
            self.url = v;
        }
        if let Some(v) = o.width {
            self.width = v;
        }
        if let Some(v) = o.height {
            self.height = v;
        }
        if let Some(v) = o.min_width {
            self.min_width = v;
        }
        if let Some(v) = o.min_height {
            self.min_height = v;
        }
        if o.x.is_some() && o.y.is_some() {
            self.x = o.x;
            self.y = o.y;
            self.center = false;
        }
        if let Some(v) = o.resizable {
            self.resizable = v;
        }
        if let Some(v) = o.decorations {
            self.decorations = v;
        }
        if let Some(v) = o.transparent {
            self.transparent = v;
        }
        if let Some(v) = o.always_on_top {
            self.always_on_top = v;
        }
        if let Some(v) = o.visible {
            self.visible = v;
        }
        if let Some(v) = o.devtools {
            self.devtools = v;
        }
        if o.partition.is_some() {
            self.partition = o.partition;
        }
        if o.user_agent.is_some() {
            self.user_agent = o.user_agent;
        }
        self
    }

    /// True for app-relative routes served from the bundled frontend. Only
    /// those pages get the IPC bridge; remote origins cannot talk back.
    pub fn loads_bundled_content(&self) -> bool {
        !self.url.contains("://") && !self.url.starts_with("about:")
    }

    /// Apply persisted geometry. Sizes below the minimum are ignored.
    pub fn with_bounds(mut self, bounds: Option<Bounds>) -> Self {
        if let Some(b) = bounds {
            if b.width >= self.min_width && b.height >= self.min_height {
                self.width = b.width;
                self.height = b.height;
            }
            self.x = Some(b.x);
            self.y = Some(b.y);
            self.center = false;
        }
        self
    }
}
