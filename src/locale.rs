//! Default UI language resolution.

pub const FALLBACK_LANGUAGE: &str = "en-US";

/// Map a system locale (`zh_TW.UTF-8`, `zh-Hant-HK`, `en-GB`, ...) to one of
/// the languages the UI ships.
///
/// Chinese is split by script: Traditional for `Hant` and the TW/HK/MO
/// regions, Simplified for everything else.
pub fn resolve_default_language(locale: Option<&str>) -> &'static str {
    let Some(raw) = locale else {
        return FALLBACK_LANGUAGE;
    };

    // Strip encoding and modifier suffixes: "zh_TW.UTF-8@euro" -> "zh_TW"
    let tag = raw.split(['.', '@']).next().unwrap_or("");
    let tag = tag.replace('_', "-").to_ascii_lowercase();
    let mut parts = tag.split('-').filter(|p| !p.is_empty());

    match parts.next() {
        Some("zh") => {
            let subtags: Vec<&str> = parts.collect();
            // An explicit script wins over the region
            let traditional = if subtags.contains(&"hans") {
                false
            } else {
                subtags
                    .iter()
                    .any(|p| matches!(*p, "hant" | "tw" | "hk" | "mo"))
            };
            if traditional {
                "zh-TW"
            } else {
                "zh-CN"
            }
        }
        _ => FALLBACK_LANGUAGE,
    }
}

/// Locale from the POSIX environment, in lookup priority order.
pub fn locale_from_env() -> Option<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|k| std::env::var(k).ok())
        .find(|v| !v.is_empty() && v != "C" && v != "POSIX")
}
