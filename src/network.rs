// src/network.rs
//
// Request header rewriting for content surfaces. Redirect responses are
// recorded by request id so the follow-up request can carry the same headers.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::config_store::ConfigAccessor;
use crate::settings;

pub type Headers = Vec<(String, String)>;

#[derive(Clone, Debug, PartialEq)]
pub struct PendingRedirect {
    pub redirect_url: String,
    pub headers: Headers,
}

/// `request_id -> redirect`, alive for one request/response cycle.
#[derive(Default)]
pub struct PendingRedirects {
    entries: Mutex<HashMap<u64, PendingRedirect>>,
}

impl PendingRedirects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, request_id: u64, redirect: PendingRedirect) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(request_id, redirect);
        }
    }

    /// Remove and return the redirect recorded for `request_id`.
    pub fn take(&self, request_id: u64) -> Option<PendingRedirect> {
        self.entries.lock().ok()?.remove(&request_id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn set_header(headers: &mut Headers, name: &str, value: &str) {
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    headers.push((name.to_string(), value.to_string()));
}

/// Apply host policy to outgoing request headers.
///
/// A redirect recorded for `request_id` contributes its headers first; the
/// configured user agent then replaces whatever content sent.
pub fn rewrite_request_headers(
    config: &dyn ConfigAccessor,
    redirects: &PendingRedirects,
    request_id: u64,
    mut headers: Headers,
) -> Headers {
    if let Some(redirect) = redirects.take(request_id) {
        for (name, value) in &redirect.headers {
            set_header(&mut headers, name, value);
        }
    }
    if let Some(ua) = settings::user_agent(config) {
        set_header(&mut headers, "User-Agent", &ua);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_store::ConfigStore;
    use serde_json::json;

    fn header<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_take_consumes_redirect() {
        let redirects = PendingRedirects::new();
        redirects.insert(
            7,
            PendingRedirect {
                redirect_url: "https://b.test/".into(),
                headers: vec![],
            },
        );
        assert_eq!(redirects.len(), 1);
        assert_eq!(redirects.take(7).unwrap().redirect_url, "https://b.test/");
        assert!(redirects.take(7).is_none());
        assert!(redirects.is_empty());
    }

    #[test]
    fn test_user_agent_replaces_content_value() {
        let config = ConfigStore::in_memory();
        config
            .set(settings::KEY_USER_AGENT, json!("Casement/0.3"))
            .unwrap();
        let out = rewrite_request_headers(
            &config,
            &PendingRedirects::new(),
            1,
            vec![("user-agent".into(), "WebKit".into())],
        );
        assert_eq!(out.len(), 1);
        assert_eq!(header(&out, "User-Agent"), Some("Casement/0.3"));
    }

    #[test]
    fn test_redirect_headers_carry_over_once() {
        let config = ConfigStore::in_memory();
        let redirects = PendingRedirects::new();
        redirects.insert(
            3,
            PendingRedirect {
                redirect_url: "https://b.test/".into(),
                headers: vec![("Authorization".into(), "Bearer x".into())],
            },
        );

        let first = rewrite_request_headers(&config, &redirects, 3, vec![]);
        assert_eq!(header(&first, "authorization"), Some("Bearer x"));
        assert!(header(&first, "User-Agent").is_none());

        let second = rewrite_request_headers(&config, &redirects, 3, vec![]);
        assert!(second.is_empty());
    }
}
