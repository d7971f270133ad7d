//! Content-process crash bookkeeping.

/// Two crashes closer together than this are a crash loop.
pub const CRASH_LOOP_WINDOW_MS: i64 = 60_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrashVerdict {
    /// Isolated crash, reload the content surface.
    Reload,
    /// Crash loop, terminate the application.
    Fatal,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CrashRecord {
    last_crash_ms: Option<i64>,
}

impl CrashRecord {
    pub fn last_crash_ms(&self) -> Option<i64> {
        self.last_crash_ms
    }

    /// Record a crash at `now_ms`. The timestamp is updated whatever the verdict.
    pub fn record(&mut self, now_ms: i64) -> CrashVerdict {
        let verdict = match self.last_crash_ms {
            Some(last) if now_ms - last <= CRASH_LOOP_WINDOW_MS => CrashVerdict::Fatal,
            _ => CrashVerdict::Reload,
        };
        self.last_crash_ms = Some(now_ms);
        verdict
    }
}
