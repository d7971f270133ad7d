use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Log to stderr, and to the session log file once one is open.
///
/// Every line is prefixed with local `HH:MM:SS.mmm`. Tag the message with
/// its subsystem, e.g. `tlog!("[registry] Created {}", name)`.
macro_rules! tlog {
    ($($arg:tt)*) => {
        $crate::logging::emit(format_args!($($arg)*))
    };
}

const LOG_PREFIX: &str = "casement-";
const LOG_SUFFIX: &str = ".log";

/// Symlink to the current session's log (Unix only).
const LATEST_LOG_NAME: &str = "latest.log";

/// Session logs kept on disk, newest first; older ones are deleted at startup.
pub const MAX_LOG_FILES: usize = 10;

struct LogSink {
    file: File,
    path: PathBuf,
}

static SINK: Mutex<Option<LogSink>> = Mutex::new(None);

fn stamp() -> impl fmt::Display {
    chrono::Local::now().format("%H:%M:%S%.3f")
}

#[doc(hidden)]
pub fn emit(args: fmt::Arguments<'_>) {
    let line = format!("{} {}", stamp(), args);
    eprintln!("{}", line);
    if let Ok(mut guard) = SINK.lock() {
        if let Some(sink) = guard.as_mut() {
            let _ = writeln!(sink.file, "{}", line);
        }
    }
}

fn is_session_log(name: &str) -> bool {
    name.starts_with(LOG_PREFIX) && name.ends_with(LOG_SUFFIX)
}

/// Delete all but the `keep` newest session logs in `log_dir`.
///
/// Session log names embed their start time, so name order is age order.
/// Returns the number of files removed.
pub fn prune_old_logs(log_dir: &Path, keep: usize) -> Result<usize, String> {
    let entries = std::fs::read_dir(log_dir)
        .map_err(|e| format!("Failed to read log dir {}: {}", log_dir.display(), e))?;

    let mut logs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|entry| is_session_log(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.path())
        .collect();
    logs.sort();

    let excess = logs.len().saturating_sub(keep);
    let mut removed = 0;
    for path in logs.into_iter().take(excess) {
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => tlog!("[logging] Failed to remove {}: {}", path.display(), e),
        }
    }
    Ok(removed)
}

/// Open a new session log in `log_dir` and start mirroring `tlog!` into it.
///
/// Older session logs beyond [`MAX_LOG_FILES`] are pruned first. Returns the
/// path of the new file.
pub fn init_file_logging(log_dir: &Path) -> Result<PathBuf, String> {
    std::fs::create_dir_all(log_dir)
        .map_err(|e| format!("Failed to create log dir: {}", e))?;

    // Room for the file about to be created.
    match prune_old_logs(log_dir, MAX_LOG_FILES.saturating_sub(1)) {
        Ok(0) => {}
        Ok(n) => tlog!("[logging] Removed {} old log file(s)", n),
        Err(e) => tlog!("[logging] {}", e),
    }

    let filename = format!(
        "{}{}{}",
        LOG_PREFIX,
        chrono::Local::now().format("%Y%m%d-%H%M%S"),
        LOG_SUFFIX
    );
    let path = log_dir.join(&filename);
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("Failed to create log file {}: {}", path.display(), e))?;

    let _ = writeln!(
        file,
        "# Casement {} (pid {}) started {}",
        env!("CARGO_PKG_VERSION"),
        std::process::id(),
        chrono::Local::now().to_rfc3339()
    );

    #[cfg(unix)]
    {
        let link = log_dir.join(LATEST_LOG_NAME);
        let _ = std::fs::remove_file(&link);
        if let Err(e) = std::os::unix::fs::symlink(&filename, &link) {
            tlog!("[logging] Failed to link {}: {}", LATEST_LOG_NAME, e);
        }
    }

    let previous = SINK
        .lock()
        .map_err(|_| "Log sink poisoned".to_string())?
        .replace(LogSink {
            file,
            path: path.clone(),
        });
    if let Some(old) = previous {
        tlog!("[logging] Switched from {}", old.path.display());
    }
    tlog!("[logging] File logging started: {}", path.display());

    Ok(path)
}

/// Close the session log. Later `tlog!` output goes to stderr only.
pub fn stop_file_logging() {
    let closed = SINK.lock().ok().and_then(|mut guard| guard.take());
    if let Some(mut sink) = closed {
        let _ = sink.file.flush();
        tlog!("[logging] File logging stopped: {}", sink.path.display());
    }
}
