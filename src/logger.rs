//! Terminal output.
//!
//! `log!("build"; ...)` prints a colored `[build]` tag and the message;
//! `debug!` does the same only under `--verbose`. [`ProgressLine`] keeps a
//! single redrawn line of counters while the build runs, and `log!` clears
//! that line first so the two never interleave.

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::io::{StdoutLock, Write, stdout};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set while a [`ProgressLine`] owns the current terminal line.
static PROGRESS_ACTIVE: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

#[macro_export]
macro_rules! log {
    ($tag:expr; $($arg:tt)*) => {{
        $crate::logger::log($tag, &format!($($arg)*))
    }};
}

#[macro_export]
macro_rules! debug {
    ($tag:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($tag, &format!($($arg)*))
        }
    }};
}

pub fn log(tag: &str, message: &str) {
    let mut out = stdout().lock();
    if PROGRESS_ACTIVE.load(Ordering::SeqCst) {
        clear_line(&mut out);
    }
    writeln!(out, "{} {message}", tag_label(tag)).ok();
    out.flush().ok();
}

fn tag_label(tag: &str) -> String {
    let label = format!("[{tag}]");
    let styled = match tag.to_ascii_lowercase().as_str() {
        "serve" | "dev" => label.bright_blue().to_string(),
        "reload" => label.bright_green().to_string(),
        "error" => label.bright_red().to_string(),
        "warning" => label.bright_magenta().to_string(),
        _ => label.bright_yellow().to_string(),
    };
    styled.bold().to_string()
}

fn clear_line(out: &mut StdoutLock<'_>) {
    execute!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine)).ok();
}

// ============================================================================
// Progress
// ============================================================================

/// `[build] assets(12/40) pages(3/9)`, redrawn in place.
///
/// Counters with a zero total are not shown. Redraws from worker callbacks
/// are skipped while another redraw holds the line.
pub struct ProgressLine {
    counters: Vec<(&'static str, usize, AtomicUsize)>,
    redraw: Mutex<()>,
    finished: bool,
}

impl ProgressLine {
    pub fn new(totals: &[(&'static str, usize)]) -> Self {
        let counters = totals
            .iter()
            .filter(|(_, total)| *total > 0)
            .map(|&(name, total)| (name, total, AtomicUsize::new(0)))
            .collect();
        PROGRESS_ACTIVE.store(true, Ordering::SeqCst);

        let line = Self {
            counters,
            redraw: Mutex::new(()),
            finished: false,
        };
        line.draw(false);
        line
    }

    /// Bump `name` by one. Unknown names are ignored.
    pub fn inc(&self, name: &str) {
        let Some((_, _, done)) = self.counters.iter().find(|(n, ..)| *n == name) else {
            return;
        };
        done.fetch_add(1, Ordering::Relaxed);
        if let Some(_guard) = self.redraw.try_lock() {
            self.draw(false);
        }
    }

    fn summary(&self) -> String {
        let parts: Vec<String> = self
            .counters
            .iter()
            .map(|(name, total, done)| format!("{name}({}/{total})", done.load(Ordering::Relaxed)))
            .collect();
        parts.join(" ")
    }

    fn draw(&self, newline: bool) {
        let mut out = stdout().lock();
        clear_line(&mut out);
        write!(out, "{} {}", tag_label("build"), self.summary()).ok();
        if newline {
            writeln!(out).ok();
        }
        out.flush().ok();
    }

    /// Leave the final counts on screen.
    pub fn finish(mut self) {
        let _guard = self.redraw.lock();
        self.draw(true);
        self.finished = true;
    }
}

impl Drop for ProgressLine {
    fn drop(&mut self) {
        PROGRESS_ACTIVE.store(false, Ordering::SeqCst);
        if !self.finished {
            let mut out = stdout().lock();
            clear_line(&mut out);
            out.flush().ok();
        }
    }
}
