mod keys;
mod layout;
mod render;
mod session;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use review_core::{PatternBuffer, SampleText};
use review_highlight::HighlightOptions;
use review_observe::Observer;
use std::io;
use std::panic::PanicHookInfo;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub use keys::{Key, KeyBindings, KeyPress, decode_key, key_matches, load_keybindings};
pub use layout::{DisplayRow, LayoutFrame, RowSegment, Viewport, layout, wrap_lines};
pub use render::{TuiTheme, draw};
pub use session::{KeyOutcome, PROMPT_PREFIX, Session, SessionOutcome, SessionReport};

/// Everything the terminal driver needs besides the buffer and the text.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub bindings: KeyBindings,
    pub theme: TuiTheme,
    pub continuation_marker: String,
    pub poll_interval: Duration,
    pub highlight: HighlightOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bindings: KeyBindings::default(),
            theme: TuiTheme::default(),
            continuation_marker: "> ".to_string(),
            poll_interval: Duration::from_millis(100),
            highlight: HighlightOptions::default(),
        }
    }
}

type PanicHook = Arc<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// RAII guard that restores the terminal on drop (including panics) and
/// hands back the panic hook and signal handlers it replaced.
struct TerminalGuard {
    prev_hook: Option<PanicHook>,
    #[cfg(unix)]
    signals: Vec<signal_hook::SigId>,
}

impl TerminalGuard {
    fn install(stop_flag: &Arc<AtomicBool>) -> Result<Self> {
        let mut guard = Self {
            prev_hook: Some(chain_panic_hook(restore_terminal)),
            #[cfg(unix)]
            signals: Vec::new(),
        };
        // Signals set a flag instead of killing the process.
        #[cfg(unix)]
        for signal in [
            signal_hook::consts::SIGINT,
            signal_hook::consts::SIGTERM,
            signal_hook::consts::SIGHUP,
        ] {
            guard
                .signals
                .push(signal_hook::flag::register(signal, Arc::clone(stop_flag))?);
        }
        #[cfg(not(unix))]
        let _ = stop_flag;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal();
        #[cfg(unix)]
        for id in self.signals.drain(..) {
            signal_hook::low_level::unregister(id);
        }
        if let Some(prev) = self.prev_hook.take() {
            restore_panic_hook(prev);
        }
    }
}

/// Runs `cleanup` ahead of the current panic hook. Returns the hook it
/// displaced so it can be put back.
fn chain_panic_hook(cleanup: fn()) -> PanicHook {
    let prev: PanicHook = Arc::from(std::panic::take_hook());
    let chained = Arc::clone(&prev);
    std::panic::set_hook(Box::new(move |info| {
        cleanup();
        chained(info);
    }));
    prev
}

fn restore_panic_hook(prev: PanicHook) {
    // The hook cannot be swapped while unwinding.
    if std::thread::panicking() {
        return;
    }
    std::panic::set_hook(Box::new(move |info| prev(info)));
}

fn restore_terminal() {
    let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
    let _ = disable_raw_mode();
}

/// Runs the interactive editor until accept, interrupt or a termination
/// signal. The terminal is back in cooked mode when this returns, on every
/// path.
pub fn run_session(
    buffer: PatternBuffer,
    sample: SampleText,
    config: &SessionConfig,
    observer: &Observer,
) -> Result<SessionReport> {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let _guard = TerminalGuard::install(&stop_flag)?;
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    terminal.clear()?;

    let mut session = Session::new(buffer, sample, config.highlight);
    observer.verbose_log(&format!(
        "session started: source={} lines={}",
        session.sample().source(),
        session.sample().lines().len()
    ));

    let mut dirty = true;
    while !session.is_finished() {
        if stop_flag.load(Ordering::Relaxed) {
            observer.verbose_log("termination signal received");
            session.interrupt();
            break;
        }
        if dirty {
            if session.take_clear_request() {
                terminal.clear()?;
            }
            terminal.draw(|frame| {
                draw(
                    frame,
                    &mut session,
                    &config.theme,
                    &config.continuation_marker,
                )
            })?;
            dirty = false;
        }

        if !event::poll(config.poll_interval)? {
            continue;
        }
        let key = match event::read()? {
            Event::Resize(_, _) => {
                dirty = true;
                continue;
            }
            Event::Key(key) => key,
            _ => continue,
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let outcome = session.handle_key(&key, &config.bindings);
        match outcome {
            KeyOutcome::FlagToggled(flag) => observer.verbose_log(&format!(
                "flag {} toggled, active: {}",
                flag.letter(),
                session.buffer().flags()
            )),
            KeyOutcome::UnknownFlag(letter) => {
                observer.verbose_log(&format!("ignored unknown flag '{letter}'"))
            }
            KeyOutcome::Edited => {
                if let Some(err) = session.last_error() {
                    observer.verbose_log(&format!("pattern does not compile: {err}"));
                }
            }
            _ => {}
        }
        dirty |= outcome.needs_redraw();
    }

    drop(terminal);
    let report = session.into_report();
    observer.info_log(&format!("session ended: {:?}", report.outcome));
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    static CLEANUPS: AtomicUsize = AtomicUsize::new(0);

    fn count_cleanup() {
        CLEANUPS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn panic_hook_is_handed_back_after_each_session() {
        let original = std::panic::take_hook();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        std::panic::set_hook(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let prev = chain_panic_hook(count_cleanup);
        let during: std::thread::Result<()> = std::panic::catch_unwind(|| panic!("in session"));
        restore_panic_hook(prev);
        for _ in 0..3 {
            restore_panic_hook(chain_panic_hook(count_cleanup));
        }
        let after: std::thread::Result<()> = std::panic::catch_unwind(|| panic!("after session"));
        std::panic::set_hook(original);

        assert!(during.is_err() && after.is_err());
        assert_eq!(CLEANUPS.load(Ordering::SeqCst), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
