use crossterm::event::KeyEvent;
use review_core::{Flag, FlagSet, Mode, PatternBuffer, ReviewError, SampleText};
use review_highlight::{Highlight, HighlightOptions, highlight};
use std::fmt;
use unicode_width::UnicodeWidthChar;

use crate::keys::{Key, KeyBindings, decode_key, key_matches};
use crate::layout::{LayoutFrame, Viewport, layout};

pub const PROMPT_PREFIX: &str = "regex> ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Accepted,
    Interrupted,
}

/// What a single key did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Edited,
    FlagToggled(Flag),
    UnknownFlag(char),
    Cancelled,
    Scrolled,
    Redraw,
    Finished(SessionOutcome),
    Ignored,
}

impl KeyOutcome {
    pub fn needs_redraw(self) -> bool {
        !matches!(self, KeyOutcome::Ignored)
    }
}

/// The pattern and flags in force when the session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub pattern: String,
    pub flags: FlagSet,
    pub outcome: SessionOutcome,
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "pattern: {}", self.pattern)?;
        write!(f, "flags: {}", self.flags)
    }
}

/// Editor state between keys. Holds no terminal handles; `run_session`
/// feeds it events and draws what it reports.
pub struct Session {
    buffer: PatternBuffer,
    mode: Mode,
    sample: SampleText,
    options: HighlightOptions,
    rendered: Highlight,
    last_error: Option<String>,
    computed_for: Option<(String, FlagSet)>,
    viewport: Viewport,
    info_line: Option<String>,
    clear_requested: bool,
    outcome: Option<SessionOutcome>,
}

impl Session {
    pub fn new(buffer: PatternBuffer, sample: SampleText, options: HighlightOptions) -> Self {
        let rendered = Highlight::unhighlighted(sample.lines());
        let mut session = Self {
            buffer,
            mode: Mode::PatternEdit,
            sample,
            options,
            rendered,
            last_error: None,
            computed_for: None,
            viewport: Viewport::default(),
            info_line: None,
            clear_requested: false,
            outcome: None,
        };
        session.refresh();
        session
    }

    pub fn buffer(&self) -> &PatternBuffer {
        &self.buffer
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn sample(&self) -> &SampleText {
        &self.sample
    }

    /// The most recent highlight that compiled.
    pub fn rendered(&self) -> &Highlight {
        &self.rendered
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn info_line(&self) -> Option<&str> {
        self.info_line.as_deref()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Ends the session as interrupted. Used when a signal arrives.
    pub fn interrupt(&mut self) {
        if self.outcome.is_none() {
            self.outcome = Some(SessionOutcome::Interrupted);
        }
    }

    /// True once after the clear-screen key was pressed.
    pub fn take_clear_request(&mut self) -> bool {
        std::mem::take(&mut self.clear_requested)
    }

    pub fn handle_key(&mut self, event: &KeyEvent, bindings: &KeyBindings) -> KeyOutcome {
        self.info_line = None;
        if key_matches(&bindings.interrupt, event) {
            self.mode = Mode::PatternEdit;
            return self.finish(SessionOutcome::Interrupted);
        }
        let outcome = match self.mode {
            Mode::FlagSelect => self.handle_flag_key(event, bindings),
            Mode::PatternEdit => self.handle_edit_key(event, bindings),
        };
        self.refresh();
        outcome
    }

    fn finish(&mut self, outcome: SessionOutcome) -> KeyOutcome {
        self.outcome = Some(outcome);
        KeyOutcome::Finished(outcome)
    }

    fn handle_flag_key(&mut self, event: &KeyEvent, bindings: &KeyBindings) -> KeyOutcome {
        self.mode = Mode::PatternEdit;
        if key_matches(&bindings.cancel, event) {
            return KeyOutcome::Cancelled;
        }
        match decode_key(event).key {
            Key::Char(letter) => match self.buffer.toggle_flag(letter) {
                Ok(flag) => {
                    self.info_line = Some(format!(
                        "{} {}",
                        flag.name(),
                        if self.buffer.flags().contains(flag) {
                            "on"
                        } else {
                            "off"
                        }
                    ));
                    KeyOutcome::FlagToggled(flag)
                }
                Err(err) => {
                    self.info_line = Some(err.to_string());
                    match err {
                        ReviewError::UnknownFlag(c) => KeyOutcome::UnknownFlag(c),
                        _ => KeyOutcome::UnknownFlag(letter),
                    }
                }
            },
            _ => KeyOutcome::Cancelled,
        }
    }

    fn handle_edit_key(&mut self, event: &KeyEvent, bindings: &KeyBindings) -> KeyOutcome {
        if key_matches(&bindings.accept, event) {
            return self.finish(SessionOutcome::Accepted);
        }
        if key_matches(&bindings.flag_mode, event) {
            self.mode = Mode::FlagSelect;
            self.info_line = Some(flag_prompt());
            return KeyOutcome::Redraw;
        }
        if key_matches(&bindings.clear_screen, event) {
            self.clear_requested = true;
            return KeyOutcome::Redraw;
        }
        if key_matches(&bindings.revert_flag, event) {
            return match self.buffer.revert_last_toggle() {
                Some(flag) => {
                    self.info_line = Some(format!("reverted {}", flag.name()));
                    KeyOutcome::FlagToggled(flag)
                }
                None => KeyOutcome::Ignored,
            };
        }
        if key_matches(&bindings.clear_pattern, event) {
            if self.buffer.is_empty() {
                return KeyOutcome::Ignored;
            }
            self.buffer.clear();
            return KeyOutcome::Edited;
        }
        if key_matches(&bindings.delete_word, event) {
            return edited(self.buffer.delete_word_before());
        }
        if key_matches(&bindings.line_start, event) {
            self.buffer.move_cursor_to_start();
            return KeyOutcome::Redraw;
        }
        if key_matches(&bindings.line_end, event) {
            self.buffer.move_cursor_to_end();
            return KeyOutcome::Redraw;
        }
        if key_matches(&bindings.cancel, event) {
            return KeyOutcome::Ignored;
        }

        match decode_key(event).key {
            Key::Char(c) => edited(self.buffer.insert_char(c)),
            Key::Backspace => edited(self.buffer.delete_before()),
            Key::Delete => edited(self.buffer.delete_after()),
            Key::Left => {
                self.buffer.move_cursor(-1);
                KeyOutcome::Redraw
            }
            Key::Right => {
                self.buffer.move_cursor(1);
                KeyOutcome::Redraw
            }
            Key::Home => {
                self.buffer.move_cursor_to_start();
                KeyOutcome::Redraw
            }
            Key::End => {
                self.buffer.move_cursor_to_end();
                KeyOutcome::Redraw
            }
            Key::Up => self.scroll_with(|vp| vp.scroll(-1)),
            Key::Down => self.scroll_with(|vp| vp.scroll(1)),
            Key::PageUp => self.scroll_with(Viewport::page_up),
            Key::PageDown => self.scroll_with(Viewport::page_down),
            Key::Control(_) | Key::Enter | Key::Esc | Key::Tab | Key::Other => {
                KeyOutcome::Ignored
            }
        }
    }

    fn scroll_with(&mut self, apply: impl FnOnce(&mut Viewport)) -> KeyOutcome {
        let before = self.viewport.offset();
        apply(&mut self.viewport);
        if self.viewport.offset() == before {
            KeyOutcome::Ignored
        } else {
            KeyOutcome::Scrolled
        }
    }

    /// Recomputes the highlight when the pattern or flags changed since the
    /// last call. A pattern that fails to compile records the error and
    /// leaves the previous rendering in place.
    pub fn refresh(&mut self) {
        let key = (self.buffer.pattern(), self.buffer.flags());
        if self.computed_for.as_ref() == Some(&key) {
            return;
        }
        let result = highlight(self.sample.lines(), &key.0, key.1, &self.options);
        if result.is_ok() {
            self.rendered = result;
            self.last_error = None;
        } else {
            self.last_error = result.error;
        }
        self.computed_for = Some(key);
    }

    /// Lays out the current rendering and remembers the geometry for
    /// subsequent scroll keys.
    pub fn layout_frame(&mut self, width: usize, height: usize, marker_width: usize) -> LayoutFrame {
        let frame = layout(
            &self.rendered.lines,
            width,
            height,
            self.viewport.offset(),
            marker_width,
        );
        self.viewport.sync(&frame, height);
        frame
    }

    pub fn status_line(&self) -> String {
        let total = self.viewport.total();
        let first = self.viewport.offset();
        let last = (first + self.viewport.height()).min(total);
        let rows = if total == 0 {
            "rows 0/0".to_string()
        } else {
            format!("rows {}-{last}/{total}", first + 1)
        };
        let matches = self.rendered.match_count();
        format!(
            " {} | flags: {} | {matches} {} | {rows} | {}",
            self.sample.source(),
            self.buffer.flags(),
            if matches == 1 { "match" } else { "matches" },
            self.mode.label(),
        )
    }

    /// The prompt text that fits in `width` columns and the column the
    /// cursor sits on. Long patterns scroll so the cursor stays visible.
    pub fn prompt_window(&self, width: usize) -> (String, usize) {
        let prefix_width = PROMPT_PREFIX.chars().count();
        let chars = self.buffer.chars();
        let cursor = self.buffer.cursor();
        let avail = width.saturating_sub(prefix_width);
        let char_width = |c: &char| c.width().unwrap_or(0);

        // Leave one column for the cursor past the last character.
        let mut start = 0;
        while start < cursor && chars[start..cursor].iter().map(char_width).sum::<usize>() >= avail
        {
            start += 1;
        }
        let mut shown = String::from(PROMPT_PREFIX);
        let mut used = 0;
        for c in &chars[start..] {
            let w = char_width(c);
            if used + w > avail {
                break;
            }
            shown.push(*c);
            used += w;
        }
        let column = prefix_width + chars[start..cursor].iter().map(char_width).sum::<usize>();
        (shown, column)
    }

    pub fn into_report(self) -> SessionReport {
        SessionReport {
            pattern: self.buffer.pattern(),
            flags: self.buffer.flags(),
            outcome: self.outcome.unwrap_or(SessionOutcome::Interrupted),
        }
    }
}

fn edited(changed: bool) -> KeyOutcome {
    if changed {
        KeyOutcome::Edited
    } else {
        KeyOutcome::Ignored
    }
}

fn flag_prompt() -> String {
    let letters: String = Flag::ALL.iter().map(|flag| flag.letter()).collect();
    format!("flag [{letters}]? (esc cancels)")
}
