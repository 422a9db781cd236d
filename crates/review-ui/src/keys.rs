use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct KeyBindings {
    pub accept: KeyEvent,
    pub interrupt: KeyEvent,
    pub flag_mode: KeyEvent,
    pub cancel: KeyEvent,
    pub clear_screen: KeyEvent,
    pub revert_flag: KeyEvent,
    pub clear_pattern: KeyEvent,
    pub delete_word: KeyEvent,
    pub line_start: KeyEvent,
    pub line_end: KeyEvent,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct KeyBindingsFile {
    accept: Option<String>,
    interrupt: Option<String>,
    flag_mode: Option<String>,
    cancel: Option<String>,
    clear_screen: Option<String>,
    revert_flag: Option<String>,
    clear_pattern: Option<String>,
    delete_word: Option<String>,
    line_start: Option<String>,
    line_end: Option<String>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            accept: KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE),
            interrupt: KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            flag_mode: KeyEvent::new(KeyCode::Char('f'), KeyModifiers::CONTROL),
            cancel: KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE),
            clear_screen: KeyEvent::new(KeyCode::Char('l'), KeyModifiers::CONTROL),
            revert_flag: KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL),
            clear_pattern: KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL),
            delete_word: KeyEvent::new(KeyCode::Char('w'), KeyModifiers::CONTROL),
            line_start: KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL),
            line_end: KeyEvent::new(KeyCode::Char('e'), KeyModifiers::CONTROL),
        }
    }
}

impl KeyBindings {
    fn apply_overrides(mut self, raw: KeyBindingsFile) -> Result<Self> {
        if let Some(value) = raw.accept {
            self.accept = parse_binding(&value)?;
        }
        if let Some(value) = raw.interrupt {
            self.interrupt = parse_binding(&value)?;
        }
        if let Some(value) = raw.flag_mode {
            self.flag_mode = parse_binding(&value)?;
        }
        if let Some(value) = raw.cancel {
            self.cancel = parse_binding(&value)?;
        }
        if let Some(value) = raw.clear_screen {
            self.clear_screen = parse_binding(&value)?;
        }
        if let Some(value) = raw.revert_flag {
            self.revert_flag = parse_binding(&value)?;
        }
        if let Some(value) = raw.clear_pattern {
            self.clear_pattern = parse_binding(&value)?;
        }
        if let Some(value) = raw.delete_word {
            self.delete_word = parse_binding(&value)?;
        }
        if let Some(value) = raw.line_start {
            self.line_start = parse_binding(&value)?;
        }
        if let Some(value) = raw.line_end {
            self.line_end = parse_binding(&value)?;
        }
        Ok(self)
    }
}

pub fn load_keybindings(path: &Path) -> Result<KeyBindings> {
    let raw = fs::read_to_string(path)?;
    let parsed: KeyBindingsFile = serde_json::from_str(&raw)?;
    KeyBindings::default().apply_overrides(parsed)
}

/// Compares code and modifiers only; press/repeat kind and lock state are
/// irrelevant to dispatch.
pub fn key_matches(binding: &KeyEvent, key: &KeyEvent) -> bool {
    binding.code == key.code && binding.modifiers == key.modifiers
}

/// Parses a binding such as `"ctrl+f"` or `"alt+pgdn"`: any number of
/// modifiers and exactly one key.
fn parse_binding(value: &str) -> Result<KeyEvent> {
    let mut modifiers = KeyModifiers::NONE;
    let mut code = None;
    for token in value.split('+').map(str::trim) {
        if token.is_empty() {
            anyhow::bail!("empty token in keybinding {value:?}");
        }
        let lower = token.to_ascii_lowercase();
        let modifier = match lower.as_str() {
            "ctrl" | "control" => Some(KeyModifiers::CONTROL),
            "shift" => Some(KeyModifiers::SHIFT),
            "alt" | "option" | "meta" => Some(KeyModifiers::ALT),
            _ => None,
        };
        if let Some(modifier) = modifier {
            modifiers |= modifier;
            continue;
        }
        let parsed = binding_key_code(&lower)
            .ok_or_else(|| anyhow::anyhow!("unknown key {token:?} in keybinding {value:?}"))?;
        if code.replace(parsed).is_some() {
            anyhow::bail!("keybinding {value:?} names more than one key");
        }
    }
    let code = code.ok_or_else(|| anyhow::anyhow!("keybinding {value:?} names no key"))?;
    Ok(KeyEvent::new(code, modifiers))
}

fn binding_key_code(name: &str) -> Option<KeyCode> {
    let code = match name {
        "enter" | "return" => KeyCode::Enter,
        "esc" | "escape" => KeyCode::Esc,
        "tab" => KeyCode::Tab,
        "space" => KeyCode::Char(' '),
        "backspace" => KeyCode::Backspace,
        "delete" | "del" => KeyCode::Delete,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" | "pgup" => KeyCode::PageUp,
        "pagedown" | "pgdn" => KeyCode::PageDown,
        _ => {
            let mut chars = name.chars();
            let c = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            KeyCode::Char(c)
        }
    };
    Some(code)
}

/// A key press reduced to what the editor cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Control(char),
    Backspace,
    Delete,
    Enter,
    Esc,
    Tab,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    /// True when the terminal sent the key as a multi-byte escape sequence
    /// rather than a single byte.
    pub sequence: bool,
}

impl KeyPress {
    fn byte(key: Key) -> Self {
        Self {
            key,
            sequence: false,
        }
    }

    fn escape(key: Key) -> Self {
        Self {
            key,
            sequence: true,
        }
    }
}

/// Decodes a terminal key event.
///
/// Backspace and forward delete are told apart by what the terminal sent:
/// the single bytes `0x7f` and `0x08` (Ctrl+H) both mean backspace, while
/// forward delete only ever arrives as the sequence `ESC [ 3 ~`.
pub fn decode_key(event: &KeyEvent) -> KeyPress {
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    let alt = event.modifiers.contains(KeyModifiers::ALT);
    match event.code {
        KeyCode::Char('h') | KeyCode::Char('H') if ctrl => KeyPress::byte(Key::Backspace),
        KeyCode::Char(c) if ctrl => KeyPress::byte(Key::Control(c.to_ascii_lowercase())),
        // Alt+key arrives as ESC followed by the key.
        KeyCode::Char(_) if alt => KeyPress::escape(Key::Other),
        KeyCode::Char(c) => KeyPress::byte(Key::Char(c)),
        KeyCode::Backspace => KeyPress::byte(Key::Backspace),
        KeyCode::Enter => KeyPress::byte(Key::Enter),
        KeyCode::Esc => KeyPress::byte(Key::Esc),
        KeyCode::Tab => KeyPress::byte(Key::Tab),
        KeyCode::Delete => KeyPress::escape(Key::Delete),
        KeyCode::Left => KeyPress::escape(Key::Left),
        KeyCode::Right => KeyPress::escape(Key::Right),
        KeyCode::Up => KeyPress::escape(Key::Up),
        KeyCode::Down => KeyPress::escape(Key::Down),
        KeyCode::Home => KeyPress::escape(Key::Home),
        KeyCode::End => KeyPress::escape(Key::End),
        KeyCode::PageUp => KeyPress::escape(Key::PageUp),
        KeyCode::PageDown => KeyPress::escape(Key::PageDown),
        _ => KeyPress::escape(Key::Other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backspace_and_delete_are_distinguished_by_raw_form() {
        let backspace = decode_key(&KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE));
        assert_eq!(backspace, KeyPress { key: Key::Backspace, sequence: false });

        let ctrl_h = decode_key(&KeyEvent::new(KeyCode::Char('h'), KeyModifiers::CONTROL));
        assert_eq!(ctrl_h.key, Key::Backspace);
        assert!(!ctrl_h.sequence);

        let delete = decode_key(&KeyEvent::new(KeyCode::Delete, KeyModifiers::NONE));
        assert_eq!(delete, KeyPress { key: Key::Delete, sequence: true });
    }

    #[test]
    fn control_chars_never_decode_as_printable() {
        let press = decode_key(&KeyEvent::new(KeyCode::Char('F'), KeyModifiers::CONTROL));
        assert_eq!(press.key, Key::Control('f'));
        let press = decode_key(&KeyEvent::new(KeyCode::Char('x'), KeyModifiers::ALT));
        assert_eq!(press.key, Key::Other);
        let press = decode_key(&KeyEvent::new(KeyCode::Char('Q'), KeyModifiers::SHIFT));
        assert_eq!(press.key, Key::Char('Q'));
    }

    #[test]
    fn parses_keybinding_strings() {
        let key = parse_binding("Ctrl + Shift + K").expect("parse");
        assert_eq!(key.code, KeyCode::Char('k'));
        assert_eq!(key.modifiers, KeyModifiers::CONTROL | KeyModifiers::SHIFT);

        let key = parse_binding("meta+pgdn").expect("parse");
        assert_eq!(key.code, KeyCode::PageDown);
        assert_eq!(key.modifiers, KeyModifiers::ALT);

        assert!(parse_binding("ctrl+").is_err());
        assert!(parse_binding("ctrl").is_err());
        assert!(parse_binding("hyper+k").is_err());
        assert!(parse_binding("ctrl+a+b").is_err());
    }

    #[test]
    fn loads_overrides_from_json_file() {
        let dir = tempfile::tempdir().expect("dir");
        let path = dir.path().join("keybindings.json");
        fs::write(&path, r#"{"flag_mode":"alt+f","accept":"ctrl+enter"}"#).expect("write");

        let bindings = load_keybindings(&path).expect("load");
        assert!(key_matches(
            &bindings.flag_mode,
            &KeyEvent::new(KeyCode::Char('f'), KeyModifiers::ALT)
        ));
        assert!(key_matches(
            &bindings.accept,
            &KeyEvent::new(KeyCode::Enter, KeyModifiers::CONTROL)
        ));
        assert!(key_matches(
            &bindings.interrupt,
            &KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)
        ));
    }

    #[test]
    fn invalid_binding_file_is_an_error() {
        let dir = tempfile::tempdir().expect("dir");
        let path = dir.path().join("keybindings.json");
        fs::write(&path, r#"{"accept":"ctrl+bogus"}"#).expect("write");
        assert!(load_keybindings(&path).is_err());
    }
}
