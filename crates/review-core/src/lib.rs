use std::fmt;
use std::path::{Path, PathBuf};

mod buffer;
mod config;
mod sample;

pub use buffer::PatternBuffer;
pub use config::{
    AppConfig, DefaultsConfig, MatchScope, RegexConfig, SampleConfig, ThemeConfig, UiConfig,
    expand_home,
};
pub use sample::{SampleSource, SampleText, generate_filler};

pub type Result<T> = anyhow::Result<T>;

/// Directory holding user-level settings, key bindings and the log file.
pub fn user_dir() -> Option<PathBuf> {
    let home = std::env::var("HOME")
        .ok()
        .or_else(|| std::env::var("USERPROFILE").ok())?;
    Some(Path::new(&home).join(".review"))
}

pub fn runtime_dir(workspace: &Path) -> PathBuf {
    workspace.join(".review")
}

#[derive(thiserror::Error, Debug)]
pub enum ReviewError {
    #[error("unknown flag '{0}'")]
    UnknownFlag(char),
    #[error("input unavailable: {}: {source}", path.display())]
    InputUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    PatternCompile(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    CaseInsensitive,
    Multiline,
    DotAll,
    Unicode,
    Ascii,
    Verbose,
}

// Single source of truth for flag letters. Order is the display order.
const FLAG_TABLE: [(char, Flag); 6] = [
    ('i', Flag::CaseInsensitive),
    ('m', Flag::Multiline),
    ('s', Flag::DotAll),
    ('u', Flag::Unicode),
    ('a', Flag::Ascii),
    ('x', Flag::Verbose),
];

impl Flag {
    pub const ALL: [Flag; 6] = [
        Flag::CaseInsensitive,
        Flag::Multiline,
        Flag::DotAll,
        Flag::Unicode,
        Flag::Ascii,
        Flag::Verbose,
    ];

    /// Looks up a flag by its letter, ignoring case.
    pub fn from_letter(letter: char) -> std::result::Result<Self, ReviewError> {
        let normalized = letter.to_ascii_lowercase();
        FLAG_TABLE
            .iter()
            .find(|(candidate, _)| *candidate == normalized)
            .map(|(_, flag)| *flag)
            .ok_or(ReviewError::UnknownFlag(letter))
    }

    pub fn letter(self) -> char {
        FLAG_TABLE
            .iter()
            .find(|(_, flag)| *flag == self)
            .map(|(letter, _)| *letter)
            .unwrap_or('?')
    }

    pub fn name(self) -> &'static str {
        match self {
            Flag::CaseInsensitive => "ignore case",
            Flag::Multiline => "multiline",
            Flag::DotAll => "dot all",
            Flag::Unicode => "unicode",
            Flag::Ascii => "ascii",
            Flag::Verbose => "verbose",
        }
    }

    /// The flag that cannot be active at the same time as this one.
    pub fn exclusive_with(self) -> Option<Flag> {
        match self {
            Flag::Unicode => Some(Flag::Ascii),
            Flag::Ascii => Some(Flag::Unicode),
            _ => None,
        }
    }

    fn bit(self) -> u8 {
        match self {
            Flag::CaseInsensitive => 1 << 0,
            Flag::Multiline => 1 << 1,
            Flag::DotAll => 1 << 2,
            Flag::Unicode => 1 << 3,
            Flag::Ascii => 1 << 4,
            Flag::Verbose => 1 << 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FlagSet {
    bits: u8,
}

impl FlagSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a string of flag letters such as `"im"`. Whitespace is ignored;
    /// when both `u` and `a` appear the later one wins.
    pub fn parse(letters: &str) -> std::result::Result<Self, ReviewError> {
        let mut set = Self::empty();
        for letter in letters.chars().filter(|c| !c.is_whitespace()) {
            set.insert(Flag::from_letter(letter)?);
        }
        Ok(set)
    }

    pub fn contains(self, flag: Flag) -> bool {
        self.bits & flag.bit() != 0
    }

    pub fn insert(&mut self, flag: Flag) {
        if let Some(other) = flag.exclusive_with() {
            self.remove(other);
        }
        self.bits |= flag.bit();
    }

    pub fn remove(&mut self, flag: Flag) {
        self.bits &= !flag.bit();
    }

    pub fn toggle(&mut self, flag: Flag) {
        if self.contains(flag) {
            self.remove(flag);
        } else {
            self.insert(flag);
        }
    }

    pub fn is_empty(self) -> bool {
        self.bits == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Flag> {
        Flag::ALL.into_iter().filter(move |flag| self.contains(*flag))
    }

    pub fn letters(self) -> String {
        self.iter().map(Flag::letter).collect()
    }
}

impl fmt::Display for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("no flags")
        } else {
            f.write_str(&self.letters())
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    PatternEdit,
    FlagSelect,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::PatternEdit => "EDIT",
            Mode::FlagSelect => "FLAG",
        }
    }
}
