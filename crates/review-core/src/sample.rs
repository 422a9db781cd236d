use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::ReviewError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleSource {
    File(PathBuf),
    Stdin,
    Generated,
}

impl fmt::Display for SampleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleSource::File(path) => write!(f, "{}", path.display()),
            SampleSource::Stdin => f.write_str("<stdin>"),
            SampleSource::Generated => f.write_str("<lorem>"),
        }
    }
}

/// The text being matched against. Fixed for the whole session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleText {
    lines: Vec<String>,
    source: SampleSource,
}

impl SampleText {
    pub fn new(text: &str, source: SampleSource) -> Self {
        let mut lines: Vec<String> = text.lines().map(ToString::to_string).collect();
        if lines.is_empty() {
            lines.push(String::new());
        }
        Self { lines, source }
    }

    pub fn from_path(path: &Path) -> Result<Self, ReviewError> {
        let bytes = fs::read(path).map_err(|source| ReviewError::InputUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(
            &String::from_utf8_lossy(&bytes),
            SampleSource::File(path.to_path_buf()),
        ))
    }

    pub fn from_reader(mut reader: impl Read) -> Result<Self, ReviewError> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|source| ReviewError::InputUnavailable {
                path: PathBuf::from("-"),
                source,
            })?;
        Ok(Self::new(&String::from_utf8_lossy(&bytes), SampleSource::Stdin))
    }

    pub fn generated(paragraphs: usize, seed: Option<u64>) -> Self {
        Self::new(&generate_filler(paragraphs, seed), SampleSource::Generated)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn source(&self) -> &SampleSource {
        &self.source
    }
}

const OPENING: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit.";

const WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "etiam",
    "ut", "sodales", "felis", "vestibulum", "eu", "tortor", "eget", "erat", "eleifend",
    "auctor", "mattis", "quis", "ligula", "curabitur", "sed", "lectus", "morbi", "ac", "est",
    "condimentum", "tempus", "ante", "euismod", "eros", "phasellus", "ultricies", "in",
    "nibh", "non", "malesuada", "aenean", "placerat", "justo", "nullam", "facilisis",
    "sapien", "viverra", "posuere", "turpis", "quisque", "rhoncus", "nisi", "laoreet",
    "dapibus", "suspendisse", "fermentum", "dui", "molestie", "nunc", "diam", "id",
    "blandit", "tristique", "nec", "odio", "orci", "gravida", "velit", "nisl", "vitae",
    "venenatis", "purus", "integer", "ultrices", "tempor", "mauris", "dictum", "et",
    "pellentesque", "vehicula", "tincidunt", "aliquam", "volutpat", "maximus", "aliquet",
    "lacus", "at", "consequat", "pulvinar", "sagittis", "donec", "massa", "elementum",
    "cursus", "magna", "risus", "congue", "vulputate", "augue", "faucibus", "convallis",
    "arcu", "duis", "porttitor", "quam", "luctus", "suscipit", "hendrerit",
];

/// Produces lorem-style paragraphs separated by blank lines. The first
/// paragraph always opens with the classic sentence.
pub fn generate_filler(paragraphs: usize, seed: Option<u64>) -> String {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut out = Vec::with_capacity(paragraphs.max(1));
    for index in 0..paragraphs.max(1) {
        let sentence_count = rng.gen_range(4..9);
        let mut sentences = Vec::with_capacity(sentence_count + 1);
        if index == 0 {
            sentences.push(OPENING.to_string());
        }
        for _ in 0..sentence_count {
            sentences.push(sentence(&mut rng));
        }
        out.push(sentences.join(" "));
    }
    out.join("\n\n")
}

fn sentence(rng: &mut StdRng) -> String {
    let word_count = rng.gen_range(5..14);
    let mut words: Vec<String> = Vec::with_capacity(word_count);
    for position in 0..word_count {
        let word = WORDS.choose(rng).copied().unwrap_or("lorem");
        let comma = position + 1 < word_count && position > 1 && rng.gen_ratio(1, 8);
        words.push(if comma {
            format!("{word},")
        } else {
            word.to_string()
        });
    }
    let mut text = words.join(" ");
    if let Some(first) = text.get(..1) {
        let upper = first.to_ascii_uppercase();
        text.replace_range(..1, &upper);
    }
    text.push('.');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn seeded_filler_is_deterministic() {
        let a = generate_filler(3, Some(7));
        let b = generate_filler(3, Some(7));
        assert_eq!(a, b);
        assert!(a.starts_with(OPENING));
        assert_eq!(a.split("\n\n").count(), 3);
    }

    #[test]
    fn generated_sample_keeps_blank_separator_lines() {
        let sample = SampleText::generated(2, Some(1));
        assert_eq!(sample.lines().len(), 3);
        assert!(sample.lines()[1].is_empty());
        assert_eq!(sample.source(), &SampleSource::Generated);
    }

    #[test]
    fn missing_file_reports_input_unavailable() {
        let dir = tempfile::tempdir().expect("dir");
        let missing = dir.path().join("nope.txt");
        let err = SampleText::from_path(&missing).expect_err("missing");
        assert!(matches!(err, ReviewError::InputUnavailable { .. }));
    }

    #[test]
    fn reads_lines_from_file_and_reader() {
        let dir = tempfile::tempdir().expect("dir");
        let path = dir.path().join("input.txt");
        fs::write(&path, "yx\r\nxz\n").expect("write");
        let sample = SampleText::from_path(&path).expect("read");
        assert_eq!(sample.lines(), &["yx".to_string(), "xz".to_string()]);

        let sample = SampleText::from_reader(Cursor::new(b"one\ntwo".to_vec())).expect("read");
        assert_eq!(sample.lines().len(), 2);
        assert_eq!(sample.source(), &SampleSource::Stdin);
    }

    #[test]
    fn empty_input_still_has_one_line() {
        let sample = SampleText::new("", SampleSource::Stdin);
        assert_eq!(sample.lines(), &[String::new()]);
    }
}
