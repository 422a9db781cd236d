use crate::{Flag, FlagSet, ReviewError};

/// The regex being edited, its cursor, and the active flags.
///
/// The cursor is a character index and always satisfies
/// `0 <= cursor <= source.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternBuffer {
    source: Vec<char>,
    cursor: usize,
    flags: FlagSet,
    /// The most recent toggle and the flags it replaced.
    last_toggle: Option<(Flag, FlagSet)>,
}

impl PatternBuffer {
    /// Creates a buffer holding `pattern` with the cursor at its end.
    pub fn new(pattern: &str, flags: FlagSet) -> Self {
        let source: Vec<char> = pattern.chars().collect();
        let cursor = source.len();
        Self {
            source,
            cursor,
            flags,
            last_toggle: None,
        }
    }

    pub fn pattern(&self) -> String {
        self.source.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn flags(&self) -> FlagSet {
        self.flags
    }

    pub fn chars(&self) -> &[char] {
        &self.source
    }

    /// Inserts a printable character at the cursor. Control characters are
    /// left for command dispatch and return `false`.
    pub fn insert_char(&mut self, c: char) -> bool {
        if c.is_control() {
            return false;
        }
        self.source.insert(self.cursor, c);
        self.cursor += 1;
        true
    }

    pub fn delete_before(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.source.remove(self.cursor);
        true
    }

    pub fn delete_after(&mut self) -> bool {
        if self.cursor >= self.source.len() {
            return false;
        }
        self.source.remove(self.cursor);
        true
    }

    /// Removes the whitespace-delimited word ending at the cursor, along with
    /// any whitespace between it and the cursor.
    pub fn delete_word_before(&mut self) -> bool {
        let mut start = self.cursor;
        while start > 0 && self.source[start - 1].is_whitespace() {
            start -= 1;
        }
        while start > 0 && !self.source[start - 1].is_whitespace() {
            start -= 1;
        }
        if start == self.cursor {
            return false;
        }
        self.source.drain(start..self.cursor);
        self.cursor = start;
        true
    }

    pub fn clear(&mut self) {
        self.source.clear();
        self.cursor = 0;
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let target = self.cursor as isize + delta;
        self.cursor = target.clamp(0, self.source.len() as isize) as usize;
    }

    pub fn move_cursor_to_start(&mut self) {
        self.cursor = 0;
    }

    pub fn move_cursor_to_end(&mut self) {
        self.cursor = self.source.len();
    }

    /// Flips the flag named by `letter`. Unicode and ascii clear each other.
    pub fn toggle_flag(&mut self, letter: char) -> Result<Flag, ReviewError> {
        let flag = Flag::from_letter(letter)?;
        self.last_toggle = Some((flag, self.flags));
        self.flags.toggle(flag);
        Ok(flag)
    }

    /// Restores the flags from before the most recent toggle, including a
    /// partner flag the toggle displaced. Returns the flag that was toggled.
    pub fn revert_last_toggle(&mut self) -> Option<Flag> {
        let (flag, previous) = self.last_toggle.take()?;
        self.flags = previous;
        Some(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Edit {
        Insert(char),
        DeleteBefore,
        DeleteAfter,
        DeleteWord,
        Move(isize),
        Start,
        End,
    }

    fn edit_strategy() -> impl Strategy<Value = Edit> {
        prop_oneof![
            any::<char>().prop_map(Edit::Insert),
            Just(Edit::DeleteBefore),
            Just(Edit::DeleteAfter),
            Just(Edit::DeleteWord),
            (-20isize..20).prop_map(Edit::Move),
            Just(Edit::Start),
            Just(Edit::End),
        ]
    }

    proptest! {
        #[test]
        fn cursor_stays_within_source_bounds(
            initial in "[a-z()+*.^$ ]{0,12}",
            edits in prop::collection::vec(edit_strategy(), 0..64),
        ) {
            let mut buffer = PatternBuffer::new(&initial, FlagSet::empty());
            for edit in edits {
                match edit {
                    Edit::Insert(c) => {
                        buffer.insert_char(c);
                    }
                    Edit::DeleteBefore => {
                        buffer.delete_before();
                    }
                    Edit::DeleteAfter => {
                        buffer.delete_after();
                    }
                    Edit::DeleteWord => {
                        buffer.delete_word_before();
                    }
                    Edit::Move(delta) => buffer.move_cursor(delta),
                    Edit::Start => buffer.move_cursor_to_start(),
                    Edit::End => buffer.move_cursor_to_end(),
                }
                prop_assert!(buffer.cursor() <= buffer.len());
            }
        }
    }

    #[test]
    fn inserts_at_cursor_and_advances() {
        let mut buffer = PatternBuffer::new("ac", FlagSet::empty());
        buffer.move_cursor(-1);
        assert!(buffer.insert_char('b'));
        assert_eq!(buffer.pattern(), "abc");
        assert_eq!(buffer.cursor(), 2);
    }

    #[test]
    fn control_characters_are_not_inserted() {
        let mut buffer = PatternBuffer::new("", FlagSet::empty());
        assert!(!buffer.insert_char('\u{7f}'));
        assert!(!buffer.insert_char('\n'));
        assert!(buffer.is_empty());
        assert_eq!(buffer.cursor(), 0);
    }

    #[test]
    fn deletes_are_noops_at_the_edges() {
        let mut buffer = PatternBuffer::new("ab", FlagSet::empty());
        assert!(!buffer.delete_after());
        buffer.move_cursor_to_start();
        assert!(!buffer.delete_before());
        assert!(buffer.delete_after());
        assert_eq!(buffer.pattern(), "b");
        buffer.move_cursor_to_end();
        assert!(buffer.delete_before());
        assert!(buffer.is_empty());
    }

    #[test]
    fn move_cursor_clamps() {
        let mut buffer = PatternBuffer::new("abc", FlagSet::empty());
        buffer.move_cursor(-100);
        assert_eq!(buffer.cursor(), 0);
        buffer.move_cursor(100);
        assert_eq!(buffer.cursor(), 3);
    }

    #[test]
    fn delete_word_before_removes_trailing_word() {
        let mut buffer = PatternBuffer::new("foo bar  ", FlagSet::empty());
        assert!(buffer.delete_word_before());
        assert_eq!(buffer.pattern(), "foo ");
        assert_eq!(buffer.cursor(), 4);
        assert!(buffer.delete_word_before());
        assert!(buffer.is_empty());
        assert!(!buffer.delete_word_before());
    }

    #[test]
    fn toggle_flag_twice_restores_flags() {
        let mut buffer = PatternBuffer::new("x", FlagSet::parse("i").unwrap());
        let before = buffer.flags();
        buffer.toggle_flag('m').unwrap();
        assert!(buffer.flags().contains(Flag::Multiline));
        buffer.toggle_flag('M').unwrap();
        assert_eq!(buffer.flags(), before);
    }

    #[test]
    fn unknown_flag_leaves_flags_unchanged() {
        let mut buffer = PatternBuffer::new("x", FlagSet::parse("s").unwrap());
        let before = buffer.flags();
        assert!(matches!(
            buffer.toggle_flag('Q'),
            Err(ReviewError::UnknownFlag('Q'))
        ));
        assert_eq!(buffer.flags(), before);
        assert_eq!(buffer.revert_last_toggle(), None);
    }

    #[test]
    fn revert_last_toggle_rolls_back_once() {
        let mut buffer = PatternBuffer::new("", FlagSet::empty());
        buffer.toggle_flag('i').unwrap();
        assert_eq!(buffer.revert_last_toggle(), Some(Flag::CaseInsensitive));
        assert!(buffer.flags().is_empty());
        assert_eq!(buffer.revert_last_toggle(), None);
    }

    #[test]
    fn revert_brings_back_displaced_partner_flag() {
        let mut buffer = PatternBuffer::new("", FlagSet::parse("ia").unwrap());
        buffer.toggle_flag('u').unwrap();
        assert!(buffer.flags().contains(Flag::Unicode));
        assert!(!buffer.flags().contains(Flag::Ascii));

        assert_eq!(buffer.revert_last_toggle(), Some(Flag::Unicode));
        assert_eq!(buffer.flags(), FlagSet::parse("ia").unwrap());
        assert_eq!(buffer.flags().to_string(), "ia");
    }
}
