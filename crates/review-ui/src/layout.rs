use review_highlight::HighlightedLine;
use unicode_width::UnicodeWidthChar;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSegment {
    pub text: String,
    pub emphasized: bool,
}

/// One terminal row of wrapped output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayRow {
    /// Set for every row after the first of a logical line. Continuation rows
    /// are drawn behind the marker and never count as a line start.
    pub continuation: bool,
    pub segments: Vec<RowSegment>,
}

impl DisplayRow {
    fn new(continuation: bool) -> Self {
        Self {
            continuation,
            segments: Vec::new(),
        }
    }

    fn push(&mut self, ch: char, emphasized: bool) {
        if let Some(last) = self.segments.last_mut()
            && last.emphasized == emphasized
        {
            last.text.push(ch);
            return;
        }
        self.segments.push(RowSegment {
            text: ch.to_string(),
            emphasized,
        });
    }

    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutFrame {
    pub rows: Vec<DisplayRow>,
    /// Scroll offset after clamping.
    pub offset: usize,
    /// Wrapped rows before clipping.
    pub total: usize,
}

/// Tabs and other control characters would move the terminal cursor, so
/// they are drawn as a single blank.
fn display_char(ch: char) -> (char, usize) {
    match ch.width() {
        Some(width) if !ch.is_control() => (ch, width),
        _ => (' ', 1),
    }
}

/// Wraps every line to `width` columns. Continuation rows hold
/// `width - marker_width` columns when the marker fits, `width` otherwise.
pub fn wrap_lines(lines: &[HighlightedLine], width: usize, marker_width: usize) -> Vec<DisplayRow> {
    let mut rows = Vec::new();
    if width == 0 {
        return rows;
    }
    let continuation_width = if width > marker_width {
        width - marker_width
    } else {
        width
    };
    for line in lines {
        let mut row = DisplayRow::new(false);
        let mut capacity = width;
        let mut used = 0;
        for segment in line.segments() {
            for ch in segment.text.chars() {
                let (shown, cols) = display_char(ch);
                if used > 0 && used + cols > capacity {
                    rows.push(std::mem::replace(&mut row, DisplayRow::new(true)));
                    capacity = continuation_width;
                    used = 0;
                }
                row.push(shown, segment.emphasized);
                used += cols;
            }
        }
        rows.push(row);
    }
    rows
}

pub fn max_offset(total: usize, height: usize) -> usize {
    total.saturating_sub(height)
}

/// Wraps, clamps `offset` and returns the rows that fit in `height`.
pub fn layout(
    lines: &[HighlightedLine],
    width: usize,
    height: usize,
    offset: usize,
    marker_width: usize,
) -> LayoutFrame {
    let wrapped = wrap_lines(lines, width, marker_width);
    let total = wrapped.len();
    let offset = offset.min(max_offset(total, height));
    let rows = wrapped.into_iter().skip(offset).take(height).collect();
    LayoutFrame {
        rows,
        offset,
        total,
    }
}

/// Scroll position over the wrapped rows of the last frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    offset: usize,
    total: usize,
    height: usize,
}

impl Viewport {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Records the geometry of the frame just laid out.
    pub fn sync(&mut self, frame: &LayoutFrame, height: usize) {
        self.total = frame.total;
        self.height = height;
        self.offset = frame.offset;
    }

    /// Moves by `delta` rows, clamped to `[0, max(0, total - height)]`.
    pub fn scroll(&mut self, delta: isize) {
        let max = max_offset(self.total, self.height) as isize;
        let target = (self.offset as isize).saturating_add(delta);
        self.offset = target.clamp(0, max) as usize;
    }

    pub fn page_down(&mut self) {
        self.scroll(self.page_size());
    }

    pub fn page_up(&mut self) {
        self.scroll(-self.page_size());
    }

    pub fn scroll_to_top(&mut self) {
        self.offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.offset = max_offset(self.total, self.height);
    }

    fn page_size(&self) -> isize {
        self.height.saturating_sub(1).max(1) as isize
    }
}
