use serde::Serialize;

/// A half-open byte range into the template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: u32,
    pub length: u32,
}

impl Span {
    #[must_use]
    pub fn new(start: u32, length: u32) -> Self {
        Self { start, length }
    }

    #[must_use]
    pub fn end(&self) -> u32 {
        self.start + self.length
    }

}

/// Byte offsets of line starts, for mapping positions to line/column.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct LineOffsets(pub Vec<u32>);

impl LineOffsets {
    pub fn add_line(&mut self, offset: u32) {
        self.0.push(offset);
    }

    #[must_use]
    pub fn position_to_line_col(&self, position: usize) -> (usize, usize) {
        let position = u32::try_from(position).unwrap_or_default();
        let line = match self.0.binary_search(&position) {
            Ok(exact_line) => exact_line,
            Err(0) => 0,
            Err(next_line) => next_line - 1,
        };

        let col = (position - self.0[line]) as usize;

        // 1-based line, 0-based column
        (line + 1, col)
    }
}

impl Default for LineOffsets {
    fn default() -> Self {
        Self(vec![0])
    }
}
