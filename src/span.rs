use serde::{Deserialize, Serialize};

/// Byte-offset span in source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub file_id: u32,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end, file_id: 0 }
    }

    pub fn with_file(start: usize, end: usize, file_id: u32) -> Self {
        Self { start, end, file_id }
    }

    pub fn dummy() -> Self {
        Self { start: 0, end: 0, file_id: 0 }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            file_id: self.file_id,
        }
    }

    /// Shift by `offset` bytes, used when re-lexing an interpolated segment.
    pub fn shifted(self, offset: usize) -> Span {
        Span {
            start: self.start + offset,
            end: self.end + offset,
            file_id: self.file_id,
        }
    }
}

/// A value annotated with its source span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    pub fn dummy(node: T) -> Self {
        Self { node, span: Span::dummy() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_new() {
        let span = Span::new(10, 20);
        assert_eq!(span.start, 10);
        assert_eq!(span.end, 20);
        assert_eq!(span.file_id, 0);
    }

    #[test]
    fn test_span_to_covers_both() {
        let a = Span::with_file(4, 9, 3);
        let b = Span::with_file(12, 30, 3);
        assert_eq!(a.to(b), Span::with_file(4, 30, 3));
        assert_eq!(b.to(a), Span::with_file(4, 30, 3));
    }

    #[test]
    fn test_span_shifted() {
        let span = Span::with_file(2, 5, 1).shifted(10);
        assert_eq!(span, Span::with_file(12, 15, 1));
    }

    #[test]
    fn test_spans_in_different_files_differ() {
        assert_ne!(Span::with_file(10, 20, 1), Span::with_file(10, 20, 2));
    }

    #[test]
    fn test_spanned_dummy() {
        let spanned = Spanned::dummy("x");
        assert_eq!(spanned.node, "x");
        assert_eq!(spanned.span, Span::dummy());
    }
}
