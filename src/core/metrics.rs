//! Before/after content metrics.
//!
//! Reordering only moves lines, so characters and words must survive
//! unchanged. A drift means lines were lost or duplicated.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContentMetrics {
    pub chars: usize,
    pub words: usize,
    pub lines: usize,
}

impl ContentMetrics {
    pub fn measure(text: &str) -> Self {
        Self {
            chars: text.chars().count(),
            words: text.split_whitespace().count(),
            lines: text.lines().count(),
        }
    }

    /// Human-readable drift messages, empty when chars and words agree
    pub fn drift(&self, after: &ContentMetrics) -> Vec<String> {
        let mut out = Vec::new();
        if self.chars != after.chars {
            out.push(format!(
                "Character count differs (Before: {}, After: {})",
                self.chars, after.chars
            ));
        }
        if self.words != after.words {
            out.push(format!(
                "Word count differs (Before: {}, After: {})",
                self.words, after.words
            ));
        }
        out
    }
}

impl std::fmt::Display for ContentMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Characters: {}, Words: {}, Lines: {}",
            self.chars, self.words, self.lines
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_drift() {
        let before = ContentMetrics::measure("void f() {\n}\n");
        assert_eq!(before, ContentMetrics { chars: 13, words: 4, lines: 2 });

        let moved = ContentMetrics::measure("}\nvoid f() {\n");
        assert!(before.drift(&moved).is_empty());

        let lost = ContentMetrics::measure("void f() {\n");
        assert_eq!(lost.drift(&before).len(), 2);
    }
}
