//! Label wrapping for node captions.

use serde::{Deserialize, Serialize};

/// One rendered line of a wrapped label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelLine {
    /// Line text.
    pub text: String,
    /// Vertical offset from the previous line, in em. The first line's
    /// offset lifts the block so it is centered on the anchor point.
    pub dy_em: f64,
}

/// Break `label` into lines of at most `max_chars` characters.
///
/// Breaks only between words. A single word longer than the budget gets a
/// line of its own rather than being split. Whitespace runs collapse.
pub fn wrap_label(label: &str, max_chars: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in label.split_whitespace() {
        let word_len = word.chars().count();
        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Wrap `label` and compute vertically centered line offsets.
///
/// The first line moves up by `(n - 1) / 2` line heights; each later line
/// moves down by one line height.
pub fn label_lines(label: &str, max_chars: usize, line_height_em: f64) -> Vec<LabelLine> {
    let lines = wrap_label(label, max_chars);
    let first_offset = -((lines.len().saturating_sub(1)) as f64 / 2.0) * line_height_em;

    lines
        .into_iter()
        .enumerate()
        .map(|(i, text)| LabelLine {
            text,
            dy_em: if i == 0 { first_offset } else { line_height_em },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_respects_budget() {
        let lines = wrap_label("Bone density loss in long duration spaceflight", 16);
        assert_eq!(lines, vec!["Bone density", "loss in long", "duration", "spaceflight"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 16));
    }

    #[test]
    fn test_long_word_kept_whole() {
        let lines = wrap_label("a supercalifragilistic b", 5);
        assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);
    }

    #[test]
    fn test_empty_label() {
        assert!(wrap_label("   ", 10).is_empty());
        assert!(label_lines("", 10, 1.1).is_empty());
    }

    #[test]
    fn test_block_is_centered() {
        let lines = label_lines("one two three", 3, 1.0);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].dy_em, -1.0);
        assert_eq!(lines[1].dy_em, 1.0);
        assert_eq!(lines[2].dy_em, 1.0);

        let single = label_lines("single", 20, 1.1);
        assert_eq!(single[0].dy_em, 0.0);
    }
}
