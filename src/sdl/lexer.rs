//! Line scanner for SDL source.
//!
//! SDL is line oriented, but braces may share a physical line with other
//! statements (`entity A { id: ID }`). The scanner splits those into logical
//! lines that keep the physical line number for diagnostics.

/// One significant logical line of SDL source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine<'a> {
    /// 1-based physical line number.
    pub number: usize,
    pub text: &'a str,
}

/// Split `source` into trimmed, non-empty, non-comment logical lines.
pub fn scan(source: &str) -> Vec<SourceLine<'_>> {
    let mut lines = Vec::new();

    for (index, raw) in source.lines().enumerate() {
        let text = raw.trim();
        if text.is_empty() || text.starts_with("//") {
            continue;
        }
        split_braces(index + 1, text, &mut lines);
    }

    lines
}

/// Break a physical line after every `{` and around every `}` that is not
/// nested inside parentheses.
fn split_braces<'a>(number: usize, text: &'a str, out: &mut Vec<SourceLine<'a>>) {
    let mut depth = 0usize;
    let mut start = 0usize;

    let mut push = |segment: &'a str| {
        let segment = segment.trim();
        if !segment.is_empty() {
            out.push(SourceLine { number, text: segment });
        }
    };

    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '{' if depth == 0 => {
                push(&text[start..=i]);
                start = i + 1;
            }
            '}' if depth == 0 => {
                push(&text[start..i]);
                push(&text[i..=i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    push(&text[start..]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn texts<'a>(lines: &[SourceLine<'a>]) -> Vec<&'a str> {
        lines.iter().map(|l| l.text).collect()
    }

    #[rstest]
    fn test_skips_blank_and_comment_lines() {
        let source = "\n// a comment\nentity User {\n\n  id: ID\n}\n";
        let lines = scan(source);

        assert_eq!(texts(&lines), vec!["entity User {", "id: ID", "}"]);
        assert_eq!(lines[0].number, 3);
        assert_eq!(lines[1].number, 5);
        assert_eq!(lines[2].number, 6);
    }

    #[rstest]
    fn test_splits_single_line_entities() {
        let lines = scan("entity A { b: B } entity B { id: ID @primary }");

        assert_eq!(
            texts(&lines),
            vec!["entity A {", "b: B", "}", "entity B {", "id: ID @primary", "}"]
        );
        assert!(lines.iter().all(|l| l.number == 1));
    }

    #[rstest]
    fn test_braces_inside_parentheses_are_kept() {
        let lines = scan("  meta: json @default({})");
        assert_eq!(texts(&lines), vec!["meta: json @default({})"]);
    }

    #[rstest]
    fn test_indented_comment_is_skipped() {
        let lines = scan("entity A {\n    // note\n}");
        assert_eq!(texts(&lines), vec!["entity A {", "}"]);
    }

    #[rstest]
    fn test_empty_source() {
        assert!(scan("").is_empty());
        assert!(scan("   \n\t\n").is_empty());
    }
}
