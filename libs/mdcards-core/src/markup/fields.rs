//! Splitting a card body into fields.

/// Fields of a card body, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitFields {
    pub fields: Vec<String>,
    /// Set when any separator was exactly `:::`.
    pub reversed: bool,
}

impl SplitFields {
    pub fn has_separator(&self) -> bool {
        self.fields.len() > 1
    }
}

/// Split `body` on runs of two or more colons outside braces.
///
/// Colons nested inside `{...}` never separate, so cloze hints such as
/// `{a::b}` stay within their field. Each field is trimmed.
pub fn split_fields(body: &str) -> SplitFields {
    let mut fields = Vec::new();
    let mut reversed = false;
    let mut depth = 0usize;
    let mut field_start = 0;
    let bytes = body.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b':' if depth == 0 => {
                let run = bytes[i..].iter().take_while(|&&b| b == b':').count();
                if run >= 2 {
                    fields.push(body[field_start..i].trim().to_string());
                    reversed |= run == 3;
                    i += run;
                    field_start = i;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }
    fields.push(body[field_start..].trim().to_string());

    SplitFields { fields, reversed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn two_colons_split() {
        let split = split_fields("Front::Back");
        assert_eq!(split.fields, vec!["Front", "Back"]);
        assert!(!split.reversed);
    }

    #[test]
    fn three_colons_reverse() {
        let split = split_fields("Front:::Back");
        assert_eq!(split.fields, vec!["Front", "Back"]);
        assert!(split.reversed);
    }

    #[test]
    fn braces_shield_separators() {
        let split = split_fields("{a::b}::c");
        assert_eq!(split.fields, vec!["{a::b}", "c"]);
    }

    #[test]
    fn single_colon_is_text() {
        let split = split_fields("Time: 10:30");
        assert_eq!(split.fields, vec!["Time: 10:30"]);
        assert!(!split.has_separator());
    }

    #[test]
    fn long_runs_consumed_whole() {
        let split = split_fields("a::::b");
        assert_eq!(split.fields, vec!["a", "b"]);
        assert!(!split.reversed);
    }

    #[test]
    fn fields_are_trimmed_across_lines() {
        let split = split_fields("What is Rust?\n::\n  A language  ");
        assert_eq!(split.fields, vec!["What is Rust?", "A language"]);
    }

    #[test]
    fn more_than_two_fields() {
        let split = split_fields("a::b::c");
        assert_eq!(split.fields, vec!["a", "b", "c"]);
    }
}
