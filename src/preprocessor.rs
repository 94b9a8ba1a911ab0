//! Source normalization run before lexing.
//!
//! Strips `( ... )` comments (nesting is counted) and `\` comments that run
//! to the end of the line. Every removed character becomes a space and every
//! newline survives, so the rows, columns and offsets the lexer records still
//! point into the text the user wrote. Other control characters (`\r`, `\t`)
//! are turned into spaces as well.

pub fn preprocess(source: &str) -> String {
    let mut depth = 0usize;
    let mut line_comment = false;
    let mut result = String::with_capacity(source.len());

    for c in source.chars() {
        if c == '\n' {
            line_comment = false;
            result.push('\n');
            continue;
        }
        if c == '\\' && depth == 0 {
            line_comment = true;
        }
        if c == '(' && !line_comment {
            depth += 1;
        }

        let keep = depth == 0 && !line_comment;
        if keep && !c.is_control() {
            result.push(c);
        } else {
            result.push(' ');
        }

        if c == ')' && !line_comment {
            depth = depth.saturating_sub(1);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_nested_parenthetical_comments() {
        let text = preprocess("1 ( a ( b ) c ) 2");
        assert_eq!(text.split_whitespace().collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(text.len(), "1 ( a ( b ) c ) 2".len());
    }

    #[test]
    fn strips_line_comments_but_keeps_newlines() {
        let text = preprocess("1 \\ ignored ( not a comment\n2\r\n");
        assert_eq!(text.lines().count(), 2);
        assert_eq!(text.split_whitespace().collect::<Vec<_>>(), vec!["1", "2"]);
    }

    #[test]
    fn stray_closing_paren_is_kept() {
        assert_eq!(preprocess("1 ) 2").trim(), "1 ) 2");
    }
}
