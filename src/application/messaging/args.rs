//! Argument parsing strategies
//!
//! Each registered command picks one strategy for turning the raw text
//! after the command name into an argument list.

use crate::application::errors::ArgumentSyntaxError;

/// How a command's trailing text is split into arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgParser {
    /// Split on runs of whitespace. Empty input yields no arguments.
    Whitespace,
    /// Split on a literal separator, trimming each segment. Empty segments
    /// between consecutive separators are preserved.
    Separator(String),
    /// Shell-style tokenization with single/double quotes and backslash
    /// escapes. The only failing strategy: unbalanced quoting errors out.
    Shell,
}

impl ArgParser {
    pub fn separator(sep: impl Into<String>) -> Self {
        ArgParser::Separator(sep.into())
    }

    pub fn parse(&self, raw: &str) -> Result<Vec<String>, ArgumentSyntaxError> {
        match self {
            ArgParser::Whitespace => Ok(raw.split_whitespace().map(str::to_string).collect()),
            ArgParser::Separator(sep) => Ok(split_on_separator(raw, sep)),
            ArgParser::Shell => tokenize_shell(raw),
        }
    }
}

fn split_on_separator(raw: &str, sep: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split(sep).map(|seg| seg.trim().to_string()).collect()
}

/// POSIX-ish tokenizer: whitespace separates words; `'...'` is literal;
/// `"..."` honors backslash escapes; a bare backslash escapes the next
/// character.
fn tokenize_shell(raw: &str) -> Result<Vec<String>, ArgumentSyntaxError> {
    #[derive(PartialEq)]
    enum State {
        Normal,
        Single,
        Double,
    }

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut state = State::Normal;
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match state {
            State::Normal => match c {
                '\'' => {
                    state = State::Single;
                    in_token = true;
                }
                '"' => {
                    state = State::Double;
                    in_token = true;
                }
                '\\' => {
                    let escaped = chars.next().ok_or(ArgumentSyntaxError::DanglingEscape)?;
                    current.push(escaped);
                    in_token = true;
                }
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                c => {
                    current.push(c);
                    in_token = true;
                }
            },
            State::Single => match c {
                '\'' => state = State::Normal,
                c => current.push(c),
            },
            State::Double => match c {
                '"' => state = State::Normal,
                '\\' => {
                    let escaped = chars.next().ok_or(ArgumentSyntaxError::UnbalancedQuote)?;
                    // Inside double quotes only \" and \\ are special.
                    if escaped != '"' && escaped != '\\' {
                        current.push('\\');
                    }
                    current.push(escaped);
                }
                c => current.push(c),
            },
        }
    }

    if state != State::Normal {
        return Err(ArgumentSyntaxError::UnbalancedQuote);
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_splits_on_runs() {
        let args = ArgParser::Whitespace.parse("  one   two\tthree ").unwrap();
        assert_eq!(args, vec!["one", "two", "three"]);
    }

    #[test]
    fn whitespace_empty_input_is_empty() {
        assert!(ArgParser::Whitespace.parse("").unwrap().is_empty());
        assert!(ArgParser::Whitespace.parse("   ").unwrap().is_empty());
    }

    #[test]
    fn separator_trims_segments() {
        let args = ArgParser::separator(",").parse("a, b ,c").unwrap();
        assert_eq!(args, vec!["a", "b", "c"]);
    }

    #[test]
    fn separator_preserves_empty_segments() {
        let args = ArgParser::separator(",").parse("a,,b").unwrap();
        assert_eq!(args, vec!["a", "", "b"]);
    }

    #[test]
    fn separator_empty_input_is_empty() {
        assert!(ArgParser::separator(",").parse("  ").unwrap().is_empty());
    }

    #[test]
    fn shell_handles_quoting() {
        let args = ArgParser::Shell
            .parse(r#"room@conf.x "Err rocks!" 'single quoted' plain"#)
            .unwrap();
        assert_eq!(args, vec!["room@conf.x", "Err rocks!", "single quoted", "plain"]);
    }

    #[test]
    fn shell_backslash_escapes() {
        let args = ArgParser::Shell.parse(r#"a\ b "c \"d\"""#).unwrap();
        assert_eq!(args, vec!["a b", "c \"d\""]);
    }

    #[test]
    fn shell_unbalanced_quote_fails() {
        assert_eq!(
            ArgParser::Shell.parse(r#""never closed"#),
            Err(ArgumentSyntaxError::UnbalancedQuote)
        );
        assert_eq!(
            ArgParser::Shell.parse("'still open"),
            Err(ArgumentSyntaxError::UnbalancedQuote)
        );
    }

    #[test]
    fn shell_dangling_escape_fails() {
        assert_eq!(
            ArgParser::Shell.parse("oops\\"),
            Err(ArgumentSyntaxError::DanglingEscape)
        );
    }

    #[test]
    fn shell_empty_quotes_make_empty_arg() {
        let args = ArgParser::Shell.parse(r#"a "" b"#).unwrap();
        assert_eq!(args, vec!["a", "", "b"]);
    }

    #[test]
    fn shell_unicode_passes_through() {
        let args = ArgParser::Shell.parse("héllo wörld").unwrap();
        assert_eq!(args, vec!["héllo", "wörld"]);
    }
}
