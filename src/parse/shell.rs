use std::sync::LazyLock;

use regex::Regex;

/// A double-quoted string (backslash escapes), a single-quoted string
/// (literal), or a bare word
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""((?:[^"\\]|\\.)*)"|'([^']*)'|(\S+)"#).expect("valid regex")
});

static ESCAPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\(.)").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unterminated quote in: {0}")]
pub struct UnterminatedQuote(pub String);

/// Split one shell line into arguments, honoring quotes.
/// Lines starting with `#` are comments and yield nothing.
pub fn split_line(line: &str) -> Result<Vec<String>, UnterminatedQuote> {
    let line = line.trim();
    if line.starts_with('#') {
        return Ok(Vec::new());
    }
    let mut args = Vec::new();
    for caps in TOKEN.captures_iter(line) {
        if let Some(quoted) = caps.get(1) {
            args.push(ESCAPE.replace_all(quoted.as_str(), "$1").into_owned());
        } else if let Some(literal) = caps.get(2) {
            args.push(literal.as_str().to_string());
        } else if let Some(bare) = caps.get(3) {
            let word = bare.as_str();
            if word.starts_with(['"', '\'']) {
                return Err(UnterminatedQuote(line.to_string()));
            }
            args.push(word.to_string());
        }
    }
    Ok(args)
}
