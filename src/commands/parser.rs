use std::sync::LazyLock;

use regex::Regex;

/// The closed set of commands the agent reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Id,
    Stats,
    /// `/tagall [text]`
    TagAll { text: Option<String> },
    /// `/spam<N> [text]`; a count too large for `u64` saturates.
    Spam { count: Option<u64>, text: String },
    /// `/stoptag` and `/stopspam`, which stop whatever is running.
    Stop,
}

static SPAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/spam([0-9]*)$").expect("static regex compile"));

/// Parse a message into a [`Command`].
///
/// The command word is the first whitespace-delimited token and is matched
/// case-sensitively; everything after it is the argument, trimmed, with inner
/// line breaks kept. Returns `None` for anything that is not a command.
///
/// # Examples
///
/// ```
/// use rollcall::commands::parser::{Command, parse_command};
///
/// assert_eq!(
///     parse_command("/spam3 hello"),
///     Some(Command::Spam { count: Some(3), text: "hello".to_string() })
/// );
/// assert_eq!(parse_command("/stopspam"), Some(Command::Stop));
/// assert_eq!(parse_command("hello"), None);
/// ```
#[must_use]
pub fn parse_command(text: &str) -> Option<Command> {
    let text = text.trim_start();
    if !text.starts_with('/') {
        return None;
    }

    let (head, rest) = match text.find(char::is_whitespace) {
        Some(idx) => (&text[..idx], text[idx..].trim()),
        None => (text, ""),
    };
    let argument = (!rest.is_empty()).then(|| rest.to_string());

    match head {
        "/ping" => Some(Command::Ping),
        "/id" => Some(Command::Id),
        "/stats" => Some(Command::Stats),
        "/tagall" => Some(Command::TagAll { text: argument }),
        "/stoptag" | "/stopspam" => Some(Command::Stop),
        _ => {
            let caps = SPAM_RE.captures(head)?;
            let digits = &caps[1];
            let count = if digits.is_empty() {
                None
            } else {
                Some(digits.parse::<u64>().unwrap_or(u64::MAX))
            };
            Some(Command::Spam {
                count,
                text: argument.unwrap_or_default(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_count_saturates() {
        assert_eq!(
            parse_command("/spam99999999999999999999999 x"),
            Some(Command::Spam {
                count: Some(u64::MAX),
                text: "x".to_string()
            })
        );
    }
}
