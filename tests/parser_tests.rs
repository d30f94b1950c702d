use rollcall::commands::{Command, parse_command};

#[test]
fn parses_diagnostic_commands() {
    assert_eq!(parse_command("/ping"), Some(Command::Ping));
    assert_eq!(parse_command("/id"), Some(Command::Id));
    assert_eq!(parse_command("/stats"), Some(Command::Stats));
}

#[test]
fn tagall_argument_is_optional() {
    assert_eq!(parse_command("/tagall"), Some(Command::TagAll { text: None }));
    assert_eq!(
        parse_command("/tagall   "),
        Some(Command::TagAll { text: None })
    );
    assert_eq!(
        parse_command("/tagall Meeting at 5"),
        Some(Command::TagAll {
            text: Some("Meeting at 5".to_string())
        })
    );
}

#[test]
fn multiline_arguments_are_kept() {
    assert_eq!(
        parse_command("/tagall line one\nline two"),
        Some(Command::TagAll {
            text: Some("line one\nline two".to_string())
        })
    );
}

#[test]
fn spam_count_is_glued_to_the_command() {
    assert_eq!(
        parse_command("/spam25 buy now"),
        Some(Command::Spam {
            count: Some(25),
            text: "buy now".to_string()
        })
    );
    assert_eq!(
        parse_command("/spam buy now"),
        Some(Command::Spam {
            count: None,
            text: "buy now".to_string()
        })
    );
    assert_eq!(
        parse_command("/spam7"),
        Some(Command::Spam {
            count: Some(7),
            text: String::new()
        })
    );
}

#[test]
fn both_stop_commands_stop() {
    assert_eq!(parse_command("/stoptag"), Some(Command::Stop));
    assert_eq!(parse_command("/stopspam"), Some(Command::Stop));
}

#[test]
fn non_commands_are_ignored() {
    assert_eq!(parse_command(""), None);
    assert_eq!(parse_command("hello /tagall"), None);
    assert_eq!(parse_command("/tagallx"), None);
    assert_eq!(parse_command("/spamx hi"), None);
    assert_eq!(parse_command("/PING"), None);
    assert_eq!(parse_command("/unknown"), None);
}

#[test]
fn non_ascii_digits_are_not_a_spam_count() {
    assert_eq!(parse_command("/spam٣ hi"), None);
    assert_eq!(parse_command("/spam３"), None);
    assert_eq!(
        parse_command("/spam3 hi"),
        Some(Command::Spam {
            count: Some(3),
            text: "hi".to_string(),
        })
    );
}
