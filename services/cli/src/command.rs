//! Prompt commands.

use realtime_voice_core::options::SessionMode;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Connect,
    Disconnect,
    Mode(SessionMode),
    /// Replaces the API key used for the next connect.
    Key(String),
    /// Cancels the response being spoken.
    Interrupt,
    Quit,
    Help,
    /// Typed text for the session.
    Text(String),
    Invalid(String),
    Empty,
}

pub const HELP: &str = "\
/connect                          open a session with the current settings
/disconnect                       close the session
/mode <conversation|transcription> switch mode (reconnects when connected)
/key <api-key>                    set the API key
/interrupt                        stop the current response
/quit                             exit
anything else                     send as a text message";

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Text(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        match (name, arg) {
            ("connect", "") => Command::Connect,
            ("disconnect", "") => Command::Disconnect,
            ("quit" | "exit", "") => Command::Quit,
            ("help", "") => Command::Help,
            ("interrupt" | "stop", "") => Command::Interrupt,
            ("mode", "") => Command::Invalid("usage: /mode <conversation|transcription>".into()),
            ("mode", m) => match m.parse() {
                Ok(mode) => Command::Mode(mode),
                Err(e) => Command::Invalid(format!("{e}")),
            },
            ("key", "") => Command::Invalid("usage: /key <api-key>".into()),
            ("key", k) => Command::Key(k.to_string()),
            _ => Command::Invalid(format!("unknown command '/{name}', try /help")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/connect"), Command::Connect);
        assert_eq!(Command::parse("  /disconnect "), Command::Disconnect);
        assert_eq!(Command::parse("/quit"), Command::Quit);
        assert_eq!(Command::parse("/exit"), Command::Quit);
        assert_eq!(
            Command::parse("/mode transcription"),
            Command::Mode(SessionMode::Transcription)
        );
        assert_eq!(
            Command::parse("/key sk-abc"),
            Command::Key("sk-abc".into())
        );
        assert_eq!(Command::parse("/interrupt"), Command::Interrupt);
        assert_eq!(Command::parse("/stop"), Command::Interrupt);
        assert_eq!(Command::parse(""), Command::Empty);
    }

    #[test]
    fn test_plain_lines_are_text() {
        assert_eq!(
            Command::parse(" 明日の天気は? "),
            Command::Text("明日の天気は?".into())
        );
    }

    #[test]
    fn test_invalid_commands() {
        assert!(matches!(Command::parse("/mode karaoke"), Command::Invalid(_)));
        assert!(matches!(Command::parse("/mode"), Command::Invalid(_)));
        assert!(matches!(Command::parse("/key"), Command::Invalid(_)));
        assert!(matches!(Command::parse("/connect now"), Command::Invalid(_)));
        assert!(matches!(Command::parse("/interrupt all"), Command::Invalid(_)));
        assert!(matches!(Command::parse("/dance"), Command::Invalid(_)));
    }
}
