//! Transport commands read from the terminal

use std::path::PathBuf;
use std::str::FromStr;
use vinavoice_common::Error as CommonError;

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    Play,
    Pause,
    /// Play/pause button
    Toggle,
    Restart,
    /// Mute/unmute
    Mute,
    Status,
    /// Decode and load another payload file
    Load(PathBuf),
    Quit,
}

impl TransportCommand {
    /// One-line help for the interactive prompt
    pub const HELP: &'static str =
        "commands: play | pause | toggle (p) | restart (r) | mute (m) | status (s) | load <path> | quit (q)";
}

impl FromStr for TransportCommand {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "play" => TransportCommand::Play,
            "pause" => TransportCommand::Pause,
            "toggle" | "p" => TransportCommand::Toggle,
            "restart" | "r" => TransportCommand::Restart,
            "mute" | "m" => TransportCommand::Mute,
            "status" | "s" => TransportCommand::Status,
            "quit" | "q" | "exit" => TransportCommand::Quit,
            "load" => {
                if rest.is_empty() {
                    return Err(CommonError::InvalidInput(
                        "load requires a payload path".to_string(),
                    ));
                }
                return Ok(TransportCommand::Load(PathBuf::from(rest)));
            }
            "" => return Err(CommonError::InvalidInput("empty command".to_string())),
            other => {
                return Err(CommonError::InvalidInput(format!(
                    "unknown command '{}'",
                    other
                )))
            }
        };

        if !rest.is_empty() {
            return Err(CommonError::InvalidInput(format!(
                "'{}' takes no arguments",
                word
            )));
        }
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transport_words() {
        assert_eq!("play".parse::<TransportCommand>().unwrap(), TransportCommand::Play);
        assert_eq!("pause".parse::<TransportCommand>().unwrap(), TransportCommand::Pause);
        assert_eq!("p".parse::<TransportCommand>().unwrap(), TransportCommand::Toggle);
        assert_eq!("r".parse::<TransportCommand>().unwrap(), TransportCommand::Restart);
        assert_eq!("m".parse::<TransportCommand>().unwrap(), TransportCommand::Mute);
        assert_eq!("s".parse::<TransportCommand>().unwrap(), TransportCommand::Status);
        assert_eq!("q".parse::<TransportCommand>().unwrap(), TransportCommand::Quit);
    }

    #[test]
    fn test_parse_is_case_insensitive_and_trimmed() {
        assert_eq!(
            "  RESTART \n".parse::<TransportCommand>().unwrap(),
            TransportCommand::Restart
        );
        assert_eq!("Toggle".parse::<TransportCommand>().unwrap(), TransportCommand::Toggle);
    }

    #[test]
    fn test_parse_load_keeps_path() {
        assert_eq!(
            "load /tmp/next clip.b64".parse::<TransportCommand>().unwrap(),
            TransportCommand::Load(PathBuf::from("/tmp/next clip.b64"))
        );
        assert!("load".parse::<TransportCommand>().is_err());
        assert!("load   ".parse::<TransportCommand>().is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_and_extra_args() {
        assert!(matches!(
            "rewind".parse::<TransportCommand>(),
            Err(CommonError::InvalidInput(_))
        ));
        assert!("".parse::<TransportCommand>().is_err());
        assert!("play now".parse::<TransportCommand>().is_err());
    }
}
