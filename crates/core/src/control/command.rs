use std::path::{Component, Path};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProtocolError {
    #[error("empty control message")]
    Empty,
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),
    #[error("{command} takes {expected} fields, got {actual}")]
    WrongArity {
        command: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

/// A multipart control message received on the command channel.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlCommand {
    Start {
        video_name: String,
        fps: f64,
        width: u32,
        height: u32,
    },
    Stop,
}

impl ControlCommand {
    /// Parses `["start", name, fps, width, height]` or `["stop"]`.
    pub fn parse<S: AsRef<str>>(parts: &[S]) -> Result<Self, ProtocolError> {
        let Some(head) = parts.first() else {
            return Err(ProtocolError::Empty);
        };
        match head.as_ref() {
            "start" => {
                expect_arity("start", 5, parts.len())?;
                let video_name = parts[1].as_ref().trim();
                if !is_plain_file_name(video_name) {
                    return Err(invalid("video_name", video_name));
                }
                let fps = parse_field::<f64>("fps", parts[2].as_ref())?;
                if !fps.is_finite() || fps <= 0.0 {
                    return Err(invalid("fps", parts[2].as_ref()));
                }
                let width = parse_field::<u32>("width", parts[3].as_ref())?;
                let height = parse_field::<u32>("height", parts[4].as_ref())?;
                Ok(Self::Start {
                    video_name: video_name.to_string(),
                    fps,
                    width,
                    height,
                })
            }
            "stop" => {
                expect_arity("stop", 1, parts.len())?;
                Ok(Self::Stop)
            }
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }

    pub fn encode(&self) -> Vec<String> {
        match self {
            Self::Start {
                video_name,
                fps,
                width,
                height,
            } => vec![
                "start".into(),
                video_name.clone(),
                fps.to_string(),
                width.to_string(),
                height.to_string(),
            ],
            Self::Stop => vec!["stop".into()],
        }
    }
}

fn expect_arity(command: &'static str, expected: usize, actual: usize) -> Result<(), ProtocolError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ProtocolError::WrongArity {
            command,
            expected,
            actual,
        })
    }
}

/// A single normal component, so the name cannot leave the output directory.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn parse_field<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ProtocolError> {
    value.trim().parse().map_err(|_| invalid(field, value))
}

fn invalid(field: &'static str, value: &str) -> ProtocolError {
    ProtocolError::InvalidField {
        field,
        value: value.to_string(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AckKind {
    Start,
    Stop,
}

impl AckKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }
}

/// Reply published once a command has been handled: the command name and
/// the wall-clock time it was received, in nanoseconds since the epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Acknowledgement {
    pub kind: AckKind,
    pub timestamp_ns: u128,
}

impl Acknowledgement {
    pub fn new(kind: AckKind, timestamp_ns: u128) -> Self {
        Self { kind, timestamp_ns }
    }

    pub fn now(kind: AckKind) -> Self {
        Self::new(kind, unix_nanos())
    }

    pub fn encode(&self) -> [String; 2] {
        [self.kind.as_str().to_string(), self.timestamp_ns.to_string()]
    }

    pub fn parse<S: AsRef<str>>(parts: &[S]) -> Result<Self, ProtocolError> {
        let Some(head) = parts.first() else {
            return Err(ProtocolError::Empty);
        };
        let (kind, command) = match head.as_ref() {
            "start" => (AckKind::Start, "start"),
            "stop" => (AckKind::Stop, "stop"),
            other => return Err(ProtocolError::UnknownCommand(other.to_string())),
        };
        expect_arity(command, 2, parts.len())?;
        let timestamp_ns = parse_field("timestamp", parts[1].as_ref())?;
        Ok(Self::new(kind, timestamp_ns))
    }
}

/// Clamped to zero if the system clock reads before the epoch.
pub fn unix_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_start() {
        let cmd = ControlCommand::parse(&["start", "test.mp4", "60", "1280", "1392"]).unwrap();
        assert_eq!(
            cmd,
            ControlCommand::Start {
                video_name: "test.mp4".into(),
                fps: 60.0,
                width: 1280,
                height: 1392,
            }
        );
    }

    #[test]
    fn test_parse_fractional_fps() {
        let parts = vec!["start".to_string(), "a.mkv".into(), "29.97".into(), "640".into(), "480".into()];
        match ControlCommand::parse(&parts).unwrap() {
            ControlCommand::Start { fps, .. } => approx::assert_relative_eq!(fps, 29.97),
            other => panic!("expected start, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_stop() {
        assert_eq!(ControlCommand::parse(&["stop"]).unwrap(), ControlCommand::Stop);
    }

    #[test]
    fn test_encode_parses_back() {
        let cmd = ControlCommand::Start {
            video_name: "clip.mp4".into(),
            fps: 30.0,
            width: 64,
            height: 48,
        };
        assert_eq!(ControlCommand::parse(&cmd.encode()).unwrap(), cmd);
    }

    #[rstest]
    #[case(&[], ProtocolError::Empty)]
    #[case(&["pause"], ProtocolError::UnknownCommand("pause".into()))]
    #[case(&["stop", "now"], ProtocolError::WrongArity { command: "stop", expected: 1, actual: 2 })]
    #[case(&["start", "a.mp4", "60"], ProtocolError::WrongArity { command: "start", expected: 5, actual: 3 })]
    #[case(&["start", "a.mp4", "fast", "64", "48"], ProtocolError::InvalidField { field: "fps", value: "fast".into() })]
    #[case(&["start", "a.mp4", "0", "64", "48"], ProtocolError::InvalidField { field: "fps", value: "0".into() })]
    #[case(&["start", "a.mp4", "60", "-64", "48"], ProtocolError::InvalidField { field: "width", value: "-64".into() })]
    #[case(&["start", " ", "60", "64", "48"], ProtocolError::InvalidField { field: "video_name", value: "".into() })]
    #[case(&["start", "/abs.mp4", "60", "64", "48"], ProtocolError::InvalidField { field: "video_name", value: "/abs.mp4".into() })]
    #[case(&["start", "../x.mp4", "60", "64", "48"], ProtocolError::InvalidField { field: "video_name", value: "../x.mp4".into() })]
    #[case(&["start", "sub/x.mp4", "60", "64", "48"], ProtocolError::InvalidField { field: "video_name", value: "sub/x.mp4".into() })]
    #[case(&["start", "..", "60", "64", "48"], ProtocolError::InvalidField { field: "video_name", value: "..".into() })]
    fn test_parse_rejects(#[case] parts: &[&str], #[case] expected: ProtocolError) {
        assert_eq!(ControlCommand::parse(parts).unwrap_err(), expected);
    }

    #[test]
    fn test_acknowledgement_wire_format() {
        let ack = Acknowledgement::new(AckKind::Start, 1_700_000_000_123_456_789);
        assert_eq!(ack.encode(), ["start".to_string(), "1700000000123456789".to_string()]);
        assert_eq!(Acknowledgement::parse(&ack.encode()).unwrap(), ack);

        let stop = Acknowledgement::new(AckKind::Stop, 5);
        assert_eq!(stop.encode(), ["stop".to_string(), "5".to_string()]);
    }

    #[test]
    fn test_acknowledgement_now_uses_wall_clock() {
        let before = unix_nanos();
        let ack = Acknowledgement::now(AckKind::Stop);
        assert!(ack.timestamp_ns >= before);
        assert_eq!(ack.kind, AckKind::Stop);
    }
}
