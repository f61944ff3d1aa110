use serde::Deserialize;
use std::fmt;

/// Recording state as reported by the server
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordingState {
    Unknown,
    Recording,
    Processing,
    Idle,
    Other(String),
}

impl RecordingState {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "unknown" => Self::Unknown,
            "recording" => Self::Recording,
            "processing" => Self::Processing,
            "idle" => Self::Idle,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Unknown => "unknown",
            Self::Recording => "recording",
            Self::Processing => "processing",
            Self::Idle => "idle",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last server-confirmed state (observable via watch channel)
///
/// Only the state listener holds the sender, so everything else sees
/// server truth with a small lag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerState {
    pub state: RecordingState,
    pub pipeline: Option<String>,
}

impl Default for ServerState {
    fn default() -> Self {
        Self {
            state: RecordingState::Unknown,
            pipeline: None,
        }
    }
}

impl ServerState {
    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }
}

/// Text frame pushed by the server on `/api/ws`
#[derive(Debug, Deserialize)]
pub struct StateMessage {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub pipeline: Option<String>,
}

impl From<StateMessage> for ServerState {
    fn from(msg: StateMessage) -> Self {
        Self {
            state: msg
                .state
                .as_deref()
                .map_or(RecordingState::Unknown, RecordingState::parse),
            pipeline: msg.pipeline,
        }
    }
}

/// What a keypress asks for
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Select(String),
    Stop,
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_message_defaults() {
        let msg: StateMessage = serde_json::from_str("{}").unwrap();
        let state = ServerState::from(msg);
        assert_eq!(state, ServerState::default());
        assert!(!state.is_recording());
    }

    #[test]
    fn test_state_message_with_null_pipeline() {
        let msg: StateMessage =
            serde_json::from_str(r#"{"state":"recording","pipeline":null}"#).unwrap();
        let state = ServerState::from(msg);
        assert_eq!(state.state, RecordingState::Recording);
        assert_eq!(state.pipeline, None);
        assert!(state.is_recording());
    }

    #[test]
    fn test_null_state_reads_as_unknown() {
        let msg: StateMessage = serde_json::from_str(r#"{"state":null}"#).unwrap();
        assert_eq!(ServerState::from(msg).state, RecordingState::Unknown);
    }

    #[test]
    fn test_unrecognised_state_is_kept_verbatim() {
        let state = RecordingState::parse("warming-up");
        assert_eq!(state, RecordingState::Other("warming-up".to_string()));
        assert_eq!(state.to_string(), "warming-up");
    }

    #[test]
    fn test_non_object_frame_is_rejected() {
        assert!(serde_json::from_str::<StateMessage>("[1, 2]").is_err());
        assert!(serde_json::from_str::<StateMessage>("not json").is_err());
    }
}
