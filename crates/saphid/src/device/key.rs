//! Key vocabulary understood by the `input/key` endpoint, and the table mapping
//! abstract remote-control buttons onto it.

use serde::Deserialize;
use serde::Serialize;

/// A key name as sent in `{"key": <name>}`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::AsRefStr,
    strum::EnumString,
)]
pub enum Key {
    Home,
    WatchTV,
    Source,
    CursorUp,
    CursorDown,
    CursorLeft,
    CursorRight,
    Digit0,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
    Digit9,
    Confirm,
    Standby,
    Rewind,
    FastForward,
    Next,
    Previous,
    Back,
    Exit,
    PlayPause,
    Options,
    VolumeUp,
    VolumeDown,
}

impl Key {
    /// The `DigitN` key for a single decimal digit.
    pub fn digit(digit: u32) -> Option<Key> {
        let key = match digit {
            0 => Key::Digit0,
            1 => Key::Digit1,
            2 => Key::Digit2,
            3 => Key::Digit3,
            4 => Key::Digit4,
            5 => Key::Digit5,
            6 => Key::Digit6,
            7 => Key::Digit7,
            8 => Key::Digit8,
            9 => Key::Digit9,
            _ => return None,
        };
        Some(key)
    }

    /// Request body for `input/key`.
    pub fn body(self) -> serde_json::Value {
        serde_json::json!({ "key": self.as_ref() })
    }
}

/// Buttons of the accessory layer's remote control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteKey {
    Rewind,
    FastForward,
    NextTrack,
    PreviousTrack,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Select,
    Back,
    Exit,
    PlayPause,
    Information,
    #[serde(other)]
    Unknown,
}

impl From<RemoteKey> for Key {
    fn from(remote: RemoteKey) -> Self {
        match remote {
            RemoteKey::Rewind => Key::Rewind,
            RemoteKey::FastForward => Key::FastForward,
            RemoteKey::NextTrack => Key::Next,
            RemoteKey::PreviousTrack => Key::Previous,
            RemoteKey::ArrowUp => Key::CursorUp,
            RemoteKey::ArrowDown => Key::CursorDown,
            RemoteKey::ArrowLeft => Key::CursorLeft,
            RemoteKey::ArrowRight => Key::CursorRight,
            RemoteKey::Select => Key::Confirm,
            RemoteKey::Back => Key::Back,
            RemoteKey::Exit => Key::Exit,
            RemoteKey::PlayPause => Key::PlayPause,
            RemoteKey::Information => Key::Options,
            RemoteKey::Unknown => Key::Home,
        }
    }
}

/// Volume selector of the accessory layer's speaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeDirection {
    Increment,
    Decrement,
}

impl From<VolumeDirection> for Key {
    fn from(direction: VolumeDirection) -> Self {
        match direction {
            VolumeDirection::Increment => Key::VolumeUp,
            VolumeDirection::Decrement => Key::VolumeDown,
        }
    }
}
