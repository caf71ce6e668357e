use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// One of the encoder's stream identities.
///
/// `Sub` and `MainSub` only mean something while the device reports
/// multi-stream mode.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum StreamId {
    #[serde(rename = "main")]
    #[strum(serialize = "main")]
    Main,
    #[serde(rename = "sub")]
    #[strum(serialize = "sub")]
    Sub,
    #[serde(rename = "main+sub")]
    #[strum(serialize = "main+sub")]
    MainSub,
}

impl StreamId {
    /// Wire value (`main`, `sub`, `main+sub`).
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Main => "Main stream",
            Self::Sub => "Sub stream",
            Self::MainSub => "Main stream + Sub stream",
        }
    }

    /// Streams whose service lists the device exposes.
    pub const SERVICE_STREAMS: [Self; 2] = [Self::Main, Self::Sub];
}

/// Per-stream recording state. `None` until the first successful poll;
/// never reverts to `None` afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamState {
    pub is_recording: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn wire_names_round_trip_through_strum() {
        for stream in StreamId::iter() {
            let parsed: StreamId = stream.as_str().parse().unwrap();
            assert_eq!(parsed, stream);
        }
        assert_eq!(StreamId::MainSub.to_string(), "main+sub");
        assert!("both".parse::<StreamId>().is_err());
    }
}
