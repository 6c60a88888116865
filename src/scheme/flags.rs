use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const YES: &str = "Y";
pub const NO: &str = "N";

/// Tri-state capability flag as reported by the scheme master
///
/// Anything other than "Y" or "N" is kept as `Unknown`, which answers
/// `false` to both [`Flag::is_yes`] and [`Flag::is_no`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Flag {
    Yes,
    No,
    #[default]
    Unknown,
}

impl Flag {
    pub fn is_yes(self) -> bool {
        self == Flag::Yes
    }

    pub fn is_no(self) -> bool {
        self == Flag::No
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Flag::Yes => YES,
            Flag::No => NO,
            Flag::Unknown => "",
        }
    }

    /// Storage code, `None` for `Unknown`
    pub fn code(self) -> Option<&'static str> {
        match self {
            Flag::Unknown => None,
            known => Some(known.as_str()),
        }
    }
}

impl From<&str> for Flag {
    fn from(value: &str) -> Self {
        match value {
            YES => Flag::Yes,
            NO => Flag::No,
            _ => Flag::Unknown,
        }
    }
}

impl From<Option<&str>> for Flag {
    fn from(value: Option<&str>) -> Self {
        value.map(Flag::from).unwrap_or_default()
    }
}

impl From<bool> for Flag {
    fn from(value: bool) -> Self {
        if value {
            Flag::Yes
        } else {
            Flag::No
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flag::Unknown => write!(f, "-"),
            known => write!(f, "{}", known.as_str()),
        }
    }
}

impl Serialize for Flag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.code() {
            Some(code) => serializer.serialize_str(code),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Flag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Flag::from(raw.as_deref()))
    }
}

/// Close-ended / open-ended classification of a scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Closure {
    #[serde(rename = "Close Ended")]
    CloseEnded,
    #[serde(rename = "Open Ended")]
    OpenEnded,
    #[default]
    #[serde(rename = "")]
    Unclassified,
}

impl Closure {
    pub const CLOSE_ENDED: &'static str = "Close Ended";
    pub const OPEN_ENDED: &'static str = "Open Ended";

    /// Decode the scheme master's close flag
    pub fn from_close_flag(flag: Flag) -> Self {
        match flag {
            Flag::Yes => Closure::CloseEnded,
            Flag::No => Closure::OpenEnded,
            Flag::Unknown => Closure::Unclassified,
        }
    }

    pub fn is_close_ended(self) -> bool {
        self == Closure::CloseEnded
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Closure::CloseEnded => Self::CLOSE_ENDED,
            Closure::OpenEnded => Self::OPEN_ENDED,
            Closure::Unclassified => "",
        }
    }
}

impl From<&str> for Closure {
    fn from(value: &str) -> Self {
        match value {
            Self::CLOSE_ENDED => Closure::CloseEnded,
            Self::OPEN_ENDED => Closure::OpenEnded,
            _ => Closure::Unclassified,
        }
    }
}

impl fmt::Display for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_parsing() {
        assert_eq!(Flag::from("Y"), Flag::Yes);
        assert_eq!(Flag::from("N"), Flag::No);
        assert_eq!(Flag::from(" "), Flag::Unknown);
        assert_eq!(Flag::from("y"), Flag::Unknown);
        assert_eq!(Flag::from(None), Flag::Unknown);
    }

    #[test]
    fn test_unknown_is_neither_yes_nor_no() {
        assert!(!Flag::Unknown.is_yes());
        assert!(!Flag::Unknown.is_no());
        assert!(Flag::Yes.is_yes());
        assert!(Flag::No.is_no());
    }

    #[test]
    fn test_flag_serde() {
        assert_eq!(serde_json::to_string(&Flag::Yes).unwrap(), "\"Y\"");
        assert_eq!(serde_json::to_string(&Flag::Unknown).unwrap(), "null");
        let parsed: Vec<Flag> = serde_json::from_str(r#"["N", null, "X"]"#).unwrap();
        assert_eq!(parsed, vec![Flag::No, Flag::Unknown, Flag::Unknown]);
    }

    #[test]
    fn test_closure_decoding() {
        assert!(Closure::from_close_flag(Flag::Yes).is_close_ended());
        assert_eq!(Closure::from_close_flag(Flag::No), Closure::OpenEnded);
        assert_eq!(Closure::from("Close Ended"), Closure::CloseEnded);
        assert_eq!(Closure::from("close ended"), Closure::Unclassified);
        assert_eq!(Closure::CloseEnded.to_string(), "Close Ended");
    }
}
