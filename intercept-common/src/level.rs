//! Interception levels and transaction directions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-direction interception policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterceptionLevel {
    /// Never hold traffic
    #[default]
    Disabled,
    /// Hold only traffic matching the direction's breakpoint set
    EnabledOnBreakpoints,
    /// Hold everything
    EnabledAll,
}

impl InterceptionLevel {
    pub const ALL: [InterceptionLevel; 3] = [
        InterceptionLevel::Disabled,
        InterceptionLevel::EnabledOnBreakpoints,
        InterceptionLevel::EnabledAll,
    ];

    /// Integer stored in workspace properties
    pub fn serialize_value(self) -> i64 {
        match self {
            InterceptionLevel::Disabled => 0,
            InterceptionLevel::EnabledOnBreakpoints => 1,
            InterceptionLevel::EnabledAll => 2,
        }
    }

    /// Decode a persisted value. Absent or unknown values yield `None`.
    pub fn from_value(value: Option<i64>) -> Option<Self> {
        match value? {
            0 => Some(InterceptionLevel::Disabled),
            1 => Some(InterceptionLevel::EnabledOnBreakpoints),
            2 => Some(InterceptionLevel::EnabledAll),
            _ => None,
        }
    }
}

impl fmt::Display for InterceptionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterceptionLevel::Disabled => write!(f, "disabled"),
            InterceptionLevel::EnabledOnBreakpoints => write!(f, "enabled_on_breakpoints"),
            InterceptionLevel::EnabledAll => write!(f, "enabled_all"),
        }
    }
}

impl std::str::FromStr for InterceptionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "disabled" | "0" => Ok(InterceptionLevel::Disabled),
            "enabled_on_breakpoints" | "breakpoints" | "1" => {
                Ok(InterceptionLevel::EnabledOnBreakpoints)
            }
            "enabled_all" | "all" | "2" => Ok(InterceptionLevel::EnabledAll),
            other => Err(format!("unknown interception level '{}'", other)),
        }
    }
}

/// Which policy a transaction is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Request,
    Response,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Request, Direction::Response];

    /// A transaction without a response is still in its request phase.
    pub fn of(has_response: bool) -> Self {
        if has_response {
            Direction::Response
        } else {
            Direction::Request
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Request => write!(f, "request"),
            Direction::Response => write!(f, "response"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_serialize_roundtrip() {
        for level in InterceptionLevel::ALL {
            assert_eq!(
                InterceptionLevel::from_value(Some(level.serialize_value())),
                Some(level)
            );
        }
    }

    #[test]
    fn test_level_unknown_values() {
        assert_eq!(InterceptionLevel::from_value(None), None);
        assert_eq!(InterceptionLevel::from_value(Some(7)), None);
        assert_eq!(InterceptionLevel::from_value(Some(-1)), None);
        assert_eq!(InterceptionLevel::default(), InterceptionLevel::Disabled);
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!("all".parse::<InterceptionLevel>(), Ok(InterceptionLevel::EnabledAll));
        assert_eq!(
            "Enabled_On_Breakpoints".parse::<InterceptionLevel>(),
            Ok(InterceptionLevel::EnabledOnBreakpoints)
        );
        assert!("sometimes".parse::<InterceptionLevel>().is_err());
    }

    #[test]
    fn test_direction_of() {
        assert_eq!(Direction::of(false), Direction::Request);
        assert_eq!(Direction::of(true), Direction::Response);
    }
}
