//! Scan direction over the `X-Forwarded-For` chain.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which end of the forwarding chain is preferred.
///
/// `Right` is the default and also what any unrecognized value becomes.
/// Existing deployments rely on that fallback, so [`RealIpMode::parse`]
/// never fails; use [`RealIpMode::try_parse`] to detect a bad value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RealIpMode {
    /// Scan left to right. Only sound when every hop in the chain is trusted.
    Left,
    /// Scan right to left, starting at the hop nearest to the server.
    #[default]
    Right,
}

/// A mode string that is neither `left` nor `right`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized real ip mode {0:?}, expected \"left\" or \"right\"")]
pub struct UnknownModeError(pub String);

impl RealIpMode {
    /// Parse a mode, falling back to [`RealIpMode::Right`] for anything unrecognized.
    pub fn parse(value: &str) -> Self {
        Self::try_parse(value).unwrap_or_default()
    }

    /// Parse a mode case-insensitively, ignoring surrounding whitespace.
    pub fn try_parse(value: &str) -> Result<Self, UnknownModeError> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("left") {
            Ok(Self::Left)
        } else if value.eq_ignore_ascii_case("right") {
            Ok(Self::Right)
        } else {
            Err(UnknownModeError(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl FromStr for RealIpMode {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for RealIpMode {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<RealIpMode> for String {
    fn from(mode: RealIpMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for RealIpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
