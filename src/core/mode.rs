//! Host build mode.

use std::fmt;
use std::str::FromStr;

/// Build mode reported by the host tool.
///
/// Selects the built-in option defaults: development builds turn on the
/// compiler's debugger, production builds turn on its optimizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BuildMode {
    Development,
    Production,
    /// Host did not specify a mode; neither `debug` nor `optimize` is set.
    #[default]
    None,
}

impl BuildMode {
    #[inline]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    #[inline]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::None => "none",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "none" => Ok(Self::None),
            other => Err(format!("unknown build mode `{other}`")),
        }
    }
}
