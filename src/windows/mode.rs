//! Detection granularity.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::constants::windows::{DAY_SUFFIX, HOUR_SUFFIX};

/// Temporal granularity of a detection product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    /// Hourly presence flags.
    Hour,
    /// Daily presence flags.
    Day,
    /// Individual events with their own start and end.
    #[default]
    Event,
}

impl Mode {
    /// Infer the mode from a product-group name suffix (`_1h`, `_1d`).
    pub fn from_group_name(name: &str) -> Self {
        let lower = name.trim().to_ascii_lowercase();
        if lower.ends_with(HOUR_SUFFIX) {
            Self::Hour
        } else if lower.ends_with(DAY_SUFFIX) {
            Self::Day
        } else {
            Self::Event
        }
    }

    /// Plural label used in summaries.
    pub fn plural_label(self) -> &'static str {
        match self {
            Self::Hour => "Hours",
            Self::Day => "Days",
            Self::Event => "Events",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hour => write!(f, "HOUR"),
            Self::Day => write!(f, "DAY"),
            Self::Event => write!(f, "EVENT"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hour" | "hourly" | "1h" => Ok(Self::Hour),
            "day" | "daily" | "1d" => Ok(Self::Day),
            "event" | "events" => Ok(Self::Event),
            other => Err(format!("unknown detection mode: {other}")),
        }
    }
}
