use serde::{Deserialize, Serialize};

use crate::host::HostEnvironment;

pub const ENV_MODE: &str = "TEMPLATE_MOUNT_ENV";
pub const ENV_PERFORMANCE: &str = "TEMPLATE_MOUNT_PERFORMANCE";

/// Build-level switches.
///
/// `production` turns off every development warning and source ranges in compiler
/// errors. `performance` enables compile marks when an instrumentation backend is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeConfig {
    pub production: bool,
    pub performance: bool,
}

impl RuntimeConfig {
    pub fn development() -> Self {
        Self::default()
    }

    pub fn production() -> Self {
        RuntimeConfig {
            production: true,
            performance: false,
        }
    }

    /// Reads `TEMPLATE_MOUNT_ENV` and `TEMPLATE_MOUNT_PERFORMANCE`.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var(ENV_MODE).ok().as_deref(),
            std::env::var(ENV_PERFORMANCE).ok().as_deref(),
        )
    }

    fn from_vars(mode: Option<&str>, performance: Option<&str>) -> Self {
        RuntimeConfig {
            production: mode.is_some_and(|v| v.trim().eq_ignore_ascii_case("production")),
            performance: performance
                .map(str::trim)
                .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Host quirks around newline encoding in serialized attribute values.
///
/// When a host serializes `\n` inside an attribute as `&#10;`, markup read back from it
/// has to be decoded before compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformQuirks {
    pub decode_newlines: bool,
    pub decode_newlines_for_href: bool,
}

impl PlatformQuirks {
    pub fn detect(host: &dyn HostEnvironment) -> Self {
        PlatformQuirks {
            decode_newlines: host.encodes_attribute_newlines(false),
            decode_newlines_for_href: host.encodes_attribute_newlines(true),
        }
    }
}
