// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Compiler configuration.
//!
//! The address families the cluster runs are handed to every [`crate::GressRule`] explicitly, so
//! that rules compiled for different clusters (or by concurrent tests) never share mutable state.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::ipblock::IpFamily;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No address family enabled: at least one of IPv4 or IPv6 is required")]
    NoAddressFamily,
    #[error("Failed to read configuration file {0}: {1}")]
    Io(String, #[source] std::io::Error),
    #[error("Failed to deserialize configuration: {0}")]
    Deserialize(String),
    #[error("Unsupported configuration file: {0}")]
    UnsupportedFile(String),
}

/// The address families enabled in the cluster. At least one family is always enabled: the only
/// ways to build a value are the constructors below and deserialization, which all check it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "FamilyFlags")]
pub struct AddressFamilies {
    ipv4: bool,
    ipv6: bool,
}

// Wire form of [`AddressFamilies`], before validation
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct FamilyFlags {
    #[serde(default)]
    ipv4: bool,
    #[serde(default)]
    ipv6: bool,
}

impl TryFrom<FamilyFlags> for AddressFamilies {
    type Error = ConfigError;

    fn try_from(flags: FamilyFlags) -> Result<Self, Self::Error> {
        AddressFamilies::new(flags.ipv4, flags.ipv6)
    }
}

impl Default for AddressFamilies {
    fn default() -> Self {
        Self::ipv4_only()
    }
}

impl AddressFamilies {
    /// Build the set of enabled families.
    ///
    /// # Errors
    /// Returns [`ConfigError::NoAddressFamily`] if neither family is enabled.
    pub fn new(ipv4: bool, ipv6: bool) -> Result<Self, ConfigError> {
        if !ipv4 && !ipv6 {
            return Err(ConfigError::NoAddressFamily);
        }
        Ok(Self { ipv4, ipv6 })
    }

    #[must_use]
    pub const fn ipv4_only() -> Self {
        Self {
            ipv4: true,
            ipv6: false,
        }
    }

    #[must_use]
    pub const fn ipv6_only() -> Self {
        Self {
            ipv4: false,
            ipv6: true,
        }
    }

    #[must_use]
    pub const fn dual_stack() -> Self {
        Self {
            ipv4: true,
            ipv6: true,
        }
    }

    #[must_use]
    pub fn ipv4(self) -> bool {
        self.ipv4
    }

    #[must_use]
    pub fn ipv6(self) -> bool {
        self.ipv6
    }

    #[must_use]
    pub fn is_enabled(self, family: IpFamily) -> bool {
        match family {
            IpFamily::V4 => self.ipv4,
            IpFamily::V6 => self.ipv6,
        }
    }

    /// The enabled families, IPv4 first. Never empty.
    pub fn enabled(self) -> impl Iterator<Item = IpFamily> {
        [IpFamily::V4, IpFamily::V6]
            .into_iter()
            .filter(move |family| self.is_enabled(*family))
    }
}

/// Configuration shared by the rules of one cluster.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawCompilerConfig")]
pub struct CompilerConfig {
    pub families: AddressFamilies,
}

// Wire form of [`CompilerConfig`], before validation
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawCompilerConfig {
    #[serde(default)]
    families: Option<FamilyFlags>,
}

impl TryFrom<RawCompilerConfig> for CompilerConfig {
    type Error = ConfigError;

    fn try_from(raw: RawCompilerConfig) -> Result<Self, Self::Error> {
        let families = match raw.families {
            Some(flags) => AddressFamilies::try_from(flags)?,
            None => AddressFamilies::default(),
        };
        Ok(Self { families })
    }
}

impl CompilerConfig {
    #[must_use]
    pub fn new(families: AddressFamilies) -> Self {
        Self { families }
    }

    /// Read the file at `path` and deserialize a [`CompilerConfig`] from it. The file may contain
    /// YAML (`.yaml` or `.yml` extension) or JSON (`.json` extension).
    ///
    /// # Errors
    /// This function may fail if the file cannot be read, if its extension is not supported, if
    /// the contents cannot be deserialized or if the resulting configuration is invalid.
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let config = match Path::new(path).extension() {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::from_yaml(&read_file(path)?)?
            }
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json(&read_file(path)?)?,
            Some(ext) => {
                return Err(ConfigError::UnsupportedFile(format!(
                    "unsupported file extension {}",
                    ext.to_string_lossy()
                )));
            }
            None => {
                return Err(ConfigError::UnsupportedFile(format!(
                    "missing file extension ({path})"
                )));
            }
        };
        debug!("Loaded compiler configuration from {path}: {config:?}");
        Ok(config)
    }

    /// Deserialize a configuration from YAML text.
    ///
    /// # Errors
    /// Fails if the text cannot be deserialized or if the configuration is invalid.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let raw: RawCompilerConfig =
            serde_yaml_ng::from_str(yaml).map_err(|e| ConfigError::Deserialize(e.to_string()))?;
        Self::try_from(raw)
    }

    /// Deserialize a configuration from JSON text.
    ///
    /// # Errors
    /// Fails if the text cannot be deserialized or if the configuration is invalid.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawCompilerConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Deserialize(e.to_string()))?;
        Self::try_from(raw)
    }
}

fn read_file(path: &str) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_string(), e))
}
