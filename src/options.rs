//! Writer configuration
//!
//! Options can be built in code or loaded from a TOML document:
//!
//! ```toml
//! variant = "gnu"
//! uid = 0
//! gid = 0
//! mode = 0o644
//! ```
//!
//! Unset ownership and mode fields fall back to each source file's own
//! metadata.

use crate::error::{ArError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// How names longer than the 16-byte name field are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Names are truncated to the field width
    #[default]
    Common,
    /// Long names are embedded at the start of the member data (`#1/<len>`)
    Bsd,
    /// Long names go into a `//` name table member (`/<offset>`)
    Gnu,
}

impl FromStr for Variant {
    type Err = ArError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "" | "common" => Ok(Variant::Common),
            "bsd" => Ok(Variant::Bsd),
            "gnu" => Ok(Variant::Gnu),
            other => Err(ArError::Config(format!("unknown ar variant: {:?}", other))),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Variant::Common => "common",
            Variant::Bsd => "bsd",
            Variant::Gnu => "gnu",
        };
        f.write_str(name)
    }
}

/// Options for [`crate::ArchiveWriter`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WriteOptions {
    pub variant: Variant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    /// Override the owner recorded for every member
    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }

    /// Override the group recorded for every member
    pub fn with_gid(mut self, gid: u32) -> Self {
        self.gid = Some(gid);
        self
    }

    /// Override the mode recorded for every member
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Parse options from a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load options from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
