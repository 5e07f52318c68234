//! # Regions
//!
//! Coarse geographic partitions used to scope feeds and leaderboards.
//! `Global` is distinguished: every design is copied into it.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DomainError, Result};

pub const GLOBAL: &str = "Global";

/// Regions a design can be tagged with at upload time.
pub const TAGGABLE_REGIONS: [&str; 7] = [
    "Americas",
    "Europe",
    "East Asia",
    "South Asia",
    "Africa",
    "Australia",
    "Gulf",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Region(String);

impl Region {
    pub fn global() -> Self {
        Self(GLOBAL.to_string())
    }

    /// Parses a region name case-insensitively and returns its canonical spelling.
    pub fn parse(raw: &str) -> Result<Self> {
        let wanted = raw.trim();
        if wanted.eq_ignore_ascii_case(GLOBAL) {
            return Ok(Self::global());
        }
        TAGGABLE_REGIONS
            .iter()
            .find(|name| name.eq_ignore_ascii_case(wanted))
            .map(|name| Self(name.to_string()))
            .ok_or_else(|| DomainError::validation(format!("unknown region '{wanted}'")))
    }

    /// Resolves a stored preference; an unset or blank preference means `Global`.
    pub fn from_preference(pref: Option<&str>) -> Result<Self> {
        match pref.map(str::trim) {
            None | Some("") => Ok(Self::global()),
            Some(name) => Self::parse(name),
        }
    }

    pub fn is_global(&self) -> bool {
        self.0 == GLOBAL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::global()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Region {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Region {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Region::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Regions a design must be copied into: each tag once, in order, then `Global`.
pub fn copy_targets(tags: &[Region]) -> Vec<Region> {
    let mut targets: Vec<Region> = Vec::with_capacity(tags.len() + 1);
    for tag in tags {
        if !tag.is_global() && !targets.contains(tag) {
            targets.push(tag.clone());
        }
    }
    targets.push(Region::global());
    targets
}
