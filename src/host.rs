//! Database host specs and page id groups.
//!
//! A [`HostSpec`] is compared by its literal address and port. Two specs that
//! reach the same server through different spellings (an IP and a DNS alias,
//! say) are distinct values and therefore distinct connection cache keys.

use std::fmt;
use std::str::FromStr;

use mongodb::bson::oid::ObjectId;

use crate::error::{Error, Result};

/// Address and port of one database instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostSpec {
    pub address: String,
    pub port: u16,
}

impl HostSpec {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }

    /// Connection string for the database driver.
    pub fn uri(&self) -> String {
        format!("mongodb://{}:{}", self.address, self.port)
    }
}

impl fmt::Display for HostSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

impl FromStr for HostSpec {
    type Err = Error;

    /// Parse `address:port`. The port is split at the last colon.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (address, port) = s.rsplit_once(':').ok_or_else(|| {
            Error::config(format!("host '{}' must be in the form address:port", s))
        })?;
        if address.is_empty() {
            return Err(Error::config(format!("host '{}' has an empty address", s)));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| Error::config(format!("host '{}' has an invalid port '{}'", s, port)))?;
        Ok(Self::new(address, port))
    }
}

impl From<(&str, u16)> for HostSpec {
    fn from((address, port): (&str, u16)) -> Self {
        Self::new(address, port)
    }
}

/// Ordered page ids to copy from one source host.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageIdGroup(Vec<ObjectId>);

impl PageIdGroup {
    pub fn new(ids: Vec<ObjectId>) -> Self {
        Self(ids)
    }

    pub fn ids(&self) -> &[ObjectId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PageIdGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex: Vec<String> = self.0.iter().map(|id| id.to_hex()).collect();
        write!(f, "{}", hex.join(","))
    }
}

impl FromStr for PageIdGroup {
    type Err = Error;

    /// Parse a comma-joined list of 24-character hex ids.
    fn from_str(s: &str) -> Result<Self> {
        split_group(s)?
            .into_iter()
            .map(|id| {
                ObjectId::parse_str(&id).map_err(|_| {
                    Error::config(format!(
                        "page id '{}' is not a 24-character hex identifier",
                        id
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(PageIdGroup)
    }
}

/// Split a comma-joined group (`"dev, hotfix"`) into trimmed, non-empty
/// entries.
pub fn split_group(group: &str) -> Result<Vec<String>> {
    let entries: Vec<String> = group.split(',').map(|e| e.trim().to_string()).collect();
    if entries.iter().any(String::is_empty) {
        return Err(Error::config(format!(
            "group '{}' contains an empty entry",
            group
        )));
    }
    Ok(entries)
}
