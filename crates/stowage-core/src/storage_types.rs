use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage driver kinds
///
/// Defined in core because configuration selects a driver by this tag. `Spaces` is an
/// S3-compatible store with a regional endpoint and optional CDN hostname; `Custom`
/// disks are constructed by the embedding application and registered by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Local,
    S3,
    Spaces,
    Custom,
}

impl FromStr for DriverKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(DriverKind::Local),
            "s3" => Ok(DriverKind::S3),
            "spaces" => Ok(DriverKind::Spaces),
            "custom" => Ok(DriverKind::Custom),
            _ => Err(anyhow::anyhow!("Invalid storage driver: {}", s)),
        }
    }
}

impl Display for DriverKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DriverKind::Local => write!(f, "local"),
            DriverKind::S3 => write!(f, "s3"),
            DriverKind::Spaces => write!(f, "spaces"),
            DriverKind::Custom => write!(f, "custom"),
        }
    }
}

/// Access intent for stored objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    /// Unix permission bits for files written by the local driver
    pub fn file_mode(self) -> u32 {
        match self {
            Visibility::Public => 0o644,
            Visibility::Private => 0o600,
        }
    }

    /// Canned ACL for object stores
    pub fn acl(self) -> &'static str {
        match self {
            Visibility::Public => "public-read",
            Visibility::Private => "private",
        }
    }
}

impl FromStr for Visibility {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            _ => Err(anyhow::anyhow!("Invalid visibility: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_kind_parse_and_display() {
        assert_eq!("S3".parse::<DriverKind>().unwrap(), DriverKind::S3);
        assert_eq!("spaces".parse::<DriverKind>().unwrap(), DriverKind::Spaces);
        assert_eq!(DriverKind::Local.to_string(), "local");
        assert!("ftp".parse::<DriverKind>().is_err());
    }

    #[test]
    fn test_visibility_mappings() {
        assert_eq!(Visibility::Public.file_mode(), 0o644);
        assert_eq!(Visibility::Private.file_mode(), 0o600);
        assert_eq!(Visibility::Public.acl(), "public-read");
        assert_eq!(Visibility::Private.acl(), "private");
    }
}
