//! Configuration module
//!
//! Configuration is loaded once at process start and is immutable afterwards. Several
//! named disks can coexist; each is described by a [`DiskConfig`].
//!
//! ```text
//! STORAGE_DEFAULT_DISK=local
//! STORAGE_DISKS=local,media
//! DISK_LOCAL_DRIVER=local
//! DISK_LOCAL_ROOT=storage/app
//! DISK_LOCAL_URL=http://localhost:3000/files
//! DISK_MEDIA_DRIVER=spaces
//! DISK_MEDIA_BUCKET=my-bucket
//! DISK_MEDIA_REGION=nyc3
//! ```

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::image_types::{Anchor, FitMode};
use crate::storage_types::{DriverKind, Visibility};

// Common constants
const DEFAULT_DISK: &str = "local";
const DEFAULT_LOCAL_ROOT: &str = "storage/app";
const DEFAULT_LOCAL_URL: &str = "/storage";
const THUMBNAIL_MAX_DIMENSION: u32 = 2000;
const THUMBNAIL_QUALITY: u8 = 80;
const CACHE_PATH: &str = "storage/cache/thumbnails";
const CACHE_TTL_SECONDS: u64 = 86_400;
const SECURITY_MAX_SIZE_BYTES: usize = 100 * 1024 * 1024;
const CLAMAV_PORT: u16 = 3310;
const CLAMAV_TIMEOUT_SECS: u64 = 30;

/// One named storage disk
#[derive(Clone, Debug, PartialEq)]
pub struct DiskConfig {
    pub driver: DriverKind,
    /// Root directory (local driver)
    pub root: Option<PathBuf>,
    /// Base URL objects are served from (local driver), or a URL template override
    pub url: Option<String>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, Spaces, ...)
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// CDN hostname preferred over the direct endpoint for public URLs
    pub cdn_url: Option<String>,
    pub visibility: Visibility,
}

impl DiskConfig {
    pub fn local(root: impl Into<PathBuf>, url: impl Into<String>) -> Self {
        Self {
            driver: DriverKind::Local,
            root: Some(root.into()),
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn s3(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            driver: DriverKind::S3,
            bucket: Some(bucket.into()),
            region: Some(region.into()),
            ..Self::default()
        }
    }
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            driver: DriverKind::Local,
            root: None,
            url: None,
            bucket: None,
            region: None,
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            cdn_url: None,
            visibility: Visibility::Public,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StorageConfig {
    pub default_disk: String,
    pub disks: BTreeMap<String, DiskConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let mut disks = BTreeMap::new();
        disks.insert(
            DEFAULT_DISK.to_string(),
            DiskConfig::local(DEFAULT_LOCAL_ROOT, DEFAULT_LOCAL_URL),
        );
        Self {
            default_disk: DEFAULT_DISK.to_string(),
            disks,
        }
    }
}

/// A width/height pair, parsed from "WxH"
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ThumbnailSize {
    pub width: u32,
    pub height: u32,
}

impl ThumbnailSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl FromStr for ThumbnailSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| anyhow::anyhow!("Invalid size '{}'. Expected: WxH", s))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|_| anyhow::anyhow!("Invalid width: {}", w))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|_| anyhow::anyhow!("Invalid height: {}", h))?;
        Ok(Self { width, height })
    }
}

/// On-demand thumbnail settings
#[derive(Clone, Debug, PartialEq)]
pub struct ThumbnailConfig {
    pub allowed_sizes: Vec<ThumbnailSize>,
    pub max_width: u32,
    pub max_height: u32,
    pub quality: u8,
    pub fit: FitMode,
    pub position: Anchor,
    /// Only `allowed_sizes` may be requested
    pub strict_sizes: bool,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            allowed_sizes: Vec::new(),
            max_width: THUMBNAIL_MAX_DIMENSION,
            max_height: THUMBNAIL_MAX_DIMENSION,
            quality: THUMBNAIL_QUALITY,
            fit: FitMode::Cover,
            position: Anchor::Center,
            strict_sizes: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CacheConfig {
    pub path: PathBuf,
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(CACHE_PATH),
            ttl_seconds: CACHE_TTL_SECONDS,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClamAvConfig {
    pub host: String,
    pub port: u16,
    pub timeout_secs: u64,
}

impl Default for ClamAvConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: CLAMAV_PORT,
            timeout_secs: CLAMAV_TIMEOUT_SECS,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SecurityConfig {
    pub scan_enabled: bool,
    /// Absolute ceiling, independent of per-call validation rules
    pub max_size_bytes: usize,
    /// External scanner; `None` disables it
    pub clamav: Option<ClamAvConfig>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            scan_enabled: true,
            max_size_bytes: SECURITY_MAX_SIZE_BYTES,
            clamav: None,
        }
    }
}

/// Application configuration
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Config {
    pub storage: StorageConfig,
    pub thumbnails: ThumbnailConfig,
    pub cache: CacheConfig,
    pub security: SecurityConfig,
}

impl Config {
    /// Load configuration from the process environment (and `.env`, if present)
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let default_disk = var("STORAGE_DEFAULT_DISK").unwrap_or_else(|| DEFAULT_DISK.to_string());
        let disk_names: Vec<String> = var("STORAGE_DISKS")
            .unwrap_or_else(|| default_disk.clone())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let mut disks = BTreeMap::new();
        for name in disk_names {
            let disk = parse_disk(&name, &var)?;
            disks.insert(name, disk);
        }

        let allowed_sizes = match var("THUMBNAIL_ALLOWED_SIZES") {
            Some(raw) => raw
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(ThumbnailSize::from_str)
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let thumbnails = ThumbnailConfig {
            allowed_sizes,
            max_width: parse_or(&var, "THUMBNAIL_MAX_WIDTH", THUMBNAIL_MAX_DIMENSION)?,
            max_height: parse_or(&var, "THUMBNAIL_MAX_HEIGHT", THUMBNAIL_MAX_DIMENSION)?,
            quality: parse_or(&var, "THUMBNAIL_QUALITY", THUMBNAIL_QUALITY)?,
            fit: parse_or(&var, "THUMBNAIL_FIT", FitMode::Cover)?,
            position: parse_or(&var, "THUMBNAIL_POSITION", Anchor::Center)?,
            strict_sizes: parse_bool(&var, "THUMBNAIL_STRICT_SIZES", false),
        };

        let cache = CacheConfig {
            path: var("THUMBNAIL_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(CACHE_PATH)),
            ttl_seconds: parse_or(&var, "THUMBNAIL_CACHE_TTL_SECONDS", CACHE_TTL_SECONDS)?,
        };

        let clamav = if parse_bool(&var, "CLAMAV_ENABLED", false) {
            Some(ClamAvConfig {
                host: var("CLAMAV_HOST").unwrap_or_else(|| "localhost".to_string()),
                port: parse_or(&var, "CLAMAV_PORT", CLAMAV_PORT)?,
                timeout_secs: parse_or(&var, "CLAMAV_TIMEOUT_SECS", CLAMAV_TIMEOUT_SECS)?,
            })
        } else {
            None
        };

        let security = SecurityConfig {
            scan_enabled: parse_bool(&var, "SECURITY_SCAN_ENABLED", true),
            max_size_bytes: parse_or(&var, "SECURITY_MAX_SIZE_BYTES", SECURITY_MAX_SIZE_BYTES)?,
            clamav,
        };

        Ok(Config {
            storage: StorageConfig {
                default_disk: default_disk.to_lowercase(),
                disks,
            },
            thumbnails,
            cache,
            security,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.storage.disks.contains_key(&self.storage.default_disk) {
            return Err(anyhow::anyhow!(
                "Default disk '{}' is not declared in STORAGE_DISKS",
                self.storage.default_disk
            ));
        }

        for (name, disk) in &self.storage.disks {
            match disk.driver {
                DriverKind::Local if disk.root.is_none() => {
                    return Err(anyhow::anyhow!("Disk '{}' requires a root directory", name));
                }
                DriverKind::S3 | DriverKind::Spaces if disk.bucket.is_none() => {
                    return Err(anyhow::anyhow!("Disk '{}' requires a bucket", name));
                }
                DriverKind::Spaces if disk.region.is_none() && disk.endpoint.is_none() => {
                    return Err(anyhow::anyhow!(
                        "Disk '{}' requires a region or an endpoint",
                        name
                    ));
                }
                _ => {}
            }
        }

        if self.cache.ttl_seconds == 0 {
            return Err(anyhow::anyhow!("THUMBNAIL_CACHE_TTL_SECONDS must be greater than 0"));
        }

        if self.thumbnails.max_width == 0 || self.thumbnails.max_height == 0 {
            return Err(anyhow::anyhow!("Thumbnail maxima must be greater than 0"));
        }

        if self.thumbnails.quality == 0 || self.thumbnails.quality > 100 {
            return Err(anyhow::anyhow!("THUMBNAIL_QUALITY must be between 1 and 100"));
        }

        Ok(())
    }

    /// Configuration of the named disk, or of the default disk when `name` is `None`
    pub fn disk(&self, name: Option<&str>) -> Option<&DiskConfig> {
        let name = name.unwrap_or(&self.storage.default_disk);
        self.storage.disks.get(name)
    }
}

fn parse_disk<V>(name: &str, var: &V) -> Result<DiskConfig, anyhow::Error>
where
    V: Fn(&str) -> Option<String>,
{
    let prefix = format!("DISK_{}_", name.to_uppercase().replace('-', "_"));
    let key = |suffix: &str| var(&format!("{}{}", prefix, suffix));

    let driver = match key("DRIVER") {
        Some(raw) => raw.parse::<DriverKind>()?,
        None if name == DEFAULT_DISK => DriverKind::Local,
        None => {
            return Err(anyhow::anyhow!(
                "{}DRIVER must be set for disk '{}'",
                prefix,
                name
            ))
        }
    };

    let visibility = match key("VISIBILITY") {
        Some(raw) => raw.parse::<Visibility>()?,
        None => Visibility::Public,
    };

    let root = key("ROOT").map(PathBuf::from).or_else(|| {
        (driver == DriverKind::Local).then(|| PathBuf::from(DEFAULT_LOCAL_ROOT))
    });

    Ok(DiskConfig {
        driver,
        root,
        url: key("URL"),
        bucket: key("BUCKET"),
        region: key("REGION"),
        endpoint: key("ENDPOINT"),
        access_key_id: key("ACCESS_KEY_ID"),
        secret_access_key: key("SECRET_ACCESS_KEY"),
        cdn_url: key("CDN_URL"),
        visibility,
    })
}

fn parse_or<V, T>(var: &V, key: &str, default: T) -> Result<T, anyhow::Error>
where
    V: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}

fn parse_bool<V>(var: &V, key: &str, default: bool) -> bool
where
    V: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
