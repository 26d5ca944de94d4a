//! Storewarden configuration.
//!
//! [`LicensingConfig`] holds the raw process-wide settings. It is turned
//! into a [`BackendConfig`] exactly once at startup: key material is
//! decoded, root certificates are read, and every backend is either fully
//! configured or disabled.

use crate::crypto::verify::{decode_public_key, PlayStoreKey};
use crate::LicensingError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Environment variable holding the base64 DER Play Console public key.
pub const ENV_PLAY_CONSOLE_PUB_KEY: &str = "PLAY_CONSOLE_PUB_KEY";
/// Environment variable holding the Steamworks publisher Web API key.
pub const ENV_STEAM_WEB_API_KEY: &str = "STEAMWORKS_PUBLISHER_WEB_API_KEY";
/// Environment variable holding the Steam app id.
pub const ENV_STEAM_APP_ID: &str = "STEAM_APP_ID";
/// Environment variable holding the App Store app id.
pub const ENV_APP_STORE_APP_ID: &str = "APP_STORE_APP_ID";
/// Environment variable holding the App Store bundle identifier.
pub const ENV_APP_STORE_BUNDLE_ID: &str = "APP_STORE_BUNDLE_ID";
/// Environment variable naming the directory of trusted root certificates.
pub const ENV_APP_STORE_ROOT_CERTS_DIR: &str = "APP_STORE_ROOT_CERTS_DIR";
/// Environment variable overriding the partner API timeout, in seconds.
pub const ENV_HTTP_TIMEOUT_SECS: &str = "LICENSING_HTTP_TIMEOUT_SECS";

/// Default timeout for partner API requests.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw licensing configuration.
///
/// Every backend is optional. A backend is enabled only when all of its
/// settings are present; a partial set is a configuration error.
#[derive(Clone)]
pub struct LicensingConfig {
    /// Base64 DER `SubjectPublicKeyInfo` of the Play Console licensing key.
    pub play_console_public_key: Option<String>,

    /// Steamworks publisher Web API key.
    pub steam_web_api_key: Option<String>,

    /// Steam application id.
    pub steam_app_id: Option<u32>,

    /// App Store application id.
    pub app_store_app_id: Option<u64>,

    /// App Store bundle identifier.
    pub app_store_bundle_id: Option<String>,

    /// Directory containing trusted DER root certificates.
    pub app_store_root_certs_dir: Option<PathBuf>,

    /// Timeout applied to each partner API request.
    pub http_timeout: Duration,
}

impl Default for LicensingConfig {
    fn default() -> Self {
        Self {
            play_console_public_key: None,
            steam_web_api_key: None,
            steam_app_id: None,
            app_store_app_id: None,
            app_store_bundle_id: None,
            app_store_root_certs_dir: None,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl fmt::Debug for LicensingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LicensingConfig")
            .field("play_console_public_key", &self.play_console_public_key.is_some())
            .field("steam_web_api_key", &self.steam_web_api_key.as_ref().map(|_| "<redacted>"))
            .field("steam_app_id", &self.steam_app_id)
            .field("app_store_app_id", &self.app_store_app_id)
            .field("app_store_bundle_id", &self.app_store_bundle_id)
            .field("app_store_root_certs_dir", &self.app_store_root_certs_dir)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl LicensingConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, LicensingError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through a variable lookup function.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LicensingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let http_timeout = match get(ENV_HTTP_TIMEOUT_SECS) {
            Some(raw) => Duration::from_secs(parse_number(ENV_HTTP_TIMEOUT_SECS, &raw)?),
            None => DEFAULT_HTTP_TIMEOUT,
        };

        let config = Self {
            play_console_public_key: get(ENV_PLAY_CONSOLE_PUB_KEY),
            steam_web_api_key: get(ENV_STEAM_WEB_API_KEY),
            steam_app_id: get(ENV_STEAM_APP_ID)
                .map(|raw| parse_number(ENV_STEAM_APP_ID, &raw))
                .transpose()?,
            app_store_app_id: get(ENV_APP_STORE_APP_ID)
                .map(|raw| parse_number(ENV_APP_STORE_APP_ID, &raw))
                .transpose()?,
            app_store_bundle_id: get(ENV_APP_STORE_BUNDLE_ID),
            app_store_root_certs_dir: get(ENV_APP_STORE_ROOT_CERTS_DIR).map(PathBuf::from),
            http_timeout,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for partial credential tuples.
    pub fn validate(&self) -> Result<(), LicensingError> {
        match (&self.steam_web_api_key, self.steam_app_id) {
            (Some(_), None) => {
                return Err(LicensingError::ConfigError(format!(
                    "{} is set but {} is missing",
                    ENV_STEAM_WEB_API_KEY, ENV_STEAM_APP_ID
                )))
            }
            (None, Some(_)) => {
                return Err(LicensingError::ConfigError(format!(
                    "{} is set but {} is missing",
                    ENV_STEAM_APP_ID, ENV_STEAM_WEB_API_KEY
                )))
            }
            _ => {}
        }

        let app_store_parts = [
            self.app_store_app_id.is_some(),
            self.app_store_bundle_id.is_some(),
            self.app_store_root_certs_dir.is_some(),
        ];
        let present = app_store_parts.iter().filter(|p| **p).count();
        if present != 0 && present != app_store_parts.len() {
            return Err(LicensingError::ConfigError(format!(
                "App Store validation needs all of {}, {} and {}",
                ENV_APP_STORE_APP_ID, ENV_APP_STORE_BUNDLE_ID, ENV_APP_STORE_ROOT_CERTS_DIR
            )));
        }

        if self.http_timeout.is_zero() {
            return Err(LicensingError::ConfigError(
                "http_timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, LicensingError> {
    raw.parse::<T>()
        .map_err(|_| LicensingError::ConfigError(format!("{} must be a number, got {:?}", name, raw)))
}

/// Play Store backend settings.
#[derive(Clone)]
pub struct PlayStoreConfig {
    /// Licensing response verification key.
    pub public_key: PlayStoreKey,
}

impl fmt::Debug for PlayStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayStoreConfig").finish_non_exhaustive()
    }
}

/// Steam backend settings.
#[derive(Clone)]
pub struct SteamConfig {
    /// Publisher Web API key.
    pub web_api_key: String,
    /// Application id tickets must be issued for.
    pub app_id: u32,
}

impl fmt::Debug for SteamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SteamConfig")
            .field("web_api_key", &"<redacted>")
            .field("app_id", &self.app_id)
            .finish()
    }
}

/// App Store backend settings.
#[derive(Debug, Clone)]
pub struct AppStoreConfig {
    /// App Store application id, bound in production only.
    pub app_id: u64,
    /// Expected bundle identifier.
    pub bundle_id: String,
    /// Trusted root certificates, DER-encoded.
    pub root_certificates: Vec<Vec<u8>>,
}

/// Decoded, immutable per-backend configuration.
///
/// `None` disables a backend: its validator accepts everything.
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    /// Google Play licensing.
    pub play_store: Option<PlayStoreConfig>,
    /// Steam partner API.
    pub steam: Option<SteamConfig>,
    /// App Store signed transactions.
    pub app_store: Option<AppStoreConfig>,
}

impl BackendConfig {
    /// Decode key material and load certificates.
    ///
    /// # Errors
    /// * `ConfigError` - partial tuple, unreadable or empty certificate directory
    /// * `InvalidPublicKey` - Play Console key is not a base64 DER RSA key
    pub fn from_config(config: &LicensingConfig) -> Result<Self, LicensingError> {
        config.validate()?;

        let play_store = match &config.play_console_public_key {
            Some(key) => {
                info!("Play Store key configured, Play Store licensing validation enabled");
                Some(PlayStoreConfig {
                    public_key: decode_public_key(key)?,
                })
            }
            None => {
                info!("Play Store key not configured, Play Store licensing validation disabled");
                None
            }
        };

        let steam = match (&config.steam_web_api_key, config.steam_app_id) {
            (Some(key), Some(app_id)) => {
                info!(app_id, "Steam partner key configured, Steam licensing validation enabled");
                Some(SteamConfig {
                    web_api_key: key.clone(),
                    app_id,
                })
            }
            _ => {
                info!("Steam partner key not configured, Steam licensing validation disabled");
                None
            }
        };

        let app_store = match (
            config.app_store_app_id,
            &config.app_store_bundle_id,
            &config.app_store_root_certs_dir,
        ) {
            (Some(app_id), Some(bundle_id), Some(dir)) => {
                let root_certificates = load_root_certificates(dir)?;
                info!(
                    app_id,
                    bundle_id = %bundle_id,
                    roots = root_certificates.len(),
                    "App Store identifiers configured, App Store licensing validation enabled"
                );
                Some(AppStoreConfig {
                    app_id,
                    bundle_id: bundle_id.clone(),
                    root_certificates,
                })
            }
            _ => {
                info!("App Store identifiers not configured, App Store licensing validation disabled");
                None
            }
        };

        Ok(Self {
            play_store,
            steam,
            app_store,
        })
    }
}

/// Load every `.cer`, `.der` and `.crt` file in `dir` as a DER certificate.
///
/// Files are read in name order so the trust bundle is deterministic.
pub fn load_root_certificates(dir: &Path) -> Result<Vec<Vec<u8>>, LicensingError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        LicensingError::ConfigError(format!(
            "Failed to read root certificate dir {}: {}",
            dir.display(),
            e
        ))
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "cer" | "der" | "crt"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let certificates = paths
        .iter()
        .map(|path| {
            fs::read(path).map_err(|e| {
                LicensingError::ConfigError(format!(
                    "Failed to read root certificate {}: {}",
                    path.display(),
                    e
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if certificates.is_empty() {
        return Err(LicensingError::ConfigError(format!(
            "No root certificates found in {}",
            dir.display()
        )));
    }

    Ok(certificates)
}
