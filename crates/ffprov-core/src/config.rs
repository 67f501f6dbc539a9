use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::paths;

pub const DEFAULT_FFMPEG_URL: &str = "https://www.gyan.dev/ffmpeg/builds/ffmpeg-release-full.zip";

/// Where the encoder toolchain comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolchainSource {
    /// Download the release archive, verify it and stage it into `artifact.install_dir`.
    #[default]
    Archive,
    /// Install through the host package manager and discover the install on PATH.
    PackageManager,
}

/// Remote archive, optional offline cache and install target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub url: String,
    /// When set, the archive and its `.sha256` sidecar must already be here; the network is never used.
    pub cache_dir: Option<PathBuf>,
    /// Download directory for online mode (None = `<tmp>/ffprov`).
    pub work_dir: Option<PathBuf>,
    pub install_dir: PathBuf,
    /// Replace an existing install instead of keeping it.
    pub force: bool,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FFMPEG_URL.to_string(),
            cache_dir: None,
            work_dir: None,
            install_dir: PathBuf::from(if cfg!(windows) { r"C:\ffmpeg" } else { "/opt/ffmpeg" }),
            force: false,
        }
    }
}

impl ArtifactConfig {
    pub fn resolved_work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(paths::APP_PREFIX))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    pub source: ToolchainSource,
    /// Package name for package-manager mode.
    pub package: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            source: ToolchainSource::Archive,
            package: "ffmpeg".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuConfig {
    /// Minimum driver major version; older drivers only produce a warning.
    pub min_driver_major: u32,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self { min_driver_major: 570 }
    }
}

/// Dependent service: where it lives, how to stop it and what to patch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub enabled: bool,
    pub name: String,
    /// Explicit install directory; wins over the registry lookup and the default.
    pub install_dir: Option<PathBuf>,
    pub default_dir: PathBuf,
    /// Registry key (Windows) or key/value file (Unix) holding the install directory.
    pub registry_key: String,
    pub registry_value: String,
    /// Binary base names; the platform executable suffix is appended.
    pub binaries: Vec<String>,
    pub stop_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub config_file: String,
    pub config_section: String,
    pub codec_key: String,
    pub codec: String,
    pub bitrate_key: String,
    pub bitrate: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let (name, default_dir, registry_key) = if cfg!(windows) {
            (
                "iconik Storage Gateway",
                r"C:\Program Files\IconikStorageGateway",
                r"HKLM\SOFTWARE\Pixit\IconikStorageGateway",
            )
        } else {
            (
                "iconik-storage-gateway",
                "/opt/iconik-storage-gateway",
                "/etc/default/iconik-storage-gateway",
            )
        };
        Self {
            enabled: true,
            name: name.to_string(),
            install_dir: None,
            default_dir: PathBuf::from(default_dir),
            registry_key: registry_key.to_string(),
            registry_value: "InstallDir".to_string(),
            binaries: vec!["ffmpeg".to_string(), "ffprobe".to_string()],
            stop_timeout_secs: 30,
            poll_interval_ms: 1000,
            config_file: "config.ini".to_string(),
            config_section: "iconik".to_string(),
            codec_key: "proxy-videocodec".to_string(),
            codec: "h264_nvenc".to_string(),
            bitrate_key: "proxy-vbr".to_string(),
            bitrate: "8000k".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Hardware-encode smoke test parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmokeConfig {
    /// Sample clip (None = `sample.mp4` next to the running executable).
    pub sample: Option<PathBuf>,
    pub hwaccel: String,
    pub encoder: String,
    /// Text that must appear on the encoder's stderr for the test to pass.
    pub marker: String,
}

impl Default for SmokeConfig {
    fn default() -> Self {
        Self {
            sample: None,
            hwaccel: "cuda".to_string(),
            encoder: "h264_nvenc".to_string(),
            marker: "NVENC".to_string(),
        }
    }
}

impl SmokeConfig {
    pub fn resolved_sample(&self) -> Option<PathBuf> {
        self.sample.clone().or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(|dir| dir.join("sample.mp4")))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Append `<install>/bin` to the persistent machine PATH.
    pub register: bool,
    /// Managed profile script holding the PATH additions (Unix only).
    pub profile_script: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            register: true,
            profile_script: PathBuf::from("/etc/profile.d/ffprov.sh"),
        }
    }
}

/// Global configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Refuse to mutate the host without administrative rights.
    pub require_elevation: bool,
    pub artifact: ArtifactConfig,
    pub toolchain: ToolchainConfig,
    pub gpu: GpuConfig,
    pub service: ServiceConfig,
    pub smoke: SmokeConfig,
    pub path: PathConfig,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            require_elevation: true,
            artifact: ArtifactConfig::default(),
            toolchain: ToolchainConfig::default(),
            gpu: GpuConfig::default(),
            service: ServiceConfig::default(),
            smoke: SmokeConfig::default(),
            path: PathConfig::default(),
        }
    }
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ProvisionConfig> {
    let path = paths::config_path()?;
    if !path.exists() {
        let default_cfg = ProvisionConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file; missing keys take their defaults.
pub fn load_from_path(path: &Path) -> Result<ProvisionConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: ProvisionConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ProvisionConfig::default();
        assert!(cfg.require_elevation);
        assert_eq!(cfg.artifact.url, DEFAULT_FFMPEG_URL);
        assert!(cfg.artifact.cache_dir.is_none());
        assert!(!cfg.artifact.force);
        assert_eq!(cfg.toolchain.source, ToolchainSource::Archive);
        assert_eq!(cfg.gpu.min_driver_major, 570);
        assert!(cfg.service.enabled);
        assert_eq!(cfg.service.stop_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.service.poll_interval(), Duration::from_secs(1));
        assert_eq!(cfg.service.binaries, vec!["ffmpeg", "ffprobe"]);
        assert_eq!(cfg.service.config_section, "iconik");
        assert_eq!(cfg.service.codec, "h264_nvenc");
        assert_eq!(cfg.service.bitrate, "8000k");
        assert_eq!(cfg.smoke.marker, "NVENC");
        assert!(cfg.path.register);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = ProvisionConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ProvisionConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.artifact.url, cfg.artifact.url);
        assert_eq!(parsed.artifact.install_dir, cfg.artifact.install_dir);
        assert_eq!(parsed.service.name, cfg.service.name);
        assert_eq!(parsed.service.default_dir, cfg.service.default_dir);
        assert_eq!(parsed.gpu.min_driver_major, cfg.gpu.min_driver_major);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let toml = r#"
            [artifact]
            cache_dir = "/srv/cache"
            force = true

            [service]
            enabled = false
            stop_timeout_secs = 5
        "#;
        let cfg: ProvisionConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.artifact.cache_dir.as_deref(), Some(Path::new("/srv/cache")));
        assert!(cfg.artifact.force);
        assert_eq!(cfg.artifact.url, DEFAULT_FFMPEG_URL);
        assert!(!cfg.service.enabled);
        assert_eq!(cfg.service.stop_timeout_secs, 5);
        assert_eq!(cfg.service.poll_interval_ms, 1000);
        assert_eq!(cfg.service.codec_key, "proxy-videocodec");
        assert_eq!(cfg.gpu.min_driver_major, 570);
    }

    #[test]
    fn toolchain_source_kebab_case() {
        let toml = r#"
            [toolchain]
            source = "package-manager"
            package = "ffmpeg-full"
        "#;
        let cfg: ProvisionConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.toolchain.source, ToolchainSource::PackageManager);
        assert_eq!(cfg.toolchain.package, "ffmpeg-full");
    }

    #[test]
    fn load_from_path_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "require_elevation = \"maybe\"").unwrap();
        let err = load_from_path(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("parse config"));
    }

    #[test]
    fn work_dir_defaults_under_temp() {
        let cfg = ArtifactConfig::default();
        assert_eq!(
            cfg.resolved_work_dir(),
            std::env::temp_dir().join(paths::APP_PREFIX)
        );
    }
}
