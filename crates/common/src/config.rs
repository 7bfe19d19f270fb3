use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:4317";
const DEFAULT_IDLE_GC_SECS: u64 = 20 * 60;
const DEFAULT_MAX_DRAIN_FRAMES: usize = 100;

/// On-disk shape, every field optional so a partial (or absent) TOML file
/// is valid — unset fields fall back to defaults or env overrides,
/// matching the teacher's `ConfigToml` pattern in `codex-rs/core/config.rs`.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ConfigToml {
    pub bind_addr: Option<String>,
    pub idle_gc_threshold_secs: Option<u64>,
    pub max_drain_frames: Option<usize>,
    pub server_name: Option<String>,
    pub server_version: Option<String>,
}

impl ConfigToml {
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Fully resolved runtime configuration: file values, then `QUILLCORE_*`
/// environment overrides, then built-in defaults, in that priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub idle_gc_threshold: Duration,
    pub max_drain_frames: usize,
    pub server_name: String,
    pub server_version: String,
}

impl Config {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let toml_cfg = match path {
            Some(path) => ConfigToml::load_from_file(path)?,
            None => ConfigToml::default(),
        };
        Self::resolve(toml_cfg)
    }

    fn resolve(toml_cfg: ConfigToml) -> anyhow::Result<Self> {
        let bind_addr = env_override("QUILLCORE_BIND_ADDR")
            .or(toml_cfg.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()?;

        let idle_gc_threshold_secs = env_override("QUILLCORE_IDLE_GC_SECS")
            .and_then(|v| v.parse().ok())
            .or(toml_cfg.idle_gc_threshold_secs)
            .unwrap_or(DEFAULT_IDLE_GC_SECS);

        let max_drain_frames = env_override("QUILLCORE_MAX_DRAIN_FRAMES")
            .and_then(|v| v.parse().ok())
            .or(toml_cfg.max_drain_frames)
            .unwrap_or(DEFAULT_MAX_DRAIN_FRAMES);

        let server_name = env_override("QUILLCORE_SERVER_NAME")
            .or(toml_cfg.server_name)
            .unwrap_or_else(|| "quillcore".to_string());

        let server_version = env_override("QUILLCORE_SERVER_VERSION")
            .or(toml_cfg.server_version)
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

        Ok(Self {
            bind_addr,
            idle_gc_threshold: Duration::from_secs(idle_gc_threshold_secs),
            max_drain_frames,
            server_name,
            server_version,
        })
    }
}

fn env_override(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = Config::resolve(ConfigToml::default()).expect("resolves");
        assert_eq!(cfg.bind_addr, DEFAULT_BIND_ADDR.parse().expect("valid default"));
        assert_eq!(cfg.idle_gc_threshold, Duration::from_secs(DEFAULT_IDLE_GC_SECS));
        assert_eq!(cfg.max_drain_frames, DEFAULT_MAX_DRAIN_FRAMES);
    }

    #[test]
    fn toml_values_override_defaults() {
        let toml_cfg = ConfigToml::from_toml_str(
            r#"
            bind_addr = "0.0.0.0:9000"
            idle_gc_threshold_secs = 120
            max_drain_frames = 5
            "#,
        )
        .expect("valid toml");
        let cfg = Config::resolve(toml_cfg).expect("resolves");
        assert_eq!(cfg.bind_addr, "0.0.0.0:9000".parse().expect("valid addr"));
        assert_eq!(cfg.idle_gc_threshold, Duration::from_secs(120));
        assert_eq!(cfg.max_drain_frames, 5);
    }
}
