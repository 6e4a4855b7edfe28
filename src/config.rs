//! File-based defaults for the command-line driver.
//!
//! Resolution order is built-in defaults, then the config file, then flags.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rangeget_core::download::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use rangeget_core::{RetryPolicy, TransferConfig};

const STREAMS_RANGE: RangeInclusive<u64> = 1..=64;
const MIN_CHUNK_SIZE: u64 = 64 * 1024;
const BUFFER_SIZE_RANGE: RangeInclusive<u64> = 4 * 1024..=16 * 1024 * 1024;
const MAX_ATTEMPTS_RANGE: RangeInclusive<u64> = 1..=10;
const TIMEOUT_SECS_RANGE: RangeInclusive<u64> = 1..=3600;

/// Values read from the config file; unset keys keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Concurrent range streams.
    pub streams: Option<usize>,
    /// Nominal chunk size in bytes.
    pub chunk_size: Option<u64>,
    /// Per-stream write buffer in bytes.
    pub buffer_size: Option<usize>,
    /// Attempts per chunk, including the first.
    pub max_attempts: Option<u32>,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// Idle read timeout in seconds.
    pub read_timeout_secs: Option<u64>,
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Effective settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Engine tuning.
    pub transfer: TransferConfig,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Idle read timeout in seconds.
    pub read_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            transfer: TransferConfig::default(),
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// Overlays every key set in `file`.
    pub fn apply_file(&mut self, file: &FileConfig) {
        if let Some(streams) = file.streams {
            self.transfer.streams = streams;
        }
        if let Some(chunk_size) = file.chunk_size {
            self.transfer.chunk_size = chunk_size;
        }
        if let Some(buffer_size) = file.buffer_size {
            self.transfer.buffer_size = buffer_size;
        }
        if let Some(max_attempts) = file.max_attempts {
            self.transfer.retry = RetryPolicy::with_max_attempts(max_attempts);
        }
        if let Some(secs) = file.connect_timeout_secs {
            self.connect_timeout_secs = secs;
        }
        if let Some(secs) = file.read_timeout_secs {
            self.read_timeout_secs = secs;
        }
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/rangeget/config.toml`
/// 2. `$HOME/.config/rangeget/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    config_path_from(env_var_non_empty_os("XDG_CONFIG_HOME"), env_var_non_empty_os("HOME"))
}

fn config_path_from(xdg_config_home: Option<OsString>, home: Option<OsString>) -> Option<PathBuf> {
    if let Some(xdg_config_home) = xdg_config_home {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("rangeget")
                .join("config.toml"),
        );
    }

    let home = home?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("rangeget")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();

        match key {
            "streams" => {
                let parsed = parse_in_range(key, value, line_no, &STREAMS_RANGE)?;
                cfg.streams = Some(usize::try_from(parsed)?);
            }
            "chunk_size" => {
                let parsed = parse_in_range(key, value, line_no, &(MIN_CHUNK_SIZE..=u64::MAX))?;
                cfg.chunk_size = Some(parsed);
            }
            "buffer_size" => {
                let parsed = parse_in_range(key, value, line_no, &BUFFER_SIZE_RANGE)?;
                cfg.buffer_size = Some(usize::try_from(parsed)?);
            }
            "max_attempts" => {
                let parsed = parse_in_range(key, value, line_no, &MAX_ATTEMPTS_RANGE)?;
                cfg.max_attempts = Some(u32::try_from(parsed)?);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs =
                    Some(parse_in_range(key, value, line_no, &TIMEOUT_SECS_RANGE)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs =
                    Some(parse_in_range(key, value, line_no, &TIMEOUT_SECS_RANGE)?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    line.split_once('#').map_or(line, |(before, _)| before)
}

fn parse_in_range(
    key: &str,
    raw_value: &str,
    line_no: usize,
    range: &RangeInclusive<u64>,
) -> Result<u64> {
    let value = parse_integer_u64(raw_value)
        .with_context(|| format!("Invalid `{key}` value on line {line_no}"))?;
    if !range.contains(&value) {
        bail!(
            "Invalid config value for `{key}` on line {line_no}: {value}. Expected range: {}..={}",
            range.start(),
            range.end()
        );
    }
    Ok(value)
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim().replace('_', "");
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}
