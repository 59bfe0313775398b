use rollcall_io::OutputFormat;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_ACCEPT_THRESHOLD: f32 = 0.6;
const DEFAULT_WRITE_ATTEMPTS: u32 = 3;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("accept_threshold must be a finite, non-negative distance (got {0})")]
    InvalidThreshold(f32),
    #[error(transparent)]
    Format(#[from] rollcall_io::UnknownFormat),
}

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum embedding distance accepted as an identification.
    pub accept_threshold: f32,
    /// Directory of labeled reference images.
    pub roster_dir: PathBuf,
    /// Directory receiving the attendance output.
    pub output_dir: PathBuf,
    pub output_format: OutputFormat,
    /// JSON-lines frames file, `-` for stdin.
    pub frames_path: PathBuf,
    /// How many times a failed attendance write is attempted.
    pub write_attempts: u32,
}

/// Optional TOML layer (`ROLLCALL_CONFIG`).
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    accept_threshold: Option<f32>,
    roster_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    output_format: Option<String>,
    frames_path: Option<PathBuf>,
    write_attempts: Option<u32>,
}

impl Config {
    /// Load configuration from `ROLLCALL_*` environment variables, layered
    /// over the TOML file named by `ROLLCALL_CONFIG` if set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let file = match env("ROLLCALL_CONFIG") {
            Some(path) => read_file(Path::new(&path))?,
            None => FileConfig::default(),
        };

        let accept_threshold = env_parse(&env, "ROLLCALL_ACCEPT_THRESHOLD")
            .or(file.accept_threshold)
            .unwrap_or(DEFAULT_ACCEPT_THRESHOLD);
        if !accept_threshold.is_finite() || accept_threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(accept_threshold));
        }

        let output_format = match env("ROLLCALL_OUTPUT_FORMAT").or(file.output_format) {
            Some(s) => s.parse()?,
            None => OutputFormat::default(),
        };

        Ok(Self {
            accept_threshold,
            roster_dir: env("ROLLCALL_ROSTER_DIR")
                .map(PathBuf::from)
                .or(file.roster_dir)
                .unwrap_or_else(|| PathBuf::from("student_images")),
            output_dir: env("ROLLCALL_OUTPUT_DIR")
                .map(PathBuf::from)
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from("attendance")),
            output_format,
            frames_path: env("ROLLCALL_FRAMES")
                .map(PathBuf::from)
                .or(file.frames_path)
                .unwrap_or_else(|| PathBuf::from("-")),
            write_attempts: env_parse(&env, "ROLLCALL_WRITE_ATTEMPTS")
                .or(file.write_attempts)
                .unwrap_or(DEFAULT_WRITE_ATTEMPTS)
                .max(1),
        })
    }
}

fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn env_parse<T: std::str::FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = env(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable environment value");
            None
        }
    }
}
