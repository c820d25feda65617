use std::sync::OnceLock;
use std::time::Duration;

/// Labels the LLM is known to emit but the animation server cannot act on.
/// The sanitizer removes their tags while keeping the content.
pub const DENYLISTED_LABELS: [&str; 4] = ["thinking", "excited", "confused", "sleepy"];

/// Markup that is neither an expression nor junk; the sanitizer leaves it
/// alone and the parser treats it as transparent.
pub const PASSTHROUGH_LABELS: [&str; 1] = ["br"];

pub fn is_denylisted(label: &str) -> bool {
    DENYLISTED_LABELS.iter().any(|l| label.eq_ignore_ascii_case(l))
}

pub fn is_passthrough(label: &str) -> bool {
    PASSTHROUGH_LABELS.iter().any(|l| label.eq_ignore_ascii_case(l))
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    /// Seconds per character when no phoneme data is available.
    pub fallback_char_secs: f64,
    /// Hard ceiling for one playback run; exceeding it cancels both activities.
    pub playback_deadline: Duration,
}

impl TimingConfig {
    pub fn from_env() -> Self {
        Self {
            fallback_char_secs: env_f64("FALLBACK_CHAR_SECS", 0.15),
            playback_deadline: Duration::from_secs(env_u64("PLAYBACK_DEADLINE_SEC", 60)),
        }
    }
}

pub fn timing_config() -> &'static TimingConfig {
    static CACHE: OnceLock<TimingConfig> = OnceLock::new();
    CACHE.get_or_init(TimingConfig::from_env)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogMode {
    Stdout,
    File,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub mode: LogMode,
    pub dir: Option<String>,
    pub file_name: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        let format = match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        let mode = match std::env::var("LOG_MODE").as_deref() {
            Ok("file") => LogMode::File,
            _ => LogMode::Stdout,
        };
        Self {
            format,
            mode,
            dir: std::env::var("LOG_DIR").ok(),
            file_name: std::env::var("LOG_FILE_NAME")
                .unwrap_or_else(|_| "expression-sync.log".to_string()),
        }
    }
}

pub fn logging_config() -> &'static LoggingConfig {
    static CACHE: OnceLock<LoggingConfig> = OnceLock::new();
    CACHE.get_or_init(LoggingConfig::from_env)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
