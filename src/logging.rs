use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Once;

use chrono::Utc;

use crate::config::{self, LogFormat, LogMode};

static INIT: Once = Once::new();

/// Initializes the global logger once from `config::logging_config()`.
/// Safe to call from multiple entry points; later calls are no-ops.
pub fn init() {
    INIT.call_once(|| {
        let mut init_warnings = Vec::new();
        let cfg = config::logging_config().clone();
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

        builder.format(move |buf, record| {
            let ts = Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
            match cfg.format {
                LogFormat::Json => {
                    let obj = serde_json::json!({
                        "ts": ts,
                        "level": record.level().to_string(),
                        "target": record.target(),
                        "msg": record.args().to_string(),
                    });
                    writeln!(buf, "{}", obj)
                }
                LogFormat::Text => writeln!(
                    buf,
                    "{} {} {} {}",
                    ts,
                    record.level(),
                    record.target(),
                    record.args()
                ),
            }
        });

        match cfg.mode {
            LogMode::Stdout => {
                builder.target(env_logger::Target::Stdout);
            }
            LogMode::File => match open_log_file(&cfg.dir, &cfg.file_name) {
                Ok(file) => {
                    builder.target(env_logger::Target::Pipe(Box::new(file)));
                }
                Err(err) => {
                    init_warnings.push(format!("[logging] {}", err));
                    builder.target(env_logger::Target::Stdout);
                }
            },
        }

        let _ = builder.try_init();
        for warning in init_warnings {
            log::warn!("{}", warning);
        }
    });
}

fn open_log_file(dir: &Option<String>, file_name: &str) -> anyhow::Result<std::fs::File> {
    let dir = dir
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("LOG_MODE=file requires LOG_DIR"))?;
    std::fs::create_dir_all(dir)?;
    let path = std::path::Path::new(dir).join(file_name);
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}
