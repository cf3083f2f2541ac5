//! Shared helpers for the `kinematic` binary: logger setup and path checks.

use std::error::Error;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use log::LevelFilter;

/// Level used when neither the command line nor a configuration file names one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Parse a level name (off, error, warn, info, debug, trace), falling back to `info`.
pub fn parse_level(name: &str) -> LevelFilter {
    name.trim().parse().unwrap_or_else(|_| {
        eprintln!("Invalid log level '{}', defaulting to '{}'", name, DEFAULT_LOG_LEVEL);
        LevelFilter::Info
    })
}

/// Install the global logger: timestamped lines on stderr, or appended to `log_file`.
pub fn init_logger(level: LevelFilter, log_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format(|buf, record| {
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        writeln!(buf, "{} [{}] - {}", stamp, record.level(), record.args())
    });
    if let Some(path) = log_file {
        ensure_parent_dir(path)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.try_init()?;
    Ok(())
}

/// Check that an input sample log exists and is a CSV file.
pub fn validate_input_file(input: &Path) -> Result<(), Box<dyn Error>> {
    if !input.is_file() {
        return Err(format!("Input file '{}' does not exist.", input.display()).into());
    }
    if input.extension().and_then(|s| s.to_str()) != Some("csv") {
        return Err(format!("Input file '{}' is not a CSV file.", input.display()).into());
    }
    Ok(())
}

/// Create the parent directory of `path` if it has one and it is missing.
pub fn ensure_parent_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), LevelFilter::Debug);
        assert_eq!(parse_level("WARN"), LevelFilter::Warn);
        assert_eq!(parse_level(" off "), LevelFilter::Off);
        assert_eq!(parse_level("loud"), LevelFilter::Info);
    }
    #[test]
    fn test_validate_input_file() {
        let csv = std::env::temp_dir().join("kinematic_common_input.csv");
        std::fs::write(&csv, "dt\n").unwrap();
        assert!(validate_input_file(&csv).is_ok());
        let _ = std::fs::remove_file(&csv);
        assert!(validate_input_file(&csv).is_err());
        assert!(validate_input_file(Path::new("Cargo.toml")).is_err());
    }
}
