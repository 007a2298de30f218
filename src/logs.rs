use std::fmt;
use std::io::{self, IsTerminal};
use std::time::SystemTime;

use anyhow::{bail, Context, Result};
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

/// Initializes the stdout logger. At `debug` every line also names its
/// target, so authorization decisions can be told apart from actix-web noise.
pub fn init(level: &str) -> Result<()> {
    let level = parse_level(level)?;
    let with_target = level >= LevelFilter::Debug;
    let is_terminal = io::stdout().is_terminal();

    let colors = ColoredLevelConfig::new()
        .info(Color::Green)
        .debug(Color::Magenta);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            let target = with_target.then(|| record.target());
            let line = if is_terminal {
                render(colors.color(record.level()), target, message)
            } else {
                render(record.level(), target, message)
            };
            out.finish(format_args!(
                "{} {line}",
                humantime::format_rfc3339_millis(SystemTime::now()),
            ))
        })
        .level(level)
        .level_for("actix_server", level.min(LevelFilter::Info))
        .chain(io::stdout())
        .apply()
        .context("init logger")?;

    Ok(())
}

fn render(level: impl fmt::Display, target: Option<&str>, message: &fmt::Arguments) -> String {
    match target {
        Some(target) => format!("[{level}] {target}: {message}"),
        None => format!("[{level}] {message}"),
    }
}

fn parse_level(level: &str) -> Result<LevelFilter> {
    Ok(match level {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        _ => bail!("unknown log level '{}'", level),
    })
}

#[cfg(test)]
mod tests {
    use log::Level;

    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug").unwrap(), LevelFilter::Debug);
        assert_eq!(parse_level("warn").unwrap(), LevelFilter::Warn);
        assert!(parse_level("verbose").is_err());
    }

    #[test]
    fn test_render() {
        assert_eq!(
            render(
                Level::Debug,
                Some("rbac_gate::engine"),
                &format_args!("Authorize GET /perm: allow")
            ),
            "[DEBUG] rbac_gate::engine: Authorize GET /perm: allow"
        );
        assert_eq!(
            render(Level::Info, None, &format_args!("Starting demo server")),
            "[INFO] Starting demo server"
        );
    }
}
