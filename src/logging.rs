use std::io::IsTerminal;
use tracing::Level;
use tracing_subscriber::{
    fmt::{format::FmtSpan, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initialize the logging and error reporting infrastructure
pub fn init(verbosity: u8) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    #[cfg(feature = "cli")]
    color_eyre::install()?;

    let log_level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // RUST_LOG wins over the verbosity flag
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tsql2pg={}", log_level)));

    let is_terminal = std::io::stderr().is_terminal();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_ansi(is_terminal)
        .with_timer(UtcTime::rfc_3339())
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Logging macros that include structured context

#[macro_export]
macro_rules! log_error {
    ($err:expr) => {
        tracing::error!(
            error = %$err,
            "Operation failed"
        );
        if let Some(suggestion) = $crate::error::suggest_fix(&$err) {
            tracing::info!("{}", suggestion);
        }
    };
}

#[macro_export]
macro_rules! log_file_converted {
    ($name:expr, $changes:expr) => {
        tracing::info!(
            file = $name,
            changes = $changes,
            "Script converted"
        );
    };
}

#[macro_export]
macro_rules! log_file_failed {
    ($name:expr, $err:expr) => {
        tracing::warn!(
            file = $name,
            error = %$err,
            "Script conversion failed"
        );
    };
}

#[macro_export]
macro_rules! log_pass {
    ($pass:expr, $before:expr, $after:expr) => {
        tracing::debug!(
            pass = $pass,
            before_len = $before,
            after_len = $after,
            "Rewrite pass changed script"
        );
    };
}

/// Format output for CLI with colors
#[cfg(feature = "cli")]
pub mod output {
    use console::{style, Emoji};
    use std::fmt::Display;

    static CROSS: Emoji<'_, '_> = Emoji("✗ ", "[FAIL] ");
    static ARROW: Emoji<'_, '_> = Emoji("→ ", "-> ");
    static WARNING: Emoji<'_, '_> = Emoji("⚠ ", "[WARN] ");

    pub fn error(message: impl Display) {
        eprintln!("{} {}", style(CROSS).red(), style(message).red());
    }

    pub fn warning(message: impl Display) {
        println!("{} {}", style(WARNING).yellow(), style(message).yellow());
    }

    pub fn step(message: impl Display) {
        println!("{} {}", style(ARROW).cyan(), message);
    }

    pub fn header(message: impl Display) {
        println!("\n{}", style(message).bold().underlined());
    }
}

/// Helper to format durations in human-readable format
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs == 0 {
        format!("{}ms", millis)
    } else if secs < 60 {
        format!("{}.{:03}s", secs, millis)
    } else {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1_500)), "1.500s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }
}
