use std::sync::Mutex;

/// Trait for handling output in a way that works for both CLI and library usage
pub trait OutputHandler: Send + Sync {
    /// Display a success message
    fn success(&self, message: &str);

    /// Display an error message
    fn error(&self, message: &str);

    /// Display an info message
    fn info(&self, message: &str);

    /// Display a warning message
    fn warning(&self, message: &str);

    /// Display a status message (e.g., "Converted V1__init.sql")
    fn status(&self, action: &str, message: &str);
}

/// Library output handler that collects messages
#[derive(Default)]
pub struct LibraryOutputHandler {
    messages: Mutex<Vec<(OutputLevel, String)>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLevel {
    Success,
    Error,
    Info,
    Warning,
    Status,
}

impl LibraryOutputHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_messages(&self) -> Vec<(OutputLevel, String)> {
        match self.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn add_message(&self, level: OutputLevel, message: &str) {
        let mut messages = match self.messages.lock() {
            Ok(messages) => messages,
            Err(poisoned) => poisoned.into_inner(),
        };
        messages.push((level, message.to_string()));
    }
}

impl OutputHandler for LibraryOutputHandler {
    fn success(&self, message: &str) {
        self.add_message(OutputLevel::Success, message);
    }

    fn error(&self, message: &str) {
        self.add_message(OutputLevel::Error, message);
    }

    fn info(&self, message: &str) {
        self.add_message(OutputLevel::Info, message);
    }

    fn warning(&self, message: &str) {
        self.add_message(OutputLevel::Warning, message);
    }

    fn status(&self, action: &str, message: &str) {
        self.add_message(OutputLevel::Status, &format!("{} {}", action, message));
    }
}

/// CLI output handler that prints to stdout with colors
#[cfg(feature = "cli")]
pub struct CliOutputHandler;

#[cfg(feature = "cli")]
impl OutputHandler for CliOutputHandler {
    fn success(&self, message: &str) {
        use owo_colors::OwoColorize;
        println!("{} {}", "✓".green(), message);
    }

    fn error(&self, message: &str) {
        use owo_colors::OwoColorize;
        eprintln!("{} {}", "✗".red(), message);
    }

    fn info(&self, message: &str) {
        println!("{}", message);
    }

    fn warning(&self, message: &str) {
        use owo_colors::OwoColorize;
        println!("{} {}", "⚠".yellow(), message);
    }

    fn status(&self, action: &str, message: &str) {
        use owo_colors::OwoColorize;
        println!("{:>12} {}", action.green().bold(), message);
    }
}

/// Silent output handler that discards all output
pub struct SilentOutputHandler;

impl OutputHandler for SilentOutputHandler {
    fn success(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warning(&self, _message: &str) {}
    fn status(&self, _action: &str, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_output_handler() {
        let handler = LibraryOutputHandler::new();

        handler.success("V1__init.sql converted (3 changes)");
        handler.error("V2__broken.sql failed");
        handler.info("2 scripts found");
        handler.warning("collations skipped");
        handler.status("Converting", "V3__more.sql");

        let messages = handler.get_messages();
        assert_eq!(messages.len(), 5);

        assert_eq!(
            messages[0],
            (OutputLevel::Success, "V1__init.sql converted (3 changes)".to_string())
        );
        assert_eq!(messages[1], (OutputLevel::Error, "V2__broken.sql failed".to_string()));
        assert_eq!(messages[2], (OutputLevel::Info, "2 scripts found".to_string()));
        assert_eq!(messages[3], (OutputLevel::Warning, "collations skipped".to_string()));
        assert_eq!(messages[4], (OutputLevel::Status, "Converting V3__more.sql".to_string()));
    }

    #[test]
    fn test_library_handler_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let handler = Arc::new(LibraryOutputHandler::new());
        let mut handles = vec![];

        for i in 0..10 {
            let handler_clone = Arc::clone(&handler);
            handles.push(thread::spawn(move || {
                handler_clone.info(&format!("Message from thread {}", i));
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let messages = handler.get_messages();
        assert_eq!(messages.len(), 10);
        assert!(messages.iter().all(|(level, _)| *level == OutputLevel::Info));
    }

    #[test]
    fn test_silent_output_handler() {
        let handler = SilentOutputHandler;
        handler.success("ignored");
        handler.error("ignored");
        handler.status("Converting", "ignored");
    }
}
