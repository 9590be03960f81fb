//! I/O abstraction for the REPL.
//!
//! The loop talks to the outside world only through [`IoHost`], so the
//! terminal can be swapped for a scripted host in tests.

/// Error type for host I/O
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(String),
}

/// Out-of-band input from the line editor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Ctrl+C
    Interrupt,
    /// Ctrl+D or end of piped input
    Eof,
}

/// Result of reading one physical line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    Signal(Signal),
}

/// Output to be written by the REPL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub text: String,
    pub style: OutputStyle,
}

impl Output {
    pub fn normal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: OutputStyle::Normal,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: OutputStyle::Error,
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: OutputStyle::Info,
        }
    }
}

/// Style hint for output rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputStyle {
    /// Results and script `print` output
    #[default]
    Normal,
    /// Error message (host may style in red)
    Error,
    /// Informational message (host may style in cyan)
    Info,
}

/// What the prompt should show for the next read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptConfig {
    pub context: String,
    pub namespace: String,
    /// Reading the continuation of a multi-line command
    pub continuation: bool,
}

/// Why the REPL stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Ctrl+D or end of input
    Eof,
    /// `quit` or `exit`
    UserExit,
    /// The line editor failed
    InputFailure,
}

impl ExitReason {
    pub fn exit_code(self) -> i32 {
        match self {
            ExitReason::Eof | ExitReason::UserExit => 0,
            ExitReason::InputFailure => 1,
        }
    }
}

/// Host interface for REPL I/O operations.
pub trait IoHost {
    /// Block until the user submits a line or a signal arrives
    fn read_line(&mut self, prompt: &PromptConfig) -> Result<Input, IoError>;

    /// Write output to the user.
    fn write_output(&mut self, output: Output) -> Result<(), IoError>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), IoError> {
        Ok(())
    }
}
