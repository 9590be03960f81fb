//! Read-eval-print loop.
//!
//! [`ReplCore`] reads one command at a time through an [`IoHost`], handles
//! the control tokens and signals itself and hands everything else to an
//! [`Evaluator`]. It never exits the process: [`ReplCore::run`] returns an
//! [`ExitReason`] and the caller maps it to an exit code.

mod io;
mod terminal;

pub use io::{ExitReason, Input, IoError, IoHost, Output, OutputStyle, PromptConfig, Signal};
pub use terminal::{EditMode, TerminalHost};

use anyhow::{Context, Result};

/// Printed once per Ctrl+C
pub const INTERRUPT_HINT: &str = "You can press ^D or type \"quit\", \"exit\" to exit the shell";

/// Prefix of every evaluation error
pub const ERROR_PREFIX: &str = "+++ Error: ";

/// Commands handled by the loop itself
const EXIT_TOKENS: &[&str] = &["quit", "exit"];

/// An exception that escaped evaluation, as text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct EvalError(pub String);

/// What the loop evaluates commands with
pub trait Evaluator {
    /// Evaluate one command; `Ok(None)` when there is nothing to print
    fn eval(&mut self, source: &str) -> Result<Option<String>, EvalError>;

    /// Output the command printed while running, oldest first
    fn take_printed(&mut self) -> Vec<String> {
        Vec::new()
    }

    /// Cluster context shown in the prompt
    fn context(&self) -> String;

    /// Default namespace shown in the prompt
    fn namespace(&self) -> String;
}

pub struct ReplCore<E: Evaluator> {
    evaluator: E,
    /// Lines accumulated for the current command
    buffer: String,
}

impl<E: Evaluator> ReplCore<E> {
    pub fn new(evaluator: E) -> Self {
        Self {
            evaluator,
            buffer: String::new(),
        }
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn into_evaluator(self) -> E {
        self.evaluator
    }

    /// Run until end of input, an exit command or a read failure.
    ///
    /// Errors are internal faults (the host could not write output); they
    /// carry context and the caller decides how to report them.
    pub fn run(&mut self, io: &mut impl IoHost) -> Result<ExitReason> {
        tracing::info!("REPL started");
        let reason = self.run_loop(io).context("REPL loop failed")?;
        tracing::info!("REPL finished: {:?}", reason);
        Ok(reason)
    }

    fn run_loop(&mut self, io: &mut impl IoHost) -> Result<ExitReason> {
        loop {
            let prompt = self.prompt();
            let line = match io.read_line(&prompt) {
                Ok(Input::Line(line)) => line,
                Ok(Input::Signal(Signal::Eof)) => {
                    // A half-typed command is dropped, not evaluated
                    self.buffer.clear();
                    return Ok(ExitReason::Eof);
                }
                Ok(Input::Signal(Signal::Interrupt)) => {
                    self.buffer.clear();
                    io.write_output(Output::info(INTERRUPT_HINT))
                        .context("Failed to write interrupt hint")?;
                    io.flush().context("Failed to flush output")?;
                    continue;
                }
                Err(err) => {
                    tracing::error!("Reading input failed: {}", err);
                    io.write_output(Output::error(format!("Failed to read input: {}", err)))
                        .context("Failed to report input failure")?;
                    io.flush().context("Failed to flush output")?;
                    return Ok(ExitReason::InputFailure);
                }
            };

            // A trailing backslash continues the command on the next line
            if let Some(head) = line.strip_suffix('\\') {
                self.buffer.push_str(head);
                self.buffer.push('\n');
                continue;
            }
            self.buffer.push_str(&line);

            let command = std::mem::take(&mut self.buffer);
            let trimmed = command.trim();
            if EXIT_TOKENS.contains(&trimmed) {
                return Ok(ExitReason::UserExit);
            }
            if trimmed.is_empty() {
                continue;
            }

            self.evaluate(io, &command)?;
        }
    }

    fn evaluate(&mut self, io: &mut impl IoHost, command: &str) -> Result<()> {
        tracing::debug!("Evaluating {:?}", command);
        let result = self.evaluator.eval(command);

        for text in self.evaluator.take_printed() {
            io.write_output(Output::normal(text))
                .context("Failed to write script output")?;
        }

        match result {
            Ok(Some(text)) => io
                .write_output(Output::normal(text))
                .context("Failed to write result")?,
            Ok(None) => {}
            Err(err) => io
                .write_output(Output::error(format!("{}{}", ERROR_PREFIX, err)))
                .context("Failed to write error")?,
        }
        io.flush().context("Failed to flush output")?;
        Ok(())
    }

    fn prompt(&self) -> PromptConfig {
        PromptConfig {
            context: self.evaluator.context(),
            namespace: self.evaluator.namespace(),
            continuation: !self.buffer.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestHost;

    /// Records every submitted command; `fail:` commands raise
    #[derive(Default)]
    struct Recorder {
        submitted: Vec<String>,
    }

    impl Evaluator for Recorder {
        fn eval(&mut self, source: &str) -> Result<Option<String>, EvalError> {
            self.submitted.push(source.to_string());
            match source.strip_prefix("fail:") {
                Some(message) => Err(EvalError(message.to_string())),
                None => Ok(Some(format!("=> {}", source))),
            }
        }

        fn context(&self) -> String {
            "kind-dev".to_string()
        }

        fn namespace(&self) -> String {
            "default".to_string()
        }
    }

    fn run(host: &mut TestHost) -> (ExitReason, Vec<String>) {
        let mut core = ReplCore::new(Recorder::default());
        let reason = core.run(host).unwrap();
        (reason, core.into_evaluator().submitted)
    }

    #[test]
    fn test_eof_exits_cleanly() {
        let mut host = TestHost::new();
        host.queue_signal(Signal::Eof);
        let (reason, submitted) = run(&mut host);
        assert_eq!(reason, ExitReason::Eof);
        assert_eq!(reason.exit_code(), 0);
        assert!(submitted.is_empty());
    }

    #[test]
    fn test_eof_drops_partial_buffer() {
        let mut host = TestHost::new();
        host.queue_input("pods.get(\\");
        host.queue_signal(Signal::Eof);
        let (reason, submitted) = run(&mut host);
        assert_eq!(reason, ExitReason::Eof);
        assert!(submitted.is_empty());
    }

    #[test]
    fn test_exit_tokens_skip_evaluation() {
        for token in ["quit", "exit", "  quit  ", "\texit"] {
            let mut host = TestHost::new();
            host.queue_inputs([token, "never"]);
            let (reason, submitted) = run(&mut host);
            assert_eq!(reason, ExitReason::UserExit, "{:?}", token);
            assert!(submitted.is_empty());
            assert!(host.has_pending_input());
        }
    }

    #[test]
    fn test_exit_tokens_are_case_sensitive() {
        let mut host = TestHost::new();
        host.queue_input("QUIT");
        let (reason, submitted) = run(&mut host);
        assert_eq!(reason, ExitReason::Eof);
        assert_eq!(submitted, vec!["QUIT"]);
    }

    #[test]
    fn test_interrupt_prints_one_hint_and_discards_buffer() {
        let mut host = TestHost::new();
        host.queue_input("let x = \\");
        host.queue_signal(Signal::Interrupt);
        host.queue_input("1 + 1");
        let (reason, submitted) = run(&mut host);

        assert_eq!(reason, ExitReason::Eof);
        assert_eq!(submitted, vec!["1 + 1"]);
        let hints = host.output_with_style(OutputStyle::Info);
        assert_eq!(hints, vec![INTERRUPT_HINT]);
    }

    #[test]
    fn test_read_failure_exits_with_one() {
        let mut host = TestHost::new();
        host.queue_failure("terminal closed");
        host.queue_input("never");
        let (reason, submitted) = run(&mut host);

        assert_eq!(reason, ExitReason::InputFailure);
        assert_eq!(reason.exit_code(), 1);
        assert!(submitted.is_empty());
        assert_eq!(
            host.errors(),
            vec!["Failed to read input: I/O error: terminal closed"]
        );
    }

    #[test]
    fn test_errors_are_printed_and_loop_continues() {
        let mut host = TestHost::new();
        host.queue_inputs(["fail:boom", "ok"]);
        let (reason, submitted) = run(&mut host);

        assert_eq!(reason, ExitReason::Eof);
        assert_eq!(submitted, vec!["fail:boom", "ok"]);
        assert_eq!(host.errors(), vec!["+++ Error: boom"]);
        assert_eq!(host.output_with_style(OutputStyle::Normal), vec!["=> ok"]);
    }

    #[test]
    fn test_multi_line_commands() {
        let mut host = TestHost::new();
        host.queue_inputs(["let x = [\\", "1, 2\\", "];"]);
        let (_, submitted) = run(&mut host);
        assert_eq!(submitted, vec!["let x = [\n1, 2\n];"]);

        let continuation: Vec<bool> = host.prompts().iter().map(|p| p.continuation).collect();
        assert_eq!(continuation, vec![false, true, true, false]);
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let mut host = TestHost::new();
        host.queue_inputs(["", "   "]);
        let (_, submitted) = run(&mut host);
        assert!(submitted.is_empty());
    }

    #[test]
    fn test_prompt_reflects_evaluator() {
        let mut host = TestHost::new();
        run(&mut host);
        let prompt = &host.prompts()[0];
        assert_eq!(prompt.context, "kind-dev");
        assert_eq!(prompt.namespace, "default");
    }

    #[test]
    fn test_write_failure_is_an_internal_fault() {
        let mut host = TestHost::new();
        host.queue_input("ok");
        host.fail_writes();

        let mut core = ReplCore::new(Recorder::default());
        let err = core.run(&mut host).unwrap_err();
        let text = format!("{:#}", err);
        assert!(text.starts_with("REPL loop failed: Failed to write result"), "{}", text);
    }
}
