//! Scripted I/O host replaying queued input

use crate::repl::{Input, IoError, IoHost, Output, OutputStyle, PromptConfig, Signal};
use std::collections::VecDeque;

/// Test host with in-memory I/O buffers.
///
/// Reads are replayed from a queue in order; once the queue is empty every
/// read reports end of input.
#[derive(Debug, Default)]
pub struct TestHost {
    inputs: VecDeque<Result<Input, String>>,
    output_buffer: Vec<Output>,
    prompts: Vec<PromptConfig>,
    flush_count: usize,
    fail_writes: bool,
}

impl TestHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_input(&mut self, line: impl Into<String>) {
        self.inputs.push_back(Ok(Input::Line(line.into())));
    }

    pub fn queue_inputs(&mut self, lines: impl IntoIterator<Item = impl Into<String>>) {
        for line in lines {
            self.queue_input(line);
        }
    }

    pub fn queue_signal(&mut self, signal: Signal) {
        self.inputs.push_back(Ok(Input::Signal(signal)));
    }

    /// Queue a read failure
    pub fn queue_failure(&mut self, message: impl Into<String>) {
        self.inputs.push_back(Err(message.into()));
    }

    /// Make every write fail
    pub fn fail_writes(&mut self) {
        self.fail_writes = true;
    }

    pub fn output(&self) -> &[Output] {
        &self.output_buffer
    }

    pub fn output_with_style(&self, style: OutputStyle) -> Vec<&str> {
        self.output_buffer
            .iter()
            .filter(|o| o.style == style)
            .map(|o| o.text.as_str())
            .collect()
    }

    pub fn errors(&self) -> Vec<&str> {
        self.output_with_style(OutputStyle::Error)
    }

    pub fn prompts(&self) -> &[PromptConfig] {
        &self.prompts
    }

    pub fn flush_count(&self) -> usize {
        self.flush_count
    }

    pub fn has_pending_input(&self) -> bool {
        !self.inputs.is_empty()
    }
}

impl IoHost for TestHost {
    fn read_line(&mut self, prompt: &PromptConfig) -> Result<Input, IoError> {
        self.prompts.push(prompt.clone());
        match self.inputs.pop_front() {
            Some(Ok(input)) => Ok(input),
            Some(Err(message)) => Err(IoError::Io(message)),
            None => Ok(Input::Signal(Signal::Eof)),
        }
    }

    fn write_output(&mut self, output: Output) -> Result<(), IoError> {
        if self.fail_writes {
            return Err(IoError::Io("broken pipe".to_string()));
        }
        self.output_buffer.push(output);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), IoError> {
        self.flush_count += 1;
        Ok(())
    }
}
