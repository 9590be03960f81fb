//! Terminal host using Reedline.

use super::io::{Input, IoError, IoHost, Output, OutputStyle, PromptConfig, Signal};
use nu_ansi_term::{Color, Style};
use reedline::{
    default_emacs_keybindings, default_vi_insert_keybindings, default_vi_normal_keybindings,
    DefaultHinter, EditMode as ReedlineEditMode, Emacs, FileBackedHistory, Prompt, PromptEditMode,
    PromptHistorySearch, PromptHistorySearchStatus, PromptViMode, Reedline,
    Signal as ReedlineSignal, Vi,
};
use std::borrow::Cow;
use std::io::{self, Write};
use std::path::PathBuf;

/// Number of history entries kept on disk
const HISTORY_SIZE: usize = 1000;

/// Key bindings of the line editor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditMode {
    #[default]
    Emacs,
    Vi,
}

impl EditMode {
    /// Parse a configured mode (`vi`, `vim`, `emacs`)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "vi" | "vim" => Some(EditMode::Vi),
            "emacs" => Some(EditMode::Emacs),
            _ => None,
        }
    }

    /// Guess from `$EDITOR` / `$VISUAL`
    pub fn from_env() -> Self {
        let is_vi = ["EDITOR", "VISUAL"].iter().any(|var| {
            std::env::var(var)
                .map(|editor| {
                    let editor = editor.to_lowercase();
                    editor.contains("vim") || editor.ends_with("vi")
                })
                .unwrap_or(false)
        });
        if is_vi {
            EditMode::Vi
        } else {
            EditMode::Emacs
        }
    }
}

/// Terminal host using Reedline for interactive I/O.
pub struct TerminalHost {
    line_editor: Reedline,
}

impl TerminalHost {
    pub fn new(mode: EditMode) -> Self {
        let hinter = Box::new(
            DefaultHinter::default().with_style(Style::new().fg(Color::LightGray).dimmed()),
        );

        let edit_mode: Box<dyn ReedlineEditMode> = match mode {
            EditMode::Vi => Box::new(Vi::new(
                default_vi_insert_keybindings(),
                default_vi_normal_keybindings(),
            )),
            EditMode::Emacs => Box::new(Emacs::new(default_emacs_keybindings())),
        };

        let mut line_editor = Reedline::create()
            .with_hinter(hinter)
            .with_edit_mode(edit_mode);

        if let Some(history_path) = get_history_path() {
            if let Some(parent) = history_path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            match FileBackedHistory::with_file(HISTORY_SIZE, history_path) {
                Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
                Err(e) => tracing::warn!("History disabled: {}", e),
            }
        }

        Self { line_editor }
    }
}

impl IoHost for TerminalHost {
    fn read_line(&mut self, prompt: &PromptConfig) -> Result<Input, IoError> {
        let prompt = TerminalPrompt::from_config(prompt);

        loop {
            let signal = self
                .line_editor
                .read_line(&prompt)
                .map_err(|e| IoError::Io(format!("Reedline error: {}", e)))?;
            match map_signal(signal) {
                Some(input) => return Ok(input),
                None => tracing::debug!("ignoring line editor signal"),
            }
        }
    }

    fn write_output(&mut self, output: Output) -> Result<(), IoError> {
        let styled = match output.style {
            OutputStyle::Normal => output.text,
            OutputStyle::Error => Color::Red.paint(&output.text).to_string(),
            OutputStyle::Info => Color::Cyan.paint(&output.text).to_string(),
        };
        writeln!(io::stdout(), "{}", styled).map_err(|e| IoError::Io(e.to_string()))
    }

    fn flush(&mut self) -> Result<(), IoError> {
        io::stdout().flush().map_err(|e| IoError::Io(e.to_string()))
    }
}

/// Translate a line editor result; signals with no meaning here yield `None`
fn map_signal(signal: ReedlineSignal) -> Option<Input> {
    match signal {
        ReedlineSignal::Success(line) => Some(Input::Line(line)),
        ReedlineSignal::CtrlC => Some(Input::Signal(Signal::Interrupt)),
        ReedlineSignal::CtrlD => Some(Input::Signal(Signal::Eof)),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

/// `kubeplay (<context>:<namespace>)> `, or `... ` while continuing a command
struct TerminalPrompt {
    context: String,
    namespace: String,
    continuation: bool,
}

impl TerminalPrompt {
    fn from_config(config: &PromptConfig) -> Self {
        Self {
            context: config.context.clone(),
            namespace: config.namespace.clone(),
            continuation: config.continuation,
        }
    }
}

impl Prompt for TerminalPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        if self.continuation {
            return Cow::Borrowed("...");
        }
        Cow::Owned(format!(
            "kubeplay ({}:{})",
            Color::Blue.bold().paint(&self.context),
            Color::Yellow.paint(&self.namespace)
        ))
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, edit_mode: PromptEditMode) -> Cow<'_, str> {
        if self.continuation {
            return Cow::Borrowed(" ");
        }
        match edit_mode {
            PromptEditMode::Vi(PromptViMode::Normal) => {
                Cow::Owned(format!("{} ", Color::Blue.bold().paint(":")))
            }
            _ => Cow::Borrowed("> "),
        }
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("... ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!(
            "({}reverse-search: {}) ",
            prefix, history_search.term
        ))
    }
}

fn get_history_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("kubeplay").join("history.txt"))
}
