//! Interactive question loop.
//!
//! The console has two states. While [`ConsoleState::AwaitingInput`] it
//! reads one line, and either terminates (sentinel or end of input), ignores
//! it (blank), or answers it and keeps waiting. One question is in flight at
//! a time.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use docqa_rag::{Answer, KnowledgeBase, RagError, RagPipeline};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{info, warn};

/// Inputs that end the session, compared case-insensitively.
pub const EXIT_COMMANDS: [&str; 3] = ["keluar", "exit", "quit"];

/// Shown before every question.
pub const PROMPT: &str = "Ask a question (or type 'exit' to quit): ";

/// Printed when the source folder produced nothing to search.
pub const EMPTY_CORPUS_MESSAGE: &str = "No documents could be processed. Stopping.";

/// Printed when no chunk could be embedded.
pub const EMPTY_EMBEDDINGS_MESSAGE: &str = "Failed to create embeddings. Make sure Ollama is \
     running and the embedding model has been pulled. Stopping.";

/// What a line of input asks the console to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Leave the loop.
    Exit,
    /// Blank input; prompt again.
    Skip,
    /// Answer this question.
    Query(String),
}

impl Command {
    /// Classify one line of user input.
    pub fn classify(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            Command::Skip
        } else if EXIT_COMMANDS.iter().any(|cmd| trimmed.eq_ignore_ascii_case(cmd)) {
            Command::Exit
        } else {
            Command::Query(trimmed.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleState {
    AwaitingInput,
    Terminated,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The user left the loop.
    Completed,
    /// Startup found nothing to search; the loop never ran.
    Halted,
}

/// Display options for answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleOptions {
    /// List the retrieved chunks and their scores after each answer.
    pub show_sources: bool,
}

/// A source of user input lines.
pub trait LineSource {
    /// Read one line. `Ok(None)` means end of input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Reads lines from the terminal with history and line editing.
pub struct EditorLineSource {
    editor: DefaultEditor,
}

impl EditorLineSource {
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new().context("Failed to initialize readline")?;
        Ok(Self { editor })
    }
}

impl LineSource for EditorLineSource {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            // Ctrl-C and Ctrl-D both end the session.
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err).context("Failed to read input"),
        }
    }
}

/// Reads lines from any buffered reader, e.g. piped stdin or a test buffer.
pub struct ReaderLineSource<R> {
    reader: R,
}

impl<R: BufRead> ReaderLineSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for ReaderLineSource<R> {
    fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).context("Failed to read input")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Load, chunk, and embed the source folder, reporting progress to `out`.
///
/// Returns `Ok(None)` after printing a message when there is nothing to
/// search: the folder is unreadable, yields no chunks, or no chunk could be
/// embedded.
pub async fn startup<W: Write>(
    pipeline: &RagPipeline,
    out: &mut W,
) -> Result<Option<KnowledgeBase>> {
    let config = pipeline.config();
    writeln!(out, "Reading documents from: {}", config.source_folder.display())?;

    let report = match pipeline.load_documents() {
        Ok(report) => report,
        Err(e) => {
            warn!(error = %e, "source folder unreadable");
            writeln!(out, "Could not read {}: {e}", config.source_folder.display())?;
            writeln!(out, "{EMPTY_CORPUS_MESSAGE}")?;
            return Ok(None);
        }
    };
    for document in &report.documents {
        writeln!(out, "  - Processed {}", document.id)?;
    }
    for failure in &report.failures {
        writeln!(out, "  ! Skipped {}: {}", failure.path.display(), failure.error)?;
    }

    writeln!(out, "Creating embeddings with model '{}'...", config.embedding_model)?;
    let (kb, index) = match pipeline.build_knowledge_base(&report.documents).await {
        Ok(built) => built,
        Err(RagError::EmptyCorpus { .. }) => {
            writeln!(out, "{EMPTY_CORPUS_MESSAGE}")?;
            return Ok(None);
        }
        Err(RagError::EmptyEmbeddingSet { .. }) => {
            writeln!(out, "{EMPTY_EMBEDDINGS_MESSAGE}")?;
            return Ok(None);
        }
        Err(e) => return Err(e).context("Failed to build the knowledge base"),
    };

    writeln!(out, "Indexed {} of {} chunks.", index.chunks_indexed, index.chunks_total)?;
    if index.chunks_dropped > 0 {
        writeln!(
            out,
            "  ! {} chunks could not be embedded and were left out.",
            index.chunks_dropped
        )?;
    }
    writeln!(out)?;
    Ok(Some(kb))
}

/// Run the question loop until the user exits or input ends.
pub async fn run_console<S: LineSource, W: Write>(
    pipeline: &RagPipeline,
    kb: &KnowledgeBase,
    source: &mut S,
    out: &mut W,
    options: ConsoleOptions,
) -> Result<()> {
    let mut state = ConsoleState::AwaitingInput;
    while state == ConsoleState::AwaitingInput {
        state = step(pipeline, kb, source, out, options).await?;
    }
    info!("console terminated");
    Ok(())
}

async fn step<S: LineSource, W: Write>(
    pipeline: &RagPipeline,
    kb: &KnowledgeBase,
    source: &mut S,
    out: &mut W,
    options: ConsoleOptions,
) -> Result<ConsoleState> {
    let Some(line) = source.read_line(PROMPT)? else {
        return Ok(ConsoleState::Terminated);
    };

    let query = match Command::classify(&line) {
        Command::Exit => return Ok(ConsoleState::Terminated),
        Command::Skip => return Ok(ConsoleState::AwaitingInput),
        Command::Query(query) => query,
    };

    match pipeline.answer(kb, &query).await {
        Ok(answer) => print_answer(out, &answer, options)?,
        Err(e) => writeln!(out, "Could not process the question: {e}\n")?,
    }
    Ok(ConsoleState::AwaitingInput)
}

fn print_answer<W: Write>(out: &mut W, answer: &Answer, options: ConsoleOptions) -> Result<()> {
    writeln!(out, "--- Answer ---")?;
    writeln!(out, "{}", answer.text)?;
    if options.show_sources {
        writeln!(out, "--- Sources ---")?;
        for (rank, source) in answer.sources.iter().enumerate() {
            writeln!(out, "  [{}] {} (score {:.4})", rank + 1, source.chunk.id, source.score)?;
        }
    }
    writeln!(out, "--------------\n")?;
    out.flush()?;
    Ok(())
}

/// Start up and, if there is something to search, run the console.
pub async fn run_session<S: LineSource, W: Write>(
    pipeline: &RagPipeline,
    source: &mut S,
    out: &mut W,
    options: ConsoleOptions,
) -> Result<SessionOutcome> {
    let Some(kb) = startup(pipeline, out).await? else {
        return Ok(SessionOutcome::Halted);
    };
    run_console(pipeline, &kb, source, out, options).await?;
    Ok(SessionOutcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_case_insensitive() {
        assert_eq!(Command::classify("keluar"), Command::Exit);
        assert_eq!(Command::classify("  KELUAR \n"), Command::Exit);
        assert_eq!(Command::classify("Exit"), Command::Exit);
        assert_eq!(Command::classify("quit"), Command::Exit);
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(Command::classify(""), Command::Skip);
        assert_eq!(Command::classify(" \t "), Command::Skip);
    }

    #[test]
    fn other_text_is_a_query() {
        assert_eq!(
            Command::classify("  what is exit velocity? "),
            Command::Query("what is exit velocity?".to_string())
        );
    }

    #[test]
    fn reader_source_strips_line_endings_and_reports_eof() {
        let mut source = ReaderLineSource::new("first\r\nsecond\n".as_bytes());
        assert_eq!(source.read_line(PROMPT).unwrap().as_deref(), Some("first"));
        assert_eq!(source.read_line(PROMPT).unwrap().as_deref(), Some("second"));
        assert_eq!(source.read_line(PROMPT).unwrap(), None);
    }
}
