//! Terminal host: montages written as PNG files, toggles typed on standard input

use crate::io::error::{Result, fs_error};
use crate::render::montage::export_page_png;
use crate::session::controller::FileChange;
use crate::session::host::{GridPage, HostEvent, ReviewHost};
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

const HELP: &str = "Commands:
  <n> [m ...]   toggle cells (ranges such as 3-7 work too)
  at <x> <y>    toggle the cell under a montage pixel
  done          accept this page and continue
  show          render the page again
  cancel        abandon the session, nothing is written
  help          show this text";

/// A parsed line of reviewer input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCommand {
    /// Events to feed the controller
    Events(Vec<HostEvent>),
    /// Toggle the cell under a montage pixel
    Click {
        /// Column of the pixel
        x: u32,
        /// Row of the pixel
        y: u32,
    },
    /// Render the current page again
    Show,
    /// Print the command summary
    Help,
}

/// Parse one input line
///
/// Cell numbers are 1-based as printed on the montage.
///
/// # Errors
///
/// Returns a message for the reviewer when the line is not understood
pub fn parse_command(line: &str) -> std::result::Result<TerminalCommand, String> {
    let line = line.trim().to_ascii_lowercase();
    match line.as_str() {
        "done" | "d" | "next" | "n" => return Ok(TerminalCommand::Events(vec![HostEvent::Complete])),
        "cancel" | "quit" | "q" => return Ok(TerminalCommand::Events(vec![HostEvent::Cancel])),
        "show" | "s" => return Ok(TerminalCommand::Show),
        "help" | "h" | "?" => return Ok(TerminalCommand::Help),
        _ => {}
    }

    if let Some(position) = line.strip_prefix("at ") {
        let coordinates: Vec<u32> = position
            .split([' ', ',', '\t'])
            .filter(|token| !token.is_empty())
            .map(str::parse)
            .collect::<std::result::Result<_, _>>()
            .map_err(|err| format!("'{}' is not a pixel position: {err}", position.trim()))?;
        return match coordinates.as_slice() {
            &[x, y] => Ok(TerminalCommand::Click { x, y }),
            _ => Err(format!("'{}' needs two pixel coordinates", position.trim())),
        };
    }

    let cell = |token: &str| match token.parse::<usize>() {
        Ok(number) if number > 0 => Ok(number - 1),
        _ => Err(format!("'{token}' is not a cell number, type 'help' for commands")),
    };

    let mut events = Vec::new();
    for token in line.split([' ', ',', '\t']).filter(|token| !token.is_empty()) {
        match token.split_once('-') {
            Some((first, last)) => {
                let (first, last) = (cell(first)?, cell(last)?);
                if first > last {
                    return Err(format!("range '{token}' is backwards"));
                }
                events.extend((first..=last).map(HostEvent::Toggle));
            }
            None => events.push(HostEvent::Toggle(cell(token)?)),
        }
    }
    Ok(TerminalCommand::Events(events))
}

/// Host reading commands from `input` and reporting on `output`
pub struct TerminalHost<R, W> {
    input: R,
    output: W,
    montage_dir: Option<PathBuf>,
    pending: VecDeque<HostEvent>,
    current: Option<GridPage>,
}

impl<R: BufRead, W: Write> TerminalHost<R, W> {
    /// Host saving montages into `montage_dir`
    pub const fn new(input: R, output: W, montage_dir: PathBuf) -> Self {
        Self {
            input,
            output,
            montage_dir: Some(montage_dir),
            pending: VecDeque::new(),
            current: None,
        }
    }

    /// Host that only prints cell numbers, without rendering montages
    pub const fn text_only(input: R, output: W) -> Self {
        Self {
            input,
            output,
            montage_dir: None,
            pending: VecDeque::new(),
            current: None,
        }
    }

    /// Give back the output stream
    pub fn into_output(self) -> W {
        self.output
    }

    fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{text}")
            .and_then(|()| self.output.flush())
            .map_err(fs_error(Path::new("<stdout>"), "write"))
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(fs_error(Path::new("<stdin>"), "read"))?;
        Ok((read > 0).then_some(line))
    }

    fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        write!(self.output, "{text}")
            .and_then(|()| self.output.flush())
            .map_err(fs_error(Path::new("<stdout>"), "write"))?;
        self.read_line()
    }

    fn montage_path(&self, page: &GridPage) -> Option<PathBuf> {
        self.montage_dir.as_ref().map(|dir| {
            dir.join(format!(
                "session-{}-page-{}.png",
                page.session, page.number
            ))
        })
    }
}

impl<R: BufRead, W: Write> ReviewHost for TerminalHost<R, W> {
    fn wants_pixels(&self) -> bool {
        self.montage_dir.is_some()
    }

    fn present(&mut self, page: &GridPage) -> Result<()> {
        let mut header = format!(
            "Session #{} page {}/{}: {} cells",
            page.session,
            page.number,
            page.page_count,
            page.len()
        );
        if let Some(path) = self.montage_path(page) {
            export_page_png(page, &path)?;
            header.push_str(&format!(", montage {}", path.display()));
        }
        self.say(&header)?;

        let marked = page.marked_labels();
        if !marked.is_empty() {
            self.say(&format!("  marked: {}", marked.join(" ")))?;
        }
        self.current = Some(page.clone());
        Ok(())
    }

    fn refresh(&mut self, page: &GridPage) -> Result<()> {
        if self.pending.is_empty() {
            self.present(page)
        } else {
            self.current = Some(page.clone());
            Ok(())
        }
    }

    fn next_event(&mut self) -> Result<HostEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(event);
            }
            let Some(line) = self.prompt("> ")? else {
                tracing::debug!("input closed, cancelling");
                return Ok(HostEvent::Cancel);
            };
            match parse_command(&line) {
                Ok(TerminalCommand::Events(events)) => self.pending.extend(events),
                Ok(TerminalCommand::Click { x, y }) => {
                    match self.current.as_ref().and_then(|page| page.cell_at(x, y)) {
                        Some(cell) => self.pending.push_back(HostEvent::Toggle(cell)),
                        None => self.say(&format!("No cell at pixel ({x}, {y})"))?,
                    }
                }
                Ok(TerminalCommand::Show) => {
                    if let Some(page) = self.current.take() {
                        self.present(&page)?;
                    }
                }
                Ok(TerminalCommand::Help) => self.say(HELP)?,
                Err(message) => self.say(&message)?,
            }
        }
    }

    fn confirm(&mut self, changes: &[FileChange]) -> Result<bool> {
        self.say("Pending changes:")?;
        for change in changes {
            let mut line = format!(
                "  {}: {} of {} ROIs rejected [{}]",
                change.path.display(),
                change.rejected.len(),
                change.records,
                change.rejected.join(", ")
            );
            if !change.restored.is_empty() {
                line.push_str(&format!(", restored [{}]", change.restored.join(", ")));
            }
            self.say(&line)?;
        }
        let answer = self.prompt("Write these changes? [y/N] ")?;
        Ok(answer.is_some_and(|answer| {
            matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
        }))
    }

    fn notify(&mut self, message: &str) -> Result<()> {
        self.say(message)
    }
}
