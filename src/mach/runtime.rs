use super::output::format_value;
use super::{Config, Flow, Output, Renderer, Storage, ValueId};
use crate::error;
use crate::lang::{parse_with, Error, ErrorList, Includes, Line, NoIncludes};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, warn};

/// ## Host interface
///
/// Holds the parsed program and the engine it runs on. Statements are
/// inserted as text, kept parsed, and run any number of times.

#[derive(Debug)]
pub struct Runtime {
    storage: Storage,
    lines: Vec<Line>,
    result: Option<ValueId>,
    includes: Box<dyn Includes>,
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new()
    }
}

impl Runtime {
    pub fn new() -> Runtime {
        Runtime::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Runtime {
        Runtime {
            storage: Storage::new(config),
            lines: vec![],
            result: None,
            includes: Box::new(NoIncludes),
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }

    /// Number of parsed top level statements.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Parse `text` and insert its statements before statement `pos`.
    /// Returns how many statements were added. A parse error leaves the
    /// program unchanged and is also recorded in `errors()`.
    pub fn insert_text(&mut self, text: &str, pos: usize) -> Result<usize, Error> {
        self.insert_parsed(text, &[], pos)
    }

    /// Where `#include` looks for files. Without one every include fails.
    pub fn set_includes<I: Includes + 'static>(&mut self, includes: I) {
        self.includes = Box::new(includes);
    }

    /// Insert the statements of file `name`, fetched like an include.
    pub fn insert_file(&mut self, name: &str, pos: usize) -> Result<usize, Error> {
        let text = match self.includes.fetch(name) {
            Some(text) => text,
            None => {
                let e = error!(IncludeNotFound; format!("File '{}' could not be found.", name));
                self.storage.errors_mut().push(e.clone());
                return Err(e);
            }
        };
        self.insert_parsed(&text, &[name.to_string()], pos)
    }

    fn insert_parsed(&mut self, text: &str, open: &[String], pos: usize) -> Result<usize, Error> {
        let lines = match parse_with(text, self.includes.as_ref(), open, &mut self.storage) {
            Ok(lines) => lines,
            Err(e) => {
                self.storage.errors_mut().push(e.clone());
                return Err(e);
            }
        };
        let count = lines.len();
        let pos = pos.min(self.lines.len());
        self.lines.splice(pos..pos, lines);
        debug!(count, pos, "inserted statements");
        Ok(count)
    }

    /// Drop `count` statements starting at `start` together with their
    /// literals.
    pub fn remove_lines(&mut self, start: usize, count: usize) {
        let start = start.min(self.lines.len());
        let end = start.saturating_add(count).min(self.lines.len());
        for line in self.lines.drain(start..end) {
            for id in line.literals {
                self.storage.release(id);
            }
        }
    }

    /// Run `count` statements starting at `start`. Execution stops at the
    /// first error, which is returned and recorded in `errors()`.
    pub fn run_code(&mut self, start: usize, count: usize) -> Result<(), Error> {
        let end = start.saturating_add(count).min(self.lines.len());
        for line in self.lines.iter().take(end).skip(start) {
            self.storage.reset_execution();
            debug!(line = ?line.number, "exec");
            match self.storage.exec_statement(&line.statement, true) {
                Ok((Flow::Break, _)) => {
                    warn!(line = ?line.number, "break outside of a loop");
                    break;
                }
                Ok((Flow::Next, kept)) => {
                    if let Some(id) = kept {
                        self.storage.forget_temp(id);
                        if let Some(old) = self.result.replace(id) {
                            self.storage.release(old);
                        }
                        let _ = self.storage.heap_mut().set_protected(id, false);
                    }
                }
                Err(e) if e.is_break() => {
                    warn!(line = ?line.number, "break outside of a loop");
                    break;
                }
                Err(e) => {
                    self.storage.reset_execution();
                    if let Some(old) = self.result.take() {
                        self.storage.release(old);
                    }
                    self.storage.errors_mut().push(e.clone());
                    return Err(e);
                }
            }
        }
        self.storage.reset_execution();
        Ok(())
    }

    /// Run the whole program from the top with a clean diagnostic log.
    pub fn run(&mut self) -> Result<(), Error> {
        self.storage.errors_mut().reset();
        let count = self.lines.len();
        self.run_code(0, count)
    }

    /// Append `text` to the program and run just the new statements.
    pub fn enter(&mut self, text: &str) -> Result<(), Error> {
        let start = self.lines.len();
        let count = self.insert_text(text, start)?;
        self.run_code(start, count)
    }

    pub fn errors(&self) -> &ErrorList {
        self.storage.errors()
    }

    pub fn errors_mut(&mut self) -> &mut ErrorList {
        self.storage.errors_mut()
    }

    pub fn take_output(&mut self) -> Vec<Output> {
        self.storage.take_output()
    }

    /// Text of the value the last statement run left behind.
    pub fn result_string(&self) -> Option<String> {
        let id = self.result?;
        format_value(self.storage.heap(), id).ok()
    }

    pub fn result_scalar(&self) -> Option<f64> {
        let id = self.result?;
        let precision = self.storage.sensitivity();
        self.storage.heap().cast_to_scalar(id, precision)
    }

    pub fn set_renderer(&mut self, renderer: Box<dyn Renderer>) {
        self.storage.set_renderer(renderer);
    }

    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.storage.interrupt_handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_survives_next_statement() {
        let mut r = Runtime::new();
        r.enter("3 + 4").unwrap();
        assert_eq!(r.result_scalar(), Some(7.0));
        r.enter("a = 1").unwrap();
        assert_eq!(r.result_string().as_deref(), Some("1"));
    }

    #[test]
    fn test_parse_error_keeps_program() {
        let mut r = Runtime::new();
        r.insert_text("a = 1;", 0).unwrap();
        assert!(r.insert_text("b = (1", 1).is_err());
        assert_eq!(r.line_count(), 1);
        assert_eq!(r.errors().len(), 1);
    }

    #[test]
    fn test_remove_lines_releases_literals() {
        let mut r = Runtime::new();
        let before = r.storage().heap().len();
        r.insert_text("1; 2; 3;", 0).unwrap();
        assert_eq!(r.line_count(), 3);
        r.remove_lines(0, 3);
        assert_eq!(r.storage().heap().len(), before);
    }
}
