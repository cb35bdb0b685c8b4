// src/core/cmdline.rs

//! Conversion between a flat command line and an argument vector.
//!
//! The rules are the ones a C runtime applies when it splits a process command
//! line: spaces separate arguments, `"` toggles quoting without being kept, and
//! backslashes only mean something when a run of them is followed by `"`.
//! [`assemble`] inverts [`tokenize`]: with quoting and child-process escapes
//! enabled, `tokenize(assemble(args))` gives `args` back.

use crate::constants::ESCAPE_CHAR;
use crate::core::string_view::{StringView, ViewError};
use std::sync::Arc;

/// The arguments produced by [`tokenize`].
///
/// Every argument is a view into one shared buffer laid out as
/// `arg0 NUL arg1 NUL ...`, so each one is null-terminated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgList {
    args: Vec<StringView>,
}

impl ArgList {
    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// True when the line held no arguments.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// The argument at `index`, if there is one.
    pub fn get(&self, index: usize) -> Option<&StringView> {
        self.args.get(index)
    }

    /// Iterates the arguments in order.
    pub fn iter(&self) -> std::slice::Iter<'_, StringView> {
        self.args.iter()
    }

    /// The arguments as a slice of views.
    pub fn as_slice(&self) -> &[StringView] {
        &self.args
    }

    /// Copies the arguments out into owned strings.
    pub fn to_strings(&self) -> Vec<String> {
        self.args.iter().map(|arg| arg.as_str().to_string()).collect()
    }
}

impl IntoIterator for ArgList {
    type Item = StringView;
    type IntoIter = std::vec::IntoIter<StringView>;

    fn into_iter(self) -> Self::IntoIter {
        self.args.into_iter()
    }
}

impl<'a> IntoIterator for &'a ArgList {
    type Item = &'a StringView;
    type IntoIter = std::slice::Iter<'a, StringView>;

    fn into_iter(self) -> Self::IntoIter {
        self.args.iter()
    }
}

// --- Tokenizer (line -> arguments) ---

/// Receives the characters and argument boundaries found by [`scan_line`].
/// The measuring pass and the emitting pass share the scanner, so both see
/// exactly the same boundaries.
trait ArgSink {
    fn push(&mut self, c: char);
    fn push_repeat(&mut self, c: char, count: usize) {
        for _ in 0..count {
            self.push(c);
        }
    }
    fn end_arg(&mut self);
}

/// First pass: how many arguments, and how many code units (terminators included).
#[derive(Default)]
struct Measure {
    args: usize,
    units: usize,
}

impl ArgSink for Measure {
    fn push(&mut self, c: char) {
        self.units += c.len_utf8();
    }

    fn push_repeat(&mut self, c: char, count: usize) {
        self.units += c.len_utf8() * count;
    }

    fn end_arg(&mut self) {
        self.args += 1;
        self.units += 1;
    }
}

/// Second pass: writes into the single preallocated buffer.
struct Emit {
    buffer: String,
    spans: Vec<(usize, usize)>,
    arg_start: usize,
}

impl ArgSink for Emit {
    fn push(&mut self, c: char) {
        self.buffer.push(c);
    }

    fn end_arg(&mut self) {
        let len = self.buffer.len() - self.arg_start;
        self.spans.push((self.arg_start, len));
        self.buffer.push('\0');
        self.arg_start = self.buffer.len();
    }
}

/// Splits `line` into at most `max_args` arguments.
///
/// Once `max_args - 1` arguments have been committed, unquoted spaces no longer
/// separate: the rest of the line joins the final argument. With
/// `caret_escapes`, a `^` and the character after it are copied through
/// untouched, so shell builtins still see the user's escapes.
///
/// The line ends at the first NUL if it contains one. An allocation failure is
/// reported before any output exists.
pub fn tokenize(line: &str, max_args: usize, caret_escapes: bool) -> Result<ArgList, ViewError> {
    let line = match line.find('\0') {
        Some(end) => line.get(..end).unwrap_or_default(),
        None => line,
    };

    let mut measure = Measure::default();
    scan_line(line, max_args, caret_escapes, &mut measure);
    if measure.args == 0 {
        return Ok(ArgList::default());
    }

    let mut buffer = String::new();
    buffer
        .try_reserve_exact(measure.units)
        .map_err(|_| ViewError::Allocation {
            requested: measure.units,
        })?;
    let mut emit = Emit {
        buffer,
        spans: Vec::with_capacity(measure.args),
        arg_start: 0,
    };
    scan_line(line, max_args, caret_escapes, &mut emit);
    debug_assert_eq!(emit.spans.len(), measure.args);
    debug_assert_eq!(emit.buffer.len(), measure.units);

    let buffer = Arc::new(emit.buffer);
    let args = emit
        .spans
        .into_iter()
        .map(|(start, len)| StringView::shared(&buffer, start, len))
        .collect();
    log::trace!("Tokenized {} argument(s) from {:?}", measure.args, line);
    Ok(ArgList { args })
}

/// [`tokenize`] without an argument limit or caret escapes.
pub fn tokenize_all(line: &str) -> Result<ArgList, ViewError> {
    tokenize(line, usize::MAX, false)
}

fn scan_line<S: ArgSink>(line: &str, max_args: usize, caret_escapes: bool, sink: &mut S) {
    if max_args == 0 {
        return;
    }

    let mut chars = line.chars().peekable();
    let mut committed = 0usize;
    let mut in_arg = false;
    let mut quote_open = false;

    while let Some(c) = chars.next() {
        if !in_arg {
            if c == ' ' {
                continue;
            }
            in_arg = true;
        }

        match c {
            ESCAPE_CHAR if caret_escapes => {
                sink.push(c);
                if let Some(escaped) = chars.next() {
                    sink.push(escaped);
                }
            }
            '\\' => {
                let mut run = 1usize;
                while chars.next_if_eq(&'\\').is_some() {
                    run += 1;
                }
                if chars.next_if_eq(&'"').is_some() {
                    sink.push_repeat('\\', run / 2);
                    if run % 2 == 1 {
                        sink.push('"');
                    } else {
                        quote_open = !quote_open;
                    }
                } else {
                    sink.push_repeat('\\', run);
                }
            }
            '"' => quote_open = !quote_open,
            ' ' if !quote_open && committed.saturating_add(1) < max_args => {
                sink.end_arg();
                committed += 1;
                in_arg = false;
            }
            _ => sink.push(c),
        }
    }

    if in_arg {
        sink.end_arg();
    }
}

// --- Assembler (arguments -> line) ---

trait LineSink {
    fn push(&mut self, c: char);
    fn push_repeat(&mut self, c: char, count: usize) {
        for _ in 0..count {
            self.push(c);
        }
    }
    fn push_str(&mut self, s: &str) {
        s.chars().for_each(|c| self.push(c));
    }
}

struct Count(usize);

impl LineSink for Count {
    fn push(&mut self, c: char) {
        self.0 += c.len_utf8();
    }

    fn push_repeat(&mut self, c: char, count: usize) {
        self.0 += c.len_utf8() * count;
    }

    fn push_str(&mut self, s: &str) {
        self.0 += s.len();
    }
}

impl LineSink for String {
    fn push(&mut self, c: char) {
        String::push(self, c);
    }

    fn push_str(&mut self, s: &str) {
        String::push_str(self, s);
    }
}

/// Builds the command line a child process will split back into `args`.
///
/// With `enclose_in_quotes`, an argument is wrapped in `"` when it is empty or
/// contains a space, and also when it contains a `"` that is being escaped.
/// Without child-process escapes, an argument that already starts with `"` is
/// taken to be quoted by the caller and left alone. With
/// `apply_child_process_escapes`, backslashes in front of a `"` are doubled plus
/// one, trailing backslashes of a quoted argument are doubled, and every `"` in
/// the argument becomes literal.
///
/// The result is null-terminated and sized exactly in one allocation.
pub fn assemble<S: AsRef<str>>(
    args: &[S],
    enclose_in_quotes: bool,
    apply_child_process_escapes: bool,
) -> Result<StringView, ViewError> {
    let mut count = Count(0);
    write_line(args, enclose_in_quotes, apply_child_process_escapes, &mut count);

    let mut line = String::new();
    line.try_reserve_exact(count.0 + 1)
        .map_err(|_| ViewError::Allocation {
            requested: count.0 + 1,
        })?;
    write_line(args, enclose_in_quotes, apply_child_process_escapes, &mut line);
    debug_assert_eq!(line.len(), count.0);

    let mut view = StringView::from_string(line);
    view.null_terminate()?;
    Ok(view)
}

/// [`assemble`], returning a plain `String`.
pub fn assemble_strings<S: AsRef<str>>(
    args: &[S],
    enclose_in_quotes: bool,
    apply_child_process_escapes: bool,
) -> Result<String, ViewError> {
    assemble(args, enclose_in_quotes, apply_child_process_escapes).map(|view| view.to_string())
}

fn write_line<S: AsRef<str>, W: LineSink>(args: &[S], enclose: bool, escapes: bool, out: &mut W) {
    for (index, arg) in args.iter().enumerate() {
        if index > 0 {
            out.push(' ');
        }
        let arg = arg.as_ref();
        let quote = needs_quotes(arg, enclose, escapes);
        write_argument(arg, quote, escapes, out);
    }
}

fn needs_quotes(arg: &str, enclose: bool, escapes: bool) -> bool {
    if !enclose || (!escapes && arg.starts_with('"')) {
        return false;
    }
    arg.is_empty() || arg.contains(' ') || (escapes && arg.contains('"'))
}

fn write_argument<W: LineSink>(arg: &str, quote: bool, escapes: bool, out: &mut W) {
    if quote {
        out.push('"');
    }

    if escapes {
        let mut chars = arg.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    let mut run = 1usize;
                    while chars.next_if_eq(&'\\').is_some() {
                        run += 1;
                    }
                    if chars.next_if_eq(&'"').is_some() {
                        out.push_repeat('\\', 2 * run + 1);
                        out.push('"');
                    } else if chars.peek().is_none() && quote {
                        out.push_repeat('\\', 2 * run);
                    } else {
                        out.push_repeat('\\', run);
                    }
                }
                '"' => {
                    out.push('\\');
                    out.push('"');
                }
                _ => out.push(c),
            }
        }
    } else {
        out.push_str(arg);
    }

    if quote {
        out.push('"');
    }
}
