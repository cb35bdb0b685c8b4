// src/core/expander.rs

//! Streaming expansion of `$NAME$`-style placeholders.
//!
//! The caller supplies a resolver that writes a placeholder's value straight
//! into the output and reports how many code units the value needs. When the
//! value does not fit, the output grows and the resolver is asked again, so a
//! resolver must give the same answer for the same name and context.

use crate::constants::{DEFAULT_EXPAND_CAPACITY, ESCAPE_CHAR, EXPAND_GROWTH_FACTOR};
use crate::core::string_view::{StringView, ViewError};

/// The window of the output buffer a resolver may write into.
#[derive(Debug)]
pub struct ExpandOutput<'a> {
    buffer: &'a mut String,
    limit: usize,
    written: usize,
}

impl ExpandOutput<'_> {
    /// Code units that can still be written.
    pub fn remaining(&self) -> usize {
        self.limit - self.written
    }

    /// Writes `text` if it fits entirely. Returns the length `text` needs either
    /// way, so a resolver can return the sum of its writes.
    pub fn write_str(&mut self, text: &str) -> usize {
        if text.len() <= self.remaining() {
            self.buffer.push_str(text);
            self.written += text.len();
        }
        text.len()
    }

    /// Writes one character if it fits. Returns the length it needs.
    pub fn push(&mut self, c: char) -> usize {
        let mut utf8 = [0u8; 4];
        self.write_str(c.encode_utf8(&mut utf8))
    }
}

/// Output buffer with the explicit capacity discipline of a fixed-size view:
/// one code unit is always held back for the terminator.
struct Growable {
    buffer: String,
    capacity: usize,
}

impl Growable {
    fn room(&self) -> usize {
        self.capacity.saturating_sub(self.buffer.len() + 1)
    }

    /// Grows by the growth factor until `required` code units (terminator
    /// included) fit.
    fn grow_to(&mut self, required: usize) -> Result<(), ViewError> {
        let mut capacity = self.capacity.max(1);
        while capacity < required {
            capacity = capacity
                .checked_mul(EXPAND_GROWTH_FACTOR)
                .ok_or(ViewError::Allocation { requested: required })?;
        }
        self.buffer
            .try_reserve_exact(capacity - self.buffer.len())
            .map_err(|_| ViewError::Allocation {
                requested: capacity,
            })?;
        log::trace!(
            "Grew expansion buffer from {} to {} code units.",
            self.capacity,
            capacity
        );
        self.capacity = capacity;
        Ok(())
    }

    fn push_str(&mut self, text: &str) -> Result<(), ViewError> {
        if text.len() > self.room() {
            self.grow_to(self.buffer.len() + text.len() + 1)?;
        }
        self.buffer.push_str(text);
        Ok(())
    }

    fn push(&mut self, c: char) -> Result<(), ViewError> {
        let mut utf8 = [0u8; 4];
        self.push_str(c.encode_utf8(&mut utf8))
    }
}

/// Expands every `delimiter NAME delimiter` placeholder in `template` through
/// `resolver`, writing the result to `output`.
///
/// A `^` makes the next character plain data, so `^$` never opens or closes a
/// placeholder; the `^` itself is kept only with `preserve_escapes`. The name
/// handed to the resolver is the raw text between the delimiters. A placeholder
/// with no closing delimiter runs to the end of the template.
///
/// `output` keeps its capacity if it exclusively owns a buffer; otherwise it
/// starts at [`DEFAULT_EXPAND_CAPACITY`]. On success it is null-terminated. On
/// failure it is left as it was.
pub fn expand<C, F>(
    template: &str,
    delimiter: char,
    preserve_escapes: bool,
    resolver: F,
    context: &C,
    output: &mut StringView,
) -> Result<(), ViewError>
where
    C: ?Sized,
    F: Fn(&str, &mut ExpandOutput<'_>, &C) -> usize,
{
    let initial = match output.capacity() {
        0 => DEFAULT_EXPAND_CAPACITY,
        capacity if !output.is_shared() => capacity,
        _ => DEFAULT_EXPAND_CAPACITY,
    };
    let mut out = Growable {
        buffer: String::new(),
        capacity: 0,
    };
    out.grow_to(initial)?;

    let mut chars = template.char_indices().peekable();
    while let Some((index, c)) = chars.next() {
        if c == ESCAPE_CHAR {
            if preserve_escapes {
                out.push(c)?;
            }
            if let Some((_, escaped)) = chars.next() {
                out.push(escaped)?;
            }
            continue;
        }

        if c != delimiter {
            out.push(c)?;
            continue;
        }

        let name_start = index + c.len_utf8();
        let mut name_end = template.len();
        while let Some((position, n)) = chars.next() {
            if n == ESCAPE_CHAR {
                chars.next();
            } else if n == delimiter {
                name_end = position;
                break;
            }
        }
        let name = template.get(name_start..name_end).unwrap_or_default();
        if name_end == template.len() {
            log::debug!("Unterminated placeholder {:?}; resolving partial name.", name);
        }
        resolve_into(&mut out, name, &resolver, context)?;
    }

    // `room()` always held one unit back, so the terminator fits without growing.
    let mut view = StringView::from_string(out.buffer);
    view.null_terminate()?;
    *output = view;
    Ok(())
}

fn resolve_into<C, F>(
    out: &mut Growable,
    name: &str,
    resolver: &F,
    context: &C,
) -> Result<(), ViewError>
where
    C: ?Sized,
    F: Fn(&str, &mut ExpandOutput<'_>, &C) -> usize,
{
    loop {
        let mark = out.buffer.len();
        let room = out.room();
        let needed = {
            let mut window = ExpandOutput {
                buffer: &mut out.buffer,
                limit: room,
                written: 0,
            };
            resolver(name, &mut window, context)
        };
        if needed <= room {
            return Ok(());
        }
        out.buffer.truncate(mark);
        log::trace!(
            "Resolver for {:?} needs {} code units, {} available; retrying.",
            name,
            needed,
            room
        );
        out.grow_to(mark + needed + 1)?;
    }
}

/// [`expand`] into a fresh `String`.
pub fn expand_to_string<C, F>(
    template: &str,
    delimiter: char,
    preserve_escapes: bool,
    resolver: F,
    context: &C,
) -> Result<String, ViewError>
where
    C: ?Sized,
    F: Fn(&str, &mut ExpandOutput<'_>, &C) -> usize,
{
    let mut output = StringView::new();
    expand(
        template,
        delimiter,
        preserve_escapes,
        resolver,
        context,
        &mut output,
    )?;
    Ok(output.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;

    fn lookup(name: &str, out: &mut ExpandOutput<'_>, vars: &HashMap<&str, String>) -> usize {
        match vars.get(name) {
            Some(value) => out.write_str(value),
            None => 0,
        }
    }

    fn vars(pairs: &[(&'static str, &str)]) -> HashMap<&'static str, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn test_expand_without_placeholders_is_identity() {
        let template = "plain text, no markers at all";
        let result = expand_to_string(template, '$', false, lookup, &vars(&[])).unwrap();
        assert_eq!(result, template);
    }

    #[test]
    fn test_expand_substitutes_placeholders() {
        let ctx = vars(&[("USER", "ada"), ("HOST", "engine")]);
        let result = expand_to_string("$USER$@$HOST$:~", '$', false, lookup, &ctx).unwrap();
        assert_eq!(result, "ada@engine:~");
    }

    #[test]
    fn test_expand_escape_consumption() {
        let ctx = vars(&[("X", "nope")]);
        let dropped = expand_to_string("a^$X^$ ^^ ^b", '$', false, lookup, &ctx).unwrap();
        assert_eq!(dropped, "a$X$ ^ b");

        let kept = expand_to_string("a^$X^$ ^^ ^b", '$', true, lookup, &ctx).unwrap();
        assert_eq!(kept, "a^$X^$ ^^ ^b");
    }

    #[test]
    fn test_expand_escaped_delimiter_inside_name_is_raw() {
        let ctx = vars(&[("a^$b", "odd")]);
        let result = expand_to_string("[$a^$b$]", '$', false, lookup, &ctx).unwrap();
        assert_eq!(result, "[odd]");
    }

    #[test]
    fn test_expand_unterminated_placeholder_resolves_partial_name() {
        let seen = Cell::new(None::<String>);
        let resolver = |name: &str, out: &mut ExpandOutput<'_>, seen: &Cell<Option<String>>| {
            seen.set(Some(name.to_string()));
            out.write_str("<v>")
        };
        let result = expand_to_string("head $TAIL", '$', false, resolver, &seen).unwrap();
        assert_eq!(result, "head <v>");
        assert_eq!(seen.take().as_deref(), Some("TAIL"));
    }

    #[test]
    fn test_expand_custom_delimiter() {
        let ctx = vars(&[("PATH", "/bin")]);
        let result = expand_to_string("%PATH%;$PATH$", '%', false, lookup, &ctx).unwrap();
        assert_eq!(result, "/bin;$PATH$");
    }

    #[test]
    fn test_expand_grows_and_retries_resolver() {
        // --- Setup ---
        let long = "x".repeat(300);
        let calls = Cell::new(0usize);
        let resolver = |name: &str, out: &mut ExpandOutput<'_>, ctx: &(String, Cell<usize>)| {
            assert_eq!(name, "NAME");
            ctx.1.set(ctx.1.get() + 1);
            out.write_str(&ctx.0)
        };
        let ctx = (long.clone(), calls);
        let mut output = StringView::new();

        // --- Execute ---
        expand("prefix $NAME$ suffix", '$', false, resolver, &ctx, &mut output).unwrap();

        // --- Assert ---
        assert_eq!(output.as_str(), format!("prefix {long} suffix"));
        assert_eq!(ctx.1.get(), 2, "first attempt must not fit in 256");
        assert!(output.capacity() >= DEFAULT_EXPAND_CAPACITY * EXPAND_GROWTH_FACTOR);
        assert!(output.is_null_terminated());
    }

    #[test]
    fn test_expand_grows_for_long_literals() {
        let template = "y".repeat(1000);
        let result = expand_to_string(&template, '$', false, lookup, &vars(&[])).unwrap();
        assert_eq!(result, template);
    }

    #[test]
    fn test_expand_reuses_callers_capacity() {
        let mut output = StringView::new();
        output.allocate(4096).unwrap();
        let calls = Cell::new(0usize);
        let resolver = |_: &str, out: &mut ExpandOutput<'_>, calls: &Cell<usize>| {
            calls.set(calls.get() + 1);
            out.write_str(&"z".repeat(1000))
        };
        expand("$V$", '$', false, resolver, &calls, &mut output).unwrap();
        assert_eq!(output.len(), 1000);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_expand_trailing_escape() {
        let result = expand_to_string("end^", '$', true, lookup, &vars(&[])).unwrap();
        assert_eq!(result, "end^");
        let result = expand_to_string("end^", '$', false, lookup, &vars(&[])).unwrap();
        assert_eq!(result, "end");
    }
}
