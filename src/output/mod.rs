//! Alert output templates
//!
//! `%field.name` and `%field[arg]` are replaced with the field's value for
//! the matching event, or `<NA>` when the field does not apply. `%%` is a
//! literal percent sign; any other `%` is passed through. Templates are
//! split into segments once, when the rule is compiled.

use crate::ast::Field;
use crate::event::FieldAccessor;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Rendered in place of a field that does not apply to the event
pub const NOT_APPLICABLE: &str = "<NA>";

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"%(%|[A-Za-z_][A-Za-z0-9_.]*(?:\[[^\]\s]*\])?)").expect("Invalid regex pattern")
});

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Field(Field),
}

/// A pre-split output template
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl OutputTemplate {
    /// Split a template into text and field segments
    pub fn compile(template: &str) -> Self {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(template) {
            let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            text.push_str(&template[last..whole.start()]);
            last = whole.end();

            if body.as_str() == "%" {
                text.push('%');
                continue;
            }
            // a sentence-ending period is not part of the field name
            let name = body.as_str();
            let trimmed = if name.ends_with(']') { name } else { name.trim_end_matches('.') };
            if !text.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut text)));
            }
            segments.push(Segment::Field(Field::parse(trimmed)));
            text.push_str(&name[trimmed.len()..]);
        }
        text.push_str(&template[last..]);
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Self {
            source: template.to_string(),
            segments,
        }
    }

    /// Template text as written
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Fields the template reads, in order of appearance
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field(f) => Some(f),
            Segment::Text(_) => None,
        })
    }

    /// Render for one event. Never fails.
    pub fn render<E: ?Sized, A: FieldAccessor<E> + ?Sized>(&self, accessor: &A, event: &E) -> String {
        let mut out = String::with_capacity(self.source.len() + 16);
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Field(field) => match accessor.get(field, event) {
                    Some(value) => out.push_str(&value.as_text()),
                    None => out.push_str(NOT_APPLICABLE),
                },
            }
        }
        out
    }
}

impl fmt::Display for OutputTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Compile and render a template in one step
pub fn format_output<E: ?Sized, A: FieldAccessor<E> + ?Sized>(template: &str, accessor: &A, event: &E) -> String {
    OutputTemplate::compile(template).render(accessor, event)
}
