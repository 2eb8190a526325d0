//! Declarative tooltip templates.
//!
//! The analysis provider may request custom tooltip text. Templates are
//! plain placeholder substitution against the hovered record: `{field}`
//! inserts the field's value, `{{` and `}}` produce literal braces. There
//! is no code execution path, regardless of where the template came from.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::char,
    combinator::{all_consuming, map, verify},
    multi::many0,
    sequence::delimited,
    IResult,
};
use serde::{Serialize, Serializer};

use crate::data::Record;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
}

/// A parsed tooltip format. Serializes back to its source text so render
/// plans stay plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TooltipTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl TooltipTemplate {
    /// Parse template text. Fails on unbalanced braces and empty
    /// placeholders, with a reason suitable for an invalid-descriptor
    /// message.
    pub fn parse(input: &str) -> Result<Self, String> {
        match all_consuming(many0(segment))(input) {
            Ok((_, segments)) => Ok(Self {
                raw: input.to_string(),
                segments,
            }),
            Err(_) => Err(format!(
                "unbalanced braces or empty placeholder in \"{}\"",
                input
            )),
        }
    }

    /// Substitute placeholders with the record's values. A field missing
    /// from the record renders as empty text.
    pub fn format(&self, record: &Record) -> String {
        let mut out = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(name) => {
                    if let Some(value) = record.get(name) {
                        out.push_str(&value.to_string());
                    }
                }
            }
        }
        out
    }

    /// Field names referenced by the template, in order of appearance.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Field(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn source(&self) -> &str {
        &self.raw
    }
}

impl Serialize for TooltipTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

fn segment(input: &str) -> IResult<&str, Segment> {
    alt((escaped_open, escaped_close, placeholder, literal))(input)
}

fn literal(input: &str) -> IResult<&str, Segment> {
    map(take_while1(|c| c != '{' && c != '}'), |text: &str| {
        Segment::Literal(text.to_string())
    })(input)
}

fn escaped_open(input: &str) -> IResult<&str, Segment> {
    map(tag("{{"), |_| Segment::Literal("{".to_string()))(input)
}

fn escaped_close(input: &str) -> IResult<&str, Segment> {
    map(tag("}}"), |_| Segment::Literal("}".to_string()))(input)
}

fn placeholder(input: &str) -> IResult<&str, Segment> {
    map(
        verify(
            delimited(char('{'), take_while1(|c| c != '{' && c != '}'), char('}')),
            |name: &str| !name.trim().is_empty(),
        ),
        |name: &str| Segment::Field(name.trim().to_string()),
    )(input)
}
