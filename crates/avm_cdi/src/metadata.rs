//! Metadata mini-grammar (spec.md §4.4):
//!
//! ```text
//! tag    := '[' name ( '(' item (sep item)* ')' )? ']'
//! item   := string | string '=' string
//! sep    := ',' | ';'
//! string := <quoted with ' or "> | <bareword>
//! ```
//!
//! Built with `nom` combinators in the style of the teacher's
//! `attribute_parser.rs` (small composable parsers, `context` for error
//! messages) rather than a hand-rolled character scanner.

use nom::branch::alt;
use nom::bytes::complete::take_while1;
use nom::character::complete::{char, multispace0};
use nom::combinator::opt;
use nom::error::{context, VerboseError};
use nom::multi::separated_list1;
use nom::sequence::{delimited, preceded, terminated};
use nom::{Err as NomErr, IResult};

use crate::errors::LoadError;

type PResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataItem {
    Indexed(String),
    KeyValue(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataTag {
    pub name: String,
    pub items: Vec<MetadataItem>,
}

fn ws(input: &str) -> PResult<&str> {
    multispace0(input)
}

fn is_bareword_terminator(c: char) -> bool {
    matches!(c, '(' | ')' | '[' | ']' | ',' | ';' | '\'' | '"' | '=' | '\\') || c.is_whitespace()
}

fn parse_bareword(input: &str) -> PResult<String> {
    let (rest, word) = take_while1(|c: char| !is_bareword_terminator(c))(input)?;
    Ok((rest, word.to_string()))
}

/// Quoted string with backslash escapes for `\`, `'`, `"` (spec.md §4.4
/// "Escape rules"); any other escaped character is kept literal including
/// the backslash.
fn parse_quoted_string(input: &str) -> PResult<String> {
    let (after_open, quote) = alt((char('\''), char('"')))(input)?;
    let mut result = String::new();
    let mut iter = after_open.char_indices();
    while let Some((i, c)) = iter.next() {
        if c == quote {
            let end = i + c.len_utf8();
            return Ok((&after_open[end..], result));
        }
        if c == '\\' {
            match iter.next() {
                Some((_, next)) if next == '\\' || next == '\'' || next == '"' => {
                    result.push(next);
                }
                Some((_, other)) => {
                    result.push('\\');
                    result.push(other);
                }
                None => {
                    return Err(NomErr::Failure(VerboseError::from_error_kind(
                        after_open,
                        nom::error::ErrorKind::Escaped,
                    )));
                }
            }
            continue;
        }
        result.push(c);
    }
    Err(NomErr::Failure(VerboseError::from_error_kind(
        after_open,
        nom::error::ErrorKind::Eof,
    )))
}

fn parse_string(input: &str) -> PResult<String> {
    context("string", alt((parse_quoted_string, parse_bareword)))(input)
}

fn parse_sep(input: &str) -> PResult<char> {
    alt((char(','), char(';')))(input)
}

fn parse_item(input: &str) -> PResult<MetadataItem> {
    context("metadata item", |i| {
        let (rest, first) = parse_string(i)?;
        let (rest, value) = opt(preceded(
            delimited(ws, char('='), ws),
            parse_string,
        ))(rest)?;
        Ok((
            rest,
            match value {
                Some(v) => MetadataItem::KeyValue(first, v),
                None => MetadataItem::Indexed(first),
            },
        ))
    })(input)
}

fn parse_tag(input: &str) -> PResult<MetadataTag> {
    context("metadata tag", |i| {
        let (rest, _) = preceded(ws, char('['))(i)?;
        let (rest, name) = preceded(ws, parse_bareword)(rest)?;
        let (rest, items) = opt(|i2| {
            let (r, _) = preceded(ws, char('('))(i2)?;
            let (r, items) = preceded(ws, separated_list1(delimited(ws, parse_sep, ws), parse_item))(r)?;
            let (r, _) = preceded(ws, char(')'))(r)?;
            Ok((r, items))
        })(rest)?;
        let (rest, _) = preceded(ws, char(']'))(rest)?;
        Ok((
            rest,
            MetadataTag {
                name,
                items: items.unwrap_or_default(),
            },
        ))
    })(input)
}

/// Parses one `[Tag(...)]` annotation, failing if trailing input remains.
pub fn parse_metadata_tag(input: &str) -> Result<MetadataTag, LoadError> {
    let (rest, tag) =
        terminated(parse_tag, ws)(input).map_err(|e| LoadError::MetadataSyntax(e.to_string()))?;
    if !rest.is_empty() {
        return Err(LoadError::MetadataSyntax(format!(
            "unexpected trailing input: {rest:?}"
        )));
    }
    Ok(tag)
}

/// Parses every raw metadata string a host source attached to a member,
/// surfacing a syntax error without otherwise interpreting the tags (CDI's
/// structural rules are driven by the host's already-digested declaration
/// flags, not by metadata content).
pub fn parse_member_metadata(raw: &[String]) -> Result<Vec<MetadataTag>, LoadError> {
    raw.iter().map(|s| parse_metadata_tag(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_tag() {
        let tag = parse_metadata_tag("[Serializable]").unwrap();
        assert_eq!(tag.name, "Serializable");
        assert!(tag.items.is_empty());
    }

    #[test]
    fn parses_indexed_and_keyvalue_items() {
        let tag = parse_metadata_tag("[Embed('assets/foo.png', mimeType=\"image/png\")]").unwrap();
        assert_eq!(tag.name, "Embed");
        assert_eq!(
            tag.items,
            vec![
                MetadataItem::Indexed("assets/foo.png".to_string()),
                MetadataItem::KeyValue("mimeType".to_string(), "image/png".to_string()),
            ]
        );
    }

    #[test]
    fn bareword_items_and_separators() {
        let tag = parse_metadata_tag("[Event(name=click; type=flash.events.MouseEvent)]").unwrap();
        assert_eq!(tag.items.len(), 2);
        assert_eq!(
            tag.items[1],
            MetadataItem::KeyValue("type".to_string(), "flash.events.MouseEvent".to_string())
        );
    }

    #[test]
    fn quoted_escape_rules() {
        let tag = parse_metadata_tag(r#"[Doc("a \"quote\" and a \\ backslash")]"#).unwrap();
        match &tag.items[0] {
            MetadataItem::Indexed(s) => assert_eq!(s, "a \"quote\" and a \\ backslash"),
            other => panic!("unexpected item: {other:?}"),
        }
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse_metadata_tag("[Foo] garbage").is_err());
    }

    #[test]
    fn rejects_unterminated_quote() {
        assert!(parse_metadata_tag("[Foo(\"unterminated)]").is_err());
    }
}
