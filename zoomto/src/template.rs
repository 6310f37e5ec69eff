//! Placeholder substitution for dataset filter templates.
//!
//! A template is plain text with `{name}` placeholders. `{{` and `}}` stand
//! for literal braces. Every placeholder must be resolved from the query
//! entry; an unresolved one is an error, never left in place.

use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TemplateError {
    #[error("filter placeholder '{0}' has no value in the query entry")]
    MissingField(String),

    #[error("unbalanced '{{' or '}}' in filter template at offset {0}")]
    Unbalanced(usize),

    #[error("empty placeholder in filter template at offset {0}")]
    EmptyPlaceholder(usize),
}

#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Literal(&'a str),
    Brace(char),
    Placeholder(&'a str),
}

/// A parsed filter template.
#[derive(Debug)]
pub struct FilterTemplate<'a> {
    segments: Vec<Segment<'a>>,
}

impl<'a> FilterTemplate<'a> {
    pub fn parse(template: &'a str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal_start = 0;
        let mut chars = template.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' | '}' if chars.peek().map(|(_, next)| *next) == Some(c) => {
                    chars.next();
                    push_literal(&mut segments, &template[literal_start..pos]);
                    segments.push(Segment::Brace(c));
                    literal_start = pos + 2;
                }
                '{' => {
                    push_literal(&mut segments, &template[literal_start..pos]);
                    let rest = &template[pos + 1..];
                    let end = rest.find(['{', '}']).ok_or(TemplateError::Unbalanced(pos))?;
                    if !rest[end..].starts_with('}') {
                        return Err(TemplateError::Unbalanced(pos));
                    }
                    let name = rest[..end].trim();
                    if name.is_empty() {
                        return Err(TemplateError::EmptyPlaceholder(pos));
                    }
                    segments.push(Segment::Placeholder(name));

                    // Skip past the closing brace
                    while let Some((p, _)) = chars.next() {
                        if p == pos + 1 + end {
                            break;
                        }
                    }
                    literal_start = pos + end + 2;
                }
                '}' => return Err(TemplateError::Unbalanced(pos)),
                _ => {}
            }
        }
        push_literal(&mut segments, &template[literal_start..]);

        Ok(FilterTemplate { segments })
    }

    /// Names of all placeholders, in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(*name),
            _ => None,
        })
    }

    /// Substitutes every placeholder with the matching field of `fields`.
    ///
    /// String values are inserted verbatim; other JSON values are inserted in
    /// their JSON text form.
    pub fn render(&self, fields: &Map<String, Value>) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Brace(c) => out.push(*c),
                Segment::Placeholder(name) => match fields.get(*name) {
                    Some(Value::String(s)) => out.push_str(s),
                    Some(other) => out.push_str(&other.to_string()),
                    None => return Err(TemplateError::MissingField((*name).to_string())),
                },
            }
        }
        Ok(out)
    }
}

fn push_literal<'a>(segments: &mut Vec<Segment<'a>>, text: &'a str) {
    if !text.is_empty() {
        segments.push(Segment::Literal(text));
    }
}

/// Parses and renders `template` in one step.
pub fn render(template: &str, fields: &Map<String, Value>) -> Result<String, TemplateError> {
    FilterTemplate::parse(template)?.render(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_render_filter() {
        let rendered = render(
            r#"[["id","=","{id}"]]"#,
            &fields(json!({"id": "42"})),
        )
        .unwrap();
        assert_eq!(rendered, r#"[["id","=","42"]]"#);
    }

    #[test]
    fn test_render_multiple_placeholders() {
        let template = r#"[["nummer", "=", "{parzelle_nr}"], "and", ["nbident", "=", "{grundbuch_nbident}"]]"#;
        let parsed = FilterTemplate::parse(template).unwrap();
        assert_eq!(
            parsed.placeholders().collect::<Vec<_>>(),
            vec!["parzelle_nr", "grundbuch_nbident"]
        );

        let rendered = parsed
            .render(&fields(json!({
                "parzelle_nr": "1234",
                "grundbuch_nbident": "SO0200002401",
                "unused": "ignored"
            })))
            .unwrap();
        assert_eq!(
            rendered,
            r#"[["nummer", "=", "1234"], "and", ["nbident", "=", "SO0200002401"]]"#
        );
    }

    #[test]
    fn test_non_string_values() {
        let rendered = render(
            r#"[["bfs_nr", "=", {bfs}]]"#,
            &fields(json!({"bfs": 2601})),
        )
        .unwrap();
        assert_eq!(rendered, r#"[["bfs_nr", "=", 2601]]"#);
    }

    #[test]
    fn test_escaped_braces() {
        let rendered = render("{{\"a\": \"{v}\"}}", &fields(json!({"v": "x"}))).unwrap();
        assert_eq!(rendered, "{\"a\": \"x\"}");
    }

    #[test]
    fn test_missing_field() {
        assert_eq!(
            render("[\"{id}\", \"{other}\"]", &fields(json!({"id": "1"}))),
            Err(TemplateError::MissingField("other".into()))
        );
    }

    #[test]
    fn test_malformed_templates() {
        assert_eq!(
            FilterTemplate::parse("[\"{id\"]").unwrap_err(),
            TemplateError::Unbalanced(2)
        );
        assert_eq!(
            FilterTemplate::parse("[\"id}\"]").unwrap_err(),
            TemplateError::Unbalanced(4)
        );
        assert_eq!(
            FilterTemplate::parse("{a{b}}").unwrap_err(),
            TemplateError::Unbalanced(0)
        );
        assert_eq!(
            FilterTemplate::parse("x{ }").unwrap_err(),
            TemplateError::EmptyPlaceholder(1)
        );
    }

    #[test]
    fn test_no_placeholders() {
        let parsed = FilterTemplate::parse("[[\"a\", \"=\", 1]]").unwrap();
        assert_eq!(parsed.placeholders().count(), 0);
        assert_eq!(
            parsed.render(&Map::new()).unwrap(),
            "[[\"a\", \"=\", 1]]"
        );
    }
}
