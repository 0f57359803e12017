//! Presentation rendering utilities for view handlers.
//!
//! A thin seam between view handlers and whatever produces markup: the
//! [`Renderer`] turns a named template plus optional data into HTML, and a
//! [`RenderTarget`] receives either escaped text or raw HTML. The bundled
//! [`StaticTemplates`] implementation does `{field}` substitution from a
//! JSON object, escaping every substituted value.

pub mod classes;

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Unknown template '{name}'")]
    UnknownTemplate { name: String },

    #[error("Template '{name}' references field '{field}' missing from the data")]
    MissingField { name: String, field: String },
}

/// Something markup or text can be injected into, scoped under a view
/// handler's mount point.
pub trait RenderTarget {
    /// Replace the target's content with escaped text.
    fn set_text(&mut self, text: &str);

    /// Replace the target's content with raw HTML.
    fn set_html(&mut self, html: &str);
}

/// Produces HTML from a named template and an optional data value.
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, data: Option<&Value>) -> Result<String, RenderError>;

    /// Render a template and inject the result into a target.
    fn render_into(
        &self,
        target: &mut dyn RenderTarget,
        template: &str,
        data: Option<&Value>,
    ) -> Result<(), RenderError> {
        let html = self.render(template, data)?;
        target.set_html(&html);
        Ok(())
    }
}

/// Registry of named templates with `{field}` placeholder substitution.
///
/// Substituted values are HTML-escaped; the template body itself is trusted
/// markup. `{{` and `}}` emit literal braces.
#[derive(Default)]
pub struct StaticTemplates {
    templates: HashMap<String, String>,
}

impl StaticTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, body: impl Into<String>) {
        self.templates.insert(name.into(), body.into());
    }
}

impl Renderer for StaticTemplates {
    fn render(&self, template: &str, data: Option<&Value>) -> Result<String, RenderError> {
        let body = self
            .templates
            .get(template)
            .ok_or_else(|| RenderError::UnknownTemplate {
                name: template.to_string(),
            })?;

        let mut out = String::with_capacity(body.len());
        let mut chars = body.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut field = String::new();
                    for c in chars.by_ref() {
                        if c == '}' {
                            break;
                        }
                        field.push(c);
                    }
                    let value = data
                        .and_then(|d| d.get(&field))
                        .ok_or_else(|| RenderError::MissingField {
                            name: template.to_string(),
                            field: field.clone(),
                        })?;
                    let text = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    out.push_str(&escape_html(&text));
                }
                _ => out.push(c),
            }
        }
        Ok(out)
    }
}

/// Escape text for safe inclusion in HTML content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn renderer() -> StaticTemplates {
        let mut templates = StaticTemplates::new();
        templates.add("row", "<li>{name} v{revision_string}</li>");
        templates.add("plain", "<p>static</p>");
        templates.add("braces", "{{literal}} {name}");
        templates
    }

    #[test]
    fn test_substitution_escapes_values() {
        let html = renderer()
            .render(
                "row",
                Some(&json!({"name": "<b>Skyblock</b>", "revision_string": "1.0"})),
            )
            .unwrap();
        assert_eq!(html, "<li>&lt;b&gt;Skyblock&lt;/b&gt; v1.0</li>");
    }

    #[test]
    fn test_non_string_values_render() {
        let mut templates = StaticTemplates::new();
        templates.add("t", "id={id}");
        assert_eq!(
            templates.render("t", Some(&json!({"id": 42}))).unwrap(),
            "id=42"
        );
    }

    #[test]
    fn test_literal_braces() {
        let html = renderer()
            .render("braces", Some(&json!({"name": "x"})))
            .unwrap();
        assert_eq!(html, "{literal} x");
    }

    #[test]
    fn test_unknown_template_and_missing_field() {
        let templates = renderer();
        assert!(matches!(
            templates.render("nope", None),
            Err(RenderError::UnknownTemplate { .. })
        ));
        assert!(matches!(
            templates.render("row", Some(&json!({"name": "x"}))),
            Err(RenderError::MissingField { .. })
        ));
        assert!(templates.render("plain", None).is_ok());
    }

    #[test]
    fn test_render_into_injects_html() {
        struct Sink(String);
        impl RenderTarget for Sink {
            fn set_text(&mut self, text: &str) {
                self.0 = escape_html(text);
            }
            fn set_html(&mut self, html: &str) {
                self.0 = html.to_string();
            }
        }

        let mut sink = Sink(String::new());
        renderer().render_into(&mut sink, "plain", None).unwrap();
        assert_eq!(sink.0, "<p>static</p>");

        sink.set_text("<script>");
        assert_eq!(sink.0, "&lt;script&gt;");
    }
}
