use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::error::AppError;

pub type Context = BTreeMap<String, String>;

#[derive(Debug, PartialEq)]
enum Node {
    Text(String),
    Var(String),
}

/// A parsed template: literal text interleaved with `{{ name }}` lookups.
#[derive(Debug)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(name: &str, source: &str) -> Result<Self, AppError> {
        let mut nodes = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find('{') {
            let tag = &rest[start..];
            let (close, is_comment) = if tag.starts_with("{{") {
                ("}}", false)
            } else if tag.starts_with("{#") {
                ("#}", true)
            } else if tag.starts_with("{%") {
                let body = tag[2..].split("%}").next().unwrap_or("").trim();
                return Err(syntax_error(
                    name,
                    source,
                    offset + start,
                    format!("Invalid block tag '{}'", body),
                ));
            } else {
                // A lone brace is ordinary text.
                push_text(&mut nodes, &rest[..start + 1]);
                rest = &rest[start + 1..];
                offset += start + 1;
                continue;
            };

            push_text(&mut nodes, &rest[..start]);
            let Some(end) = tag[2..].find(close) else {
                return Err(syntax_error(
                    name,
                    source,
                    offset + start,
                    format!("Unclosed tag, expected '{}'", close),
                ));
            };

            if !is_comment {
                let var = tag[2..2 + end].trim();
                if var.is_empty() {
                    return Err(syntax_error(
                        name,
                        source,
                        offset + start,
                        "Empty variable tag".to_string(),
                    ));
                }
                if !var
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
                {
                    return Err(syntax_error(
                        name,
                        source,
                        offset + start,
                        format!("Could not parse the remainder: '{}'", var),
                    ));
                }
                nodes.push(Node::Var(var.to_string()));
            }

            let consumed = start + 2 + end + close.len();
            rest = &rest[consumed..];
            offset += consumed;
        }
        push_text(&mut nodes, rest);

        Ok(Template { nodes })
    }

    /// Missing variables render as the empty string; values are HTML-escaped.
    pub fn render(&self, context: &Context) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Var(var) => {
                    if let Some(value) = context.get(var) {
                        out.push_str(&maud::html! { (value) }.into_string());
                    }
                }
            }
        }
        out
    }
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(last)) = nodes.last_mut() {
        last.push_str(text);
    } else {
        nodes.push(Node::Text(text.to_string()));
    }
}

fn syntax_error(name: &str, source: &str, at: usize, message: String) -> AppError {
    AppError::TemplateSyntax {
        template: name.to_string(),
        line: source[..at].matches('\n').count() + 1,
        message,
    }
}

/// Loads templates from a directory on every render.
#[derive(Clone, Debug)]
pub struct Templates {
    dir: PathBuf,
}

impl Templates {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Templates { dir: dir.into() }
    }

    pub async fn render(&self, name: &str, context: &Context) -> Result<String, AppError> {
        let relative = Path::new(name);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(AppError::TemplateNotFound(name.to_string()));
        }

        let source = match tokio::fs::read_to_string(self.dir.join(relative)).await {
            Ok(source) => source,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::TemplateNotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Template::parse(name, &source)?.render(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(pairs: &[(&str, &str)]) -> Context {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_and_escapes_variables() {
        let template = Template::parse("t", "<p>{{ path }}</p>{{missing}}").unwrap();
        let out = template.render(&context(&[("path", "/a?b=<c>&d")]));
        assert_eq!(out, "<p>/a?b=&lt;c&gt;&amp;d</p>");
    }

    #[test]
    fn comments_and_lone_braces_pass_through() {
        let template = Template::parse("t", "a {# note #}b { c }").unwrap();
        assert_eq!(template.render(&Context::new()), "a b { c }");
    }

    #[test]
    fn unclosed_tag_reports_line() {
        let err = Template::parse("home.html", "one\ntwo {{ path\n").unwrap_err();
        assert!(err.is_template_syntax());
        match err {
            AppError::TemplateSyntax { template, line, .. } => {
                assert_eq!(template, "home.html");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_block_tags_and_bad_names() {
        assert!(Template::parse("t", "{% if x %}y{% endif %}").unwrap_err().is_template_syntax());
        assert!(Template::parse("t", "{{ }}").unwrap_err().is_template_syntax());
        assert!(Template::parse("t", "{{ a|upper }}").unwrap_err().is_template_syntax());
    }

    #[tokio::test]
    async fn missing_or_escaping_template_is_not_found() {
        let templates = Templates::new(concat!(env!("CARGO_MANIFEST_DIR"), "/web/templates"));
        let err = templates.render("nope.html", &Context::new()).await.unwrap_err();
        assert_eq!(err.kind(), "TemplateDoesNotExist");

        let err = templates.render("../../Cargo.toml", &Context::new()).await.unwrap_err();
        assert_eq!(err.kind(), "TemplateDoesNotExist");
    }

    #[tokio::test]
    async fn renders_home_from_disk() {
        let templates = Templates::new(concat!(env!("CARGO_MANIFEST_DIR"), "/web/templates"));
        let out = templates
            .render("home.html", &context(&[("static_url", "/static")]))
            .await
            .unwrap();
        assert!(out.contains("/static/site.css"));
    }
}
