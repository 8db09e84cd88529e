//! Just enough HTML reading for tests: anchors, forms and `http-equiv`
//! meta tags, matched with regular expressions rather than a full parser.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::http::{HttpMethod, http_method_from_str};

static ANCHOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>").expect("valid regex"));
static FORM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<form\b([^>]*)>(.*?)</form\s*>").expect("valid regex"));
static CONTROL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<input\b([^>]*)>|<textarea\b([^>]*)>(.*?)</textarea\s*>|<select\b([^>]*)>(.*?)</select\s*>")
        .expect("valid regex")
});
static OPTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<option\b([^>]*)>([^<]*)").expect("valid regex"));
static META_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<meta\b([^>]*)>").expect("valid regex"));
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)([a-z_:][-a-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>"']+))"#).expect("valid regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub text: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub name: Option<String>,
    pub id: Option<String>,
    /// Raw `action` attribute; empty means the page's own URL.
    pub action: String,
    pub method: HttpMethod,
    /// Successful controls in document order.
    pub fields: Vec<(String, String)>,
    /// Named submit buttons, sent only when clicked.
    pub buttons: Vec<(String, String)>,
}

impl Form {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets the first control called `name`, adding it when missing.
    pub fn set(&mut self, name: &str, value: &str) -> &mut Self {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.fields.push((name.to_string(), value.to_string())),
        }
        self
    }

    /// `application/x-www-form-urlencoded` data, with the named button when given.
    pub fn encode(&self, button: Option<&str>) -> String {
        let clicked = button.and_then(|b| self.buttons.iter().find(|(n, _)| n == b));
        self.fields
            .iter()
            .chain(clicked)
            .map(|(n, v)| format!("{}={}", urlencoding::encode(n), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn attrs(text: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(text)
        .map(|c| {
            let value = c.get(2).or(c.get(3)).or(c.get(4)).map_or("", |m| m.as_str());
            (c[1].to_ascii_lowercase(), unescape(value))
        })
        .collect()
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
}

fn has_flag(text: &str, flag: &str) -> bool {
    let cleaned = ATTR_RE.replace_all(text, "");
    cleaned
        .split(|c: char| c.is_whitespace() || c == '/')
        .any(|word| word.eq_ignore_ascii_case(flag))
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Visible text of an HTML fragment with whitespace collapsed.
pub fn text_of(fragment: &str) -> String {
    let stripped = TAG_RE.replace_all(fragment, " ");
    unescape(&SPACE_RE.replace_all(stripped.trim(), " "))
}

pub fn links(html: &str) -> Vec<Link> {
    ANCHOR_RE
        .captures_iter(html)
        .filter_map(|c| {
            let attrs = attrs(&c[1]);
            let href = attr(&attrs, "href")?.to_string();
            Some(Link {
                text: text_of(&c[2]),
                href,
            })
        })
        .collect()
}

pub fn forms(html: &str) -> Vec<Form> {
    FORM_RE
        .captures_iter(html)
        .map(|c| {
            let form_attrs = attrs(&c[1]);
            let mut form = Form {
                name: attr(&form_attrs, "name").map(str::to_string),
                id: attr(&form_attrs, "id").map(str::to_string),
                action: attr(&form_attrs, "action").unwrap_or_default().to_string(),
                method: http_method_from_str(attr(&form_attrs, "method").unwrap_or("GET")),
                fields: Vec::new(),
                buttons: Vec::new(),
            };
            read_controls(&c[2], &mut form);
            form
        })
        .collect()
}

fn read_controls(body: &str, form: &mut Form) {
    for c in CONTROL_RE.captures_iter(body) {
        if let Some(input) = c.get(1) {
            let a = attrs(input.as_str());
            let Some(name) = attr(&a, "name") else { continue };
            let value = attr(&a, "value");
            match attr(&a, "type").unwrap_or("text").to_ascii_lowercase().as_str() {
                "submit" | "image" => form
                    .buttons
                    .push((name.to_string(), value.unwrap_or("Submit").to_string())),
                "reset" | "button" | "file" => {}
                "checkbox" | "radio" => {
                    if has_flag(input.as_str(), "checked") {
                        form.fields.push((name.to_string(), value.unwrap_or("on").to_string()));
                    }
                }
                _ => form.fields.push((name.to_string(), value.unwrap_or_default().to_string())),
            }
        } else if let (Some(open), Some(content)) = (c.get(2), c.get(3)) {
            let a = attrs(open.as_str());
            if let Some(name) = attr(&a, "name") {
                form.fields.push((name.to_string(), unescape(content.as_str())));
            }
        } else if let (Some(open), Some(options)) = (c.get(4), c.get(5)) {
            let a = attrs(open.as_str());
            let Some(name) = attr(&a, "name") else { continue };
            if let Some(value) = selected_option(options.as_str()) {
                form.fields.push((name.to_string(), value));
            }
        }
    }
}

/// The selected option's value, or the first option's when none is marked.
fn selected_option(options: &str) -> Option<String> {
    let mut first = None;
    for c in OPTION_RE.captures_iter(options) {
        let a = attrs(&c[1]);
        let value = attr(&a, "value")
            .map(str::to_string)
            .unwrap_or_else(|| text_of(&c[2]));
        if has_flag(&c[1], "selected") {
            return Some(value);
        }
        first.get_or_insert(value);
    }
    first
}

/// `(name, content)` pairs from `<meta http-equiv=... content=...>` tags.
pub fn meta_equiv(html: &str) -> Vec<(String, String)> {
    META_RE
        .captures_iter(html)
        .filter_map(|c| {
            let a = attrs(&c[1]);
            let name = attr(&a, "http-equiv")?;
            let content = attr(&a, "content")?;
            Some((name.to_string(), content.to_string()))
        })
        .collect()
}
