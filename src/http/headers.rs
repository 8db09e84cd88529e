//! Ordered header list shared by outgoing browser requests and parsed
//! wire responses.
//!
//! Headers are stored as `(name, value)` pairs in arrival order. Duplicate
//! names are kept as separate entries, and lookups compare names
//! case-insensitively. No HTTP semantics are enforced here; callers such as
//! the [`parser`](crate::http::parser) and the [`handler`](crate::handler)
//! apply their own rules on top.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpHeaders {
    headers: Vec<(String, String)>,
}

impl HttpHeaders {
    pub fn new() -> Self {
        Self {
            headers: Vec::new(),
        }
    }

    /// Appends a header, keeping any existing entry with the same name.
    pub fn append(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    /// Replaces every entry named `name` with a single one.
    pub fn set(&mut self, name: &str, value: &str) {
        self.remove(name);
        self.append(name, value);
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let mut removed = None;
        self.headers.retain(|(n, v)| {
            if n.eq_ignore_ascii_case(name) {
                removed.get_or_insert_with(|| v.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Serializes as `Name: value` lines, each terminated by CRLF.
    pub fn stringify(&self) -> String {
        let mut result = String::new();
        for (name, value) in &self.headers {
            result.push_str(&format!("{}: {}\r\n", name, value));
        }
        result
    }
}

impl From<Vec<(String, String)>> for HttpHeaders {
    fn from(headers: Vec<(String, String)>) -> Self {
        Self { headers }
    }
}
