//! Index documents built by one consumer for one image
//!
//! A fragment is an ordered list of `(field, value)` pairs rendered as a
//! single `<doc>` element terminated by a newline. Consumers build and render
//! fragments privately; only the finished text reaches the shared sink.

use std::fmt::Write as _;

/// Fields of one document, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFragment {
    fields: Vec<(String, String)>,
}

impl DocumentFragment {
    /// Fragment starting with the `id` and `title` fields
    pub fn new(id: &str, title: &str) -> Self {
        let mut fragment = Self::default();
        fragment.push("id", id);
        fragment.push("title", title);
        fragment
    }

    /// Append a field
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Value of the first field with this name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Check whether a field is present
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All fields in order
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the fragment has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Render as one `<doc>…</doc>\n` block
    pub fn render(&self) -> String {
        let capacity = self
            .fields
            .iter()
            .map(|(n, v)| n.len() + v.len() + 24)
            .sum::<usize>()
            + 12;
        let mut out = String::with_capacity(capacity);
        out.push_str("<doc>");
        for (name, value) in &self.fields {
            let _ = write!(
                out,
                "<field name=\"{}\">{}</field>",
                escape_xml(name),
                escape_xml(value)
            );
        }
        out.push_str("</doc>\n");
        out
    }
}

/// Escape text for use in XML content and attribute values
pub fn escape_xml(text: &str) -> String {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_keeps_field_order() {
        let mut doc = DocumentFragment::new("/img/a.jpg", "/img/a.jpg");
        doc.push("ch_hi", "AAEC");
        doc.push("ch_ha", "1a 2b");

        assert_eq!(
            doc.render(),
            "<doc><field name=\"id\">/img/a.jpg</field>\
             <field name=\"title\">/img/a.jpg</field>\
             <field name=\"ch_hi\">AAEC</field>\
             <field name=\"ch_ha\">1a 2b</field></doc>\n"
        );
        assert_eq!(doc.len(), 4);
        assert_eq!(doc.get("ch_ha"), Some("1a 2b"));
        assert!(!doc.contains("ch_ms"));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("plain"), "plain");
        assert_eq!(escape_xml("a&b <c> \"d\" 'e'"), "a&amp;b &lt;c&gt; &quot;d&quot; &apos;e&apos;");
    }

    #[test]
    fn test_render_escapes_values() {
        let doc = DocumentFragment::new("x&y", "<t>");
        assert!(doc.render().contains("<field name=\"id\">x&amp;y</field>"));
        assert!(doc.render().contains("<field name=\"title\">&lt;t&gt;</field>"));
    }
}
