//! Entry - ディレクトリエントリ（DN + 多値属性）
//!
//! タスクの保存形式。属性名は大文字小文字を区別せず、値の順序は保持します。
//! フレームワークは受け取った Entry を変更せず、新しい Entry を生成して返します。

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

pub const OBJECT_CLASS_ATTRIBUTE: &str = "objectClass";

/// One attribute: a name and its ordered values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    name: String,
    values: Vec<String>,
}

impl Attribute {
    pub fn new<I, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A directory entry: distinguished name plus attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    dn: String,
    #[serde(default)]
    attributes: Vec<Attribute>,
}

impl Entry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: Vec::new(),
        }
    }

    pub fn dn(&self) -> &str {
        &self.dn
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.has_name(name))
    }

    /// True when the attribute exists with at least one value.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some_and(|a| !a.values.is_empty())
    }

    pub fn attribute_value(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(Attribute::value)
    }

    pub fn attribute_values(&self, name: &str) -> &[String] {
        self.attribute(name).map(Attribute::values).unwrap_or(&[])
    }

    /// Adds values to an attribute, creating it if needed.
    ///
    /// Values already present are not repeated. Adding no values is a no-op,
    /// so an entry never carries an attribute without values.
    pub fn add_attribute<I, V>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let new_values: Vec<String> = values.into_iter().map(Into::into).collect();
        if new_values.is_empty() {
            return;
        }
        let index = match self.attributes.iter().position(|a| a.has_name(name)) {
            Some(index) => index,
            None => {
                self.attributes.push(Attribute::new(name, Vec::<String>::new()));
                self.attributes.len() - 1
            }
        };
        let attribute = &mut self.attributes[index];
        for value in new_values {
            if !attribute.values.contains(&value) {
                attribute.values.push(value);
            }
        }
    }

    pub fn with_attribute<I, V>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.add_attribute(name, values);
        self
    }

    pub fn object_classes(&self) -> &[String] {
        self.attribute_values(OBJECT_CLASS_ATTRIBUTE)
    }

    pub fn has_object_class(&self, object_class: &str) -> bool {
        self.object_classes()
            .iter()
            .any(|oc| oc.eq_ignore_ascii_case(object_class))
    }

    /// Renders the entry as an LDIF record (no trailing blank line).
    pub fn to_ldif(&self) -> String {
        let mut out = String::new();
        push_ldif_line(&mut out, "dn", &self.dn);
        for attribute in &self.attributes {
            for value in &attribute.values {
                push_ldif_line(&mut out, &attribute.name, value);
            }
        }
        out
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ldif())
    }
}

fn push_ldif_line(out: &mut String, name: &str, value: &str) {
    if is_ldif_safe(value) {
        out.push_str(name);
        out.push_str(": ");
        out.push_str(value);
    } else {
        out.push_str(name);
        out.push_str(":: ");
        out.push_str(&BASE64.encode(value.as_bytes()));
    }
    out.push('\n');
}

/// RFC 2849 SAFE-STRING check.
fn is_ldif_safe(value: &str) -> bool {
    let bytes = value.as_bytes();
    if let Some(first) = bytes.first() {
        if matches!(first, b' ' | b':' | b'<') {
            return false;
        }
    }
    if bytes.last() == Some(&b' ') {
        return false;
    }
    bytes
        .iter()
        .all(|b| b.is_ascii() && !matches!(b, b'\0' | b'\n' | b'\r'))
}

/// Escapes an attribute value for use inside an RDN (RFC 4514).
pub fn escape_rdn_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);
    for (i, c) in value.chars().enumerate() {
        let needs_escape = matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=')
            || (i == 0 && (c == '#' || c == ' '))
            || (i == last && c == ' ');
        if needs_escape {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Entry {
        Entry::new("ds-task-id=abc,cn=Scheduled Tasks,cn=tasks")
            .with_attribute(OBJECT_CLASS_ATTRIBUTE, ["top", "ds-task"])
            .with_attribute("ds-task-id", ["abc"])
    }

    #[test]
    fn attribute_names_are_case_insensitive() {
        let entry = sample();
        assert_eq!(entry.attribute_value("DS-TASK-ID"), Some("abc"));
        assert!(entry.has_object_class("DS-Task"));
        assert!(!entry.has_attribute("ds-task-class-name"));
        assert!(entry.attribute_values("missing").is_empty());
    }

    #[test]
    fn adding_merges_values_and_skips_duplicates() {
        let mut entry = sample();
        entry.add_attribute("objectclass", ["ds-task", "ds-task-alert"]);
        assert_eq!(entry.object_classes(), &["top", "ds-task", "ds-task-alert"]);
        assert_eq!(entry.attributes().len(), 2);
    }

    #[test]
    fn adding_no_values_creates_nothing() {
        let mut entry = sample();
        entry.add_attribute("ds-task-notify-on-start", Vec::<String>::new());
        assert!(entry.attribute("ds-task-notify-on-start").is_none());
    }

    #[test]
    fn ldif_base64_encodes_unsafe_values() {
        let entry = Entry::new("cn=test")
            .with_attribute("description", ["plain", " leading space", "naïve", "line\nbreak"]);
        let ldif = entry.to_ldif();
        let lines: Vec<_> = ldif.lines().collect();
        assert_eq!(lines[0], "dn: cn=test");
        assert_eq!(lines[1], "description: plain");
        assert_eq!(lines[2], format!("description:: {}", BASE64.encode(" leading space")));
        assert!(lines[3].starts_with("description:: "));
        assert!(lines[4].starts_with("description:: "));
    }

    #[test]
    fn rdn_values_are_escaped() {
        assert_eq!(escape_rdn_value("plain"), "plain");
        assert_eq!(escape_rdn_value("a,b=c"), "a\\,b\\=c");
        assert_eq!(escape_rdn_value("#x "), "\\#x\\ ");
    }

    #[test]
    fn entries_serialize_as_json() {
        let entry = sample();
        let text = serde_json::to_string(&entry).unwrap();
        let back: Entry = serde_json::from_str(&text).unwrap();
        assert_eq!(back, entry);
    }
}
