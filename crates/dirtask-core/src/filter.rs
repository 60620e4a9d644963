//! Search filter parsing (RFC 4515 string representation).
//!
//! Tasks only need to know whether a filter string is syntactically valid
//! and to keep a parsed form next to the string. Matching entries against a
//! filter is not supported.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("filter string is empty")]
    Empty,

    #[error("unexpected end of filter")]
    UnexpectedEnd,

    #[error("unexpected character '{found}' at position {position}")]
    UnexpectedCharacter { found: char, position: usize },

    #[error("no comparison operator in filter component '{0}'")]
    MissingOperator(String),

    #[error("invalid attribute description '{0}'")]
    InvalidAttribute(String),

    #[error("invalid escape sequence in '{0}'")]
    InvalidEscape(String),

    #[error("assertion value '{0}' is not valid UTF-8")]
    InvalidUtf8(String),

    #[error("unexpected data after the end of the filter at position {0}")]
    TrailingData(usize),

    #[error("filter components are nested more than {0} levels deep")]
    TooDeeplyNested(usize),
}

/// Deepest `&`, `|` and `!` nesting accepted by [`Filter::parse`].
pub const MAX_NESTING_DEPTH: usize = 100;

/// A parsed search filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Equality {
        attribute: String,
        value: String,
    },
    Substring {
        attribute: String,
        initial: Option<String>,
        any: Vec<String>,
        last: Option<String>,
    },
    GreaterOrEqual {
        attribute: String,
        value: String,
    },
    LessOrEqual {
        attribute: String,
        value: String,
    },
    Present {
        attribute: String,
    },
    ApproximateMatch {
        attribute: String,
        value: String,
    },
    ExtensibleMatch {
        attribute: Option<String>,
        matching_rule: Option<String>,
        dn_attributes: bool,
        value: String,
    },
}

impl Filter {
    pub fn parse(input: &str) -> Result<Filter, FilterError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(FilterError::Empty);
        }
        if !trimmed.starts_with('(') {
            return parse_item(trimmed);
        }

        let mut parser = Parser {
            input: trimmed,
            pos: 0,
            depth: 0,
        };
        let filter = parser.filter()?;
        if parser.pos != trimmed.len() {
            return Err(FilterError::TrailingData(parser.pos));
        }
        Ok(filter)
    }

    /// The attribute this component targets, if it is a leaf with one.
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Filter::Equality { attribute, .. }
            | Filter::Substring { attribute, .. }
            | Filter::GreaterOrEqual { attribute, .. }
            | Filter::LessOrEqual { attribute, .. }
            | Filter::Present { attribute }
            | Filter::ApproximateMatch { attribute, .. } => Some(attribute),
            Filter::ExtensibleMatch { attribute, .. } => attribute.as_deref(),
            Filter::And(_) | Filter::Or(_) | Filter::Not(_) => None,
        }
    }
}

impl std::str::FromStr for Filter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Filter::parse(s)
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn expect(&mut self, expected: u8) -> Result<(), FilterError> {
        match self.peek() {
            Some(b) if b == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(self.unexpected()),
            None => Err(FilterError::UnexpectedEnd),
        }
    }

    fn unexpected(&self) -> FilterError {
        let found = self.input[self.pos..].chars().next().unwrap_or('\0');
        FilterError::UnexpectedCharacter {
            found,
            position: self.pos,
        }
    }

    fn filter(&mut self) -> Result<Filter, FilterError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(FilterError::TooDeeplyNested(MAX_NESTING_DEPTH));
        }
        self.expect(b'(')?;
        let filter = match self.peek() {
            None => return Err(FilterError::UnexpectedEnd),
            Some(b'&') => {
                self.pos += 1;
                Filter::And(self.filter_list()?)
            }
            Some(b'|') => {
                self.pos += 1;
                Filter::Or(self.filter_list()?)
            }
            Some(b'!') => {
                self.pos += 1;
                Filter::Not(Box::new(self.filter()?))
            }
            Some(_) => {
                let start = self.pos;
                loop {
                    match self.peek() {
                        None => return Err(FilterError::UnexpectedEnd),
                        Some(b')') => break,
                        Some(b'(') => return Err(self.unexpected()),
                        Some(_) => self.pos += 1,
                    }
                }
                parse_item(&self.input[start..self.pos])?
            }
        };
        self.expect(b')')?;
        self.depth -= 1;
        Ok(filter)
    }

    fn filter_list(&mut self) -> Result<Vec<Filter>, FilterError> {
        let mut filters = Vec::new();
        while self.peek() == Some(b'(') {
            filters.push(self.filter()?);
        }
        Ok(filters)
    }
}

fn parse_item(item: &str) -> Result<Filter, FilterError> {
    let eq = item
        .find('=')
        .ok_or_else(|| FilterError::MissingOperator(item.to_string()))?;
    let (left, raw_value) = (&item[..eq], &item[eq + 1..]);

    if let Some(attribute) = left.strip_suffix('~') {
        return Ok(Filter::ApproximateMatch {
            attribute: attribute_description(attribute)?,
            value: unescape(raw_value)?,
        });
    }
    if let Some(attribute) = left.strip_suffix('>') {
        return Ok(Filter::GreaterOrEqual {
            attribute: attribute_description(attribute)?,
            value: unescape(raw_value)?,
        });
    }
    if let Some(attribute) = left.strip_suffix('<') {
        return Ok(Filter::LessOrEqual {
            attribute: attribute_description(attribute)?,
            value: unescape(raw_value)?,
        });
    }
    if let Some(extensible) = left.strip_suffix(':') {
        return parse_extensible(extensible, raw_value);
    }

    let attribute = attribute_description(left)?;
    if raw_value == "*" {
        return Ok(Filter::Present { attribute });
    }
    if !raw_value.contains('*') {
        return Ok(Filter::Equality {
            attribute,
            value: unescape(raw_value)?,
        });
    }

    let pieces: Vec<&str> = raw_value.split('*').collect();
    let initial = match pieces[0] {
        "" => None,
        piece => Some(unescape(piece)?),
    };
    let last = match pieces[pieces.len() - 1] {
        "" => None,
        piece => Some(unescape(piece)?),
    };
    let mut any = Vec::new();
    for piece in &pieces[1..pieces.len() - 1] {
        if piece.is_empty() {
            return Err(FilterError::InvalidEscape(raw_value.to_string()));
        }
        any.push(unescape(piece)?);
    }
    Ok(Filter::Substring {
        attribute,
        initial,
        any,
        last,
    })
}

/// `attr[:dn][:rule]` or `[:dn]:rule`; the trailing `:` is already removed.
fn parse_extensible(left: &str, raw_value: &str) -> Result<Filter, FilterError> {
    let mut parts = left.split(':');
    let first = parts.next().unwrap_or_default();
    let attribute = if first.is_empty() {
        None
    } else {
        Some(attribute_description(first)?)
    };

    let mut dn_attributes = false;
    let mut matching_rule = None;
    for part in parts {
        if part.eq_ignore_ascii_case("dn") && !dn_attributes && matching_rule.is_none() {
            dn_attributes = true;
        } else if matching_rule.is_none() && !part.is_empty() {
            matching_rule = Some(attribute_description(part)?);
        } else {
            return Err(FilterError::InvalidAttribute(left.to_string()));
        }
    }
    if attribute.is_none() && matching_rule.is_none() {
        return Err(FilterError::InvalidAttribute(left.to_string()));
    }

    Ok(Filter::ExtensibleMatch {
        attribute,
        matching_rule,
        dn_attributes,
        value: unescape(raw_value)?,
    })
}

fn attribute_description(name: &str) -> Result<String, FilterError> {
    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b';' | b'.' | b'_'));
    if valid {
        Ok(name.to_string())
    } else {
        Err(FilterError::InvalidAttribute(name.to_string()))
    }
}

fn unescape(raw: &str) -> Result<String, FilterError> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                let hex = raw
                    .get(i + 1..i + 3)
                    .ok_or_else(|| FilterError::InvalidEscape(raw.to_string()))?;
                let byte = u8::from_str_radix(hex, 16)
                    .map_err(|_| FilterError::InvalidEscape(raw.to_string()))?;
                out.push(byte);
                i += 3;
            }
            b'(' | b')' | b'\0' => {
                return Err(FilterError::InvalidEscape(raw.to_string()));
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).map_err(|_| FilterError::InvalidUtf8(raw.to_string()))
}

fn escape(value: &str, out: &mut fmt::Formatter<'_>) -> fmt::Result {
    for c in value.chars() {
        match c {
            '*' => out.write_str("\\2a")?,
            '(' => out.write_str("\\28")?,
            ')' => out.write_str("\\29")?,
            '\\' => out.write_str("\\5c")?,
            '\0' => out.write_str("\\00")?,
            c => write!(out, "{c}")?,
        }
    }
    Ok(())
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::And(filters) | Filter::Or(filters) => {
                f.write_str(if matches!(self, Filter::And(_)) { "(&" } else { "(|" })?;
                for filter in filters {
                    write!(f, "{filter}")?;
                }
                f.write_str(")")
            }
            Filter::Not(filter) => write!(f, "(!{filter})"),
            Filter::Equality { attribute, value } => {
                write!(f, "({attribute}=")?;
                escape(value, f)?;
                f.write_str(")")
            }
            Filter::Substring {
                attribute,
                initial,
                any,
                last,
            } => {
                write!(f, "({attribute}=")?;
                if let Some(initial) = initial {
                    escape(initial, f)?;
                }
                f.write_str("*")?;
                for piece in any {
                    escape(piece, f)?;
                    f.write_str("*")?;
                }
                if let Some(last) = last {
                    escape(last, f)?;
                }
                f.write_str(")")
            }
            Filter::GreaterOrEqual { attribute, value } => {
                write!(f, "({attribute}>=")?;
                escape(value, f)?;
                f.write_str(")")
            }
            Filter::LessOrEqual { attribute, value } => {
                write!(f, "({attribute}<=")?;
                escape(value, f)?;
                f.write_str(")")
            }
            Filter::Present { attribute } => write!(f, "({attribute}=*)"),
            Filter::ApproximateMatch { attribute, value } => {
                write!(f, "({attribute}~=")?;
                escape(value, f)?;
                f.write_str(")")
            }
            Filter::ExtensibleMatch {
                attribute,
                matching_rule,
                dn_attributes,
                value,
            } => {
                f.write_str("(")?;
                if let Some(attribute) = attribute {
                    f.write_str(attribute)?;
                }
                if *dn_attributes {
                    f.write_str(":dn")?;
                }
                if let Some(rule) = matching_rule {
                    write!(f, ":{rule}")?;
                }
                f.write_str(":=")?;
                escape(value, f)?;
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn eq(attribute: &str, value: &str) -> Filter {
        Filter::Equality {
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn parses_simple_equality_with_and_without_parens() {
        assert_eq!(Filter::parse("(uid=jdoe)").unwrap(), eq("uid", "jdoe"));
        assert_eq!(Filter::parse("uid=jdoe").unwrap(), eq("uid", "jdoe"));
    }

    #[test]
    fn parses_nested_boolean_filters() {
        let filter = Filter::parse("(&(objectClass=person)(|(uid=a)(uid=b))(!(cn=x)))").unwrap();
        assert_eq!(
            filter,
            Filter::And(vec![
                eq("objectClass", "person"),
                Filter::Or(vec![eq("uid", "a"), eq("uid", "b")]),
                Filter::Not(Box::new(eq("cn", "x"))),
            ])
        );
    }

    #[test]
    fn parses_substrings_and_presence() {
        assert_eq!(
            Filter::parse("(cn=ab*cd*ef)").unwrap(),
            Filter::Substring {
                attribute: "cn".to_string(),
                initial: Some("ab".to_string()),
                any: vec!["cd".to_string()],
                last: Some("ef".to_string()),
            }
        );
        assert_eq!(
            Filter::parse("(cn=*x)").unwrap(),
            Filter::Substring {
                attribute: "cn".to_string(),
                initial: None,
                any: Vec::new(),
                last: Some("x".to_string()),
            }
        );
        assert_eq!(
            Filter::parse("(mail=*)").unwrap(),
            Filter::Present {
                attribute: "mail".to_string()
            }
        );
    }

    #[test]
    fn parses_ordering_and_approximate() {
        assert!(matches!(
            Filter::parse("(age>=21)").unwrap(),
            Filter::GreaterOrEqual { .. }
        ));
        assert!(matches!(
            Filter::parse("(age<=65)").unwrap(),
            Filter::LessOrEqual { .. }
        ));
        assert!(matches!(
            Filter::parse("(sn~=smith)").unwrap(),
            Filter::ApproximateMatch { .. }
        ));
    }

    #[test]
    fn parses_extensible_match() {
        assert_eq!(
            Filter::parse("(cn:dn:2.5.13.5:=John)").unwrap(),
            Filter::ExtensibleMatch {
                attribute: Some("cn".to_string()),
                matching_rule: Some("2.5.13.5".to_string()),
                dn_attributes: true,
                value: "John".to_string(),
            }
        );
        assert_eq!(
            Filter::parse("(:caseExactMatch:=x)").unwrap(),
            Filter::ExtensibleMatch {
                attribute: None,
                matching_rule: Some("caseExactMatch".to_string()),
                dn_attributes: false,
                value: "x".to_string(),
            }
        );
    }

    #[test]
    fn decodes_hex_escapes() {
        assert_eq!(
            Filter::parse("(cn=a\\2ab\\28\\29)").unwrap(),
            eq("cn", "a*b()")
        );
        assert_eq!(Filter::parse("(cn=caf\\c3\\a9)").unwrap(), eq("cn", "café"));
    }

    #[rstest]
    #[case("")]
    #[case("(uid=jdoe")]
    #[case("(uid=jdoe))")]
    #[case("(uidjdoe)")]
    #[case("(=value)")]
    #[case("(cn=\\zz)")]
    #[case("(cn=a**b)")]
    #[case("this is not a valid filter")]
    #[case("(u id=x)")]
    #[case("(:=x)")]
    fn rejects_invalid(#[case] input: &str) {
        assert!(Filter::parse(input).is_err(), "{input} should not parse");
    }

    #[rstest]
    #[case("(uid=jdoe)")]
    #[case("(&(objectClass=person)(!(cn=a\\2ab)))")]
    #[case("(cn=ab*cd*)")]
    #[case("(cn:dn:2.5.13.5:=John)")]
    #[case("(|(a>=1)(b<=2)(c~=3)(d=*))")]
    fn display_round_trips(#[case] input: &str) {
        let filter = Filter::parse(input).unwrap();
        assert_eq!(filter.to_string(), input);
        assert_eq!(Filter::parse(&filter.to_string()).unwrap(), filter);
    }

    fn nested_not(levels: usize) -> String {
        format!("{}(uid=a){}", "(!".repeat(levels), ")".repeat(levels))
    }

    #[test]
    fn nesting_is_limited() {
        let deepest = Filter::parse(&nested_not(MAX_NESTING_DEPTH - 1)).unwrap();
        assert!(matches!(deepest, Filter::Not(_)));

        assert_eq!(
            Filter::parse(&nested_not(MAX_NESTING_DEPTH)),
            Err(FilterError::TooDeeplyNested(MAX_NESTING_DEPTH))
        );
        assert_eq!(
            Filter::parse(&nested_not(20_000)),
            Err(FilterError::TooDeeplyNested(MAX_NESTING_DEPTH))
        );
        let wide_and = format!("(&{})", "(&(a=1)(b=2))".repeat(500));
        assert!(Filter::parse(&wide_and).is_ok());
    }
}
