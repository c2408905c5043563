//! Minimal `Link` header parser (RFC 8288 syntax).

use http::{header, HeaderMap};

/// Error raised for a `Link` header that does not follow the
/// `<uri>; rel="..."` grammar.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct LinkParseError(String);

/// One `<uri>; params` entry of a `Link` header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkEntry {
    /// Target exactly as written; may be relative.
    pub target: String,
    /// Relation types, lowercased.
    pub rels: Vec<String>,
    /// Remaining parameters with lowercased names, quotes removed.
    pub params: Vec<(String, String)>,
}

/// Parsed `Link` header, looked up by relation name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkHeader {
    entries: Vec<LinkEntry>,
}

impl LinkHeader {
    /// Parses every `Link` header of a response. Repeated headers are
    /// treated as one comma-separated list. Returns `Ok(None)` when the
    /// response carries no `Link` header.
    pub fn from_headers(headers: &HeaderMap) -> Result<Option<Self>, LinkParseError> {
        let mut values = Vec::new();
        for value in headers.get_all(header::LINK) {
            let value = value
                .to_str()
                .map_err(|_| LinkParseError("link header is not valid ASCII".to_owned()))?;
            values.push(value);
        }
        if values.is_empty() {
            return Ok(None);
        }
        Self::parse(&values.join(", ")).map(Some)
    }

    pub fn parse(input: &str) -> Result<Self, LinkParseError> {
        let mut entries = Vec::new();
        let mut rest = input.trim();
        if rest.is_empty() {
            return Err(LinkParseError("empty link header".to_owned()));
        }

        while !rest.is_empty() {
            let (entry, remaining) = parse_entry(rest)?;
            entries.push(entry);
            rest = remaining.trim_start();
            if let Some(after_comma) = rest.strip_prefix(',') {
                rest = after_comma.trim_start();
                if rest.is_empty() {
                    return Err(LinkParseError("trailing comma in link header".to_owned()));
                }
            } else if !rest.is_empty() {
                return Err(LinkParseError(format!("unexpected input '{rest}'")));
            }
        }

        Ok(Self { entries })
    }

    /// Returns the target of the first entry carrying relation `rel`.
    pub fn get(&self, rel: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.rels.iter().any(|r| r.eq_ignore_ascii_case(rel)))
            .map(|entry| entry.target.as_str())
    }

    pub fn entries(&self) -> &[LinkEntry] {
        &self.entries
    }
}

fn parse_entry(input: &str) -> Result<(LinkEntry, &str), LinkParseError> {
    let after_open = input
        .strip_prefix('<')
        .ok_or_else(|| LinkParseError(format!("expected '<' at '{input}'")))?;
    let close = after_open
        .find('>')
        .ok_or_else(|| LinkParseError("unterminated '<' in link header".to_owned()))?;
    let target = after_open[..close].trim().to_owned();
    let mut rest = &after_open[close + 1..];

    let mut rels = Vec::new();
    let mut params = Vec::new();

    loop {
        rest = rest.trim_start();
        let Some(after_semi) = rest.strip_prefix(';') else {
            break;
        };
        let (name, value, remaining) = parse_param(after_semi.trim_start())?;
        rest = remaining;
        if name == "rel" {
            // Only the first rel parameter counts.
            if rels.is_empty() {
                rels = value.split_ascii_whitespace().map(str::to_ascii_lowercase).collect();
            }
        } else {
            params.push((name, value));
        }
    }

    Ok((LinkEntry { target, rels, params }, rest))
}

fn parse_param(input: &str) -> Result<(String, String, &str), LinkParseError> {
    let name_end = input
        .find(|c: char| c == '=' || c == ';' || c == ',' || c.is_whitespace())
        .unwrap_or(input.len());
    let name = input[..name_end].to_ascii_lowercase();
    if name.is_empty() {
        return Err(LinkParseError("empty link parameter name".to_owned()));
    }

    let rest = input[name_end..].trim_start();
    let Some(after_eq) = rest.strip_prefix('=') else {
        return Ok((name, String::new(), rest));
    };
    let after_eq = after_eq.trim_start();

    if let Some(quoted) = after_eq.strip_prefix('"') {
        let mut value = String::new();
        let mut chars = quoted.char_indices();
        while let Some((index, c)) = chars.next() {
            match c {
                '\\' => {
                    if let Some((_, escaped)) = chars.next() {
                        value.push(escaped);
                    }
                }
                '"' => return Ok((name, value, &quoted[index + 1..])),
                other => value.push(other),
            }
        }
        return Err(LinkParseError(format!("unterminated quoted value for '{name}'")));
    }

    let value_end = after_eq
        .find(|c: char| c == ';' || c == ',' || c.is_whitespace())
        .unwrap_or(after_eq.len());
    let value = &after_eq[..value_end];
    if value.is_empty() {
        return Err(LinkParseError(format!("missing value for '{name}'")));
    }
    Ok((name, value.to_owned(), &after_eq[value_end..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn parses_github_style_header() {
        let links = LinkHeader::parse(
            r#"<https://api.example.com/items?page=2>; rel="next", <https://api.example.com/items?page=5>; rel="last""#,
        )
        .expect("valid header");

        assert_eq!(links.get("next"), Some("https://api.example.com/items?page=2"));
        assert_eq!(links.get("last"), Some("https://api.example.com/items?page=5"));
        assert_eq!(links.get("prev"), None);
    }

    #[test]
    fn handles_multiple_rels_unquoted_values_and_extra_params() {
        let links = LinkHeader::parse(
            r#"</items?cursor=abc>; title="a, b; c"; rel="prev NEXT", </start>; rel=first"#,
        )
        .expect("valid header");

        assert_eq!(links.get("next"), Some("/items?cursor=abc"));
        assert_eq!(links.get("first"), Some("/start"));
        assert_eq!(
            links.entries()[0].params,
            vec![("title".to_owned(), "a, b; c".to_owned())]
        );
    }

    #[test]
    fn rejects_malformed_input() {
        for input in [
            "",
            "https://example.com; rel=next",
            "<https://example.com; rel=next",
            r#"<https://example.com>; rel="next"#,
            "<https://example.com>; rel=next,",
            "<https://example.com>; rel=next garbage",
            "<https://example.com>; =next",
        ] {
            assert!(LinkHeader::parse(input).is_err(), "should reject {input:?}");
        }
    }

    #[test]
    fn from_headers_joins_repeated_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::LINK, HeaderValue::from_static("</a>; rel=prev"));
        headers.append(header::LINK, HeaderValue::from_static("</b>; rel=next"));

        let links = LinkHeader::from_headers(&headers)
            .expect("valid headers")
            .expect("link header present");
        assert_eq!(links.get("next"), Some("/b"));
        assert_eq!(links.get("prev"), Some("/a"));
    }

    #[test]
    fn from_headers_without_link_is_none() {
        assert_eq!(LinkHeader::from_headers(&HeaderMap::new()), Ok(None));
    }
}
