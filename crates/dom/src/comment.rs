//! Commented-out markup.
//!
//! A comment whose content is itself well-formed markup is disabled document
//! content, not an annotation. Editing code must never delete it as if it were
//! a note attached to the following element.

use crate::document::Document;
use crate::error::DomError;
use crate::parse::copy_node;

const FRAGMENT_WRAPPER: &str = "xprofile-fragment";
const ESCAPE: char = '~';

/// Makes markup safe to hold in a comment.
///
/// A comment may not contain `--` or end with `-`, so every `-` followed by
/// another `-` or ending the text becomes `~h`, and `~` itself becomes `~~`.
/// [`unescape_markup`] reverses it.
pub fn escape_markup(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut chars = markup.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            ESCAPE => out.push_str("~~"),
            '-' if matches!(chars.peek(), None | Some('-')) => out.push_str("~h"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverses [`escape_markup`]. A `~` not starting an escape is kept as is.
pub fn unescape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != ESCAPE {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some(&ESCAPE) => {
                chars.next();
                out.push(ESCAPE);
            }
            Some('h') => {
                chars.next();
                out.push('-');
            }
            _ => out.push(c),
        }
    }
    out
}

/// True if `text`, once unescaped, parses as a fragment containing at least
/// one element.
pub fn is_commented_markup(text: &str) -> bool {
    let text = unescape_markup(text);
    let trimmed = text.trim();
    if !trimmed.starts_with('<') {
        return false;
    }
    parse_fragment(trimmed).is_ok_and(|doc| doc.document_element().is_some())
}

/// Parses a sequence of sibling nodes into a document whose top level holds them.
pub fn parse_fragment(text: &str) -> Result<Document, DomError> {
    let wrapped = format!("<{0}>{1}</{0}>", FRAGMENT_WRAPPER, text);
    let source = roxmltree::Document::parse(&wrapped)?;
    let mut doc = Document::new();
    let top = doc.document_node();
    for child in source.root_element().children() {
        copy_node(&mut doc, top, child)?;
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_is_not_markup() {
        assert!(!is_commented_markup(" primary server "));
        assert!(!is_commented_markup("a < b"));
        assert!(!is_commented_markup("<unclosed"));
        assert!(!is_commented_markup(""));
    }

    #[test]
    fn test_disabled_elements_are_markup() {
        assert!(is_commented_markup(r#"<server host="a"/>"#));
        assert!(is_commented_markup("\n  <a/>\n  <b><c/></b>\n"));
    }

    #[test]
    fn test_escaped_markup_is_comment_safe() {
        let markup = r#"<b><!--note--><c x="a--b~"/>-</b>-"#;
        let escaped = escape_markup(markup);
        assert!(!escaped.contains("--"));
        assert!(!escaped.ends_with('-'));
        assert_eq!(unescape_markup(&escaped), markup);
        assert!(is_commented_markup(&escaped));
        assert_eq!(unescape_markup("a ~ b"), "a ~ b");
    }

    #[test]
    fn test_parse_fragment_keeps_siblings() {
        let doc = parse_fragment(r#"<a/><!--x--><b k="1"/>"#).unwrap();
        let top = doc.children(doc.document_node());
        assert_eq!(top.len(), 3);
        assert_eq!(doc.name(top[0]), Some("a"));
        assert_eq!(doc.comment_text(top[1]), Some("x"));
        assert_eq!(doc.attribute(top[2], "k"), Some("1"));
    }
}
