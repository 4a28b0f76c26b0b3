//! Mapping between lines of rendered text and tree flattening indices.
//!
//! In the line-oriented layout every element's start tag begins a line of its
//! own, in document order. Counting only the lines that start an element
//! therefore yields the element's flattening index. All other lines are
//! skipped:
//! - blank lines
//! - lines holding only a closing tag
//! - declarations, processing instructions and DOCTYPE lines
//! - lines lying wholly inside comments
//! - lines of plain text content
//!
//! Comments that close on a line are stripped before the rest of it is
//! classified, so `<!--note--><x/>` still starts an element. Classification is
//! a single forward scan, since whether a line sits inside a multi-line
//! comment depends on everything before it.

use crate::error::TreeError;
use crate::tree::DocumentTree;
use xprofile_types::TreeNodeId;

/// How a line takes part in index counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// Starts an element; counted.
    Element,
    Blank,
    Closing,
    Declaration,
    Comment,
    Text,
}

impl LineClass {
    pub fn is_counted(self) -> bool {
        self == LineClass::Element
    }
}

/// Line classification of one text snapshot. Lines are 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMap {
    classes: Vec<LineClass>,
}

impl LineMap {
    pub fn new(text: &str) -> Self {
        let mut in_comment = false;
        let classes = text
            .lines()
            .map(|line| classify_line(line, &mut in_comment))
            .collect();
        Self { classes }
    }

    pub fn line_count(&self) -> usize {
        self.classes.len()
    }

    pub fn class(&self, line: usize) -> Option<LineClass> {
        self.classes.get(line).copied()
    }

    /// Number of element lines.
    pub fn element_count(&self) -> usize {
        self.classes.iter().filter(|c| c.is_counted()).count()
    }

    /// The flattening index of the element starting on `line`, or `None` if
    /// the line does not start an element.
    ///
    /// Walks backward from `line`, subtracting every skipped line.
    pub fn line_to_index(&self, line: usize) -> Option<usize> {
        if !self.class(line)?.is_counted() {
            return None;
        }
        let skipped = self.classes[..line]
            .iter()
            .rev()
            .filter(|c| !c.is_counted())
            .count();
        Some(line - skipped)
    }

    /// The line on which the element with flattening index `index` starts.
    pub fn index_to_line(&self, index: usize) -> Option<usize> {
        self.classes
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_counted())
            .nth(index)
            .map(|(line, _)| line)
    }
}

fn classify_line(line: &str, in_comment: &mut bool) -> LineClass {
    let mut rest = line.trim_start();
    let mut saw_comment = false;
    loop {
        if *in_comment {
            saw_comment = true;
            match rest.find("-->") {
                Some(end) => {
                    *in_comment = false;
                    rest = rest[end + 3..].trim_start();
                }
                None => return LineClass::Comment,
            }
        } else if let Some(after) = rest.strip_prefix("<!--") {
            saw_comment = true;
            *in_comment = true;
            rest = after;
        } else {
            break;
        }
    }

    let class = if rest.is_empty() && saw_comment {
        LineClass::Comment
    } else if rest.is_empty() {
        LineClass::Blank
    } else if rest.starts_with("</") {
        LineClass::Closing
    } else if rest.starts_with("<?") || rest.starts_with("<!") {
        LineClass::Declaration
    } else if rest.starts_with('<') {
        LineClass::Element
    } else {
        LineClass::Text
    };
    track_comments(rest, in_comment);
    class
}

// Follows comment openings and closings in the remainder of a line.
fn track_comments(mut rest: &str, in_comment: &mut bool) {
    loop {
        let marker = if *in_comment { "-->" } else { "<!--" };
        match rest.find(marker) {
            Some(at) => {
                *in_comment = !*in_comment;
                rest = &rest[at + marker.len()..];
            }
            None => return,
        }
    }
}

/// Which way to continue after the previously found node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    Forward,
    Backward,
}

impl DocumentTree {
    /// The node whose start tag is on `line` of `text`.
    pub fn node_at_line(&self, text: &str, line: usize) -> Option<TreeNodeId> {
        LineMap::new(text)
            .line_to_index(line)
            .and_then(|index| self.find_by_index(index))
    }

    /// The line of `text` on which `id` starts.
    pub fn line_of_node(&self, text: &str, id: TreeNodeId) -> Result<Option<usize>, TreeError> {
        let index = self.node(id)?.index;
        Ok(LineMap::new(text).index_to_line(index))
    }

    /// Finds the node a text search landed on.
    ///
    /// A node matches when its first rendered line, or its whole rendering,
    /// equals `found` (ignoring surrounding whitespace). Among the matches the
    /// first one past `last_index` in `direction` wins; without a
    /// `last_index` the first match in `direction` wins.
    pub fn find_node_for_text(
        &self,
        found: &str,
        last_index: Option<usize>,
        direction: SearchDirection,
    ) -> Option<TreeNodeId> {
        let needle = found.trim();
        if needle.is_empty() {
            return None;
        }
        let mut matches: Vec<(usize, TreeNodeId)> = self
            .flat
            .iter()
            .filter_map(|id| {
                let text = self.node_text(*id).ok()?;
                let head = text.lines().next().unwrap_or("").trim();
                if head != needle && text.trim() != needle {
                    return None;
                }
                Some((self.node(*id).ok()?.index, *id))
            })
            .collect();
        matches.sort_unstable_by_key(|(index, _)| *index);
        if direction == SearchDirection::Backward {
            matches.reverse();
        }
        matches
            .into_iter()
            .find(|(index, _)| match (last_index, direction) {
                (None, _) => true,
                (Some(last), SearchDirection::Forward) => *index > last,
                (Some(last), SearchDirection::Backward) => *index < last,
            })
            .map(|(_, id)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TreeConfig;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<!DOCTYPE config>
<config>
  <!-- servers
       <server host="old"/>
  -->
  <server host="a"/>

  <note>
    some text
    <b/>
  </note>
  <!--x--><!--y
  --><server host="b">text</server>
</config>
"#;

    #[test]
    fn test_classification() {
        use LineClass::*;
        let map = LineMap::new(SAMPLE);
        let classes: Vec<_> = (0..map.line_count()).map(|l| map.class(l).unwrap()).collect();
        assert_eq!(
            classes,
            vec![
                Declaration, Declaration, Element, Comment, Comment, Comment, Element, Blank,
                Element, Text, Element, Closing, Comment, Element, Closing
            ]
        );
        assert_eq!(map.element_count(), 5);
    }

    #[test]
    fn test_skipped_lines_have_no_index() {
        let map = LineMap::new(SAMPLE);
        assert_eq!(map.line_to_index(2), Some(0));
        assert_eq!(map.line_to_index(6), Some(1));
        assert_eq!(map.line_to_index(8), Some(2));
        assert_eq!(map.line_to_index(10), Some(3));
        assert_eq!(map.line_to_index(13), Some(4));
        for line in [0, 1, 3, 4, 5, 7, 9, 11, 12, 14, 99] {
            assert_eq!(map.line_to_index(line), None, "line {line}");
        }
        assert_eq!(map.index_to_line(3), Some(10));
        assert_eq!(map.index_to_line(4), Some(13));
        assert_eq!(map.index_to_line(5), None);
    }

    #[test]
    fn test_element_after_comment_on_same_line() {
        let tree = DocumentTree::parse("<r><x/><a/><b/></r>", TreeConfig::default()).unwrap();
        let text = "<r>\n  <!--c--><x/>\n  <a/>\n  <b/>\n</r>\n";
        assert_eq!(tree.node_at_line(text, 1), tree.find_by_index(1));
        assert_eq!(tree.node_at_line(text, 2), tree.find_by_index(2));
        assert_eq!(tree.node_at_line(text, 3), tree.find_by_index(3));
        assert_eq!(LineMap::new(text).element_count(), tree.len());
    }

    #[test]
    fn test_lines_and_indices_agree_with_tree() {
        let tree = DocumentTree::parse(
            r#"<?xml version="1.0"?><a><!--c--><b k="1"><c>t</c><d/>mixed<e/></b><!-- multi
line --><f/></a>"#,
            TreeConfig::default(),
        )
        .unwrap();
        let text = tree.text();
        let map = LineMap::new(&text);
        assert_eq!(map.element_count(), tree.len());
        for id in tree.flat() {
            let line = tree.line_of_node(&text, *id).unwrap().unwrap();
            assert_eq!(tree.node_at_line(&text, line), Some(*id));
            let start = text.lines().nth(line).unwrap().trim_start();
            assert!(start.starts_with(&format!("<{}", tree.name(*id).unwrap())));
        }
    }

    #[test]
    fn test_find_node_for_text() {
        let tree = DocumentTree::parse(
            r#"<a><s n="1"/><s n="2"/><s n="1"/></a>"#,
            TreeConfig::default(),
        )
        .unwrap();
        let found = r#"<s n="1"/>"#;
        let first = tree.find_node_for_text(found, None, SearchDirection::Forward);
        assert_eq!(first, tree.find_by_index(1));
        let next = tree.find_node_for_text(found, Some(1), SearchDirection::Forward);
        assert_eq!(next, tree.find_by_index(3));
        assert_eq!(tree.find_node_for_text(found, Some(3), SearchDirection::Forward), None);
        let back = tree.find_node_for_text(found, Some(3), SearchDirection::Backward);
        assert_eq!(back, tree.find_by_index(1));
        assert_eq!(
            tree.find_node_for_text("<a>", None, SearchDirection::Forward),
            tree.find_by_index(0)
        );
        assert_eq!(tree.find_node_for_text("  ", None, SearchDirection::Forward), None);
    }
}
