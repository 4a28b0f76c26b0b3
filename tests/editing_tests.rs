mod common;

use common::{CATALOG_DOC, CONFIG_DOC, TestResult, learned_session, memory_session};
use xprofile::{LineMap, Placement, XProfileError};

#[test]
fn test_inserted_element_gets_learned_attributes() -> TestResult {
    let mut session = learned_session(&[CONFIG_DOC])?;
    session.open_document("<config><logging/></config>")?;
    let root = session.tree().and_then(|t| t.find_by_index(0)).ok_or("empty tree")?;
    session.insert("server", Some(0), Placement::Into(root))?;
    assert_eq!(
        session.document_text()?,
        "<config>\n  <server host=\"\" port=\"\"/>\n  <logging/>\n</config>\n"
    );
    Ok(())
}

#[test]
fn test_remove_takes_annotation_along() -> TestResult {
    let mut session = memory_session()?;
    session.open_document(CONFIG_DOC)?;
    let first_server = session.tree().and_then(|t| t.find_by_index(1)).ok_or("no server")?;
    session.remove(first_server)?;
    let text = session.document_text()?;
    assert!(!text.contains("primary server"));
    assert!(text.contains("host=\"b\""));
    assert!(!text.contains("host=\"a\""));
    Ok(())
}

#[test]
fn test_comment_out_round_trip() -> TestResult {
    let mut session = memory_session()?;
    session.open_document(CATALOG_DOC)?;
    let original = session.document_text()?;

    let comment = session.comment_out(&[1])?;
    assert_eq!(session.tree().map(|t| t.len()), Some(3));

    // Removing the following book keeps the commented-out one.
    let next = session.tree().and_then(|t| t.find_by_index(1)).ok_or("no book")?;
    let text_before = session.document_text()?;
    session.remove(next)?;
    assert!(session.document_text()?.contains("b1"));
    assert_ne!(session.document_text()?, text_before);

    let restored = session.uncomment(comment)?;
    assert_eq!(restored.len(), 1);
    assert!(session.document_text()?.contains("<book id=\"b1\">"));
    assert_ne!(session.document_text()?, original);
    Ok(())
}

#[test]
fn test_lines_and_indices_stay_consistent_through_edits() -> TestResult {
    let mut session = learned_session(&[CONFIG_DOC])?;
    session.open_document(CONFIG_DOC)?;
    let root = session.tree().and_then(|t| t.find_by_index(0)).ok_or("empty tree")?;
    session.insert("logging", None, Placement::Into(root))?;
    session.comment_out(&[2])?;
    let logging = session.tree().and_then(|t| t.find_by_index(2)).ok_or("no logging")?;
    session.move_node(logging, Some(root), 0)?;

    let tree = session.tree().ok_or("no tree")?;
    let text = tree.text();
    let map = LineMap::new(&text);
    assert_eq!(map.element_count(), tree.len());
    for (index, id) in tree.flat().iter().enumerate() {
        let line = map.index_to_line(index).ok_or("index without a line")?;
        assert_eq!(map.line_to_index(line), Some(index));
        assert_eq!(tree.node_at_line(&text, line), Some(*id));
    }
    Ok(())
}

#[test]
fn test_snippet_through_session() -> TestResult {
    let mut session = memory_session()?;
    session.open_document(r#"<list><item id="item9"/></list>"#)?;
    let tree = session.tree_mut().ok_or("no tree")?;
    let item = tree.find_by_index(1).ok_or("no item")?;
    tree.set_attribute_incremented(item, "id", true)?;
    assert_eq!(
        tree.generate_snippet(item, 2)?,
        "<item id=\"item9\"/>\n<item id=\"item10\"/>\n"
    );
    Ok(())
}

#[test]
fn test_save_and_reopen() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("out.xml");
    let mut session = memory_session()?;
    session.open_document(CONFIG_DOC)?;
    session.save_document(&path)?;
    let saved = session.document_text()?;
    session.close_document();
    session.open_file(&path)?;
    assert_eq!(session.document_text()?, saved);
    Ok(())
}

#[test]
fn test_missing_file_is_an_io_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let mut session = memory_session()?;
    let err = session.open_file(dir.path().join("nope.xml")).unwrap_err();
    assert!(matches!(err, XProfileError::Io(_)));
    assert!(err.to_string().contains("nope.xml"));
    Ok(())
}
