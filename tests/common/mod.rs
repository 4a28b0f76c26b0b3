#![allow(dead_code)]

use xprofile::{Session, XProfileError};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub const CONFIG_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<config>
  <!-- primary server -->
  <server host="a" port="80"/>
  <server host="b" port="81"/>
  <logging/>
</config>
"#;

pub const CATALOG_DOC: &str = r#"<catalog>
  <book id="b1">
    <title>Rust</title>
    <author name="x"/>
  </book>
  <book id="b2">
    <title>XML</title>
  </book>
</catalog>
"#;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A session on a throwaway profile.
pub fn memory_session() -> Result<Session, XProfileError> {
    init_logging();
    Session::builder().with_in_memory_profile().build()
}

/// A session on a throwaway profile that already knows `docs`.
pub fn learned_session(docs: &[&str]) -> Result<Session, XProfileError> {
    let mut session = memory_session()?;
    for doc in docs {
        session.import_text(doc)?;
    }
    Ok(session)
}
