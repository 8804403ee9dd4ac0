//! Locate and replace the `@ParserConfig` comment block inside a host file.
//!
//! The block grammar is fixed: an open marker `/** @ParserConfig` followed by a
//! newline, the JSON fragment, and the first following `*/`. The host is
//! handled as raw bytes; everything outside the fragment span, markers
//! included, is carried through untouched whatever its encoding.
use crate::error::{ParserConfigError, ParserConfigResult};
use regex::bytes::Regex;
use std::sync::OnceLock;

/// Close marker terminating the block.
pub const CLOSE_MARKER: &str = "*/";

fn block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let pattern = format!(
            r"(/\*\*\s*@ParserConfig\s*\n)((?s-u:.*?))({})",
            regex::escape(CLOSE_MARKER)
        );
        Regex::new(&pattern).expect("regex for @ParserConfig block")
    })
}

/// A host document split around its managed fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block<'a> {
    /// Bytes before the fragment, ending with the open marker line.
    pub prefix: &'a [u8],
    /// Raw fragment bytes between the markers.
    pub fragment: &'a [u8],
    /// Bytes after the fragment, starting with the close marker.
    pub suffix: &'a [u8],
}

impl Block<'_> {
    /// Fragment with surrounding ASCII whitespace removed.
    pub fn fragment_trimmed(&self) -> &[u8] {
        self.fragment.trim_ascii()
    }
}

/// Split `host` around the first managed block.
pub fn find_block(host: &[u8]) -> ParserConfigResult<Block<'_>> {
    let pattern = block_pattern();
    let captures = pattern
        .captures(host)
        .ok_or(ParserConfigError::FragmentNotFound { path: None })?;
    let Some(fragment) = captures.get(2) else {
        return Err(ParserConfigError::FragmentNotFound { path: None });
    };
    if pattern.find_iter(host).nth(1).is_some() {
        tracing::warn!("host document carries more than one @ParserConfig block; using the first");
    }
    Ok(Block {
        prefix: &host[..fragment.start()],
        fragment: fragment.as_bytes(),
        suffix: &host[fragment.end()..],
    })
}

/// Replace the fragment of the first managed block with `fragment`.
pub fn splice_block(host: &[u8], fragment: &str) -> ParserConfigResult<Vec<u8>> {
    let block = find_block(host)?;
    let mut out = Vec::with_capacity(block.prefix.len() + fragment.len() + block.suffix.len());
    out.extend_from_slice(block.prefix);
    out.extend_from_slice(fragment.as_bytes());
    out.extend_from_slice(block.suffix);
    Ok(out)
}

/// Number of managed blocks present in `host`.
pub fn count_blocks(host: &[u8]) -> usize {
    block_pattern().find_iter(host).count()
}
