//! Post-migration defaulting.
//!
//! Normalization implies migration: the chain runs first and a chain failure
//! is returned as-is, with no defaults applied to the half-known document.
use crate::error::ParserConfigResult;
use crate::migrate::{MigrationChain, MigrationReport};
use crate::model::{ParserConfig, RawDocument, DEFAULT_RELOAD_INTERVAL};
use crate::util::rfc3339_utc;
use chrono::{DateTime, Utc};

/// Migrate `doc` to the chain target and fill canonical defaults.
///
/// With `stamp` set, `parser.last_updated` is overwritten with that instant.
pub fn normalize(
    doc: RawDocument,
    chain: &MigrationChain,
    stamp: Option<DateTime<Utc>>,
) -> ParserConfigResult<(ParserConfig, MigrationReport)> {
    let (mut config, report) = chain.migrate(doc)?;
    apply_defaults(&mut config, stamp);
    Ok((config, report))
}

/// Defaulting pass over an already current config. Total; never fails.
pub fn apply_defaults(config: &mut ParserConfig, stamp: Option<DateTime<Utc>>) {
    if config.parser.reload_interval.is_empty() {
        config.parser.reload_interval = DEFAULT_RELOAD_INTERVAL.to_string();
    }
    if let Some(instant) = stamp {
        config.parser.last_updated = rfc3339_utc(instant);
    }
}
