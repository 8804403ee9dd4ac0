//! Public entry points over a host config file.
//!
//! `extract` reads and migrates without writing; `persist` additionally
//! normalizes, re-serializes and splices the fragment back into the host.
//! Calls hold no state between invocations and take no file lock: concurrent
//! persists against one path are last-writer-wins, so callers that need
//! ordering must serialize their calls.
use crate::block::{find_block, splice_block};
use crate::error::{ParserConfigError, ParserConfigResult};
use crate::migrate::{MigrationChain, MigrationReport};
use crate::model::{parse_fragment, serialize_fragment, ParserConfig};
use crate::normalize::normalize;
use crate::util::write_atomic;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;

/// A migrated fragment plus how it got there.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSnapshot {
    pub config: ParserConfig,
    pub migration: MigrationReport,
}

impl ConfigSnapshot {
    pub fn proxy_source_count(&self) -> usize {
        self.config.proxy_source_count()
    }

    pub fn outbound_count(&self) -> usize {
        self.config.outbound_count()
    }

    /// Version found in the host before migration.
    pub fn detected_version(&self) -> u32 {
        self.migration.detected
    }
}

#[derive(Debug, Clone)]
pub struct ConfigGateway {
    chain: MigrationChain,
}

impl Default for ConfigGateway {
    fn default() -> Self {
        Self::with_chain(MigrationChain::standard().clone())
    }
}

impl ConfigGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway driving a custom chain; mostly useful for tests.
    pub fn with_chain(chain: MigrationChain) -> Self {
        Self { chain }
    }

    pub fn chain(&self) -> &MigrationChain {
        &self.chain
    }

    /// Read the host block and migrate it in memory. Defaults are not applied.
    pub fn extract(&self, path: &Path) -> ParserConfigResult<ConfigSnapshot> {
        let host = read_host(path)?;
        let block = find_block(&host).map_err(|err| err.with_path(path))?;
        let raw = parse_fragment(block.fragment).map_err(|err| err.with_path(path))?;
        let (config, migration) = self.chain.migrate(raw)?;
        tracing::info!(
            path = %path.display(),
            version = config.version,
            detected = migration.detected,
            proxies = config.proxy_source_count(),
            outbounds = config.outbound_count(),
            "extracted @ParserConfig"
        );
        Ok(ConfigSnapshot { config, migration })
    }

    /// Normalize the host block, stamp `last_updated` with `instant` and write it back.
    pub fn persist_timestamp(
        &self,
        path: &Path,
        instant: DateTime<Utc>,
    ) -> ParserConfigResult<ConfigSnapshot> {
        self.persist(path, Some(instant))
    }

    /// Normalize the host block and write it back, stamping only when asked.
    ///
    /// Nothing is written when the host is unreadable, has no block, or fails
    /// to parse or migrate. A host whose bytes would not change is left alone.
    pub fn persist(
        &self,
        path: &Path,
        stamp: Option<DateTime<Utc>>,
    ) -> ParserConfigResult<ConfigSnapshot> {
        let host = read_host(path)?;
        let block = find_block(&host).map_err(|err| err.with_path(path))?;
        let raw = parse_fragment(block.fragment).map_err(|err| err.with_path(path))?;
        let (config, migration) = normalize(raw, &self.chain, stamp)?;

        let fragment = format!("{}\n", serialize_fragment(&config));
        let updated = splice_block(&host, &fragment).map_err(|err| err.with_path(path))?;
        if updated == host {
            tracing::debug!(path = %path.display(), "@ParserConfig unchanged; skipping write");
        } else {
            write_atomic(path, &updated).map_err(|source| ParserConfigError::HostIo {
                path: path.to_path_buf(),
                source,
            })?;
            tracing::info!(
                path = %path.display(),
                last_updated = %config.parser.last_updated,
                "wrote @ParserConfig"
            );
        }
        Ok(ConfigSnapshot { config, migration })
    }
}

fn read_host(path: &Path) -> ParserConfigResult<Vec<u8>> {
    fs::read(path).map_err(|source| ParserConfigError::HostIo {
        path: path.to_path_buf(),
        source,
    })
}
