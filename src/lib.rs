//! Embedded `@ParserConfig` block engine.
//!
//! A launcher config file carries one JSON fragment inside a
//! `/** @ParserConfig ... */` comment. This crate finds that fragment, upgrades
//! it through the registered schema versions, fills defaults, and splices the
//! result back without touching any other byte of the host file.
pub mod block;
pub mod error;
pub mod gateway;
pub mod migrate;
pub mod model;
pub mod normalize;
pub mod subscription;
pub mod util;

pub use error::{ErrorClass, ParserConfigError, ParserConfigResult};
pub use gateway::{ConfigGateway, ConfigSnapshot};
pub use migrate::{MigrationChain, MigrationReport, MigrationStep, CURRENT_VERSION};
pub use model::{OutboundRule, ParserConfig, ParserSettings, ProxySource, RawDocument};
pub use subscription::{FetchError, FetchSettings, HttpFetcher, SubscriptionFetcher};
