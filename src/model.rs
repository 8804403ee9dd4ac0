//! Schema types for the `@ParserConfig` fragment.
//!
//! Two shapes live here. [`RawDocument`] is the permissive read-model: it can
//! hold every historical layout at once (top-level version tag, nested legacy
//! outbound selection) and is what migration steps mutate. [`ParserConfig`] is
//! the canonical current-version model; it is the only shape ever serialized,
//! so legacy fields cannot leak back into a host file once migrated away.
use crate::error::{ParserConfigError, ParserConfigResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reload interval applied when the fragment leaves it empty.
pub const DEFAULT_RELOAD_INTERVAL: &str = "4h";

/// Fragment as read from disk, in any historical layout.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawDocument {
    /// Oldest layout kept the version outside the settings object.
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(rename = "ParserConfig", default)]
    pub parser_config: RawParserConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawParserConfig {
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub proxies: Vec<ProxySource>,
    #[serde(default)]
    pub outbounds: Vec<RawOutbound>,
    #[serde(default)]
    pub parser: ParserSettings,
}

/// Outbound rule as read, possibly still carrying the nested legacy selection.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOutbound {
    #[serde(default)]
    pub tag: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub options: Map<String, Value>,
    #[serde(default)]
    pub filters: Map<String, Value>,
    #[serde(default)]
    pub add_outbounds: Vec<String>,
    #[serde(default)]
    pub preferred_default: Map<String, Value>,
    #[serde(default)]
    pub comment: String,
    /// Pre-v3 nested selection, flattened away by migration.
    #[serde(rename = "outbounds", default)]
    pub legacy: Option<LegacyOutboundSelection>,
}

/// The nested `outbounds` object older layouts used inside an outbound rule.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyOutboundSelection {
    #[serde(default)]
    pub proxies: Map<String, Value>,
    #[serde(default)]
    pub add_outbounds: Vec<String>,
    #[serde(default)]
    pub preferred_default: Map<String, Value>,
}

impl LegacyOutboundSelection {
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty() && self.add_outbounds.is_empty() && self.preferred_default.is_empty()
    }
}

/// A subscription or inline proxy list feeding the generated outbounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProxySource {
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<String>,
    /// Matcher criteria; opaque to the engine.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParserSettings {
    /// Duration literal such as `4h`; kept opaque here.
    #[serde(rename = "reload", default, skip_serializing_if = "String::is_empty")]
    pub reload_interval: String,
    /// RFC3339 UTC instant of the last successful refresh.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_updated: String,
}

/// Canonical current-version fragment payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParserConfig {
    pub version: u32,
    pub proxies: Vec<ProxySource>,
    pub outbounds: Vec<OutboundRule>,
    pub parser: ParserSettings,
}

/// Outbound selector definition in its flattened, current form.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundRule {
    pub tag: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub filters: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add_outbounds: Vec<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub preferred_default: Map<String, Value>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(rename = "ParserConfig")]
    parser_config: &'a ParserConfig,
}

/// Decode fragment bytes into the permissive read-model.
///
/// Unknown fields are ignored so newer optional keys do not break older readers.
/// Bytes that are not valid UTF-8 JSON surface as a malformed fragment.
pub fn parse_fragment(fragment: impl AsRef<[u8]>) -> ParserConfigResult<RawDocument> {
    serde_json::from_slice(fragment.as_ref().trim_ascii())
        .map_err(|source| ParserConfigError::MalformedFragment { path: None, source })
}

/// Render the canonical fragment as 2-space indented JSON wrapped in its envelope.
pub fn serialize_fragment(config: &ParserConfig) -> String {
    let envelope = Envelope {
        parser_config: config,
    };
    serde_json::to_string_pretty(&envelope).expect("serialize @ParserConfig fragment")
}

impl RawDocument {
    /// Effective version under the detection rule.
    ///
    /// A top-level tag with no nested tag is the first historical layout: the
    /// top-level value wins and its slot is cleared. With no tag anywhere the
    /// document is treated as the oldest supported version.
    pub fn detect_version(&mut self) -> u32 {
        match (self.version, self.parser_config.version) {
            (Some(top), None | Some(0)) if top > 0 => {
                tracing::debug!(version = top, "version tag found at top level");
                self.parser_config.version = Some(top);
                self.version = None;
                top
            }
            (_, Some(nested)) if nested > 0 => nested,
            _ => {
                tracing::debug!("no version tag found; assuming version 1");
                1
            }
        }
    }

    /// Project the migrated read-model onto the canonical shape.
    ///
    /// Callers run the migration chain first; any legacy selection still
    /// present at this point is dropped.
    pub fn into_current(self, version: u32) -> ParserConfig {
        let RawParserConfig {
            proxies,
            outbounds,
            parser,
            ..
        } = self.parser_config;
        let outbounds = outbounds
            .into_iter()
            .map(|raw| {
                if raw.legacy.as_ref().is_some_and(|legacy| !legacy.is_empty()) {
                    tracing::warn!(tag = %raw.tag, "dropping unmigrated legacy outbound selection");
                }
                OutboundRule {
                    tag: raw.tag,
                    kind: raw.kind,
                    options: raw.options,
                    filters: raw.filters,
                    add_outbounds: raw.add_outbounds,
                    preferred_default: raw.preferred_default,
                    comment: raw.comment,
                }
            })
            .collect();
        ParserConfig {
            version,
            proxies,
            outbounds,
            parser,
        }
    }
}

impl ParserConfig {
    pub fn proxy_source_count(&self) -> usize {
        self.proxies.len()
    }

    pub fn outbound_count(&self) -> usize {
        self.outbounds.len()
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
