//! Versioned migration of the `@ParserConfig` fragment.
//!
//! Each registered step owns exactly one `N -> N+1` transition of the
//! read-model. The chain is immutable once built; a gap in it is reported as
//! [`ParserConfigError::MissingMigrationStep`] rather than a generic failure.
use crate::error::{ParserConfigError, ParserConfigResult};
use crate::model::{ParserConfig, RawDocument};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Version written by this build.
pub const CURRENT_VERSION: u32 = 3;

/// Transformation applied to a read-model sitting at the step's source version.
pub type StepFn = fn(&mut RawDocument) -> ParserConfigResult<()>;

#[derive(Debug, Clone, Copy)]
pub struct MigrationStep {
    /// Source version; the step leaves the document at `from + 1`.
    pub from: u32,
    pub description: &'static str,
    pub apply: StepFn,
}

/// Outcome of a successful chain run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Version detected before any step ran.
    pub detected: u32,
    pub target: u32,
    /// Source versions of the steps applied, in order.
    pub applied: Vec<u32>,
}

impl MigrationReport {
    pub fn migrated(&self) -> bool {
        !self.applied.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct MigrationChain {
    target: u32,
    steps: BTreeMap<u32, MigrationStep>,
}

/// Steps shipped with this build, oldest first.
pub fn standard_steps() -> Vec<MigrationStep> {
    vec![
        MigrationStep {
            from: 1,
            description: "move top-level version tag into ParserConfig",
            apply: relocate_version_tag,
        },
        MigrationStep {
            from: 2,
            description: "flatten nested outbound selection onto outbound rules",
            apply: flatten_legacy_selection,
        },
    ]
}

impl MigrationChain {
    /// Build a chain targeting `target`; a later step for the same source wins.
    pub fn new(target: u32, steps: impl IntoIterator<Item = MigrationStep>) -> Self {
        let steps = steps.into_iter().map(|step| (step.from, step)).collect();
        Self { target, steps }
    }

    /// The process-wide chain for [`CURRENT_VERSION`].
    pub fn standard() -> &'static MigrationChain {
        static CHAIN: OnceLock<MigrationChain> = OnceLock::new();
        CHAIN.get_or_init(|| MigrationChain::new(CURRENT_VERSION, standard_steps()))
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn step(&self, from: u32) -> Option<&MigrationStep> {
        self.steps.get(&from)
    }

    pub fn steps(&self) -> impl Iterator<Item = &MigrationStep> {
        self.steps.values()
    }

    /// Drive `doc` from its detected version up to the chain target.
    ///
    /// Steps run on a working copy that replaces `doc` only when every step
    /// succeeded, so a failed run leaves the caller's document untouched.
    pub fn run(&self, doc: &mut RawDocument) -> ParserConfigResult<MigrationReport> {
        let mut working = doc.clone();
        let detected = working.detect_version();
        if detected > self.target {
            return Err(ParserConfigError::UnsupportedNewerVersion {
                found: detected,
                supported: self.target,
            });
        }

        let mut applied = Vec::new();
        for from in detected..self.target {
            let step = self
                .steps
                .get(&from)
                .ok_or(ParserConfigError::MissingMigrationStep {
                    from,
                    target: self.target,
                })?;
            (step.apply)(&mut working)?;
            working.parser_config.version = Some(from + 1);
            tracing::info!(from, to = from + 1, "migrated @ParserConfig: {}", step.description);
            applied.push(from);
        }
        working.parser_config.version = Some(self.target);
        *doc = working;

        Ok(MigrationReport {
            detected,
            target: self.target,
            applied,
        })
    }

    /// Run the chain and project the result onto the canonical model.
    pub fn migrate(
        &self,
        mut doc: RawDocument,
    ) -> ParserConfigResult<(ParserConfig, MigrationReport)> {
        let report = self.run(&mut doc)?;
        Ok((doc.into_current(self.target), report))
    }
}

fn relocate_version_tag(doc: &mut RawDocument) -> ParserConfigResult<()> {
    if let Some(top) = doc.version.take() {
        if doc.parser_config.version.is_none() {
            doc.parser_config.version = Some(top);
        }
        tracing::debug!(version = top, "removed top-level version tag");
    }
    Ok(())
}

fn flatten_legacy_selection(doc: &mut RawDocument) -> ParserConfigResult<()> {
    for outbound in &mut doc.parser_config.outbounds {
        let Some(legacy) = outbound.legacy.take() else {
            continue;
        };
        if legacy.is_empty() {
            continue;
        }
        let tag = outbound.tag.clone();
        adopt_legacy(&mut outbound.filters, legacy.proxies, &tag, "filters");
        adopt_legacy(&mut outbound.add_outbounds, legacy.add_outbounds, &tag, "addOutbounds");
        adopt_legacy(
            &mut outbound.preferred_default,
            legacy.preferred_default,
            &tag,
            "preferredDefault",
        );
    }
    Ok(())
}

/// Move a legacy value onto its top-level slot; an already populated slot wins.
fn adopt_legacy<T: Default + PartialEq>(slot: &mut T, value: T, tag: &str, field: &str) {
    if value == T::default() {
        return;
    }
    if *slot == T::default() {
        *slot = value;
    } else {
        tracing::warn!(tag, field, "top-level field already set; dropping legacy value");
    }
}

#[cfg(test)]
#[path = "migrate_tests.rs"]
mod tests;
