//! Per-container plugin lifecycle.
//!
//! Encodes the evaluation state machine at the type level so that a plugin
//! can never be dispatched against a container it was not verified for.
//! Each phase is a zero-sized marker type and transitions consume the old
//! phase.
//!
//! # State Machine
//!
//! ```text
//! Candidate ──▶ Verified ──▶ Dispatched ──▶ Completed
//!     │             │                   └─▶ PartiallyFailed
//!     ▼             ▼                   └─▶ Cancelled
//! NotApplicable  SchemaMismatch (strict only)
//! ```
//!
//! `NotApplicable` is routine and silent: most plugins do not match most
//! containers.

use std::marker::PhantomData;

use tracing::debug;

use crate::container::Container;
use crate::dispatch::{DispatchError, DispatchReport, QueryDispatcher};
use crate::plugin::SqlitePlugin;
use crate::report::{PluginOutcome, PluginRunReport};
use crate::verify::{check_structure, compare_schemas, SchemaMatch, StructureCheck};

/// Marker trait for evaluation phases. Sealed to prevent external implementation.
pub trait EvaluationPhase: sealed::Sealed {
    fn name() -> &'static str;
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Candidate {}
    impl Sealed for super::Verified {}
    impl Sealed for super::Dispatched {}
}

/// Offered by the registry, not yet checked.
#[derive(Debug, Clone, Copy)]
pub struct Candidate;

/// Required structure is present.
#[derive(Debug, Clone, Copy)]
pub struct Verified;

/// Queries have run.
#[derive(Debug, Clone, Copy)]
pub struct Dispatched;

impl EvaluationPhase for Candidate {
    fn name() -> &'static str {
        "candidate"
    }
}

impl EvaluationPhase for Verified {
    fn name() -> &'static str {
        "verified"
    }
}

impl EvaluationPhase for Dispatched {
    fn name() -> &'static str {
        "dispatched"
    }
}

/// One plugin's evaluation against one container.
pub struct PluginEvaluation<'a, S: EvaluationPhase> {
    plugin: &'a dyn SqlitePlugin,
    container: &'a dyn Container,
    schema: SchemaMatch,
    dispatch: DispatchReport,
    _phase: PhantomData<S>,
}

impl<S: EvaluationPhase> PluginEvaluation<'_, S> {
    pub fn phase_name(&self) -> &'static str {
        S::name()
    }

    fn terminal(&self, outcome: PluginOutcome) -> PluginRunReport {
        PluginRunReport::new(self.plugin.name(), outcome, self.schema.clone(), &self.dispatch)
    }
}

impl<'a> PluginEvaluation<'a, Candidate> {
    pub fn new(plugin: &'a dyn SqlitePlugin, container: &'a dyn Container) -> Self {
        Self {
            plugin,
            container,
            schema: SchemaMatch::NotDeclared,
            dispatch: DispatchReport::default(),
            _phase: PhantomData,
        }
    }

    /// Check required structure, then reference schemas. On a miss the
    /// evaluation ends with a terminal report.
    pub fn verify(
        mut self,
        strict_schemas: bool,
    ) -> Result<PluginEvaluation<'a, Verified>, PluginRunReport> {
        let descriptor = self.plugin.descriptor();
        let structure = check_structure(self.container, &descriptor.required_structure);
        if !structure.is_match() {
            debug!(
                plugin = self.plugin.name(),
                container = self.container.location(),
                result = ?structure,
                "plugin does not apply"
            );
            return Err(self.terminal(PluginOutcome::NotApplicable { structure }));
        }

        self.schema = compare_schemas(self.container, &descriptor.schemas);
        debug!(plugin = self.plugin.name(), schema = ?self.schema, "reference schema comparison");
        if strict_schemas && !self.schema.permits_strict() {
            return Err(self.terminal(PluginOutcome::SchemaMismatch));
        }

        Ok(PluginEvaluation {
            plugin: self.plugin,
            container: self.container,
            schema: self.schema,
            dispatch: self.dispatch,
            _phase: PhantomData,
        })
    }
}

impl<'a> PluginEvaluation<'a, Verified> {
    /// Run the plugin's queries. Only a sink failure is an error.
    pub fn dispatch(
        self,
        dispatcher: &QueryDispatcher<'_>,
    ) -> Result<PluginEvaluation<'a, Dispatched>, DispatchError> {
        debug!(plugin = self.plugin.name(), phase = self.phase_name(), "dispatching");
        let dispatch = dispatcher.run(self.plugin)?;
        Ok(PluginEvaluation {
            plugin: self.plugin,
            container: self.container,
            schema: self.schema,
            dispatch,
            _phase: PhantomData,
        })
    }
}

impl PluginEvaluation<'_, Dispatched> {
    pub fn finish(self) -> PluginRunReport {
        let outcome = if self.dispatch.cancelled {
            PluginOutcome::Cancelled
        } else if self.dispatch.is_clean() {
            PluginOutcome::Completed
        } else {
            PluginOutcome::PartiallyFailed
        };
        self.terminal(outcome)
    }
}

/// Helper for callers that only want the structure verdict.
pub fn structure_of(plugin: &dyn SqlitePlugin, container: &dyn Container) -> StructureCheck {
    check_structure(container, &plugin.descriptor().required_structure)
}
