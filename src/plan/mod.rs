//! Reconciliation plan for a whole definitions set.
//!
//! The planner validates the dependency graph, then resolves every resource in
//! topological order. With pruning enabled, live resources that no
//! declaration accounts for are reported as drops after everything else.

use std::collections::HashSet;
use std::fmt;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;
use tracing::{debug, info};
use crate::diff::changed_paths;
use crate::drift::{fingerprint, DriftResolver, IacAction, Normalizer, Resolution};
use crate::dsl::{DefinitionSet, ResourceId};
use crate::error::{DbDriftError, Result};
use crate::graph::{build_graph, sort};
use crate::state::{state_tag, StateQuery, StateSource};
use crate::value::Record;

#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    pub prune: bool,
    /// Node ids to emit; empty means every resource.
    pub resources: Vec<String>,
    pub normalizer: Normalizer,
}

impl PlanOptions {
    fn includes(&self, node_id: &str) -> bool {
        self.resources.is_empty() || self.resources.iter().any(|r| r == node_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanStep {
    pub id: String,
    pub resource_type: String,
    pub name: String,
    pub iac_action: IacAction,
    pub definition: Option<Record>,
    pub fingerprint: String,
    #[serde(skip)]
    pub declared: Record,
    #[serde(skip)]
    pub observed: Option<Record>,
}

impl PlanStep {
    pub fn resolution(&self) -> Resolution {
        Resolution {
            iac_action: self.iac_action,
            definition: self.definition.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub create: usize,
    pub alter: usize,
    pub drop: usize,
    pub no_action: usize,
}

impl PlanSummary {
    pub fn changes(&self) -> usize {
        self.create + self.alter + self.drop
    }
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to create, {} to alter, {} to drop, {} unchanged",
            self.create, self.alter, self.drop, self.no_action
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub generated_at: DateTime<Utc>,
    pub steps: Vec<PlanStep>,
}

impl Plan {
    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for step in &self.steps {
            match step.iac_action {
                IacAction::Create => summary.create += 1,
                IacAction::Alter => summary.alter += 1,
                IacAction::Drop => summary.drop += 1,
                IacAction::NoAction => summary.no_action += 1,
            }
        }
        summary
    }

    pub fn has_changes(&self) -> bool {
        self.steps.iter().any(|s| s.iac_action.is_change())
    }

    pub fn changes(&self) -> impl Iterator<Item = &PlanStep> {
        self.steps.iter().filter(|s| s.iac_action.is_change())
    }

    pub fn step(&self, id: &str) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn table_rows(&self) -> Vec<PlanTableRow> {
        self.steps.iter().map(PlanTableRow::from).collect()
    }
}

#[derive(Debug, Clone, Tabled)]
pub struct PlanTableRow {
    #[tabled(rename = "Resource")]
    pub resource: String,
    #[tabled(rename = "Action")]
    pub action: String,
    #[tabled(rename = "Changes")]
    pub changes: String,
}

impl From<&PlanStep> for PlanTableRow {
    fn from(step: &PlanStep) -> Self {
        let changes = match (step.iac_action, &step.definition) {
            (IacAction::Alter, Some(diff)) => changed_paths(diff).join(", "),
            (IacAction::Create, Some(definition)) => format!("{} keys", definition.len()),
            _ => "-".to_string(),
        };

        PlanTableRow {
            resource: step.id.clone(),
            action: format!("{} {}", step.iac_action.symbol(), step.iac_action.as_str()),
            changes,
        }
    }
}

pub struct Planner<'a, S: StateSource + ?Sized> {
    definitions: &'a DefinitionSet,
    source: &'a S,
    options: PlanOptions,
}

impl<'a, S: StateSource + ?Sized> Planner<'a, S> {
    pub fn new(definitions: &'a DefinitionSet, source: &'a S) -> Self {
        Self {
            definitions,
            source,
            options: PlanOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PlanOptions) -> Self {
        self.options = options;
        self
    }

    pub fn plan(&self) -> Result<Plan> {
        let graph = build_graph(self.definitions)?;
        let order = sort(&graph)?;
        info!("Planning {} resources", order.len());

        let resolver =
            DriftResolver::new(self.source).with_normalizer(self.options.normalizer.clone());

        let mut steps = Vec::new();
        for node in &order {
            if !self.options.includes(node) {
                continue;
            }

            let Some(definition) = self.definitions.get(node) else {
                continue;
            };

            let query = StateQuery::for_definition(definition);
            let inspection = resolver.inspect(&definition.body, &query, definition.name())?;
            debug!("{} -> {}", node, inspection.resolution.iac_action);

            steps.push(PlanStep {
                id: node.clone(),
                resource_type: definition.resource_type().to_string(),
                name: definition.name().to_string(),
                iac_action: inspection.resolution.iac_action,
                definition: inspection.resolution.definition,
                fingerprint: fingerprint(&inspection.declared),
                declared: inspection.declared,
                observed: inspection.observed,
            });
        }

        if self.options.prune {
            steps.extend(self.drop_steps(&order)?);
        }

        let plan = Plan {
            generated_at: Utc::now(),
            steps,
        };
        info!("Plan: {}", plan.summary());
        Ok(plan)
    }

    /// Drops for undeclared live resources, dependents' types first.
    fn drop_steps(&self, order: &[String]) -> Result<Vec<PlanStep>> {
        let mut types: Vec<&str> = Vec::new();
        for node in order.iter().rev() {
            if let Some(definition) = self.definitions.get(node) {
                if !types.contains(&definition.resource_type()) {
                    types.push(definition.resource_type());
                }
            }
        }

        let mut steps = Vec::new();
        for resource_type in types {
            let names: HashSet<String> = self
                .definitions
                .of_type(resource_type)
                .map(|d| d.name().to_lowercase())
                .collect();
            let tags: HashSet<String> = self
                .definitions
                .of_type(resource_type)
                .filter_map(|d| d.object_id_tag())
                .map(str::to_lowercase)
                .collect();

            let observed = self
                .source
                .observed(resource_type)
                .map_err(|source| DbDriftError::StateFetch {
                    resource: resource_type.to_string(),
                    source,
                })?;

            for resource in observed {
                let declared_by_name = names.contains(&resource.id.name.to_lowercase());
                let declared_by_tag = state_tag(&resource.state)
                    .is_some_and(|tag| tags.contains(&tag.to_lowercase()));
                if declared_by_name || declared_by_tag {
                    continue;
                }

                let id = resource.id.node_id();
                if !self.options.includes(&id) {
                    continue;
                }

                debug!("{} is not declared, planning drop", id);
                steps.push(self.drop_step(resource.id, &resource.state));
            }
        }

        Ok(steps)
    }

    fn drop_step(&self, id: ResourceId, state: &Record) -> PlanStep {
        let observed = self.options.normalizer.normalize(state);
        PlanStep {
            id: id.node_id(),
            fingerprint: fingerprint(&observed),
            iac_action: IacAction::Drop,
            definition: Some(observed.clone()),
            declared: Record::new(),
            observed: Some(observed),
            resource_type: id.resource_type,
            name: id.name,
        }
    }
}
