use std::collections::{HashMap, HashSet};

use crate::content::repository::{EvidenceCatalog, RecipeRegistry, VoiceRoster};
use crate::rules::recipe::{DeductionRecipe, OutcomePayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// One defect found in the authored registries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.errors.iter().chain(self.warnings.iter())
    }

    fn error(&mut self, code: &'static str, message: String) {
        self.errors.push(ValidationIssue {
            severity: IssueSeverity::Error,
            code,
            message,
        });
    }

    fn warning(&mut self, code: &'static str, message: String) {
        self.warnings.push(ValidationIssue {
            severity: IssueSeverity::Warning,
            code,
            message,
        });
    }
}

/// Offline structural analysis of the two static registries. Pure: touches no
/// live session state, so it can run in a content build pipeline.
pub fn validate_content(
    catalog: &EvidenceCatalog,
    registry: &RecipeRegistry,
    roster: &VoiceRoster,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    let recipes: Vec<&DeductionRecipe> = registry.iter().collect();

    check_duplicate_inputs(&recipes, &mut report);
    check_missing_evidence(catalog, &recipes, &mut report);
    check_missing_voices(roster, &recipes, &mut report);
    check_missing_confidence(&recipes, &mut report);
    check_unreachable_tiers(catalog, &recipes, &mut report);
    check_cycles(&recipes, &mut report);
    check_orphan_evidence(catalog, &recipes, &mut report);

    report
}

fn check_duplicate_inputs(recipes: &[&DeductionRecipe], report: &mut ValidationReport) {
    let mut by_pair: HashMap<String, Vec<&str>> = HashMap::new();
    for recipe in recipes {
        by_pair
            .entry(recipe.pair_key())
            .or_default()
            .push(&recipe.id);
    }
    let mut pairs: Vec<(String, Vec<&str>)> = by_pair.into_iter().collect();
    pairs.sort();
    for (pair, ids) in pairs {
        if ids.len() > 1 {
            report.error(
                "duplicate_inputs",
                format!(
                    "Input pair \"{}\" is used by multiple recipes: {}",
                    pair,
                    ids.join(", ")
                ),
            );
        }
    }
}

fn check_missing_evidence(
    catalog: &EvidenceCatalog,
    recipes: &[&DeductionRecipe],
    report: &mut ValidationReport,
) {
    // Inputs may reference evidence produced by other recipes, not only the
    // pre-authored catalog.
    let mut known: HashSet<&str> = catalog.iter().map(|def| def.id.as_str()).collect();
    for recipe in recipes {
        for produced in recipe.produced_evidence_ids() {
            known.insert(produced);
        }
    }
    for recipe in recipes {
        for input in &recipe.inputs {
            if !known.contains(input.as_str()) {
                report.error(
                    "missing_evidence",
                    format!(
                        "Recipe \"{}\" references unknown evidence \"{}\".",
                        recipe.id, input
                    ),
                );
            }
        }
    }
}

fn check_missing_voices(
    roster: &VoiceRoster,
    recipes: &[&DeductionRecipe],
    report: &mut ValidationReport,
) {
    for recipe in recipes {
        for voice_id in recipe.relevant_voice_ids() {
            if !roster.contains(voice_id) {
                report.error(
                    "missing_voice",
                    format!(
                        "Recipe \"{}\" references unknown voice \"{}\".",
                        recipe.id, voice_id
                    ),
                );
            }
        }
    }
}

fn check_missing_confidence(recipes: &[&DeductionRecipe], report: &mut ValidationReport) {
    for recipe in recipes {
        for outcome in recipe.outcomes() {
            if let OutcomePayload::Hypothesis {
                base_confidence: None,
            } = outcome.payload
            {
                report.error(
                    "missing_confidence",
                    format!(
                        "Hypothesis outcome \"{}\" in recipe \"{}\" has no base confidence.",
                        outcome.id, recipe.id
                    ),
                );
            }
        }
    }
}

fn check_unreachable_tiers(
    catalog: &EvidenceCatalog,
    recipes: &[&DeductionRecipe],
    report: &mut ValidationReport,
) {
    // Fixpoint over evidence production: a recipe whose inputs are reachable
    // makes its produced evidence reachable too.
    let mut reachable: HashSet<&str> = catalog.iter().map(|def| def.id.as_str()).collect();
    let mut changed = true;
    while changed {
        changed = false;
        for recipe in recipes {
            if recipe
                .inputs
                .iter()
                .all(|input| reachable.contains(input.as_str()))
            {
                for produced in recipe.produced_evidence_ids() {
                    if reachable.insert(produced) {
                        changed = true;
                    }
                }
            }
        }
    }

    for recipe in recipes {
        let tier = recipe.tier();
        if tier < 2 {
            continue;
        }
        if let Some(unreachable) = recipe
            .inputs
            .iter()
            .find(|input| !reachable.contains(input.as_str()))
        {
            report.error(
                "unreachable_tier",
                format!(
                    "Tier-{} recipe \"{}\" is unreachable because \"{}\" cannot be reached.",
                    tier, recipe.id, unreachable
                ),
            );
        }
    }
}

fn check_cycles(recipes: &[&DeductionRecipe], report: &mut ValidationReport) {
    // Edge A -> B when A produces evidence that B consumes.
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); recipes.len()];
    for (from, recipe) in recipes.iter().enumerate() {
        let produced: HashSet<&str> = recipe.produced_evidence_ids().into_iter().collect();
        if produced.is_empty() {
            continue;
        }
        // A recipe that regenerates one of its own inputs is a self-loop.
        for (to, candidate) in recipes.iter().enumerate() {
            if candidate
                .inputs
                .iter()
                .any(|input| produced.contains(input.as_str()))
            {
                adjacency[from].push(to);
            }
        }
    }

    for mut component in strongly_connected_components(&adjacency) {
        let is_self_loop =
            component.len() == 1 && adjacency[component[0]].contains(&component[0]);
        if component.len() < 2 && !is_self_loop {
            continue;
        }

        let has_exit = component.iter().any(|&node| {
            recipes[node]
                .outcomes()
                .iter()
                .any(|outcome| outcome.kind().is_exit())
        });
        if has_exit {
            continue;
        }

        component.sort();
        let ids: Vec<&str> = component.iter().map(|&node| recipes[node].id.as_str()).collect();
        report.error(
            "cycle_without_exit",
            format!("Cycle without exit detected: {}", ids.join(" -> ")),
        );
    }
}

fn check_orphan_evidence(
    catalog: &EvidenceCatalog,
    recipes: &[&DeductionRecipe],
    report: &mut ValidationReport,
) {
    let used: HashSet<&str> = recipes
        .iter()
        .flat_map(|recipe| recipe.inputs.iter().map(String::as_str))
        .collect();
    for def in catalog.iter() {
        if !used.contains(def.id.as_str()) {
            report.warning(
                "orphan_evidence",
                format!(
                    "Evidence \"{}\" is not used as an input by any recipe.",
                    def.id
                ),
            );
        }
    }
}

/// Tarjan's strongly-connected-components over an adjacency list, O(V+E).
/// Runs on an explicit work stack so content volume can never overflow the
/// call stack.
fn strongly_connected_components(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
    const UNVISITED: usize = usize::MAX;

    let node_count = adjacency.len();
    let mut index = vec![UNVISITED; node_count];
    let mut lowlink = vec![0usize; node_count];
    let mut on_stack = vec![false; node_count];
    let mut stack: Vec<usize> = Vec::new();
    let mut next_index = 0usize;
    let mut components: Vec<Vec<usize>> = Vec::new();

    // (node, next neighbor offset) frames replacing recursion.
    let mut work: Vec<(usize, usize)> = Vec::new();

    for start in 0..node_count {
        if index[start] != UNVISITED {
            continue;
        }
        index[start] = next_index;
        lowlink[start] = next_index;
        next_index += 1;
        stack.push(start);
        on_stack[start] = true;
        work.push((start, 0));

        while let Some(frame) = work.last_mut() {
            let (node, offset) = *frame;
            if offset < adjacency[node].len() {
                frame.1 += 1;
                let next = adjacency[node][offset];
                if index[next] == UNVISITED {
                    index[next] = next_index;
                    lowlink[next] = next_index;
                    next_index += 1;
                    stack.push(next);
                    on_stack[next] = true;
                    work.push((next, 0));
                } else if on_stack[next] {
                    lowlink[node] = lowlink[node].min(index[next]);
                }
            } else {
                work.pop();
                if let Some(parent) = work.last() {
                    lowlink[parent.0] = lowlink[parent.0].min(lowlink[node]);
                }
                if lowlink[node] == index[node] {
                    let mut component = Vec::new();
                    while let Some(top) = stack.pop() {
                        on_stack[top] = false;
                        component.push(top);
                        if top == node {
                            break;
                        }
                    }
                    components.push(component);
                }
            }
        }
    }

    components
}
