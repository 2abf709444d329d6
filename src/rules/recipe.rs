use std::str::FromStr;

use serde_json::Value;

use crate::rules::evidence::EvidenceDef;

/// A minimum skill-level requirement on one voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceGate {
    pub voice_id: String,
    pub min_level: i64,
}

impl VoiceGate {
    pub fn new(voice_id: &str, min_level: i64) -> Self {
        Self {
            voice_id: voice_id.to_string(),
            min_level,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionTrigger {
    Attempt,
    Success,
    Fail,
    Locked,
}

/// Flavor line surfaced when a skill check of the given trigger fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceReaction {
    pub voice_id: String,
    pub trigger: ReactionTrigger,
    pub threshold: Option<i64>,
    pub text: String,
}

impl VoiceReaction {
    /// Whether the reaction fires at the given voice level. A reaction with no
    /// threshold always fires.
    pub fn fires_at(&self, level: i64) -> bool {
        match self.threshold {
            Some(threshold) => level >= threshold,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    AddFlag,
    UnlockPoint,
    GrantEvidence,
    UpgradeEvidence,
    DestroyEvidence,
    Hypothesis,
    Narrative,
    Minigame,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::AddFlag => "add_flag",
            OutcomeKind::UnlockPoint => "unlock_point",
            OutcomeKind::GrantEvidence => "grant_evidence",
            OutcomeKind::UpgradeEvidence => "upgrade_evidence",
            OutcomeKind::DestroyEvidence => "destroy_evidence",
            OutcomeKind::Hypothesis => "hypothesis",
            OutcomeKind::Narrative => "narrative",
            OutcomeKind::Minigame => "minigame",
        }
    }

    /// Exit kinds break evidence-production loops: they advance world state
    /// instead of feeding more evidence back into the graph.
    pub fn is_exit(&self) -> bool {
        matches!(self, OutcomeKind::AddFlag | OutcomeKind::UnlockPoint)
    }
}

/// Kind-specific payload of an outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomePayload {
    AddFlag,
    UnlockPoint,
    GrantEvidence {
        grants: EvidenceDef,
    },
    UpgradeEvidence {
        removes: Vec<String>,
        grants: EvidenceDef,
    },
    DestroyEvidence {
        removes: Vec<String>,
    },
    Hypothesis {
        /// Kept optional so the validator can flag authoring gaps; the
        /// resolver substitutes a neutral 50 if one slips through.
        base_confidence: Option<i64>,
    },
    Narrative,
    Minigame,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub id: String,
    pub label: String,
    pub description: String,
    pub tier: u8,
    pub payload: OutcomePayload,
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self.payload {
            OutcomePayload::AddFlag => OutcomeKind::AddFlag,
            OutcomePayload::UnlockPoint => OutcomeKind::UnlockPoint,
            OutcomePayload::GrantEvidence { .. } => OutcomeKind::GrantEvidence,
            OutcomePayload::UpgradeEvidence { .. } => OutcomeKind::UpgradeEvidence,
            OutcomePayload::DestroyEvidence { .. } => OutcomeKind::DestroyEvidence,
            OutcomePayload::Hypothesis { .. } => OutcomeKind::Hypothesis,
            OutcomePayload::Narrative => OutcomeKind::Narrative,
            OutcomePayload::Minigame => OutcomeKind::Minigame,
        }
    }

    /// Evidence ids this outcome adds to the live set when applied.
    pub fn produced_evidence(&self) -> Vec<&str> {
        match &self.payload {
            OutcomePayload::GrantEvidence { grants }
            | OutcomePayload::UpgradeEvidence { grants, .. } => vec![grants.id.as_str()],
            _ => Vec::new(),
        }
    }
}

/// Either a single unconditional outcome or an ordered list of gated branches.
#[derive(Debug, Clone, PartialEq)]
pub enum RecipeOutcome {
    Single(Outcome),
    Conditional(Vec<ConditionalOutcome>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalOutcome {
    pub condition: BranchCondition,
    pub outcome: Outcome,
}

/// Branch gate. The wire format uses the string sentinel `"default"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchCondition {
    Default,
    Gate(VoiceGate),
}

/// An authored rule mapping an unordered pair of evidence to outcomes.
#[derive(Debug, Clone, PartialEq)]
pub struct DeductionRecipe {
    pub id: String,
    pub inputs: [String; 2],
    pub outcome: RecipeOutcome,
    pub required_gate: Option<VoiceGate>,
    pub voice_reactions: Vec<VoiceReaction>,
    pub is_red_herring: bool,
    pub conflicts_with: Vec<String>,
}

impl DeductionRecipe {
    pub fn new(id: &str, input_a: &str, input_b: &str, outcome: Outcome) -> Self {
        Self {
            id: id.to_string(),
            inputs: [input_a.to_string(), input_b.to_string()],
            outcome: RecipeOutcome::Single(outcome),
            required_gate: None,
            voice_reactions: Vec::new(),
            is_red_herring: false,
            conflicts_with: Vec::new(),
        }
    }

    /// Normalized key for the unordered input pair.
    pub fn pair_key(&self) -> String {
        normalize_pair(&self.inputs[0], &self.inputs[1])
    }

    /// All outcomes the recipe can produce, in declaration order.
    pub fn outcomes(&self) -> Vec<&Outcome> {
        match &self.outcome {
            RecipeOutcome::Single(outcome) => vec![outcome],
            RecipeOutcome::Conditional(branches) => {
                branches.iter().map(|branch| &branch.outcome).collect()
            }
        }
    }

    /// Evidence ids any of this recipe's outcomes can add to the live set.
    pub fn produced_evidence_ids(&self) -> Vec<&str> {
        self.outcomes()
            .iter()
            .flat_map(|outcome| outcome.produced_evidence())
            .collect()
    }

    /// Highest tier across the recipe's outcomes.
    pub fn tier(&self) -> u8 {
        self.outcomes()
            .iter()
            .map(|outcome| outcome.tier)
            .max()
            .unwrap_or(0)
    }

    /// Voice ids referenced by the gate, reactions, or conditional branches,
    /// deduplicated in first-reference order.
    pub fn relevant_voice_ids(&self) -> Vec<&str> {
        fn push_unique<'a>(out: &mut Vec<&'a str>, id: &'a str) {
            if !out.iter().any(|known| *known == id) {
                out.push(id);
            }
        }
        let mut out: Vec<&str> = Vec::new();
        if let Some(gate) = &self.required_gate {
            push_unique(&mut out, &gate.voice_id);
        }
        for reaction in &self.voice_reactions {
            push_unique(&mut out, &reaction.voice_id);
        }
        if let RecipeOutcome::Conditional(branches) = &self.outcome {
            for branch in branches {
                if let BranchCondition::Gate(gate) = &branch.condition {
                    push_unique(&mut out, &gate.voice_id);
                }
            }
        }
        out
    }
}

/// Normalized lookup key for an unordered evidence pair.
pub fn normalize_pair(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}::{}", a, b)
    } else {
        format!("{}::{}", b, a)
    }
}

#[derive(Debug)]
pub struct ParseEnumError {
    pub value: String,
}

impl std::fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown enum value: {}", self.value)
    }
}

impl std::error::Error for ParseEnumError {}

impl FromStr for ReactionTrigger {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on_attempt" => Ok(ReactionTrigger::Attempt),
            "on_success" => Ok(ReactionTrigger::Success),
            "on_fail" => Ok(ReactionTrigger::Fail),
            "on_locked" => Ok(ReactionTrigger::Locked),
            _ => Err(ParseEnumError {
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug)]
pub enum RecipeDataError {
    MissingField {
        recipe_id: String,
        field: &'static str,
    },
    UnknownOutcomeKind {
        recipe_id: String,
        kind: String,
    },
    BadCondition {
        recipe_id: String,
    },
}

impl std::fmt::Display for RecipeDataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecipeDataError::MissingField { recipe_id, field } => {
                write!(f, "recipe {} outcome missing field {}", recipe_id, field)
            }
            RecipeDataError::UnknownOutcomeKind { recipe_id, kind } => {
                write!(f, "recipe {} has unknown outcome kind {}", recipe_id, kind)
            }
            RecipeDataError::BadCondition { recipe_id } => {
                write!(f, "recipe {} has a malformed branch condition", recipe_id)
            }
        }
    }
}

impl std::error::Error for RecipeDataError {}

impl Outcome {
    /// Parse an outcome from its JSON content column.
    pub fn from_json(recipe_id: &str, value: &Value) -> Result<Self, RecipeDataError> {
        let field = |name: &'static str| -> Result<String, RecipeDataError> {
            value
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or(RecipeDataError::MissingField {
                    recipe_id: recipe_id.to_string(),
                    field: name,
                })
        };

        let kind = field("type")?;
        let id = field("id")?;
        let label = field("label")?;
        let description = field("description")?;
        let tier = value
            .get("tier")
            .and_then(Value::as_u64)
            .map(|tier| tier.min(2) as u8)
            .unwrap_or(0);

        let payload = match kind.as_str() {
            "add_flag" => OutcomePayload::AddFlag,
            "unlock_point" => OutcomePayload::UnlockPoint,
            "grant_evidence" => OutcomePayload::GrantEvidence {
                grants: grants_from_json(recipe_id, value)?,
            },
            "upgrade_evidence" => OutcomePayload::UpgradeEvidence {
                removes: removes_from_json(value),
                grants: grants_from_json(recipe_id, value)?,
            },
            "destroy_evidence" => OutcomePayload::DestroyEvidence {
                removes: removes_from_json(value),
            },
            "hypothesis" => OutcomePayload::Hypothesis {
                base_confidence: value.get("base_confidence").and_then(Value::as_i64),
            },
            "narrative" => OutcomePayload::Narrative,
            "minigame" => OutcomePayload::Minigame,
            other => {
                return Err(RecipeDataError::UnknownOutcomeKind {
                    recipe_id: recipe_id.to_string(),
                    kind: other.to_string(),
                })
            }
        };

        Ok(Outcome {
            id,
            label,
            description,
            tier,
            payload,
        })
    }
}

/// Parse a recipe's outcome column: either a single outcome object or a list
/// of `{condition, outcome}` branches evaluated top to bottom.
pub fn recipe_outcome_from_json(
    recipe_id: &str,
    value: &Value,
) -> Result<RecipeOutcome, RecipeDataError> {
    let Some(entries) = value.as_array() else {
        return Ok(RecipeOutcome::Single(Outcome::from_json(recipe_id, value)?));
    };

    let mut branches = Vec::with_capacity(entries.len());
    for entry in entries {
        let condition = match entry.get("condition") {
            Some(Value::String(sentinel)) if sentinel == "default" => BranchCondition::Default,
            Some(Value::Object(_)) => {
                let gate = entry
                    .get("condition")
                    .and_then(gate_from_json)
                    .ok_or(RecipeDataError::BadCondition {
                        recipe_id: recipe_id.to_string(),
                    })?;
                BranchCondition::Gate(gate)
            }
            _ => {
                return Err(RecipeDataError::BadCondition {
                    recipe_id: recipe_id.to_string(),
                })
            }
        };
        let outcome_value = entry.get("outcome").ok_or(RecipeDataError::MissingField {
            recipe_id: recipe_id.to_string(),
            field: "outcome",
        })?;
        branches.push(ConditionalOutcome {
            condition,
            outcome: Outcome::from_json(recipe_id, outcome_value)?,
        });
    }
    Ok(RecipeOutcome::Conditional(branches))
}

fn gate_from_json(value: &Value) -> Option<VoiceGate> {
    let voice_id = value.get("voice_id").and_then(Value::as_str)?;
    let min_level = value.get("min_level").and_then(Value::as_i64)?;
    Some(VoiceGate::new(voice_id, min_level))
}

fn removes_from_json(value: &Value) -> Vec<String> {
    value
        .get("removes_evidence")
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn grants_from_json(recipe_id: &str, value: &Value) -> Result<EvidenceDef, RecipeDataError> {
    let grants = value
        .get("grants_evidence")
        .ok_or(RecipeDataError::MissingField {
            recipe_id: recipe_id.to_string(),
            field: "grants_evidence",
        })?;
    let field = |name: &'static str| -> Result<String, RecipeDataError> {
        grants
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(RecipeDataError::MissingField {
                recipe_id: recipe_id.to_string(),
                field: name,
            })
    };
    Ok(EvidenceDef {
        id: field("id")?,
        name: field("name")?,
        description: field("description")?,
        icon: grants
            .get("icon")
            .and_then(Value::as_str)
            .map(str::to_string),
        pack_id: field("pack_id")?,
    })
}
