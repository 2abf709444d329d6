use std::collections::BTreeMap;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::rules::evidence::EvidenceDef;

/// Discovery state of a map point unlocked by deductions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointState {
    Discovered,
    Visited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Added,
    Upgraded,
    Destroyed,
}

/// Append-only audit record of a change to the live evidence set. `seq` is a
/// session-monotonic counter, so replays stay deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceMutation {
    pub seq: u64,
    pub kind: MutationKind,
    pub evidence_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caused_by: Option<String>,
}

/// The live dossier of one player session: held evidence, solved recipes,
/// flags and point states touched by outcomes, and the hint resource.
#[derive(Resource, Debug, Clone, Default)]
pub struct Dossier {
    pub evidence: Vec<EvidenceDef>,
    pub solved: Vec<String>,
    pub flags: BTreeMap<String, bool>,
    pub point_states: BTreeMap<String, PointState>,
    pub history: Vec<EvidenceMutation>,
    pub thought_points: u32,
    next_seq: u64,
}

impl Dossier {
    pub fn has_evidence(&self, id: &str) -> bool {
        self.evidence.iter().any(|item| item.id == id)
    }

    pub fn evidence(&self, id: &str) -> Option<&EvidenceDef> {
        self.evidence.iter().find(|item| item.id == id)
    }

    /// Add evidence to the live set. Duplicate ids are ignored and produce no
    /// history entry.
    pub fn add_evidence(&mut self, item: EvidenceDef, caused_by: Option<&str>) -> bool {
        if self.has_evidence(&item.id) {
            return false;
        }
        self.record(MutationKind::Added, &item.id, caused_by);
        self.evidence.push(item);
        true
    }

    /// Remove evidence from the live set, recording the given mutation kind.
    pub fn remove_evidence(&mut self, id: &str, kind: MutationKind, caused_by: Option<&str>) -> bool {
        let before = self.evidence.len();
        self.evidence.retain(|item| item.id != id);
        if self.evidence.len() == before {
            return false;
        }
        self.record(kind, id, caused_by);
        true
    }

    /// Record an upgrade grant: the removal side is logged separately by
    /// `remove_evidence`.
    pub fn add_upgraded_evidence(&mut self, item: EvidenceDef, caused_by: Option<&str>) {
        // Upgrades may reuse an id that was just removed; plain add covers that.
        if self.has_evidence(&item.id) {
            return;
        }
        self.record(MutationKind::Upgraded, &item.id, caused_by);
        self.evidence.push(item);
    }

    pub fn is_solved(&self, recipe_id: &str) -> bool {
        self.solved.iter().any(|id| id == recipe_id)
    }

    pub fn mark_solved(&mut self, recipe_id: &str) {
        if !self.is_solved(recipe_id) {
            self.solved.push(recipe_id.to_string());
        }
    }

    pub fn set_flag(&mut self, flag: &str, value: bool) {
        self.flags.insert(flag.to_string(), value);
    }

    pub fn flag(&self, flag: &str) -> bool {
        self.flags.get(flag).copied().unwrap_or(false)
    }

    /// Mark a point discovered. Never downgrades a point already visited.
    pub fn discover_point(&mut self, point_id: &str) {
        match self.point_states.get(point_id) {
            Some(PointState::Visited) => {}
            _ => {
                self.point_states
                    .insert(point_id.to_string(), PointState::Discovered);
            }
        }
    }

    pub fn point_state(&self, point_id: &str) -> Option<PointState> {
        self.point_states.get(point_id).copied()
    }

    fn record(&mut self, kind: MutationKind, evidence_id: &str, caused_by: Option<&str>) {
        self.next_seq += 1;
        self.history.push(EvidenceMutation {
            seq: self.next_seq,
            kind,
            evidence_id: evidence_id.to_string(),
            caused_by: caused_by.map(str::to_string),
        });
    }

    /// Restore the sequence counter after loading a snapshot.
    pub fn sync_next_seq(&mut self) {
        self.next_seq = self.history.iter().map(|entry| entry.seq).max().unwrap_or(0);
    }
}
