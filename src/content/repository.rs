use std::collections::HashMap;

use crate::rules::evidence::EvidenceDef;
use crate::rules::recipe::DeductionRecipe;
use crate::rules::voice::VoiceDef;

/// Static, content-authored evidence definitions. Registration order is kept
/// so tooling output stays stable across runs.
#[derive(Debug, Default, Clone)]
pub struct EvidenceCatalog {
    entries: Vec<EvidenceDef>,
    by_id: HashMap<String, usize>,
}

impl EvidenceCatalog {
    pub fn register(&mut self, def: EvidenceDef) {
        if self.by_id.contains_key(&def.id) {
            return;
        }
        self.by_id.insert(def.id.clone(), self.entries.len());
        self.entries.push(def);
    }

    pub fn get(&self, id: &str) -> Option<&EvidenceDef> {
        self.by_id.get(id).map(|index| &self.entries[*index])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EvidenceDef> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Static, content-authored deduction recipes with a normalized-pair index.
/// The unordered input pair is unique across the registry; a duplicate pair is
/// a content bug the validator reports, so runtime lookup keeps the first.
#[derive(Debug, Default, Clone)]
pub struct RecipeRegistry {
    recipes: Vec<DeductionRecipe>,
    by_id: HashMap<String, usize>,
    by_pair: HashMap<String, usize>,
}

impl RecipeRegistry {
    pub fn register(&mut self, recipe: DeductionRecipe) {
        if self.by_id.contains_key(&recipe.id) {
            return;
        }
        let index = self.recipes.len();
        self.by_id.insert(recipe.id.clone(), index);
        self.by_pair.entry(recipe.pair_key()).or_insert(index);
        self.recipes.push(recipe);
    }

    pub fn get(&self, id: &str) -> Option<&DeductionRecipe> {
        self.by_id.get(id).map(|index| &self.recipes[*index])
    }

    /// Look up the recipe triggered by an unordered evidence pair.
    pub fn find_by_pair(&self, a: &str, b: &str) -> Option<&DeductionRecipe> {
        let key = crate::rules::recipe::normalize_pair(a, b);
        self.by_pair.get(&key).map(|index| &self.recipes[*index])
    }

    /// Recipes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &DeductionRecipe> {
        self.recipes.iter()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

/// Known voices of the inner parliament, in authored order.
#[derive(Debug, Default, Clone)]
pub struct VoiceRoster {
    voices: Vec<VoiceDef>,
}

impl VoiceRoster {
    pub fn register(&mut self, voice: VoiceDef) {
        if self.contains(&voice.id) {
            return;
        }
        self.voices.push(voice);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.voices.iter().any(|voice| voice.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VoiceDef> {
        self.voices.iter()
    }

    /// Position in authored order, used as a deterministic tie-breaker.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.voices.iter().position(|voice| voice.id == id)
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ContentStats {
    pub evidence_count: i64,
    pub recipe_count: i64,
    pub voice_count: i64,
}

pub trait ContentRepository {
    fn stats(&self) -> Result<ContentStats, Box<dyn std::error::Error>>;
    fn load_evidence_catalog(&self) -> Result<EvidenceCatalog, Box<dyn std::error::Error>>;
    fn load_recipe_registry(&self) -> Result<RecipeRegistry, Box<dyn std::error::Error>>;
    fn load_voice_roster(&self) -> Result<VoiceRoster, Box<dyn std::error::Error>>;
}
