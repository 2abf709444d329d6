use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;

use crate::content::repository::{
    ContentRepository, ContentStats, EvidenceCatalog, RecipeRegistry, VoiceRoster,
};
use crate::content::schema::{CONTENT_SCHEMA_VERSION, CONTENT_VERSION};
use crate::rules::evidence::EvidenceDef;
use crate::rules::recipe::{recipe_outcome_from_json, DeductionRecipe, VoiceGate, VoiceReaction};
use crate::rules::voice::VoiceDef;

/// Content repository backed by the exported case-pack SQLite database.
pub struct SqliteContentRepository {
    conn: Connection,
}

impl SqliteContentRepository {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let conn = Connection::open(path)?;
        validate_content_meta(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl ContentRepository for SqliteContentRepository {
    fn stats(&self) -> Result<ContentStats, Box<dyn std::error::Error>> {
        Ok(ContentStats {
            evidence_count: count_rows(&self.conn, "evidence")?,
            recipe_count: count_rows(&self.conn, "deduction_recipe")?,
            voice_count: count_rows(&self.conn, "voice")?,
        })
    }

    fn load_evidence_catalog(&self) -> Result<EvidenceCatalog, Box<dyn std::error::Error>> {
        let mut stmt = self.conn.prepare(
            "SELECT evidence_id, name, description, icon, pack_id \
             FROM evidence ORDER BY rowid",
        )?;

        let rows = stmt.query_map([], |row| {
            let evidence_id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let description: String = row.get(2)?;
            let icon: Option<String> = row.get(3)?;
            let pack_id: String = row.get(4)?;
            Ok((evidence_id, name, description, icon, pack_id))
        })?;

        let mut catalog = EvidenceCatalog::default();
        for row in rows {
            let (evidence_id, name, description, icon, pack_id) = row?;
            catalog.register(EvidenceDef {
                id: evidence_id,
                name,
                description,
                icon,
                pack_id,
            });
        }
        Ok(catalog)
    }

    fn load_recipe_registry(&self) -> Result<RecipeRegistry, Box<dyn std::error::Error>> {
        let reactions = load_reactions(&self.conn)?;

        let mut stmt = self.conn.prepare(
            "SELECT recipe_id, input_a, input_b, is_red_herring, \
                    gate_voice_id, gate_min_level, conflicts_with, outcome \
             FROM deduction_recipe ORDER BY rowid",
        )?;

        let rows = stmt.query_map([], |row| {
            let recipe_id: String = row.get(0)?;
            let input_a: String = row.get(1)?;
            let input_b: String = row.get(2)?;
            let is_red_herring: i64 = row.get(3)?;
            let gate_voice_id: Option<String> = row.get(4)?;
            let gate_min_level: Option<i64> = row.get(5)?;
            let conflicts_raw: Option<String> = row.get(6)?;
            let outcome_raw: String = row.get(7)?;
            Ok((
                recipe_id,
                input_a,
                input_b,
                is_red_herring,
                gate_voice_id,
                gate_min_level,
                conflicts_raw,
                outcome_raw,
            ))
        })?;

        let mut registry = RecipeRegistry::default();
        for row in rows {
            let (
                recipe_id,
                input_a,
                input_b,
                is_red_herring,
                gate_voice_id,
                gate_min_level,
                conflicts_raw,
                outcome_raw,
            ) = row?;

            let outcome_json: Value = serde_json::from_str(&outcome_raw)?;
            let outcome = recipe_outcome_from_json(&recipe_id, &outcome_json)?;

            let required_gate = match (gate_voice_id, gate_min_level) {
                (Some(voice_id), Some(min_level)) => Some(VoiceGate { voice_id, min_level }),
                _ => None,
            };

            let conflicts_with = match conflicts_raw {
                Some(raw) if !raw.is_empty() => {
                    let parsed: Value = serde_json::from_str(&raw)?;
                    parsed
                        .as_array()
                        .map(|ids| {
                            ids.iter()
                                .filter_map(Value::as_str)
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default()
                }
                _ => Vec::new(),
            };

            registry.register(DeductionRecipe {
                voice_reactions: reactions.get(&recipe_id).cloned().unwrap_or_default(),
                id: recipe_id,
                inputs: [input_a, input_b],
                outcome,
                required_gate,
                is_red_herring: is_red_herring != 0,
                conflicts_with,
            });
        }
        Ok(registry)
    }

    fn load_voice_roster(&self) -> Result<VoiceRoster, Box<dyn std::error::Error>> {
        let mut stmt = self
            .conn
            .prepare("SELECT voice_id, name, voice_group FROM voice ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            let voice_id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let group: String = row.get(2)?;
            Ok((voice_id, name, group))
        })?;

        let mut roster = VoiceRoster::default();
        for row in rows {
            let (voice_id, name, group) = row?;
            roster.register(VoiceDef {
                id: voice_id,
                name,
                group,
            });
        }
        Ok(roster)
    }
}

fn load_reactions(
    conn: &Connection,
) -> Result<HashMap<String, Vec<VoiceReaction>>, Box<dyn std::error::Error>> {
    let mut stmt = conn.prepare(
        "SELECT recipe_id, voice_id, trigger, threshold, text \
         FROM voice_reaction ORDER BY rowid",
    )?;

    let rows = stmt.query_map([], |row| {
        let recipe_id: String = row.get(0)?;
        let voice_id: String = row.get(1)?;
        let trigger: String = row.get(2)?;
        let threshold: Option<i64> = row.get(3)?;
        let text: String = row.get(4)?;
        Ok((recipe_id, voice_id, trigger, threshold, text))
    })?;

    let mut out: HashMap<String, Vec<VoiceReaction>> = HashMap::new();
    for row in rows {
        let (recipe_id, voice_id, trigger, threshold, text) = row?;
        let trigger = crate::rules::recipe::ReactionTrigger::from_str(&trigger)?;
        out.entry(recipe_id).or_default().push(VoiceReaction {
            voice_id,
            trigger,
            threshold,
            text,
        });
    }
    Ok(out)
}

fn count_rows(conn: &Connection, table: &str) -> Result<i64, Box<dyn std::error::Error>> {
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    let count = conn.query_row(&sql, [], |row| row.get::<_, i64>(0))?;
    Ok(count)
}

fn validate_content_meta(conn: &Connection) -> Result<(), Box<dyn std::error::Error>> {
    let table = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type='table' AND name='content_meta'",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    if table.is_none() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "content_meta table missing (re-export the case pack with tools/export_case_pack.py)",
        )
        .into());
    }

    let meta = conn
        .query_row(
            "SELECT schema_version, content_version FROM content_meta WHERE id = 1",
            [],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;

    let Some((schema_version, content_version)) = meta else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "content_meta missing row id=1",
        )
        .into());
    };

    if schema_version != CONTENT_SCHEMA_VERSION {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "content_meta schema_version {} != expected {}",
                schema_version, CONTENT_SCHEMA_VERSION
            ),
        )
        .into());
    }
    if content_version != CONTENT_VERSION {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "content_meta content_version {} != expected {}",
                content_version, CONTENT_VERSION
            ),
        )
        .into());
    }

    Ok(())
}
