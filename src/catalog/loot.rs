//! Loot resolution (spec §4.1).
//!
//! A pure function of `(creature_id, rules, override)` — calling it twice
//! with the same catalog state yields identical results (spec §8).

use std::collections::HashMap;

use serde_json::Value;

use super::ContentCatalog;

#[derive(Debug, Clone, PartialEq)]
pub struct LootResolution {
    pub loot_table_id: i64,
    pub gold_multiplier: f64,
    pub drop_bonus: i64,
    pub extra_table: Option<i64>,
}

impl Default for LootResolution {
    fn default() -> Self {
        Self {
            loot_table_id: 1,
            gold_multiplier: 1.0,
            drop_bonus: 0,
            extra_table: None,
        }
    }
}

/// Rule-map key, normalized at load time into a canonical non-negative
/// integer or the literal `default` tag (spec §9: "normalize at load time
/// into a single canonical representation... reject non-conforming
/// content; use a whitelist of allowed named tags").
///
/// The source tolerates a key being an integer, a numeric string, or an
/// interned string atom; that heterogeneity is resolved once here rather
/// than re-tried on every lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RuleKey {
    Id(i64),
    Default,
}

fn normalize_rule_key(raw: &str) -> Option<RuleKey> {
    if raw.starts_with('_') {
        // Metadata entries are ignored outright (spec §4.1).
        return None;
    }
    if raw == "default" {
        return Some(RuleKey::Default);
    }
    raw.parse::<i64>().ok().map(RuleKey::Id)
}

struct RaceMapping {
    base_table: i64,
}

struct TierModifier {
    table_offset: i64,
    gold_multiplier: f64,
    drop_bonus: i64,
    extra_table: Option<i64>,
}

struct DifficultyModifier {
    gold_multiplier: f64,
    drop_bonus: i64,
}

/// Parsed, normalized loot rule tree. Built once from the catalog's
/// `loot_rules` table (a single record keyed by id `1`, holding the three
/// nested rule maps as JSON objects).
pub struct LootRules {
    race_mappings: HashMap<RuleKey, RaceMapping>,
    tier_modifiers: HashMap<RuleKey, TierModifier>,
    difficulty_modifiers: HashMap<RuleKey, DifficultyModifier>,
}

impl LootRules {
    pub fn from_value(value: &Value) -> Self {
        let race_mappings = parse_object_map(value.get("race_mappings"), |entry| RaceMapping {
            base_table: entry.get("base_table").and_then(Value::as_i64).unwrap_or(1),
        });
        let tier_modifiers = parse_object_map(value.get("tier_modifiers"), |entry| TierModifier {
            table_offset: entry.get("table_offset").and_then(Value::as_i64).unwrap_or(0),
            gold_multiplier: entry
                .get("gold_multiplier")
                .and_then(Value::as_f64)
                .unwrap_or(1.0),
            drop_bonus: entry.get("drop_bonus").and_then(Value::as_i64).unwrap_or(0),
            extra_table: entry.get("extra_table").and_then(Value::as_i64),
        });
        let difficulty_modifiers =
            parse_object_map(value.get("difficulty_modifiers"), |entry| DifficultyModifier {
                gold_multiplier: entry
                    .get("gold_multiplier")
                    .and_then(Value::as_f64)
                    .unwrap_or(1.0),
                drop_bonus: entry.get("drop_bonus").and_then(Value::as_i64).unwrap_or(0),
            });
        Self {
            race_mappings,
            tier_modifiers,
            difficulty_modifiers,
        }
    }

    fn race(&self, race_id: i64) -> RaceMapping {
        self.race_mappings
            .get(&RuleKey::Id(race_id))
            .or_else(|| self.race_mappings.get(&RuleKey::Default))
            .map(|m| RaceMapping {
                base_table: m.base_table,
            })
            .unwrap_or(RaceMapping { base_table: 1 })
    }

    fn tier(&self, tier_id: i64) -> TierModifier {
        self.tier_modifiers
            .get(&RuleKey::Id(tier_id))
            .or_else(|| self.tier_modifiers.get(&RuleKey::Default))
            .map(|m| TierModifier {
                table_offset: m.table_offset,
                gold_multiplier: m.gold_multiplier,
                drop_bonus: m.drop_bonus,
                extra_table: m.extra_table,
            })
            .unwrap_or(TierModifier {
                table_offset: 0,
                gold_multiplier: 1.0,
                drop_bonus: 0,
                extra_table: None,
            })
    }

    fn difficulty(&self, difficulty_id: i64) -> DifficultyModifier {
        self.difficulty_modifiers
            .get(&RuleKey::Id(difficulty_id))
            .or_else(|| self.difficulty_modifiers.get(&RuleKey::Default))
            .map(|m| DifficultyModifier {
                gold_multiplier: m.gold_multiplier,
                drop_bonus: m.drop_bonus,
            })
            .unwrap_or(DifficultyModifier {
                gold_multiplier: 1.0,
                drop_bonus: 0,
            })
    }
}

fn parse_object_map<T>(
    value: Option<&Value>,
    parse_entry: impl Fn(&Value) -> T,
) -> HashMap<RuleKey, T> {
    let mut out = HashMap::new();
    let Some(Value::Object(map)) = value else {
        return out;
    };
    for (raw_key, entry) in map {
        if let Some(key) = normalize_rule_key(raw_key) {
            out.insert(key, parse_entry(entry));
        }
    }
    out
}

/// Resolves the loot table, gold multiplier, and drop bonus for a
/// creature, per the four-step algorithm in spec §4.1.
pub fn resolve_loot(
    catalog: &ContentCatalog,
    creature_id: i64,
    rules: Option<&LootRules>,
) -> LootResolution {
    // Step 1: per-creature override.
    if let Ok(entry) = catalog.get("creature_loot_overrides", creature_id) {
        return LootResolution {
            loot_table_id: entry
                .get("loot_table_id")
                .and_then(Value::as_i64)
                .unwrap_or(1),
            gold_multiplier: entry
                .get("gold_multiplier")
                .and_then(Value::as_f64)
                .unwrap_or(1.0),
            drop_bonus: entry.get("drop_bonus").and_then(Value::as_i64).unwrap_or(0),
            extra_table: entry.get("extra_table").and_then(Value::as_i64),
        };
    }

    // Step 4 (checked early): no template or no rules -> hard default.
    let Ok(creature) = catalog.get("creatures", creature_id) else {
        return LootResolution::default();
    };
    let Some(rules) = rules else {
        return LootResolution::default();
    };

    // Step 2: derive from race/tier/difficulty.
    let race_id = creature.get("race_id").and_then(Value::as_i64).unwrap_or(0);
    let tier_id = creature.get("tier_id").and_then(Value::as_i64).unwrap_or(0);
    let difficulty_id = creature
        .get("difficulty_id")
        .and_then(Value::as_i64)
        .unwrap_or(0);

    let race = rules.race(race_id);
    let tier = rules.tier(tier_id);
    let difficulty = rules.difficulty(difficulty_id);

    // Step 3: combine.
    LootResolution {
        loot_table_id: race.base_table + tier.table_offset,
        gold_multiplier: tier.gold_multiplier * difficulty.gold_multiplier,
        drop_bonus: tier.drop_bonus + difficulty.drop_bonus,
        extra_table: tier.extra_table,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog_with_creature(
        creature: Value,
        overrides: Vec<Value>,
    ) -> ContentCatalog {
        ContentCatalog::builder()
            .with_table("creatures", vec![creature])
            .unwrap()
            .with_table("creature_loot_overrides", overrides)
            .unwrap()
            .build()
    }

    #[test]
    fn falls_back_to_hard_default_when_creature_missing() {
        let catalog = ContentCatalog::builder()
            .with_table("creatures", vec![])
            .unwrap()
            .with_table("creature_loot_overrides", vec![])
            .unwrap()
            .build();
        let result = resolve_loot(&catalog, 999, None);
        assert_eq!(result, LootResolution::default());
    }

    #[test]
    fn override_short_circuits_race_tier_lookup() {
        let catalog = catalog_with_creature(
            json!({"id": 5, "race_id": 1, "tier_id": 1, "difficulty_id": 1}),
            vec![json!({"id": 5, "loot_table_id": 42})],
        );
        let result = resolve_loot(&catalog, 5, None);
        assert_eq!(result.loot_table_id, 42);
        assert_eq!(result.gold_multiplier, 1.0);
        assert_eq!(result.drop_bonus, 0);
    }

    #[test]
    fn combines_race_tier_and_difficulty_modifiers() {
        let catalog = catalog_with_creature(
            json!({"id": 7, "race_id": 10, "tier_id": 2, "difficulty_id": 3}),
            vec![],
        );
        let rules = LootRules::from_value(&json!({
            "race_mappings": {"10": {"base_table": 100}},
            "tier_modifiers": {"2": {"table_offset": 5, "gold_multiplier": 1.5, "drop_bonus": 2}},
            "difficulty_modifiers": {"3": {"gold_multiplier": 2.0, "drop_bonus": 1}},
        }));
        let result = resolve_loot(&catalog, 7, Some(&rules));
        assert_eq!(result.loot_table_id, 105);
        assert_eq!(result.gold_multiplier, 3.0);
        assert_eq!(result.drop_bonus, 3);
    }

    #[test]
    fn missing_race_mapping_falls_back_to_default_then_one() {
        let catalog = catalog_with_creature(
            json!({"id": 7, "race_id": 999, "tier_id": 0, "difficulty_id": 0}),
            vec![],
        );
        let rules = LootRules::from_value(&json!({}));
        let result = resolve_loot(&catalog, 7, Some(&rules));
        assert_eq!(result.loot_table_id, 1);
        assert_eq!(result.gold_multiplier, 1.0);
        assert_eq!(result.drop_bonus, 0);
    }

    #[test]
    fn metadata_keys_are_ignored() {
        let rules = LootRules::from_value(&json!({
            "tier_modifiers": {
                "_comment": "not a real tier",
                "1": {"table_offset": 9}
            }
        }));
        assert_eq!(rules.tier_modifiers.len(), 1);
    }

    #[test]
    fn resolution_is_pure_and_idempotent() {
        let catalog = catalog_with_creature(
            json!({"id": 1, "race_id": 1, "tier_id": 1, "difficulty_id": 1}),
            vec![],
        );
        let rules = LootRules::from_value(&json!({}));
        let a = resolve_loot(&catalog, 1, Some(&rules));
        let b = resolve_loot(&catalog, 1, Some(&rules));
        assert_eq!(a, b);
    }
}
