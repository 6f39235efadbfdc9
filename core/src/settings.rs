//! `Settings`: a partial record of dimlet configuration
//!
//! Every field is independently present or absent. Rules carry partial
//! `Settings`; resolution merges them first-match-wins until every field is
//! present.
//!
//! # Textual form
//!
//! ```json
//! { "rarity": 3, "create": 300, "maintain": 10, "ticks": 10, "worldgen": true, "dimlet": true }
//! ```
//!
//! Omitted keys (or `null`) are absent. Unknown keys are rejected since the
//! field set is closed. Integer fields also accept floats with no fractional
//! part (`3.0`).

use serde::{de, Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::RuleError;

/// Partial dimlet configuration.
///
/// # Example
///
/// ```
/// use dimrules::Settings;
///
/// let rule = Settings::new().with_rarity(3).with_worldgen(true);
/// let fallback = Settings::new().with_rarity(9).with_create_cost(100);
///
/// let merged = rule.merge(&fallback);
/// assert_eq!(merged.rarity(), Some(3));      // receiver wins
/// assert_eq!(merged.create_cost(), Some(100)); // gap filled
/// assert!(!merged.is_complete());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default, deserialize_with = "integral")]
    rarity: Option<i32>,
    #[serde(default, rename = "create", deserialize_with = "integral")]
    create_cost: Option<i32>,
    #[serde(default, rename = "maintain", deserialize_with = "integral")]
    maintain_cost: Option<i32>,
    #[serde(default, rename = "ticks", deserialize_with = "integral")]
    tick_cost: Option<i32>,
    #[serde(default)]
    worldgen: Option<bool>,
    #[serde(default)]
    dimlet: Option<bool>,
}

impl Settings {
    /// An empty record: every field absent.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rarity weight; lower is more common.
    #[must_use]
    pub fn rarity(&self) -> Option<i32> {
        self.rarity
    }

    /// Energy needed to create a dimension containing the dimlet.
    #[must_use]
    pub fn create_cost(&self) -> Option<i32> {
        self.create_cost
    }

    /// Per-tick maintenance energy. Negative values reduce upkeep.
    #[must_use]
    pub fn maintain_cost(&self) -> Option<i32> {
        self.maintain_cost
    }

    /// Ticks the dimlet adds to dimension build time.
    #[must_use]
    pub fn tick_cost(&self) -> Option<i32> {
        self.tick_cost
    }

    /// Whether the dimlet can appear in world generation loot.
    #[must_use]
    pub fn worldgen(&self) -> Option<bool> {
        self.worldgen
    }

    /// Whether the dimlet exists as an item at all.
    #[must_use]
    pub fn dimlet(&self) -> Option<bool> {
        self.dimlet
    }

    /// Set the rarity.
    #[must_use]
    pub fn with_rarity(mut self, rarity: i32) -> Self {
        self.rarity = Some(rarity);
        self
    }

    /// Set the creation cost.
    #[must_use]
    pub fn with_create_cost(mut self, cost: i32) -> Self {
        self.create_cost = Some(cost);
        self
    }

    /// Set the maintenance cost.
    #[must_use]
    pub fn with_maintain_cost(mut self, cost: i32) -> Self {
        self.maintain_cost = Some(cost);
        self
    }

    /// Set the tick cost.
    #[must_use]
    pub fn with_tick_cost(mut self, cost: i32) -> Self {
        self.tick_cost = Some(cost);
        self
    }

    /// Set whether the dimlet generates in the world.
    #[must_use]
    pub fn with_worldgen(mut self, worldgen: bool) -> Self {
        self.worldgen = Some(worldgen);
        self
    }

    /// Set whether the dimlet exists as an item.
    #[must_use]
    pub fn with_dimlet(mut self, dimlet: bool) -> Self {
        self.dimlet = Some(dimlet);
        self
    }

    /// Merge two records, first-match-wins.
    ///
    /// Fields present in `self` are kept; fields absent in `self` are taken
    /// from `other`.
    #[must_use]
    pub fn merge(&self, other: &Settings) -> Settings {
        Settings {
            rarity: self.rarity.or(other.rarity),
            create_cost: self.create_cost.or(other.create_cost),
            maintain_cost: self.maintain_cost.or(other.maintain_cost),
            tick_cost: self.tick_cost.or(other.tick_cost),
            worldgen: self.worldgen.or(other.worldgen),
            dimlet: self.dimlet.or(other.dimlet),
        }
    }

    /// Returns `true` if no field is absent.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.rarity.is_some()
            && self.create_cost.is_some()
            && self.maintain_cost.is_some()
            && self.tick_cost.is_some()
            && self.worldgen.is_some()
            && self.dimlet.is_some()
    }

    /// Returns `true` if every field is absent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Parse the JSON textual form.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::MalformedSettings`] if the value is not an object,
    /// contains an unknown key, or a value has the wrong type (e.g. a string
    /// where an integer is expected, or an integer out of `i32` range).
    pub fn parse(value: &Value) -> Result<Self, RuleError> {
        // Derived struct visitors also accept sequences; the textual form is object-only.
        if !value.is_object() {
            return Err(RuleError::MalformedSettings {
                source: serde::de::Error::custom(format!("expected an object, found {value}")),
            });
        }
        Settings::deserialize(value).map_err(|source| RuleError::MalformedSettings { source })
    }

    /// Render the JSON textual form. Absent fields are omitted.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        if let Some(v) = self.rarity {
            map.insert("rarity".into(), v.into());
        }
        if let Some(v) = self.create_cost {
            map.insert("create".into(), v.into());
        }
        if let Some(v) = self.maintain_cost {
            map.insert("maintain".into(), v.into());
        }
        if let Some(v) = self.tick_cost {
            map.insert("ticks".into(), v.into());
        }
        if let Some(v) = self.worldgen {
            map.insert("worldgen".into(), v.into());
        }
        if let Some(v) = self.dimlet {
            map.insert("dimlet".into(), v.into());
        }
        Value::Object(map)
    }
}

/// Integer field that also accepts whole floats, as hand-edited files may hold `3.0`.
fn integral<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let whole = number.as_i64().or_else(|| {
        number
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    });
    whole
        .and_then(|n| i32::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| de::Error::custom(format!("{number} is not a 32-bit integer")))
}

/// Mutable accumulator for resolution.
///
/// Starts empty; each [`merge_in`](Self::merge_in) only fills fields that are
/// still absent, so the first rule to set a field owns it.
#[derive(Debug, Clone, Default)]
pub struct SettingsBuilder {
    acc: Settings,
}

impl SettingsBuilder {
    /// An empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill absent fields from `settings`.
    pub fn merge_in(&mut self, settings: &Settings) -> &mut Self {
        self.acc = self.acc.merge(settings);
        self
    }

    /// Returns `true` if the accumulated record is complete.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.acc.is_complete()
    }

    /// Finish accumulation. Absent fields stay absent; callers apply their own
    /// type-intrinsic defaults.
    #[must_use]
    pub fn complete(self) -> Self {
        self
    }

    /// Freeze into an immutable [`Settings`].
    #[must_use]
    pub fn build(self) -> Settings {
        self.acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full() -> Settings {
        Settings::new()
            .with_rarity(3)
            .with_create_cost(300)
            .with_maintain_cost(-10)
            .with_tick_cost(10)
            .with_worldgen(true)
            .with_dimlet(true)
    }

    #[test]
    fn empty_is_not_complete() {
        assert!(!Settings::new().is_complete());
        assert!(Settings::new().is_empty());
    }

    #[test]
    fn full_is_complete() {
        assert!(full().is_complete());
        assert!(!full().is_empty());
    }

    #[test]
    fn merge_keeps_receiver_values() {
        let a = Settings::new().with_rarity(1).with_worldgen(false);
        let b = Settings::new().with_rarity(7).with_dimlet(true);
        let merged = a.merge(&b);
        assert_eq!(merged.rarity(), Some(1));
        assert_eq!(merged.worldgen(), Some(false));
        assert_eq!(merged.dimlet(), Some(true));
        assert_eq!(merged.create_cost(), None);
    }

    #[test]
    fn merge_with_empty_is_identity() {
        assert_eq!(full().merge(&Settings::new()), full());
        assert_eq!(Settings::new().merge(&full()), full());
    }

    #[test]
    fn builder_first_merge_wins() {
        let mut builder = SettingsBuilder::new();
        builder
            .merge_in(&Settings::new().with_rarity(2))
            .merge_in(&Settings::new().with_rarity(5).with_tick_cost(4));
        let built = builder.complete().build();
        assert_eq!(built.rarity(), Some(2));
        assert_eq!(built.tick_cost(), Some(4));
    }

    #[test]
    fn parse_only_present_fields() {
        let s = Settings::parse(&json!({ "rarity": 4, "worldgen": false })).unwrap();
        assert_eq!(s, Settings::new().with_rarity(4).with_worldgen(false));
    }

    #[test]
    fn parse_null_is_absent() {
        let s = Settings::parse(&json!({ "rarity": null, "dimlet": true })).unwrap();
        assert_eq!(s, Settings::new().with_dimlet(true));
    }

    #[test]
    fn parse_rejects_wrong_types() {
        for bad in [
            json!({ "rarity": "high" }),
            json!({ "worldgen": 1 }),
            json!({ "create": 1.5 }),
            json!({ "ticks": 3_000_000_000_i64 }),
            json!([1, 2]),
            json!("rarity"),
        ] {
            let err = Settings::parse(&bad).unwrap_err();
            assert!(
                matches!(err, RuleError::MalformedSettings { .. }),
                "expected MalformedSettings for {bad}"
            );
        }
    }

    #[test]
    fn parse_accepts_whole_floats() {
        let s = Settings::parse(&json!({ "rarity": 3.0, "maintain": -20.0 })).unwrap();
        assert_eq!(s, Settings::new().with_rarity(3).with_maintain_cost(-20));

        for bad in [json!({ "rarity": 3.5 }), json!({ "ticks": 1e12 })] {
            assert!(Settings::parse(&bad).is_err(), "expected error for {bad}");
        }
    }

    #[test]
    fn parse_rejects_unknown_keys() {
        let err = Settings::parse(&json!({ "rarty": 3 })).unwrap_err();
        assert!(err.to_string().contains("rarty"));
    }

    #[test]
    fn to_json_omits_absent_fields() {
        let s = Settings::new().with_maintain_cost(-5);
        assert_eq!(s.to_json(), json!({ "maintain": -5 }));
        assert_eq!(Settings::new().to_json(), json!({}));
    }

    #[test]
    fn round_trip() {
        for s in [
            Settings::new(),
            full(),
            Settings::new().with_worldgen(false),
            Settings::new().with_create_cost(i32::MIN).with_dimlet(false),
        ] {
            assert_eq!(Settings::parse(&s.to_json()).unwrap(), s);
        }
    }
}
