//! `Filter`: the predicate half of a rule
//!
//! A filter is a conjunction of up to four independent clauses. An absent
//! clause is a wildcard, so the empty filter matches every query.
//!
//! # Textual form
//!
//! ```json
//! {
//!   "type": "material",
//!   "mod": ["minecraft", "biomesoplenty"],
//!   "name": "*_ore",
//!   "features": ["tileentity"]
//! }
//! ```
//!
//! `type`, `mod` and `name` take one value or a list; a list matches if any
//! entry matches. `features` must all be active in the query.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    DimletType, Feature, FeatureSet, NamePattern, RuleError, MAX_PATTERNS_PER_CLAUSE,
};

/// Rule predicate over `(type, mod, name, features)`.
///
/// # Example
///
/// ```
/// use dimrules::{DimletType, FeatureSet, Filter};
/// use serde_json::json;
///
/// let filter = Filter::parse(Some(&json!({ "type": "liquid", "mod": "minecraft" }))).unwrap();
/// let none = FeatureSet::new();
/// assert!(filter.matches(DimletType::Liquid, "minecraft", "minecraft:water", &none));
/// assert!(!filter.matches(DimletType::Material, "minecraft", "minecraft:water", &none));
///
/// assert!(Filter::any().matches(DimletType::Sky, "any", "thing", &none));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    types: Option<Vec<DimletType>>,
    mods: Option<Vec<NamePattern>>,
    names: Option<Vec<NamePattern>>,
    features: FeatureSet,
}

/// Serde shape of the textual form, before names are resolved.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FilterConfig {
    #[serde(default, rename = "type")]
    types: Option<OneOrMany>,
    #[serde(default, rename = "mod")]
    mods: Option<OneOrMany>,
    #[serde(default, rename = "name")]
    names: Option<OneOrMany>,
    #[serde(default)]
    features: Option<OneOrMany>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged, expecting = "a string or a list of strings")]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s],
            Self::Many(v) => v,
        }
    }
}

impl Filter {
    /// The wildcard filter. Matches every query.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Returns `true` if every clause is absent.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.types.is_none() && self.mods.is_none() && self.names.is_none() && self.features.is_empty()
    }

    /// Restrict to the given dimlet types. An empty iterator leaves the clause absent.
    #[must_use]
    pub fn with_types(mut self, types: impl IntoIterator<Item = DimletType>) -> Self {
        let types: Vec<_> = types.into_iter().collect();
        self.types = (!types.is_empty()).then_some(types);
        self
    }

    /// Restrict to mods matching any of the given patterns.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidPattern`] if a pattern is invalid.
    pub fn with_mods<S: AsRef<str>>(
        mut self,
        patterns: impl IntoIterator<Item = S>,
    ) -> Result<Self, RuleError> {
        self.mods = parse_patterns(patterns)?;
        Ok(self)
    }

    /// Restrict to identifiers matching any of the given patterns.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidPattern`] if a pattern is invalid.
    pub fn with_names<S: AsRef<str>>(
        mut self,
        patterns: impl IntoIterator<Item = S>,
    ) -> Result<Self, RuleError> {
        self.names = parse_patterns(patterns)?;
        Ok(self)
    }

    /// Require all of the given features to be active.
    #[must_use]
    pub fn with_features(mut self, features: impl IntoIterator<Item = Feature>) -> Self {
        self.features = features.into_iter().collect();
        self
    }

    /// Evaluate this filter against a query.
    ///
    /// Every present clause must match; absent clauses always match.
    #[must_use]
    pub fn matches(
        &self,
        kind: DimletType,
        mod_name: &str,
        name: &str,
        features: &FeatureSet,
    ) -> bool {
        self.types.as_ref().map_or(true, |ts| ts.contains(&kind))
            && self
                .mods
                .as_ref()
                .map_or(true, |ps| ps.iter().any(|p| p.matches(mod_name)))
            && self
                .names
                .as_ref()
                .map_or(true, |ps| ps.iter().any(|p| p.matches(name)))
            && self.features.is_subset(features)
    }

    /// Parse the textual form.
    ///
    /// `None`, `null` and `{}` all yield the wildcard filter.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::MalformedFilter`] for unknown keys, unknown type or
    /// feature names, empty lists, non-string entries, or invalid patterns.
    pub fn parse(value: Option<&Value>) -> Result<Self, RuleError> {
        let value = match value {
            None | Some(Value::Null) => return Ok(Self::any()),
            Some(v @ Value::Object(_)) => v,
            Some(other) => {
                return Err(RuleError::MalformedFilter {
                    reason: format!("expected an object, found {other}"),
                })
            }
        };
        let config = FilterConfig::deserialize(value).map_err(|e| RuleError::MalformedFilter {
            reason: e.to_string(),
        })?;

        let types = clause("type", config.types)?
            .map(|names| {
                names
                    .iter()
                    .map(|n| n.parse::<DimletType>())
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()
            .map_err(|e| RuleError::MalformedFilter {
                reason: e.to_string(),
            })?;

        let mods = clause("mod", config.mods)?
            .map(|items| parse_patterns(items))
            .transpose()
            .map_err(RuleError::into_filter_error)?
            .flatten();

        let names = clause("name", config.names)?
            .map(|items| parse_patterns(items))
            .transpose()
            .map_err(RuleError::into_filter_error)?
            .flatten();

        let features = config
            .features
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .iter()
            .map(|n| n.parse::<Feature>())
            .collect::<Result<FeatureSet, _>>()
            .map_err(|e| RuleError::MalformedFilter {
                reason: e.to_string(),
            })?;

        Ok(Self {
            types,
            mods,
            names,
            features,
        })
    }

    /// Render the textual form. Returns `None` for the wildcard filter.
    #[must_use]
    pub fn to_json(&self) -> Option<Value> {
        if self.is_wildcard() {
            return None;
        }
        let mut map = Map::new();
        if let Some(types) = &self.types {
            map.insert("type".into(), one_or_many(types.iter().map(|t| t.name())));
        }
        if let Some(mods) = &self.mods {
            map.insert("mod".into(), one_or_many(mods.iter().map(NamePattern::as_str)));
        }
        if let Some(names) = &self.names {
            map.insert("name".into(), one_or_many(names.iter().map(NamePattern::as_str)));
        }
        if !self.features.is_empty() {
            map.insert(
                "features".into(),
                Value::Array(self.features.iter().map(|f| f.name().into()).collect()),
            );
        }
        Some(Value::Object(map))
    }
}

/// Validate a list clause: present lists must be non-empty and bounded.
fn clause(key: &str, raw: Option<OneOrMany>) -> Result<Option<Vec<String>>, RuleError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let items = raw.into_vec();
    if items.is_empty() {
        return Err(RuleError::MalformedFilter {
            reason: format!("`{key}` list is empty; omit the key to match everything"),
        });
    }
    if items.len() > MAX_PATTERNS_PER_CLAUSE {
        return Err(RuleError::MalformedFilter {
            reason: format!(
                "`{key}` has {} entries, but maximum allowed is {MAX_PATTERNS_PER_CLAUSE}",
                items.len()
            ),
        });
    }
    Ok(Some(items))
}

fn parse_patterns<S: AsRef<str>>(
    patterns: impl IntoIterator<Item = S>,
) -> Result<Option<Vec<NamePattern>>, RuleError> {
    let patterns = patterns
        .into_iter()
        .map(|p| NamePattern::parse(p.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((!patterns.is_empty()).then_some(patterns))
}

fn one_or_many<'a>(items: impl ExactSizeIterator<Item = &'a str>) -> Value {
    if items.len() == 1 {
        items.map(Value::from).next().unwrap_or(Value::Null)
    } else {
        Value::Array(items.map(Value::from).collect())
    }
}
