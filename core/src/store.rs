//! `RuleList` and `RuleStore`: the resolution walk and its owner
//!
//! `RuleList` is immutable and does the work. `RuleStore` owns the current
//! list behind a read-mostly lock; a load builds a new list and publishes it
//! with one pointer swap, so a resolve sees either the old list or the new
//! one, never a mix.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::{
    DimletKey, DimletType, FeatureSet, ResolveTrace, Rule, RuleStep, Settings, SettingsBuilder,
    BUILTIN_RULES, RULES_DIR, RULES_FILE,
};

/// Immutable ordered rules.
///
/// # Resolution
///
/// Rules are visited in order. Each matching rule fills the fields still
/// absent from the accumulated result. The walk stops after a matching rule
/// whose **own** settings are complete; completeness of the accumulated result
/// alone does not stop it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleList {
    rules: Vec<Rule>,
}

impl RuleList {
    /// Wrap rules in resolution order.
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in resolution order.
    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Rule] {
        &self.rules
    }

    /// Resolve settings for a query.
    ///
    /// Fields no rule sets stay absent; callers substitute their own
    /// type-intrinsic defaults.
    #[must_use]
    pub fn resolve(
        &self,
        kind: DimletType,
        mod_name: &str,
        name: &str,
        features: &FeatureSet,
    ) -> Settings {
        let mut builder = SettingsBuilder::new();
        for rule in &self.rules {
            if rule.filter().matches(kind, mod_name, name, features) {
                builder.merge_in(rule.settings());
                if rule.settings().is_complete() {
                    break;
                }
            }
        }
        builder.complete().build()
    }

    /// Resolve for a dimlet key with no active features.
    #[must_use]
    pub fn resolve_key(&self, key: &DimletKey, mod_name: &str) -> Settings {
        self.resolve(key.kind(), mod_name, key.id(), &FeatureSet::new())
    }

    /// Resolve for a dimlet key with the given active features.
    #[must_use]
    pub fn resolve_key_with(
        &self,
        key: &DimletKey,
        mod_name: &str,
        features: &FeatureSet,
    ) -> Settings {
        self.resolve(key.kind(), mod_name, key.id(), features)
    }

    /// Like [`resolve`](Self::resolve), recording every visited rule.
    #[must_use]
    pub fn resolve_with_trace(
        &self,
        kind: DimletType,
        mod_name: &str,
        name: &str,
        features: &FeatureSet,
    ) -> ResolveTrace {
        let mut builder = SettingsBuilder::new();
        let mut steps = Vec::new();
        let mut stopped_at = None;
        for (index, rule) in self.rules.iter().enumerate() {
            let matched = rule.filter().matches(kind, mod_name, name, features);
            let complete = rule.settings().is_complete();
            steps.push(RuleStep {
                index,
                matched,
                complete,
            });
            if matched {
                builder.merge_in(rule.settings());
                if complete {
                    stopped_at = Some(index);
                    break;
                }
            }
        }
        ResolveTrace {
            settings: builder.complete().build(),
            steps,
            stopped_at,
        }
    }
}

impl FromIterator<Rule> for RuleList {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a RuleList {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

/// Owner of the process-wide rule list.
///
/// Create one at startup, call [`load`](Self::load), then share it by
/// reference. `resolve*` methods are cheap and may run concurrently with each
/// other and with a reload.
///
/// ```
/// use dimrules::{DimletKey, DimletType, RuleStore};
///
/// let dir = tempfile::tempdir().unwrap();
/// let store = RuleStore::new();
/// let report = store.load(dir.path());
/// assert!(report.appended_builtin);
///
/// let key = DimletKey::new(DimletType::Material, "minecraft:stone");
/// let settings = store.resolve_key(&key, "minecraft");
/// assert!(settings.is_complete());
/// ```
pub struct RuleStore {
    rules: RwLock<Arc<RuleList>>,
    loading: Mutex<()>,
    builtin: Cow<'static, str>,
}

impl RuleStore {
    /// An empty store using the bundled default rules.
    #[must_use]
    pub fn new() -> Self {
        Self::with_builtin(BUILTIN_RULES)
    }

    /// An empty store using `builtin` as the default rule document.
    #[must_use]
    pub fn with_builtin(builtin: impl Into<Cow<'static, str>>) -> Self {
        Self {
            rules: RwLock::new(Arc::new(RuleList::default())),
            loading: Mutex::new(()),
            builtin: builtin.into(),
        }
    }

    /// A store preloaded with `rules`, without touching disk.
    #[must_use]
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        let store = Self::new();
        store.publish(RuleList::new(rules));
        store
    }

    /// Location of the user rule file under `base_dir`.
    #[must_use]
    pub fn rules_path(base_dir: &Path) -> PathBuf {
        base_dir.join(RULES_DIR).join(RULES_FILE)
    }

    /// The default rule document this store regenerates from.
    #[must_use]
    pub fn builtin_source(&self) -> &str {
        &self.builtin
    }

    /// The current rule list.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RuleList> {
        Arc::clone(&self.rules.read())
    }

    /// See [`RuleList::resolve`].
    #[must_use]
    pub fn resolve(
        &self,
        kind: DimletType,
        mod_name: &str,
        name: &str,
        features: &FeatureSet,
    ) -> Settings {
        self.snapshot().resolve(kind, mod_name, name, features)
    }

    /// See [`RuleList::resolve_key`].
    #[must_use]
    pub fn resolve_key(&self, key: &DimletKey, mod_name: &str) -> Settings {
        self.snapshot().resolve_key(key, mod_name)
    }

    /// See [`RuleList::resolve_key_with`].
    #[must_use]
    pub fn resolve_key_with(
        &self,
        key: &DimletKey,
        mod_name: &str,
        features: &FeatureSet,
    ) -> Settings {
        self.snapshot().resolve_key_with(key, mod_name, features)
    }

    /// See [`RuleList::resolve_with_trace`].
    #[must_use]
    pub fn resolve_with_trace(
        &self,
        kind: DimletType,
        mod_name: &str,
        name: &str,
        features: &FeatureSet,
    ) -> ResolveTrace {
        self.snapshot()
            .resolve_with_trace(kind, mod_name, name, features)
    }

    pub(crate) fn publish(&self, rules: RuleList) {
        *self.rules.write() = Arc::new(rules);
    }

    /// Held for the duration of a load so loads never interleave.
    pub(crate) fn load_guard(&self) -> parking_lot::MutexGuard<'_, ()> {
        self.loading.lock()
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RuleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleStore")
            .field("rules_len", &self.rules.read().len())
            .field("builtin_len", &self.builtin.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Feature, Filter};

    fn complete(rarity: i32) -> Settings {
        Settings::new()
            .with_rarity(rarity)
            .with_create_cost(100)
            .with_maintain_cost(10)
            .with_tick_cost(5)
            .with_worldgen(true)
            .with_dimlet(true)
    }

    fn material() -> Filter {
        Filter::any().with_types([DimletType::Material])
    }

    #[test]
    fn empty_list_resolves_empty() {
        let rules = RuleList::default();
        let s = rules.resolve(DimletType::Sky, "m", "n", &FeatureSet::new());
        assert!(s.is_empty());
    }

    #[test]
    fn per_field_first_match_wins() {
        // R1 sets A, R2 sets A and B, R3 sets B and C.
        let rules = RuleList::new(vec![
            Rule::catch_all(Settings::new().with_rarity(1)),
            Rule::catch_all(Settings::new().with_rarity(2).with_create_cost(20)),
            Rule::catch_all(Settings::new().with_create_cost(30).with_tick_cost(3)),
        ]);
        let s = rules.resolve(DimletType::Material, "m", "n", &FeatureSet::new());
        assert_eq!(s.rarity(), Some(1));
        assert_eq!(s.create_cost(), Some(20));
        assert_eq!(s.tick_cost(), Some(3));
    }

    #[test]
    fn complete_rule_short_circuits() {
        let rules = RuleList::new(vec![
            Rule::catch_all(complete(1)),
            Rule::catch_all(complete(9).with_worldgen(false)),
        ]);
        let s = rules.resolve(DimletType::Material, "m", "n", &FeatureSet::new());
        assert_eq!(s, complete(1));
    }

    #[test]
    fn non_matching_rules_are_skipped() {
        let rules = RuleList::new(vec![
            Rule::new(material(), Settings::new().with_rarity(1)),
            Rule::catch_all(complete(7)),
        ]);
        let s = rules.resolve(DimletType::Liquid, "m", "n", &FeatureSet::new());
        assert_eq!(s.rarity(), Some(7));
    }

    #[test]
    fn short_circuit_checks_rule_not_accumulated() {
        // The accumulated result is complete after rule 1, but neither rule 0
        // nor rule 1 is complete on its own, so the walk goes on to rule 3.
        let partial_first = RuleList::new(vec![
            Rule::catch_all(Settings::new().with_rarity(1).with_create_cost(1).with_maintain_cost(1)),
            Rule::catch_all(Settings::new().with_tick_cost(1).with_worldgen(true).with_dimlet(true)),
            Rule::catch_all(Settings::new().with_rarity(2)),
            Rule::catch_all(complete(3)),
        ]);
        let trace = partial_first.resolve_with_trace(DimletType::Mob, "m", "n", &FeatureSet::new());
        assert_eq!(trace.matched().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(trace.stopped_at, Some(3));
        assert_eq!(trace.settings.rarity(), Some(1));
    }

    #[test]
    fn trace_agrees_with_resolve() {
        let rules = RuleList::new(vec![
            Rule::new(
                Filter::any().with_features([Feature::TileEntity]),
                Settings::new().with_dimlet(false),
            ),
            Rule::new(material(), complete(4)),
            Rule::catch_all(complete(8)),
        ]);
        let feats: FeatureSet = [Feature::TileEntity].into_iter().collect();
        let trace = rules.resolve_with_trace(DimletType::Material, "m", "n", &feats);
        assert_eq!(
            trace.settings,
            rules.resolve(DimletType::Material, "m", "n", &feats)
        );
        assert_eq!(trace.settings.dimlet(), Some(false));
        assert_eq!(trace.steps.len(), 2);
    }

    #[test]
    fn key_overloads_use_kind_and_id() {
        let rules = RuleList::new(vec![
            Rule::new(
                Filter::any()
                    .with_types([DimletType::Liquid])
                    .with_names(["minecraft:lava"])
                    .unwrap(),
                Settings::new().with_rarity(6),
            ),
            Rule::new(
                Filter::any().with_features([Feature::Falling]),
                Settings::new().with_worldgen(false),
            ),
        ]);
        let key = DimletKey::new(DimletType::Liquid, "minecraft:lava");
        assert_eq!(rules.resolve_key(&key, "minecraft").rarity(), Some(6));
        assert_eq!(rules.resolve_key(&key, "minecraft").worldgen(), None);

        let falling: FeatureSet = [Feature::Falling].into_iter().collect();
        let s = rules.resolve_key_with(&key, "minecraft", &falling);
        assert_eq!(s.worldgen(), Some(false));
    }

    #[test]
    fn store_publishes_whole_lists() {
        let store = RuleStore::from_rules(vec![Rule::catch_all(complete(1))]);
        let before = store.snapshot();
        store.publish(RuleList::new(vec![Rule::catch_all(complete(2))]));
        assert_eq!(before.len(), 1);
        assert_eq!(
            before.resolve(DimletType::Fog, "m", "n", &FeatureSet::new()).rarity(),
            Some(1)
        );
        assert_eq!(
            store.resolve(DimletType::Fog, "m", "n", &FeatureSet::new()).rarity(),
            Some(2)
        );
    }

    #[test]
    fn rules_path_layout() {
        let path = RuleStore::rules_path(Path::new("config"));
        assert_eq!(path, Path::new("config").join("rftools").join("dimlets.json"));
    }
}
