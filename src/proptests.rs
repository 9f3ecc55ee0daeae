use std::collections::BTreeMap;

use proptest::prelude::*;
use proptest_derive::Arbitrary;

use crate::entry::PairEntry;
use crate::map::{MapBase, MapC};
use crate::set::RankMultiSetC;
use crate::weight::ScalarWeight;

/// Model: key -> multiplicity, backed by a BTreeMap.
#[derive(Default)]
struct Model {
    counts: BTreeMap<u16, usize>,
    len: usize,
}

impl Model {
    fn insert(&mut self, key: u16) {
        *self.counts.entry(key).or_insert(0) += 1;
        self.len += 1;
    }

    fn erase_one(&mut self, key: &u16) -> bool {
        match self.counts.get_mut(key) {
            Some(c) => {
                *c -= 1;
                if *c == 0 {
                    self.counts.remove(key);
                }
                self.len -= 1;
                true
            }
            None => false,
        }
    }

    fn count(&self, key: &u16) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Number of stored keys strictly below `key`.
    fn rank(&self, key: &u16) -> u64 {
        self.counts.range(..key).map(|(_, c)| *c as u64).sum()
    }
}

/// Actions to run against both the container and the model.
#[derive(Arbitrary, Debug, Clone)]
enum Action {
    Insert(u16),
    Erase(u16),
    Count(u16),
    Rank(u16),
    Compact,
    Audit,
}

#[derive(Default)]
struct Test {
    tree: RankMultiSetC<u16, u64>,
    model: Model,
}

impl Test {
    fn execute(&mut self, action: Action) {
        match action {
            Action::Insert(k) => {
                assert!(self.tree.insert(k).unwrap(), "multiset insert must succeed");
                self.model.insert(k);
            }
            Action::Erase(k) => {
                let tree_hit = self.tree.erase_one(&k).unwrap();
                let model_hit = self.model.erase_one(&k);
                assert_eq!(tree_hit.is_some(), model_hit, "erase mismatch for key {k}");
            }
            Action::Count(k) => {
                assert_eq!(self.tree.count(&k), self.model.count(&k), "count({k})");
            }
            Action::Rank(k) => {
                assert_eq!(
                    self.tree.sum_before(&k).unwrap(),
                    self.model.rank(&k),
                    "rank({k})"
                );
            }
            Action::Compact => {
                let before: Vec<u16> = self.tree.iter().copied().collect();
                self.tree.shrink_to_fit();
                let after: Vec<u16> = self.tree.iter().copied().collect();
                assert_eq!(before, after, "compaction reordered entries");
                assert_eq!(self.tree.deleted_count(), 0);
                assert_eq!(self.tree.slot_count(), self.tree.len() + 2);
            }
            Action::Audit => {
                self.tree.check(Some(0.0)).unwrap();
            }
        }
        assert_eq!(self.tree.len(), self.model.len, "length mismatch");
        assert_eq!(self.tree.is_empty(), self.model.len == 0);
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn proptest_vs_btreemap(actions in prop::collection::vec(any::<Action>(), 1..64)) {
        let mut test = Test::default();
        for action in actions {
            test.execute(action);
        }
        test.tree.check(Some(0.0)).unwrap();
        // Full in-order comparison at the end.
        let tree_keys: Vec<u16> = test.tree.iter().copied().collect();
        let model_keys: Vec<u16> = test
            .model
            .counts
            .iter()
            .flat_map(|(k, c)| std::iter::repeat(*k).take(*c))
            .collect();
        prop_assert_eq!(tree_keys, model_keys);
    }
}

/// Map flavor: the weight reads the mapped value, so value updates must
/// shift downstream prefix sums by exactly the weight delta.
#[derive(Arbitrary, Debug, Clone)]
enum MapAction {
    Insert(u8, u16),
    SetValue(u8, u16),
    Erase(u8),
    Query(u8),
}

type ValueWeight = ScalarWeight<fn(&PairEntry<u8, u16>) -> u64>;
type WeightedMap = MapC<u8, u16, ValueWeight>;

fn new_weighted_map() -> WeightedMap {
    MapBase::with_weight(ScalarWeight(|e: &PairEntry<u8, u16>| *e.value() as u64))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn proptest_map_value_weights(actions in prop::collection::vec(any::<MapAction>(), 1..64)) {
        let mut map = new_weighted_map();
        let mut model: BTreeMap<u8, u16> = BTreeMap::new();
        for action in actions {
            match action {
                MapAction::Insert(k, v) => {
                    let inserted = map.insert(k, v).unwrap();
                    let model_inserted = !model.contains_key(&k);
                    prop_assert_eq!(inserted, model_inserted);
                    model.entry(k).or_insert(v);
                }
                MapAction::SetValue(k, v) => {
                    let inserted = map.set_value(k, v).unwrap();
                    prop_assert_eq!(inserted, !model.contains_key(&k));
                    model.insert(k, v);
                }
                MapAction::Erase(k) => {
                    let erased = map.erase(&k).unwrap();
                    let model_erased = model.remove(&k).is_some();
                    prop_assert_eq!(erased == 1, model_erased);
                }
                MapAction::Query(k) => {
                    prop_assert_eq!(map.get(&k), model.get(&k));
                    let expect: u64 = model.range(..k).map(|(_, v)| *v as u64).sum();
                    prop_assert_eq!(map.sum_before(&k).unwrap(), expect);
                }
            }
            prop_assert_eq!(map.len(), model.len());
        }
        map.check(Some(0.0)).unwrap();
        let total: u64 = model.values().map(|v| *v as u64).sum();
        prop_assert_eq!(map.total_sum(), total);
    }
}
