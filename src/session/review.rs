//! Review sessions: a shuffled set of records and the decisions taken on them

use crate::ciliaq::record::Decision;
use crate::session::discovery::Bundle;
use rand::Rng;
use rand::seq::SliceRandom;

/// Reference to one record of one bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordHandle {
    /// Index of the bundle in the loaded bundle list
    pub bundle: usize,
    /// Index of the record in the bundle's document
    pub record: usize,
}

#[derive(Debug, Clone)]
struct ReviewItem {
    handle: RecordHandle,
    loaded_active: bool,
    decision: Decision,
}

/// A group of bundles reviewed together
///
/// Records are stored in display order, a permutation drawn once when the
/// session is created. Display positions are the only way the presentation
/// side refers to records.
#[derive(Debug, Clone)]
pub struct ReviewSession {
    id: usize,
    bundles: Vec<usize>,
    items: Vec<ReviewItem>,
}

impl ReviewSession {
    /// Collect the reviewable records of `bundle_indices` and shuffle them
    pub fn new<R: Rng + ?Sized>(
        id: usize,
        bundle_indices: Vec<usize>,
        bundles: &[Bundle],
        revisit_culled: bool,
        rng: &mut R,
    ) -> Self {
        let mut items = Vec::new();
        for &bundle in &bundle_indices {
            let Some(source) = bundles.get(bundle) else {
                continue;
            };
            let records = source.document().records();
            for record in source.reviewable(revisit_culled) {
                let loaded_active = records.get(record).is_some_and(|r| r.active);
                items.push(ReviewItem {
                    handle: RecordHandle { bundle, record },
                    loaded_active,
                    decision: Decision::Unset,
                });
            }
        }
        items.shuffle(rng);

        Self {
            id,
            bundles: bundle_indices,
            items,
        }
    }

    /// 1-based session number
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Indices of the bundles covered by this session
    pub fn bundle_indices(&self) -> &[usize] {
        &self.bundles
    }

    /// Number of records under review
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the session has nothing to review
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Record shown at display position `index`
    pub fn handle(&self, index: usize) -> Option<RecordHandle> {
        self.items.get(index).map(|item| item.handle)
    }

    /// Handles in display order
    pub fn handles(&self) -> impl Iterator<Item = RecordHandle> + '_ {
        self.items.iter().map(|item| item.handle)
    }

    /// Decision for display position `index`
    pub fn decision(&self, index: usize) -> Option<Decision> {
        self.items.get(index).map(|item| item.decision)
    }

    /// True when the record at `index` will end up commented out
    pub fn is_marked(&self, index: usize) -> bool {
        self.items
            .get(index)
            .is_some_and(|item| !item.decision.resolve(item.loaded_active))
    }

    /// Flip the effective state of the record at display position `index`
    ///
    /// Returns the new decision, or `None` if `index` is out of range.
    pub fn toggle(&mut self, index: usize) -> Option<Decision> {
        let item = self.items.get_mut(index)?;
        item.decision = item.decision.toggled(item.loaded_active);
        Some(item.decision)
    }

    /// Forget every decision
    pub fn clear_decisions(&mut self) {
        for item in &mut self.items {
            item.decision = Decision::Unset;
        }
    }

    /// Number of records that will be commented out
    pub fn marked_count(&self) -> usize {
        (0..self.items.len())
            .filter(|&index| self.is_marked(index))
            .count()
    }

    /// Decisions for every record of bundle `bundle`, in file order
    ///
    /// Records outside this session stay [`Decision::Unset`].
    pub fn decisions_for(&self, bundle: usize, record_count: usize) -> Vec<Decision> {
        let mut decisions = vec![Decision::Unset; record_count];
        for item in self.items.iter().filter(|item| item.handle.bundle == bundle) {
            if let Some(slot) = decisions.get_mut(item.handle.record) {
                *slot = item.decision;
            }
        }
        decisions
    }
}
