//! Order Resolver: fractional ranking over opaque numeric order values.
//!
//! Given the current order values of every item in a backlog view (the
//! *context set*) and a [`ReorderIntent`], the resolver computes new values for
//! exactly the moved items so that the resulting total order matches the
//! intent and no other item needs an update.
//!
//! ## Placement
//!
//! Moved items always land in one gap between two neighbors `a < b`. The gap
//! is split into `N + 1` equal intervals and the `N` interior points are
//! assigned in the caller's requested order. Open-ended gaps (TOP, BOTTOM,
//! after the last item) use a virtual neighbor `(N + 1) * step` away, so a
//! single item moved to the top of `[10, 20, 30]` gets `9`.
//!
//! ## Renumbering
//!
//! When the interval width drops below [`OrderingPolicy::min_gap`], when a
//! neighbor of the gap has no order value, or when floating-point rounding
//! would make two assigned values collide, the whole context set is
//! renumbered to multiples of [`OrderingPolicy::renumber_stride`] (in its
//! current order) and placement is re-run on the fresh values. This is the only
//! path that touches items the caller did not ask to move, so the resulting
//! [`Resolution`] reports those assignments separately.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{OrderingPolicy, TopStrategy};
use crate::{Anchor, FieldName, OrderValue, PatchOperation, ReorderIntent, WorkItemId};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reorder preconditions that the resolver checks before computing anything.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum ReorderError {
    /// The intent names no items.
    #[error("Reorder intent names no work items")]
    EmptyIntent,

    /// The intent names the same item more than once.
    #[error("Work item {id} appears more than once in the reorder intent")]
    DuplicateTarget { id: WorkItemId },

    /// A moved item is not part of the fetched backlog view.
    #[error("Work item {id} is not in the backlog view being reordered")]
    UnknownTarget { id: WorkItemId },

    /// AFTER/BEFORE references an item that is not part of the backlog view.
    #[error("Anchor work item {id} is not in the backlog view being reordered")]
    UnknownAnchor { id: WorkItemId },

    /// AFTER/BEFORE references one of the items being moved.
    #[error("Work item {id} cannot be both moved and used as the anchor")]
    AnchorIsTarget { id: WorkItemId },

    /// Even after renumbering the gap is narrower than the minimum resolution.
    ///
    /// Only reachable when the renumber stride is too small for the number of
    /// items moved at once.
    #[error("Gap of width {width} is below the minimum resolution {min_gap} after renumbering")]
    ResolutionExhausted { width: f64, min_gap: f64 },
}

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// One item of the context set: its identity and current order value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub id: WorkItemId,
    /// `None` for items that have never been ranked; those sort last.
    pub order: Option<OrderValue>,
}

impl ContextEntry {
    pub fn new(id: WorkItemId, order: Option<OrderValue>) -> Self {
        Self { id, order }
    }
}

/// A computed change of one item's order value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderAssignment {
    pub id: WorkItemId,
    pub previous: Option<OrderValue>,
    pub new: OrderValue,
}

/// The outcome of resolving one intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// New values for the moved items, in requested order.
    pub placements: Vec<OrderAssignment>,
    /// Present when a renumber was needed: the changed values of every
    /// *non-moved* item. These must be applied before the placements.
    pub renumbered: Option<Vec<OrderAssignment>>,
}

impl Resolution {
    /// Returns `true` when resolving required a renumber of the context set.
    pub fn is_renumber(&self) -> bool {
        self.renumbered.is_some()
    }

    /// Patch operations for the renumber phase (empty when none is needed).
    pub fn renumber_patches(&self, order_field: &FieldName) -> Vec<PatchOperation> {
        self.renumbered
            .iter()
            .flatten()
            .map(|a| to_patch(a, order_field))
            .collect()
    }

    /// Patch operations for the moved items.
    pub fn placement_patches(&self, order_field: &FieldName) -> Vec<PatchOperation> {
        self.placements
            .iter()
            .map(|a| to_patch(a, order_field))
            .collect()
    }
}

fn to_patch(assignment: &OrderAssignment, order_field: &FieldName) -> PatchOperation {
    PatchOperation {
        id: assignment.id,
        field: order_field.clone(),
        value: serde_json::Value::from(assignment.new.as_f64()),
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Computes new order values for a reorder intent.
#[derive(Debug, Clone, Copy)]
pub struct OrderResolver {
    policy: OrderingPolicy,
}

impl OrderResolver {
    /// Creates a resolver. The policy is assumed to have passed
    /// [`crate::SyncConfig::validate`].
    pub fn new(policy: OrderingPolicy) -> Self {
        Self { policy }
    }

    /// Resolves `intent` against `context`.
    ///
    /// `context` may be in any order; it is sorted by current value (unranked
    /// items last, ties by identifier), which is the order the backlog view
    /// displays. Every moved item must be part of `context`.
    pub fn resolve(
        &self,
        context: &[ContextEntry],
        intent: &ReorderIntent,
    ) -> Result<Resolution, ReorderError> {
        let sorted = sort_context(context);
        let known: HashSet<WorkItemId> = sorted.iter().map(|e| e.id).collect();
        let targets = validate_intent(intent, &known)?;
        let n = intent.targets.len();

        let remaining: Vec<ContextEntry> = sorted
            .iter()
            .copied()
            .filter(|e| !targets.contains(&e.id))
            .collect();
        let previous: HashMap<WorkItemId, Option<OrderValue>> =
            sorted.iter().map(|e| (e.id, e.order)).collect();

        if let Some(values) = self.place(&remaining, intent.anchor, n)? {
            tracing::debug!(moved = n, anchor = %intent.anchor, "Placed items without renumbering");
            return Ok(Resolution {
                placements: assignments(&intent.targets, &values, &previous),
                renumbered: None,
            });
        }

        tracing::info!(
            context = sorted.len(),
            moved = n,
            anchor = %intent.anchor,
            "Gap below minimum resolution; renumbering context set"
        );
        let fresh = renumber(&sorted, self.policy.renumber_stride);
        let fresh_by_id: HashMap<WorkItemId, OrderValue> =
            fresh.iter().map(|a| (a.id, a.new)).collect();
        let renumbered_remaining: Vec<ContextEntry> = remaining
            .iter()
            .map(|e| ContextEntry::new(e.id, fresh_by_id.get(&e.id).copied()))
            .collect();

        let values = match self.place(&renumbered_remaining, intent.anchor, n)? {
            Some(values) => values,
            None => {
                return Err(ReorderError::ResolutionExhausted {
                    width: self.policy.renumber_stride / (n as f64 + 1.0),
                    min_gap: self.policy.min_gap,
                })
            }
        };

        let renumbered = fresh
            .into_iter()
            .filter(|a| !targets.contains(&a.id) && a.previous != Some(a.new))
            .collect();

        Ok(Resolution {
            placements: assignments(&intent.targets, &values, &previous),
            renumbered: Some(renumbered),
        })
    }

    /// Computes `n` values for the gap selected by `anchor` in `remaining`, or
    /// `None` when the gap cannot hold them at the configured resolution.
    fn place(
        &self,
        remaining: &[ContextEntry],
        anchor: Anchor,
        n: usize,
    ) -> Result<Option<Vec<f64>>, ReorderError> {
        let policy = &self.policy;
        let span = policy.step * (n as f64 + 1.0);

        if remaining.is_empty() {
            let stride = policy.renumber_stride;
            return Ok(Some((1..=n).map(|i| stride * i as f64).collect()));
        }

        let value_at = |idx: usize| remaining[idx].order.map(OrderValue::as_f64);
        let position = |id: WorkItemId| {
            remaining
                .iter()
                .position(|e| e.id == id)
                .ok_or(ReorderError::UnknownAnchor { id })
        };

        let (lower, upper) = match anchor {
            Anchor::Top => {
                let b = value_at(0);
                (b.map(|b| self.below(b, span)), b)
            }
            Anchor::Bottom => {
                let a = value_at(remaining.len() - 1);
                (a, a.map(|a| a + span))
            }
            Anchor::After(id) => {
                let idx = position(id)?;
                let a = value_at(idx);
                let b = if idx + 1 < remaining.len() {
                    value_at(idx + 1)
                } else {
                    a.map(|a| a + span)
                };
                (a, b)
            }
            Anchor::Before(id) => {
                let idx = position(id)?;
                let b = value_at(idx);
                let a = if idx == 0 {
                    b.map(|b| self.below(b, span))
                } else {
                    value_at(idx - 1)
                };
                (a, b)
            }
        };

        let (Some(a), Some(b)) = (lower, upper) else {
            return Ok(None);
        };
        if b <= a || (b - a) / (n as f64 + 1.0) < policy.min_gap {
            return Ok(None);
        }

        let values = subdivide(a, b, n);
        let distinct = values
            .iter()
            .zip(values.iter().skip(1))
            .all(|(x, y)| x < y);
        let bounded = values.iter().all(|v| v.is_finite() && *v > a && *v < b);
        Ok((distinct && bounded).then_some(values))
    }

    fn below(&self, b: f64, span: f64) -> f64 {
        match self.policy.top_strategy {
            TopStrategy::Subtract => b - span,
            TopStrategy::Halve => 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// Splits `(a, b)` into `n + 1` equal intervals and returns the `n` interior
/// points in increasing order.
pub fn subdivide(a: f64, b: f64, n: usize) -> Vec<f64> {
    let parts = n as f64 + 1.0;
    (1..=n).map(|i| a + (b - a) * (i as f64) / parts).collect()
}

/// Assigns every entry of `context` (in display order) a fresh value
/// `stride * (position + 1)`.
///
/// Returns one assignment per entry, including entries whose value does not
/// change, so the caller sees the complete renumbered sequence.
pub fn renumber(context: &[ContextEntry], stride: f64) -> Vec<OrderAssignment> {
    sort_context(context)
        .iter()
        .enumerate()
        .filter_map(|(i, e)| {
            OrderValue::new(stride * (i as f64 + 1.0)).map(|new| OrderAssignment {
                id: e.id,
                previous: e.order,
                new,
            })
        })
        .collect()
}

/// Display order of a backlog view: ranked items by value, then unranked
/// items; ties broken by identifier. Duplicate identifiers keep their first
/// occurrence.
pub fn sort_context(context: &[ContextEntry]) -> Vec<ContextEntry> {
    let mut seen = HashSet::new();
    let mut sorted: Vec<ContextEntry> = context
        .iter()
        .copied()
        .filter(|e| seen.insert(e.id))
        .collect();
    sorted.sort_by(|x, y| match (x.order, y.order) {
        (Some(a), Some(b)) => a.total_cmp(&b).then(x.id.cmp(&y.id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => x.id.cmp(&y.id),
    });
    sorted
}

/// Checks the preconditions that need no backlog data: at least one target,
/// and no target named twice. Returns the target set.
pub fn check_targets(targets: &[WorkItemId]) -> Result<HashSet<WorkItemId>, ReorderError> {
    if targets.is_empty() {
        return Err(ReorderError::EmptyIntent);
    }
    let mut set = HashSet::with_capacity(targets.len());
    for id in targets {
        if !set.insert(*id) {
            return Err(ReorderError::DuplicateTarget { id: *id });
        }
    }
    Ok(set)
}

fn validate_intent(
    intent: &ReorderIntent,
    known: &HashSet<WorkItemId>,
) -> Result<HashSet<WorkItemId>, ReorderError> {
    let targets = check_targets(&intent.targets)?;
    if let Anchor::After(id) | Anchor::Before(id) = intent.anchor {
        if targets.contains(&id) {
            return Err(ReorderError::AnchorIsTarget { id });
        }
        if !known.contains(&id) {
            return Err(ReorderError::UnknownAnchor { id });
        }
    }
    if let Some(id) = intent.targets.iter().find(|id| !known.contains(id)) {
        return Err(ReorderError::UnknownTarget { id: *id });
    }
    Ok(targets)
}

fn assignments(
    targets: &[WorkItemId],
    values: &[f64],
    previous: &HashMap<WorkItemId, Option<OrderValue>>,
) -> Vec<OrderAssignment> {
    targets
        .iter()
        .zip(values)
        .filter_map(|(id, v)| {
            OrderValue::new(*v).map(|new| OrderAssignment {
                id: *id,
                previous: previous.get(id).copied().flatten(),
                new,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(n: u64) -> WorkItemId {
        WorkItemId::new(n).unwrap()
    }

    fn ctx(entries: &[(u64, f64)]) -> Vec<ContextEntry> {
        entries
            .iter()
            .map(|(i, o)| ContextEntry::new(id(*i), OrderValue::new(*o)))
            .collect()
    }

    fn resolver() -> OrderResolver {
        OrderResolver::new(OrderingPolicy::default())
    }

    fn new_value(res: &Resolution, item: u64) -> f64 {
        res.placements
            .iter()
            .find(|a| a.id == id(item))
            .map(|a| a.new.as_f64())
            .unwrap()
    }

    #[test]
    fn test_move_after_takes_midpoint() {
        let context = ctx(&[(1, 10.0), (2, 20.0), (3, 30.0)]);
        let res = resolver()
            .resolve(&context, &ReorderIntent::new(vec![id(3)], Anchor::After(id(1))))
            .unwrap();

        assert_eq!(res.placements.len(), 1);
        assert_eq!(new_value(&res, 3), 15.0);
        assert!(!res.is_renumber());
    }

    #[test]
    fn test_move_to_top_subtracts_step() {
        let context = ctx(&[(1, 10.0), (2, 20.0), (3, 30.0)]);
        let res = resolver()
            .resolve(&context, &ReorderIntent::new(vec![id(2)], Anchor::Top))
            .unwrap();

        assert_eq!(new_value(&res, 2), 9.0);
        assert!(res.renumbered.is_none());
    }

    #[test]
    fn test_move_to_top_with_halving_stays_positive() {
        let policy = OrderingPolicy {
            top_strategy: TopStrategy::Halve,
            ..OrderingPolicy::default()
        };
        let context = ctx(&[(1, 10.0), (2, 20.0)]);
        let res = OrderResolver::new(policy)
            .resolve(&context, &ReorderIntent::new(vec![id(2)], Anchor::Top))
            .unwrap();
        assert_eq!(new_value(&res, 2), 5.0);
    }

    #[test]
    fn test_move_to_bottom_adds_step() {
        let context = ctx(&[(1, 10.0), (2, 20.0), (3, 30.0)]);
        let res = resolver()
            .resolve(&context, &ReorderIntent::new(vec![id(1)], Anchor::Bottom))
            .unwrap();
        assert_eq!(new_value(&res, 1), 31.0);
    }

    #[test]
    fn test_move_before_first_behaves_like_top() {
        let context = ctx(&[(1, 10.0), (2, 20.0), (3, 30.0)]);
        let res = resolver()
            .resolve(&context, &ReorderIntent::new(vec![id(3)], Anchor::Before(id(1))))
            .unwrap();
        assert_eq!(new_value(&res, 3), 9.0);
    }

    #[test]
    fn test_move_after_last_behaves_like_bottom() {
        let context = ctx(&[(1, 10.0), (2, 20.0), (3, 30.0)]);
        let res = resolver()
            .resolve(&context, &ReorderIntent::new(vec![id(1)], Anchor::After(id(3))))
            .unwrap();
        assert_eq!(new_value(&res, 1), 31.0);
    }

    #[test]
    fn test_several_items_split_gap_evenly_in_requested_order() {
        let context = ctx(&[(1, 10.0), (2, 20.0), (3, 30.0), (4, 40.0), (5, 50.0)]);
        let res = resolver()
            .resolve(
                &context,
                &ReorderIntent::new(vec![id(5), id(3), id(4)], Anchor::After(id(1))),
            )
            .unwrap();

        assert_eq!(new_value(&res, 5), 12.5);
        assert_eq!(new_value(&res, 3), 15.0);
        assert_eq!(new_value(&res, 4), 17.5);
    }

    #[test]
    fn test_previous_values_are_reported() {
        let context = ctx(&[(1, 10.0), (2, 20.0)]);
        let res = resolver()
            .resolve(&context, &ReorderIntent::new(vec![id(2)], Anchor::Top))
            .unwrap();
        assert_eq!(res.placements[0].previous, OrderValue::new(20.0));
    }

    #[test]
    fn test_narrow_gap_triggers_renumber() {
        let context = ctx(&[(1, 10.0), (2, 10.0 + 1e-7), (3, 30.0)]);
        let res = resolver()
            .resolve(&context, &ReorderIntent::new(vec![id(3)], Anchor::After(id(1))))
            .unwrap();

        let renumbered = res.renumbered.as_ref().unwrap();
        let by_id: HashMap<_, _> = renumbered.iter().map(|a| (a.id, a.new.as_f64())).collect();
        assert_eq!(by_id.get(&id(1)), Some(&1000.0));
        assert_eq!(by_id.get(&id(2)), Some(&2000.0));
        assert!(!by_id.contains_key(&id(3)));
        assert_eq!(new_value(&res, 3), 1500.0);
    }

    #[test]
    fn test_tied_neighbors_trigger_renumber() {
        let context = ctx(&[(1, 10.0), (2, 10.0), (3, 30.0)]);
        let res = resolver()
            .resolve(&context, &ReorderIntent::new(vec![id(3)], Anchor::Before(id(2))))
            .unwrap();
        assert!(res.is_renumber());
        assert_eq!(new_value(&res, 3), 1500.0);
    }

    #[test]
    fn test_unranked_neighbor_triggers_renumber() {
        let mut context = ctx(&[(1, 10.0), (2, 20.0)]);
        context.push(ContextEntry::new(id(3), None));
        let res = resolver()
            .resolve(&context, &ReorderIntent::new(vec![id(1)], Anchor::Bottom))
            .unwrap();

        let renumbered = res.renumbered.as_ref().unwrap();
        assert!(renumbered
            .iter()
            .any(|a| a.id == id(3) && a.previous.is_none() && a.new.as_f64() == 3000.0));
        assert_eq!(new_value(&res, 1), 3001.0);
    }

    #[test]
    fn test_renumber_skips_values_already_on_stride() {
        let context = ctx(&[(1, 1000.0), (2, 2000.0), (3, 2000.0 + 1e-9), (4, 5.0e3)]);
        let res = resolver()
            .resolve(&context, &ReorderIntent::new(vec![id(4)], Anchor::After(id(2))))
            .unwrap();
        let renumbered = res.renumbered.unwrap();
        let ids: Vec<u64> = renumbered.iter().map(|a| a.id.as_u64()).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn test_moving_every_item_assigns_stride_values() {
        let context = ctx(&[(1, 10.0), (2, 20.0)]);
        let res = resolver()
            .resolve(&context, &ReorderIntent::new(vec![id(2), id(1)], Anchor::Top))
            .unwrap();
        assert_eq!(new_value(&res, 2), 1000.0);
        assert_eq!(new_value(&res, 1), 2000.0);
    }

    #[test]
    fn test_empty_intent_is_rejected() {
        let context = ctx(&[(1, 10.0)]);
        let err = resolver()
            .resolve(&context, &ReorderIntent::new(vec![], Anchor::Top))
            .unwrap_err();
        assert_eq!(err, ReorderError::EmptyIntent);
    }

    #[test]
    fn test_duplicate_target_is_rejected() {
        let context = ctx(&[(1, 10.0), (2, 20.0)]);
        let err = resolver()
            .resolve(&context, &ReorderIntent::new(vec![id(2), id(2)], Anchor::Top))
            .unwrap_err();
        assert_eq!(err, ReorderError::DuplicateTarget { id: id(2) });
    }

    #[test]
    fn test_unknown_anchor_is_rejected() {
        let context = ctx(&[(1, 10.0), (2, 20.0)]);
        let err = resolver()
            .resolve(&context, &ReorderIntent::new(vec![id(2)], Anchor::After(id(99))))
            .unwrap_err();
        assert_eq!(err, ReorderError::UnknownAnchor { id: id(99) });
    }

    #[test]
    fn test_anchor_inside_targets_is_rejected() {
        let context = ctx(&[(1, 10.0), (2, 20.0)]);
        let err = resolver()
            .resolve(
                &context,
                &ReorderIntent::new(vec![id(1), id(2)], Anchor::Before(id(1))),
            )
            .unwrap_err();
        assert_eq!(err, ReorderError::AnchorIsTarget { id: id(1) });
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        let context = ctx(&[(1, 10.0)]);
        let err = resolver()
            .resolve(&context, &ReorderIntent::new(vec![id(7)], Anchor::Top))
            .unwrap_err();
        assert_eq!(err, ReorderError::UnknownTarget { id: id(7) });
    }

    #[test]
    fn test_tiny_stride_exhausts_resolution() {
        let policy = OrderingPolicy {
            min_gap: 1.0,
            renumber_stride: 2.5,
            ..OrderingPolicy::default()
        };
        let context = ctx(&[(1, 1.0), (2, 1.5), (3, 2.0), (4, 3.0), (5, 4.0)]);
        let err = OrderResolver::new(policy)
            .resolve(
                &context,
                &ReorderIntent::new(vec![id(3), id(4), id(5)], Anchor::After(id(1))),
            )
            .unwrap_err();
        assert!(matches!(err, ReorderError::ResolutionExhausted { .. }));
    }

    #[test]
    fn test_patches_target_order_field() {
        let context = ctx(&[(1, 10.0), (2, 20.0)]);
        let res = resolver()
            .resolve(&context, &ReorderIntent::new(vec![id(2)], Anchor::Top))
            .unwrap();
        let field = FieldName::new("Custom.Rank").unwrap();
        let patches = res.placement_patches(&field);
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].field, field);
        assert_eq!(patches[0].value, serde_json::json!(9.0));
        assert!(res.renumber_patches(&field).is_empty());
    }

    #[test]
    fn test_sort_context_puts_unranked_last() {
        let mut context = vec![ContextEntry::new(id(4), None)];
        context.extend(ctx(&[(3, 5.0), (1, 5.0), (2, 1.0)]));
        let order: Vec<u64> = sort_context(&context).iter().map(|e| e.id.as_u64()).collect();
        assert_eq!(order, vec![2, 1, 3, 4]);
    }

    proptest! {
        #[test]
        fn prop_subdivide_is_strictly_inside_and_increasing(
            a in -1.0e6f64..1.0e6,
            width in 1.0e-3f64..1.0e6,
            n in 1usize..20,
        ) {
            let b = a + width;
            let values = subdivide(a, b, n);
            prop_assert_eq!(values.len(), n);
            for w in values.windows(2) {
                prop_assert!(w[0] < w[1]);
            }
            prop_assert!(values.iter().all(|v| *v > a && *v < b));
        }

        #[test]
        fn prop_renumber_is_evenly_spaced_and_order_preserving(
            raw in proptest::collection::vec(-1.0e9f64..1.0e9, 1..60),
        ) {
            let context: Vec<ContextEntry> = raw
                .iter()
                .enumerate()
                .map(|(i, v)| ContextEntry::new(id(i as u64 + 1), OrderValue::new(*v)))
                .collect();
            let before: Vec<WorkItemId> = sort_context(&context).iter().map(|e| e.id).collect();
            let after = renumber(&context, 1000.0);

            prop_assert_eq!(after.len(), context.len());
            let ids: Vec<WorkItemId> = after.iter().map(|a| a.id).collect();
            prop_assert_eq!(ids, before);
            for (i, a) in after.iter().enumerate() {
                prop_assert_eq!(a.new.as_f64(), 1000.0 * (i as f64 + 1.0));
            }
        }

        #[test]
        fn prop_placement_lands_between_neighbors(
            gaps in proptest::collection::vec(1.0f64..100.0, 3..30),
            k in 1usize..5,
            anchor_pick in 0usize..1000,
        ) {
            // Strictly increasing context values built from positive gaps.
            let mut acc = 0.0;
            let context: Vec<ContextEntry> = gaps
                .iter()
                .enumerate()
                .map(|(i, g)| {
                    acc += g;
                    ContextEntry::new(id(i as u64 + 1), OrderValue::new(acc))
                })
                .collect();
            let len = context.len();
            prop_assume!(len > k + 1);

            // Move the last k items after an anchor chosen among the rest.
            let targets: Vec<WorkItemId> = context[len - k..].iter().map(|e| e.id).collect();
            let anchor_idx = anchor_pick % (len - k);
            let anchor = context[anchor_idx];
            let res = resolver()
                .resolve(&context, &ReorderIntent::new(targets.clone(), Anchor::After(anchor.id)))
                .unwrap();

            prop_assert!(!res.is_renumber());
            let a = anchor.order.unwrap().as_f64();
            let b = if anchor_idx + 1 < len - k {
                context[anchor_idx + 1].order.unwrap().as_f64()
            } else {
                f64::INFINITY
            };
            let values: Vec<f64> = res.placements.iter().map(|p| p.new.as_f64()).collect();
            prop_assert_eq!(
                res.placements.iter().map(|p| p.id).collect::<Vec<_>>(),
                targets
            );
            for w in values.windows(2) {
                prop_assert!(w[0] < w[1]);
            }
            prop_assert!(values.iter().all(|v| *v > a && *v < b));
        }
    }
}
