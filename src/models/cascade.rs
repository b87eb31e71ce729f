//! Cascade engine: schedule dependency propagation.
//!
//! Given a set of direct edits (move start or change duration), computes all
//! downstream effects through the dependency chain as a flat list of
//! before/after field changes. Nothing is persisted here; the engine is a
//! pure function over snapshots, edges, and a workday calendar.
//!
//! Rules:
//! - FS (finish-start): successor start derives from predecessor end + lag
//! - SS (start-start): successor start derives from predecessor start + lag
//! - Multiple predecessors: the latest computed date wins (most
//!   constraining); exact ties go to the smallest predecessor id
//! - Duration is never changed by cascade; only start/end dates shift
//! - Every computed start is normalized forward to a workday

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use crate::api::{
    ActivityId, ActivitySnapshot, ChangedField, DependencyEdge, DependencyType, FieldValue,
    MoveType,
};
use crate::models::calendar::{CalendarError, WorkdayCalendar};

/// Error type for cascade evaluation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CascadeError {
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    /// The dependency edges form a cycle among the activities affected by
    /// this edit set, so no stable recomputation order exists.
    #[error("Dependency cycle detected among affected activities")]
    DependencyCycle,

    #[error("Duration must be at least 1 workday, got {0}")]
    InvalidDuration(i64),
}

/// A user-requested edit, keyed by activity id in the edit set.
#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "move_type", content = "value", rename_all = "snake_case")]
pub enum DirectEdit {
    /// Target start date; normalized forward to a workday before applying.
    MoveStart(NaiveDate),
    /// Target workday duration; must be >= 1.
    ChangeDuration(i64),
}

impl DirectEdit {
    pub fn move_type(&self) -> MoveType {
        match self {
            DirectEdit::MoveStart(_) => MoveType::MoveStart,
            DirectEdit::ChangeDuration(_) => MoveType::ChangeDuration,
        }
    }
}

/// One before/after field change produced by cascade evaluation.
///
/// `source_activity_id` is `None` for direct edits; for cascaded changes it
/// names the direct edit that ultimately forced the change, traced through
/// the chain rather than the immediate predecessor.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FieldChange {
    pub activity_id: ActivityId,
    pub field: ChangedField,
    pub old_value: Option<FieldValue>,
    pub new_value: FieldValue,
    pub is_direct_edit: bool,
    pub source_activity_id: Option<ActivityId>,
}

/// Mutable per-activity dates/duration during evaluation. Seeded from live
/// snapshots, updated as changes are applied, discarded afterwards.
#[derive(Debug, Copy, Clone)]
struct WorkingState {
    start: NaiveDate,
    end: NaiveDate,
    duration: i64,
}

/// Compute the full set of field changes implied by `direct_edits`.
///
/// Activities missing any of start/end/duration are excluded from cascading
/// entirely: edits on them are silently dropped and they neither receive nor
/// transmit date pressure. An empty result means the edit set produced no
/// net effect.
pub fn calculate_cascade(
    direct_edits: &BTreeMap<ActivityId, DirectEdit>,
    activities: &[ActivitySnapshot],
    dependencies: &[DependencyEdge],
    calendar: &WorkdayCalendar,
) -> Result<Vec<FieldChange>, CascadeError> {
    let mut changes: Vec<FieldChange> = Vec::new();

    let snapshots: HashMap<ActivityId, &ActivitySnapshot> =
        activities.iter().map(|a| (a.id, a)).collect();

    // Working state starts from live values, complete activities only.
    let mut state: HashMap<ActivityId, WorkingState> = HashMap::new();
    for act in activities {
        if let (Some(start), Some(end), Some(duration)) =
            (act.start_date, act.end_date, act.duration)
        {
            state.insert(
                act.id,
                WorkingState {
                    start,
                    end,
                    duration,
                },
            );
        }
    }

    // Apply direct edits first. BTreeMap iteration keeps this deterministic;
    // the edits are independent of each other at this stage.
    for (&activity_id, edit) in direct_edits {
        let Some(current) = state.get(&activity_id).copied() else {
            continue;
        };
        let snapshot = snapshots[&activity_id];

        match *edit {
            DirectEdit::MoveStart(requested) => {
                let new_start = calendar.next_workday(requested)?;
                let new_end = calendar.calc_end_date(new_start, current.duration)?;

                if new_start != current.start {
                    changes.push(FieldChange {
                        activity_id,
                        field: ChangedField::StartDate,
                        old_value: snapshot.start_date.map(FieldValue::Date),
                        new_value: FieldValue::Date(new_start),
                        is_direct_edit: true,
                        source_activity_id: None,
                    });
                }
                if new_end != current.end {
                    changes.push(FieldChange {
                        activity_id,
                        field: ChangedField::EndDate,
                        old_value: snapshot.end_date.map(FieldValue::Date),
                        new_value: FieldValue::Date(new_end),
                        is_direct_edit: true,
                        source_activity_id: None,
                    });
                }

                state.insert(
                    activity_id,
                    WorkingState {
                        start: new_start,
                        end: new_end,
                        duration: current.duration,
                    },
                );
            }
            DirectEdit::ChangeDuration(new_duration) => {
                if new_duration < 1 {
                    return Err(CascadeError::InvalidDuration(new_duration));
                }
                let new_end = calendar.calc_end_date(current.start, new_duration)?;

                if new_duration != current.duration {
                    changes.push(FieldChange {
                        activity_id,
                        field: ChangedField::Duration,
                        old_value: snapshot.duration.map(FieldValue::Days),
                        new_value: FieldValue::Days(new_duration),
                        is_direct_edit: true,
                        source_activity_id: None,
                    });
                }
                if new_end != current.end {
                    changes.push(FieldChange {
                        activity_id,
                        field: ChangedField::EndDate,
                        old_value: snapshot.end_date.map(FieldValue::Date),
                        new_value: FieldValue::Date(new_end),
                        is_direct_edit: true,
                        source_activity_id: None,
                    });
                }

                state.insert(
                    activity_id,
                    WorkingState {
                        start: current.start,
                        end: new_end,
                        duration: new_duration,
                    },
                );
            }
        }
    }

    // Successor/predecessor adjacency.
    let mut successors: HashMap<ActivityId, Vec<&DependencyEdge>> = HashMap::new();
    let mut predecessors: HashMap<ActivityId, Vec<&DependencyEdge>> = HashMap::new();
    for dep in dependencies {
        successors.entry(dep.predecessor_id).or_default().push(dep);
        predecessors.entry(dep.successor_id).or_default().push(dep);
    }

    // BFS outward from the edited activities to discover the affected set,
    // restricted to activities present in working state.
    let mut affected: HashSet<ActivityId> = direct_edits.keys().copied().collect();
    let mut queue: VecDeque<ActivityId> = direct_edits.keys().copied().collect();
    let mut visited: HashSet<ActivityId> = HashSet::new();
    let mut discovered: Vec<ActivityId> = Vec::new();

    while let Some(current) = queue.pop_front() {
        if !visited.insert(current) {
            continue;
        }
        for dep in successors.get(&current).map(Vec::as_slice).unwrap_or(&[]) {
            let succ = dep.successor_id;
            if !state.contains_key(&succ) {
                continue;
            }
            if affected.insert(succ) {
                discovered.push(succ);
            }
            if !visited.contains(&succ) {
                queue.push_back(succ);
            }
        }
    }

    // Order the discovered activities so every predecessor is finalized
    // before its successors, and reject cycles outright. Directly edited
    // activities are already final and act as fixed boundary nodes.
    let order = topological_order(&discovered, direct_edits, &predecessors)?;

    for activity_id in order {
        let (Some(current), Some(&snapshot)) = (
            state.get(&activity_id).copied(),
            snapshots.get(&activity_id),
        ) else {
            continue;
        };

        // Most constraining predecessor wins; ties go to the smallest id.
        let mut winner: Option<(NaiveDate, ActivityId)> = None;
        for dep in predecessors
            .get(&activity_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
        {
            let Some(pred) = state.get(&dep.predecessor_id).copied() else {
                continue;
            };

            let candidate = match dep.dependency_type {
                // An FS edge always means "starts after the predecessor
                // finishes", so zero lag still advances one workday.
                DependencyType::FinishStart => {
                    let lag = if dep.lag_days == 0 { 1 } else { dep.lag_days };
                    calendar.add_workdays(pred.end, lag)?
                }
                DependencyType::StartStart => {
                    if dep.lag_days == 0 {
                        pred.start
                    } else {
                        calendar.add_workdays(pred.start, dep.lag_days)?
                    }
                }
            };
            let candidate = calendar.next_workday(candidate)?;

            let replace = match winner {
                None => true,
                Some((best, best_id)) => {
                    candidate > best || (candidate == best && dep.predecessor_id < best_id)
                }
            };
            if replace {
                winner = Some((candidate, dep.predecessor_id));
            }
        }

        let Some((new_start, winning_pred)) = winner else {
            continue;
        };
        // Stability fix-point: no change when the computed start holds.
        if new_start == current.start {
            continue;
        }

        let new_end = calendar.calc_end_date(new_start, current.duration)?;

        // Attribute to the root direct edit, not the intermediate hop.
        let mut source = winning_pred;
        if !direct_edits.contains_key(&source) {
            if let Some(root) = changes
                .iter()
                .find(|c| c.activity_id == source && c.source_activity_id.is_some())
                .and_then(|c| c.source_activity_id)
            {
                source = root;
            }
        }

        changes.push(FieldChange {
            activity_id,
            field: ChangedField::StartDate,
            old_value: snapshot.start_date.map(FieldValue::Date),
            new_value: FieldValue::Date(new_start),
            is_direct_edit: false,
            source_activity_id: Some(source),
        });
        if new_end != current.end {
            changes.push(FieldChange {
                activity_id,
                field: ChangedField::EndDate,
                old_value: snapshot.end_date.map(FieldValue::Date),
                new_value: FieldValue::Date(new_end),
                is_direct_edit: false,
                source_activity_id: Some(source),
            });
        }

        state.insert(
            activity_id,
            WorkingState {
                start: new_start,
                end: new_end,
                duration: current.duration,
            },
        );
    }

    Ok(changes)
}

/// Kahn's algorithm over the cascaded subgraph, smallest-id-first so the
/// order is reproducible. Only edges between two cascaded activities
/// constrain the order; edges from direct edits or untouched activities do
/// not, since those nodes never move again.
fn topological_order(
    discovered: &[ActivityId],
    direct_edits: &BTreeMap<ActivityId, DirectEdit>,
    predecessors: &HashMap<ActivityId, Vec<&DependencyEdge>>,
) -> Result<Vec<ActivityId>, CascadeError> {
    let nodes: BTreeSet<ActivityId> = discovered
        .iter()
        .copied()
        .filter(|id| !direct_edits.contains_key(id))
        .collect();

    let mut indegree: BTreeMap<ActivityId, usize> = nodes.iter().map(|&id| (id, 0)).collect();
    let mut outgoing: BTreeMap<ActivityId, Vec<ActivityId>> = BTreeMap::new();
    for &node in &nodes {
        for dep in predecessors.get(&node).map(Vec::as_slice).unwrap_or(&[]) {
            if nodes.contains(&dep.predecessor_id) {
                if let Some(deg) = indegree.get_mut(&node) {
                    *deg += 1;
                }
                outgoing.entry(dep.predecessor_id).or_default().push(node);
            }
        }
    }

    let mut ready: BTreeSet<ActivityId> = indegree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(&id, _)| id)
        .collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(&next) = ready.iter().next() {
        ready.remove(&next);
        order.push(next);

        for succ in outgoing.get(&next).map(Vec::as_slice).unwrap_or(&[]) {
            if let Some(deg) = indegree.get_mut(succ) {
                *deg -= 1;
                if *deg == 0 {
                    ready.insert(*succ);
                }
            }
        }
    }

    if order.len() < nodes.len() {
        return Err(CascadeError::DependencyCycle);
    }
    Ok(order)
}
