//! Second pass over a flagged load: walks every merged record again and
//! itemises what the first pass only flagged.

use std::collections::HashMap;
use std::hash::Hash;

use romfs::stage_bcett::{
    EntityKind, GroupAssignment, RecordIndex, ReferenceKind, StageIssue, StageValidationReport,
};

use crate::graph::StageGraph;

/// Keys in first-seen order with every position they were seen at.
struct Occurrences<K> {
    order: Vec<K>,
    seen: HashMap<K, Vec<RecordIndex>>,
}

impl<K: Copy + Eq + Hash> Occurrences<K> {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            seen: HashMap::new(),
        }
    }

    fn push(&mut self, key: K, at: RecordIndex) {
        let entries = self.seen.entry(key).or_insert_with(|| {
            self.order.push(key);
            Vec::new()
        });
        entries.push(at);
    }

    fn into_duplicates(mut self) -> Vec<(K, Vec<RecordIndex>)> {
        self.order
            .iter()
            .filter_map(|key| {
                let occurrences = self.seen.remove(key)?;
                (occurrences.len() > 1).then_some((*key, occurrences))
            })
            .collect()
    }
}

fn record(fragment: &str, index: usize, element: Option<usize>) -> RecordIndex {
    RecordIndex {
        fragment: fragment.to_string(),
        index,
        element,
    }
}

pub(crate) fn build_report(root: &str, graph: &StageGraph) -> StageValidationReport {
    let mut issues = Vec::new();
    duplicate_hashes(graph, &mut issues);
    dangling_references(graph, &mut issues);
    duplicate_group_assignments(graph, &mut issues);
    StageValidationReport {
        fragment: root.to_string(),
        issues,
    }
}

fn duplicate_hashes(graph: &StageGraph, issues: &mut Vec<StageIssue>) {
    let mut actors = Occurrences::new();
    let mut rails = Occurrences::new();
    let mut points = Occurrences::new();
    for fragment in graph.fragments() {
        let name = fragment.mumap.as_str();
        for (index, &actor) in fragment.actors.iter().enumerate() {
            actors.push(graph.actor(actor).hash(), record(name, index, None));
        }
        for (index, &rail_id) in fragment.rails.iter().enumerate() {
            let rail = graph.rail(rail_id);
            rails.push(rail.hash, record(name, index, None));
            for (point_index, &point) in rail.points.iter().enumerate() {
                if let Some(point_hash) = graph.point(point).hash {
                    points.push((rail.hash, point_hash), record(name, index, Some(point_index)));
                }
            }
        }
    }

    for (hash, occurrences) in actors.into_duplicates() {
        issues.push(StageIssue::DuplicateHash {
            kind: EntityKind::Actor,
            hash,
            occurrences,
        });
    }
    for (hash, occurrences) in rails.into_duplicates() {
        issues.push(StageIssue::DuplicateHash {
            kind: EntityKind::Rail,
            hash,
            occurrences,
        });
    }
    for ((_, hash), occurrences) in points.into_duplicates() {
        issues.push(StageIssue::DuplicateHash {
            kind: EntityKind::RailPoint,
            hash,
            occurrences,
        });
    }
}

fn dangling_references(graph: &StageGraph, issues: &mut Vec<StageIssue>) {
    let mut dangling = |kind, at: RecordIndex, missing_hash| {
        issues.push(StageIssue::DanglingHashReference {
            kind,
            at,
            missing_hash,
        })
    };

    for fragment in graph.fragments() {
        let name = fragment.mumap.as_str();
        for (index, link) in fragment.links.iter().enumerate() {
            if graph.actor_by_hash(link.source).is_none() {
                dangling(ReferenceKind::LinkSource, record(name, index, None), link.source);
            }
            if graph.actor_by_hash(link.destination).is_none() {
                dangling(
                    ReferenceKind::LinkDestination,
                    record(name, index, None),
                    link.destination,
                );
            }
        }

        for (index, link) in fragment.rail_links.iter().enumerate() {
            if graph.actor_by_hash(link.source).is_none() {
                dangling(
                    ReferenceKind::RailLinkSource,
                    record(name, index, None),
                    link.source,
                );
            }
            if graph.rail_by_hash(link.destination).is_none() {
                dangling(
                    ReferenceKind::RailLinkDestination,
                    record(name, index, None),
                    link.destination,
                );
            } else if graph.point_by_hash(link.destination, link.point).is_none() {
                dangling(
                    ReferenceKind::RailLinkPoint,
                    record(name, index, None),
                    link.point,
                );
            }
        }

        for (group_index, group) in fragment.groups.iter().enumerate() {
            for (member_index, &hash) in group.actors.iter().enumerate() {
                if graph.actor_by_hash(hash).is_none() {
                    dangling(
                        ReferenceKind::GroupMember,
                        record(name, group_index, Some(member_index)),
                        hash,
                    );
                }
            }
        }
    }
}

fn duplicate_group_assignments(graph: &StageGraph, issues: &mut Vec<StageIssue>) {
    let mut order = Vec::new();
    let mut assignments: HashMap<u64, Vec<GroupAssignment>> = HashMap::new();
    for fragment in graph.fragments() {
        for (group_index, group) in fragment.groups.iter().enumerate() {
            for (member_index, &hash) in group.actors.iter().enumerate() {
                let entries = assignments.entry(hash).or_insert_with(|| {
                    order.push(hash);
                    Vec::new()
                });
                entries.push(GroupAssignment {
                    fragment: fragment.mumap.as_str().to_string(),
                    group_index,
                    member_index,
                });
            }
        }
    }

    for hash in order {
        let Some(entries) = assignments.remove(&hash) else {
            continue;
        };
        let first = (&entries[0].fragment, entries[0].group_index);
        let spans_groups = entries
            .iter()
            .any(|entry| (&entry.fragment, entry.group_index) != first);
        if spans_groups {
            issues.push(StageIssue::DuplicateGroupAssignment {
                actor_hash: hash,
                assignments: entries,
            });
        }
    }
}
