//! The DAG of [`VersionChange`] edges: cycle detection at build time, and
//! forward/backward path computation at request time.

use std::collections::HashMap;

use crate::bundle::VersionBundle;
use crate::change::VersionChange;
use crate::error::Error;
use crate::version::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// The ordered, validated sequence of [`VersionChange`] edges. Built once;
/// immutable afterwards.
pub struct MigrationChain {
    changes: Vec<VersionChange>,
}

impl MigrationChain {
    /// Validate and build a chain: every edge endpoint must be declared in
    /// `bundle` (or be the bundle's head), no two edges may share the same
    /// `(from, to)` pair, and the directed edge graph must be acyclic.
    pub fn new(changes: Vec<VersionChange>, bundle: &VersionBundle) -> Result<Self, Error> {
        for change in &changes {
            for endpoint in [change.from(), change.to()] {
                if !is_member(endpoint, bundle) {
                    return Err(Error::UnknownEndpoint(endpoint.raw().to_string()));
                }
            }
        }

        let mut seen_edges = std::collections::HashSet::new();
        for change in &changes {
            let key = (change.from().raw().to_string(), change.to().raw().to_string());
            if !seen_edges.insert(key) {
                return Err(Error::DuplicateEdge {
                    from: change.from().raw().to_string(),
                    to: change.to().raw().to_string(),
                });
            }
        }

        detect_cycle(&changes)?;

        Ok(Self { changes })
    }

    pub fn changes(&self) -> &[VersionChange] {
        &self.changes
    }

    /// Compute the migration path from `src` to `dst`, per §4.F.2.
    ///
    /// - `src == dst`: empty path.
    /// - `src < dst` (request direction): edges with `from >= src, to <= dst`,
    ///   ascending by `from`.
    /// - `src > dst` (response direction): edges with `from >= dst, to <= src`,
    ///   descending by `from`; each is applied via its backward operations.
    pub fn path(&self, src: &Version, dst: &Version) -> Result<Vec<&VersionChange>, Error> {
        if src == dst {
            return Ok(Vec::new());
        }

        let mut matched: Vec<&VersionChange> = if src.is_older_than(dst) {
            self.changes
                .iter()
                .filter(|c| !c.from().is_older_than(src) && !dst.is_older_than(c.to()))
                .collect()
        } else {
            self.changes
                .iter()
                .filter(|c| !c.from().is_older_than(dst) && !src.is_older_than(c.to()))
                .collect()
        };

        if matched.is_empty() {
            return Err(Error::NoPath {
                from: src.raw().to_string(),
                to: dst.raw().to_string(),
            });
        }

        if src.is_older_than(dst) {
            matched.sort_by(|a, b| a.from().cmp(b.from()));
        } else {
            matched.sort_by(|a, b| b.from().cmp(a.from()));
        }

        Ok(matched)
    }
}

fn is_member(version: &Version, bundle: &VersionBundle) -> bool {
    version.is_head() || bundle.find_exact(version.raw()).is_some()
}

fn detect_cycle(changes: &[VersionChange]) -> Result<(), Error> {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for change in changes {
        adjacency
            .entry(change.from().raw())
            .or_default()
            .push(change.to().raw());
    }

    let mut colors: HashMap<&str, Color> = HashMap::new();
    for node in adjacency.keys() {
        colors.entry(node).or_insert(Color::White);
    }

    for &start in adjacency.keys() {
        if colors[start] == Color::White {
            let mut path = Vec::new();
            if let Some(cycle) = visit(start, &adjacency, &mut colors, &mut path) {
                return Err(Error::CycleDetected(cycle));
            }
        }
    }

    Ok(())
}

fn visit<'a>(
    node: &'a str,
    adjacency: &HashMap<&'a str, Vec<&'a str>>,
    colors: &mut HashMap<&'a str, Color>,
    path: &mut Vec<&'a str>,
) -> Option<String> {
    colors.insert(node, Color::Gray);
    path.push(node);

    if let Some(neighbors) = adjacency.get(node) {
        for &next in neighbors {
            match colors.get(next).copied().unwrap_or(Color::White) {
                Color::White => {
                    if let Some(cycle) = visit(next, adjacency, colors, path) {
                        return Some(cycle);
                    }
                }
                Color::Gray => {
                    let mut cycle: Vec<&str> = path.clone();
                    cycle.push(next);
                    return Some(cycle.join(" -> "));
                }
                Color::Black => {}
            }
        }
    }

    path.pop();
    colors.insert(node, Color::Black);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use crate::change::OperationTarget;
    use crate::operations::FieldOperation;
    use crate::version::Format;

    fn v(raw: &str) -> Version {
        Version::parse(raw, Format::Date).unwrap()
    }

    fn bundle() -> VersionBundle {
        VersionBundle::new(
            vec![v("2025-01-01"), v("2025-06-01"), v("2025-09-01")],
            false,
        )
        .unwrap()
    }

    fn change(from: &str, to: &str) -> VersionChange {
        VersionChange::builder(v(from), v(to), format!("{from}->{to}"))
            .request_ops(
                OperationTarget::Path("/x".into()),
                vec![FieldOperation::remove_field("x")],
            )
            .build()
            .unwrap()
    }

    #[test]
    fn detects_cycle() {
        // VersionChangeBuilder enforces from < to, so a real two-edge cycle
        // can never be built through the public API (a would have to be both
        // older and newer than b). MigrationChain::new's cycle detector still
        // stands as a structural invariant over the edge graph; exercise it
        // directly via the test-only unchecked constructor.
        let changes = vec![
            VersionChange::unchecked(v("2025-01-01"), v("2025-06-01"), "a->b"),
            VersionChange::unchecked(v("2025-06-01"), v("2025-01-01"), "b->a"),
        ];
        let err = detect_cycle(&changes).unwrap_err();
        assert_matches!(err, Error::CycleDetected(_));
        assert!(err.to_string().contains("cycle detected"));
    }

    #[test]
    fn migration_chain_new_rejects_cycle() {
        let changes = vec![
            VersionChange::unchecked(v("2025-01-01"), v("2025-06-01"), "a->b"),
            VersionChange::unchecked(v("2025-06-01"), v("2025-01-01"), "b->a"),
        ];
        let err = MigrationChain::new(changes, &bundle()).unwrap_err();
        assert_matches!(err, Error::CycleDetected(_));
    }

    #[test]
    fn rejects_duplicate_edge() {
        let changes = vec![change("2025-01-01", "2025-06-01"), change("2025-01-01", "2025-06-01")];
        let err = MigrationChain::new(changes, &bundle()).unwrap_err();
        assert_matches!(err, Error::DuplicateEdge { .. });
    }

    #[test]
    fn rejects_unknown_endpoint() {
        let changes = vec![change("2025-01-01", "2099-01-01")];
        let err = MigrationChain::new(changes, &bundle()).unwrap_err();
        assert_matches!(err, Error::UnknownEndpoint(_));
    }

    #[test]
    fn forward_path_is_ascending_by_from() {
        let changes = vec![
            change("2025-01-01", "2025-06-01"),
            change("2025-06-01", "2025-09-01"),
        ];
        let chain = MigrationChain::new(changes, &bundle()).unwrap();
        let path = chain.path(&v("2025-01-01"), &v("2025-09-01")).unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].from().raw(), "2025-01-01");
        assert_eq!(path[1].from().raw(), "2025-06-01");
    }

    #[test]
    fn backward_path_is_descending_by_from() {
        let changes = vec![
            change("2025-01-01", "2025-06-01"),
            change("2025-06-01", "2025-09-01"),
        ];
        let chain = MigrationChain::new(changes, &bundle()).unwrap();
        let path = chain.path(&v("2025-09-01"), &v("2025-01-01")).unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].from().raw(), "2025-06-01");
        assert_eq!(path[1].from().raw(), "2025-01-01");
    }

    #[test]
    fn same_version_path_is_empty() {
        let changes = vec![change("2025-01-01", "2025-06-01")];
        let chain = MigrationChain::new(changes, &bundle()).unwrap();
        assert!(chain.path(&v("2025-01-01"), &v("2025-01-01")).unwrap().is_empty());
    }

    #[test]
    fn no_path_is_reported() {
        let changes = vec![change("2025-01-01", "2025-06-01")];
        let chain = MigrationChain::new(changes, &bundle()).unwrap();
        let err = chain.path(&v("2025-06-01"), &v("2025-09-01")).unwrap_err();
        assert_matches!(err, Error::NoPath { .. });
    }
}
