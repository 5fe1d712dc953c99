//! Tree queries over the flat session map
//!
//! The tree exists only as parent keys. Walks are bounded by the map size so
//! a hand-edited registry with a cycle cannot loop forever.

use crate::fs::SessionMap;

/// Depth of `name`: 0 for a root, parent depth + 1 otherwise.
/// A parent key that no longer resolves ends the walk.
pub fn depth_of(sessions: &SessionMap, name: &str) -> usize {
    ancestors(sessions, name).len()
}

/// Ancestors of `name`, nearest first.
pub fn ancestors(sessions: &SessionMap, name: &str) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current = sessions.get(name).and_then(|s| s.parent.clone());
    while let Some(parent) = current {
        if chain.len() > sessions.len() || !sessions.contains_key(&parent) {
            break;
        }
        current = sessions.get(&parent).and_then(|s| s.parent.clone());
        chain.push(parent);
    }
    chain
}

/// True if `ancestor` is a direct or transitive parent of `target`.
pub fn is_ancestor(sessions: &SessionMap, ancestor: &str, target: &str) -> bool {
    ancestors(sessions, target).iter().any(|a| a == ancestor)
}

pub fn children_of(sessions: &SessionMap, name: &str) -> Vec<String> {
    sessions
        .values()
        .filter(|s| s.parent.as_deref() == Some(name))
        .map(|s| s.name.clone())
        .collect()
}

/// Every descendant of `name`, deepest first.
pub fn descendants_deepest_first(sessions: &SessionMap, name: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = Vec::new();
    let mut frontier = vec![(1usize, name.to_string())];
    while let Some((depth, current)) = frontier.pop() {
        for child in children_of(sessions, &current) {
            if child == name || found.iter().any(|(_, n)| *n == child) {
                continue;
            }
            frontier.push((depth + 1, child.clone()));
            found.push((depth, child));
        }
    }
    found.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    found.into_iter().map(|(_, n)| n).collect()
}

/// Sessions in tree order (parents before children), paired with depth.
/// Sessions whose parent is missing are treated as roots.
pub fn tree_order(sessions: &SessionMap) -> Vec<(String, usize)> {
    fn visit(sessions: &SessionMap, name: &str, depth: usize, out: &mut Vec<(String, usize)>) {
        if out.iter().any(|(n, _)| n == name) {
            return;
        }
        out.push((name.to_string(), depth));
        let mut children = children_of(sessions, name);
        children.sort();
        for child in children {
            visit(sessions, &child, depth + 1, out);
        }
    }

    let mut out = Vec::new();
    let roots = sessions.values().filter(|s| {
        s.parent
            .as_ref()
            .map_or(true, |parent| !sessions.contains_key(parent))
    });
    for root in roots {
        visit(sessions, &root.name, 0, &mut out);
    }
    out
}
