use std::collections::{HashMap, HashSet};

use crate::pole::mapper::report::{IssueKind, Report};

use super::{Context, Plan};

/// Walks the explicit "To Pole" links.
///
/// Walks start at poles that link onward but are not linked to, in
/// aggregation order, and follow every link depth-first. A link back into
/// the current walk closes a cycle and is dropped; poles only reachable
/// through such a cycle are walked afterwards from the first of them.
pub(super) fn plan(context: &Context<'_>, report: &mut Report) -> Option<Plan> {
    let links = context.explicit_links(|_| false, report);
    if links.is_empty() {
        return None;
    }

    let mut walker = Walker::new(&links);
    let sources: Vec<&str> = context
        .poles
        .iter()
        .map(|pole| pole.id.as_str())
        .filter(|id| walker.adjacency.contains_key(id))
        .collect();

    for &source in &sources {
        if !walker.targets.contains(source) {
            walker.walk(source, report);
        }
    }
    for &source in &sources {
        walker.walk(source, report);
    }

    Some(walker.plan)
}

struct Walker<'a> {
    adjacency: HashMap<&'a str, Vec<&'a str>>,
    targets: HashSet<&'a str>,
    visited: HashSet<&'a str>,
    plan: Plan,
}

impl<'a> Walker<'a> {
    fn new(links: &[(&'a str, &'a str)]) -> Self {
        let mut adjacency: HashMap<&'a str, Vec<&'a str>> = HashMap::new();
        for &(from, to) in links {
            adjacency.entry(from).or_default().push(to);
        }
        Self {
            adjacency,
            targets: links.iter().map(|&(_, to)| to).collect(),
            visited: HashSet::new(),
            plan: Plan::default(),
        }
    }

    /// Depth-first walk from `start`. Does nothing for visited poles.
    fn walk(&mut self, start: &'a str, report: &mut Report) {
        if !self.visited.insert(start) {
            return;
        }
        let mut stack: Vec<(&'a str, usize)> = vec![(start, 0)];

        while let Some(top) = stack.last_mut() {
            let (node, cursor) = *top;
            let Some(&target) = self
                .adjacency
                .get(node)
                .and_then(|targets| targets.get(cursor))
            else {
                stack.pop();
                continue;
            };
            top.1 += 1;

            if stack.iter().any(|&(on_path, _)| on_path == target) {
                report.pole(
                    IssueKind::RouteCycleDetected,
                    node,
                    format!("link {node} -> {target} closes a cycle; link dropped"),
                );
                continue;
            }

            self.plan.push(node, target);
            if self.visited.insert(target) {
                stack.push((target, 0));
            }
        }
    }
}
