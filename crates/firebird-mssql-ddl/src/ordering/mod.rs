//! Table creation order from foreign key dependencies.
//!
//! A table depends on every other table its foreign keys reference.
//! Self-references and references to tables outside the input set add no
//! ordering constraint. Tables are released in input order whenever more
//! than one is ready, so the result is deterministic.

use crate::core::Table;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::warn;

/// Tables in creation order.
#[derive(Debug, Clone)]
pub struct TableOrder<'a> {
    /// Every input table exactly once.
    pub tables: Vec<&'a Table>,

    /// Tables that could not be ordered (part of, or behind, a cycle),
    /// alphabetically. They are appended to `tables` in this order.
    pub cyclic: Vec<String>,
}

impl TableOrder<'_> {
    pub fn has_cycle(&self) -> bool {
        !self.cyclic.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }
}

/// Order tables so that referenced tables come before referencing ones.
pub fn order_tables(tables: &[Table]) -> TableOrder<'_> {
    let mut by_name: HashMap<String, usize> = HashMap::new();
    for (i, table) in tables.iter().enumerate() {
        by_name.entry(table.name.to_uppercase()).or_insert(i);
    }

    // deps[i]: tables i must wait for; dependents[j]: tables waiting on j
    let mut deps: Vec<HashSet<usize>> = vec![HashSet::new(); tables.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); tables.len()];

    for (i, table) in tables.iter().enumerate() {
        for fk in table.foreign_keys() {
            let Some(ref_table) = fk.ref_table.as_deref() else {
                continue;
            };
            let Some(&j) = by_name.get(&ref_table.to_uppercase()) else {
                continue;
            };
            if i != j && !ref_table.eq_ignore_ascii_case(&table.name) && deps[i].insert(j) {
                dependents[j].push(i);
            }
        }
    }

    let mut in_degree: Vec<usize> = deps.iter().map(HashSet::len).collect();
    let mut ready: BTreeSet<usize> = (0..tables.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut placed = vec![false; tables.len()];
    let mut ordered = Vec::with_capacity(tables.len());

    while let Some(i) = ready.pop_first() {
        placed[i] = true;
        ordered.push(&tables[i]);
        for &d in &dependents[i] {
            in_degree[d] -= 1;
            if in_degree[d] == 0 {
                ready.insert(d);
            }
        }
    }

    let mut remaining: Vec<&Table> = tables
        .iter()
        .enumerate()
        .filter(|(i, _)| !placed[*i])
        .map(|(_, t)| t)
        .collect();

    if !remaining.is_empty() {
        remaining.sort_by(|a, b| {
            a.name
                .to_uppercase()
                .cmp(&b.name.to_uppercase())
                .then_with(|| a.name.cmp(&b.name))
        });
        warn!(
            "{} table(s) with circular foreign key dependencies; creating them alphabetically, \
             foreign keys are added after all tables",
            remaining.len()
        );
    }

    let cyclic = remaining.iter().map(|t| t.name.clone()).collect();
    ordered.extend(remaining);

    TableOrder {
        tables: ordered,
        cyclic,
    }
}
