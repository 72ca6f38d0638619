use proptest::prelude::*;
use std::collections::HashSet;
use sysrules::symbols::{Resolver, SymbolTable};
use sysrules::RuleError;

/// Reference flattening: depth-first, left to right, first occurrence wins
fn flatten_reference(table: &SymbolTable, name: &str, out: &mut Vec<String>, seen: &mut HashSet<String>) {
    let Some(def) = table.list(name) else {
        return;
    };
    for item in &def.items {
        if table.list(item).is_some() {
            flatten_reference(table, item, out, seen);
        } else if seen.insert(item.clone()) {
            out.push(item.clone());
        }
    }
}

/// Lists `l0..ln` where `li` may only reference `lj` with `j > i`, so the
/// graph is acyclic.
fn acyclic_table() -> impl Strategy<Value = SymbolTable> {
    (1usize..8).prop_flat_map(|n| {
        prop::collection::vec(prop::collection::vec((0usize..16, any::<bool>()), 0..6), n).prop_map(
            move |lists| {
                let mut table = SymbolTable::new();
                for (i, items) in lists.into_iter().enumerate() {
                    let items = items
                        .into_iter()
                        .map(|(v, is_ref)| {
                            let target = i + 1 + v % 4;
                            if is_ref && target < n {
                                format!("l{target}")
                            } else {
                                format!("v{}", v % 6)
                            }
                        })
                        .collect();
                    table.define_list(format!("l{i}"), items);
                }
                table
            },
        )
    })
}

proptest! {
    #[test]
    fn prop_flattening_matches_reference(table in acyclic_table()) {
        let mut resolver = Resolver::new(&table);
        for def in table.lists() {
            let resolved = resolver.resolve_list(&def.name).unwrap();
            let mut expected = Vec::new();
            flatten_reference(&table, &def.name, &mut expected, &mut HashSet::new());
            prop_assert_eq!(resolved.to_vec(), expected);

            let unique: HashSet<&String> = resolved.iter().collect();
            prop_assert_eq!(unique.len(), resolved.len());
        }
    }

    #[test]
    fn prop_ring_of_macros_is_cyclic(len in 1usize..12, start in 0usize..12) {
        let mut table = SymbolTable::new();
        for i in 0..len {
            table.define_macro(format!("m{i}"), format!("proc.pid > {i} and m{}", (i + 1) % len));
        }
        let start = format!("m{}", start % len);
        let mut resolver = Resolver::new(&table);
        match resolver.resolve_macro(&start) {
            Err(RuleError::CyclicReference { cycle, .. }) => {
                prop_assert_eq!(cycle.len(), len + 1);
                prop_assert_eq!(cycle.first(), Some(&start));
                prop_assert_eq!(cycle.last(), Some(&start));
            }
            other => prop_assert!(false, "expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn prop_ring_of_lists_is_cyclic(len in 1usize..12) {
        let mut table = SymbolTable::new();
        for i in 0..len {
            table.define_list(format!("l{i}"), vec![format!("v{i}"), format!("l{}", (i + 1) % len)]);
        }
        let mut resolver = Resolver::new(&table);
        for i in 0..len {
            let is_cycle = matches!(
                resolver.resolve_list(&format!("l{i}")),
                Err(RuleError::CyclicReference { .. })
            );
            prop_assert!(is_cycle);
        }
    }
}
