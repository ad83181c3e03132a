use std::collections::{BTreeMap, BTreeSet};

use calcsheet_core::CellAddress;

/// Dependencies between formula cells, used to report circular references
/// before recalculation.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Maps a cell to the cells it depends on (formula inputs)
    /// e.g., if A1 = B1 + C1, then dependencies[A1] = {B1, C1}
    dependencies: BTreeMap<CellAddress, BTreeSet<CellAddress>>,

    /// Maps a cell to the cells that depend on it (reverse lookup)
    dependents: BTreeMap<CellAddress, BTreeSet<CellAddress>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the dependencies of a cell
    pub fn set_dependencies(&mut self, cell: CellAddress, deps: BTreeSet<CellAddress>) {
        // Remove old reverse dependencies
        if let Some(old_deps) = self.dependencies.get(&cell) {
            for dep in old_deps {
                if let Some(dependents) = self.dependents.get_mut(dep) {
                    dependents.remove(&cell);
                }
            }
        }

        for dep in &deps {
            self.dependents.entry(*dep).or_default().insert(cell);
        }

        if deps.is_empty() {
            self.dependencies.remove(&cell);
        } else {
            self.dependencies.insert(cell, deps);
        }
    }

    /// Cells that the given cell directly depends on
    pub fn dependencies_of(&self, cell: CellAddress) -> Option<&BTreeSet<CellAddress>> {
        self.dependencies.get(&cell)
    }

    /// Cells that directly depend on the given cell
    pub fn dependents_of(&self, cell: CellAddress) -> Option<&BTreeSet<CellAddress>> {
        self.dependents.get(&cell)
    }

    /// Groups of cells that (transitively) depend on themselves, each sorted
    /// row-major. A self-referencing cell forms a group of one.
    pub fn cycles(&self) -> Vec<Vec<CellAddress>> {
        let mut state = Tarjan::default();
        for cell in self.dependencies.keys() {
            if !state.index.contains_key(cell) {
                state.visit(self, *cell);
            }
        }

        let mut cycles: Vec<Vec<CellAddress>> = state
            .components
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || self
                        .dependencies_of(component[0])
                        .is_some_and(|deps| deps.contains(&component[0]))
            })
            .map(|mut component| {
                component.sort();
                component
            })
            .collect();
        cycles.sort();
        cycles
    }
}

/// Tarjan's strongly connected components
#[derive(Default)]
struct Tarjan {
    next_index: usize,
    index: BTreeMap<CellAddress, usize>,
    low_link: BTreeMap<CellAddress, usize>,
    stack: Vec<CellAddress>,
    on_stack: BTreeSet<CellAddress>,
    components: Vec<Vec<CellAddress>>,
}

impl Tarjan {
    fn visit(&mut self, graph: &DependencyGraph, cell: CellAddress) {
        self.index.insert(cell, self.next_index);
        self.low_link.insert(cell, self.next_index);
        self.next_index += 1;
        self.stack.push(cell);
        self.on_stack.insert(cell);

        if let Some(deps) = graph.dependencies_of(cell) {
            for dep in deps {
                if !self.index.contains_key(dep) {
                    self.visit(graph, *dep);
                    let low = self.low_link[dep].min(self.low_link[&cell]);
                    self.low_link.insert(cell, low);
                } else if self.on_stack.contains(dep) {
                    let low = self.index[dep].min(self.low_link[&cell]);
                    self.low_link.insert(cell, low);
                }
            }
        }

        if self.low_link[&cell] == self.index[&cell] {
            let mut component = Vec::new();
            while let Some(member) = self.stack.pop() {
                self.on_stack.remove(&member);
                component.push(member);
                if member == cell {
                    break;
                }
            }
            self.components.push(component);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(text: &str) -> CellAddress {
        CellAddress::parse(text).unwrap()
    }

    fn deps(cells: &[&str]) -> BTreeSet<CellAddress> {
        cells.iter().map(|c| addr(c)).collect()
    }

    #[test]
    fn test_basic_dependency() {
        let mut graph = DependencyGraph::new();

        // A1 = B1 + C1
        graph.set_dependencies(addr("A1"), deps(&["B1", "C1"]));

        assert!(graph.dependencies_of(addr("A1")).unwrap().contains(&addr("B1")));
        assert!(graph.dependents_of(addr("B1")).unwrap().contains(&addr("A1")));
        assert!(graph.dependents_of(addr("C1")).unwrap().contains(&addr("A1")));
    }

    #[test]
    fn test_update_dependencies() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(addr("A1"), deps(&["B1"]));
        graph.set_dependencies(addr("A1"), deps(&["C1"]));

        assert!(!graph.dependents_of(addr("B1")).unwrap().contains(&addr("A1")));
        assert!(graph.dependents_of(addr("C1")).unwrap().contains(&addr("A1")));

        graph.set_dependencies(addr("A1"), BTreeSet::new());
        assert!(graph.dependencies_of(addr("A1")).is_none());
    }

    #[test]
    fn test_acyclic_chain_has_no_cycles() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(addr("C1"), deps(&["B1"]));
        graph.set_dependencies(addr("B1"), deps(&["A1"]));
        assert!(graph.cycles().is_empty());
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(addr("A1"), deps(&["A1"]));
        assert_eq!(graph.cycles(), vec![vec![addr("A1")]]);
    }

    #[test]
    fn test_indirect_cycle() {
        let mut graph = DependencyGraph::new();
        // A1 -> B1 -> C1 -> A1, D1 -> A1 outside the cycle
        graph.set_dependencies(addr("A1"), deps(&["B1"]));
        graph.set_dependencies(addr("B1"), deps(&["C1"]));
        graph.set_dependencies(addr("C1"), deps(&["A1"]));
        graph.set_dependencies(addr("D1"), deps(&["A1"]));

        assert_eq!(graph.cycles(), vec![vec![addr("A1"), addr("B1"), addr("C1")]]);
    }
}
