//! Dependency extraction and the formula dependency graph
//!
//! Tracks which formulas reference which other names, enabling batch
//! evaluation in dependency order with cycle reporting.

use crate::ast::Expr;
use indexmap::{IndexMap, IndexSet};
use reckon_core::{EngineError, EngineResult};
use std::collections::VecDeque;

/// Collect the set of `$`-variable names an expression references.
///
/// `@`-variables are external context and are never collected. For member
/// and index chains only the root variable counts, but bracket index
/// expressions are walked in full.
pub fn extract_dependencies(expr: &Expr) -> IndexSet<String> {
    let mut deps = IndexSet::new();
    collect_deps(expr, &mut deps);
    deps
}

fn collect_deps(expr: &Expr, deps: &mut IndexSet<String>) {
    match expr {
        Expr::Variable { name } => {
            deps.insert(name.clone());
        }
        Expr::ContextVariable { .. } => {}
        Expr::Member { object, .. } => collect_deps(object, deps),
        Expr::Index { object, index } => {
            collect_deps(object, deps);
            collect_deps(index, deps);
        }
        Expr::Unary { operand, .. } => collect_deps(operand, deps),
        Expr::Binary { left, right, .. } => {
            collect_deps(left, deps);
            collect_deps(right, deps);
        }
        Expr::Conditional {
            condition,
            consequent,
            alternate,
        } => {
            collect_deps(condition, deps);
            collect_deps(consequent, deps);
            collect_deps(alternate, deps);
        }
        Expr::Call { args, .. } => {
            for arg in args {
                collect_deps(arg, deps);
            }
        }
        Expr::ArrayLit(elements) => {
            for element in elements {
                collect_deps(element, deps);
            }
        }
        Expr::ObjectLit(properties) => {
            // keys are not variables
            for (_, value) in properties {
                collect_deps(value, deps);
            }
        }
        Expr::DecimalLit(_)
        | Expr::FloatLit(_)
        | Expr::StringLit(_)
        | Expr::BoolLit(_)
        | Expr::NullLit => {}
    }
}

/// Collect every function name an expression calls (names are already
/// upper-cased by the parser). Used by validation to flag unknown functions.
pub fn extract_function_names(expr: &Expr) -> IndexSet<String> {
    let mut names = IndexSet::new();
    collect_function_names(expr, &mut names);
    names
}

fn collect_function_names(expr: &Expr, names: &mut IndexSet<String>) {
    match expr {
        Expr::Call { name, args } => {
            names.insert(name.clone());
            for arg in args {
                collect_function_names(arg, names);
            }
        }
        Expr::Unary { operand, .. } => collect_function_names(operand, names),
        Expr::Binary { left, right, .. } => {
            collect_function_names(left, names);
            collect_function_names(right, names);
        }
        Expr::Conditional {
            condition,
            consequent,
            alternate,
        } => {
            collect_function_names(condition, names);
            collect_function_names(consequent, names);
            collect_function_names(alternate, names);
        }
        Expr::Member { object, .. } => collect_function_names(object, names),
        Expr::Index { object, index } => {
            collect_function_names(object, names);
            collect_function_names(index, names);
        }
        Expr::ArrayLit(elements) => {
            for element in elements {
                collect_function_names(element, names);
            }
        }
        Expr::ObjectLit(properties) => {
            for (_, value) in properties {
                collect_function_names(value, names);
            }
        }
        _ => {}
    }
}

/// Directed graph over formula ids
///
/// An edge `a → b` means "a depends on b". Nodes and edges keep insertion
/// order so the topological tie-break is deterministic and batch replays are
/// reproducible.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: IndexSet<String>,
    edges: IndexMap<String, IndexSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: &str) {
        self.nodes.insert(id.to_string());
    }

    /// Add "src depends on dst", creating both endpoints as needed
    pub fn add_edge(&mut self, src: &str, dst: &str) {
        self.add_node(src);
        self.add_node(dst);
        self.edges
            .entry(src.to_string())
            .or_default()
            .insert(dst.to_string());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    /// Names this id directly depends on
    pub fn dependencies(&self, id: &str) -> impl Iterator<Item = &str> {
        self.edges
            .get(id)
            .into_iter()
            .flat_map(|deps| deps.iter().map(String::as_str))
    }

    /// Ids that directly depend on this one
    pub fn dependents<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> {
        self.edges
            .iter()
            .filter(move |(_, deps)| deps.contains(id))
            .map(|(src, _)| src.as_str())
    }

    /// Everything reachable through dependency edges, excluding the node
    /// itself
    pub fn transitive_dependencies(&self, id: &str) -> IndexSet<String> {
        let mut seen = IndexSet::new();
        let mut queue: VecDeque<&str> = self.dependencies(id).collect();
        while let Some(dep) = queue.pop_front() {
            if seen.insert(dep.to_string()) {
                queue.extend(self.dependencies(dep));
            }
        }
        seen.shift_remove(id);
        seen
    }

    /// Kahn's algorithm; the in-degree counts only dependencies that are
    /// themselves nodes, and ties break in insertion order.
    pub fn topological_sort(&self) -> EngineResult<Vec<String>> {
        let mut in_degree: IndexMap<&str, usize> = self
            .nodes
            .iter()
            .map(|id| {
                let degree = self
                    .dependencies(id)
                    .filter(|dep| self.nodes.contains(*dep))
                    .count();
                (id.as_str(), degree)
            })
            .collect();

        let mut queue: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(id, _)| *id)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = queue.pop_front() {
            order.push(id.to_string());
            for dependent in self.dependents(id) {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        if order.len() < self.nodes.len() {
            return Err(self.report_cycle(&order));
        }
        Ok(order)
    }

    /// Locate one concrete cycle among the nodes the sort could not place
    fn report_cycle(&self, placed: &[String]) -> EngineError {
        let placed: IndexSet<&str> = placed.iter().map(String::as_str).collect();
        let involved: Vec<String> = self
            .nodes
            .iter()
            .filter(|id| !placed.contains(id.as_str()))
            .cloned()
            .collect();

        let mut visited: IndexSet<&str> = IndexSet::new();
        for start in &involved {
            let mut path: Vec<&str> = Vec::new();
            if let Some(cycle) = self.find_cycle(start, &mut path, &mut visited) {
                return EngineError::CircularDependency { cycle, involved };
            }
        }

        // Unreachable for a sort shortfall, but keep the error total
        EngineError::CircularDependency {
            cycle: involved.clone(),
            involved,
        }
    }

    fn find_cycle<'a>(
        &'a self,
        node: &'a str,
        path: &mut Vec<&'a str>,
        visited: &mut IndexSet<&'a str>,
    ) -> Option<Vec<String>> {
        if let Some(pos) = path.iter().position(|n| *n == node) {
            let mut cycle: Vec<String> = path[pos..].iter().map(|s| s.to_string()).collect();
            cycle.push(node.to_string());
            return Some(cycle);
        }
        if !visited.insert(node) {
            return None;
        }
        path.push(node);
        for dep in self.dependencies(node) {
            if !self.nodes.contains(dep) {
                continue;
            }
            if let Some(cycle) = self.find_cycle(dep, path, visited) {
                return Some(cycle);
            }
        }
        path.pop();
        None
    }
}
