//! Structural well-formedness checks for pointer graphs.
//!
//! The analyses refuse to run on a graph that fails validation.

use super::{NodeKind, PointerGraph, PointerGraphNode};
use itertools::Itertools;

/// Checks a [`PointerGraph`] for structural errors: wrong operand arities
/// and operand references that do not resolve to a registered node.
///
/// All violations are accumulated into one human-readable report.
pub struct PointerGraphValidator<'a> {
    graph: &'a PointerGraph,
    errors: String,
}

impl<'a> PointerGraphValidator<'a> {
    /// Create a validator for the given graph.
    pub fn new(graph: &'a PointerGraph) -> PointerGraphValidator<'a> {
        PointerGraphValidator {
            graph,
            errors: String::new(),
        }
    }

    /// Run all checks. Returns `Ok(())` on a well-formed graph and the
    /// accumulated report otherwise.
    pub fn validate(mut self) -> Result<(), String> {
        let mut invalid = false;
        invalid |= self.check_operands();
        invalid |= self.check_operand_references();
        if invalid {
            Err(self.errors)
        } else {
            Ok(())
        }
    }

    fn report_invalid_number_of_operands(&mut self, node: &PointerGraphNode) {
        self.errors += &format!(
            "Invalid number of operands for {} with ID {}\n  - operands: [{}]\n",
            node.kind(),
            node.id(),
            node.operands().iter().map(|op| op.to_string()).join(" ")
        );
    }

    /// Check the kind-determined operand arities.
    /// Returns true when at least one node is invalid.
    fn check_operands(&mut self) -> bool {
        let graph = self.graph;
        let mut invalid = false;
        for node in graph.nodes() {
            let arity = node.operands().len();
            let arity_ok = match node.kind() {
                NodeKind::Phi => arity >= 1,
                NodeKind::NullAddr
                | NodeKind::UnknownMem
                | NodeKind::Noop
                | NodeKind::Function { .. }
                | NodeKind::Constant => arity == 0,
                NodeKind::Gep { .. }
                | NodeKind::Load { .. }
                | NodeKind::Cast
                | NodeKind::Free => arity == 1,
                NodeKind::Store { .. } | NodeKind::Memcpy { .. } => arity == 2,
                _ => true,
            };
            if !arity_ok {
                self.report_invalid_number_of_operands(node);
                invalid = true;
            }
        }
        invalid
    }

    /// Check that every operand reference resolves to a registered node.
    /// Returns true when at least one reference dangles.
    fn check_operand_references(&mut self) -> bool {
        let mut invalid = false;
        let mut dangling = Vec::new();
        for node in self.graph.nodes() {
            for operand in node.operands() {
                if !self.graph.contains(*operand) {
                    dangling.push((node.id(), node.kind(), *operand));
                }
            }
        }
        for (id, kind, operand) in dangling {
            self.errors += &format!(
                "Operand {} of {} with ID {} does not refer to a node of the graph\n",
                operand, kind, id
            );
            invalid = true;
        }
        invalid
    }
}
