use log::debug;

use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};

use crate::ir::{ElementId, IrTree};
use crate::validation::ValidationError;

/// A declaration whose stored parent differs from the container it sits in.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentMismatch {
    pub declaration: ElementId,
    pub expected_parent: ElementId,
    /// The stored parent, or `None` when it could not be read.
    pub actual_parent: Option<ElementId>,
    pub declaration_rendering: String,
    pub declaration_short: String,
    pub expected_rendering: String,
    pub actual_rendering: Option<String>,
}

/// A child id that points outside the tree. Whatever it was meant to be,
/// its parent cannot be audited.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingChild {
    pub parent: ElementId,
    pub child: ElementId,
    pub parent_rendering: String,
}

/// Every mismatch found by one audit, plus the distinct expected parents
/// in the order they were first seen.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParentReport {
    pub mismatches: Vec<ParentMismatch>,
    pub missing_children: Vec<MissingChild>,
    pub expected_parents: Vec<ElementId>,
    pub expected_parent_dumps: Vec<String>,
}

impl ParentReport {
    pub fn is_empty(&self) -> bool {
        self.mismatches.is_empty() && self.missing_children.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mismatches.len()
    }
}

impl Display for ParentReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Declarations with wrong parent: {}", self.mismatches.len())?;
        for mismatch in &self.mismatches {
            writeln!(f, "declaration: {}", mismatch.declaration_rendering)?;
            writeln!(f, "\t{}", mismatch.declaration_short)?;
            writeln!(f, "expectedParent: {}", mismatch.expected_rendering)?;
            writeln!(
                f,
                "actualParent: {}",
                mismatch.actual_rendering.as_deref().unwrap_or("null")
            )?;
        }
        for missing in &self.missing_children {
            writeln!(f, "missingChild: {} of {}", missing.child, missing.parent_rendering)?;
        }
        writeln!(f)?;
        writeln!(f, "Expected parents:")?;
        for dump in &self.expected_parent_dumps {
            write!(f, "{}", dump)?;
        }
        Ok(())
    }
}

struct ParentAuditor<'a> {
    tree: &'a IrTree,
    mismatches: Vec<ParentMismatch>,
    missing_children: Vec<MissingChild>,
}

impl ParentAuditor<'_> {
    fn handle_parent(&mut self, declaration: ElementId, container: ElementId) {
        let tree = self.tree;
        let actual_parent = match tree.parent_of(declaration) {
            Ok(stored) if stored == container => return,
            Ok(stored) => Some(stored),
            Err(err) => {
                debug!("unreadable parent: {}", err);
                None
            }
        };

        self.mismatches.push(ParentMismatch {
            declaration,
            expected_parent: container,
            actual_parent,
            declaration_rendering: tree.render(declaration),
            declaration_short: tree.short(declaration),
            expected_rendering: tree.render(container),
            actual_rendering: actual_parent.map(|parent| tree.render(parent)),
        });
    }

    /// Walks from `root`, remembering the nearest file, class or function
    /// each declaration was reached from.
    fn audit(&mut self, root: ElementId) {
        let tree = self.tree;
        let mut stack: Vec<(ElementId, Option<ElementId>, usize)> = vec![(root, None, 0)];
        let mut path: Vec<ElementId> = vec![];
        let mut on_path: HashSet<ElementId> = HashSet::new();

        while let Some((id, container, depth)) = stack.pop() {
            if path.len() > depth {
                for left in path.drain(depth..) {
                    on_path.remove(&left);
                }
            }
            if !tree.contains(id) || !on_path.insert(id) {
                continue;
            }
            path.push(id);

            if tree.declaration(id).is_some() {
                if let Some(container) = container {
                    self.handle_parent(id, container);
                }
            }

            let inner = if tree.is_declaration_container(id) {
                Some(id)
            } else {
                container
            };
            for child in tree.children(id).into_iter().rev() {
                if tree.contains(child) {
                    stack.push((child, inner, depth + 1));
                } else {
                    self.missing_children.push(MissingChild {
                        parent: id,
                        child,
                        parent_rendering: tree.render(id),
                    });
                }
            }
        }
    }

    fn into_report(self) -> ParentReport {
        let mut seen = HashSet::new();
        let mut report = ParentReport::default();
        for mismatch in &self.mismatches {
            if seen.insert(mismatch.expected_parent) {
                report.expected_parents.push(mismatch.expected_parent);
                report
                    .expected_parent_dumps
                    .push(self.tree.dump(mismatch.expected_parent));
            }
        }
        report.mismatches = self.mismatches;
        report.missing_children = self.missing_children;
        report
    }
}

/// Collects every declaration under `root` whose stored parent is not the
/// container it is found in. Any mismatch is fatal.
pub fn audit_declaration_parents(tree: &IrTree, root: ElementId) -> ParentReport {
    let mut auditor = ParentAuditor {
        tree,
        mismatches: vec![],
        missing_children: vec![],
    };
    auditor.audit(root);
    auditor.into_report()
}

pub fn check_declaration_parents(tree: &IrTree, root: ElementId) -> Result<(), ValidationError> {
    let report = audit_declaration_parents(tree, root);
    if report.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::WrongParents(report))
    }
}
