use log::{debug, warn};

use std::collections::HashSet;

use crate::ir::{ElementId, IrBuiltIns, IrTree};
use crate::validation::{
    CheckIrElement, DiagnosticSink, EscalationMode, IrValidatorConfig, Reporter, ScopeValidator,
    ValidationError,
};

enum Frame {
    Visit {
        element: ElementId,
        file: Option<ElementId>,
    },
    FinishFile {
        file: ElementId,
    },
    Leave {
        element: ElementId,
    },
}

/// Drives one validation pass: every reachable element is checked before its
/// children, and each file gets a scope check once its subtree is done.
pub struct IrValidator<'a, 's> {
    tree: &'a IrTree,
    config: &'a IrValidatorConfig,
    checker: CheckIrElement<'a>,
    reporter: Reporter<'s>,
}

impl<'a, 's> IrValidator<'a, 's> {
    pub fn new(
        tree: &'a IrTree,
        builtins: &'a IrBuiltIns,
        config: &'a IrValidatorConfig,
        mode: EscalationMode,
        sink: &'s mut dyn DiagnosticSink,
    ) -> Self {
        IrValidator {
            tree,
            config,
            checker: CheckIrElement::new(tree, builtins, config),
            reporter: Reporter::new(mode, sink),
        }
    }

    pub fn reported(&self) -> usize {
        self.reporter.reported()
    }

    pub fn validate(&mut self, root: ElementId) -> Result<(), ValidationError> {
        let Self {
            tree,
            config,
            checker,
            reporter,
        } = self;
        let tree: &IrTree = *tree;
        checker.reset();

        let mut stack = vec![Frame::Visit {
            element: root,
            file: None,
        }];
        let mut on_path = HashSet::new();

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Visit { element, file } => {
                    if !tree.contains(element) {
                        warn!("root {} is not in the tree", element);
                        continue;
                    }

                    checker.check(element, &mut |at, message| {
                        reporter.report(tree, file, at, message)
                    })?;

                    if !on_path.insert(element) {
                        warn!("{} is its own ancestor, not descending again", tree.short(element));
                        continue;
                    }
                    stack.push(Frame::Leave { element });

                    let file = if tree.is_file(element) {
                        debug!("validating {}", tree.render(element));
                        stack.push(Frame::FinishFile { file: element });
                        Some(element)
                    } else {
                        file
                    };

                    let children = tree.children(element);
                    for &child in &children {
                        if !tree.contains(child) {
                            let message = format!("Child {} is not bound to any element", child);
                            reporter.report(tree, file, element, &message)?;
                        }
                    }
                    for child in children.into_iter().rev().filter(|child| tree.contains(*child)) {
                        stack.push(Frame::Visit {
                            element: child,
                            file,
                        });
                    }
                }
                Frame::FinishFile { file } => {
                    if config.check_scopes {
                        ScopeValidator::new(tree, &mut |at, message| {
                            reporter.report(tree, Some(file), at, message)
                        })
                        .check(file)?;
                    }
                }
                Frame::Leave { element } => {
                    on_path.remove(&element);
                }
            }
        }

        Ok(())
    }
}
