use log::debug;

use std::collections::{HashMap, HashSet};

use crate::ir::{DeclarationKind, ElementId, ElementKind, ExpressionKind, IrTree};
use crate::validation::{ReportFn, ValidationError};

enum Step {
    Visit(ElementId),
    Bind(ElementId),
    Close,
}

struct Scope {
    owner: ElementId,
    bindings: HashSet<ElementId>,
}

/// Checks that every value reference in a file sees a binding made earlier
/// in an enclosing scope.
pub struct ScopeValidator<'a, 'r> {
    tree: &'a IrTree,
    report: &'r mut ReportFn<'r>,
    scopes: Vec<Scope>,
    homes: HashMap<ElementId, ElementId>,
}

impl<'a, 'r> ScopeValidator<'a, 'r> {
    pub fn new(tree: &'a IrTree, report: &'r mut ReportFn<'r>) -> Self {
        ScopeValidator {
            tree,
            report,
            scopes: vec![],
            homes: HashMap::new(),
        }
    }

    fn opens_scope(&self, id: ElementId) -> bool {
        match self.tree.get(id).map(|element| &element.kind) {
            Some(ElementKind::File(_)) => true,
            Some(ElementKind::Declaration(decl)) => matches!(
                decl.kind,
                DeclarationKind::Class { .. } | DeclarationKind::Function { .. }
            ),
            Some(ElementKind::Expression(expr)) => {
                matches!(expr.kind, ExpressionKind::Block { .. })
            }
            _ => false,
        }
    }

    /// Records the scope element each binding of the file belongs to.
    fn collect_homes(&mut self, file: ElementId) {
        let mut stack = vec![(file, file)];
        let mut seen = HashSet::new();

        while let Some((id, scope)) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            if self.tree.is_value_declaration(id) {
                self.homes.insert(id, scope);
            }
            let inner = if self.opens_scope(id) { id } else { scope };
            for child in self.tree.children(id).into_iter().rev() {
                stack.push((child, inner));
            }
        }
    }

    pub fn check(mut self, file: ElementId) -> Result<(), ValidationError> {
        debug!("checking scopes of {}", self.tree.render(file));
        self.collect_homes(file);

        let tree = self.tree;
        let mut stack = vec![Step::Visit(file)];
        let mut seen = HashSet::new();

        while let Some(step) = stack.pop() {
            match step {
                Step::Visit(id) => {
                    if !seen.insert(id) {
                        continue;
                    }
                    let Some(element) = tree.get(id) else {
                        continue;
                    };

                    match &element.kind {
                        ElementKind::Expression(expr) => match expr.kind {
                            ExpressionKind::GetValue { symbol }
                            | ExpressionKind::SetValue { symbol, .. } => {
                                self.check_reference(id, symbol)?;
                            }
                            _ => {}
                        },
                        ElementKind::Declaration(decl) => match decl.kind {
                            DeclarationKind::ValueParameter { .. } => self.bind(id),
                            DeclarationKind::Variable { .. } => stack.push(Step::Bind(id)),
                            _ => {}
                        },
                        _ => {}
                    }

                    if self.opens_scope(id) {
                        self.scopes.push(Scope {
                            owner: id,
                            bindings: HashSet::new(),
                        });
                        stack.push(Step::Close);
                    }
                    for child in tree.children(id).into_iter().rev() {
                        stack.push(Step::Visit(child));
                    }
                }
                Step::Bind(id) => self.bind(id),
                Step::Close => {
                    self.scopes.pop();
                }
            }
        }

        Ok(())
    }

    fn bind(&mut self, binding: ElementId) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.bindings.insert(binding);
        }
    }

    fn check_reference(&mut self, at: ElementId, symbol: ElementId) -> Result<(), ValidationError> {
        if !self.tree.is_value_declaration(symbol) {
            return Ok(());
        }
        if self
            .scopes
            .iter()
            .any(|scope| scope.bindings.contains(&symbol))
        {
            return Ok(());
        }

        let name = self.tree.name_of(symbol).unwrap_or_default();
        let message = match self.homes.get(&symbol) {
            Some(home) if self.scopes.iter().any(|scope| scope.owner == *home) => {
                format!("Value `{}` is used before its declaration", name)
            }
            Some(_) => format!("Value `{}` is referenced outside of its scope", name),
            None if self.is_foreign_top_level(symbol) => return Ok(()),
            None => format!("Value `{}` is not declared in any enclosing scope", name),
        };
        (self.report)(at, &message)
    }

    /// Top-level variables of other files are visible everywhere.
    fn is_foreign_top_level(&self, symbol: ElementId) -> bool {
        let is_variable = matches!(
            self.tree.declaration(symbol).map(|decl| &decl.kind),
            Some(DeclarationKind::Variable { .. })
        );
        is_variable
            && self
                .tree
                .parent_of(symbol)
                .map(|parent| self.tree.is_file(parent))
                .unwrap_or(false)
    }
}
