use std::collections::HashSet;

use crate::ir::{
    BuiltinType, Classifier, ConstValue, DeclarationKind, ElementId, ElementKind, ExpressionKind,
    IrBuiltIns, IrDeclaration, IrExpression, IrTree, IrType,
};
use crate::validation::{IrValidatorConfig, ReportFn, ValidationError};

type CheckResult = Result<(), ValidationError>;

/// Per-element invariant checks. Only the element itself is inspected;
/// descending into children is the walker's job.
pub struct CheckIrElement<'a> {
    tree: &'a IrTree,
    builtins: &'a IrBuiltIns,
    config: &'a IrValidatorConfig,
    visited: HashSet<ElementId>,
}

impl<'a> CheckIrElement<'a> {
    pub fn new(tree: &'a IrTree, builtins: &'a IrBuiltIns, config: &'a IrValidatorConfig) -> Self {
        CheckIrElement {
            tree,
            builtins,
            config,
            visited: HashSet::new(),
        }
    }

    /// Forgets the elements seen so far.
    pub fn reset(&mut self) {
        self.visited.clear();
    }

    pub fn check(&mut self, id: ElementId, report: &mut ReportFn<'_>) -> CheckResult {
        if self.config.ensure_all_nodes_are_different && !self.visited.insert(id) {
            report(id, "Duplicate IR node")?;
        }

        let tree = self.tree;
        let Some(element) = tree.get(id) else {
            return Ok(());
        };

        match &element.kind {
            ElementKind::Module(_) | ElementKind::File(_) => Ok(()),
            ElementKind::Declaration(decl) => self.check_declaration(id, decl, report),
            ElementKind::Expression(expr) => self.check_expression(id, expr, report),
        }
    }

    fn check_declaration(
        &self,
        id: ElementId,
        decl: &IrDeclaration,
        report: &mut ReportFn<'_>,
    ) -> CheckResult {
        if self.config.check_descriptors {
            self.check_descriptor(id, decl, report)?;
        }
        if self.config.check_types {
            self.check_declaration_types(id, decl, report)?;
        }
        if self.config.check_properties {
            self.check_property_links(id, decl, report)?;
        }
        Ok(())
    }

    fn check_expression(
        &self,
        id: ElementId,
        expr: &IrExpression,
        report: &mut ReportFn<'_>,
    ) -> CheckResult {
        if self.config.check_descriptors {
            self.check_symbols(id, expr, report)?;
        }
        if self.config.check_types {
            self.check_type_well_formed(id, &expr.ty, report)?;
            self.check_typing_rule(id, expr, report)?;
        }
        Ok(())
    }

    fn check_descriptor(
        &self,
        id: ElementId,
        decl: &IrDeclaration,
        report: &mut ReportFn<'_>,
    ) -> CheckResult {
        let Some(descriptor) = &decl.descriptor else {
            return report(id, &format!("Declaration `{}` has no descriptor", decl.name));
        };

        if descriptor.name != decl.name {
            report(
                id,
                &format!(
                    "Descriptor name `{}` does not match declaration name `{}`",
                    descriptor.name, decl.name
                ),
            )?;
        }

        let kind = decl.kind.descriptor_kind();
        if descriptor.kind != kind {
            report(
                id,
                &format!(
                    "Descriptor of `{}` describes a {}, but the declaration is a {}",
                    decl.name, descriptor.kind, kind
                ),
            )?;
        }
        Ok(())
    }

    fn check_symbols(
        &self,
        id: ElementId,
        expr: &IrExpression,
        report: &mut ReportFn<'_>,
    ) -> CheckResult {
        let tree = self.tree;
        let (symbol, bound_correctly, expected) = match &expr.kind {
            ExpressionKind::GetValue { symbol } | ExpressionKind::SetValue { symbol, .. } => {
                (*symbol, tree.is_value_declaration(*symbol), "a value declaration")
            }
            ExpressionKind::Call { callee, .. } => (*callee, tree.is_function(*callee), "a function"),
            ExpressionKind::Return { target, .. } => {
                (*target, tree.is_function(*target), "a function")
            }
            _ => return Ok(()),
        };

        if !tree.contains(symbol) {
            return report(
                id,
                &format!("Symbol {} is not bound to any element", symbol),
            );
        }
        if !bound_correctly {
            report(
                id,
                &format!(
                    "{} refers to {} which is not {}",
                    tree.short(id),
                    tree.render(symbol),
                    expected
                ),
            )?;
        }
        Ok(())
    }

    fn check_type_well_formed(
        &self,
        at: ElementId,
        ty: &IrType,
        report: &mut ReportFn<'_>,
    ) -> CheckResult {
        match ty {
            IrType::Error { reason } => report(at, &format!("Ill-formed type: {}", reason)),
            IrType::Simple {
                classifier: Classifier::Builtin(builtin),
                ..
            } if !self.builtins.contains(*builtin) => {
                report(at, &format!("Type {} is not a known builtin", builtin))
            }
            IrType::Simple {
                classifier: Classifier::Class(class),
                ..
            } if !self.tree.is_class(*class) => report(
                at,
                &format!("Type refers to {} which is not a class", self.tree.short(*class)),
            ),
            IrType::Simple { .. } => Ok(()),
        }
    }

    fn expect_same(
        &self,
        at: ElementId,
        what: &str,
        actual: &IrType,
        expected: &IrType,
        report: &mut ReportFn<'_>,
    ) -> CheckResult {
        if actual.is_error() || expected.is_error() || actual == expected {
            return Ok(());
        }
        report(
            at,
            &format!(
                "{}: expected {}, actual {}",
                what,
                self.tree.type_to_string(expected),
                self.tree.type_to_string(actual)
            ),
        )
    }

    fn expect_assignable(
        &self,
        at: ElementId,
        what: &str,
        actual: &IrType,
        expected: &IrType,
        report: &mut ReportFn<'_>,
    ) -> CheckResult {
        if self.builtins.is_subtype_of(actual, expected) {
            return Ok(());
        }
        report(
            at,
            &format!(
                "{}: {} is not assignable to {}",
                what,
                self.tree.type_to_string(actual),
                self.tree.type_to_string(expected)
            ),
        )
    }

    fn check_declaration_types(
        &self,
        id: ElementId,
        decl: &IrDeclaration,
        report: &mut ReportFn<'_>,
    ) -> CheckResult {
        match &decl.kind {
            DeclarationKind::Class { .. } => Ok(()),
            DeclarationKind::Function { return_type, .. } => {
                self.check_type_well_formed(id, return_type, report)
            }
            DeclarationKind::ValueParameter { ty, .. } | DeclarationKind::Property { ty, .. } => {
                self.check_type_well_formed(id, ty, report)
            }
            DeclarationKind::Variable {
                ty, initializer, ..
            }
            | DeclarationKind::Field {
                ty, initializer, ..
            } => {
                self.check_type_well_formed(id, ty, report)?;
                if let Some(init_ty) = initializer.and_then(|init| self.tree.expression_type(init)) {
                    self.expect_assignable(id, "Initializer", init_ty, ty, report)?;
                }
                Ok(())
            }
        }
    }

    fn check_typing_rule(
        &self,
        id: ElementId,
        expr: &IrExpression,
        report: &mut ReportFn<'_>,
    ) -> CheckResult {
        let tree = self.tree;
        let builtins = self.builtins;

        match &expr.kind {
            ExpressionKind::Const(value) => {
                let expected = match value {
                    ConstValue::Null => {
                        if !expr.ty.is_nullable() && !expr.ty.is_error() {
                            report(
                                id,
                                &format!(
                                    "Const null has non-nullable type {}",
                                    tree.type_to_string(&expr.ty)
                                ),
                            )?;
                        }
                        return Ok(());
                    }
                    ConstValue::Bool(_) => builtins.boolean_type(),
                    ConstValue::Char(_) => builtins.char_type(),
                    ConstValue::Int(_) => builtins.int_type(),
                    ConstValue::Long(_) => builtins.long_type(),
                    ConstValue::Double(_) => builtins.double_type(),
                    ConstValue::String(_) => builtins.string_type(),
                };
                self.expect_same(id, "CONST", &expr.ty, &expected, report)
            }
            ExpressionKind::GetValue { symbol } => {
                if !tree.is_value_declaration(*symbol) {
                    return Ok(());
                }
                match tree.value_type(*symbol) {
                    Some(declared) => self.expect_same(id, "GET_VAR", &expr.ty, declared, report),
                    None => Ok(()),
                }
            }
            ExpressionKind::SetValue { symbol, value } => {
                self.expect_same(id, "SET_VAR", &expr.ty, &builtins.unit_type(), report)?;
                if !tree.is_value_declaration(*symbol) {
                    return Ok(());
                }
                if let (Some(declared), Some(value_ty)) =
                    (tree.value_type(*symbol), tree.expression_type(*value))
                {
                    self.expect_assignable(id, "SET_VAR value", value_ty, declared, report)?;
                }
                Ok(())
            }
            ExpressionKind::Call { callee, args } => {
                let Some(DeclarationKind::Function {
                    params,
                    return_type,
                    ..
                }) = tree.declaration(*callee).map(|decl| &decl.kind)
                else {
                    return Ok(());
                };

                self.expect_same(id, "CALL", &expr.ty, return_type, report)?;
                if args.len() != params.len() {
                    return report(
                        id,
                        &format!(
                            "CALL '{}' passes {} argument(s), expected {}",
                            tree.name_of(*callee).unwrap_or_default(),
                            args.len(),
                            params.len()
                        ),
                    );
                }
                for (index, (arg, param)) in args.iter().zip(params).enumerate() {
                    if let (Some(arg_ty), Some(param_ty)) =
                        (tree.expression_type(*arg), tree.value_type(*param))
                    {
                        self.expect_assignable(
                            id,
                            &format!("Argument {} of CALL", index),
                            arg_ty,
                            param_ty,
                            report,
                        )?;
                    }
                }
                Ok(())
            }
            ExpressionKind::Return { target, value } => {
                self.expect_same(id, "RETURN", &expr.ty, &builtins.nothing_type(), report)?;
                let Some(return_type) = tree.return_type(*target) else {
                    return Ok(());
                };
                match value.and_then(|value| tree.expression_type(value)) {
                    Some(value_ty) => {
                        self.expect_assignable(id, "RETURN value", value_ty, return_type, report)
                    }
                    None if value.is_none() && !return_type.is_builtin(BuiltinType::Unit) => report(
                        id,
                        &format!(
                            "RETURN without a value from a function returning {}",
                            tree.type_to_string(return_type)
                        ),
                    ),
                    None => Ok(()),
                }
            }
            ExpressionKind::Block { statements } => {
                if expr.ty.is_builtin(BuiltinType::Unit) || expr.ty.is_error() {
                    return Ok(());
                }
                match statements.last().and_then(|last| tree.expression_type(*last)) {
                    Some(last_ty) => self.expect_assignable(id, "BLOCK result", last_ty, &expr.ty, report),
                    None => report(
                        id,
                        &format!(
                            "BLOCK without a result has type {}, expected Unit",
                            tree.type_to_string(&expr.ty)
                        ),
                    ),
                }
            }
            ExpressionKind::When {
                condition,
                then_branch,
                else_branch,
            } => {
                if let Some(condition_ty) = tree.expression_type(*condition) {
                    self.expect_assignable(
                        id,
                        "WHEN condition",
                        condition_ty,
                        &builtins.boolean_type(),
                        report,
                    )?;
                }
                if expr.ty.is_builtin(BuiltinType::Unit) {
                    return Ok(());
                }
                let Some(else_branch) = else_branch else {
                    return report(
                        id,
                        &format!(
                            "WHEN without an else branch has type {}, expected Unit",
                            tree.type_to_string(&expr.ty)
                        ),
                    );
                };
                for branch in [*then_branch, *else_branch] {
                    if let Some(branch_ty) = tree.expression_type(branch) {
                        self.expect_assignable(id, "WHEN branch", branch_ty, &expr.ty, report)?;
                    }
                }
                Ok(())
            }
        }
    }

    fn check_property_links(
        &self,
        id: ElementId,
        decl: &IrDeclaration,
        report: &mut ReportFn<'_>,
    ) -> CheckResult {
        let tree = self.tree;

        match &decl.kind {
            DeclarationKind::Property {
                backing_field,
                getter,
                setter,
                ..
            } => {
                if let Some(getter) = getter {
                    self.check_accessor(id, decl, *getter, "Getter", 0, report)?;
                }
                if let Some(setter) = setter {
                    self.check_accessor(id, decl, *setter, "Setter", 1, report)?;
                }
                if let Some(field) = backing_field {
                    match tree.declaration(*field).map(|field| &field.kind) {
                        Some(DeclarationKind::Field {
                            corresponding_property,
                            ..
                        }) => {
                            if *corresponding_property != Some(id) {
                                report(
                                    id,
                                    &format!(
                                        "Backing field of property `{}` does not point back to it",
                                        decl.name
                                    ),
                                )?;
                            }
                        }
                        _ => report(
                            id,
                            &format!("Backing field of property `{}` is not a field", decl.name),
                        )?,
                    }
                }
                Ok(())
            }
            DeclarationKind::Function {
                corresponding_property: Some(property),
                ..
            } => match tree.declaration(*property).map(|property| &property.kind) {
                Some(DeclarationKind::Property { getter, setter, .. }) => {
                    if *getter != Some(id) && *setter != Some(id) {
                        report(
                            id,
                            &format!(
                                "Accessor `{}` is neither the getter nor the setter of its property",
                                decl.name
                            ),
                        )?;
                    }
                    Ok(())
                }
                _ => report(
                    id,
                    &format!(
                        "Accessor `{}` refers to {} which is not a property",
                        decl.name,
                        tree.render(*property)
                    ),
                ),
            },
            DeclarationKind::Field {
                corresponding_property: Some(property),
                ..
            } => match tree.declaration(*property).map(|property| &property.kind) {
                Some(DeclarationKind::Property { backing_field, .. }) => {
                    if *backing_field != Some(id) {
                        report(
                            id,
                            &format!(
                                "Field `{}` is not the backing field of its property",
                                decl.name
                            ),
                        )?;
                    }
                    Ok(())
                }
                _ => report(
                    id,
                    &format!(
                        "Field `{}` refers to {} which is not a property",
                        decl.name,
                        tree.render(*property)
                    ),
                ),
            },
            _ => Ok(()),
        }
    }

    fn check_accessor(
        &self,
        property: ElementId,
        decl: &IrDeclaration,
        accessor: ElementId,
        role: &str,
        arity: usize,
        report: &mut ReportFn<'_>,
    ) -> CheckResult {
        let Some(accessor_decl) = self.tree.declaration(accessor) else {
            return report(
                property,
                &format!("{} of property `{}` is not a function", role, decl.name),
            );
        };
        let DeclarationKind::Function {
            params,
            corresponding_property,
            ..
        } = &accessor_decl.kind
        else {
            return report(
                property,
                &format!("{} of property `{}` is not a function", role, decl.name),
            );
        };

        if *corresponding_property != Some(property) {
            report(
                property,
                &format!(
                    "{} `{}` of property `{}` does not point back to it",
                    role, accessor_decl.name, decl.name
                ),
            )?;
        }
        if params.len() != arity {
            report(
                property,
                &format!(
                    "{} `{}` of property `{}` takes {} parameter(s), expected {}",
                    role,
                    accessor_decl.name,
                    decl.name,
                    params.len(),
                    arity
                ),
            )?;
        }
        Ok(())
    }
}
