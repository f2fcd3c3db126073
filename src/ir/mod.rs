use std::fmt::{self, Display, Formatter};
use std::ops::Range;

use thiserror::Error;

pub mod builtins;
pub mod render;


pub use builtins::{BuiltinType, IrBuiltIns};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u32);

impl ElementId {
    /// Never handed out by `IrTree::push`, free for use as a placeholder.
    pub const RESERVED: ElementId = ElementId(u32::MAX);

    /// Ids address at most `u32::MAX` elements; larger indices saturate to
    /// `RESERVED`, which no arena element ever carries.
    pub const fn from_index(index: usize) -> Self {
        if index >= u32::MAX as usize {
            ElementId::RESERVED
        } else {
            ElementId(index as u32)
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for ElementId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classifier {
    Builtin(BuiltinType),
    Class(ElementId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum IrType {
    Simple {
        classifier: Classifier,
        nullable: bool,
    },
    Error {
        reason: String,
    },
}

impl IrType {
    pub fn builtin(builtin: BuiltinType) -> Self {
        IrType::Simple {
            classifier: Classifier::Builtin(builtin),
            nullable: false,
        }
    }

    pub fn class(class: ElementId) -> Self {
        IrType::Simple {
            classifier: Classifier::Class(class),
            nullable: false,
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        IrType::Error {
            reason: reason.into(),
        }
    }

    pub fn make_nullable(self) -> Self {
        match self {
            IrType::Simple { classifier, .. } => IrType::Simple {
                classifier,
                nullable: true,
            },
            error => error,
        }
    }

    pub fn make_not_null(self) -> Self {
        match self {
            IrType::Simple { classifier, .. } => IrType::Simple {
                classifier,
                nullable: false,
            },
            error => error,
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, IrType::Simple { nullable: true, .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, IrType::Error { .. })
    }

    pub fn is_builtin(&self, builtin: BuiltinType) -> bool {
        matches!(
            self,
            IrType::Simple { classifier: Classifier::Builtin(b), .. } if *b == builtin
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    Class,
    Function,
    ValueParameter,
    Variable,
    Property,
    Field,
}

impl Display for DescriptorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            DescriptorKind::Class => "class",
            DescriptorKind::Function => "function",
            DescriptorKind::ValueParameter => "value parameter",
            DescriptorKind::Variable => "variable",
            DescriptorKind::Property => "property",
            DescriptorKind::Field => "field",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub name: String,
    pub kind: DescriptorKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Null,
    Bool(bool),
    Char(char),
    Int(i32),
    Long(i64),
    Double(f64),
    String(String),
}

#[derive(Debug, Clone)]
pub struct IrModuleFragment {
    pub name: String,
    pub files: Vec<ElementId>,
}

#[derive(Debug, Clone)]
pub struct IrFile {
    pub name: String,
    pub declarations: Vec<ElementId>,
}

#[derive(Debug, Clone)]
pub struct IrDeclaration {
    pub name: String,
    pub parent: Option<ElementId>,
    pub descriptor: Option<Descriptor>,
    pub kind: DeclarationKind,
}

#[derive(Debug, Clone)]
pub enum DeclarationKind {
    Class {
        members: Vec<ElementId>,
    },
    Function {
        params: Vec<ElementId>,
        return_type: IrType,
        body: Option<ElementId>,
        corresponding_property: Option<ElementId>,
    },
    ValueParameter {
        index: usize,
        ty: IrType,
    },
    Variable {
        ty: IrType,
        mutable: bool,
        initializer: Option<ElementId>,
    },
    Property {
        ty: IrType,
        backing_field: Option<ElementId>,
        getter: Option<ElementId>,
        setter: Option<ElementId>,
    },
    Field {
        ty: IrType,
        initializer: Option<ElementId>,
        corresponding_property: Option<ElementId>,
    },
}

impl DeclarationKind {
    pub fn descriptor_kind(&self) -> DescriptorKind {
        match self {
            DeclarationKind::Class { .. } => DescriptorKind::Class,
            DeclarationKind::Function { .. } => DescriptorKind::Function,
            DeclarationKind::ValueParameter { .. } => DescriptorKind::ValueParameter,
            DeclarationKind::Variable { .. } => DescriptorKind::Variable,
            DeclarationKind::Property { .. } => DescriptorKind::Property,
            DeclarationKind::Field { .. } => DescriptorKind::Field,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IrExpression {
    pub ty: IrType,
    pub kind: ExpressionKind,
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    Const(ConstValue),
    GetValue {
        symbol: ElementId,
    },
    SetValue {
        symbol: ElementId,
        value: ElementId,
    },
    Call {
        callee: ElementId,
        args: Vec<ElementId>,
    },
    Return {
        target: ElementId,
        value: Option<ElementId>,
    },
    Block {
        statements: Vec<ElementId>,
    },
    When {
        condition: ElementId,
        then_branch: ElementId,
        else_branch: Option<ElementId>,
    },
}

#[derive(Debug, Clone)]
pub enum ElementKind {
    Module(IrModuleFragment),
    File(IrFile),
    Declaration(IrDeclaration),
    Expression(IrExpression),
}

impl ElementKind {
    /// Structural children in canonical order. Symbol references (callees,
    /// value symbols, return targets) are not children.
    pub fn children(&self) -> Vec<ElementId> {
        match self {
            ElementKind::Module(module) => module.files.clone(),
            ElementKind::File(file) => file.declarations.clone(),
            ElementKind::Declaration(decl) => match &decl.kind {
                DeclarationKind::Class { members } => members.clone(),
                DeclarationKind::Function { params, body, .. } => {
                    params.iter().copied().chain(*body).collect()
                }
                DeclarationKind::ValueParameter { .. } => vec![],
                DeclarationKind::Variable { initializer, .. }
                | DeclarationKind::Field { initializer, .. } => initializer.iter().copied().collect(),
                DeclarationKind::Property {
                    backing_field,
                    getter,
                    setter,
                    ..
                } => backing_field
                    .iter()
                    .chain(getter.iter())
                    .chain(setter.iter())
                    .copied()
                    .collect(),
            },
            ElementKind::Expression(expr) => match &expr.kind {
                ExpressionKind::Const(_) | ExpressionKind::GetValue { .. } => vec![],
                ExpressionKind::SetValue { value, .. } => vec![*value],
                ExpressionKind::Call { args, .. } => args.clone(),
                ExpressionKind::Return { value, .. } => value.iter().copied().collect(),
                ExpressionKind::Block { statements } => statements.clone(),
                ExpressionKind::When {
                    condition,
                    then_branch,
                    else_branch,
                } => std::iter::once(*condition)
                    .chain(std::iter::once(*then_branch))
                    .chain(*else_branch)
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct IrElement {
    pub kind: ElementKind,
    pub span: Range<usize>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParentError {
    #[error("{0} is not a declaration")]
    NotADeclaration(ElementId),
    #[error("parent of {0} is not initialized")]
    Uninitialized(ElementId),
    #[error("parent of {declaration} points to missing element {parent}")]
    Dangling {
        declaration: ElementId,
        parent: ElementId,
    },
}

#[derive(Debug, Error, PartialEq)]
#[error("the IR arena is full, {0} elements already allocated")]
pub struct ArenaFull(pub usize);

/// Arena holding every element of one IR program.
#[derive(Debug, Default, Clone)]
pub struct IrTree {
    elements: Vec<IrElement>,
    root: Option<ElementId>,
}

impl IrTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: ElementKind, span: Range<usize>) -> Result<ElementId, ArenaFull> {
        let len = self.elements.len();
        let id = u32::try_from(len)
            .ok()
            .filter(|index| *index < u32::MAX)
            .map(ElementId)
            .ok_or(ArenaFull(len))?;
        self.elements.push(IrElement { kind, span });
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn root(&self) -> Option<ElementId> {
        self.root
    }

    pub fn set_root(&mut self, root: ElementId) {
        self.root = Some(root);
    }

    pub fn get(&self, id: ElementId) -> Option<&IrElement> {
        self.elements.get(id.index())
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut IrElement> {
        self.elements.get_mut(id.index())
    }

    pub fn contains(&self, id: ElementId) -> bool {
        id.index() < self.elements.len()
    }

    pub fn children(&self, id: ElementId) -> Vec<ElementId> {
        self.get(id)
            .map(|element| element.kind.children())
            .unwrap_or_default()
    }

    pub fn file(&self, id: ElementId) -> Option<&IrFile> {
        match &self.get(id)?.kind {
            ElementKind::File(file) => Some(file),
            _ => None,
        }
    }

    pub fn declaration(&self, id: ElementId) -> Option<&IrDeclaration> {
        match &self.get(id)?.kind {
            ElementKind::Declaration(decl) => Some(decl),
            _ => None,
        }
    }

    pub fn declaration_mut(&mut self, id: ElementId) -> Option<&mut IrDeclaration> {
        match &mut self.get_mut(id)?.kind {
            ElementKind::Declaration(decl) => Some(decl),
            _ => None,
        }
    }

    pub fn expression(&self, id: ElementId) -> Option<&IrExpression> {
        match &self.get(id)?.kind {
            ElementKind::Expression(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn expression_mut(&mut self, id: ElementId) -> Option<&mut IrExpression> {
        match &mut self.get_mut(id)?.kind {
            ElementKind::Expression(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn is_file(&self, id: ElementId) -> bool {
        self.file(id).is_some()
    }

    /// Files, classes and functions own the declarations nested in them.
    pub fn is_declaration_container(&self, id: ElementId) -> bool {
        match self.get(id).map(|element| &element.kind) {
            Some(ElementKind::File(_)) => true,
            Some(ElementKind::Declaration(decl)) => matches!(
                decl.kind,
                DeclarationKind::Class { .. } | DeclarationKind::Function { .. }
            ),
            _ => false,
        }
    }

    /// Reads the parent a declaration has stored for itself.
    pub fn parent_of(&self, id: ElementId) -> Result<ElementId, ParentError> {
        let decl = self
            .declaration(id)
            .ok_or(ParentError::NotADeclaration(id))?;
        let parent = decl.parent.ok_or(ParentError::Uninitialized(id))?;
        if !self.contains(parent) {
            return Err(ParentError::Dangling {
                declaration: id,
                parent,
            });
        }
        Ok(parent)
    }

    pub fn set_parent(&mut self, id: ElementId, parent: Option<ElementId>) -> Result<(), ParentError> {
        let decl = self
            .declaration_mut(id)
            .ok_or(ParentError::NotADeclaration(id))?;
        decl.parent = parent;
        Ok(())
    }

    /// Declared type of a value-like declaration.
    pub fn value_type(&self, id: ElementId) -> Option<&IrType> {
        match &self.declaration(id)?.kind {
            DeclarationKind::ValueParameter { ty, .. }
            | DeclarationKind::Variable { ty, .. }
            | DeclarationKind::Field { ty, .. }
            | DeclarationKind::Property { ty, .. } => Some(ty),
            _ => None,
        }
    }

    pub fn is_value_declaration(&self, id: ElementId) -> bool {
        matches!(
            self.declaration(id).map(|decl| &decl.kind),
            Some(DeclarationKind::ValueParameter { .. } | DeclarationKind::Variable { .. })
        )
    }

    pub fn is_function(&self, id: ElementId) -> bool {
        matches!(
            self.declaration(id).map(|decl| &decl.kind),
            Some(DeclarationKind::Function { .. })
        )
    }

    pub fn is_class(&self, id: ElementId) -> bool {
        matches!(
            self.declaration(id).map(|decl| &decl.kind),
            Some(DeclarationKind::Class { .. })
        )
    }

    pub fn return_type(&self, id: ElementId) -> Option<&IrType> {
        match &self.declaration(id)?.kind {
            DeclarationKind::Function { return_type, .. } => Some(return_type),
            _ => None,
        }
    }

    pub fn expression_type(&self, id: ElementId) -> Option<&IrType> {
        self.expression(id).map(|expr| &expr.ty)
    }

    pub fn name_of(&self, id: ElementId) -> Option<&str> {
        match &self.get(id)?.kind {
            ElementKind::Module(module) => Some(&module.name),
            ElementKind::File(file) => Some(&file.name),
            ElementKind::Declaration(decl) => Some(&decl.name),
            ElementKind::Expression(_) => None,
        }
    }

    /// Appends `child` to the structural child list that `parent` exposes
    /// for its kind (files, declarations, members or statements).
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) -> bool {
        let Some(element) = self.get_mut(parent) else {
            return false;
        };
        match &mut element.kind {
            ElementKind::Module(module) => module.files.push(child),
            ElementKind::File(file) => file.declarations.push(child),
            ElementKind::Declaration(IrDeclaration {
                kind: DeclarationKind::Class { members },
                ..
            }) => members.push(child),
            ElementKind::Expression(IrExpression {
                kind: ExpressionKind::Block { statements },
                ..
            }) => statements.push(child),
            _ => return false,
        }
        true
    }
}
