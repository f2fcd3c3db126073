use std::collections::HashSet;

use crate::ir::{
    Classifier, ConstValue, DeclarationKind, ElementId, ElementKind, ExpressionKind, IrTree, IrType,
};

impl IrTree {
    pub fn type_to_string(&self, ty: &IrType) -> String {
        match ty {
            IrType::Simple {
                classifier,
                nullable,
            } => {
                let name = match classifier {
                    Classifier::Builtin(builtin) => builtin.name().to_string(),
                    Classifier::Class(class) => match self.name_of(*class) {
                        Some(name) => name.to_string(),
                        None => format!("<class {}>", class),
                    },
                };
                if *nullable { format!("{}?", name) } else { name }
            }
            IrType::Error { reason } => format!("<error: {}>", reason),
        }
    }

    fn symbol_name(&self, id: ElementId) -> String {
        match self.name_of(id) {
            Some(name) => name.to_string(),
            None => format!("<unbound {}>", id),
        }
    }

    /// One-line description of an element, used in diagnostics.
    pub fn render(&self, id: ElementId) -> String {
        let Some(element) = self.get(id) else {
            return format!("<missing element {}>", id);
        };

        match &element.kind {
            ElementKind::Module(module) => format!("MODULE_FRAGMENT name:{}", module.name),
            ElementKind::File(file) => format!("FILE fileName:{}", file.name),
            ElementKind::Declaration(decl) => match &decl.kind {
                DeclarationKind::Class { .. } => format!("CLASS name:{}", decl.name),
                DeclarationKind::Function { return_type, .. } => format!(
                    "FUN name:{} returnType:{}",
                    decl.name,
                    self.type_to_string(return_type)
                ),
                DeclarationKind::ValueParameter { index, ty } => format!(
                    "VALUE_PARAMETER name:{} index:{} type:{}",
                    decl.name,
                    index,
                    self.type_to_string(ty)
                ),
                DeclarationKind::Variable { ty, mutable, .. } => format!(
                    "VAR name:{} type:{} [{}]",
                    decl.name,
                    self.type_to_string(ty),
                    if *mutable { "var" } else { "val" }
                ),
                DeclarationKind::Property { ty, .. } => {
                    format!("PROPERTY name:{} type:{}", decl.name, self.type_to_string(ty))
                }
                DeclarationKind::Field { ty, .. } => {
                    format!("FIELD name:{} type:{}", decl.name, self.type_to_string(ty))
                }
            },
            ElementKind::Expression(expr) => {
                let ty = self.type_to_string(&expr.ty);
                match &expr.kind {
                    ExpressionKind::Const(value) => {
                        let value = match value {
                            ConstValue::Null => "null".to_string(),
                            ConstValue::Bool(b) => b.to_string(),
                            ConstValue::Char(c) => format!("'{}'", c),
                            ConstValue::Int(i) => i.to_string(),
                            ConstValue::Long(l) => format!("{}L", l),
                            ConstValue::Double(d) => d.to_string(),
                            ConstValue::String(s) => format!("\"{}\"", s.escape_default()),
                        };
                        format!("CONST type={} value={}", ty, value)
                    }
                    ExpressionKind::GetValue { symbol } => {
                        format!("GET_VAR '{}' type={}", self.symbol_name(*symbol), ty)
                    }
                    ExpressionKind::SetValue { symbol, .. } => {
                        format!("SET_VAR '{}' type={}", self.symbol_name(*symbol), ty)
                    }
                    ExpressionKind::Call { callee, .. } => {
                        format!("CALL '{}' type={}", self.symbol_name(*callee), ty)
                    }
                    ExpressionKind::Return { target, .. } => {
                        format!("RETURN type={} from='{}'", ty, self.symbol_name(*target))
                    }
                    ExpressionKind::Block { .. } => format!("BLOCK type={}", ty),
                    ExpressionKind::When { .. } => format!("WHEN type={}", ty),
                }
            }
        }
    }

    /// Kind and id, e.g. `FUN@#3`.
    pub fn short(&self, id: ElementId) -> String {
        let label = match self.get(id).map(|element| &element.kind) {
            None => "MISSING",
            Some(ElementKind::Module(_)) => "MODULE_FRAGMENT",
            Some(ElementKind::File(_)) => "FILE",
            Some(ElementKind::Declaration(decl)) => match decl.kind {
                DeclarationKind::Class { .. } => "CLASS",
                DeclarationKind::Function { .. } => "FUN",
                DeclarationKind::ValueParameter { .. } => "VALUE_PARAMETER",
                DeclarationKind::Variable { .. } => "VAR",
                DeclarationKind::Property { .. } => "PROPERTY",
                DeclarationKind::Field { .. } => "FIELD",
            },
            Some(ElementKind::Expression(expr)) => match expr.kind {
                ExpressionKind::Const(_) => "CONST",
                ExpressionKind::GetValue { .. } => "GET_VAR",
                ExpressionKind::SetValue { .. } => "SET_VAR",
                ExpressionKind::Call { .. } => "CALL",
                ExpressionKind::Return { .. } => "RETURN",
                ExpressionKind::Block { .. } => "BLOCK",
                ExpressionKind::When { .. } => "WHEN",
            },
        };
        format!("{}@{}", label, id)
    }

    /// Indented rendering of the subtree rooted at `id`. An element that is
    /// its own ancestor is printed once more but not expanded again.
    pub fn dump(&self, id: ElementId) -> String {
        let mut out = String::new();
        let mut stack = vec![(id, 0usize)];
        let mut path: Vec<ElementId> = vec![];
        let mut on_path: HashSet<ElementId> = HashSet::new();

        while let Some((current, depth)) = stack.pop() {
            if path.len() > depth {
                for left in path.drain(depth..) {
                    on_path.remove(&left);
                }
            }
            out.push_str(&"  ".repeat(depth));
            out.push_str(&self.render(current));
            out.push('\n');
            if !on_path.insert(current) {
                continue;
            }
            path.push(current);
            for child in self.children(current).into_iter().rev() {
                stack.push((child, depth + 1));
            }
        }

        out
    }
}
