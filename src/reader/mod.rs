pub mod declaration;
pub mod expression;

#[cfg(test)]
pub mod test;

use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use log::{debug, error};
use logos::{Logos, SpannedIter};

use std::collections::{HashMap, HashSet};
use std::iter::Peekable;
use std::ops::Range;

use crate::ir::{
    Descriptor, DeclarationKind, ElementId, ElementKind, ExpressionKind, IrBuiltIns, IrDeclaration,
    IrExpression, IrFile, IrModuleFragment, IrTree, IrType,
};
use crate::lexer::Token;

type TokenIter<'a> = Peekable<SpannedIter<'a, Token>>;

/// Placeholder symbol for references resolved once the whole module is read.
const UNRESOLVED: ElementId = ElementId::RESERVED;

#[derive(Debug, Clone, Copy, PartialEq)]
enum PendingKind {
    Value,
    Function,
}

#[derive(Debug)]
struct Pending {
    element: ElementId,
    name: String,
    span: Range<usize>,
    kind: PendingKind,
}

/// Reads the textual IR format into an `IrTree`, assigning parents and
/// resolving references the way a frontend would.
pub struct Reader<'a> {
    tokens: TokenIter<'a>,
    file: String,
    source_len: usize,
    last_end: usize,
    errors: Vec<Report<'static, (String, Range<usize>)>>,
    tree: IrTree,
    builtins: &'static IrBuiltIns,
    containers: Vec<ElementId>,
    scopes: Vec<Vec<(String, ElementId)>>,
    functions: Vec<ElementId>,
    classes: HashMap<String, ElementId>,
    function_names: HashMap<String, ElementId>,
    values: HashMap<String, Vec<ElementId>>,
    pending: Vec<Pending>,
    overridden: HashSet<ElementId>,
}

impl<'a> Reader<'a> {
    pub fn new(source: &'a str, file: impl Into<String>) -> Self {
        Reader {
            tokens: Token::lexer(source).spanned().peekable(),
            file: file.into(),
            source_len: source.len(),
            last_end: 0,
            errors: vec![],
            tree: IrTree::new(),
            builtins: IrBuiltIns::standard(),
            containers: vec![],
            scopes: vec![],
            functions: vec![],
            classes: HashMap::new(),
            function_names: HashMap::new(),
            values: HashMap::new(),
            pending: vec![],
            overridden: HashSet::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn report_errors(&self, source: &str) -> bool {
        let source = Source::from(source.to_string());

        for report in &self.errors {
            if let Err(err) = report.eprint((self.file.clone(), source.clone())) {
                error!("failed to print reader error: {}", err);
            }
        }
        self.has_errors()
    }

    /// `module "name"`? followed by one or more `file "name" declaration*`.
    pub fn read_module(&mut self) -> IrTree {
        let name = if self.at(Token::KeywordModule) {
            self.next_token();
            self.expect_string("module name").unwrap_or_else(|| "main".to_string())
        } else {
            "main".to_string()
        };

        let Some(module) = self.alloc(
            ElementKind::Module(IrModuleFragment {
                name,
                files: vec![],
            }),
            0..self.source_len,
        ) else {
            return std::mem::take(&mut self.tree);
        };
        self.tree.set_root(module);

        while let Some(token) = self.peek_token().cloned() {
            match token {
                Token::KeywordFile => {
                    if let Some(file) = self.read_file() {
                        self.tree.append_child(module, file);
                    }
                }
                _ => {
                    if let Some((token, span)) = self.next_token() {
                        self.error(
                            span,
                            "expected `file`",
                            format!("found {:?} outside of any file", token),
                        );
                    }
                }
            }
        }

        self.resolve_pending();
        self.recompute_derived_types();
        debug!("read {} IR elements from {}", self.tree.len(), self.file);
        std::mem::take(&mut self.tree)
    }

    fn read_file(&mut self) -> Option<ElementId> {
        let (_, span_file) = self.next_token()?;
        let name = self.expect_string("file name")?;
        let file = self.alloc(
            ElementKind::File(IrFile {
                name,
                declarations: vec![],
            }),
            span_file.clone(),
        )?;

        self.nested(Some(file), |reader| {
            loop {
                match reader.peek_token().cloned() {
                    None | Some(Token::KeywordFile) => break,
                    _ => match reader.read_declaration() {
                        Some(declaration) => {
                            reader.tree.append_child(file, declaration);
                        }
                        None => reader.recover(),
                    },
                }
            }
            Some(())
        });

        let end = self.last_end;
        if let Some(element) = self.tree.get_mut(file) {
            element.span = span_file.start..end;
        }
        Some(file)
    }

    /// Skips to the next token that can start a top-level declaration.
    fn recover(&mut self) {
        while let Some(token) = self.peek_token() {
            if matches!(
                token,
                Token::KeywordFile
                    | Token::KeywordFun
                    | Token::KeywordClass
                    | Token::KeywordVal
                    | Token::KeywordVar
                    | Token::KeywordProp
            ) {
                break;
            }
            self.next_token();
        }
    }

    /// Runs `f` inside a new lexical scope, with `container` as the parent
    /// of declarations created meanwhile.
    fn nested<T>(
        &mut self,
        container: Option<ElementId>,
        f: impl FnOnce(&mut Self) -> Option<T>,
    ) -> Option<T> {
        if let Some(container) = container {
            self.containers.push(container);
        }
        self.scopes.push(vec![]);
        let result = f(self);
        self.scopes.pop();
        if container.is_some() {
            self.containers.pop();
        }
        result
    }

    fn alloc(&mut self, kind: ElementKind, span: Range<usize>) -> Option<ElementId> {
        match self.tree.push(kind, span.clone()) {
            Ok(id) => Some(id),
            Err(err) => {
                self.error(span, "program too large", err);
                None
            }
        }
    }

    fn declare(&mut self, name: String, kind: DeclarationKind, span: Range<usize>) -> Option<ElementId> {
        let descriptor = Descriptor {
            name: name.clone(),
            kind: kind.descriptor_kind(),
        };
        self.alloc(
            ElementKind::Declaration(IrDeclaration {
                name,
                parent: self.containers.last().copied(),
                descriptor: Some(descriptor),
                kind,
            }),
            span,
        )
    }

    fn declaration_kind_mut(&mut self, id: ElementId) -> Option<&mut DeclarationKind> {
        self.tree.declaration_mut(id).map(|decl| &mut decl.kind)
    }

    fn bind(&mut self, name: String, value: ElementId) {
        self.values.entry(name.clone()).or_default().push(value);
        if let Some(scope) = self.scopes.last_mut() {
            scope.push((name, value));
        }
    }

    fn lookup_value(&self, name: &str) -> Option<ElementId> {
        self.scopes.iter().rev().find_map(|scope| {
            scope
                .iter()
                .rev()
                .find(|(bound, _)| bound == name)
                .map(|(_, id)| *id)
        })
    }

    fn push_expression(&mut self, ty: IrType, kind: ExpressionKind, span: Range<usize>) -> Option<ElementId> {
        self.alloc(ElementKind::Expression(IrExpression { ty, kind }), span)
    }

    fn resolve_pending(&mut self) {
        for pending in std::mem::take(&mut self.pending) {
            let resolved = match pending.kind {
                PendingKind::Value => self
                    .values
                    .get(&pending.name)
                    .and_then(|candidates| candidates.first().copied()),
                PendingKind::Function => self.function_names.get(&pending.name).copied(),
            };
            let Some(symbol) = resolved else {
                let what = match pending.kind {
                    PendingKind::Value => "value",
                    PendingKind::Function => "function",
                };
                self.error(
                    pending.span,
                    format!("unresolved {} `{}`", what, pending.name),
                    format!("no {} named `{}` in this module", what, pending.name),
                );
                continue;
            };

            let ty = match pending.kind {
                PendingKind::Value => self.tree.value_type(symbol).cloned(),
                PendingKind::Function => self.tree.return_type(symbol).cloned(),
            };
            let keep_type = self.overridden.contains(&pending.element);
            let Some(expr) = self.tree.expression_mut(pending.element) else {
                continue;
            };
            let typed_by_symbol = match &mut expr.kind {
                ExpressionKind::GetValue { symbol: slot } => {
                    *slot = symbol;
                    true
                }
                ExpressionKind::SetValue { symbol: slot, .. } => {
                    *slot = symbol;
                    false
                }
                ExpressionKind::Call { callee, .. } => {
                    *callee = symbol;
                    true
                }
                _ => false,
            };
            if typed_by_symbol && !keep_type {
                if let Some(ty) = ty {
                    expr.ty = ty;
                }
            }
        }
    }

    /// Blocks and whens take their type from their children. Children are
    /// always read before their parent, so one pass in id order suffices.
    fn recompute_derived_types(&mut self) {
        for index in 0..self.tree.len() {
            let id = ElementId::from_index(index);
            if self.overridden.contains(&id) {
                continue;
            }
            let Some(ty) = self.derived_type(id) else {
                continue;
            };
            if let Some(expr) = self.tree.expression_mut(id) {
                expr.ty = ty;
            }
        }
    }

    fn derived_type(&self, id: ElementId) -> Option<IrType> {
        let unit = self.builtins.unit_type();
        match &self.tree.expression(id)?.kind {
            ExpressionKind::Block { statements } => Some(
                statements
                    .last()
                    .and_then(|last| self.tree.expression_type(*last))
                    .cloned()
                    .unwrap_or(unit),
            ),
            ExpressionKind::When {
                then_branch,
                else_branch: Some(else_branch),
                ..
            } => {
                let then_ty = self.tree.expression_type(*then_branch)?;
                let else_ty = self.tree.expression_type(*else_branch)?;
                Some(self.common_supertype(then_ty, else_ty))
            }
            ExpressionKind::When { .. } => Some(unit),
            _ => None,
        }
    }

    /// The wider of two branch types, or `Any` when neither contains the
    /// other. Nullable if either branch is.
    fn common_supertype(&self, left: &IrType, right: &IrType) -> IrType {
        let nullable = left.is_nullable() || right.is_nullable();
        let left = left.clone().make_not_null();
        let right = right.clone().make_not_null();

        let ty = if self.builtins.is_subtype_of(&right, &left) {
            left
        } else if self.builtins.is_subtype_of(&left, &right) {
            right
        } else {
            self.builtins.any_type()
        };
        if nullable { ty.make_nullable() } else { ty }
    }

    fn next_token(&mut self) -> Option<(Token, Range<usize>)> {
        loop {
            let (token, span) = self.tokens.next()?;
            self.last_end = span.end;
            match token {
                Ok(token) => return Some((token, span)),
                Err(_) => self.error(span, "unexpected character", "this is not a valid token"),
            }
        }
    }

    fn peek_token(&mut self) -> Option<&Token> {
        loop {
            let invalid = match self.tokens.peek() {
                Some((Err(_), span)) => Some(span.clone()),
                _ => None,
            };
            match invalid {
                Some(span) => {
                    self.tokens.next();
                    self.error(span, "unexpected character", "this is not a valid token");
                }
                None => break,
            }
        }
        self.tokens.peek().and_then(|(token, _)| token.as_ref().ok())
    }

    fn at(&mut self, token: Token) -> bool {
        self.peek_token() == Some(&token)
    }

    fn expect(&mut self, expected: Token, what: &str) -> Option<Range<usize>> {
        match self.next_token() {
            Some((token, span)) if token == expected => Some(span),
            Some((token, span)) => {
                self.error(span, format!("expected {}", what), format!("found {:?}", token));
                None
            }
            None => {
                self.error_eof(format!("expected {} but reached end of file", what));
                None
            }
        }
    }

    fn expect_ident(&mut self, what: &str) -> Option<(String, Range<usize>)> {
        match self.next_token() {
            Some((Token::Ident(name), span)) => Some((name, span)),
            Some((token, span)) => {
                self.error(span, format!("expected {}", what), format!("found {:?}", token));
                None
            }
            None => {
                self.error_eof(format!("expected {} but reached end of file", what));
                None
            }
        }
    }

    fn expect_string(&mut self, what: &str) -> Option<String> {
        match self.next_token() {
            Some((Token::String(value), _)) => Some(value),
            Some((token, span)) => {
                self.error(span, format!("expected {}", what), format!("found {:?}", token));
                None
            }
            None => {
                self.error_eof(format!("expected {} but reached end of file", what));
                None
            }
        }
    }

    fn error(&mut self, span: Range<usize>, message: impl ToString, label: impl ToString) {
        self.push_report(span, message.to_string(), label.to_string(), None);
    }

    fn error_with_note(
        &mut self,
        span: Range<usize>,
        message: impl ToString,
        label: impl ToString,
        note: String,
    ) {
        self.push_report(span, message.to_string(), label.to_string(), Some(note));
    }

    fn push_report(&mut self, span: Range<usize>, message: String, label: String, note: Option<String>) {
        let mut report = Report::build(ReportKind::Error, (self.file.clone(), span.clone()))
            .with_code("READ")
            .with_label(
                Label::new((self.file.clone(), span))
                    .with_message(label)
                    .with_color(ColorGenerator::new().next()),
            )
            .with_message(message);
        if let Some(note) = note {
            report = report.with_note(note);
        }
        self.errors.push(report.finish());
    }

    fn error_eof(&mut self, message: impl ToString) {
        let end = self.source_len..self.source_len;
        self.error(end, message, "file ends here");
    }
}
