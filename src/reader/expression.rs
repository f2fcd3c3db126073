use std::ops::Range;

use crate::ir::{ConstValue, ElementId, ExpressionKind, IrType};
use crate::lexer::Token;
use crate::reader::{Pending, PendingKind, Reader, UNRESOLVED};

impl Reader<'_> {
    /// A primary expression, optionally followed by `: Type` which forces the
    /// type recorded on the element.
    pub fn read_expression(&mut self) -> Option<ElementId> {
        let expr = self.read_primary()?;

        if self.at(Token::Colon) {
            self.next_token();
            let ty = self.read_type()?;
            if let Some(expression) = self.tree.expression_mut(expr) {
                expression.ty = ty;
            }
            self.overridden.insert(expr);
        }
        Some(expr)
    }

    fn read_primary(&mut self) -> Option<ElementId> {
        let Some((token, span)) = self.next_token() else {
            self.error_eof("expected an expression but reached end of file");
            return None;
        };

        let builtins = self.builtins;
        match token {
            Token::Int(value) => self.constant(ConstValue::Int(value), builtins.int_type(), span),
            Token::Long(value) => self.constant(ConstValue::Long(value), builtins.long_type(), span),
            Token::Double(value) => self.constant(ConstValue::Double(value), builtins.double_type(), span),
            Token::Bool(value) => self.constant(ConstValue::Bool(value), builtins.boolean_type(), span),
            Token::Char(value) => self.constant(ConstValue::Char(value), builtins.char_type(), span),
            Token::String(value) => self.constant(ConstValue::String(value), builtins.string_type(), span),
            Token::KeywordNull => self.constant(
                ConstValue::Null,
                builtins.nothing_type().make_nullable(),
                span,
            ),
            Token::KeywordGet => self.read_get(span),
            Token::KeywordSet => self.read_set(span),
            Token::KeywordCall => self.read_call(span),
            Token::KeywordReturn => self.read_return(span),
            Token::KeywordIf => self.read_if(span),
            Token::LBrace => self.read_block_body(span),
            other => {
                self.error(
                    span,
                    "expected an expression",
                    format!("found {:?}, which cannot start an expression", other),
                );
                None
            }
        }
    }

    fn constant(&mut self, value: ConstValue, ty: IrType, span: Range<usize>) -> Option<ElementId> {
        self.push_expression(ty, ExpressionKind::Const(value), span)
    }

    /// Looks `name` up in the enclosing scopes. Misses are queued and resolved
    /// against every value of the module once reading is done.
    fn reference_value(&mut self, element: ElementId, name: String, span: Range<usize>) {
        if let Some(symbol) = self.lookup_value(&name) {
            self.bind_reference(element, symbol);
        } else {
            self.pending.push(Pending {
                element,
                name,
                span,
                kind: PendingKind::Value,
            });
        }
    }

    fn bind_reference(&mut self, element: ElementId, symbol: ElementId) {
        let ty = self.tree.value_type(symbol).cloned();
        let Some(expr) = self.tree.expression_mut(element) else {
            return;
        };
        match &mut expr.kind {
            ExpressionKind::GetValue { symbol: slot } => {
                *slot = symbol;
                if let Some(ty) = ty {
                    expr.ty = ty;
                }
            }
            ExpressionKind::SetValue { symbol: slot, .. } => *slot = symbol,
            _ => {}
        }
    }

    fn read_get(&mut self, span: Range<usize>) -> Option<ElementId> {
        let (name, span_name) = self.expect_ident("value name after `get`")?;
        let span = span.start..span_name.end;
        let get = self.push_expression(
            IrType::error(format!("unresolved value `{}`", name)),
            ExpressionKind::GetValue { symbol: UNRESOLVED },
            span.clone(),
        )?;
        self.reference_value(get, name, span);
        Some(get)
    }

    fn read_set(&mut self, span: Range<usize>) -> Option<ElementId> {
        let (name, span_name) = self.expect_ident("value name after `set`")?;
        self.expect(Token::Assign, "`=` after assigned name")?;
        let value = self.read_expression()?;

        let set = self.push_expression(
            self.builtins.unit_type(),
            ExpressionKind::SetValue {
                symbol: UNRESOLVED,
                value,
            },
            span.start..self.last_end,
        )?;
        self.reference_value(set, name, span.start..span_name.end);
        Some(set)
    }

    fn read_call(&mut self, span: Range<usize>) -> Option<ElementId> {
        let (name, span_name) = self.expect_ident("function name after `call`")?;
        self.expect(Token::LParen, "`(` after function name")?;

        let mut args = vec![];
        loop {
            match self.peek_token().cloned() {
                Some(Token::RParen) => {
                    self.next_token();
                    break;
                }
                Some(Token::Comma) if !args.is_empty() => {
                    self.next_token();
                }
                _ => args.push(self.read_expression()?),
            }
        }

        let callee = self.function_names.get(&name).copied();
        let ty = callee
            .and_then(|callee| self.tree.return_type(callee).cloned())
            .unwrap_or_else(|| IrType::error(format!("unresolved function `{}`", name)));
        let call = self.push_expression(
            ty,
            ExpressionKind::Call {
                callee: callee.unwrap_or(UNRESOLVED),
                args,
            },
            span.start..self.last_end,
        )?;

        // functions may be called before they are declared
        if callee.is_none() {
            self.pending.push(Pending {
                element: call,
                name,
                span: span.start..span_name.end,
                kind: PendingKind::Function,
            });
        }
        Some(call)
    }

    fn read_return(&mut self, span: Range<usize>) -> Option<ElementId> {
        let Some(target) = self.functions.last().copied() else {
            self.error(span, "`return` outside of a function", "nothing to return from here");
            return None;
        };

        let has_value = self.peek_token().is_some_and(Token::starts_expression);
        let value = if has_value {
            Some(self.read_expression()?)
        } else {
            None
        };
        self.push_expression(
            self.builtins.nothing_type(),
            ExpressionKind::Return { target, value },
            span.start..self.last_end,
        )
    }

    fn read_if(&mut self, span: Range<usize>) -> Option<ElementId> {
        let condition = self.read_expression()?;
        let then_branch = self.read_block()?;
        let else_branch = if self.at(Token::KeywordElse) {
            self.next_token();
            Some(self.read_block()?)
        } else {
            None
        };

        // typed once every reference is resolved
        self.push_expression(
            self.builtins.unit_type(),
            ExpressionKind::When {
                condition,
                then_branch,
                else_branch,
            },
            span.start..self.last_end,
        )
    }

    pub fn read_block(&mut self) -> Option<ElementId> {
        let open = self.expect(Token::LBrace, "`{`")?;
        self.read_block_body(open)
    }

    /// Statements up to the closing brace; `open` is the span of `{`.
    fn read_block_body(&mut self, open: Range<usize>) -> Option<ElementId> {
        let statements = self.nested(None, |reader| {
            let mut statements = vec![];
            loop {
                match reader.peek_token().cloned() {
                    Some(Token::RBrace) => {
                        reader.next_token();
                        break Some(statements);
                    }
                    Some(
                        Token::KeywordVal | Token::KeywordVar | Token::KeywordFun | Token::KeywordClass,
                    ) => statements.push(reader.read_declaration()?),
                    Some(_) => statements.push(reader.read_expression()?),
                    None => {
                        reader.error_eof("reached end of file inside a block");
                        break None;
                    }
                }
            }
        })?;

        self.push_expression(
            self.builtins.unit_type(),
            ExpressionKind::Block { statements },
            open.start..self.last_end,
        )
    }
}
