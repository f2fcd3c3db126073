use ariadne::{Color, Fmt};

use std::ops::Range;

use crate::ir::{DeclarationKind, ElementId, IrType};
use crate::lexer::Token;
use crate::reader::Reader;

pub fn function_syntax() -> String {
    format!(
        "\
        The syntax for declaring a function is:
            {} name({}: {}, ...): return_type {{ statements }}
        ",
        Fmt::fg("fun", Color::Yellow),
        Fmt::fg("arg", Color::Rgb(150, 200, 100)),
        Fmt::fg("Type", Color::Rgb(205, 150, 100)),
    )
}

pub fn property_syntax() -> String {
    format!(
        "\
        The syntax for declaring a property is:
            {} name: Type {{ {} = initializer  {} {{ ... }}  {} {{ ... }} }}
        ",
        Fmt::fg("prop", Color::Yellow),
        Fmt::fg("field", Color::Yellow),
        Fmt::fg("get", Color::Yellow),
        Fmt::fg("set", Color::Yellow),
    )
}

impl Reader<'_> {
    pub fn read_declaration(&mut self) -> Option<ElementId> {
        match self.peek_token().cloned() {
            Some(Token::KeywordFun) => self.read_function(),
            Some(Token::KeywordClass) => self.read_class(),
            Some(Token::KeywordVal | Token::KeywordVar) => self.read_variable(),
            Some(Token::KeywordProp) => self.read_property(),
            Some(_) => {
                let (token, span) = self.next_token()?;
                self.error(
                    span,
                    "expected a declaration",
                    format!("found {:?}, expected `fun`, `class`, `val`, `var` or `prop`", token),
                );
                None
            }
            None => {
                self.error_eof("expected a declaration but reached end of file");
                None
            }
        }
    }

    fn read_class(&mut self) -> Option<ElementId> {
        let (_, span_class) = self.next_token()?;
        let (name, span_name) = self.expect_ident("class name")?;
        let class = self.declare(
            name.clone(),
            DeclarationKind::Class { members: vec![] },
            span_class.start..span_name.end,
        )?;
        self.classes.insert(name, class);
        self.expect(Token::LBrace, "`{` after class name")?;

        self.nested(Some(class), |reader| loop {
            match reader.peek_token().cloned() {
                Some(Token::RBrace) => {
                    reader.next_token();
                    break Some(class);
                }
                None => {
                    reader.error_eof("reached end of file inside a class body");
                    break None;
                }
                _ => {
                    let member = reader.read_declaration()?;
                    reader.tree.append_child(class, member);
                }
            }
        })
    }

    fn read_function(&mut self) -> Option<ElementId> {
        let (_, span_fun) = self.next_token()?;
        let Some((name, span_name)) = self.expect_ident("function name") else {
            self.error_with_note(
                span_fun.clone(),
                "malformed function declaration",
                "a name must follow `fun`",
                function_syntax(),
            );
            return None;
        };

        let function = self.declare(
            name.clone(),
            DeclarationKind::Function {
                params: vec![],
                return_type: self.builtins.unit_type(),
                body: None,
                corresponding_property: None,
            },
            span_fun.start..span_name.end,
        )?;
        self.function_names.entry(name).or_insert(function);

        self.nested(Some(function), |reader| {
            reader.expect(Token::LParen, "`(` after function name")?;
            let mut params = vec![];
            loop {
                match reader.peek_token().cloned() {
                    Some(Token::RParen) => {
                        reader.next_token();
                        break;
                    }
                    Some(Token::Comma) if !params.is_empty() => {
                        reader.next_token();
                    }
                    _ => params.push(reader.read_value_parameter(params.len())?),
                }
            }

            let return_type = if reader.at(Token::Colon) {
                reader.next_token();
                reader.read_type()?
            } else {
                reader.builtins.unit_type()
            };
            if let Some(DeclarationKind::Function {
                params: slot,
                return_type: ty,
                ..
            }) = reader.declaration_kind_mut(function)
            {
                *slot = params;
                *ty = return_type;
            }

            reader.read_function_body(function)
        })?;

        Some(function)
    }

    /// Reads an optional `{ ... }` body with `function` as the return target.
    fn read_function_body(&mut self, function: ElementId) -> Option<()> {
        self.functions.push(function);
        let body = if self.at(Token::LBrace) {
            self.read_block().map(Some)
        } else {
            Some(None)
        };
        self.functions.pop();

        let body = body?;
        if let Some(DeclarationKind::Function { body: slot, .. }) = self.declaration_kind_mut(function) {
            *slot = body;
        }
        Some(())
    }

    fn read_value_parameter(&mut self, index: usize) -> Option<ElementId> {
        let (name, span) = self.expect_ident("parameter name")?;
        self.expect(Token::Colon, "`:` after parameter name")?;
        let ty = self.read_type()?;
        let param = self.declare(name.clone(), DeclarationKind::ValueParameter { index, ty }, span)?;
        self.bind(name, param);
        Some(param)
    }

    /// A builtin or previously declared class name, optionally followed by `?`.
    /// Unknown names produce an error type rather than a read error so the
    /// validator can report them.
    pub(crate) fn read_type(&mut self) -> Option<IrType> {
        let (name, _) = self.expect_ident("type name")?;
        let ty = match self.builtins.lookup(&name) {
            Some(builtin) => IrType::builtin(builtin),
            None => match self.classes.get(&name) {
                Some(class) => IrType::class(*class),
                None => IrType::error(format!("unresolved type `{}`", name)),
            },
        };

        if self.at(Token::Question) {
            self.next_token();
            return Some(ty.make_nullable());
        }
        Some(ty)
    }

    fn read_variable(&mut self) -> Option<ElementId> {
        let (keyword, span_keyword) = self.next_token()?;
        let mutable = keyword == Token::KeywordVar;
        let (name, span_name) = self.expect_ident("variable name")?;
        self.expect(Token::Colon, "`:` after variable name")?;
        let ty = self.read_type()?;

        let variable = self.declare(
            name.clone(),
            DeclarationKind::Variable {
                ty,
                mutable,
                initializer: None,
            },
            span_keyword.start..span_name.end,
        )?;

        if self.at(Token::Assign) {
            self.next_token();
            let value = self.read_expression()?;
            if let Some(DeclarationKind::Variable { initializer, .. }) = self.declaration_kind_mut(variable) {
                *initializer = Some(value);
            }
        }

        // visible only after its own initializer
        self.bind(name, variable);
        Some(variable)
    }

    fn read_property(&mut self) -> Option<ElementId> {
        let (_, span_prop) = self.next_token()?;
        let (name, span_name) = self.expect_ident("property name")?;
        self.expect(Token::Colon, "`:` after property name")?;
        let ty = self.read_type()?;

        let property = self.declare(
            name.clone(),
            DeclarationKind::Property {
                ty: ty.clone(),
                backing_field: None,
                getter: None,
                setter: None,
            },
            span_prop.start..span_name.end,
        )?;

        if self.at(Token::LBrace) {
            self.next_token();
        } else {
            return Some(property);
        }

        loop {
            match self.next_token() {
                Some((Token::RBrace, _)) => break,
                Some((Token::KeywordField, span)) => {
                    let field = self.read_backing_field(property, &name, &ty, span)?;
                    if let Some(DeclarationKind::Property { backing_field, .. }) =
                        self.declaration_kind_mut(property)
                    {
                        *backing_field = Some(field);
                    }
                }
                Some((Token::KeywordGet, span)) => {
                    let getter =
                        self.read_accessor(property, format!("<get-{}>", name), ty.clone(), None, span)?;
                    if let Some(DeclarationKind::Property { getter: slot, .. }) =
                        self.declaration_kind_mut(property)
                    {
                        *slot = Some(getter);
                    }
                }
                Some((Token::KeywordSet, span)) => {
                    let unit = self.builtins.unit_type();
                    let setter =
                        self.read_accessor(property, format!("<set-{}>", name), unit, Some(ty.clone()), span)?;
                    if let Some(DeclarationKind::Property { setter: slot, .. }) =
                        self.declaration_kind_mut(property)
                    {
                        *slot = Some(setter);
                    }
                }
                Some((token, span)) => {
                    self.error_with_note(
                        span,
                        "unexpected token in property body",
                        format!("found {:?}, expected `field`, `get`, `set` or `}}`", token),
                        property_syntax(),
                    );
                    return None;
                }
                None => {
                    self.error_eof("reached end of file inside a property body");
                    return None;
                }
            }
        }

        Some(property)
    }

    fn read_backing_field(
        &mut self,
        property: ElementId,
        name: &str,
        ty: &IrType,
        span: Range<usize>,
    ) -> Option<ElementId> {
        let field = self.declare(
            name.to_string(),
            DeclarationKind::Field {
                ty: ty.clone(),
                initializer: None,
                corresponding_property: Some(property),
            },
            span,
        )?;

        if self.at(Token::Assign) {
            self.next_token();
            let value = self.read_expression()?;
            if let Some(DeclarationKind::Field { initializer, .. }) = self.declaration_kind_mut(field) {
                *initializer = Some(value);
            }
        }
        Some(field)
    }

    /// Getters take no parameters; setters take a single `value`.
    fn read_accessor(
        &mut self,
        property: ElementId,
        name: String,
        return_type: IrType,
        value_type: Option<IrType>,
        span: Range<usize>,
    ) -> Option<ElementId> {
        let accessor = self.declare(
            name,
            DeclarationKind::Function {
                params: vec![],
                return_type,
                body: None,
                corresponding_property: Some(property),
            },
            span.clone(),
        )?;

        self.nested(Some(accessor), |reader| {
            if let Some(ty) = value_type {
                let value = reader.declare(
                    "value".to_string(),
                    DeclarationKind::ValueParameter { index: 0, ty },
                    span,
                )?;
                reader.bind("value".to_string(), value);
                if let Some(DeclarationKind::Function { params, .. }) = reader.declaration_kind_mut(accessor) {
                    params.push(value);
                }
            }
            reader.read_function_body(accessor)
        })?;

        Some(accessor)
    }
}
