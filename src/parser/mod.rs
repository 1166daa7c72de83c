pub mod ast;

use std::path::PathBuf;

use crate::diagnostics::AnalysisError;
use crate::lexer::{lex_in_file, token::Token};
use crate::span::{Span, Spanned};
use ast::*;

/// Lex and parse one source file.
pub fn parse_module(source: &str, file_id: u32, path: Option<PathBuf>) -> Result<Module, AnalysisError> {
    let tokens = lex_in_file(source, file_id)?;
    let mut parser = Parser::new(&tokens, source, file_id);
    parser.parse_module(path)
}

/// Parse a standalone expression, e.g. a body snippet.
pub fn parse_expression(source: &str) -> Result<Spanned<Expr>, AnalysisError> {
    let tokens = lex_in_file(source, 0)?;
    let mut parser = Parser::new(&tokens, source, 0);
    let expr = parser.parse_expr()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Deepest nesting of expressions and type tags the parser accepts. Each
/// expression, unary operand, type tag and operator or postfix chain link
/// counts one level.
pub const MAX_NESTING: usize = 64;

pub struct Parser<'a> {
    tokens: &'a [Spanned<Token>],
    source: &'a str,
    file_id: u32,
    pos: usize,
    depth: usize,
    /// Set when a `>=` closed a type argument list and its `=` half is still unread.
    pending_assign: bool,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Spanned<Token>], source: &'a str, file_id: u32) -> Self {
        Self { tokens, source, file_id, pos: 0, depth: 0, pending_assign: false }
    }

    /// Take one nesting level, failing once `MAX_NESTING` is reached.
    fn deepen(&mut self) -> Result<(), AnalysisError> {
        if self.depth >= MAX_NESTING {
            return Err(AnalysisError::syntax("expression nested too deeply", self.current_span()));
        }
        self.depth += 1;
        Ok(())
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, AnalysisError>) -> Result<T, AnalysisError> {
        self.deepen()?;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> Option<&'a Spanned<Token>> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Spanned<Token>> {
        self.tokens.get(self.pos + offset)
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek()
            .is_some_and(|tok| std::mem::discriminant(&tok.node) == std::mem::discriminant(expected))
    }

    fn check_at(&self, offset: usize, expected: &Token) -> bool {
        self.peek_at(offset)
            .is_some_and(|tok| std::mem::discriminant(&tok.node) == std::mem::discriminant(expected))
    }

    fn advance(&mut self) -> Option<&'a Spanned<Token>> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_assign(&mut self) -> bool {
        if self.pending_assign {
            self.pending_assign = false;
            return true;
        }
        self.eat(&Token::Eq)
    }

    fn expect(&mut self, expected: &Token) -> Result<&'a Spanned<Token>, AnalysisError> {
        match self.peek() {
            Some(tok) if std::mem::discriminant(&tok.node) == std::mem::discriminant(expected) => {
                self.pos += 1;
                Ok(tok)
            }
            Some(tok) => Err(AnalysisError::syntax(
                format!("expected {expected}, found {}", tok.node),
                tok.span,
            )),
            None => Err(AnalysisError::syntax(
                format!("expected {expected}, found end of file"),
                self.eof_span(),
            )),
        }
    }

    fn expect_ident(&mut self) -> Result<Spanned<String>, AnalysisError> {
        match self.peek() {
            Some(tok) if matches!(tok.node, Token::Ident) => {
                self.pos += 1;
                Ok(Spanned::new(self.text(tok.span).to_string(), tok.span))
            }
            Some(tok) => Err(AnalysisError::syntax(
                format!("expected identifier, found {}", tok.node),
                tok.span,
            )),
            None => Err(AnalysisError::syntax("expected identifier, found end of file", self.eof_span())),
        }
    }

    /// Identifier, or a keyword used in name position (`obj.new`, `function new`).
    fn expect_name(&mut self) -> Result<Spanned<String>, AnalysisError> {
        if let Some(tok) = self.peek() {
            let text = self.text(tok.span);
            if !matches!(tok.node, Token::Ident) && crate::lexer::is_keyword(text) {
                self.pos += 1;
                return Ok(Spanned::new(text.to_string(), tok.span));
            }
        }
        self.expect_ident()
    }

    fn is_name_token(&self, tok: &Spanned<Token>) -> bool {
        matches!(tok.node, Token::Ident) || crate::lexer::is_keyword(self.text(tok.span))
    }

    fn expect_end(&self) -> Result<(), AnalysisError> {
        match self.peek() {
            None => Ok(()),
            Some(tok) => Err(AnalysisError::syntax(format!("unexpected {}", tok.node), tok.span)),
        }
    }

    fn text(&self, span: Span) -> &'a str {
        &self.source[span.start..span.end]
    }

    fn current_span(&self) -> Span {
        self.peek().map(|t| t.span).unwrap_or_else(|| self.eof_span())
    }

    fn prev_span(&self) -> Span {
        if self.pos == 0 {
            return self.current_span();
        }
        self.tokens[self.pos - 1].span
    }

    fn span_from(&self, start: Span) -> Span {
        start.to(self.prev_span())
    }

    fn eof_span(&self) -> Span {
        match self.tokens.last() {
            Some(last) => Span::with_file(last.span.end, last.span.end, self.file_id),
            None => Span::with_file(0, 0, self.file_id),
        }
    }

    fn unexpected(&self, what: &str) -> AnalysisError {
        match self.peek() {
            Some(tok) => AnalysisError::syntax(format!("expected {what}, found {}", tok.node), tok.span),
            None => AnalysisError::syntax(format!("expected {what}, found end of file"), self.eof_span()),
        }
    }

    // ---- declarations ----

    pub fn parse_module(&mut self, path: Option<PathBuf>) -> Result<Module, AnalysisError> {
        let mut package = None;
        if self.check(&Token::Package) {
            let start = self.current_span();
            self.advance();
            let path = if self.check(&Token::Semi) { None } else { Some(self.parse_dotted_path()?) };
            self.expect(&Token::Semi)?;
            package = Some(Spanned::new(PackageDecl { path }, self.span_from(start)));
        }

        let mut imports = Vec::new();
        loop {
            if self.check(&Token::Import) {
                imports.push(self.parse_import()?);
            } else if self.peek().is_some_and(|t| matches!(t.node, Token::Ident) && self.text(t.span) == "using") {
                self.advance();
                self.parse_dotted_path()?;
                self.expect(&Token::Semi)?;
            } else {
                break;
            }
        }

        let mut types = Vec::new();
        while self.peek().is_some() {
            if self.eat(&Token::Semi) {
                continue;
            }
            types.push(self.parse_type_decl()?);
        }

        Ok(Module { file_id: self.file_id, path, package, imports, types })
    }

    fn parse_dotted_path(&mut self) -> Result<Spanned<String>, AnalysisError> {
        let first = self.expect_ident()?;
        let mut path = first.node;
        let start = first.span;
        while self.check(&Token::Dot) && self.peek_at(1).is_some_and(|t| self.is_name_token(t)) {
            self.advance();
            let seg = self.expect_name()?;
            path.push('.');
            path.push_str(&seg.node);
        }
        Ok(Spanned::new(path, self.span_from(start)))
    }

    fn parse_import(&mut self) -> Result<Spanned<ImportDecl>, AnalysisError> {
        let start = self.expect(&Token::Import)?.span;
        let path = self.parse_dotted_path()?;
        let mut wildcard = false;
        if self.check(&Token::Dot) && self.check_at(1, &Token::Star) {
            self.advance();
            self.advance();
            wildcard = true;
        }
        self.expect(&Token::Semi)?;
        Ok(Spanned::new(ImportDecl { path, wildcard }, self.span_from(start)))
    }

    fn parse_modifiers(&mut self) -> Result<Modifiers, AnalysisError> {
        let mut modifiers = Modifiers::default();
        loop {
            let Some(tok) = self.peek() else { break };
            let modifier = match &tok.node {
                Token::Meta(name) => {
                    self.advance();
                    self.skip_meta_args(tok.span)?;
                    let known = match name.as_str() {
                        ":final" => Some(Modifier::FinalMeta),
                        ":isVar" => Some(Modifier::IsVar),
                        ":enum" => Some(Modifier::EnumAbstract),
                        _ => None,
                    };
                    if let Some(m) = known {
                        modifiers.items.push(Spanned::new(m, tok.span));
                    }
                    continue;
                }
                Token::Public => Modifier::Public,
                Token::Private => Modifier::Private,
                Token::Static => Modifier::Static,
                Token::Inline => Modifier::Inline,
                Token::Override => Modifier::Override,
                Token::Extern => Modifier::Extern,
                Token::Dynamic => Modifier::Dynamic,
                Token::Macro => Modifier::Macro,
                // `final x` is a field; `final function` and `final class` are modifiers.
                Token::Final if !self.check_at(1, &Token::Ident) => Modifier::Final,
                _ => break,
            };
            self.advance();
            modifiers.items.push(Spanned::new(modifier, tok.span));
        }
        Ok(modifiers)
    }

    /// `@:meta(args)`: the argument list must touch the meta name.
    fn skip_meta_args(&mut self, meta: Span) -> Result<(), AnalysisError> {
        match self.peek() {
            Some(tok) if matches!(tok.node, Token::LParen) && tok.span.start == meta.end => {
                self.skip_balanced(&Token::LParen, &Token::RParen)
            }
            _ => Ok(()),
        }
    }

    fn skip_balanced(&mut self, open: &Token, close: &Token) -> Result<(), AnalysisError> {
        self.expect(open)?;
        let mut depth = 1usize;
        while depth > 0 {
            if self.check(open) {
                depth += 1;
            } else if self.check(close) {
                depth -= 1;
            }
            if self.advance().is_none() {
                return Err(AnalysisError::syntax(format!("expected {close}, found end of file"), self.eof_span()));
            }
        }
        Ok(())
    }

    fn parse_type_decl(&mut self) -> Result<Spanned<TypeDecl>, AnalysisError> {
        let start = self.current_span();
        let mut modifiers = self.parse_modifiers()?;
        let Some(tok) = self.peek() else {
            return Err(self.unexpected("type declaration"));
        };
        let kind = match tok.node {
            Token::Class => TypeDeclKind::Class,
            Token::Interface => TypeDeclKind::Interface,
            Token::Typedef => TypeDeclKind::Typedef,
            Token::Abstract => TypeDeclKind::Abstract,
            Token::Enum if self.check_at(1, &Token::Abstract) => {
                self.advance();
                modifiers.items.push(Spanned::new(Modifier::EnumAbstract, tok.span));
                TypeDeclKind::Abstract
            }
            Token::Enum => TypeDeclKind::Enum,
            _ => return Err(self.unexpected("type declaration")),
        };
        self.advance();

        let name = self.expect_ident()?;
        let generic_params = self.parse_generic_params()?;
        let mut decl = TypeDecl {
            kind,
            name,
            modifiers,
            generic_params,
            extends: Vec::new(),
            implements: Vec::new(),
            members: Vec::new(),
            enum_values: Vec::new(),
            alias: None,
        };

        match kind {
            TypeDeclKind::Class | TypeDeclKind::Interface => {
                self.parse_heritage(&mut decl)?;
                decl.members = self.parse_members()?;
            }
            TypeDeclKind::Typedef => {
                if !self.eat_assign() {
                    return Err(self.unexpected("'='"));
                }
                decl.alias = Some(if self.check(&Token::LBrace) {
                    self.parse_anonymous(&mut decl.extends)?
                } else {
                    self.parse_type()?
                });
                self.eat(&Token::Semi);
            }
            TypeDeclKind::Enum => {
                self.expect(&Token::LBrace)?;
                while !self.check(&Token::RBrace) {
                    if self.peek().is_none() {
                        return Err(self.unexpected("'}'"));
                    }
                    decl.enum_values.push(self.parse_enum_value()?);
                }
                self.expect(&Token::RBrace)?;
            }
            TypeDeclKind::Abstract => {
                if self.eat(&Token::LParen) {
                    decl.alias = Some(self.parse_type()?);
                    self.expect(&Token::RParen)?;
                }
                while let Some(tok) = self.peek() {
                    let word = self.text(tok.span);
                    if !matches!(tok.node, Token::Ident) || !(word == "from" || word == "to") {
                        break;
                    }
                    self.advance();
                    self.parse_type()?;
                }
                decl.members = self.parse_members()?;
            }
        }

        Ok(Spanned::new(decl, self.span_from(start)))
    }

    fn parse_heritage(&mut self, decl: &mut TypeDecl) -> Result<(), AnalysisError> {
        loop {
            if self.eat(&Token::Extends) {
                decl.extends.push(self.parse_type()?);
                while self.eat(&Token::Comma) {
                    decl.extends.push(self.parse_type()?);
                }
            } else if self.eat(&Token::Implements) {
                decl.implements.push(self.parse_type()?);
                while self.eat(&Token::Comma) {
                    decl.implements.push(self.parse_type()?);
                }
            } else {
                return Ok(());
            }
        }
    }

    fn parse_generic_params(&mut self) -> Result<Vec<GenericParam>, AnalysisError> {
        let mut params = Vec::new();
        if !self.eat(&Token::Lt) {
            return Ok(params);
        }
        loop {
            let name = self.expect_ident()?;
            let mut constraints = Vec::new();
            if self.eat(&Token::Colon) {
                if self.eat(&Token::LParen) {
                    constraints.push(self.parse_type()?);
                    while self.eat(&Token::Comma) {
                        constraints.push(self.parse_type()?);
                    }
                    self.expect(&Token::RParen)?;
                } else {
                    constraints.push(self.parse_type()?);
                }
            }
            params.push(GenericParam { name, constraints });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.close_angle()?;
        Ok(params)
    }

    fn close_angle(&mut self) -> Result<(), AnalysisError> {
        if self.eat(&Token::Gt) {
            return Ok(());
        }
        if self.eat(&Token::GtEq) {
            self.pending_assign = true;
            return Ok(());
        }
        Err(self.unexpected("'>'"))
    }

    fn parse_members(&mut self) -> Result<Vec<Member>, AnalysisError> {
        self.expect(&Token::LBrace)?;
        let mut members = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.peek().is_none() {
                return Err(self.unexpected("'}'"));
            }
            if self.eat(&Token::Semi) {
                continue;
            }
            members.push(self.parse_member()?);
        }
        self.expect(&Token::RBrace)?;
        Ok(members)
    }

    fn parse_member(&mut self) -> Result<Member, AnalysisError> {
        let start = self.current_span();
        let mut modifiers = self.parse_modifiers()?;
        let Some(tok) = self.peek() else {
            return Err(self.unexpected("member declaration"));
        };
        match tok.node {
            Token::Var | Token::Final => {
                self.advance();
                if matches!(tok.node, Token::Final) {
                    modifiers.items.push(Spanned::new(Modifier::Final, tok.span));
                }
                let field = self.parse_field_rest(modifiers)?;
                Ok(Member::Field(Spanned::new(field, self.span_from(start))))
            }
            Token::Function => {
                self.advance();
                let method = self.parse_method_rest(modifiers)?;
                Ok(Member::Method(Spanned::new(method, self.span_from(start))))
            }
            _ => Err(self.unexpected("'var', 'final' or 'function'")),
        }
    }

    fn parse_field_rest(&mut self, modifiers: Modifiers) -> Result<FieldDecl, AnalysisError> {
        let name = self.expect_ident()?;
        let accessors = if self.eat(&Token::LParen) {
            let getter = self.parse_accessor()?;
            self.expect(&Token::Comma)?;
            let setter = self.parse_accessor()?;
            self.expect(&Token::RParen)?;
            Some(PropertyAccessors { getter, setter })
        } else {
            None
        };
        let type_tag = if self.eat(&Token::Colon) { Some(self.parse_type()?) } else { None };
        let init = if self.eat_assign() { Some(self.parse_expr()?) } else { None };
        self.expect(&Token::Semi)?;
        Ok(FieldDecl { name, modifiers, accessors, type_tag, init })
    }

    fn parse_accessor(&mut self) -> Result<Spanned<Accessor>, AnalysisError> {
        let Some(tok) = self.advance() else {
            return Err(self.unexpected("accessor"));
        };
        let accessor = match tok.node {
            Token::Default => Accessor::Default,
            Token::Null => Accessor::Null,
            Token::Dynamic => Accessor::Dynamic,
            Token::Ident => match self.text(tok.span) {
                "get" => Accessor::Get,
                "set" => Accessor::Set,
                "never" => Accessor::Never,
                other => Accessor::Other(other.to_string()),
            },
            _ => {
                return Err(AnalysisError::syntax(format!("expected accessor, found {}", tok.node), tok.span));
            }
        };
        Ok(Spanned::new(accessor, tok.span))
    }

    fn parse_method_rest(&mut self, modifiers: Modifiers) -> Result<MethodDecl, AnalysisError> {
        let name = self.expect_name()?;
        let generic_params = self.parse_generic_params()?;
        let params = self.parse_params()?;
        let return_tag = if self.eat(&Token::Colon) { Some(self.parse_type()?) } else { None };
        let body = if self.eat(&Token::Semi) {
            None
        } else if self.check(&Token::LBrace) {
            Some(self.parse_block()?)
        } else {
            let expr = self.parse_expr()?;
            self.eat(&Token::Semi);
            Some(expr)
        };
        Ok(MethodDecl { name, modifiers, generic_params, params, return_tag, body })
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, AnalysisError> {
        self.expect(&Token::LParen)?;
        let mut params = Vec::new();
        while !self.check(&Token::RParen) {
            if !params.is_empty() {
                self.expect(&Token::Comma)?;
            }
            let start = self.current_span();
            let optional = if self.check(&Token::Question) { self.advance().map(|t| t.span) } else { None };
            let name = self.expect_ident()?;
            let type_tag = if self.eat(&Token::Colon) { Some(self.parse_type()?) } else { None };
            let default = if self.eat_assign() { Some(self.parse_expr()?) } else { None };
            params.push(Param { name, optional, type_tag, default, span: self.span_from(start) });
        }
        self.expect(&Token::RParen)?;
        Ok(params)
    }

    fn parse_enum_value(&mut self) -> Result<Spanned<EnumValueDecl>, AnalysisError> {
        let start = self.current_span();
        self.parse_modifiers()?;
        let name = self.expect_ident()?;
        let generic_params = self.parse_generic_params()?;
        let params = if self.check(&Token::LParen) { self.parse_params()? } else { Vec::new() };
        let return_tag = if self.eat(&Token::Colon) { Some(self.parse_type()?) } else { None };
        self.expect(&Token::Semi)?;
        Ok(Spanned::new(EnumValueDecl { name, generic_params, params, return_tag }, self.span_from(start)))
    }

    // ---- type tags ----

    pub fn parse_type(&mut self) -> Result<Spanned<TypeTag>, AnalysisError> {
        self.nested(Self::parse_type_inner)
    }

    fn parse_type_inner(&mut self) -> Result<Spanned<TypeTag>, AnalysisError> {
        let (optional, first) = self.parse_function_arg_type()?;
        if !self.check(&Token::Arrow) {
            return Ok(first);
        }
        let start = first.span;
        let mut parts = vec![(optional, first)];
        while self.eat(&Token::Arrow) {
            parts.push(self.parse_function_arg_type()?);
        }
        let Some((_, ret)) = parts.pop() else {
            return Err(self.unexpected("return type"));
        };
        let params = parts
            .into_iter()
            .map(|(optional, ty)| FunctionTagParam { name: None, optional, ty })
            .collect();
        let span = start.to(ret.span);
        Ok(Spanned::new(TypeTag::Function { params, ret: Some(Box::new(ret)) }, span))
    }

    fn parse_function_arg_type(&mut self) -> Result<(bool, Spanned<TypeTag>), AnalysisError> {
        let optional = self.eat(&Token::Question);
        Ok((optional, self.parse_type_atom()?))
    }

    fn parse_type_atom(&mut self) -> Result<Spanned<TypeTag>, AnalysisError> {
        let start = self.current_span();
        match self.peek().map(|t| &t.node) {
            Some(Token::LParen) => {
                self.advance();
                let mut params = Vec::new();
                while !self.check(&Token::RParen) {
                    if !params.is_empty() {
                        self.expect(&Token::Comma)?;
                    }
                    let optional = self.eat(&Token::Question);
                    let name = if self.check(&Token::Ident) && self.check_at(1, &Token::Colon) {
                        let name = self.expect_ident()?;
                        self.advance();
                        Some(name)
                    } else {
                        None
                    };
                    let ty = self.parse_type()?;
                    params.push(FunctionTagParam { name, optional, ty });
                }
                self.expect(&Token::RParen)?;
                if self.eat(&Token::Arrow) {
                    let ret = self.parse_type()?;
                    let span = start.to(ret.span);
                    return Ok(Spanned::new(TypeTag::Function { params, ret: Some(Box::new(ret)) }, span));
                }
                match params.pop() {
                    Some(FunctionTagParam { name: None, optional: false, ty }) if params.is_empty() => Ok(ty),
                    _ => Err(self.unexpected("'->'")),
                }
            }
            Some(Token::LBrace) => self.parse_anonymous(&mut Vec::new()),
            Some(Token::Ident) => self.parse_named_type(),
            _ => Err(self.unexpected("type")),
        }
    }

    /// `{ > Base, name : Type, ?opt : Type }`. Extended structures are
    /// pushed to `extends`.
    fn parse_anonymous(&mut self, extends: &mut Vec<Spanned<TypeTag>>) -> Result<Spanned<TypeTag>, AnalysisError> {
        let start = self.current_span();
        self.expect(&Token::LBrace)?;
        let mut fields = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.peek().is_none() {
                return Err(self.unexpected("'}'"));
            }
            if self.eat(&Token::Gt) {
                extends.push(self.parse_type()?);
                self.eat(&Token::Comma);
                continue;
            }
            self.parse_modifiers()?;
            let mut optional = self.eat(&Token::Question);
            if self.eat(&Token::Var) || self.eat(&Token::Final) {
                optional |= self.eat(&Token::Question);
            }
            let name = self.expect_name()?;
            let ty = if self.eat(&Token::Colon) { Some(self.parse_type()?) } else { None };
            fields.push(AnonField { name, optional, ty });
            if !self.eat(&Token::Comma) {
                self.eat(&Token::Semi);
            }
        }
        self.expect(&Token::RBrace)?;
        Ok(Spanned::new(TypeTag::Anonymous(fields), self.span_from(start)))
    }

    fn parse_named_type(&mut self) -> Result<Spanned<TypeTag>, AnalysisError> {
        let path = self.parse_dotted_path()?;
        let start = path.span;
        let mut args = Vec::new();
        if self.eat(&Token::Lt) {
            loop {
                args.push(self.parse_type()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.close_angle()?;
        }
        Ok(Spanned::new(TypeTag::Named { path, args }, self.span_from(start)))
    }

    // ---- expressions ----

    pub fn parse_expr(&mut self) -> Result<Spanned<Expr>, AnalysisError> {
        self.nested(Self::parse_assignment)
    }

    fn parse_assignment(&mut self) -> Result<Spanned<Expr>, AnalysisError> {
        let target = self.parse_ternary()?;
        let op = match self.peek().map(|t| &t.node) {
            Some(Token::Eq) => None,
            Some(Token::PlusEq) => Some(BinOp::Add),
            Some(Token::MinusEq) => Some(BinOp::Sub),
            Some(Token::StarEq) => Some(BinOp::Mul),
            Some(Token::SlashEq) => Some(BinOp::Div),
            Some(Token::PercentEq) => Some(BinOp::Mod),
            _ => return Ok(target),
        };
        self.advance();
        let value = self.parse_expr()?;
        let span = target.span.to(value.span);
        Ok(Spanned::new(Expr::Assign { op, target: Box::new(target), value: Box::new(value) }, span))
    }

    fn parse_ternary(&mut self) -> Result<Spanned<Expr>, AnalysisError> {
        let cond = self.parse_binary(0)?;
        if !self.eat(&Token::Question) {
            return Ok(cond);
        }
        let then_branch = self.parse_expr()?;
        self.expect(&Token::Colon)?;
        let else_branch = self.parse_expr()?;
        let span = cond.span.to(else_branch.span);
        Ok(Spanned::new(
            Expr::Ternary {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            span,
        ))
    }

    /// The binary operator at the cursor and how many tokens it spans.
    fn peek_binop(&self) -> Option<(BinOp, usize)> {
        let tok = self.peek()?;
        let op = match tok.node {
            Token::PipePipe => BinOp::Or,
            Token::AmpAmp => BinOp::And,
            Token::DotDotDot => BinOp::Interval,
            Token::EqEq => BinOp::Eq,
            Token::BangEq => BinOp::Neq,
            Token::Lt => BinOp::Lt,
            Token::LtEq => BinOp::LtEq,
            Token::GtEq => BinOp::GtEq,
            Token::Gt => {
                // `>>` is two adjacent `>` tokens so nested type arguments still close.
                if let Some(next) = self.peek_at(1) {
                    if matches!(next.node, Token::Gt) && next.span.start == tok.span.end {
                        return Some((BinOp::Shr, 2));
                    }
                }
                BinOp::Gt
            }
            Token::Pipe => BinOp::BitOr,
            Token::Caret => BinOp::BitXor,
            Token::Amp => BinOp::BitAnd,
            Token::Shl => BinOp::Shl,
            Token::Plus => BinOp::Add,
            Token::Minus => BinOp::Sub,
            Token::Star => BinOp::Mul,
            Token::Slash => BinOp::Div,
            Token::Percent => BinOp::Mod,
            _ => return None,
        };
        Some((op, 1))
    }

    fn parse_binary(&mut self, min_bp: u8) -> Result<Spanned<Expr>, AnalysisError> {
        let depth = self.depth;
        let result = self.parse_binary_chain(min_bp);
        self.depth = depth;
        result
    }

    /// Each operator applied deepens the tree on the left, so every link
    /// takes a nesting level until the chain ends.
    fn parse_binary_chain(&mut self, min_bp: u8) -> Result<Spanned<Expr>, AnalysisError> {
        let mut lhs = self.parse_unary()?;
        while let Some((op, width)) = self.peek_binop() {
            let (l_bp, r_bp) = infix_binding_power(op);
            if l_bp < min_bp {
                break;
            }
            self.deepen()?;
            self.pos += width;
            let rhs = self.parse_binary(r_bp)?;
            let span = lhs.span.to(rhs.span);
            lhs = Spanned::new(Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }, span);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Spanned<Expr>, AnalysisError> {
        self.nested(Self::parse_prefixed)
    }

    fn parse_prefixed(&mut self) -> Result<Spanned<Expr>, AnalysisError> {
        let start = self.current_span();
        let op = match self.peek().map(|t| &t.node) {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Tilde) => UnaryOp::BitNot,
            Some(Token::PlusPlus) => UnaryOp::PreInc,
            Some(Token::MinusMinus) => UnaryOp::PreDec,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        let span = start.to(operand.span);
        Ok(Spanned::new(Expr::Unary { op, operand: Box::new(operand) }, span))
    }

    fn parse_postfix(&mut self) -> Result<Spanned<Expr>, AnalysisError> {
        let depth = self.depth;
        let result = self.parse_postfix_chain();
        self.depth = depth;
        result
    }

    fn parse_postfix_chain(&mut self) -> Result<Spanned<Expr>, AnalysisError> {
        let mut expr = self.parse_primary()?;
        loop {
            if matches!(
                self.peek().map(|t| &t.node),
                Some(Token::Dot | Token::LParen | Token::LBracket | Token::PlusPlus | Token::MinusMinus)
            ) {
                self.deepen()?;
            }
            match self.peek().map(|t| &t.node) {
                Some(Token::Dot) => {
                    self.advance();
                    let field = self.expect_name()?;
                    let span = expr.span.to(field.span);
                    expr = Spanned::new(Expr::Field { object: Box::new(expr), field }, span);
                }
                Some(Token::LParen) => {
                    let args = self.parse_args()?;
                    let span = self.span_from(expr.span);
                    expr = Spanned::new(Expr::Call { callee: Box::new(expr), args }, span);
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(&Token::RBracket)?;
                    let span = self.span_from(expr.span);
                    expr = Spanned::new(Expr::Index { object: Box::new(expr), index: Box::new(index) }, span);
                }
                Some(Token::PlusPlus) | Some(Token::MinusMinus) => {
                    let op = if self.check(&Token::PlusPlus) { UnaryOp::PostInc } else { UnaryOp::PostDec };
                    self.advance();
                    let span = self.span_from(expr.span);
                    expr = Spanned::new(Expr::Unary { op, operand: Box::new(expr) }, span);
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Spanned<Expr>>, AnalysisError> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        while !self.check(&Token::RParen) {
            if !args.is_empty() {
                self.expect(&Token::Comma)?;
            }
            args.push(self.parse_expr()?);
        }
        self.expect(&Token::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Spanned<Expr>, AnalysisError> {
        let Some(tok) = self.peek() else {
            return Err(self.unexpected("expression"));
        };
        let start = tok.span;
        let simple = match &tok.node {
            Token::IntLit(n) => Some(Expr::Int(*n)),
            Token::FloatLit(f) => Some(Expr::Float(*f)),
            Token::True => Some(Expr::Bool(true)),
            Token::False => Some(Expr::Bool(false)),
            Token::Null => Some(Expr::Null),
            Token::This => Some(Expr::This),
            Token::Super => Some(Expr::Super),
            Token::Ident => Some(Expr::Ident(self.text(tok.span).to_string())),
            Token::Break => Some(Expr::Break),
            Token::Continue => Some(Expr::Continue),
            _ => None,
        };
        if let Some(expr) = simple {
            self.advance();
            return Ok(Spanned::new(expr, start));
        }

        match &tok.node {
            Token::DoubleString | Token::SingleString => {
                self.advance();
                let quote = if matches!(tok.node, Token::SingleString) { Quote::Single } else { Quote::Double };
                let lit = self.parse_string(tok.span, quote)?;
                Ok(Spanned::new(Expr::Str(lit), start))
            }
            Token::Meta(_) => {
                self.advance();
                self.skip_meta_args(start)?;
                self.parse_expr()
            }
            Token::New => {
                self.advance();
                let class = self.parse_named_type()?;
                let args = self.parse_args()?;
                Ok(Spanned::new(Expr::New { class, args }, self.span_from(start)))
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(Spanned::new(Expr::Paren(Box::new(inner)), self.span_from(start)))
            }
            Token::LBracket => {
                self.advance();
                let mut items = Vec::new();
                while !self.check(&Token::RBracket) {
                    items.push(self.parse_expr()?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(&Token::RBracket)?;
                Ok(Spanned::new(Expr::ArrayLit(items), self.span_from(start)))
            }
            Token::LBrace if self.is_object_literal_ahead() => self.parse_object_literal(),
            Token::LBrace => self.parse_block(),
            Token::Function => {
                self.advance();
                let lit = self.parse_function_literal()?;
                Ok(Spanned::new(Expr::Function(Box::new(lit)), self.span_from(start)))
            }
            Token::Cast => {
                self.advance();
                if self.eat(&Token::LParen) {
                    let expr = self.parse_expr()?;
                    let ty = if self.eat(&Token::Comma) { Some(self.parse_type()?) } else { None };
                    self.expect(&Token::RParen)?;
                    return Ok(Spanned::new(Expr::Cast { expr: Box::new(expr), ty }, self.span_from(start)));
                }
                let expr = self.parse_unary()?;
                Ok(Spanned::new(Expr::Cast { expr: Box::new(expr), ty: None }, self.span_from(start)))
            }
            Token::Untyped => {
                self.advance();
                let expr = self.parse_expr()?;
                Ok(Spanned::new(Expr::Untyped(Box::new(expr)), self.span_from(start)))
            }
            Token::Var | Token::Final => {
                self.advance();
                let is_final = matches!(tok.node, Token::Final);
                let name = self.expect_ident()?;
                let type_tag = if self.eat(&Token::Colon) { Some(self.parse_type()?) } else { None };
                let init = if self.eat_assign() { Some(self.parse_expr()?) } else { None };
                let local = LocalVar { name, is_final, type_tag, init };
                Ok(Spanned::new(Expr::Var(Box::new(local)), self.span_from(start)))
            }
            Token::If => self.parse_if(),
            Token::While => {
                self.advance();
                self.expect(&Token::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                let body = self.parse_body()?;
                Ok(Spanned::new(
                    Expr::While { cond: Box::new(cond), body: Box::new(body), do_while: false },
                    self.span_from(start),
                ))
            }
            Token::Do => {
                self.advance();
                let body = self.parse_body()?;
                self.expect(&Token::While)?;
                self.expect(&Token::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(Spanned::new(
                    Expr::While { cond: Box::new(cond), body: Box::new(body), do_while: true },
                    self.span_from(start),
                ))
            }
            Token::For => {
                self.advance();
                self.expect(&Token::LParen)?;
                let var = self.expect_ident()?;
                self.expect(&Token::In)?;
                let iterable = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                let body = self.parse_body()?;
                Ok(Spanned::new(
                    Expr::For { var, iterable: Box::new(iterable), body: Box::new(body) },
                    self.span_from(start),
                ))
            }
            Token::Switch => self.parse_switch(),
            Token::Try => self.parse_try(),
            Token::Return => {
                self.advance();
                let value = match self.peek().map(|t| &t.node) {
                    None | Some(Token::Semi) | Some(Token::RBrace) | Some(Token::Case) | Some(Token::Default) => None,
                    Some(_) => Some(Box::new(self.parse_expr()?)),
                };
                Ok(Spanned::new(Expr::Return(value), self.span_from(start)))
            }
            Token::Throw => {
                self.advance();
                let value = self.parse_expr()?;
                Ok(Spanned::new(Expr::Throw(Box::new(value)), self.span_from(start)))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn is_object_literal_ahead(&self) -> bool {
        let key = self.peek_at(1).is_some_and(|t| {
            matches!(t.node, Token::Ident | Token::DoubleString | Token::SingleString)
        });
        (key && self.check_at(2, &Token::Colon)) || self.check_at(1, &Token::RBrace)
    }

    fn parse_object_literal(&mut self) -> Result<Spanned<Expr>, AnalysisError> {
        let start = self.expect(&Token::LBrace)?.span;
        let mut fields = Vec::new();
        while !self.check(&Token::RBrace) {
            let Some(tok) = self.advance() else {
                return Err(self.unexpected("'}'"));
            };
            let key = match tok.node {
                Token::Ident => self.text(tok.span).to_string(),
                Token::DoubleString | Token::SingleString => {
                    let raw = self.text(tok.span);
                    raw[1..raw.len() - 1].to_string()
                }
                _ => {
                    return Err(AnalysisError::syntax(format!("expected field name, found {}", tok.node), tok.span));
                }
            };
            self.expect(&Token::Colon)?;
            let value = self.parse_expr()?;
            fields.push((Spanned::new(key, tok.span), value));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RBrace)?;
        Ok(Spanned::new(Expr::ObjectLit(fields), self.span_from(start)))
    }

    pub fn parse_block(&mut self) -> Result<Spanned<Expr>, AnalysisError> {
        let start = self.expect(&Token::LBrace)?.span;
        let mut stmts = Vec::new();
        loop {
            while self.eat(&Token::Semi) {}
            if self.check(&Token::RBrace) || self.peek().is_none() {
                break;
            }
            stmts.push(self.parse_expr()?);
        }
        self.expect(&Token::RBrace)?;
        Ok(Spanned::new(Expr::Block(stmts), self.span_from(start)))
    }

    /// Branch or loop body: a block, or a single expression.
    fn parse_body(&mut self) -> Result<Spanned<Expr>, AnalysisError> {
        if self.check(&Token::LBrace) && (self.check_at(1, &Token::RBrace) || !self.is_object_literal_ahead()) {
            self.parse_block()
        } else {
            self.parse_expr()
        }
    }

    fn parse_function_literal(&mut self) -> Result<FunctionLiteral, AnalysisError> {
        let name = if self.check(&Token::Ident) { Some(self.expect_ident()?) } else { None };
        let params = self.parse_params()?;
        let return_tag = if self.eat(&Token::Colon) { Some(self.parse_type()?) } else { None };
        let body = self.parse_body()?;
        Ok(FunctionLiteral { name, params, return_tag, body })
    }

    fn parse_if(&mut self) -> Result<Spanned<Expr>, AnalysisError> {
        let start = self.expect(&Token::If)?.span;
        self.expect(&Token::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&Token::RParen)?;
        let then_branch = self.parse_body()?;
        // `if (a) x; else y;`
        if self.check(&Token::Semi) && self.check_at(1, &Token::Else) {
            self.advance();
        }
        let else_branch = if self.eat(&Token::Else) { Some(Box::new(self.parse_body()?)) } else { None };
        Ok(Spanned::new(
            Expr::If { cond: Box::new(cond), then_branch: Box::new(then_branch), else_branch },
            self.span_from(start),
        ))
    }

    fn parse_switch(&mut self) -> Result<Spanned<Expr>, AnalysisError> {
        let start = self.expect(&Token::Switch)?.span;
        let subject = self.parse_expr()?;
        self.expect(&Token::LBrace)?;
        let mut cases = Vec::new();
        let mut default = None;
        loop {
            if self.eat(&Token::Case) {
                let mut values = vec![self.parse_expr()?];
                while self.eat(&Token::Comma) {
                    values.push(self.parse_expr()?);
                }
                if self.eat(&Token::If) {
                    self.parse_expr()?;
                }
                self.expect(&Token::Colon)?;
                let body = self.parse_case_body()?;
                cases.push(SwitchCase { values, body });
            } else if self.eat(&Token::Default) {
                self.expect(&Token::Colon)?;
                default = Some(Box::new(self.parse_case_body()?));
            } else {
                break;
            }
        }
        self.expect(&Token::RBrace)?;
        Ok(Spanned::new(Expr::Switch { subject: Box::new(subject), cases, default }, self.span_from(start)))
    }

    fn parse_case_body(&mut self) -> Result<Spanned<Expr>, AnalysisError> {
        let colon = self.prev_span();
        let mut stmts = Vec::new();
        loop {
            while self.eat(&Token::Semi) {}
            match self.peek().map(|t| &t.node) {
                None | Some(Token::Case) | Some(Token::Default) | Some(Token::RBrace) => break,
                Some(_) => stmts.push(self.parse_expr()?),
            }
        }
        let span = match (stmts.first(), stmts.last()) {
            (Some(first), Some(last)) => first.span.to(last.span),
            _ => Span::with_file(colon.end, colon.end, self.file_id),
        };
        Ok(Spanned::new(Expr::Block(stmts), span))
    }

    fn parse_try(&mut self) -> Result<Spanned<Expr>, AnalysisError> {
        let start = self.expect(&Token::Try)?.span;
        let body = self.parse_body()?;
        let mut catches = Vec::new();
        while self.eat(&Token::Catch) {
            self.expect(&Token::LParen)?;
            let var = self.expect_ident()?;
            let type_tag = if self.eat(&Token::Colon) { Some(self.parse_type()?) } else { None };
            self.expect(&Token::RParen)?;
            let body = self.parse_body()?;
            catches.push(CatchClause { var, type_tag, body });
        }
        Ok(Spanned::new(Expr::Try { body: Box::new(body), catches }, self.span_from(start)))
    }

    // ---- strings ----

    /// Split a string literal into literal text and interpolated segments.
    /// Double-quoted strings are scanned too so the literal check can see
    /// segments that will not be interpolated.
    fn parse_string(&self, span: Span, quote: Quote) -> Result<StringLit, AnalysisError> {
        let raw = self.text(span);
        let inner = &raw[1..raw.len() - 1];
        let base = span.start + 1;
        let bytes = inner.as_bytes();
        let mut parts = Vec::new();
        let mut lit = String::new();
        let mut i = 0;

        while i < inner.len() {
            let c = bytes[i];
            if c == b'\\' && i + 1 < inner.len() {
                let next = inner[i + 1..].chars().next().unwrap_or('\\');
                match next {
                    'n' => lit.push('\n'),
                    't' => lit.push('\t'),
                    'r' => lit.push('\r'),
                    '\\' | '"' | '\'' => lit.push(next),
                    other => {
                        lit.push('\\');
                        lit.push(other);
                    }
                }
                i += 1 + next.len_utf8();
                continue;
            }
            if c == b'$' && i + 1 < inner.len() {
                let next = bytes[i + 1];
                if next == b'$' {
                    lit.push('$');
                    i += 2;
                    continue;
                }
                if next == b'{' {
                    if let Some(close) = find_interp_close(inner, i + 2) {
                        let segment = &inner[i + 2..close];
                        match self.parse_embedded(segment, base + i + 2) {
                            Ok(expr) => {
                                flush_lit(&mut parts, &mut lit);
                                parts.push(StringPart::Interp { expr, raw: inner[i..=close].to_string() });
                                i = close + 1;
                                continue;
                            }
                            Err(err) if quote == Quote::Single => return Err(err),
                            Err(_) => {}
                        }
                    } else if quote == Quote::Single {
                        return Err(AnalysisError::syntax(
                            "unterminated string interpolation",
                            Span::with_file(base + i, span.end, self.file_id),
                        ));
                    }
                } else if next.is_ascii_alphabetic() || next == b'_' {
                    let mut j = i + 1;
                    while j < inner.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
                        j += 1;
                    }
                    let name = &inner[i + 1..j];
                    let ident_span = Span::with_file(base + i + 1, base + j, self.file_id);
                    flush_lit(&mut parts, &mut lit);
                    parts.push(StringPart::Interp {
                        expr: Spanned::new(Expr::Ident(name.to_string()), ident_span),
                        raw: inner[i..j].to_string(),
                    });
                    i = j;
                    continue;
                }
            }
            let ch = inner[i..].chars().next().unwrap_or('\u{fffd}');
            lit.push(ch);
            i += ch.len_utf8();
        }
        flush_lit(&mut parts, &mut lit);
        Ok(StringLit { quote, parts })
    }

    fn parse_embedded(&self, segment: &str, offset: usize) -> Result<Spanned<Expr>, AnalysisError> {
        let shift = |err: AnalysisError| match err {
            AnalysisError::Syntax { msg, span } => AnalysisError::Syntax { msg, span: span.shifted(offset) },
            other => other,
        };
        let tokens: Vec<Spanned<Token>> = lex_in_file(segment, self.file_id)
            .map_err(shift)?
            .into_iter()
            .map(|t| Spanned::new(t.node, t.span.shifted(offset)))
            .collect();
        if tokens.is_empty() {
            return Err(AnalysisError::syntax(
                "empty string interpolation",
                Span::with_file(offset, offset, self.file_id),
            ));
        }
        let mut sub = Parser::new(&tokens, self.source, self.file_id);
        sub.depth = self.depth;
        let expr = sub.parse_expr()?;
        sub.expect_end()?;
        Ok(expr)
    }
}

fn flush_lit(parts: &mut Vec<StringPart>, lit: &mut String) {
    if !lit.is_empty() {
        parts.push(StringPart::Lit(std::mem::take(lit)));
    }
}

/// Byte index of the `}` closing an interpolation opened just before `from`.
fn find_interp_close(text: &str, from: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (i, b) in text.bytes().enumerate().skip(from) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn infix_binding_power(op: BinOp) -> (u8, u8) {
    match op {
        BinOp::Or => (1, 2),
        BinOp::And => (3, 4),
        BinOp::Interval => (5, 6),
        BinOp::Eq | BinOp::Neq | BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq => (7, 8),
        BinOp::BitOr | BinOp::BitXor | BinOp::BitAnd => (9, 10),
        BinOp::Shl | BinOp::Shr => (11, 12),
        BinOp::Add | BinOp::Sub => (13, 14),
        BinOp::Mul | BinOp::Div | BinOp::Mod => (15, 16),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Module {
        parse_module(src, 0, None).unwrap()
    }

    fn class_members(module: &Module) -> &[Member] {
        &module.types[0].node.members
    }

    #[test]
    fn parse_package_and_imports() {
        let module = parse("package com.example;\nimport haxe.ds.StringMap;\nimport com.util.*;\nclass A {}");
        assert_eq!(module.package_name(), "com.example");
        assert_eq!(module.imports.len(), 2);
        assert_eq!(module.imports[0].node.binding_name(), "StringMap");
        assert!(!module.imports[0].node.wildcard);
        assert_eq!(module.imports[1].node.path.node, "com.util");
        assert!(module.imports[1].node.wildcard);
    }

    #[test]
    fn parse_bare_package() {
        let module = parse("package;\nclass A {}");
        assert!(module.package.is_some());
        assert_eq!(module.package_name(), "");
    }

    #[test]
    fn parse_class_heritage() {
        let module = parse("class Foo<T:Base> extends Bar<T> implements IA implements IB {}");
        let decl = &module.types[0].node;
        assert_eq!(decl.kind, TypeDeclKind::Class);
        assert_eq!(decl.name.node, "Foo");
        assert_eq!(decl.generic_params.len(), 1);
        assert_eq!(decl.generic_params[0].constraints.len(), 1);
        assert_eq!(decl.extends.len(), 1);
        assert_eq!(decl.implements.len(), 2);
    }

    #[test]
    fn parse_fields_and_properties() {
        let module = parse(
            "class A {\n  public static inline var MAX:Int = 10;\n  public var x(get, null):Float;\n  final y:String;\n  @:isVar var z(default, set):Int = 0;\n}",
        );
        let members = class_members(&module);
        assert_eq!(members.len(), 4);
        let Member::Field(max) = &members[0] else { panic!("expected field") };
        assert!(max.node.modifiers.has(Modifier::Static));
        assert!(max.node.modifiers.has(Modifier::Inline));
        assert!(max.node.init.is_some());
        let Member::Field(x) = &members[1] else { panic!("expected field") };
        let acc = x.node.accessors.as_ref().unwrap();
        assert_eq!(acc.getter.node, Accessor::Get);
        assert_eq!(acc.setter.node, Accessor::Null);
        let Member::Field(y) = &members[2] else { panic!("expected field") };
        assert!(y.node.modifiers.has(Modifier::Final));
        let Member::Field(z) = &members[3] else { panic!("expected field") };
        assert!(z.node.modifiers.has(Modifier::IsVar));
        assert_eq!(z.node.accessors.as_ref().unwrap().setter.node, Accessor::Set);
    }

    #[test]
    fn parse_methods() {
        let module = parse(
            "class A {\n  public function new() {}\n  override public function run(a:Int, ?b:String, c = 3):Void { return; }\n  final function f() return 1;\n}",
        );
        let members = class_members(&module);
        let Member::Method(ctor) = &members[0] else { panic!("expected method") };
        assert_eq!(ctor.node.name.node, "new");
        let Member::Method(run) = &members[1] else { panic!("expected method") };
        assert!(run.node.modifiers.has(Modifier::Override));
        assert_eq!(run.node.params.len(), 3);
        assert!(run.node.params[1].optional.is_some());
        assert!(run.node.params[2].is_optional());
        let Member::Method(f) = &members[2] else { panic!("expected method") };
        assert!(f.node.modifiers.has(Modifier::Final));
        assert!(matches!(f.node.body.as_ref().unwrap().node, Expr::Return(Some(_))));
    }

    #[test]
    fn parse_interface_method_without_body() {
        let module = parse("interface I extends J {\n  function run(x:Int):Bool;\n}");
        let decl = &module.types[0].node;
        assert_eq!(decl.kind, TypeDeclKind::Interface);
        let Member::Method(run) = &decl.members[0] else { panic!("expected method") };
        assert!(run.node.body.is_none());
    }

    #[test]
    fn parse_enum_and_enum_abstract() {
        let module = parse(
            "enum Color { Red; Rgb(r:Int, g:Int, b:Int); }\nenum abstract Level(Int) { var Low = 1; var High = 2; }\n@:enum abstract Kind(String) to String { var A = 'a'; }",
        );
        let color = &module.types[0].node;
        assert_eq!(color.enum_values.len(), 2);
        assert_eq!(color.enum_values[1].node.params.len(), 3);
        assert!(module.types[1].node.is_enum_abstract());
        assert!(module.types[2].node.is_enum_abstract());
        assert_eq!(module.types[1].node.members.len(), 2);
    }

    #[test]
    fn parse_anonymous_extension() {
        let module = parse("typedef Point3 = { > Point, z:Int };");
        let decl = &module.types[0].node;
        assert!(decl.is_anonymous());
        assert_eq!(decl.extends.len(), 1);
        assert_eq!(decl.extends[0].node.to_string(), "Point");
    }

    #[test]
    fn parse_typedefs() {
        let module = parse("typedef Point = { x:Int, ?y:Int };\ntypedef Cb = Int -> String -> Void;\ntypedef Fn2 = (a:Int, ?b:Int) -> Bool;");
        assert!(module.types[0].node.is_anonymous());
        match &module.types[1].node.alias.as_ref().unwrap().node {
            TypeTag::Function { params, ret } => {
                assert_eq!(params.len(), 2);
                assert!(ret.is_some());
            }
            other => panic!("expected function type, got {other:?}"),
        }
        match &module.types[2].node.alias.as_ref().unwrap().node {
            TypeTag::Function { params, .. } => {
                assert_eq!(params[0].name.as_ref().unwrap().node, "a");
                assert!(params[1].optional);
            }
            other => panic!("expected function type, got {other:?}"),
        }
    }

    #[test]
    fn parse_nested_generics_with_assignment() {
        let module = parse("class A { var m:Map<String, Array<Int>>= null; }");
        let Member::Field(m) = &class_members(&module)[0] else { panic!("expected field") };
        assert!(m.node.init.is_some());
        match &m.node.type_tag.as_ref().unwrap().node {
            TypeTag::Named { path, args } => {
                assert_eq!(path.node, "Map");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected named type, got {other:?}"),
        }
    }

    #[test]
    fn parse_operator_precedence() {
        let expr = parse_expression("1 + 2 * 3").unwrap();
        match expr.node {
            Expr::Binary { op: BinOp::Add, rhs, .. } => {
                assert!(matches!(rhs.node, Expr::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("expected addition, got {other:?}"),
        }
    }

    #[test]
    fn parse_shift_right_from_two_tokens() {
        let expr = parse_expression("a >> 2").unwrap();
        assert!(matches!(expr.node, Expr::Binary { op: BinOp::Shr, .. }));
        let expr = parse_expression("a > b").unwrap();
        assert!(matches!(expr.node, Expr::Binary { op: BinOp::Gt, .. }));
    }

    #[test]
    fn parse_assignment_is_right_associative() {
        let expr = parse_expression("a = b += 1").unwrap();
        match expr.node {
            Expr::Assign { op: None, value, .. } => {
                assert!(matches!(value.node, Expr::Assign { op: Some(BinOp::Add), .. }));
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn parse_object_literal_vs_block() {
        assert!(matches!(parse_expression("{ x: 1, y: 2 }").unwrap().node, Expr::ObjectLit(ref f) if f.len() == 2));
        assert!(matches!(parse_expression("{ foo(); bar; }").unwrap().node, Expr::Block(ref s) if s.len() == 2));
    }

    #[test]
    fn parse_control_flow() {
        let expr = parse_expression(
            "{ if (a) b; else c; while (x) y(); for (i in 0...10) trace(i); switch (v) { case 1, 2: a; default: b; } try foo() catch (e:Dynamic) {} }",
        )
        .unwrap();
        let Expr::Block(stmts) = expr.node else { panic!("expected block") };
        assert!(matches!(stmts[0].node, Expr::If { else_branch: Some(_), .. }));
        assert!(matches!(stmts[1].node, Expr::While { do_while: false, .. }));
        assert!(matches!(stmts[2].node, Expr::For { .. }));
        match &stmts[3].node {
            Expr::Switch { cases, default, .. } => {
                assert_eq!(cases[0].values.len(), 2);
                assert!(default.is_some());
            }
            other => panic!("expected switch, got {other:?}"),
        }
        assert!(matches!(stmts[4].node, Expr::Try { ref catches, .. } if catches.len() == 1));
    }

    #[test]
    fn parse_casts_and_functions() {
        assert!(matches!(parse_expression("cast x").unwrap().node, Expr::Cast { ty: None, .. }));
        assert!(matches!(parse_expression("cast(x, Foo)").unwrap().node, Expr::Cast { ty: Some(_), .. }));
        match parse_expression("function(a:Int):Int return a + 1").unwrap().node {
            Expr::Function(lit) => {
                assert!(lit.name.is_none());
                assert_eq!(lit.params.len(), 1);
                assert!(lit.return_tag.is_some());
            }
            other => panic!("expected function literal, got {other:?}"),
        }
    }

    #[test]
    fn parse_single_quote_interpolation() {
        let src = "'a $name b ${x + 1}'";
        let expr = parse_expression(src).unwrap();
        let Expr::Str(lit) = expr.node else { panic!("expected string") };
        assert_eq!(lit.quote, Quote::Single);
        assert!(lit.has_interpolation());
        assert_eq!(lit.parts.len(), 4);
        match &lit.parts[1] {
            StringPart::Interp { expr, raw } => {
                assert_eq!(raw, "$name");
                assert_eq!(&src[expr.span.start..expr.span.end], "name");
            }
            other => panic!("expected interpolation, got {other:?}"),
        }
        match &lit.parts[3] {
            StringPart::Interp { expr, .. } => {
                assert!(matches!(expr.node, Expr::Binary { op: BinOp::Add, .. }));
                assert_eq!(&src[expr.span.start..expr.span.end], "x + 1");
            }
            other => panic!("expected interpolation, got {other:?}"),
        }
        assert_eq!(lit.constant_text(), None);
    }

    #[test]
    fn parse_double_quote_keeps_raw_text() {
        let Expr::Str(lit) = parse_expression(r#""cost: $price\n""#).unwrap().node else {
            panic!("expected string")
        };
        assert_eq!(lit.quote, Quote::Double);
        assert!(lit.has_interpolation());
        assert_eq!(lit.constant_text().as_deref(), Some("cost: $price\n"));
    }

    #[test]
    fn parse_dollar_escape() {
        let Expr::Str(lit) = parse_expression("'$$5'").unwrap().node else { panic!("expected string") };
        assert!(!lit.has_interpolation());
        assert_eq!(lit.constant_text().as_deref(), Some("$5"));
    }

    #[test]
    fn parse_error_reports_location() {
        let err = parse_module("class A { var x:Int = ; }", 0, None).unwrap_err();
        match err {
            AnalysisError::Syntax { msg, span } => {
                assert!(msg.contains("expected expression"), "{msg}");
                assert_eq!(span.start, 22);
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn parse_unterminated_interpolation_fails() {
        assert!(parse_expression("'${a'").is_err());
    }

    /// Run `f` on a thread with the default 2 MiB test stack.
    fn on_small_stack<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
        std::thread::Builder::new()
            .name("small-stack".into())
            .stack_size(2 * 1024 * 1024)
            .spawn(f)
            .unwrap()
            .join()
            .unwrap()
    }

    fn nesting_error(src: String) -> String {
        on_small_stack(move || match parse_module(&src, 0, None) {
            Err(AnalysisError::Syntax { msg, .. }) => msg,
            other => panic!("expected syntax error, got {other:?}"),
        })
    }

    #[test]
    fn parse_deep_nesting_is_a_syntax_error() {
        let parens = format!("class Main {{ var x = {}1{}; }}", "(".repeat(500), ")".repeat(500));
        assert_eq!(nesting_error(parens), "expression nested too deeply");

        let unary = format!("class Main {{ var x = {}1; }}", "-".repeat(500));
        assert_eq!(nesting_error(unary), "expression nested too deeply");

        let chain = format!("class Main {{ var x = 1{}; }}", " + 1".repeat(500));
        assert_eq!(nesting_error(chain), "expression nested too deeply");

        let calls = format!("class Main {{ var x = f{}; }}", "()".repeat(500));
        assert_eq!(nesting_error(calls), "expression nested too deeply");

        let tag = format!("class Main {{ var x:{}Int{}; }}", "Array<".repeat(200), ">".repeat(200));
        assert_eq!(nesting_error(tag), "expression nested too deeply");
    }

    #[test]
    fn parse_moderate_nesting_succeeds() {
        let src = format!(
            "class Main {{ var x = {}1{}; var y = 1{}; }}",
            "(".repeat(20),
            ")".repeat(20),
            " + 1".repeat(40)
        );
        let module = on_small_stack(move || parse_module(&src, 0, None).is_ok());
        assert!(module);
    }

    #[test]
    fn parse_depth_resets_between_members() {
        let field = |name: &str| format!("var {name} = {}1{};", "(".repeat(25), ")".repeat(25));
        let src = format!("class Main {{ {} {} {} }}", field("a"), field("b"), field("c"));
        assert!(parse_module(&src, 0, None).is_ok());
    }
}
