use std::rc::Rc;

use log::trace;

use crate::ast::{AstNode, NodeKind};
use crate::lexer::TokenKind;
use crate::name::Name;
use crate::program::{
    AccessSpecifier, BaseClass, Entity, FunctionData, FunctionKind, FunctionParameter,
    FunctionSpecifiers, VariableData, VariableSpecifiers,
};
use crate::template::TemplateParameter;
use crate::types::Type;

use super::{ParseError, ParseResult, ParseSession};

/// Template parameters of a `template<...>` head, paired with their CST
/// nodes so the following declaration can adopt them in source order.
pub(crate) type TemplateClause = Vec<(TemplateParameter, Rc<AstNode>)>;

/// What the statement disambiguator decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Detected {
    Expression,
    Function,
    Variable,
    Unexposed,
}

fn is_function_or_var_specifier(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Inline | TokenKind::Static | TokenKind::Mutable
    )
}

impl<'a> ParseSession<'a> {
    /// Disambiguate between an expression statement, a variable
    /// declaration and a function declaration, then parse it.
    pub(crate) fn parse_detected_statement(&mut self) -> ParseResult<Rc<AstNode>> {
        let token = self.cursor.peek()?;

        match self.detect_statement() {
            Detected::Expression => self.parse_expression_statement(),
            Detected::Function => self.parse_function_decl(vec![]),
            Detected::Variable => self.parse_var_decl(),
            Detected::Unexposed => Err(ParseError::not_implemented(
                "statement",
                Some(token.position()),
            )),
        }
    }

    /// The disambiguator proper. Runs entirely under cursor save/restore;
    /// the expression fallback is only admissible inside function bodies.
    fn detect_statement(&mut self) -> Detected {
        let save = self.cursor.index();

        let mut can_be_expr = self.in_function_body;
        let detected = (|| -> ParseResult<Detected> {
            match self.cursor.peek_kind() {
                Some(TokenKind::Virtual) | Some(TokenKind::Override) | Some(TokenKind::Explicit) => {
                    return Ok(Detected::Function);
                }
                _ => {}
            }

            while let Some(kind) = self.cursor.peek_kind() {
                if !is_function_or_var_specifier(kind) {
                    break;
                }
                can_be_expr = false;
                self.cursor.read()?;
            }

            let ty = self.parse_type()?;
            self.parse_name()?;

            let next = self.cursor.peek()?;
            match next.kind {
                TokenKind::LeftBrace | TokenKind::Semicolon | TokenKind::Eq => {
                    Ok(Detected::Variable)
                }
                TokenKind::LeftParen => {
                    self.cursor.read()?;
                    let right_par = self.cursor.matching_paren()?;

                    if self.cursor.kind_at(right_par + 1) == Some(TokenKind::Semicolon) {
                        // still ambiguous; only a void return type settles it
                        if ty.to_string() == "void" {
                            Ok(Detected::Function)
                        } else {
                            Err(ParseError::not_implemented(
                                "ambiguous declaration",
                                Some(next.position()),
                            ))
                        }
                    } else {
                        Ok(Detected::Function)
                    }
                }
                _ => Ok(Detected::Unexposed),
            }
        })();

        self.cursor.set_index(save);

        match detected {
            Ok(Detected::Unexposed) | Err(_) => {
                if can_be_expr {
                    Detected::Expression
                } else {
                    Detected::Unexposed
                }
            }
            Ok(d) => d,
        }
    }

    /// Parse specifiers, return type, name, parameter list and the
    /// post-signature qualifiers (`const`, `noexcept`,
    /// `override`/`final`/`= 0`). Returns the new function entity together
    /// with the parsed name, which the caller needs for scope resolution.
    pub(crate) fn parse_function_signature(&mut self) -> ParseResult<(Rc<Entity>, Name)> {
        let mut specifiers = FunctionSpecifiers::none();

        loop {
            match self.cursor.peek_kind() {
                Some(TokenKind::Virtual) => {
                    self.cursor.read()?;
                    specifiers.insert(FunctionSpecifiers::VIRTUAL);
                }
                Some(TokenKind::Static) => {
                    self.cursor.read()?;
                    specifiers.insert(FunctionSpecifiers::STATIC);
                }
                Some(TokenKind::Inline) => {
                    self.cursor.read()?;
                    specifiers.insert(FunctionSpecifiers::INLINE);
                }
                Some(TokenKind::Constexpr) => {
                    self.cursor.read()?;
                    specifiers.insert(FunctionSpecifiers::CONSTEXPR);
                }
                Some(TokenKind::Explicit) => {
                    self.cursor.read()?;
                    specifiers.insert(FunctionSpecifiers::EXPLICIT);
                }
                _ => break,
            }
        }

        // destructors and conversion functions carry no leading return type
        let (return_type, name) = match self.cursor.peek_kind() {
            Some(TokenKind::Tilde) => {
                let name = self.parse_name()?;
                (Type::simple("void"), name)
            }
            Some(TokenKind::Operator) => {
                let name = self.parse_name()?;
                let Name::Conversion(ty) = &name else {
                    let token = self.cursor.peek()?;
                    return Err(ParseError::unexpected("return type", &token));
                };
                ((**ty).clone(), name)
            }
            _ => {
                let return_type = self.parse_type()?;
                let name = self.parse_name()?;
                (return_type, name)
            }
        };

        let mut data = FunctionData::new(return_type);
        data.specifiers = specifiers;
        data.kind = match name.unqualified() {
            Name::Operator(_) | Name::LiteralOperator(_) => FunctionKind::OperatorOverload,
            Name::Conversion(_) => FunctionKind::ConversionFunction,
            Name::Destructor(_) => FunctionKind::Destructor,
            _ => FunctionKind::None,
        };

        self.cursor.expect(TokenKind::LeftParen, "'('")?;

        let params = &mut data.parameters;
        self.with_paren_view(|s| {
            while !s.cursor.at_end() {
                let param = s.with_list_view(true, |s| s.parse_function_parameter())?;
                params.push(param);

                if !s.cursor.at_end() {
                    s.cursor.expect(TokenKind::Comma, "','")?;
                }
            }
            Ok(())
        })?;

        self.cursor.expect(TokenKind::RightParen, "')'")?;

        let at_stop = |s: &Self| {
            s.cursor.at_end()
                || matches!(
                    s.cursor.peek_kind(),
                    Some(TokenKind::Semicolon) | Some(TokenKind::LeftBrace)
                )
        };

        let finish = |data: FunctionData| {
            let entity = Entity::function(name.to_string(), data);
            (entity, name.clone())
        };

        if at_stop(self) {
            return Ok(finish(data));
        }

        let mut token = self.cursor.read()?;

        if token.kind == TokenKind::Const {
            data.specifiers.insert(FunctionSpecifiers::CONST);

            if at_stop(self) {
                return Ok(finish(data));
            }
            token = self.cursor.read()?;
        }

        if token.kind == TokenKind::Noexcept {
            data.specifiers.insert(FunctionSpecifiers::NOEXCEPT);

            if at_stop(self) {
                return Ok(finish(data));
            }
            token = self.cursor.read()?;
        }

        match token.kind {
            TokenKind::Override => data.specifiers.insert(FunctionSpecifiers::OVERRIDE),
            TokenKind::Final => data.specifiers.insert(FunctionSpecifiers::FINAL),
            TokenKind::Eq => {
                let zero = self.cursor.read()?;

                if zero.kind == TokenKind::OctalLiteral && zero.text == "0" {
                    data.specifiers.insert(FunctionSpecifiers::PURE);
                } else {
                    return Err(ParseError::unexpected("'0'", &zero));
                }
            }
            _ => return Err(ParseError::unexpected("function qualifier", &token)),
        }

        if !at_stop(self) {
            let token = self.cursor.peek()?;
            return Err(ParseError::unexpected("';' or '{'", &token));
        }

        Ok(finish(data))
    }

    /// One parameter inside the signature's list view: type, optional
    /// name, optional `= default` captured as raw text.
    fn parse_function_parameter(&mut self) -> ParseResult<FunctionParameter> {
        let ty = self.parse_type()?;
        let mut param = FunctionParameter::new(ty, "");

        if self.cursor.at_end() {
            return Ok(param);
        }

        if self.cursor.peek()?.kind.is_identifier() {
            param.name = self.cursor.read()?.text.to_string();
        }

        if self.cursor.at_end() {
            return Ok(param);
        }

        self.cursor.expect(TokenKind::Eq, "'='")?;

        let text = self.cursor.text_to_end().to_string();
        while !self.cursor.at_end() {
            self.cursor.read()?;
        }
        param.default_value = Some(text);

        Ok(param)
    }

    /// A function declaration: signature, re-declaration merge, then `;`
    /// or a body.
    pub(crate) fn parse_function_decl(
        &mut self,
        template_clause: TemplateClause,
    ) -> ParseResult<Rc<AstNode>> {
        let node = AstNode::new(NodeKind::FunctionDeclaration);
        let first = self.cursor.peek()?;

        for (_, param_node) in &template_clause {
            node.append(param_node);
        }

        let decl = Rc::clone(&node);
        self.with_ast_node(&node, move |s| {
            let (mut fun, name) = s.parse_function_signature()?;

            if !template_clause.is_empty() {
                fun.as_function_mut().unwrap().template_parameters =
                    template_clause.iter().map(|(p, _)| p.clone()).collect();
            }

            // resolve a qualified name to its target scope; fall back to
            // the current scope under the full name
            let scope = s.scope();
            let mut target = scope.clone();
            let mut local_name = name.unqualified().to_string();

            if name.is_qualified() {
                let mut resolved = None;

                if let (Some(program), Some(scope)) = (&s.program, &scope) {
                    let segments = name.segments();
                    let qualifier = Name::qualified(
                        segments[..segments.len() - 1].iter().map(|&n| n.clone()).collect(),
                    );
                    resolved = program
                        .resolve(&qualifier, scope)
                        .filter(|e| e.is_namespace() || e.is_class());
                }

                match resolved {
                    Some(entity) => target = Some(entity),
                    None => local_name = name.to_string(),
                }
            }

            let equivalent = target
                .as_ref()
                .and_then(|scope| find_equivalent_function(scope, &local_name, &fun));

            match equivalent {
                Some(existing) => {
                    trace!("merging re-declaration of '{local_name}'");
                    merge_functions(&existing, &fun);
                    fun = existing;
                }
                None => {
                    fun.set_name(local_name);

                    if let Some(scope) = &target {
                        if scope.is_class() {
                            fun.set_access(s.access);
                        }
                        scope.add_child(&fun);
                    }
                }
            }

            s.bind(&fun, &decl);

            if s.cursor.peek_kind() == Some(TokenKind::Semicolon) {
                s.cursor.read()?;
            } else if let Some(body) = s.parse_function_body()? {
                decl.append(&body);
                fun.as_function_mut().unwrap().body = Some(body);
            }

            Ok(())
        })?;

        self.finish_node(&node, first);
        Ok(node)
    }

    fn parse_function_body(&mut self) -> ParseResult<Option<Rc<AstNode>>> {
        if self.skip_function_bodies {
            self.cursor.expect(TokenKind::LeftBrace, "'{'")?;
            self.with_brace_view(|s| {
                let (_, end) = s.cursor.bounds();
                s.cursor.set_index(end);
                Ok(())
            })?;
            self.cursor.expect(TokenKind::RightBrace, "'}'")?;
            return Ok(None);
        }

        let body = self.with_function_body(|s| s.parse_compound_statement())?;
        Ok(Some(body))
    }

    /// Specifiers, type, name and optional `= default` of a variable.
    pub(crate) fn parse_variable_entity(&mut self) -> ParseResult<Rc<Entity>> {
        let mut specifiers = VariableSpecifiers::none();

        loop {
            match self.cursor.peek_kind() {
                Some(TokenKind::Inline) => {
                    self.cursor.read()?;
                    specifiers.insert(VariableSpecifiers::INLINE);
                }
                Some(TokenKind::Static) => {
                    self.cursor.read()?;
                    specifiers.insert(VariableSpecifiers::STATIC);
                }
                Some(TokenKind::Constexpr) => {
                    self.cursor.read()?;
                    specifiers.insert(VariableSpecifiers::CONSTEXPR);
                }
                _ => break,
            }
        }

        let ty = self.parse_type()?;
        let name = self.parse_name()?;

        let mut data = VariableData::new(ty);
        data.specifiers = specifiers;

        if !self.cursor.at_end() && self.cursor.peek_kind() != Some(TokenKind::Semicolon) {
            self.cursor.expect(TokenKind::Eq, "'='")?;
            let expr = self.parse_expression_node();
            data.default_value = expr.text();
        }

        Ok(Entity::variable(name.to_string(), data))
    }

    /// A variable declaration statement. Inside function bodies the
    /// declaration stays a pure CST node; no entity joins the program.
    pub(crate) fn parse_var_decl(&mut self) -> ParseResult<Rc<AstNode>> {
        let node = AstNode::new(NodeKind::VariableDeclaration);
        let first = self.cursor.peek()?;

        let decl = Rc::clone(&node);
        self.with_ast_node(&node, |s| {
            let variable =
                s.with_sentinel_view(TokenKind::Semicolon, false, |s| s.parse_variable_entity())?;

            if !s.in_function_body {
                if let Some(scope) = s.scope() {
                    if scope.is_class() {
                        variable.set_access(s.access);
                    }
                    scope.add_child(&variable);
                    s.bind(&variable, &decl);
                }
            }

            Ok(())
        })?;

        let semicolon = self.cursor.expect(TokenKind::Semicolon, "';'")?;
        self.localize(&node, first, semicolon);

        Ok(node)
    }

    /// `class`/`struct`: optional `final`, optional base clause, then a
    /// forward declaration or a member body. The entity is reused when the
    /// scope already knows the name.
    pub(crate) fn parse_class_decl(
        &mut self,
        template_clause: Option<TemplateClause>,
    ) -> ParseResult<Rc<AstNode>> {
        let node = AstNode::new(NodeKind::ClassDeclaration);
        let keyword = self.cursor.read()?;
        let is_struct = keyword.kind == TokenKind::Struct;

        if let Some(clause) = &template_clause {
            for (_, param_node) in clause {
                node.append(param_node);
            }
        }

        let name = self.parse_name()?.to_string();

        let mut is_final = false;
        if self.cursor.peek_kind() == Some(TokenKind::Final) {
            self.cursor.read()?;
            is_final = true;
        }

        let mut bases = vec![];
        if self.cursor.peek_kind() == Some(TokenKind::Colon) {
            self.cursor.read()?;

            loop {
                let mut access = if is_struct {
                    AccessSpecifier::Public
                } else {
                    AccessSpecifier::Private
                };

                match self.cursor.peek_kind() {
                    Some(TokenKind::Public) => {
                        self.cursor.read()?;
                        access = AccessSpecifier::Public;
                    }
                    Some(TokenKind::Protected) => {
                        self.cursor.read()?;
                        access = AccessSpecifier::Protected;
                    }
                    Some(TokenKind::Private) => {
                        self.cursor.read()?;
                        access = AccessSpecifier::Private;
                    }
                    _ => {}
                }

                bases.push((access, self.parse_name()?));

                if self.cursor.peek_kind() == Some(TokenKind::Comma) {
                    self.cursor.read()?;
                } else {
                    break;
                }
            }
        }

        let scope = self.scope();
        let entity = match &scope {
            Some(scope) if scope.is_namespace() => scope.get_or_create_class(&name, is_struct),
            Some(scope) if scope.is_class() => match scope.find(&name) {
                Some(existing) if existing.is_class() => existing,
                _ => {
                    let class = Entity::class(&name, is_struct);
                    class.set_access(self.access);
                    scope.add_child(&class);
                    class
                }
            },
            _ => Entity::class(&name, is_struct),
        };

        let mut resolved_bases = vec![];
        for (access, base_name) in bases {
            let resolved = match (&self.program, &scope) {
                (Some(program), Some(scope)) => program
                    .resolve(&base_name, scope)
                    .filter(|e| e.is_class() && !Rc::ptr_eq(e, &entity))
                    .map(|e| Rc::downgrade(&e)),
                _ => None,
            };

            resolved_bases.push(BaseClass {
                access,
                name: base_name.to_string(),
                base: resolved.unwrap_or_default(),
            });
        }

        {
            let mut data = entity.as_class_mut().unwrap();
            data.is_struct = is_struct;

            if is_final {
                data.is_final = true;
            }

            if let Some(clause) = template_clause {
                data.template_parameters =
                    Some(clause.into_iter().map(|(p, _)| p).collect());
            }

            data.bases.extend(resolved_bases);
        }

        // forward declaration: a node, but no new entity and no body
        if self.cursor.peek_kind() == Some(TokenKind::Semicolon) {
            let semicolon = self.cursor.read()?;
            node.set_entity(&entity);
            self.localize(&node, keyword, semicolon);
            return Ok(node);
        }

        let default_access = if is_struct {
            AccessSpecifier::Public
        } else {
            AccessSpecifier::Private
        };

        self.cursor.expect(TokenKind::LeftBrace, "'{'")?;

        let decl = Rc::clone(&node);
        self.with_access(default_access, |s| {
            s.with_ast_node(&decl.clone(), |s| {
                s.with_scope(&entity, |s| {
                    s.with_brace_view(|s| {
                        while !s.cursor.at_end() {
                            let stmt = s.parse_statement()?;
                            decl.append(&stmt);
                        }
                        Ok(())
                    })
                })
            })
        })?;

        self.cursor.expect(TokenKind::RightBrace, "'}'")?;
        let semicolon = self.cursor.expect(TokenKind::Semicolon, "';'")?;

        self.bind(&entity, &node);
        self.localize(&node, keyword, semicolon);

        Ok(node)
    }

    /// `enum` / `enum class`: name, optional underlying type, enumerators
    /// with optional `= value` text.
    pub(crate) fn parse_enum_decl(&mut self) -> ParseResult<Rc<AstNode>> {
        let node = AstNode::new(NodeKind::EnumDeclaration);
        let keyword = self.cursor.expect(TokenKind::Enum, "'enum'")?;

        let enum_class = matches!(
            self.cursor.peek_kind(),
            Some(TokenKind::Class) | Some(TokenKind::Struct)
        );
        if enum_class {
            self.cursor.read()?;
        }

        let name = self.parse_name()?.to_string();

        let scope = self.scope();
        let entity = match &scope {
            Some(scope) if scope.is_namespace() => scope.get_or_create_enum(&name, enum_class),
            Some(scope) if scope.is_class() => match scope.find(&name) {
                Some(existing) if existing.is_enum() => existing,
                _ => {
                    let e = Entity::enumeration(&name, enum_class);
                    e.set_access(self.access);
                    scope.add_child(&e);
                    e
                }
            },
            _ => Entity::enumeration(&name, enum_class),
        };
        entity.as_enum_mut().unwrap().enum_class = enum_class;

        if self.cursor.peek_kind() == Some(TokenKind::Semicolon) {
            let semicolon = self.cursor.read()?;
            node.set_entity(&entity);
            self.localize(&node, keyword, semicolon);
            return Ok(node);
        }

        // optional underlying type, not retained in the model
        if self.cursor.peek_kind() == Some(TokenKind::Colon) {
            self.cursor.read()?;
            self.with_sentinel_view(TokenKind::LeftBrace, false, |s| {
                let _ = s.parse_type()?;
                s.expect_at_end()
            })?;
        }

        self.cursor.expect(TokenKind::LeftBrace, "'{'")?;

        let decl = Rc::clone(&node);
        let values = Rc::clone(&entity);
        self.with_ast_node(&node, |s| {
            s.with_scope(&entity, |s| {
                s.with_brace_view(|s| {
                    while !s.cursor.at_end() {
                        let enumerator = s.with_list_view(false, |s| {
                            let enumerator = AstNode::new(NodeKind::EnumeratorDeclaration);
                            let first = s.cursor.read()?;

                            if !first.kind.is_identifier() {
                                return Err(ParseError::unexpected("enumerator name", &first));
                            }

                            let mut value = None;
                            if !s.cursor.at_end() {
                                s.cursor.expect(TokenKind::Eq, "'='")?;
                                value = s.parse_expression_node().text();
                            }

                            let value_entity = Entity::enum_value(first.text, value);
                            values.add_child(&value_entity);
                            s.bind(&value_entity, &enumerator);
                            s.finish_node(&enumerator, first);

                            Ok(enumerator)
                        })?;
                        decl.append(&enumerator);

                        if !s.cursor.at_end() {
                            s.cursor.expect(TokenKind::Comma, "','")?;
                        }
                    }
                    Ok(())
                })
            })
        })?;

        self.cursor.expect(TokenKind::RightBrace, "'}'")?;
        let semicolon = self.cursor.expect(TokenKind::Semicolon, "';'")?;

        self.bind(&entity, &node);
        self.localize(&node, keyword, semicolon);

        Ok(node)
    }

    /// `namespace N { ... }`: reuses or creates the namespace in the
    /// enclosing namespace.
    pub(crate) fn parse_namespace_decl(&mut self) -> ParseResult<Rc<AstNode>> {
        let node = AstNode::new(NodeKind::NamespaceDeclaration);
        let keyword = self.cursor.expect(TokenKind::Namespace, "'namespace'")?;

        let name = self.parse_name()?.to_string();

        let scope = self.scope();
        let parent = match &scope {
            Some(scope) if scope.is_namespace() => Rc::clone(scope),
            _ => {
                return Err(ParseError::not_implemented(
                    "namespace outside of a namespace",
                    Some(keyword.position()),
                ))
            }
        };

        let ns = parent.get_or_create_namespace(&name);
        node.set_entity(&ns);

        self.cursor.expect(TokenKind::LeftBrace, "'{'")?;

        let decl = Rc::clone(&node);
        self.with_ast_node(&node, |s| {
            s.with_scope(&ns, |s| {
                s.with_brace_view(|s| {
                    while !s.cursor.at_end() {
                        let stmt = s.parse_statement()?;
                        decl.append(&stmt);
                    }
                    Ok(())
                })
            })
        })?;

        let right_brace = self.cursor.expect(TokenKind::RightBrace, "'}'")?;
        self.localize(&node, keyword, right_brace);

        Ok(node)
    }

    /// `typedef Type Name;`
    pub(crate) fn parse_typedef_decl(&mut self) -> ParseResult<Rc<AstNode>> {
        let node = AstNode::new(NodeKind::TypedefDeclaration);
        let keyword = self.cursor.expect(TokenKind::Typedef, "'typedef'")?;

        let decl = Rc::clone(&node);
        self.with_ast_node(&node, |s| {
            let ty = s.with_sentinel_view(TokenKind::Semicolon, false, |s| {
                let ty = s.parse_type()?;
                Ok(ty)
            })?;

            let name = s.cursor.read()?;
            if !name.kind.is_identifier() {
                return Err(ParseError::unexpected("identifier", &name));
            }

            let entity = Entity::typedef(name.text, ty);

            if let Some(scope) = s.scope() {
                if scope.is_class() {
                    entity.set_access(s.access);
                }
                scope.add_child(&entity);
            }

            s.bind(&entity, &decl);
            Ok(())
        })?;

        let semicolon = self.cursor.expect(TokenKind::Semicolon, "';'")?;
        self.localize(&node, keyword, semicolon);

        Ok(node)
    }

    /// Only the alias form `using Name = Type;` is supported; it yields a
    /// typedef entity.
    pub(crate) fn parse_using_decl(&mut self) -> ParseResult<Rc<AstNode>> {
        let node = AstNode::new(NodeKind::TypedefDeclaration);
        let keyword = self.cursor.expect(TokenKind::Using, "'using'")?;

        let name = self.cursor.read()?;
        if !name.kind.is_identifier() || name.kind == TokenKind::Namespace {
            return Err(ParseError::not_implemented(
                "using declaration",
                Some(keyword.position()),
            ));
        }

        if self.cursor.peek_kind() != Some(TokenKind::Eq) {
            return Err(ParseError::not_implemented(
                "using declaration",
                Some(keyword.position()),
            ));
        }
        self.cursor.read()?;

        let ty = self.with_sentinel_view(TokenKind::Semicolon, false, |s| {
            let ty = s.parse_type()?;
            s.expect_at_end()?;
            Ok(ty)
        })?;

        let entity = Entity::typedef(name.text, ty);

        if let Some(scope) = self.scope() {
            if scope.is_class() {
                entity.set_access(self.access);
            }
            scope.add_child(&entity);
        }

        self.bind(&entity, &node);

        let semicolon = self.cursor.expect(TokenKind::Semicolon, "';'")?;
        self.localize(&node, keyword, semicolon);

        Ok(node)
    }

    /// `template < parameter-list >` followed by a class or function
    /// declaration.
    pub(crate) fn parse_template_decl(&mut self) -> ParseResult<Rc<AstNode>> {
        let keyword = self.cursor.expect(TokenKind::Template, "'template'")?;
        self.cursor.expect(TokenKind::LeftAngle, "'<'")?;

        let mut clause: TemplateClause = vec![];

        let ((), split) = self.with_angle_view(|s| {
            while !s.cursor.at_end() {
                let param = s.with_list_view(true, |s| s.parse_delimited_template_parameter())?;
                clause.push(param);

                if !s.cursor.at_end() {
                    s.cursor.expect(TokenKind::Comma, "','")?;
                }
            }
            Ok(())
        })?;

        if !split {
            self.cursor.expect(TokenKind::RightAngle, "'>'")?;
        }

        let node = match self.cursor.peek_kind() {
            Some(TokenKind::Class) | Some(TokenKind::Struct) => {
                self.parse_class_decl(Some(clause))?
            }
            Some(_) => self.parse_function_decl(clause)?,
            None => {
                return Err(ParseError::UnexpectedEndOfInput {
                    position: Some(keyword.position()),
                })
            }
        };

        self.finish_node(&node, keyword);
        Ok(node)
    }

    /// One template parameter inside its list view: `typename`/`class`
    /// with optional default type, or a non-type parameter with optional
    /// default text.
    fn parse_delimited_template_parameter(
        &mut self,
    ) -> ParseResult<(TemplateParameter, Rc<AstNode>)> {
        let node = AstNode::new(NodeKind::TemplateParameterDeclaration);
        let first = self.cursor.peek()?;

        let parameter = match first.kind {
            TokenKind::Typename | TokenKind::Class => {
                self.cursor.read()?;

                let mut name = String::new();
                if !self.cursor.at_end() && self.cursor.peek()?.kind.is_identifier() {
                    name = self.cursor.read()?.text.to_string();
                }

                let mut default = None;
                if !self.cursor.at_end() {
                    self.cursor.expect(TokenKind::Eq, "'='")?;
                    default = Some(self.parse_type()?);
                    self.expect_at_end()?;
                }

                TemplateParameter::Type { name, default }
            }
            _ => {
                let ty = self.parse_type()?;

                let mut name = String::new();
                if !self.cursor.at_end() && self.cursor.peek()?.kind.is_identifier() {
                    name = self.cursor.read()?.text.to_string();
                }

                let mut default = None;
                if !self.cursor.at_end() {
                    self.cursor.expect(TokenKind::Eq, "'='")?;
                    let text = self.cursor.text_to_end().to_string();
                    while !self.cursor.at_end() {
                        self.cursor.read()?;
                    }
                    default = Some(text);
                }

                TemplateParameter::NonType { ty, name, default }
            }
        };

        self.finish_node(&node, first);
        Ok((parameter, node))
    }

    /// `public:` / `protected:` / `private:` inside a class body; applies
    /// to entities added afterwards until the class scope ends.
    pub(crate) fn parse_access_specifier(&mut self) -> ParseResult<Rc<AstNode>> {
        let node = AstNode::new(NodeKind::AccessSpecifierDeclaration);
        let keyword = self.cursor.read()?;
        let colon = self.cursor.expect(TokenKind::Colon, "':'")?;

        self.access = match keyword.kind {
            TokenKind::Public => AccessSpecifier::Public,
            TokenKind::Protected => AccessSpecifier::Protected,
            _ => AccessSpecifier::Private,
        };

        self.localize(&node, keyword, colon);
        Ok(node)
    }

    /// `NAME`, `NAME(a, b)` or `NAME(a, ...)`.
    pub(crate) fn parse_macro_entity(&mut self) -> ParseResult<Rc<Entity>> {
        let name = self.cursor.expect(TokenKind::Identifier, "identifier")?;
        let mut parameters = vec![];

        if self.cursor.at_end() {
            return Ok(Entity::macro_def(name.text, parameters));
        }

        self.cursor.expect(TokenKind::LeftParen, "'('")?;

        if self.cursor.peek_kind() == Some(TokenKind::RightParen) {
            self.cursor.read()?;
            return Ok(Entity::macro_def(name.text, parameters));
        }

        loop {
            let token = self.cursor.read()?;

            if token.kind.is_identifier() {
                parameters.push(token.text.to_string());

                let separator = self.cursor.read()?;
                match separator.kind {
                    TokenKind::Comma => continue,
                    TokenKind::RightParen => break,
                    _ => return Err(ParseError::unexpected("',' or ')'", &separator)),
                }
            } else if token.kind == TokenKind::Dot {
                self.cursor.expect(TokenKind::Dot, "'.'")?;
                self.cursor.expect(TokenKind::Dot, "'.'")?;
                parameters.push("...".to_string());
                self.cursor.expect(TokenKind::RightParen, "')'")?;
                break;
            } else {
                return Err(ParseError::unexpected("macro parameter", &token));
            }
        }

        Ok(Entity::macro_def(name.text, parameters))
    }
}

/// Structural equivalence search over the scope's functions: same local
/// name, parameter count, parameter types and return type.
fn find_equivalent_function(
    scope: &Rc<Entity>,
    name: &str,
    function: &Rc<Entity>,
) -> Option<Rc<Entity>> {
    let data = function.as_function()?;

    scope.children().into_iter().find(|candidate| {
        candidate.is_function()
            && candidate.name() == name
            && candidate
                .as_function()
                .map(|c| c.same_signature(&data))
                .unwrap_or(false)
    })
}

/// Merge a new declaration into the existing entity: promote parameter
/// defaults and the body, union the specifier sets.
fn merge_functions(existing: &Rc<Entity>, new: &Rc<Entity>) {
    let new_data = new.as_function().expect("merge source is a function");
    let mut data = existing.as_function_mut().expect("merge target is a function");

    for (i, param) in data.parameters.iter_mut().enumerate() {
        if param.default_value.is_none() {
            param.default_value = new_data.parameters[i].default_value.clone();
        }
    }

    if data.body.is_none() {
        data.body = new_data.body.clone();
    }

    data.specifiers = data.specifiers.union(new_data.specifiers);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::RestrictedParser;

    fn global_of(source: &str) -> (RestrictedParser, Rc<Entity>) {
        let mut parser = RestrictedParser::new();
        parser.parse_source(source).expect("should parse");
        let global = parser.program().global_namespace();
        (parser, global)
    }

    #[test]
    fn test_namespace_variable() {
        let (_, global) = global_of("namespace cfg { int verbosity = 2; }");

        let ns = global.find("cfg").expect("namespace entity");
        assert!(ns.is_namespace());

        let var = ns.find("verbosity").expect("variable entity");
        assert!(var.is_variable());
        assert_eq!(Some("2".to_string()), var.as_variable().unwrap().default_value);
        assert!(Rc::ptr_eq(&var.parent().unwrap(), &ns));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let (_, global) = global_of("void incr(int n);\nvoid incr(int n);\n");

        let functions: Vec<_> = global
            .children()
            .into_iter()
            .filter(|e| e.is_function())
            .collect();
        assert_eq!(1, functions.len());
        assert_eq!(1, functions[0].as_function().unwrap().parameters.len());
    }

    #[test]
    fn test_merge_promotes_default_arguments() {
        let (_, global) = global_of("void incr(int n);\nvoid incr(int n = 1);\n");

        let f = global.find("incr").expect("function entity");
        let data = f.as_function().unwrap();
        assert_eq!(Some("1".to_string()), data.parameters[0].default_value);
    }

    #[test]
    fn test_overloads_stay_distinct() {
        let (_, global) = global_of("void incr(int n);\nvoid incr(int n, int by) {}\n");

        let functions: Vec<_> = global
            .children()
            .into_iter()
            .filter(|e| e.is_function())
            .collect();
        assert_eq!(2, functions.len());
    }

    #[test]
    fn test_merge_promotes_body() {
        let (_, global) = global_of("void tick();\nvoid tick() { count = count + 1; }\n");

        let f = global.find("tick").expect("function entity");
        assert!(f.as_function().unwrap().body.is_some());
    }

    #[test]
    fn test_qualified_definition_merges_into_member() {
        let (_, global) = global_of(
            "namespace n { struct Foo { int bar() const; }; int n::Foo::bar() const { return -1; } }",
        );

        let ns = global.find("n").unwrap();
        assert_eq!(1, ns.children().len());

        let foo = ns.find("Foo").unwrap();
        assert!(foo.is_class());
        assert!(foo.as_class().unwrap().is_struct);

        let members = foo.children();
        assert_eq!(1, members.len());

        let bar = &members[0];
        assert_eq!("bar", bar.name());
        let data = bar.as_function().unwrap();
        assert!(data.specifiers.is_const());
        assert_eq!(Type::simple("int"), data.return_type);
        assert!(data.body.is_some());
    }

    #[test]
    fn test_class_member_access() {
        let (_, global) = global_of(
            "class Widget { int width; public: int height; protected: int depth; };",
        );

        let class = global.find("Widget").unwrap();
        let members = class.children();

        assert_eq!(AccessSpecifier::Private, members[0].access());
        assert_eq!(AccessSpecifier::Public, members[1].access());
        assert_eq!(AccessSpecifier::Protected, members[2].access());
    }

    #[test]
    fn test_struct_members_default_public() {
        let (_, global) = global_of("struct Point { int x; int y; };");

        let class = global.find("Point").unwrap();
        assert!(class.as_class().unwrap().is_struct);

        for member in class.children() {
            assert_eq!(AccessSpecifier::Public, member.access());
        }
    }

    #[test]
    fn test_forward_declaration_reuses_entity() {
        let (_, global) = global_of("class Widget;\nclass Widget { int x; };\nclass Widget;\n");

        let classes: Vec<_> = global
            .children()
            .into_iter()
            .filter(|e| e.is_class())
            .collect();
        assert_eq!(1, classes.len());
        assert_eq!(1, classes[0].children().len());
    }

    #[test]
    fn test_base_clause() {
        let (_, global) = global_of("class Base {};\nclass Derived : public Base {};\n");

        let derived = global.find("Derived").unwrap();
        let data = derived.as_class().unwrap();

        assert_eq!(1, data.bases.len());
        assert_eq!("Base", data.bases[0].name);
        assert!(data.bases[0].is_public());

        let base = data.bases[0].base().expect("resolved base");
        assert_eq!("Base", base.name());
    }

    #[test]
    fn test_enum_declaration() {
        let (_, global) = global_of("enum class Color { Red, Green = 2, Blue };");

        let color = global.find("Color").unwrap();
        assert!(color.is_enum());
        assert!(color.as_enum().unwrap().enum_class);

        let values = color.children();
        assert_eq!(3, values.len());
        assert_eq!("Red", values[0].name());
        assert_eq!(None, values[0].as_enum_value().unwrap().value);
        assert_eq!(
            Some("2".to_string()),
            values[1].as_enum_value().unwrap().value
        );
        assert!(Rc::ptr_eq(&values[2].parent().unwrap(), &color));
    }

    #[test]
    fn test_plain_enum_with_underlying_type() {
        let (_, global) = global_of("enum Flags : int { None, All };");

        let flags = global.find("Flags").unwrap();
        assert!(!flags.as_enum().unwrap().enum_class);
        assert_eq!(2, flags.children().len());
    }

    #[test]
    fn test_typedef_declaration() {
        let (_, global) = global_of("typedef int Length;");

        let td = global.find("Length").unwrap();
        assert!(td.is_typedef());
        assert_eq!(Type::simple("int"), td.as_typedef().unwrap().ty);
    }

    #[test]
    fn test_using_alias() {
        let (_, global) = global_of("using Text = std::string;");

        let td = global.find("Text").unwrap();
        assert!(td.is_typedef());
        assert_eq!("std::string", td.as_typedef().unwrap().ty.to_string());
    }

    #[test]
    fn test_using_namespace_is_not_implemented() {
        let mut parser = RestrictedParser::new();
        assert!(matches!(
            parser.parse_source("using namespace std;"),
            Err(ParseError::NotImplemented { .. })
        ));
    }

    #[test]
    fn test_class_template() {
        let (_, global) = global_of("template<typename T> class Box { T value; };");

        let class = global.find("Box").unwrap();
        let data = class.as_class().unwrap();

        assert!(data.is_template());
        let params = data.template_parameters.as_ref().unwrap();
        assert_eq!(1, params.len());
        assert_eq!("T", params[0].name());
        assert!(params[0].is_type_parameter());

        assert_eq!(1, data.members.len());
        assert_eq!("T", data.members[0].as_variable().unwrap().ty.to_string());
    }

    #[test]
    fn test_function_template() {
        let (_, global) = global_of("template<typename T, int N> T get(T values) {}");

        let f = global.find("get").unwrap();
        let data = f.as_function().unwrap();

        assert!(data.is_template());
        assert_eq!(2, data.template_parameters.len());
        assert!(!data.template_parameters[1].is_type_parameter());
        assert_eq!("N", data.template_parameters[1].name());
    }

    #[test]
    fn test_destructor_member() {
        let (_, global) = global_of("class Widget { ~Widget(); };");

        let class = global.find("Widget").unwrap();
        let members = class.children();
        assert_eq!(1, members.len());
        assert_eq!("~Widget", members[0].name());
        assert_eq!(
            FunctionKind::Destructor,
            members[0].as_function().unwrap().kind
        );
    }

    #[test]
    fn test_nested_namespaces_reuse() {
        let (_, global) = global_of("namespace a { namespace b {} }\nnamespace a { int x; }\n");

        let a = global.find("a").unwrap();
        let namespaces: Vec<_> = global
            .children()
            .into_iter()
            .filter(|e| e.is_namespace())
            .collect();
        assert_eq!(1, namespaces.len());
        assert_eq!(2, a.children().len());
    }

    #[test]
    fn test_local_variables_do_not_join_the_program() {
        let (_, global) = global_of("void f() { int local = 3; }");

        assert!(global.find("local").is_none());
        assert!(global.find("f").is_some());
    }

    #[test]
    fn test_ambiguous_declaration_fails_at_file_scope() {
        let mut parser = RestrictedParser::new();
        assert!(parser.parse_source("int f();").is_err());
    }

    #[test]
    fn test_void_function_declaration_at_file_scope() {
        let (_, global) = global_of("void shutdown();");
        assert!(global.find("shutdown").is_some());
    }
}
