use std::rc::Rc;

use crate::ast::{AstNode, NodeKind};
use crate::lexer::TokenKind;

use super::{ParseError, ParseResult, ParseSession};

impl<'a> ParseSession<'a> {
    /// Dispatch on the next token. Keyword-led statements go to their
    /// dedicated parsers; everything else runs through the
    /// expression/variable/function disambiguator.
    pub(crate) fn parse_statement(&mut self) -> ParseResult<Rc<AstNode>> {
        let token = self.cursor.peek()?;

        match token.kind {
            TokenKind::LeftBrace => self.parse_compound_statement(),
            TokenKind::Semicolon => self.parse_null_statement(),
            TokenKind::Break => self.parse_break_statement(),
            TokenKind::Continue => self.parse_continue_statement(),
            TokenKind::Class | TokenKind::Struct => self.parse_class_decl(None),
            TokenKind::Do => self.parse_do_while_loop(),
            TokenKind::Enum => self.parse_enum_decl(),
            TokenKind::For => self.parse_for_loop(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::Namespace => self.parse_namespace_decl(),
            TokenKind::Public | TokenKind::Protected | TokenKind::Private => {
                self.parse_access_specifier()
            }
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Switch => self.parse_switch_statement(),
            TokenKind::Template => self.parse_template_decl(),
            TokenKind::Throw => self.parse_expression_statement(),
            TokenKind::Try => self.parse_try_block(),
            TokenKind::Typedef => self.parse_typedef_decl(),
            TokenKind::Using => self.parse_using_decl(),
            TokenKind::Virtual | TokenKind::Tilde => self.parse_function_decl(vec![]),
            TokenKind::While => self.parse_while_loop(),
            TokenKind::Case => self.parse_case_statement(),
            TokenKind::Default => self.parse_default_statement(),
            TokenKind::Export | TokenKind::Friend | TokenKind::Import | TokenKind::Operator => {
                Err(ParseError::not_implemented(
                    format!("'{}' statement", token.text),
                    Some(token.position()),
                ))
            }
            TokenKind::Catch
            | TokenKind::Delete
            | TokenKind::Else
            | TokenKind::False
            | TokenKind::Final
            | TokenKind::Noexcept
            | TokenKind::Override
            | TokenKind::True
            | TokenKind::Typeid => Err(ParseError::unexpected("statement", &token)),
            _ => self.parse_detected_statement(),
        }
    }

    pub(crate) fn parse_compound_statement(&mut self) -> ParseResult<Rc<AstNode>> {
        let node = AstNode::new(NodeKind::CompoundStatement);
        let left_brace = self.cursor.expect(TokenKind::LeftBrace, "'{'")?;

        let body = Rc::clone(&node);
        self.with_ast_node(&node, |s| {
            s.with_brace_view(|s| {
                while !s.cursor.at_end() {
                    let stmt = s.parse_statement()?;
                    body.append(&stmt);
                }
                Ok(())
            })
        })?;

        let right_brace = self.cursor.expect(TokenKind::RightBrace, "'}'")?;
        self.localize(&node, left_brace, right_brace);

        Ok(node)
    }

    fn parse_null_statement(&mut self) -> ParseResult<Rc<AstNode>> {
        let node = AstNode::new(NodeKind::NullStatement);
        let token = self.cursor.read()?;
        self.localize(&node, token, token);
        Ok(node)
    }

    fn parse_break_statement(&mut self) -> ParseResult<Rc<AstNode>> {
        let node = AstNode::new(NodeKind::BreakStatement);
        let token = self.cursor.read()?;
        self.localize(&node, token, token);
        self.cursor.expect(TokenKind::Semicolon, "';'")?;
        Ok(node)
    }

    fn parse_continue_statement(&mut self) -> ParseResult<Rc<AstNode>> {
        let node = AstNode::new(NodeKind::ContinueStatement);
        let token = self.cursor.read()?;
        self.localize(&node, token, token);
        self.cursor.expect(TokenKind::Semicolon, "';'")?;
        Ok(node)
    }

    /// Capture the rest of the current view verbatim as an unexposed
    /// expression node. No expression tree is built.
    pub(crate) fn parse_expression_node(&mut self) -> Rc<AstNode> {
        let node = AstNode::new(NodeKind::UnexposedExpression);

        if self.cursor.at_end() {
            // an empty clause, e.g. the condition of `for (;;)`
            node.set_text("");
            if self.cursor.index() > 0 {
                let prev = self.cursor.prev();
                self.localize(&node, prev, prev);
            }
            return node;
        }

        let first = match self.cursor.peek() {
            Ok(token) => token,
            Err(_) => return node,
        };

        let mut text = self.cursor.text_to_end().to_string();
        if text.ends_with(';') {
            text.pop();
        }

        while !self.cursor.at_end() {
            let _ = self.cursor.read();
        }

        node.set_text(text);
        self.localize(&node, first, self.cursor.prev());

        node
    }

    pub(crate) fn parse_expression_statement(&mut self) -> ParseResult<Rc<AstNode>> {
        let node = AstNode::new(NodeKind::ExpressionStatement);
        let first = self.cursor.peek()?;

        let expr = self.with_ast_node(&node, |s| {
            s.with_sentinel_view(TokenKind::Semicolon, false, |s| Ok(s.parse_expression_node()))
        })?;
        node.append(&expr);

        self.cursor.expect(TokenKind::Semicolon, "';'")?;
        self.finish_node(&node, first);

        Ok(node)
    }

    fn parse_return_statement(&mut self) -> ParseResult<Rc<AstNode>> {
        let keyword = self.cursor.expect(TokenKind::Return, "'return'")?;
        let node = AstNode::new(NodeKind::ReturnStatement);

        if self.cursor.peek_kind() != Some(TokenKind::Semicolon) {
            let expr = self.with_ast_node(&node, |s| {
                s.with_sentinel_view(TokenKind::Semicolon, false, |s| Ok(s.parse_expression_node()))
            })?;
            node.append(&expr);
        }

        let semicolon = self.cursor.expect(TokenKind::Semicolon, "';'")?;
        self.localize(&node, keyword, semicolon);

        Ok(node)
    }

    /// children: {condition, body, else-clause?}
    fn parse_if_statement(&mut self) -> ParseResult<Rc<AstNode>> {
        let keyword = self.cursor.expect(TokenKind::If, "'if'")?;
        let node = AstNode::new(NodeKind::IfStatement);

        self.cursor.expect(TokenKind::LeftParen, "'('")?;
        let condition = self.with_paren_view(|s| Ok(s.parse_expression_node()))?;
        node.append(&condition);
        self.cursor.expect(TokenKind::RightParen, "')'")?;

        let body = self.parse_statement()?;
        node.append(&body);

        if self.cursor.peek_kind() == Some(TokenKind::Else) {
            self.cursor.read()?;
            let else_clause = self.parse_statement()?;
            node.append(&else_clause);
        }

        self.finish_node(&node, keyword);
        Ok(node)
    }

    /// children: {condition, body}
    fn parse_while_loop(&mut self) -> ParseResult<Rc<AstNode>> {
        let keyword = self.cursor.expect(TokenKind::While, "'while'")?;
        let node = AstNode::new(NodeKind::WhileLoop);

        self.cursor.expect(TokenKind::LeftParen, "'('")?;
        let condition = self.with_ast_node(&node, |s| {
            s.with_paren_view(|s| Ok(s.parse_expression_node()))
        })?;
        node.append(&condition);
        self.cursor.expect(TokenKind::RightParen, "')'")?;

        let body = self.with_ast_node(&node.clone(), |s| s.parse_statement())?;
        node.append(&body);

        self.finish_node(&node, keyword);
        Ok(node)
    }

    /// children: {body, condition}
    fn parse_do_while_loop(&mut self) -> ParseResult<Rc<AstNode>> {
        let keyword = self.cursor.expect(TokenKind::Do, "'do'")?;
        let node = AstNode::new(NodeKind::DoWhileLoop);

        let body = self.with_ast_node(&node, |s| s.parse_statement())?;
        node.append(&body);

        self.cursor.expect(TokenKind::While, "'while'")?;
        self.cursor.expect(TokenKind::LeftParen, "'('")?;

        let condition = self.with_ast_node(&node.clone(), |s| {
            s.with_paren_view(|s| Ok(s.parse_expression_node()))
        })?;
        node.append(&condition);

        self.cursor.expect(TokenKind::RightParen, "')'")?;
        self.cursor.expect(TokenKind::Semicolon, "';'")?;

        self.finish_node(&node, keyword);
        Ok(node)
    }

    /// children: {value, body}
    fn parse_switch_statement(&mut self) -> ParseResult<Rc<AstNode>> {
        let keyword = self.cursor.expect(TokenKind::Switch, "'switch'")?;
        let node = AstNode::new(NodeKind::SwitchStatement);

        self.cursor.expect(TokenKind::LeftParen, "'('")?;
        let value = self.with_ast_node(&node, |s| {
            s.with_paren_view(|s| Ok(s.parse_expression_node()))
        })?;
        node.append(&value);
        self.cursor.expect(TokenKind::RightParen, "')'")?;

        let body = self.with_ast_node(&node.clone(), |s| s.parse_statement())?;
        node.append(&body);

        self.finish_node(&node, keyword);
        Ok(node)
    }

    /// children: {value, statement}
    fn parse_case_statement(&mut self) -> ParseResult<Rc<AstNode>> {
        let keyword = self.cursor.expect(TokenKind::Case, "'case'")?;
        let node = AstNode::new(NodeKind::CaseStatement);

        let value = self.with_ast_node(&node, |s| {
            s.with_sentinel_view(TokenKind::Colon, false, |s| Ok(s.parse_expression_node()))
        })?;
        node.append(&value);

        self.cursor.expect(TokenKind::Colon, "':'")?;

        let stmt = self.with_ast_node(&node.clone(), |s| s.parse_statement())?;
        node.append(&stmt);

        self.finish_node(&node, keyword);
        Ok(node)
    }

    /// children: {statement}
    fn parse_default_statement(&mut self) -> ParseResult<Rc<AstNode>> {
        let keyword = self.cursor.expect(TokenKind::Default, "'default'")?;
        let node = AstNode::new(NodeKind::DefaultStatement);

        self.cursor.expect(TokenKind::Colon, "':'")?;

        let stmt = self.with_ast_node(&node, |s| s.parse_statement())?;
        node.append(&stmt);

        self.finish_node(&node, keyword);
        Ok(node)
    }

    /// children: {body, handlers...}
    fn parse_try_block(&mut self) -> ParseResult<Rc<AstNode>> {
        let keyword = self.cursor.expect(TokenKind::Try, "'try'")?;
        let node = AstNode::new(NodeKind::TryBlock);

        let body = self.with_ast_node(&node, |s| s.parse_statement())?;
        node.append(&body);

        while self.cursor.peek_kind() == Some(TokenKind::Catch) {
            let handler = self.with_ast_node(&node.clone(), |s| s.parse_catch_statement())?;
            node.append(&handler);
        }

        self.finish_node(&node, keyword);
        Ok(node)
    }

    /// children: {parameter, body}
    fn parse_catch_statement(&mut self) -> ParseResult<Rc<AstNode>> {
        let keyword = self.cursor.expect(TokenKind::Catch, "'catch'")?;
        let node = AstNode::new(NodeKind::CatchStatement);

        self.cursor.expect(TokenKind::LeftParen, "'('")?;
        let parameter = self.with_ast_node(&node, |s| {
            s.with_paren_view(|s| s.parse_parameter_decl())
        })?;
        node.append(&parameter);
        self.cursor.expect(TokenKind::RightParen, "')'")?;

        let body = self.with_ast_node(&node.clone(), |s| s.parse_statement())?;
        node.append(&body);

        self.finish_node(&node, keyword);
        Ok(node)
    }

    /// A parameter as it appears in a catch clause: type, optional name,
    /// optional default expression.
    pub(crate) fn parse_parameter_decl(&mut self) -> ParseResult<Rc<AstNode>> {
        let node = AstNode::new(NodeKind::ParameterDeclaration);
        let first = self.cursor.peek()?;

        self.parse_type()?;

        if !self.cursor.at_end() && self.cursor.peek_kind() == Some(TokenKind::Identifier) {
            self.parse_name()?;
        }

        if !self.cursor.at_end() && self.cursor.peek_kind() == Some(TokenKind::Eq) {
            self.cursor.read()?;
            let expr = self.parse_expression_node();
            node.append(&expr);
        }

        self.finish_node(&node, first);
        Ok(node)
    }

    /// `for (init; condition; iter) body` with children {init, condition,
    /// iter, body}, or `for (var : container) body` with children
    /// {variable, container, body}. Which grammar applies is decided by
    /// counting `;` and `:` inside the parentheses.
    fn parse_for_loop(&mut self) -> ParseResult<Rc<AstNode>> {
        let keyword = self.cursor.expect(TokenKind::For, "'for'")?;
        self.cursor.expect(TokenKind::LeftParen, "'('")?;

        let close = self.cursor.matching_paren()?;
        let mut semicolons = 0;
        let mut colons = 0;
        for i in self.cursor.index()..close {
            match self.cursor.kind_at(i) {
                Some(TokenKind::Semicolon) => semicolons += 1,
                Some(TokenKind::Colon) => colons += 1,
                _ => {}
            }
        }

        let is_for_range = colons >= 1 && semicolons < 2;

        let node = if is_for_range {
            let node = AstNode::new(NodeKind::ForRange);

            let variable = self.with_ast_node(&node, |s| {
                s.with_sentinel_view(TokenKind::Colon, false, |s| s.parse_for_range_declaration())
            })?;
            node.append(&variable);

            self.cursor.expect(TokenKind::Colon, "':'")?;

            let container = self.with_ast_node(&node.clone(), |s| {
                s.with_paren_view(|s| Ok(s.parse_expression_node()))
            })?;
            node.append(&container);

            self.cursor.expect(TokenKind::RightParen, "')'")?;

            let body = self.with_ast_node(&node.clone(), |s| s.parse_statement())?;
            node.append(&body);

            node
        } else {
            let node = AstNode::new(NodeKind::ForLoop);

            // the init statement consumes its own ';', so the view extends
            // one token past the sentinel
            let init = self.with_ast_node(&node, |s| {
                s.with_sentinel_view(TokenKind::Semicolon, true, |s| s.parse_statement())
            })?;
            node.append(&init);

            let condition = self.with_ast_node(&node.clone(), |s| {
                s.with_sentinel_view(TokenKind::Semicolon, false, |s| Ok(s.parse_expression_node()))
            })?;
            node.append(&condition);
            self.cursor.expect(TokenKind::Semicolon, "';'")?;

            let iter = self.with_ast_node(&node.clone(), |s| {
                s.with_paren_view(|s| Ok(s.parse_expression_node()))
            })?;
            node.append(&iter);
            self.cursor.expect(TokenKind::RightParen, "')'")?;

            let body = self.with_ast_node(&node.clone(), |s| s.parse_statement())?;
            node.append(&body);

            node
        };

        self.finish_node(&node, keyword);
        Ok(node)
    }

    /// The loop variable of a range-for, which does not carry a `;`.
    fn parse_for_range_declaration(&mut self) -> ParseResult<Rc<AstNode>> {
        let node = AstNode::new(NodeKind::VariableDeclaration);
        let first = self.cursor.peek()?;

        self.parse_type()?;

        if !self.cursor.at_end() {
            self.parse_name()?;
        }

        self.expect_at_end()?;
        self.finish_node(&node, first);

        Ok(node)
    }
}
