mod cursor;
mod decl;
mod name;
mod stmt;
mod types;

pub use cursor::*;

use std::cell::RefCell;
use std::rc::Rc;
use std::{error::Error, fmt::Display};

use log::debug;

use crate::ast::{AstNode, NodeKind};
use crate::file::{File, FileCache, Position, SourceRange};
use crate::lexer::{LexError, Lexer, Token};
use crate::program::{AccessSpecifier, Entity, Program};
use crate::types::Type;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Lex(LexError),
    Io {
        path: String,
        message: String,
    },
    UnexpectedEndOfInput {
        position: Option<(u32, u32)>,
    },
    UnexpectedToken {
        expected: String,
        found: String,
        position: (u32, u32),
    },
    UnmatchedDelimiter {
        delimiter: &'static str,
        position: Option<(u32, u32)>,
    },
    NotImplemented {
        what: String,
        position: Option<(u32, u32)>,
    },
}

pub type ParseResult<T> = Result<T, ParseError>;

impl ParseError {
    pub fn unexpected(expected: impl Into<String>, token: &Token) -> Self {
        ParseError::UnexpectedToken {
            expected: expected.into(),
            found: token.text.to_string(),
            position: token.position(),
        }
    }

    pub fn not_implemented(what: impl Into<String>, position: Option<(u32, u32)>) -> Self {
        ParseError::NotImplemented {
            what: what.into(),
            position,
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Lex(e) => write!(f, "{e}"),
            ParseError::Io { path, message } => write!(f, "could not read '{path}': {message}"),
            ParseError::UnexpectedEndOfInput { position } => match position {
                Some((line, col)) => {
                    write!(f, "unexpected end of input (last token at {line}:{col})")
                }
                None => f.write_str("unexpected end of input"),
            },
            ParseError::UnexpectedToken {
                expected,
                found,
                position: (line, col),
            } => write!(f, "expected {expected}, found '{found}' at {line}:{col}"),
            ParseError::UnmatchedDelimiter {
                delimiter,
                position,
            } => match position {
                Some((line, col)) => {
                    write!(f, "no matching '{delimiter}' from {line}:{col}")
                }
                None => write!(f, "no matching '{delimiter}'"),
            },
            ParseError::NotImplemented { what, position } => match position {
                Some((line, col)) => write!(f, "not implemented: {what} at {line}:{col}"),
                None => write!(f, "not implemented: {what}"),
            },
        }
    }
}

impl Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(value: LexError) -> Self {
        ParseError::Lex(value)
    }
}

/// Per-parse state: the bounded cursor plus the two construction stacks.
///
/// `ast_stack` tracks the current syntactic ancestor chain, `scope_stack`
/// the current semantic scope chain. Pushes are paired with pops through
/// the closure-scoped helpers, so both stacks unwind correctly when a
/// parse fails.
pub(crate) struct ParseSession<'a> {
    pub(crate) cursor: TokenCursor<'a>,
    pub(crate) program: Option<Rc<Program>>,
    pub(crate) current_file: Option<Rc<File>>,
    pub(crate) ast_stack: Vec<Rc<AstNode>>,
    pub(crate) scope_stack: Vec<Rc<Entity>>,
    pub(crate) access: AccessSpecifier,
    pub(crate) in_function_body: bool,
    pub(crate) skip_function_bodies: bool,
}

impl<'a> ParseSession<'a> {
    pub(crate) fn new(source: &'a str) -> ParseResult<Self> {
        let tokens = Lexer::new(source)
            .tokenize()?
            .into_iter()
            .filter(|t| !t.kind.is_comment())
            .collect::<Vec<_>>();

        Ok(Self {
            cursor: TokenCursor::new(tokens, source),
            program: None,
            current_file: None,
            ast_stack: vec![],
            scope_stack: vec![],
            access: AccessSpecifier::default(),
            in_function_body: false,
            skip_function_bodies: false,
        })
    }

    /// The current semantic scope, when parsing into a program.
    pub(crate) fn scope(&self) -> Option<Rc<Entity>> {
        self.scope_stack.last().cloned()
    }

    pub(crate) fn with_ast_node<T>(
        &mut self,
        node: &Rc<AstNode>,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        self.ast_stack.push(Rc::clone(node));
        let result = f(self);
        self.ast_stack.pop();
        result
    }

    pub(crate) fn with_scope<T>(
        &mut self,
        entity: &Rc<Entity>,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        self.scope_stack.push(Rc::clone(entity));
        let result = f(self);
        self.scope_stack.pop();
        result
    }

    pub(crate) fn with_function_body<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let saved = self.in_function_body;
        self.in_function_body = true;
        let result = f(self);
        self.in_function_body = saved;
        result
    }

    /// Save the access-specifier state around a class body.
    pub(crate) fn with_access<T>(
        &mut self,
        access: AccessSpecifier,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let saved = self.access;
        self.access = access;
        let result = f(self);
        self.access = saved;
        result
    }

    fn in_view<T>(
        &mut self,
        end: usize,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let saved = self.cursor.begin_view(end);
        let result = f(self);
        self.cursor.end_view(saved);
        result
    }

    /// Session-level mirrors of the cursor views, so sub-parsers can use
    /// the whole session while the view is active.
    pub(crate) fn with_paren_view<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let close = self
            .cursor
            .scan_to_matching(crate::lexer::TokenKind::LeftParen, crate::lexer::TokenKind::RightParen)?;
        self.in_view(close, f)
    }

    pub(crate) fn with_brace_view<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let close = self
            .cursor
            .scan_to_matching(crate::lexer::TokenKind::LeftBrace, crate::lexer::TokenKind::RightBrace)?;
        self.in_view(close, f)
    }

    pub(crate) fn with_sentinel_view<T>(
        &mut self,
        sentinel: crate::lexer::TokenKind,
        inclusive: bool,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let at = self.cursor.scan_to_sentinel(sentinel)?;
        let end = if inclusive { at + 1 } else { at };
        self.in_view(end, f)
    }

    pub(crate) fn with_list_view<T>(
        &mut self,
        nest_angles: bool,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let end = self.cursor.scan_list(nest_angles)?;
        self.in_view(end, f)
    }

    pub(crate) fn with_angle_view<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<(T, bool)> {
        match self.cursor.scan_angle()? {
            cursor::AngleScan::Closed(close) => self.in_view(close, f).map(|v| (v, false)),
            cursor::AngleScan::Split(at) => {
                let original = self.cursor.split_right_shift(at);
                let result = self.in_view(at + 1, f);
                self.cursor.join_right_shift(at, original);
                result.map(|v| (v, true))
            }
        }
    }

    /// Assign the source range spanned by `first..=last` to `node`.
    pub(crate) fn localize(&self, node: &AstNode, first: Token, last: Token) {
        let file = match &self.current_file {
            Some(file) => Rc::downgrade(file),
            None => std::rc::Weak::new(),
        };

        node.set_range(SourceRange {
            file,
            begin: Position::new(first.line, first.col),
            end: Position::new(last.line, last.col + last.text.len() as u32),
        });
    }

    /// Localize from `first` to the most recently consumed token.
    pub(crate) fn finish_node(&self, node: &AstNode, first: Token) {
        self.localize(node, first, self.cursor.prev());
    }

    /// Record `entity` as introduced by `node` (astmap when there is a
    /// program).
    pub(crate) fn bind(&self, entity: &Rc<Entity>, node: &Rc<AstNode>) {
        match &self.program {
            Some(program) => program.bind(entity, node),
            None => node.set_entity(entity),
        }
    }

    pub(crate) fn parse_translation_unit(&mut self) -> ParseResult<Rc<AstNode>> {
        let root = AstNode::new(NodeKind::Root);
        let first = if self.cursor.at_end() {
            None
        } else {
            Some(self.cursor.peek()?)
        };

        let result_root = Rc::clone(&root);
        self.with_ast_node(&root, move |s| {
            while !s.cursor.at_end() {
                let stmt = s.parse_statement()?;
                result_root.append(&stmt);
            }
            Ok(())
        })?;

        if let Some(first) = first {
            self.finish_node(&root, first);
        }

        Ok(root)
    }

    /// Require that the whole input was consumed.
    pub(crate) fn expect_at_end(&self) -> ParseResult<()> {
        if !self.cursor.at_end() {
            let token = self.cursor.peek()?;
            return Err(ParseError::unexpected("end of input", &token));
        }

        Ok(())
    }
}

/// The public face of the restricted recursive-descent parser.
///
/// One parser owns one program and one file cache; parses of independent
/// files may proceed in parallel on disjoint parsers.
pub struct RestrictedParser {
    /// When set, function bodies are lexed but their statements are not
    /// parsed and the CST under the body stays empty.
    pub skip_function_bodies: bool,
    program: Rc<Program>,
    files: RefCell<FileCache>,
}

impl Default for RestrictedParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RestrictedParser {
    pub fn new() -> Self {
        Self {
            skip_function_bodies: false,
            program: Rc::new(Program::new()),
            files: RefCell::new(FileCache::new()),
        }
    }

    pub fn program(&self) -> Rc<Program> {
        Rc::clone(&self.program)
    }

    pub fn set_program(&mut self, program: Rc<Program>) {
        self.program = program;
    }

    /// Read `path` through the file cache, parse it and attach the CST
    /// root to the file record.
    pub fn parse_file(&mut self, path: &str) -> ParseResult<Rc<File>> {
        let content = std::fs::read_to_string(path).map_err(|e| ParseError::Io {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        self.parse_file_content(path, &content)
    }

    /// Like [`parse_file`](Self::parse_file) with the content supplied by
    /// the caller.
    pub fn parse_file_content(&mut self, path: &str, content: &str) -> ParseResult<Rc<File>> {
        let file = self.files.borrow_mut().get(path);

        let mut session = ParseSession::new(content)?;
        debug!("parsing '{path}'");
        session.program = Some(Rc::clone(&self.program));
        session.current_file = Some(Rc::clone(&file));
        session.skip_function_bodies = self.skip_function_bodies;
        session.scope_stack.push(self.program.global_namespace());

        let root = session.parse_translation_unit()?;

        *file.ast.borrow_mut() = Some(Rc::clone(&root));
        self.program.add_file(&file);

        Ok(file)
    }

    /// Purely in-memory parse returning only the CST root. The semantic
    /// model still grows on this parser's program.
    pub fn parse_source(&mut self, content: &str) -> ParseResult<Rc<AstNode>> {
        let mut session = ParseSession::new(content)?;
        debug!("parsing in-memory source ({} bytes)", content.len());
        session.program = Some(Rc::clone(&self.program));
        session.skip_function_bodies = self.skip_function_bodies;
        session.scope_stack.push(self.program.global_namespace());

        session.parse_translation_unit()
    }

    /// Parse a lone type, e.g. `"const int*"`.
    pub fn parse_type(text: &str) -> ParseResult<Type> {
        let mut session = ParseSession::new(text)?;
        let ty = session.parse_type()?;
        session.expect_at_end()?;
        Ok(ty)
    }

    /// Parse a lone function signature, e.g. `"int foo(int n, int = 0);"`.
    pub fn parse_function_signature(text: &str) -> ParseResult<Rc<Entity>> {
        let mut session = ParseSession::new(text)?;
        let (function, _) = session.parse_function_signature()?;

        if session.cursor.peek_kind() == Some(crate::lexer::TokenKind::Semicolon) {
            session.cursor.read()?;
        }

        session.expect_at_end()?;
        Ok(function)
    }

    /// Parse a lone variable declaration, e.g.
    /// `"inline constexpr std::string text = \"Hello\";"`. The declaration
    /// tolerates the absence of the `= default` part.
    pub fn parse_variable(text: &str) -> ParseResult<Rc<Entity>> {
        let mut session = ParseSession::new(text)?;
        let variable = session.parse_variable_entity()?;
        session.expect_at_end()?;
        Ok(variable)
    }

    /// Parse a lone `typedef Type Name;`.
    pub fn parse_typedef(text: &str) -> ParseResult<Rc<Entity>> {
        let mut session = ParseSession::new(text)?;
        let node = session.parse_typedef_decl()?;
        session.expect_at_end()?;

        node.entity()
            .ok_or_else(|| ParseError::not_implemented("typedef without entity", None))
    }

    /// Parse a macro form: `NAME`, `NAME(a, b)` or `NAME(a, ...)`.
    pub fn parse_macro(text: &str) -> ParseResult<Rc<Entity>> {
        let mut session = ParseSession::new(text)?;
        let mac = session.parse_macro_entity()?;
        session.expect_at_end()?;
        Ok(mac)
    }
}
