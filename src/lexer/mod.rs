mod token;

pub use token::*;

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::{error::Error, fmt::Display};

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    let mut m = HashMap::new();

    m.insert("auto", TokenKind::Auto);
    m.insert("bool", TokenKind::Bool);
    m.insert("break", TokenKind::Break);
    m.insert("case", TokenKind::Case);
    m.insert("catch", TokenKind::Catch);
    m.insert("char", TokenKind::Char);
    m.insert("class", TokenKind::Class);
    m.insert("const", TokenKind::Const);
    m.insert("constexpr", TokenKind::Constexpr);
    m.insert("continue", TokenKind::Continue);
    m.insert("decltype", TokenKind::Decltype);
    m.insert("default", TokenKind::Default);
    m.insert("delete", TokenKind::Delete);
    m.insert("do", TokenKind::Do);
    m.insert("double", TokenKind::Double);
    m.insert("else", TokenKind::Else);
    m.insert("enum", TokenKind::Enum);
    m.insert("explicit", TokenKind::Explicit);
    m.insert("export", TokenKind::Export);
    m.insert("false", TokenKind::False);
    m.insert("final", TokenKind::Final);
    m.insert("float", TokenKind::Float);
    m.insert("for", TokenKind::For);
    m.insert("friend", TokenKind::Friend);
    m.insert("if", TokenKind::If);
    m.insert("import", TokenKind::Import);
    m.insert("inline", TokenKind::Inline);
    m.insert("int", TokenKind::Int);
    m.insert("mutable", TokenKind::Mutable);
    m.insert("namespace", TokenKind::Namespace);
    m.insert("noexcept", TokenKind::Noexcept);
    m.insert("operator", TokenKind::Operator);
    m.insert("override", TokenKind::Override);
    m.insert("private", TokenKind::Private);
    m.insert("protected", TokenKind::Protected);
    m.insert("public", TokenKind::Public);
    m.insert("return", TokenKind::Return);
    m.insert("static", TokenKind::Static);
    m.insert("struct", TokenKind::Struct);
    m.insert("switch", TokenKind::Switch);
    m.insert("template", TokenKind::Template);
    m.insert("this", TokenKind::This);
    m.insert("throw", TokenKind::Throw);
    m.insert("true", TokenKind::True);
    m.insert("try", TokenKind::Try);
    m.insert("typedef", TokenKind::Typedef);
    m.insert("typeid", TokenKind::Typeid);
    m.insert("typename", TokenKind::Typename);
    m.insert("using", TokenKind::Using);
    m.insert("virtual", TokenKind::Virtual);
    m.insert("void", TokenKind::Void);
    m.insert("volatile", TokenKind::Volatile);
    m.insert("while", TokenKind::While);

    m
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    UnexpectedChar { ch: char, line: u32, col: u32 },
    UnexpectedEndOfInput { context: &'static str },
    UnterminatedString { line: u32, col: u32 },
    NewlineInString { line: u32, col: u32 },
    UnterminatedComment { line: u32, col: u32 },
    MalformedNumber { line: u32, col: u32 },
    MalformedCharLiteral { line: u32, col: u32 },
}

pub type LexResult<T> = Result<T, LexError>;

impl Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexError::UnexpectedChar { ch, line, col } => {
                write!(f, "unexpected character '{ch}' at {line}:{col}")
            }
            LexError::UnexpectedEndOfInput { context } => {
                write!(f, "unexpected end of input while lexing {context}")
            }
            LexError::UnterminatedString { line, col } => {
                write!(f, "unterminated string literal starting at {line}:{col}")
            }
            LexError::NewlineInString { line, col } => {
                write!(f, "line break inside string literal at {line}:{col}")
            }
            LexError::UnterminatedComment { line, col } => {
                write!(f, "unterminated comment starting at {line}:{col}")
            }
            LexError::MalformedNumber { line, col } => {
                write!(f, "malformed numeric literal at {line}:{col}")
            }
            LexError::MalformedCharLiteral { line, col } => {
                write!(f, "malformed character literal at {line}:{col}")
            }
        }
    }
}

impl Error for LexError {}

/// Character-stream scanner producing a restartable sequence of tokens.
///
/// Whitespace is skipped but updates line/column tracking; comments are
/// produced as single tokens. Lines and columns are 0-based.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: u32,
    col: u32,
    // start coordinates of the token currently being read
    tok_line: u32,
    tok_col: u32,
}

fn is_digit(c: u8) -> bool {
    c.is_ascii_digit()
}

fn is_octal_digit(c: u8) -> bool {
    (b'0'..=b'7').contains(&c)
}

fn is_hex_digit(c: u8) -> bool {
    c.is_ascii_hexdigit()
}

fn is_binary_digit(c: u8) -> bool {
    c == b'0' || c == b'1'
}

fn is_letter(c: u8) -> bool {
    c.is_ascii_alphabetic()
}

fn is_discardable(c: u8) -> bool {
    c == b' ' || c == b'\t' || c == b'\n' || c == b'\r'
}

/// One-, two- and three-character operators; the caller grows the slice as
/// long as a match exists (longest match wins).
fn operator_kind(s: &str) -> Option<TokenKind> {
    let kind = match s {
        "+" => TokenKind::Plus,
        "-" => TokenKind::Minus,
        "!" => TokenKind::LogicalNot,
        "~" => TokenKind::Tilde,
        "*" => TokenKind::Star,
        "/" => TokenKind::Slash,
        "%" => TokenKind::Percent,
        "<" => TokenKind::LeftAngle,
        ">" => TokenKind::RightAngle,
        "&" => TokenKind::Ampersand,
        "^" => TokenKind::Caret,
        "|" => TokenKind::Pipe,
        "=" => TokenKind::Eq,
        "++" => TokenKind::PlusPlus,
        "--" => TokenKind::MinusMinus,
        "<<" => TokenKind::LeftShift,
        ">>" => TokenKind::RightShift,
        "<=" => TokenKind::LessEqual,
        ">=" => TokenKind::GreaterEqual,
        "==" => TokenKind::EqEq,
        "!=" => TokenKind::NotEq,
        "&&" => TokenKind::AmpAmp,
        "||" => TokenKind::PipePipe,
        "*=" => TokenKind::StarEq,
        "/=" => TokenKind::SlashEq,
        "%=" => TokenKind::PercentEq,
        "+=" => TokenKind::PlusEq,
        "-=" => TokenKind::MinusEq,
        "&=" => TokenKind::AmpEq,
        "|=" => TokenKind::PipeEq,
        "^=" => TokenKind::CaretEq,
        "<<=" => TokenKind::LeftShiftEq,
        ">>=" => TokenKind::RightShiftEq,
        _ => return None,
    };

    Some(kind)
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Self {
            source,
            pos: 0,
            line: 0,
            col: 0,
            tok_line: 0,
            tok_col: 0,
        };
        lexer.consume_discardable();
        lexer
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn at_end(&self) -> bool {
        self.pos == self.source.len()
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn col(&self) -> u32 {
        self.col
    }

    /// Absolute seek. A backward seek rewinds to the start of the buffer
    /// and re-scans, which keeps line/column tracking exact.
    pub fn seek(&mut self, pos: usize) {
        if pos > self.source.len() {
            self.seek(self.source.len());
        } else if pos < self.pos {
            self.pos = 0;
            self.line = 0;
            self.col = 0;
            self.seek(pos);
        } else {
            while self.pos < pos {
                self.discard_char();
            }
            self.consume_discardable();
        }
    }

    /// Read the next token. On failure the pre-read position is restored.
    pub fn read(&mut self) -> LexResult<Token<'a>> {
        if self.at_end() {
            return Err(LexError::UnexpectedEndOfInput { context: "token" });
        }

        let saved = (self.pos, self.line, self.col);

        match self.read_token() {
            Ok(token) => {
                self.consume_discardable();
                Ok(token)
            }
            Err(e) => {
                self.pos = saved.0;
                self.line = saved.1;
                self.col = saved.2;
                Err(e)
            }
        }
    }

    /// Read all remaining tokens, comments included.
    pub fn tokenize(mut self) -> LexResult<Vec<Token<'a>>> {
        let mut tokens = vec![];

        while !self.at_end() {
            tokens.push(self.read()?);
        }

        Ok(tokens)
    }

    fn read_token(&mut self) -> LexResult<Token<'a>> {
        let start = self.pos;
        let line = self.line;
        let col = self.col;
        self.tok_line = line;
        self.tok_col = col;
        let c = self.read_char();

        match c {
            b'0'..=b'9' => self.read_numeric(start),
            b'"' => self.read_string_literal(start, line, col),
            b'\'' => self.read_char_literal(start, line, col),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => Ok(self.read_identifier(start)),
            b'(' => Ok(self.token(start, TokenKind::LeftParen)),
            b')' => Ok(self.token(start, TokenKind::RightParen)),
            b'[' => Ok(self.token(start, TokenKind::LeftBracket)),
            b']' => Ok(self.token(start, TokenKind::RightBracket)),
            b'{' => Ok(self.token(start, TokenKind::LeftBrace)),
            b'}' => Ok(self.token(start, TokenKind::RightBrace)),
            b';' => Ok(self.token(start, TokenKind::Semicolon)),
            b':' => Ok(self.read_colon(start)),
            b'?' => Ok(self.token(start, TokenKind::QuestionMark)),
            b',' => Ok(self.token(start, TokenKind::Comma)),
            b'.' => Ok(self.token(start, TokenKind::Dot)),
            b'/' => self.read_slash(start, line, col),
            b'+' | b'-' | b'!' | b'~' | b'*' | b'%' | b'<' | b'>' | b'&' | b'^' | b'|' | b'=' => {
                self.read_operator(start)
            }
            _ => Err(LexError::UnexpectedChar {
                ch: self.source[start..].chars().next().unwrap_or('\0'),
                line,
                col,
            }),
        }
    }

    fn peek_char(&self) -> u8 {
        self.source.as_bytes()[self.pos]
    }

    fn read_char(&mut self) -> u8 {
        let c = self.source.as_bytes()[self.pos];
        self.pos += 1;
        self.col += 1;
        c
    }

    fn discard_char(&mut self) {
        let c = self.source.as_bytes()[self.pos];
        self.pos += 1;

        if c == b'\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
    }

    fn consume_discardable(&mut self) {
        while !self.at_end() && is_discardable(self.peek_char()) {
            self.discard_char();
        }
    }

    fn token(&self, start: usize, kind: TokenKind) -> Token<'a> {
        Token::new(
            kind,
            &self.source[start..self.pos],
            self.tok_line,
            self.tok_col,
        )
    }

    fn read_numeric(&mut self, start: usize) -> LexResult<Token<'a>> {
        if self.at_end() {
            let kind = if self.source.as_bytes()[start] == b'0' {
                TokenKind::OctalLiteral
            } else {
                TokenKind::IntegerLiteral
            };
            return Ok(self.token(start, kind));
        }

        let c = self.peek_char();

        // a leading zero opens an octal, hexadecimal or binary literal
        if self.source.as_bytes()[start] == b'0' && c != b'.' {
            if c == b'x' || c == b'X' {
                return self.read_hex(start);
            } else if c == b'b' || c == b'B' {
                return self.read_binary(start);
            } else if is_digit(c) {
                while !self.at_end() && is_octal_digit(self.peek_char()) {
                    self.read_char();
                }
                return Ok(self.token(start, TokenKind::OctalLiteral));
            } else {
                // a lone zero is an octal literal of length one
                return Ok(self.token(start, TokenKind::OctalLiteral));
            }
        }

        self.read_decimal(start)
    }

    fn read_hex(&mut self, start: usize) -> LexResult<Token<'a>> {
        self.read_char();

        if self.at_end() {
            return Err(LexError::UnexpectedEndOfInput {
                context: "hexadecimal literal",
            });
        }

        while !self.at_end() && is_hex_digit(self.peek_char()) {
            self.read_char();
        }

        if self.pos - start == 2 {
            return Err(LexError::MalformedNumber {
                line: self.line,
                col: self.col,
            });
        }

        Ok(self.token(start, TokenKind::HexLiteral))
    }

    fn read_binary(&mut self, start: usize) -> LexResult<Token<'a>> {
        self.read_char();

        if self.at_end() {
            return Err(LexError::UnexpectedEndOfInput {
                context: "binary literal",
            });
        }

        while !self.at_end() && is_binary_digit(self.peek_char()) {
            self.read_char();
        }

        if self.pos - start == 2 {
            return Err(LexError::MalformedNumber {
                line: self.line,
                col: self.col,
            });
        }

        Ok(self.token(start, TokenKind::BinaryLiteral))
    }

    fn read_decimal(&mut self, start: usize) -> LexResult<Token<'a>> {
        while !self.at_end() && is_digit(self.peek_char()) {
            self.read_char();
        }

        if self.at_end() {
            return Ok(self.token(start, TokenKind::IntegerLiteral));
        }

        let mut is_decimal = false;

        if self.peek_char() == b'.' {
            self.read_char();
            is_decimal = true;

            while !self.at_end() && is_digit(self.peek_char()) {
                self.read_char();
            }

            if self.at_end() {
                return Ok(self.token(start, TokenKind::DecimalLiteral));
            }
        }

        if self.peek_char() == b'e' {
            self.read_char();
            is_decimal = true;

            if self.at_end() {
                return Err(LexError::UnexpectedEndOfInput {
                    context: "floating point literal",
                });
            }

            if self.peek_char() == b'+' || self.peek_char() == b'-' {
                self.read_char();
                if self.at_end() {
                    return Err(LexError::UnexpectedEndOfInput {
                        context: "floating point literal",
                    });
                }
            }

            while !self.at_end() && is_digit(self.peek_char()) {
                self.read_char();
            }

            if self.at_end() {
                return Ok(self.token(start, TokenKind::DecimalLiteral));
            }
        }

        if self.peek_char() == b'f' {
            self.read_char();
            is_decimal = true;
        } else if self.try_read_literal_suffix() {
            return Ok(self.token(start, TokenKind::UserDefinedLiteral));
        }

        let kind = if is_decimal {
            TokenKind::DecimalLiteral
        } else {
            TokenKind::IntegerLiteral
        };

        Ok(self.token(start, kind))
    }

    /// An identifier-like run right after a literal turns it into a
    /// user-defined literal.
    fn try_read_literal_suffix(&mut self) -> bool {
        if !self.at_end() && (is_letter(self.peek_char()) || self.peek_char() == b'_') {
            self.read_char();
        } else {
            return false;
        }

        while !self.at_end()
            && (is_letter(self.peek_char()) || is_digit(self.peek_char()) || self.peek_char() == b'_')
        {
            self.read_char();
        }

        true
    }

    fn read_identifier(&mut self, start: usize) -> Token<'a> {
        while !self.at_end()
            && (is_letter(self.peek_char()) || is_digit(self.peek_char()) || self.peek_char() == b'_')
        {
            self.read_char();
        }

        let text = &self.source[start..self.pos];
        let kind = KEYWORDS
            .get(text)
            .copied()
            .unwrap_or(TokenKind::Identifier);

        self.token(start, kind)
    }

    fn read_string_literal(&mut self, start: usize, line: u32, col: u32) -> LexResult<Token<'a>> {
        loop {
            if self.at_end() {
                return Err(LexError::UnterminatedString { line, col });
            }

            match self.peek_char() {
                b'"' => break,
                b'\\' => {
                    self.read_char();
                    if !self.at_end() {
                        self.read_char();
                    }
                }
                b'\n' => return Err(LexError::NewlineInString { line, col }),
                _ => {
                    self.read_char();
                }
            }
        }

        self.read_char();

        if self.try_read_literal_suffix() {
            return Ok(self.token(start, TokenKind::UserDefinedLiteral));
        }

        Ok(self.token(start, TokenKind::StringLiteral))
    }

    fn read_char_literal(&mut self, start: usize, line: u32, col: u32) -> LexResult<Token<'a>> {
        if self.at_end() {
            return Err(LexError::UnexpectedEndOfInput {
                context: "character literal",
            });
        }

        if self.peek_char() == b'\\' {
            self.read_char();
        }

        self.read_char();

        if self.at_end() {
            return Err(LexError::UnexpectedEndOfInput {
                context: "character literal",
            });
        }

        if self.read_char() != b'\'' {
            return Err(LexError::MalformedCharLiteral { line, col });
        }

        Ok(self.token(start, TokenKind::StringLiteral))
    }

    fn read_colon(&mut self, start: usize) -> Token<'a> {
        if !self.at_end() && self.peek_char() == b':' {
            self.read_char();
            return self.token(start, TokenKind::ColonColon);
        }

        self.token(start, TokenKind::Colon)
    }

    fn read_slash(&mut self, start: usize, line: u32, col: u32) -> LexResult<Token<'a>> {
        if self.at_end() {
            return Ok(self.token(start, TokenKind::Slash));
        }

        match self.peek_char() {
            b'/' => Ok(self.read_single_line_comment(start)),
            b'*' => self.read_multi_line_comment(start, line, col),
            _ => self.read_operator(start),
        }
    }

    fn read_operator(&mut self, start: usize) -> LexResult<Token<'a>> {
        let mut kind = match operator_kind(&self.source[start..self.pos]) {
            Some(kind) => kind,
            None => {
                return Err(LexError::UnexpectedChar {
                    ch: self.source[start..].chars().next().unwrap_or('\0'),
                    line: self.line,
                    col: self.col - 1,
                })
            }
        };

        while !self.at_end() {
            let p = self.pos;
            self.read_char();

            match operator_kind(&self.source[start..self.pos]) {
                Some(candidate) => kind = candidate,
                None => {
                    self.pos = p;
                    self.col -= 1;
                    break;
                }
            }
        }

        Ok(self.token(start, kind))
    }

    fn read_single_line_comment(&mut self, start: usize) -> Token<'a> {
        self.read_char();

        while !self.at_end() && self.peek_char() != b'\n' {
            self.read_char();
        }

        self.token(start, TokenKind::SingleLineComment)
    }

    fn read_multi_line_comment(&mut self, start: usize, line: u32, col: u32) -> LexResult<Token<'a>> {
        self.read_char();

        loop {
            while !self.at_end() && self.peek_char() != b'*' {
                self.discard_char();
            }

            if self.at_end() {
                return Err(LexError::UnterminatedComment { line, col });
            }

            self.read_char();

            if self.at_end() {
                return Err(LexError::UnterminatedComment { line, col });
            }

            if self.peek_char() == b'/' {
                break;
            }
        }

        self.read_char();

        Ok(self.token(start, TokenKind::MultiLineComment))
    }
}
