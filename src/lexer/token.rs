use std::fmt::Display;

/// Kind of a lexed token.
///
/// `LeftAngle`/`RightAngle` double as the comparison operators `<`/`>`;
/// `Ampersand`/`AmpAmp` double as reference marks. The parser decides from
/// context, the lexer never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // literals
    IntegerLiteral,
    DecimalLiteral,
    BinaryLiteral,
    OctalLiteral,
    HexLiteral,
    StringLiteral,
    UserDefinedLiteral,
    // punctuators
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Semicolon,
    Colon,
    ColonColon,
    Dot,
    QuestionMark,
    Comma,
    // operators
    PlusPlus,
    MinusMinus,
    Plus,
    Minus,
    LogicalNot,
    Tilde,
    Star,
    Slash,
    Percent,
    LeftShift,
    RightShift,
    LeftAngle,
    RightAngle,
    LessEqual,
    GreaterEqual,
    EqEq,
    NotEq,
    Ampersand,
    Pipe,
    Caret,
    AmpAmp,
    PipePipe,
    Eq,
    StarEq,
    SlashEq,
    PercentEq,
    PlusEq,
    MinusEq,
    LeftShiftEq,
    RightShiftEq,
    AmpEq,
    PipeEq,
    CaretEq,
    // comments
    SingleLineComment,
    MultiLineComment,
    // identifiers and keywords
    Identifier,
    Auto,
    Bool,
    Break,
    Case,
    Catch,
    Char,
    Class,
    Const,
    Constexpr,
    Continue,
    Decltype,
    Default,
    Delete,
    Do,
    Double,
    Else,
    Enum,
    Explicit,
    Export,
    False,
    Final,
    Float,
    For,
    Friend,
    If,
    Import,
    Inline,
    Int,
    Mutable,
    Namespace,
    Noexcept,
    Operator,
    Override,
    Private,
    Protected,
    Public,
    Return,
    Static,
    Struct,
    Switch,
    Template,
    This,
    Throw,
    True,
    Try,
    Typedef,
    Typeid,
    Typename,
    Using,
    Virtual,
    Void,
    Volatile,
    While,
}

impl TokenKind {
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::IntegerLiteral
                | TokenKind::DecimalLiteral
                | TokenKind::BinaryLiteral
                | TokenKind::OctalLiteral
                | TokenKind::HexLiteral
                | TokenKind::StringLiteral
                | TokenKind::UserDefinedLiteral
        )
    }

    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Auto
                | TokenKind::Bool
                | TokenKind::Break
                | TokenKind::Case
                | TokenKind::Catch
                | TokenKind::Char
                | TokenKind::Class
                | TokenKind::Const
                | TokenKind::Constexpr
                | TokenKind::Continue
                | TokenKind::Decltype
                | TokenKind::Default
                | TokenKind::Delete
                | TokenKind::Do
                | TokenKind::Double
                | TokenKind::Else
                | TokenKind::Enum
                | TokenKind::Explicit
                | TokenKind::Export
                | TokenKind::False
                | TokenKind::Final
                | TokenKind::Float
                | TokenKind::For
                | TokenKind::Friend
                | TokenKind::If
                | TokenKind::Import
                | TokenKind::Inline
                | TokenKind::Int
                | TokenKind::Mutable
                | TokenKind::Namespace
                | TokenKind::Noexcept
                | TokenKind::Operator
                | TokenKind::Override
                | TokenKind::Private
                | TokenKind::Protected
                | TokenKind::Public
                | TokenKind::Return
                | TokenKind::Static
                | TokenKind::Struct
                | TokenKind::Switch
                | TokenKind::Template
                | TokenKind::This
                | TokenKind::Throw
                | TokenKind::True
                | TokenKind::Try
                | TokenKind::Typedef
                | TokenKind::Typeid
                | TokenKind::Typename
                | TokenKind::Using
                | TokenKind::Virtual
                | TokenKind::Void
                | TokenKind::Volatile
                | TokenKind::While
        )
    }

    /// Identifiers in the wide sense: plain identifiers and keywords.
    pub fn is_identifier(self) -> bool {
        self == TokenKind::Identifier || self.is_keyword()
    }

    pub fn is_operator(self) -> bool {
        matches!(
            self,
            TokenKind::ColonColon
                | TokenKind::PlusPlus
                | TokenKind::MinusMinus
                | TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::LogicalNot
                | TokenKind::Tilde
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Percent
                | TokenKind::LeftShift
                | TokenKind::RightShift
                | TokenKind::LeftAngle
                | TokenKind::RightAngle
                | TokenKind::LessEqual
                | TokenKind::GreaterEqual
                | TokenKind::EqEq
                | TokenKind::NotEq
                | TokenKind::Ampersand
                | TokenKind::Pipe
                | TokenKind::Caret
                | TokenKind::AmpAmp
                | TokenKind::PipePipe
                | TokenKind::Eq
                | TokenKind::StarEq
                | TokenKind::SlashEq
                | TokenKind::PercentEq
                | TokenKind::PlusEq
                | TokenKind::MinusEq
                | TokenKind::LeftShiftEq
                | TokenKind::RightShiftEq
                | TokenKind::AmpEq
                | TokenKind::PipeEq
                | TokenKind::CaretEq
                | TokenKind::Comma
        )
    }

    pub fn is_comment(self) -> bool {
        matches!(
            self,
            TokenKind::SingleLineComment | TokenKind::MultiLineComment
        )
    }
}

/// A single token, borrowing its text from the source buffer.
///
/// The buffer outlives every token produced from it; tokens are only valid
/// for the duration of one parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub line: u32,
    pub col: u32,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, text: &'a str, line: u32, col: u32) -> Self {
        Self {
            kind,
            text,
            line,
            col,
        }
    }

    pub fn position(&self) -> (u32, u32) {
        (self.line, self.col)
    }
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert!(TokenKind::OctalLiteral.is_literal());
        assert!(TokenKind::UserDefinedLiteral.is_literal());
        assert!(TokenKind::Class.is_keyword());
        assert!(TokenKind::Class.is_identifier());
        assert!(TokenKind::Identifier.is_identifier());
        assert!(!TokenKind::Identifier.is_keyword());
        assert!(TokenKind::RightShift.is_operator());
        assert!(TokenKind::ColonColon.is_operator());
        assert!(!TokenKind::LeftParen.is_operator());
        assert!(TokenKind::MultiLineComment.is_comment());
    }
}
