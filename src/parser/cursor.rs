use crate::lexer::{Token, TokenKind};

use super::{ParseError, ParseResult};

/// Result of scanning for the `>` closing a template argument list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AngleScan {
    /// A plain `>` at this absolute index closes the list.
    Closed(usize),
    /// A `>>` at this absolute index closes two lists at once and must be
    /// split.
    Split(usize),
}

/// A seekable cursor over the discard-filtered token buffer.
///
/// The readable slice is restricted to `(begin, end)`. Views narrow that
/// slice to a balanced or sentinel-terminated sub-range for the duration of
/// a closure and restore it on every exit path, errors included; they are
/// the only mechanism that bounds sub-parsers. The closing delimiter itself
/// stays outside the view.
#[derive(Debug)]
pub struct TokenCursor<'a> {
    tokens: Vec<Token<'a>>,
    source: &'a str,
    index: usize,
    begin: usize,
    end: usize,
}

impl<'a> TokenCursor<'a> {
    pub fn new(tokens: Vec<Token<'a>>, source: &'a str) -> Self {
        let end = tokens.len();
        Self {
            tokens,
            source,
            index: 0,
            begin: 0,
            end,
        }
    }

    pub fn at_end(&self) -> bool {
        self.index >= self.end
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn bounds(&self) -> (usize, usize) {
        (self.begin, self.end)
    }

    pub fn peek(&self) -> ParseResult<Token<'a>> {
        if self.at_end() {
            return Err(ParseError::UnexpectedEndOfInput {
                position: self.last_position(),
            });
        }

        Ok(self.tokens[self.index])
    }

    pub fn peek_kind(&self) -> Option<TokenKind> {
        if self.at_end() {
            return None;
        }

        Some(self.tokens[self.index].kind)
    }

    pub fn read(&mut self) -> ParseResult<Token<'a>> {
        let token = self.peek()?;
        self.index += 1;
        Ok(token)
    }

    /// Read a token of the given kind or fail with `UnexpectedToken`.
    pub fn expect(&mut self, kind: TokenKind, what: &'static str) -> ParseResult<Token<'a>> {
        let token = self.read()?;

        if token.kind != kind {
            return Err(ParseError::unexpected(what, &token));
        }

        Ok(token)
    }

    /// The most recently read token. Only meaningful after a read.
    pub fn prev(&self) -> Token<'a> {
        debug_assert!(self.index > 0);
        self.tokens[self.index - 1]
    }

    /// Token kind at an absolute buffer index, ignoring the view bounds.
    pub fn kind_at(&self, index: usize) -> Option<TokenKind> {
        self.tokens.get(index).map(|t| t.kind)
    }

    fn last_position(&self) -> Option<(u32, u32)> {
        self.tokens.last().map(|t| t.position())
    }

    fn byte_offset(&self, text: &str) -> usize {
        text.as_ptr() as usize - self.source.as_ptr() as usize
    }

    /// Verbatim source text from the current token to the end of the view.
    pub fn text_to_end(&self) -> &'a str {
        if self.at_end() {
            return "";
        }

        let first = self.tokens[self.index];
        let last = self.tokens[self.end - 1];
        let start = self.byte_offset(first.text);
        let stop = self.byte_offset(last.text) + last.text.len();

        &self.source[start..stop]
    }

    /// Narrow the readable slice to `index..end`, returning the previous
    /// bounds for [`end_view`](Self::end_view). Callers must pair the two
    /// on every exit path.
    pub(crate) fn begin_view(&mut self, end: usize) -> (usize, usize) {
        let saved = (self.begin, self.end);
        self.begin = self.index;
        self.end = end;
        saved
    }

    pub(crate) fn end_view(&mut self, saved: (usize, usize)) {
        self.begin = saved.0;
        self.end = saved.1;
    }

    fn install<T>(
        &mut self,
        end: usize,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let saved = self.begin_view(end);
        let result = f(self);
        self.end_view(saved);
        result
    }

    /// The absolute index of the token closing the balanced pair opened
    /// just before the cursor position.
    pub(crate) fn scan_to_matching(
        &self,
        open: TokenKind,
        close: TokenKind,
    ) -> ParseResult<usize> {
        let mut depth = 0usize;

        for i in self.index..self.end {
            let kind = self.tokens[i].kind;

            if kind == close {
                if depth == 0 {
                    return Ok(i);
                }
                depth -= 1;
            } else if kind == open {
                depth += 1;
            }
        }

        Err(ParseError::UnmatchedDelimiter {
            delimiter: delimiter_name(close),
            position: self.tokens.get(self.index).map(|t| t.position()),
        })
    }

    /// The absolute index of the next `sentinel` in the view.
    pub(crate) fn scan_to_sentinel(&self, sentinel: TokenKind) -> ParseResult<usize> {
        for i in self.index..self.end {
            if self.tokens[i].kind == sentinel {
                return Ok(i);
            }
        }

        Err(ParseError::UnmatchedDelimiter {
            delimiter: delimiter_name(sentinel),
            position: self.tokens.get(self.index).map(|t| t.position()),
        })
    }

    /// The end of the current list element: the next top-level comma, or
    /// the end of the enclosing view when no comma separates further
    /// elements. `nest_angles` makes `<...>` nestable, for template
    /// argument lists.
    pub(crate) fn scan_list(&self, nest_angles: bool) -> ParseResult<usize> {
        let mut paren_depth = 0usize;
        let mut bracket_depth = 0usize;
        let mut brace_depth = 0usize;
        let mut angle_depth = 0isize;

        for i in self.index..self.end {
            let token = self.tokens[i];
            let balanced = paren_depth == 0 && bracket_depth == 0 && brace_depth == 0;

            match token.kind {
                TokenKind::Comma if balanced && angle_depth == 0 => return Ok(i),
                TokenKind::LeftAngle if nest_angles && balanced => angle_depth += 1,
                TokenKind::RightAngle if nest_angles && balanced => angle_depth -= 1,
                TokenKind::RightShift if nest_angles && balanced => angle_depth -= 2,
                TokenKind::LeftParen => paren_depth += 1,
                TokenKind::RightParen => {
                    if paren_depth == 0 {
                        return Err(ParseError::UnmatchedDelimiter {
                            delimiter: "(",
                            position: Some(token.position()),
                        });
                    }
                    paren_depth -= 1;
                }
                TokenKind::LeftBracket => bracket_depth += 1,
                TokenKind::RightBracket => {
                    if bracket_depth == 0 {
                        return Err(ParseError::UnmatchedDelimiter {
                            delimiter: "[",
                            position: Some(token.position()),
                        });
                    }
                    bracket_depth -= 1;
                }
                TokenKind::LeftBrace => brace_depth += 1,
                TokenKind::RightBrace => {
                    if brace_depth == 0 {
                        return Err(ParseError::UnmatchedDelimiter {
                            delimiter: "{",
                            position: Some(token.position()),
                        });
                    }
                    brace_depth -= 1;
                }
                _ => {}
            }
        }

        if paren_depth != 0 || bracket_depth != 0 || brace_depth != 0 {
            return Err(ParseError::UnmatchedDelimiter {
                delimiter: ")",
                position: self.tokens.get(self.index).map(|t| t.position()),
            });
        }

        Ok(self.end)
    }

    /// Find the `>` closing the template argument list that starts at the
    /// cursor position.
    pub(crate) fn scan_angle(&self) -> ParseResult<AngleScan> {
        let mut paren_depth = 0usize;
        let mut bracket_depth = 0usize;
        let mut angle_depth = 0isize;

        for i in self.index..self.end {
            let token = self.tokens[i];
            let balanced = paren_depth == 0 && bracket_depth == 0;

            match token.kind {
                TokenKind::RightAngle if balanced => {
                    if angle_depth == 0 {
                        return Ok(AngleScan::Closed(i));
                    }
                    angle_depth -= 1;
                }
                TokenKind::RightShift if balanced => {
                    if angle_depth == 1 {
                        return Ok(AngleScan::Split(i));
                    }
                    angle_depth -= 2;
                }
                TokenKind::LeftAngle if balanced => angle_depth += 1,
                TokenKind::LeftParen => paren_depth += 1,
                TokenKind::RightParen => {
                    if paren_depth == 0 {
                        return Err(ParseError::UnmatchedDelimiter {
                            delimiter: "(",
                            position: Some(token.position()),
                        });
                    }
                    paren_depth -= 1;
                }
                TokenKind::LeftBracket => bracket_depth += 1,
                TokenKind::RightBracket => {
                    if bracket_depth == 0 {
                        return Err(ParseError::UnmatchedDelimiter {
                            delimiter: "[",
                            position: Some(token.position()),
                        });
                    }
                    bracket_depth -= 1;
                }
                _ => {}
            }
        }

        Err(ParseError::UnmatchedDelimiter {
            delimiter: ">",
            position: self.tokens.get(self.index).map(|t| t.position()),
        })
    }

    /// Split the `>>` token at `at` into two `RightAngle` tokens, returning
    /// the original token for [`join_right_shift`](Self::join_right_shift).
    pub(crate) fn split_right_shift(&mut self, at: usize) -> Token<'a> {
        let original = self.tokens[at];
        debug_assert_eq!(TokenKind::RightShift, original.kind);

        let first = Token::new(
            TokenKind::RightAngle,
            &original.text[..1],
            original.line,
            original.col,
        );
        let second = Token::new(
            TokenKind::RightAngle,
            &original.text[1..],
            original.line,
            original.col + 1,
        );

        self.tokens[at] = second;
        self.tokens.insert(at, first);

        original
    }

    /// Undo [`split_right_shift`](Self::split_right_shift).
    pub(crate) fn join_right_shift(&mut self, at: usize, original: Token<'a>) {
        self.tokens.remove(at + 1);
        self.tokens[at] = original;
    }

    /// The absolute index of the `)` matching the cursor position, without
    /// installing a view.
    pub fn matching_paren(&self) -> ParseResult<usize> {
        self.scan_to_matching(TokenKind::LeftParen, TokenKind::RightParen)
    }

    /// Narrow to the tokens before the matching `)`.
    pub fn with_paren_view<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let close = self.scan_to_matching(TokenKind::LeftParen, TokenKind::RightParen)?;
        self.install(close, f)
    }

    /// Narrow to the tokens before the matching `]`.
    pub fn with_bracket_view<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let close = self.scan_to_matching(TokenKind::LeftBracket, TokenKind::RightBracket)?;
        self.install(close, f)
    }

    /// Narrow to the tokens before the matching `}`.
    pub fn with_brace_view<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let close = self.scan_to_matching(TokenKind::LeftBrace, TokenKind::RightBrace)?;
        self.install(close, f)
    }

    /// Narrow to the tokens before the next occurrence of `sentinel`.
    /// With `inclusive`, the view extends one token past it, so a
    /// sub-parser may consume the sentinel itself.
    pub fn with_sentinel_view<T>(
        &mut self,
        sentinel: TokenKind,
        inclusive: bool,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let at = self.scan_to_sentinel(sentinel)?;
        let end = if inclusive { at + 1 } else { at };
        self.install(end, f)
    }

    /// Narrow to the next top-level comma, or to the rest of the enclosing
    /// view when none exists.
    pub fn with_list_view<T>(
        &mut self,
        nest_angles: bool,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let end = self.scan_list(nest_angles)?;
        self.install(end, f)
    }

    /// Narrow to the tokens of a template argument list, up to the `>`
    /// closing the outer level.
    ///
    /// When that closer is the first half of a `>>` token, the token is
    /// split into two `RightAngle` tokens for the duration of the view and
    /// joined back on release. The returned flag is true in that case: the
    /// closing `>` has then already been consumed with the view and the
    /// caller must not read another one.
    pub fn with_angle_view<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<(T, bool)> {
        match self.scan_angle()? {
            AngleScan::Closed(close) => self.install(close, f).map(|v| (v, false)),
            AngleScan::Split(at) => {
                let original = self.split_right_shift(at);
                let result = self.install(at + 1, f);
                self.join_right_shift(at, original);
                result.map(|v| (v, true))
            }
        }
    }
}

fn delimiter_name(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::RightParen => ")",
        TokenKind::RightBracket => "]",
        TokenKind::RightBrace => "}",
        TokenKind::RightAngle => ">",
        TokenKind::Semicolon => ";",
        TokenKind::Colon => ":",
        TokenKind::Comma => ",",
        _ => "token",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn cursor(input: &str) -> TokenCursor<'_> {
        let tokens = Lexer::new(input)
            .tokenize()
            .expect("should lex")
            .into_iter()
            .filter(|t| !t.kind.is_comment())
            .collect();
        TokenCursor::new(tokens, input)
    }

    #[test]
    fn test_read_and_peek() {
        let mut cursor = cursor("a b");

        assert_eq!("a", cursor.peek().unwrap().text);
        assert_eq!("a", cursor.read().unwrap().text);
        assert_eq!("b", cursor.read().unwrap().text);
        assert!(cursor.at_end());
        assert!(matches!(
            cursor.read(),
            Err(ParseError::UnexpectedEndOfInput { .. })
        ));
    }

    #[test]
    fn test_paren_view_excludes_closing_token() {
        let mut cursor = cursor("(a (b) c) after");
        cursor.read().unwrap(); // consume '('

        cursor
            .with_paren_view(|cur| {
                let mut texts = vec![];
                while !cur.at_end() {
                    texts.push(cur.read()?.text.to_string());
                }
                assert_eq!(vec!["a", "(", "b", ")", "c"], texts);
                Ok(())
            })
            .unwrap();

        assert_eq!(")", cursor.read().unwrap().text);
        assert_eq!("after", cursor.read().unwrap().text);
    }

    #[test]
    fn test_view_restores_bounds_on_error() {
        let mut cursor = cursor("(a b) rest");
        cursor.read().unwrap();
        let outer = cursor.bounds();

        let result: ParseResult<()> = cursor.with_paren_view(|cur| {
            cur.read()?;
            Err(ParseError::NotImplemented {
                what: "forced failure".into(),
                position: None,
            })
        });

        assert!(result.is_err());
        assert_eq!(outer, cursor.bounds());
    }

    #[test]
    fn test_unmatched_paren_fails() {
        let mut cursor = cursor("(a b");
        cursor.read().unwrap();

        let result = cursor.with_paren_view(|_| Ok(()));
        assert!(matches!(
            result,
            Err(ParseError::UnmatchedDelimiter { delimiter: ")", .. })
        ));
    }

    #[test]
    fn test_sentinel_view() {
        let mut cursor = cursor("a b ; c");

        cursor
            .with_sentinel_view(TokenKind::Semicolon, false, |cur| {
                assert_eq!("a", cur.read()?.text);
                assert_eq!("b", cur.read()?.text);
                assert!(cur.at_end());
                Ok(())
            })
            .unwrap();

        assert_eq!(";", cursor.read().unwrap().text);
    }

    #[test]
    fn test_sentinel_view_inclusive() {
        let mut cursor = cursor("a ; b");

        cursor
            .with_sentinel_view(TokenKind::Semicolon, true, |cur| {
                cur.read()?;
                assert_eq!(";", cur.read()?.text);
                assert!(cur.at_end());
                Ok(())
            })
            .unwrap();

        assert_eq!("b", cursor.read().unwrap().text);
    }

    #[test]
    fn test_list_view_stops_at_top_level_comma() {
        let mut cursor = cursor("f(a, b), second");

        cursor
            .with_list_view(false, |cur| {
                let mut texts = vec![];
                while !cur.at_end() {
                    texts.push(cur.read()?.text.to_string());
                }
                assert_eq!(vec!["f", "(", "a", ",", "b", ")"], texts);
                Ok(())
            })
            .unwrap();

        assert_eq!(",", cursor.read().unwrap().text);
    }

    #[test]
    fn test_list_view_nests_angles() {
        let mut cursor = cursor("map<int, bool>, second");

        cursor
            .with_list_view(true, |cur| {
                while !cur.at_end() {
                    cur.read()?;
                }
                Ok(())
            })
            .unwrap();

        assert_eq!(",", cursor.read().unwrap().text);
    }

    #[test]
    fn test_list_view_without_comma_covers_rest() {
        let mut cursor = cursor("a b c");

        cursor
            .with_list_view(false, |cur| {
                let mut n = 0;
                while !cur.at_end() {
                    cur.read()?;
                    n += 1;
                }
                assert_eq!(3, n);
                Ok(())
            })
            .unwrap();

        assert!(cursor.at_end());
    }

    #[test]
    fn test_angle_view_plain() {
        let mut cursor = cursor("int > after");

        let ((), split) = cursor
            .with_angle_view(|cur| {
                assert_eq!("int", cur.read()?.text);
                assert!(cur.at_end());
                Ok(())
            })
            .unwrap();

        assert!(!split);
        assert_eq!(">", cursor.read().unwrap().text);
        assert_eq!("after", cursor.read().unwrap().text);
    }

    #[test]
    fn test_angle_view_splits_right_shift() {
        // as in the tail of `vector<vector<int>>`: the outer view closes on
        // the second half of the '>>'
        let mut cursor = cursor("vector < int >> after");

        let ((), split) = cursor
            .with_angle_view(|cur| {
                assert_eq!("vector", cur.read()?.text);
                assert_eq!("<", cur.read()?.text);
                assert_eq!("int", cur.read()?.text);
                let closing = cur.read()?;
                assert_eq!(TokenKind::RightAngle, closing.kind);
                assert_eq!(">", closing.text);
                assert!(cur.at_end());
                Ok(())
            })
            .unwrap();

        assert!(split);
        // the buffer is joined back: '>>' is one token again and fully
        // consumed by the view
        assert!(cursor.kind_at(5).is_none());
        assert_eq!("after", cursor.read().unwrap().text);
    }

    #[test]
    fn test_angle_view_rejoins_on_error() {
        let mut cursor = cursor("x < int >> tail");
        let outer = cursor.bounds();
        let before: Vec<_> = (0..8).filter_map(|i| cursor.kind_at(i)).collect();

        // the scan splits the '>>', then the sub-parse fails
        let result: ParseResult<((), bool)> = cursor.with_angle_view(|cur| {
            cur.read()?;
            Err(ParseError::NotImplemented {
                what: "forced failure".into(),
                position: None,
            })
        });

        assert!(result.is_err());
        assert_eq!(outer, cursor.bounds());

        // the '>>' token must be joined back
        let after: Vec<_> = (0..8).filter_map(|i| cursor.kind_at(i)).collect();
        assert_eq!(before, after);
        assert_eq!(Some(TokenKind::RightShift), cursor.kind_at(3));
    }

    #[test]
    fn test_matching_paren_index() {
        let mut cursor = cursor("x ( a ( b ) ) tail");
        cursor.read().unwrap();
        cursor.read().unwrap(); // consume 'x' and '('

        let close = cursor.matching_paren().unwrap();
        assert_eq!(Some(TokenKind::RightParen), cursor.kind_at(close));
        assert_eq!(Some(TokenKind::Identifier), cursor.kind_at(close + 1));
    }

    #[test]
    fn test_text_to_end() {
        let mut cursor = cursor("x = a + b;");
        cursor.read().unwrap();
        cursor.read().unwrap(); // consume 'x ='

        cursor
            .with_sentinel_view(TokenKind::Semicolon, false, |cur| {
                assert_eq!("a + b", cur.text_to_end());
                while !cur.at_end() {
                    cur.read()?;
                }
                Ok(())
            })
            .unwrap();
    }
}
