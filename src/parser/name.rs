use crate::lexer::TokenKind;
use crate::name::Name;
use crate::template::TemplateArgument;

use super::{ParseError, ParseResult, ParseSession};

impl<'a> ParseSession<'a> {
    /// Parse a possibly qualified name: segments folded left-associatively
    /// over `::`.
    pub(crate) fn parse_name(&mut self) -> ParseResult<Name> {
        let mut name = self.parse_name_segment()?;

        while self.cursor.peek_kind() == Some(TokenKind::ColonColon) {
            self.cursor.read()?;
            let segment = self.parse_name_segment()?;
            name = Name::Qualified(Box::new(name), Box::new(segment));
        }

        Ok(name)
    }

    fn parse_name_segment(&mut self) -> ParseResult<Name> {
        let token = self.cursor.peek()?;

        match token.kind {
            // keywords that also name built-in types
            TokenKind::Void
            | TokenKind::Bool
            | TokenKind::Char
            | TokenKind::Int
            | TokenKind::Float
            | TokenKind::Double
            | TokenKind::Auto
            | TokenKind::This => {
                self.cursor.read()?;
                Ok(Name::Identifier(token.text.to_string()))
            }
            TokenKind::Operator => self.read_operator_name(),
            TokenKind::Tilde => {
                self.cursor.read()?;
                let inner = self.parse_name_segment()?;
                Ok(Name::Destructor(Box::new(inner)))
            }
            TokenKind::Identifier => self.read_user_defined_name(),
            _ => Err(ParseError::unexpected("identifier", &token)),
        }
    }

    /// `operator …` forms: overloaded operators, `operator()`,
    /// `operator[]`, literal operators and conversion-function names.
    fn read_operator_name(&mut self) -> ParseResult<Name> {
        self.cursor.expect(TokenKind::Operator, "'operator'")?;

        let op = self.cursor.peek()?;

        if op.kind.is_operator() {
            self.cursor.read()?;
            return Ok(Name::Operator(op.text.to_string()));
        }

        match op.kind {
            TokenKind::LeftParen => {
                let lp = self.cursor.read()?;
                let rp = self.cursor.expect(TokenKind::RightParen, "')'")?;

                if lp.line != rp.line || lp.col + 1 != rp.col {
                    return Err(ParseError::unexpected("'()' without blank space", &rp));
                }

                Ok(Name::Operator("()".to_string()))
            }
            TokenKind::LeftBracket => {
                let lb = self.cursor.read()?;
                let rb = self.cursor.expect(TokenKind::RightBracket, "']'")?;

                if lb.line != rb.line || lb.col + 1 != rb.col {
                    return Err(ParseError::unexpected("'[]' without blank space", &rb));
                }

                Ok(Name::Operator("[]".to_string()))
            }
            TokenKind::StringLiteral => {
                if op.text != "\"\"" {
                    return Err(ParseError::unexpected("'\"\"'", &op));
                }

                self.cursor.read()?;
                let suffix = self.parse_name()?;
                Ok(Name::LiteralOperator(suffix.to_string()))
            }
            TokenKind::UserDefinedLiteral => {
                if !op.text.starts_with("\"\"") {
                    return Err(ParseError::unexpected("'\"\"'", &op));
                }

                self.cursor.read()?;
                Ok(Name::LiteralOperator(op.text[2..].to_string()))
            }
            _ => self.read_conversion_name(),
        }
    }

    /// `operator Type`, the type bounded by the `(` of the parameter list
    /// when one follows.
    fn read_conversion_name(&mut self) -> ParseResult<Name> {
        let save = self.cursor.index();
        let has_paren = self.cursor.scan_to_sentinel(TokenKind::LeftParen).is_ok();

        let parsed = if has_paren {
            self.with_sentinel_view(TokenKind::LeftParen, false, |s| {
                let ty = s.parse_type()?;
                s.expect_at_end()?;
                Ok(ty)
            })
        } else {
            self.parse_type()
        };

        match parsed {
            Ok(ty) => Ok(Name::Conversion(Box::new(ty))),
            Err(_) => {
                self.cursor.set_index(save);
                let token = self.cursor.peek()?;
                Err(ParseError::unexpected("operator symbol", &token))
            }
        }
    }

    fn read_user_defined_name(&mut self) -> ParseResult<Name> {
        let base = self.cursor.expect(TokenKind::Identifier, "identifier")?;
        let mut name = Name::Identifier(base.text.to_string());

        if self.cursor.peek_kind() == Some(TokenKind::LeftAngle) {
            let save = self.cursor.index();

            match self.read_template_arguments(base.text) {
                Ok(template) => name = template,
                Err(_) => self.cursor.set_index(save),
            }
        }

        Ok(name)
    }

    /// The `<...>` of a template-id. A `>>` closing two lists at once is
    /// split by the angle view and joined back on release.
    pub(crate) fn read_template_arguments(&mut self, base: &str) -> ParseResult<Name> {
        self.cursor.expect(TokenKind::LeftAngle, "'<'")?;

        let mut args = vec![];

        let ((), split) = self.with_angle_view(|s| {
            while !s.cursor.at_end() {
                let arg = s.with_list_view(true, |s| s.parse_delimited_template_argument())?;
                args.push(arg);

                if !s.cursor.at_end() {
                    s.cursor.expect(TokenKind::Comma, "','")?;
                }
            }
            Ok(())
        })?;

        // a splitted '>>' is consumed with the view, a plain '>' is not
        if !split {
            self.cursor.expect(TokenKind::RightAngle, "'>'")?;
        }

        Ok(Name::Template {
            base: base.to_string(),
            args,
        })
    }

    /// One template argument, bounded by its list view: a type when the
    /// whole element parses as one, the verbatim element text otherwise.
    pub(crate) fn parse_delimited_template_argument(&mut self) -> ParseResult<TemplateArgument> {
        let text = self.cursor.text_to_end().to_string();
        let (_, end) = self.cursor.bounds();

        match self.parse_type() {
            Ok(ty) if self.cursor.at_end() => Ok(TemplateArgument::Type(ty)),
            _ => {
                self.cursor.set_index(end);
                Ok(TemplateArgument::Expr(text))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    fn parse(input: &str) -> Name {
        let mut session = ParseSession::new(input).expect("should lex");
        let name = session.parse_name().expect("should parse");
        session.expect_at_end().expect("should consume everything");
        name
    }

    #[test]
    fn test_parse_identifier() {
        assert_eq!(Name::identifier("foo"), parse("foo"));
        assert_eq!(Name::identifier("void"), parse("void"));
    }

    #[test]
    fn test_parse_qualified_name() {
        let name = parse("std::vector::iterator");

        assert_eq!("std::vector::iterator", name.to_string());

        // left-associative nesting
        let Name::Qualified(lhs, rhs) = &name else {
            panic!("expected qualified name");
        };
        assert_eq!("std::vector", lhs.to_string());
        assert_eq!("iterator", rhs.to_string());
    }

    #[test]
    fn test_parse_operator_names() {
        assert_eq!(Name::Operator("+".into()), parse("operator+"));
        assert_eq!(Name::Operator("==".into()), parse("operator=="));
        assert_eq!(Name::Operator("()".into()), parse("operator()"));
        assert_eq!(Name::Operator("[]".into()), parse("operator[]"));
    }

    #[test]
    fn test_parse_literal_operator_name() {
        assert_eq!(Name::LiteralOperator("_km".into()), parse("operator\"\"_km"));
        assert_eq!(Name::LiteralOperator("_s".into()), parse("operator \"\" _s"));
    }

    #[test]
    fn test_parse_conversion_name() {
        let name = parse("operator bool");
        assert_eq!(Name::Conversion(Box::new(Type::simple("bool"))), name);
    }

    #[test]
    fn test_parse_destructor_name() {
        assert_eq!(
            Name::Destructor(Box::new(Name::identifier("Widget"))),
            parse("~Widget")
        );
    }

    #[test]
    fn test_parse_template_name() {
        let name = parse("vector<int>");

        let Name::Template { base, args } = &name else {
            panic!("expected template name");
        };
        assert_eq!("vector", base);
        assert_eq!(&vec![TemplateArgument::Type(Type::simple("int"))], args);
    }

    #[test]
    fn test_parse_nested_template_splits_right_shift() {
        let name = parse("vector<vector<int>>");

        let Name::Template { base, args } = &name else {
            panic!("expected template name");
        };
        assert_eq!("vector", base);
        assert_eq!(1, args.len());

        let TemplateArgument::Type(Type::Simple(inner)) = &args[0] else {
            panic!("expected a type argument");
        };
        let Name::Template { base, args } = inner else {
            panic!("expected the argument to be a template name itself");
        };
        assert_eq!("vector", base);
        assert_eq!(&vec![TemplateArgument::Type(Type::simple("int"))], args);
    }

    #[test]
    fn test_parse_template_with_expression_argument() {
        let name = parse("array<int, 10>");

        let Name::Template { args, .. } = &name else {
            panic!("expected template name");
        };
        assert_eq!(
            &vec![
                TemplateArgument::Type(Type::simple("int")),
                TemplateArgument::Expr("10".into())
            ],
            args
        );
    }

    #[test]
    fn test_less_than_is_not_template() {
        // 'a < b' must fall back to the plain identifier
        let mut session = ParseSession::new("a < b").expect("should lex");
        let name = session.parse_name().expect("should parse");

        assert_eq!(Name::identifier("a"), name);
        assert!(!session.cursor.at_end());
    }

    #[test]
    fn test_parse_name_rejects_literals() {
        let mut session = ParseSession::new("42").expect("should lex");
        assert!(session.parse_name().is_err());
    }
}
