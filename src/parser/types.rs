use crate::lexer::TokenKind;
use crate::name::Name;
use crate::types::{CvQualifier, RefKind, Type};

use super::{ParseResult, ParseSession};

fn assemble(base: Type, cv: Option<CvQualifier>, reference: Option<RefKind>) -> Type {
    let mut ty = base;

    if let Some(cv) = cv {
        ty = Type::cv_qualified(ty, cv);
    }

    if let Some(kind) = reference {
        ty = Type::reference(ty, kind);
    }

    ty
}

impl<'a> ParseSession<'a> {
    /// Parse a type: optional leading cv-qualifiers, a name, trailing
    /// cv-qualifiers and/or a reference mark in either order, then
    /// speculatively a function signature or a pointer chain.
    pub(crate) fn parse_type(&mut self) -> ParseResult<Type> {
        let mut cv: Option<CvQualifier> = None;
        let mut reference: Option<RefKind> = None;

        loop {
            match self.cursor.peek_kind() {
                Some(TokenKind::Const) => {
                    self.cursor.read()?;
                    cv = Some(merge_cv(cv, CvQualifier::Const));
                }
                Some(TokenKind::Volatile) => {
                    self.cursor.read()?;
                    cv = Some(merge_cv(cv, CvQualifier::Volatile));
                }
                _ => break,
            }
        }

        let base = self.parse_base_type()?;

        if self.cursor.at_end() {
            return Ok(assemble(base, cv, reference));
        }

        // trailing cv-qualifiers and reference mark, in either order
        match self.cursor.peek_kind() {
            Some(TokenKind::Const) | Some(TokenKind::Volatile) => {
                while let Some(kind) = self.cursor.peek_kind() {
                    match kind {
                        TokenKind::Const => {
                            self.cursor.read()?;
                            cv = Some(merge_cv(cv, CvQualifier::Const));
                        }
                        TokenKind::Volatile => {
                            self.cursor.read()?;
                            cv = Some(merge_cv(cv, CvQualifier::Volatile));
                        }
                        _ => break,
                    }
                }

                match self.cursor.peek_kind() {
                    Some(TokenKind::Ampersand) => {
                        self.cursor.read()?;
                        reference = Some(RefKind::LValue);
                    }
                    Some(TokenKind::AmpAmp) => {
                        self.cursor.read()?;
                        reference = Some(RefKind::RValue);
                    }
                    _ => {}
                }
            }
            Some(TokenKind::Ampersand) | Some(TokenKind::AmpAmp) => {
                let token = self.cursor.read()?;
                reference = Some(if token.kind == TokenKind::Ampersand {
                    RefKind::LValue
                } else {
                    RefKind::RValue
                });

                while let Some(kind) = self.cursor.peek_kind() {
                    match kind {
                        TokenKind::Const => {
                            self.cursor.read()?;
                            cv = Some(merge_cv(cv, CvQualifier::Const));
                        }
                        TokenKind::Volatile => {
                            self.cursor.read()?;
                            cv = Some(merge_cv(cv, CvQualifier::Volatile));
                        }
                        _ => break,
                    }
                }
            }
            _ => {}
        }

        if self.cursor.at_end() {
            return Ok(assemble(base, cv, reference));
        }

        match self.cursor.peek_kind() {
            Some(TokenKind::LeftParen) => {
                // speculative function-signature parse under save/restore
                let save = self.cursor.index();
                let result_type = assemble(base.clone(), cv, reference);

                match self.try_read_function_signature(result_type) {
                    Ok(signature) => return Ok(signature),
                    Err(_) => self.cursor.set_index(save),
                }
            }
            Some(TokenKind::Star) => {
                self.cursor.read()?;
                let mut ty = Type::pointer(assemble(base.clone(), cv, reference));

                while let Some(kind) = self.cursor.peek_kind() {
                    match kind {
                        TokenKind::Const => {
                            self.cursor.read()?;
                            ty = Type::cv_qualified(ty, CvQualifier::Const);
                        }
                        TokenKind::Volatile => {
                            self.cursor.read()?;
                            ty = Type::cv_qualified(ty, CvQualifier::Volatile);
                        }
                        TokenKind::Star => {
                            self.cursor.read()?;
                            ty = Type::pointer(ty);
                        }
                        _ => break,
                    }
                }

                return Ok(ty);
            }
            _ => {}
        }

        Ok(assemble(base, cv, reference))
    }

    fn parse_base_type(&mut self) -> ParseResult<Type> {
        if self.cursor.peek_kind() == Some(TokenKind::Decltype) {
            self.cursor.read()?;
            self.cursor.expect(TokenKind::LeftParen, "'('")?;
            self.cursor.expect(TokenKind::Auto, "'auto'")?;
            self.cursor.expect(TokenKind::RightParen, "')'")?;
            return Ok(Type::DecltypeAuto);
        }

        let name = self.parse_name()?;

        if name == Name::identifier("auto") {
            return Ok(Type::Auto);
        }

        Ok(Type::Simple(name))
    }

    /// `(params)` after a type: a comma-separated list of parameter types.
    /// The caller restores the cursor when this fails.
    pub(crate) fn try_read_function_signature(&mut self, result_type: Type) -> ParseResult<Type> {
        self.cursor.expect(TokenKind::LeftParen, "'('")?;

        let mut params = vec![];

        self.with_paren_view(|s| {
            while !s.cursor.at_end() {
                let ty = s.with_list_view(false, |s| s.parse_type())?;
                params.push(ty);

                if !s.cursor.at_end() {
                    s.cursor.expect(TokenKind::Comma, "','")?;
                }
            }
            Ok(())
        })?;

        self.cursor.expect(TokenKind::RightParen, "')'")?;

        Ok(Type::function(result_type, params))
    }
}

fn merge_cv(current: Option<CvQualifier>, new: CvQualifier) -> CvQualifier {
    match current {
        Some(existing) => existing.combine(new),
        None => new,
    }
}
