use std::fmt::Display;

use crate::name::Name;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CvQualifier {
    Const,
    Volatile,
    ConstVolatile,
}

impl CvQualifier {
    pub fn combine(self, other: CvQualifier) -> CvQualifier {
        if self == other {
            return self;
        }

        CvQualifier::ConstVolatile
    }

    pub fn is_const(self) -> bool {
        matches!(self, CvQualifier::Const | CvQualifier::ConstVolatile)
    }

    pub fn is_volatile(self) -> bool {
        matches!(self, CvQualifier::Volatile | CvQualifier::ConstVolatile)
    }
}

impl Display for CvQualifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CvQualifier::Const => f.write_str("const"),
            CvQualifier::Volatile => f.write_str("volatile"),
            CvQualifier::ConstVolatile => f.write_str("const volatile"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    LValue,
    RValue,
}

/// A C++ type. Immutable once built; equality compares the canonical
/// string form.
#[derive(Debug, Clone, Eq)]
pub enum Type {
    Simple(Name),
    Auto,
    DecltypeAuto,
    CvQualified(CvQualifier, Box<Type>),
    Reference(RefKind, Box<Type>),
    Pointer(Box<Type>),
    Function {
        result: Box<Type>,
        params: Vec<Type>,
    },
}

impl Type {
    pub fn simple(name: impl Into<String>) -> Self {
        Type::Simple(Name::Identifier(name.into()))
    }

    /// Qualifying an already qualified type merges the qualifiers.
    pub fn cv_qualified(ty: Type, qual: CvQualifier) -> Self {
        match ty {
            Type::CvQualified(existing, inner) => {
                Type::CvQualified(existing.combine(qual), inner)
            }
            other => Type::CvQualified(qual, Box::new(other)),
        }
    }

    pub fn reference(ty: Type, kind: RefKind) -> Self {
        Type::Reference(kind, Box::new(ty))
    }

    pub fn pointer(ty: Type) -> Self {
        Type::Pointer(Box::new(ty))
    }

    pub fn function(result: Type, params: Vec<Type>) -> Self {
        Type::Function {
            result: Box::new(result),
            params,
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Type::Auto)
    }

    pub fn is_decltype_auto(&self) -> bool {
        matches!(self, Type::DecltypeAuto)
    }

    pub fn is_cv_qualified(&self) -> bool {
        matches!(self, Type::CvQualified(_, _))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Reference(_, _))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Type::Function { .. })
    }

    pub fn cv_qualification(&self) -> Option<CvQualifier> {
        match self {
            Type::CvQualified(qual, _) => Some(*qual),
            _ => None,
        }
    }

    pub fn reference_kind(&self) -> Option<RefKind> {
        match self {
            Type::Reference(kind, _) => Some(*kind),
            _ => None,
        }
    }

    /// The type a pointer or reference refers to.
    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Pointer(inner) | Type::Reference(_, inner) => Some(inner),
            _ => None,
        }
    }

    pub fn without_cv(&self) -> &Type {
        match self {
            Type::CvQualified(_, inner) => inner,
            other => other,
        }
    }

    pub fn result_type(&self) -> Option<&Type> {
        match self {
            Type::Function { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn parameters(&self) -> &[Type] {
        match self {
            Type::Function { params, .. } => params,
            _ => &[],
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Simple(name) => write!(f, "{name}"),
            Type::Auto => f.write_str("auto"),
            Type::DecltypeAuto => f.write_str("decltype(auto)"),
            Type::CvQualified(qual, inner) => match inner.as_ref() {
                // qualifiers on a pointer go to the right of the star
                Type::Pointer(_) => write!(f, "{inner} {qual}"),
                _ => write!(f, "{qual} {inner}"),
            },
            Type::Reference(RefKind::LValue, inner) => write!(f, "{inner}&"),
            Type::Reference(RefKind::RValue, inner) => write!(f, "{inner}&&"),
            Type::Pointer(inner) => write!(f, "{inner}*"),
            Type::Function { result, params } => {
                write!(f, "{result}(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{param}")?;
                }
                f.write_str(")")
            }
        }
    }
}
