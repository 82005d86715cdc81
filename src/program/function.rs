use std::rc::Rc;

use crate::ast::AstNode;
use crate::template::TemplateParameter;
use crate::types::Type;

/// Bitset of function specifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FunctionSpecifiers(u16);

impl FunctionSpecifiers {
    pub const INLINE: FunctionSpecifiers = FunctionSpecifiers(1);
    pub const STATIC: FunctionSpecifiers = FunctionSpecifiers(2);
    pub const CONSTEXPR: FunctionSpecifiers = FunctionSpecifiers(4);
    pub const VIRTUAL: FunctionSpecifiers = FunctionSpecifiers(8);
    pub const OVERRIDE: FunctionSpecifiers = FunctionSpecifiers(16);
    pub const FINAL: FunctionSpecifiers = FunctionSpecifiers(32);
    pub const CONST: FunctionSpecifiers = FunctionSpecifiers(64);
    pub const EXPLICIT: FunctionSpecifiers = FunctionSpecifiers(128);
    pub const NOEXCEPT: FunctionSpecifiers = FunctionSpecifiers(256);
    pub const PURE: FunctionSpecifiers = FunctionSpecifiers(512);

    pub fn none() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, other: FunctionSpecifiers) {
        self.0 |= other.0;
    }

    pub fn contains(self, other: FunctionSpecifiers) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union, used when merging re-declarations.
    pub fn union(self, other: FunctionSpecifiers) -> FunctionSpecifiers {
        FunctionSpecifiers(self.0 | other.0)
    }

    pub fn is_inline(self) -> bool {
        self.contains(Self::INLINE)
    }

    pub fn is_static(self) -> bool {
        self.contains(Self::STATIC)
    }

    pub fn is_constexpr(self) -> bool {
        self.contains(Self::CONSTEXPR)
    }

    pub fn is_virtual(self) -> bool {
        self.contains(Self::VIRTUAL)
    }

    pub fn is_override(self) -> bool {
        self.contains(Self::OVERRIDE)
    }

    pub fn is_final(self) -> bool {
        self.contains(Self::FINAL)
    }

    pub fn is_const(self) -> bool {
        self.contains(Self::CONST)
    }

    pub fn is_explicit(self) -> bool {
        self.contains(Self::EXPLICIT)
    }

    pub fn is_noexcept(self) -> bool {
        self.contains(Self::NOEXCEPT)
    }

    pub fn is_pure(self) -> bool {
        self.contains(Self::PURE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FunctionKind {
    #[default]
    None,
    Constructor,
    Destructor,
    OperatorOverload,
    ConversionFunction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionParameter {
    pub ty: Type,
    pub name: String,
    pub default_value: Option<String>,
}

impl FunctionParameter {
    pub fn new(ty: Type, name: impl Into<String>) -> Self {
        Self {
            ty,
            name: name.into(),
            default_value: None,
        }
    }
}

/// Payload of a function entity. The body, when present, is the CST
/// compound statement of the defining declaration.
#[derive(Debug)]
pub struct FunctionData {
    pub return_type: Type,
    pub parameters: Vec<FunctionParameter>,
    pub template_parameters: Vec<TemplateParameter>,
    pub specifiers: FunctionSpecifiers,
    pub kind: FunctionKind,
    pub body: Option<Rc<AstNode>>,
}

impl FunctionData {
    pub fn new(return_type: Type) -> Self {
        Self {
            return_type,
            parameters: vec![],
            template_parameters: vec![],
            specifiers: FunctionSpecifiers::none(),
            kind: FunctionKind::None,
            body: None,
        }
    }

    pub fn is_template(&self) -> bool {
        !self.template_parameters.is_empty()
    }

    /// Structural signature equality: parameter count, parameter types and
    /// return type. Names are compared by the caller.
    pub fn same_signature(&self, other: &FunctionData) -> bool {
        self.parameters.len() == other.parameters.len()
            && self.return_type == other.return_type
            && self
                .parameters
                .iter()
                .zip(other.parameters.iter())
                .all(|(a, b)| a.ty == b.ty)
    }
}
