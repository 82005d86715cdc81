use crate::types::Type;

/// Bitset of variable specifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VariableSpecifiers(u8);

impl VariableSpecifiers {
    pub const INLINE: VariableSpecifiers = VariableSpecifiers(1);
    pub const STATIC: VariableSpecifiers = VariableSpecifiers(2);
    pub const CONSTEXPR: VariableSpecifiers = VariableSpecifiers(4);

    pub fn none() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, other: VariableSpecifiers) {
        self.0 |= other.0;
    }

    pub fn contains(self, other: VariableSpecifiers) -> bool {
        self.0 & other.0 == other.0
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
}

/// Payload of a variable entity; the default value is kept as raw
/// expression text.
#[derive(Debug)]
pub struct VariableData {
    pub ty: Type,
    pub specifiers: VariableSpecifiers,
    pub default_value: Option<String>,
}

impl VariableData {
    pub fn new(ty: Type) -> Self {
        Self {
            ty,
            specifiers: VariableSpecifiers::none(),
            default_value: None,
        }
    }
}
