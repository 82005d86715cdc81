use crate::types::Type;

/// Payload of a typedef (or alias) entity.
#[derive(Debug)]
pub struct TypedefData {
    pub ty: Type,
}
