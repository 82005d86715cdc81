use std::rc::{Rc, Weak};

use crate::template::TemplateParameter;

use super::{AccessSpecifier, Entity};

/// A base-class edge. The link is weak so a malformed inheritance cycle
/// cannot leak; `name` keeps the spelling even when the base did not
/// resolve.
#[derive(Debug, Clone)]
pub struct BaseClass {
    pub access: AccessSpecifier,
    pub name: String,
    pub base: Weak<Entity>,
}

impl BaseClass {
    pub fn is_public(&self) -> bool {
        self.access == AccessSpecifier::Public
    }

    pub fn base(&self) -> Option<Rc<Entity>> {
        self.base.upgrade()
    }
}

/// Payload of a class entity. `template_parameters` is `Some` for class
/// templates.
#[derive(Debug, Default)]
pub struct ClassData {
    pub is_struct: bool,
    pub is_final: bool,
    pub bases: Vec<BaseClass>,
    pub members: Vec<Rc<Entity>>,
    pub template_parameters: Option<Vec<TemplateParameter>>,
}

impl ClassData {
    pub fn new(is_struct: bool) -> Self {
        Self {
            is_struct,
            ..Self::default()
        }
    }

    pub fn is_template(&self) -> bool {
        self.template_parameters.is_some()
    }
}
