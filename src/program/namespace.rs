use std::rc::Rc;

use super::Entity;

/// Payload of a namespace entity: its children in declaration order.
#[derive(Debug, Default)]
pub struct NamespaceData {
    pub entities: Vec<Rc<Entity>>,
}
