mod class;
mod entity;
mod enumeration;
mod function;
mod macros;
mod namespace;
mod typedef;
mod variable;

pub use class::*;
pub use entity::*;
pub use enumeration::*;
pub use function::*;
pub use macros::*;
pub use namespace::*;
pub use typedef::*;
pub use variable::*;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::AstNode;
use crate::file::File;
use crate::name::Name;

/// The semantic model of everything parsed so far: a global namespace, the
/// list of parsed files, and the astmap linking entities to the CST
/// declaration node that introduced them.
#[derive(Debug)]
pub struct Program {
    global: Rc<Entity>,
    files: RefCell<Vec<Rc<File>>>,
    astmap: RefCell<HashMap<usize, Rc<AstNode>>>,
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl Program {
    pub fn new() -> Self {
        Self {
            global: Entity::namespace(""),
            files: RefCell::new(vec![]),
            astmap: RefCell::new(HashMap::new()),
        }
    }

    /// The unnamed namespace containing every top-level entity.
    pub fn global_namespace(&self) -> Rc<Entity> {
        Rc::clone(&self.global)
    }

    pub fn files(&self) -> Vec<Rc<File>> {
        self.files.borrow().clone()
    }

    pub fn add_file(&self, file: &Rc<File>) {
        let mut files = self.files.borrow_mut();
        if !files.iter().any(|f| Rc::ptr_eq(f, file)) {
            files.push(Rc::clone(file));
        }
    }

    /// Bind `entity` to the declaration node that introduced it.
    pub fn bind(&self, entity: &Rc<Entity>, node: &Rc<AstNode>) {
        node.set_entity(entity);
        self.astmap
            .borrow_mut()
            .insert(Rc::as_ptr(entity) as usize, Rc::clone(node));
    }

    /// The CST declaration node bound to `entity`, if any.
    pub fn ast_of(&self, entity: &Rc<Entity>) -> Option<Rc<AstNode>> {
        self.astmap
            .borrow()
            .get(&(Rc::as_ptr(entity) as usize))
            .cloned()
    }

    /// Simple scoped resolution: look the name's segments up starting at
    /// `scope`, retrying from each enclosing scope up to the global
    /// namespace.
    pub fn resolve(&self, name: &Name, scope: &Rc<Entity>) -> Option<Rc<Entity>> {
        let segments = name
            .segments()
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>();

        let mut context = Some(Rc::clone(scope));

        while let Some(start) = context {
            let mut current = Rc::clone(&start);
            let mut matched = true;

            for segment in &segments {
                match current.find(segment) {
                    Some(next) => current = next,
                    None => {
                        matched = false;
                        break;
                    }
                }
            }

            if matched {
                return Some(current);
            }

            context = start.parent();
        }

        None
    }

    pub fn resolve_global(&self, name: &Name) -> Option<Rc<Entity>> {
        self.resolve(name, &self.global)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;

    #[test]
    fn test_global_namespace_is_root() {
        let program = Program::new();
        let global = program.global_namespace();

        assert!(global.is_namespace());
        assert_eq!("", global.name());
        assert!(global.parent().is_none());
    }

    #[test]
    fn test_bind_and_astmap() {
        let program = Program::new();
        let entity = Entity::namespace("n");
        let node = AstNode::new(NodeKind::NamespaceDeclaration);

        program.bind(&entity, &node);

        let bound = program.ast_of(&entity).expect("should be bound");
        assert!(Rc::ptr_eq(&bound, &node));
        assert!(Rc::ptr_eq(&node.entity().unwrap(), &entity));
    }

    #[test]
    fn test_resolve_walks_scopes() {
        let program = Program::new();
        let global = program.global_namespace();

        let n = Entity::get_or_create_namespace(&global, "n");
        let foo = Entity::class("Foo", true);
        Entity::add_child(&n, &foo);

        let name = Name::qualified(vec![Name::identifier("n"), Name::identifier("Foo")]);
        let found = program.resolve_global(&name).expect("should resolve");
        assert!(Rc::ptr_eq(&found, &foo));

        // resolution from an inner scope sees outer names
        let inner = Name::identifier("Foo");
        let found = program.resolve(&inner, &n).expect("should resolve");
        assert!(Rc::ptr_eq(&found, &foo));

        assert!(program.resolve_global(&Name::identifier("Bar")).is_none());
    }
}
