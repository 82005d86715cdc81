use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt::Display;
use std::rc::{Rc, Weak};

use crate::template::TemplateParameter;
use crate::types::Type;

use super::{
    ClassData, EnumData, EnumValueData, FunctionData, MacroData, NamespaceData, TypedefData,
    VariableData,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessSpecifier {
    #[default]
    Public,
    Protected,
    Private,
}

impl Display for AccessSpecifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessSpecifier::Public => f.write_str("public"),
            AccessSpecifier::Protected => f.write_str("protected"),
            AccessSpecifier::Private => f.write_str("private"),
        }
    }
}

/// Kind-specific payload of an entity.
#[derive(Debug)]
pub enum EntityData {
    Namespace(NamespaceData),
    Class(ClassData),
    Enum(EnumData),
    EnumValue(EnumValueData),
    Function(FunctionData),
    Variable(VariableData),
    Typedef(TypedefData),
    Macro(MacroData),
    TemplateParameter(TemplateParameter),
}

/// A declared program element in the semantic graph.
///
/// Children (namespace entities, class members, enumerators) are owned by
/// their parent; the parent link is weak. Every entity built during a file
/// parse is reachable from the program's global namespace.
#[derive(Debug)]
pub struct Entity {
    name: RefCell<String>,
    me: Weak<Entity>,
    parent: RefCell<Weak<Entity>>,
    access: Cell<AccessSpecifier>,
    documentation: RefCell<Option<String>>,
    data: RefCell<EntityData>,
}

impl Entity {
    pub fn new(name: impl Into<String>, data: EntityData) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            name: RefCell::new(name.into()),
            me: me.clone(),
            parent: RefCell::new(Weak::new()),
            access: Cell::new(AccessSpecifier::default()),
            documentation: RefCell::new(None),
            data: RefCell::new(data),
        })
    }

    pub fn namespace(name: impl Into<String>) -> Rc<Self> {
        Self::new(name, EntityData::Namespace(NamespaceData::default()))
    }

    pub fn class(name: impl Into<String>, is_struct: bool) -> Rc<Self> {
        Self::new(name, EntityData::Class(ClassData::new(is_struct)))
    }

    pub fn enumeration(name: impl Into<String>, enum_class: bool) -> Rc<Self> {
        Self::new(name, EntityData::Enum(EnumData::new(enum_class)))
    }

    pub fn enum_value(name: impl Into<String>, value: Option<String>) -> Rc<Self> {
        Self::new(name, EntityData::EnumValue(EnumValueData { value }))
    }

    pub fn function(name: impl Into<String>, data: FunctionData) -> Rc<Self> {
        Self::new(name, EntityData::Function(data))
    }

    pub fn variable(name: impl Into<String>, data: VariableData) -> Rc<Self> {
        Self::new(name, EntityData::Variable(data))
    }

    pub fn typedef(name: impl Into<String>, ty: Type) -> Rc<Self> {
        Self::new(name, EntityData::Typedef(TypedefData { ty }))
    }

    pub fn macro_def(name: impl Into<String>, parameters: Vec<String>) -> Rc<Self> {
        Self::new(name, EntityData::Macro(MacroData { parameters }))
    }

    pub fn template_parameter(parameter: TemplateParameter) -> Rc<Self> {
        let name = parameter.name().to_string();
        Self::new(name, EntityData::TemplateParameter(parameter))
    }

    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.borrow_mut() = name.into();
    }

    pub fn parent(&self) -> Option<Rc<Entity>> {
        self.parent.borrow().upgrade()
    }

    pub fn set_parent(&self, parent: &Rc<Entity>) {
        *self.parent.borrow_mut() = Rc::downgrade(parent);
    }

    pub fn access(&self) -> AccessSpecifier {
        self.access.get()
    }

    pub fn set_access(&self, access: AccessSpecifier) {
        self.access.set(access);
    }

    pub fn documentation(&self) -> Option<String> {
        self.documentation.borrow().clone()
    }

    pub fn set_documentation(&self, doc: impl Into<String>) {
        *self.documentation.borrow_mut() = Some(doc.into());
    }

    pub fn data(&self) -> Ref<'_, EntityData> {
        self.data.borrow()
    }

    pub fn data_mut(&self) -> RefMut<'_, EntityData> {
        self.data.borrow_mut()
    }

    pub fn is_namespace(&self) -> bool {
        matches!(&*self.data(), EntityData::Namespace(_))
    }

    pub fn is_class(&self) -> bool {
        matches!(&*self.data(), EntityData::Class(_))
    }

    pub fn is_class_template(&self) -> bool {
        matches!(&*self.data(), EntityData::Class(c) if c.is_template())
    }

    pub fn is_enum(&self) -> bool {
        matches!(&*self.data(), EntityData::Enum(_))
    }

    pub fn is_enum_value(&self) -> bool {
        matches!(&*self.data(), EntityData::EnumValue(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(&*self.data(), EntityData::Function(_))
    }

    pub fn is_variable(&self) -> bool {
        matches!(&*self.data(), EntityData::Variable(_))
    }

    pub fn is_typedef(&self) -> bool {
        matches!(&*self.data(), EntityData::Typedef(_))
    }

    pub fn is_macro(&self) -> bool {
        matches!(&*self.data(), EntityData::Macro(_))
    }

    pub fn is_template_parameter(&self) -> bool {
        matches!(&*self.data(), EntityData::TemplateParameter(_))
    }

    pub fn as_namespace(&self) -> Option<Ref<'_, NamespaceData>> {
        Ref::filter_map(self.data(), |data| match data {
            EntityData::Namespace(ns) => Some(ns),
            _ => None,
        })
        .ok()
    }

    pub fn as_class(&self) -> Option<Ref<'_, ClassData>> {
        Ref::filter_map(self.data(), |data| match data {
            EntityData::Class(class) => Some(class),
            _ => None,
        })
        .ok()
    }

    pub fn as_class_mut(&self) -> Option<RefMut<'_, ClassData>> {
        RefMut::filter_map(self.data_mut(), |data| match data {
            EntityData::Class(class) => Some(class),
            _ => None,
        })
        .ok()
    }

    pub fn as_enum(&self) -> Option<Ref<'_, EnumData>> {
        Ref::filter_map(self.data(), |data| match data {
            EntityData::Enum(e) => Some(e),
            _ => None,
        })
        .ok()
    }

    pub fn as_enum_mut(&self) -> Option<RefMut<'_, EnumData>> {
        RefMut::filter_map(self.data_mut(), |data| match data {
            EntityData::Enum(e) => Some(e),
            _ => None,
        })
        .ok()
    }

    pub fn as_enum_value(&self) -> Option<Ref<'_, EnumValueData>> {
        Ref::filter_map(self.data(), |data| match data {
            EntityData::EnumValue(v) => Some(v),
            _ => None,
        })
        .ok()
    }

    pub fn as_function(&self) -> Option<Ref<'_, FunctionData>> {
        Ref::filter_map(self.data(), |data| match data {
            EntityData::Function(func) => Some(func),
            _ => None,
        })
        .ok()
    }

    pub fn as_function_mut(&self) -> Option<RefMut<'_, FunctionData>> {
        RefMut::filter_map(self.data_mut(), |data| match data {
            EntityData::Function(func) => Some(func),
            _ => None,
        })
        .ok()
    }

    pub fn as_variable(&self) -> Option<Ref<'_, VariableData>> {
        Ref::filter_map(self.data(), |data| match data {
            EntityData::Variable(var) => Some(var),
            _ => None,
        })
        .ok()
    }

    pub fn as_typedef(&self) -> Option<Ref<'_, TypedefData>> {
        Ref::filter_map(self.data(), |data| match data {
            EntityData::Typedef(td) => Some(td),
            _ => None,
        })
        .ok()
    }

    pub fn as_macro(&self) -> Option<Ref<'_, MacroData>> {
        Ref::filter_map(self.data(), |data| match data {
            EntityData::Macro(m) => Some(m),
            _ => None,
        })
        .ok()
    }

    pub fn as_template_parameter(&self) -> Option<Ref<'_, TemplateParameter>> {
        Ref::filter_map(self.data(), |data| match data {
            EntityData::TemplateParameter(tp) => Some(tp),
            _ => None,
        })
        .ok()
    }

    /// The entity's owned children in declaration order.
    pub fn children(&self) -> Vec<Rc<Entity>> {
        match &*self.data() {
            EntityData::Namespace(ns) => ns.entities.clone(),
            EntityData::Class(class) => class.members.clone(),
            EntityData::Enum(e) => e.values.clone(),
            _ => vec![],
        }
    }

    /// Look a child up by name.
    pub fn find(&self, name: &str) -> Option<Rc<Entity>> {
        self.children().into_iter().find(|c| c.name() == name)
    }

    /// Append `child` to this scope and point its parent link here.
    pub fn add_child(&self, child: &Rc<Entity>) {
        *child.parent.borrow_mut() = self.me.clone();

        match &mut *self.data_mut() {
            EntityData::Namespace(ns) => ns.entities.push(Rc::clone(child)),
            EntityData::Class(class) => class.members.push(Rc::clone(child)),
            EntityData::Enum(e) => e.values.push(Rc::clone(child)),
            _ => unreachable!("only namespaces, classes and enums own children"),
        }
    }

    /// Reuse or create the named nested namespace.
    pub fn get_or_create_namespace(&self, name: &str) -> Rc<Entity> {
        if let Some(existing) = self.find(name) {
            if existing.is_namespace() {
                return existing;
            }
        }

        let ns = Entity::namespace(name);
        self.add_child(&ns);
        ns
    }

    /// Reuse or create the named class in this scope.
    pub fn get_or_create_class(&self, name: &str, is_struct: bool) -> Rc<Entity> {
        if let Some(existing) = self.find(name) {
            if existing.is_class() {
                return existing;
            }
        }

        let class = Entity::class(name, is_struct);
        self.add_child(&class);
        class
    }

    /// Reuse or create the named enum in this scope.
    pub fn get_or_create_enum(&self, name: &str, enum_class: bool) -> Rc<Entity> {
        if let Some(existing) = self.find(name) {
            if existing.is_enum() {
                return existing;
            }
        }

        let e = Entity::enumeration(name, enum_class);
        self.add_child(&e);
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_child_sets_parent() {
        let ns = Entity::namespace("n");
        let class = Entity::class("Foo", false);

        ns.add_child(&class);

        assert!(Rc::ptr_eq(&class.parent().unwrap(), &ns));
        assert_eq!(1, ns.children().len());
        assert!(ns.find("Foo").is_some());
        assert!(ns.find("Bar").is_none());
    }

    #[test]
    fn test_get_or_create_namespace_reuses() {
        let root = Entity::namespace("");

        let a = root.get_or_create_namespace("a");
        let a2 = root.get_or_create_namespace("a");

        assert!(Rc::ptr_eq(&a, &a2));
        assert_eq!(1, root.children().len());
    }

    #[test]
    fn test_access_defaults_to_public() {
        let class = Entity::class("Foo", false);
        assert_eq!(AccessSpecifier::Public, class.access());

        class.set_access(AccessSpecifier::Private);
        assert_eq!(AccessSpecifier::Private, class.access());
    }

    #[test]
    fn test_parent_link_is_weak() {
        let class = {
            let ns = Entity::namespace("n");
            let class = Entity::class("Foo", false);
            ns.add_child(&class);
            class
        };

        assert!(class.parent().is_none());
    }

    #[test]
    fn test_typed_accessors() {
        let td = Entity::typedef("Text", Type::simple("string"));

        assert!(td.is_typedef());
        assert_eq!(
            Type::simple("string"),
            td.as_typedef().unwrap().ty.clone()
        );
        assert!(td.as_function().is_none());
    }
}
