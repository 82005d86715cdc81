pub mod dump;

use std::cell::RefCell;
use std::fmt::Display;
use std::rc::{Rc, Weak};

use crate::file::SourceRange;
use crate::program::Entity;

/// Kind of a concrete-syntax-tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    // declarations
    AccessSpecifierDeclaration,
    ClassDeclaration,
    EnumDeclaration,
    EnumeratorDeclaration,
    FunctionDeclaration,
    NamespaceDeclaration,
    ParameterDeclaration,
    TemplateParameterDeclaration,
    TypedefDeclaration,
    VariableDeclaration,
    // statements
    NullStatement,
    BreakStatement,
    CaseStatement,
    CatchStatement,
    CompoundStatement,
    ContinueStatement,
    DefaultStatement,
    DoWhileLoop,
    ExpressionStatement,
    ForLoop,
    ForRange,
    IfStatement,
    ReturnStatement,
    SwitchStatement,
    TryBlock,
    WhileLoop,
    // expressions
    UnexposedExpression,
    // meta
    Unexposed,
    Documentation,
}

impl NodeKind {
    pub fn is_declaration(self) -> bool {
        matches!(
            self,
            NodeKind::AccessSpecifierDeclaration
                | NodeKind::ClassDeclaration
                | NodeKind::EnumDeclaration
                | NodeKind::EnumeratorDeclaration
                | NodeKind::FunctionDeclaration
                | NodeKind::NamespaceDeclaration
                | NodeKind::ParameterDeclaration
                | NodeKind::TemplateParameterDeclaration
                | NodeKind::TypedefDeclaration
                | NodeKind::VariableDeclaration
        )
    }

    pub fn is_statement(self) -> bool {
        matches!(
            self,
            NodeKind::NullStatement
                | NodeKind::BreakStatement
                | NodeKind::CaseStatement
                | NodeKind::CatchStatement
                | NodeKind::CompoundStatement
                | NodeKind::ContinueStatement
                | NodeKind::DefaultStatement
                | NodeKind::DoWhileLoop
                | NodeKind::ExpressionStatement
                | NodeKind::ForLoop
                | NodeKind::ForRange
                | NodeKind::IfStatement
                | NodeKind::ReturnStatement
                | NodeKind::SwitchStatement
                | NodeKind::TryBlock
                | NodeKind::WhileLoop
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Root => "Root",
            NodeKind::AccessSpecifierDeclaration => "AccessSpecifierDeclaration",
            NodeKind::ClassDeclaration => "ClassDeclaration",
            NodeKind::EnumDeclaration => "EnumDeclaration",
            NodeKind::EnumeratorDeclaration => "EnumeratorDeclaration",
            NodeKind::FunctionDeclaration => "FunctionDeclaration",
            NodeKind::NamespaceDeclaration => "NamespaceDeclaration",
            NodeKind::ParameterDeclaration => "ParameterDeclaration",
            NodeKind::TemplateParameterDeclaration => "TemplateParameterDeclaration",
            NodeKind::TypedefDeclaration => "TypedefDeclaration",
            NodeKind::VariableDeclaration => "VariableDeclaration",
            NodeKind::NullStatement => "NullStatement",
            NodeKind::BreakStatement => "BreakStatement",
            NodeKind::CaseStatement => "CaseStatement",
            NodeKind::CatchStatement => "CatchStatement",
            NodeKind::CompoundStatement => "CompoundStatement",
            NodeKind::ContinueStatement => "ContinueStatement",
            NodeKind::DefaultStatement => "DefaultStatement",
            NodeKind::DoWhileLoop => "DoWhileLoop",
            NodeKind::ExpressionStatement => "ExpressionStatement",
            NodeKind::ForLoop => "ForLoop",
            NodeKind::ForRange => "ForRange",
            NodeKind::IfStatement => "IfStatement",
            NodeKind::ReturnStatement => "ReturnStatement",
            NodeKind::SwitchStatement => "SwitchStatement",
            NodeKind::TryBlock => "TryBlock",
            NodeKind::WhileLoop => "WhileLoop",
            NodeKind::UnexposedExpression => "UnexposedExpression",
            NodeKind::Unexposed => "Unexposed",
            NodeKind::Documentation => "Documentation",
        }
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A node of the concrete syntax tree.
///
/// Children are owned by their parent; the parent link is weak, which keeps
/// the tree acyclic for ownership purposes. Declaration nodes may reference
/// the semantic entity they introduced. `text` carries the verbatim source
/// of unexposed constructs and expressions.
///
/// Fixed-arity kinds keep their children in a documented order:
/// `WhileLoop`/`SwitchStatement` are {condition/value, body}, `DoWhileLoop`
/// is {body, condition}, `IfStatement` is {condition, body, else?},
/// `ForLoop` is {init, condition, iter, body}, `ForRange` is {variable,
/// container, body}, `CaseStatement` is {value, statement} and
/// `CatchStatement` is {parameter, body}.
#[derive(Debug)]
pub struct AstNode {
    kind: NodeKind,
    me: Weak<AstNode>,
    range: RefCell<SourceRange>,
    parent: RefCell<Weak<AstNode>>,
    children: RefCell<Vec<Rc<AstNode>>>,
    entity: RefCell<Option<Rc<Entity>>>,
    text: RefCell<Option<String>>,
}

impl AstNode {
    pub fn new(kind: NodeKind) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            kind,
            me: me.clone(),
            range: RefCell::new(SourceRange::default()),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(vec![]),
            entity: RefCell::new(None),
            text: RefCell::new(None),
        })
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_declaration(&self) -> bool {
        self.kind.is_declaration()
    }

    pub fn is_statement(&self) -> bool {
        self.kind.is_statement()
    }

    pub fn range(&self) -> SourceRange {
        self.range.borrow().clone()
    }

    pub fn set_range(&self, range: SourceRange) {
        *self.range.borrow_mut() = range;
    }

    pub fn parent(&self) -> Option<Rc<AstNode>> {
        self.parent.borrow().upgrade()
    }

    pub fn set_parent(&self, parent: &Rc<AstNode>) {
        *self.parent.borrow_mut() = Rc::downgrade(parent);
    }

    /// Append `child` in source order and point its parent link here.
    pub fn append(&self, child: &Rc<AstNode>) {
        *child.parent.borrow_mut() = self.me.clone();
        self.children.borrow_mut().push(Rc::clone(child));
    }

    pub fn children(&self) -> Vec<Rc<AstNode>> {
        self.children.borrow().clone()
    }

    pub fn child(&self, index: usize) -> Option<Rc<AstNode>> {
        self.children.borrow().get(index).cloned()
    }

    pub fn child_count(&self) -> usize {
        self.children.borrow().len()
    }

    pub fn entity(&self) -> Option<Rc<Entity>> {
        self.entity.borrow().clone()
    }

    pub fn set_entity(&self, entity: &Rc<Entity>) {
        *self.entity.borrow_mut() = Some(Rc::clone(entity));
    }

    pub fn text(&self) -> Option<String> {
        self.text.borrow().clone()
    }

    pub fn set_text(&self, text: impl Into<String>) {
        *self.text.borrow_mut() = Some(text.into());
    }
}
