use std::rc::Rc;

use cxxtree::ast::{dump, AstNode, NodeKind};
use cxxtree::program::Entity;
use cxxtree::types::Type;
use cxxtree::RestrictedParser;

/// Every child's source range must lie within its parent's.
fn assert_range_containment(node: &Rc<AstNode>) {
    let range = node.range();

    for child in node.children() {
        let child_range = child.range();
        assert!(
            range.contains(&child_range),
            "{:?} range {}:{}--{}:{} escapes its {:?} parent ({}:{}--{}:{})",
            child.kind(),
            child_range.begin.line,
            child_range.begin.col,
            child_range.end.line,
            child_range.end.col,
            node.kind(),
            range.begin.line,
            range.begin.col,
            range.end.line,
            range.end.col,
        );
        assert_range_containment(&child);
    }
}

/// Every entity must hang off exactly its enclosing entity.
fn assert_scope_consistency(scope: &Rc<Entity>) {
    for child in scope.children() {
        let parent = child.parent().expect("entity has a parent");
        assert!(Rc::ptr_eq(&parent, scope), "broken parent link for {}", child.name());
        assert_scope_consistency(&child);
    }
}

const NAMESPACE_SCENARIO: &str =
    "namespace n { struct Foo { int bar() const; }; int n::Foo::bar() const { return -1; } }";

#[test]
fn namespace_struct_member_definition_merges() {
    let mut parser = RestrictedParser::new();
    let file = parser
        .parse_file_content("scenario.h", NAMESPACE_SCENARIO)
        .expect("should parse");

    let program = parser.program();
    let global = program.global_namespace();

    // exactly one namespace entity n
    let top: Vec<_> = global.children();
    assert_eq!(1, top.len());
    let ns = &top[0];
    assert!(ns.is_namespace());
    assert_eq!("n", ns.name());

    // inside it exactly one class Foo, a struct
    let inner = ns.children();
    assert_eq!(1, inner.len());
    let foo = &inner[0];
    assert!(foo.is_class());
    assert_eq!("Foo", foo.name());
    assert!(foo.as_class().unwrap().is_struct);

    // Foo has exactly one member: int bar() const, with a body
    let members = foo.children();
    assert_eq!(1, members.len());
    let bar = &members[0];
    assert!(bar.is_function());
    assert_eq!("bar", bar.name());

    let data = bar.as_function().unwrap();
    assert!(data.specifiers.is_const());
    assert_eq!(Type::simple("int"), data.return_type);
    assert_eq!(0, data.parameters.len());

    let body = data.body.clone().expect("merged body");
    assert_eq!(NodeKind::CompoundStatement, body.kind());
    assert_eq!(1, body.child_count());

    let ret = body.child(0).unwrap();
    assert_eq!(NodeKind::ReturnStatement, ret.kind());
    assert_eq!(Some("-1".to_string()), ret.child(0).unwrap().text());

    // the astmap points from the entity back to a declaration node that
    // references it
    let decl = program.ast_of(bar).expect("bar is bound");
    assert_eq!(NodeKind::FunctionDeclaration, decl.kind());
    assert!(Rc::ptr_eq(&decl.entity().unwrap(), bar));

    // the CST root is attached to the file record
    let root = file.ast.borrow().clone().expect("attached syntax tree");
    assert_eq!(NodeKind::Root, root.kind());

    assert_range_containment(&root);
    assert_scope_consistency(&global);
}

#[test]
fn parse_file_reads_through_the_cache() {
    let path = std::env::temp_dir().join(format!("cxxtree_it_{}.h", std::process::id()));
    std::fs::write(&path, "namespace io { void flush(); }\n").expect("temp file is writable");

    let mut parser = RestrictedParser::new();
    let file = parser
        .parse_file(&path.to_string_lossy())
        .expect("should parse");

    assert!(file.ast.borrow().is_some());
    assert_eq!(1, parser.program().files().len());

    let io = parser.program().global_namespace().find("io").unwrap();
    assert!(io.find("flush").is_some());

    std::fs::remove_file(&path).ok();
}

#[test]
fn skip_function_bodies_leaves_empty_declarations() {
    let source = "void f() { if (x) { g(); } return; }";

    let mut parser = RestrictedParser::new();
    parser.skip_function_bodies = true;
    let root = parser.parse_source(source).expect("should parse");

    let decl = root.child(0).unwrap();
    assert_eq!(NodeKind::FunctionDeclaration, decl.kind());
    assert_eq!(0, decl.child_count());

    let f = parser.program().global_namespace().find("f").unwrap();
    assert!(f.as_function().unwrap().body.is_none());

    // the same source parses with bodies on
    let mut parser = RestrictedParser::new();
    let root = parser.parse_source(source).expect("should parse");
    let decl = root.child(0).unwrap();
    assert_eq!(1, decl.child_count());
}

#[test]
fn parsing_twice_keeps_one_entity() {
    let mut parser = RestrictedParser::new();
    parser
        .parse_source("void log(int level);")
        .expect("should parse");
    parser
        .parse_source("void log(int level = 1) { emit(level); }")
        .expect("should parse");

    let global = parser.program().global_namespace();
    let functions: Vec<_> = global
        .children()
        .into_iter()
        .filter(|e| e.is_function())
        .collect();

    assert_eq!(1, functions.len());

    let data = functions[0].as_function().unwrap();
    assert_eq!(1, data.parameters.len());
    assert_eq!(Some("1".to_string()), data.parameters[0].default_value);
    assert!(data.body.is_some());
}

#[test]
fn nested_template_angles_split() {
    let ty = RestrictedParser::parse_type("vector<vector<int>>").expect("should parse");
    assert_eq!("vector<vector<int>>", ty.to_string());

    let mut parser = RestrictedParser::new();
    parser
        .parse_source("namespace v { vector<vector<int>> grid; }")
        .expect("should parse");

    let v = parser.program().global_namespace().find("v").unwrap();
    let grid = v.find("grid").unwrap();
    assert_eq!(
        "vector<vector<int>>",
        grid.as_variable().unwrap().ty.to_string()
    );
}

#[test]
fn dump_shape_is_stable() {
    let mut parser = RestrictedParser::new();
    let file = parser
        .parse_file_content("dump.h", "namespace n { int x = 1; }")
        .expect("should parse");

    let root = file.ast.borrow().clone().unwrap();
    assert_eq!(
        "0:0--0:26 [Root]\n\
         \x20 0:0--0:26 [NamespaceDeclaration] n\n\
         \x20   0:14--0:24 [VariableDeclaration] x\n",
        dump::to_string(&root)
    );
}

#[test]
fn parse_errors_discard_partial_state_cleanly() {
    let mut parser = RestrictedParser::new();

    // unmatched brace: fatal, no recovery
    assert!(parser.parse_source("namespace broken { void f() {").is_err());

    // the parser object stays usable for the next parse
    parser.parse_source("namespace ok {}").expect("should parse");
    assert!(parser.program().global_namespace().find("ok").is_some());
}

#[test]
fn access_specifiers_stop_at_class_end() {
    let mut parser = RestrictedParser::new();
    parser
        .parse_source("class A { public: int x; };\nclass B { int y; };\n")
        .expect("should parse");

    let global = parser.program().global_namespace();
    let b = global.find("B").unwrap();

    // B's member must get B's default access, not A's trailing 'public:'
    assert_eq!(
        cxxtree::program::AccessSpecifier::Private,
        b.children()[0].access()
    );
}

#[test]
fn full_invariant_walk_over_a_mixed_file() {
    let source = r#"
namespace app {

typedef int Length;
using Text = std::string;

enum class Mode { Off, On = 1 };

template<typename T> class Box {
public:
    T value;
    void reset();
};

struct Config : public Base {
    int verbosity;
    static void configure(Text path = "app.cfg");
    ~Config();
};

void run();

void run() {
    int attempts = 0;
    for (int i = 0; i < 3; i = i + 1) {
        attempts = attempts + 1;
    }
    while (pending()) {
        step();
    }
    if (failed()) {
        return;
    }
}

}
"#;

    let mut parser = RestrictedParser::new();
    let file = parser
        .parse_file_content("mixed.h", source)
        .expect("should parse");

    let root = file.ast.borrow().clone().unwrap();
    assert_range_containment(&root);

    let program = parser.program();
    let global = program.global_namespace();
    assert_scope_consistency(&global);

    let app = global.find("app").unwrap();
    assert!(app.find("Length").unwrap().is_typedef());
    assert!(app.find("Text").unwrap().is_typedef());
    assert!(app.find("Mode").unwrap().is_enum());
    assert!(app.find("Box").unwrap().is_class_template());
    assert!(app.find("Config").unwrap().is_class());

    let run = app.find("run").unwrap();
    assert!(run.as_function().unwrap().body.is_some());

    let config = app.find("Config").unwrap();
    let configure = config.find("configure").unwrap();
    let data = configure.as_function().unwrap();
    assert!(data.specifiers.is_static());
    assert_eq!(
        Some("\"app.cfg\"".to_string()),
        data.parameters[0].default_value
    );
}
