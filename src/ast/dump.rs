//! Plain-text and serializable dumps of a CST, for test and tool consumers.

use std::io::{self, Write};
use std::rc::Rc;

use serde::Serialize;

use super::AstNode;

/// Write one line per node:
/// `<start-line:start-col>--<end-line:end-col> [KindName]`, followed by the
/// entity name for declarations, indented two spaces per depth level.
pub fn write_tree<W: Write>(out: &mut W, node: &Rc<AstNode>) -> io::Result<()> {
    write_node(out, node, 0)
}

fn write_node<W: Write>(out: &mut W, node: &Rc<AstNode>, depth: usize) -> io::Result<()> {
    let range = node.range();

    write!(
        out,
        "{:indent$}{}:{}--{}:{} [{}]",
        "",
        range.begin.line,
        range.begin.col,
        range.end.line,
        range.end.col,
        node.kind(),
        indent = 2 * depth
    )?;

    if node.is_declaration() {
        if let Some(entity) = node.entity() {
            write!(out, " {}", entity.name())?;
        }
    }

    writeln!(out)?;

    for child in node.children() {
        write_node(out, &child, depth + 1)?;
    }

    Ok(())
}

pub fn to_string(node: &Rc<AstNode>) -> String {
    let mut buffer = Vec::new();
    write_tree(&mut buffer, node).expect("writing to a Vec cannot fail");
    String::from_utf8(buffer).expect("dump output is UTF-8")
}

/// A plain, owned mirror of a CST node for serialization.
#[derive(Debug, Clone, Serialize)]
pub struct DumpNode {
    pub kind: String,
    pub begin: (u32, u32),
    pub end: (u32, u32),
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub children: Vec<DumpNode>,
}

impl DumpNode {
    pub fn from_ast(node: &Rc<AstNode>) -> Self {
        let range = node.range();

        Self {
            kind: node.kind().to_string(),
            begin: (range.begin.line, range.begin.col),
            end: (range.end.line, range.end.col),
            name: node
                .is_declaration()
                .then(|| node.entity().map(|e| e.name()))
                .flatten(),
            text: node.text(),
            children: node.children().iter().map(DumpNode::from_ast).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;
    use crate::file::{FileCache, Position, SourceRange};

    #[test]
    fn test_dump_format() {
        let mut cache = FileCache::new();
        let file = cache.get("test.h");

        let root = AstNode::new(NodeKind::Root);
        root.set_range(SourceRange::new(&file, Position::new(0, 0), Position::new(0, 6)));

        let stmt = AstNode::new(NodeKind::NullStatement);
        stmt.set_range(SourceRange::new(&file, Position::new(0, 5), Position::new(0, 6)));
        root.append(&stmt);

        assert_eq!("0:0--0:6 [Root]\n  0:5--0:6 [NullStatement]\n", to_string(&root));
    }

    #[test]
    fn test_dump_node_mirror() {
        let root = AstNode::new(NodeKind::Root);
        let expr = AstNode::new(NodeKind::UnexposedExpression);
        expr.set_text("a + b");
        root.append(&expr);

        let dump = DumpNode::from_ast(&root);
        assert_eq!("Root", dump.kind);
        assert_eq!(1, dump.children.len());
        assert_eq!(Some("a + b".to_string()), dump.children[0].text);

        let json = serde_json::to_string(&dump).expect("should serialize");
        assert!(json.contains("UnexposedExpression"));
    }
}
