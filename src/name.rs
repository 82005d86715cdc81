use std::fmt::Display;

use crate::template::TemplateArgument;
use crate::types::Type;

/// A possibly qualified C++ name.
///
/// `Qualified` nests left-associatively: `a::b::c` is
/// `Qualified(Qualified(a, b), c)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Name {
    Identifier(String),
    Operator(String),
    Conversion(Box<Type>),
    LiteralOperator(String),
    Template {
        base: String,
        args: Vec<TemplateArgument>,
    },
    Destructor(Box<Name>),
    Qualified(Box<Name>, Box<Name>),
}

impl Name {
    pub fn identifier(name: impl Into<String>) -> Self {
        Name::Identifier(name.into())
    }

    /// Fold a non-empty list of segments into a left-associative chain.
    pub fn qualified(segments: Vec<Name>) -> Self {
        let mut iter = segments.into_iter();
        let mut name = iter.next().expect("at least one segment");

        for seg in iter {
            name = Name::Qualified(Box::new(name), Box::new(seg));
        }

        name
    }

    pub fn is_identifier(&self) -> bool {
        matches!(self, Name::Identifier(_))
    }

    pub fn is_operator_name(&self) -> bool {
        matches!(self, Name::Operator(_))
    }

    pub fn is_conversion_name(&self) -> bool {
        matches!(self, Name::Conversion(_))
    }

    pub fn is_literal_operator_name(&self) -> bool {
        matches!(self, Name::LiteralOperator(_))
    }

    pub fn is_template_name(&self) -> bool {
        matches!(self, Name::Template { .. })
    }

    pub fn is_destructor_name(&self) -> bool {
        matches!(self, Name::Destructor(_))
    }

    pub fn is_qualified(&self) -> bool {
        matches!(self, Name::Qualified(_, _))
    }

    /// The `::`-separated segments, leftmost first.
    pub fn segments(&self) -> Vec<&Name> {
        match self {
            Name::Qualified(lhs, rhs) => {
                let mut segments = lhs.segments();
                segments.extend(rhs.segments());
                segments
            }
            _ => vec![self],
        }
    }

    /// The terminal segment of a qualified name, or the name itself.
    pub fn unqualified(&self) -> &Name {
        match self {
            Name::Qualified(_, rhs) => rhs.unqualified(),
            _ => self,
        }
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Name::Identifier(name) => f.write_str(name),
            Name::Operator(symbol) => write!(f, "operator{symbol}"),
            Name::Conversion(ty) => write!(f, "operator {ty}"),
            Name::LiteralOperator(suffix) => write!(f, "operator\"\"{suffix}"),
            Name::Template { base, args } => {
                write!(f, "{base}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
            Name::Destructor(name) => write!(f, "~{name}"),
            Name::Qualified(lhs, rhs) => write!(f, "{lhs}::{rhs}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_identifier() {
        assert_eq!("foo", Name::identifier("foo").to_string());
    }

    #[test]
    fn test_render_qualified() {
        let name = Name::qualified(vec![
            Name::identifier("std"),
            Name::identifier("chrono"),
            Name::identifier("seconds"),
        ]);

        assert_eq!("std::chrono::seconds", name.to_string());
        assert_eq!(3, name.segments().len());
        assert_eq!(&Name::identifier("seconds"), name.unqualified());
    }

    #[test]
    fn test_qualified_nests_left_associatively() {
        let name = Name::qualified(vec![
            Name::identifier("a"),
            Name::identifier("b"),
            Name::identifier("c"),
        ]);

        let Name::Qualified(lhs, rhs) = &name else {
            panic!("expected qualified name");
        };
        assert_eq!("a::b", lhs.to_string());
        assert_eq!("c", rhs.to_string());
    }

    #[test]
    fn test_render_operator_names() {
        assert_eq!("operator+", Name::Operator("+".into()).to_string());
        assert_eq!("operator()", Name::Operator("()".into()).to_string());
        assert_eq!(
            "operator\"\"_km",
            Name::LiteralOperator("_km".into()).to_string()
        );
    }

    #[test]
    fn test_render_conversion_name() {
        let name = Name::Conversion(Box::new(Type::simple("bool")));
        assert_eq!("operator bool", name.to_string());
    }

    #[test]
    fn test_render_destructor() {
        let name = Name::Destructor(Box::new(Name::identifier("Widget")));
        assert_eq!("~Widget", name.to_string());
    }

    #[test]
    fn test_render_template() {
        let name = Name::Template {
            base: "vector".into(),
            args: vec![TemplateArgument::Type(Type::simple("int"))],
        };
        assert_eq!("vector<int>", name.to_string());
    }
}
