use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::ast::AstNode;

/// A parsed file. Files are interned by path (see [`FileCache`]) so that
/// handle equality is identity.
#[derive(Debug)]
pub struct File {
    path: String,
    pub ast: RefCell<Option<Rc<AstNode>>>,
}

impl File {
    pub fn new(path: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            path: path.into(),
            ast: RefCell::new(None),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Path-interning store of files. One parser owns one cache; sharing a
/// cache across threads is not supported.
#[derive(Debug, Default)]
pub struct FileCache {
    files: Vec<Rc<File>>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the file for `path`, creating it on first use.
    pub fn get(&mut self, path: &str) -> Rc<File> {
        if let Some(file) = self.files.iter().find(|f| f.path() == path) {
            return Rc::clone(file);
        }

        let file = File::new(path);
        self.files.push(Rc::clone(&file));
        file
    }

    pub fn files(&self) -> &[Rc<File>] {
        &self.files
    }
}

/// A 0-based (line, column) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: u32,
    pub col: u32,
}

impl Position {
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

/// A position within an interned file. File equality is handle identity.
#[derive(Debug, Clone, Default)]
pub struct SourceLocation {
    pub file: Weak<File>,
    pub pos: Position,
}

impl PartialEq for SourceLocation {
    fn eq(&self, other: &Self) -> bool {
        self.file.ptr_eq(&other.file) && self.pos == other.pos
    }
}

impl Eq for SourceLocation {}

/// A source span, half-open at the end column.
#[derive(Debug, Clone, Default)]
pub struct SourceRange {
    pub file: Weak<File>,
    pub begin: Position,
    pub end: Position,
}

impl SourceRange {
    pub fn new(file: &Rc<File>, begin: Position, end: Position) -> Self {
        Self {
            file: Rc::downgrade(file),
            begin,
            end,
        }
    }

    pub fn file(&self) -> Option<Rc<File>> {
        self.file.upgrade()
    }

    pub fn begin_location(&self) -> SourceLocation {
        SourceLocation {
            file: self.file.clone(),
            pos: self.begin,
        }
    }

    pub fn end_location(&self) -> SourceLocation {
        SourceLocation {
            file: self.file.clone(),
            pos: self.end,
        }
    }

    /// Whether `other` lies entirely within this range.
    pub fn contains(&self, other: &SourceRange) -> bool {
        self.begin <= other.begin && other.end <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_interns_by_path() {
        let mut cache = FileCache::new();

        let a = cache.get("a.h");
        let b = cache.get("b.h");
        let a2 = cache.get("a.h");

        assert!(Rc::ptr_eq(&a, &a2));
        assert!(!Rc::ptr_eq(&a, &b));
        assert_eq!(2, cache.files().len());
    }

    #[test]
    fn test_location_equality_is_identity() {
        let mut cache = FileCache::new();
        let file = cache.get("a.h");

        let here = SourceLocation {
            file: Rc::downgrade(&file),
            pos: Position::new(1, 2),
        };
        let same = SourceLocation {
            file: Rc::downgrade(&file),
            pos: Position::new(1, 2),
        };
        let elsewhere = SourceLocation {
            file: Rc::downgrade(&cache.get("b.h")),
            pos: Position::new(1, 2),
        };

        assert_eq!(here, same);
        assert_ne!(here, elsewhere);
    }

    #[test]
    fn test_range_containment() {
        let mut cache = FileCache::new();
        let file = cache.get("a.h");

        let outer = SourceRange::new(&file, Position::new(0, 0), Position::new(4, 0));
        let inner = SourceRange::new(&file, Position::new(1, 2), Position::new(2, 8));

        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
    }
}
