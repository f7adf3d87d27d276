//! Names, qualified names and class identifiers.
//!
//! A [`FqName`] is a dotted path such as `kite.io.println`. A [`ClassId`]
//! splits a class's qualified name into its package part and its
//! class-relative part: `kite.collections` + `Box` or `p.q` + `Outer.Inner`.
//! The split matters because `.` means "declared in package" on one side
//! and "nested in class" on the other.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A simple (single segment) name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Name(Arc<str>);

impl Name {
    pub fn identifier(text: &str) -> Self {
        debug_assert!(!text.contains('.'), "simple name contains a dot: {text}");
        Name(Arc::from(text))
    }

    /// A compiler-generated name such as `<init>` or `<root>`.
    pub fn special(text: &str) -> Self {
        debug_assert!(text.starts_with('<') && text.ends_with('>'));
        Name(Arc::from(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_special(&self) -> bool {
        self.0.starts_with('<')
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Name {
    fn from(text: &str) -> Self {
        Name::identifier(text)
    }
}

/// A dotted, fully qualified name. The root name is empty.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FqName(Arc<str>);

impl FqName {
    pub fn root() -> Self {
        FqName(Arc::from(""))
    }

    /// Parse a dotted name. An empty string is the root.
    pub fn parse(dotted: &str) -> Self {
        FqName(Arc::from(dotted))
    }

    pub fn from_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> Self {
        let joined: Vec<&str> = segments.into_iter().collect();
        FqName(Arc::from(joined.join(".")))
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn child(&self, name: &Name) -> FqName {
        if self.is_root() {
            FqName(Arc::from(name.as_str()))
        } else {
            FqName(Arc::from(format!("{}.{}", self.0, name)))
        }
    }

    /// The enclosing name; the parent of a top-level name is the root.
    pub fn parent(&self) -> FqName {
        match self.0.rfind('.') {
            Some(dot) => FqName(Arc::from(&self.0[..dot])),
            None => FqName::root(),
        }
    }

    pub fn short_name(&self) -> Name {
        match self.0.rfind('.') {
            Some(dot) => Name::identifier(&self.0[dot + 1..]),
            None => Name(Arc::clone(&self.0)),
        }
    }

    pub fn path_segments(&self) -> Vec<Name> {
        if self.is_root() {
            return Vec::new();
        }
        self.0.split('.').map(Name::identifier).collect()
    }

    /// Whether `self` equals `prefix` or starts with `prefix.`.
    pub fn starts_with(&self, prefix: &FqName) -> bool {
        prefix.is_root()
            || self.0.as_ref() == prefix.as_str()
            || (self.0.starts_with(prefix.as_str())
                && self.0.as_bytes().get(prefix.0.len()) == Some(&b'.'))
    }
}

impl fmt::Debug for FqName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FqName({})", self.0)
    }
}

impl fmt::Display for FqName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("<root>")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Identifies a class by package and class-relative name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ClassId {
    package: FqName,
    relative: FqName,
}

impl ClassId {
    pub fn new(package: FqName, relative: FqName) -> Self {
        assert!(!relative.is_root(), "class id needs a class name");
        ClassId { package, relative }
    }

    pub fn top_level(fq_name: &FqName) -> Self {
        ClassId::new(fq_name.parent(), FqName(Arc::from(fq_name.short_name().as_str())))
    }

    /// Parse the `p/q/Outer.Inner` form: slashes separate package segments,
    /// dots separate nested classes.
    pub fn from_string(text: &str) -> Self {
        match text.rfind('/') {
            Some(slash) => ClassId::new(
                FqName::parse(&text[..slash].replace('/', ".")),
                FqName::parse(&text[slash + 1..]),
            ),
            None => ClassId::new(FqName::root(), FqName::parse(text)),
        }
    }

    pub fn package_fq_name(&self) -> &FqName {
        &self.package
    }

    pub fn relative_class_name(&self) -> &FqName {
        &self.relative
    }

    pub fn short_class_name(&self) -> Name {
        self.relative.short_name()
    }

    pub fn is_nested(&self) -> bool {
        !self.relative.parent().is_root()
    }

    pub fn outer_class_id(&self) -> Option<ClassId> {
        self.is_nested()
            .then(|| ClassId::new(self.package.clone(), self.relative.parent()))
    }

    #[must_use]
    pub fn create_nested(&self, name: &Name) -> ClassId {
        ClassId::new(self.package.clone(), self.relative.child(name))
    }

    /// The dotted name with package and class parts joined.
    pub fn as_single_fq_name(&self) -> FqName {
        if self.package.is_root() {
            self.relative.clone()
        } else {
            FqName(Arc::from(format!("{}.{}", self.package, self.relative)))
        }
    }

    /// The `p/q/Outer.Inner` form used in class files.
    pub fn as_string(&self) -> String {
        if self.package.is_root() {
            self.relative.as_str().to_string()
        } else {
            format!("{}/{}", self.package.as_str().replace('.', "/"), self.relative)
        }
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.as_string())
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

/// Well-known names.
pub mod special_names {
    use super::Name;

    pub fn init() -> Name {
        Name::special("<init>")
    }

    pub fn root_package() -> Name {
        Name::special("<root>")
    }

    pub fn no_name_provided() -> Name {
        Name::special("<no name provided>")
    }
}

/// Class ids of the standard library classes the compiler knows about.
pub mod standard_class_ids {
    use super::{ClassId, FqName};

    pub const KITE_PACKAGE: &str = "kite";

    fn kite(name: &str) -> ClassId {
        ClassId::new(FqName::parse(KITE_PACKAGE), FqName::parse(name))
    }

    pub fn any() -> ClassId {
        kite("Any")
    }
    pub fn nothing() -> ClassId {
        kite("Nothing")
    }
    pub fn unit() -> ClassId {
        kite("Unit")
    }
    pub fn int() -> ClassId {
        kite("Int")
    }
    pub fn boolean() -> ClassId {
        kite("Boolean")
    }
    pub fn string() -> ClassId {
        kite("String")
    }
    pub fn comparable() -> ClassId {
        kite("Comparable")
    }
    pub fn throwable() -> ClassId {
        kite("Throwable")
    }
    pub fn exception() -> ClassId {
        kite("Exception")
    }
    pub fn arithmetic_exception() -> ClassId {
        kite("ArithmeticException")
    }
    pub fn illegal_state_exception() -> ClassId {
        kite("IllegalStateException")
    }
}

#[cfg(test)]
#[path = "../tests/names_tests.rs"]
mod names_tests;
