//! Value classification for structural comparison.
//!
//! A value takes part in structural comparison by implementing [`Describe`],
//! which exposes it as a [`Shape`]: null, a scalar, an ordered sequence, a
//! keyed map, a composite object with named members, or an indirection
//! through a pointer. The comparator never inspects values any other way.
//!
//! Implementations are provided for primitives, strings, the standard
//! collections and smart pointers. User types register their members once
//! with [`describe_struct!`](crate::describe_struct) or
//! [`describe_unit_enum!`](crate::describe_unit_enum):
//!
//! ```
//! use probity_core::describe_struct;
//!
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! describe_struct!(Point { x, y });
//! ```
//!
//! `Rc` and `Arc` describe themselves as [`Shape::Indirect`] carrying the
//! pointer address, which is what lets the comparator detect cycles built
//! from `Rc<RefCell<T>>` graphs.

use std::borrow::Cow;
use std::cell::{Ref, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

/// Capability to expose a value's structure to the comparator.
pub trait Describe {
    /// Describe this value as a [`Shape`].
    fn describe(&self) -> Shape<'_>;
}

/// A simple (leaf) value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar<'a> {
    Unit,
    Bool(bool),
    Int(i128),
    Float(f64),
    Char(char),
    Str(Cow<'a, str>),
    /// Fieldless enum variant, by name
    Variant(&'static str),
}

impl Scalar<'_> {
    /// True if this scalar is floating-point.
    pub fn is_float(&self) -> bool {
        matches!(self, Scalar::Float(_))
    }

    /// Exact equality: floats must be bit-identical, everything else uses `==`.
    pub fn exactly_equals(&self, other: &Scalar<'_>) -> bool {
        match (self, other) {
            (Scalar::Float(a), Scalar::Float(b)) => crate::approx::exactly_equal(*a, *b),
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for Scalar<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Unit => write!(f, "()"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{:?}", x),
            Scalar::Char(c) => write!(f, "{:?}", c),
            Scalar::Str(s) => write!(f, "{:?}", s),
            Scalar::Variant(v) => write!(f, "{}", v),
        }
    }
}

/// A nested value reached from a [`Shape`].
///
/// Most children borrow straight out of their parent. Owned children carry
/// values that must stay alive while they are inspected, such as the
/// borrow guard of a `RefCell`.
pub enum Child<'a> {
    Borrowed(&'a dyn Describe),
    Owned(Box<dyn Describe + 'a>),
}

impl<'a> Child<'a> {
    /// Wrap an owned value.
    pub fn owned(value: impl Describe + 'a) -> Self {
        Child::Owned(Box::new(value))
    }

    /// Access the described value.
    pub fn get(&self) -> &dyn Describe {
        match self {
            Child::Borrowed(value) => *value,
            Child::Owned(value) => value.as_ref(),
        }
    }
}

impl<'a, T: Describe + 'a> From<&'a T> for Child<'a> {
    fn from(value: &'a T) -> Self {
        Child::Borrowed(value)
    }
}

impl fmt::Debug for Child<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get().describe().summary())
    }
}

/// Structural view of one value.
#[derive(Debug)]
pub enum Shape<'a> {
    Null,
    Scalar {
        type_name: &'static str,
        value: Scalar<'a>,
    },
    /// Ordered sequence (never a string)
    Seq(Vec<Child<'a>>),
    /// Key/value entries; keys are rendered with `Debug`
    Map(Vec<(String, Child<'a>)>),
    /// Composite value with named members
    Object {
        type_name: &'static str,
        members: Vec<(&'static str, Child<'a>)>,
    },
    /// Transparent hop through a pointer or lock guard. `identity` is set
    /// for shared pointers and drives cycle detection.
    Indirect {
        identity: Option<usize>,
        target: Child<'a>,
    },
}

impl<'a> Shape<'a> {
    /// Scalar shape tagged with the type name of `T`.
    pub fn scalar<T: ?Sized>(value: Scalar<'a>) -> Self {
        Shape::Scalar {
            type_name: std::any::type_name::<T>(),
            value,
        }
    }

    /// Object shape tagged with the type name of `T`.
    pub fn object<T: ?Sized>(members: Vec<(&'static str, Child<'a>)>) -> Self {
        Shape::Object {
            type_name: std::any::type_name::<T>(),
            members,
        }
    }

    /// Sequence, map and object shapes recurse; everything else is a leaf.
    pub fn is_composite(&self) -> bool {
        matches!(self, Shape::Seq(_) | Shape::Map(_) | Shape::Object { .. })
    }

    /// Coarse category used in type-mismatch summaries.
    pub fn category(&self) -> &'static str {
        match self {
            Shape::Null => "null",
            Shape::Scalar { .. } => "scalar",
            Shape::Seq(_) => "sequence",
            Shape::Map(_) => "map",
            Shape::Object { .. } => "object",
            Shape::Indirect { .. } => "reference",
        }
    }

    /// Short human-readable rendering used in differences.
    pub fn summary(&self) -> String {
        match self {
            Shape::Null => "null".to_string(),
            Shape::Scalar { value, .. } => value.to_string(),
            Shape::Seq(items) => format!("[{} items]", items.len()),
            Shape::Map(entries) => format!("{{{} entries}}", entries.len()),
            Shape::Object { type_name, .. } => short_type_name(type_name),
            Shape::Indirect { target, .. } => target.get().describe().summary(),
        }
    }
}

/// Strip module paths from a `std::any::type_name` string, keeping generics.
///
/// `alloc::vec::Vec<my_crate::Point>` becomes `Vec<Point>`.
pub fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment_start = 0;
    let mut chars = full.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                out.truncate(segment_start);
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&' => {
                out.push(c);
                segment_start = out.len();
            }
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Primitive implementations
// ---------------------------------------------------------------------------

macro_rules! describe_integers {
    ($($t:ty),*) => {
        $(
            impl Describe for $t {
                fn describe(&self) -> Shape<'_> {
                    Shape::scalar::<$t>(Scalar::Int(*self as i128))
                }
            }
        )*
    };
}

describe_integers!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, usize);

impl Describe for f32 {
    fn describe(&self) -> Shape<'_> {
        Shape::scalar::<f32>(Scalar::Float(f64::from(*self)))
    }
}

impl Describe for f64 {
    fn describe(&self) -> Shape<'_> {
        Shape::scalar::<f64>(Scalar::Float(*self))
    }
}

impl Describe for bool {
    fn describe(&self) -> Shape<'_> {
        Shape::scalar::<bool>(Scalar::Bool(*self))
    }
}

impl Describe for char {
    fn describe(&self) -> Shape<'_> {
        Shape::scalar::<char>(Scalar::Char(*self))
    }
}

impl Describe for () {
    fn describe(&self) -> Shape<'_> {
        Shape::scalar::<()>(Scalar::Unit)
    }
}

impl Describe for str {
    fn describe(&self) -> Shape<'_> {
        Shape::scalar::<str>(Scalar::Str(Cow::Borrowed(self)))
    }
}

// Strings share one type name so `String` and `&str` compare without a
// type mismatch.
impl Describe for String {
    fn describe(&self) -> Shape<'_> {
        Shape::scalar::<str>(Scalar::Str(Cow::Borrowed(self.as_str())))
    }
}

// ---------------------------------------------------------------------------
// Pointers and wrappers
// ---------------------------------------------------------------------------

impl<T: Describe + ?Sized> Describe for &T {
    fn describe(&self) -> Shape<'_> {
        (**self).describe()
    }
}

impl<T: Describe + ?Sized> Describe for Box<T> {
    fn describe(&self) -> Shape<'_> {
        (**self).describe()
    }
}

impl<T: Describe> Describe for Rc<T> {
    fn describe(&self) -> Shape<'_> {
        Shape::Indirect {
            identity: Some(Rc::as_ptr(self) as usize),
            target: Child::Borrowed(&**self),
        }
    }
}

impl<T: Describe> Describe for Arc<T> {
    fn describe(&self) -> Shape<'_> {
        Shape::Indirect {
            identity: Some(Arc::as_ptr(self) as usize),
            target: Child::Borrowed(&**self),
        }
    }
}

impl<T: Describe + ?Sized> Describe for Ref<'_, T> {
    fn describe(&self) -> Shape<'_> {
        (**self).describe()
    }
}

impl<T: Describe> Describe for RefCell<T> {
    fn describe(&self) -> Shape<'_> {
        match self.try_borrow() {
            Ok(guard) => Shape::Indirect {
                identity: None,
                target: Child::owned(guard),
            },
            Err(_) => Shape::scalar::<RefCell<T>>(Scalar::Str(Cow::Borrowed(
                "<mutably borrowed>",
            ))),
        }
    }
}

impl<T: Describe + ?Sized> Describe for MutexGuard<'_, T> {
    fn describe(&self) -> Shape<'_> {
        (**self).describe()
    }
}

// try_lock: comparing a mutex against itself must not deadlock.
impl<T: Describe> Describe for Mutex<T> {
    fn describe(&self) -> Shape<'_> {
        let guard = match self.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                return Shape::scalar::<Mutex<T>>(Scalar::Str(Cow::Borrowed("<locked>")))
            }
        };
        Shape::Indirect {
            identity: None,
            target: Child::owned(guard),
        }
    }
}

impl<T: Describe> Describe for Option<T> {
    fn describe(&self) -> Shape<'_> {
        match self {
            Some(value) => value.describe(),
            None => Shape::Null,
        }
    }
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

fn sequence<'a, T: Describe + 'a>(items: impl Iterator<Item = &'a T>) -> Shape<'a> {
    Shape::Seq(items.map(Child::from).collect())
}

impl<T: Describe> Describe for [T] {
    fn describe(&self) -> Shape<'_> {
        sequence(self.iter())
    }
}

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn describe(&self) -> Shape<'_> {
        sequence(self.iter())
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn describe(&self) -> Shape<'_> {
        sequence(self.iter())
    }
}

impl<T: Describe> Describe for VecDeque<T> {
    fn describe(&self) -> Shape<'_> {
        sequence(self.iter())
    }
}

impl<T: Describe> Describe for BTreeSet<T> {
    fn describe(&self) -> Shape<'_> {
        sequence(self.iter())
    }
}

impl<K: fmt::Debug, V: Describe> Describe for BTreeMap<K, V> {
    fn describe(&self) -> Shape<'_> {
        Shape::Map(
            self.iter()
                .map(|(k, v)| (format!("{:?}", k), Child::from(v)))
                .collect(),
        )
    }
}

// Entries are sorted by rendered key so difference order is deterministic.
impl<K: fmt::Debug, V: Describe, S> Describe for HashMap<K, V, S> {
    fn describe(&self) -> Shape<'_> {
        let mut entries: Vec<(String, Child<'_>)> = self
            .iter()
            .map(|(k, v)| (format!("{:?}", k), Child::from(v)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Shape::Map(entries)
    }
}

// Tuples are objects with positional members.
macro_rules! describe_tuples {
    ($(($($name:ident : $idx:tt),+)),+) => {
        $(
            impl<$($name: Describe),+> Describe for ($($name,)+) {
                fn describe(&self) -> Shape<'_> {
                    Shape::object::<Self>(vec![$((stringify!($idx), Child::from(&self.$idx))),+])
                }
            }
        )+
    };
}

describe_tuples!(
    (A: 0),
    (A: 0, B: 1),
    (A: 0, B: 1, C: 2),
    (A: 0, B: 1, C: 2, D: 3)
);

// ---------------------------------------------------------------------------
// Registration macros
// ---------------------------------------------------------------------------

/// Implement [`Describe`] for a struct by listing its members.
///
/// A member may be given a display name with `field as "Name"`.
///
/// ```
/// use probity_core::describe_struct;
///
/// struct Item {
///     name: String,
///     value: i64,
/// }
///
/// describe_struct!(Item { name as "Name", value as "Value" });
/// ```
#[macro_export]
macro_rules! describe_struct {
    ($ty:ident { $($field:ident $(as $alias:literal)?),* $(,)? }) => {
        impl $crate::describe::Describe for $ty {
            fn describe(&self) -> $crate::describe::Shape<'_> {
                $crate::describe::Shape::object::<$ty>(::std::vec![
                    $((
                        $crate::__describe_member_name!($field $(, $alias)?),
                        $crate::describe::Child::from(&self.$field),
                    )),*
                ])
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __describe_member_name {
    ($field:ident) => {
        ::std::stringify!($field)
    };
    ($field:ident, $alias:literal) => {
        $alias
    };
}

/// Implement [`Describe`] for a fieldless enum; variants compare by name.
///
/// ```
/// use probity_core::describe_unit_enum;
///
/// enum Color {
///     Red,
///     Green,
/// }
///
/// describe_unit_enum!(Color { Red, Green });
/// ```
#[macro_export]
macro_rules! describe_unit_enum {
    ($ty:ident { $($variant:ident),* $(,)? }) => {
        impl $crate::describe::Describe for $ty {
            fn describe(&self) -> $crate::describe::Shape<'_> {
                let name = match self {
                    $($ty::$variant => ::std::stringify!($variant),)*
                };
                $crate::describe::Shape::scalar::<$ty>($crate::describe::Scalar::Variant(name))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_type_name_strips_paths() {
        assert_eq!(short_type_name("alloc::string::String"), "String");
        assert_eq!(
            short_type_name("alloc::vec::Vec<my_crate::model::Point>"),
            "Vec<Point>"
        );
        assert_eq!(short_type_name("(i32, core::option::Option<u8>)"), "(i32, Option<u8>)");
        assert_eq!(short_type_name("i32"), "i32");
    }

    #[test]
    fn test_option_unwraps_to_inner_or_null() {
        let some: Option<i32> = Some(5);
        let none: Option<i32> = None;
        assert!(matches!(
            some.describe(),
            Shape::Scalar {
                value: Scalar::Int(5),
                ..
            }
        ));
        assert!(matches!(none.describe(), Shape::Null));
    }

    #[test]
    fn test_string_and_str_share_type_name() {
        let owned = String::from("x");
        let (Shape::Scalar { type_name: a, .. }, Shape::Scalar { type_name: b, .. }) =
            (owned.describe(), "x".describe())
        else {
            panic!("expected scalars");
        };
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_map_entries_sorted_by_key() {
        let mut map = HashMap::new();
        map.insert("b", 2);
        map.insert("a", 1);
        map.insert("c", 3);
        let Shape::Map(entries) = map.describe() else {
            panic!("expected map");
        };
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["\"a\"", "\"b\"", "\"c\""]);
    }

    #[test]
    fn test_rc_carries_identity() {
        let shared = Rc::new(1);
        let clone = Rc::clone(&shared);
        let (Shape::Indirect { identity: a, .. }, Shape::Indirect { identity: b, .. }) =
            (shared.describe(), clone.describe())
        else {
            panic!("expected indirections");
        };
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn test_mutably_borrowed_refcell_does_not_panic() {
        let cell = RefCell::new(3);
        let _guard = cell.borrow_mut();
        assert_eq!(cell.describe().summary(), "\"<mutably borrowed>\"");
    }

    #[test]
    fn test_locked_mutex_does_not_block() {
        let mutex = Mutex::new(3);
        let _guard = mutex.lock().unwrap();
        assert_eq!(mutex.describe().summary(), "\"<locked>\"");
    }

    #[test]
    fn test_summaries() {
        assert_eq!(vec![1, 2, 3].describe().summary(), "[3 items]");
        assert_eq!("hi".describe().summary(), "\"hi\"");
        assert_eq!(2.5f64.describe().summary(), "2.5");
        assert_eq!((1, 2).describe().summary(), "(i32, i32)");
    }

    struct Point {
        x: i32,
        y: i32,
    }

    describe_struct!(Point { x, y as "Y" });

    #[derive(Debug)]
    enum Light {
        On,
        Off,
    }

    describe_unit_enum!(Light { On, Off });

    #[test]
    fn test_describe_struct_macro_lists_members() {
        let p = Point { x: 1, y: 2 };
        let Shape::Object { type_name, members } = p.describe() else {
            panic!("expected object");
        };
        assert!(type_name.ends_with("Point"));
        let names: Vec<&str> = members.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["x", "Y"]);
    }

    #[test]
    fn test_describe_unit_enum_macro() {
        assert_eq!(Light::On.describe().summary(), "On");
        assert_eq!(Light::Off.describe().summary(), "Off");
    }
}
