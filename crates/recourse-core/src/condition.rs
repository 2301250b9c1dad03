//! Conditions and condition types
//!
//! A condition is any `'static` value with a `Debug` representation; callers
//! bring their own taxonomy. Handlers are bound against a [`ConditionType`],
//! which decides whether a signaled instance belongs to it:
//! - `ConditionType::of::<T>()` - every instance of `T`
//! - `ConditionType::when::<T>(..)` - instances of `T` passing a predicate
//! - `ConditionType::any()` - every condition
//! - `a.or(b)` - a base type covering several subtypes

use std::any::{self, Any};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// A value that can be signaled
pub trait Condition: Any + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + fmt::Debug> Condition for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn Condition {
    /// Is this condition an instance of `T`?
    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        self.as_any().is::<T>()
    }

    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

type Matcher = Arc<dyn Fn(&dyn Condition) -> bool + Send + Sync>;

/// Describes a set of conditions a handler applies to.
///
/// Cheap to clone and shareable across threads; it carries no per-context
/// state.
#[derive(Clone)]
pub struct ConditionType {
    name: Cow<'static, str>,
    matcher: Matcher,
}

impl ConditionType {
    /// A condition type from an arbitrary predicate
    pub fn new<F>(name: impl Into<Cow<'static, str>>, matcher: F) -> Self
    where
        F: Fn(&dyn Condition) -> bool + Send + Sync + 'static,
    {
        ConditionType {
            name: name.into(),
            matcher: Arc::new(matcher),
        }
    }

    /// Matches every instance of `T`
    pub fn of<T: Any>() -> Self {
        ConditionType::new(any::type_name::<T>(), |c: &dyn Condition| c.is::<T>())
    }

    /// Matches instances of `T` for which `pred` holds
    pub fn when<T, F>(name: impl Into<Cow<'static, str>>, pred: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        ConditionType::new(name, move |c: &dyn Condition| {
            c.downcast_ref::<T>().is_some_and(|t| pred(t))
        })
    }

    /// Matches every condition
    pub fn any() -> Self {
        ConditionType::new("condition", |_: &dyn Condition| true)
    }

    /// Union of two types, named `a | b`
    pub fn or(self, other: ConditionType) -> Self {
        let name = format!("{} | {}", self.name, other.name);
        let (a, b) = (self.matcher, other.matcher);
        ConditionType::new(name, move |c: &dyn Condition| a(c) || b(c))
    }

    /// Rename this type, keeping its predicate
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Does this type accept `condition`?
    #[inline]
    pub fn matches(&self, condition: &dyn Condition) -> bool {
        (self.matcher)(condition)
    }

    /// A type is recognized when it has a non-blank name
    pub fn is_recognized(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

impl fmt::Debug for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConditionType({})", self.name)
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct DivideByZero;

    #[derive(Debug)]
    struct Overflow(u32);

    #[derive(Debug, PartialEq)]
    enum FileError {
        NotFound(String),
        Denied,
    }

    #[test]
    fn test_of_matches_exact_type() {
        let ty = ConditionType::of::<DivideByZero>();
        assert!(ty.matches(&DivideByZero));
        assert!(!ty.matches(&Overflow(1)));
        assert!(ty.name().ends_with("DivideByZero"));
    }

    #[test]
    fn test_union_acts_as_base_type() {
        let arithmetic = ConditionType::of::<DivideByZero>()
            .or(ConditionType::of::<Overflow>())
            .named("arithmetic-error");

        assert!(arithmetic.matches(&DivideByZero));
        assert!(arithmetic.matches(&Overflow(7)));
        assert!(!arithmetic.matches(&FileError::Denied));
        assert_eq!(arithmetic.name(), "arithmetic-error");
    }

    #[test]
    fn test_when_refines_enum() {
        let not_found =
            ConditionType::when("file-not-found", |e: &FileError| matches!(e, FileError::NotFound(_)));

        assert!(not_found.matches(&FileError::NotFound("a.txt".into())));
        assert!(!not_found.matches(&FileError::Denied));
        assert!(!not_found.matches(&DivideByZero));
    }

    #[test]
    fn test_any_matches_everything() {
        let ty = ConditionType::any();
        assert!(ty.matches(&DivideByZero));
        assert!(ty.matches(&"a plain string"));
        assert!(ty.matches(&42u8));
    }

    #[test]
    fn test_recognized() {
        assert!(ConditionType::any().is_recognized());
        assert!(!ConditionType::new("  ", |_: &dyn Condition| true).is_recognized());
    }

    #[test]
    fn test_downcast() {
        let c: &dyn Condition = &Overflow(3);
        assert!(c.is::<Overflow>());
        assert_eq!(c.downcast_ref::<Overflow>().map(|o| o.0), Some(3));
        assert!(c.downcast_ref::<DivideByZero>().is_none());
    }
}
