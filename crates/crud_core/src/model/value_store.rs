//! Declarative choice-value stores.
//!
//! A store is a type whose named constants map a raw value to a display
//! label (the constant's name), e.g. status codes. Names starting with `__`
//! are reserved and never exposed as choices.

use serde::Serialize;

/// One `{value, label}` choice as exposed to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Choice<V> {
    pub value: V,
    pub label: &'static str,
}

pub trait ValueStore {
    type Value: Copy + Ord + Serialize + 'static;

    /// Declared `(name, value)` entries in declaration order.
    const ENTRIES: &'static [(&'static str, Self::Value)];

    /// `(value, label)` pairs in declaration order, reserved names skipped.
    fn values() -> Vec<(Self::Value, &'static str)> {
        Self::ENTRIES
            .iter()
            .filter(|(name, _)| !name.starts_with("__"))
            .map(|&(name, value)| (value, name))
            .collect()
    }

    /// Choices sorted ascending by value; ties keep declaration order.
    fn serialize() -> Vec<Choice<Self::Value>> {
        let mut choices = Self::values()
            .into_iter()
            .map(|(value, label)| Choice { value, label })
            .collect::<Vec<_>>();
        choices.sort_by(|left, right| left.value.cmp(&right.value));
        choices
    }

    fn label_of(value: Self::Value) -> Option<&'static str> {
        Self::values()
            .into_iter()
            .find(|(candidate, _)| *candidate == value)
            .map(|(_, label)| label)
    }
}

/// Declares a unit struct implementing [`ValueStore`] with one associated
/// constant per entry.
///
/// ```
/// crud_core::value_store! {
///     pub struct AccountStatus: i64 {
///         ACTIVE = 1,
///         DISABLED = 2,
///     }
/// }
///
/// use crud_core::ValueStore;
/// assert_eq!(AccountStatus::ACTIVE, 1);
/// assert_eq!(AccountStatus::label_of(2), Some("DISABLED"));
/// ```
#[macro_export]
macro_rules! value_store {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident: $ty:ty {
            $($label:ident = $value:expr),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis struct $name;

        #[allow(non_upper_case_globals, dead_code)]
        impl $name {
            $(pub const $label: $ty = $value;)*
        }

        impl $crate::model::value_store::ValueStore for $name {
            type Value = $ty;
            const ENTRIES: &'static [(&'static str, $ty)] =
                &[$((stringify!($label), $value)),*];
        }
    };
}
