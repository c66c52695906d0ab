use std::fmt;

/// What a slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Money,
    Units,
    Price,
    Ratio,
    Date,
}

/// How a slot evolves between snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nature {
    /// Accumulated and carried forward across periods (units, balances, cost).
    Balance,
    /// Accumulated but measured from the start of the viewed period
    /// (income, expense, invested, dividends, gains).
    Flow,
    /// Overwritten with its latest value (prices, rates, derived figures).
    Point,
}

/// A closed enumeration of the slots one bucket kind carries.
pub trait Attribute: Copy + Eq + fmt::Debug + 'static {
    /// Every attribute in slot order.
    const ALL: &'static [Self];
    /// Attributes whose non-zero value makes a bucket active.
    const ACTIVITY: &'static [Self];

    fn index(self) -> usize;
    fn kind(self) -> ValueKind;
    fn nature(self) -> Nature;
    fn name(self) -> &'static str;

    fn is_counter(self) -> bool {
        self.nature() != Nature::Point
    }
}

/// Declares an attribute enum and its [`Attribute`] impl.
///
/// ```ignore
/// attributes! {
///     pub enum PayeeAttr {
///         Income => (Money, Flow, "income"),
///     }
///     activity = [Income];
/// }
/// ```
macro_rules! attributes {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => ($kind:ident, $nature:ident, $label:literal)
            ),+ $(,)?
        }
        activity = [$($active:ident),* $(,)?];
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        $vis enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $crate::values::Attribute for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];
            const ACTIVITY: &'static [Self] = &[$($name::$active),*];

            fn index(self) -> usize {
                self as usize
            }

            fn kind(self) -> $crate::values::ValueKind {
                match self {
                    $($name::$variant => $crate::values::ValueKind::$kind),+
                }
            }

            fn nature(self) -> $crate::values::Nature {
                match self {
                    $($name::$variant => $crate::values::Nature::$nature),+
                }
            }

            fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }
    };
}

pub(crate) use attributes;
