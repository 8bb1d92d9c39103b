use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};

/// Index of a place inside its net.
#[derive(Eq, PartialEq, Clone, Copy, PartialOrd, Ord, Hash, Debug)]
pub struct PlaceId(pub usize);
/// Index of a transition inside its net.
#[derive(Eq, PartialEq, Clone, Copy, PartialOrd, Ord, Hash, Debug)]
pub struct TransitionId(pub usize);

#[derive(Clone, Copy, Eq, PartialEq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceKind {
    /// Entry point of the net, values are injected here.
    Source,
    #[default]
    Internal,
    /// Terminal of the flow. Values are handed to the exit callback and never stored.
    Exit,
    /// Stores like an internal place, but inverts its presence check for one transition label.
    Inhibit,
}

impl Display for PlaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PlaceKind::Source => "source",
            PlaceKind::Internal => "internal",
            PlaceKind::Exit => "exit",
            PlaceKind::Inhibit => "inhibit",
        };
        f.write_str(name)
    }
}

/// Value moving through the net.
///
/// Forwarded values are cloned once for every output place of a firing transition, so token
/// types carrying large payloads should wrap them in an `Arc`.
pub trait Token: Clone + Debug + Send + Sync + 'static {
    /// Seed of the default reduction.
    fn zero() -> Self;

    /// Default reduction step.
    ///
    /// Must not panic. The integer impls saturate at the bounds of their type, the float impls
    /// use plain addition.
    fn sum(self, other: Self) -> Self;

    /// Number of units this value adds to a counting place.
    fn units(&self) -> u64;
}

macro_rules! impl_token_signed {
    ($($ty:ty),*) => {
        $(impl Token for $ty {
            fn zero() -> Self {
                0
            }

            fn sum(self, other: Self) -> Self {
                self.saturating_add(other)
            }

            fn units(&self) -> u64 {
                if *self > 0 {
                    *self as u64
                } else {
                    0
                }
            }
        })*
    };
}

impl_token_signed!(i32, i64);

macro_rules! impl_token_unsigned {
    ($($ty:ty),*) => {
        $(impl Token for $ty {
            fn zero() -> Self {
                0
            }

            fn sum(self, other: Self) -> Self {
                self.saturating_add(other)
            }

            fn units(&self) -> u64 {
                *self as u64
            }
        })*
    };
}

impl_token_unsigned!(u32, u64, usize);

macro_rules! impl_token_float {
    ($($ty:ty),*) => {
        $(impl Token for $ty {
            fn zero() -> Self {
                0.0
            }

            fn sum(self, other: Self) -> Self {
                self + other
            }

            fn units(&self) -> u64 {
                if *self > 0.0 {
                    *self as u64
                } else {
                    0
                }
            }
        })*
    };
}

impl_token_float!(f32, f64);
