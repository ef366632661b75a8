//! Shorthands capturing clones of the listed handles.
//!
//! ```
//! use ripple::{computed, reaction, Var};
//!
//! let a = Var::new(1);
//! let b = Var::new(2);
//! let sum = computed!((a, b) => a.get() + b.get());
//! let _log = reaction!((sum) => println!("sum = {}", sum.get()));
//!
//! a.set(10);
//! assert_eq!(sum.get(), 12);
//! ```

pub use enclose::*;

#[macro_export]
macro_rules! computed {
    (( $($d_tt:tt)* ) => $($b:tt)*) => {
        $crate::Computed::new($crate::macros::enclose!(($( $d_tt )*) move || { $($b)* }))
    };
    ($($b:tt)*) => {
        $crate::Computed::new(move || { $($b)* })
    };
}

#[macro_export]
macro_rules! reaction {
    (( $($d_tt:tt)* ) => $($b:tt)*) => {
        $crate::Reaction::new($crate::macros::enclose!(($( $d_tt )*) move || { $($b)* }))
    };
    ($($b:tt)*) => {
        $crate::Reaction::new(move || { $($b)* })
    };
}
