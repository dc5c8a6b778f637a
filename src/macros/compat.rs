//! Compatibility stamps.
//!
//! The context handed to macro handlers mirrors the shape of the syntax tree, so
//! it changes whenever the tree representation changes. Every [`Macro`] and
//! [`Provider`] records the compatibility version it was built against, and the
//! registry refuses anything stamped with a different one.
//!
//! [`Macro`]: crate::macros::Macro
//! [`Provider`]: crate::macros::Provider

use crate::errors::MacroError;

/// The compatibility version of this runtime.
pub const COMPAT_VERSION: u32 = 1;

/// Anything carrying a compatibility stamp.
pub trait Stamped {
    /// The version this value was built against.
    fn compat_version(&self) -> u32;

    /// Human readable description used in error messages, e.g. "macro `echo`".
    fn describe(&self) -> String;
}

/// Fails with [`MacroError::IncompatibleVersion`] unless `value` was stamped with [`COMPAT_VERSION`].
pub fn ensure_compatible<T: Stamped + ?Sized>(value: &T) -> Result<(), MacroError> {
    let found = value.compat_version();
    if found != COMPAT_VERSION {
        return Err(MacroError::IncompatibleVersion {
            subject: value.describe(),
            found,
            expected: COMPAT_VERSION,
        });
    }
    Ok(())
}
