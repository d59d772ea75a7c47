// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use core::fmt;

/// Reasons an authentication attempt can be refused.
///
/// These are diagnostics only. Everything that crosses the loader boundary is
/// collapsed into [`SecurityError`] by [`crate::authenticate`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AuthError {
    /// The PRR did not match any product we have ROM addresses for.
    UnknownProduct,
    /// The TA object would run into the key certificate slot.
    LayoutOverflow,
    /// The input blob ends before the sizes in its headers say it should.
    Truncated,
    /// ROM `get_lcs` returned the contained non-zero status.
    LcsReadFailed(u32),
    /// ROM secure boot returned the contained non-zero status.
    RomReject(u32),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::UnknownProduct => f.write_str("unknown product"),
            AuthError::LayoutOverflow => f.write_str("TA object overflows staging area"),
            AuthError::Truncated => f.write_str("certificate blob truncated"),
            AuthError::LcsReadFailed(status) => write!(f, "lcs read error {status:#x}"),
            AuthError::RomReject(status) => write!(f, "secure boot error {status:#x}"),
        }
    }
}

/// The one failure the loader gets to see.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SecurityError;

impl From<AuthError> for SecurityError {
    fn from(_: AuthError) -> Self {
        SecurityError
    }
}

impl fmt::Display for SecurityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TA authentication failed")
    }
}
