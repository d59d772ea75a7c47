// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Trusted Application authentication on R-Car Gen3, by way of the MaskROM.
//!
//! The signature check itself is the ROM's job. What we do is get everything
//! into the shape the ROM insists on: certificates and TA object copied into a
//! fixed non-cacheable area, the right entry points for the SoC we're on, a
//! non-cacheable stack to call them from, and the crypto engine to ourselves.
//! Whether to call the ROM at all depends on the lifecycle state and mode
//! registers; see `mode`.
//!
//! Typical use, once at bring-up and then per TA:
//!
//! ```ignore
//! let product = rcar_ta_auth::prr::probe(&Board);
//! let staging = unsafe { StagingArea::rcar() };
//! let shdr = rcar_ta_auth::authenticate(&Board, &product, &staging, blob)?;
//! ```

#![cfg_attr(not(test), no_std)]

pub mod auth;
pub mod bsp;
pub mod cert;
pub mod error;
pub mod invoke;
pub mod layout;
pub mod mode;
pub mod prr;
pub mod romapi;

#[cfg(test)]
mod testutil;

pub use auth::{authenticate, authenticate_raw, try_authenticate};
pub use bsp::Platform;
pub use cert::SignedHeader;
pub use error::{AuthError, SecurityError};
pub use layout::StagingArea;
pub use mode::BootMode;
pub use prr::Product;
