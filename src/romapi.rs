// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bindings for the two R-Car Gen3 MaskROM routines we use.
//!
//! The ROM doesn't publish a table of entry points the way some vendors do, so
//! we carry the fixed addresses ourselves, per product and per execution
//! state. The addresses differ between AArch32 and AArch64 because the ROM
//! contains a separate copy of the API for each.

use core::ffi::c_void;
use core::ptr::null;

use num_derive::FromPrimitive;

use crate::error::AuthError;

/// `uint32_t ROM_SecureBootAPI(uint32_t *key_cert, uint32_t *content_cert,
/// ROM_FuncReadFlash func)`. We never pass a flash read callback.
pub type RomSecureApi = unsafe extern "C" fn(
    key_cert: *const u32,
    content_cert: *const u32,
    read_flash: *const c_void,
) -> u32;

/// `uint32_t ROM_GetLcs(uint32_t *lcs)`.
pub type RomGetLcsApi = unsafe extern "C" fn(lcs: *mut u32) -> u32;

/// Lifecycle states reported by `ROM_GetLcs`. These are fused, so the values
/// are sparse.
#[repr(u32)]
#[derive(Copy, Clone, Debug, FromPrimitive, PartialEq, Eq)]
pub enum Lcs {
    Cm = 0,
    Dm = 1,
    Sd = 3,
    Se = 5,
    Fa = 7,
}

/// Physical addresses of the two ROM routines for one product.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RomEntries {
    pub secure_boot: usize,
    pub get_lcs: usize,
}

/// Per-product entry points for one execution state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RomTable {
    pub h3: RomEntries,
    pub m3: RomEntries,
}

pub const ROM_TABLE_AARCH32: RomTable = RomTable {
    h3: RomEntries {
        secure_boot: 0xeb10_1f54,
        get_lcs: 0xeb10_21b4,
    },
    m3: RomEntries {
        secure_boot: 0xeb10_3efc,
        get_lcs: 0xeb10_415c,
    },
};

pub const ROM_TABLE_AARCH64: RomTable = RomTable {
    h3: RomEntries {
        secure_boot: 0xeb10_dd64,
        get_lcs: 0xeb10_dfe0,
    },
    m3: RomEntries {
        secure_boot: 0xeb11_02fc,
        get_lcs: 0xeb11_0578,
    },
};

cfg_if::cfg_if! {
    if #[cfg(target_pointer_width = "32")] {
        /// Table for the execution state we were built for.
        pub const ROM_TABLE: RomTable = ROM_TABLE_AARCH32;
    } else {
        /// Table for the execution state we were built for.
        pub const ROM_TABLE: RomTable = ROM_TABLE_AARCH64;
    }
}

/// A callable pair of ROM routines.
///
/// Fields are private so that the only ways to get one are the two `unsafe`
/// constructors, which is where the caller vouches for the pointers. After
/// that, the ROM is trusted about as far as it ever is.
#[derive(Copy, Clone, Debug)]
pub struct RomApi {
    secure_boot: RomSecureApi,
    get_lcs: RomGetLcsApi,
}

impl RomApi {
    /// Wraps a pair of function pointers.
    ///
    /// # Safety
    ///
    /// Both functions must follow the MaskROM calling contract: `get_lcs`
    /// writes only through its argument, and `secure_boot` only reads the two
    /// certificates it is handed (plus whatever private scratch it owns).
    pub const unsafe fn new(secure_boot: RomSecureApi, get_lcs: RomGetLcsApi) -> Self {
        Self { secure_boot, get_lcs }
    }

    /// Binds the routines at fixed physical addresses.
    ///
    /// # Safety
    ///
    /// The addresses must be executable ROM entry points with the signatures
    /// above, i.e. they must come from the table for the SoC we are actually
    /// running on. Calling through a wrong table jumps into the middle of
    /// some unrelated ROM function.
    pub unsafe fn at(entries: RomEntries) -> Self {
        unsafe {
            Self {
                secure_boot: core::mem::transmute::<usize, RomSecureApi>(entries.secure_boot),
                get_lcs: core::mem::transmute::<usize, RomGetLcsApi>(entries.get_lcs),
            }
        }
    }

    /// Addresses this pair will jump to.
    pub fn entries(&self) -> RomEntries {
        RomEntries {
            secure_boot: self.secure_boot as usize,
            get_lcs: self.get_lcs as usize,
        }
    }

    /// Asks the ROM for the device lifecycle state.
    ///
    /// Returns the raw value rather than an [`Lcs`] because the ROM is
    /// perfectly capable of returning something outside the documented set,
    /// and the caller has an opinion about what that means.
    pub fn get_lcs(&self) -> Result<u32, AuthError> {
        // The ROM doesn't promise to write this on failure.
        let mut lcs = 0;
        // Safety: guaranteed by the constructors; the only pointer we hand
        // over refers to a local.
        let status = unsafe { (self.get_lcs)(&mut lcs) };
        if status == 0 {
            Ok(lcs)
        } else {
            Err(AuthError::LcsReadFailed(status))
        }
    }

    /// Runs the ROM secure boot check over a key/content certificate pair.
    /// Returns the raw ROM status; zero is success.
    ///
    /// # Safety
    ///
    /// Both pointers must refer to certificates the ROM can read in full,
    /// which in practice means the staging slots, and the caller must hold
    /// the secure-core engine lock while on the non-cache stack.
    pub unsafe fn secure_boot(&self, key_cert: *const u32, content_cert: *const u32) -> u32 {
        unsafe { (self.secure_boot)(key_cert, content_cert, null()) }
    }
}

impl PartialEq for RomApi {
    fn eq(&self, other: &Self) -> bool {
        self.entries() == other.entries()
    }
}

impl Eq for RomApi {}
