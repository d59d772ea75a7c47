// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Product detection through the Product Register (PRR).
//!
//! H3 and M3 share a MaskROM API but not its addresses, so we have to know
//! which one we're on before we can call anything.

use log::error;

use crate::bsp::Platform;
use crate::romapi::{RomApi, RomEntries, ROM_TABLE};

/// Product Register.
pub const PRR: usize = 0xfff0_0044;
/// Product code field of the PRR.
pub const PRR_PRODUCT_MASK: u32 = 0x0000_7f00;
pub const PRR_PRODUCT_H3: u32 = 0x0000_4f00;
pub const PRR_PRODUCT_M3: u32 = 0x0000_5200;
/// Set in `Product::product_type` when the product code wasn't recognized.
/// Sits outside `PRR_PRODUCT_MASK` so the raw code is still recoverable.
pub const PRR_PRODUCT_UNKNOWN: u32 = 0x8000_0000;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProductKind {
    H3,
    M3,
    Unknown,
}

/// What we learned from the PRR: which product this is, and where its ROM
/// routines live.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Product {
    /// Masked product code, or'd with `PRR_PRODUCT_UNKNOWN` if unrecognized.
    pub product_type: u32,
    pub name: &'static str,
    pub rom: RomApi,
}

impl Product {
    pub fn is_unknown(&self) -> bool {
        self.product_type & PRR_PRODUCT_UNKNOWN != 0
    }

    /// Product code as read from the PRR, without our flag.
    pub fn code(&self) -> u32 {
        self.product_type & PRR_PRODUCT_MASK
    }

    pub fn kind(&self) -> ProductKind {
        if self.is_unknown() {
            return ProductKind::Unknown;
        }
        match self.code() {
            PRR_PRODUCT_M3 => ProductKind::M3,
            _ => ProductKind::H3,
        }
    }

    pub fn rom_entries(&self) -> RomEntries {
        self.rom.entries()
    }

    fn h3() -> Self {
        Self {
            product_type: PRR_PRODUCT_H3,
            name: "H3",
            // Safety: these are the H3 addresses for our execution state.
            // They're also what an unknown product keeps, but every path
            // into the ROM checks `is_unknown` first.
            rom: unsafe { RomApi::at(ROM_TABLE.h3) },
        }
    }
}

/// H3, which is what the platform assumes until `probe` says otherwise.
impl Default for Product {
    fn default() -> Self {
        Product::h3()
    }
}

/// Reads the masked product code without interpreting it.
pub fn prr_type<P: Platform + ?Sized>(platform: &P) -> u32 {
    platform.read32(PRR) & PRR_PRODUCT_MASK
}

/// Identifies the SoC and selects its ROM entry points.
///
/// Never fails: an unrecognized product comes back with `is_unknown()` set
/// and the H3 addresses as placeholders, and the authenticator refuses to use
/// it. Reads the PRR and nothing else, so calling it again yields the same
/// product.
pub fn probe<P: Platform + ?Sized>(platform: &P) -> Product {
    let reg = platform.read32(PRR);
    let code = reg & PRR_PRODUCT_MASK;

    match code {
        PRR_PRODUCT_H3 => Product::h3(),
        PRR_PRODUCT_M3 => Product {
            product_type: PRR_PRODUCT_M3,
            name: "M3",
            // Safety: PRR says M3, these are the M3 addresses.
            rom: unsafe { RomApi::at(ROM_TABLE.m3) },
        },
        _ => {
            error!("Unknown product. PRR={reg:#x}");
            Product {
                product_type: code | PRR_PRODUCT_UNKNOWN,
                name: "unknown",
                ..Product::h3()
            }
        }
    }
}
