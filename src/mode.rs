// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Secure vs. normal boot selection.
//!
//! Whether TAs need a signature at all depends on the lifecycle state and, on
//! top of that, one of two mode registers: the MFIS soft mode register on SE
//! parts, and the latched MD5 strap on everything else.

use log::error;
use num_traits::FromPrimitive;

use crate::bsp::Platform;
use crate::romapi::{Lcs, RomApi};

pub const RST_BASE: usize = 0xe616_0000;
/// Mode monitor register, latched from the MD pins at reset.
pub const RST_MODEMR: usize = RST_BASE + 0x0060;
const MODEMR_MD5: u32 = 1 << 5;

pub const MFIS_BASE: usize = 0xe626_0000;
/// Software mode register, set by earlier boot stages.
pub const MFIS_SOFTMDR: usize = MFIS_BASE + 0x0600;
const SOFTMDR_NORMAL: u32 = 1 << 0;

#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum BootMode {
    /// Authenticate through the ROM.
    #[default]
    Secure = 0,
    /// Accept the TA without asking the ROM.
    Normal = 1,
}

/// Decides whether this boot requires ROM authentication.
///
/// The answer is `Secure` unless a register positively says otherwise. In
/// particular, if the ROM can't tell us the lifecycle state we go ahead with
/// secure boot and let the ROM reject whatever it doesn't like.
pub fn decide_mode<P: Platform + ?Sized>(platform: &P, rom: &RomApi) -> BootMode {
    let lcs = match rom.get_lcs() {
        Ok(lcs) => lcs,
        Err(e) => {
            error!("{e}");
            return BootMode::Secure;
        }
    };

    if Lcs::from_u32(lcs) == Some(Lcs::Se) {
        // LCS=SE. Normal boot here is a temporary setting from an earlier
        // stage, not a strap.
        if platform.read32(MFIS_SOFTMDR) & SOFTMDR_NORMAL != 0 {
            BootMode::Normal
        } else {
            BootMode::Secure
        }
    } else if platform.read32(RST_MODEMR) & MODEMR_MD5 != 0 {
        // MD5=1 => LCS=CM/DM + Normal boot
        BootMode::Normal
    } else {
        BootMode::Secure
    }
}
