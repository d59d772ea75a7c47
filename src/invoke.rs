// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Calling into the ROM secure boot routine.
//!
//! The ROM runs with caches off and expects its stack to be coherent with
//! that, so the call happens on the non-cache stack slot of the staging area.
//! It also drives the secure-core crypto engine, which other cores on the SoC
//! share, so we hold the engine lock for the duration.

use crate::bsp::{HwEngine, Platform};
use crate::layout::StagingArea;
use crate::romapi::RomApi;

/// Holds a hardware engine lock, releasing it on drop.
pub struct HwEngineGuard<'a, P: Platform + ?Sized> {
    platform: &'a P,
    token: u32,
}

impl<'a, P: Platform + ?Sized> HwEngineGuard<'a, P> {
    /// Blocks until `engine` is ours.
    pub fn lock(platform: &'a P, engine: HwEngine) -> Self {
        let token = platform.hw_engine_lock(engine);
        Self { platform, token }
    }
}

impl<P: Platform + ?Sized> Drop for HwEngineGuard<'_, P> {
    fn drop(&mut self) {
        self.platform.hw_engine_unlock(self.token);
    }
}

/// Locks the engine and runs ROM secure boot over the staged certificates.
/// Returns the raw ROM status.
///
/// Expects to already be on the non-cache stack; `invoke_secure_boot` is the
/// way in.
pub fn call_maskrom_api<P: Platform + ?Sized>(
    platform: &P,
    rom: &RomApi,
    staging: &StagingArea,
) -> u32 {
    let key_cert = staging.key_cert_slot().as_ptr() as *const u32;
    let content_cert = staging.content_cert_slot().as_ptr() as *const u32;

    let _lock = HwEngineGuard::lock(platform, HwEngine::SecureCore);
    // Safety: both pointers are staging slots, which hold full certificates
    // by the time we get here, and we're holding the engine on the
    // non-cache stack as the ROM requires.
    unsafe { rom.secure_boot(key_cert, content_cert) }
}

/// Switches to the staging area's non-cache stack and runs
/// `call_maskrom_api` there.
///
/// Everything staged must already be in memory; this issues the barrier that
/// makes sure of it before leaving the current stack.
pub fn invoke_secure_boot<P: Platform + ?Sized>(
    platform: &P,
    rom: &RomApi,
    staging: &StagingArea,
) -> u32 {
    platform.barrier();
    platform.call_on_stack(staging.stack_top(), &mut || {
        call_maskrom_api(platform, rom, staging)
    })
}
