// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BSP for R-Car Gen3 (H3, M3) running in the secure world, either AArch64
//! or AArch32.
//!
//! The engine lock belongs to the surrounding firmware, which shares the
//! crypto engine with the other cores on the SoC; we link against its
//! implementation rather than growing our own.

use core::ffi::c_void;

use super::{HwEngine, Platform};

extern "C" {
    fn hw_engine_lock(hwlock: *mut u32, engine: u32);
    fn hw_engine_unlock(hwlock: u32);
}

pub struct Board;

impl Platform for Board {
    fn read32(&self, addr: usize) -> u32 {
        // Safety: the only addresses we read are the fixed PRR, RST and MFIS
        // registers, which the firmware maps device-nGnRE before we run.
        unsafe { core::ptr::read_volatile(addr as *const u32) }
    }

    fn hw_engine_lock(&self, engine: HwEngine) -> u32 {
        let mut token = 0;
        // Safety: plain C call, writes only the token.
        unsafe { hw_engine_lock(&mut token, engine as u32) };
        token
    }

    fn hw_engine_unlock(&self, token: u32) {
        // Safety: plain C call; `token` came from `hw_engine_lock`.
        unsafe { hw_engine_unlock(token) }
    }

    fn call_on_stack(&self, stack_top: usize, f: &mut dyn FnMut() -> u32) -> u32 {
        // The trampoline gets a thin pointer to our fat one.
        let mut f = f;
        let data = (&mut f as *mut &mut dyn FnMut() -> u32).cast::<c_void>();
        // Safety: `trampoline` matches the calling convention `switch_stack`
        // uses, `data` outlives the call, and the caller hands us the top of a
        // stack region nobody else is using.
        unsafe { switch_stack(trampoline as usize, stack_top, data) }
    }

    fn barrier(&self) {
        // A DMB would order the copies against each other, but the ROM runs
        // with caches off and may touch the slots through a different path,
        // so we want them complete, not just ordered.
        //
        // Safety: a barrier touches no memory or registers.
        unsafe { core::arch::asm!("dsb sy", options(nostack, preserves_flags)) }
    }
}

extern "C" fn trampoline(data: *mut c_void) -> u32 {
    // Safety: `data` was made from a `&mut &mut dyn FnMut` in `call_on_stack`
    // which is still on the (old) stack and borrowed for the duration.
    let f = unsafe { &mut *(data as *mut &mut dyn FnMut() -> u32) };
    f()
}

/// Calls `func(data)` with SP set to `stack_top`, then puts SP back.
///
/// The old SP is parked in a callee-saved register, so `func` preserves it
/// for us as long as it follows the procedure call standard.
#[cfg(target_arch = "aarch64")]
unsafe fn switch_stack(func: usize, stack_top: usize, data: *mut c_void) -> u32 {
    let ret: usize;
    unsafe {
        core::arch::asm!(
            "mov x20, sp",
            "mov sp, {stack}",
            "blr {func}",
            "mov sp, x20",
            stack = in(reg) stack_top,
            func = in(reg) func,
            inout("x0") data as usize => ret,
            out("x20") _,
            clobber_abi("C"),
        );
    }
    ret as u32
}

#[cfg(target_arch = "arm")]
unsafe fn switch_stack(func: usize, stack_top: usize, data: *mut c_void) -> u32 {
    let ret: usize;
    unsafe {
        core::arch::asm!(
            "mov r4, sp",
            "mov sp, {stack}",
            "blx {func}",
            "mov sp, r4",
            stack = in(reg) stack_top,
            func = in(reg) func,
            inout("r0") data as usize => ret,
            out("r4") _,
            clobber_abi("C"),
        );
    }
    ret as u32
}
