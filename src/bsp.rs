// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Platform hooks the authenticator needs from its surroundings.
//!
//! The core logic never touches hardware directly. Everything it needs from
//! the outside world (MMIO reads, the SoC-wide crypto engine lock, running code
//! on a different stack, and ordering memory) goes through the `Platform`
//! trait below.
//!
//! To add a board:
//!
//! 1. Create a module within `bsp` named after it.
//! 2. Define a type in the module, conventionally `Board`.
//! 3. Implement `bsp::Platform` for it.
//!
//! Tests implement the trait on mock types that record what was asked of them.

#[cfg(all(
    feature = "rcar-gen3",
    any(target_arch = "aarch64", target_arch = "arm")
))]
pub mod rcar_gen3;

/// Hardware engines arbitrated by the SoC-wide engine lock.
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HwEngine {
    /// Crypto engine used by the MaskROM secure boot routine.
    SecureCore = 0,
}

/// Requirements placed upon a platform.
pub trait Platform {
    /// Reads a 32-bit register at physical address `addr`.
    fn read32(&self, addr: usize) -> u32;

    /// Takes exclusive ownership of `engine`, blocking until it is free.
    /// Returns a token to hand back to `hw_engine_unlock`.
    fn hw_engine_lock(&self, engine: HwEngine) -> u32;

    /// Releases a lock taken by `hw_engine_lock`.
    fn hw_engine_unlock(&self, token: u32);

    /// Runs `f` with the stack pointer set to `stack_top`, restores the
    /// original stack pointer, and returns what `f` returned.
    ///
    /// `f` must not unwind.
    fn call_on_stack(&self, stack_top: usize, f: &mut dyn FnMut() -> u32) -> u32;

    /// Makes all prior writes visible to other bus masters, including ROM
    /// code running with caches off.
    fn barrier(&self) {
        core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
    }
}

/// Runs `f` on the platform's general-purpose non-cache stack,
/// `NONCACHE_STACK_AREA`.
///
/// TA authentication uses the stack slot inside the staging area instead; this
/// one is for other ROM calls made outside of authentication.
pub fn switch_stack_pointer<P: Platform + ?Sized>(
    platform: &P,
    f: &mut dyn FnMut() -> u32,
) -> u32 {
    platform.call_on_stack(crate::layout::NONCACHE_STACK_AREA, f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{on_alternate_stack, MockPlatform};

    #[test]
    fn switch_stack_pointer_uses_noncache_area() {
        let platform = MockPlatform::default();
        let ret = switch_stack_pointer(&platform, &mut || {
            assert!(on_alternate_stack());
            42u32
        });
        assert_eq!(ret, 42);
        assert!(!on_alternate_stack());
        assert_eq!(
            platform.stack_tops.borrow().as_slice(),
            &[crate::layout::NONCACHE_STACK_AREA]
        );
    }
}
