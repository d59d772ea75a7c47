// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The fixed, non-cacheable memory the ROM authenticates out of.
//!
//! ```text
//!   Fixed memory map            | TotalSize = TA_VERIFICATION_SIZE
//! ---------------------------------------------------------------
//! | TA object data area       | TotalSize - [1] - [2] - [3]     |
//! | (signed header + binary)  |                                 |
//! ---------------------------------------------------------------
//! | Key Certificate area      | [1] = TA_KEY_CERT_AREA_SIZE      |
//! ---------------------------------------------------------------
//! | Content Certificate area  | [2] = TA_CONTENT_CERT_AREA_SIZE  |
//! ---------------------------------------------------------------
//! | Non-cache Stack area      | [3] = TA_NONCACHE_STACK_AREA_SIZE|
//! ---------------------------------------------------------------
//! ```

use core::ptr::NonNull;

use static_assertions::const_assert;

use crate::cert::{SignedHeader, CONTENT_CERT_DEFAULT_SIZE, KEY_CERT_DEFAULT_SIZE};
use crate::error::AuthError;

pub const TA_VERIFICATION_BASE: usize = 0x4410_0000;
pub const TA_VERIFICATION_SIZE: usize = 0x0010_0000;

pub const TA_KEY_CERT_AREA_SIZE: usize = 4096;
pub const TA_CONTENT_CERT_AREA_SIZE: usize = 4096;
pub const TA_NONCACHE_STACK_AREA_SIZE: usize = 4096;

const TA_SLOTS_SIZE: usize =
    TA_KEY_CERT_AREA_SIZE + TA_CONTENT_CERT_AREA_SIZE + TA_NONCACHE_STACK_AREA_SIZE;

/// Top of the general-purpose non-cache stack the firmware sets aside for
/// ROM calls. Grows down.
pub const NONCACHE_STACK_AREA: usize = 0x4400_0000;

// Defaults must fit the slots they stand in for, or clamping would overflow.
const_assert!(KEY_CERT_DEFAULT_SIZE as usize <= TA_KEY_CERT_AREA_SIZE);
const_assert!(CONTENT_CERT_DEFAULT_SIZE as usize <= TA_CONTENT_CERT_AREA_SIZE);
const_assert!(TA_VERIFICATION_SIZE > TA_SLOTS_SIZE);
const_assert!(TA_VERIFICATION_BASE != 0 && TA_VERIFICATION_BASE % 4096 == 0);

/// A span of physical memory owned by the staging area.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Region {
    base: usize,
    len: usize,
}

impl Region {
    const fn new(base: usize, len: usize) -> Self {
        Self { base, len }
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the last byte.
    pub fn end(&self) -> usize {
        self.base + self.len
    }

    pub fn contains(&self, addr: usize) -> bool {
        (self.base..self.end()).contains(&addr)
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.base as *mut u8
    }

    /// Copies `src` to the start of the region.
    fn copy_from(&self, src: &[u8]) -> Result<(), AuthError> {
        if src.len() > self.len {
            return Err(AuthError::LayoutOverflow);
        }
        // Safety: regions only come out of a `StagingArea`, whose constructor
        // is where exclusive ownership of this memory was promised, and we
        // just checked the length. `src` is borrowed input, so it can't be
        // staging memory we hold exclusively.
        unsafe { core::ptr::copy_nonoverlapping(src.as_ptr(), self.as_ptr(), src.len()) };
        Ok(())
    }
}

/// The verification area carved into its four parts.
#[derive(Debug)]
pub struct StagingArea {
    header: NonNull<SignedHeader>,
    object: Region,
    key_cert: Region,
    content_cert: Region,
    stack: Region,
}

impl StagingArea {
    /// Carves `size` bytes at `base` into the staging layout. Returns `None`
    /// if there's no room for the three fixed slots.
    ///
    /// # Safety
    ///
    /// The memory must be valid for writes, not otherwise referenced while
    /// the area exists, and suitably aligned for a `SignedHeader` at `base`.
    /// On hardware it must also be mapped non-cacheable, since the ROM reads
    /// it with caches off.
    pub unsafe fn new(base: NonNull<u8>, size: usize) -> Option<Self> {
        let object_len = size.checked_sub(TA_SLOTS_SIZE)?;
        let header = base.cast();
        let base = base.as_ptr() as usize;
        let key_base = base + object_len;
        let content_base = key_base + TA_KEY_CERT_AREA_SIZE;
        let stack_base = content_base + TA_CONTENT_CERT_AREA_SIZE;
        Some(Self {
            header,
            object: Region::new(base, object_len),
            key_cert: Region::new(key_base, TA_KEY_CERT_AREA_SIZE),
            content_cert: Region::new(content_base, TA_CONTENT_CERT_AREA_SIZE),
            stack: Region::new(stack_base, TA_NONCACHE_STACK_AREA_SIZE),
        })
    }

    /// The R-Car verification area at its fixed physical address.
    ///
    /// # Safety
    ///
    /// As for `new`; in particular, there must only be one of these at a time.
    pub unsafe fn rcar() -> Self {
        Self {
            // Safety: non-zero constant, checked above.
            header: unsafe { NonNull::new_unchecked(TA_VERIFICATION_BASE as *mut SignedHeader) },
            object: Region::new(TA_VERIFICATION_BASE, TA_VERIFICATION_SIZE - TA_SLOTS_SIZE),
            key_cert: Region::new(
                TA_VERIFICATION_BASE + TA_VERIFICATION_SIZE - TA_SLOTS_SIZE,
                TA_KEY_CERT_AREA_SIZE,
            ),
            content_cert: Region::new(
                TA_VERIFICATION_BASE + TA_VERIFICATION_SIZE
                    - TA_NONCACHE_STACK_AREA_SIZE
                    - TA_CONTENT_CERT_AREA_SIZE,
                TA_CONTENT_CERT_AREA_SIZE,
            ),
            stack: Region::new(
                TA_VERIFICATION_BASE + TA_VERIFICATION_SIZE - TA_NONCACHE_STACK_AREA_SIZE,
                TA_NONCACHE_STACK_AREA_SIZE,
            ),
        }
    }

    pub fn object_region(&self) -> Region {
        self.object
    }

    pub fn key_cert_slot(&self) -> Region {
        self.key_cert
    }

    pub fn content_cert_slot(&self) -> Region {
        self.content_cert
    }

    pub fn stack_region(&self) -> Region {
        self.stack
    }

    /// Initial stack pointer for the non-cache stack. Stacks grow down on
    /// both ARM execution states, so this is the end of the slot.
    pub fn stack_top(&self) -> usize {
        self.stack.end()
    }

    /// Whether an object of `object_size` bytes stays clear of the key
    /// certificate slot.
    pub fn fits(&self, object_size: usize) -> bool {
        match self.object.base.checked_add(object_size) {
            Some(end) => end <= self.key_cert.base,
            None => false,
        }
    }

    /// Copies the object and both certificates into place, in that order.
    ///
    /// Everything is checked before anything is written, so a refusal leaves
    /// all of the staging memory as it was.
    pub fn stage(&self, key_cert: &[u8], content_cert: &[u8], object: &[u8]) -> Result<(), AuthError> {
        if !self.fits(object.len())
            || key_cert.len() > self.key_cert.len
            || content_cert.len() > self.content_cert.len
        {
            return Err(AuthError::LayoutOverflow);
        }

        self.object.copy_from(object)?;
        self.key_cert.copy_from(key_cert)?;
        self.content_cert.copy_from(content_cert)?;
        Ok(())
    }

    /// The signed header at the front of the staged object.
    pub fn ta_header(&self) -> NonNull<SignedHeader> {
        self.header
    }
}
