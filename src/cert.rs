// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Just enough certificate parsing to find where things are.
//!
//! The input is a key certificate, a content certificate and the TA object,
//! back to back. We only read the header words we need for sizes; the magic,
//! version and every signature are the ROM's problem.

use core::mem::size_of;

use static_assertions::const_assert_eq;
use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{AsBytes, FromBytes, LayoutVerified, Unaligned};

use crate::error::AuthError;
use crate::layout::{TA_CONTENT_CERT_AREA_SIZE, TA_KEY_CERT_AREA_SIZE};

/// Base signature length. The flag field can stretch this.
pub const CERT_SIGNATURE_SIZE: u32 = 256;
/// Content certificates append the object's store address...
pub const CERT_STORE_ADDR_SIZE: u32 = 8;
/// ...and its length in blocks.
pub const CERT_REC_LEN_SIZE: u32 = 4;
pub const CERT_ADD_DATA_SIZE: u32 = CERT_STORE_ADDR_SIZE + CERT_REC_LEN_SIZE;
const CERT_OFS_BIT_SIZE: u32 = 0xffff;
const CERT_BLOCK_SIZE: u32 = 4;
const CERT_SIG_EXT_SHIFT: u32 = 21;
const CERT_SIG_EXT_MASK: u32 = 0b11 << CERT_SIG_EXT_SHIFT;

/// Used in place of a computed size that wouldn't fit its staging slot.
pub const KEY_CERT_DEFAULT_SIZE: u32 = 0x24c;
pub const CONTENT_CERT_DEFAULT_SIZE: u32 = 0x268;

/// The leading words of both certificate kinds.
#[derive(Copy, Clone, Debug, AsBytes, FromBytes, Unaligned)]
#[repr(C)]
pub struct CertHeader {
    pub magic: U32<LittleEndian>,
    pub version: U32<LittleEndian>,
    /// Low 16 bits: certificate body length in 4-byte blocks.
    pub size: U32<LittleEndian>,
    /// Bits 22:21: signature length extension.
    pub flags: U32<LittleEndian>,
}

const_assert_eq!(size_of::<CertHeader>(), 16);

impl CertHeader {
    /// Views the front of `bytes` as a header, if there's room for one.
    pub fn parse(bytes: &[u8]) -> Option<&CertHeader> {
        let (header, _) = LayoutVerified::<_, CertHeader>::new_unaligned_from_prefix(bytes)?;
        Some(header.into_ref())
    }

    pub fn from_words(words: [u32; 4]) -> Self {
        Self {
            magic: U32::new(words[0]),
            version: U32::new(words[1]),
            size: U32::new(words[2]),
            flags: U32::new(words[3]),
        }
    }

    /// Size of a key certificate with this header.
    pub fn key_cert_size(&self) -> u32 {
        (self.size.get() & CERT_OFS_BIT_SIZE) * CERT_BLOCK_SIZE + sig_ext(self.flags.get())
    }

    /// Size of a content certificate with this header: a key certificate
    /// plus the store address and record length.
    pub fn content_cert_size(&self) -> u32 {
        self.key_cert_size() + CERT_ADD_DATA_SIZE
    }
}

/// Signature length selected by bits 22:21 of a certificate's flag word.
///
/// Code 3 isn't assigned; the ROM treats it like 0, and so do we.
pub const fn sig_ext(flags: u32) -> u32 {
    match (flags & CERT_SIG_EXT_MASK) >> CERT_SIG_EXT_SHIFT {
        1 => CERT_SIGNATURE_SIZE + CERT_SIGNATURE_SIZE / 2,
        2 => CERT_SIGNATURE_SIZE * 2,
        _ => CERT_SIGNATURE_SIZE,
    }
}

pub fn key_cert_size(header: &CertHeader) -> u32 {
    header.key_cert_size()
}

pub fn content_cert_size(header: &CertHeader) -> u32 {
    header.content_cert_size()
}

/// Reads the object length recorded in a content certificate, in bytes.
///
/// The record sits right after the store address, which itself follows the
/// key-certificate-shaped part of the content certificate.
///
/// Unlike a plain `u32` multiply, a record whose byte length would wrap is
/// refused as `LayoutOverflow` rather than staged at the wrapped size.
pub fn object_size(content_cert: &[u8]) -> Result<u32, AuthError> {
    let header = CertHeader::parse(content_cert).ok_or(AuthError::Truncated)?;
    let offset = (header.key_cert_size() + CERT_STORE_ADDR_SIZE) as usize;
    let record = content_cert
        .get(offset..offset + CERT_REC_LEN_SIZE as usize)
        .and_then(U32::<LittleEndian>::read_from)
        .ok_or(AuthError::Truncated)?;
    // A length this large can't be staged anyway.
    record
        .get()
        .checked_mul(CERT_BLOCK_SIZE)
        .ok_or(AuthError::LayoutOverflow)
}

/// Sizes of the three parts of an input blob, as they'll be staged.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CertSizes {
    pub key_cert: usize,
    pub content_cert: usize,
    pub object: usize,
}

impl CertSizes {
    /// Works out where the certificates and the object are in `blob`.
    ///
    /// A certificate whose computed size wouldn't fit its staging slot is
    /// taken to have the default size instead; the ROM will reject it later
    /// if that's wrong. The object length is not clamped here, since whether
    /// it fits depends on the staging area.
    pub fn parse(blob: &[u8]) -> Result<Self, AuthError> {
        let key_header = CertHeader::parse(blob).ok_or(AuthError::Truncated)?;
        let mut key_cert = key_header.key_cert_size() as usize;
        if key_cert > TA_KEY_CERT_AREA_SIZE {
            key_cert = KEY_CERT_DEFAULT_SIZE as usize;
        }

        let content = blob.get(key_cert..).ok_or(AuthError::Truncated)?;
        let content_header = CertHeader::parse(content).ok_or(AuthError::Truncated)?;
        let mut content_cert = content_header.content_cert_size() as usize;
        if content_cert > TA_CONTENT_CERT_AREA_SIZE {
            content_cert = CONTENT_CERT_DEFAULT_SIZE as usize;
        }

        let object = object_size(content)? as usize;

        Ok(Self {
            key_cert,
            content_cert,
            object,
        })
    }

    /// Cuts `blob` into key certificate, content certificate and object.
    pub fn split<'a>(&self, blob: &'a [u8]) -> Result<(&'a [u8], &'a [u8], &'a [u8]), AuthError> {
        let (key_cert, rest) = split_checked(blob, self.key_cert)?;
        let (content_cert, rest) = split_checked(rest, self.content_cert)?;
        let (object, _) = split_checked(rest, self.object)?;
        Ok((key_cert, content_cert, object))
    }
}

fn split_checked(bytes: &[u8], at: usize) -> Result<(&[u8], &[u8]), AuthError> {
    if bytes.len() < at {
        return Err(AuthError::Truncated);
    }
    Ok(bytes.split_at(at))
}

/// Magic number of the signed TA header, "HSTO" in memory.
pub const SHDR_MAGIC: u32 = 0x4f54_5348;

/// Signed header at the front of a TA object. This is what the loader gets
/// back, pointing into the staging area, once authentication passes.
#[derive(Copy, Clone, Debug, AsBytes, FromBytes)]
#[repr(C)]
pub struct SignedHeader {
    pub magic: u32,
    pub img_type: u32,
    pub img_size: u32,
    pub algo: u32,
    pub hash_size: u16,
    pub sig_size: u16,
}

const_assert_eq!(size_of::<SignedHeader>(), 20);
