// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The TA authentication entry point.

use core::ptr::NonNull;

use log::{debug, error};

use crate::bsp::Platform;
use crate::cert::{
    CertHeader, CertSizes, SignedHeader, CERT_REC_LEN_SIZE, CERT_STORE_ADDR_SIZE,
    CONTENT_CERT_DEFAULT_SIZE, KEY_CERT_DEFAULT_SIZE,
};
use crate::error::{AuthError, SecurityError};
use crate::invoke::invoke_secure_boot;
use crate::layout::{StagingArea, TA_CONTENT_CERT_AREA_SIZE, TA_KEY_CERT_AREA_SIZE};
use crate::mode::{decide_mode, BootMode};
use crate::prr::Product;

/// Authenticates a TA and returns its signed header in the staging area.
///
/// `blob` is the key certificate, the content certificate and the TA object
/// (signed header plus binary), contiguous and in that order. On success the
/// object has been copied to the staging area and, in secure boot, accepted
/// by the ROM. Any failure is reported as a bare `SecurityError`; the reason
/// goes to the log.
pub fn authenticate<P: Platform + ?Sized>(
    platform: &P,
    product: &Product,
    staging: &StagingArea,
    blob: &[u8],
) -> Result<NonNull<SignedHeader>, SecurityError> {
    Ok(try_authenticate(platform, product, staging, blob)?)
}

/// `authenticate`, but with the reason for a refusal.
pub fn try_authenticate<P: Platform + ?Sized>(
    platform: &P,
    product: &Product,
    staging: &StagingArea,
    blob: &[u8],
) -> Result<NonNull<SignedHeader>, AuthError> {
    let sizes = CertSizes::parse(blob)?;

    debug!(
        "TA size: key_cert={:#x} content_cert={:#x} shdr+bin={:#x}",
        sizes.key_cert, sizes.content_cert, sizes.object
    );

    if product.is_unknown() {
        error!("Unknown product error. product={:#x}", product.code());
        return Err(AuthError::UnknownProduct);
    }
    if !staging.fits(sizes.object) {
        error!("Overflow error. shdr+bin={:#x}", sizes.object);
        return Err(AuthError::LayoutOverflow);
    }

    let (key_cert, content_cert, object) = sizes.split(blob)?;
    staging.stage(key_cert, content_cert, object)?;

    match decide_mode(platform, &product.rom) {
        BootMode::Normal => {
            debug!("[{}] Normal boot", product.name);
            Ok(staging.ta_header())
        }
        BootMode::Secure => {
            let ret = invoke_secure_boot(platform, &product.rom, staging);
            if ret == 0 {
                debug!("[{}] Secure boot success!", product.name);
                Ok(staging.ta_header())
            } else {
                error!("[{}] Secure boot error. {:#x}", product.name, ret);
                Err(AuthError::RomReject(ret))
            }
        }
    }
}

/// Authenticates a TA given only a pointer to its key certificate, which is
/// all the loader has.
///
/// The extent of the blob is worked out from the certificate headers, the
/// same way `authenticate` does. An object that can't fit the staging area
/// is refused before any of it is read.
///
/// # Safety
///
/// `key_cert` must point to a key certificate, content certificate and TA
/// object laid out contiguously, readable for the lengths their headers
/// claim, and not mutated for the duration of the call.
pub unsafe fn authenticate_raw<P: Platform + ?Sized>(
    platform: &P,
    product: &Product,
    staging: &StagingArea,
    key_cert: *const u8,
) -> Result<NonNull<SignedHeader>, SecurityError> {
    let len = unsafe { raw_blob_len(staging, key_cert) };
    // Safety: `raw_blob_len` only counts bytes the headers say are there.
    let blob = unsafe { core::slice::from_raw_parts(key_cert, len) };
    authenticate(platform, product, staging, blob)
}

/// Length of the blob starting at `key_cert`, leaving out the object if it
/// won't fit the staging area anyway.
unsafe fn raw_blob_len(staging: &StagingArea, key_cert: *const u8) -> usize {
    // CertHeader is all unaligned words, so any address will do.
    let header = |at: usize| unsafe { key_cert.add(at).cast::<CertHeader>().read() };

    let mut key_size = header(0).key_cert_size() as usize;
    if key_size > TA_KEY_CERT_AREA_SIZE {
        key_size = KEY_CERT_DEFAULT_SIZE as usize;
    }
    let content_header = header(key_size);
    let mut content_size = content_header.content_cert_size() as usize;
    if content_size > TA_CONTENT_CERT_AREA_SIZE {
        content_size = CONTENT_CERT_DEFAULT_SIZE as usize;
    }

    let record_at = key_size + (content_header.key_cert_size() + CERT_STORE_ADDR_SIZE) as usize;
    let record_end = record_at + CERT_REC_LEN_SIZE as usize;
    let record = unsafe { core::ptr::read_unaligned(key_cert.add(record_at) as *const u32) };
    let object_size = u32::from_le(record)
        .checked_mul(4)
        .map(|n| n as usize)
        .filter(|&n| staging.fits(n))
        .unwrap_or(0);

    (key_size + content_size + object_size).max(record_end)
}
