// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mocks shared by the unit tests.
//!
//! The ROM is a pair of C function pointers, so its mock has nowhere to keep
//! state but a thread-local. Each test runs on its own thread, which keeps
//! them from seeing each other's calls.

use core::ffi::c_void;
use core::ptr::NonNull;
use std::cell::{Cell, RefCell};

use zerocopy::AsBytes;

use crate::bsp::{HwEngine, Platform};
use crate::cert::{CertHeader, CONTENT_CERT_DEFAULT_SIZE, KEY_CERT_DEFAULT_SIZE, SHDR_MAGIC};
use crate::layout::{StagingArea, TA_CONTENT_CERT_AREA_SIZE, TA_KEY_CERT_AREA_SIZE};
use crate::mode::{MFIS_SOFTMDR, RST_MODEMR};
use crate::prr::PRR;
use crate::romapi::RomApi;

thread_local! {
    static ROM: RefCell<RomState> = RefCell::new(RomState::default());
    static LOCK_HELD: Cell<bool> = const { Cell::new(false) };
    static ON_STACK: Cell<bool> = const { Cell::new(false) };
    static EVENTS: RefCell<Vec<Event>> = const { RefCell::new(Vec::new()) };
}

/// Platform and ROM activity, in the order it happened on this thread.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Barrier,
    StackSwitch,
    Lock,
    GetLcs,
    SecureBoot,
    Unlock,
    StackRestore,
}

fn record(event: Event) {
    EVENTS.with(|events| events.borrow_mut().push(event));
}

pub fn events() -> Vec<Event> {
    EVENTS.with(|events| events.borrow().clone())
}

/// Scripted ROM behavior, plus a record of what the ROM was asked.
#[derive(Clone, Debug, Default)]
pub struct RomState {
    pub lcs_status: u32,
    pub lcs: u32,
    pub boot_status: u32,

    pub lcs_calls: u32,
    pub boot_calls: u32,
    pub key_cert: usize,
    pub content_cert: usize,
    pub key_cert_magic: u32,
    pub content_cert_magic: u32,
    pub read_flash_was_null: bool,
    pub lock_held_during_boot: bool,
    pub on_stack_during_boot: bool,
}

unsafe extern "C" fn mock_get_lcs(lcs: *mut u32) -> u32 {
    ROM.with(|rom| {
        let mut rom = rom.borrow_mut();
        rom.lcs_calls += 1;
        record(Event::GetLcs);
        if rom.lcs_status == 0 {
            unsafe { *lcs = rom.lcs };
        }
        rom.lcs_status
    })
}

unsafe extern "C" fn mock_secure_boot(
    key_cert: *const u32,
    content_cert: *const u32,
    read_flash: *const c_void,
) -> u32 {
    ROM.with(|rom| {
        let mut rom = rom.borrow_mut();
        rom.boot_calls += 1;
        record(Event::SecureBoot);
        rom.key_cert = key_cert as usize;
        rom.content_cert = content_cert as usize;
        rom.key_cert_magic = unsafe { key_cert.read_unaligned() };
        rom.content_cert_magic = unsafe { content_cert.read_unaligned() };
        rom.read_flash_was_null = read_flash.is_null();
        rom.lock_held_during_boot = lock_held();
        rom.on_stack_during_boot = on_alternate_stack();
        rom.boot_status
    })
}

/// Installs `state` as this thread's ROM and returns a handle to it.
pub fn mock_rom(state: RomState) -> RomApi {
    let _ = env_logger::builder().is_test(true).try_init();
    ROM.with(|rom| *rom.borrow_mut() = state);
    EVENTS.with(|events| events.borrow_mut().clear());
    // Safety: the mocks only touch the pointers they're given.
    unsafe { RomApi::new(mock_secure_boot, mock_get_lcs) }
}

pub fn rom_state() -> RomState {
    ROM.with(|rom| rom.borrow().clone())
}

pub fn lock_held() -> bool {
    LOCK_HELD.with(Cell::get)
}

pub fn on_alternate_stack() -> bool {
    ON_STACK.with(Cell::get)
}

const MOCK_LOCK_TOKEN: u32 = 0x10c4;

/// Registers as plain fields; everything else is a record of calls.
#[derive(Debug, Default)]
pub struct MockPlatform {
    pub prr: u32,
    pub modemr: u32,
    pub softmdr: u32,

    pub reads: RefCell<Vec<usize>>,
    pub locks: Cell<u32>,
    pub unlocks: Cell<u32>,
    pub engines: RefCell<Vec<HwEngine>>,
    pub stack_tops: RefCell<Vec<usize>>,
    pub barriers: Cell<u32>,
}

impl Platform for MockPlatform {
    fn read32(&self, addr: usize) -> u32 {
        self.reads.borrow_mut().push(addr);
        match addr {
            PRR => self.prr,
            RST_MODEMR => self.modemr,
            MFIS_SOFTMDR => self.softmdr,
            _ => panic!("unexpected MMIO read at {addr:#x}"),
        }
    }

    fn hw_engine_lock(&self, engine: HwEngine) -> u32 {
        assert!(!lock_held(), "engine lock taken twice");
        assert!(on_alternate_stack(), "engine locked before stack switch");
        record(Event::Lock);
        LOCK_HELD.with(|held| held.set(true));
        self.locks.set(self.locks.get() + 1);
        self.engines.borrow_mut().push(engine);
        MOCK_LOCK_TOKEN
    }

    fn hw_engine_unlock(&self, token: u32) {
        assert_eq!(token, MOCK_LOCK_TOKEN);
        assert!(lock_held(), "engine unlocked without lock");
        LOCK_HELD.with(|held| held.set(false));
        record(Event::Unlock);
        self.unlocks.set(self.unlocks.get() + 1);
    }

    fn call_on_stack(&self, stack_top: usize, f: &mut dyn FnMut() -> u32) -> u32 {
        // Same stack, really; we only note that we were asked.
        self.stack_tops.borrow_mut().push(stack_top);
        record(Event::StackSwitch);
        ON_STACK.with(|on| on.set(true));
        let ret = f();
        ON_STACK.with(|on| on.set(false));
        record(Event::StackRestore);
        ret
    }

    fn barrier(&self) {
        record(Event::Barrier);
        self.barriers.set(self.barriers.get() + 1);
    }
}

/// Stand-in for the verification area, prefilled with a sentinel so tests can
/// tell what was written. Backed by words for `SignedHeader` alignment.
pub struct StagingBuffer {
    mem: Vec<u32>,
}

impl StagingBuffer {
    pub const SENTINEL: u8 = 0xa5;

    pub fn new(size: usize) -> Self {
        Self {
            mem: vec![u32::from_ne_bytes([Self::SENTINEL; 4]); size / 4],
        }
    }

    pub fn area(&mut self) -> StagingArea {
        let base = NonNull::new(self.mem.as_mut_ptr() as *mut u8).unwrap();
        // Safety: we own the memory, and tests only look at it through
        // `bytes` while no staging call is running.
        unsafe { StagingArea::new(base, self.mem.len() * 4) }.unwrap()
    }

    pub fn base(&self) -> usize {
        self.mem.as_ptr() as usize
    }

    pub fn bytes(&self) -> &[u8] {
        self.mem.as_bytes()
    }

    pub fn untouched(&self) -> bool {
        self.bytes().iter().all(|&b| b == Self::SENTINEL)
    }
}

pub fn cert_header_words(size: u32, sig_code: u32) -> [u32; 4] {
    [BlobBuilder::KEY_MAGIC, 1, size, sig_code << 21]
}

/// Builds `key cert || content cert || object` blobs.
pub struct BlobBuilder {
    key_blocks: u32,
    content_blocks: u32,
    sig_code: u32,
    object: Vec<u8>,
    record: Option<u32>,
}

impl BlobBuilder {
    pub const KEY_MAGIC: u32 = 0x4b43_4552;
    pub const CONTENT_MAGIC: u32 = 0x4343_4552;
    pub const KEY_FILL: u8 = 0x11;
    pub const CONTENT_FILL: u8 = 0x22;
    pub const OBJECT_FILL: u8 = 0x5a;

    pub fn new() -> Self {
        Self {
            key_blocks: 0x10,
            content_blocks: 0x10,
            sig_code: 0,
            object: Vec::new(),
            record: None,
        }
        .object_words(8)
    }

    pub fn key_blocks(mut self, blocks: u32) -> Self {
        self.key_blocks = blocks;
        self
    }

    pub fn content_blocks(mut self, blocks: u32) -> Self {
        self.content_blocks = blocks;
        self
    }

    pub fn sig_code(mut self, code: u32) -> Self {
        self.sig_code = code;
        self
    }

    /// Object of `words` words, starting with a signed header magic.
    pub fn object_words(mut self, words: usize) -> Self {
        self.object = vec![Self::OBJECT_FILL; words * 4];
        if words > 0 {
            self.object[..4].copy_from_slice(&SHDR_MAGIC.to_le_bytes());
        }
        self
    }

    /// Records this length in the content certificate regardless of the
    /// actual object.
    pub fn object_len_record(mut self, words: u32) -> Self {
        self.record = Some(words);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let key_header = CertHeader::from_words([
            Self::KEY_MAGIC,
            1,
            self.key_blocks,
            self.sig_code << 21,
        ]);
        let content_header = CertHeader::from_words([
            Self::CONTENT_MAGIC,
            1,
            self.content_blocks,
            self.sig_code << 21,
        ]);

        let key_len = clamp(key_header.key_cert_size(), TA_KEY_CERT_AREA_SIZE, KEY_CERT_DEFAULT_SIZE);
        let content_len = clamp(
            content_header.content_cert_size(),
            TA_CONTENT_CERT_AREA_SIZE,
            CONTENT_CERT_DEFAULT_SIZE,
        );

        let mut blob = vec![Self::KEY_FILL; key_len];
        blob[..16].copy_from_slice(key_header.as_bytes());
        let mut content = vec![Self::CONTENT_FILL; content_len];
        content[..16].copy_from_slice(content_header.as_bytes());
        blob.extend_from_slice(&content);
        blob.extend_from_slice(&self.object);

        // Lands in the last word of the content certificate, unless that
        // got clamped.
        let record_at = key_len + content_header.key_cert_size() as usize + 8;
        if blob.len() < record_at + 4 {
            blob.resize(record_at + 4, 0);
        }
        let record = self.record.unwrap_or((self.object.len() / 4) as u32);
        blob[record_at..record_at + 4].copy_from_slice(&record.to_le_bytes());
        blob
    }
}

fn clamp(size: u32, slot: usize, default: u32) -> usize {
    if size as usize > slot {
        default as usize
    } else {
        size as usize
    }
}
