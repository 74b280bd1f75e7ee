#![doc = include_str ! ("../README.md")]
#![cfg_attr(not(target_arch = "x86_64"), no_std)]

pub mod error;
mod get;
mod internal;
pub mod platform;
mod raw;
mod set;

/// Maximum name length is 22 bytes + 1 byte for the null terminator.
pub const MAX_NAME_LENGTH: usize = 22;
pub const MAX_NAME_SIZE: usize = MAX_NAME_LENGTH + 1;

/// Values hold at most 8 bytes, enough for any primitive up to 64-bit width.
pub const MAX_VALUE_SIZE: usize = 8;

/// Size of a single record slot on flash.
pub const RECORD_SIZE: usize = raw::RECORD_SIZE;

/// Default flash offset of region 0: sector 22 of a 2 MB part.
pub const DEFAULT_START_ADDRESS: usize = 0x1C_0000;
/// Default size of each of the two regions: one 128 kB sector.
pub const DEFAULT_REGION_SIZE: usize = 0x2_0000;

/// Reserved name of the record that stores which region is authoritative.
pub const REGION_MARKER: Name = Name::from_str("space_is_using");

/// A 23-byte name used to identify values (22 characters + null terminator).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Name([u8; MAX_NAME_SIZE]);

impl Name {
    /// Creates a 23 byte, null-padded byte array used as name for values.
    ///
    /// Usage: `Name::from_array(b"my_name")`
    ///
    /// Tip: use a const context if possible to ensure that the name is transformed at compile time:
    ///   `let my_name = const { Name::from_array(b"my_name") };`
    ///
    /// Panics if the name is longer than 22 bytes or contains a null byte.
    pub const fn from_array<const M: usize>(src: &[u8; M]) -> Self {
        assert!(M <= MAX_NAME_LENGTH);
        let mut dst = [0u8; MAX_NAME_SIZE];
        let mut i = 0;
        while i < M {
            assert!(src[i] != 0x00);
            dst[i] = src[i];
            i += 1;
        }
        Self(dst)
    }

    /// Creates a 23 byte, null-padded byte array used as name for values.
    ///
    /// Usage: `Name::from_slice(b"my_name")`
    ///
    /// Panics if the name is longer than 22 bytes or contains a null byte.
    pub const fn from_slice(src: &[u8]) -> Self {
        assert!(src.len() <= MAX_NAME_LENGTH);
        let mut dst = [0u8; MAX_NAME_SIZE];
        let mut i = 0;
        while i < src.len() {
            assert!(src[i] != 0x00);
            dst[i] = src[i];
            i += 1;
        }
        Self(dst)
    }

    /// Creates a 23 byte, null-padded byte array used as name for values.
    ///
    /// Usage: `Name::from_str("my_name")`
    ///
    /// Panics if the name is longer than 22 bytes or contains a null byte. Use `Name::try_from` for names that are
    /// only known at runtime.
    pub const fn from_str(s: &str) -> Self {
        Self::from_slice(s.as_bytes())
    }

    /// Converts a name to a byte array.
    pub const fn as_bytes(&self) -> &[u8; MAX_NAME_SIZE] {
        &self.0
    }

    /// Number of bytes before the null terminator.
    pub fn len(&self) -> usize {
        self.0
            .iter()
            .position(|&e| e == 0x00)
            .unwrap_or(MAX_NAME_LENGTH)
    }

    pub fn is_empty(&self) -> bool {
        self.0[0] == 0x00
    }

    /// On flash the name is followed by its terminator and the rest of the field stays erased.
    pub(crate) fn to_raw(&self) -> [u8; MAX_NAME_SIZE] {
        let len = self.len();
        let mut raw = [0xFFu8; MAX_NAME_SIZE];
        raw[..len].copy_from_slice(&self.0[..len]);
        raw[len] = 0x00;
        raw
    }

    /// A stored name matches if it is byte-wise equal up to and including the terminator,
    /// whatever follows it.
    pub(crate) fn matches(&self, raw: &[u8; MAX_NAME_SIZE]) -> bool {
        let len = self.len();
        raw[..=len] == self.0[..=len]
    }

    /// True if the name lands on flash as the region marker.
    pub(crate) fn is_reserved(&self) -> bool {
        REGION_MARKER.matches(&self.0)
    }

    /// Recovers a name from its on-flash field. Returns `None` if the field has no terminator.
    pub(crate) fn from_raw(raw: &[u8; MAX_NAME_SIZE]) -> Option<Self> {
        let len = raw.iter().position(|&e| e == 0x00)?;
        let mut dst = [0u8; MAX_NAME_SIZE];
        dst[..len].copy_from_slice(&raw[..len]);
        Some(Self(dst))
    }
}

impl TryFrom<&str> for Name {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Name::try_from(value.as_bytes())
    }
}

impl TryFrom<&[u8]> for Name {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.len() > MAX_NAME_LENGTH {
            return Err(Error::NameTooLong);
        }
        if value.contains(&0x00) {
            return Err(Error::NameMalformed);
        }
        Ok(Name::from_slice(value))
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name(b\"")?;

        // the terminator and padding are not part of the name
        for &byte in &self.0[..self.len()] {
            write!(f, "{}", core::ascii::escape_default(byte))?;
        }

        write!(f, "\")")
    }
}

impl AsRef<[u8]> for Name {
    fn as_ref(&self) -> &[u8] {
        &self.0[..self.len()]
    }
}

pub use get::Get;
pub use internal::{Entries, Entry};
pub use set::Set;

use crate::error::Error;
use crate::platform::{FlashOps, Platform};
use core::fmt;

/// One of the two flash areas the store rotates between.
#[derive(strum::FromRepr, strum::Display, Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Region {
    Zero = 0,
    One = 1,
}

impl Region {
    pub fn other(self) -> Self {
        match self {
            Region::Zero => Region::One,
            Region::One => Region::Zero,
        }
    }

    pub fn index(self) -> u32 {
        self as u32
    }
}

/// What the startup recovery found and did.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Recovery {
    /// The last active region had no tombstones and stays active. Appending continues at
    /// `next_free`.
    Resumed { region: Region, next_free: usize },

    /// The last active region held tombstones. `moved` live values were copied into the other
    /// region and the old one was erased.
    Compacted { from: Region, to: Region, moved: u32 },

    /// No region carried a consistent marker. Both regions were erased and region 0 was
    /// initialized, all previous data is gone.
    Formatted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionStatistics {
    pub region: Region,
    pub slots: u32,
    pub unused: u32,
    pub live: u32,
    pub corrupt: u32,
    pub deleted: u32,
    pub invalid: u32,
    pub next_free: usize,
}

/// The store keeps no index in memory: the active region, its base address and the append
/// cursor are all that is needed, every lookup scans the flash.
pub struct RomKeyValue<T: Platform> {
    pub(crate) hal: T,
    pub(crate) start_address: usize,
    pub(crate) region_size: usize,

    // set by self.init()
    pub(crate) region: Region,
    pub(crate) base_address: usize,
    pub(crate) next_free: usize,
    pub(crate) recovery: Recovery,
}

impl<T: Platform> RomKeyValue<T> {
    /// Validates the flash geometry and runs the startup recovery:
    /// 1. Resolve the last active region through its `space_is_using` marker
    /// 2. Resume appending if that region has no tombstones
    /// 3. Otherwise compact its live values into the other region and erase it
    ///
    /// If no region carries a consistent marker both regions are erased, see `Recovery::Formatted`.
    pub fn new(start_address: usize, region_size: usize, hal: T) -> Result<RomKeyValue<T>, Error> {
        T::check_geometry()?;

        if !start_address.is_multiple_of(T::ERASE_SIZE) {
            return Err(Error::InvalidRegionOffset);
        }

        if !region_size.is_multiple_of(T::ERASE_SIZE) || region_size < 2 * RECORD_SIZE {
            return Err(Error::InvalidRegionSize);
        }

        let end = region_size
            .checked_mul(2)
            .and_then(|size| size.checked_add(start_address))
            .ok_or(Error::InvalidRegionSize)?;
        if end > hal.capacity() || end > u32::MAX as usize {
            return Err(Error::InvalidRegionSize);
        }

        let mut kv = Self {
            hal,
            start_address,
            region_size,
            region: Region::Zero,
            base_address: start_address,
            next_free: 0,
            recovery: Recovery::Formatted,
        };

        kv.init()?;
        Ok(kv)
    }

    /// Runs the startup recovery again. This is the only point at which space taken by
    /// tombstones is reclaimed, a store that ran full needs this (or a restart) before it
    /// accepts new values.
    pub fn init(&mut self) -> Result<Recovery, Error> {
        let recovery = self.recover()?;
        self.recovery = recovery;
        Ok(recovery)
    }

    /// Set a value and write it to the flash.
    ///
    /// Type support:
    ///  * bool, signed and unsigned integers up to 64-bit width and floats: saved little endian
    ///    with their natural width
    ///  * &[u8] and [u8; N]: up to 8 bytes
    ///
    /// Writing the value that is already stored is a no-op and consumes no space.
    pub fn set<R>(&mut self, name: &Name, value: R) -> Result<(), Error>
    where
        RomKeyValue<T>: Set<R>,
    {
        Set::set(self, name, value)
    }

    /// Get a value from the flash.
    ///
    /// The width read is the width of the requested type. Nothing checks that it matches the
    /// width the value was written with.
    pub fn get<R>(&mut self, name: &Name) -> Result<R, Error>
    where
        RomKeyValue<T>: Get<R>,
    {
        Get::get(self, name)
    }

    /// Copies the first `out.len()` bytes of the stored value into `out`.
    pub fn get_into(&mut self, name: &Name, out: &mut [u8]) -> Result<(), Error> {
        self.read_value(name, out)
    }

    /// Delete a value. Every record with the name is tombstoned, missing names are ignored.
    pub fn delete(&mut self, name: &Name) -> Result<(), Error> {
        self.delete_all(name)
    }

    /// Iterates over all live values of the active region in the order they were written.
    pub fn entries(&mut self) -> Entries<'_, T> {
        Entries::new(self)
    }

    /// The outcome of the last startup recovery.
    pub fn recovery(&self) -> Recovery {
        self.recovery
    }

    pub fn active_region(&self) -> Region {
        self.region
    }

    /// Offset of the next slot that will be written, relative to the active region.
    pub fn next_free(&self) -> usize {
        self.next_free
    }

    /// Flash address of the given region.
    pub fn region_address(&self, region: Region) -> usize {
        self.start_address + region.index() as usize * self.region_size
    }

    /// Returns detailed statistics about the slots of the active region.
    pub fn statistics(&mut self) -> Result<RegionStatistics, Error> {
        let mut stats = RegionStatistics {
            region: self.region,
            slots: self.slot_count() as u32,
            unused: 0,
            live: 0,
            corrupt: 0,
            deleted: 0,
            invalid: 0,
            next_free: self.next_free,
        };

        for offset in self.slot_offsets() {
            let record = self.load_record(offset)?;
            match record.status() {
                raw::RecordStatus::Unused => stats.unused += 1,
                _ if record.is_live() => stats.live += 1,
                raw::RecordStatus::Using => stats.corrupt += 1,
                raw::RecordStatus::Deleted => stats.deleted += 1,
                raw::RecordStatus::Error => stats.invalid += 1,
            }
        }

        Ok(stats)
    }

    /// Releases the flash.
    pub fn into_inner(self) -> T {
        self.hal
    }
}
