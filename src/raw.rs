use crate::{MAX_NAME_SIZE, MAX_VALUE_SIZE, Name};
#[cfg(feature = "debug-logs")]
use core::fmt::{Debug, Formatter};
use core::mem::{offset_of, size_of};

pub(crate) const STATUS_WORDS: usize = 2;
pub(crate) const STATUS_WORD_SIZE: usize = size_of::<u32>();
pub(crate) const STATUS_SIZE: usize = STATUS_WORDS * STATUS_WORD_SIZE;
pub(crate) const RECORD_SIZE: usize = size_of::<Record>();

/// Value of a status word after erase.
pub(crate) const ERASED_WORD: u32 = u32::MAX;
/// Value a status word is programmed to. Only clears bits, so it can be written over an erased
/// word without an erase cycle.
const MARKED_WORD: u32 = 0x5A5A_5A5A;

const NAME_OFFSET: usize = offset_of!(Record, name);
const DATA_OFFSET: usize = offset_of!(Record, data);
const SUM_CHECK_OFFSET: usize = offset_of!(Record, sum_check);

// The layout is shared with images written by existing firmware, so it must not drift.
const _: () = assert!(RECORD_SIZE == 40, "Record must be 40 bytes");
const _: () = assert!(
    RECORD_SIZE.is_multiple_of(STATUS_WORD_SIZE),
    "Record size must be a multiple of the word size"
);

/// The on-flash record. Slots are laid out back to back starting at the region base.
#[repr(C, packed)]
#[derive(Copy, Clone, PartialEq)]
pub(crate) struct Record {
    pub(crate) status: [u32; STATUS_WORDS],
    pub(crate) name: [u8; MAX_NAME_SIZE],
    pub(crate) data: [u8; MAX_VALUE_SIZE],
    pub(crate) sum_check: u8,
}

/// The two status words form a one-way state machine: Unused -> Using -> Deleted. Every step
/// programs one previously erased word, so an interrupted transition never yields a state that
/// is further along than the one requested.
#[derive(strum::Display, Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum RecordStatus {
    // All bits set, default state after erase.
    Unused,

    // Slot holds a record that may be served once its checksum checks out.
    Using,

    // Superseded or removed. Only reclaimed by erasing the whole region.
    Deleted,

    // None of the above, the status words were corrupted or a write was torn.
    Error,
}

impl RecordStatus {
    pub(crate) const fn words(self) -> Option<[u32; STATUS_WORDS]> {
        match self {
            RecordStatus::Unused => Some([ERASED_WORD, ERASED_WORD]),
            RecordStatus::Using => Some([MARKED_WORD, ERASED_WORD]),
            RecordStatus::Deleted => Some([MARKED_WORD, MARKED_WORD]),
            RecordStatus::Error => None,
        }
    }
}

impl From<[u32; STATUS_WORDS]> for RecordStatus {
    fn from(val: [u32; STATUS_WORDS]) -> Self {
        match val {
            [ERASED_WORD, ERASED_WORD] => RecordStatus::Unused,
            [MARKED_WORD, ERASED_WORD] => RecordStatus::Using,
            [MARKED_WORD, MARKED_WORD] => RecordStatus::Deleted,
            _ => RecordStatus::Error,
        }
    }
}

pub(crate) fn status_words_from_bytes(raw: &[u8; STATUS_SIZE]) -> [u32; STATUS_WORDS] {
    let mut words = [0u32; STATUS_WORDS];
    for (word, chunk) in words.iter_mut().zip(raw.chunks_exact(STATUS_WORD_SIZE)) {
        *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    words
}

/// Additive checksum over the full name and data buffers, including the 0xFF fill.
pub(crate) fn checksum(name: &[u8; MAX_NAME_SIZE], data: &[u8; MAX_VALUE_SIZE]) -> u8 {
    name.iter()
        .chain(data.iter())
        .fold(0u8, |acc, &byte| acc.wrapping_add(byte))
}

impl Record {
    /// Builds the image of a live record. `value` must not be longer than `MAX_VALUE_SIZE`,
    /// the remaining bytes keep their erased state.
    pub(crate) fn new(name: &Name, value: &[u8]) -> Self {
        let mut data = [0xFFu8; MAX_VALUE_SIZE];
        data[..value.len()].copy_from_slice(value);

        let name = name.to_raw();
        Self {
            status: [MARKED_WORD, ERASED_WORD],
            name,
            data,
            sum_check: checksum(&name, &data),
        }
    }

    pub(crate) fn status(&self) -> RecordStatus {
        let status = self.status;
        RecordStatus::from(status)
    }

    pub(crate) fn is_valid(&self) -> bool {
        let name = self.name;
        let data = self.data;
        checksum(&name, &data) == self.sum_check
    }

    pub(crate) fn is_live(&self) -> bool {
        self.status() == RecordStatus::Using && self.is_valid()
    }

    pub(crate) fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut raw = [0u8; RECORD_SIZE];
        let status = self.status;
        for (chunk, word) in raw[..STATUS_SIZE]
            .chunks_exact_mut(STATUS_WORD_SIZE)
            .zip(status)
        {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        raw[NAME_OFFSET..DATA_OFFSET].copy_from_slice(&self.name);
        raw[DATA_OFFSET..SUM_CHECK_OFFSET].copy_from_slice(&self.data);
        raw[SUM_CHECK_OFFSET] = self.sum_check;
        raw
    }

    pub(crate) fn from_bytes(raw: &[u8; RECORD_SIZE]) -> Self {
        let mut status = [0u8; STATUS_SIZE];
        status.copy_from_slice(&raw[..STATUS_SIZE]);
        let mut name = [0u8; MAX_NAME_SIZE];
        name.copy_from_slice(&raw[NAME_OFFSET..DATA_OFFSET]);
        let mut data = [0u8; MAX_VALUE_SIZE];
        data.copy_from_slice(&raw[DATA_OFFSET..SUM_CHECK_OFFSET]);

        Self {
            status: status_words_from_bytes(&status),
            name,
            data,
            sum_check: raw[SUM_CHECK_OFFSET],
        }
    }
}

#[cfg(feature = "debug-logs")]
impl Debug for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let status = self.status();
        let name = self.name;
        let data = self.data;
        let sum_check = self.sum_check;
        let name = match name.iter().position(|&e| e == 0x00) {
            None => &name[..],
            Some(idx) => &name[..idx],
        };
        let name = core::str::from_utf8(name).unwrap_or("<invalid utf8>");
        f.write_fmt(format_args!(
            "Record {{ status: {status:>7}, name: '{name}', data: {data:02x?}, sum_check: 0x{sum_check:02x} }}"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_patterns() {
        assert_eq!(
            RecordStatus::from([0xFFFF_FFFF, 0xFFFF_FFFF]),
            RecordStatus::Unused
        );
        assert_eq!(
            RecordStatus::from([0x5A5A_5A5A, 0xFFFF_FFFF]),
            RecordStatus::Using
        );
        assert_eq!(
            RecordStatus::from([0x5A5A_5A5A, 0x5A5A_5A5A]),
            RecordStatus::Deleted
        );
        assert_eq!(
            RecordStatus::from([0x5A5A_FFFF, 0xFFFF_FFFF]),
            RecordStatus::Error
        );
        assert_eq!(
            RecordStatus::from([0xFFFF_FFFF, 0x5A5A_5A5A]),
            RecordStatus::Error
        );
    }

    #[test]
    fn status_transitions_only_clear_bits() {
        let unused = RecordStatus::Unused.words().unwrap();
        let using = RecordStatus::Using.words().unwrap();
        let deleted = RecordStatus::Deleted.words().unwrap();
        for i in 0..STATUS_WORDS {
            assert_eq!(using[i] & !unused[i], 0);
            assert_eq!(deleted[i] & !using[i], 0);
        }
    }

    #[test]
    fn checksum_wraps() {
        let name = [0xFFu8; MAX_NAME_SIZE];
        let data = [0xFFu8; MAX_VALUE_SIZE];
        // 31 * 0xFF = 0x1EE1
        assert_eq!(checksum(&name, &data), 0xE1);
        assert_eq!(checksum(&[0; MAX_NAME_SIZE], &[0; MAX_VALUE_SIZE]), 0);
    }

    #[test]
    fn record_layout() {
        let record = Record::new(&Name::from_str("ab"), &[1, 2]);
        let raw = record.to_bytes();

        assert_eq!(&raw[0..4], &[0x5A; 4]);
        assert_eq!(&raw[4..8], &[0xFF; 4]);
        assert_eq!(&raw[8..11], b"ab\0");
        assert!(raw[11..31].iter().all(|&b| b == 0xFF));
        assert_eq!(&raw[31..33], &[1, 2]);
        assert!(raw[33..39].iter().all(|&b| b == 0xFF));

        let expected = raw[8..39]
            .iter()
            .fold(0u8, |acc, &b| acc.wrapping_add(b));
        assert_eq!(raw[39], expected);

        let decoded = Record::from_bytes(&raw);
        assert!(decoded == record);
        assert!(decoded.is_live());
    }

    #[test]
    fn flipped_bit_invalidates_record() {
        let mut raw = Record::new(&Name::from_str("calib"), &42u32.to_le_bytes()).to_bytes();
        raw[DATA_OFFSET] ^= 0x01;
        let record = Record::from_bytes(&raw);
        assert_eq!(record.status(), RecordStatus::Using);
        assert!(!record.is_valid());
    }
}
