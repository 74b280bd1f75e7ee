pub(crate) mod flash;
pub(crate) mod generator;
pub(crate) mod parser;

use crate::error::Error;

pub use rom_kv::{MAX_NAME_LENGTH, MAX_VALUE_SIZE};

/// A single named value of the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageEntry {
    /// The name of the value (max 22 bytes).
    pub name: String,
    /// The payload, its encoding is determined by the [`DataValue`] variant.
    pub value: DataValue,
}

/// A concrete value stored in an entry.
///
/// Numbers are written little endian with their natural width. The store
/// keeps no type information, so values read back from an image are always
/// [`DataValue::Binary`] holding the whole value field.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// Unsigned 8-bit integer.
    U8(u8),
    /// Signed 8-bit integer.
    I8(i8),
    /// Unsigned 16-bit integer.
    U16(u16),
    /// Signed 16-bit integer.
    I16(i16),
    /// Unsigned 32-bit integer.
    U32(u32),
    /// Signed 32-bit integer.
    I32(i32),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// Signed 64-bit integer.
    I64(i64),
    /// 32-bit float.
    F32(f32),
    /// 64-bit float.
    F64(f64),
    /// Boolean, stored as a single byte.
    Bool(bool),
    /// Up to 8 raw bytes.
    Binary(Vec<u8>),
}

impl DataValue {
    /// Return the CSV encoding column string for this value.
    ///
    /// `Binary` maps to `"hex"`, values parsed from an image are listed that
    /// way.
    pub fn encoding_str(&self) -> &'static str {
        match self {
            Self::U8(_) => "u8",
            Self::I8(_) => "i8",
            Self::U16(_) => "u16",
            Self::I16(_) => "i16",
            Self::U32(_) => "u32",
            Self::I32(_) => "i32",
            Self::U64(_) => "u64",
            Self::I64(_) => "i64",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::Bool(_) => "bool",
            Self::Binary(_) => "hex",
        }
    }

    /// The bytes that end up in the value field of the record.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::U8(v) => v.to_le_bytes().to_vec(),
            Self::I8(v) => v.to_le_bytes().to_vec(),
            Self::U16(v) => v.to_le_bytes().to_vec(),
            Self::I16(v) => v.to_le_bytes().to_vec(),
            Self::U32(v) => v.to_le_bytes().to_vec(),
            Self::I32(v) => v.to_le_bytes().to_vec(),
            Self::U64(v) => v.to_le_bytes().to_vec(),
            Self::I64(v) => v.to_le_bytes().to_vec(),
            Self::F32(v) => v.to_le_bytes().to_vec(),
            Self::F64(v) => v.to_le_bytes().to_vec(),
            Self::Bool(v) => vec![*v as u8],
            Self::Binary(b) => b.clone(),
        }
    }
}

impl std::fmt::Display for DataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::U8(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Binary(b) => f.write_str(&hex::encode(b)),
        }
    }
}

impl ImageEntry {
    pub fn new(name: String, value: DataValue) -> Self {
        Self { name, value }
    }
}

/// Validate that `name` is non-empty, within the maximum name length and
/// free of null bytes.
pub(crate) fn validate_name(name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::InvalidName("name must not be empty".to_string()));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(Error::InvalidName(format!(
            "name '{}' is too long (max {} characters)",
            name, MAX_NAME_LENGTH
        )));
    }
    if name.contains('\0') {
        return Err(Error::InvalidName(format!(
            "name '{}' contains a null byte",
            name.escape_default()
        )));
    }
    if rom_kv::Name::try_from(name).ok() == Some(rom_kv::REGION_MARKER) {
        return Err(Error::InvalidName(format!("name '{}' is reserved", name)));
    }
    Ok(())
}

/// Validate that `value` fits into the value field of a record.
pub(crate) fn validate_value(value: &DataValue) -> Result<(), Error> {
    if let DataValue::Binary(b) = value {
        if b.len() > MAX_VALUE_SIZE {
            return Err(Error::InvalidValue(format!(
                "{} bytes do not fit into a value (max {} bytes)",
                b.len(),
                MAX_VALUE_SIZE
            )));
        }
    }
    Ok(())
}

/// Region sizes accepted by the tool: word aligned and large enough for the
/// region marker plus one value.
pub(crate) fn validate_region_size(region_size: usize) -> Result<(), Error> {
    if region_size < 2 * rom_kv::RECORD_SIZE {
        Err(Error::RegionTooSmall(region_size))
    } else if !region_size.is_multiple_of(flash::WORD_SIZE) {
        Err(Error::InvalidRegionSize(region_size))
    } else {
        Ok(())
    }
}
