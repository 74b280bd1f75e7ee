//! The `Get<T>` trait and its implementation in this module allows providing a single generic,
//! overloaded function `get<T>()` for all supported types of the store.

use crate::error::Error;
use crate::platform::Platform;
use crate::{MAX_VALUE_SIZE, Name, RomKeyValue};

pub trait Get<T> {
    fn get(&mut self, name: &Name) -> Result<T, Error>;
}

impl<T, G: Get<T>> Get<T> for &mut G {
    fn get(&mut self, name: &Name) -> Result<T, Error> {
        (*self).get(name)
    }
}

macro_rules! impl_get_le {
    ($($ty:ty),* $(,)?) => {
        $(
            impl<T: Platform> Get<$ty> for RomKeyValue<T> {
                fn get(&mut self, name: &Name) -> Result<$ty, Error> {
                    let mut buf = [0u8; size_of::<$ty>()];
                    self.read_value(name, &mut buf)?;
                    Ok(<$ty>::from_le_bytes(buf))
                }
            }
        )*
    };
}

impl_get_le!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl<T: Platform> Get<bool> for RomKeyValue<T> {
    fn get(&mut self, name: &Name) -> Result<bool, Error> {
        let mut buf = [0u8; 1];
        self.read_value(name, &mut buf)?;
        Ok(buf[0] != 0)
    }
}

/// The full value field. Bytes past the length the value was written with read as 0xFF.
impl<T: Platform> Get<[u8; MAX_VALUE_SIZE]> for RomKeyValue<T> {
    fn get(&mut self, name: &Name) -> Result<[u8; MAX_VALUE_SIZE], Error> {
        let mut buf = [0u8; MAX_VALUE_SIZE];
        self.read_value(name, &mut buf)?;
        Ok(buf)
    }
}
