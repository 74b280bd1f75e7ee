use crate::error::Error;
use crate::platform::Platform;
use crate::{Name, RomKeyValue};

pub trait Set<T> {
    fn set(&mut self, name: &Name, value: T) -> Result<(), Error>;
}

impl<T, S: Set<T>> Set<T> for &mut S {
    fn set(&mut self, name: &Name, value: T) -> Result<(), Error> {
        (*self).set(name, value)
    }
}

// Primitives are stored with their natural width in little endian.
macro_rules! impl_set_le {
    ($($ty:ty),* $(,)?) => {
        $(
            impl<T: Platform> Set<$ty> for RomKeyValue<T> {
                fn set(&mut self, name: &Name, value: $ty) -> Result<(), Error> {
                    self.store_value(name, &value.to_le_bytes())
                }
            }
        )*
    };
}

impl_set_le!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl<T: Platform> Set<bool> for RomKeyValue<T> {
    fn set(&mut self, name: &Name, value: bool) -> Result<(), Error> {
        self.store_value(name, &[value as u8])
    }
}

impl<T: Platform> Set<&[u8]> for RomKeyValue<T> {
    fn set(&mut self, name: &Name, value: &[u8]) -> Result<(), Error> {
        self.store_value(name, value)
    }
}

impl<T: Platform, const N: usize> Set<&[u8; N]> for RomKeyValue<T> {
    fn set(&mut self, name: &Name, value: &[u8; N]) -> Result<(), Error> {
        self.store_value(name, value)
    }
}
