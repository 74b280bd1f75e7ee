use base64::Engine;

use crate::error::Error;
use crate::image::{validate_name, validate_value, DataValue, ImageEntry};
use crate::RomImage;

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    key: String,
    encoding: String,
    value: String,
}

/// Parse CSV content from a string into a [`RomImage`].
pub(crate) fn parse_csv(content: &str) -> Result<RomImage, Error> {
    let mut image = RomImage { entries: vec![] };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    for result in reader.deserialize() {
        let row: CsvRow = result?;
        image.entries.push(parse_row(row)?);
    }

    Ok(image)
}

fn parse_row(row: CsvRow) -> Result<ImageEntry, Error> {
    validate_name(&row.key)?;

    if row.encoding.is_empty() {
        return Err(Error::InvalidEncoding(format!(
            "entry '{}' must have an encoding",
            row.key
        )));
    }
    let value = parse_value(&row.value, &row.encoding)?;
    validate_value(&value)?;

    Ok(ImageEntry::new(row.key, value))
}

macro_rules! parse_numeric {
    ($value:expr, $ty:ty, $variant:ident) => {
        $value
            .parse::<$ty>()
            .map(DataValue::$variant)
            .map_err(|e| Error::InvalidValue(format!("invalid {} value: {}", stringify!($ty), e)))
    };
}

fn parse_value(value: &str, encoding: &str) -> Result<DataValue, Error> {
    match encoding {
        "u8" => parse_numeric!(value, u8, U8),
        "i8" => parse_numeric!(value, i8, I8),
        "u16" => parse_numeric!(value, u16, U16),
        "i16" => parse_numeric!(value, i16, I16),
        "u32" => parse_numeric!(value, u32, U32),
        "i32" => parse_numeric!(value, i32, I32),
        "u64" => parse_numeric!(value, u64, U64),
        "i64" => parse_numeric!(value, i64, I64),
        "f32" => parse_numeric!(value, f32, F32),
        "f64" => parse_numeric!(value, f64, F64),
        "bool" => match value {
            "true" | "1" => Ok(DataValue::Bool(true)),
            "false" | "0" => Ok(DataValue::Bool(false)),
            _ => Err(Error::InvalidValue(format!("invalid bool value: {}", value))),
        },
        "hex" => {
            let bytes = hex::decode(value)?;
            Ok(DataValue::Binary(bytes))
        }
        "base64" => {
            let bytes = base64::engine::general_purpose::STANDARD.decode(value)?;
            Ok(DataValue::Binary(bytes))
        }
        _ => Err(Error::InvalidEncoding(encoding.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers() {
        assert_eq!(parse_value("200", "u8").unwrap(), DataValue::U8(200));
        assert_eq!(parse_value("-2", "i16").unwrap(), DataValue::I16(-2));
        assert_eq!(parse_value("1.5", "f32").unwrap(), DataValue::F32(1.5));
        assert!(matches!(
            parse_value("300", "u8"),
            Err(Error::InvalidValue(_))
        ));
    }

    #[test]
    fn bytes() {
        assert_eq!(
            parse_value("deadbeef", "hex").unwrap(),
            DataValue::Binary(vec![0xDE, 0xAD, 0xBE, 0xEF])
        );
        assert_eq!(
            parse_value("3q2+7w==", "base64").unwrap(),
            DataValue::Binary(vec![0xDE, 0xAD, 0xBE, 0xEF])
        );
        assert!(matches!(parse_value("xyz", "hex"), Err(Error::HexError(_))));
    }

    #[test]
    fn unknown_encoding() {
        assert!(matches!(
            parse_value("1", "string"),
            Err(Error::InvalidEncoding(_))
        ));
    }

    #[test]
    fn rows() {
        let image = parse_csv("key,encoding,value\nboot_count, u32, 7\nflag,bool,true\n").unwrap();
        assert_eq!(
            image.entries,
            vec![
                ImageEntry::new("boot_count".to_string(), DataValue::U32(7)),
                ImageEntry::new("flag".to_string(), DataValue::Bool(true)),
            ]
        );

        assert!(matches!(
            parse_csv("key,encoding,value\nblob,hex,000102030405060708\n"),
            Err(Error::InvalidValue(_))
        ));
        assert!(matches!(
            parse_csv("key,encoding,value\nspace_is_using,u32,1\n"),
            Err(Error::InvalidName(_))
        ));
    }
}
