use std::fs;

use pretty_assertions::assert_eq;
use rom_kv_image_tool::RomImage;
use tempfile::NamedTempFile;

#[test]
fn test_csv_image_csv_roundtrip() {
    // Parse original CSV
    let original = RomImage::from_csv_file("tests/assets/basic.csv").unwrap();

    // Generate image
    let bin_file = NamedTempFile::new().unwrap();
    original.generate_image_file(bin_file.path(), 4096).unwrap();

    // Parse image back
    let parsed = RomImage::parse_image_file(bin_file.path(), None).unwrap();

    // Write to CSV
    let csv_file = NamedTempFile::new().unwrap();
    parsed.to_csv_file(csv_file.path()).unwrap();

    // Parse the generated CSV and regenerate the image
    let reparsed = RomImage::from_csv_file(csv_file.path()).unwrap();
    let bin_file2 = NamedTempFile::new().unwrap();
    reparsed.generate_image_file(bin_file2.path(), 4096).unwrap();

    assert_eq!(original.entries.len(), parsed.entries.len());
    assert_eq!(parsed, reparsed);

    // Values are padded to the full field on parse, which is what the
    // store writes anyway
    let bin1 = fs::read(bin_file.path()).unwrap();
    let bin2 = fs::read(bin_file2.path()).unwrap();
    assert_eq!(
        bin1, bin2,
        "CSV-image-CSV-image roundtrip should preserve the image exactly"
    );
}

#[test]
fn test_parse_image_data_directly() {
    let image = RomImage::from_csv_file("tests/assets/basic.csv").unwrap();

    let bin_file = NamedTempFile::new().unwrap();
    image.generate_image_file(bin_file.path(), 2048).unwrap();

    let from_file = RomImage::parse_image_file(bin_file.path(), Some(2048)).unwrap();
    let bytes = fs::read(bin_file.path()).unwrap();
    let from_memory = RomImage::parse_image(&bytes, None).unwrap();

    assert_eq!(from_file, from_memory);
}

#[test]
fn test_csv_string_roundtrip() {
    let content = "key,encoding,value\nboot_count,u32,42\ngain,f64,-0.5\nmac,hex,02005e100001\n";

    let image = RomImage::from_csv(content).unwrap();
    let written = image.to_csv().unwrap();
    assert!(written.starts_with("key,encoding,value"));
    assert_eq!(RomImage::from_csv(&written).unwrap(), image);
}
