//! Tests for CRC module

use super::*;

#[test]
fn test_crc16_check_value() {
    // standard check input for CRC-16/XMODEM
    assert_eq!(CRC16.checksum(b"123456789"), 0x31C3);
}

#[test]
fn test_crc32c_check_value() {
    // standard check input for CRC-32/ISCSI
    assert_eq!(CRC32C.checksum(b"123456789"), 0xE306_9283);
}

#[test]
fn test_crc16_deterministic() {
    let data = b"test data";
    assert_eq!(CRC16.checksum(data), CRC16.checksum(data));
}

#[test]
fn test_crc32c_deterministic() {
    let data = b"test data";
    assert_eq!(CRC32C.checksum(data), CRC32C.checksum(data));
}

#[test]
fn test_crc16_different_data() {
    assert_ne!(CRC16.checksum(b"data1"), CRC16.checksum(b"data2"));
}

#[test]
fn test_crc32c_different_data() {
    assert_ne!(CRC32C.checksum(b"data1"), CRC32C.checksum(b"data2"));
}

#[test]
fn test_crc16_incremental_update() {
    let mut digest = CRC16.digest();
    digest.update(b"hello");
    digest.update(b" world");
    assert_eq!(digest.finalize(), CRC16.checksum(b"hello world"));
}

#[test]
fn test_crc32c_incremental_update() {
    let mut digest = CRC32C.digest();
    digest.update(b"hello");
    digest.update(b" world");
    assert_eq!(digest.finalize(), CRC32C.checksum(b"hello world"));
}

#[test]
fn test_crc_order_matters() {
    assert_ne!(CRC16.checksum(b"abc"), CRC16.checksum(b"bca"));
    assert_ne!(CRC32C.checksum(b"abc"), CRC32C.checksum(b"bca"));
}
