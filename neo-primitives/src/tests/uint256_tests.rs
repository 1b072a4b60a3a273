use crate::UInt256;
use std::cmp::Ordering;

#[test]
fn test_fail() {
    let result = UInt256::from_bytes(&[0u8; UInt256::LENGTH + 1]);
    assert!(result.is_err());
}

#[test]
fn test_generator() {
    let bytes = vec![0u8; 32];
    let uint256 = UInt256::from_bytes(&bytes).unwrap();
    assert_eq!(UInt256::zero(), uint256);
    assert!(uint256.is_zero());
}

#[test]
fn test_hex_roundtrip() {
    let value =
        UInt256::parse("0x0102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f20")
            .unwrap();
    assert_eq!(
        "0x0102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f20",
        value.to_hex_string()
    );
    assert_eq!(value.to_array()[0], 0x20);
}

#[test]
fn test_compare_to() {
    let mut temp = vec![0u8; 32];
    temp[31] = 0x01;
    let result = UInt256::from_bytes(&temp).unwrap();

    assert_eq!(Ordering::Equal, UInt256::zero().cmp(&UInt256::zero()));
    assert_eq!(Ordering::Less, UInt256::zero().cmp(&result));
    assert_eq!(Ordering::Greater, result.cmp(&UInt256::zero()));
}

#[test]
fn test_sha256_known_vector() {
    // SHA-256("abc"), stored little-endian so the display form is reversed.
    let hash = UInt256::sha256(b"abc");
    assert_eq!(
        hex::encode(hash.to_array()),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn test_serde_uses_hex_string() {
    let value = UInt256::sha256(b"neo");
    let json = serde_json::to_string(&value).unwrap();
    assert_eq!(json, format!("\"{}\"", value.to_hex_string()));
    let back: UInt256 = serde_json::from_str(&json).unwrap();
    assert_eq!(back, value);
}
