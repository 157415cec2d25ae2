//! Integration tests across the TVM modules, including published test
//! vectors.

use crate::tvm::*;
use hex_literal::hex;
use num_bigint::BigUint;

/// Code cell of the standard NFT marketplace contract, as published with
/// the reference contract sources.
const NFT_MARKETPLACE_CODE_HEX: &str = "B5EE9C7241010401006D000114FF00F4A413F4BCF2C80B01020120020300AAD23221C700915BE0D0D3030171B0915BE0FA40ED44D0FA403012C705F2E19101D31F01C0018E2BFA003001D4D43021F90070C8CA07CBFFC9D077748018C8CB05CB0258CF165004FA0213CB6BCCCCC971FB00915BE20004F2308EF7CCE7";

#[test]
fn test_nft_marketplace_code_cell_vector() {
    let _ = crate::utils::init_logger();

    let root = boc::hex_to_boc(NFT_MARKETPLACE_CODE_HEX).unwrap();

    assert_eq!(root.bit_len(), 80);
    assert_eq!(root.reference_count(), 1);
    assert_eq!(root.depth(), 2);
    assert_eq!(
        root.hash(),
        hex!("76c11e701480f7a66d6368d0e7b570f4f9119f2338568f9d63ff8d12ebf8a0f7")
    );
}

#[test]
fn test_nft_marketplace_code_reserializes_byte_identical() {
    let root = boc::hex_to_boc(NFT_MARKETPLACE_CODE_HEX).unwrap();
    let reserialized = boc::boc_to_hex(&root, true).unwrap();
    assert_eq!(
        reserialized.to_uppercase(),
        NFT_MARKETPLACE_CODE_HEX.to_uppercase()
    );
}

#[test]
fn test_nft_marketplace_corrupted_checksum() {
    let mut bytes = hex::decode(NFT_MARKETPLACE_CODE_HEX).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    let err = boc::deserialize_boc(&bytes).unwrap_err();
    assert!(matches!(err, CellError::MalformedContainer(_)));
}

#[test]
fn test_builder_and_slice_integration() {
    let addr = Address::new(0, [1u8; 32]);
    let mut builder = CellBuilder::new();
    builder.store_address(Some(&addr)).unwrap();
    builder.store_u32(42).unwrap();
    builder.store_bool(true).unwrap();
    builder.store_coins(&BigUint::from(1_500_000_000u64)).unwrap();
    let cell = builder.build().unwrap();

    let mut slice = Slice::new(cell);
    let loaded = slice.load_address().unwrap().unwrap();
    assert_eq!(loaded.workchain, addr.workchain);
    assert_eq!(loaded.hash_part, addr.hash_part);
    assert_eq!(slice.load_u32().unwrap(), 42);
    assert!(slice.load_bit().unwrap());
    assert_eq!(slice.load_coins().unwrap(), BigUint::from(1_500_000_000u64));
    assert!(slice.is_empty());
}

#[test]
fn test_hash_consistency_across_construction_paths() {
    let direct = Cell::with_data(vec![0x11, 0x22, 0x33], 24).unwrap();

    let mut builder = CellBuilder::new();
    builder.store_byte(0x11).unwrap();
    builder.store_byte(0x22).unwrap();
    builder.store_byte(0x33).unwrap();
    let built = builder.build().unwrap();

    assert_eq!(direct.hash(), built.hash());
}

#[test]
fn test_boc_round_trip_preserves_shared_subtrees() {
    let shared = {
        let mut b = CellBuilder::new();
        b.store_string("shared payload").unwrap();
        b.build().unwrap()
    };
    let left = {
        let mut b = CellBuilder::new();
        b.store_byte(0x01).unwrap();
        b.store_ref(shared.clone()).unwrap();
        b.build().unwrap()
    };
    let right = {
        let mut b = CellBuilder::new();
        b.store_byte(0x02).unwrap();
        b.store_ref(shared).unwrap();
        b.build().unwrap()
    };
    let mut builder = CellBuilder::new();
    builder.store_ref(left).unwrap();
    builder.store_ref(right).unwrap();
    let root = builder.build().unwrap();

    let boc = serialize_boc(&root, true).unwrap();
    let decoded = deserialize_boc(&boc).unwrap();
    assert_eq!(root.hash(), decoded.hash());

    let shared_a = decoded.reference(0).unwrap().reference(0).unwrap();
    let shared_b = decoded.reference(1).unwrap().reference(0).unwrap();
    assert_eq!(shared_a.hash(), shared_b.hash());
}

#[test]
fn test_max_capacity_cell_round_trips() {
    let mut builder = CellBuilder::new();
    builder.store_bytes(&[0xA5; 127]).unwrap();
    builder.store_uint(0x3F, 7).unwrap();
    assert_eq!(builder.bit_len(), MAX_CELL_BITS);
    let cell = builder.build().unwrap();

    let boc = serialize_boc(&cell, false).unwrap();
    let decoded = deserialize_boc(&boc).unwrap();
    assert_eq!(decoded.bit_len(), MAX_CELL_BITS);
    assert_eq!(cell.hash(), decoded.hash());
}

#[test]
fn test_address_survives_cell_encoding() {
    let addr = Address::from_hex(
        "0:83dfd552e63729b472fcbcc8c45ebcc6691702558b68ec7527e1ba403a0f31a8",
    )
    .unwrap();
    let mut builder = CellBuilder::new();
    builder.store_address(Some(&addr)).unwrap();
    let cell = builder.build().unwrap();

    let boc = serialize_boc(&cell, true).unwrap();
    let decoded = deserialize_boc(&boc).unwrap();
    let loaded = Slice::new(decoded).load_address().unwrap().unwrap();
    assert_eq!(loaded.to_hex(), addr.to_hex());
}
