//! Bag of Cells (BoC) serialization and deserialization
//!
//! BoC is the flat container format that carries a rooted cell graph as
//! bytes. Serialization deduplicates structurally identical subtrees by
//! their level-0 hash, so a graph with shared subtrees stores each distinct
//! cell once. Deserialization reads all records first and materializes the
//! graph bottom-up, so references may point forwards or backwards in the
//! flat list.

use crate::crc::CRC32C;
use crate::tvm::bits::BitString;
use crate::tvm::cell::{ArcCell, Cell, CellType, MAX_CELL_REFS};
use crate::tvm::error::{CellError, Result};
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// BoC magic number for the generic format
const BOC_GENERIC_MAGIC: u32 = 0xb5ee9c72;

/// BoC magic number for the legacy indexed format
const BOC_INDEXED_MAGIC: u32 = 0x68ff65f3;

/// BoC magic number for the legacy indexed format with CRC32C
const BOC_INDEXED_CRC32C_MAGIC: u32 = 0xacc3a728;

/// Serializes a single-root cell graph into BoC bytes
pub fn serialize_boc(root: &ArcCell, has_crc32: bool) -> Result<Vec<u8>> {
    serialize_boc_with(std::slice::from_ref(root), false, has_crc32)
}

/// Serializes a cell graph with one or more roots into BoC bytes,
/// optionally emitting the per-cell offset index and a trailing CRC32C
pub fn serialize_boc_with(roots: &[ArcCell], has_idx: bool, has_crc32: bool) -> Result<Vec<u8>> {
    if roots.is_empty() {
        return Err(CellError::MalformedContainer("no root cells".into()));
    }

    // Collect distinct cells in first-encounter depth-first order, parents
    // before their children.
    let mut cells: Vec<ArcCell> = Vec::new();
    let mut index: HashMap<[u8; 32], usize> = HashMap::new();
    for root in roots {
        collect_cells(root, &mut cells, &mut index);
    }

    let ref_size = bytes_needed(cells.len());

    // Serialize each cell record: descriptors, padded data, ref indices
    let mut serialized_cells = Vec::with_capacity(cells.len());
    for cell in &cells {
        let mut record = Vec::new();
        record.extend_from_slice(&cell.descriptors());
        record.extend_from_slice(&cell.serialize_data());
        for reference in cell.references() {
            let ref_idx = index.get(&reference.hash()).copied().ok_or_else(|| {
                CellError::MalformedContainer("reference missing from collected cells".into())
            })?;
            write_uint(&mut record, ref_idx, ref_size);
        }
        serialized_cells.push(record);
    }

    let cells_size: usize = serialized_cells.iter().map(|c| c.len()).sum();
    let offset_size = bytes_needed(cells_size);

    let mut result = Vec::new();
    result.extend_from_slice(&BOC_GENERIC_MAGIC.to_be_bytes());

    let mut flags = ref_size as u8;
    if has_idx {
        flags |= 0x80;
    }
    if has_crc32 {
        flags |= 0x40;
    }
    result.push(flags);
    result.push(offset_size as u8);

    write_uint(&mut result, cells.len(), ref_size);
    write_uint(&mut result, roots.len(), ref_size);
    write_uint(&mut result, 0, ref_size); // absent cells
    write_uint(&mut result, cells_size, offset_size);

    for root in roots {
        let root_idx = index.get(&root.hash()).copied().ok_or_else(|| {
            CellError::MalformedContainer("root missing from collected cells".into())
        })?;
        write_uint(&mut result, root_idx, ref_size);
    }

    if has_idx {
        let mut offset = 0usize;
        for record in &serialized_cells {
            offset += record.len();
            write_uint(&mut result, offset, offset_size);
        }
    }

    for record in &serialized_cells {
        result.extend_from_slice(record);
    }

    if has_crc32 {
        let crc = CRC32C.checksum(&result);
        result.extend_from_slice(&crc.to_le_bytes());
    }

    debug!(
        "serialized {} cells ({} bytes) from {} root(s)",
        cells.len(),
        result.len(),
        roots.len()
    );

    Ok(result)
}

/// Deserializes BoC bytes into the single root cell of the contained graph
pub fn deserialize_boc(data: &[u8]) -> Result<ArcCell> {
    let mut roots = deserialize_boc_roots(data)?;
    if roots.len() != 1 {
        return Err(CellError::MalformedContainer(format!(
            "expected a single root, container has {}",
            roots.len()
        )));
    }
    Ok(roots.remove(0))
}

/// Deserializes BoC bytes into all root cells of the contained graph
pub fn deserialize_boc_roots(data: &[u8]) -> Result<Vec<ArcCell>> {
    if data.len() < 4 {
        return Err(CellError::MalformedContainer(
            "container shorter than the magic prefix".into(),
        ));
    }
    let magic = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    match magic {
        BOC_GENERIC_MAGIC => deserialize_boc_generic(data),
        BOC_INDEXED_MAGIC | BOC_INDEXED_CRC32C_MAGIC => Err(CellError::MalformedContainer(
            "legacy indexed BoC format is not supported".into(),
        )),
        _ => Err(CellError::MalformedContainer(format!(
            "invalid magic number {magic:#010x}"
        ))),
    }
}

struct RawCell {
    data: Vec<u8>,
    bit_len: usize,
    exotic: bool,
    refs: Vec<usize>,
}

fn deserialize_boc_generic(data: &[u8]) -> Result<Vec<ArcCell>> {
    let mut pos = 6;
    if data.len() < pos {
        return Err(CellError::MalformedContainer("truncated header".into()));
    }

    let flags = data[4];
    let has_idx = flags & 0x80 != 0;
    let has_crc32 = flags & 0x40 != 0;
    let _has_cache_bits = flags & 0x20 != 0;
    let ref_size = (flags & 0x07) as usize;
    let offset_size = data[5] as usize;

    if ref_size == 0 || ref_size > 8 {
        return Err(CellError::MalformedContainer(format!(
            "invalid reference width {ref_size}"
        )));
    }
    if offset_size == 0 || offset_size > 8 {
        return Err(CellError::MalformedContainer(format!(
            "invalid offset width {offset_size}"
        )));
    }

    let cells_count = read_uint(data, &mut pos, ref_size)?;
    let roots_count = read_uint(data, &mut pos, ref_size)?;
    let absent_count = read_uint(data, &mut pos, ref_size)?;
    let cells_size = read_uint(data, &mut pos, offset_size)?;

    if roots_count == 0 {
        return Err(CellError::MalformedContainer("container has no roots".into()));
    }
    if cells_size > data.len() {
        return Err(CellError::MalformedContainer(format!(
            "declared data size {cells_size} exceeds container length {}",
            data.len()
        )));
    }
    // every record is at least two descriptor bytes, which bounds the
    // declared counts before any allocation
    if cells_count == 0
        || cells_count
            .checked_mul(2)
            .map_or(true, |min| min > cells_size)
    {
        return Err(CellError::MalformedContainer(format!(
            "cell count {cells_count} inconsistent with data size {cells_size}"
        )));
    }
    if roots_count > cells_count {
        return Err(CellError::MalformedContainer(format!(
            "root count {roots_count} exceeds cell count {cells_count}"
        )));
    }
    if absent_count != 0 {
        return Err(CellError::MalformedContainer(format!(
            "absent cells are not supported (count {absent_count})"
        )));
    }

    let mut root_indices = Vec::with_capacity(roots_count);
    for _ in 0..roots_count {
        let idx = read_uint(data, &mut pos, ref_size)?;
        if idx >= cells_count {
            return Err(CellError::MalformedContainer(format!(
                "root index {idx} out of range ({cells_count} cells)"
            )));
        }
        root_indices.push(idx);
    }

    if has_idx {
        // The offset index is redundant for sequential parsing; skip it.
        let index_len = cells_count
            .checked_mul(offset_size)
            .ok_or_else(|| CellError::MalformedContainer("offset index overflow".into()))?;
        if pos + index_len > data.len() {
            return Err(CellError::MalformedContainer("truncated offset index".into()));
        }
        pos += index_len;
    }

    let cells_end = pos
        .checked_add(cells_size)
        .ok_or_else(|| CellError::MalformedContainer("cell section overflow".into()))?;
    let expected_len = cells_end + if has_crc32 { 4 } else { 0 };
    if data.len() < expected_len {
        return Err(CellError::MalformedContainer(format!(
            "container truncated: {} bytes, {expected_len} expected",
            data.len()
        )));
    }

    if has_crc32 {
        let expected = u32::from_le_bytes([
            data[cells_end],
            data[cells_end + 1],
            data[cells_end + 2],
            data[cells_end + 3],
        ]);
        let actual = CRC32C.checksum(&data[..cells_end]);
        if expected != actual {
            return Err(CellError::MalformedContainer(format!(
                "checksum mismatch: expected {expected:#010x}, got {actual:#010x}"
            )));
        }
    }

    // First pass: read every record; references are resolved afterwards
    // since they may point to records not yet parsed.
    let mut raw_cells = Vec::with_capacity(cells_count);
    for i in 0..cells_count {
        raw_cells.push(read_cell_record(data, &mut pos, cells_end, ref_size, i, cells_count)?);
    }
    if pos != cells_end {
        return Err(CellError::MalformedContainer(format!(
            "{} trailing bytes after the last cell record",
            cells_end - pos
        )));
    }

    // Second pass: materialize bottom-up so children exist before parents.
    let mut built: Vec<Option<ArcCell>> = vec![None; cells_count];
    let mut in_progress = vec![false; cells_count];
    for root_idx in &root_indices {
        build_cell(*root_idx, &raw_cells, &mut built, &mut in_progress)?;
    }

    debug!("deserialized {cells_count} cells with {roots_count} root(s)");

    root_indices
        .into_iter()
        .map(|idx| {
            built[idx]
                .clone()
                .ok_or_else(|| CellError::MalformedContainer(format!("root {idx} not built")))
        })
        .collect()
}

fn read_cell_record(
    data: &[u8],
    pos: &mut usize,
    cells_end: usize,
    ref_size: usize,
    cell_idx: usize,
    cells_count: usize,
) -> Result<RawCell> {
    if *pos + 2 > cells_end {
        return Err(CellError::MalformedContainer(format!(
            "truncated descriptors of cell {cell_idx}"
        )));
    }
    let d1 = data[*pos];
    let d2 = data[*pos + 1];
    *pos += 2;

    let ref_count = (d1 & 0x07) as usize;
    let exotic = d1 & 0x08 != 0;
    if ref_count > MAX_CELL_REFS {
        return Err(CellError::MalformedContainer(format!(
            "cell {cell_idx} claims {ref_count} references"
        )));
    }

    let data_size = (d2 as usize + 1) / 2;
    if *pos + data_size > cells_end {
        return Err(CellError::MalformedContainer(format!(
            "truncated data of cell {cell_idx}"
        )));
    }
    let cell_data = data[*pos..*pos + data_size].to_vec();
    *pos += data_size;

    // Even d2 means whole bytes; odd d2 means the last byte carries a
    // stop-bit padding marker locating the exact bit length.
    let bit_len = if d2 % 2 == 0 {
        data_size * 8
    } else {
        let last = *cell_data.last().ok_or_else(|| {
            CellError::MalformedContainer(format!("cell {cell_idx} has padding but no data"))
        })?;
        if last == 0 {
            return Err(CellError::MalformedContainer(format!(
                "cell {cell_idx} is missing its padding marker"
            )));
        }
        data_size * 8 - last.trailing_zeros() as usize - 1
    };

    let mut refs = Vec::with_capacity(ref_count);
    for _ in 0..ref_count {
        if *pos + ref_size > cells_end {
            return Err(CellError::MalformedContainer(format!(
                "truncated references of cell {cell_idx}"
            )));
        }
        let ref_idx = read_uint(data, pos, ref_size)?;
        if ref_idx >= cells_count {
            return Err(CellError::MalformedContainer(format!(
                "reference index {ref_idx} out of range ({cells_count} cells)"
            )));
        }
        refs.push(ref_idx);
    }

    Ok(RawCell {
        data: cell_data,
        bit_len,
        exotic,
        refs,
    })
}

fn build_cell(
    idx: usize,
    raw_cells: &[RawCell],
    built: &mut Vec<Option<ArcCell>>,
    in_progress: &mut Vec<bool>,
) -> Result<ArcCell> {
    if let Some(cell) = &built[idx] {
        return Ok(cell.clone());
    }
    if in_progress[idx] {
        return Err(CellError::MalformedContainer(format!(
            "circular reference involving cell {idx}"
        )));
    }
    in_progress[idx] = true;

    let raw = &raw_cells[idx];
    let mut references = Vec::with_capacity(raw.refs.len());
    for &ref_idx in &raw.refs {
        references.push(build_cell(ref_idx, raw_cells, built, in_progress)?);
    }

    let cell_type = if raw.exotic {
        let tag = *raw.data.first().ok_or_else(|| {
            CellError::MalformedContainer(format!("exotic cell {idx} has no type byte"))
        })?;
        CellType::from_exotic_tag(tag)?
    } else {
        CellType::Ordinary
    };

    let bits = BitString::from_raw(raw.data.clone(), raw.bit_len)?;
    let cell = Arc::new(Cell::from_parts(bits, references, cell_type)?);

    in_progress[idx] = false;
    built[idx] = Some(cell.clone());
    Ok(cell)
}

fn collect_cells(cell: &ArcCell, cells: &mut Vec<ArcCell>, index: &mut HashMap<[u8; 32], usize>) {
    let hash = cell.hash();
    if index.contains_key(&hash) {
        return;
    }
    index.insert(hash, cells.len());
    cells.push(cell.clone());
    for reference in cell.references() {
        collect_cells(reference, cells, index);
    }
}

fn bytes_needed(value: usize) -> usize {
    if value == 0 {
        return 1;
    }
    let bits = (usize::BITS - value.leading_zeros()) as usize;
    (bits + 7) / 8
}

fn write_uint(buf: &mut Vec<u8>, value: usize, size: usize) {
    let bytes = value.to_be_bytes();
    buf.extend_from_slice(&bytes[bytes.len() - size..]);
}

fn read_uint(data: &[u8], pos: &mut usize, size: usize) -> Result<usize> {
    if *pos + size > data.len() {
        return Err(CellError::MalformedContainer(
            "unexpected end of container".into(),
        ));
    }
    let mut result = 0usize;
    for i in 0..size {
        result = (result << 8) | data[*pos + i] as usize;
    }
    *pos += size;
    Ok(result)
}

/// Parses a hex string into the root cell of a BoC
pub fn hex_to_boc(hex_str: &str) -> Result<ArcCell> {
    let hex_str = hex_str.trim().replace([' ', '\n'], "");
    let bytes = hex::decode(&hex_str)
        .map_err(|e| CellError::MalformedContainer(format!("invalid hex: {e}")))?;
    deserialize_boc(&bytes)
}

/// Serializes a cell into a hex string
pub fn boc_to_hex(cell: &ArcCell, has_crc32: bool) -> Result<String> {
    Ok(hex::encode(serialize_boc(cell, has_crc32)?))
}

/// Serializes a cell into a base64 string
pub fn boc_to_base64(cell: &ArcCell, has_crc32: bool) -> Result<String> {
    use base64::Engine;
    let bytes = serialize_boc(cell, has_crc32)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// Parses a base64 string into the root cell of a BoC
pub fn base64_to_boc(b64: &str) -> Result<ArcCell> {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64)
        .map_err(|e| CellError::MalformedContainer(format!("invalid base64: {e}")))?;
    deserialize_boc(&bytes)
}
