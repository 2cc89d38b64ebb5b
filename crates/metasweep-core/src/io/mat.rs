//! MATLAB Level 5 `.mat` files.
//!
//! The writer stores a [`DataSheet`] as a single 1x1 struct variable named
//! `data_sheet`, one field per key, little-endian throughout:
//!
//! - numeric arrays become `double` matrices in column-major order
//!   (1-D arrays are written as 1xN rows),
//! - text becomes a 1xN `char` row,
//! - a text list becomes a `char` matrix, one space-padded row per entry.
//!
//! With [`MatOptions::compress`] the variable is wrapped in a zlib
//! `miCOMPRESSED` element. The reader accepts either form, any numeric
//! class, cell arrays of strings, and files whose fields were saved as
//! separate top-level variables instead of a `data_sheet` struct.

use std::io::{Read, Write};

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use log::debug;
use ndarray::{ArrayD, IxDyn, ShapeBuilder};

use super::datasheet::{DataSheet, Field};
use super::PersistenceError;

/// Name of the struct variable holding the record.
pub const VARIABLE: &str = "data_sheet";

const HEADER_LEN: usize = 128;
const HEADER_TEXT_LEN: usize = 116;
const VERSION: u16 = 0x0100;

const MI_INT8: u32 = 1;
const MI_UINT8: u32 = 2;
const MI_INT16: u32 = 3;
const MI_UINT16: u32 = 4;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_SINGLE: u32 = 7;
const MI_DOUBLE: u32 = 9;
const MI_INT64: u32 = 12;
const MI_UINT64: u32 = 13;
const MI_MATRIX: u32 = 14;
const MI_COMPRESSED: u32 = 15;
const MI_UTF8: u32 = 16;
const MI_UTF16: u32 = 17;

const MX_CELL: u8 = 1;
const MX_STRUCT: u8 = 2;
const MX_CHAR: u8 = 4;
const MX_DOUBLE: u8 = 6;
const MX_SINGLE: u8 = 7;
const MX_UINT64: u8 = 15;

const COMPLEX_FLAG: u8 = 0x08;
const MIN_FIELD_NAME_LEN: usize = 32;
const MAX_FIELD_NAME_LEN: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatOptions {
    /// Wrap the variable in a zlib-compressed element.
    pub compress: bool,
}

pub fn write_mat<W: Write>(mut writer: W, sheet: &DataSheet, options: MatOptions) -> Result<(), PersistenceError> {
    writer.write_all(&file_header())?;

    let mut body = Vec::new();
    write_struct_fields(&mut body, sheet)?;
    let variable = matrix(MX_STRUCT, &[1, 1], VARIABLE, &body)?;

    if options.compress {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&variable)?;
        let compressed = encoder.finish()?;
        writer.write_u32::<LittleEndian>(MI_COMPRESSED)?;
        writer.write_u32::<LittleEndian>(tag_len(compressed.len())?)?;
        writer.write_all(&compressed)?;
    } else {
        writer.write_all(&variable)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_mat<R: Read>(mut reader: R) -> Result<DataSheet, PersistenceError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    if bytes.len() < HEADER_LEN {
        return Err(PersistenceError::Format("file is shorter than a MAT-file header".into()));
    }
    match &bytes[HEADER_LEN - 2..HEADER_LEN] {
        b"IM" => {}
        b"MI" => return Err(PersistenceError::Format("big-endian MAT-files are not supported".into())),
        _ => return Err(PersistenceError::Format("not a MAT-file (version 5)".into())),
    }

    let mut variables = Vec::new();
    let mut pos = HEADER_LEN;
    while pos + 8 <= bytes.len() {
        let element = next_element(&bytes, &mut pos)?;
        match element.data_type {
            MI_MATRIX => variables.push(parse_matrix(element.data)?),
            MI_COMPRESSED => {
                let mut inflated = Vec::new();
                ZlibDecoder::new(element.data).read_to_end(&mut inflated)?;
                let inner = next_element(&inflated, &mut 0)?;
                if inner.data_type == MI_MATRIX {
                    variables.push(parse_matrix(inner.data)?);
                }
            }
            other => debug!("Skipping top-level element of type {other}"),
        }
    }

    let mut loose = DataSheet::new();
    for (name, value) in variables {
        match value {
            Parsed::Struct(sheet) if name == VARIABLE => return Ok(sheet),
            Parsed::Struct(_) => debug!("Skipping struct variable '{name}'"),
            Parsed::Value(field) => loose.insert(name, field),
        }
    }
    Ok(loose)
}

fn file_header() -> [u8; HEADER_LEN] {
    let mut header = [b' '; HEADER_LEN];
    let text = format!("MATLAB 5.0 MAT-file, written by metasweep {}", env!("CARGO_PKG_VERSION"));
    let n = text.len().min(HEADER_TEXT_LEN);
    header[..n].copy_from_slice(&text.as_bytes()[..n]);
    header[HEADER_TEXT_LEN..HEADER_TEXT_LEN + 8].fill(0);
    LittleEndian::write_u16(&mut header[124..126], VERSION);
    header[126..].copy_from_slice(b"IM");
    header
}

fn tag_len(len: usize) -> Result<u32, PersistenceError> {
    u32::try_from(len).map_err(|_| PersistenceError::Format("element larger than 4 GiB".into()))
}

fn padded(len: usize) -> usize {
    len.div_ceil(8) * 8
}

/// Append a tagged element, zero-padded to an 8-byte boundary.
fn write_element(out: &mut Vec<u8>, data_type: u32, data: &[u8]) -> Result<(), PersistenceError> {
    out.write_u32::<LittleEndian>(data_type)?;
    out.write_u32::<LittleEndian>(tag_len(data.len())?)?;
    out.extend_from_slice(data);
    out.resize(out.len() + padded(data.len()) - data.len(), 0);
    Ok(())
}

/// A complete `miMATRIX` element.
fn matrix(class: u8, dims: &[usize], name: &str, body: &[u8]) -> Result<Vec<u8>, PersistenceError> {
    let mut payload = Vec::with_capacity(body.len() + 48);

    let mut flags = Vec::with_capacity(8);
    flags.write_u32::<LittleEndian>(class as u32)?;
    flags.write_u32::<LittleEndian>(0)?;
    write_element(&mut payload, MI_UINT32, &flags)?;

    let mut dim_bytes = Vec::with_capacity(dims.len() * 4);
    for &d in dims {
        let d = i32::try_from(d).map_err(|_| PersistenceError::Format(format!("dimension {d} too large")))?;
        dim_bytes.write_i32::<LittleEndian>(d)?;
    }
    write_element(&mut payload, MI_INT32, &dim_bytes)?;
    write_element(&mut payload, MI_INT8, name.as_bytes())?;
    payload.extend_from_slice(body);

    let mut out = Vec::with_capacity(payload.len() + 8);
    write_element(&mut out, MI_MATRIX, &payload)?;
    Ok(out)
}

fn write_struct_fields(out: &mut Vec<u8>, sheet: &DataSheet) -> Result<(), PersistenceError> {
    let longest = sheet.keys().map(str::len).max().unwrap_or(0);
    let name_len = (longest + 1).max(MIN_FIELD_NAME_LEN);
    if name_len > MAX_FIELD_NAME_LEN {
        return Err(PersistenceError::Format(format!(
            "field names are limited to {} characters",
            MAX_FIELD_NAME_LEN - 1
        )));
    }

    // Small data element: type and length share the first word.
    out.write_u16::<LittleEndian>(MI_INT32 as u16)?;
    out.write_u16::<LittleEndian>(4)?;
    out.write_i32::<LittleEndian>(name_len as i32)?;

    let mut names = vec![0u8; name_len * sheet.len()];
    for (i, key) in sheet.keys().enumerate() {
        names[i * name_len..i * name_len + key.len()].copy_from_slice(key.as_bytes());
    }
    write_element(out, MI_INT8, &names)?;

    for (_, field) in sheet.iter() {
        out.extend_from_slice(&field_matrix(field)?);
    }
    Ok(())
}

fn field_matrix(field: &Field) -> Result<Vec<u8>, PersistenceError> {
    match field {
        Field::Array(array) => {
            let dims = match array.shape() {
                [] => vec![1, 1],
                [n] => vec![1, *n],
                shape => shape.to_vec(),
            };
            let mut data = Vec::with_capacity(array.len() * 8);
            // Reversing the axes turns logical order into column-major order.
            for &value in array.t().iter() {
                data.write_f64::<LittleEndian>(value)?;
            }
            let mut body = Vec::new();
            write_element(&mut body, MI_DOUBLE, &data)?;
            matrix(MX_DOUBLE, &dims, "", &body)
        }
        Field::Text(text) => char_matrix(std::slice::from_ref(text)),
        Field::TextList(items) => char_matrix(items),
    }
}

fn char_matrix(rows: &[String]) -> Result<Vec<u8>, PersistenceError> {
    let units: Vec<Vec<u16>> = rows.iter().map(|r| r.encode_utf16().collect()).collect();
    let cols = units.iter().map(Vec::len).max().unwrap_or(0);
    let dims = if cols == 0 { [0, 0] } else { [rows.len(), cols] };

    let mut data = Vec::with_capacity(rows.len() * cols * 2);
    for j in 0..cols {
        for row in &units {
            data.write_u16::<LittleEndian>(row.get(j).copied().unwrap_or(b' ' as u16))?;
        }
    }
    let mut body = Vec::new();
    write_element(&mut body, MI_UINT16, &data)?;
    matrix(MX_CHAR, &dims, "", &body)
}

struct Element<'a> {
    data_type: u32,
    data: &'a [u8],
}

fn truncated() -> PersistenceError {
    PersistenceError::Format("truncated data element".into())
}

/// Read the element at `pos` and advance past it and its padding.
fn next_element<'a>(bytes: &'a [u8], pos: &mut usize) -> Result<Element<'a>, PersistenceError> {
    let tag = bytes.get(*pos..*pos + 8).ok_or_else(truncated)?;
    let first = LittleEndian::read_u32(&tag[..4]);

    let small_len = (first >> 16) as usize;
    if small_len != 0 {
        if small_len > 4 {
            return Err(PersistenceError::Format(format!("bad small element length {small_len}")));
        }
        *pos += 8;
        return Ok(Element { data_type: first & 0xffff, data: &tag[4..4 + small_len] });
    }

    let len = LittleEndian::read_u32(&tag[4..]) as usize;
    let start = *pos + 8;
    let data = bytes.get(start..start + len).ok_or_else(truncated)?;
    // Compressed elements carry no padding.
    *pos = if first == MI_COMPRESSED { start + len } else { start + padded(len) };
    Ok(Element { data_type: first, data })
}

fn expect_element<'a>(
    bytes: &'a [u8],
    pos: &mut usize,
    what: &str,
    accepted: &[u32],
) -> Result<Element<'a>, PersistenceError> {
    let element = next_element(bytes, pos)?;
    if !accepted.contains(&element.data_type) {
        return Err(PersistenceError::Format(format!(
            "{what} has element type {}",
            element.data_type
        )));
    }
    Ok(element)
}

enum Parsed {
    Value(Field),
    Struct(DataSheet),
}

fn parse_matrix(data: &[u8]) -> Result<(String, Parsed), PersistenceError> {
    let mut pos = 0;
    let flags = expect_element(data, &mut pos, "array flags", &[MI_UINT32])?;
    let (class, complex) = match flags.data {
        [class, bits, ..] => (*class, bits & COMPLEX_FLAG != 0),
        _ => return Err(truncated()),
    };
    let dims: Vec<usize> = expect_element(data, &mut pos, "dimensions", &[MI_INT32])?
        .data
        .chunks_exact(4)
        .map(|c| LittleEndian::read_i32(c).max(0) as usize)
        .collect();
    let name = expect_element(data, &mut pos, "array name", &[MI_INT8])?;
    let name = String::from_utf8_lossy(name.data).into_owned();
    let count = dims
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .ok_or_else(|| PersistenceError::Format(format!("'{name}' has oversized dimensions {dims:?}")))?;

    let parsed = match class {
        MX_DOUBLE | MX_SINGLE..=MX_UINT64 => {
            if complex {
                return Err(PersistenceError::Format(format!("'{name}' is complex")));
            }
            let values = numbers(&next_element(data, &mut pos)?)?;
            let array = ArrayD::from_shape_vec(IxDyn(&dims).f(), values)
                .map_err(|e| PersistenceError::Format(format!("'{name}': {e}")))?;
            Parsed::Value(Field::Array(array))
        }
        MX_CHAR => {
            let element = expect_element(
                data,
                &mut pos,
                "character data",
                &[MI_UINT16, MI_UTF16, MI_UINT8, MI_INT8, MI_UTF8],
            )?;
            Parsed::Value(char_rows(&element, &dims))
        }
        MX_CELL => {
            // Every cell needs at least an 8-byte tag.
            if count > data.len().saturating_sub(pos) / 8 {
                return Err(PersistenceError::Format(format!("cell '{name}' claims {count} entries")));
            }
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                let cell = expect_element(data, &mut pos, "cell", &[MI_MATRIX])?;
                match parse_matrix(cell.data)?.1 {
                    Parsed::Value(Field::Text(text)) => items.push(text),
                    _ => return Err(PersistenceError::Format(format!("cell '{name}' holds non-text data"))),
                }
            }
            Parsed::Value(Field::TextList(items))
        }
        MX_STRUCT => {
            if count != 1 {
                return Err(PersistenceError::Format(format!("struct array '{name}' is not 1x1")));
            }
            let name_len = expect_element(data, &mut pos, "field name length", &[MI_INT32])?;
            let name_len = match name_len.data {
                [a, b, c, d, ..] => i32::from_le_bytes([*a, *b, *c, *d]).max(1) as usize,
                _ => return Err(truncated()),
            };
            let names = expect_element(data, &mut pos, "field names", &[MI_INT8])?;
            let mut sheet = DataSheet::new();
            for raw in names.data.chunks_exact(name_len) {
                let key = String::from_utf8_lossy(raw).trim_end_matches('\0').to_string();
                let field = expect_element(data, &mut pos, "struct field", &[MI_MATRIX])?;
                match parse_matrix(field.data)?.1 {
                    Parsed::Value(value) => sheet.insert(key, value),
                    Parsed::Struct(_) => {
                        return Err(PersistenceError::Format(format!("nested struct '{name}.{key}'")))
                    }
                }
            }
            Parsed::Struct(sheet)
        }
        other => return Err(PersistenceError::Format(format!("'{name}' has unsupported class {other}"))),
    };
    Ok((name, parsed))
}

fn numbers(element: &Element<'_>) -> Result<Vec<f64>, PersistenceError> {
    let d = element.data;
    let values = match element.data_type {
        MI_DOUBLE => d.chunks_exact(8).map(LittleEndian::read_f64).collect(),
        MI_SINGLE => d.chunks_exact(4).map(|c| LittleEndian::read_f32(c) as f64).collect(),
        MI_INT8 => d.iter().map(|&b| b as i8 as f64).collect(),
        MI_UINT8 => d.iter().map(|&b| b as f64).collect(),
        MI_INT16 => d.chunks_exact(2).map(|c| LittleEndian::read_i16(c) as f64).collect(),
        MI_UINT16 => d.chunks_exact(2).map(|c| LittleEndian::read_u16(c) as f64).collect(),
        MI_INT32 => d.chunks_exact(4).map(|c| LittleEndian::read_i32(c) as f64).collect(),
        MI_UINT32 => d.chunks_exact(4).map(|c| LittleEndian::read_u32(c) as f64).collect(),
        MI_INT64 => d.chunks_exact(8).map(|c| LittleEndian::read_i64(c) as f64).collect(),
        MI_UINT64 => d.chunks_exact(8).map(|c| LittleEndian::read_u64(c) as f64).collect(),
        other => return Err(PersistenceError::Format(format!("unsupported numeric element type {other}"))),
    };
    Ok(values)
}

/// Split column-major character data into trimmed rows.
fn char_rows(element: &Element<'_>, dims: &[usize]) -> Field {
    if element.data_type == MI_UTF8 {
        return Field::Text(String::from_utf8_lossy(element.data).trim_end().to_string());
    }
    let units: Vec<u16> = match element.data_type {
        MI_UINT16 | MI_UTF16 => element.data.chunks_exact(2).map(LittleEndian::read_u16).collect(),
        _ => element.data.iter().map(|&b| b as u16).collect(),
    };
    let rows = dims.first().copied().unwrap_or(0).min(units.len());
    if rows == 0 || units.is_empty() {
        return Field::Text(String::new());
    }
    let cols = units.len() / rows;
    let mut lines: Vec<String> = (0..rows)
        .map(|i| {
            let row: Vec<u16> = (0..cols).map(|j| units[j * rows + i]).collect();
            String::from_utf16_lossy(&row).trim_end().to_string()
        })
        .collect();
    if rows == 1 {
        Field::Text(lines.remove(0))
    } else {
        Field::TextList(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sheet() -> DataSheet {
        let mut sheet = DataSheet::new();
        sheet.insert("shape_type", Field::Text("hollow_square".into()));
        sheet.insert(
            "Dimension_name",
            Field::TextList(vec!["Wavelength (nm)".into(), "P (nm)".into(), "H (nm)".into()]),
        );
        sheet.insert(
            "Wavelength",
            Field::Array(ArrayD::from_shape_vec(IxDyn(&[3]), vec![900.0, 950.0, 1000.0]).unwrap()),
        );
        sheet.insert(
            "tensor",
            Field::Array(ArrayD::from_shape_fn(IxDyn(&[2, 3, 4]), |ix| {
                (ix[0] * 100 + ix[1] * 10 + ix[2]) as f64 + 0.1
            })),
        );
        sheet
    }

    fn round_trip(options: MatOptions) -> DataSheet {
        let mut bytes = Vec::new();
        write_mat(&mut bytes, &sheet(), options).unwrap();
        read_mat(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn test_header() {
        let mut bytes = Vec::new();
        write_mat(&mut bytes, &sheet(), MatOptions::default()).unwrap();
        assert!(bytes.starts_with(b"MATLAB 5.0 MAT-file"));
        assert_eq!(&bytes[124..128], &[0x00, 0x01, b'I', b'M']);
        assert_eq!(bytes.len() % 8, 0);
    }

    #[test]
    fn test_round_trip_uncompressed() {
        let restored = round_trip(MatOptions { compress: false });
        let original = sheet();
        assert_eq!(restored.keys().collect::<Vec<_>>(), original.keys().collect::<Vec<_>>());
        assert_eq!(restored.text("shape_type").unwrap(), "hollow_square");
        assert_eq!(
            restored.text_list("Dimension_name").unwrap(),
            original.text_list("Dimension_name").unwrap()
        );
        assert_eq!(restored.array("Wavelength").unwrap().shape(), &[1, 3]);
        assert_eq!(restored.vector("Wavelength").unwrap(), vec![900.0, 950.0, 1000.0]);
        assert_eq!(restored.array("tensor").unwrap(), original.array("tensor").unwrap());
    }

    #[test]
    fn test_round_trip_compressed() {
        let restored = round_trip(MatOptions { compress: true });
        assert_eq!(restored.array("tensor").unwrap(), sheet().array("tensor").unwrap());
        assert_eq!(restored.text("shape_type").unwrap(), "hollow_square");
    }

    #[test]
    fn test_top_level_variables_are_read() {
        let mut bytes = file_header().to_vec();
        let mut body = Vec::new();
        let mut data = Vec::new();
        for v in [1.5f64, 2.5] {
            data.write_f64::<LittleEndian>(v).unwrap();
        }
        write_element(&mut body, MI_DOUBLE, &data).unwrap();
        bytes.extend_from_slice(&matrix(MX_DOUBLE, &[2, 1], "Period", &body).unwrap());

        let sheet = read_mat(Cursor::new(bytes)).unwrap();
        assert_eq!(sheet.vector("Period").unwrap(), vec![1.5, 2.5]);
    }

    #[test]
    fn test_big_endian_rejected() {
        let mut bytes = file_header().to_vec();
        bytes[126..].copy_from_slice(b"MI");
        assert!(matches!(read_mat(Cursor::new(bytes)), Err(PersistenceError::Format(_))));
    }

    #[test]
    fn test_truncated_file_rejected() {
        let mut bytes = Vec::new();
        write_mat(&mut bytes, &sheet(), MatOptions::default()).unwrap();
        bytes.truncate(bytes.len() - 16);
        assert!(read_mat(Cursor::new(bytes)).is_err());
    }
}
