//! NumPy `.npz` archives.
//!
//! Each [`DataSheet`] field becomes a `<key>.npy` member written in `.npy`
//! format version 1.0:
//!
//! ```text
//! \x93NUMPY | 1 | 0 | header_len: u16 LE | "{'descr': ..., 'fortran_order': False, 'shape': (...), }" | data
//! ```
//!
//! The header is space-padded so the data starts on a 64-byte boundary.
//! Arrays are stored as little-endian `<f8` in C order; text as
//! fixed-width UTF-32 `<U{n}` (a 0-d array for a single string, 1-d for a
//! list). The reader also accepts Fortran-ordered arrays and format
//! versions 2.0 and 3.0.

use std::io::{Cursor, Read, Seek, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use ndarray::{ArrayD, IxDyn, ShapeBuilder};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::datasheet::{DataSheet, Field};
use super::PersistenceError;

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const ALIGNMENT: usize = 64;

/// Write `sheet` as a deflate-compressed `.npz` archive.
pub fn write_npz<W: Write + Seek>(writer: W, sheet: &DataSheet) -> Result<W, PersistenceError> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (key, field) in sheet.iter() {
        zip.start_file(format!("{key}.npy"), options)?;
        zip.write_all(&encode_npy(field)?)?;
    }
    Ok(zip.finish()?)
}

/// Read every `.npy` member of an archive, in archive order. Other members
/// are ignored.
pub fn read_npz<R: Read + Seek>(reader: R) -> Result<DataSheet, PersistenceError> {
    let mut archive = ZipArchive::new(reader)?;
    let mut sheet = DataSheet::new();
    for i in 0..archive.len() {
        let mut member = archive.by_index(i)?;
        let Some(key) = member.name().strip_suffix(".npy").map(str::to_string) else {
            continue;
        };
        let mut bytes = Vec::new();
        member.read_to_end(&mut bytes)?;
        let field = decode_npy(&bytes).map_err(|e| match e {
            PersistenceError::Format(msg) => PersistenceError::Format(format!("{key}.npy: {msg}")),
            other => other,
        })?;
        sheet.insert(key, field);
    }
    Ok(sheet)
}

/// Encode one field as a complete `.npy` file.
pub fn encode_npy(field: &Field) -> Result<Vec<u8>, PersistenceError> {
    let mut out = Vec::new();
    match field {
        Field::Array(array) => {
            write_header(&mut out, "<f8", array.shape())?;
            for &value in array.iter() {
                out.write_f64::<LittleEndian>(value)?;
            }
        }
        Field::Text(text) => {
            let width = text.chars().count().max(1);
            write_header(&mut out, &format!("<U{width}"), &[])?;
            write_utf32(&mut out, text, width)?;
        }
        Field::TextList(items) => {
            let width = items.iter().map(|s| s.chars().count()).max().unwrap_or(0).max(1);
            write_header(&mut out, &format!("<U{width}"), &[items.len()])?;
            for item in items {
                write_utf32(&mut out, item, width)?;
            }
        }
    }
    Ok(out)
}

/// Decode a complete `.npy` file.
pub fn decode_npy(bytes: &[u8]) -> Result<Field, PersistenceError> {
    let mut cursor = Cursor::new(bytes);
    let mut magic = [0u8; 6];
    cursor.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(PersistenceError::Format("not a .npy file".into()));
    }
    let major = cursor.read_u8()?;
    let _minor = cursor.read_u8()?;
    let header_len = match major {
        1 => cursor.read_u16::<LittleEndian>()? as usize,
        2 | 3 => cursor.read_u32::<LittleEndian>()? as usize,
        v => return Err(PersistenceError::Format(format!("unsupported .npy version {v}"))),
    };
    ensure_remaining(&cursor, Some(header_len), "header")?;
    let mut header = vec![0u8; header_len];
    cursor.read_exact(&mut header)?;
    let header = String::from_utf8_lossy(&header);
    let header = Header::parse(&header)?;
    let count = header
        .shape
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .ok_or_else(|| PersistenceError::Format(format!("shape {:?} is too large", header.shape)))?;

    match header.descr.as_str() {
        "<f8" => {
            ensure_remaining(&cursor, count.checked_mul(8), "array data")?;
            let mut data = vec![0.0; count];
            cursor.read_f64_into::<LittleEndian>(&mut data)?;
            let shape = IxDyn(&header.shape);
            let array = if header.fortran_order {
                ArrayD::from_shape_vec(shape.f(), data)
            } else {
                ArrayD::from_shape_vec(shape, data)
            }
            .map_err(|e| PersistenceError::Format(e.to_string()))?;
            Ok(Field::Array(array))
        }
        descr => {
            let width: usize = descr
                .strip_prefix("<U")
                .and_then(|w| w.parse().ok())
                .ok_or_else(|| PersistenceError::Format(format!("unsupported dtype '{descr}'")))?;
            let needed = count.checked_mul(width).and_then(|n| n.checked_mul(4));
            ensure_remaining(&cursor, needed, "text data")?;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(read_utf32(&mut cursor, width)?);
            }
            if header.shape.is_empty() {
                Ok(Field::Text(items.pop().unwrap_or_default()))
            } else {
                Ok(Field::TextList(items))
            }
        }
    }
}

/// Fail unless `needed` bytes are left after the cursor. `None` stands for
/// a size that overflowed.
fn ensure_remaining(cursor: &Cursor<&[u8]>, needed: Option<usize>, what: &str) -> Result<(), PersistenceError> {
    let left = cursor.get_ref().len().saturating_sub(cursor.position() as usize);
    match needed {
        Some(n) if n <= left => Ok(()),
        _ => Err(PersistenceError::Format(format!("{what} runs past the end of the file"))),
    }
}

fn write_header(out: &mut Vec<u8>, descr: &str, shape: &[usize]) -> Result<(), PersistenceError> {
    let shape = match shape {
        [] => "()".to_string(),
        [n] => format!("({n},)"),
        dims => format!("({})", dims.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")),
    };
    let mut header = format!("{{'descr': '{descr}', 'fortran_order': False, 'shape': {shape}, }}");
    // magic + version + u16 length + header + newline
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');

    let header_len = u16::try_from(header.len())
        .map_err(|_| PersistenceError::Format("array header too long".into()))?;
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.write_u16::<LittleEndian>(header_len)?;
    out.extend_from_slice(header.as_bytes());
    Ok(())
}

fn write_utf32(out: &mut Vec<u8>, text: &str, width: usize) -> Result<(), PersistenceError> {
    let mut written = 0;
    for c in text.chars().take(width) {
        out.write_u32::<LittleEndian>(c as u32)?;
        written += 1;
    }
    for _ in written..width {
        out.write_u32::<LittleEndian>(0)?;
    }
    Ok(())
}

fn read_utf32<R: Read>(reader: &mut R, width: usize) -> Result<String, PersistenceError> {
    let mut text = String::with_capacity(width);
    for _ in 0..width {
        let code = reader.read_u32::<LittleEndian>()?;
        if code == 0 {
            continue;
        }
        let c = char::from_u32(code)
            .ok_or_else(|| PersistenceError::Format(format!("invalid code point {code:#x}")))?;
        text.push(c);
    }
    Ok(text)
}

/// The three entries of a `.npy` header dictionary.
struct Header {
    descr: String,
    fortran_order: bool,
    shape: Vec<usize>,
}

impl Header {
    fn parse(text: &str) -> Result<Self, PersistenceError> {
        let malformed = || PersistenceError::Format(format!("malformed header: {}", text.trim()));

        let descr = value_after(text, "descr")
            .and_then(|v| v.strip_prefix('\''))
            .and_then(|v| v.split('\'').next())
            .ok_or_else(malformed)?
            .to_string();

        let fortran_order = match value_after(text, "fortran_order") {
            Some(v) if v.starts_with("True") => true,
            Some(v) if v.starts_with("False") => false,
            _ => return Err(malformed()),
        };

        let shape = value_after(text, "shape")
            .and_then(|v| v.strip_prefix('('))
            .and_then(|v| v.split(')').next())
            .ok_or_else(malformed)?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_end_matches('L').parse::<usize>().map_err(|_| malformed()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { descr, fortran_order, shape })
    }
}

/// The text following `'key':` in a header, leading spaces removed.
fn value_after<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let pattern = format!("'{key}':");
    let start = text.find(&pattern)? + pattern.len();
    Some(text[start..].trim_start())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_is_aligned() {
        let array = ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let bytes = encode_npy(&Field::Array(array)).unwrap();
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % 64, 0);
        assert_eq!(bytes.len(), 10 + header_len + 6 * 8);
        let header = std::str::from_utf8(&bytes[10..10 + header_len]).unwrap();
        assert!(header.starts_with("{'descr': '<f8', 'fortran_order': False, 'shape': (2, 3), }"));
        assert!(header.ends_with('\n'));
    }

    #[test]
    fn test_text_fields() {
        let list = Field::TextList(vec!["Wavelength (nm)".into(), "R (nm)".into()]);
        assert_eq!(decode_npy(&encode_npy(&list).unwrap()).unwrap(), list);

        let text = Field::Text("hollow_circle".into());
        let bytes = encode_npy(&text).unwrap();
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert!(std::str::from_utf8(&bytes[10..10 + header_len]).unwrap().contains("'<U13'"));
        assert_eq!(decode_npy(&bytes).unwrap(), text);
    }

    #[test]
    fn test_fortran_order_is_honoured() {
        let header = "{'descr': '<f8', 'fortran_order': True, 'shape': (2, 2), }";
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        for v in [1.0f64, 3.0, 2.0, 4.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let Field::Array(array) = decode_npy(&bytes).unwrap() else {
            panic!("expected an array");
        };
        assert_eq!(array[[0, 1]], 2.0);
        assert_eq!(array[[1, 0]], 3.0);
    }

    #[test]
    fn test_unsupported_dtype() {
        let header = "{'descr': '<i4', 'fortran_order': False, 'shape': (1,), }";
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(&7i32.to_le_bytes());
        assert!(matches!(decode_npy(&bytes), Err(PersistenceError::Format(_))));
    }

    #[test]
    fn test_archive_round_trip_is_bit_exact() {
        let mut sheet = DataSheet::new();
        let awkward = vec![0.1, -0.0, f64::MIN_POSITIVE, 1e308, std::f64::consts::PI, f64::NAN];
        sheet.insert("values", Field::Array(ArrayD::from_shape_vec(IxDyn(&[6]), awkward.clone()).unwrap()));
        sheet.insert("name", Field::Text("circle".into()));

        let buffer = write_npz(Cursor::new(Vec::new()), &sheet).unwrap();
        let restored = read_npz(Cursor::new(buffer.into_inner())).unwrap();
        assert_eq!(restored.keys().collect::<Vec<_>>(), ["values", "name"]);
        let Some(Field::Array(values)) = restored.get("values") else {
            panic!("values missing");
        };
        let bits: Vec<u64> = values.iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits, awkward.iter().map(|v| v.to_bits()).collect::<Vec<_>>());
    }
}
