//! `.npy` blob codec.
//!
//! Array and complex cells are stored as the bytes of a `.npy` file. Only
//! plain (non-structured) dtypes are understood.

use mcat_core::ndarray::{ArrayD, IxDyn, ShapeBuilder};
use mcat_core::{Complex, NdArray};

const MAGIC: &[u8] = b"\x93NUMPY";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct NpyError(pub String);

fn err(msg: impl Into<String>) -> NpyError {
    NpyError(msg.into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Float,
    Int,
    UInt,
    Bool,
    Complex,
    Unicode,
}

#[derive(Debug, Clone, Copy)]
struct Dtype {
    order: ByteOrder,
    kind: Kind,
    /// Bytes per element.
    item_size: usize,
}

#[derive(Debug)]
struct Header {
    dtype: Dtype,
    fortran_order: bool,
    shape: Vec<usize>,
}

/// Decode a `.npy` byte string into a row-major array.
pub fn decode(bytes: &[u8]) -> Result<NdArray, NpyError> {
    if bytes.len() < 10 || &bytes[..6] != MAGIC {
        return Err(err("missing .npy magic"));
    }
    let major = bytes[6];
    let (header_len, header_start) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(err("truncated .npy preamble"));
            }
            let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
            (len, 12)
        }
        v => return Err(err(format!("unsupported .npy version {v}"))),
    };
    let data_start = header_start + header_len;
    if bytes.len() < data_start {
        return Err(err("truncated .npy header"));
    }
    let header_text = std::str::from_utf8(&bytes[header_start..data_start])
        .map_err(|_| err("header is not valid text"))?;
    let header = parse_header(header_text)?;

    let count = header
        .shape
        .iter()
        .try_fold(1_usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| err("array size overflows"))?;
    let needed = count
        .checked_mul(header.dtype.item_size)
        .ok_or_else(|| err("array size overflows"))?;
    let payload = &bytes[data_start..];
    if payload.len() < needed {
        return Err(err(format!(
            "expected {} data bytes, found {}",
            needed,
            payload.len()
        )));
    }

    decode_elements(&payload[..needed], &header)
}

/// Encode an array as a version 1.0 `.npy` byte string (`<f8`, `<c16` or `<U<n>`).
pub fn encode(array: &NdArray) -> Vec<u8> {
    let (descr, body) = match array {
        NdArray::Float(values) => {
            let mut body = Vec::with_capacity(values.len() * 8);
            for v in values.iter() {
                body.extend_from_slice(&v.to_le_bytes());
            }
            ("<f8".to_string(), body)
        }
        NdArray::Complex(values) => {
            let mut body = Vec::with_capacity(values.len() * 16);
            for c in values.iter() {
                body.extend_from_slice(&c.re.to_le_bytes());
                body.extend_from_slice(&c.im.to_le_bytes());
            }
            ("<c16".to_string(), body)
        }
        NdArray::Text(values) => {
            let width = values
                .iter()
                .map(|s| s.chars().count())
                .max()
                .unwrap_or(0)
                .max(1);
            let mut body = Vec::with_capacity(values.len() * width * 4);
            for s in values.iter() {
                let mut n = 0;
                for ch in s.chars() {
                    body.extend_from_slice(&(ch as u32).to_le_bytes());
                    n += 1;
                }
                for _ in n..width {
                    body.extend_from_slice(&0_u32.to_le_bytes());
                }
            }
            (format!("<U{width}"), body)
        }
    };

    let shape = match array.shape() {
        [] => "()".to_string(),
        [n] => format!("({n},)"),
        dims => format!(
            "({})",
            dims.iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };
    let mut header = format!("{{'descr': '{descr}', 'fortran_order': False, 'shape': {shape}, }}");
    // preamble (10 bytes) + header + newline is padded to a multiple of 64
    let unpadded = 10 + header.len() + 1;
    let padding = (64 - unpadded % 64) % 64;
    header.push_str(&" ".repeat(padding));
    header.push('\n');

    let mut out = Vec::with_capacity(10 + header.len() + body.len());
    out.extend_from_slice(MAGIC);
    out.push(1);
    out.push(0);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(&body);
    out
}

fn parse_header(text: &str) -> Result<Header, NpyError> {
    let descr = quoted_value(text, "descr")?;
    let dtype = parse_descr(&descr)?;

    let fortran = raw_value(text, "fortran_order")?;
    let fortran_order = if fortran.starts_with("True") {
        true
    } else if fortran.starts_with("False") {
        false
    } else {
        return Err(err("unreadable fortran_order"));
    };

    let shape_text = raw_value(text, "shape")?;
    let shape = parse_shape(shape_text)?;

    Ok(Header {
        dtype,
        fortran_order,
        shape,
    })
}

/// Text following `'key':`, with leading whitespace trimmed.
fn raw_value<'a>(text: &'a str, key: &str) -> Result<&'a str, NpyError> {
    let pattern = format!("'{key}'");
    let at = text
        .find(&pattern)
        .ok_or_else(|| err(format!("header has no `{key}`")))?;
    let rest = &text[at + pattern.len()..];
    let rest = rest.trim_start();
    let rest = rest
        .strip_prefix(':')
        .ok_or_else(|| err(format!("malformed `{key}` entry")))?;
    Ok(rest.trim_start())
}

fn quoted_value(text: &str, key: &str) -> Result<String, NpyError> {
    let rest = raw_value(text, key)?;
    let quote = rest
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or_else(|| err(format!("`{key}` is not a plain dtype string")))?;
    let body = &rest[1..];
    let end = body
        .find(quote)
        .ok_or_else(|| err(format!("unterminated `{key}` string")))?;
    Ok(body[..end].to_string())
}

fn parse_shape(text: &str) -> Result<Vec<usize>, NpyError> {
    let body = text
        .strip_prefix('(')
        .ok_or_else(|| err("shape is not a tuple"))?;
    let end = body.find(')').ok_or_else(|| err("unterminated shape"))?;
    body[..end]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim_end_matches('L')
                .parse::<usize>()
                .map_err(|_| err(format!("bad shape entry `{s}`")))
        })
        .collect()
}

fn parse_descr(descr: &str) -> Result<Dtype, NpyError> {
    let mut chars = descr.chars();
    let first = chars.next().ok_or_else(|| err("empty dtype"))?;
    let (order, rest) = match first {
        '<' | '|' | '=' => (ByteOrder::Little, &descr[1..]),
        '>' => (ByteOrder::Big, &descr[1..]),
        _ => (ByteOrder::Little, descr),
    };
    let mut rest_chars = rest.chars();
    let kind_char = rest_chars.next().ok_or_else(|| err("dtype has no kind"))?;
    let size: usize = rest[kind_char.len_utf8()..]
        .parse()
        .map_err(|_| err(format!("unsupported dtype `{descr}`")))?;
    let (kind, item_size) = match (kind_char, size) {
        ('f', 4 | 8) => (Kind::Float, size),
        ('i', 1 | 2 | 4 | 8) => (Kind::Int, size),
        ('u', 1 | 2 | 4 | 8) => (Kind::UInt, size),
        ('b', 1) => (Kind::Bool, 1),
        ('c', 8 | 16) => (Kind::Complex, size),
        ('U', n) if n > 0 => (Kind::Unicode, n * 4),
        _ => return Err(err(format!("unsupported dtype `{descr}`"))),
    };
    Ok(Dtype {
        order,
        kind,
        item_size,
    })
}

fn word<const N: usize>(chunk: &[u8], order: ByteOrder) -> [u8; N] {
    let mut buf = [0_u8; N];
    buf.copy_from_slice(&chunk[..N]);
    if order == ByteOrder::Big {
        buf.reverse();
    }
    buf
}

fn read_float(chunk: &[u8], size: usize, order: ByteOrder) -> f64 {
    match size {
        4 => f32::from_le_bytes(word::<4>(chunk, order)) as f64,
        _ => f64::from_le_bytes(word::<8>(chunk, order)),
    }
}

fn read_int(chunk: &[u8], size: usize, order: ByteOrder, signed: bool) -> f64 {
    match (size, signed) {
        (1, true) => chunk[0] as i8 as f64,
        (1, false) => chunk[0] as f64,
        (2, true) => i16::from_le_bytes(word::<2>(chunk, order)) as f64,
        (2, false) => u16::from_le_bytes(word::<2>(chunk, order)) as f64,
        (4, true) => i32::from_le_bytes(word::<4>(chunk, order)) as f64,
        (4, false) => u32::from_le_bytes(word::<4>(chunk, order)) as f64,
        (_, true) => i64::from_le_bytes(word::<8>(chunk, order)) as f64,
        (_, false) => u64::from_le_bytes(word::<8>(chunk, order)) as f64,
    }
}

/// Lay decoded elements out in the header's shape and memory order.
fn shaped<T>(values: Vec<T>, header: &Header) -> Result<ArrayD<T>, NpyError> {
    let dim = IxDyn(&header.shape);
    let array = if header.fortran_order {
        ArrayD::from_shape_vec(dim.f(), values)
    } else {
        ArrayD::from_shape_vec(dim, values)
    };
    array.map_err(|e| err(format!("shape {:?}: {e}", header.shape)))
}

fn decode_elements(payload: &[u8], header: &Header) -> Result<NdArray, NpyError> {
    let dtype = header.dtype;
    let chunks = payload.chunks_exact(dtype.item_size);
    let array = match dtype.kind {
        Kind::Float => NdArray::Float(shaped(
            chunks
                .map(|c| read_float(c, dtype.item_size, dtype.order))
                .collect(),
            header,
        )?),
        Kind::Int | Kind::UInt => {
            let signed = dtype.kind == Kind::Int;
            NdArray::Float(shaped(
                chunks
                    .map(|c| read_int(c, dtype.item_size, dtype.order, signed))
                    .collect(),
                header,
            )?)
        }
        Kind::Bool => NdArray::Float(shaped(
            chunks
                .map(|c| if c[0] != 0 { 1.0 } else { 0.0 })
                .collect(),
            header,
        )?),
        Kind::Complex => {
            let half = dtype.item_size / 2;
            NdArray::Complex(shaped(
                chunks
                    .map(|c| {
                        Complex::new(
                            read_float(&c[..half], half, dtype.order),
                            read_float(&c[half..], half, dtype.order),
                        )
                    })
                    .collect(),
                header,
            )?)
        }
        Kind::Unicode => {
            let mut out = Vec::with_capacity(payload.len() / dtype.item_size);
            for c in chunks {
                let mut s = String::new();
                for cp in c.chunks_exact(4) {
                    let code = u32::from_le_bytes(word::<4>(cp, dtype.order));
                    if code == 0 {
                        break;
                    }
                    let ch = char::from_u32(code)
                        .ok_or_else(|| err(format!("invalid code point {code:#x}")))?;
                    s.push(ch);
                }
                out.push(s);
            }
            NdArray::Text(shaped(out, header)?)
        }
    };
    Ok(array)
}
