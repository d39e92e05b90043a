//! Trajectory array loading.
//!
//! Two on-disk formats are understood, chosen by file extension:
//! - `.npy`: NumPy array of shape `(frames, markers, 3)`, `f8` or `f4` in
//!   either byte order, C order (format versions 1–3),
//! - `.json`: nested `[[[x, y, z], ...], ...]` with `null` for missing values.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use mocap_align_core::{TrajectoryArray, TrajectoryError};

const NPY_MAGIC: &[u8] = b"\x93NUMPY";

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: unsupported file extension (expected .npy or .json)")]
    UnsupportedFormat { path: PathBuf },
    #[error("{path}: invalid npy file: {reason}")]
    Npy { path: PathBuf, reason: String },
    #[error("{path}: invalid json trajectory: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path}: {source}")]
    Shape {
        path: PathBuf,
        #[source]
        source: TrajectoryError,
    },
}

/// Load a `frames × markers × 3` trajectory from `.npy` or `.json`.
pub fn load_trajectory(path: impl AsRef<Path>) -> Result<TrajectoryArray, LoadError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let arr = match ext.as_deref() {
        Some("npy") => parse_npy(&bytes).map_err(|reason| LoadError::Npy {
            path: path.to_path_buf(),
            reason,
        })?,
        Some("json") => parse_json(&bytes).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })?,
        _ => {
            return Err(LoadError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };
    arr.map_err(|source| LoadError::Shape {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_json(bytes: &[u8]) -> Result<Result<TrajectoryArray, TrajectoryError>, serde_json::Error> {
    let raw: Vec<Vec<[Option<f64>; 3]>> = serde_json::from_slice(bytes)?;
    let rows: Vec<Vec<[f64; 3]>> = raw
        .into_iter()
        .map(|frame| {
            frame
                .into_iter()
                .map(|p| p.map(|v| v.unwrap_or(f64::NAN)))
                .collect()
        })
        .collect();
    Ok(TrajectoryArray::from_frames(&rows))
}

#[derive(Debug, PartialEq)]
struct NpyHeader {
    descr: String,
    fortran_order: bool,
    shape: Vec<usize>,
}

fn header_value<'a>(header: &'a str, key: &str) -> Result<&'a str, String> {
    let needle = format!("'{key}':");
    let start = header
        .find(&needle)
        .ok_or_else(|| format!("header is missing `{key}`"))?
        + needle.len();
    Ok(header[start..].trim_start())
}

fn parse_header(header: &str) -> Result<NpyHeader, String> {
    let descr_raw = header_value(header, "descr")?;
    let descr = descr_raw
        .strip_prefix('\'')
        .and_then(|s| s.split('\'').next())
        .ok_or("malformed `descr`")?
        .to_owned();

    let fortran_order = header_value(header, "fortran_order")?.starts_with("True");

    let shape_raw = header_value(header, "shape")?;
    let inner = shape_raw
        .strip_prefix('(')
        .and_then(|s| s.split(')').next())
        .ok_or("malformed `shape`")?;
    let shape = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map_err(|e| format!("bad shape entry `{s}`: {e}")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NpyHeader {
        descr,
        fortran_order,
        shape,
    })
}

fn parse_npy(bytes: &[u8]) -> Result<Result<TrajectoryArray, TrajectoryError>, String> {
    if bytes.len() < 10 || !bytes.starts_with(NPY_MAGIC) {
        return Err("missing NUMPY magic".into());
    }
    let major = bytes[6];
    let (header_len, header_start) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            let raw: [u8; 4] = bytes
                .get(8..12)
                .and_then(|s| s.try_into().ok())
                .ok_or("truncated header length")?;
            (u32::from_le_bytes(raw) as usize, 12)
        }
        v => return Err(format!("unsupported format version {v}")),
    };
    let header_bytes = bytes
        .get(header_start..header_start + header_len)
        .ok_or("truncated header")?;
    let header = std::str::from_utf8(header_bytes).map_err(|e| e.to_string())?;
    let header = parse_header(header)?;

    if header.fortran_order {
        return Err("fortran-ordered arrays are not supported".into());
    }
    let &[frames, markers, 3] = header.shape.as_slice() else {
        return Err(format!(
            "expected shape (frames, markers, 3), got {:?}",
            header.shape
        ));
    };

    let payload = &bytes[header_start + header_len..];
    let count = frames
        .checked_mul(markers)
        .and_then(|n| n.checked_mul(3))
        .ok_or_else(|| format!("shape {:?} is too large", header.shape))?;
    let data: Vec<f64> = match header.descr.as_str() {
        "<f8" => read_values::<8>(payload, count, f64::from_le_bytes)?,
        ">f8" => read_values::<8>(payload, count, f64::from_be_bytes)?,
        "=f8" => read_values::<8>(payload, count, f64::from_ne_bytes)?,
        "<f4" => read_values::<4>(payload, count, |b| f64::from(f32::from_le_bytes(b)))?,
        ">f4" => read_values::<4>(payload, count, |b| f64::from(f32::from_be_bytes(b)))?,
        "=f4" => read_values::<4>(payload, count, |b| f64::from(f32::from_ne_bytes(b)))?,
        other => return Err(format!("unsupported dtype `{other}`")),
    };
    Ok(TrajectoryArray::from_flat(frames, markers, &data))
}

fn read_values<const N: usize>(
    payload: &[u8],
    count: usize,
    decode: impl Fn([u8; N]) -> f64,
) -> Result<Vec<f64>, String> {
    let needed = count
        .checked_mul(N)
        .ok_or_else(|| format!("{count} values of {N} bytes overflow"))?;
    if payload.len() < needed {
        return Err(format!(
            "payload has {} bytes, expected {needed}",
            payload.len()
        ));
    }
    Ok(payload[..needed]
        .chunks_exact(N)
        .map(|chunk| {
            let mut raw = [0u8; N];
            raw.copy_from_slice(chunk);
            decode(raw)
        })
        .collect())
}

/// Write `array` as a version 1.0 `.npy` file (`<f8`, C order).
pub fn save_npy(path: impl AsRef<Path>, array: &TrajectoryArray) -> Result<(), LoadError> {
    let path = path.as_ref();
    let (frames, markers) = array.shape();
    let mut header = format!(
        "{{'descr': '<f8', 'fortran_order': False, 'shape': ({frames}, {markers}, 3), }}"
    );
    // Magic (6) + version (2) + length (2) + header + '\n' is padded to 64 bytes.
    let unpadded = 10 + header.len() + 1;
    header.push_str(&" ".repeat((64 - unpadded % 64) % 64));
    header.push('\n');

    let mut out = Vec::with_capacity(10 + header.len() + array.points().len() * 24);
    out.extend_from_slice(NPY_MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for p in array.points() {
        for v in [p.x, p.y, p.z] {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }

    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = fs::File::create(path).map_err(io_err)?;
    file.write_all(&out).map_err(io_err)?;
    Ok(())
}
