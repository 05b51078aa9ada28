use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, warn};

use crate::{EditorError, Result};

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// How strictly the loader treats the on-disk container.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum LoadMode {
    /// The file must be a gzip stream.
    GzipOnly,
    /// Fall back to the raw file bytes when gzip decoding fails.
    #[default]
    GzipOrRaw,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ContainerEncoding {
    Gzip,
    Raw,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum OutputEncoding {
    /// Write the decompressed payload as-is.
    #[default]
    Raw,
    Gzip,
}

/// Decompressed map payload plus the encoding it was found in.
#[derive(Clone, Debug)]
pub struct MapBuffer {
    pub bytes: Vec<u8>,
    pub encoding: ContainerEncoding,
}

pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

fn gunzip(raw: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(raw);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Reads a map container and returns its decompressed payload.
///
/// The source file is only ever read. A file that cannot be opened is an
/// `Io` error; a payload that is not valid gzip is a `Decompress` error
/// unless `mode` allows the raw fallback.
pub fn load_map<P: AsRef<Path>>(path: P, mode: LoadMode) -> Result<MapBuffer> {
    let path = path.as_ref();
    let raw = fs::read(path)?;

    match gunzip(&raw) {
        Ok(bytes) => {
            debug!(
                path = %path.display(),
                compressed = raw.len(),
                decompressed = bytes.len(),
                "loaded gzip map container"
            );
            Ok(MapBuffer {
                bytes,
                encoding: ContainerEncoding::Gzip,
            })
        }
        Err(err) => match mode {
            LoadMode::GzipOnly => Err(EditorError::Decompress(format!(
                "{}: {err}",
                path.display()
            ))),
            LoadMode::GzipOrRaw => {
                warn!(
                    path = %path.display(),
                    gzip_magic = is_gzip(&raw),
                    "gzip decode failed ({err}), reading container as raw bytes"
                );
                Ok(MapBuffer {
                    bytes: raw,
                    encoding: ContainerEncoding::Raw,
                })
            }
        },
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Writes `bytes` to `output`. Refuses to overwrite `input`.
pub fn save_map(
    input: &Path,
    output: &Path,
    bytes: &[u8],
    encoding: OutputEncoding,
) -> Result<()> {
    if same_file(input, output) {
        return Err(EditorError::Config(format!(
            "output path {} is the input map; choose a different file",
            output.display()
        )));
    }

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    match encoding {
        OutputEncoding::Raw => fs::write(output, bytes)?,
        OutputEncoding::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(bytes)?;
            fs::write(output, encoder.finish()?)?;
        }
    }

    debug!(path = %output.display(), len = bytes.len(), ?encoding, "wrote map container");
    Ok(())
}

/// Formats the first `count` bytes as rows of ten `offset: hex` cells.
pub fn hex_preview(bytes: &[u8], count: usize) -> String {
    let mut out = String::new();
    for (i, b) in bytes.iter().take(count).enumerate() {
        out.push_str(&format!("{i}: {b:02x}"));
        if (i + 1) % 10 == 0 {
            out.push('\n');
        } else {
            out.push(' ');
        }
    }
    if !out.ends_with('\n') && !out.is_empty() {
        out.pop();
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn loads_gzip_payload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("map.h3m");
        fs::write(&path, gzip(b"payload")).unwrap();

        let map = load_map(&path, LoadMode::GzipOnly).unwrap();
        assert_eq!(map.bytes, b"payload");
        assert_eq!(map.encoding, ContainerEncoding::Gzip);
    }

    #[test]
    fn raw_fallback_returns_file_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("map.h3m");
        fs::write(&path, [0x0E, 0x00, 0x00, 0x00, 0x36]).unwrap();

        let map = load_map(&path, LoadMode::GzipOrRaw).unwrap();
        assert_eq!(map.bytes, vec![0x0E, 0x00, 0x00, 0x00, 0x36]);
        assert_eq!(map.encoding, ContainerEncoding::Raw);
    }

    #[test]
    fn gzip_only_reports_decompress_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("map.h3m");
        fs::write(&path, b"not gzip at all").unwrap();

        assert!(matches!(
            load_map(&path, LoadMode::GzipOnly),
            Err(EditorError::Decompress(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = load_map(dir.path().join("absent.h3m"), LoadMode::GzipOrRaw).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn save_refuses_to_overwrite_input() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("map.h3m");
        fs::write(&path, b"abc").unwrap();

        let err = save_map(&path, &path, b"xyz", OutputEncoding::Raw).unwrap_err();
        assert!(matches!(err, EditorError::Config(_)));
        assert_eq!(fs::read(&path).unwrap(), b"abc");
    }

    #[test]
    fn gzip_output_decodes_back() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.h3m");
        let output = dir.path().join("out/edited.h3m");

        save_map(&input, &output, b"monsters", OutputEncoding::Gzip).unwrap();
        let map = load_map(&output, LoadMode::GzipOnly).unwrap();
        assert_eq!(map.bytes, b"monsters");
    }

    #[test]
    fn hex_preview_wraps_every_ten_bytes() {
        let bytes: Vec<u8> = (0..12).collect();
        let preview = hex_preview(&bytes, 100);
        let lines: Vec<&str> = preview.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0: 00 1: 01"));
        assert_eq!(lines[1], "10: 0a 11: 0b");
        assert_eq!(hex_preview(&bytes, 0), "");
    }
}
