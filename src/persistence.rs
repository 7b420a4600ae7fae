// File: src/persistence.rs
use crate::core::types::Record;
use crate::error::{AnnotatorError, Result};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

/// Paths with this extension are gzipped on disk.
const GZIP_EXTENSION: &str = "gz";

fn is_gzipped(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == GZIP_EXTENSION)
}

/// Reads the records stored at `path`, in file order.
///
/// The file holds one JSON object per record, separated by whitespace. If the
/// path ends in `.gz` it is decompressed first.
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let reader = BufReader::new(File::open(path)?);
    if is_gzipped(path) {
        decode_records(BufReader::new(MultiGzDecoder::new(reader)))
    } else {
        decode_records(reader)
    }
}

/// Decodes a stream of whitespace-delimited JSON records until end of input.
pub fn decode_records<R: Read>(reader: R) -> Result<Vec<Record>> {
    let stream = serde_json::Deserializer::from_reader(reader).into_iter::<Record>();
    let mut records = Vec::new();
    for (entry, decoded) in stream.enumerate() {
        let record = decoded.map_err(|source| {
            if source.is_io() {
                AnnotatorError::Io(source.into())
            } else {
                AnnotatorError::Decode {
                    entry,
                    line: source.line(),
                    column: source.column(),
                    source,
                }
            }
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Writes every record as one JSON object per line.
///
/// JSON has no encoding for NaN or infinity, so a record carrying one fails
/// the encode instead of being written as an unloadable `null`.
pub fn encode_records<W: Write + ?Sized>(out: &mut W, records: &[Record]) -> Result<()> {
    for (index, record) in records.iter().enumerate() {
        if let Some(candidate) = record.candidates.iter().find(|c| !c.distance.is_finite()) {
            return Err(AnnotatorError::NonFiniteDistance {
                index,
                candidate: candidate.id.clone(),
                distance: candidate.distance,
            });
        }
        serde_json::to_writer(&mut *out, record).map_err(|source| {
            if source.is_io() {
                AnnotatorError::Io(source.into())
            } else {
                AnnotatorError::Encode { index, source }
            }
        })?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Writes `records` to `path`, gzipped if the path ends in `.gz`.
///
/// The previous contents of `path` are only replaced once the new file is
/// complete; see [`write_atomically`].
pub fn save_records(path: &Path, records: &[Record]) -> Result<()> {
    write_atomically(path, |out| encode_records(out, records))
}

/// Runs `write` against a temporary file next to `path`, then renames it onto
/// `path`.
///
/// If `write` or any flush fails, the temporary file is deleted and `path` is
/// left as it was. Compression is applied underneath `write` when `path` ends
/// in `.gz`.
pub fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let parent_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    // Dropping the temp file on an early return removes it from disk.
    let temp_file = tempfile::Builder::new()
        .prefix(".annotator")
        .tempfile_in(parent_dir)?;

    let mut writer = BufWriter::new(temp_file.as_file());
    if is_gzipped(path) {
        let mut encoder = GzEncoder::new(writer, Compression::best());
        write(&mut encoder)?;
        writer = encoder.finish()?;
    } else {
        write(&mut writer)?;
    }
    writer.flush()?;
    drop(writer);
    temp_file.as_file().sync_all()?;

    debug!(path = %path.display(), temp = %temp_file.path().display(), "replacing data file");
    temp_file.persist(path).map_err(|err| err.error)?;
    Ok(())
}
