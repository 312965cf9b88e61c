//! Timeline file I/O. The writer picks compression by the output path's
//! extension; the reader sniffs the file magic and falls back to the
//! extension.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

pub fn create(path: &Path) -> Result<Box<dyn Write + Send>> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let writer = BufWriter::new(file);
    Ok(match extension(path) {
        Some("gz") => Box::new(flate2::write::GzEncoder::new(writer, flate2::Compression::default())),
        Some("zst") | Some("zstd") => Box::new(
            zstd::stream::write::Encoder::new(writer, 0)
                .context("starting zstd stream")?
                .auto_finish(),
        ),
        _ => Box::new(writer),
    })
}

pub fn open(path: &Path) -> Result<Box<dyn Read>> {
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut magic = [0u8; 4];
    let got = file.read(&mut magic).context("reading file magic")?;
    file.seek(SeekFrom::Start(0)).context("rewinding input")?;

    if got >= 2 && magic[..2] == GZIP_MAGIC {
        return Ok(Box::new(flate2::read::GzDecoder::new(BufReader::new(file))));
    }
    if got >= 4 && magic == ZSTD_MAGIC {
        return Ok(Box::new(zstd::stream::read::Decoder::new(file).context("starting zstd stream")?));
    }
    Ok(match extension(path) {
        Some("gz") => Box::new(flate2::read::GzDecoder::new(BufReader::new(file))),
        Some("zst") | Some("zstd") => {
            Box::new(zstd::stream::read::Decoder::new(file).context("starting zstd stream")?)
        }
        _ => Box::new(BufReader::new(file)),
    })
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(suffix: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("kectl-archive-{nanos}{suffix}"))
    }

    fn round_trip(suffix: &str) -> Vec<u8> {
        let path = temp_path(suffix);
        {
            let mut writer = create(&path).unwrap();
            writer.write_all(b"---\nkind: Pod\n").unwrap();
            writer.flush().unwrap();
        }
        let mut reader = open(&path).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        let _ = std::fs::remove_file(&path);
        out
    }

    #[test]
    fn plain_gzip_and_zstd_round_trip() {
        for suffix in ["", ".gz", ".zst"] {
            assert_eq!(round_trip(suffix), b"---\nkind: Pod\n".to_vec(), "suffix {suffix:?}");
        }
    }

    #[test]
    fn reader_sniffs_magic_despite_extension() {
        // Write gzip into a file with no extension; the magic must win.
        let gz = temp_path(".gz");
        {
            let mut writer = create(&gz).unwrap();
            writer.write_all(b"sniffed").unwrap();
            writer.flush().unwrap();
        }
        let plain = temp_path("");
        std::fs::rename(&gz, &plain).unwrap();

        let mut reader = open(&plain).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"sniffed".to_vec());
        let _ = std::fs::remove_file(&plain);
    }
}
