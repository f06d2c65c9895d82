//! JSON output for derived datasets.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::CocolensError;

/// Pretty-prints `value` to `path`, or to stdout when `path` is `None`.
pub fn write_json<T: Serialize + ?Sized>(path: Option<&Path>, value: &T) -> Result<(), CocolensError> {
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let mut writer = BufWriter::new(file);
            write_pretty(&mut writer, value, path)?;
            writer.flush()?;
            log::info!("Wrote {}", path.display());
            Ok(())
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            write_pretty(&mut writer, value, Path::new("<stdout>"))?;
            writeln!(writer)?;
            Ok(())
        }
    }
}

fn write_pretty<W: Write, T: Serialize + ?Sized>(
    writer: W,
    value: &T,
    path: &Path,
) -> Result<(), CocolensError> {
    serde_json::to_writer_pretty(writer, value).map_err(|source| CocolensError::OutputWrite {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_json_to_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.json");
        write_json(Some(&path), &serde_json::json!({"grid_size": 20})).expect("write");

        let text = std::fs::read_to_string(&path).expect("read back");
        let value: serde_json::Value = serde_json::from_str(&text).expect("valid json");
        assert_eq!(value["grid_size"], 20);
        assert!(text.contains('\n'));
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nope").join("out.json");
        assert!(matches!(
            write_json(Some(&path), &[1, 2, 3]),
            Err(CocolensError::Io(_))
        ));
    }
}
