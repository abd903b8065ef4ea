use std::fs;
use std::io;
use std::path::Path;

pub fn ensure_dir<P: AsRef<Path>>(p: P) -> io::Result<()> {
    if !p.as_ref().exists() {
        fs::create_dir_all(&p)?;
    }
    Ok(())
}

/// True when `output` is missing or not strictly newer than `source`.
pub fn is_stale(source: &Path, output: &Path) -> io::Result<bool> {
    let output_time = match fs::metadata(output) {
        Ok(meta) => meta.modified()?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(e),
    };
    Ok(fs::metadata(source)?.modified()? >= output_time)
}

/// Copies `file` into `dir`, keeping its file name.
pub fn copy_into(file: &Path, dir: &Path) -> io::Result<u64> {
    let name = file
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    ensure_dir(dir)?;
    fs::copy(file, dir.join(name))
}
