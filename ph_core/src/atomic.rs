use std::{fs, io::Write, path::Path};

/// Replace `path` with `bytes` via a sibling temp file and a rename, so
/// readers see either the old contents or the new, never a torn write.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_contents_and_leaves_no_temp() {
        let dir = tempfile::tempdir().expect("tempdir");
        let p = dir.path().join("log.jsonl");
        fs::write(&p, "old\n").expect("seed");
        write_atomic(&p, b"").expect("rewrite");
        assert_eq!(fs::read_to_string(&p).expect("read"), "");
        assert!(!dir.path().join("log.jsonl.tmp").exists());
    }
}
