use std::path::Path;

use tokio::{
    fs::File,
    io::{self, AsyncBufReadExt, Lines},
};

/// Read a file from the given path into a list of strings
pub async fn read_file<P: AsRef<Path>>(path: P) -> io::Result<Vec<String>> {
    let mut r = file_reader(path.as_ref()).await?;
    let mut lines = Vec::new();

    while let Some(line) = r.next_line().await? {
        lines.push(line);
    }

    Ok(lines)
}

/// Read a file from the given path into raw byte lines, without requiring valid UTF-8
pub async fn read_raw_lines<P: AsRef<Path>>(path: P) -> io::Result<Vec<Vec<u8>>> {
    let f = File::open(path.as_ref()).await?;
    let mut segments = io::BufReader::new(f).split(b'\n');
    let mut lines = Vec::new();

    while let Some(line) = segments.next_segment().await? {
        lines.push(line);
    }

    Ok(lines)
}

async fn file_reader(path: &Path) -> io::Result<Lines<io::BufReader<File>>> {
    let f = File::open(path).await?;

    Ok(io::BufReader::new(f).lines())
}

/// Write lines to the given path, one per line with a trailing newline
pub async fn write_lines<P, I, S>(path: P, lines: I) -> io::Result<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut contents = String::new();

    for line in lines {
        contents.push_str(line.as_ref());
        contents.push('\n');
    }

    tokio::fs::write(path, contents).await
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn test_lines_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lines.txt");

        write_lines(&path, ["[PAD]", "", "홍"]).await.unwrap();

        assert_eq!(read_file(&path).await.unwrap(), vec!["[PAD]", "", "홍"]);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();

        let result = read_file(dir.path().join("missing.jsonl")).await;

        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_raw_lines_keep_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.jsonl");

        tokio::fs::write(&path, b"ok\n\xff\xfe x\nok again").await.unwrap();

        let lines = read_raw_lines(&path).await.unwrap();

        assert_eq!(
            lines,
            vec![b"ok".to_vec(), b"\xff\xfe x".to_vec(), b"ok again".to_vec()]
        );
        assert_eq!(read_file(&path).await.unwrap_err().kind(), io::ErrorKind::InvalidData);
    }
}
