//! Input/output stream selection for filter-style binaries.
//!
//! Zero, one or two path arguments pick the streams: no input path (or `-`) means stdin, no
//! output path means stdout. A file that cannot be opened falls back to the standard stream
//! and leaves a warning for the caller to print.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const STDIN_MARKER: &str = "-";

pub struct Streams {
    pub input: Box<dyn Read>,
    pub output: Box<dyn Write>,
    pub input_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    /// An input file was named but no output file.
    pub infile_only: bool,
    pub warnings: Vec<String>,
}

impl Streams {
    pub fn select(input: Option<&Path>, output: Option<&Path>) -> Self {
        let mut warnings = Vec::new();
        let input = input.filter(|path| path.as_os_str() != STDIN_MARKER);

        let (reader, input_path): (Box<dyn Read>, Option<PathBuf>) = match input {
            Some(path) => match File::open(path) {
                Ok(file) => (Box::new(BufReader::new(file)), Some(path.to_path_buf())),
                Err(err) => {
                    warnings.push(format!(
                        "Failed to open input {}: {}; reading stdin instead",
                        path.display(),
                        err
                    ));
                    (Box::new(io::stdin()), None)
                }
            },
            None => (Box::new(io::stdin()), None),
        };

        let (writer, output_path): (Box<dyn Write>, Option<PathBuf>) = match output {
            Some(path) => match File::create(path) {
                Ok(file) => (Box::new(BufWriter::new(file)), Some(path.to_path_buf())),
                Err(err) => {
                    warnings.push(format!(
                        "Failed to open output {}: {}; writing stdout instead",
                        path.display(),
                        err
                    ));
                    (Box::new(io::stdout()), None)
                }
            },
            None => (Box::new(io::stdout()), None),
        };

        let infile_only = input_path.is_some() && output.is_none();
        Self {
            input: reader,
            output: writer,
            input_path,
            output_path,
            infile_only,
            warnings,
        }
    }

    pub fn read_to_string(&mut self) -> io::Result<String> {
        let mut content = String::new();
        self.input.read_to_string(&mut content)?;
        Ok(content)
    }

    /// Creates the input file's sibling with its extension replaced by `extension`.
    pub fn open_derived_output(&self, extension: &str) -> io::Result<File> {
        let Some(input_path) = &self.input_path else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "no input file to derive an output name from",
            ));
        };
        File::create(replace_extension(input_path, extension))
    }
}

pub fn replace_extension(path: &Path, extension: &str) -> PathBuf {
    path.with_extension(extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn replace_extension_swaps_or_appends() {
        assert_eq!(
            replace_extension(Path::new("dir/source.py"), "html"),
            PathBuf::from("dir/source.html")
        );
        assert_eq!(
            replace_extension(Path::new("README"), "html"),
            PathBuf::from("README.html")
        );
        assert_eq!(
            replace_extension(Path::new("archive.tar.gz"), "zip"),
            PathBuf::from("archive.tar.zip")
        );
    }

    #[test]
    fn input_file_without_output_is_infile_only() {
        let temp = TempDir::new().expect("temp dir");
        let input = temp.path().join("input.py");
        fs::write(&input, "x = 1\n").expect("write input");

        let mut streams = Streams::select(Some(&input), None);
        assert!(streams.warnings.is_empty());
        assert!(streams.infile_only);
        assert_eq!(streams.input_path.as_deref(), Some(input.as_path()));
        assert_eq!(streams.read_to_string().expect("read"), "x = 1\n");

        let mut derived = streams.open_derived_output("html").expect("derived");
        derived.write_all(b"ok").expect("write derived");
        assert_eq!(
            fs::read_to_string(temp.path().join("input.html")).expect("read derived"),
            "ok"
        );
    }

    #[test]
    fn both_paths_open_files() {
        let temp = TempDir::new().expect("temp dir");
        let input = temp.path().join("in.txt");
        let output = temp.path().join("out.txt");
        fs::write(&input, "data").expect("write input");

        let mut streams = Streams::select(Some(&input), Some(&output));
        assert!(!streams.infile_only);
        let content = streams.read_to_string().expect("read");
        streams.output.write_all(content.as_bytes()).expect("write");
        streams.output.flush().expect("flush");
        drop(streams);
        assert_eq!(fs::read_to_string(&output).expect("read output"), "data");
    }

    #[test]
    fn dash_and_missing_files_fall_back_to_stdio() {
        let streams = Streams::select(Some(Path::new("-")), None);
        assert!(streams.input_path.is_none());
        assert!(!streams.infile_only);
        assert!(streams.warnings.is_empty());

        let temp = TempDir::new().expect("temp dir");
        let missing = temp.path().join("missing.py");
        let unwritable = temp.path().join("no-such-dir").join("out.html");
        let streams = Streams::select(Some(&missing), Some(&unwritable));
        assert!(streams.input_path.is_none());
        assert!(streams.output_path.is_none());
        assert_eq!(streams.warnings.len(), 2, "warnings: {:?}", streams.warnings);
        assert!(streams
            .open_derived_output("html")
            .is_err());
    }
}
