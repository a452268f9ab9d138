use flate2::read::GzDecoder;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::Path;

/// Name that stands for the standard input/output stream
pub const STDIO_NAME: &str = "-";

/// A whitespace-separated line with its position in the input (1-based)
pub struct NumberedWords {
    pub line_number: usize,
    pub words: Vec<Box<str>>,
}

fn is_not_comment_line(line: &str) -> bool {
    let line = line.trim_start();
    !(line.is_empty() || line.starts_with('#') || line.starts_with('%'))
}

///
/// Read lines and split them into whitespace-separated words. Blank
/// lines and comments (`#` or `%`) are skipped, but line numbers
/// still refer to the original input.
///
/// * `input_file` - file name--either gzipped or not, or `-` for stdin
///
pub fn read_lines_of_words(input_file: &str) -> anyhow::Result<Vec<NumberedWords>> {
    let buf_reader: Box<dyn BufRead> = open_buf_reader(input_file)?;

    let mut lines_raw = vec![];
    for (i, line) in buf_reader.lines().enumerate() {
        let line = line?;
        if is_not_comment_line(&line) {
            lines_raw.push((i + 1, line.into_boxed_str()));
        }
    }

    // Parsing takes more time, so split them into parallel jobs
    let mut lines: Vec<NumberedWords> = lines_raw
        .into_par_iter()
        .map(|(line_number, s)| NumberedWords {
            line_number,
            words: s
                .split_whitespace()
                .map(|x| x.to_owned().into_boxed_str())
                .collect(),
        })
        .collect();

    if lines.len() > 100_000 {
        lines.par_sort_by_key(|x| x.line_number);
    } else {
        lines.sort_by_key(|x| x.line_number);
    }

    Ok(lines)
}

///
/// Open a file for reading, and return a buffered reader
/// * `input_file` - file name--either gzipped or not, or `-` for stdin
pub fn open_buf_reader(input_file: &str) -> anyhow::Result<Box<dyn BufRead>> {
    if input_file == STDIO_NAME {
        return Ok(Box::new(BufReader::new(std::io::stdin())));
    }

    let open = |name: &str| {
        File::open(name).map_err(|e| anyhow::anyhow!("failed to open {}: {}", name, e))
    };

    // take a look at the extension
    // return buffered reader accordingly
    let ext = Path::new(input_file).extension().and_then(|x| x.to_str());
    match ext {
        Some("gz") => {
            let decoder = GzDecoder::new(open(input_file)?);
            Ok(Box::new(BufReader::new(decoder)))
        }
        _ => Ok(Box::new(BufReader::new(open(input_file)?))),
    }
}

///
/// Open a file for writing, and return a buffered writer
/// * `output_file` - file name--either gzipped or not; `-` and
///   `stdout` write to the standard output
pub fn open_buf_writer(output_file: &str) -> anyhow::Result<Box<dyn std::io::Write>> {
    // we can simply override with stdout
    if output_file == STDIO_NAME || output_file.eq_ignore_ascii_case("stdout") {
        return Ok(Box::new(BufWriter::new(std::io::stdout())));
    }

    let create = |name: &str| {
        File::create(name).map_err(|e| anyhow::anyhow!("failed to create {}: {}", name, e))
    };

    // take a look at the extension
    let ext = Path::new(output_file).extension().and_then(|x| x.to_str());
    match ext {
        Some("gz") => {
            let output_file = create(output_file)?;
            let encoder =
                flate2::write::GzEncoder::new(output_file, flate2::Compression::default());
            Ok(Box::new(BufWriter::new(encoder)))
        }
        _ => {
            let output_file = create(output_file)?;
            Ok(Box::new(BufWriter::new(output_file)))
        }
    }
}

///
/// Create a directory if needed
/// * `file` - file name
///
pub fn mkdir(file: &str) -> anyhow::Result<()> {
    let path = Path::new(file);
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    Ok(())
}
