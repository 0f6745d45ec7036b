//! Filesystem probes shared by extractors
//!
//! Detection helpers never fail: an unreadable or missing path is simply a
//! negative answer. Reads used during extraction wrap I/O errors with the path.

use super::ExtractError;
use std::fs;
use std::path::{Path, PathBuf};

pub fn file_exists(dir: &Path, name: &str) -> bool {
    dir.join(name).is_file()
}

pub fn dir_exists(dir: &Path, name: &str) -> bool {
    dir.join(name).is_dir()
}

/// Lists regular files directly inside `dir` whose extension is one of
/// `extensions`, sorted by file name.
pub fn files_with_extensions(dir: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return Vec::new(),
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.contains(&ext))
        })
        .collect();

    files.sort();
    files
}

pub fn has_files_with_extensions(dir: &Path, extensions: &[&str]) -> bool {
    !files_with_extensions(dir, extensions).is_empty()
}

/// Checks whether a small marker file contains `needle`
pub fn file_contains(dir: &Path, name: &str, needle: &str) -> bool {
    fs::read_to_string(dir.join(name))
        .map(|content| content.contains(needle))
        .unwrap_or(false)
}

pub fn read_file(path: &Path) -> Result<String, ExtractError> {
    fs::read_to_string(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads `dir/name` if it exists
pub fn read_optional(dir: &Path, name: &str) -> Result<Option<String>, ExtractError> {
    let path = dir.join(name);
    if !path.is_file() {
        return Ok(None);
    }
    read_file(&path).map(Some)
}

/// Base name of a directory, resolving `.` and relative paths where possible
pub fn dir_name(dir: &Path) -> String {
    let resolved = fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
    resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Removes comments starting with `marker` up to end of line.
///
/// Markers inside string literals delimited by any of `quotes` are kept;
/// backslash escapes inside strings are honoured. Line structure is preserved.
pub fn strip_line_comments(content: &str, marker: &str, quotes: &[char]) -> String {
    let mut out = String::with_capacity(content.len());

    for line in content.lines() {
        let mut quote: Option<char> = None;
        let mut escaped = false;
        let mut cut = line.len();

        for (i, c) in line.char_indices() {
            if let Some(q) = quote {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            if quotes.contains(&c) {
                quote = Some(c);
            } else if line[i..].starts_with(marker) {
                cut = i;
                break;
            }
        }

        out.push_str(&line[..cut]);
        out.push('\n');
    }

    out
}

/// Removes `/* ... */` comments, honouring nesting and quoted strings
///
/// Newlines inside a comment are kept so line-based scans still line up.
/// Text after `//` is copied untouched; pair with [`strip_line_comments`].
pub fn strip_block_comments(content: &str, quotes: &[char]) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0usize;
    let mut line_comment = false;

    while let Some(c) = chars.next() {
        if depth > 0 {
            match (c, chars.peek()) {
                ('/', Some('*')) => {
                    chars.next();
                    depth += 1;
                }
                ('*', Some('/')) => {
                    chars.next();
                    depth -= 1;
                }
                ('\n', _) => out.push('\n'),
                _ => {}
            }
            continue;
        }

        if line_comment {
            if c == '\n' {
                line_comment = false;
            }
            out.push(c);
            continue;
        }

        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q || c == '\n' {
                quote = None;
            }
            out.push(c);
            continue;
        }

        match (c, chars.peek()) {
            ('/', Some('*')) => {
                chars.next();
                depth = 1;
            }
            ('/', Some('/')) => {
                line_comment = true;
                out.push(c);
            }
            _ => {
                if quotes.contains(&c) {
                    quote = Some(c);
                }
                out.push(c);
            }
        }
    }

    out
}

/// Appends `item` unless already present, keeping first-seen order
pub fn push_unique(items: &mut Vec<String>, item: &str) {
    if !items.iter().any(|existing| existing == item) {
        items.push(item.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_strip_block_comments() {
        let code = "a /* one\ntwo */ b /* outer /* inner */ still */ c\n";
        assert_eq!(strip_block_comments(code, &['"']), "a \n b  c\n");
    }

    #[test]
    fn test_strip_block_comments_respects_strings_and_line_comments() {
        let code = "url: \"http://x/*y*/\" // note /* not a block\nnext\n";
        assert_eq!(strip_block_comments(code, &['"']), code);
    }

    #[test]
    fn test_files_with_extensions_sorted() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b.tf"), "").unwrap();
        fs::write(temp.path().join("a.tf"), "").unwrap();
        fs::write(temp.path().join("notes.md"), "").unwrap();
        fs::create_dir(temp.path().join("dir.tf")).unwrap();

        let files = files_with_extensions(temp.path(), &["tf"]);
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.tf", "b.tf"]);
    }

    #[test]
    fn test_probes_tolerate_missing_dir() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        assert!(!file_exists(&missing, "mix.exs"));
        assert!(!has_files_with_extensions(&missing, &["ex"]));
        assert!(!file_contains(&missing, "pom.xml", "scala"));
    }

    #[test]
    fn test_read_optional() {
        let temp = TempDir::new().unwrap();
        assert!(read_optional(temp.path(), "build.sbt").unwrap().is_none());

        fs::write(temp.path().join("build.sbt"), "name := \"x\"").unwrap();
        assert_eq!(
            read_optional(temp.path(), "build.sbt").unwrap().as_deref(),
            Some("name := \"x\"")
        );
    }

    #[test]
    fn test_strip_line_comments_honours_strings() {
        let stripped = strip_line_comments(
            "project('demo#1') # trailing\n# executable('fake')\nx = 'a\\'#b'\n",
            "#",
            &['\'', '"'],
        );
        assert_eq!(stripped, "project('demo#1') \n\nx = 'a\\'#b'\n");

        let swift = strip_line_comments(
            ".package(url: \"https://github.com/a/b.git\", from: \"1.0.0\") // pinned\n",
            "//",
            &['"'],
        );
        assert_eq!(
            swift,
            ".package(url: \"https://github.com/a/b.git\", from: \"1.0.0\") \n"
        );
    }

    #[test]
    fn test_push_unique() {
        let mut items = vec!["Threads".to_string()];
        push_unique(&mut items, "Threads");
        push_unique(&mut items, "Boost");
        assert_eq!(items, vec!["Threads", "Boost"]);
    }
}
