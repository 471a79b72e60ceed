use std::path::{Path, PathBuf};

use vigil_core::VigilError;

/// A candidate source file discovered in the checkout.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use vigil_repo::files::{Language, SourceFileInfo};
///
/// let info = SourceFileInfo {
///     relative_path: PathBuf::from("src/app.py"),
///     absolute_path: PathBuf::from("/tmp/clone/src/app.py"),
///     language: Language::Python,
/// };
/// assert_eq!(info.language.name(), "Python");
/// ```
#[derive(Debug, Clone)]
pub struct SourceFileInfo {
    /// Path relative to the checkout root.
    pub relative_path: PathBuf,
    /// Absolute path on disk.
    pub absolute_path: PathBuf,
    /// Language detected from the extension.
    pub language: Language,
}

/// Programming language detected from a file extension.
///
/// # Examples
///
/// ```
/// use vigil_repo::files::Language;
///
/// assert_eq!(Language::from_extension("py"), Language::Python);
/// assert_eq!(Language::from_extension("cs"), Language::CSharp);
/// assert_eq!(Language::from_extension("ipynb"), Language::Notebook);
/// assert_eq!(Language::from_extension("exe"), Language::Unknown);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    CSharp,
    JavaScript,
    TypeScript,
    Java,
    C,
    Cpp,
    Ruby,
    Go,
    Php,
    Rust,
    Swift,
    Kotlin,
    Dart,
    Shell,
    Html,
    Css,
    /// Jupyter notebook; reviewed as Python after cell extraction.
    Notebook,
    Unknown,
}

impl Language {
    /// Detect language from a file extension string (without the dot).
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "py" => Language::Python,
            "cs" => Language::CSharp,
            "js" | "jsx" => Language::JavaScript,
            "ts" | "tsx" => Language::TypeScript,
            "java" => Language::Java,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hxx" | "hh" => Language::Cpp,
            "rb" => Language::Ruby,
            "go" => Language::Go,
            "php" => Language::Php,
            "rs" => Language::Rust,
            "swift" => Language::Swift,
            "kt" | "kts" => Language::Kotlin,
            "dart" => Language::Dart,
            "sh" => Language::Shell,
            "html" => Language::Html,
            "css" => Language::Css,
            "ipynb" => Language::Notebook,
            _ => Language::Unknown,
        }
    }

    /// Human-readable name used in the review prompt.
    pub fn name(&self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::CSharp => "C#",
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::Java => "Java",
            Language::C => "C",
            Language::Cpp => "C++",
            Language::Ruby => "Ruby",
            Language::Go => "Go",
            Language::Php => "PHP",
            Language::Rust => "Rust",
            Language::Swift => "Swift",
            Language::Kotlin => "Kotlin",
            Language::Dart => "Dart",
            Language::Shell => "Shell Script",
            Language::Html => "HTML",
            Language::Css => "CSS",
            // Notebook content is extracted to plain Python before review.
            Language::Notebook => "Python",
            Language::Unknown => "Unknown",
        }
    }
}

/// Walk a checkout and return reviewable source files.
///
/// Filters to the known-extension allow-list, skips files larger than
/// `max_file_size` bytes, and skips VCS metadata and other hidden
/// directories. Results are sorted by relative path so interactive
/// selection indices are stable across runs.
///
/// # Errors
///
/// Returns [`VigilError::Io`] if `root` cannot be read at all; unreadable
/// individual entries are skipped.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use vigil_repo::files::list_source_files;
///
/// let files = list_source_files(Path::new("/tmp/clone"), 1_000_000).unwrap();
/// for f in &files {
///     println!("{} ({})", f.relative_path.display(), f.language.name());
/// }
/// ```
pub fn list_source_files(root: &Path, max_file_size: u64) -> Result<Vec<SourceFileInfo>, VigilError> {
    if !root.is_dir() {
        return Err(VigilError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("not a directory: {}", root.display()),
        )));
    }

    let walker = ignore::WalkBuilder::new(root).build();
    let mut files = Vec::new();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };

        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }

        let path = entry.path();
        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(e) => e,
            None => continue,
        };
        let language = Language::from_extension(ext);
        if language == Language::Unknown {
            continue;
        }

        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(_) => continue,
        };
        if metadata.len() > max_file_size {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        files.push(SourceFileInfo {
            relative_path: relative,
            absolute_path: path.to_path_buf(),
            language,
        });
    }

    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(files)
}
