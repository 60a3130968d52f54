//! Validation of [`InputSpec`]s into ready-to-run [`Options`].
//!
//! Building options touches filesystem metadata and directory listings only;
//! no file content is read here.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

use encoding_rs::{Encoding, UTF_8};
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use tracing::debug;

use crate::lang::{Language, LanguageRegistry};
use crate::locale::{Message, MessageKey};
use crate::message::{Cause, ErrorRecord, ValidationError};
use crate::model::InputSpec;

/// Validated form of one [`InputSpec`].
#[derive(Debug, Clone)]
pub struct Options {
    /// Resolved files, deduplicated, in resolution order. May be empty.
    pub paths: Vec<PathBuf>,

    /// Decoder for non-UTF-8 input; `None` means bytes are used as-is
    pub encoding: Option<&'static Encoding>,

    /// Comment rules handed to the extractor
    pub language: Language,
}

impl Options {
    /// Validates `spec` against `languages` and resolves its paths.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] whose field is `encoding`, `language` or
    /// `paths`.
    pub fn build(spec: &InputSpec, languages: &LanguageRegistry) -> Result<Self, ValidationError> {
        let encoding = resolve_encoding(spec.encoding.as_deref())?;
        let language = resolve_language(&spec.lang, languages)?;
        let paths = resolve_paths(spec, language)?;

        debug!(
            lang = language.id,
            files = paths.len(),
            encoding = encoding.map(Encoding::name),
            "Resolved input"
        );

        Ok(Self {
            paths,
            encoding,
            language: language.clone(),
        })
    }
}

fn resolve_encoding(name: Option<&str>) -> Result<Option<&'static Encoding>, ValidationError> {
    let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    let encoding = Encoding::for_label(name.as_bytes()).ok_or_else(|| {
        ErrorRecord::validation(
            "encoding",
            Message::new(MessageKey::UnsupportedEncoding).with_arg(name),
        )
    })?;

    Ok((encoding != UTF_8).then_some(encoding))
}

fn resolve_language<'a>(
    id: &str,
    languages: &'a LanguageRegistry,
) -> Result<&'a Language, ValidationError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ErrorRecord::validation("language", MessageKey::Required));
    }

    languages.get(id).ok_or_else(|| {
        ErrorRecord::validation(
            "language",
            Message::new(MessageKey::UnsupportedInputLang).with_arg(id),
        )
    })
}

fn resolve_paths(spec: &InputSpec, language: &Language) -> Result<Vec<PathBuf>, ValidationError> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::new();

    for entry in &spec.paths {
        let files = resolve_entry(entry, spec, language).map_err(|cause| ErrorRecord {
            file: entry.display().to_string(),
            field: "paths".to_string(),
            line: 0,
            cause,
        })?;

        for file in files {
            if seen.insert(identity(&file)) {
                resolved.push(file);
            }
        }
    }
    Ok(resolved)
}

fn resolve_entry(entry: &Path, spec: &InputSpec, language: &Language) -> Result<Vec<PathBuf>, Cause> {
    if is_glob(&entry.to_string_lossy()) {
        return resolve_glob(entry, spec.recursive);
    }

    match std::fs::metadata(entry) {
        Ok(meta) if meta.is_dir() => {
            let depth = if spec.recursive { None } else { Some(1) };
            let files = walk(entry, depth, None)?;
            Ok(files
                .into_iter()
                .filter(|f| wanted_ext(f, spec, language))
                .collect())
        }
        Ok(_) => Ok(vec![entry.to_path_buf()]),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            if ends_with_separator(entry) {
                Err(MessageKey::DirNotExists.into())
            } else {
                // Reported by the file worker when it fails to read it.
                Ok(vec![entry.to_path_buf()])
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// Key under which two spellings of the same file compare equal. Missing
/// files cannot be canonicalized and fall back to a lexical normal form.
fn identity(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| normalize(path))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir
                if matches!(out.components().next_back(), Some(Component::Normal(_))) =>
            {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Splits `entry` into a literal base directory and a glob over its walk.
fn resolve_glob(entry: &Path, recursive: bool) -> Result<Vec<PathBuf>, Cause> {
    let mut base = PathBuf::new();
    let mut pattern: Vec<String> = Vec::new();

    for component in entry.components() {
        let text = component.as_os_str().to_string_lossy();
        if pattern.is_empty() && !is_glob(&text) {
            base.push(component);
        } else {
            pattern.push(text.into_owned());
        }
    }
    if base.as_os_str().is_empty() {
        base = PathBuf::from(".");
    }
    if !base.is_dir() {
        return Err(MessageKey::DirNotExists.into());
    }

    let depth = if recursive || pattern.iter().any(|p| p == "**") {
        None
    } else {
        Some(pattern.len())
    };
    walk(&base, depth, Some(&pattern.join("/")))
}

/// Lists regular files under `root`, sorted by name at every level. Symbolic
/// links are followed; the walker skips link cycles.
fn walk(root: &Path, max_depth: Option<usize>, glob: Option<&str>) -> Result<Vec<PathBuf>, Cause> {
    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .follow_links(true)
        .max_depth(max_depth)
        .sort_by_file_name(|a, b| a.cmp(b));

    if let Some(glob) = glob {
        let mut overrides = OverrideBuilder::new(root);
        overrides.add(glob)?;
        builder.overrides(overrides.build()?);
    }

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = entry?;
        if entry.file_type().is_some_and(|t| t.is_file()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn wanted_ext(path: &Path, spec: &InputSpec, language: &Language) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };

    if spec.exts.is_empty() {
        language.has_ext(ext)
    } else {
        spec.exts
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

fn is_glob(text: &str) -> bool {
    text.contains(|c: char| matches!(c, '*' | '?' | '[' | '{'))
}

fn ends_with_separator(path: &Path) -> bool {
    path.to_string_lossy()
        .ends_with(|c: char| c == '/' || c == MAIN_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.go"), "// a\n").unwrap();
        fs::write(dir.path().join("b.GO"), "// b\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "text\n").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("c.go"), "// c\n").unwrap();
        fs::write(dir.path().join("sub").join("d.tmpl"), "// d\n").unwrap();
        dir
    }

    fn names(options: &Options, root: &Path) -> Vec<String> {
        options
            .paths
            .iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap_or(p)
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_directory_uses_language_extensions() {
        let dir = fixture();
        let spec = InputSpec::new("go").with_path(dir.path());
        let options = Options::build(&spec, &LanguageRegistry::builtin()).unwrap();

        assert_eq!(names(&options, dir.path()), vec!["a.go", "b.GO"]);
        assert_eq!(options.language.id, "go");
        assert!(options.encoding.is_none());
    }

    #[test]
    fn test_recursive_directory_with_custom_exts() {
        let dir = fixture();
        let spec = InputSpec::new("go")
            .with_path(dir.path())
            .with_recursive(true)
            .with_ext(".tmpl")
            .with_ext("go");
        let options = Options::build(&spec, &LanguageRegistry::builtin()).unwrap();

        assert_eq!(
            names(&options, dir.path()),
            vec!["a.go", "b.GO", "sub/c.go", "sub/d.tmpl"]
        );
    }

    #[test]
    fn test_glob_entry() {
        let dir = fixture();
        let spec = InputSpec::new("go").with_path(dir.path().join("sub").join("*.tmpl"));
        let options = Options::build(&spec, &LanguageRegistry::builtin()).unwrap();

        assert_eq!(names(&options, dir.path()), vec!["sub/d.tmpl"]);
    }

    #[test]
    fn test_recursive_glob_entry() {
        let dir = fixture();
        let spec = InputSpec::new("go").with_path(dir.path().join("**").join("*.go"));
        let options = Options::build(&spec, &LanguageRegistry::builtin()).unwrap();

        assert_eq!(names(&options, dir.path()), vec!["a.go", "sub/c.go"]);
    }

    #[test]
    fn test_duplicates_are_dropped() {
        let dir = fixture();
        let file = dir.path().join("a.go");
        let spec = InputSpec::new("go")
            .with_path(&file)
            .with_path(dir.path())
            .with_path(&file);
        let options = Options::build(&spec, &LanguageRegistry::builtin()).unwrap();

        assert_eq!(names(&options, dir.path()), vec!["a.go", "b.GO"]);
    }

    #[test]
    fn test_different_spellings_of_one_file_are_dropped() {
        let dir = fixture();
        let detour = dir.path().join("sub").join("..").join("a.go");
        let spec = InputSpec::new("go")
            .with_path(dir.path())
            .with_path(&detour)
            .with_path(dir.path().join(".").join("b.GO"));
        let options = Options::build(&spec, &LanguageRegistry::builtin()).unwrap();

        assert_eq!(names(&options, dir.path()), vec!["a.go", "b.GO"]);
    }

    #[test]
    fn test_missing_files_dedup_lexically() {
        let spec = InputSpec::new("go")
            .with_path("./gone/x.go")
            .with_path("gone/y/../x.go")
            .with_path("../x.go");

        let options = Options::build(&spec, &LanguageRegistry::builtin()).unwrap();
        assert_eq!(
            options.paths,
            vec![PathBuf::from("./gone/x.go"), PathBuf::from("../x.go")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_walk_follows_symlinks() {
        let dir = fixture();
        std::os::unix::fs::symlink(dir.path().join("sub").join("c.go"), dir.path().join("link.go"))
            .unwrap();
        let spec = InputSpec::new("go").with_path(dir.path());
        let options = Options::build(&spec, &LanguageRegistry::builtin()).unwrap();

        assert_eq!(names(&options, dir.path()), vec!["a.go", "b.GO", "link.go"]);
    }

    #[test]
    fn test_explicit_file_skips_extension_filter() {
        let dir = fixture();
        let spec = InputSpec::new("go").with_path(dir.path().join("notes.txt"));
        let options = Options::build(&spec, &LanguageRegistry::builtin()).unwrap();

        assert_eq!(names(&options, dir.path()), vec!["notes.txt"]);
    }

    #[test]
    fn test_missing_file_is_deferred() {
        let dir = fixture();
        let spec = InputSpec::new("go").with_path(dir.path().join("missing.go"));
        let options = Options::build(&spec, &LanguageRegistry::builtin()).unwrap();

        assert_eq!(names(&options, dir.path()), vec!["missing.go"]);
    }

    #[test]
    fn test_missing_directory_is_rejected() {
        let dir = fixture();
        let missing = format!("{}/nope/", dir.path().display());
        let spec = InputSpec::new("go").with_path(missing);
        let err = Options::build(&spec, &LanguageRegistry::builtin()).unwrap_err();

        assert_eq!(err.field, "paths");
        assert_eq!(
            err.cause.message().map(|m| m.key),
            Some(MessageKey::DirNotExists)
        );
    }

    #[test]
    fn test_glob_with_missing_base_is_rejected() {
        let dir = fixture();
        let spec = InputSpec::new("go").with_path(dir.path().join("nope").join("*.go"));
        let err = Options::build(&spec, &LanguageRegistry::builtin()).unwrap_err();
        assert_eq!(err.field, "paths");
    }

    #[test]
    fn test_empty_directory_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let spec = InputSpec::new("rust").with_path(dir.path());
        let options = Options::build(&spec, &LanguageRegistry::builtin()).unwrap();
        assert!(options.paths.is_empty());
    }

    #[test]
    fn test_encoding_resolution() {
        let registry = LanguageRegistry::builtin();

        let gbk = Options::build(&InputSpec::new("c").with_encoding("GBK"), &registry).unwrap();
        assert_eq!(gbk.encoding.map(Encoding::name), Some("GBK"));

        let utf8 = Options::build(&InputSpec::new("c").with_encoding("utf-8"), &registry).unwrap();
        assert!(utf8.encoding.is_none());

        let err = Options::build(&InputSpec::new("c").with_encoding("klingon"), &registry)
            .unwrap_err();
        assert_eq!(err.field, "encoding");
    }

    #[test]
    fn test_language_resolution() {
        let registry = LanguageRegistry::builtin();

        let err = Options::build(&InputSpec::new(""), &registry).unwrap_err();
        assert_eq!(err.field, "language");
        assert_eq!(err.cause.message().map(|m| m.key), Some(MessageKey::Required));

        let err = Options::build(&InputSpec::new("cobol"), &registry).unwrap_err();
        assert_eq!(err.field, "language");
        assert_eq!(
            err.cause.message().map(|m| m.args.clone()),
            Some(vec!["cobol".to_string()])
        );
    }
}
