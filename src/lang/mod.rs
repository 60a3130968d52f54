//! Language definitions: comment syntax and default file extensions.
//!
//! The registry is an explicit value handed to the pipeline; callers may add
//! their own languages with [`LanguageRegistry::register`].

pub mod lexer;

pub use lexer::CommentLexer;

/// One lexical rule of a language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockRule {
    /// String literal; its content is skipped and never forms a block.
    String {
        delimiter: &'static str,
        /// Escape character inside the literal, if any
        escape: Option<char>,
    },

    /// Character literal such as `'x'` or `'\n'`. A quote that does not
    /// close a literal on the same line (a lifetime, a label or a digit
    /// separator) is treated as code.
    Char {
        quote: &'static str,
        escape: Option<char>,
    },

    /// Single-line comment starting with `prefix`
    Line { prefix: &'static str },

    /// Multi-line comment between `begin` and `end`
    Block {
        begin: &'static str,
        end: &'static str,
    },
}

/// A supported source language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    /// Identifier used in input specifications (e.g., `"go"`, `"rust"`)
    pub id: &'static str,

    /// Human-readable name
    pub display_name: &'static str,

    /// Default file extensions, without leading dot
    pub exts: &'static [&'static str],

    /// Rules tried in order at every position
    pub rules: Vec<BlockRule>,
}

impl Language {
    /// Returns `true` if `ext` (with or without leading dot) is one of the
    /// language's default extensions. Case-insensitive.
    pub fn has_ext(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.');
        self.exts.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

const fn line(prefix: &'static str) -> BlockRule {
    BlockRule::Line { prefix }
}

const fn block(begin: &'static str, end: &'static str) -> BlockRule {
    BlockRule::Block { begin, end }
}

const fn string(delimiter: &'static str) -> BlockRule {
    BlockRule::String {
        delimiter,
        escape: Some('\\'),
    }
}

const fn char_lit(quote: &'static str) -> BlockRule {
    BlockRule::Char {
        quote,
        escape: Some('\\'),
    }
}

const fn raw(delimiter: &'static str) -> BlockRule {
    BlockRule::String {
        delimiter,
        escape: None,
    }
}

type LanguageDef = (
    &'static str,
    &'static str,
    &'static [&'static str],
    Vec<BlockRule>,
);

fn c_like() -> Vec<BlockRule> {
    vec![string("\""), char_lit("'"), line("//"), block("/*", "*/")]
}

/// JavaScript flavour: single quotes delimit strings, backticks templates.
fn js_like() -> Vec<BlockRule> {
    vec![
        string("`"),
        string("\""),
        string("'"),
        line("//"),
        block("/*", "*/"),
    ]
}

/// Ordered set of known languages.
#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    languages: Vec<Language>,
}

impl LanguageRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every bundled language.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let defs: [LanguageDef; 17] = [
            ("c", "C", &["h", "c"], c_like()),
            ("cpp", "C++", &["h", "hpp", "cpp", "cxx", "cc"], c_like()),
            ("csharp", "C#", &["cs"], c_like()),
            ("go", "Go", &["go"], {
                let mut rules = c_like();
                rules.insert(0, raw("`"));
                rules
            }),
            ("java", "Java", &["java"], c_like()),
            ("javascript", "JavaScript", &["js", "mjs"], js_like()),
            ("typescript", "TypeScript", &["ts"], js_like()),
            ("kotlin", "Kotlin", &["kt", "kts"], {
                let mut rules = c_like();
                rules.insert(0, raw("\"\"\""));
                rules
            }),
            ("swift", "Swift", &["swift"], {
                let mut rules = c_like();
                rules.insert(0, string("\"\"\""));
                rules
            }),
            ("scala", "Scala", &["scala"], {
                let mut rules = c_like();
                rules.insert(0, raw("\"\"\""));
                rules
            }),
            ("rust", "Rust", &["rs"], c_like()),
            ("php", "PHP", &["php"], vec![
                string("\""),
                string("'"),
                line("//"),
                line("#"),
                block("/*", "*/"),
            ]),
            ("python", "Python", &["py"], vec![
                block("\"\"\"", "\"\"\""),
                block("'''", "'''"),
                string("\""),
                string("'"),
                line("#"),
            ]),
            ("ruby", "Ruby", &["rb"], vec![
                string("\""),
                string("'"),
                line("#"),
                block("=begin", "=end"),
            ]),
            ("shell", "Shell", &["sh"], vec![string("\""), raw("'"), line("#")]),
            ("perl", "Perl", &["perl", "prl", "pl"], vec![
                string("\""),
                string("'"),
                line("#"),
                block("=pod", "=cut"),
            ]),
            ("lua", "Lua", &["lua"], vec![
                string("\""),
                string("'"),
                block("--[[", "]]"),
                line("--"),
            ]),
        ];

        for (id, display_name, exts, rules) in defs {
            registry.register(Language {
                id,
                display_name,
                exts,
                rules,
            });
        }
        registry
    }

    /// Adds `language`, replacing any existing entry with the same id.
    pub fn register(&mut self, language: Language) {
        match self
            .languages
            .iter_mut()
            .find(|l| l.id.eq_ignore_ascii_case(language.id))
        {
            Some(existing) => *existing = language,
            None => self.languages.push(language),
        }
    }

    /// Looks up a language by id, case-insensitively.
    pub fn get(&self, id: &str) -> Option<&Language> {
        self.languages.iter().find(|l| l.id.eq_ignore_ascii_case(id))
    }

    /// Identifiers of every registered language, in registration order.
    pub fn ids(&self) -> Vec<&'static str> {
        self.languages.iter().map(|l| l.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup_is_case_insensitive() {
        let registry = LanguageRegistry::builtin();
        assert_eq!(registry.get("Go").map(|l| l.id), Some("go"));
        assert_eq!(registry.get("RUST").map(|l| l.display_name), Some("Rust"));
        assert!(registry.get("cobol").is_none());
    }

    #[test]
    fn test_builtin_ids_are_unique() {
        let registry = LanguageRegistry::builtin();
        let ids = registry.ids();
        let mut deduped = ids.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(ids.len(), deduped.len());
        assert_eq!(ids.first(), Some(&"c"));
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry = LanguageRegistry::builtin();
        let before = registry.ids().len();
        registry.register(Language {
            id: "go",
            display_name: "Go (custom)",
            exts: &["go", "tmpl"],
            rules: vec![line("//")],
        });

        assert_eq!(registry.ids().len(), before);
        let go = registry.get("go").unwrap();
        assert_eq!(go.display_name, "Go (custom)");
        assert!(go.has_ext(".TMPL"));
        assert!(!go.has_ext("rs"));
    }
}
