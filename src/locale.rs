//! Localized message catalogs.
//!
//! Error records carry a [`MessageKey`] plus positional arguments rather than
//! a pre-rendered string. A [`Localizer`] instance owns the registered
//! catalogs and renders keys for one active locale, so there is no process
//! wide string table to initialize before use.

use std::collections::HashMap;
use std::fmt;

use crate::message::ErrorRecord;

/// Tag of the locale used when nothing else matches.
pub const DEFAULT_LOCALE: &str = "en";

/// Identifier of every translatable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    Required,
    DirNotExists,
    UnsupportedInputLang,
    UnsupportedEncoding,
    NotFoundEndFlag,
    DecodeFailed,
    InvalidFormat,
    /// Layout of a rendered error record: message, file, line.
    ErrMessage,
    /// Layout of a rendered error record with a field: message, field, file, line.
    ErrMessageWithField,
}

/// Translations for a single locale.
pub type Catalog = HashMap<MessageKey, &'static str>;

fn english() -> Catalog {
    HashMap::from([
        (MessageKey::Required, "is required"),
        (MessageKey::DirNotExists, "directory does not exist"),
        (MessageKey::UnsupportedInputLang, "unsupported input language: {0}"),
        (MessageKey::UnsupportedEncoding, "unsupported encoding: {0}"),
        (MessageKey::NotFoundEndFlag, "end marker not found"),
        (MessageKey::DecodeFailed, "content is not valid {0}"),
        (MessageKey::InvalidFormat, "invalid format"),
        (MessageKey::ErrMessage, "{0} at {1}:{2}"),
        (MessageKey::ErrMessageWithField, "{0}[{1}] at {2}:{3}"),
    ])
}

fn simplified_chinese() -> Catalog {
    HashMap::from([
        (MessageKey::Required, "不能为空"),
        (MessageKey::DirNotExists, "目录不存在"),
        (MessageKey::UnsupportedInputLang, "无效的输入语言：{0}"),
        (MessageKey::UnsupportedEncoding, "不支持的编码方式：{0}"),
        (MessageKey::NotFoundEndFlag, "找不到结束符号"),
        (MessageKey::DecodeFailed, "内容不是有效的 {0} 编码"),
        (MessageKey::InvalidFormat, "格式不正确"),
        (MessageKey::ErrMessage, "{0} 位于 {1}:{2}"),
        (MessageKey::ErrMessageWithField, "{0}[{1}] 位于 {2}:{3}"),
    ])
}

/// Registered catalogs plus the active locale.
#[derive(Debug, Clone)]
pub struct Localizer {
    catalogs: HashMap<String, Catalog>,
    active: String,
}

impl Localizer {
    /// Creates a localizer with no catalogs. Keys render as their debug name
    /// until at least one catalog is registered.
    pub fn new() -> Self {
        Self {
            catalogs: HashMap::new(),
            active: DEFAULT_LOCALE.to_string(),
        }
    }

    /// Creates a localizer with the bundled `en` and `zh-Hans` catalogs.
    pub fn builtin() -> Self {
        let mut localizer = Self::new();
        localizer.register(DEFAULT_LOCALE, english());
        localizer.register("zh-Hans", simplified_chinese());
        localizer
    }

    /// Adds or replaces the catalog for `tag`.
    pub fn register(&mut self, tag: impl Into<String>, catalog: Catalog) {
        self.catalogs.insert(tag.into(), catalog);
    }

    /// Selects the active locale. Unknown tags fall back to [`DEFAULT_LOCALE`].
    pub fn with_locale(mut self, tag: &str) -> Self {
        self.active = if self.catalogs.contains_key(tag) {
            tag.to_string()
        } else {
            DEFAULT_LOCALE.to_string()
        };
        self
    }

    /// Tag of the active locale.
    pub fn locale(&self) -> &str {
        &self.active
    }

    /// Registered locale tags, sorted.
    pub fn locales(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.catalogs.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    fn template(&self, key: MessageKey) -> Option<&'static str> {
        self.catalogs
            .get(&self.active)
            .and_then(|c| c.get(&key))
            .or_else(|| self.catalogs.get(DEFAULT_LOCALE).and_then(|c| c.get(&key)))
            .copied()
    }

    /// Renders `key` with positional `{n}` arguments.
    pub fn message<A: AsRef<str>>(&self, key: MessageKey, args: &[A]) -> String {
        match self.template(key) {
            Some(template) => substitute(template, args),
            None => format!("{:?}", key),
        }
    }

    /// Renders a complete error record in the active locale.
    pub fn format(&self, record: &ErrorRecord) -> String {
        let cause = match record.cause.message() {
            Some(msg) => self.message(msg.key, &msg.args),
            None => record.cause.to_string(),
        };
        let line = record.line.to_string();

        if record.field.is_empty() {
            self.message(
                MessageKey::ErrMessage,
                &[cause.as_str(), record.file.as_str(), line.as_str()],
            )
        } else {
            self.message(
                MessageKey::ErrMessageWithField,
                &[
                    cause.as_str(),
                    record.field.as_str(),
                    record.file.as_str(),
                    line.as_str(),
                ],
            )
        }
    }
}

impl Default for Localizer {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Replaces `{n}` placeholders with the matching argument. Placeholders
/// without an argument are left untouched.
fn substitute<A: AsRef<str>>(template: &str, args: &[A]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let index = after
            .find('}')
            .and_then(|close| after[..close].parse::<usize>().ok().map(|i| (i, close)));

        match index.and_then(|(i, close)| args.get(i).map(|a| (a, close))) {
            Some((arg, close)) => {
                out.push_str(arg.as_ref());
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// A message key with its arguments, rendered lazily by a [`Localizer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub key: MessageKey,
    pub args: Vec<String>,
}

impl Message {
    pub fn new(key: MessageKey) -> Self {
        Self {
            key,
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let template = english().get(&self.key).copied().unwrap_or_default();
        f.write_str(&substitute(template, &self.args))
    }
}
