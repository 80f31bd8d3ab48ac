//! URI templates for dynamic resources
//!
//! A template such as `example://{user}/posts/{post_id:int}` compiles once into
//! alternating static parts and typed placeholders. Placeholder syntax is
//! `name[:type][=default][?]` where `type` is `string` (the default), `int`,
//! `float`, `bool` or `pattern:<glob>`. Numeric types accept an inclusive
//! range suffix, e.g. `int[1..100]` or `float[0.0..]`. A glob takes the rest
//! of the placeholder, so an optional pattern is written `name?:pattern:<glob>`.
//!
//! Compiled templates are shared through a process-wide FIFO cache.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde_json::{Map, Number, Value};
use tracing::debug;

/// Longest accepted placeholder name
pub const MAX_PARAM_NAME_LEN: usize = 127;
/// Most placeholders a single template may hold
pub const MAX_TEMPLATE_PARAMS: usize = 32;
/// Default slot count of the compiled-template cache
pub const DEFAULT_TEMPLATE_CACHE_SIZE: usize = 128;

/// Template compilation and expansion errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TemplateError {
    #[error("unterminated placeholder starting at byte {0}")]
    Unterminated(usize),
    #[error("placeholder at byte {0} has an empty name")]
    EmptyName(usize),
    #[error("placeholder name '{0}' is too long")]
    NameTooLong(String),
    #[error("placeholder '{name}' has unsupported type '{kind}'")]
    UnsupportedType { name: String, kind: String },
    #[error("placeholder '{0}' has an invalid range")]
    InvalidRange(String),
    #[error("default value '{value}' does not satisfy the type of '{name}'")]
    InvalidDefault { name: String, value: String },
    #[error("template has more than {MAX_TEMPLATE_PARAMS} placeholders")]
    TooManyParams,
    #[error("missing required parameter '{0}'")]
    MissingParameter(String),
    #[error("value '{value}' is not valid for parameter '{name}'")]
    InvalidParameter { name: String, value: String },
}

/// Type constraint of a placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    Str,
    Int { min: Option<i64>, max: Option<i64> },
    Float { min: Option<f64>, max: Option<f64> },
    Bool,
    /// Glob with a single `*`
    Pattern(String),
}

/// Validation rules of one placeholder
#[derive(Debug, Clone, PartialEq)]
pub struct ParamValidation {
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<String>,
}

impl ParamValidation {
    /// Validate a raw value and convert it to its typed JSON form.
    pub fn typed_value(&self, raw: &str) -> Option<Value> {
        match &self.kind {
            ParamKind::Str => Some(Value::String(raw.to_string())),
            ParamKind::Int { min, max } => {
                let n: i64 = raw.parse().ok()?;
                if min.is_some_and(|m| n < m) || max.is_some_and(|m| n > m) {
                    return None;
                }
                Some(Value::Number(n.into()))
            }
            ParamKind::Float { min, max } => {
                let f: f64 = raw.parse().ok()?;
                if min.is_some_and(|m| f < m) || max.is_some_and(|m| f > m) {
                    return None;
                }
                Number::from_f64(f).map(Value::Number)
            }
            ParamKind::Bool => match raw {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            ParamKind::Pattern(glob) => {
                glob_match(glob, raw).then(|| Value::String(raw.to_string()))
            }
        }
    }

    /// Value used when the placeholder is absent: the typed default, else "".
    fn absent_value(&self) -> Value {
        match &self.default {
            Some(default) => self
                .typed_value(default)
                .unwrap_or_else(|| Value::String(default.clone())),
            None => Value::String(String::new()),
        }
    }
}

/// Single-`*` glob: trailing star is a prefix match, leading star a suffix
/// match, a middle star splits into prefix and suffix. No star is exact.
pub fn glob_match(pattern: &str, value: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix('*') {
        return value.starts_with(prefix);
    }
    if let Some(suffix) = pattern.strip_prefix('*') {
        return value.ends_with(suffix);
    }
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            value.len() >= prefix.len() + suffix.len()
                && value.starts_with(prefix)
                && value.ends_with(suffix)
        }
        None => pattern == value,
    }
}

/// A template compiled into static parts and placeholders.
///
/// `static_parts.len() == param_names.len() + 1` always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTemplate {
    template: String,
    static_parts: Vec<String>,
    param_names: Vec<String>,
    param_validations: Vec<ParamValidation>,
}

impl CompiledTemplate {
    pub fn compile(template: &str) -> Result<Self, TemplateError> {
        let mut static_parts = Vec::new();
        let mut param_names = Vec::new();
        let mut param_validations = Vec::new();

        let mut current = String::new();
        let mut rest = template;
        let mut offset = 0usize;

        while let Some(open) = rest.find('{') {
            current.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or(TemplateError::Unterminated(offset + open))?;
            let spec = &after[..close];

            let (name, validation) = parse_placeholder(spec, offset + open)?;
            if param_names.len() == MAX_TEMPLATE_PARAMS {
                return Err(TemplateError::TooManyParams);
            }

            static_parts.push(std::mem::take(&mut current));
            param_names.push(name);
            param_validations.push(validation);

            let consumed = open + 1 + close + 1;
            offset += consumed;
            rest = &rest[consumed..];
        }
        current.push_str(rest);
        static_parts.push(current);

        Ok(Self {
            template: template.to_string(),
            static_parts,
            param_names,
            param_validations,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn static_parts(&self) -> &[String] {
        &self.static_parts
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn param_validations(&self) -> &[ParamValidation] {
        &self.param_validations
    }

    pub fn matches(&self, uri: &str) -> bool {
        self.extract(uri).is_some()
    }

    /// Match `uri` and return its typed parameters as a JSON object.
    pub fn extract(&self, uri: &str) -> Option<Map<String, Value>> {
        if uri.is_empty() {
            return None;
        }

        let mut rest = uri.strip_prefix(self.static_parts[0].as_str())?;
        let mut params = Map::new();
        let last = self.param_names.len().checked_sub(1);

        for (i, (name, validation)) in self
            .param_names
            .iter()
            .zip(&self.param_validations)
            .enumerate()
        {
            let next_static = self.static_parts[i + 1].as_str();

            let raw = if Some(i) == last {
                // The trailing static must close the URI.
                let value = rest.strip_suffix(next_static)?;
                rest = "";
                value
            } else if next_static.is_empty() {
                // Adjacent placeholders cannot be split; the first takes nothing.
                ""
            } else {
                let pos = rest.find(next_static)?;
                let value = &rest[..pos];
                rest = &rest[pos + next_static.len()..];
                value
            };

            if raw.is_empty() {
                if validation.required {
                    return None;
                }
                params.insert(name.clone(), validation.absent_value());
                continue;
            }

            params.insert(name.clone(), validation.typed_value(raw)?);
        }

        rest.is_empty().then_some(params)
    }

    /// Substitute bindings into the template.
    pub fn expand(&self, bindings: &Map<String, Value>) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.template.len());
        out.push_str(&self.static_parts[0]);

        for (i, (name, validation)) in self
            .param_names
            .iter()
            .zip(&self.param_validations)
            .enumerate()
        {
            let bound = bindings.get(name).and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            });

            let value = match bound {
                Some(v) => v,
                None if validation.required => {
                    return Err(TemplateError::MissingParameter(name.clone()));
                }
                None => validation.default.clone().unwrap_or_default(),
            };

            if !value.is_empty() && validation.typed_value(&value).is_none() {
                return Err(TemplateError::InvalidParameter {
                    name: name.clone(),
                    value,
                });
            }

            out.push_str(&value);
            out.push_str(&self.static_parts[i + 1]);
        }

        Ok(out)
    }
}

impl fmt::Display for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

fn parse_placeholder(spec: &str, position: usize) -> Result<(String, ParamValidation), TemplateError> {
    let mut required = true;

    let name_end = spec.find([':', '=', '?']).unwrap_or(spec.len());
    let name = &spec[..name_end];
    if name.is_empty() {
        return Err(TemplateError::EmptyName(position));
    }
    if name.len() > MAX_PARAM_NAME_LEN {
        return Err(TemplateError::NameTooLong(name.to_string()));
    }
    if name.contains('{') {
        return Err(TemplateError::Unterminated(position));
    }
    let mut rest = &spec[name_end..];

    // `{name?:type}` is accepted as well as the trailing form.
    if let Some(stripped) = rest.strip_prefix('?') {
        required = false;
        rest = stripped;
    }

    let mut kind = ParamKind::Str;
    if rest.starts_with(":pattern:") {
        // The glob runs to the end of the placeholder, `=` and `?` included.
        kind = parse_kind(name, &rest[1..])?;
        rest = "";
    } else {
        if let Some(stripped) = rest.strip_suffix('?') {
            required = false;
            rest = stripped;
        }
        if let Some(typed) = rest.strip_prefix(':') {
            let type_end = typed.find('=').unwrap_or(typed.len());
            kind = parse_kind(name, &typed[..type_end])?;
            rest = &typed[type_end..];
        }
    }

    let mut default = None;
    if let Some(value) = rest.strip_prefix('=') {
        required = false;
        default = Some(value.to_string());
    } else if !rest.is_empty() {
        return Err(TemplateError::UnsupportedType {
            name: name.to_string(),
            kind: rest.to_string(),
        });
    }

    let validation = ParamValidation {
        kind,
        required,
        default,
    };
    if let Some(value) = &validation.default {
        if !value.is_empty() && validation.typed_value(value).is_none() {
            return Err(TemplateError::InvalidDefault {
                name: name.to_string(),
                value: value.clone(),
            });
        }
    }

    Ok((name.to_string(), validation))
}

fn parse_kind(name: &str, type_str: &str) -> Result<ParamKind, TemplateError> {
    if let Some(glob) = type_str.strip_prefix("pattern:") {
        return Ok(ParamKind::Pattern(glob.to_string()));
    }

    let (base, range) = match type_str.find('[') {
        Some(pos) => {
            let inner = type_str[pos + 1..]
                .strip_suffix(']')
                .ok_or_else(|| TemplateError::InvalidRange(name.to_string()))?;
            (&type_str[..pos], Some(inner))
        }
        None => (type_str, None),
    };

    match (base, range) {
        ("" | "string", None) => Ok(ParamKind::Str),
        ("bool", None) => Ok(ParamKind::Bool),
        ("int", range) => {
            let (min, max) = parse_range::<i64>(name, range)?;
            Ok(ParamKind::Int { min, max })
        }
        ("float", range) => {
            let (min, max) = parse_range::<f64>(name, range)?;
            Ok(ParamKind::Float { min, max })
        }
        _ => Err(TemplateError::UnsupportedType {
            name: name.to_string(),
            kind: type_str.to_string(),
        }),
    }
}

fn parse_range<T>(name: &str, range: Option<&str>) -> Result<(Option<T>, Option<T>), TemplateError>
where
    T: std::str::FromStr + PartialOrd + Copy,
{
    let Some(range) = range else {
        return Ok((None, None));
    };
    let invalid = || TemplateError::InvalidRange(name.to_string());
    let (lo, hi) = range.split_once("..").ok_or_else(invalid)?;
    let bound = |s: &str| -> Result<Option<T>, TemplateError> {
        let s = s.trim();
        if s.is_empty() {
            Ok(None)
        } else {
            s.parse::<T>().map(Some).map_err(|_| invalid())
        }
    };
    let (min, max) = (bound(lo)?, bound(hi)?);
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            return Err(invalid());
        }
    }
    Ok((min, max))
}

/// Guess a MIME type from the extension in a template or URI
pub fn detect_mime_type(pattern: &str) -> Option<&'static str> {
    let ext_start = pattern.rfind('.')?;
    let ext = &pattern[ext_start + 1..];
    // A placeholder inside the extension ends it
    let ext = ext.split(['}', '{']).next().unwrap_or(ext);

    match ext {
        "json" => Some("application/json"),
        "txt" => Some("text/plain"),
        "md" => Some("text/markdown"),
        "html" | "htm" => Some("text/html"),
        "css" => Some("text/css"),
        "js" => Some("application/javascript"),
        "xml" => Some("application/xml"),
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// Bounded FIFO cache of compiled templates keyed by template string
pub struct TemplateCache {
    inner: Mutex<TemplateCacheInner>,
    capacity: usize,
}

#[derive(Default)]
struct TemplateCacheInner {
    entries: HashMap<String, Arc<CompiledTemplate>>,
    order: VecDeque<String>,
}

impl TemplateCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(TemplateCacheInner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Return the cached compilation, compiling and inserting on miss.
    /// Failed compilations are not cached.
    pub fn get_or_compile(&self, template: &str) -> Result<Arc<CompiledTemplate>, TemplateError> {
        let mut inner = self.inner.lock();
        if let Some(compiled) = inner.entries.get(template) {
            return Ok(compiled.clone());
        }

        let compiled = Arc::new(CompiledTemplate::compile(template)?);
        if inner.entries.len() >= self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
                debug!(template = %oldest, "Evicted compiled template");
            }
        }
        inner.entries.insert(template.to_string(), compiled.clone());
        inner.order.push_back(template.to_string());
        Ok(compiled)
    }

    pub fn contains(&self, template: &str) -> bool {
        self.inner.lock().entries.contains_key(template)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }
}

static GLOBAL_CACHE: Lazy<TemplateCache> =
    Lazy::new(|| TemplateCache::new(DEFAULT_TEMPLATE_CACHE_SIZE));

/// The process-wide template cache
pub fn template_cache() -> &'static TemplateCache {
    &GLOBAL_CACHE
}

/// Does `uri` match `template`? Malformed templates never match.
pub fn matches(uri: &str, template: &str) -> bool {
    extract_params(uri, template).is_some()
}

/// Typed parameters of `uri` under `template`, or `None` on no match.
pub fn extract_params(uri: &str, template: &str) -> Option<Map<String, Value>> {
    let compiled = template_cache().get_or_compile(template).ok()?;
    compiled.extract(uri)
}

/// Expand `template` with `bindings`.
pub fn expand(template: &str, bindings: &Map<String, Value>) -> Result<String, TemplateError> {
    template_cache().get_or_compile(template)?.expand(bindings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_static_parts_invariant() {
        let t = CompiledTemplate::compile("example://{user}/posts/{post_id:int}").unwrap();
        assert_eq!(t.static_parts(), &["example://", "/posts/", ""]);
        assert_eq!(t.param_names(), &["user", "post_id"]);
        assert_eq!(t.static_parts().len(), t.param_names().len() + 1);

        let t = CompiledTemplate::compile("plain://static").unwrap();
        assert_eq!(t.static_parts().len(), 1);
        assert!(t.param_names().is_empty());
    }

    #[test]
    fn test_placeholder_syntax() {
        let t = CompiledTemplate::compile(
            "x://{a}/{b:int=5}/{c?}/{d:pattern:img*}/{e:float[0..1]}/{f:bool?}",
        )
        .unwrap();
        let v = t.param_validations();
        assert_eq!(v[0].kind, ParamKind::Str);
        assert!(v[0].required);
        assert_eq!(v[1].kind, ParamKind::Int { min: None, max: None });
        assert_eq!(v[1].default.as_deref(), Some("5"));
        assert!(!v[1].required);
        assert!(!v[2].required);
        assert_eq!(v[3].kind, ParamKind::Pattern("img*".into()));
        assert_eq!(
            v[4].kind,
            ParamKind::Float {
                min: Some(0.0),
                max: Some(1.0)
            }
        );
        assert_eq!(v[5].kind, ParamKind::Bool);
        assert!(!v[5].required);
    }

    #[test]
    fn test_compile_errors() {
        assert_eq!(
            CompiledTemplate::compile("x://{name"),
            Err(TemplateError::Unterminated(4))
        );
        assert!(matches!(
            CompiledTemplate::compile("x://{}"),
            Err(TemplateError::EmptyName(_))
        ));
        assert!(matches!(
            CompiledTemplate::compile("x://{n:uuid}"),
            Err(TemplateError::UnsupportedType { .. })
        ));
        assert!(matches!(
            CompiledTemplate::compile("x://{n:int[9..1]}"),
            Err(TemplateError::InvalidRange(_))
        ));
        assert!(matches!(
            CompiledTemplate::compile("x://{n:int=abc}"),
            Err(TemplateError::InvalidDefault { .. })
        ));
        let long = format!("x://{{{}}}", "n".repeat(MAX_PARAM_NAME_LEN + 1));
        assert!(matches!(
            CompiledTemplate::compile(&long),
            Err(TemplateError::NameTooLong(_))
        ));
    }

    #[test]
    fn test_typed_extraction() {
        let t = CompiledTemplate::compile("example://{user}/posts/{post_id:int}").unwrap();
        let params = t.extract("example://john/posts/42").unwrap();
        assert_eq!(Value::Object(params), json!({"user": "john", "post_id": 42}));

        assert!(t.extract("example://john/posts/4x2").is_none());
        assert!(t.extract("example://john/comments/42").is_none());
    }

    #[test]
    fn test_bool_and_float() {
        let t = CompiledTemplate::compile("s://{flag:bool}/{ratio:float}").unwrap();
        let params = t.extract("s://1/0.25").unwrap();
        assert_eq!(params["flag"], json!(true));
        assert_eq!(params["ratio"], json!(0.25));
        assert!(t.extract("s://yes/0.25").is_none());
    }

    #[test]
    fn test_int_range() {
        let t = CompiledTemplate::compile("p://{page:int[1..10]}").unwrap();
        assert!(t.matches("p://1"));
        assert!(t.matches("p://10"));
        assert!(!t.matches("p://0"));
        assert!(!t.matches("p://11"));
    }

    #[test]
    fn test_pattern_globs() {
        assert!(glob_match("img*", "img_001"));
        assert!(!glob_match("img*", "pic_001"));
        assert!(glob_match("*.png", "cat.png"));
        assert!(!glob_match("*.png", "cat.jpg"));
        assert!(glob_match("a*c", "abc"));
        assert!(glob_match("a*c", "ac"));
        assert!(!glob_match("ab*bc", "abc"));
        assert!(glob_match("exact", "exact"));

        let t = CompiledTemplate::compile("files://{name:pattern:*.png}").unwrap();
        assert!(t.matches("files://cat.png"));
        assert!(!t.matches("files://cat.gif"));
    }

    #[test]
    fn test_pattern_glob_keeps_equals_and_question_mark() {
        let t = CompiledTemplate::compile("q://{q:pattern:a=*?}/{r?:pattern:v*}").unwrap();
        let v = t.param_validations();
        assert_eq!(v[0].kind, ParamKind::Pattern("a=*?".into()));
        assert!(v[0].required);
        assert!(v[0].default.is_none());
        assert_eq!(v[1].kind, ParamKind::Pattern("v*".into()));
        assert!(!v[1].required);

        assert!(t.matches("q://a=1?/v2"));
        assert!(!t.matches("q://a1/v2"));
    }

    #[test]
    fn test_optional_trailing_param() {
        let t = CompiledTemplate::compile("docs://{section}/{page?}").unwrap();
        let params = t.extract("docs://intro/").unwrap();
        assert_eq!(params["page"], json!(""));
        let params = t.extract("docs://intro/setup").unwrap();
        assert_eq!(params["page"], json!("setup"));

        let t = CompiledTemplate::compile("docs://{section}/{page:int=1}").unwrap();
        let params = t.extract("docs://intro/").unwrap();
        assert_eq!(params["page"], json!(1));
    }

    #[test]
    fn test_boundaries() {
        let t = CompiledTemplate::compile("example://{name}/resource").unwrap();
        assert!(!t.matches(""));
        assert!(!t.matches("example:///resource"));
        assert!(!t.matches("example://john/posts/42"));

        let t = CompiledTemplate::compile("plain://static").unwrap();
        assert!(t.matches("plain://static"));
        assert!(!t.matches("plain://static/more"));
        assert!(!t.matches("plain://stat"));
    }

    #[test]
    fn test_trailing_static_anchors_end() {
        let t = CompiledTemplate::compile("file://{name}.b").unwrap();
        let params = t.extract("file://a.b.c.b").unwrap();
        assert_eq!(params["name"], json!("a.b.c"));
    }

    #[test]
    fn test_expand() {
        let t = CompiledTemplate::compile("example://{user}/posts/{post_id:int}").unwrap();
        let uri = t
            .expand(&obj(json!({"user": "john", "post_id": 42})))
            .unwrap();
        assert_eq!(uri, "example://john/posts/42");

        assert_eq!(
            t.expand(&obj(json!({"user": "john"}))),
            Err(TemplateError::MissingParameter("post_id".into()))
        );
        assert!(matches!(
            t.expand(&obj(json!({"user": "john", "post_id": "x"}))),
            Err(TemplateError::InvalidParameter { .. })
        ));

        let t = CompiledTemplate::compile("docs://{section}/{page?}").unwrap();
        assert_eq!(t.expand(&obj(json!({"section": "a"}))).unwrap(), "docs://a/");
        let t = CompiledTemplate::compile("docs://{section}/{page=index}").unwrap();
        assert_eq!(
            t.expand(&obj(json!({"section": "a"}))).unwrap(),
            "docs://a/index"
        );
    }

    #[test]
    fn test_expand_then_extract_returns_bindings() {
        let cases = [
            ("example://{user}/posts/{post_id:int}", json!({"user": "ann", "post_id": -3})),
            ("m://{x:float}/{y:bool}", json!({"x": 1.5, "y": false})),
            ("g://{name:pattern:img*}.png", json!({"name": "img_9"})),
        ];
        for (template, bindings) in cases {
            let t = CompiledTemplate::compile(template).unwrap();
            let bindings = obj(bindings);
            let uri = t.expand(&bindings).unwrap();
            assert_eq!(t.extract(&uri).unwrap(), bindings, "template {}", template);
        }
    }

    #[test]
    fn test_cache_fifo_eviction() {
        let cache = TemplateCache::new(2);
        cache.get_or_compile("a://{x}").unwrap();
        cache.get_or_compile("b://{x}").unwrap();
        cache.get_or_compile("a://{x}").unwrap();
        cache.get_or_compile("c://{x}").unwrap();
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("a://{x}"));
        assert!(cache.contains("b://{x}"));
        assert!(cache.contains("c://{x}"));

        assert!(cache.get_or_compile("bad://{x").is_err());
        assert!(!cache.contains("bad://{x"));
    }

    #[test]
    fn test_global_helpers() {
        assert!(matches("example://john/posts/42", "example://{user}/posts/{post_id:int}"));
        assert!(!matches("anything", "broken://{x"));
        let params = extract_params("w://7", "w://{n:int}").unwrap();
        assert_eq!(params["n"], json!(7));
        assert_eq!(expand("w://{n:int}", &obj(json!({"n": 8}))).unwrap(), "w://8");
    }

    #[test]
    fn test_detect_mime_type() {
        assert_eq!(detect_mime_type("file:///{name}.json"), Some("application/json"));
        assert_eq!(detect_mime_type("file:///img/{id}.png"), Some("image/png"));
        assert_eq!(detect_mime_type("notes://{id}"), None);
    }
}
