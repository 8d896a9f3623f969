//! Shader program registry.
//!
//! Every effect ships one WGSL module (vertex + fragment entry points) and a
//! [`UniformSchema`]. The registry checks the module's `struct Uniforms`
//! against the schema once per recipe and then hands out program instances,
//! each with its own [`UniformStorage`].

use crate::error::{FxError, FxResult};
use crate::uniforms::{UniformSchema, UniformStorage, UniformType};
use fnv::{FnvHashMap, FnvHashSet};
use std::rc::Rc;

/// Noise and fullscreen helpers prepended to every effect module.
pub static PRELUDE_WGSL: &str = include_str!("../shaders/prelude.wgsl");
/// Post-processing module (bright, blur, chroma, composite).
pub static POST_WGSL: &str = include_str!("../shaders/post.wgsl");

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";
/// Name of the uniform block variable in effect modules.
pub const UNIFORM_BINDING: &str = "u";

/// Static description of one effect program.
#[derive(Clone, Copy)]
pub struct ProgramRecipe {
    pub label: &'static str,
    pub wgsl: &'static str,
    pub schema: fn() -> FxResult<UniformSchema>,
}

impl std::fmt::Debug for ProgramRecipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramRecipe").field("label", &self.label).finish()
    }
}

/// Validated source + schema shared by every instance of one recipe.
#[derive(Debug)]
struct ProgramTemplate {
    source: Rc<str>,
    schema: Rc<UniformSchema>,
}

/// A compiled-on-demand program: immutable source and schema, mutable values.
#[derive(Debug)]
pub struct ShaderProgram {
    label: &'static str,
    source: Rc<str>,
    uniforms: UniformStorage,
}

impl ShaderProgram {
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Full WGSL module (prelude + effect).
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn vertex_entry(&self) -> &'static str {
        VERTEX_ENTRY
    }

    pub fn fragment_entry(&self) -> &'static str {
        FRAGMENT_ENTRY
    }

    pub fn schema(&self) -> &UniformSchema {
        self.uniforms.schema()
    }

    pub fn uniforms(&self) -> &UniformStorage {
        &self.uniforms
    }

    pub fn uniforms_mut(&mut self) -> &mut UniformStorage {
        &mut self.uniforms
    }
}

#[derive(Debug, Default)]
pub struct ShaderRegistry {
    templates: FnvHashMap<&'static str, ProgramTemplate>,
}

impl ShaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of validated recipes.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Create a fresh program instance for `recipe`.
    ///
    /// The first call per label composes and validates the module; later
    /// calls reuse the template but never the uniform storage.
    pub fn instantiate(&mut self, recipe: &ProgramRecipe) -> FxResult<ShaderProgram> {
        if !self.templates.contains_key(recipe.label) {
            let schema = (recipe.schema)()?;
            let source = compose(recipe.wgsl);
            validate(recipe.label, &source, &schema)?;
            log::debug!(
                "[shader] validated `{}` ({} uniforms, {} bytes)",
                recipe.label,
                schema.fields().len(),
                schema.size()
            );
            self.templates.insert(
                recipe.label,
                ProgramTemplate {
                    source: Rc::from(source),
                    schema: Rc::new(schema),
                },
            );
        }
        let Some(t) = self.templates.get(recipe.label) else {
            return Err(FxError::ShaderValidation {
                program: recipe.label.to_string(),
                reason: "template missing after validation".into(),
            });
        };
        Ok(ShaderProgram {
            label: recipe.label,
            source: Rc::clone(&t.source),
            uniforms: UniformStorage::new(recipe.label, Rc::clone(&t.schema)),
        })
    }
}

/// Prepend the shared prelude to an effect module.
pub fn compose(effect_wgsl: &str) -> String {
    let mut s = String::with_capacity(PRELUDE_WGSL.len() + effect_wgsl.len() + 1);
    s.push_str(PRELUDE_WGSL);
    s.push('\n');
    s.push_str(effect_wgsl);
    s
}

/// Check a module against its declared schema.
///
/// The `Uniforms` struct must list exactly the schema's fields, in order,
/// with matching types, every `u.<field>` access must name a declared field,
/// and both entry points must exist.
pub fn validate(label: &str, source: &str, schema: &UniformSchema) -> FxResult<()> {
    let fail = |reason: String| FxError::ShaderValidation {
        program: label.to_string(),
        reason,
    };
    let clean = strip_comments(source);

    for entry in [VERTEX_ENTRY, FRAGMENT_ENTRY] {
        if !clean.contains(&format!("fn {}(", entry)) {
            return Err(fail(format!("missing entry point `{}`", entry)));
        }
    }

    let declared = parse_struct_fields(&clean, "Uniforms").map_err(fail)?;
    if declared.len() != schema.fields().len() {
        return Err(fail(format!(
            "struct declares {} fields, schema has {}",
            declared.len(),
            schema.fields().len()
        )));
    }
    for ((name, ty), field) in declared.iter().zip(schema.fields()) {
        if name != field.name {
            return Err(fail(format!(
                "field order mismatch: `{}` where `{}` expected",
                name, field.name
            )));
        }
        if *ty != field.ty {
            return Err(fail(format!(
                "`{}` declared {} but schema default is {}",
                name,
                ty.wgsl_name(),
                field.ty.wgsl_name()
            )));
        }
    }

    for name in referenced_fields(&clean, UNIFORM_BINDING) {
        if !schema.contains(&name) {
            return Err(fail(format!("reads undeclared uniform `{}`", name)));
        }
    }
    Ok(())
}

/// Parse `struct <name> { a: f32, b: vec2<f32>, }` into `(name, type)` pairs.
pub fn parse_struct_fields(source: &str, name: &str) -> Result<Vec<(String, UniformType)>, String> {
    let header = format!("struct {}", name);
    let start = find_word(source, &header).ok_or_else(|| format!("no `{}` block", header))?;
    let rest = &source[start + header.len()..];
    let open = rest.find('{').ok_or_else(|| format!("`{}` has no body", header))?;
    let close = rest[open..]
        .find('}')
        .ok_or_else(|| format!("`{}` is not closed", header))?;
    let body = &rest[open + 1..open + close];

    let mut out = Vec::new();
    for raw in body.split(',') {
        let item = raw.trim();
        if item.is_empty() {
            continue;
        }
        let (field, ty) = item
            .split_once(':')
            .ok_or_else(|| format!("malformed member `{}`", item))?;
        let ty = UniformType::from_wgsl(ty).ok_or_else(|| format!("unsupported type in `{}`", item))?;
        out.push((field.trim().to_string(), ty));
    }
    Ok(out)
}

/// Field names read through `<binding>.<field>`, deduplicated in first-seen order.
pub fn referenced_fields(source: &str, binding: &str) -> Vec<String> {
    let bytes = source.as_bytes();
    let pattern = format!("{}.", binding);
    let mut seen = FnvHashSet::default();
    let mut out = Vec::new();
    let mut from = 0;
    while let Some(pos) = source[from..].find(&pattern) {
        let at = from + pos;
        from = at + pattern.len();
        let boundary = at == 0 || !is_ident_byte(bytes[at - 1]);
        if !boundary {
            continue;
        }
        let ident: String = source[from..]
            .bytes()
            .take_while(|b| is_ident_byte(*b))
            .map(char::from)
            .collect();
        if !ident.is_empty() && seen.insert(ident.clone()) {
            out.push(ident);
        }
    }
    out
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn find_word(source: &str, needle: &str) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut from = 0;
    while let Some(pos) = source[from..].find(needle) {
        let at = from + pos;
        let end = at + needle.len();
        let before_ok = at == 0 || !is_ident_byte(bytes[at - 1]);
        let after_ok = end >= bytes.len() || !is_ident_byte(bytes[end]);
        if before_ok && after_ok {
            return Some(at);
        }
        from = end;
    }
    None
}

fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '/' {
            match chars.peek() {
                Some('/') => {
                    for n in chars.by_ref() {
                        if n == '\n' {
                            out.push('\n');
                            break;
                        }
                    }
                    continue;
                }
                Some('*') => {
                    chars.next();
                    let mut prev = '\0';
                    for n in chars.by_ref() {
                        if prev == '*' && n == '/' {
                            break;
                        }
                        prev = n;
                    }
                    out.push(' ');
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
    out
}
