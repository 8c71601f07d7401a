//! Canonicalizer.
//!
//! Turns raw unit-script source into the normalized body that is hashed,
//! stored and executed. Normalization:
//!
//! - removes every import declaration and records `local → source` pairs,
//! - rewrites `export default fn name(...) {...}` into
//!   `exports = fn name(...) {...};`,
//! - rewrites every dynamic `import(x)` into `require(x)`,
//! - prints the result with the canonical printer, so layout and comments
//!   never reach the body.

use std::sync::Arc;

use defs_core::error::CanonicalError;
use defs_core::id::DefId;
use defs_core::types::{ARGS_BINDING, DYNAMIC_IMPORT_BINDING, EXPORT_SLOT};
use defs_script::ast::{ExportValue, Expr, Item, Module, Stmt};
use defs_script::{parse_module, print_module, ParseError};
use indexmap::IndexMap;
use tracing::trace;

/// Options for [`normalize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Require every import source to be a content id
    pub strict: bool,
}

impl NormalizeOptions {
    /// Strict normalization.
    pub fn strict() -> Self {
        Self { strict: true }
    }
}

/// The result of normalizing one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// The canonical executable body
    pub body: String,

    /// Local binding name → import source, in import order.
    ///
    /// Sources are ids, or (outside strict mode) names still to be pinned.
    pub requires: IndexMap<String, String>,

    /// Text of the comment in front of the default export
    pub jsdoc: Option<String>,

    /// Declared name of the exported function, `None` when anonymous
    pub exported_name: Option<String>,
}

fn syntax_error(err: ParseError) -> CanonicalError {
    CanonicalError::Syntax {
        line: err.line,
        column: err.column,
        message: err.message,
    }
}

/// Normalize raw source.
///
/// # Arguments
///
/// * `source` - The raw unit-script module.
/// * `options` - Normalization options.
///
/// # Returns
///
/// * `Ok(Normalized)` - The normalized body and its metadata.
/// * `Err(CanonicalError)` - If the source does not parse or has the wrong shape.
pub fn normalize(source: &str, options: NormalizeOptions) -> Result<Normalized, CanonicalError> {
    let module = parse_module(source).map_err(syntax_error)?;

    let mut requires = IndexMap::new();
    let mut export = None;
    let mut items = Vec::with_capacity(module.items.len());

    for item in module.items {
        match item {
            Item::Import(import) => {
                if options.strict && !DefId::is_def_id(&import.source) {
                    return Err(CanonicalError::InvalidDependencySource(import.source));
                }
                for specifier in import.specifiers {
                    if is_reserved(&specifier.local) {
                        return Err(CanonicalError::ReservedBinding(specifier.local));
                    }
                    requires.insert(specifier.local, import.source.clone());
                }
            }
            Item::ExportDefault(default) => {
                if export.is_some() {
                    return Err(CanonicalError::DuplicateDefaultExport);
                }
                let decl = match default.value {
                    ExportValue::Function(decl) => decl,
                    ExportValue::Expr(expr) => {
                        return Err(CanonicalError::InvalidExport(expr.kind_name().to_string()))
                    }
                };
                export = Some((default.doc, decl.name.clone()));
                items.push(Item::Stmt(Stmt::Expr(Expr::Assign {
                    target: Box::new(Expr::Ident(EXPORT_SLOT.to_string())),
                    value: Box::new(Expr::Function(Arc::new(decl))),
                })));
            }
            Item::Stmt(stmt) => items.push(Item::Stmt(stmt)),
        }
    }

    let (jsdoc, exported_name) = export.ok_or(CanonicalError::MissingDefaultExport)?;

    let mut module = Module { items };
    module.walk_exprs_mut(&mut rewrite_dynamic_import);
    let body = print_module(&module);
    // The export wrapper adds nesting; the stored body must still parse.
    parse_module(&body).map_err(syntax_error)?;

    trace!(
        requires = requires.len(),
        exported_name = exported_name.as_deref().unwrap_or(""),
        "Normalized source"
    );

    Ok(Normalized {
        body,
        requires,
        jsdoc,
        exported_name,
    })
}

/// Names the executor binds itself; imports may not shadow them.
fn is_reserved(name: &str) -> bool {
    matches!(name, ARGS_BINDING | DYNAMIC_IMPORT_BINDING | EXPORT_SLOT)
}

fn rewrite_dynamic_import(expr: &mut Expr) {
    if let Expr::Import(source) = expr {
        let source = std::mem::replace(source.as_mut(), Expr::Null);
        *expr = Expr::Call {
            callee: Box::new(Expr::Ident(DYNAMIC_IMPORT_BINDING.to_string())),
            args: vec![source],
        };
    }
}
