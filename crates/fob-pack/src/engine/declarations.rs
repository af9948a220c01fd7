//! Type declaration output through oxc isolated declarations.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use oxc_isolated_declarations::{IsolatedDeclarations, IsolatedDeclarationsOptions};
use oxc_parser::Parser;
use oxc_span::SourceType as OxcSourceType;

use super::{BundleGraph, BundleRequest, WriteOptions, wrap_code, writer};
use crate::pipeline::DtsOptions;

/// Generate the declaration file for one TypeScript module.
///
/// # Errors
///
/// Returns an error if the path has no TypeScript-compatible extension, the
/// source does not parse, or a declaration cannot be derived without type
/// inference (for example an exported function without a return type).
pub fn generate_declarations(source: &str, path: &Path, strip_internal: bool) -> Result<String> {
    let allocator = Allocator::default();

    let source_type = OxcSourceType::from_path(path)
        .with_context(|| format!("Invalid TypeScript file: {}", path.display()))?;

    let parsed = Parser::new(&allocator, source, source_type).parse();
    if !parsed.errors.is_empty() {
        let messages: Vec<String> = parsed.errors.iter().map(|e| e.to_string()).collect();
        anyhow::bail!(
            "Failed to parse {}: {}",
            path.display(),
            messages.join(", ")
        );
    }

    let dts = IsolatedDeclarations::new(&allocator, IsolatedDeclarationsOptions { strip_internal })
        .build(&parsed.program);
    if !dts.errors.is_empty() {
        let messages: Vec<String> = dts.errors.iter().map(|e| e.to_string()).collect();
        anyhow::bail!(
            "Errors generating declarations for {}: {}",
            path.display(),
            messages.join(", ")
        );
    }

    Ok(Codegen::new().build(&dts.program).code)
}

/// Build a declaration graph for `request`, reading the input eagerly.
pub(super) async fn bundle_declarations(
    request: &BundleRequest,
    options: &DtsOptions,
) -> Result<Box<dyn BundleGraph>> {
    let source = tokio::fs::read_to_string(&request.input)
        .await
        .with_context(|| format!("Failed to read {}", request.input.display()))?;
    let code = generate_declarations(&source, &request.input, options.strip_internal)?;

    tracing::debug!(
        input = %request.input.display(),
        bytes = code.len(),
        "Generated declarations"
    );
    Ok(Box::new(DeclarationGraph { code }))
}

/// Declarations for one module, held until written.
#[derive(Debug)]
struct DeclarationGraph {
    code: String,
}

#[async_trait]
impl BundleGraph for DeclarationGraph {
    async fn write(&mut self, options: &WriteOptions) -> Result<()> {
        let code = wrap_code(
            &self.code,
            options.banner.as_deref(),
            options.footer.as_deref(),
        );
        writer::write_output(&options.file, code.as_bytes()).await
    }
}
