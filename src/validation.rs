//! Shader validation using the naga library.

use anyhow::{anyhow, Context, Result};

use crate::context::Dialect;
use crate::emit::ProgramBundle;

/// Validate WGSL source code using naga's parser.
///
/// Returns the parsed naga Module on success, or an error carrying the
/// numbered source listing on failure.
pub fn validate_wgsl(source: &str) -> Result<naga::Module> {
    naga::front::wgsl::parse_str(source)
        .map_err(|e| anyhow!("WGSL validation failed:\n{}", format_naga_error(source, &e)))
}

#[derive(Debug, Clone, Copy)]
pub enum GlslShaderStage {
    Vertex,
    Fragment,
}

/// Validate a single GLSL stage: parse, then run naga's module validator.
pub fn validate_glsl(source: &str, stage: GlslShaderStage) -> Result<naga::Module> {
    let shader_stage = match stage {
        GlslShaderStage::Vertex => naga::ShaderStage::Vertex,
        GlslShaderStage::Fragment => naga::ShaderStage::Fragment,
    };

    let mut parser = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options {
        stage: shader_stage,
        defines: Default::default(),
    };

    let module = parser
        .parse(&options, source)
        .map_err(|e| anyhow!("GLSL parse failed: {e:?}\n{}", numbered_source(source)))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| anyhow!("GLSL validation failed: {e:?}"))?;

    Ok(module)
}

/// Validate every stage of an emitted bundle for its dialect.
pub fn validate_bundle(bundle: &ProgramBundle, dialect: Dialect) -> Result<()> {
    match dialect {
        Dialect::Wgsl => {
            let module = bundle
                .module
                .as_deref()
                .ok_or_else(|| anyhow!("WGSL bundle is missing its combined module"))?;
            validate_wgsl(module).context("combined module")?;
        }
        Dialect::Glsl => {
            validate_glsl(&bundle.vertex, GlslShaderStage::Vertex).context("vertex stage")?;
            validate_glsl(&bundle.fragment, GlslShaderStage::Fragment)
                .context("fragment stage")?;
        }
    }
    Ok(())
}

/// Format a naga parse error together with the numbered source, so a bad
/// generated program is readable straight from the error message.
fn format_naga_error(source: &str, error: &naga::front::wgsl::ParseError) -> String {
    let mut output = String::new();
    output.push_str(&format!("  {}\n", error));
    output.push_str("\nGenerated WGSL:\n");
    output.push_str(&numbered_source(source));
    output
}

fn numbered_source(source: &str) -> String {
    let mut output = String::from("---\n");
    for (line_num, line) in source.lines().enumerate() {
        output.push_str(&format!("{:4} | {}\n", line_num + 1, line));
    }
    output.push_str("---\n");
    output
}
