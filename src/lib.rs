//! Node-graph shader lowering.
//!
//! Materials are authored as a DAG of typed operation nodes whose edges
//! carry a small routing algebra (sign flip plus component swizzle). Per
//! rendering context the graph is expanded with its derived-quantity
//! dependencies, scheduled into registers, and emitted as WGSL or GLSL
//! source. A structural signature over the expanded graph and context keys
//! a program cache, so equivalent graphs share one compilation.
//!
//! ```no_run
//! use shadegraph::{Compiler, CompileContext, Dialect, Graph, SharedTextures};
//! use shadegraph::algebra::Swizzle;
//! use shadegraph::kinds::NodeKind;
//! # fn shared() -> SharedTextures { unimplemented!() }
//!
//! # fn main() -> Result<(), shadegraph::CompileError> {
//! let mut graph = Graph::new();
//! let color = graph.add_node(NodeKind::ConstantColor { rgba: [1.0, 0.0, 0.0, 1.0] });
//! let out = graph.add_node(NodeKind::OutputColor);
//! graph.connect(color, out, 0, false, Swizzle::IDENTITY)?;
//!
//! let compiler = Compiler::new();
//! let ctx = CompileContext::new(shared());
//! let (program, _hit) = compiler.compile(&graph, &ctx, Dialect::Wgsl)?;
//! println!("{}", program.bundle.fragment);
//! # Ok(())
//! # }
//! ```

pub mod algebra;
pub mod cache;
pub mod context;
pub mod emit;
pub mod error;
pub mod expand;
pub mod graph;
pub mod kinds;
pub mod schedule;
pub mod serialize;
pub mod signature;
pub mod validation;

use std::sync::Arc;

use tracing::debug;

pub use cache::{CompiledProgram, ProgramCache};
pub use context::{CompileContext, DetailLevel, Dialect, LightKind, SharedTextures, TextureRef};
pub use emit::ProgramBundle;
pub use error::{CompileError, DecodeError, GraphError};
pub use graph::{Graph, NodeId};
pub use signature::Signature;

/// Computes the structural signature a compilation of `graph` under `ctx`
/// would be cached under, without compiling.
pub fn signature(graph: &Graph, ctx: &CompileContext) -> Result<Signature, CompileError> {
    let mut expanded = graph.clone();
    let terminal = expand::expand(&mut expanded, ctx)?;
    signature::expanded_signature(&expanded, ctx, terminal)
}

/// One-shot compilation, bypassing any cache.
pub fn compile_uncached(
    graph: &Graph,
    ctx: &CompileContext,
    dialect: Dialect,
) -> Result<CompiledProgram, CompileError> {
    let mut expanded = graph.clone();
    let terminal = expand::expand(&mut expanded, ctx)?;
    let signature = signature::expanded_signature(&expanded, ctx, terminal)?;
    let allocation = schedule::schedule(&expanded, ctx, terminal)?;
    let bundle = emit::emit(&expanded, ctx, dialect, &allocation)?;
    Ok(CompiledProgram {
        signature,
        dialect,
        bundle,
        allocation,
    })
}

/// The compilation front door: expansion, signature, cache lookup, and on a
/// miss the schedule and emit passes.
#[derive(Default)]
pub struct Compiler {
    cache: ProgramCache,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &ProgramCache {
        &self.cache
    }

    /// Compiles `graph` for `(ctx, dialect)`, reusing the cached program
    /// when an equivalent one was already built. The flag reports a hit.
    pub fn compile(
        &self,
        graph: &Graph,
        ctx: &CompileContext,
        dialect: Dialect,
    ) -> Result<(Arc<CompiledProgram>, bool), CompileError> {
        let mut expanded = graph.clone();
        let terminal = expand::expand(&mut expanded, ctx)?;
        let sig = signature::expanded_signature(&expanded, ctx, terminal)?;
        self.cache.get_or_compile(&sig, dialect, || {
            let allocation = schedule::schedule(&expanded, ctx, terminal)?;
            let bundle = emit::emit(&expanded, ctx, dialect, &allocation)?;
            debug!(
                registers = allocation.register_count,
                textures = allocation.textures.len(),
                interpolants = allocation.interpolants.len(),
                ?dialect,
                "compiled program"
            );
            Ok(CompiledProgram {
                signature: sig.clone(),
                dialect,
                bundle,
                allocation,
            })
        })
    }
}
