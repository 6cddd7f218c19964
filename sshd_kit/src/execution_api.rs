//! # Policy Execution API
//!
//! Thin layer over the ESP pipeline (`compiler`, `execution_engine`) used by
//! [`crate::policy::EspPolicyExecutor`]. Callers build a
//! `CtnStrategyRegistry` and hand policy files to [`scan_file`].

use std::path::Path;
use std::sync::Arc;

use compiler::pipeline;
use execution_engine::conversion::convert_ast_to_scanner_types;
use execution_engine::execution::ExecutionEngine;
use execution_engine::resolution::engine::ResolutionEngine;
use execution_engine::types::ResolutionContext;

pub use execution_engine::strategies::{CtnStrategyRegistry, StrategyError};

// Execution result for one policy file
pub use execution_engine::execution::engine::PolicyExecutionResult as ScanResult;

/// Error type for scan operations
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Compilation failed: {0}")]
    CompilationFailed(String),
    #[error("AST conversion failed: {0}")]
    ConversionFailed(String),
    #[error("Resolution failed: {0}")]
    ResolutionFailed(String),
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// Compile, resolve and execute one ESP policy file.
///
/// # Returns
/// * `Ok(ScanResult)` - The scan completed (check `tree_passed` for compliance status)
/// * `Err(ScanError)` - The policy could not be compiled or executed
pub fn scan_file<P: AsRef<Path>>(
    path: P,
    registry: Arc<CtnStrategyRegistry>,
) -> Result<ScanResult, ScanError> {
    let path_str = path.as_ref().display().to_string();

    log::debug!("Compiling policy file {}", path_str);
    let pipeline_result = pipeline::process_file(&path_str)
        .map_err(|e| ScanError::CompilationFailed(e.to_string()))?;

    let (variables, states, objects, runtime_operations, sets, criteria_root, metadata) =
        convert_ast_to_scanner_types(&pipeline_result.ast)
            .map_err(|e| ScanError::ConversionFailed(e.to_string()))?;

    let mut resolution_context = ResolutionContext::from_ast_with_criteria_root(
        variables,
        states,
        objects,
        runtime_operations,
        sets,
        criteria_root,
        metadata,
    );

    let mut resolution_engine = ResolutionEngine::new();
    let execution_context = resolution_engine
        .resolve_context(&mut resolution_context)
        .map_err(|e| ScanError::ResolutionFailed(e.to_string()))?;

    log::debug!(
        "Executing policy file {} ({} criteria)",
        path_str,
        execution_context.count_criteria()
    );
    let mut engine = ExecutionEngine::new(execution_context, registry);
    let manifest = engine
        .execute()
        .map_err(|e| ScanError::ExecutionFailed(e.to_string()))?;

    Ok(manifest.into())
}
