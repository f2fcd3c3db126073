use log::info;
use thiserror::Error;

use crate::ir::{ElementId, IrBuiltIns, IrTree};

pub mod checker;
pub mod config;
pub mod parents;
pub mod reporter;
pub mod scope;
pub mod walker;


pub use checker::CheckIrElement;
pub use config::{ConfigError, IrValidatorConfig, ValidationSettings, VerificationMode};
pub use parents::{
    MissingChild, ParentMismatch, ParentReport, audit_declaration_parents, check_declaration_parents,
};
pub use reporter::{AriadneSink, CollectingSink, Diagnostic, DiagnosticSink, Reporter, SinkError};
pub use scope::ScopeValidator;
pub use walker::IrValidator;

/// What happens to a violation once it has been handed to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationMode {
    Warn,
    Abort,
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Validation failed in file {file} : {message}\n{rendering}")]
    Violation {
        file: String,
        message: String,
        rendering: String,
    },
    #[error("{0}")]
    WrongParents(ParentReport),
}

/// Callback through which checkers report a violation on an element.
pub type ReportFn<'a> = dyn FnMut(ElementId, &str) -> Result<(), ValidationError> + 'a;

/// Walks `root` once with the given configuration. Returns the number of
/// violations reported; in abort mode the first violation is returned as an
/// error instead.
pub fn validate_ir(
    tree: &IrTree,
    root: ElementId,
    builtins: &IrBuiltIns,
    config: &IrValidatorConfig,
    mode: EscalationMode,
    sink: &mut dyn DiagnosticSink,
) -> Result<usize, ValidationError> {
    let mut validator = IrValidator::new(tree, builtins, config, mode, sink);
    validator.validate(root)?;
    Ok(validator.reported())
}

/// Verifies common IR invariants that should hold in all the backends.
pub fn perform_basic_ir_validation(
    tree: &IrTree,
    root: ElementId,
    builtins: &IrBuiltIns,
    mode: VerificationMode,
    check_properties: bool,
    check_types: bool,
    sink: &mut dyn DiagnosticSink,
) -> Result<(), ValidationError> {
    let Some(escalation) = mode.escalation() else {
        return Ok(());
    };

    let config = IrValidatorConfig {
        ensure_all_nodes_are_different: true,
        check_types,
        check_descriptors: false,
        check_properties,
        check_scopes: false,
    };
    let reported = validate_ir(tree, root, builtins, &config, escalation, sink)?;
    if reported > 0 {
        info!("IR validation of {} reported {} violation(s)", tree.render(root), reported);
    }
    check_declaration_parents(tree, root)
}
