use ariadne::{ColorGenerator, Config, Label, Report, ReportKind, Source};
use log::error;
use thiserror::Error;

use std::io::Write;

use crate::ir::{ElementId, IrTree};
use crate::validation::{EscalationMode, ValidationError};

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to write diagnostic: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot render missing element {0}")]
    MissingElement(ElementId),
}

/// Receives every invariant violation found by the validator.
pub trait DiagnosticSink {
    fn report(
        &mut self,
        tree: &IrTree,
        file: Option<ElementId>,
        element: ElementId,
        message: &str,
    ) -> Result<(), SinkError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub file: Option<String>,
    pub element: ElementId,
    pub message: String,
}

/// Keeps diagnostics in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub diagnostics: Vec<Diagnostic>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.diagnostics.iter().map(|d| d.message.as_str()).collect()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(
        &mut self,
        tree: &IrTree,
        file: Option<ElementId>,
        element: ElementId,
        message: &str,
    ) -> Result<(), SinkError> {
        self.diagnostics.push(Diagnostic {
            file: file
                .and_then(|file| tree.file(file))
                .map(|file| file.name.clone()),
            element,
            message: message.to_string(),
        });
        Ok(())
    }
}

/// Renders each diagnostic as an ariadne warning against the source text
/// the tree was read from.
pub struct AriadneSink<W: Write> {
    source_name: String,
    source: Source<String>,
    writer: W,
    color: bool,
}

impl<W: Write> AriadneSink<W> {
    pub fn new(source_name: impl Into<String>, source: impl Into<String>, writer: W) -> Self {
        AriadneSink {
            source_name: source_name.into(),
            source: Source::from(source.into()),
            writer,
            color: true,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DiagnosticSink for AriadneSink<W> {
    fn report(
        &mut self,
        tree: &IrTree,
        file: Option<ElementId>,
        element: ElementId,
        message: &str,
    ) -> Result<(), SinkError> {
        let span = tree
            .get(element)
            .map(|element| element.span.clone())
            .ok_or(SinkError::MissingElement(element))?;
        let file_name = file
            .and_then(|file| tree.file(file))
            .map(|file| file.name.as_str())
            .unwrap_or("???");

        let mut colors = ColorGenerator::new();
        Report::build(ReportKind::Warning, (self.source_name.clone(), span.clone()))
            .with_config(Config::default().with_color(self.color))
            .with_code("IR VALIDATION")
            .with_message(message)
            .with_label(
                Label::new((self.source_name.clone(), span))
                    .with_message(tree.render(element))
                    .with_color(colors.next()),
            )
            .with_note(format!("in file {}", file_name))
            .finish()
            .write(
                (self.source_name.clone(), self.source.clone()),
                &mut self.writer,
            )?;
        Ok(())
    }
}

/// Escalation policy for one validation run.
pub struct Reporter<'s> {
    mode: EscalationMode,
    sink: &'s mut dyn DiagnosticSink,
    reported: usize,
}

impl<'s> Reporter<'s> {
    pub fn new(mode: EscalationMode, sink: &'s mut dyn DiagnosticSink) -> Self {
        Reporter {
            mode,
            sink,
            reported: 0,
        }
    }

    pub fn mode(&self) -> EscalationMode {
        self.mode
    }

    pub fn reported(&self) -> usize {
        self.reported
    }

    /// Forwards a violation to the sink. A failing sink is logged and never
    /// replaces the violation; in abort mode the violation is returned as a
    /// fatal error.
    pub fn report(
        &mut self,
        tree: &IrTree,
        file: Option<ElementId>,
        element: ElementId,
        message: &str,
    ) -> Result<(), ValidationError> {
        self.reported += 1;

        if let Err(err) = self.sink.report(tree, file, element, message) {
            error!("an error trying to print a warning message: {}", err);
        }

        match self.mode {
            EscalationMode::Warn => Ok(()),
            EscalationMode::Abort => Err(ValidationError::Violation {
                file: file
                    .and_then(|file| tree.file(file))
                    .map(|file| file.name.clone())
                    .unwrap_or_else(|| "???".to_string()),
                message: message.to_string(),
                rendering: tree.render(element),
            }),
        }
    }
}
