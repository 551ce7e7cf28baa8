use std::ops::Range;
use std::path::PathBuf;

/// Source information for where a diagnostic came from
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub file_path: PathBuf,
    pub content: String,
}

/// A span within one config file
#[derive(Debug, Clone)]
pub struct SourceLocation {
    pub file_path: PathBuf,
    pub span: Range<usize>,
    pub content: String,
}

impl SourceLocation {
    pub fn new(source: &SourceInfo, span: Range<usize>) -> Self {
        Self {
            file_path: source.file_path.clone(),
            span,
            content: source.content.clone(),
        }
    }
}

/// A diagnostic message that can be either a warning or an error
#[derive(Debug, Clone)]
pub enum Diagnostic {
    Warning(Warning),
    Error(Error),
}

/// Warning messages that don't prevent config loading
#[derive(Debug, Clone)]
pub enum Warning {
    EmptyConfig { file_path: PathBuf },

    /// A value was out of range or not a number and has been replaced.
    Adjusted {
        field_path: String,
        message: String,
        location: Option<SourceLocation>,
    },
}

/// Error messages that indicate problems with the config
#[derive(Debug, Clone)]
pub enum Error {
    Merge(MergeError),
    Validation(ValidationError),
}

/// Error type for merge conflicts
#[derive(Debug, Clone)]
pub struct MergeError {
    pub field_path: String,
    pub message: String,
    pub conflicts: Vec<SourceLocation>,
}

/// Error type for validation failures
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field_path: String,
    pub message: String,
    pub location: Option<SourceLocation>,
}

/// Error type for config loading failures (parse errors, IO errors, etc.)
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read '{}': {error}", path.display())]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Failed to parse '{}': {error}", path.display())]
    Parse {
        path: PathBuf,
        error: toml::de::Error,
    },

    #[error("Import cycle detected at '{}': involves {} file(s)", path.display(), cycle.len())]
    ImportCycle { path: PathBuf, cycle: Vec<PathBuf> },
}

impl Diagnostic {
    /// Returns true if this diagnostic is an error
    pub fn is_error(&self) -> bool {
        matches!(self, Diagnostic::Error(_))
    }

    /// Returns true if this diagnostic is a warning
    pub fn is_warning(&self) -> bool {
        matches!(self, Diagnostic::Warning(_))
    }
}

/// Format all diagnostics for display using Ariadne
pub fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    use ariadne::Color;
    use ariadne::Label;
    use ariadne::Report;
    use ariadne::ReportKind;
    use ariadne::Source;

    let mut output = Vec::new();

    // Single-span report, or a plain line when we don't know where the value came from
    let write_spanned = |kind: ReportKind<'static>,
                             title: String,
                             message: &str,
                             color: Color,
                             location: Option<&SourceLocation>,
                             output: &mut Vec<u8>| {
        let Some(location) = location else {
            output.extend_from_slice(format!("{}: {}\n", title, message).as_bytes());
            return;
        };
        let file_id = location.file_path.to_string_lossy().to_string();
        Report::build(kind, (file_id.clone(), location.span.clone()))
            .with_message(title)
            .with_label(
                Label::new((file_id.clone(), location.span.clone()))
                    .with_message(message)
                    .with_color(color),
            )
            .finish()
            .write((file_id, Source::from(&location.content)), &mut *output)
            .ok();
    };

    for diagnostic in diagnostics {
        match diagnostic {
            Diagnostic::Warning(Warning::EmptyConfig { file_path }) => {
                let warning_msg = format!(
                    "Warning: Config file '{}' is empty and has no effect\n",
                    file_path.display()
                );
                output.extend_from_slice(warning_msg.as_bytes());
            }
            Diagnostic::Warning(Warning::Adjusted {
                field_path,
                message,
                location,
            }) => write_spanned(
                ReportKind::Warning,
                format!("Adjusted value of '{}'", field_path),
                message,
                Color::Yellow,
                location.as_ref(),
                &mut output,
            ),
            Diagnostic::Error(Error::Merge(merge_error)) => {
                // Build a report with the first conflict's span
                let first_conflict = &merge_error.conflicts[0];
                let mut report = Report::build(
                    ReportKind::Error,
                    (
                        first_conflict.file_path.to_string_lossy().to_string(),
                        first_conflict.span.clone(),
                    ),
                )
                .with_message(format!("Merge conflict in field '{}'", merge_error.field_path))
                .with_note(&merge_error.message);

                for (idx, conflict) in merge_error.conflicts.iter().enumerate() {
                    let label_msg = if idx == 0 {
                        "first definition here"
                    } else {
                        "conflicts with this definition"
                    };

                    report = report.with_label(
                        Label::new((
                            conflict.file_path.to_string_lossy().to_string(),
                            conflict.span.clone(),
                        ))
                        .with_message(label_msg)
                        .with_color(if idx == 0 { Color::Red } else { Color::Yellow }),
                    );
                }

                let finished_report = report.finish();

                // Write to each unique source file
                let mut written_files = std::collections::HashSet::new();
                for conflict in &merge_error.conflicts {
                    let file_id = conflict.file_path.to_string_lossy().to_string();
                    if written_files.insert(file_id.clone()) {
                        let source = Source::from(&conflict.content);
                        finished_report
                            .write((file_id, source), &mut output)
                            .ok();
                    }
                }
            }
            Diagnostic::Error(Error::Validation(validation_error)) => write_spanned(
                ReportKind::Error,
                format!("Validation error in '{}'", validation_error.field_path),
                &validation_error.message,
                Color::Red,
                validation_error.location.as_ref(),
                &mut output,
            ),
        }
    }

    String::from_utf8_lossy(&output).to_string()
}
