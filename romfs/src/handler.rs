//! Error-handler seams.
//!
//! Loading functions never build error values for their callers. They hand
//! the details to a handler and return [`LoadFailed`], so one handler can
//! gather every problem found during a long load (for a report) or log and
//! continue.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use byml_serialization::ContentErrors;
use byml_value::NodeType;
use tracing::{debug, warn};

use crate::codec::CompressionError;
use crate::gyml::types::StageCategory;
use crate::location::RetrievedFileLocation;
use crate::stage_bcett::StageValidationReport;
use crate::system::MissingSystemFile;

/// The failure details have already been delivered to a handler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadFailed;

impl fmt::Display for LoadFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "load failed")
    }
}

impl std::error::Error for LoadFailed {}

pub trait FileLoadingErrorHandler {
    fn on_decompression_failed(&mut self, path: &Path, error: &CompressionError);
    fn on_format_read_failed(
        &mut self,
        location: &RetrievedFileLocation,
        error: &dyn std::error::Error,
    );
    fn on_file_read_failed(&mut self, path: &Path, error: &io::Error);
}

pub trait DocumentErrorHandler {
    fn on_root_type_mismatch(
        &mut self,
        location: &RetrievedFileLocation,
        expected: NodeType,
        actual: NodeType,
    );
    fn on_content_errors(&mut self, location: &RetrievedFileLocation, errors: &ContentErrors);
}

pub trait FileResolutionErrorHandler: FileLoadingErrorHandler {
    fn on_file_not_found(&mut self, path: &str, searched: &[RetrievedFileLocation]);
}

pub trait DocumentLoadingErrorHandler: FileResolutionErrorHandler + DocumentErrorHandler {}

impl<T: FileResolutionErrorHandler + DocumentErrorHandler + ?Sized> DocumentLoadingErrorHandler
    for T
{
}

pub trait GymlLoadingErrorHandler: DocumentLoadingErrorHandler {
    /// `chain` runs from the requested file towards the root; the parent of
    /// its last element is `chain[cycle_index]`.
    fn on_cyclic_inheritance(
        &mut self,
        chain: &[(String, RetrievedFileLocation)],
        cycle_index: usize,
    );
    fn on_gyml_type_mismatch(
        &mut self,
        path: &str,
        expected: &'static str,
        already_loaded: &'static str,
        location: &RetrievedFileLocation,
    );
}

pub trait StageLoadingErrorHandler: GymlLoadingErrorHandler {
    fn on_stage_validation_failed(&mut self, report: &StageValidationReport);
    fn on_missing_required_component(&mut self, name: &str, location: &RetrievedFileLocation);
    fn on_unexpected_category(
        &mut self,
        actual: StageCategory,
        expected: Option<StageCategory>,
        location: &RetrievedFileLocation,
    );
}

pub trait RomFsLoadErrorHandler: FileLoadingErrorHandler + DocumentErrorHandler {
    fn on_base_and_mod_paths_identical(&mut self, path: &Path);
    fn on_root_directory_not_found(&mut self, directory: &Path);
    fn on_missing_sub_directory(&mut self, root: &Path, sub_directory: &str);
    fn on_missing_system_file(&mut self, missing: &MissingSystemFile);
}

/// One delivered problem, owned.
#[derive(Clone, Debug, PartialEq)]
pub enum ErrorReport {
    DecompressionFailed {
        path: PathBuf,
        message: String,
    },
    FormatReadFailed {
        location: RetrievedFileLocation,
        message: String,
    },
    FileReadFailed {
        path: PathBuf,
        message: String,
    },
    RootTypeMismatch {
        location: RetrievedFileLocation,
        expected: NodeType,
        actual: NodeType,
    },
    ContentErrors {
        location: RetrievedFileLocation,
        errors: ContentErrors,
    },
    FileNotFound {
        path: String,
        searched: Vec<RetrievedFileLocation>,
    },
    CyclicInheritance {
        chain: Vec<(String, RetrievedFileLocation)>,
        cycle_index: usize,
    },
    GymlTypeMismatch {
        path: String,
        expected: &'static str,
        already_loaded: &'static str,
        location: RetrievedFileLocation,
    },
    StageValidationFailed(StageValidationReport),
    MissingRequiredComponent {
        name: String,
        location: RetrievedFileLocation,
    },
    UnexpectedCategory {
        actual: StageCategory,
        expected: Option<StageCategory>,
        location: RetrievedFileLocation,
    },
    BaseAndModPathsIdentical {
        path: PathBuf,
    },
    RootDirectoryNotFound {
        directory: PathBuf,
    },
    MissingSubDirectory {
        root: PathBuf,
        sub_directory: String,
    },
    MissingSystemFile(MissingSystemFile),
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorReport::DecompressionFailed { path, message } => {
                write!(f, "decompression failed for {}: {}", path.display(), message)
            }
            ErrorReport::FormatReadFailed { location, message } => {
                write!(f, "could not read {}: {}", location, message)
            }
            ErrorReport::FileReadFailed { path, message } => {
                write!(f, "io error reading {}: {}", path.display(), message)
            }
            ErrorReport::RootTypeMismatch {
                location,
                expected,
                actual,
            } => write!(
                f,
                "{}: root is a {} node, expected {}",
                location, actual, expected
            ),
            ErrorReport::ContentErrors { location, errors } => {
                writeln!(f, "{}: {} content error(s)", location, errors.len())?;
                write!(f, "{}", errors)
            }
            ErrorReport::FileNotFound { path, searched } => {
                write!(f, "file not found: {} (searched", path)?;
                for location in searched {
                    write!(f, " {}", location)?;
                }
                write!(f, ")")
            }
            ErrorReport::CyclicInheritance { chain, cycle_index } => {
                write!(f, "cyclic inheritance:")?;
                for (path, _) in chain {
                    write!(f, " {} ->", path)?;
                }
                match chain.get(*cycle_index) {
                    Some((path, _)) => write!(f, " {}", path),
                    None => write!(f, " <index {}>", cycle_index),
                }
            }
            ErrorReport::GymlTypeMismatch {
                path,
                expected,
                already_loaded,
                location,
            } => write!(
                f,
                "{} ({}) requested as {} but already loaded as {}",
                path, location, expected, already_loaded
            ),
            ErrorReport::StageValidationFailed(report) => write!(f, "{}", report),
            ErrorReport::MissingRequiredComponent { name, location } => {
                write!(f, "{}: missing required component {}", location, name)
            }
            ErrorReport::UnexpectedCategory {
                actual,
                expected,
                location,
            } => match expected {
                Some(expected) => write!(
                    f,
                    "{}: stage category {} where {} was expected",
                    location, actual, expected
                ),
                None => write!(f, "{}: unsupported stage category {}", location, actual),
            },
            ErrorReport::BaseAndModPathsIdentical { path } => write!(
                f,
                "base and mod romfs are the same directory: {}",
                path.display()
            ),
            ErrorReport::RootDirectoryNotFound { directory } => {
                write!(f, "romfs directory not found: {}", directory.display())
            }
            ErrorReport::MissingSubDirectory {
                root,
                sub_directory,
            } => write!(
                f,
                "romfs {} has no {} directory",
                root.display(),
                sub_directory
            ),
            ErrorReport::MissingSystemFile(missing) => write!(f, "{}", missing),
        }
    }
}

/// Keeps every report in delivery order.
#[derive(Debug, Default)]
pub struct CollectingErrorHandler {
    pub reports: Vec<ErrorReport>,
}

impl CollectingErrorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn take(&mut self) -> Vec<ErrorReport> {
        std::mem::take(&mut self.reports)
    }

    fn push(&mut self, report: ErrorReport) {
        debug!(report = %report, "error reported");
        self.reports.push(report);
    }
}

impl FileLoadingErrorHandler for CollectingErrorHandler {
    fn on_decompression_failed(&mut self, path: &Path, error: &CompressionError) {
        self.push(ErrorReport::DecompressionFailed {
            path: path.to_path_buf(),
            message: error.to_string(),
        });
    }

    fn on_format_read_failed(
        &mut self,
        location: &RetrievedFileLocation,
        error: &dyn std::error::Error,
    ) {
        self.push(ErrorReport::FormatReadFailed {
            location: location.clone(),
            message: error.to_string(),
        });
    }

    fn on_file_read_failed(&mut self, path: &Path, error: &io::Error) {
        self.push(ErrorReport::FileReadFailed {
            path: path.to_path_buf(),
            message: error.to_string(),
        });
    }
}

impl DocumentErrorHandler for CollectingErrorHandler {
    fn on_root_type_mismatch(
        &mut self,
        location: &RetrievedFileLocation,
        expected: NodeType,
        actual: NodeType,
    ) {
        self.push(ErrorReport::RootTypeMismatch {
            location: location.clone(),
            expected,
            actual,
        });
    }

    fn on_content_errors(&mut self, location: &RetrievedFileLocation, errors: &ContentErrors) {
        self.push(ErrorReport::ContentErrors {
            location: location.clone(),
            errors: errors.clone(),
        });
    }
}

impl FileResolutionErrorHandler for CollectingErrorHandler {
    fn on_file_not_found(&mut self, path: &str, searched: &[RetrievedFileLocation]) {
        self.push(ErrorReport::FileNotFound {
            path: path.to_string(),
            searched: searched.to_vec(),
        });
    }
}

impl GymlLoadingErrorHandler for CollectingErrorHandler {
    fn on_cyclic_inheritance(
        &mut self,
        chain: &[(String, RetrievedFileLocation)],
        cycle_index: usize,
    ) {
        self.push(ErrorReport::CyclicInheritance {
            chain: chain.to_vec(),
            cycle_index,
        });
    }

    fn on_gyml_type_mismatch(
        &mut self,
        path: &str,
        expected: &'static str,
        already_loaded: &'static str,
        location: &RetrievedFileLocation,
    ) {
        self.push(ErrorReport::GymlTypeMismatch {
            path: path.to_string(),
            expected,
            already_loaded,
            location: location.clone(),
        });
    }
}

impl StageLoadingErrorHandler for CollectingErrorHandler {
    fn on_stage_validation_failed(&mut self, report: &StageValidationReport) {
        self.push(ErrorReport::StageValidationFailed(report.clone()));
    }

    fn on_missing_required_component(&mut self, name: &str, location: &RetrievedFileLocation) {
        self.push(ErrorReport::MissingRequiredComponent {
            name: name.to_string(),
            location: location.clone(),
        });
    }

    fn on_unexpected_category(
        &mut self,
        actual: StageCategory,
        expected: Option<StageCategory>,
        location: &RetrievedFileLocation,
    ) {
        self.push(ErrorReport::UnexpectedCategory {
            actual,
            expected,
            location: location.clone(),
        });
    }
}

impl RomFsLoadErrorHandler for CollectingErrorHandler {
    fn on_base_and_mod_paths_identical(&mut self, path: &Path) {
        self.push(ErrorReport::BaseAndModPathsIdentical {
            path: path.to_path_buf(),
        });
    }

    fn on_root_directory_not_found(&mut self, directory: &Path) {
        self.push(ErrorReport::RootDirectoryNotFound {
            directory: directory.to_path_buf(),
        });
    }

    fn on_missing_sub_directory(&mut self, root: &Path, sub_directory: &str) {
        self.push(ErrorReport::MissingSubDirectory {
            root: root.to_path_buf(),
            sub_directory: sub_directory.to_string(),
        });
    }

    fn on_missing_system_file(&mut self, missing: &MissingSystemFile) {
        self.push(ErrorReport::MissingSystemFile(missing.clone()));
    }
}

/// Emits each report as a `warn!` event and counts them.
#[derive(Debug, Default)]
pub struct LoggingErrorHandler {
    pub reported: usize,
}

impl LoggingErrorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit(&mut self, report: ErrorReport) {
        self.reported += 1;
        warn!("{}", report);
    }
}

impl FileLoadingErrorHandler for LoggingErrorHandler {
    fn on_decompression_failed(&mut self, path: &Path, error: &CompressionError) {
        self.emit(ErrorReport::DecompressionFailed {
            path: path.to_path_buf(),
            message: error.to_string(),
        });
    }

    fn on_format_read_failed(
        &mut self,
        location: &RetrievedFileLocation,
        error: &dyn std::error::Error,
    ) {
        self.emit(ErrorReport::FormatReadFailed {
            location: location.clone(),
            message: error.to_string(),
        });
    }

    fn on_file_read_failed(&mut self, path: &Path, error: &io::Error) {
        self.emit(ErrorReport::FileReadFailed {
            path: path.to_path_buf(),
            message: error.to_string(),
        });
    }
}

impl DocumentErrorHandler for LoggingErrorHandler {
    fn on_root_type_mismatch(
        &mut self,
        location: &RetrievedFileLocation,
        expected: NodeType,
        actual: NodeType,
    ) {
        self.emit(ErrorReport::RootTypeMismatch {
            location: location.clone(),
            expected,
            actual,
        });
    }

    fn on_content_errors(&mut self, location: &RetrievedFileLocation, errors: &ContentErrors) {
        self.reported += 1;
        for (path, error) in errors {
            warn!(location = %location, path = %path, "{}", error);
        }
    }
}

impl FileResolutionErrorHandler for LoggingErrorHandler {
    fn on_file_not_found(&mut self, path: &str, searched: &[RetrievedFileLocation]) {
        self.emit(ErrorReport::FileNotFound {
            path: path.to_string(),
            searched: searched.to_vec(),
        });
    }
}

impl GymlLoadingErrorHandler for LoggingErrorHandler {
    fn on_cyclic_inheritance(
        &mut self,
        chain: &[(String, RetrievedFileLocation)],
        cycle_index: usize,
    ) {
        self.emit(ErrorReport::CyclicInheritance {
            chain: chain.to_vec(),
            cycle_index,
        });
    }

    fn on_gyml_type_mismatch(
        &mut self,
        path: &str,
        expected: &'static str,
        already_loaded: &'static str,
        location: &RetrievedFileLocation,
    ) {
        self.emit(ErrorReport::GymlTypeMismatch {
            path: path.to_string(),
            expected,
            already_loaded,
            location: location.clone(),
        });
    }
}

impl StageLoadingErrorHandler for LoggingErrorHandler {
    fn on_stage_validation_failed(&mut self, report: &StageValidationReport) {
        self.reported += 1;
        for issue in &report.issues {
            warn!(fragment = %report.fragment, "{}", issue);
        }
    }

    fn on_missing_required_component(&mut self, name: &str, location: &RetrievedFileLocation) {
        self.emit(ErrorReport::MissingRequiredComponent {
            name: name.to_string(),
            location: location.clone(),
        });
    }

    fn on_unexpected_category(
        &mut self,
        actual: StageCategory,
        expected: Option<StageCategory>,
        location: &RetrievedFileLocation,
    ) {
        self.emit(ErrorReport::UnexpectedCategory {
            actual,
            expected,
            location: location.clone(),
        });
    }
}

impl RomFsLoadErrorHandler for LoggingErrorHandler {
    fn on_base_and_mod_paths_identical(&mut self, path: &Path) {
        self.emit(ErrorReport::BaseAndModPathsIdentical {
            path: path.to_path_buf(),
        });
    }

    fn on_root_directory_not_found(&mut self, directory: &Path) {
        self.emit(ErrorReport::RootDirectoryNotFound {
            directory: directory.to_path_buf(),
        });
    }

    fn on_missing_sub_directory(&mut self, root: &Path, sub_directory: &str) {
        self.emit(ErrorReport::MissingSubDirectory {
            root: root.to_path_buf(),
            sub_directory: sub_directory.to_string(),
        });
    }

    fn on_missing_system_file(&mut self, missing: &MissingSystemFile) {
        self.emit(ErrorReport::MissingSystemFile(missing.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack_location() -> RetrievedFileLocation {
        RetrievedFileLocation::in_pack("Pack/Bootup.Nin_NX_NVN.pack.zs", "Work/A.gyml")
    }

    #[test]
    fn collecting_keeps_delivery_order() {
        let mut handler = CollectingErrorHandler::new();
        assert!(handler.is_empty());
        handler.on_missing_sub_directory(Path::new("/romfs"), "Pack");
        handler.on_file_not_found("Work/A.gyml", &[pack_location()]);
        handler.on_cyclic_inheritance(&[("Work/A.gyml".to_string(), pack_location())], 0);

        let reports = handler.take();
        assert!(handler.is_empty());
        assert_eq!(reports.len(), 3);
        assert!(matches!(
            &reports[0],
            ErrorReport::MissingSubDirectory { sub_directory, .. } if sub_directory == "Pack"
        ));
        assert!(matches!(&reports[1], ErrorReport::FileNotFound { searched, .. } if searched.len() == 1));
        assert!(matches!(
            reports[2],
            ErrorReport::CyclicInheritance { cycle_index: 0, .. }
        ));
    }

    #[test]
    fn logging_counts_reports() {
        let mut handler = LoggingErrorHandler::new();
        handler.on_root_directory_not_found(Path::new("/missing"));
        handler.on_missing_required_component("Mumap", &pack_location());
        assert_eq!(handler.reported, 2);
    }

    #[test]
    fn report_messages_name_the_location() {
        let report = ErrorReport::UnexpectedCategory {
            actual: StageCategory::Area,
            expected: Some(StageCategory::WorldMap),
            location: pack_location(),
        };
        let message = report.to_string();
        assert!(message.starts_with("Pack/Bootup.Nin_NX_NVN.pack.zs:Work/A.gyml"));
        assert!(message.contains("Area"));
        assert!(message.contains("WorldMap"));

        let report = ErrorReport::CyclicInheritance {
            chain: vec![
                ("A".to_string(), pack_location()),
                ("B".to_string(), pack_location()),
            ],
            cycle_index: 0,
        };
        assert_eq!(report.to_string(), "cyclic inheritance: A -> B -> A");
    }
}
