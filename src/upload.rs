//! Upload Screening
//!
//! Metadata checks for uploaded files, applied in order; the first violation
//! blocks:
//!
//! 1. extension on the denylist (`.exe .bat .php .js .sh .py`, any case)
//! 2. `..`, `/` or `\` in the filename
//! 3. NUL byte in the filename
//! 4. content larger than the size limit (10 MiB)
//!
//! Only the filename and length are inspected. Content is never sniffed, so a
//! renamed executable with an allowed extension passes; pair this gate with
//! magic-byte verification where that matters.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::observability::{default_sink, preview_payload, EventRecord, EventSink, SecurityEvent};
use crate::sanitize::ThreatLevel;

/// Default upload size limit: 10 MiB
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 10 * 1024 * 1024;

/// Default extension denylist
pub const DEFAULT_DENIED_EXTENSIONS: &[&str] = &[".exe", ".bat", ".php", ".js", ".sh", ".py"];

// ============================================================================
// Descriptor and Decision
// ============================================================================

/// An uploaded file as received from the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Client-supplied filename
    pub name: String,
    /// File bytes
    pub content: Vec<u8>,
    /// Client-supplied MIME type, untrusted
    pub declared_content_type: String,
}

impl FileDescriptor {
    /// Describe an upload
    pub fn new(
        name: impl Into<String>,
        content: impl Into<Vec<u8>>,
        declared_content_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            declared_content_type: declared_content_type.into(),
        }
    }

    /// Lowercased extension including the dot, if the name has one
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.name)
    }

    /// Content length in bytes
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// Extension of the last path component, e.g. `.exe` for `dir/a.tar.EXE`
fn extension_of(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let dot = base.rfind('.')?;
    let ext = &base[dot..];
    (ext.len() > 1).then(|| ext.to_lowercase())
}

/// Rule an upload broke
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadViolation {
    /// Extension on the denylist
    DangerousExtension(String),
    /// Directory components or `..` in the filename
    PathTraversal,
    /// NUL byte in the filename
    NullByte,
    /// Content over the size limit
    FileTooLarge {
        /// Actual size in bytes
        size: u64,
        /// Limit in bytes
        limit: u64,
    },
}

impl UploadViolation {
    /// Stable code for logs and [`FileDecision::violations`]
    pub fn code(&self) -> &'static str {
        match self {
            Self::DangerousExtension(_) => "dangerous_extension",
            Self::PathTraversal => "path_traversal",
            Self::NullByte => "null_byte",
            Self::FileTooLarge { .. } => "file_too_large",
        }
    }

    /// Severity of the violation
    pub fn threat_level(&self) -> ThreatLevel {
        match self {
            Self::DangerousExtension(_) | Self::PathTraversal | Self::NullByte => ThreatLevel::High,
            Self::FileTooLarge { .. } => ThreatLevel::Low,
        }
    }
}

impl fmt::Display for UploadViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DangerousExtension(ext) => write!(f, "Dangerous file extension: {ext}"),
            Self::PathTraversal => write!(f, "Path traversal detected in filename"),
            Self::NullByte => write!(f, "Null byte detected in filename"),
            Self::FileTooLarge { .. } => write!(f, "File too large"),
        }
    }
}

/// Upload gate verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDecision {
    /// Whether the upload must be refused
    pub blocked: bool,
    /// Human-readable verdict
    pub reason: String,
    /// Violation codes, in the order found
    pub violations: Vec<String>,
    /// Severity of what was found
    pub threat_level: ThreatLevel,
}

impl FileDecision {
    fn allowed() -> Self {
        Self {
            blocked: false,
            reason: "File validation passed".to_string(),
            violations: Vec::new(),
            threat_level: ThreatLevel::None,
        }
    }

    fn blocked(violation: &UploadViolation) -> Self {
        Self {
            blocked: true,
            reason: violation.to_string(),
            violations: vec![violation.code().to_string()],
            threat_level: violation.threat_level(),
        }
    }
}

// ============================================================================
// Policy
// ============================================================================

/// Upload limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Denied extensions, lowercase with the leading dot
    pub denied_extensions: Vec<String>,
    /// Largest accepted upload in bytes
    pub max_size: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            denied_extensions: DEFAULT_DENIED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            max_size: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }
}

impl UploadPolicy {
    /// Set the size limit
    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size = bytes;
        self
    }

    /// Add extensions to the denylist. A missing leading dot is added.
    pub fn deny_extensions(mut self, extensions: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        for ext in extensions {
            let ext = ext.as_ref().trim().to_lowercase();
            if ext.is_empty() {
                continue;
            }
            let ext = if ext.starts_with('.') { ext } else { format!(".{ext}") };
            if !self.denied_extensions.contains(&ext) {
                self.denied_extensions.push(ext);
            }
        }
        self
    }

    /// Whether `extension` (lowercase, with dot) is denied
    pub fn is_denied(&self, extension: &str) -> bool {
        self.denied_extensions.iter().any(|e| e == extension)
    }

    /// First rule `file` breaks, if any
    pub fn check(&self, file: &FileDescriptor) -> Option<UploadViolation> {
        if let Some(ext) = file.extension().filter(|ext| self.is_denied(ext)) {
            return Some(UploadViolation::DangerousExtension(ext));
        }

        if file.name.contains("..") || file.name.contains('/') || file.name.contains('\\') {
            return Some(UploadViolation::PathTraversal);
        }

        if file.name.contains('\0') {
            return Some(UploadViolation::NullByte);
        }

        if file.size() > self.max_size {
            return Some(UploadViolation::FileTooLarge {
                size: file.size(),
                limit: self.max_size,
            });
        }

        None
    }
}

// ============================================================================
// Gate
// ============================================================================

/// Screens uploads against an [`UploadPolicy`]
#[derive(Debug, Clone)]
pub struct FileUploadGate {
    policy: UploadPolicy,
    sink: Arc<dyn EventSink>,
}

impl Default for FileUploadGate {
    fn default() -> Self {
        Self::new(UploadPolicy::default(), default_sink())
    }
}

impl FileUploadGate {
    /// Create a gate reporting to `sink`
    pub fn new(policy: UploadPolicy, sink: Arc<dyn EventSink>) -> Self {
        Self { policy, sink }
    }

    /// The policy in force
    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Decide whether to accept `file`
    pub fn evaluate(&self, file: &FileDescriptor) -> FileDecision {
        match self.policy.check(file) {
            Some(violation) => {
                let decision = FileDecision::blocked(&violation);
                self.sink.emit(
                    &EventRecord::new(SecurityEvent::UploadBlocked, "Upload refused")
                        .field("violation", violation.code())
                        .field("filename", preview_payload(&file.name))
                        .field("size", file.size())
                        .field("threat_level", decision.threat_level),
                );
                decision
            }
            None => {
                self.sink.emit(
                    &EventRecord::new(SecurityEvent::UploadAccepted, "Upload accepted")
                        .field("filename", preview_payload(&file.name))
                        .field("size", file.size())
                        .field("content_type", preview_payload(&file.declared_content_type)),
                );
                FileDecision::allowed()
            }
        }
    }
}
