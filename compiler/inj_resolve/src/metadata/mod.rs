//! Persisted injection facts.
//!
//! Declarations compiled in an earlier unit carry their facts as a JSON blob
//! in the `inj.Metadata` annotation, because their bodies and source-level
//! markers are no longer available. Decoding is strict: a blob that cannot be
//! read or was written by another format version is an error, never a silent
//! "not injectable".

use inj_diagnostic::ErrorCode;
use inj_hir::{DeclFlags, DeclId, DeclKind, Module};
use inj_types::ClassifierTable;
use serde::{Deserialize, Serialize};

use crate::callable::CallContext;

/// Name of the annotation carrying the blob.
pub const METADATA_ANNOTATION: &str = "inj.Metadata";

/// Format version written by this build.
pub const FORMAT_VERSION: u32 = 1;

/// Facts about a callable that resolution depends on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallableInfo {
    pub version: u32,
    /// Eligible as an injectable candidate.
    pub given: bool,
    /// Stable indices of injected value parameters.
    pub injected_parameters: Vec<u32>,
    /// Stable indices of value parameters with a default value.
    pub defaulted_parameters: Vec<u32>,
    /// Indices of the type parameters that receive a threaded type key.
    pub type_key_parameters: Vec<u32>,
    /// Stable index of the injected parameter receiving the call's source key.
    pub source_key_parameter: Option<u32>,
    pub priority: i32,
    /// Absent in blobs of callables that run anywhere.
    #[serde(default)]
    pub call_context: CallContext,
}

impl Default for CallableInfo {
    fn default() -> Self {
        CallableInfo {
            version: FORMAT_VERSION,
            given: false,
            injected_parameters: Vec::new(),
            defaulted_parameters: Vec::new(),
            type_key_parameters: Vec::new(),
            source_key_parameter: None,
            priority: 0,
            call_context: CallContext::Default,
        }
    }
}

impl CallableInfo {
    /// Derive the facts of a local declaration from its flags and types.
    pub fn from_decl(module: &Module, table: &ClassifierTable, decl: DeclId) -> Self {
        let d = module.decl(decl);
        let given = d.is_given()
            || match d.kind {
                DeclKind::Constructor { class } => module.decl(class).is_given(),
                DeclKind::Getter { property } => module.decl(property).is_given(),
                _ => false,
            };
        let builtins = table.builtins();

        let flags = match d.kind {
            DeclKind::Getter { property } => d.flags | module.decl(property).flags,
            _ => d.flags,
        };
        let mut info = CallableInfo {
            given,
            priority: d.priority,
            call_context: CallContext::of(flags),
            ..CallableInfo::default()
        };
        for param in &d.value_parameters {
            let p = module.decl(*param);
            let Some(stable_index) = p.stable_index() else {
                continue;
            };
            let injected = given || p.flags.intersects(DeclFlags::INJECT | DeclFlags::GIVEN);
            if injected {
                info.injected_parameters.push(stable_index);
                if p.ty.classifier == builtins.source_key && info.source_key_parameter.is_none() {
                    info.source_key_parameter = Some(stable_index);
                }
            }
            if p.has_default() {
                info.defaulted_parameters.push(stable_index);
            }
        }

        let type_parameters = match d.kind {
            DeclKind::Constructor { class } => &module.decl(class).type_parameters,
            _ => &d.type_parameters,
        };
        info.type_key_parameters = type_parameters
            .iter()
            .enumerate()
            .filter(|(_, param)| table.get(**param).for_type_key)
            .map(|(index, _)| inj_ir::to_u32(index, "type parameter"))
            .collect();
        info
    }

    pub fn is_injected(&self, stable_index: u32) -> bool {
        self.injected_parameters.contains(&stable_index)
    }

    pub fn is_defaulted(&self, stable_index: u32) -> bool {
        self.defaulted_parameters.contains(&stable_index)
    }
}

/// Facts about a classifier that resolution depends on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierInfo {
    pub version: u32,
    /// Used only to tag types.
    pub tag: bool,
    /// Indices of the type parameters that receive a threaded type key.
    pub type_key_parameters: Vec<u32>,
}

impl ClassifierInfo {
    pub fn new(tag: bool, type_key_parameters: Vec<u32>) -> Self {
        ClassifierInfo {
            version: FORMAT_VERSION,
            tag,
            type_key_parameters,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("corrupt injection metadata on `{declaration}`: {message}")]
    Corrupt { declaration: String, message: String },
    #[error(
        "injection metadata on `{declaration}` has format version {found}, expected {expected}"
    )]
    UnsupportedVersion {
        declaration: String,
        found: u32,
        expected: u32,
    },
}

impl MetadataError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MetadataError::Corrupt { .. } => ErrorCode::E2001,
            MetadataError::UnsupportedVersion { .. } => ErrorCode::E2002,
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
}

pub fn encode_callable(info: &CallableInfo) -> String {
    // Plain structs of integers and booleans always serialize.
    serde_json::to_string(info).unwrap_or_default()
}

pub fn encode_classifier(info: &ClassifierInfo) -> String {
    serde_json::to_string(info).unwrap_or_default()
}

/// Decode a blob, checking the format version before the payload.
fn decode<T: for<'de> Deserialize<'de>>(text: &str, declaration: &str) -> Result<T, MetadataError> {
    let corrupt = |err: serde_json::Error| MetadataError::Corrupt {
        declaration: declaration.to_owned(),
        message: err.to_string(),
    };
    let envelope: Envelope = serde_json::from_str(text).map_err(corrupt)?;
    if envelope.version != FORMAT_VERSION {
        return Err(MetadataError::UnsupportedVersion {
            declaration: declaration.to_owned(),
            found: envelope.version,
            expected: FORMAT_VERSION,
        });
    }
    serde_json::from_str(text).map_err(corrupt)
}

pub fn decode_callable(text: &str, declaration: &str) -> Result<CallableInfo, MetadataError> {
    decode(text, declaration)
}

pub fn decode_classifier(text: &str, declaration: &str) -> Result<ClassifierInfo, MetadataError> {
    decode(text, declaration)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
