use kite_bytecode::BuildError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    #[error("{class} has analysis errors and cannot be compiled")]
    AnalysisErrors { class: String },

    #[error("{what} is not supported by the code generator")]
    Unsupported { what: String },

    /// Analysis recorded nothing for a node code generation needs.
    #[error("no {what} recorded for node {node}")]
    MissingBinding { node: u32, what: &'static str },

    #[error("no receiver in scope for members of {class}")]
    NoReceiver { class: String },

    #[error("{method}: {source}")]
    Build {
        method: String,
        #[source]
        source: BuildError,
    },
}

pub type CodegenResult<T> = Result<T, CodegenError>;
