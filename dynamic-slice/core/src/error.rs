use crate::backend::BackendError;
use crate::eval::EvalError;
use crate::export::ExportError;

#[derive(thiserror::Error, Debug)]
pub enum SliceError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("no tracked operand at index {index} ({len} tracked)")]
    InvalidOperandIndex { index: usize, len: usize },

    #[error("no sliced instruction at index {index} ({len} in slice)")]
    InvalidInstructionIndex { index: usize, len: usize },

    #[error("could not resolve expression `{0}`")]
    InvalidExpression(String),

    #[error("unsupported architecture `{0}`")]
    UnsupportedArchitecture(String),
}
