//! Query translation
//!
//! Turns typed store operations into engine [`Statement`]s and engine
//! results back into generic [`QueryResult`]s.

pub mod result;
pub mod statement;
pub mod translator;

pub use result::QueryResult;
pub use statement::{ParameterMode, Statement};
pub use translator::{QueryTranslator, TranslateError, TranslateResult, ID_COLUMN};
