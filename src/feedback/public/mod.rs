//! Pages anyone can open: the feedback form and the code-gated results.

pub mod results;
pub mod submit;
