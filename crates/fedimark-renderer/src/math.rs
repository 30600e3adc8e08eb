//! LaTeX math compilation via pulldown-latex → MathML

use crate::error::MathError;

/// Turns a math expression into markup the UI host can inject.
///
/// Failure is expected for malformed input; the renderer falls back to the
/// literal source and never surfaces the error.
pub trait MathCompiler {
    fn compile(&self, expr: &str, display_mode: bool) -> Result<String, MathError>;
}

impl<T: MathCompiler + ?Sized> MathCompiler for &T {
    fn compile(&self, expr: &str, display_mode: bool) -> Result<String, MathError> {
        (**self).compile(expr, display_mode)
    }
}

/// Unit type implementation - no math support, every expression falls back.
impl MathCompiler for () {
    fn compile(&self, _expr: &str, _display_mode: bool) -> Result<String, MathError> {
        Err(MathError::new("math rendering is not available"))
    }
}

/// Default compiler: LaTeX source to MathML.
#[derive(Debug, Default, Clone, Copy)]
pub struct LatexMathCompiler;

#[cfg(feature = "math")]
impl MathCompiler for LatexMathCompiler {
    fn compile(&self, expr: &str, display_mode: bool) -> Result<String, MathError> {
        use pulldown_latex::{
            Parser, Storage, config::DisplayMode, config::RenderConfig, mathml::push_mathml,
        };

        let storage = Storage::new();
        let parser = Parser::new(expr, &storage);
        let config = RenderConfig {
            display_mode: if display_mode {
                DisplayMode::Block
            } else {
                DisplayMode::Inline
            },
            ..Default::default()
        };

        // Collect events first so parse errors are seen before anything is written
        let events: Vec<_> = parser.collect();
        let errors: Vec<String> = events
            .iter()
            .filter_map(|e| e.as_ref().err().map(|err| err.to_string()))
            .collect();
        if !errors.is_empty() {
            return Err(MathError::new(errors.join("; ")));
        }

        let mut mathml = String::new();
        push_mathml(&mut mathml, events.into_iter(), config)
            .map_err(|e| MathError::new(e.to_string()))?;
        Ok(mathml)
    }
}

#[cfg(not(feature = "math"))]
impl MathCompiler for LatexMathCompiler {
    fn compile(&self, expr: &str, display_mode: bool) -> Result<String, MathError> {
        ().compile(expr, display_mode)
    }
}

#[cfg(all(test, feature = "math"))]
mod tests {
    use super::*;

    #[test]
    fn renders_inline_math() {
        let mathml = LatexMathCompiler.compile("x^2", false).unwrap();
        assert!(mathml.contains("<math"));
        assert!(mathml.contains("</math>"));
    }

    #[test]
    fn renders_display_math() {
        let mathml = LatexMathCompiler.compile(r"\frac{a}{b}", true).unwrap();
        assert!(mathml.contains("<math"));
        assert!(mathml.contains("<mfrac"));
    }

    #[test]
    fn rejects_unbalanced_braces() {
        let err = LatexMathCompiler.compile(r"\frac{a", false).unwrap_err();
        assert!(!err.message.is_empty());
    }

    #[test]
    fn unit_compiler_always_fails() {
        assert!(().compile("x", false).is_err());
    }
}
