//! Conditional rendering: render context, placeholder substitution, and the
//! `{{#if}}` region machinery.
//!
//! ## Markup
//!
//! | Syntax | Meaning |
//! |--------|---------|
//! | `{{name}}` / `{{a.b.c}}` | substitute stringified context value (empty if absent) |
//! | `{{#if <expr>}}` | open a conditional region (nestable) |
//! | `{{#else}}` | switch to the false branch of the innermost region |
//! | `{{#end}}` | close the innermost region |
//!
//! Anything that does not scan as one of these (stray braces, unknown
//! directives, non-path placeholder contents) passes through as literal
//! text. That keeps rendering total over arbitrary input.
//!
//! ## Soft failure
//!
//! Malformed structure (unbalanced or unclosed markers, unparsable
//! conditions) never raises. The renderer returns `success = false`, a
//! diagnostic locating the first problem, and the best-effort text produced
//! up to that point; partial output beats none, so one broken file cannot
//! abort a whole generation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::condition::ConditionEvaluator;
use crate::domain::error::DomainError;

// ============================================================================
// Context Values
// ============================================================================

/// A value supplied at generation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    String(String),
    Number(f64),
    Bool(bool),
    Map(BTreeMap<String, ContextValue>),
}

impl ContextValue {
    /// Truthiness for conditional evaluation: non-empty string, non-zero
    /// number, `true`, non-empty map.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::String(s) => !s.is_empty(),
            Self::Number(n) => *n != 0.0,
            Self::Bool(b) => *b,
            Self::Map(m) => !m.is_empty(),
        }
    }

    /// Stringified form used for placeholder substitution.
    ///
    /// Whole numbers drop their fractional part (`3`, not `3.0`). Maps have
    /// no scalar form and substitute as the empty string.
    pub fn render_string(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Self::Bool(b) => b.to_string(),
            Self::Map(_) => String::new(),
        }
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for ContextValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<crate::domain::entities::template::ParameterValue> for ContextValue {
    fn from(value: crate::domain::entities::template::ParameterValue) -> Self {
        use crate::domain::entities::template::ParameterValue;
        match value {
            ParameterValue::String(s) => Self::String(s),
            ParameterValue::Number(n) => Self::Number(n),
            ParameterValue::Bool(b) => Self::Bool(b),
        }
    }
}

// ============================================================================
// Render Context
// ============================================================================

/// Read-only mapping of variable name → value, supplied per generation.
///
/// Immutable in use: the builder-style `with_value` creates the context up
/// front, and rendering never mutates it, so one context can serve many
/// content units (and many concurrent generations can each hold their own).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    values: BTreeMap<String, ContextValue>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, consuming self for fluent construction:
    ///
    /// ```rust,ignore
    /// let ctx = RenderContext::new()
    ///     .with_value("name", "demo")
    ///     .with_value("features", features_map);
    /// ```
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Get a top-level value.
    pub fn get(&self, name: &str) -> Option<&ContextValue> {
        self.values.get(name)
    }

    /// Resolve a dotted path such as `features.auth`.
    pub fn lookup(&self, dotted: &str) -> Option<&ContextValue> {
        let segments: Vec<&str> = dotted.split('.').collect();
        self.lookup_segments(&segments)
    }

    /// Resolve a pre-split path. Descends through nested maps; any segment
    /// that lands on a non-map or a missing key resolves to `None`.
    pub fn lookup_segments<S: AsRef<str>>(&self, segments: &[S]) -> Option<&ContextValue> {
        let (first, rest) = segments.split_first()?;
        let mut current = self.values.get(first.as_ref())?;
        for segment in rest {
            match current {
                ContextValue::Map(map) => current = map.get(segment.as_ref())?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Iterate entries in name order.
    pub fn values(&self) -> impl Iterator<Item = (&String, &ContextValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ============================================================================
// Render Result
// ============================================================================

/// A problem found while rendering one content body.
///
/// `offset` is the byte offset of the offending marker within the content;
/// `error` carries the structured cause.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderDiagnostic {
    pub offset: usize,
    pub error: DomainError,
}

impl fmt::Display for RenderDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at byte {}: {}", self.offset, self.error)
    }
}

/// Outcome of rendering one content body.
///
/// `success = false` means the input was malformed; `text` still holds the
/// best-effort output produced before (or around) the problem.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderResult {
    pub success: bool,
    pub text: String,
    pub diagnostics: Vec<RenderDiagnostic>,
}

impl RenderResult {
    fn clean(text: String) -> Self {
        Self {
            success: true,
            text,
            diagnostics: Vec::new(),
        }
    }

    /// Treat soft failure as hard: the partial text is discarded and the
    /// first diagnostic becomes the error.
    pub fn into_strict(self) -> Result<String, DomainError> {
        if self.success {
            Ok(self.text)
        } else {
            Err(self
                .diagnostics
                .into_iter()
                .next()
                .map(|d| d.error)
                .unwrap_or_else(|| DomainError::InvalidDefinition("render failed".into())))
        }
    }
}

// ============================================================================
// Conditional Renderer
// ============================================================================

/// One open `{{#if}}` region during the scan.
struct Frame {
    /// Byte offset of the opening marker, for unclosed-region diagnostics.
    offset: usize,
    /// Whether the condition held.
    taken: bool,
    /// Whether `{{#else}}` has been seen for this region.
    seen_else: bool,
}

impl Frame {
    fn emitting(&self) -> bool {
        if self.seen_else { !self.taken } else { self.taken }
    }
}

/// Renders content with embedded conditional regions into final text.
///
/// Pure function of (content, context, cached ASTs): safe to call
/// repeatedly, byte-identical output for identical input.
#[derive(Debug, Default)]
pub struct ConditionalRenderer {
    evaluator: ConditionEvaluator,
}

impl ConditionalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render one content body against a context.
    pub fn render(&self, content: &str, ctx: &RenderContext) -> RenderResult {
        let mut out = String::with_capacity(content.len());
        let mut diagnostics: Vec<RenderDiagnostic> = Vec::new();
        let mut frames: Vec<Frame> = Vec::new();
        let mut pos = 0;

        let active = |frames: &[Frame]| frames.iter().all(Frame::emitting);

        while let Some(found) = content[pos..].find("{{") {
            let open = pos + found;
            if active(&frames) {
                out.push_str(&content[pos..open]);
            }

            let Some(close_rel) = content[open..].find("}}") else {
                if content[open..].starts_with("{{#") {
                    // A directive that never closes is an unbalanced marker.
                    diagnostics.push(RenderDiagnostic {
                        offset: open,
                        error: DomainError::UnbalancedConditional {
                            marker: marker_name(&content[open..]),
                            offset: open,
                        },
                    });
                    return RenderResult {
                        success: false,
                        text: out,
                        diagnostics,
                    };
                }
                // Dangling "{{" with no close: literal text to the end.
                if active(&frames) {
                    out.push_str(&content[open..]);
                }
                pos = content.len();
                break;
            };
            let close = open + close_rel;
            let inner = &content[open + 2..close];

            if let Some(directive) = inner.strip_prefix('#') {
                if let Some(expr) = directive.strip_prefix("if") {
                    if expr.starts_with(char::is_whitespace) && !expr.trim().is_empty() {
                        let taken = match self.evaluator.evaluate(expr.trim(), ctx) {
                            Ok(value) => value,
                            Err(error) => {
                                // Malformed condition: degrade to the false
                                // branch and record the problem.
                                diagnostics.push(RenderDiagnostic {
                                    offset: open,
                                    error,
                                });
                                false
                            }
                        };
                        frames.push(Frame {
                            offset: open,
                            taken,
                            seen_else: false,
                        });
                        pos = close + 2;
                        continue;
                    }
                } else if directive == "else" {
                    match frames.last_mut() {
                        Some(frame) if !frame.seen_else => {
                            frame.seen_else = true;
                            pos = close + 2;
                            continue;
                        }
                        _ => {
                            diagnostics.push(RenderDiagnostic {
                                offset: open,
                                error: DomainError::UnbalancedConditional {
                                    marker: "{{#else}}".into(),
                                    offset: open,
                                },
                            });
                            return RenderResult {
                                success: false,
                                text: out,
                                diagnostics,
                            };
                        }
                    }
                } else if directive == "end" {
                    if frames.pop().is_none() {
                        diagnostics.push(RenderDiagnostic {
                            offset: open,
                            error: DomainError::UnbalancedConditional {
                                marker: "{{#end}}".into(),
                                offset: open,
                            },
                        });
                        return RenderResult {
                            success: false,
                            text: out,
                            diagnostics,
                        };
                    }
                    pos = close + 2;
                    continue;
                }
                // Unknown directive (or bare "{{#if}}"): literal text.
                if active(&frames) {
                    out.push_str("{{");
                }
                pos = open + 2;
                continue;
            }

            // Placeholder candidate.
            let name = inner.trim();
            if is_valid_path(name) {
                if active(&frames) {
                    if let Some(value) = ctx.lookup(name) {
                        out.push_str(&value.render_string());
                    }
                    // Absent values substitute as the empty string.
                }
                pos = close + 2;
            } else {
                // Not a path: leave the braces as-is and rescan after them.
                if active(&frames) {
                    out.push_str("{{");
                }
                pos = open + 2;
            }
        }

        if pos < content.len() && active(&frames) {
            out.push_str(&content[pos..]);
        }

        // Unclosed regions: report the innermost one, which is the first
        // marker still missing its {{#end}}.
        if let Some(frame) = frames.last() {
            diagnostics.push(RenderDiagnostic {
                offset: frame.offset,
                error: DomainError::UnbalancedConditional {
                    marker: "{{#if}}".into(),
                    offset: frame.offset,
                },
            });
        }

        if diagnostics.is_empty() {
            RenderResult::clean(out)
        } else {
            RenderResult {
                success: false,
                text: out,
                diagnostics,
            }
        }
    }

    /// Number of distinct condition expressions parsed so far.
    pub fn cached_expressions(&self) -> usize {
        self.evaluator.cached_expressions()
    }
}

/// First directive-looking token at the start of `rest`, for diagnostics.
fn marker_name(rest: &str) -> String {
    rest.chars()
        .take_while(|c| !c.is_whitespace() && *c != '}')
        .collect()
}

fn is_valid_path(s: &str) -> bool {
    !s.is_empty()
        && s.split('.').all(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(c) if c.is_alphabetic() || c == '_' => {
                    chars.all(|c| c.is_alphanumeric() || c == '_')
                }
                _ => false,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RenderContext {
        RenderContext::new()
            .with_value("color", "green")
            .with_value("count", 3.0)
            .with_value("debug", true)
            .with_value(
                "features",
                ContextValue::Map(
                    [("auth".to_string(), ContextValue::Bool(true))]
                        .into_iter()
                        .collect(),
                ),
            )
    }

    #[test]
    fn plain_text_passes_through() {
        let renderer = ConditionalRenderer::new();
        let result = renderer.render("no markers here", &ctx());
        assert!(result.success);
        assert_eq!(result.text, "no markers here");
    }

    #[test]
    fn placeholders_substitute() {
        let renderer = ConditionalRenderer::new();
        let result = renderer.render("red {{color}}, n={{count}}, d={{debug}}", &ctx());
        assert!(result.success);
        assert_eq!(result.text, "red green, n=3, d=true");
    }

    #[test]
    fn absent_placeholder_is_empty() {
        let renderer = ConditionalRenderer::new();
        let result = renderer.render("[{{missing}}]", &ctx());
        assert!(result.success);
        assert_eq!(result.text, "[]");
    }

    #[test]
    fn dotted_placeholder_resolves() {
        let renderer = ConditionalRenderer::new();
        let result = renderer.render("auth={{features.auth}}", &ctx());
        assert_eq!(result.text, "auth=true");
    }

    #[test]
    fn if_region_selects_true_branch() {
        let renderer = ConditionalRenderer::new();
        let result = renderer.render("a{{#if debug}}-dbg{{#end}}b", &ctx());
        assert!(result.success);
        assert_eq!(result.text, "a-dbgb");
    }

    #[test]
    fn else_branch_taken_when_false() {
        let renderer = ConditionalRenderer::new();
        let result = renderer.render("{{#if missing}}yes{{#else}}no{{#end}}", &ctx());
        assert!(result.success);
        assert_eq!(result.text, "no");
    }

    #[test]
    fn regions_nest() {
        let renderer = ConditionalRenderer::new();
        let content = "{{#if debug}}d({{#if features.auth}}auth{{#else}}anon{{#end}}){{#end}}";
        let result = renderer.render(content, &ctx());
        assert!(result.success);
        assert_eq!(result.text, "d(auth)");
    }

    #[test]
    fn inactive_branch_skips_placeholders() {
        let renderer = ConditionalRenderer::new();
        let result = renderer.render("{{#if missing}}{{color}}{{#end}}ok", &ctx());
        assert!(result.success);
        assert_eq!(result.text, "ok");
    }

    #[test]
    fn unclosed_if_is_soft_failure_at_marker_offset() {
        let renderer = ConditionalRenderer::new();
        let result = renderer.render("before {{#if debug}}inside", &ctx());
        assert!(!result.success);
        assert_eq!(result.text, "before inside");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].offset, 7);
        assert!(matches!(
            result.diagnostics[0].error,
            DomainError::UnbalancedConditional { .. }
        ));
    }

    #[test]
    fn stray_end_stops_with_partial_text() {
        let renderer = ConditionalRenderer::new();
        let result = renderer.render("keep {{#end}} drop", &ctx());
        assert!(!result.success);
        assert_eq!(result.text, "keep ");
        assert_eq!(result.diagnostics[0].offset, 5);
    }

    #[test]
    fn stray_else_stops_with_partial_text() {
        let renderer = ConditionalRenderer::new();
        let result = renderer.render("x{{#else}}y", &ctx());
        assert!(!result.success);
        assert_eq!(result.text, "x");
    }

    #[test]
    fn malformed_condition_degrades_to_false_branch() {
        let renderer = ConditionalRenderer::new();
        let result = renderer.render("{{#if color ==}}broken{{#else}}fallback{{#end}}", &ctx());
        assert!(!result.success);
        assert_eq!(result.text, "fallback");
        assert!(matches!(
            result.diagnostics[0].error,
            DomainError::MalformedExpression { .. }
        ));
    }

    #[test]
    fn odd_braces_are_literal() {
        let renderer = ConditionalRenderer::new();
        let result = renderer.render("{{not a path}} and {{", &ctx());
        assert!(result.success);
        assert_eq!(result.text, "{{not a path}} and {{");
    }

    #[test]
    fn rendering_is_idempotent() {
        let renderer = ConditionalRenderer::new();
        let content = "{{#if debug}}{{color}}{{#end}} {{count}}";
        let first = renderer.render(content, &ctx());
        let second = renderer.render(content, &ctx());
        assert_eq!(first, second);
    }

    #[test]
    fn into_strict_surfaces_the_first_error() {
        let renderer = ConditionalRenderer::new();
        let err = renderer
            .render("{{#if debug}}x", &ctx())
            .into_strict()
            .unwrap_err();
        assert!(matches!(err, DomainError::UnbalancedConditional { .. }));
    }
}
