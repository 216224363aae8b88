//! Template Renderer - Asset Resolution And Fragment Inclusion
//!
//! Not a general templating engine. Two directives are supported:
//! `<%= asset('name') %>` substitutes the manifest-resolved path, and
//! `<%- include('path') %>` splices another fragment, recording it as a
//! build dependency. Everything else passes through verbatim.
//!
//! CRITICAL: a render failure never aborts the build. The caller receives
//! the error together with the original source text so a broken template
//! ships visibly broken rather than silently missing.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Resolves a logical asset name to its output path.
///
/// Implementations must be infallible: an unknown name resolves to itself.
pub trait AssetResolver {
    fn resolve(&self, logical: &str) -> String;
}

/// Every fragment transitively included during one render call, by
/// absolute path. Grow-only for the duration of the call; duplicates
/// collapse. Consumed by the surrounding build watcher for invalidation.
pub type DependencySet = BTreeSet<PathBuf>;

/// Template text plus its originating file path (used to resolve relative
/// inclusions and to attribute errors).
#[derive(Debug, Clone)]
pub struct TemplateSource {
    pub text: String,
    pub path: PathBuf,
}

impl TemplateSource {
    pub fn new(text: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            text: text.into(),
            path: path.into(),
        }
    }

    pub fn read(path: &Path) -> std::io::Result<Self> {
        Ok(Self {
            text: fs::read_to_string(path)?,
            path: path.to_path_buf(),
        })
    }
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("{file}: unterminated directive at byte {offset}")]
    Unterminated { file: PathBuf, offset: usize },

    #[error("{file}: bad directive `{body}` at byte {offset}: {reason}")]
    Syntax {
        file: PathBuf,
        body: String,
        offset: usize,
        reason: &'static str,
    },

    #[error("{file}: unknown directive `{directive}` (expected asset or include)")]
    UnknownDirective { file: PathBuf, directive: String },

    #[error("{file}: cannot include {include}: {source}")]
    IncludeMissing {
        file: PathBuf,
        include: PathBuf,
        source: std::io::Error,
    },

    #[error("{file}: inclusion cycle through {include}")]
    IncludeCycle { file: PathBuf, include: PathBuf },
}

/// Result of one render call.
///
/// `Failed` carries the original, unrendered source so the pipeline can
/// still emit a present (if broken) artifact.
#[derive(Debug)]
pub enum RenderOutcome {
    Rendered(String),
    Failed {
        error: TemplateError,
        original: String,
    },
}

impl RenderOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, RenderOutcome::Rendered(_))
    }
}

enum Directive {
    Asset(String),
    Include(String),
}

/// The template renderer. Stateless; all per-render state (output buffer,
/// dependency set, include stack) lives in the call.
#[derive(Debug, Default)]
pub struct TemplateRenderer;

impl TemplateRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render one template against a resolver, recording every
    /// transitively included fragment into `deps`.
    ///
    /// Inclusions are processed in document order; recursion is synchronous
    /// and guarded by a path-based include stack so an accidental cycle is
    /// reported as a template error rather than overflowing.
    pub fn render(
        &self,
        source: &TemplateSource,
        resolver: &dyn AssetResolver,
        deps: &mut DependencySet,
    ) -> RenderOutcome {
        let root = fs::canonicalize(&source.path).unwrap_or_else(|_| source.path.clone());
        let mut stack = vec![root];
        match self.render_text(&source.text, &source.path, resolver, deps, &mut stack) {
            Ok(html) => RenderOutcome::Rendered(html),
            Err(error) => RenderOutcome::Failed {
                error,
                original: source.text.clone(),
            },
        }
    }

    fn render_text(
        &self,
        text: &str,
        file: &Path,
        resolver: &dyn AssetResolver,
        deps: &mut DependencySet,
        stack: &mut Vec<PathBuf>,
    ) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;

        while let Some(rel) = text[cursor..].find("<%") {
            let open = cursor + rel;
            out.push_str(&text[cursor..open]);

            let body_start = open + 2;
            let close = text[body_start..]
                .find("%>")
                .map(|i| body_start + i)
                .ok_or_else(|| TemplateError::Unterminated {
                    file: file.to_path_buf(),
                    offset: open,
                })?;

            // Leading `=` / `-` output markers are accepted and ignored;
            // both directive kinds splice into the output the same way.
            let body = text[body_start..close]
                .trim_start_matches(['=', '-'])
                .trim();

            match parse_directive(body, file, open)? {
                Directive::Asset(name) => out.push_str(&resolver.resolve(&name)),
                Directive::Include(rel_path) => {
                    let rendered =
                        self.render_include(&rel_path, file, resolver, deps, stack)?;
                    out.push_str(&rendered);
                }
            }

            cursor = close + 2;
        }

        out.push_str(&text[cursor..]);
        Ok(out)
    }

    fn render_include(
        &self,
        rel_path: &str,
        file: &Path,
        resolver: &dyn AssetResolver,
        deps: &mut DependencySet,
        stack: &mut Vec<PathBuf>,
    ) -> Result<String, TemplateError> {
        // Inclusion paths resolve against the including file's directory.
        let target = file
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(rel_path);
        let target =
            fs::canonicalize(&target).map_err(|source| TemplateError::IncludeMissing {
                file: file.to_path_buf(),
                include: target.clone(),
                source,
            })?;

        if stack.contains(&target) {
            return Err(TemplateError::IncludeCycle {
                file: file.to_path_buf(),
                include: target,
            });
        }

        let text = fs::read_to_string(&target).map_err(|source| TemplateError::IncludeMissing {
            file: file.to_path_buf(),
            include: target.clone(),
            source,
        })?;

        tracing::debug!(fragment = %target.display(), "including fragment");
        deps.insert(target.clone());

        stack.push(target.clone());
        let rendered = self.render_text(&text, &target, resolver, deps, stack);
        stack.pop();
        rendered
    }
}

fn parse_directive(body: &str, file: &Path, offset: usize) -> Result<Directive, TemplateError> {
    let syntax = |reason: &'static str| TemplateError::Syntax {
        file: file.to_path_buf(),
        body: body.to_string(),
        offset,
        reason,
    };

    let (name, rest) = body
        .split_once('(')
        .ok_or_else(|| syntax("expected a call like asset('name')"))?;
    let arg = rest
        .trim_end()
        .strip_suffix(')')
        .ok_or_else(|| syntax("missing closing parenthesis"))?;
    let arg = unquote(arg.trim()).ok_or_else(|| syntax("argument must be a quoted string"))?;

    match name.trim() {
        "asset" => Ok(Directive::Asset(arg.to_string())),
        "include" => Ok(Directive::Include(arg.to_string())),
        other => Err(TemplateError::UnknownDirective {
            file: file.to_path_buf(),
            directive: other.to_string(),
        }),
    }
}

fn unquote(arg: &str) -> Option<&str> {
    for quote in ['\'', '"'] {
        if let Some(inner) = arg.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return Some(inner);
        }
    }
    None
}
