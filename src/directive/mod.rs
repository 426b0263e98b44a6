//! Directive parsing for source file headers.
//!
//! Source files declare their dependencies with directives written inside the
//! leading comment header:
//!
//! ```text
//! // Application bundle
//! //= require jquery
//! //= require_tree ./components
//! //= include "banner"
//!
//! app.start();
//! ```
//!
//! # Header Rules
//!
//! The header is the maximal run of comment lines, comment blocks and blank
//! lines at the top of the file. Recognized comment leaders are `//`, `#`,
//! `/* ... */` blocks and `*` continuation lines inside a block. Only lines in
//! the header are scanned; a `//= require` after the first line of code is
//! plain text.
//!
//! A directive line is a comment leader followed by `=`, a directive name and
//! an optional argument. Arguments may be bare (`require foo`), quoted
//! (`require "foo"`) or angle-bracketed (`require <foo>`).
//!
//! Names that are not one of [`DirectiveKind`] are not directives; the line is
//! kept as an ordinary comment. Directive lines are removed from the processed
//! body, every other line is kept verbatim.
//!
//! # Purity
//!
//! [`parse`] performs no I/O. Validating argument *shape* (for example that
//! `require_tree` is given a relative directory) happens here; mapping
//! arguments to files is the resolver's job.

use anyhow::Result;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use tracing::trace;

use crate::core::SprocketsError;

static DIRECTIVE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:/[/*]+|#+|\*+)\s*=\s*([A-Za-z_]\w*)(?:\s+(.*?))?\s*(?:\*+/)?\s*$")
        .expect("directive regex is valid")
});

/// The closed set of directive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    /// Order a dependency before this file without inlining its text.
    Require,
    /// Order a dependency and splice its body after this file's header.
    Include,
    /// Require every requirable file under a directory, recursively.
    RequireTree,
    /// Place this file's own body at this point of the directive sequence.
    RequireSelf,
    /// Require every requirable file directly inside a directory.
    RequireDirectory,
    /// Track a file for freshness without contributing its body.
    DependOn,
    /// Track an asset and everything it requires for freshness only.
    DependOnAsset,
}

impl DirectiveKind {
    /// Maps a directive name as written in source to its kind.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "require" => Some(Self::Require),
            "include" => Some(Self::Include),
            "require_tree" => Some(Self::RequireTree),
            "require_self" => Some(Self::RequireSelf),
            "require_directory" => Some(Self::RequireDirectory),
            "depend_on" => Some(Self::DependOn),
            "depend_on_asset" => Some(Self::DependOnAsset),
            _ => None,
        }
    }

    /// The directive name as written in source.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Require => "require",
            Self::Include => "include",
            Self::RequireTree => "require_tree",
            Self::RequireSelf => "require_self",
            Self::RequireDirectory => "require_directory",
            Self::DependOn => "depend_on",
            Self::DependOnAsset => "depend_on_asset",
        }
    }

    /// Whether the argument names a directory rather than a file.
    #[must_use]
    pub const fn takes_directory(self) -> bool {
        matches!(self, Self::RequireTree | Self::RequireDirectory)
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A directive found in a file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// What the directive does.
    pub kind: DirectiveKind,
    /// Unquoted argument, if one was given.
    pub argument: Option<String>,
    /// 1-based line number in the original source.
    pub line: usize,
}

impl Directive {
    /// True when the argument is written relative to the requiring file
    /// (`.`, `./foo`, `../foo`).
    #[must_use]
    pub fn is_relative(&self) -> bool {
        self.argument.as_deref().is_some_and(is_relative_token)
    }
}

/// The result of scanning one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedSource {
    /// Directives in file order.
    pub directives: Vec<Directive>,
    /// Source text with directive lines removed.
    pub body: String,
    /// Byte offset in [`body`](Self::body) just past the last comment line of
    /// the header. Included bodies are spliced here.
    pub header_end: usize,
}

/// True for `.`, `..`, `./...` and `../...` tokens.
#[must_use]
pub fn is_relative_token(token: &str) -> bool {
    token == "." || token == ".." || token.starts_with("./") || token.starts_with("../")
}

/// Scans `source` for header directives.
///
/// # Errors
///
/// Returns [`SprocketsError::ArgumentError`] when a recognized directive has
/// an argument its kind cannot accept:
/// - `require_tree`/`require_directory` with a non-relative argument
/// - `require_self` with any argument
/// - any other directive without an argument
pub fn parse(source: &str) -> Result<ProcessedSource> {
    let mut directives = Vec::new();
    let mut body = String::with_capacity(source.len());
    let mut header_end = 0;
    let mut in_header = true;
    let mut in_block_comment = false;

    for (index, line) in source.split_inclusive('\n').enumerate() {
        if !in_header {
            body.push_str(line);
            continue;
        }

        let trimmed = line.trim();
        let is_comment = if in_block_comment {
            if trimmed.contains("*/") {
                in_block_comment = false;
            }
            true
        } else if trimmed.is_empty() {
            false
        } else if trimmed.starts_with("//") || trimmed.starts_with('#') {
            true
        } else if let Some(rest) = trimmed.strip_prefix("/*") {
            in_block_comment = !rest.contains("*/");
            true
        } else {
            in_header = false;
            body.push_str(line);
            continue;
        };

        if is_comment {
            if let Some(directive) = parse_line(trimmed, index + 1)? {
                trace!("Found directive '{}' on line {}", directive.kind, directive.line);
                directives.push(directive);
                continue;
            }
        }

        body.push_str(line);
        if is_comment {
            header_end = body.len();
        }
    }

    Ok(ProcessedSource {
        directives,
        body,
        header_end,
    })
}

fn parse_line(line: &str, line_number: usize) -> Result<Option<Directive>> {
    let Some(captures) = DIRECTIVE_REGEX.captures(line) else {
        return Ok(None);
    };

    let Some(kind) = captures.get(1).and_then(|m| DirectiveKind::from_name(m.as_str())) else {
        return Ok(None);
    };

    let argument = captures
        .get(2)
        .map(|m| unquote(m.as_str().trim()).to_string())
        .filter(|arg| !arg.is_empty());

    validate_argument(kind, argument.as_deref(), line_number)?;

    Ok(Some(Directive {
        kind,
        argument,
        line: line_number,
    }))
}

fn validate_argument(kind: DirectiveKind, argument: Option<&str>, line: usize) -> Result<()> {
    match (kind, argument) {
        (DirectiveKind::RequireSelf, Some(arg)) => Err(SprocketsError::argument(
            kind.name(),
            format!("line {line}: require_self takes no argument, got '{arg}'"),
        )
        .into()),
        (DirectiveKind::RequireSelf, None) => Ok(()),
        (DirectiveKind::RequireTree | DirectiveKind::RequireDirectory, Some(arg))
            if !is_relative_token(arg) =>
        {
            Err(SprocketsError::argument(
                kind.name(),
                format!(
                    "line {line}: '{arg}' is a logical path; {} only accepts relative directories like '.' or './dir'",
                    kind.name()
                ),
            )
            .into())
        }
        (DirectiveKind::RequireTree | DirectiveKind::RequireDirectory, _) => Ok(()),
        (_, None) => Err(SprocketsError::argument(
            kind.name(),
            format!("line {line}: {} requires an argument", kind.name()),
        )
        .into()),
        (_, Some(_)) => Ok(()),
    }
}

fn unquote(arg: &str) -> &str {
    for (open, close) in [('"', '"'), ('\'', '\''), ('<', '>')] {
        if arg.len() >= 2 && arg.starts_with(open) && arg.ends_with(close) {
            return &arg[1..arg.len() - 1];
        }
    }
    arg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(processed: &ProcessedSource) -> Vec<(DirectiveKind, Option<&str>)> {
        processed.directives.iter().map(|d| (d.kind, d.argument.as_deref())).collect()
    }

    #[test]
    fn test_parse_slash_comments() {
        let source = "//= require project\n//= require \"users\"\n\nfocus();\n";
        let processed = parse(source).unwrap();

        assert_eq!(
            kinds(&processed),
            vec![
                (DirectiveKind::Require, Some("project")),
                (DirectiveKind::Require, Some("users")),
            ]
        );
        assert_eq!(processed.body, "\nfocus();\n");
    }

    #[test]
    fn test_parse_hash_and_block_comments() {
        let source = "/*\n *= require_self\n *= require_tree .\n */\nbody { color: red }\n";
        let processed = parse(source).unwrap();

        assert_eq!(
            kinds(&processed),
            vec![(DirectiveKind::RequireSelf, None), (DirectiveKind::RequireTree, Some("."))]
        );
        assert_eq!(processed.body, "/*\n */\nbody { color: red }\n");

        let source = "#= require <project>\n#= depend_on_asset logo.svg\nhello()\n";
        let processed = parse(source).unwrap();
        assert_eq!(
            kinds(&processed),
            vec![
                (DirectiveKind::Require, Some("project")),
                (DirectiveKind::DependOnAsset, Some("logo.svg")),
            ]
        );
    }

    #[test]
    fn test_single_line_block_directive() {
        let processed = parse("/*= require reset */\nh1 {}\n").unwrap();
        assert_eq!(kinds(&processed), vec![(DirectiveKind::Require, Some("reset"))]);
        assert_eq!(processed.body, "h1 {}\n");
    }

    #[test]
    fn test_directives_after_code_are_ignored() {
        let source = "//= require a\nvar x = 1;\n//= require b\n";
        let processed = parse(source).unwrap();

        assert_eq!(kinds(&processed), vec![(DirectiveKind::Require, Some("a"))]);
        assert_eq!(processed.body, "var x = 1;\n//= require b\n");
    }

    #[test]
    fn test_unknown_directive_is_plain_comment() {
        let source = "//= provide vendor\n//= require a\n";
        let processed = parse(source).unwrap();

        assert_eq!(kinds(&processed), vec![(DirectiveKind::Require, Some("a"))]);
        assert_eq!(processed.body, "//= provide vendor\n");
    }

    #[test]
    fn test_header_end_follows_last_comment_line() {
        let source = "# My Application\n#= include project\n\nhello()\n";
        let processed = parse(source).unwrap();

        assert_eq!(processed.body, "# My Application\n\nhello()\n");
        assert_eq!(&processed.body[..processed.header_end], "# My Application\n");
    }

    #[test]
    fn test_header_end_without_header() {
        let processed = parse("hello()\n").unwrap();
        assert_eq!(processed.header_end, 0);
        assert!(processed.directives.is_empty());
    }

    #[test]
    fn test_require_tree_without_argument() {
        let processed = parse("//= require_tree\n").unwrap();
        assert_eq!(kinds(&processed), vec![(DirectiveKind::RequireTree, None)]);
    }

    #[test]
    fn test_require_tree_with_logical_path_is_argument_error() {
        let err = parse("//= require_tree tree/with_logical_path\n").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SprocketsError>(),
            Some(SprocketsError::ArgumentError { directive, .. }) if directive == "require_tree"
        ));

        assert!(parse("//= require_directory components\n").is_err());
        assert!(parse("//= require_directory ./components\n").is_ok());
    }

    #[test]
    fn test_missing_argument_is_argument_error() {
        assert!(parse("//= require\n").is_err());
        assert!(parse("//= require_self extra\n").is_err());
    }

    #[test]
    fn test_line_numbers() {
        let processed = parse("// header\n\n//= require a\n").unwrap();
        assert_eq!(processed.directives[0].line, 3);
    }

    #[test]
    fn test_relative_tokens() {
        assert!(is_relative_token("."));
        assert!(is_relative_token("./foo"));
        assert!(is_relative_token("../foo"));
        assert!(!is_relative_token("foo"));
        assert!(!is_relative_token(".hidden"));
        assert!(!is_relative_token("/abs"));
    }

    #[test]
    fn test_crlf_line_endings() {
        let processed = parse("//= require a\r\nfoo();\r\n").unwrap();
        assert_eq!(kinds(&processed), vec![(DirectiveKind::Require, Some("a"))]);
        assert_eq!(processed.body, "foo();\r\n");
    }
}
