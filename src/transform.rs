// SPDX-License-Identifier: GPL-3.0-only

//! Rewriting of `Code snippet` marker lines into fenced code blocks.
//!
//! Chat exports often flatten diagrams into a bare `Code snippet` line
//! followed by the diagram source. This module turns each such marker into a
//! ```` ```mermaid ```` opener and closes the fence before the next blank line,
//! or at the end of the document.
//!
//! # Closing rules
//!
//! - The fence closes at the first blank line after the marker. The closer is
//!   placed before that blank line, which stays in the output.
//! - With no blank line left, the closer becomes the last line. A trailing
//!   line terminator is only kept if the input had one.
//! - Markers inside an open fence are copied verbatim. Fences never nest.
//!
//! All other lines, including their line endings, are copied unchanged.
//!
//! # Example
//!
//! ```
//! use mdfence::transform::transform_text;
//!
//! let input = "Code snippet\ngraph TD; A-->B\n\nMore text\n";
//! let output = transform_text(input);
//!
//! assert_eq!(output, "```mermaid\ngraph TD; A-->B\n```\n\nMore text\n");
//! ```

/// Info string written after the opening backticks when no other is given.
pub const DEFAULT_LANGUAGE: &str = "mermaid";

const MARKER: &str = "Code snippet";
const FENCE: &str = "```";

/// Configuration for [`transform_with`].
///
/// The default value reproduces [`transform_text`] exactly. Every other
/// behavior is opt-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOptions {
    /// Info string for fences opened from a marker line (default: `mermaid`).
    pub language: String,

    /// Accept marker variants such as `code snippet (dot):`.
    ///
    /// Matching becomes case-insensitive, allows a trailing colon, and takes
    /// the fence language from the parenthesized hint when present.
    pub language_hints: bool,

    /// Close a fence from the source document that is still open at the end.
    pub close_unterminated: bool,

    /// Collapse runs of more than two blank lines outside fences into two.
    pub collapse_blank_runs: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_owned(),
            language_hints: false,
            close_unterminated: false,
            collapse_blank_runs: false,
        }
    }
}

impl TransformOptions {
    /// Turns on one of the optional transforms.
    pub const fn enable(&mut self, transform: OptionalTransform) {
        match transform {
            OptionalTransform::LanguageHints => self.language_hints = true,
            OptionalTransform::CloseUnterminated => self.close_unterminated = true,
            OptionalTransform::CollapseBlanks => self.collapse_blank_runs = true,
        }
    }
}

/// Transforms that are off by default and can be enabled by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalTransform {
    /// See [`TransformOptions::language_hints`].
    LanguageHints,
    /// See [`TransformOptions::close_unterminated`].
    CloseUnterminated,
    /// See [`TransformOptions::collapse_blank_runs`].
    CollapseBlanks,
}

impl OptionalTransform {
    /// Every optional transform, in display order.
    pub const ALL: [Self; 3] = [
        Self::LanguageHints,
        Self::CloseUnterminated,
        Self::CollapseBlanks,
    ];

    /// The name used to select this transform on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::LanguageHints => "language-hints",
            Self::CloseUnterminated => "close-unterminated",
            Self::CollapseBlanks => "collapse-blanks",
        }
    }

    /// A one-line description for `--list-transforms`.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::LanguageHints => "Accept `Code snippet (lang):` markers, case-insensitive",
            Self::CloseUnterminated => "Close code fences left open at the end of the file",
            Self::CollapseBlanks => "Collapse runs of blank lines to at most two",
        }
    }

    /// Looks up a transform by its [`name`](Self::name).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

/// One line of the input with its own terminator.
///
/// `ending` is `"\n"`, `"\r\n"`, or empty for a final unterminated line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Line<'a> {
    body: &'a str,
    ending: &'a str,
}

/// Which kind of fence the scan is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fence {
    Outside,
    /// Opened by this transform from a marker line.
    Synthetic,
    /// Already present in the source document.
    Authored,
}

/// Rewrites `Code snippet` marker lines into ```` ```mermaid ```` fences.
///
/// Equivalent to [`transform_with`] using [`TransformOptions::default`].
/// Input without marker lines is returned unchanged.
///
/// # Example
///
/// ```
/// use mdfence::transform::transform_text;
///
/// assert_eq!(
///     transform_text("Code snippet\nfoo\nbar"),
///     "```mermaid\nfoo\nbar\n```"
/// );
/// assert_eq!(transform_text("no markers\n"), "no markers\n");
/// ```
#[must_use]
pub fn transform_text(text: &str) -> String {
    transform_with(text, &TransformOptions::default())
}

/// Rewrites marker lines into fences, applying any enabled optional transforms.
///
/// # Example
///
/// ```
/// use mdfence::transform::{transform_with, TransformOptions};
///
/// let opts = TransformOptions {
///     language_hints: true,
///     ..Default::default()
/// };
/// let output = transform_with("code snippet (dot):\ndigraph { A -> B }\n", &opts);
///
/// assert_eq!(output, "```dot\ndigraph { A -> B }\n```\n");
/// ```
#[must_use]
pub fn transform_with(text: &str, opts: &TransformOptions) -> String {
    let eol = line_ending(text);
    let mut out = String::with_capacity(text.len() + 32);
    let mut fence = Fence::Outside;
    let mut blank_run = 0usize;

    for line in split_lines(text) {
        let blank = line.body.trim().is_empty();

        match fence {
            Fence::Synthetic if blank => {
                push_line(&mut out, FENCE, eol);
                fence = Fence::Outside;
            }
            Fence::Synthetic | Fence::Authored => {
                if fence == Fence::Authored && is_fence_delimiter(line.body) {
                    fence = Fence::Outside;
                }
                push_line(&mut out, line.body, line.ending);
                continue;
            }
            Fence::Outside => {}
        }

        if let Some(language) = marker_language(line.body, opts) {
            out.push_str(FENCE);
            out.push_str(language);
            out.push_str(line.ending);
            fence = Fence::Synthetic;
            blank_run = 0;
            continue;
        }

        if is_fence_delimiter(line.body) {
            fence = Fence::Authored;
            blank_run = 0;
        } else if blank {
            blank_run += 1;
            if opts.collapse_blank_runs && blank_run > 2 {
                continue;
            }
        } else {
            blank_run = 0;
        }

        push_line(&mut out, line.body, line.ending);
    }

    let close_at_end = match fence {
        Fence::Synthetic => true,
        Fence::Authored => opts.close_unterminated,
        Fence::Outside => false,
    };
    if close_at_end {
        // A terminated last line means the closer sits before the empty
        // remainder and keeps a terminator of its own.
        if out.ends_with('\n') {
            push_line(&mut out, FENCE, eol);
        } else {
            out.push_str(eol);
            out.push_str(FENCE);
        }
    }

    out
}

/// Splits `text` into lines, keeping each line's terminator.
fn split_lines(text: &str) -> impl Iterator<Item = Line<'_>> {
    text.split_inclusive('\n').map(|piece| {
        let body = piece
            .strip_suffix('\n')
            .map_or(piece, |b| b.strip_suffix('\r').unwrap_or(b));
        Line {
            body,
            ending: &piece[body.len()..],
        }
    })
}

/// Returns the terminator of the first terminated line, or `"\n"`.
fn line_ending(text: &str) -> &str {
    split_lines(text)
        .map(|line| line.ending)
        .find(|ending| !ending.is_empty())
        .unwrap_or("\n")
}

fn push_line(out: &mut String, body: &str, ending: &str) {
    out.push_str(body);
    out.push_str(ending);
}

/// Returns `true` for a line that opens or closes a backtick code fence.
fn is_fence_delimiter(body: &str) -> bool {
    body.trim_start().starts_with(FENCE)
}

/// Returns the fence language if `body` is a marker line.
fn marker_language<'a>(body: &'a str, opts: &'a TransformOptions) -> Option<&'a str> {
    let trimmed = body.trim();
    if trimmed == MARKER {
        return Some(opts.language.as_str());
    }
    if !opts.language_hints {
        return None;
    }
    parse_hinted_marker(trimmed).map(|hint| hint.unwrap_or(opts.language.as_str()))
}

/// Parses `code snippet`, `Code snippet:`, or `Code Snippet (dot):`.
///
/// Returns `None` if the line is not a marker, `Some(None)` for a marker
/// without a language hint.
fn parse_hinted_marker(trimmed: &str) -> Option<Option<&str>> {
    let head = trimmed.get(..MARKER.len())?;
    if !head.eq_ignore_ascii_case(MARKER) {
        return None;
    }

    let rest = trimmed[MARKER.len()..].trim_start();
    let rest = rest.strip_suffix(':').unwrap_or(rest).trim_end();
    if rest.is_empty() {
        return Some(None);
    }

    let hint = rest.strip_prefix('(')?.strip_suffix(')')?.trim();
    if hint.is_empty() || hint.contains(['(', ')']) {
        return None;
    }
    Some(Some(hint))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_lines(text: &str, wanted: &str) -> usize {
        text.lines().filter(|line| *line == wanted).count()
    }

    fn hinted() -> TransformOptions {
        TransformOptions {
            language_hints: true,
            ..Default::default()
        }
    }

    #[test]
    fn closes_before_blank_line() {
        assert_eq!(
            transform_text("Code snippet\nfoo\n\nbar\n"),
            "```mermaid\nfoo\n```\n\nbar\n"
        );
    }

    #[test]
    fn closes_at_end_without_trailing_newline() {
        assert_eq!(
            transform_text("Code snippet\nfoo\nbar"),
            "```mermaid\nfoo\nbar\n```"
        );
    }

    #[test]
    fn closes_at_end_keeping_trailing_newline() {
        assert_eq!(
            transform_text("Code snippet\nfoo\n"),
            "```mermaid\nfoo\n```\n"
        );
    }

    #[test]
    fn empty_fence_before_blank_line() {
        assert_eq!(transform_text("Code snippet\n\n"), "```mermaid\n```\n\n");
    }

    #[test]
    fn empty_fence_at_end_of_input() {
        assert_eq!(transform_text("Code snippet"), "```mermaid\n```");
        assert_eq!(transform_text("Code snippet\n"), "```mermaid\n```\n");
    }

    #[test]
    fn does_not_nest_fences() {
        let output = transform_text("Code snippet\nCode snippet\n\n");

        assert_eq!(output, "```mermaid\nCode snippet\n```\n\n");
        assert_eq!(count_lines(&output, "```mermaid"), 1);
        assert_eq!(count_lines(&output, "```"), 1);
    }

    #[test]
    fn detects_marker_with_surrounding_whitespace() {
        assert_eq!(
            transform_text("  Code snippet  \nfoo\n\n"),
            transform_text("Code snippet\nfoo\n\n")
        );
        assert_eq!(transform_text("\tCode snippet\nfoo"), "```mermaid\nfoo\n```");
    }

    #[test]
    fn marker_match_is_exact_and_case_sensitive() {
        for input in [
            "code snippet\nfoo\n",
            "Code snippet:\nfoo\n",
            "Code snippets\nfoo\n",
            "Code  snippet\nfoo\n",
            "A Code snippet\nfoo\n",
        ] {
            assert_eq!(transform_text(input), input, "input: {input:?}");
        }
    }

    #[test]
    fn leaves_marker_free_text_unchanged() {
        for input in [
            "",
            "\n",
            "\n\n\n",
            "plain text",
            "# Title\n\nSome *text*.\n\n- item\n",
            "line one\r\nline two\r\n",
            "mixed\r\nendings\nhere",
            "```\nunclosed fence\n",
        ] {
            assert_eq!(transform_text(input), input, "input: {input:?}");
        }
    }

    #[test]
    fn handles_multiple_markers() {
        let input = "Intro\nCode snippet\ngraph TD\n\nMiddle\nCode snippet\nsequenceDiagram\n";
        let expected =
            "Intro\n```mermaid\ngraph TD\n```\n\nMiddle\n```mermaid\nsequenceDiagram\n```\n";

        assert_eq!(transform_text(input), expected);
    }

    #[test]
    fn keeps_fences_balanced() {
        for input in [
            "Code snippet",
            "Code snippet\nCode snippet\nCode snippet",
            "Code snippet\n\nCode snippet\n\n\nCode snippet\na\nb\n",
            "x\nCode snippet\n   \ny\n",
        ] {
            let output = transform_text(input);
            assert_eq!(
                count_lines(&output, "```mermaid"),
                count_lines(&output, "```"),
                "output: {output:?}"
            );
        }
    }

    #[test]
    fn whitespace_only_line_closes_fence() {
        assert_eq!(
            transform_text("Code snippet\nfoo\n   \nbar"),
            "```mermaid\nfoo\n```\n   \nbar"
        );
    }

    #[test]
    fn is_stable_on_its_own_output() {
        for input in [
            "Code snippet\nfoo\n\nbar\n",
            "Code snippet\nCode snippet\n\n",
            "Code snippet\nfoo\nbar",
            "Code snippet\n\n",
            "a\n\nCode snippet\ngraph LR\nCode snippet\n",
        ] {
            let once = transform_text(input);
            assert_eq!(transform_text(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn fence_line_inside_diagram_changes_second_pass() {
        // The copied ``` line reads as a delimiter when the output is rerun.
        let once = transform_text("Code snippet\n```\nCode snippet\n\n");
        assert_eq!(once, "```mermaid\n```\nCode snippet\n```\n\n");

        let twice = transform_text(&once);
        assert_eq!(twice, "```mermaid\n```\n```mermaid\n```\n```\n\n");
        assert_eq!(transform_text(&twice), twice);
    }

    #[test]
    fn ignores_markers_inside_existing_fences() {
        let input = "```text\nCode snippet\n```\n";
        assert_eq!(transform_text(input), input);
    }

    #[test]
    fn inserted_lines_follow_crlf_endings() {
        assert_eq!(
            transform_text("Code snippet\r\nfoo\r\n\r\nbar\r\n"),
            "```mermaid\r\nfoo\r\n```\r\n\r\nbar\r\n"
        );
        assert_eq!(
            transform_text("Code snippet\r\nfoo"),
            "```mermaid\r\nfoo\r\n```"
        );
    }

    #[test]
    fn uses_configured_language() {
        let opts = TransformOptions {
            language: "plantuml".into(),
            ..Default::default()
        };

        assert_eq!(
            transform_with("Code snippet\n@startuml\n", &opts),
            "```plantuml\n@startuml\n```\n"
        );
    }

    #[test]
    fn default_options_match_transform_text() {
        let input = "Code snippet (dot):\nx\n\n\n\n\nCode snippet\ny\n```\nopen";
        assert_eq!(
            transform_with(input, &TransformOptions::default()),
            transform_text(input)
        );
    }

    #[test]
    fn language_hint_sets_fence_language() {
        let input = "Title\n\nCode snippet (dot):\ndigraph { A -> B }\n\n";
        let output = transform_with(input, &hinted());

        assert_eq!(output, "Title\n\n```dot\ndigraph { A -> B }\n```\n\n");
    }

    #[test]
    fn language_hints_accept_case_and_colon() {
        let opts = hinted();

        assert_eq!(transform_with("code snippet\nx", &opts), "```mermaid\nx\n```");
        assert_eq!(transform_with("CODE SNIPPET:\nx", &opts), "```mermaid\nx\n```");
        assert_eq!(
            transform_with("Code snippet ( graphviz ) :\nx", &opts),
            "```graphviz\nx\n```"
        );
    }

    #[test]
    fn language_hints_reject_malformed_markers() {
        let opts = hinted();
        for input in [
            "Code snippet ()\nx",
            "Code snippet (dot\nx",
            "Code snippet dot\nx",
            "Code snippet (a(b))\nx",
        ] {
            assert_eq!(transform_with(input, &opts), input, "input: {input:?}");
        }
    }

    #[test]
    fn hinted_markers_are_ignored_by_default() {
        let input = "Code snippet (dot):\ndigraph {}\n";
        assert_eq!(transform_text(input), input);
    }

    #[test]
    fn parses_hinted_markers() {
        assert_eq!(parse_hinted_marker("Code snippet"), Some(None));
        assert_eq!(parse_hinted_marker("code snippet:"), Some(None));
        assert_eq!(parse_hinted_marker("Code snippet (dot)"), Some(Some("dot")));
        assert_eq!(parse_hinted_marker("Code snip"), None);
        assert_eq!(parse_hinted_marker("Codé snippet"), None);
    }

    #[test]
    fn closes_unterminated_fence_when_enabled() {
        let input = "Start\n\n```python\nprint(1)\n";
        let opts = TransformOptions {
            close_unterminated: true,
            ..Default::default()
        };

        assert_eq!(transform_text(input), input);
        assert_eq!(
            transform_with(input, &opts),
            "Start\n\n```python\nprint(1)\n```\n"
        );
        assert_eq!(
            transform_with("```\ncode", &opts),
            "```\ncode\n```"
        );
    }

    #[test]
    fn collapses_blank_runs_when_enabled() {
        let opts = TransformOptions {
            collapse_blank_runs: true,
            ..Default::default()
        };

        assert_eq!(transform_with("a\n\n\n\n\nb\n", &opts), "a\n\n\nb\n");
        assert_eq!(transform_with("a\n\n\nb\n", &opts), "a\n\n\nb\n");
    }

    #[test]
    fn does_not_collapse_blanks_inside_fences() {
        let opts = TransformOptions {
            collapse_blank_runs: true,
            ..Default::default()
        };
        let input = "```\n\n\n\n\n```\n";

        assert_eq!(transform_with(input, &opts), input);
    }

    #[test]
    fn looks_up_optional_transforms_by_name() {
        for transform in OptionalTransform::ALL {
            assert_eq!(OptionalTransform::from_name(transform.name()), Some(transform));
        }
        assert_eq!(OptionalTransform::from_name("code_snippet"), None);
    }

    #[test]
    fn enable_sets_matching_flag() {
        let mut opts = TransformOptions::default();
        opts.enable(OptionalTransform::CollapseBlanks);

        assert!(opts.collapse_blank_runs);
        assert!(!opts.language_hints);
        assert!(!opts.close_unterminated);
    }
}
