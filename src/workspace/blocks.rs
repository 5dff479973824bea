//! Extraction of `resource` blocks from generated HCL.
//!
//! This is a structural line scanner, not an HCL parser. A block starts on a
//! line whose trimmed text begins with `resource ` and ends on the first line
//! where the running brace depth is back to zero and the trimmed line ends
//! with `}`. Braces inside double-quoted strings and after `#` or `//`
//! comments are not counted.

use std::fmt;

/// Keyword that opens a resource declaration.
pub const RESOURCE_KEYWORD: &str = "resource ";

/// One `resource` declaration as it appeared in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBlock {
    text: String,
}

impl ResourceBlock {
    /// Source lines of the block, each terminated by `\n`.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns `type.name` taken from the opening line, if both labels are quoted.
    #[must_use]
    pub fn address(&self) -> Option<String> {
        let header = self.text.lines().next()?.trim();
        let rest = header.strip_prefix(RESOURCE_KEYWORD)?;
        let mut labels = quoted_labels(rest);
        let kind = labels.next()?;
        let name = labels.next()?;
        Some(format!("{kind}.{name}"))
    }
}

impl fmt::Display for ResourceBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Extracts every complete `resource` block from `code`, in source order.
///
/// Anything outside a resource block (`terraform`, `provider`, `data`,
/// `variable`, comments) is ignored. A block still open at the end of the
/// input is dropped. Identical blocks are all kept.
#[must_use]
pub fn extract_resource_blocks(code: &str) -> Vec<ResourceBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<String> = None;
    let mut depth: i64 = 0;

    for line in code.split('\n') {
        let trimmed = line.trim();

        if trimmed.starts_with(RESOURCE_KEYWORD) {
            current = Some(String::new());
            depth = 0;
        }

        let Some(block) = current.as_mut() else {
            continue;
        };

        block.push_str(line);
        block.push('\n');
        depth += brace_delta(line);

        if depth == 0 && trimmed.ends_with('}') {
            if let Some(text) = current.take() {
                blocks.push(ResourceBlock { text });
            }
        }
    }

    blocks
}

/// Renders blocks the way they are appended to a config file: each block
/// followed by one blank line.
#[must_use]
pub fn render_blocks(blocks: &[ResourceBlock]) -> String {
    let mut out = String::new();
    for block in blocks {
        out.push_str(block.text());
        out.push('\n');
    }
    out
}

/// Net `{` minus `}` on one line, skipping string literals and comments.
fn brace_delta(line: &str) -> i64 {
    let mut delta = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '#' => break,
            '/' if chars.peek() == Some(&'/') => break,
            '{' => delta += 1,
            '}' => delta -= 1,
            _ => {}
        }
    }

    delta
}

/// Yields the contents of successive `"..."` labels.
fn quoted_labels(s: &str) -> impl Iterator<Item = &str> {
    s.split('"').skip(1).step_by(2)
}
