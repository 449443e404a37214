//! Converts a header-style source file into a browsable HTML page: each
//! `/** ... */` comment block is paired with the declaration immediately
//! following it (up to the first `{` or blank line) and rendered as an
//! anchored entry, with an index of signatures up top.
//!
//! Grounded on a small doc-comment-to-HTML renderer that walked a header
//! file the same way: scan for a `/**` block, collect its body lines,
//! then collect the prototype lines that follow until a brace or blank
//! line, repeat to end of file, then emit an index followed by one
//! anchored section per entry.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{bail, Context, Result};
use itertools::Itertools;

struct Entry {
    comment: Vec<String>,
    prototype: Vec<String>,
}

/// Splits `input` into `(comment lines, prototype lines)` pairs.
fn parse_entries(input: &str) -> Result<Vec<Entry>> {
    let mut entries = Vec::new();
    let mut lines = input.lines().peekable();

    while let Some(line) = lines.next() {
        let trimmed = line.trim_start();
        if trimmed != "/**" {
            continue;
        }

        let mut comment = Vec::new();
        loop {
            let line = lines.next().context("unterminated comment block")?;
            let trimmed = line.trim_end();
            if trimmed.trim_start() == "*/" {
                break;
            }
            let stripped = trimmed
                .trim_start()
                .strip_prefix("* ")
                .or_else(|| trimmed.trim_start().strip_prefix('*'))
                .unwrap_or(trimmed.trim_start());
            comment.push(stripped.to_string());
        }

        let mut prototype = Vec::new();
        loop {
            match lines.peek() {
                None => bail!("comment block at end of file with no following declaration"),
                Some(next) if next.trim().is_empty() => {
                    lines.next();
                    break;
                }
                Some(next) if next.contains('{') => {
                    let before_brace = next.split('{').next().unwrap_or("").trim_end();
                    if !before_brace.is_empty() {
                        prototype.push(before_brace.to_string());
                    }
                    lines.next();
                    break;
                }
                Some(_) => {
                    prototype.push(lines.next().unwrap().trim().to_string());
                }
            }
        }

        entries.push(Entry { comment, prototype });
    }

    Ok(entries)
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// A fixed keyword/type-name list, bolded (and underlined for this
/// crate's own container names) in rendered prototypes.
const KEYWORDS: &[&str] = &[
    "pub", "fn", "struct", "enum", "impl", "const", "static", "unsafe", "where", "bool", "char",
    "usize", "isize", "u8", "u32", "u64", "i8", "i32", "i64", "f32", "f64", "str", "String",
];
const TYPE_NAMES: &[&str] = &["List", "Text", "Vector", "Set", "Map", "Carrier", "Tree", "Spine"];

fn highlight(line: &str) -> String {
    let mut out = escape_html(line);
    for kw in KEYWORDS {
        out = out.replace(&format!(" {kw} "), &format!(" <b>{kw}</b> "));
    }
    for ty in TYPE_NAMES {
        out = out.replace(ty, &format!("<u>{ty}</u>"));
    }
    out
}

fn render(title: &str, entries: &[Entry]) -> String {
    let mut out = String::new();
    let _ = write!(out, "<html>\n<body>\n<h1>{}</h1>\n", escape_html(&title.to_uppercase()));
    out.push_str("<pre style=\"background-color: #FFFFBB;\">\n");
    for (i, entry) in entries.iter().enumerate() {
        let signature = entry.prototype.iter().map(|l| l.as_str()).join(" ");
        let _ = write!(
            out,
            "<a href=\"#function_{title}_{i}\" style=\"text-decoration:none;\">{};</a>\n",
            highlight(&signature)
        );
    }
    out.push_str("</pre>\n");
    for (i, entry) in entries.iter().enumerate() {
        out.push_str("<hr>\n<pre style=\"background-color: #FFFFBB;\">");
        let _ = write!(out, "<a name=\"function_{title}_{i}\">");
        for line in &entry.prototype {
            out.push_str(&highlight(line));
            out.push('\n');
        }
        out.push_str("</a></pre>\n<p>\n");
        for line in &entry.comment {
            let _ = writeln!(out, "\t{}", escape_html(line));
        }
        out.push_str("</p>\n");
    }
    out.push_str("</body>\n</html>\n");
    out
}

fn base_name(path: &Path) -> String {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("header").to_string()
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("usage: {} <header-file>", args.first().map(String::as_str).unwrap_or("header2html"));
        std::process::exit(1);
    }
    let path = Path::new(&args[1]);
    let input = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let entries = parse_entries(&input)?;
    let title = base_name(path);
    print!("{}", render(&title, &entries));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_single_comment_and_prototype() {
        let src = "/**\n * Adds two numbers.\n */\npub fn add(a: i32, b: i32) -> i32 {\n";
        let entries = parse_entries(src).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].comment, vec!["Adds two numbers."]);
        assert_eq!(entries[0].prototype, vec!["pub fn add(a: i32, b: i32) -> i32"]);
    }

    #[test]
    fn escapes_html_in_comments() {
        assert_eq!(escape_html("a < b && b > c"), "a &lt; b &amp;&amp; b &gt; c");
    }

    #[test]
    fn base_name_strips_directory_and_extension() {
        assert_eq!(base_name(Path::new("/a/b/fvector.h")), "fvector");
    }
}
