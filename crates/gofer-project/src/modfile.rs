//! `go.mod` parsing, limited to the directives the workspace model uses.

use gofer_core::{TextRange, TextSize};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDirective {
    pub path: String,
    pub range: TextRange,
}

/// A `replace` directive whose target is a local directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replace {
    pub old_path: String,
    /// Target directory as written, relative to the module root unless absolute.
    pub new_path: String,
    pub new_path_range: TextRange,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModFile {
    pub module: Option<ModuleDirective>,
    pub replaces: Vec<Replace>,
}

#[derive(Debug, Clone, Copy)]
struct Field<'a> {
    text: &'a str,
    range: TextRange,
}

fn range(start: usize, end: usize) -> TextRange {
    TextRange::new(TextSize::from(start as u32), TextSize::from(end as u32))
}

/// Splits one line into whitespace-separated fields. Quoted fields keep the
/// range of their contents; `//` starts a comment outside quotes.
fn fields(line: &str, line_start: usize) -> Vec<Field<'_>> {
    let bytes = line.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\r' => i += 1,
            b'/' if bytes.get(i + 1) == Some(&b'/') => break,
            quote @ (b'"' | b'`') => {
                let start = i + 1;
                let end = line[start..]
                    .find(quote as char)
                    .map(|pos| start + pos)
                    .unwrap_or(line.len());
                out.push(Field {
                    text: &line[start..end],
                    range: range(line_start + start, line_start + end),
                });
                i = end + 1;
            }
            _ => {
                let start = i;
                while i < bytes.len() && !matches!(bytes[i], b' ' | b'\t' | b'\r') {
                    if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'/') {
                        break;
                    }
                    i += 1;
                }
                out.push(Field {
                    text: &line[start..i],
                    range: range(line_start + start, line_start + i),
                });
            }
        }
    }
    out
}

fn is_local_path(path: &str) -> bool {
    path == "."
        || path == ".."
        || path.starts_with("./")
        || path.starts_with("../")
        || path.starts_with('/')
}

pub fn parse_modfile(text: &str) -> ModFile {
    let mut out = ModFile::default();
    let mut block: Option<&str> = None;
    let mut line_start = 0;

    for line in text.split_inclusive('\n') {
        let fields = fields(line.trim_end_matches('\n'), line_start);
        line_start += line.len();
        let Some(first) = fields.first() else {
            continue;
        };

        let (verb, args) = match block {
            Some(_) if first.text == ")" => {
                block = None;
                continue;
            }
            Some(verb) => (verb, &fields[..]),
            None if fields.len() == 2 && fields[1].text == "(" => {
                block = Some(first.text);
                continue;
            }
            None => (first.text, &fields[1..]),
        };

        match verb {
            "module" => {
                if let Some(path) = args.first() {
                    out.module = Some(ModuleDirective {
                        path: path.text.to_owned(),
                        range: path.range,
                    });
                }
            }
            "replace" => {
                let Some(arrow) = args.iter().position(|f| f.text == "=>") else {
                    continue;
                };
                let (Some(old), Some(new)) = (args.first(), args.get(arrow + 1)) else {
                    continue;
                };
                // `old => new vX.Y.Z` targets a module version, not a directory.
                if args.len() == arrow + 2 && is_local_path(new.text) {
                    out.replaces.push(Replace {
                        old_path: old.text.to_owned(),
                        new_path: new.text.to_owned(),
                        new_path_range: new.range,
                    });
                }
            }
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn parses_module_and_local_replaces() {
        let text = r#"module mod.com // the root

go 1.18

require (
    mod.com/foo/bar v0.0.0
)

replace mod.com/foo/bar => ./foo/bar

replace (
	example.com/a v1.0.0 => ../a
	example.com/b => example.com/c v1.2.0
	"example.com/d" => "./vendored/d"
)
"#;
        let modfile = parse_modfile(text);
        let module = modfile.module.unwrap();
        assert_eq!(module.path, "mod.com");
        assert_eq!(&text[module.range], "mod.com");

        let replaces: Vec<_> = modfile
            .replaces
            .iter()
            .map(|r| (r.old_path.as_str(), r.new_path.as_str(), &text[r.new_path_range]))
            .collect();
        assert_eq!(
            replaces,
            vec![
                ("mod.com/foo/bar", "./foo/bar", "./foo/bar"),
                ("example.com/a", "../a", "../a"),
                ("example.com/d", "./vendored/d", "./vendored/d"),
            ]
        );
    }

    #[test]
    fn missing_module_directive() {
        assert_eq!(parse_modfile("go 1.14\n").module, None);
    }
}
