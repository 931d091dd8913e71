//! Readers for the SRG family of mapping formats and a TSRG v2 writer.
//!
//! | format  | shape                                                            |
//! |---------|------------------------------------------------------------------|
//! | SRG     | `CL: a b`, `FD: a/f b/g`, `MD: a/m (desc) b/n (desc)`, `PK: ...`  |
//! | CSRG    | `a b`, `a f g`, `a m (desc) n`                                   |
//! | TSRG    | `a b` followed by tab-indented `f g` and `m (desc) n` lines      |
//! | TSRG v2 | `tsrg2 left right ...` header, namespaced columns, parameters    |
//!
//! The format is detected from the content. `#` starts a comment.

use super::{ClassMapping, Mappings};
use rejar_utils::errors::MappingError;
use std::fmt::Write as _;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Srg,
    Csrg,
    Tsrg,
    Tsrg2 { namespaces: usize },
}

/// Reads and parses a mapping file.
pub fn load(path: &Path) -> Result<Mappings, MappingError> {
    let text = std::fs::read_to_string(path).map_err(|source| MappingError::FileRead {
        path: path.display().to_string(),
        source,
    })?;
    let mappings = parse(&text)?;
    debug!("loaded {} class mappings from {}", mappings.len(), path.display());
    Ok(mappings)
}

/// Parses mapping text in any supported format.
pub fn parse(text: &str) -> Result<Mappings, MappingError> {
    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, strip_comment(l)))
        .filter(|(_, l)| !l.trim().is_empty())
        .collect();

    let format = detect(&lines)?;
    debug!(?format, "detected mapping format");
    let mut parser = Parser {
        mappings: Mappings::new(),
        current_class: None,
        current_method: None,
    };
    let body = match format {
        Format::Tsrg2 { .. } => &lines[1..],
        _ => &lines[..],
    };
    for &(number, line) in body {
        match format {
            Format::Srg => parser.srg_line(number, line)?,
            Format::Csrg => parser.csrg_line(number, line)?,
            Format::Tsrg => parser.tsrg_line(number, line, 2)?,
            Format::Tsrg2 { namespaces } => parser.tsrg_line(number, line, namespaces)?,
        }
    }
    Ok(parser.mappings)
}

fn strip_comment(line: &str) -> &str {
    let line = line.trim_end_matches('\r');
    match line.find('#') {
        Some(pos) => line[..pos].trim_end(),
        None => line.trim_end(),
    }
}

fn detect(lines: &[(usize, &str)]) -> Result<Format, MappingError> {
    let Some(&(_, first)) = lines.first() else {
        // An empty file is an empty mapping.
        return Ok(Format::Csrg);
    };
    if let Some(header) = first.strip_prefix("tsrg2 ") {
        let namespaces = header.split_whitespace().count();
        if namespaces < 2 {
            return Err(MappingError::Parse {
                line: lines[0].0,
                msg: "tsrg2 header needs at least two namespaces".into(),
                raw: first.to_owned(),
            });
        }
        return Ok(Format::Tsrg2 { namespaces });
    }
    if ["PK:", "CL:", "FD:", "MD:"].iter().any(|p| first.starts_with(p)) {
        return Ok(Format::Srg);
    }
    if first.starts_with('\t') {
        return Err(MappingError::UnknownFormat);
    }
    if lines.iter().any(|(_, l)| l.starts_with('\t')) {
        Ok(Format::Tsrg)
    } else {
        Ok(Format::Csrg)
    }
}

struct Parser {
    mappings: Mappings,
    current_class: Option<String>,
    current_method: Option<(String, String)>,
}

fn parse_error(line: usize, msg: impl Into<String>, raw: &str) -> MappingError {
    MappingError::Parse {
        line,
        msg: msg.into(),
        raw: raw.to_owned(),
    }
}

/// Splits `owner/name` at the last slash.
fn split_member(full: &str) -> Option<(&str, &str)> {
    full.rsplit_once('/')
}

impl Parser {
    fn srg_line(&mut self, number: usize, line: &str) -> Result<(), MappingError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["PK:", ..] => {}
            ["CL:", from, to] => {
                self.mappings.add_class(from, to);
            }
            ["FD:", from, to] => {
                let (owner, name) = split_member(from).ok_or_else(|| parse_error(number, "field without owner", line))?;
                let (_, mapped) = split_member(to).ok_or_else(|| parse_error(number, "field without owner", line))?;
                self.mappings.class_mut(owner).add_field(name, mapped, None);
            }
            ["MD:", from, desc, to, _to_desc] => {
                let (owner, name) = split_member(from).ok_or_else(|| parse_error(number, "method without owner", line))?;
                let (_, mapped) = split_member(to).ok_or_else(|| parse_error(number, "method without owner", line))?;
                check_method_descriptor(number, desc, line)?;
                self.mappings.class_mut(owner).add_method(name, desc, mapped);
            }
            _ => return Err(parse_error(number, "unrecognized srg line", line)),
        }
        Ok(())
    }

    fn csrg_line(&mut self, number: usize, line: &str) -> Result<(), MappingError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            [from, to] => {
                self.mappings.add_class(from, to);
            }
            [owner, from, to] => {
                self.mappings.class_mut(owner).add_field(from, to, None);
            }
            [owner, from, desc, to] => {
                check_method_descriptor(number, desc, line)?;
                self.mappings.class_mut(owner).add_method(from, desc, to);
            }
            _ => return Err(parse_error(number, "unrecognized csrg line", line)),
        }
        Ok(())
    }

    /// Handles TSRG v1 (`namespaces == 2`, no parameters) and TSRG v2 lines. Only the first
    /// two namespaces are used.
    fn tsrg_line(&mut self, number: usize, line: &str, namespaces: usize) -> Result<(), MappingError> {
        let depth = line.chars().take_while(|&c| c == '\t').count();
        let parts: Vec<&str> = line.split_whitespace().collect();
        match depth {
            0 => {
                if parts.len() != namespaces {
                    return Err(parse_error(number, "class line has wrong column count", line));
                }
                self.mappings.add_class(parts[0], parts[1]);
                self.current_class = Some(parts[0].to_owned());
                self.current_method = None;
            }
            1 => {
                let class = self.class_for(number, line)?;
                if parts.len() == namespaces + 1 && parts[1].starts_with('(') {
                    check_method_descriptor(number, parts[1], line)?;
                    class.add_method(parts[0], parts[1], parts[2]);
                    self.current_method = Some((parts[0].to_owned(), parts[1].to_owned()));
                } else if parts.len() == namespaces + 1 {
                    class.add_field(parts[0], parts[2], Some(parts[1]));
                    self.current_method = None;
                } else if parts.len() == namespaces {
                    class.add_field(parts[0], parts[1], None);
                    self.current_method = None;
                } else {
                    return Err(parse_error(number, "member line has wrong column count", line));
                }
            }
            2 => {
                if parts.as_slice() == ["static"] {
                    return Ok(());
                }
                let Some((name, desc)) = self.current_method.clone() else {
                    return Err(parse_error(number, "parameter outside of a method", line));
                };
                if parts.len() != namespaces + 1 {
                    return Err(parse_error(number, "parameter line has wrong column count", line));
                }
                let slot = parts[0]
                    .parse::<u16>()
                    .map_err(|_| parse_error(number, "parameter index is not a number", line))?;
                let method = self
                    .class_for(number, line)?
                    .methods
                    .get_mut(&(name, desc))
                    .ok_or_else(|| parse_error(number, "parameter outside of a method", line))?;
                method.add_param(slot, parts[1], parts[2]);
            }
            _ => return Err(parse_error(number, "unexpected indentation", line)),
        }
        Ok(())
    }

    fn class_for(&mut self, number: usize, line: &str) -> Result<&mut ClassMapping, MappingError> {
        match &self.current_class {
            Some(name) => Ok(self.mappings.class_mut(name)),
            None => Err(parse_error(number, "member outside of a class", line)),
        }
    }
}

fn check_method_descriptor(number: usize, desc: &str, line: &str) -> Result<(), MappingError> {
    crate::descriptor::MethodDescriptor::parse(desc)
        .map(|_| ())
        .map_err(|e| parse_error(number, e.to_string(), line))
}

/// Writes mappings as TSRG v2 with the namespaces `left` and `right`.
pub fn write_tsrg2(mappings: &Mappings) -> String {
    let mut out = String::from("tsrg2 left right\n");
    for class in mappings.classes() {
        let _ = writeln!(out, "{} {}", class.original, class.mapped);
        for field in class.fields.values() {
            match &field.descriptor {
                Some(desc) => {
                    let _ = writeln!(out, "\t{} {} {}", field.original, desc, field.mapped);
                }
                None => {
                    let _ = writeln!(out, "\t{} {}", field.original, field.mapped);
                }
            }
        }
        for method in class.methods.values() {
            let _ = writeln!(out, "\t{} {} {}", method.original, method.descriptor, method.mapped);
            for p in &method.params {
                let _ = writeln!(out, "\t\t{} {} {}", p.slot, p.original, p.mapped);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srg() {
        let m = parse(
            "PK: . net\nCL: a net/Foo\nFD: a/b net/Foo/count\nMD: a/c (La;)V net/Foo/merge (Lnet/Foo;)V\n",
        )
        .unwrap();
        assert_eq!(m.class_name("a"), Some("net/Foo"));
        assert_eq!(m.field_name("a", "b", Some("I")), Some("count"));
        assert_eq!(m.method_name("a", "c", "(La;)V"), Some("merge"));
    }

    #[test]
    fn csrg_with_comments() {
        let m = parse("# header\na net/Foo\na b count # trailing\na c (I)V run\n").unwrap();
        assert_eq!(m.class_name("a"), Some("net/Foo"));
        assert_eq!(m.field_name("a", "b", None), Some("count"));
        assert_eq!(m.method_name("a", "c", "(I)V"), Some("run"));
    }

    #[test]
    fn tsrg_v1() {
        let m = parse("a net/Foo\n\tb count\n\tc (I)V run\nd net/Bar\n").unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.method_name("a", "c", "(I)V"), Some("run"));
        assert_eq!(m.class_name("d"), Some("net/Bar"));
    }

    #[test]
    fn tsrg_v2_with_params_and_extra_namespace() {
        let text = "tsrg2 obf srg id\na net/Foo 1\n\tb I count 2\n\tc (IJ)V run 3\n\t\tstatic\n\t\t0 x amount 4\n\t\t1 y total 5\n";
        let m = parse(text).unwrap();
        assert_eq!(m.field_name("a", "b", Some("I")), Some("count"));
        assert_eq!(m.method_name("a", "c", "(IJ)V"), Some("run"));
        assert_eq!(m.parameter_name("a", "c", "(IJ)V", 0), Some("amount"));
        assert_eq!(m.parameter_name("a", "c", "(IJ)V", 1), Some("total"));
    }

    #[test]
    fn written_tsrg2_reads_back() {
        let m = parse("tsrg2 left right\na net/Foo\n\tb count\n\tc (La;)V merge\n\t\t1 p other\n").unwrap();
        assert_eq!(parse(&write_tsrg2(&m)).unwrap(), m);
    }

    #[test]
    fn errors_carry_line_numbers() {
        let err = parse("a net/Foo\n\tc (I run\n").unwrap_err();
        assert!(matches!(err, MappingError::Parse { line: 2, .. }));
        assert!(matches!(parse("\tb c\n"), Err(MappingError::UnknownFormat)));
    }
}
