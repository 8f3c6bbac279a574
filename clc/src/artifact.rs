/*!
Embeddable sources.

A kernel source file `saxpy.cl` becomes `saxpy.hpp`:
```text
#ifndef _SAXPY_HPP_
#define _SAXPY_HPP_

extern const char *saxpy_source;

#endif
```
and `saxpy.cpp`, which defines `saxpy_source` as one string literal with a line per source line.
*/

use anyhow::{format_err, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// The generated header and source of a kernel source file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Artifacts {
    /// File name without extension.
    pub base: String,
    pub header: String,
    pub source: String,
}

impl Artifacts {
    /// Generates the artifacts for `text`, read from `path`.
    pub fn new(path: &Path, text: &str) -> Result<Self> {
        let base = path
            .file_stem()
            .and_then(|x| x.to_str())
            .ok_or_else(|| format_err!("{path:?} has no file name"))?
            .to_string();
        let ident = identifier(&base);
        Ok(Self {
            header: header(&ident),
            source: source(&base, &ident, text),
            base,
        })
    }
    /// Writes `<base>.hpp` and `<base>.cpp` into `dir`. Returns their paths.
    pub fn write(&self, dir: &Path) -> Result<[PathBuf; 2]> {
        let hpp = dir.join(format!("{}.hpp", self.base));
        let cpp = dir.join(format!("{}.cpp", self.base));
        fs::write(&hpp, &self.header).with_context(|| format!("writing {hpp:?}"))?;
        fs::write(&cpp, &self.source).with_context(|| format!("writing {cpp:?}"))?;
        Ok([hpp, cpp])
    }
}

/// Replaces every character outside `[A-Za-z0-9_]` with `_`.
///
/// A leading digit is prefixed with `_`.
pub fn identifier(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident
}

fn header(ident: &str) -> String {
    let guard = format!("_{}_HPP_", ident.to_ascii_uppercase());
    format!(
        "#ifndef {guard}\n#define {guard}\n\nextern const char *{ident}_source;\n\n#endif\n"
    )
}

fn source(base: &str, ident: &str, text: &str) -> String {
    let mut out = format!("#include \"{base}.hpp\"\n\nconst char *{ident}_source =");
    if text.is_empty() {
        out.push_str(" \"\"");
    }
    for line in text.lines() {
        out.push_str("\n  \"");
        for c in line.chars() {
            if matches!(c, '"' | '\\') {
                out.push('\\');
            }
            out.push(c);
        }
        out.push_str("\\n\"");
    }
    out.push_str(";\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_header_guard() {
        let artifacts = Artifacts::new(Path::new("kernels/saxpy.cl"), "").unwrap();
        assert_eq!(artifacts.base, "saxpy");
        assert_eq!(
            artifacts.header,
            "#ifndef _SAXPY_HPP_\n#define _SAXPY_HPP_\n\nextern const char *saxpy_source;\n\n#endif\n"
        );
    }

    #[test]
    fn artifact_source_escapes_lines() {
        let text = "__kernel void k() {\n  printf(\"a\\n\");\n}\n";
        let artifacts = Artifacts::new(Path::new("k.cl"), text).unwrap();
        assert_eq!(
            artifacts.source,
            concat!(
                "#include \"k.hpp\"\n\n",
                "const char *k_source =\n",
                "  \"__kernel void k() {\\n\"\n",
                "  \"  printf(\\\"a\\\\n\\\");\\n\"\n",
                "  \"}\\n\";\n",
            )
        );
    }

    #[test]
    fn artifact_empty_source() {
        let artifacts = Artifacts::new(Path::new("empty.cl"), "").unwrap();
        assert_eq!(
            artifacts.source,
            "#include \"empty.hpp\"\n\nconst char *empty_source = \"\";\n"
        );
    }

    #[test]
    fn artifact_identifiers() {
        assert_eq!(identifier("my-kernel.v2"), "my_kernel_v2");
        assert_eq!(identifier("2d"), "_2d");
        let artifacts = Artifacts::new(Path::new("blur-3x3.cl"), "").unwrap();
        assert_eq!(artifacts.base, "blur-3x3");
        assert!(artifacts.header.contains("_BLUR_3X3_HPP_"));
        assert!(artifacts.header.contains("extern const char *blur_3x3_source;"));
        assert!(artifacts.source.starts_with("#include \"blur-3x3.hpp\""));
    }

    #[test]
    fn artifact_no_file_name() {
        assert!(Artifacts::new(Path::new(".."), "").is_err());
    }
}
