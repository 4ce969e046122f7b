//! Import specifier scanner.
//!
//! Finds import/export-from/require specifiers in JavaScript source without
//! parsing it. Comments are skipped; malformed or unterminated constructs
//! yield no specifier rather than an error.

use std::collections::HashSet;

/// How far past a keyword a single statement is scanned before giving up.
const STATEMENT_SCAN_LIMIT: usize = 1000;

/// Import specifier found in source code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Specifier exactly as written.
    pub specifier: String,
    /// 1-indexed line of the statement that declared it.
    pub line: u32,
}

/// Scan source for `import ... from`, side-effect `import`, `export ... from`,
/// `require(...)` and dynamic `import(...)` specifiers.
///
/// Returns specifiers in first-appearance order, deduplicated.
#[must_use]
pub fn scan_specifiers(source: &str) -> Vec<ImportSpec> {
    Scanner::new(source).run()
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    found: Vec<ImportSpec>,
    seen: HashSet<String>,
}

impl Scanner {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            found: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn run(mut self) -> Vec<ImportSpec> {
        while self.pos < self.chars.len() {
            if self.at_str("//") {
                self.skip_line_comment();
            } else if self.at_str("/*") {
                self.skip_block_comment();
            } else if self.at_keyword("import") {
                self.scan_import();
            } else if self.at_keyword("export") {
                self.scan_export();
            } else if self.at_keyword("require") {
                self.scan_require();
            } else {
                self.bump();
            }
        }
        self.found
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) {
        if self.peek() == Some('\n') {
            self.line += 1;
        }
        self.pos += 1;
    }

    fn at_str(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(offset, c)| self.peek_at(offset) == Some(c))
    }

    /// Keyword match with word boundaries on both sides.
    fn at_keyword(&self, keyword: &str) -> bool {
        if !self.at_str(keyword) {
            return false;
        }
        let is_word = |c: char| c.is_alphanumeric() || c == '_';
        if self.pos > 0 && self.chars.get(self.pos - 1).copied().is_some_and(is_word) {
            return false;
        }
        !self.peek_at(keyword.len()).is_some_and(is_word)
    }

    fn skip_line_comment(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) {
        self.bump();
        self.bump();
        while self.pos < self.chars.len() && !self.at_str("*/") {
            self.bump();
        }
        self.bump();
        self.bump();
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Read a quoted string at the cursor. `None` when the cursor is not on a
    /// quote or the string never terminates.
    fn read_string(&mut self) -> Option<String> {
        let quote = match self.peek() {
            Some(c @ ('"' | '\'' | '`')) => c,
            _ => return None,
        };
        self.bump();

        let mut value = String::new();
        while let Some(c) = self.peek() {
            if c == quote {
                self.bump();
                return Some(value);
            }
            if c == '\\' {
                self.bump();
                if let Some(escaped) = self.peek() {
                    value.push(escaped);
                    self.bump();
                }
                continue;
            }
            value.push(c);
            self.bump();
        }
        None
    }

    fn record(&mut self, specifier: String, line: u32) {
        if specifier.is_empty() || !self.seen.insert(specifier.clone()) {
            return;
        }
        self.found.push(ImportSpec { specifier, line });
    }

    /// `import ... from "x"`, `import "x"`, or dynamic `import("x")`.
    fn scan_import(&mut self) {
        let line = self.line;
        self.pos += "import".len();
        self.skip_whitespace();

        if self.peek() == Some('(') {
            self.bump();
            self.skip_whitespace();
            if let Some(spec) = self.read_string() {
                self.record(spec, line);
            }
            return;
        }

        // The first string in the statement is the specifier, both for
        // side-effect imports and after a `from` clause.
        let limit = self.pos + STATEMENT_SCAN_LIMIT;
        while let Some(c) = self.peek() {
            if self.pos > limit || c == ';' {
                return;
            }
            if matches!(c, '"' | '\'' | '`') {
                if let Some(spec) = self.read_string() {
                    self.record(spec, line);
                }
                return;
            }
            self.bump();
        }
    }

    /// `export ... from "x"`. Exports without a `from` clause end at the
    /// statement boundary without recording anything.
    fn scan_export(&mut self) {
        let line = self.line;
        self.pos += "export".len();

        let limit = self.pos + STATEMENT_SCAN_LIMIT;
        while let Some(c) = self.peek() {
            if self.pos > limit || c == ';' {
                return;
            }
            if self.at_keyword("from") {
                self.pos += "from".len();
                self.skip_whitespace();
                if let Some(spec) = self.read_string() {
                    self.record(spec, line);
                }
                return;
            }
            if matches!(c, '"' | '\'' | '`') {
                // String in the exported expression, not a specifier
                self.read_string();
                continue;
            }
            self.bump();
        }
    }

    /// `require("x")`. Member accesses like `require.resolve` are not calls
    /// and are skipped.
    fn scan_require(&mut self) {
        let line = self.line;
        self.pos += "require".len();
        self.skip_whitespace();

        if self.peek() != Some('(') {
            return;
        }
        self.bump();
        self.skip_whitespace();

        if let Some(spec) = self.read_string() {
            self.record(spec, line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(source: &str) -> Vec<String> {
        scan_specifiers(source)
            .into_iter()
            .map(|s| s.specifier)
            .collect()
    }

    #[test]
    fn test_import_from() {
        assert_eq!(specs(r#"import { foo } from "./dep";"#), ["./dep"]);
    }

    #[test]
    fn test_import_default() {
        assert_eq!(specs(r#"import foo from "lodash";"#), ["lodash"]);
    }

    #[test]
    fn test_import_side_effect() {
        assert_eq!(specs(r#"import "./polyfill";"#), ["./polyfill"]);
    }

    #[test]
    fn test_import_star() {
        assert_eq!(specs(r#"import * as utils from "./utils";"#), ["./utils"]);
    }

    #[test]
    fn test_dynamic_import() {
        assert_eq!(specs(r#"const mod = await import("./dynamic");"#), ["./dynamic"]);
    }

    #[test]
    fn test_require() {
        assert_eq!(specs(r#"const dep = require("./dep");"#), ["./dep"]);
    }

    #[test]
    fn test_require_resolve_is_not_a_call() {
        assert!(specs(r#"const p = require.resolve("./dep");"#).is_empty());
    }

    #[test]
    fn test_export_from() {
        assert_eq!(specs(r#"export { foo } from "./dep";"#), ["./dep"]);
    }

    #[test]
    fn test_export_star_from() {
        assert_eq!(specs(r#"export * from "./dep";"#), ["./dep"]);
    }

    #[test]
    fn test_export_without_from() {
        assert!(specs("export const answer = 42;").is_empty());
    }

    #[test]
    fn test_line_comment_skipped() {
        let source = "// import foo from \"commented\"\nimport bar from \"./real\";\n";
        assert_eq!(specs(source), ["./real"]);
    }

    #[test]
    fn test_block_comment_skipped() {
        let source = "/*\nimport foo from \"commented\"\nrequire(\"also-commented\")\n*/\nimport bar from \"./real\";\n";
        assert_eq!(specs(source), ["./real"]);
    }

    #[test]
    fn test_first_appearance_order() {
        let source = "import a from \"./a\";\nconst b = require(\"./b\");\nexport { c } from \"./c\";\n";
        assert_eq!(specs(source), ["./a", "./b", "./c"]);
    }

    #[test]
    fn test_deduplicates() {
        let source = "import a from \"./dep\";\nconst b = require(\"./dep\");\n";
        assert_eq!(specs(source), ["./dep"]);
    }

    #[test]
    fn test_single_quotes_and_backticks() {
        assert_eq!(specs("import foo from './single';"), ["./single"]);
        assert_eq!(specs("const x = require(`./tick`);"), ["./tick"]);
    }

    #[test]
    fn test_line_numbers_point_at_statement() {
        let source = "\nimport a from \"./a\";\n\nconst b = require(\"./b\");\n";
        let found = scan_specifiers(source);
        assert_eq!(found[0].line, 2);
        assert_eq!(found[1].line, 4);
    }

    #[test]
    fn test_unterminated_string_yields_nothing() {
        assert!(specs(r#"import foo from "./broken"#).is_empty());
    }

    #[test]
    fn test_empty_and_plain_source() {
        assert!(specs("").is_empty());
        assert!(specs("console.log('hello');").is_empty());
    }

    #[test]
    fn test_keyword_in_identifier_ignored() {
        assert!(specs("const importable = 1; const requires = 2;").is_empty());
    }

    #[test]
    fn test_scoped_package() {
        assert_eq!(specs(r#"import t from "@scope/package";"#), ["@scope/package"]);
    }
}
