//! Python source to HTML markup.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

const TAB_WIDTH: usize = 8;
const FONT_SIZE_PERCENT: u32 = 120;

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenClass {
    Number,
    Op,
    String,
    Comment,
    Name,
    Keyword,
    Error,
    Text,
}

impl TokenClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Op => "op",
            Self::String => "string",
            Self::Comment => "comment",
            Self::Name => "name",
            Self::Keyword => "keyword",
            Self::Error => "error",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for TokenClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token class to color. `None` leaves the token unmarked; `"black"` only bolds it.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ColorTable(BTreeMap<TokenClass, Option<String>>);

impl Default for ColorTable {
    fn default() -> Self {
        let mut colors = BTreeMap::new();
        colors.insert(TokenClass::Number, Some("black".to_string()));
        colors.insert(TokenClass::Op, None);
        colors.insert(TokenClass::String, Some("brown".to_string()));
        colors.insert(TokenClass::Comment, Some("green".to_string()));
        colors.insert(TokenClass::Name, None);
        colors.insert(TokenClass::Error, Some("red".to_string()));
        colors.insert(TokenClass::Keyword, Some("blue".to_string()));
        colors.insert(TokenClass::Text, Some("black".to_string()));
        Self(colors)
    }
}

impl ColorTable {
    /// Overrides entries of the default table.
    pub fn with_overrides(overrides: &ColorTable) -> Self {
        let mut table = Self::default();
        for (class, color) in &overrides.0 {
            table.0.insert(*class, color.clone());
        }
        table
    }

    /// Classes without an entry fall back to the `text` color.
    pub fn color(&self, class: TokenClass) -> Option<&str> {
        match self.0.get(&class) {
            Some(color) => color.as_deref(),
            None => self.0.get(&TokenClass::Text).and_then(|color| color.as_deref()),
        }
    }

    pub fn set(&mut self, class: TokenClass, color: Option<String>) {
        self.0.insert(class, color);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub class: Option<TokenClass>,
    pub text: &'a str,
}

fn token_regex() -> &'static Regex {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    TOKEN_RE.get_or_init(|| {
        Regex::new(concat!(
            r#"(?s)(?P<ws>\s+)"#,
            r#"|(?P<comment>#[^\n]*)"#,
            r#"|(?P<string>(?i:[rbuf]{0,2})(?:"""(?:\\.|[^\\])*?"""|'''(?:\\.|[^\\])*?'''|"(?:\\.|[^"\\\n])*"|'(?:\\.|[^'\\\n])*'))"#,
            r#"|(?P<number>0[xX][0-9a-fA-F_]+|0[oO][0-7_]+|0[bB][01_]+|(?:\d[\d_]*(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?[jJ]?)"#,
            r#"|(?P<name>[^\W\d]\w*)"#,
            r#"|(?P<op>\*\*=?|//=?|>>=?|<<=?|->|:=|\.\.\.|[-+*/%&|^=<>!@]=?|[()\[\]{},:.;~])"#,
            r#"|(?P<error>.)"#,
        ))
        .expect("token pattern is valid")
    })
}

/// Splits source into tokens; whitespace comes back with `class: None`.
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    let re = token_regex();
    re.captures_iter(source)
        .filter_map(|caps| {
            let (class, matched) = if let Some(m) = caps.name("ws") {
                (None, m)
            } else if let Some(m) = caps.name("comment") {
                (Some(TokenClass::Comment), m)
            } else if let Some(m) = caps.name("string") {
                (Some(TokenClass::String), m)
            } else if let Some(m) = caps.name("number") {
                (Some(TokenClass::Number), m)
            } else if let Some(m) = caps.name("name") {
                let class = if KEYWORDS.contains(&m.as_str()) {
                    TokenClass::Keyword
                } else {
                    TokenClass::Name
                };
                (Some(class), m)
            } else if let Some(m) = caps.name("op") {
                (Some(TokenClass::Op), m)
            } else {
                (Some(TokenClass::Error), caps.name("error")?)
            };
            Some(Token {
                class,
                text: matched.as_str(),
            })
        })
        .collect()
}

pub fn expand_tabs(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut column = 0usize;
    for ch in source.chars() {
        match ch {
            '\t' => {
                let pad = TAB_WIDTH - column % TAB_WIDTH;
                out.extend(std::iter::repeat(' ').take(pad));
                column += pad;
            }
            '\n' | '\r' => {
                out.push(ch);
                column = 0;
            }
            _ => {
                out.push(ch);
                column += 1;
            }
        }
    }
    out
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Colorizes source text, without the surrounding `<pre>` block.
pub fn colorize(source: &str, colors: &ColorTable) -> String {
    let expanded = expand_tabs(source);
    let raw = expanded.trim();
    let mut out = String::with_capacity(raw.len() * 2);
    for token in tokenize(raw) {
        let Some(class) = token.class else {
            out.push_str(token.text);
            continue;
        };
        let text = escape_html(token.text);
        match colors.color(class) {
            None => out.push_str(&text),
            Some("black") => {
                out.push_str("<b>");
                out.push_str(&text);
                out.push_str("</b>");
            }
            Some(color) => {
                out.push_str(&format!("<b style=\"color:{}\">{}</b>", color, text));
            }
        }
    }
    out
}

pub fn render_page(source: &str, colors: &ColorTable) -> String {
    format!(
        "<pre style=\"font-size:{}%\">\n{}\n</pre>\n",
        FONT_SIZE_PERCENT,
        colorize(source, colors)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(source: &str) -> Vec<(Option<TokenClass>, &str)> {
        tokenize(source)
            .into_iter()
            .map(|token| (token.class, token.text))
            .collect()
    }

    #[test]
    fn tokenizer_classifies_python_source() {
        assert_eq!(
            classes("def f(x): return x**2 # sq"),
            vec![
                (Some(TokenClass::Keyword), "def"),
                (None, " "),
                (Some(TokenClass::Name), "f"),
                (Some(TokenClass::Op), "("),
                (Some(TokenClass::Name), "x"),
                (Some(TokenClass::Op), ")"),
                (Some(TokenClass::Op), ":"),
                (None, " "),
                (Some(TokenClass::Keyword), "return"),
                (None, " "),
                (Some(TokenClass::Name), "x"),
                (Some(TokenClass::Op), "**"),
                (Some(TokenClass::Number), "2"),
                (None, " "),
                (Some(TokenClass::Comment), "# sq"),
            ]
        );
    }

    #[test]
    fn strings_include_prefixes_and_triple_quotes() {
        let tokens = classes("r'a\\'b' \"\"\"x\ny\"\"\"");
        assert_eq!(tokens[0], (Some(TokenClass::String), "r'a\\'b'"));
        assert_eq!(tokens[2], (Some(TokenClass::String), "\"\"\"x\ny\"\"\""));
    }

    #[test]
    fn unterminated_quote_is_an_error_token() {
        let tokens = classes("'open");
        assert_eq!(tokens[0], (Some(TokenClass::Error), "'"));
        assert_eq!(tokens[1], (Some(TokenClass::Name), "open"));
    }

    #[test]
    fn colorize_marks_up_and_escapes() {
        let html = colorize("if a < 1: print('<b>')", &ColorTable::default());
        assert_eq!(
            html,
            "<b style=\"color:blue\">if</b> a &lt; <b>1</b>: print(<b style=\"color:brown\">'&lt;b&gt;'</b>)"
        );
    }

    #[test]
    fn colorize_expands_tabs_and_trims() {
        let html = colorize("\n\tx\n", &ColorTable::default());
        assert_eq!(html, "x");
        let html = colorize("a\tb", &ColorTable::default());
        assert_eq!(html, "a       b");
    }

    #[test]
    fn overrides_and_text_fallback() {
        let mut overrides = ColorTable(BTreeMap::new());
        overrides.set(TokenClass::Comment, None);
        overrides.set(TokenClass::Op, Some("gray".to_string()));
        let table = ColorTable::with_overrides(&overrides);
        assert_eq!(table.color(TokenClass::Comment), None);
        assert_eq!(table.color(TokenClass::Op), Some("gray"));
        assert_eq!(table.color(TokenClass::Keyword), Some("blue"));

        let sparse = ColorTable(BTreeMap::from([(TokenClass::Text, Some("black".to_string()))]));
        assert_eq!(sparse.color(TokenClass::Number), Some("black"));
    }

    #[test]
    fn color_table_deserializes_from_yaml() {
        let table: ColorTable =
            serde_yaml::from_str("comment: gray\nop: null\nkeyword: purple\n").expect("yaml");
        assert_eq!(table.color(TokenClass::Comment), Some("gray"));
        assert_eq!(table.color(TokenClass::Op), None);
        assert_eq!(table.color(TokenClass::String), None);
    }

    #[test]
    fn render_page_wraps_in_pre() {
        let page = render_page("1", &ColorTable::default());
        assert_eq!(page, "<pre style=\"font-size:120%\">\n<b>1</b>\n</pre>\n");
    }
}
