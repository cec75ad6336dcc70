//! Statement text plus its parameters

use crate::engine::Params;
use crate::value::{literal, NativeValue};
use serde::{Deserialize, Serialize};

/// How statement parameters reach the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterMode {
    /// Values travel separately from the text as `$name` bindings
    #[default]
    Bind,
    /// Values are rendered as escaped literals into the text
    Inline,
}

/// A statement ready to be sent to the engine
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    pub text: String,
    pub params: Params,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Params::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<NativeValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Apply a parameter mode; `Bind` leaves the statement as is
    pub fn prepare(self, mode: ParameterMode) -> Statement {
        match mode {
            ParameterMode::Bind => self,
            ParameterMode::Inline => self.inline(),
        }
    }

    /// Replace every `$name` outside of quoted text with the literal of its
    /// value. Unknown parameters are left in place.
    pub fn inline(&self) -> Statement {
        let mut out = String::with_capacity(self.text.len());
        let mut chars = self.text.char_indices().peekable();
        let mut quote: Option<char> = None;

        while let Some((pos, c)) = chars.next() {
            match quote {
                Some(q) => {
                    out.push(c);
                    if c == '\\' {
                        if let Some((_, escaped)) = chars.next() {
                            out.push(escaped);
                        }
                    } else if c == q {
                        quote = None;
                    }
                }
                None if c == '\'' || c == '"' || c == '`' => {
                    quote = Some(c);
                    out.push(c);
                }
                None if c == '$' => {
                    let start = pos + 1;
                    let mut end = start;
                    while let Some(&(i, n)) = chars.peek() {
                        if n.is_ascii_alphanumeric() || n == '_' {
                            end = i + n.len_utf8();
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    let name = &self.text[start..end];
                    match self.params.get(name) {
                        Some(value) if !name.is_empty() => out.push_str(&literal(value)),
                        _ => {
                            out.push('$');
                            out.push_str(name);
                        }
                    }
                }
                None => out.push(c),
            }
        }

        Statement::new(out)
    }
}
