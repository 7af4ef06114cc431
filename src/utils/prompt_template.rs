use regex::Regex;
use std::sync::OnceLock;

use crate::services::dataset::CellValue;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("placeholder {token} does not match any column")]
    Unresolved { token: String },

    #[error("malformed placeholder {token:?} at byte {position}")]
    Malformed { token: String, position: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TemplateMode {
    /// Named when the text has a `[@...]` token and no `{colN}` token, positional otherwise.
    #[default]
    Auto,
    Positional,
    Named,
}

static POSITIONAL_REGEX: OnceLock<Regex> = OnceLock::new();
static NAMED_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_positional_regex() -> &'static Regex {
    POSITIONAL_REGEX.get_or_init(|| Regex::new(r"\{col\d+\}").expect("Invalid regex pattern"))
}

fn get_named_regex() -> &'static Regex {
    NAMED_REGEX.get_or_init(|| Regex::new(r"\[@[^\]]*\]").expect("Invalid regex pattern"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
    mode: TemplateMode,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>, mode: TemplateMode) -> Self {
        let text = text.into();
        let mode = match mode {
            TemplateMode::Auto => detect_mode(&text),
            explicit => explicit,
        };
        Self { text, mode }
    }

    /// `Summarize this: h1: {col1}, h2: {col2}, ...`
    pub fn default_for(headers: &[String]) -> Self {
        let fields: Vec<String> = headers
            .iter()
            .enumerate()
            .map(|(i, header)| format!("{}: {{col{}}}", header, i + 1))
            .collect();

        Self::new(format!("Summarize this: {}", fields.join(", ")), TemplateMode::Positional)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Always `Positional` or `Named`; `Auto` is resolved at construction.
    pub fn mode(&self) -> TemplateMode {
        self.mode
    }

    pub fn render(&self, headers: &[String], values: &[CellValue]) -> Result<String, TemplateError> {
        match self.mode {
            TemplateMode::Named => Ok(render_named(&self.text, headers, values)),
            TemplateMode::Positional | TemplateMode::Auto => render_positional(&self.text, values),
        }
    }
}

fn detect_mode(text: &str) -> TemplateMode {
    if get_named_regex().is_match(text) && !get_positional_regex().is_match(text) {
        TemplateMode::Named
    } else {
        TemplateMode::Positional
    }
}

/// Placeholders a user can reference for the given headers, positional form first.
pub fn available_placeholders(headers: &[String]) -> Vec<String> {
    let positional = (1..=headers.len()).map(|i| format!("{{col{}}}", i));
    let named = headers.iter().map(|h| format!("[@{}]", h));
    positional.chain(named).collect()
}

/// `{colN}` substitution with `{{` / `}}` as literal braces. Anything else inside braces
/// is an error.
pub fn render_positional(template: &str, values: &[CellValue]) -> Result<String, TemplateError> {
    let mut output = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        match c {
            '{' => {
                if chars.next_if(|&(_, next)| next == '{').is_some() {
                    output.push('{');
                    continue;
                }

                let mut field = String::new();
                let mut closed = false;
                for (inner_position, inner) in chars.by_ref() {
                    match inner {
                        '}' => {
                            closed = true;
                            break;
                        }
                        '{' => {
                            return Err(TemplateError::Malformed {
                                token: format!("{{{}{{", field),
                                position: inner_position,
                            })
                        }
                        other => field.push(other),
                    }
                }

                if !closed {
                    return Err(TemplateError::Malformed {
                        token: format!("{{{}", field),
                        position,
                    });
                }

                let value = resolve_column(&field, values).ok_or_else(|| TemplateError::Unresolved {
                    token: format!("{{{}}}", field),
                })?;
                output.push_str(&value.to_string());
            }
            '}' => {
                if chars.next_if(|&(_, next)| next == '}').is_some() {
                    output.push('}');
                } else {
                    return Err(TemplateError::Malformed {
                        token: "}".to_string(),
                        position,
                    });
                }
            }
            other => output.push(other),
        }
    }

    Ok(output)
}

fn resolve_column<'a>(field: &str, values: &'a [CellValue]) -> Option<&'a CellValue> {
    let digits = field.strip_prefix("col")?;
    if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let ordinal: usize = digits.parse().ok()?;
    values.get(ordinal - 1)
}

/// Literal `[@header]` replacement in header order. Tokens that match no header are kept.
pub fn render_named(template: &str, headers: &[String], values: &[CellValue]) -> String {
    let mut output = template.to_string();

    for (header, value) in headers.iter().zip(values) {
        let token = format!("[@{}]", header);
        if output.contains(&token) {
            output = output.replace(&token, &value.to_string());
        }
    }

    output
}
