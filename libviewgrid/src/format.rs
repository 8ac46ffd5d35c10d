//! Cell value formatting for normal and expert mode.
use pure_rust_locales::{Locale, locale_match};
use serde_json::Value;
use std::fmt::Write;
use std::sync::Arc;
use sys_locale::get_locale;
use viewgrid_types::{ColumnType, Control, DropdownMaps, Row};

use crate::config::FormatConfig;
use crate::date::{DateDecoder, DecodedDate, OrdinalDateDecoder};

const THIN_SPACE: &str = "\u{2009}";
const MAX_FRACTION_DIGITS: usize = 3;
const HISTORICAL_FORMATTED_SUFFIX: &str = "__abdatum_formatiert";
const HISTORICAL_SUFFIX: &str = "__abdatum";

/// Locale-specific number grouping properties.
#[derive(Debug, Clone)]
pub struct LocaleFormat {
    grouping: &'static [i64],
    thousands_sep: String,
    decimal_point: String,
}

impl LocaleFormat {
    #[must_use]
    pub fn for_locale(locale: Locale) -> Self {
        let grouping = locale_match!(locale => LC_NUMERIC::GROUPING);
        let thousands_sep =
            locale_match!(locale => LC_NUMERIC::THOUSANDS_SEP).replace('\u{202f}', THIN_SPACE);
        let decimal_point = locale_match!(locale => LC_NUMERIC::DECIMAL_POINT).to_string();

        Self {
            grouping,
            thousands_sep,
            decimal_point,
        }
    }

    /// Resolves `de-DE` style names. Empty means the system locale; unknown names fall
    /// back to `en_US`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let name = if name.trim().is_empty() {
            get_locale().unwrap_or_else(|| "en-US".to_string())
        } else {
            name.trim().to_string()
        };
        let locale = name
            .replace('-', "_")
            .as_str()
            .try_into()
            .unwrap_or(Locale::en_US);
        Self::for_locale(locale)
    }

    /// Groups a plain `-1234.5` style decimal string.
    #[must_use]
    pub fn group(&self, plain: &str) -> String {
        let (sign, digits) = match plain.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", plain),
        };
        let (integer_part, fractional_part) = match digits.split_once('.') {
            Some((integer, fraction)) => (integer, Some(fraction)),
            None => (digits, None),
        };
        let group_size = self.grouping.first().copied().unwrap_or(-1);
        let integer_result = if group_size > 0 {
            group_n_chars(integer_part, group_size as usize).join(self.thousands_sep.as_str())
        } else {
            integer_part.to_string()
        };
        match fractional_part {
            Some(fraction) => format!("{sign}{integer_result}{}{fraction}", self.decimal_point),
            None => format!("{sign}{integer_result}"),
        }
    }
}

/// Splits `s` into chunks of `n` characters, the first chunk taking the remainder.
fn group_n_chars(s: &str, n: usize) -> Vec<&str> {
    let num_extra_chars = s.len() % n;

    let first_group = &s[0..num_extra_chars];

    let rest_groups = s.len() / n;
    let rest_str = &s[num_extra_chars..];

    if first_group.is_empty() {
        vec![]
    } else {
        vec![first_group]
    }
    .into_iter()
    .chain((0..rest_groups).map(|start| &rest_str[start * n..(start + 1) * n]))
    .collect()
}

fn numeric(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|value| value.is_finite())
}

/// Decimal text without exponent, at most three fraction digits.
fn plain_decimal(value: f64) -> String {
    let text = if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        let text = format!("{value:.MAX_FRACTION_DIGITS$}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    };
    if text == "-0" { "0".to_string() } else { text }
}

/// Plain text of a raw value. `null` is empty, structures are dumped as JSON.
#[must_use]
pub fn raw_string(raw: &Value) -> String {
    match raw {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Array(_) | Value::Object(_) => raw.to_string(),
    }
}

fn non_blank_text(raw: &Value) -> Option<String> {
    match raw {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Formats cell values according to their column type.
#[derive(Clone)]
pub struct ValueFormatter {
    locale: LocaleFormat,
    decoder: Arc<dyn DateDecoder>,
    date_format: String,
    datetime_format: String,
    as_of_prefix: String,
    empty_group_label: String,
}

impl std::fmt::Debug for ValueFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueFormatter")
            .field("locale", &self.locale)
            .field("date_format", &self.date_format)
            .field("datetime_format", &self.datetime_format)
            .field("as_of_prefix", &self.as_of_prefix)
            .field("empty_group_label", &self.empty_group_label)
            .finish_non_exhaustive()
    }
}

impl ValueFormatter {
    #[must_use]
    pub fn new(config: &FormatConfig) -> Self {
        Self {
            locale: LocaleFormat::from_name(&config.locale),
            decoder: Arc::new(OrdinalDateDecoder {
                no_date_sentinel: config.no_date_sentinel,
            }),
            date_format: config.date_format.clone(),
            datetime_format: config.datetime_format.clone(),
            as_of_prefix: config.as_of_prefix.clone(),
            empty_group_label: config.empty_group_label.clone(),
        }
    }

    /// Placeholder for groups whose representative value is absent.
    #[must_use]
    pub fn empty_group_label(&self) -> &str {
        &self.empty_group_label
    }

    /// Replaces the date decoding collaborator.
    #[must_use]
    pub fn with_decoder(mut self, decoder: Arc<dyn DateDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    #[must_use]
    pub fn format_normal(
        &self,
        column: &Control,
        raw: Option<&Value>,
        dropdowns: &DropdownMaps,
    ) -> String {
        let Some(raw) = raw.filter(|raw| !raw.is_null()) else {
            return String::new();
        };
        match column.resolved_type() {
            ColumnType::Date => self.format_date(raw, &self.date_format),
            ColumnType::Datetime => self.format_date(raw, &self.datetime_format),
            ColumnType::Number => self.format_number(raw),
            ColumnType::Dropdown => {
                let code = raw_string(raw);
                dropdowns
                    .get(&column.control_guid)
                    .and_then(|options| options.get(&code))
                    .cloned()
                    .unwrap_or(code)
            }
            ColumnType::String => raw_string(raw),
        }
    }

    /// Type-agnostic rendering used in expert mode.
    #[must_use]
    pub fn format_expert(&self, raw: Option<&Value>) -> String {
        match raw {
            None => String::new(),
            Some(Value::String(text)) => text.clone(),
            Some(Value::Number(number)) => number.to_string(),
            Some(Value::Bool(flag)) => flag.to_string(),
            Some(other) => serde_json::to_string(other).unwrap_or_else(|_| format!("{other:?}")),
        }
    }

    /// Cell text of `column` in `row`.
    #[must_use]
    pub fn format_cell(
        &self,
        column: &Control,
        row: &Row,
        dropdowns: &DropdownMaps,
        expert: bool,
    ) -> String {
        let raw = row.value(&column.group, &column.field);
        if expert {
            self.format_expert(raw)
        } else {
            self.format_normal(column, raw, dropdowns)
        }
    }

    /// Locale-grouped number, or the raw text when the value is not numeric.
    #[must_use]
    pub fn format_number(&self, raw: &Value) -> String {
        match numeric(raw) {
            Some(value) => self.locale.group(&plain_decimal(value)),
            None => raw_string(raw),
        }
    }

    fn format_date(&self, raw: &Value, pattern: &str) -> String {
        match self.decoder.decode(raw) {
            DecodedDate::NoDate => String::new(),
            DecodedDate::Date(date_time) => {
                let mut out = String::new();
                if write!(out, "{}", date_time.format(pattern)).is_err() {
                    return raw_string(raw);
                }
                out
            }
            DecodedDate::Invalid => raw_string(raw),
        }
    }

    /// "as of" annotation for historicized values, if the row carries one.
    #[must_use]
    pub fn historical_tooltip(&self, row: &Row, column: &Control) -> Option<String> {
        let fields = row.daten.get(&column.group)?;
        let formatted = fields
            .get(&format!("{}{HISTORICAL_FORMATTED_SUFFIX}", column.field))
            .and_then(non_blank_text);
        let as_of = match formatted {
            Some(text) => text,
            None => {
                let raw = fields.get(&format!("{}{HISTORICAL_SUFFIX}", column.field))?;
                match self.decoder.decode(raw) {
                    DecodedDate::Date(_) => Some(self.format_date(raw, &self.date_format)),
                    DecodedDate::NoDate => None,
                    DecodedDate::Invalid => non_blank_text(raw),
                }?
            }
        };
        Some(format!("{} {as_of}", self.as_of_prefix))
    }
}

impl Default for ValueFormatter {
    fn default() -> Self {
        Self::new(&crate::config::GridConfig::default().format)
    }
}
