//! printf-style formatting for output columns.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    /// `%f`
    Fixed,
    /// `%e` / `%E`
    Exponent { upper: bool },
    /// `%g` / `%G`
    General { upper: bool },
    /// `%d` / `%i`
    Integer,
    /// `%s`
    Text,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Flags {
    left: bool,
    zero: bool,
    plus: bool,
    space: bool,
    alternate: bool,
}

/// A parsed printf-style format with exactly one conversion.
///
/// Supports `%[flags][width][.precision]conv` with flags `- 0 + space #`
/// and conversions `f e E g G d i s`. Literal text around the conversion
/// is kept; `%%` is a literal percent sign.
///
/// ```
/// use u_simlab::experiment::OutputFormat;
///
/// let format: OutputFormat = "%8.4f".parse().unwrap();
/// assert_eq!(format.render(3.14159265), "  3.1416");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFormat {
    source: String,
    prefix: String,
    suffix: String,
    flags: Flags,
    width: Option<usize>,
    precision: Option<usize>,
    conversion: Conversion,
}

impl OutputFormat {
    pub fn parse(source: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidFormat {
            format: source.to_string(),
            reason: reason.to_string(),
        };

        let mut chars = source.chars().peekable();
        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut parsed = None;

        while let Some(c) = chars.next() {
            if c != '%' {
                if parsed.is_some() {
                    suffix.push(c);
                } else {
                    prefix.push(c);
                }
                continue;
            }
            if chars.peek() == Some(&'%') {
                chars.next();
                if parsed.is_some() {
                    suffix.push('%');
                } else {
                    prefix.push('%');
                }
                continue;
            }
            if parsed.is_some() {
                return Err(invalid("more than one conversion"));
            }

            let mut flags = Flags::default();
            while let Some(&c) = chars.peek() {
                match c {
                    '-' => flags.left = true,
                    '0' => flags.zero = true,
                    '+' => flags.plus = true,
                    ' ' => flags.space = true,
                    '#' => flags.alternate = true,
                    _ => break,
                }
                chars.next();
            }

            let width = take_number(&mut chars);
            let precision = if chars.peek() == Some(&'.') {
                chars.next();
                Some(take_number(&mut chars).unwrap_or(0))
            } else {
                None
            };

            let conversion = match chars.next() {
                Some('f') | Some('F') => Conversion::Fixed,
                Some('e') => Conversion::Exponent { upper: false },
                Some('E') => Conversion::Exponent { upper: true },
                Some('g') => Conversion::General { upper: false },
                Some('G') => Conversion::General { upper: true },
                Some('d') | Some('i') => Conversion::Integer,
                Some('s') => Conversion::Text,
                Some(other) => return Err(invalid(&format!("unsupported conversion `{other}`"))),
                None => return Err(invalid("incomplete conversion")),
            };
            parsed = Some((flags, width, precision, conversion));
        }

        let (flags, width, precision, conversion) =
            parsed.ok_or_else(|| invalid("no conversion"))?;
        Ok(Self {
            source: source.to_string(),
            prefix,
            suffix,
            flags,
            width,
            precision,
            conversion,
        })
    }

    /// The format string as registered.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Formats a value.
    pub fn render(&self, value: f64) -> String {
        let mut body = if value.is_finite() {
            self.render_finite(value)
        } else if value.is_nan() {
            "nan".to_string()
        } else if value > 0.0 {
            "inf".to_string()
        } else {
            "-inf".to_string()
        };

        let numeric = self.conversion != Conversion::Text;
        if numeric && !body.starts_with('-') {
            if self.flags.plus {
                body.insert(0, '+');
            } else if self.flags.space {
                body.insert(0, ' ');
            }
        }

        let padded = self.pad(body, numeric && value.is_finite());
        format!("{}{}{}", self.prefix, padded, self.suffix)
    }

    fn render_finite(&self, value: f64) -> String {
        match self.conversion {
            Conversion::Fixed => format!("{:.*}", self.precision.unwrap_or(6), value),
            Conversion::Exponent { upper } => {
                c_exponent(value, self.precision.unwrap_or(6), upper)
            }
            Conversion::General { upper } => self.general(value, upper),
            Conversion::Integer => format!("{}", value.trunc() as i64),
            Conversion::Text => {
                let text = format!("{value:?}");
                match self.precision {
                    Some(p) => text.chars().take(p).collect(),
                    None => text,
                }
            }
        }
    }

    /// `%g`: the shorter of fixed and exponent notation for the requested
    /// number of significant digits.
    fn general(&self, value: f64, upper: bool) -> String {
        let significant = match self.precision {
            Some(0) => 1,
            Some(p) => p,
            None => 6,
        };
        let probe = format!("{:.*e}", significant - 1, value);
        let exponent: i32 = probe
            .split_once('e')
            .and_then(|(_, exp)| exp.parse().ok())
            .unwrap_or(0);

        let text = if exponent < -4 || exponent >= significant as i32 {
            c_exponent(value, significant - 1, upper)
        } else {
            let decimals = (significant as i32 - 1 - exponent).max(0) as usize;
            format!("{value:.decimals$}")
        };
        if self.flags.alternate {
            text
        } else {
            strip_trailing_zeros(&text)
        }
    }

    fn pad(&self, body: String, zero_fill: bool) -> String {
        let width = match self.width {
            Some(w) if w > body.chars().count() => w,
            _ => return body,
        };
        let fill = width - body.chars().count();
        if self.flags.left {
            format!("{body}{}", " ".repeat(fill))
        } else if self.flags.zero && zero_fill {
            let sign_len = usize::from(body.starts_with(['-', '+', ' ']));
            let (sign, digits) = body.split_at(sign_len);
            format!("{sign}{}{digits}", "0".repeat(fill))
        } else {
            format!("{}{body}", " ".repeat(fill))
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut digits = String::new();
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        chars.next();
    }
    digits.parse().ok()
}

/// Exponent notation with a signed, at least two-digit exponent.
fn c_exponent(value: f64, precision: usize, upper: bool) -> String {
    let text = format!("{value:.precision$e}");
    let (mantissa, exponent) = text.split_once('e').unwrap_or((text.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    let marker = if upper { 'E' } else { 'e' };
    format!("{mantissa}{marker}{sign}{:02}", exponent.abs())
}

fn strip_trailing_zeros(text: &str) -> String {
    let (number, exponent) = match text.find(['e', 'E']) {
        Some(i) => text.split_at(i),
        None => (text, ""),
    };
    let number = if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    };
    format!("{number}{exponent}")
}
