use crate::core::FieldValue;
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// Tagged per-field constraint, evaluated uniformly by [`Constraint::check`].
///
/// Range bounds are exclusive (`gt`/`lt`), matching the way the domain
/// schemas state them (age strictly between 1 and 100, height strictly
/// positive).
#[derive(Debug, Clone)]
pub enum Constraint {
    IntRange { gt: Option<i64>, lt: Option<i64> },
    FloatRange { gt: Option<f64>, lt: Option<f64> },
    NonEmpty,
    MaxLen(usize),
    Pattern(Regex),
    OneOf(Vec<&'static str>),
    Email,
    IsoDate,
}

impl Constraint {
    /// Compiles a pattern constraint from a hard-coded schema literal.
    pub fn pattern(source: &str) -> Self {
        Self::Pattern(Regex::new(source).expect("schema pattern literals must compile"))
    }

    /// Checks one value, returning a human-readable description of the
    /// requirement on violation. Null values are accepted here; nullability
    /// is decided by the field spec before constraints run.
    pub fn check(&self, value: &FieldValue) -> std::result::Result<(), String> {
        if value.is_null() {
            return Ok(());
        }
        match self {
            Self::IntRange { gt, lt } => {
                let n = match value {
                    FieldValue::Integer(i) => *i,
                    _ => return Err("must be an integer".to_string()),
                };
                if let Some(gt) = gt {
                    if n <= *gt {
                        return Err(format!("must be greater than {}", gt));
                    }
                }
                if let Some(lt) = lt {
                    if n >= *lt {
                        return Err(format!("must be less than {}", lt));
                    }
                }
                Ok(())
            }
            Self::FloatRange { gt, lt } => {
                let n = value.as_f64().ok_or_else(|| "must be a number".to_string())?;
                if let Some(gt) = gt {
                    if n <= *gt {
                        return Err(format!("must be greater than {}", gt));
                    }
                }
                if let Some(lt) = lt {
                    if n >= *lt {
                        return Err(format!("must be less than {}", lt));
                    }
                }
                Ok(())
            }
            Self::NonEmpty => {
                let s = value.as_str().ok_or_else(|| "must be a string".to_string())?;
                if s.trim().is_empty() {
                    Err("must not be empty".to_string())
                } else {
                    Ok(())
                }
            }
            Self::MaxLen(max) => {
                let s = value.as_str().ok_or_else(|| "must be a string".to_string())?;
                if s.chars().count() > *max {
                    Err(format!("must not exceed {} characters", max))
                } else {
                    Ok(())
                }
            }
            Self::Pattern(re) => {
                let s = value.as_str().ok_or_else(|| "must be a string".to_string())?;
                if re.is_match(s) {
                    Ok(())
                } else {
                    Err(format!("must match pattern {}", re.as_str()))
                }
            }
            Self::OneOf(allowed) => {
                let s = value.as_str().ok_or_else(|| "must be a string".to_string())?;
                if allowed.contains(&s) {
                    Ok(())
                } else {
                    Err(format!("must be one of {}", allowed.join(", ")))
                }
            }
            Self::Email => {
                let s = value.as_str().ok_or_else(|| "must be a string".to_string())?;
                if EMAIL_RE.is_match(s) {
                    Ok(())
                } else {
                    Err("must be a valid email address".to_string())
                }
            }
            Self::IsoDate => {
                let s = value.as_str().ok_or_else(|| "must be a string".to_string())?;
                if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() {
                    Ok(())
                } else {
                    Err("must be an ISO date (YYYY-MM-DD)".to_string())
                }
            }
        }
    }
}
