//! Catalog of the options a capture command may carry.
//!
//! Mirrors the command-line surface of the still-capture tool. Workers
//! validate every inbound option against this catalog before touching the
//! camera, so an out-of-range value costs a `Failure` response, never a
//! capture attempt.

use crate::error::RemcamError;
use crate::payload::OptionValue;
use std::collections::BTreeMap;

// ── Catalog types ─────────────────────────────────────────────────

/// The set of values an option accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionDomain {
    /// Any integer in `min..=max`.
    IntRange { min: i64, max: i64 },
    /// One of a fixed set of keywords.
    OneOf(&'static [&'static str]),
}

/// Default value of an option, stored in a const-friendly form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionDefault {
    Int(i64),
    Text(&'static str),
}

impl OptionDefault {
    pub fn to_value(self) -> OptionValue {
        match self {
            OptionDefault::Int(v) => OptionValue::Int(v),
            OptionDefault::Text(v) => OptionValue::Text(v.to_string()),
        }
    }
}

/// One entry in the catalog.
#[derive(Debug, Clone, Copy)]
pub struct CameraOption {
    /// Name used in `RequestPayload.options`.
    pub name: &'static str,
    /// Flag passed to the capture tool.
    pub flag: &'static str,
    /// Short human-readable description.
    pub description: &'static str,
    /// Accepted values.
    pub domain: OptionDomain,
    /// Value assumed when the option is omitted.
    pub default: OptionDefault,
}

impl CameraOption {
    /// Check a value against this option's domain.
    pub fn validate(&self, value: &OptionValue) -> Result<(), RemcamError> {
        match (&self.domain, value) {
            (OptionDomain::IntRange { min, max }, OptionValue::Int(v)) => {
                if v < min || v > max {
                    Err(RemcamError::InvalidOption(format!(
                        "{} must be in {min}..={max}, got {v}",
                        self.name
                    )))
                } else {
                    Ok(())
                }
            }
            (OptionDomain::OneOf(allowed), OptionValue::Text(v)) => {
                if allowed.contains(&v.as_str()) {
                    Ok(())
                } else {
                    Err(RemcamError::InvalidOption(format!(
                        "{} must be one of {}, got {v}",
                        self.name,
                        allowed.join("/")
                    )))
                }
            }
            (OptionDomain::IntRange { .. }, OptionValue::Text(v)) => Err(
                RemcamError::InvalidOption(format!("{} expects an integer, got \"{v}\"", self.name)),
            ),
            (OptionDomain::OneOf(_), OptionValue::Int(v)) => Err(RemcamError::InvalidOption(
                format!("{} expects a keyword, got {v}", self.name),
            )),
        }
    }
}

// ── The catalog ───────────────────────────────────────────────────

/// Every option the broker accepts, sorted by name.
pub static CATALOG: &[CameraOption] = &[
    CameraOption {
        name: "awb",
        flag: "-awb",
        description: "automatic white balance mode",
        domain: OptionDomain::OneOf(&["auto", "sun", "cloud", "shade", "tungsten"]),
        default: OptionDefault::Text("auto"),
    },
    CameraOption {
        name: "brightness",
        flag: "-br",
        description: "image brightness",
        domain: OptionDomain::IntRange { min: 0, max: 100 },
        default: OptionDefault::Int(50),
    },
    CameraOption {
        name: "contrast",
        flag: "-co",
        description: "image contrast",
        domain: OptionDomain::IntRange {
            min: -100,
            max: 100,
        },
        default: OptionDefault::Int(0),
    },
    CameraOption {
        name: "exposure",
        flag: "-ex",
        description: "exposure mode",
        domain: OptionDomain::OneOf(&["auto", "night", "sports", "snow", "verylong"]),
        default: OptionDefault::Text("auto"),
    },
    CameraOption {
        name: "height",
        flag: "-h",
        description: "image height in pixels",
        domain: OptionDomain::IntRange { min: 16, max: 3040 },
        default: OptionDefault::Int(3040),
    },
    CameraOption {
        name: "quality",
        flag: "-q",
        description: "jpeg quality",
        domain: OptionDomain::IntRange { min: 0, max: 100 },
        default: OptionDefault::Int(75),
    },
    CameraOption {
        name: "saturation",
        flag: "-sa",
        description: "image saturation",
        domain: OptionDomain::IntRange {
            min: -100,
            max: 100,
        },
        default: OptionDefault::Int(0),
    },
    CameraOption {
        name: "sharpness",
        flag: "-sh",
        description: "image sharpness",
        domain: OptionDomain::IntRange {
            min: -100,
            max: 100,
        },
        default: OptionDefault::Int(0),
    },
    CameraOption {
        name: "width",
        flag: "-w",
        description: "image width in pixels",
        domain: OptionDomain::IntRange { min: 16, max: 4056 },
        default: OptionDefault::Int(4056),
    },
];

/// Look an option up by name.
pub fn lookup(name: &str) -> Option<&'static CameraOption> {
    CATALOG.iter().find(|opt| opt.name == name)
}

/// Validate a full option set against the catalog.
///
/// Fails on the first unknown name or out-of-domain value.
pub fn validate(options: &BTreeMap<String, OptionValue>) -> Result<(), RemcamError> {
    for (name, value) in options {
        let entry = lookup(name)
            .ok_or_else(|| RemcamError::InvalidOption(format!("unknown option {name}")))?;
        entry.validate(value)?;
    }
    Ok(())
}

/// Render a validated option set as capture-tool arguments.
///
/// The map's order is already deterministic; output is `flag value` pairs.
pub fn render_args(options: &BTreeMap<String, OptionValue>) -> Result<Vec<String>, RemcamError> {
    let mut args = Vec::with_capacity(options.len() * 2);
    for (name, value) in options {
        let entry = lookup(name)
            .ok_or_else(|| RemcamError::InvalidOption(format!("unknown option {name}")))?;
        entry.validate(value)?;
        args.push(entry.flag.to_string());
        args.push(value.to_string());
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, OptionValue)]) -> BTreeMap<String, OptionValue> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn catalog_is_sorted_and_unique() {
        let names: Vec<_> = CATALOG.iter().map(|o| o.name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(names, sorted);
    }

    #[test]
    fn lookup_known_and_unknown() {
        assert_eq!(lookup("brightness").unwrap().flag, "-br");
        assert!(lookup("zoom").is_none());
    }

    #[test]
    fn int_range_validation() {
        let entry = lookup("brightness").unwrap();
        assert!(entry.validate(&OptionValue::Int(0)).is_ok());
        assert!(entry.validate(&OptionValue::Int(100)).is_ok());
        assert!(entry.validate(&OptionValue::Int(101)).is_err());
        assert!(entry.validate(&OptionValue::Int(-1)).is_err());
        assert!(entry.validate(&OptionValue::Text("bright".into())).is_err());
    }

    #[test]
    fn keyword_validation() {
        let entry = lookup("exposure").unwrap();
        assert!(entry.validate(&OptionValue::Text("night".into())).is_ok());
        assert!(entry.validate(&OptionValue::Text("dim".into())).is_err());
        assert!(entry.validate(&OptionValue::Int(3)).is_err());
    }

    #[test]
    fn validate_set_rejects_unknown_name() {
        let opts = map(&[("zoom", OptionValue::Int(2))]);
        let err = validate(&opts).unwrap_err();
        assert!(err.to_string().contains("zoom"));
    }

    #[test]
    fn render_args_deterministic_order() {
        let opts = map(&[
            ("width", OptionValue::Int(640)),
            ("brightness", OptionValue::Int(70)),
            ("exposure", OptionValue::Text("night".into())),
        ]);
        let args = render_args(&opts).unwrap();
        // BTreeMap order: brightness, exposure, width.
        assert_eq!(args, vec!["-br", "70", "-ex", "night", "-w", "640"]);
    }

    #[test]
    fn defaults_match_domains() {
        for entry in CATALOG {
            entry.validate(&entry.default.to_value())
                .unwrap_or_else(|e| panic!("default for {} is invalid: {e}", entry.name));
        }
    }
}
