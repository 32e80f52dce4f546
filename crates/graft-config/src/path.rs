//! Dotted / bracketed paths into a configuration tree
//!
//! `model.dim` names a mapping chain, `list[2].x` indexes into a sequence
//! on the way. Parsing and rendering round-trip.

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// One step of a [`ConfigPath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Mapping key
    Key(String),
    /// Sequence index
    Index(usize),
}

/// A parsed path into the top-level configuration mapping
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigPath {
    segments: Vec<Segment>,
}

impl ConfigPath {
    /// Segments in traversal order
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// First mapping key of the path, if the path starts with one
    #[must_use]
    pub fn root_key(&self) -> Option<&str> {
        match self.segments.first() {
            Some(Segment::Key(key)) => Some(key),
            _ => None,
        }
    }
}

impl FromStr for ConfigPath {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.is_empty() {
            return Err(ConfigError::invalid_path(raw, "empty path"));
        }

        let mut segments = Vec::new();
        let mut chars = raw.chars().peekable();
        let mut current = String::new();
        // A '.' is only legal between segments, a '[' closes the pending key.
        loop {
            match chars.next() {
                None => {
                    if !current.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut current)));
                    }
                    break;
                }
                Some('.') => {
                    if current.is_empty() && !matches!(segments.last(), Some(Segment::Index(_))) {
                        return Err(ConfigError::invalid_path(raw, "empty key segment"));
                    }
                    if !current.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut current)));
                    }
                    if chars.peek().is_none() {
                        return Err(ConfigError::invalid_path(raw, "trailing '.'"));
                    }
                }
                Some('[') => {
                    if !current.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut current)));
                    } else if segments.is_empty() {
                        return Err(ConfigError::invalid_path(raw, "index without key"));
                    }
                    let mut digits = String::new();
                    loop {
                        match chars.next() {
                            Some(']') => break,
                            Some(c) if c.is_ascii_digit() => digits.push(c),
                            Some(c) => {
                                return Err(ConfigError::invalid_path(
                                    raw,
                                    format!("unexpected '{c}' in index"),
                                ))
                            }
                            None => {
                                return Err(ConfigError::invalid_path(raw, "unclosed '['"))
                            }
                        }
                    }
                    let index = digits.parse::<usize>().map_err(|_| {
                        ConfigError::invalid_path(raw, "empty or invalid index")
                    })?;
                    segments.push(Segment::Index(index));
                }
                Some(']') => {
                    return Err(ConfigError::invalid_path(raw, "unexpected ']'"));
                }
                Some(c) => current.push(c),
            }
        }

        if segments.is_empty() {
            return Err(ConfigError::invalid_path(raw, "empty path"));
        }
        Ok(Self { segments })
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) => {
                    if position > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(key)?;
                }
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> ConfigPath {
        raw.parse().expect("valid path")
    }

    #[test]
    fn dotted_path() {
        let path = parse("model.dim");
        assert_eq!(
            path.segments(),
            &[Segment::Key("model".into()), Segment::Key("dim".into())]
        );
        assert_eq!(path.root_key(), Some("model"));
    }

    #[test]
    fn bracketed_path() {
        let path = parse("list[2].x");
        assert_eq!(
            path.segments(),
            &[
                Segment::Key("list".into()),
                Segment::Index(2),
                Segment::Key("x".into()),
            ]
        );
    }

    #[test]
    fn display_roundtrip() {
        for raw in ["x", "model.dim", "list[2].x", "a.b[0][1].c"] {
            assert_eq!(parse(raw).to_string(), raw);
        }
    }

    #[test]
    fn rejects_malformed() {
        for raw in ["", ".", "a.", ".a", "a[", "a[]", "a[x]", "a]b", "[0]"] {
            assert!(raw.parse::<ConfigPath>().is_err(), "accepted {raw:?}");
        }
    }
}
