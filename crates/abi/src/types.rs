//! Solidity type grammar.

use std::{fmt, str::FromStr};

use crate::error::{AbiError, Result};

/// Size in bytes of one ABI word.
pub const WORD: usize = 32;

/// A parsed Solidity ABI type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbiType {
    /// `uintN`, carrying the bit width.
    Uint(usize),
    /// `intN`, carrying the bit width.
    Int(usize),
    /// `address`
    Address,
    /// `bool`
    Bool,
    /// `bytesN`, carrying the byte width.
    FixedBytes(usize),
    /// `bytes`
    Bytes,
    /// `string`
    String,
    /// `T[]`
    Array(Box<AbiType>),
    /// `T[k]`
    FixedArray(Box<AbiType>, usize),
    /// `(T1,...,Tn)`
    Tuple(Vec<AbiType>),
}

impl AbiType {
    /// Parses a type string such as `uint256`, `(address,bytes)[]` or
    /// `tuple(uint8,string)[2]`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AbiError::UnsupportedType(s.to_string()));
        }

        if let Some(stripped) = s.strip_suffix(']') {
            let open = stripped
                .rfind('[')
                .ok_or_else(|| AbiError::UnsupportedType(s.to_string()))?;
            let inner = Self::parse(&stripped[..open])?;
            let size = &stripped[open + 1..];
            if size.is_empty() {
                return Ok(Self::Array(Box::new(inner)));
            }
            let size: usize = size
                .parse()
                .map_err(|_| AbiError::UnsupportedType(s.to_string()))?;
            if size == 0 {
                return Err(AbiError::UnsupportedType(s.to_string()));
            }
            return Ok(Self::FixedArray(Box::new(inner), size));
        }

        let body = s.strip_prefix("tuple").unwrap_or(s);
        if let Some(inner) = body.strip_prefix('(') {
            let inner = inner
                .strip_suffix(')')
                .ok_or_else(|| AbiError::UnsupportedType(s.to_string()))?;
            let components = split_top_level(inner)?
                .into_iter()
                .map(|component| parse_param(component).map(|(ty, _)| ty))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Self::Tuple(components));
        }

        match s {
            "address" => Ok(Self::Address),
            "bool" => Ok(Self::Bool),
            "string" => Ok(Self::String),
            "bytes" => Ok(Self::Bytes),
            "uint" => Ok(Self::Uint(256)),
            "int" => Ok(Self::Int(256)),
            _ => parse_sized(s),
        }
    }

    /// Whether values of this type are encoded out-of-line through an offset.
    ///
    /// A tuple or fixed array is dynamic as soon as one of its components is.
    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::Bytes | Self::String | Self::Array(_) => true,
            Self::FixedArray(inner, _) => inner.is_dynamic(),
            Self::Tuple(components) => components.iter().any(Self::is_dynamic),
            _ => false,
        }
    }

    /// Encoded size of a static type, or of the head slot for a dynamic one.
    pub fn head_size(&self) -> usize {
        if self.is_dynamic() {
            return WORD;
        }
        match self {
            Self::FixedArray(inner, size) => inner.head_size() * size,
            Self::Tuple(components) => components.iter().map(Self::head_size).sum(),
            _ => WORD,
        }
    }

    /// Canonical type string used in function signatures and EIP-712.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(bits) => write!(f, "uint{bits}"),
            Self::Int(bits) => write!(f, "int{bits}"),
            Self::Address => f.write_str("address"),
            Self::Bool => f.write_str("bool"),
            Self::FixedBytes(size) => write!(f, "bytes{size}"),
            Self::Bytes => f.write_str("bytes"),
            Self::String => f.write_str("string"),
            Self::Array(inner) => write!(f, "{inner}[]"),
            Self::FixedArray(inner, size) => write!(f, "{inner}[{size}]"),
            Self::Tuple(components) => {
                f.write_str("(")?;
                for (i, component) in components.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{component}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl FromStr for AbiType {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn parse_sized(s: &str) -> Result<AbiType> {
    let unsupported = || AbiError::UnsupportedType(s.to_string());
    let (prefix, digits) = s
        .find(|c: char| c.is_ascii_digit())
        .map(|idx| s.split_at(idx))
        .ok_or_else(unsupported)?;
    let size: usize = digits.parse().map_err(|_| unsupported())?;

    match prefix {
        "uint" if (8..=256).contains(&size) && size % 8 == 0 => Ok(AbiType::Uint(size)),
        "int" if (8..=256).contains(&size) && size % 8 == 0 => Ok(AbiType::Int(size)),
        "bytes" if (1..=32).contains(&size) => Ok(AbiType::FixedBytes(size)),
        _ => Err(unsupported()),
    }
}

const MODIFIERS: [&str; 5] = ["indexed", "memory", "calldata", "storage", "payable"];

/// Parses one parameter declaration, e.g. `address to` or
/// `(uint256 x, uint256 y)[] memory keys`, returning the type and the name if any.
pub fn parse_param(s: &str) -> Result<(AbiType, Option<String>)> {
    let tokens = split_top_level_whitespace(s.trim());
    let (ty, rest) = tokens
        .split_first()
        .ok_or_else(|| AbiError::UnsupportedType(s.to_string()))?;
    let name = rest
        .iter()
        .filter(|token| !MODIFIERS.contains(token))
        .last()
        .map(|name| name.to_string());
    Ok((AbiType::parse(ty)?, name))
}

/// Splits a comma separated parameter list at parenthesis depth zero.
///
/// `address,(uint256,bytes)[],bool` yields three items. An empty or
/// whitespace-only list yields no items.
pub fn split_top_level(s: &str) -> Result<Vec<&str>> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut start = 0;
    for (idx, c) in s.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => {
                depth -= 1;
                if depth < 0 {
                    return Err(AbiError::UnsupportedType(s.to_string()));
                }
            }
            ',' if depth == 0 => {
                parts.push(s[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(AbiError::UnsupportedType(s.to_string()));
    }
    parts.push(s[start..].trim());
    Ok(parts)
}

fn split_top_level_whitespace(s: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut depth: i32 = 0;
    let mut start: Option<usize> = None;
    for (idx, c) in s.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            c if c.is_whitespace() && depth == 0 => {
                if let Some(begin) = start.take() {
                    tokens.push(&s[begin..idx]);
                }
                continue;
            }
            _ => {}
        }
        if start.is_none() {
            start = Some(idx);
        }
    }
    if let Some(begin) = start {
        tokens.push(&s[begin..]);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_elementary_types() {
        assert_eq!(AbiType::parse("uint").unwrap(), AbiType::Uint(256));
        assert_eq!(AbiType::parse("int8").unwrap(), AbiType::Int(8));
        assert_eq!(AbiType::parse("bytes32").unwrap(), AbiType::FixedBytes(32));
        assert_eq!(AbiType::parse("bytes").unwrap(), AbiType::Bytes);
        assert_eq!(AbiType::parse(" address ").unwrap(), AbiType::Address);
    }

    #[test]
    fn rejects_unsupported_types() {
        for ty in ["uint7", "uint264", "int0", "bytes33", "bytes0", "fixed128x18", "foo", "", "uint[0]"] {
            assert!(
                matches!(AbiType::parse(ty), Err(AbiError::UnsupportedType(_))),
                "{ty} should be rejected"
            );
        }
    }

    #[test]
    fn parses_nested_tuples_and_arrays() {
        let ty = AbiType::parse("(address,uint256,bytes)[]").unwrap();
        assert_eq!(
            ty,
            AbiType::Array(Box::new(AbiType::Tuple(vec![
                AbiType::Address,
                AbiType::Uint(256),
                AbiType::Bytes,
            ])))
        );
        assert!(ty.is_dynamic());

        let ty = AbiType::parse("tuple(uint8,(bool,bytes4)[2])[3][]").unwrap();
        assert_eq!(ty.canonical(), "(uint8,(bool,bytes4)[2])[3][]");
    }

    #[test]
    fn tuple_with_dynamic_component_is_dynamic() {
        assert!(!AbiType::parse("(uint256,address)").unwrap().is_dynamic());
        assert!(AbiType::parse("(uint256,string)").unwrap().is_dynamic());
        assert!(AbiType::parse("(uint256,bytes)[2]").unwrap().is_dynamic());
        assert_eq!(AbiType::parse("(uint256,address)[2]").unwrap().head_size(), 128);
    }

    #[test]
    fn splits_only_at_depth_zero() {
        let parts = split_top_level("address,(uint256,(bytes,bool))[],bool").unwrap();
        assert_eq!(parts, vec!["address", "(uint256,(bytes,bool))[]", "bool"]);
        assert!(split_top_level("  ").unwrap().is_empty());
        assert!(split_top_level("(uint256,bool").is_err());
        assert!(split_top_level("uint256),bool").is_err());
    }

    #[test]
    fn strips_names_and_modifiers() {
        let (ty, name) = parse_param("bytes calldata data").unwrap();
        assert_eq!(ty, AbiType::Bytes);
        assert_eq!(name.as_deref(), Some("data"));

        let (ty, name) = parse_param("(uint256 x, uint256 y)[] memory keys").unwrap();
        assert_eq!(ty.canonical(), "(uint256,uint256)[]");
        assert_eq!(name.as_deref(), Some("keys"));

        let (_, name) = parse_param("address").unwrap();
        assert!(name.is_none());
    }
}
