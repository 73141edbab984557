//! JSON and human-readable ABI definitions, selectors and call data.

use alloy_primitives::{Selector, keccak256};
use serde::{Deserialize, Serialize};

use crate::{
    decode::decode_abi_parameters,
    encode::encode_abi_parameters,
    error::{AbiError, Result},
    types::{AbiType, parse_param, split_top_level},
    value::AbiValue,
};

/// A parameter of a JSON ABI item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Param {
    /// Parameter name, empty when unnamed.
    #[serde(default)]
    pub name: String,
    /// Type string, `tuple`-prefixed for structs.
    #[serde(rename = "type")]
    pub ty: String,
    /// Struct components when `ty` is a tuple.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Param>,
    /// Solidity internal type, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_type: Option<String>,
    /// Event parameter flag, ignored for functions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed: Option<bool>,
}

impl Param {
    /// Resolves the parameter to an [`AbiType`], expanding tuple components.
    pub fn abi_type(&self) -> Result<AbiType> {
        match self.ty.strip_prefix("tuple") {
            Some(dimensions) => {
                let components = self
                    .components
                    .iter()
                    .map(Self::abi_type)
                    .collect::<Result<Vec<_>>>()?;
                AbiType::parse(&format!("{}{dimensions}", AbiType::Tuple(components)))
            }
            None => AbiType::parse(&self.ty),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AbiItem {
    #[serde(rename = "type", default = "default_item_type")]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    inputs: Vec<Param>,
    #[serde(default)]
    outputs: Vec<Param>,
}

fn default_item_type() -> String {
    "function".to_string()
}

/// A contract function with resolved parameter types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Function name.
    pub name: String,
    /// Input types in declaration order.
    pub inputs: Vec<AbiType>,
    /// Output types in declaration order.
    pub outputs: Vec<AbiType>,
}

impl Function {
    /// Parses a human-readable declaration.
    ///
    /// Accepts `transfer(address,uint256)` as well as
    /// `function balanceOf(address owner) external view returns (uint256)`.
    pub fn parse(declaration: &str) -> Result<Self> {
        let invalid = || AbiError::InvalidAbi(declaration.to_string());
        let s = declaration.trim();
        let s = s.strip_prefix("function ").unwrap_or(s).trim_start();

        let open = s.find('(').ok_or_else(invalid)?;
        let name = s[..open].trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
            return Err(invalid());
        }
        let close = matching_paren(s, open).ok_or_else(invalid)?;
        let inputs = parse_params(&s[open + 1..close])?;

        let rest = &s[close + 1..];
        let outputs = match rest.find("returns") {
            Some(idx) => {
                let rest = rest[idx + "returns".len()..].trim_start();
                if !rest.starts_with('(') {
                    return Err(invalid());
                }
                let close = matching_paren(rest, 0).ok_or_else(invalid)?;
                parse_params(&rest[1..close])?
            }
            None => Vec::new(),
        };

        Ok(Self { name: name.to_string(), inputs, outputs })
    }

    /// Canonical signature, e.g. `execute(address,uint256,bytes)`.
    pub fn signature(&self) -> String {
        let inputs: Vec<String> = self.inputs.iter().map(AbiType::canonical).collect();
        format!("{}({})", self.name, inputs.join(","))
    }

    /// First four bytes of the keccak256 of the canonical signature.
    pub fn selector(&self) -> Selector {
        Selector::from_slice(&keccak256(self.signature().as_bytes())[..4])
    }

    /// Selector followed by the standard encoding of `args`.
    pub fn encode_input(&self, args: &[AbiValue]) -> Result<Vec<u8>> {
        let mut data = self.selector().to_vec();
        data.extend(encode_abi_parameters(&self.inputs, args)?);
        Ok(data)
    }

    /// Decodes call data produced by [`Self::encode_input`], checking the selector.
    pub fn decode_input(&self, data: &[u8]) -> Result<Vec<AbiValue>> {
        let (selector, params) = split_selector(data)?;
        if selector != self.selector() {
            return Err(AbiError::SelectorMismatch {
                signature: self.signature(),
                given: selector.to_string(),
            });
        }
        decode_abi_parameters(&self.inputs, params)
    }

    /// Decodes return data against the declared outputs.
    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<AbiValue>> {
        decode_abi_parameters(&self.outputs, data)
    }
}

/// A set of contract functions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Abi {
    functions: Vec<Function>,
}

impl Abi {
    /// Parses a JSON ABI array. Events, errors and constructors are skipped.
    pub fn parse_json(json: &str) -> Result<Self> {
        let items: Vec<AbiItem> =
            serde_json::from_str(json).map_err(|e| AbiError::InvalidAbi(e.to_string()))?;

        let mut functions = Vec::new();
        for item in items.into_iter().filter(|item| item.kind == "function") {
            let name = item
                .name
                .ok_or_else(|| AbiError::InvalidAbi("function item without a name".into()))?;
            let inputs = item.inputs.iter().map(Param::abi_type).collect::<Result<Vec<_>>>()?;
            let outputs = item.outputs.iter().map(Param::abi_type).collect::<Result<Vec<_>>>()?;
            functions.push(Function { name, inputs, outputs });
        }
        Ok(Self { functions })
    }

    /// Parses human-readable declarations. Non-function lines are skipped.
    pub fn parse_human_readable<S: AsRef<str>>(declarations: &[S]) -> Result<Self> {
        const SKIPPED: [&str; 5] = ["event ", "error ", "constructor", "fallback", "receive"];
        let functions = declarations
            .iter()
            .map(AsRef::as_ref)
            .map(str::trim)
            .filter(|line| !line.is_empty() && !SKIPPED.iter().any(|p| line.starts_with(p)))
            .map(Function::parse)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { functions })
    }

    /// All functions in declaration order.
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// The first function named `name`.
    pub fn function(&self, name: &str) -> Result<&Function> {
        self.functions
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| AbiError::FunctionNotFound(name.to_string()))
    }

    /// The function whose selector matches the first four bytes of `data`.
    pub fn function_by_selector(&self, selector: Selector) -> Option<&Function> {
        self.functions.iter().find(|f| f.selector() == selector)
    }
}

impl From<Vec<Function>> for Abi {
    fn from(functions: Vec<Function>) -> Self {
        Self { functions }
    }
}

/// Encodes a call to `name` on `abi`.
///
/// Overloads are resolved by argument count.
pub fn encode_function_data(name: &str, abi: &Abi, args: &[AbiValue]) -> Result<Vec<u8>> {
    let mut candidates = abi.functions.iter().filter(|f| f.name == name).peekable();
    let first = *candidates.peek().ok_or_else(|| AbiError::FunctionNotFound(name.to_string()))?;
    let function = candidates
        .find(|f| f.inputs.len() == args.len())
        .ok_or(AbiError::LengthMismatch { expected: first.inputs.len(), given: args.len() })?;
    function.encode_input(args)
}

/// Decodes call data against whichever function on `abi` owns its selector.
pub fn decode_function_data<'a>(abi: &'a Abi, data: &[u8]) -> Result<(&'a Function, Vec<AbiValue>)> {
    let (selector, _) = split_selector(data)?;
    let function = abi
        .function_by_selector(selector)
        .ok_or_else(|| AbiError::FunctionNotFound(selector.to_string()))?;
    Ok((function, function.decode_input(data)?))
}

/// Decodes the return data of `name` on `abi`.
pub fn decode_function_result(name: &str, abi: &Abi, data: &[u8]) -> Result<Vec<AbiValue>> {
    abi.function(name)?.decode_output(data)
}

fn split_selector(data: &[u8]) -> Result<(Selector, &[u8])> {
    if data.len() < 4 {
        return Err(AbiError::DataTooShort { ty: "selector".into(), needed: 4, given: data.len() });
    }
    let (selector, params) = data.split_at(4);
    Ok((Selector::from_slice(selector), params))
}

fn parse_params(list: &str) -> Result<Vec<AbiType>> {
    split_top_level(list)?
        .into_iter()
        .map(|param| parse_param(param).map(|(ty, _)| ty))
        .collect()
}

fn matching_paren(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, c) in s.char_indices().skip_while(|(idx, _)| *idx < open) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}
