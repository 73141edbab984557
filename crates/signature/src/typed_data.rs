//! EIP-712 typed structured data.
//!
//! [`StructuredDataEncoder`] works on the JSON form of a typed-data document
//! (`types`, `primaryType`, `domain`, `message`), the same shape wallets pass to
//! `eth_signTypedData_v4`. Atomic field types are encoded through `mw-abi`.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use mw_abi::{AbiType, AbiValue, encode_value};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SignatureError};

/// Name of the domain struct.
pub const EIP712_DOMAIN: &str = "EIP712Domain";

/// Struct definitions keyed by struct name.
pub type TypedDataTypes = BTreeMap<String, Vec<TypedDataField>>;

/// A single `type name` member of a struct definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedDataField {
    /// Member name.
    pub name: String,
    /// Solidity type, possibly another struct or an array.
    #[serde(rename = "type")]
    pub ty: String,
}

impl TypedDataField {
    /// A member `ty name`.
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self { name: name.into(), ty: ty.into() }
    }
}

/// The EIP-712 domain. Only the members that are set take part in the separator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataDomain {
    /// Signing domain name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Signing domain version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Accepts a JSON number or a decimal or hex string.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_chain_id"
    )]
    pub chain_id: Option<U256>,
    /// Contract that verifies the signature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<Address>,
    /// Disambiguating salt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<B256>,
}

impl TypedDataDomain {
    /// `EIP712Domain` members for the fields that are set, in canonical order.
    pub fn fields(&self) -> Vec<TypedDataField> {
        let mut fields = Vec::with_capacity(5);
        if self.name.is_some() {
            fields.push(TypedDataField::new("name", "string"));
        }
        if self.version.is_some() {
            fields.push(TypedDataField::new("version", "string"));
        }
        if self.chain_id.is_some() {
            fields.push(TypedDataField::new("chainId", "uint256"));
        }
        if self.verifying_contract.is_some() {
            fields.push(TypedDataField::new("verifyingContract", "address"));
        }
        if self.salt.is_some() {
            fields.push(TypedDataField::new("salt", "bytes32"));
        }
        fields
    }

    fn to_message(&self) -> Value {
        let mut map = Map::new();
        if let Some(name) = &self.name {
            map.insert("name".into(), Value::String(name.clone()));
        }
        if let Some(version) = &self.version {
            map.insert("version".into(), Value::String(version.clone()));
        }
        if let Some(chain_id) = self.chain_id {
            map.insert("chainId".into(), Value::String(chain_id.to_string()));
        }
        if let Some(contract) = self.verifying_contract {
            map.insert("verifyingContract".into(), Value::String(contract.to_string()));
        }
        if let Some(salt) = self.salt {
            map.insert("salt".into(), Value::String(salt.to_string()));
        }
        Value::Object(map)
    }
}

// Wallets send chainId as a JSON number, a decimal string or a hex quantity.
fn deserialize_chain_id<'de, D>(deserializer: D) -> Result<Option<U256>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(|n| Some(U256::from(n)))
            .ok_or_else(|| D::Error::custom("chainId must be a non-negative integer")),
        Some(Value::String(s)) => s.parse::<U256>().map(Some).map_err(D::Error::custom),
        Some(other) => Err(D::Error::custom(format!("invalid chainId {other}"))),
    }
}

/// A complete typed-data document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    /// Struct definitions, `EIP712Domain` optional.
    #[serde(default)]
    pub types: TypedDataTypes,
    /// Type of `message`.
    pub primary_type: String,
    /// Signing domain.
    #[serde(default)]
    pub domain: TypedDataDomain,
    /// The value being signed.
    #[serde(default)]
    pub message: Value,
}

impl TypedData {
    /// Parses an `eth_signTypedData_v4` JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SignatureError::InvalidTypedData(e.to_string()))
    }

    /// Final `keccak256(0x1901 || domainSeparator || hashStruct(message))` digest.
    pub fn hash(&self) -> Result<B256> {
        StructuredDataEncoder::new(self.clone())?.hash_typed_data()
    }
}

/// Hashes a typed-data document for signing.
pub fn hash_typed_data(typed_data: &TypedData) -> Result<B256> {
    typed_data.hash()
}

/// Computes `encodeType`, `hashStruct` and the final digest of a typed-data document.
#[derive(Debug, Clone)]
pub struct StructuredDataEncoder {
    typed_data: TypedData,
}

impl StructuredDataEncoder {
    /// Validates every referenced type. `EIP712Domain` is derived from the
    /// domain when the document does not declare it.
    pub fn new(mut typed_data: TypedData) -> Result<Self> {
        if !typed_data.types.contains_key(EIP712_DOMAIN) {
            let fields = typed_data.domain.fields();
            typed_data.types.insert(EIP712_DOMAIN.to_string(), fields);
        }
        let encoder = Self { typed_data };
        encoder.validate()?;
        Ok(encoder)
    }

    /// The validated document.
    pub const fn typed_data(&self) -> &TypedData {
        &self.typed_data
    }

    fn types(&self) -> &TypedDataTypes {
        &self.typed_data.types
    }

    fn validate(&self) -> Result<()> {
        let primary = &self.typed_data.primary_type;
        if !self.types().contains_key(primary) {
            return Err(invalid(format!("primary type `{primary}` is not defined")));
        }
        for (name, fields) in self.types() {
            for field in fields {
                let base = base_type(&field.ty);
                if !self.types().contains_key(base) && AbiType::parse(base).is_err() {
                    return Err(invalid(format!(
                        "field `{}` of `{name}` has unknown type `{}`",
                        field.name, field.ty
                    )));
                }
            }
        }
        Ok(())
    }

    fn struct_fields(&self, name: &str) -> Result<&[TypedDataField]> {
        self.types()
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| invalid(format!("struct `{name}` is not defined")))
    }

    fn collect_dependencies(&self, name: &str, found: &mut BTreeSet<String>) {
        let Some(fields) = self.types().get(name) else {
            return;
        };
        if !found.insert(name.to_string()) {
            return;
        }
        for field in fields {
            self.collect_dependencies(base_type(&field.ty), found);
        }
    }

    /// `Primary(type name,...)` followed by every referenced struct, sorted by name.
    pub fn encode_type(&self, primary: &str) -> Result<String> {
        let fields = self.struct_fields(primary)?;
        let mut dependencies = BTreeSet::new();
        self.collect_dependencies(primary, &mut dependencies);
        dependencies.remove(primary);

        let mut out = format_struct(primary, fields);
        for dependency in &dependencies {
            out.push_str(&format_struct(dependency, self.struct_fields(dependency)?));
        }
        Ok(out)
    }

    /// `keccak256(encodeType(primary))`.
    pub fn type_hash(&self, primary: &str) -> Result<B256> {
        self.encode_type(primary).map(keccak256)
    }

    /// `typeHash || enc(field_1) || ... || enc(field_n)`, one word per field.
    pub fn encode_data(&self, primary: &str, data: &Value) -> Result<Vec<u8>> {
        let fields = self.struct_fields(primary)?;
        let object = data
            .as_object()
            .ok_or_else(|| invalid(format!("`{primary}` value must be an object")))?;

        let mut out = Vec::with_capacity(32 * (fields.len() + 1));
        out.extend_from_slice(self.type_hash(primary)?.as_slice());
        for field in fields {
            let value = object.get(&field.name).ok_or_else(|| {
                invalid(format!("missing field `{}` of `{primary}`", field.name))
            })?;
            out.extend_from_slice(self.encode_field(&field.ty, value)?.as_slice());
        }
        Ok(out)
    }

    /// `keccak256(encodeData(primary, data))`.
    pub fn hash_struct(&self, primary: &str, data: &Value) -> Result<B256> {
        self.encode_data(primary, data).map(keccak256)
    }

    /// The domain separator.
    pub fn hash_domain(&self) -> Result<B256> {
        self.hash_struct(EIP712_DOMAIN, &self.typed_data.domain.to_message())
    }

    /// `hashStruct` of the primary message.
    pub fn hash_message(&self) -> Result<B256> {
        self.hash_struct(&self.typed_data.primary_type, &self.typed_data.message)
    }

    /// `keccak256(0x1901 || domainSeparator || hashStruct(message))`. A document
    /// whose primary type is the domain itself hashes without a message part.
    pub fn hash_typed_data(&self) -> Result<B256> {
        let mut preimage = Vec::with_capacity(66);
        preimage.extend_from_slice(&[0x19, 0x01]);
        preimage.extend_from_slice(self.hash_domain()?.as_slice());
        if self.typed_data.primary_type != EIP712_DOMAIN {
            preimage.extend_from_slice(self.hash_message()?.as_slice());
        }
        Ok(keccak256(preimage))
    }

    fn encode_field(&self, ty: &str, value: &Value) -> Result<B256> {
        if let Some((inner, length)) = split_array(ty)? {
            let items = value
                .as_array()
                .ok_or_else(|| invalid(format!("`{ty}` value must be an array")))?;
            if let Some(length) = length
                && items.len() != length
            {
                return Err(invalid(format!(
                    "`{ty}` expects {length} elements, got {}",
                    items.len()
                )));
            }
            let mut concatenated = Vec::with_capacity(32 * items.len());
            for item in items {
                concatenated.extend_from_slice(self.encode_field(inner, item)?.as_slice());
            }
            return Ok(keccak256(concatenated));
        }

        if self.types().contains_key(ty) {
            return self.hash_struct(ty, value);
        }

        match ty {
            "string" => value
                .as_str()
                .map(|s| keccak256(s.as_bytes()))
                .ok_or_else(|| invalid("`string` value must be a string".to_string())),
            "bytes" => {
                let bytes = value
                    .as_str()
                    .and_then(|s| s.parse::<Bytes>().ok())
                    .ok_or_else(|| invalid("`bytes` value must be a hex string".to_string()))?;
                Ok(keccak256(bytes))
            }
            _ => {
                let abi_type = AbiType::parse(ty)?;
                let encoded = encode_value(&abi_type, &AbiValue::from_json(&abi_type, value)?)?;
                B256::try_from(encoded.as_slice())
                    .map_err(|_| invalid(format!("`{ty}` is not an atomic type")))
            }
        }
    }
}

fn invalid(reason: String) -> SignatureError {
    SignatureError::InvalidTypedData(reason)
}

fn format_struct(name: &str, fields: &[TypedDataField]) -> String {
    let members: Vec<String> = fields.iter().map(|f| format!("{} {}", f.ty, f.name)).collect();
    format!("{name}({})", members.join(","))
}

fn base_type(ty: &str) -> &str {
    ty.split('[').next().unwrap_or(ty)
}

/// Splits `T[k]` / `T[]` into `(T, Some(k) | None)`.
fn split_array(ty: &str) -> Result<Option<(&str, Option<usize>)>> {
    if !ty.ends_with(']') {
        return Ok(None);
    }
    let open = ty.rfind('[').ok_or_else(|| invalid(format!("malformed array type `{ty}`")))?;
    let dimension = &ty[open + 1..ty.len() - 1];
    let length = if dimension.is_empty() {
        None
    } else {
        Some(
            dimension
                .parse::<usize>()
                .map_err(|_| invalid(format!("malformed array type `{ty}`")))?,
        )
    };
    Ok(Some((&ty[..open], length)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};
    use serde_json::json;

    fn mail() -> TypedData {
        serde_json::from_value(json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "version", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                    { "name": "verifyingContract", "type": "address" }
                ],
                "Person": [
                    { "name": "name", "type": "string" },
                    { "name": "wallet", "type": "address" }
                ],
                "Mail": [
                    { "name": "from", "type": "Person" },
                    { "name": "to", "type": "Person" },
                    { "name": "contents", "type": "string" }
                ]
            },
            "primaryType": "Mail",
            "domain": {
                "name": "Ether Mail",
                "version": "1",
                "chainId": 1,
                "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
            },
            "message": {
                "from": { "name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826" },
                "to": { "name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB" },
                "contents": "Hello, Bob!"
            }
        }))
        .unwrap()
    }

    #[test]
    fn hashes_mail_example() {
        let encoder = StructuredDataEncoder::new(mail()).unwrap();
        assert_eq!(
            encoder.encode_type("Mail").unwrap(),
            "Mail(Person from,Person to,string contents)Person(string name,address wallet)"
        );
        assert_eq!(
            encoder.type_hash("Mail").unwrap(),
            b256!("0xa0cedeb2dc280ba39b857546d74f5549c3a1d7bdc2dd96bf881f76108e23dac2")
        );
        assert_eq!(
            encoder.hash_domain().unwrap(),
            b256!("0xf2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f")
        );
        assert_eq!(
            encoder.hash_message().unwrap(),
            b256!("0xc52c0ee5d84264471806290a3f2c4cecfc5490626bf912d01f240d7a274b371e")
        );
        assert_eq!(
            encoder.hash_typed_data().unwrap(),
            b256!("0xbe609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2")
        );
    }

    #[test]
    fn derives_domain_type_when_undeclared() {
        let mut typed_data = mail();
        typed_data.types.remove(EIP712_DOMAIN);
        assert_eq!(
            typed_data.hash().unwrap(),
            b256!("0xbe609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2")
        );
    }

    #[test]
    fn digest_is_deterministic_and_domain_bound() {
        let typed_data = mail();
        assert_eq!(typed_data.hash().unwrap(), typed_data.hash().unwrap());

        let mut other_chain = mail();
        other_chain.domain.chain_id = Some(U256::from(2));
        assert_ne!(typed_data.hash().unwrap(), other_chain.hash().unwrap());

        let mut other_contract = mail();
        other_contract.domain.verifying_contract =
            Some(address!("0x0000000000000000000000000000000000000001"));
        assert_ne!(typed_data.hash().unwrap(), other_contract.hash().unwrap());
    }

    #[test]
    fn accepts_hex_and_decimal_chain_ids() {
        let hex: TypedDataDomain = serde_json::from_value(json!({ "chainId": "0x89" })).unwrap();
        let decimal: TypedDataDomain = serde_json::from_value(json!({ "chainId": "137" })).unwrap();
        assert_eq!(hex.chain_id, Some(U256::from(137)));
        assert_eq!(hex, decimal);
    }

    #[test]
    fn validates_array_dimensions() {
        let typed_data: TypedData = serde_json::from_value(json!({
            "types": { "Batch": [{ "name": "ids", "type": "uint256[2]" }] },
            "primaryType": "Batch",
            "domain": { "name": "Batches" },
            "message": { "ids": [1, 2, 3] }
        }))
        .unwrap();
        assert!(matches!(typed_data.hash(), Err(SignatureError::InvalidTypedData(_))));
    }

    #[test]
    fn rejects_unknown_types_and_missing_fields() {
        let mut typed_data = mail();
        typed_data.types.get_mut("Person").unwrap()[1].ty = "wallet".to_string();
        assert!(StructuredDataEncoder::new(typed_data).is_err());

        let mut typed_data = mail();
        typed_data.message.as_object_mut().unwrap().remove("contents");
        assert!(typed_data.hash().is_err());

        let mut typed_data = mail();
        typed_data.primary_type = "Letter".to_string();
        assert!(typed_data.hash().is_err());
    }
}
