use thiserror::Error;

/// Result alias for ABI operations.
pub type Result<T, E = AbiError> = std::result::Result<T, E>;

/// Errors raised while parsing ABI definitions or encoding/decoding values.
///
/// All of these are local, synchronous failures that point at a caller bug;
/// none of them are retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    /// The type string is not part of the supported Solidity type grammar.
    #[error("type `{0}` is not a valid ABI type")]
    UnsupportedType(String),

    /// The type cannot appear in `abi.encodePacked`.
    #[error("type `{0}` is not supported by packed encoding")]
    UnsupportedPackedType(String),

    /// The ABI JSON document could not be parsed.
    #[error("invalid ABI: {0}")]
    InvalidAbi(String),

    /// No function with the requested name exists on the ABI.
    #[error("function `{0}` not found on ABI")]
    FunctionNotFound(String),

    /// The number of values does not match the number of parameters.
    #[error("ABI encoding params/values length mismatch: expected {expected} values, got {given}")]
    LengthMismatch {
        /// Number of declared parameters.
        expected: usize,
        /// Number of values supplied.
        given: usize,
    },

    /// A value was supplied for a parameter of an incompatible type.
    #[error("value `{value}` does not match ABI type `{ty}`")]
    TypeMismatch {
        /// Canonical type string.
        ty: String,
        /// Debug rendering of the offending value.
        value: String,
    },

    /// An integer does not fit in the declared bit width.
    #[error("integer {value} is out of range for `{ty}`")]
    IntegerOutOfRange {
        /// Canonical type string.
        ty: String,
        /// Decimal rendering of the offending value.
        value: String,
    },

    /// A fixed-size byte value has the wrong length.
    #[error("expected {expected} bytes for `{ty}`, got {given}")]
    InvalidBytesSize {
        /// Canonical type string.
        ty: String,
        /// Expected byte length.
        expected: usize,
        /// Supplied byte length.
        given: usize,
    },

    /// A fixed-size array has the wrong number of elements.
    #[error("expected array length {expected} for `{ty}`, got {given}")]
    InvalidArrayLength {
        /// Canonical type string.
        ty: String,
        /// Expected element count.
        expected: usize,
        /// Supplied element count.
        given: usize,
    },

    /// The data ends before the value being decoded.
    #[error("data size of {given} bytes is too small for `{ty}` (need {needed})")]
    DataTooShort {
        /// Canonical type string.
        ty: String,
        /// Bytes required.
        needed: usize,
        /// Bytes available.
        given: usize,
    },

    /// A dynamic offset or length word points outside of the data.
    #[error("offset {offset} is out of bounds for {len} bytes of data")]
    InvalidOffset {
        /// Offset read from the data.
        offset: String,
        /// Length of the region being decoded.
        len: usize,
    },

    /// A decoded word is not a valid encoding of the declared type.
    #[error("invalid encoded value for `{ty}`: {reason}")]
    InvalidEncoding {
        /// Canonical type string.
        ty: String,
        /// Short description.
        reason: String,
    },

    /// The call data selector does not match the function.
    #[error("selector {given} does not match `{signature}`")]
    SelectorMismatch {
        /// Canonical function signature.
        signature: String,
        /// Selector found in the data.
        given: String,
    },

    /// A JSON value could not be converted to the declared type.
    #[error("invalid JSON value for `{ty}`: {reason}")]
    InvalidJsonValue {
        /// Canonical type string.
        ty: String,
        /// Short description.
        reason: String,
    },
}
