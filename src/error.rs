/// The error type used in this crate.
///
/// Only unrecoverable conditions are expressed as errors; everything that the
/// pipeline can survive (unmatched ends, unknown fields, unresolvable symbol
/// ids, ...) is counted in the stats store instead and processing continues.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The event envelope could not be decoded.
    #[error("Read error: {0}")]
    Read(#[from] ReadError),

    /// The envelope had no pid field and the event is not from a known
    /// pid-less category.
    #[error("Pid field not found in ftrace event")]
    MissingPidField,

    /// An ftrace stats bundle carried a phase value we don't know about.
    #[error("Ftrace stats with unknown phase {0}")]
    UnknownStatsPhase(u64),

    /// The kernel ring buffer reader reported an ABI-level parse error which
    /// is not on the benign allow-list.
    #[error("Unrecoverable ftrace ABI error: {name}. Set Config::ignore_abi_errors to downgrade these to a counted stat")]
    AbiError { name: &'static str },
}

/// This error indicates that the envelope data was malformed or not large
/// enough to read the respective wire element.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    #[error("Could not read the field key varint")]
    FieldKey,

    #[error("Could not read a varint value")]
    Varint,

    #[error("The varint had more than 10 bytes")]
    VarintTooLong,

    #[error("Could not read a fixed32 value")]
    Fixed32,

    #[error("Could not read a fixed64 value")]
    Fixed64,

    #[error("Could not read the length of a length-delimited field")]
    LengthDelimitedLen,

    #[error("The length-delimited payload ran past the end of the envelope")]
    LengthDelimitedPayload,

    #[error("The field used the deprecated group wire type")]
    GroupWireType,

    #[error("The field key had a reserved wire type")]
    ReservedWireType,

    #[error("The field key had field number zero")]
    ZeroFieldNumber,
}
