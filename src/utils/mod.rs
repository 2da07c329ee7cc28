pub mod address_validator;

pub use address_validator::{validate_address, validate_amount, AddressValidator};
