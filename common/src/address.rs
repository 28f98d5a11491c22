//! # Address Objects
//!
//! * [`record::AddressRecord`]: one address as produced by an input source.
//!   Nothing is validated at this stage.
//! * [`object::AddressObject`]: the canonical payload built from a record by
//!   [`object::AddressObject::from_record`], ready for the create call.

pub mod object;
pub mod record;
