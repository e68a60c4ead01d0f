//! Hardware-facing leaf drivers, kept to the one device class this crate
//! needs (spec §1 "individual NIC register sequences" are out of scope
//! beyond a single reference driver).

pub mod net;
