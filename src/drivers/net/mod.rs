//! Leaf `NetDevice` drivers (spec §4.1). Individual hardware register
//! sequences beyond these are out of scope (spec §1); `loopback` needs
//! none at all and `virtio_net` delegates its ring mechanics to a
//! platform-supplied transport.

pub mod loopback;

#[cfg(feature = "virtio-net")]
pub mod virtio_net;
