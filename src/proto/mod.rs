//! Download-pipeline protocols (spec §4.4): TFTP, HTTP(S) and NFS
//! openers, plus the URI dispatch that picks among them.

pub mod http;
pub mod nfs;
pub mod tftp;
pub mod uri;
