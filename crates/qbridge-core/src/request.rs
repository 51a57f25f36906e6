use std::collections::BTreeMap;

use qbridge_wire::{Compression, Format};

use crate::mode::Mode;

/// The `Request` value of design §3: everything Negotiation extracted from
/// one HTTP call, before the Mode Dispatcher runs. `qid` is always
/// present — Negotiation generates one when the client didn't supply it —
/// `has_explicit_qid` is what distinguishes "client asked for this qid"
/// from "we made one up".
#[derive(Debug, Clone)]
pub struct NegotiatedRequest {
    pub qid: String,
    pub has_explicit_qid: bool,
    pub mode: Mode,
    pub mode_was_explicit: bool,
    pub format: Format,
    pub compression: Compression,
    pub query: String,
    pub txid: Option<String>,
    pub tenant: Option<String>,
    pub user: Option<String>,
    pub client: Option<String>,
    pub token: String,
    /// Properties forwarded from `jdbcx_`-prefixed headers (design §6.1),
    /// keyed by the dotted name after the prefix is stripped.
    pub serde_config: BTreeMap<String, String>,
}

impl NegotiatedRequest {
    /// Mode is explicit whenever the client supplied `qid` up front
    /// (design §4.1 step 8: `DIRECT` when `qid` was provided, else
    /// `SUBMIT`) — this mirrors that default without re-deriving it from
    /// `has_explicit_qid` at every call site.
    pub fn default_mode_for(has_explicit_qid: bool) -> Mode {
        if has_explicit_qid {
            Mode::Direct
        } else {
            Mode::Submit
        }
    }
}
