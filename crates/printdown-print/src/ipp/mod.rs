// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Internet Printing Protocol: binary codec and operation dispatch.  No I/O;
// the HTTP transport lives in `ipp_server`.

pub mod codec;
pub mod dispatch;

pub use codec::{AttributeGroup, GroupTag, IppAttribute, IppRequest, IppResponse, IppValue, decode, encode};
pub use dispatch::{Dispatcher, Operation, RequestContext};
