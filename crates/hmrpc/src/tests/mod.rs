//! Transport and gateway tests against fake gateways on localhost
//!
//! - BIN-RPC socket pooling and retry
//! - XML-RPC over HTTP, faults and status errors
//! - Gateway metadata loading and datapoint writes
//! - Codec round trips over generated values

mod bin_transport_tests;
