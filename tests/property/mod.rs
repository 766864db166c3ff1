//! Property-based tests for codec and ordering guarantees

mod codec_round_trip;
mod order_keys;
