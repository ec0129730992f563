mod arena;
mod handle;
mod node;
mod raw_wavl_map;

pub(crate) use raw_wavl_map::{InOrder, RawWavlMap};
