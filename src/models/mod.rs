/// A compact transformer encoder trained from scratch for both classifiers
pub mod encoder;
