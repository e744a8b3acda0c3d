//! Utilities for testing
//! <https://stackoverflow.com/a/44541071>
#![doc(hidden)]
