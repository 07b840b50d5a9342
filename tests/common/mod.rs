#![allow(unused_imports)]

pub use tisf_run_test_utils::builders;
pub use tisf_run_test_utils::{init_tracing, with_timeout};
