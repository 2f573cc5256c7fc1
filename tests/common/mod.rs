#![allow(dead_code)]

pub use pageflow_test_utils::{builders, fake_executor, init_tracing, tasks, with_timeout};
