mod build_tests;
mod common;
mod inspect_tests;
