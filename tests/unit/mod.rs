mod compression_tests;
mod date_tests;
