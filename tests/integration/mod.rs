mod locking_tests;
mod validation_tests;
