//! A regression test for the "two_sector" example
use regression::run_regression_test;

#[test]
fn test_regression_two_sector() {
    run_regression_test("two_sector");
}
