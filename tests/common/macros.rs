/// Asserts that two floats agree within an absolute tolerance.
#[macro_export]
macro_rules! assert_close {
    ($left:expr, $right:expr, $tol:expr) => {
        let (left, right): (f64, f64) = ($left, $right);
        assert!(
            (left - right).abs() <= $tol,
            "{} and {} differ by more than {}",
            left,
            right,
            $tol
        );
    };
}

/// Asserts that every reported species and resource value is non-negative.
#[macro_export]
macro_rules! assert_non_negative {
    ($trajectory:expr) => {
        assert!(
            $trajectory.min_value() >= 0.0,
            "trajectory has negative value {}",
            $trajectory.min_value()
        );
    };
}

/// Asserts that every reported column sums to the expected total.
#[macro_export]
macro_rules! assert_column_totals {
    ($trajectory:expr, $total:expr, $tol:expr) => {
        for (point, total) in $trajectory.column_totals().iter().enumerate() {
            assert!(
                (total - $total).abs() <= $tol,
                "column {} sums to {}, expected {}",
                point,
                total,
                $total
            );
        }
    };
}
