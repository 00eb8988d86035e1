/// Build a [`Fragment`](crate::Fragment) from a template.
///
/// String literals become literal SQL; `{expr}` groups become slots (a value bound as a
/// parameter, or a nested fragment spliced in place).
///
/// ```rust
/// use sql_fragment::prelude::*;
///
/// let min_age = 21;
/// let filter = sql!("age >= " {min_age});
/// let stmt = flatten(sql!("SELECT name FROM person WHERE " {filter} " ORDER BY name"));
///
/// assert_eq!(stmt.text(), "SELECT name FROM person WHERE age >= ? ORDER BY name");
/// assert_eq!(stmt.parameters(), &[RowValues::Int(21)]);
/// ```
#[macro_export]
macro_rules! sql {
    () => {
        $crate::Fragment::empty()
    };
    ($($part:tt)+) => {
        $crate::__sql_parts!($crate::Fragment::builder(); $($part)+)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __sql_parts {
    ($builder:expr;) => {
        $builder.build()
    };
    ($builder:expr; $text:literal $($rest:tt)*) => {
        $crate::__sql_parts!($builder.sql($text); $($rest)*)
    };
    ($builder:expr; { $value:expr } $($rest:tt)*) => {
        $crate::__sql_parts!($builder.push($value); $($rest)*)
    };
}
